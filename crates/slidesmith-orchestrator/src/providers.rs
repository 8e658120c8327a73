//! External collaborator interfaces consumed by the agents.
//!
//! Concrete search/image backends live outside this crate; agents depend
//! only on these narrow contracts. Provider failures never fail a phase;
//! the agents degrade to empty results.

use crate::context::ImageAsset;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One result from a web search.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchHit {
    /// Page title.
    pub title: String,
    /// Page URL.
    pub url: String,
    /// Short excerpt.
    pub snippet: String,
}

/// Web search backend used by the research agent.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Runs a search query.
    ///
    /// # Errors
    /// Returns an error if the backend call fails; callers ignore per-query
    /// failures.
    async fn search(&self, query: &str) -> anyhow::Result<Vec<SearchHit>>;
}

/// Image lookup backend used by the media agent.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Finds an image for the given keywords, if any.
    ///
    /// # Errors
    /// Returns an error if the backend call fails; callers substitute an
    /// empty result for the affected slide only.
    async fn search_image(&self, keywords: &str) -> anyhow::Result<Option<ImageAsset>>;
}

/// An image provider that never returns images.
///
/// Used when no image backend is configured; slides simply end up without
/// fetched imagery.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopImageProvider;

#[async_trait]
impl ImageProvider for NoopImageProvider {
    async fn search_image(&self, _keywords: &str) -> anyhow::Result<Option<ImageAsset>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_image_provider_returns_nothing() {
        let provider = NoopImageProvider;
        let result = provider.search_image("business meeting").await.unwrap();
        assert!(result.is_none());
    }
}
