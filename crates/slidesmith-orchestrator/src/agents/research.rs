//! Research agent - topic investigation and information gathering.

use crate::context::{
    AgentConfig, AgentMessage, GenerationContext, GenerationRequest, ResearchFindings, SourceRef,
};
use crate::error::AgentError;
use crate::providers::SearchProvider;
use crate::structured::{add_usage, call_structured};
use crate::{Agent, AgentExecution, AgentOutput};
use async_trait::async_trait;
use serde_json::{json, Value};
use slidesmith_abstraction::Model;
use std::sync::Arc;
use tracing::debug;

/// Maximum reference text fed into a single analysis prompt.
const REFERENCE_EXCERPT_LIMIT: usize = 8000;

/// Research agent - topic investigation and information gathering.
pub struct ResearchAgent {
    model: Arc<dyn Model + Send + Sync>,
    search_provider: Option<Arc<dyn SearchProvider>>,
    config: AgentConfig,
}

impl ResearchAgent {
    /// Creates a research agent.
    ///
    /// # Arguments
    /// * `model` - The model used for analysis and synthesis
    /// * `search_provider` - Optional web search backend
    #[must_use]
    pub fn new(
        model: Arc<dyn Model + Send + Sync>,
        search_provider: Option<Arc<dyn SearchProvider>>,
    ) -> Self {
        Self { model, search_provider, config: AgentConfig::new() }
    }

    /// Overrides agent settings ("sources_per_query" caps search results).
    #[must_use]
    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    fn sources_per_query(&self) -> usize {
        self.config
            .get("sources_per_query")
            .and_then(Value::as_u64)
            .map_or(3, |count| count as usize)
    }

    async fn perform_web_search(&self, topic: &str) -> Vec<SourceRef> {
        let Some(provider) = &self.search_provider else {
            return Vec::new();
        };

        let queries =
            [topic.to_string(), format!("{topic} statistics"), format!("{topic} trends")];
        let per_query = self.sources_per_query();

        let mut sources = Vec::new();
        for query in &queries {
            match provider.search(query).await {
                Ok(hits) => {
                    sources.extend(hits.into_iter().take(per_query).map(|hit| SourceRef {
                        title: hit.title,
                        url: hit.url,
                        snippet: hit.snippet,
                    }));
                }
                Err(e) => {
                    // A failed query never fails the phase
                    debug!(query = %query, error = %e, "web search query failed, skipping");
                }
            }
        }
        sources
    }

    async fn analyze_reference(
        &self,
        reference: &str,
        topic: &str,
        tokens: &mut u64,
    ) -> Result<Vec<String>, AgentError> {
        let excerpt: String = reference.chars().take(REFERENCE_EXCERPT_LIMIT).collect();
        let prompt = format!(
            "Analyze the reference material below and extract the key points usable \
             in a presentation about \"{topic}\".\n\n\
             Reference material:\n{excerpt}\n\n\
             Respond as JSON with key_points, useful_quotes, and data_points arrays."
        );

        let schema = json!({
            "type": "object",
            "properties": {
                "key_points": {"type": "array", "items": {"type": "string"}},
                "useful_quotes": {"type": "array", "items": {"type": "string"}},
                "data_points": {"type": "array", "items": {"type": "string"}}
            },
            "required": ["key_points"]
        });

        match call_structured(self.model.as_ref(), &self.system_prompt(), &prompt, &schema).await {
            Ok(call) => {
                add_usage(tokens, call.usage.as_ref());
                let points = call
                    .data
                    .get("key_points")
                    .and_then(Value::as_array)
                    .map(|items| {
                        items.iter().filter_map(Value::as_str).map(str::to_string).collect()
                    })
                    .unwrap_or_default();
                Ok(points)
            }
            // Unusable reference analysis degrades to nothing rather than
            // failing the whole research phase
            Err(AgentError::Decode(e)) => {
                debug!(error = %e, "reference analysis did not decode, skipping");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    fn build_research_prompt(request: &GenerationRequest) -> String {
        let mut prompt = format!(
            "Research the following topic for a presentation.\n\n\
             Topic: {}\nLanguage: {}\nSlide count: {}",
            request.topic, request.language, request.slide_count
        );
        if let Some(audience) = &request.audience {
            prompt.push_str(&format!("\nTarget audience: {audience}"));
        }
        if let Some(purpose) = &request.purpose {
            prompt.push_str(&format!("\nPresentation purpose: {purpose}"));
        }
        prompt.push_str(
            "\n\nGather:\n\
             1. Key points (5-7)\n\
             2. Relevant statistics and figures (where available)\n\
             3. Quotable expert opinions or sayings\n\
             4. Current trends\n\
             5. Related topics\n\n\
             Respond as JSON.",
        );
        prompt
    }

    fn research_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "key_points": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Core points about the topic"
                },
                "statistics": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "value": {"type": "string"},
                            "description": {"type": "string"},
                            "source": {"type": "string"}
                        }
                    }
                },
                "quotes": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "text": {"type": "string"},
                            "author": {"type": "string"}
                        }
                    }
                },
                "trends": {
                    "type": "array",
                    "items": {"type": "string"}
                },
                "related_topics": {
                    "type": "array",
                    "items": {"type": "string"}
                },
                "summary": {
                    "type": "string",
                    "description": "A short summary of the topic"
                }
            },
            "required": ["key_points", "summary"]
        })
    }
}

#[async_trait]
impl Agent for ResearchAgent {
    fn name(&self) -> &str {
        "research_agent"
    }

    fn description(&self) -> &str {
        "Investigates the topic and gathers key points, statistics, quotes, and trends"
    }

    fn system_prompt(&self) -> String {
        "You are a presentation research specialist. You investigate a given topic \
         in depth and extract the key points, statistics, quotable opinions, and \
         current trends a presenter can build on.\n\n\
         You will:\n\
         1. Identify the topic's core points\n\
         2. Collect relevant statistics and data\n\
         3. Find quotable expert opinions or sayings\n\
         4. Identify current trends and developments\n\
         5. Derive insights useful to the audience\n\n\
         Provide results in structured form."
            .to_string()
    }

    async fn execute(&self, context: &GenerationContext) -> Result<AgentExecution, AgentError> {
        let request = &context.request;
        let mut tokens = 0u64;
        let mut findings = ResearchFindings::default();

        // 1. Web search, when a backend is configured
        findings.sources = self.perform_web_search(&request.topic).await;

        // 2. Reference material analysis, when provided
        if let Some(reference) = &request.reference_content {
            let reference_points =
                self.analyze_reference(reference, &request.topic, &mut tokens).await?;
            findings.key_points.extend(reference_points);
        }

        // 3. Model-driven synthesis
        let prompt = Self::build_research_prompt(request);
        let call = call_structured(
            self.model.as_ref(),
            &self.system_prompt(),
            &prompt,
            &Self::research_schema(),
        )
        .await?;
        add_usage(&mut tokens, call.usage.as_ref());

        let synthesized: ResearchFindings = serde_json::from_value(call.data)
            .map_err(|e| AgentError::Decode(format!("research payload: {e}")))?;

        findings.key_points.extend(synthesized.key_points);
        findings.statistics = synthesized.statistics;
        findings.quotes = synthesized.quotes;
        findings.trends = synthesized.trends;
        findings.related_topics = synthesized.related_topics;
        findings.summary = synthesized.summary;

        let mut execution = AgentExecution::new(AgentOutput::Research(findings.clone()));
        execution.tokens_used = tokens;
        execution.messages.push(AgentMessage::notification(
            self.name(),
            "content_agent",
            json!({"summary": findings.summary, "key_point_count": findings.key_points.len()}),
        ));
        Ok(execution)
    }
}
