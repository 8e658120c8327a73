// Error types for deck generation orchestration

use slidesmith_abstraction::ModelError;
use thiserror::Error;

/// Result type for orchestration operations
pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// Errors surfaced by the fixed-phase orchestrator.
///
/// Only mandatory-phase failures and cancellation abort a run; every other
/// phase failure is degraded in place and never reaches the caller.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The content phase failed; a deck without written content is unusable.
    #[error("content generation failed: {0}")]
    ContentGeneration(String),

    /// The run was cancelled between phases.
    #[error("generation cancelled")]
    Cancelled,

    /// Model error outside any unit boundary.
    #[error("model error: {0}")]
    Model(#[from] ModelError),
}

/// Errors raised inside an agent before being folded into a failed result.
///
/// These never cross the unit boundary: the shared `run` wrapper converts
/// them into a failed [`crate::AgentResult`].
#[derive(Debug, Error)]
pub enum AgentError {
    /// The model call itself failed.
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    /// Structured output could not be decoded, even after one re-prompt.
    #[error("structured output decode failed: {0}")]
    Decode(String),

    /// A required earlier output is missing from the record.
    #[error("missing input: {0}")]
    MissingInput(String),

    /// An external provider (image, search) failed.
    #[error("provider error: {0}")]
    Provider(String),

    /// Anything else.
    #[error("{0}")]
    Other(String),
}
