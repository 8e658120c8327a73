//! Agent orchestration for Slidesmith.
//!
//! This crate is the core of the system: the shared generation record, the
//! agent contract, the five content agents, the fixed five-phase
//! orchestrator, the generic skill pipeline, and the bounded fan-out
//! executor used for per-slide media work.

pub mod agents;
pub mod context;
pub mod error;
pub mod fanout;
pub mod orchestrator;
pub mod providers;
pub mod skills;

mod structured;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, warn};

pub use agents::{ContentAgent, DesignAgent, MediaAgent, ResearchAgent, ReviewAgent};
pub use context::{
    AgentConfig, AgentMessage, ChartSpec, DeckContent, DeckDesign, DeckMedia, FontPairing,
    GenerationContext, GenerationPhase, GenerationRequest, GenerationStatus, ImageAsset,
    ImagePosition, ImageStyle, IssueKind, IssueSeverity, MessageKind, Quote, ResearchFindings,
    ReviewIssue, ReviewReport, SlideContent, SlideDesign, SlideLayout, SlideMedia, SourceRef,
    Statistic, Visualization,
};
pub use error::{AgentError, OrchestratorError};
pub use fanout::{FanOutExecutor, DEFAULT_MEDIA_CONCURRENCY};
pub use orchestrator::{DeckOrchestrator, OrchestratorConfig, PhaseCallback, ProgressCallback};
pub use providers::{ImageProvider, NoopImageProvider, SearchHit, SearchProvider};
pub use skills::{
    EnhanceSkill, ExportSkill, OutlineSkill, ParameterKind, PipelineResult, PipelineStep,
    ResearchSkill, Skill, SkillCategory, SkillConstructor, SkillContext, SkillInput,
    SkillMetadata, SkillOutput, SkillParameter, SkillPipeline, SkillRegistry, StepCondition,
    VisualizeSkill,
};

/// Typed output produced by an agent, one variant per phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AgentOutput {
    /// Research phase payload.
    Research(ResearchFindings),
    /// Content phase payload.
    Content(DeckContent),
    /// Design phase payload.
    Design(DeckDesign),
    /// Media phase payload.
    Media(DeckMedia),
    /// Review phase payload.
    Review(ReviewReport),
}

/// Result envelope returned by every agent invocation.
///
/// A failed result never carries an output the orchestrator would treat as
/// valid: `output` is `None` whenever `success` is false.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResult {
    /// The typed payload, present only on success.
    pub output: Option<AgentOutput>,
    /// Whether the invocation succeeded.
    pub success: bool,
    /// Error description when `success` is false.
    pub error: Option<String>,
    /// Free-form metadata about the invocation.
    pub metadata: HashMap<String, serde_json::Value>,
    /// Wall-clock duration of the invocation.
    pub duration_ms: u64,
    /// Total model tokens consumed.
    pub tokens_used: u64,
    /// Messages the agent posted during the invocation; the orchestrator
    /// appends them to the record's observability log.
    pub messages: Vec<AgentMessage>,
}

impl AgentResult {
    /// Creates a successful result with the given payload.
    #[must_use]
    pub fn success(output: AgentOutput) -> Self {
        Self {
            output: Some(output),
            success: true,
            error: None,
            metadata: HashMap::new(),
            duration_ms: 0,
            tokens_used: 0,
            messages: Vec::new(),
        }
    }

    /// Creates a failed result with no payload.
    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            output: None,
            success: false,
            error: Some(error.into()),
            metadata: HashMap::new(),
            duration_ms: 0,
            tokens_used: 0,
            messages: Vec::new(),
        }
    }

    /// Attaches a duration to the result.
    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Attaches a token count to the result.
    #[must_use]
    pub fn with_tokens(mut self, tokens_used: u64) -> Self {
        self.tokens_used = tokens_used;
        self
    }

    /// Attaches posted messages to the result.
    #[must_use]
    pub fn with_messages(mut self, messages: Vec<AgentMessage>) -> Self {
        self.messages = messages;
        self
    }
}

/// Intermediate value an agent's `execute` hands back to the shared wrapper.
#[derive(Debug)]
pub struct AgentExecution {
    /// The typed payload.
    pub output: AgentOutput,
    /// Total model tokens consumed.
    pub tokens_used: u64,
    /// Messages to post to the record's log.
    pub messages: Vec<AgentMessage>,
}

impl AgentExecution {
    /// Wraps a payload with no token usage and no messages.
    #[must_use]
    pub fn new(output: AgentOutput) -> Self {
        Self { output, tokens_used: 0, messages: Vec::new() }
    }
}

/// The contract every content-producing agent implements.
///
/// `run` is the entire externally visible behavior: it must catch every
/// internal failure and fold it into a failed [`AgentResult`]; no error
/// ever escapes to the caller. The provided implementation does exactly
/// that around `execute`.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Returns the agent's unique name.
    fn name(&self) -> &str;

    /// Returns a description of the agent's purpose.
    fn description(&self) -> &str;

    /// Returns the agent's default instruction text for the model,
    /// overridable per call by the agent itself.
    fn system_prompt(&self) -> String;

    /// Produces the agent's typed output from the shared record.
    ///
    /// # Errors
    /// Returns an `AgentError` for any internal failure; the `run` wrapper
    /// converts it into a failed result.
    async fn execute(&self, context: &GenerationContext) -> Result<AgentExecution, AgentError>;

    /// Executes the agent, translating any failure into a failed result.
    async fn run(&self, context: &GenerationContext) -> AgentResult {
        let started = Instant::now();
        debug!(agent = %self.name(), "agent starting");

        let result = match self.execute(context).await {
            Ok(execution) => AgentResult::success(execution.output)
                .with_tokens(execution.tokens_used)
                .with_messages(execution.messages),
            Err(e) => {
                warn!(agent = %self.name(), error = %e, "agent failed");
                AgentResult::failure(e.to_string())
            }
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        debug!(
            agent = %self.name(),
            success = result.success,
            duration_ms = elapsed_ms,
            "agent finished"
        );
        result.with_duration_ms(elapsed_ms)
    }
}
