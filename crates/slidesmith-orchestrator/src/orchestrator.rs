//! Fixed-phase deck orchestrator.
//!
//! Runs the five phases strictly in order against one shared record:
//! research, content, design, media, review. The fallback policy is
//! deliberately asymmetric: a deck without research, perfect design, or
//! images is still usable, but one without written content is not:
//!
//! - research failure: non-fatal, an empty placeholder fills the slot
//! - content failure: fatal, the run aborts
//! - design failure: non-fatal, a deterministic default design is applied
//! - media failure: non-fatal, the slot stays empty
//! - review: never fails the run; a failed verdict triggers a best-effort
//!   fix pass, then the run completes regardless

use crate::agents::{ContentAgent, DesignAgent, MediaAgent, ResearchAgent, ReviewAgent};
use crate::context::{
    DeckDesign, FontPairing, GenerationContext, GenerationPhase, GenerationRequest,
    GenerationStatus, IssueKind, IssueSeverity, ResearchFindings, ReviewReport,
};
use crate::error::{OrchestratorError, Result};
use crate::fanout::{FanOutExecutor, DEFAULT_MEDIA_CONCURRENCY};
use crate::providers::{ImageProvider, SearchProvider};
use crate::{Agent, AgentOutput, AgentResult};
use slidesmith_abstraction::Model;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Progress callback: `(percent, message)`. Fire-and-forget; must not block.
pub type ProgressCallback = Box<dyn Fn(f32, &str) + Send + Sync>;

/// Phase-change callback: receives the phase name, plus the terminal
/// "completed" / "failed" markers. Fire-and-forget; must not block.
pub type PhaseCallback = Box<dyn Fn(&str) + Send + Sync>;

/// Orchestrator tuning knobs.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Cap on simultaneous outbound media lookups.
    pub media_concurrency: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self { media_concurrency: DEFAULT_MEDIA_CONCURRENCY }
    }
}

/// Fixed-phase orchestrator over one shared generation record.
pub struct DeckOrchestrator {
    agents: HashMap<GenerationPhase, Arc<dyn Agent>>,
    progress_callback: Option<ProgressCallback>,
    phase_callback: Option<PhaseCallback>,
    cancel: CancellationToken,
}

impl DeckOrchestrator {
    /// Creates an orchestrator wired with the five standard agents.
    ///
    /// # Arguments
    /// * `model` - The model every agent generates with
    /// * `image_provider` - Image lookup backend for the media phase
    /// * `search_provider` - Optional web search backend for research
    /// * `config` - Tuning knobs
    #[must_use]
    pub fn new(
        model: Arc<dyn Model + Send + Sync>,
        image_provider: Arc<dyn ImageProvider>,
        search_provider: Option<Arc<dyn SearchProvider>>,
        config: OrchestratorConfig,
    ) -> Self {
        let mut agents: HashMap<GenerationPhase, Arc<dyn Agent>> = HashMap::new();
        agents.insert(
            GenerationPhase::Research,
            Arc::new(ResearchAgent::new(Arc::clone(&model), search_provider)),
        );
        agents.insert(GenerationPhase::Content, Arc::new(ContentAgent::new(Arc::clone(&model))));
        agents.insert(GenerationPhase::Design, Arc::new(DesignAgent::new(Arc::clone(&model))));
        agents.insert(
            GenerationPhase::Media,
            Arc::new(MediaAgent::new(
                Arc::clone(&model),
                image_provider,
                FanOutExecutor::new(config.media_concurrency),
            )),
        );
        agents.insert(GenerationPhase::Review, Arc::new(ReviewAgent::new(model)));

        Self { agents, progress_callback: None, phase_callback: None, cancel: CancellationToken::new() }
    }

    /// Replaces the agent bound to a phase. Used to inject alternates and
    /// test doubles.
    pub fn replace_agent(&mut self, phase: GenerationPhase, agent: Arc<dyn Agent>) {
        self.agents.insert(phase, agent);
    }

    /// Returns the agent bound to a phase.
    #[must_use]
    pub fn agent(&self, phase: GenerationPhase) -> Option<&Arc<dyn Agent>> {
        self.agents.get(&phase)
    }

    /// Sets the progress callback.
    pub fn set_progress_callback(&mut self, callback: ProgressCallback) {
        self.progress_callback = Some(callback);
    }

    /// Sets the phase-change callback.
    pub fn set_phase_callback(&mut self, callback: PhaseCallback) {
        self.phase_callback = Some(callback);
    }

    /// Returns a handle that cancels the run. Cancellation is honored
    /// between phases, never mid-phase; already-written slots are kept.
    #[must_use]
    pub fn cancel_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn report_progress(&self, percent: f32, message: &str) {
        if let Some(callback) = &self.progress_callback {
            callback(percent, message);
        }
    }

    fn report_phase(&self, phase: &str) {
        if let Some(callback) = &self.phase_callback {
            callback(phase);
        }
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            info!("generation cancelled between phases");
            return Err(OrchestratorError::Cancelled);
        }
        Ok(())
    }

    async fn run_phase(
        &self,
        phase: GenerationPhase,
        context: &mut GenerationContext,
    ) -> AgentResult {
        let (start, _) = phase.progress_range();
        self.report_phase(phase.as_str());
        context.set_phase(phase, start);

        let Some(agent) = self.agents.get(&phase).map(Arc::clone) else {
            return AgentResult::failure(format!("no agent bound for phase {phase}"));
        };
        let result = agent.run(context).await;
        context.record_messages(result.messages.clone());

        debug!(
            phase = %phase,
            success = result.success,
            duration_ms = result.duration_ms,
            tokens = result.tokens_used,
            "phase finished"
        );
        result
    }

    /// Runs the full five-phase generation against the given record.
    ///
    /// The caller keeps ownership of the record and can inspect it even
    /// when the run fails.
    ///
    /// # Errors
    /// Returns [`OrchestratorError::ContentGeneration`] when the mandatory
    /// content phase fails, or [`OrchestratorError::Cancelled`] when the
    /// cancel handle fired between phases.
    pub async fn run(&self, context: &mut GenerationContext) -> Result<()> {
        info!(run_id = %context.run_id, topic = %context.request.topic, "generation starting");
        context.advance_status(GenerationStatus::InProgress);

        // Phase 1: research (0% - 20%), failure is non-fatal
        self.check_cancelled()?;
        self.report_progress(0.0, "Researching topic...");
        let research_result = self.run_phase(GenerationPhase::Research, context).await;
        match research_result.output {
            Some(AgentOutput::Research(findings)) if research_result.success => {
                context.research = Some(findings);
            }
            _ => {
                warn!(error = ?research_result.error, "research failed, continuing with placeholder");
                context.research = Some(ResearchFindings::skipped());
            }
        }
        self.report_progress(20.0, "Research complete");

        // Phase 2: content (20% - 50%), failure aborts the run
        self.check_cancelled()?;
        self.report_progress(20.0, "Writing content...");
        let content_result = self.run_phase(GenerationPhase::Content, context).await;
        match content_result.output {
            Some(AgentOutput::Content(content)) if content_result.success => {
                context.content = Some(content);
            }
            _ => {
                let error = content_result
                    .error
                    .unwrap_or_else(|| "content agent returned no deck".to_string());
                context.advance_status(GenerationStatus::Failed);
                self.report_phase("failed");
                return Err(OrchestratorError::ContentGeneration(error));
            }
        }
        self.report_progress(50.0, "Content complete");

        // Phase 3: design (50% - 60%), failure falls back to a default design
        self.check_cancelled()?;
        self.report_progress(50.0, "Planning design...");
        let design_result = self.run_phase(GenerationPhase::Design, context).await;
        match design_result.output {
            Some(AgentOutput::Design(design)) if design_result.success => {
                context.design = Some(design);
            }
            _ => {
                warn!(error = ?design_result.error, "design failed, applying default design");
                context.design = Some(Self::default_design(context));
            }
        }
        self.report_progress(60.0, "Design complete");

        // Phase 4: media (60% - 90%), failure leaves the slot empty
        self.check_cancelled()?;
        self.report_progress(60.0, "Preparing media...");
        let media_result = self.run_phase(GenerationPhase::Media, context).await;
        match media_result.output {
            Some(AgentOutput::Media(media)) if media_result.success => {
                context.media = Some(media);
            }
            _ => {
                warn!(error = ?media_result.error, "media failed, continuing without media");
            }
        }
        self.report_progress(90.0, "Media complete");

        // Phase 5: review (90% - 100%), never fails the run
        self.check_cancelled()?;
        self.report_progress(90.0, "Reviewing quality...");
        let review_result = self.run_phase(GenerationPhase::Review, context).await;
        match review_result.output {
            Some(AgentOutput::Review(report)) if review_result.success => {
                context.review = Some(report);
            }
            _ => {
                warn!(error = ?review_result.error, "review failed, recording default verdict");
                context.review = Some(ReviewReport::default_pass());
            }
        }

        if context.review.as_ref().is_some_and(|review| !review.passed) {
            self.apply_review_fixes(context);
        }

        self.report_progress(100.0, "Generation complete");
        self.report_phase("completed");
        context.advance_status(GenerationStatus::Completed);
        context.set_progress(100.0);
        info!(run_id = %context.run_id, "generation completed");
        Ok(())
    }

    /// Convenience wrapper creating the record, running the phases, and
    /// returning the populated record.
    ///
    /// # Errors
    /// Same as [`DeckOrchestrator::run`]; the record is dropped on failure,
    /// so callers that need to inspect a failed record should use `run`.
    pub async fn generate(&self, request: GenerationRequest) -> Result<GenerationContext> {
        let mut context = GenerationContext::new(request);
        self.run(&mut context).await?;
        Ok(context)
    }

    /// Deterministic design used when the design phase fails: the first
    /// slide gets a title layout, the last a closing layout, everything
    /// else a generic content layout. No model call involved.
    fn default_design(context: &GenerationContext) -> DeckDesign {
        let slide_count = context.content.as_ref().map_or(0, |content| content.slides.len());
        DeckDesign {
            template_id: "default".to_string(),
            color_scheme: context.request.theme.clone(),
            font_pairing: FontPairing::default(),
            slides: DesignAgent::default_layouts(slide_count),
        }
    }

    /// Best-effort pass over critical review issues.
    ///
    /// No corrective behavior is specified for these issue types, so each
    /// branch is an explicit no-op that records the skip; the run completes
    /// regardless of the verdict.
    fn apply_review_fixes(&self, context: &mut GenerationContext) {
        let Some(review) = &context.review else { return };

        let critical: Vec<(Option<usize>, IssueKind)> = review
            .issues
            .iter()
            .filter(|issue| issue.severity == IssueSeverity::Critical)
            .map(|issue| (issue.slide_index, issue.kind))
            .collect();

        for (slide_index, kind) in critical {
            match kind {
                IssueKind::Consistency => {
                    debug!(?slide_index, "no automated fix for consistency issues, skipping");
                }
                IssueKind::Quality => {
                    debug!(?slide_index, "no automated fix for quality issues, skipping");
                }
                IssueKind::Accessibility | IssueKind::Style => {
                    debug!(?slide_index, "no automated fix for this issue type, skipping");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::NoopImageProvider;
    use slidesmith_models::MockModel;

    fn orchestrator() -> DeckOrchestrator {
        DeckOrchestrator::new(
            Arc::new(MockModel::new("mock-model".to_string())),
            Arc::new(NoopImageProvider),
            None,
            OrchestratorConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_full_run_with_mock_model_completes() {
        let orchestrator = orchestrator();
        let context = orchestrator.generate(GenerationRequest::new("Quarterly results")).await;
        let context = context.expect("mock run should complete");
        assert_eq!(context.status, GenerationStatus::Completed);
        assert!(context.research.is_some());
        assert!(context.content.is_some());
        assert!(context.design.is_some());
        assert!(context.review.is_some());
        assert!((context.progress_percent - 100.0).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_cancel_before_start_stops_the_run() {
        let orchestrator = orchestrator();
        orchestrator.cancel_handle().cancel();

        let mut context = GenerationContext::new(GenerationRequest::new("topic"));
        let result = orchestrator.run(&mut context).await;
        assert!(matches!(result, Err(OrchestratorError::Cancelled)));
        // Nothing was rolled back, nothing was written
        assert!(context.research.is_none());
        assert_eq!(context.status, GenerationStatus::InProgress);
    }

    #[tokio::test]
    async fn test_default_design_shape() {
        let mut context = GenerationContext::new(GenerationRequest::new("topic"));
        context.content = Some(crate::DeckContent {
            title: "Deck".to_string(),
            slides: (0..4)
                .map(|index| crate::SlideContent { index, ..crate::SlideContent::default() })
                .collect(),
            ..crate::DeckContent::default()
        });

        let design = DeckOrchestrator::default_design(&context);
        assert_eq!(design.template_id, "default");
        assert_eq!(design.slides.len(), 4);
        assert_eq!(design.slides[0].layout, crate::SlideLayout::Title);
        assert_eq!(design.slides[3].layout, crate::SlideLayout::Contact);
    }
}
