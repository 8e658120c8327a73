//! Generic step pipeline over registry-resolved skills.
//!
//! A caller builds an ordered list of steps, each with parameters and an
//! optional condition over earlier results, then executes them strictly in
//! order. Unlike the fixed-phase orchestrator there is no per-step
//! fallback: any step failure aborts the remaining steps, and graceful
//! degradation is the caller's job (typically a condition that skips a
//! later step when an earlier one failed).

use crate::skills::{SkillContext, SkillInput, SkillOutput, SkillRegistry};
use serde_json::Value;
use slidesmith_abstraction::Model;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// A typed condition over an earlier step's recorded output.
///
/// `field` is matched against the output envelope first ("success",
/// "data", "error", "metadata"), then against the fields of the output's
/// data object. A missing step or field means "condition not met": a
/// skip, never an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepCondition {
    /// Name of the step whose output is examined.
    pub step: String,
    /// Field examined on that output.
    pub field: String,
}

impl StepCondition {
    /// Creates a condition on a step's success flag.
    #[must_use]
    pub fn succeeded(step: impl Into<String>) -> Self {
        Self { step: step.into(), field: "success".to_string() }
    }

    /// Parses the `"step.field"` convenience form.
    #[must_use]
    pub fn parse(expression: &str) -> Option<Self> {
        let (step, field) = expression.split_once('.')?;
        if step.is_empty() || field.is_empty() {
            return None;
        }
        Some(Self { step: step.to_string(), field: field.to_string() })
    }

    /// Evaluates the condition against the outputs recorded so far.
    #[must_use]
    pub fn is_met(&self, outputs: &HashMap<String, SkillOutput>) -> bool {
        let Some(output) = outputs.get(&self.step) else {
            return false;
        };

        match self.field.as_str() {
            "success" => output.success,
            "data" => output.data.as_ref().is_some_and(|data| !data.is_null()),
            "error" => output.error.is_some(),
            "metadata" => !output.metadata.is_empty(),
            field => output
                .data
                .as_ref()
                .and_then(|data| data.get(field))
                .is_some_and(truthy),
        }
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// One step in a pipeline.
#[derive(Debug, Clone)]
pub struct PipelineStep {
    /// Registered skill name.
    pub skill_name: String,
    /// Parameters for the invocation.
    pub parameters: HashMap<String, Value>,
    /// Optional gate over earlier results.
    pub condition: Option<StepCondition>,
}

/// Result of one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    /// Whether every non-skipped step succeeded.
    pub success: bool,
    /// Number of steps that ran to success.
    pub steps_completed: usize,
    /// Total number of steps in the pipeline.
    pub total_steps: usize,
    /// Outputs recorded during this run, keyed by step name.
    pub outputs: HashMap<String, SkillOutput>,
    /// Error that aborted the run, if any.
    pub error: Option<String>,
}

/// An ordered, condition-gated chain of registry-resolved skills.
pub struct SkillPipeline {
    registry: Arc<SkillRegistry>,
    model: Arc<dyn Model + Send + Sync>,
    steps: Vec<PipelineStep>,
    context: SkillContext,
}

impl SkillPipeline {
    /// Creates an empty pipeline.
    ///
    /// # Arguments
    /// * `registry` - Registry used to resolve step names
    /// * `model` - Model handed to skills on first instantiation
    #[must_use]
    pub fn new(registry: Arc<SkillRegistry>, model: Arc<dyn Model + Send + Sync>) -> Self {
        Self { registry, model, steps: Vec::new(), context: SkillContext::new() }
    }

    /// Appends an unconditional step.
    #[must_use]
    pub fn add_step(self, skill_name: &str, parameters: HashMap<String, Value>) -> Self {
        self.push_step(skill_name, parameters, None)
    }

    /// Appends a step gated on an earlier step's output.
    #[must_use]
    pub fn add_step_if(
        self,
        skill_name: &str,
        parameters: HashMap<String, Value>,
        condition: StepCondition,
    ) -> Self {
        self.push_step(skill_name, parameters, Some(condition))
    }

    fn push_step(
        mut self,
        skill_name: &str,
        parameters: HashMap<String, Value>,
        condition: Option<StepCondition>,
    ) -> Self {
        self.steps.push(PipelineStep {
            skill_name: skill_name.to_string(),
            parameters,
            condition,
        });
        self
    }

    /// Replaces the shared context.
    #[must_use]
    pub fn with_context(mut self, context: SkillContext) -> Self {
        self.context = context;
        self
    }

    /// Returns the shared context.
    #[must_use]
    pub fn context(&self) -> &SkillContext {
        &self.context
    }

    /// Returns the number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true when the pipeline has no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Clears steps and context.
    pub fn reset(&mut self) {
        self.steps.clear();
        self.context = SkillContext::new();
    }

    /// The standard research -> outline -> enhance -> export chain.
    #[must_use]
    pub fn default_deck_pipeline(
        registry: Arc<SkillRegistry>,
        model: Arc<dyn Model + Send + Sync>,
        topic: &str,
        slide_count: usize,
    ) -> Self {
        let mut research_params = HashMap::new();
        research_params.insert("topic".to_string(), Value::String(topic.to_string()));

        let mut outline_params = HashMap::new();
        outline_params.insert("topic".to_string(), Value::String(topic.to_string()));
        outline_params.insert("slide_count".to_string(), Value::from(slide_count as u64));

        let mut enhance_params = HashMap::new();
        enhance_params.insert("target".to_string(), Value::String("all".to_string()));

        let mut export_params = HashMap::new();
        export_params.insert("format".to_string(), Value::String("json".to_string()));

        Self::new(registry, model)
            .add_step("research", research_params)
            .add_step("outline", outline_params)
            .add_step("enhance", enhance_params)
            .add_step("export", export_params)
    }

    /// Executes the steps in order.
    ///
    /// Each run starts a fresh output record; re-running never mutates a
    /// prior result. The progress callback receives
    /// `(percent, current step name)` before each step and a final 100% on
    /// normal completion.
    pub async fn execute(
        &mut self,
        progress: Option<&(dyn Fn(f32, &str) + Send + Sync)>,
    ) -> PipelineResult {
        let total_steps = self.steps.len();
        let mut outputs: HashMap<String, SkillOutput> = HashMap::new();
        let mut steps_completed = 0usize;

        info!(total_steps, "pipeline starting");

        for (i, step) in self.steps.iter().enumerate() {
            if let Some(callback) = progress {
                let percent = (i as f32 / total_steps as f32) * 100.0;
                callback(percent, &step.skill_name);
            }

            // 1. Condition gate: unmet means skip, never error
            if let Some(condition) = &step.condition {
                if !condition.is_met(&outputs) {
                    debug!(step = %step.skill_name, "condition not met, skipping step");
                    continue;
                }
            }

            // 2. Resolution through the registry: unknown names abort the run
            let Some(skill) =
                self.registry.resolve(&step.skill_name, Arc::clone(&self.model)).await
            else {
                return PipelineResult {
                    success: false,
                    steps_completed,
                    total_steps,
                    outputs,
                    error: Some(format!("unknown skill: {}", step.skill_name)),
                };
            };

            // 3-4. Defaults and execution happen inside the skill's run
            let input = SkillInput {
                parameters: step.parameters.clone(),
                context: self.context.clone(),
            };
            let output = skill.run(input).await;

            // 5. Record under the step's name for later conditions and steps
            outputs.insert(step.skill_name.clone(), output.clone());
            self.context.previous_outputs.insert(step.skill_name.clone(), output.clone());

            // 6. A failed step aborts the remainder
            if !output.success {
                return PipelineResult {
                    success: false,
                    steps_completed,
                    total_steps,
                    outputs,
                    error: output.error,
                };
            }

            steps_completed += 1;
        }

        if let Some(callback) = progress {
            callback(100.0, "complete");
        }

        info!(steps_completed, total_steps, "pipeline complete");
        PipelineResult { success: true, steps_completed, total_steps, outputs, error: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn output_with_data(data: Value) -> SkillOutput {
        SkillOutput::success(data)
    }

    #[test]
    fn test_condition_parse() {
        let condition = StepCondition::parse("outline.success").unwrap();
        assert_eq!(condition.step, "outline");
        assert_eq!(condition.field, "success");
        assert!(StepCondition::parse("no-dot").is_none());
        assert!(StepCondition::parse(".field").is_none());
        assert!(StepCondition::parse("step.").is_none());
    }

    #[test]
    fn test_condition_missing_step_is_not_met() {
        let condition = StepCondition::succeeded("research");
        assert!(!condition.is_met(&HashMap::new()));
    }

    #[test]
    fn test_condition_success_field() {
        let condition = StepCondition::succeeded("research");
        let mut outputs = HashMap::new();
        outputs.insert("research".to_string(), output_with_data(json!({})));
        assert!(condition.is_met(&outputs));

        outputs.insert("research".to_string(), SkillOutput::failure("boom"));
        assert!(!condition.is_met(&outputs));
    }

    #[test]
    fn test_condition_data_field_truthiness() {
        let condition = StepCondition::parse("research.has_sources").unwrap();
        let mut outputs = HashMap::new();

        outputs.insert(
            "research".to_string(),
            output_with_data(json!({"has_sources": true})),
        );
        assert!(condition.is_met(&outputs));

        outputs.insert(
            "research".to_string(),
            output_with_data(json!({"has_sources": false})),
        );
        assert!(!condition.is_met(&outputs));

        // Missing field is "not met", never an error
        outputs.insert("research".to_string(), output_with_data(json!({})));
        assert!(!condition.is_met(&outputs));
    }

    #[tokio::test]
    async fn test_default_deck_pipeline_shape() {
        let registry = Arc::new(crate::skills::SkillRegistry::with_default_skills().await);
        let model: Arc<dyn Model + Send + Sync> =
            Arc::new(slidesmith_models::MockModel::new("mock".to_string()));

        let pipeline = SkillPipeline::default_deck_pipeline(registry, model, "AI trends", 8);
        assert_eq!(pipeline.len(), 4);
        let names: Vec<&str> =
            pipeline.steps.iter().map(|step| step.skill_name.as_str()).collect();
        assert_eq!(names, vec!["research", "outline", "enhance", "export"]);
    }

    #[test]
    fn test_condition_error_and_metadata_fields() {
        let mut outputs = HashMap::new();
        outputs.insert("step".to_string(), SkillOutput::failure("boom"));

        assert!(StepCondition::parse("step.error").unwrap().is_met(&outputs));
        assert!(!StepCondition::parse("step.data").unwrap().is_met(&outputs));
        assert!(!StepCondition::parse("step.metadata").unwrap().is_met(&outputs));
    }
}
