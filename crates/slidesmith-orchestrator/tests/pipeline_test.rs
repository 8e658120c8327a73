//! Behavior tests for the generic skill pipeline: condition gating,
//! registry resolution, and abort-on-failure semantics.

use async_trait::async_trait;
use serde_json::json;
use slidesmith_abstraction::Model;
use slidesmith_models::MockModel;
use slidesmith_orchestrator::{
    ParameterKind, Skill, SkillCategory, SkillInput, SkillMetadata, SkillOutput, SkillParameter,
    SkillPipeline, SkillRegistry, StepCondition,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

static THIRD_STEP_RUNS: AtomicUsize = AtomicUsize::new(0);

fn metadata(name: &str) -> SkillMetadata {
    SkillMetadata {
        name: name.to_string(),
        display_name: name.to_string(),
        description: format!("test skill {name}"),
        category: SkillCategory::Utility,
        command: format!("/{name}"),
        parameters: vec![SkillParameter::optional(
            "label",
            ParameterKind::String,
            "Free label",
        )],
        examples: vec![],
        requires: vec![],
        produces: vec![],
    }
}

macro_rules! ok_skill {
    ($struct_name:ident, $name:literal) => {
        struct $struct_name;

        #[async_trait]
        impl Skill for $struct_name {
            fn metadata(&self) -> SkillMetadata {
                metadata($name)
            }

            async fn execute(&self, _input: &SkillInput) -> anyhow::Result<SkillOutput> {
                Ok(SkillOutput::success(json!({"step": $name, "flag": true})))
            }
        }
    };
}

ok_skill!(StepOne, "one");
ok_skill!(StepFour, "four");

struct StepTwoFails;

#[async_trait]
impl Skill for StepTwoFails {
    fn metadata(&self) -> SkillMetadata {
        metadata("two")
    }

    async fn execute(&self, _input: &SkillInput) -> anyhow::Result<SkillOutput> {
        Ok(SkillOutput::failure("step two exploded"))
    }
}

struct StepThreeCounts;

#[async_trait]
impl Skill for StepThreeCounts {
    fn metadata(&self) -> SkillMetadata {
        metadata("three")
    }

    async fn execute(&self, _input: &SkillInput) -> anyhow::Result<SkillOutput> {
        THIRD_STEP_RUNS.fetch_add(1, Ordering::SeqCst);
        Ok(SkillOutput::success(json!({"step": "three"})))
    }
}

async fn test_registry() -> Arc<SkillRegistry> {
    let registry = SkillRegistry::new();
    registry.register(|_model| Arc::new(StepOne)).await;
    registry.register(|_model| Arc::new(StepTwoFails)).await;
    registry.register(|_model| Arc::new(StepThreeCounts)).await;
    registry.register(|_model| Arc::new(StepFour)).await;
    Arc::new(registry)
}

fn mock_model() -> Arc<dyn Model + Send + Sync> {
    Arc::new(MockModel::new("mock".to_string()))
}

#[tokio::test]
async fn failing_step_two_of_four_aborts_the_rest() {
    THIRD_STEP_RUNS.store(0, Ordering::SeqCst);

    let mut pipeline = SkillPipeline::new(test_registry().await, mock_model())
        .add_step("one", HashMap::new())
        .add_step("two", HashMap::new())
        .add_step("three", HashMap::new())
        .add_step("four", HashMap::new());

    let result = pipeline.execute(None).await;

    assert!(!result.success);
    assert_eq!(result.steps_completed, 1);
    assert_eq!(result.total_steps, 4);
    assert_eq!(result.error.as_deref(), Some("step two exploded"));

    // Steps three and four were never invoked
    assert_eq!(THIRD_STEP_RUNS.load(Ordering::SeqCst), 0);
    assert!(!result.outputs.contains_key("three"));
    assert!(!result.outputs.contains_key("four"));
    // The failing step's output is still recorded
    assert!(result.outputs.contains_key("two"));
}

#[tokio::test]
async fn condition_on_missing_step_skips_without_error() {
    let mut pipeline = SkillPipeline::new(test_registry().await, mock_model())
        .add_step("one", HashMap::new())
        .add_step_if(
            "four",
            HashMap::new(),
            StepCondition::parse("never_ran.success").unwrap(),
        );

    let result = pipeline.execute(None).await;

    assert!(result.success);
    assert_eq!(result.steps_completed, 1);
    assert_eq!(result.total_steps, 2);
    assert!(!result.outputs.contains_key("four"));
}

#[tokio::test]
async fn condition_on_successful_step_runs_the_gated_step() {
    let mut pipeline = SkillPipeline::new(test_registry().await, mock_model())
        .add_step("one", HashMap::new())
        .add_step_if("four", HashMap::new(), StepCondition::succeeded("one"));

    let result = pipeline.execute(None).await;

    assert!(result.success);
    assert_eq!(result.steps_completed, 2);
    assert!(result.outputs.contains_key("four"));
}

#[tokio::test]
async fn condition_on_data_field_gates_on_truthiness() {
    let mut pipeline = SkillPipeline::new(test_registry().await, mock_model())
        .add_step("one", HashMap::new())
        .add_step_if("four", HashMap::new(), StepCondition::parse("one.flag").unwrap());

    let result = pipeline.execute(None).await;
    assert!(result.success);
    assert_eq!(result.steps_completed, 2);
}

#[tokio::test]
async fn unknown_skill_aborts_with_a_named_error() {
    let mut pipeline = SkillPipeline::new(test_registry().await, mock_model())
        .add_step("one", HashMap::new())
        .add_step("nonexistent", HashMap::new())
        .add_step("four", HashMap::new());

    let result = pipeline.execute(None).await;

    assert!(!result.success);
    assert_eq!(result.steps_completed, 1);
    assert_eq!(result.error.as_deref(), Some("unknown skill: nonexistent"));
    assert!(!result.outputs.contains_key("four"));
}

#[tokio::test]
async fn progress_reports_every_step_and_a_final_100() {
    let reported: Arc<Mutex<Vec<(f32, String)>>> = Arc::new(Mutex::new(Vec::new()));
    let reported_clone = Arc::clone(&reported);
    let callback = move |percent: f32, step: &str| {
        reported_clone.lock().unwrap().push((percent, step.to_string()));
    };

    let mut pipeline = SkillPipeline::new(test_registry().await, mock_model())
        .add_step("one", HashMap::new())
        .add_step("four", HashMap::new());

    let result = pipeline.execute(Some(&callback)).await;
    assert!(result.success);

    let reported = reported.lock().unwrap();
    assert_eq!(reported.len(), 3);
    assert_eq!(reported[0].1, "one");
    assert!((reported[0].0 - 0.0).abs() < f32::EPSILON);
    assert_eq!(reported[1].1, "four");
    assert!((reported[1].0 - 50.0).abs() < f32::EPSILON);
    assert_eq!(reported[2].1, "complete");
    assert!((reported[2].0 - 100.0).abs() < f32::EPSILON);
}

#[tokio::test]
async fn rerunning_starts_a_fresh_run_record() {
    let registry = test_registry().await;
    let mut pipeline = SkillPipeline::new(Arc::clone(&registry), mock_model())
        .add_step("one", HashMap::new());

    let first = pipeline.execute(None).await;
    let second = pipeline.execute(None).await;

    assert!(first.success);
    assert!(second.success);
    // Each run owns its outputs; mutating one cannot affect the other
    assert_eq!(first.outputs.len(), 1);
    assert_eq!(second.outputs.len(), 1);
}

#[tokio::test]
async fn research_outline_export_chain_with_failed_outline() {
    // The classic degradation pattern: export gated on outline success.
    // Outline ("two") fails, so the run aborts with one completed step and
    // the gated export is never invoked.
    let mut pipeline = SkillPipeline::new(test_registry().await, mock_model())
        .add_step("one", HashMap::new())
        .add_step("two", HashMap::new())
        .add_step_if("four", HashMap::new(), StepCondition::succeeded("two"));

    let result = pipeline.execute(None).await;

    assert!(!result.success);
    assert_eq!(result.steps_completed, 1);
    assert_eq!(result.total_steps, 3);
    assert!(!result.outputs.contains_key("four"));
}

#[tokio::test]
async fn default_deck_pipeline_runs_end_to_end_with_mock_model() {
    let dir = tempfile::tempdir().unwrap();
    let output_path = dir.path().join("deck.json");

    let registry = Arc::new(SkillRegistry::with_default_skills().await);

    let mut research_params = HashMap::new();
    research_params.insert("topic".to_string(), json!("Quarterly results"));
    let mut outline_params = HashMap::new();
    outline_params.insert("topic".to_string(), json!("Quarterly results"));
    outline_params.insert("slide_count".to_string(), json!(5));
    let mut enhance_params = HashMap::new();
    enhance_params.insert("target".to_string(), json!("design"));
    let mut export_params = HashMap::new();
    export_params.insert("output_path".to_string(), json!(output_path.to_string_lossy()));

    let mut pipeline = SkillPipeline::new(registry, mock_model())
        .add_step("research", research_params)
        .add_step("outline", outline_params)
        .add_step("enhance", enhance_params)
        .add_step_if("export", export_params, StepCondition::succeeded("enhance"));

    let result = pipeline.execute(None).await;

    assert!(result.success, "pipeline failed: {:?}", result.error);
    assert_eq!(result.steps_completed, 4);
    assert!(output_path.exists());
}
