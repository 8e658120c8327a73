//! `slidesmith pipeline` - run an ad-hoc skill chain.

use crate::config::Settings;
use crate::model_from_settings;
use serde_json::{json, Value};
use slidesmith_orchestrator::{SkillPipeline, SkillRegistry};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Arguments for the pipeline command.
#[derive(Debug, clap::Args)]
pub struct PipelineArgs {
    /// Presentation topic
    #[arg(short, long)]
    pub topic: String,

    /// Number of slides
    #[arg(short, long, default_value_t = 10)]
    pub slides: usize,

    /// Comma-separated step names (registered skills)
    #[arg(long, default_value = "research,outline,enhance,export")]
    pub steps: String,

    /// Export format when the chain contains an export step
    #[arg(long, default_value = "json")]
    pub format: String,

    /// Export path when the chain contains an export step
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

fn parameters_for(args: &PipelineArgs, step: &str) -> HashMap<String, Value> {
    let mut parameters = HashMap::new();
    match step {
        "research" => {
            parameters.insert("topic".to_string(), json!(args.topic));
        }
        "outline" => {
            parameters.insert("topic".to_string(), json!(args.topic));
            parameters.insert("slide_count".to_string(), json!(args.slides));
        }
        "export" => {
            parameters.insert("format".to_string(), json!(args.format));
            if let Some(output) = &args.output {
                parameters.insert("output_path".to_string(), json!(output.to_string_lossy()));
            }
        }
        _ => {}
    }
    parameters
}

/// Runs the pipeline command.
pub async fn run(args: PipelineArgs, settings: &Settings) -> anyhow::Result<()> {
    let model = model_from_settings(settings)?;
    let registry = Arc::new(SkillRegistry::with_default_skills().await);

    let step_names: Vec<String> = args
        .steps
        .split(',')
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();
    if step_names.is_empty() {
        anyhow::bail!("no steps given");
    }

    let mut pipeline = SkillPipeline::new(registry, model);
    for name in &step_names {
        pipeline = pipeline.add_step(name, parameters_for(&args, name));
    }

    let callback = |percent: f32, step: &str| {
        println!("[{percent:>3.0}%] {step}");
    };
    let result = pipeline.execute(Some(&callback)).await;

    println!(
        "\nPipeline {}: {}/{} steps completed",
        if result.success { "complete" } else { "failed" },
        result.steps_completed,
        result.total_steps
    );

    if let Some(export_output) = result.outputs.get("export").and_then(|output| output.data.as_ref())
    {
        if let Some(path) = export_output.get("output_path").and_then(Value::as_str) {
            println!("Exported to {path}");
        }
    }

    if let Some(error) = result.error {
        anyhow::bail!("pipeline failed: {error}");
    }
    Ok(())
}
