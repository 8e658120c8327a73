//! `slidesmith generate` - full five-phase generation from one prompt.

use crate::config::Settings;
use crate::model_from_settings;
use anyhow::Context as _;
use slidesmith_orchestrator::{
    DeckOrchestrator, GenerationRequest, NoopImageProvider, OrchestratorConfig,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Arguments for the generate command.
#[derive(Debug, clap::Args)]
pub struct GenerateArgs {
    /// Presentation topic
    #[arg(short, long)]
    pub topic: String,

    /// Number of slides
    #[arg(short, long, default_value_t = 10)]
    pub slides: usize,

    /// Output language (overrides config)
    #[arg(long)]
    pub language: Option<String>,

    /// Visual theme (overrides config)
    #[arg(long)]
    pub theme: Option<String>,

    /// Target audience
    #[arg(long)]
    pub audience: Option<String>,

    /// Presentation purpose (inform, persuade, educate, inspire)
    #[arg(long)]
    pub purpose: Option<String>,

    /// Writing/visual style (formal, casual, creative)
    #[arg(long)]
    pub style: Option<String>,

    /// Template identifier
    #[arg(long)]
    pub template: Option<String>,

    /// Skip chart preparation
    #[arg(long)]
    pub no_charts: bool,

    /// Skip image lookup
    #[arg(long)]
    pub no_images: bool,

    /// Write the full generation record as JSON to this path
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Runs the generate command.
pub async fn run(args: GenerateArgs, settings: &Settings) -> anyhow::Result<()> {
    let model = model_from_settings(settings)?;

    let mut request = GenerationRequest::new(&args.topic)
        .with_slide_count(args.slides)
        .with_language(args.language.unwrap_or_else(|| settings.generation.language.clone()))
        .with_theme(args.theme.unwrap_or_else(|| settings.generation.theme.clone()));
    request.audience = args.audience;
    request.purpose = args.purpose;
    request.style = args.style;
    request.template_id = args.template;
    request.include_charts = !args.no_charts;
    request.include_images = !args.no_images;

    let mut orchestrator = DeckOrchestrator::new(
        model,
        Arc::new(NoopImageProvider),
        None,
        OrchestratorConfig::default(),
    );
    orchestrator.set_progress_callback(Box::new(|percent, message| {
        println!("[{percent:>3.0}%] {message}");
    }));

    let context = orchestrator.generate(request).await.context("generation failed")?;

    let content = context.content.as_ref().context("completed run is missing content")?;
    println!("\nGenerated \"{}\" with {} slides", content.title, content.slides.len());
    if let Some(review) = &context.review {
        println!(
            "Review: {} (score {:.2}, {} issues)",
            if review.passed { "passed" } else { "not passed" },
            review.overall_score,
            review.issues.len()
        );
    }

    if let Some(output) = args.output {
        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&output, serde_json::to_string_pretty(&context.to_deck_value())?)?;
        println!("Record written to {}", output.display());
    }

    Ok(())
}
