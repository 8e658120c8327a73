//! Slidesmith CLI - generate presentations from a single prompt, or chain
//! individual skills into ad-hoc pipelines.

mod commands;
mod config;

use clap::{Parser, Subcommand};
use commands::{generate, pipeline, skills};
use config::Settings;
use slidesmith_abstraction::Model;
use slidesmith_models::{ModelConfig, ModelFactory, ModelType};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Slidesmith - AI presentation generation
#[derive(Parser, Debug)]
#[command(
    name = "slidesmith",
    author,
    version,
    about = "Slidesmith - AI presentation generation",
    long_about = "Slidesmith coordinates research, content, design, media, and review \
                  agents to build a full presentation from one prompt, and exposes the \
                  same capabilities as composable pipeline skills."
)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn", global = true)]
    log_level: String,

    /// Config file path (defaults to ./slidesmith.toml, then ~/.slidesmith/)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a full presentation from a topic
    Generate(generate::GenerateArgs),
    /// Run an ad-hoc chain of skills
    Pipeline(pipeline::PipelineArgs),
    /// Browse the registered skills
    Skills(skills::SkillsArgs),
    /// Show the effective configuration
    Config,
}

/// Creates the model described by the settings.
pub fn model_from_settings(
    settings: &Settings,
) -> anyhow::Result<Arc<dyn Model + Send + Sync>> {
    let model_type = ModelType::from_str(&settings.model.provider).map_err(|()| {
        anyhow::anyhow!("unknown model provider: {}", settings.model.provider)
    })?;

    let mut config = ModelConfig::new(model_type, settings.model.model_id.clone());
    if let Some(base_url) = &settings.model.base_url {
        config = config.with_base_url(base_url.clone());
    }

    ModelFactory::create(config).map_err(|e| anyhow::anyhow!("failed to create model: {e}"))
}

fn init_tracing(level: &str) {
    let level = Level::from_str(level).unwrap_or(Level::WARN);
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    let settings = Settings::load(args.config.as_deref())?;

    match args.command {
        Command::Generate(generate_args) => generate::run(generate_args, &settings).await,
        Command::Pipeline(pipeline_args) => pipeline::run(pipeline_args, &settings).await,
        Command::Skills(skills_args) => skills::run(skills_args).await,
        Command::Config => {
            println!("provider   = {}", settings.model.provider);
            println!("model_id   = {}", settings.model.model_id);
            if let Some(base_url) = &settings.model.base_url {
                println!("base_url   = {base_url}");
            }
            println!("language   = {}", settings.generation.language);
            println!("theme      = {}", settings.generation.theme);
            Ok(())
        }
    }
}
