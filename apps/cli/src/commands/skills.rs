//! `slidesmith skills` - browse the registered skills.

use slidesmith_orchestrator::SkillRegistry;

/// Arguments for the skills command.
#[derive(Debug, clap::Args)]
#[command(disable_help_subcommand = true)]
pub struct SkillsArgs {
    #[command(subcommand)]
    pub action: Option<SkillsAction>,
}

/// Skill browsing actions.
#[derive(Debug, clap::Subcommand)]
pub enum SkillsAction {
    /// List every registered skill
    List,
    /// Search skills by name or description
    Search {
        /// Search query
        query: String,
    },
    /// Show a skill's help text
    Help {
        /// Skill name
        name: String,
    },
}

/// Runs the skills command.
pub async fn run(args: SkillsArgs) -> anyhow::Result<()> {
    let registry = SkillRegistry::with_default_skills().await;

    match args.action.unwrap_or(SkillsAction::List) {
        SkillsAction::List => {
            for meta in registry.list_skills().await {
                println!("{:<12} {:<24} {}", meta.name, meta.command, meta.description);
            }
        }
        SkillsAction::Search { query } => {
            let hits = registry.search(&query).await;
            if hits.is_empty() {
                println!("no skills match '{query}'");
            }
            for meta in hits {
                println!("{:<12} {:<24} {}", meta.name, meta.command, meta.description);
            }
        }
        SkillsAction::Help { name } => {
            let skills = registry.list_skills().await;
            match skills.iter().find(|meta| meta.name == name) {
                Some(meta) => println!("{}", meta.help_text()),
                None => anyhow::bail!("unknown skill: {name}"),
            }
        }
    }
    Ok(())
}
