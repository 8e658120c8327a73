//! CLI configuration.
//!
//! Settings come from an optional `slidesmith.toml` (current directory or
//! `~/.slidesmith/`), with API keys supplied through environment variables
//! (`OPENAI_API_KEY`, `ANTHROPIC_API_KEY`).

use serde::Deserialize;
use std::path::{Path, PathBuf};

fn default_provider() -> String {
    "mock".to_string()
}

fn default_model_id() -> String {
    "mock-model".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_theme() -> String {
    "default".to_string()
}

/// Model configuration section.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ModelSettings {
    /// Provider name ("mock", "openai", "claude").
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Model ID for the provider.
    #[serde(default = "default_model_id")]
    pub model_id: String,
    /// Optional base URL override for OpenAI-compatible servers.
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self { provider: default_provider(), model_id: default_model_id(), base_url: None }
    }
}

/// Generation defaults section.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GenerationSettings {
    /// Default output language.
    #[serde(default = "default_language")]
    pub language: String,
    /// Default visual theme.
    #[serde(default = "default_theme")]
    pub theme: String,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self { language: default_language(), theme: default_theme() }
    }
}

/// Root CLI configuration.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Settings {
    /// Model configuration.
    #[serde(default)]
    pub model: ModelSettings,
    /// Generation defaults.
    #[serde(default)]
    pub generation: GenerationSettings,
}

impl Settings {
    /// Loads settings from the given file.
    ///
    /// # Errors
    /// Returns an error when the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;
        toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("failed to parse config file {}: {e}", path.display()))
    }

    /// Loads settings from the first config file found, or defaults.
    ///
    /// # Errors
    /// Returns an error only when a config file exists but cannot be parsed.
    pub fn load(explicit_path: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = explicit_path {
            return Self::load_from_file(path);
        }

        for candidate in Self::candidate_paths() {
            if candidate.exists() {
                return Self::load_from_file(&candidate);
            }
        }
        Ok(Self::default())
    }

    fn candidate_paths() -> Vec<PathBuf> {
        let mut candidates = vec![PathBuf::from("slidesmith.toml")];
        if let Ok(home) = std::env::var("HOME") {
            candidates.push(PathBuf::from(home).join(".slidesmith").join("slidesmith.toml"));
        }
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.model.provider, "mock");
        assert_eq!(settings.generation.language, "en");
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[model]\nprovider = \"openai\"\nmodel_id = \"gpt-4o\"").unwrap();

        let settings = Settings::load_from_file(file.path()).unwrap();
        assert_eq!(settings.model.provider, "openai");
        assert_eq!(settings.model.model_id, "gpt-4o");
        // Missing sections fall back to defaults
        assert_eq!(settings.generation.theme, "default");
    }

    #[test]
    fn test_load_invalid_file_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not valid toml [[").unwrap();
        assert!(Settings::load_from_file(file.path()).is_err());
    }
}
