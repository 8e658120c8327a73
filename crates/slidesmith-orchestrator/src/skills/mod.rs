//! Composable skills: the same capabilities as the agents, exposed as
//! named, parameterized steps that can be invoked individually or chained
//! into ad-hoc pipelines.

pub mod enhance;
pub mod export;
pub mod outline;
pub mod pipeline;
pub mod registry;
pub mod research;
pub mod visualize;

pub use enhance::EnhanceSkill;
pub use export::ExportSkill;
pub use outline::OutlineSkill;
pub use pipeline::{PipelineResult, PipelineStep, SkillPipeline, StepCondition};
pub use registry::{SkillConstructor, SkillRegistry};
pub use research::ResearchSkill;
pub use visualize::VisualizeSkill;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

/// Skill category, used for browsing and search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillCategory {
    /// Research and information gathering.
    Research,
    /// Content creation.
    Content,
    /// Design and visualization.
    Design,
    /// Improvement and optimization.
    Enhancement,
    /// Exporting.
    Export,
    /// Utilities.
    Utility,
}

/// Type of a skill parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    /// A string value.
    String,
    /// An integer value.
    Integer,
    /// A boolean value.
    Boolean,
    /// A floating-point value.
    Number,
}

impl ParameterKind {
    fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
            Self::Number => value.is_number(),
        }
    }
}

/// Declaration of one skill parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillParameter {
    /// Parameter name.
    pub name: String,
    /// Expected value type.
    pub kind: ParameterKind,
    /// Human-readable description.
    pub description: String,
    /// Whether the caller must supply the parameter.
    pub required: bool,
    /// Default applied when the caller omits the parameter.
    pub default: Option<Value>,
    /// Allowed values, when the parameter is an enumeration.
    pub choices: Option<Vec<Value>>,
}

impl SkillParameter {
    /// Declares a required parameter.
    #[must_use]
    pub fn required(name: &str, kind: ParameterKind, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            description: description.to_string(),
            required: true,
            default: None,
            choices: None,
        }
    }

    /// Declares an optional parameter.
    #[must_use]
    pub fn optional(name: &str, kind: ParameterKind, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            description: description.to_string(),
            required: false,
            default: None,
            choices: None,
        }
    }

    /// Sets the default value.
    #[must_use]
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Restricts the parameter to a fixed set of values.
    #[must_use]
    pub fn with_choices(mut self, choices: Vec<Value>) -> Self {
        self.choices = Some(choices);
        self
    }
}

/// Metadata describing a skill for browsing, search, and pipeline building.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillMetadata {
    /// Registry name (e.g. "research").
    pub name: String,
    /// Display name.
    pub display_name: String,
    /// Description.
    pub description: String,
    /// Category.
    pub category: SkillCategory,
    /// Slash command (e.g. "/research").
    pub command: String,
    /// Parameter declarations.
    pub parameters: Vec<SkillParameter>,
    /// Usage examples.
    pub examples: Vec<String>,
    /// Names of skills whose output this one builds on.
    pub requires: Vec<String>,
    /// Tags describing what this skill produces.
    pub produces: Vec<String>,
}

impl SkillMetadata {
    /// Renders the skill's help text as markdown.
    #[must_use]
    pub fn help_text(&self) -> String {
        let mut help = format!(
            "## {} - {}\n\n{}\n\n### Parameters\n",
            self.command, self.display_name, self.description
        );
        for param in &self.parameters {
            let required = if param.required { "(required)" } else { "(optional)" };
            let default = param
                .default
                .as_ref()
                .map(|value| format!(" [default: {value}]"))
                .unwrap_or_default();
            help.push_str(&format!(
                "- **{}** {}: {}{}\n",
                param.name, required, param.description, default
            ));
        }
        if !self.examples.is_empty() {
            help.push_str("\n### Examples\n");
            for example in &self.examples {
                help.push_str(&format!("```\n{example}\n```\n"));
            }
        }
        help
    }
}

/// Shared context threaded through the steps of one pipeline.
#[derive(Debug, Clone, Default)]
pub struct SkillContext {
    /// Outputs of already-executed steps, keyed by step name.
    pub previous_outputs: HashMap<String, SkillOutput>,
    /// Free-form shared data.
    pub shared: HashMap<String, Value>,
    /// The deck being worked on, when one exists.
    pub deck: Option<Value>,
    /// Output language.
    pub language: String,
    /// Visual theme.
    pub theme: String,
}

impl SkillContext {
    /// Creates a context with default language and theme.
    #[must_use]
    pub fn new() -> Self {
        Self { language: "en".to_string(), theme: "default".to_string(), ..Self::default() }
    }

    /// Returns a previous step's output, if it ran.
    #[must_use]
    pub fn get_previous_output(&self, skill_name: &str) -> Option<&SkillOutput> {
        self.previous_outputs.get(skill_name)
    }
}

/// Input to one skill invocation.
#[derive(Debug, Clone, Default)]
pub struct SkillInput {
    /// Parameter values by name.
    pub parameters: HashMap<String, Value>,
    /// Shared pipeline context.
    pub context: SkillContext,
}

impl SkillInput {
    /// Creates an input from parameters alone.
    #[must_use]
    pub fn from_parameters(parameters: HashMap<String, Value>) -> Self {
        Self { parameters, context: SkillContext::new() }
    }

    /// Returns a string parameter.
    #[must_use]
    pub fn string(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).and_then(Value::as_str)
    }

    /// Returns an integer parameter.
    #[must_use]
    pub fn integer(&self, name: &str) -> Option<i64> {
        self.parameters.get(name).and_then(Value::as_i64)
    }

    /// Returns a boolean parameter.
    #[must_use]
    pub fn boolean(&self, name: &str) -> Option<bool> {
        self.parameters.get(name).and_then(Value::as_bool)
    }
}

/// Result envelope returned by every skill invocation.
///
/// A failed output never carries data a pipeline would treat as valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillOutput {
    /// Whether the invocation succeeded.
    pub success: bool,
    /// The payload, present only on success.
    pub data: Option<Value>,
    /// Error description when `success` is false.
    pub error: Option<String>,
    /// Free-form metadata about the invocation.
    pub metadata: HashMap<String, Value>,
}

impl SkillOutput {
    /// Creates a successful output.
    #[must_use]
    pub fn success(data: Value) -> Self {
        Self { success: true, data: Some(data), error: None, metadata: HashMap::new() }
    }

    /// Creates a failed output.
    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self { success: false, data: None, error: Some(error.into()), metadata: HashMap::new() }
    }

    /// Attaches metadata.
    #[must_use]
    pub fn with_metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }
}

/// The contract every composable skill implements.
///
/// `run` is the entire externally visible behavior: it validates input,
/// applies declared defaults, and folds any internal failure into a failed
/// [`SkillOutput`]. No error ever escapes to the caller.
#[async_trait]
pub trait Skill: Send + Sync {
    /// Returns the skill's metadata.
    fn metadata(&self) -> SkillMetadata;

    /// Performs the skill's work. Input has already been validated and
    /// defaulted by `run`.
    ///
    /// # Errors
    /// Returns an error for any internal failure; the `run` wrapper folds
    /// it into a failed output.
    async fn execute(&self, input: &SkillInput) -> anyhow::Result<SkillOutput>;

    /// Validates parameters against the declarations in the metadata.
    /// Returns the first problem found, or `None` when the input is valid.
    fn validate_input(&self, input: &SkillInput) -> Option<String> {
        for param in self.metadata().parameters {
            let Some(value) = input.parameters.get(&param.name) else {
                if param.required {
                    return Some(format!("missing required parameter: {}", param.name));
                }
                continue;
            };

            if !param.kind.matches(value) {
                return Some(format!(
                    "parameter '{}' must be a {:?}",
                    param.name, param.kind
                ));
            }

            if let Some(choices) = &param.choices {
                if !choices.contains(value) {
                    return Some(format!(
                        "parameter '{}' must be one of {:?}",
                        param.name, choices
                    ));
                }
            }
        }
        None
    }

    /// Executes the skill with validation, defaults, and failure folding.
    async fn run(&self, mut input: SkillInput) -> SkillOutput {
        if let Some(error) = self.validate_input(&input) {
            return SkillOutput::failure(error);
        }

        for param in self.metadata().parameters {
            if let Some(default) = param.default {
                input.parameters.entry(param.name).or_insert(default);
            }
        }

        match self.execute(&input).await {
            Ok(output) => output,
            Err(e) => {
                warn!(skill = %self.metadata().name, error = %e, "skill failed");
                SkillOutput::failure(e.to_string())
            }
        }
    }
}
