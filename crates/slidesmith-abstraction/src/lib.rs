//! Model abstraction layer for Slidesmith.
//!
//! This crate defines the core trait and types for interacting with
//! generative AI models. Concrete providers live in `slidesmith-models`;
//! everything that consumes a model depends only on this crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Represents an error that can occur when interacting with an AI model.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelError {
    /// An error occurred during the API request (e.g., network issues, invalid request).
    #[error("Request Error: {0}")]
    RequestError(String),

    /// The model returned an error (e.g., invalid input, rate limiting).
    #[error("Model Response Error: {0}")]
    ModelResponseError(String),

    /// The model's output could not be decoded into the requested structure.
    #[error("Serialization Error: {0}")]
    SerializationError(String),

    /// The model provider is not supported or configured.
    #[error("Unsupported Model Provider: {0}")]
    UnsupportedModelProvider(String),

    /// Other unexpected errors.
    #[error("Other Model Error: {0}")]
    Other(String),
}

/// Represents a message in a conversation with a chat model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// The role of the message sender (e.g., "user", "assistant", "system").
    pub role: String,
    /// The content of the message.
    pub content: String,
}

impl ChatMessage {
    /// Creates a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }

    /// Creates a system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }
}

/// Parameters for controlling the model's generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelParameters {
    /// What sampling temperature to use, between 0 and 2.
    /// Higher values mean the model will take more risks.
    pub temperature: Option<f32>,

    /// An alternative to sampling with temperature, called nucleus sampling,
    /// where the model considers the results of the tokens with `top_p` probability mass.
    pub top_p: Option<f32>,

    /// The maximum number of tokens to generate in the completion.
    pub max_tokens: Option<u32>,

    /// Up to 4 sequences where the API will stop generating further tokens.
    pub stop_sequences: Option<Vec<String>>,
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self {
            temperature: Some(0.7),
            top_p: Some(1.0),
            max_tokens: Some(4000),
            stop_sequences: None,
        }
    }
}

/// The response from a text generation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResponse {
    /// The generated content.
    pub content: String,

    /// Optional: The ID of the model used to generate the response.
    pub model_id: Option<String>,

    /// Optional: Usage statistics for the request.
    pub usage: Option<ModelUsage>,
}

/// The response from a structured (schema-constrained) generation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredResponse {
    /// The decoded JSON object.
    pub data: serde_json::Value,

    /// Optional: The ID of the model used to generate the response.
    pub model_id: Option<String>,

    /// Optional: Usage statistics for the request.
    pub usage: Option<ModelUsage>,
}

/// Usage statistics for a model request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelUsage {
    /// Number of tokens in the prompt.
    pub prompt_tokens: u32,

    /// Number of tokens in the completion.
    pub completion_tokens: u32,

    /// Total number of tokens used.
    pub total_tokens: u32,
}

impl ModelUsage {
    /// Sums another usage record into this one.
    pub fn add(&mut self, other: &Self) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}

/// A trait for interacting with different AI models.
///
/// All models must be `Send + Sync` to allow concurrent use across threads.
#[async_trait]
pub trait Model: Send + Sync {
    /// Generates a text completion based on the given prompt.
    ///
    /// # Arguments
    /// * `prompt` - The input prompt for text generation
    /// * `system_prompt` - Optional system instruction prepended to the conversation
    /// * `parameters` - Optional parameters to control generation
    ///
    /// # Errors
    /// Returns a `ModelError` if generation fails.
    async fn generate_text(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        parameters: Option<ModelParameters>,
    ) -> Result<ModelResponse, ModelError>;

    /// Generates a JSON object conforming to the given schema.
    ///
    /// Implementations must decode the model output into a JSON value and
    /// verify it against the schema's top-level required properties, failing
    /// with [`ModelError::SerializationError`] when the output cannot be
    /// coerced. Callers are expected to handle that failure with at most one
    /// re-prompt before surfacing their own failure.
    ///
    /// # Arguments
    /// * `prompt` - The input prompt for generation
    /// * `system_prompt` - Optional system instruction prepended to the conversation
    /// * `schema` - JSON Schema describing the expected response shape
    /// * `parameters` - Optional parameters to control generation
    ///
    /// # Errors
    /// Returns a `ModelError` if generation fails or the output does not decode.
    async fn generate_structured(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        schema: &serde_json::Value,
        parameters: Option<ModelParameters>,
    ) -> Result<StructuredResponse, ModelError>;

    /// Returns the ID of the model.
    fn model_id(&self) -> &str;
}

/// Extracts a JSON value from raw model output.
///
/// Models frequently wrap JSON in markdown fences or prefix it with prose;
/// this tries a direct parse first, then the content of a ``` fence, then the
/// first balanced `{...}` or `[...]` region.
///
/// # Errors
/// Returns a `ModelError::SerializationError` if no JSON value can be found.
pub fn extract_json(content: &str) -> Result<serde_json::Value, ModelError> {
    let trimmed = content.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Ok(value);
    }

    if let Some(fenced) = extract_fenced_block(trimmed) {
        if let Ok(value) = serde_json::from_str(fenced.trim()) {
            return Ok(value);
        }
    }

    for open in ['{', '['] {
        if let Some(candidate) = extract_balanced(trimmed, open) {
            if let Ok(value) = serde_json::from_str(candidate) {
                return Ok(value);
            }
        }
    }

    Err(ModelError::SerializationError(format!(
        "no JSON value found in model output ({} bytes)",
        content.len()
    )))
}

/// Checks a decoded value against the top-level required properties of a schema.
///
/// This is a shallow structural check, not full JSON Schema validation: the
/// providers we target enforce the schema server-side, and the check here
/// only guards against prose responses masquerading as JSON.
///
/// # Errors
/// Returns a `ModelError::SerializationError` naming the first missing property.
pub fn check_required_properties(
    value: &serde_json::Value,
    schema: &serde_json::Value,
) -> Result<(), ModelError> {
    let Some(required) = schema.get("required").and_then(|r| r.as_array()) else {
        return Ok(());
    };

    for name in required.iter().filter_map(|n| n.as_str()) {
        if value.get(name).is_none() {
            return Err(ModelError::SerializationError(format!(
                "decoded object is missing required property '{name}'"
            )));
        }
    }

    Ok(())
}

fn extract_fenced_block(content: &str) -> Option<&str> {
    let start = content.find("```")?;
    let after_fence = &content[start + 3..];
    // Skip an optional language tag on the fence line
    let body_start = after_fence.find('\n')? + 1;
    let body = &after_fence[body_start..];
    let end = body.find("```")?;
    Some(&body[..end])
}

fn extract_balanced(content: &str, open: char) -> Option<&str> {
    let close = if open == '{' { '}' } else { ']' };
    let start = content.find(open)?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in content[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            c if c == open && !in_string => depth += 1,
            c if c == close && !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&content[start..=start + offset]);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_json_direct() {
        let value = extract_json(r#"{"title": "Deck"}"#).unwrap();
        assert_eq!(value["title"], "Deck");
    }

    #[test]
    fn test_extract_json_fenced() {
        let content = "Here you go:\n```json\n{\"title\": \"Deck\"}\n```\nEnjoy!";
        let value = extract_json(content).unwrap();
        assert_eq!(value["title"], "Deck");
    }

    #[test]
    fn test_extract_json_embedded_object() {
        let content = "Sure! {\"items\": [1, 2, 3]} is the answer.";
        let value = extract_json(content).unwrap();
        assert_eq!(value["items"], json!([1, 2, 3]));
    }

    #[test]
    fn test_extract_json_embedded_array() {
        let content = "Result: [{\"index\": 0}, {\"index\": 1}]";
        let value = extract_json(content).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_extract_json_handles_braces_in_strings() {
        let content = r#"prefix {"text": "a } inside"} suffix"#;
        let value = extract_json(content).unwrap();
        assert_eq!(value["text"], "a } inside");
    }

    #[test]
    fn test_extract_json_failure() {
        let result = extract_json("no json here at all");
        assert!(matches!(result, Err(ModelError::SerializationError(_))));
    }

    #[test]
    fn test_check_required_properties_ok() {
        let schema = json!({"type": "object", "required": ["title", "slides"]});
        let value = json!({"title": "Deck", "slides": []});
        assert!(check_required_properties(&value, &schema).is_ok());
    }

    #[test]
    fn test_check_required_properties_missing() {
        let schema = json!({"type": "object", "required": ["title", "slides"]});
        let value = json!({"title": "Deck"});
        let err = check_required_properties(&value, &schema).unwrap_err();
        assert!(err.to_string().contains("slides"));
    }

    #[test]
    fn test_check_required_properties_no_required_section() {
        let schema = json!({"type": "object"});
        let value = json!({"anything": true});
        assert!(check_required_properties(&value, &schema).is_ok());
    }

    #[test]
    fn test_model_usage_add() {
        let mut usage = ModelUsage { prompt_tokens: 10, completion_tokens: 5, total_tokens: 15 };
        usage.add(&ModelUsage { prompt_tokens: 2, completion_tokens: 3, total_tokens: 5 });
        assert_eq!(usage.prompt_tokens, 12);
        assert_eq!(usage.completion_tokens, 8);
        assert_eq!(usage.total_tokens, 20);
    }
}
