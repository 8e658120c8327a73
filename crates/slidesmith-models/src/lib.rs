//! Model implementations for Slidesmith.
//!
//! This crate provides concrete implementations of the `Model` trait.
//!
//! # Supported Providers
//!
//! - **Mock**: Testing, development, and offline dry runs
//! - **OpenAI**: OpenAI's GPT models (API key required)
//! - **Claude**: Anthropic's Claude models (API key required)

pub mod claude;
pub mod factory;
pub mod openai;

use async_trait::async_trait;
use serde_json::{json, Value};
use slidesmith_abstraction::{
    Model, ModelError, ModelParameters, ModelResponse, ModelUsage, StructuredResponse,
};
use tracing::debug;

pub use claude::ClaudeModel;
pub use factory::{ModelConfig, ModelFactory, ModelType};
pub use openai::OpenAIModel;

/// A mock implementation of the `Model` trait for testing and demonstration.
///
/// Text calls return a canned echo of the prompt. Structured calls synthesize
/// a value from the schema's `properties` section so that callers exercising
/// a full generation run decode successfully without network access.
#[derive(Debug, Default)]
pub struct MockModel {
    id: String,
}

impl MockModel {
    /// Creates a new `MockModel` with the given ID.
    #[must_use]
    pub const fn new(id: String) -> Self {
        Self { id }
    }

    /// Builds a placeholder value for a single schema property.
    fn value_for_property(schema: &Value) -> Value {
        match schema.get("type").and_then(Value::as_str) {
            Some("string") => Value::String(String::new()),
            Some("number") => json!(0.0),
            Some("integer") => json!(0),
            Some("boolean") => json!(false),
            Some("array") => json!([]),
            Some("object") => Self::object_from_schema(schema),
            _ => Value::Null,
        }
    }

    /// Synthesizes an object satisfying the schema's declared properties.
    fn object_from_schema(schema: &Value) -> Value {
        let mut object = serde_json::Map::new();
        if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
            for (name, property_schema) in properties {
                object.insert(name.clone(), Self::value_for_property(property_schema));
            }
        }
        Value::Object(object)
    }
}

#[async_trait]
impl Model for MockModel {
    async fn generate_text(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        parameters: Option<ModelParameters>,
    ) -> Result<ModelResponse, ModelError> {
        debug!(
            model_id = %self.id,
            prompt_len = prompt.len(),
            has_system = system_prompt.is_some(),
            parameters = ?parameters,
            "MockModel generating text"
        );

        let response_content = format!("Mock response for: {prompt}\nModel ID: {}", self.id);

        let prompt_tokens = count_tokens(prompt);
        let completion_tokens = count_tokens(&response_content);
        let total_tokens = prompt_tokens + completion_tokens;

        Ok(ModelResponse {
            content: response_content,
            model_id: Some(self.id.clone()),
            usage: Some(ModelUsage { prompt_tokens, completion_tokens, total_tokens }),
        })
    }

    async fn generate_structured(
        &self,
        prompt: &str,
        _system_prompt: Option<&str>,
        schema: &Value,
        _parameters: Option<ModelParameters>,
    ) -> Result<StructuredResponse, ModelError> {
        debug!(
            model_id = %self.id,
            prompt_len = prompt.len(),
            "MockModel generating structured output"
        );

        let data = Self::object_from_schema(schema);
        slidesmith_abstraction::check_required_properties(&data, schema)?;

        let prompt_tokens = count_tokens(prompt);

        Ok(StructuredResponse {
            data,
            model_id: Some(self.id.clone()),
            usage: Some(ModelUsage {
                prompt_tokens,
                completion_tokens: 0,
                total_tokens: prompt_tokens,
            }),
        })
    }

    fn model_id(&self) -> &str {
        &self.id
    }
}

/// Count tokens in a string (simplified: word count).
///
/// For a real implementation, this would use a proper tokenizer.
fn count_tokens(text: &str) -> u32 {
    text.split_whitespace().count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_generate_text() {
        let model = MockModel::new("mock-model".to_string());
        let response = model.generate_text("hello", None, None).await.unwrap();
        assert!(response.content.contains("hello"));
        assert_eq!(response.model_id, Some("mock-model".to_string()));
        assert!(response.usage.is_some());
    }

    #[tokio::test]
    async fn test_mock_generate_structured_satisfies_schema() {
        let model = MockModel::new("mock-model".to_string());
        let schema = json!({
            "type": "object",
            "properties": {
                "title": {"type": "string"},
                "slides": {"type": "array", "items": {"type": "object"}},
                "count": {"type": "integer"}
            },
            "required": ["title", "slides"]
        });

        let response = model.generate_structured("outline", None, &schema, None).await.unwrap();
        assert!(response.data.get("title").is_some());
        assert_eq!(response.data["slides"], json!([]));
        assert_eq!(response.data["count"], json!(0));
    }

    #[tokio::test]
    async fn test_mock_generate_structured_nested_object() {
        let model = MockModel::new("mock-model".to_string());
        let schema = json!({
            "type": "object",
            "properties": {
                "font_pairing": {
                    "type": "object",
                    "properties": {
                        "heading": {"type": "string"},
                        "body": {"type": "string"}
                    }
                }
            }
        });

        let response = model.generate_structured("design", None, &schema, None).await.unwrap();
        assert!(response.data["font_pairing"].get("heading").is_some());
    }
}
