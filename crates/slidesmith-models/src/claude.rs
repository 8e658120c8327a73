//! Claude model implementation.
//!
//! This module provides an implementation of the `Model` trait for
//! Anthropic's Messages API.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use slidesmith_abstraction::{
    check_required_properties, extract_json, Model, ModelError, ModelParameters, ModelResponse,
    ModelUsage, StructuredResponse,
};
use std::env;
use tracing::{debug, error};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4000;

/// Claude model implementation.
#[derive(Debug, Clone)]
pub struct ClaudeModel {
    /// The model ID (e.g., "claude-3-5-sonnet-20241022").
    model_id: String,
    /// The API key for authentication.
    api_key: String,
    /// The base URL for the Anthropic API.
    base_url: String,
    /// HTTP client for making requests.
    client: Client,
}

impl ClaudeModel {
    /// Creates a new `ClaudeModel` with the given model ID.
    ///
    /// # Arguments
    /// * `model_id` - The Claude model ID to use
    ///
    /// # Errors
    /// Returns a `ModelError` if the API key is not found in environment variables.
    pub fn new(model_id: String) -> Result<Self, ModelError> {
        let api_key = env::var("ANTHROPIC_API_KEY").map_err(|_| {
            ModelError::UnsupportedModelProvider(
                "ANTHROPIC_API_KEY environment variable not set".to_string(),
            )
        })?;

        Ok(Self {
            model_id,
            api_key,
            base_url: "https://api.anthropic.com".to_string(),
            client: Client::new(),
        })
    }

    /// Creates a new `ClaudeModel` with a custom API key.
    ///
    /// # Arguments
    /// * `model_id` - The Claude model ID to use
    /// * `api_key` - The API key for authentication
    #[must_use]
    pub fn with_api_key(model_id: String, api_key: String) -> Self {
        Self {
            model_id,
            api_key,
            base_url: "https://api.anthropic.com".to_string(),
            client: Client::new(),
        }
    }

    async fn messages_request(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        parameters: Option<ModelParameters>,
    ) -> Result<ModelResponse, ModelError> {
        let url = format!("{}/v1/messages", self.base_url);

        let mut request_body = ClaudeRequest {
            model: self.model_id.clone(),
            max_tokens: DEFAULT_MAX_TOKENS,
            messages: vec![ClaudeMessage { role: "user".to_string(), content: prompt.to_string() }],
            system: system_prompt.map(str::to_string),
            temperature: None,
            top_p: None,
            stop_sequences: None,
        };

        if let Some(params) = parameters {
            request_body.temperature = params.temperature;
            request_body.top_p = params.top_p;
            if let Some(max_tokens) = params.max_tokens {
                request_body.max_tokens = max_tokens;
            }
            request_body.stop_sequences = params.stop_sequences;
        }

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to send request to Anthropic API");
                ModelError::RequestError(format!("Network error: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(
                status = %status,
                error = %error_text,
                "Anthropic API returned error status"
            );
            return Err(ModelError::ModelResponseError(format!(
                "API error ({}): {}",
                status, error_text
            )));
        }

        let claude_response: ClaudeResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse Anthropic API response");
            ModelError::SerializationError(format!("Failed to parse response: {}", e))
        })?;

        let content = claude_response
            .content
            .iter()
            .filter(|block| block.block_type == "text")
            .map(|block| block.text.as_str())
            .collect::<Vec<_>>()
            .join("");

        if content.is_empty() {
            error!("No text content in Anthropic API response");
            return Err(ModelError::ModelResponseError(
                "No content in API response".to_string(),
            ));
        }

        let usage = claude_response.usage.map(|u| ModelUsage {
            prompt_tokens: u.input_tokens,
            completion_tokens: u.output_tokens,
            total_tokens: u.input_tokens + u.output_tokens,
        });

        Ok(ModelResponse { content, model_id: Some(self.model_id.clone()), usage })
    }
}

#[async_trait]
impl Model for ClaudeModel {
    async fn generate_text(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        parameters: Option<ModelParameters>,
    ) -> Result<ModelResponse, ModelError> {
        debug!(
            model_id = %self.model_id,
            prompt_len = prompt.len(),
            "ClaudeModel generating text"
        );

        self.messages_request(prompt, system_prompt, parameters).await
    }

    async fn generate_structured(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        schema: &Value,
        parameters: Option<ModelParameters>,
    ) -> Result<StructuredResponse, ModelError> {
        debug!(
            model_id = %self.model_id,
            prompt_len = prompt.len(),
            "ClaudeModel generating structured output"
        );

        let schema_instruction = format!(
            "{}\n\nRespond with a single JSON object conforming to this JSON Schema, with no surrounding prose:\n{}",
            system_prompt.unwrap_or("You are a helpful assistant."),
            serde_json::to_string_pretty(schema)
                .map_err(|e| ModelError::SerializationError(e.to_string()))?
        );

        let response =
            self.messages_request(prompt, Some(&schema_instruction), parameters).await?;

        let data = extract_json(&response.content)?;
        check_required_properties(&data, schema)?;

        Ok(StructuredResponse { data, model_id: response.model_id, usage: response.usage })
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// Anthropic API request/response structures

#[derive(Debug, Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<ClaudeMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct ClaudeMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    content: Vec<ClaudeContentBlock>,
    usage: Option<ClaudeUsage>,
}

#[derive(Debug, Deserialize)]
struct ClaudeContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ClaudeUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claude_model_creation_with_api_key() {
        let model = ClaudeModel::with_api_key(
            "claude-3-5-sonnet-20241022".to_string(),
            "test-key".to_string(),
        );
        assert_eq!(model.model_id(), "claude-3-5-sonnet-20241022");
    }

    #[test]
    fn test_claude_request_serialization_skips_empty_options() {
        let request = ClaudeRequest {
            model: "claude-3-5-sonnet-20241022".to_string(),
            max_tokens: 100,
            messages: vec![ClaudeMessage { role: "user".to_string(), content: "hi".to_string() }],
            system: None,
            temperature: None,
            top_p: None,
            stop_sequences: None,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("system"));
        assert!(!json.contains("temperature"));
    }
}
