//! Shared structured-output helper for the agents.

use crate::error::AgentError;
use serde_json::Value;
use slidesmith_abstraction::{Model, ModelError, ModelUsage};
use tracing::warn;

/// Outcome of a structured model call.
pub(crate) struct StructuredCall {
    pub data: Value,
    pub usage: Option<ModelUsage>,
}

/// Calls the model for schema-constrained output, retrying exactly once with
/// an explicit JSON-only instruction when the first response fails to
/// decode. Any further failure surfaces as a unit-level error.
pub(crate) async fn call_structured(
    model: &dyn Model,
    system_prompt: &str,
    prompt: &str,
    schema: &Value,
) -> Result<StructuredCall, AgentError> {
    match model.generate_structured(prompt, Some(system_prompt), schema, None).await {
        Ok(response) => Ok(StructuredCall { data: response.data, usage: response.usage }),
        Err(ModelError::SerializationError(first_error)) => {
            warn!(error = %first_error, "structured output did not decode, re-prompting once");

            let retry_prompt = format!(
                "{prompt}\n\nRespond with valid JSON only. No prose, no markdown fences."
            );
            match model.generate_structured(&retry_prompt, Some(system_prompt), schema, None).await
            {
                Ok(response) => Ok(StructuredCall { data: response.data, usage: response.usage }),
                Err(retry_error) => Err(AgentError::Decode(format!(
                    "{retry_error} (first attempt: {first_error})"
                ))),
            }
        }
        Err(e) => Err(AgentError::Model(e)),
    }
}

/// Adds an optional usage record into a running token total.
pub(crate) fn add_usage(total: &mut u64, usage: Option<&ModelUsage>) {
    if let Some(usage) = usage {
        *total += u64::from(usage.total_tokens);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use slidesmith_abstraction::{ModelParameters, ModelResponse, StructuredResponse};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// A model whose first N structured calls fail to decode.
    struct FlakyModel {
        failures: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Model for FlakyModel {
        async fn generate_text(
            &self,
            _prompt: &str,
            _system_prompt: Option<&str>,
            _parameters: Option<ModelParameters>,
        ) -> Result<ModelResponse, ModelError> {
            Ok(ModelResponse { content: String::new(), model_id: None, usage: None })
        }

        async fn generate_structured(
            &self,
            _prompt: &str,
            _system_prompt: Option<&str>,
            _schema: &Value,
            _parameters: Option<ModelParameters>,
        ) -> Result<StructuredResponse, ModelError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(ModelError::SerializationError("not json".to_string()))
            } else {
                Ok(StructuredResponse { data: json!({"ok": true}), model_id: None, usage: None })
            }
        }

        fn model_id(&self) -> &str {
            "flaky"
        }
    }

    #[tokio::test]
    async fn test_first_attempt_success() {
        let model = FlakyModel { failures: 0, calls: AtomicUsize::new(0) };
        let result = call_structured(&model, "sys", "prompt", &json!({})).await.unwrap();
        assert_eq!(result.data["ok"], true);
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_single_reprompt_recovers() {
        let model = FlakyModel { failures: 1, calls: AtomicUsize::new(0) };
        let result = call_structured(&model, "sys", "prompt", &json!({})).await.unwrap();
        assert_eq!(result.data["ok"], true);
        assert_eq!(model.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_never_retries_more_than_once() {
        let model = FlakyModel { failures: 2, calls: AtomicUsize::new(0) };
        let result = call_structured(&model, "sys", "prompt", &json!({})).await;
        assert!(matches!(result, Err(AgentError::Decode(_))));
        assert_eq!(model.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_non_decode_errors_pass_through() {
        struct DownModel;

        #[async_trait]
        impl Model for DownModel {
            async fn generate_text(
                &self,
                _prompt: &str,
                _system_prompt: Option<&str>,
                _parameters: Option<ModelParameters>,
            ) -> Result<ModelResponse, ModelError> {
                Err(ModelError::RequestError("down".to_string()))
            }

            async fn generate_structured(
                &self,
                _prompt: &str,
                _system_prompt: Option<&str>,
                _schema: &Value,
                _parameters: Option<ModelParameters>,
            ) -> Result<StructuredResponse, ModelError> {
                Err(ModelError::RequestError("down".to_string()))
            }

            fn model_id(&self) -> &str {
                "down"
            }
        }

        let result = call_structured(&DownModel, "sys", "prompt", &json!({})).await;
        assert!(matches!(result, Err(AgentError::Model(ModelError::RequestError(_)))));
    }
}
