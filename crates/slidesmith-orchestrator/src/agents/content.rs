//! Content agent - writes the slides.
//!
//! This is the only mandatory phase: a deck without written content is
//! unusable, so the orchestrator aborts the run when this agent fails.

use crate::context::{AgentConfig, DeckContent, GenerationContext, SlideContent};
use crate::error::AgentError;
use crate::structured::{add_usage, call_structured};
use crate::{Agent, AgentExecution, AgentOutput};
use async_trait::async_trait;
use serde_json::{json, Value};
use slidesmith_abstraction::{extract_json, Model};
use std::sync::Arc;
use tracing::debug;

/// Content agent - writes the slides.
pub struct ContentAgent {
    model: Arc<dyn Model + Send + Sync>,
    config: AgentConfig,
}

/// One slide entry in the generated outline.
struct OutlineSlide {
    title: String,
    description: String,
}

struct Outline {
    title: String,
    subtitle: String,
    slides: Vec<OutlineSlide>,
    narrative: String,
    takeaways: Vec<String>,
}

impl ContentAgent {
    /// Creates a content agent.
    #[must_use]
    pub fn new(model: Arc<dyn Model + Send + Sync>) -> Self {
        Self { model, config: AgentConfig::new() }
    }

    /// Overrides agent settings ("include_speaker_notes" skips the notes
    /// call when false).
    #[must_use]
    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    fn include_speaker_notes(&self) -> bool {
        self.config
            .get("include_speaker_notes")
            .and_then(Value::as_bool)
            .unwrap_or(true)
    }

    async fn generate_outline(
        &self,
        context: &GenerationContext,
        tokens: &mut u64,
    ) -> Result<Outline, AgentError> {
        let request = &context.request;

        let research_section = context.research.as_ref().map_or_else(String::new, |research| {
            format!(
                "\nResearch findings:\n- Key points: {}\n- Trends: {}\n- Summary: {}\n",
                research.key_points.iter().take(5).cloned().collect::<Vec<_>>().join(", "),
                research.trends.iter().take(3).cloned().collect::<Vec<_>>().join(", "),
                research.summary
            )
        });

        let prompt = format!(
            "Write a presentation outline from the information below.\n\n\
             Topic: {}\nSlide count: {}\nLanguage: {}\nAudience: {}\nPurpose: {}\n{}\n\
             The outline must include:\n\
             1. Presentation title\n\
             2. Subtitle (optional)\n\
             3. Title and a one-line description for every slide\n\
             4. The overall storyline\n\
             5. Key takeaways (3-5)\n\n\
             Respond as JSON.",
            request.topic,
            request.slide_count,
            request.language,
            request.audience.as_deref().unwrap_or("general"),
            request.purpose.as_deref().unwrap_or("inform"),
            research_section
        );

        let schema = json!({
            "type": "object",
            "properties": {
                "title": {"type": "string"},
                "subtitle": {"type": "string"},
                "slides": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "title": {"type": "string"},
                            "description": {"type": "string"}
                        }
                    }
                },
                "narrative": {"type": "string"},
                "takeaways": {"type": "array", "items": {"type": "string"}}
            },
            "required": ["title", "slides"]
        });

        let call =
            call_structured(self.model.as_ref(), &self.system_prompt(), &prompt, &schema).await?;
        add_usage(tokens, call.usage.as_ref());

        let slides = call
            .data
            .get("slides")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .map(|entry| OutlineSlide {
                        title: string_field(entry, "title"),
                        description: string_field(entry, "description"),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Outline {
            title: string_field(&call.data, "title"),
            subtitle: string_field(&call.data, "subtitle"),
            slides,
            narrative: string_field(&call.data, "narrative"),
            takeaways: string_array_field(&call.data, "takeaways"),
        })
    }

    async fn generate_single_slide(
        &self,
        context: &GenerationContext,
        slide_outline: &OutlineSlide,
        index: usize,
        total: usize,
        tokens: &mut u64,
    ) -> Result<SlideContent, AgentError> {
        let request = &context.request;

        let position = if index == 0 {
            "first (opening)".to_string()
        } else if index + 1 == total {
            "last (closing)".to_string()
        } else {
            format!("number {}", index + 1)
        };

        let prompt = format!(
            "Write the detailed content for one slide.\n\n\
             Slide position: {position} of {total}\n\
             Slide title: {}\n\
             Slide outline: {}\n\n\
             Audience: {}\nLanguage: {}\n\n\
             Guidelines:\n\
             - Title: clear and short (at most 10 words)\n\
             - Body: the essentials only (3-4 sentences or 3-5 bullet points)\n\
             - Key message: the one sentence the audience should remember\n\n\
             Respond as JSON.",
            slide_outline.title,
            slide_outline.description,
            request.audience.as_deref().unwrap_or("general"),
            request.language
        );

        let schema = json!({
            "type": "object",
            "properties": {
                "title": {"type": "string"},
                "body": {"type": "string"},
                "bullet_points": {"type": "array", "items": {"type": "string"}},
                "key_message": {"type": "string"}
            },
            "required": ["title"]
        });

        let call =
            call_structured(self.model.as_ref(), &self.system_prompt(), &prompt, &schema).await?;
        add_usage(tokens, call.usage.as_ref());

        let mut title = string_field(&call.data, "title");
        if title.is_empty() {
            title = slide_outline.title.clone();
        }

        Ok(SlideContent {
            index,
            title,
            body: string_field(&call.data, "body"),
            bullet_points: string_array_field(&call.data, "bullet_points"),
            notes: String::new(),
            transition_text: String::new(),
            key_message: string_field(&call.data, "key_message"),
        })
    }

    /// Generates speaker notes for the whole deck in one call. Best-effort:
    /// a response that does not decode leaves the notes empty.
    async fn generate_speaker_notes(
        &self,
        context: &GenerationContext,
        slides: &mut [SlideContent],
        tokens: &mut u64,
    ) -> Result<(), AgentError> {
        if slides.is_empty() {
            return Ok(());
        }

        let request = &context.request;
        let listing = slides
            .iter()
            .map(|slide| {
                let body = if slide.body.is_empty() {
                    slide.bullet_points.iter().take(3).cloned().collect::<Vec<_>>().join(", ")
                } else {
                    slide.body.chars().take(100).collect()
                };
                format!("[{}] {}: {}", slide.index + 1, slide.title, body)
            })
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = format!(
            "Write speaker notes for the slides below.\n\n\
             Presentation length: {} minutes\nAudience: {}\n\n\
             Slides:\n{listing}\n\n\
             For each slide write the points to explain, examples to mention, and \
             audience prompts where appropriate.\n\n\
             Respond as JSON: {{\"notes\": [\"slide 1 notes\", \"slide 2 notes\", ...]}}",
            request.duration_minutes.unwrap_or(10),
            request.audience.as_deref().unwrap_or("general")
        );

        let response =
            self.model.generate_text(&prompt, Some(&self.system_prompt()), None).await?;
        add_usage(tokens, response.usage.as_ref());

        match extract_json(&response.content) {
            Ok(value) => {
                if let Some(notes) = value.get("notes").and_then(Value::as_array) {
                    for (slide, note) in slides.iter_mut().zip(notes) {
                        if let Some(text) = note.as_str() {
                            slide.notes = text.to_string();
                        }
                    }
                }
            }
            Err(e) => {
                debug!(error = %e, "speaker notes did not decode, leaving notes empty");
            }
        }
        Ok(())
    }

    fn add_transitions(slides: &mut [SlideContent]) {
        for i in 1..slides.len() {
            let prev_title = slides[i - 1].title.clone();
            slides[i].transition_text = format!("Continuing from '{prev_title}'...");
        }
    }
}

#[async_trait]
impl Agent for ContentAgent {
    fn name(&self) -> &str {
        "content_agent"
    }

    fn description(&self) -> &str {
        "Writes the outline, slide content, and speaker notes"
    }

    fn system_prompt(&self) -> String {
        "You are a professional presentation writer. You turn the given \
         information into persuasive, well-structured presentation content.\n\n\
         Principles:\n\
         1. Build a clear storyline\n\
         2. One key message per slide\n\
         3. Short sentences with impact\n\
         4. Audience-centered content\n\
         5. Logical flow and transitions\n\n\
         Each slide includes:\n\
         - A clear, short title\n\
         - Body content or bullet points\n\
         - Speaker notes with detail\n\
         - The slide's key takeaway message"
            .to_string()
    }

    async fn execute(&self, context: &GenerationContext) -> Result<AgentExecution, AgentError> {
        let mut tokens = 0u64;

        // 1. Overall outline
        let outline = self.generate_outline(context, &mut tokens).await?;

        // 2. Per-slide detail
        let total = outline.slides.len();
        let mut slides = Vec::with_capacity(total);
        for (index, slide_outline) in outline.slides.iter().enumerate() {
            let slide = self
                .generate_single_slide(context, slide_outline, index, total, &mut tokens)
                .await?;
            slides.push(slide);
        }

        // 3. Speaker notes
        if self.include_speaker_notes() {
            self.generate_speaker_notes(context, &mut slides, &mut tokens).await?;
        }

        // 4. Transition phrases
        Self::add_transitions(&mut slides);

        let content = DeckContent {
            title: outline.title,
            subtitle: outline.subtitle,
            slides,
            overall_narrative: outline.narrative,
            key_takeaways: outline.takeaways,
        };

        let mut execution = AgentExecution::new(AgentOutput::Content(content));
        execution.tokens_used = tokens;
        Ok(execution)
    }
}

fn string_field(value: &Value, field: &str) -> String {
    value.get(field).and_then(Value::as_str).unwrap_or_default().to_string()
}

fn string_array_field(value: &Value, field: &str) -> Vec<String> {
    value
        .get(field)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::GenerationRequest;
    use slidesmith_abstraction::{
        ModelError, ModelParameters, ModelResponse, StructuredResponse,
    };

    /// Model that answers outline and slide calls with fixed JSON.
    struct ScriptedModel;

    #[async_trait]
    impl Model for ScriptedModel {
        async fn generate_text(
            &self,
            _prompt: &str,
            _system_prompt: Option<&str>,
            _parameters: Option<ModelParameters>,
        ) -> Result<ModelResponse, ModelError> {
            Ok(ModelResponse {
                content: r#"{"notes": ["opening note", "closing note"]}"#.to_string(),
                model_id: None,
                usage: None,
            })
        }

        async fn generate_structured(
            &self,
            prompt: &str,
            _system_prompt: Option<&str>,
            _schema: &Value,
            _parameters: Option<ModelParameters>,
        ) -> Result<StructuredResponse, ModelError> {
            let data = if prompt.contains("presentation outline") {
                json!({
                    "title": "Quarterly Results",
                    "subtitle": "Q3",
                    "slides": [
                        {"title": "Welcome", "description": "Opening"},
                        {"title": "Numbers", "description": "The figures"}
                    ],
                    "narrative": "From welcome to numbers",
                    "takeaways": ["Revenue is up"]
                })
            } else {
                json!({
                    "title": "Slide",
                    "body": "Body text",
                    "bullet_points": ["a", "b"],
                    "key_message": "Remember this"
                })
            };
            Ok(StructuredResponse { data, model_id: None, usage: None })
        }

        fn model_id(&self) -> &str {
            "scripted"
        }
    }

    #[tokio::test]
    async fn test_content_agent_builds_full_deck() {
        let agent = ContentAgent::new(Arc::new(ScriptedModel));
        let context = GenerationContext::new(GenerationRequest::new("Quarterly results"));
        let result = agent.run(&context).await;

        assert!(result.success);
        match result.output {
            Some(AgentOutput::Content(content)) => {
                assert_eq!(content.title, "Quarterly Results");
                assert_eq!(content.slides.len(), 2);
                assert_eq!(content.slides[0].notes, "opening note");
                assert!(content.slides[1].transition_text.contains("Slide"));
                assert_eq!(content.key_takeaways, vec!["Revenue is up".to_string()]);
            }
            other => panic!("unexpected output: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_content_agent_fails_when_model_fails() {
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

        let agent = ContentAgent::new(Arc::new(DownModel));
        let context = GenerationContext::new(GenerationRequest::new("topic"));
        let result = agent.run(&context).await;

        assert!(!result.success);
        assert!(result.output.is_none());
        assert!(result.error.unwrap().contains("down"));
    }

    #[test]
    fn test_transitions_reference_previous_titles() {
        let mut slides = vec![
            SlideContent { index: 0, title: "One".to_string(), ..SlideContent::default() },
            SlideContent { index: 1, title: "Two".to_string(), ..SlideContent::default() },
        ];
        ContentAgent::add_transitions(&mut slides);
        assert!(slides[0].transition_text.is_empty());
        assert_eq!(slides[1].transition_text, "Continuing from 'One'...");
    }
}
