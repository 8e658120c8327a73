//! Enhance skill - content, flow, and language improvement.

use crate::skills::{
    ParameterKind, Skill, SkillCategory, SkillInput, SkillMetadata, SkillOutput, SkillParameter,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use slidesmith_abstraction::{extract_json, Model};
use std::sync::Arc;
use tracing::debug;

/// Enhance skill - content, flow, and language improvement.
pub struct EnhanceSkill {
    model: Option<Arc<dyn Model + Send + Sync>>,
}

impl EnhanceSkill {
    /// Creates the skill. Without a model it can only report metadata.
    #[must_use]
    pub fn new(model: Option<Arc<dyn Model + Send + Sync>>) -> Self {
        Self { model }
    }

    fn extract_content(deck: &Value) -> Vec<Value> {
        deck.get("slides")
            .and_then(Value::as_array)
            .map(|slides| {
                slides
                    .iter()
                    .enumerate()
                    .map(|(i, slide)| {
                        let body = slide
                            .get("description")
                            .and_then(Value::as_str)
                            .filter(|text| !text.is_empty())
                            .or_else(|| slide.get("content").and_then(Value::as_str))
                            .unwrap_or_default();
                        json!({
                            "index": i,
                            "title": slide.get("title").and_then(Value::as_str).unwrap_or_default(),
                            "content": body,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn extract_structure(deck: &Value) -> Vec<Value> {
        deck.get("slides")
            .and_then(Value::as_array)
            .map(|slides| {
                slides
                    .iter()
                    .enumerate()
                    .map(|(i, slide)| {
                        json!({
                            "index": i,
                            "title": slide.get("title").and_then(Value::as_str).unwrap_or_default(),
                            "type": slide.get("type").and_then(Value::as_str).unwrap_or("content"),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn extract_text(deck: &Value) -> Vec<Value> {
        deck.get("slides")
            .and_then(Value::as_array)
            .map(|slides| {
                slides
                    .iter()
                    .enumerate()
                    .map(|(i, slide)| {
                        json!({
                            "index": i,
                            "texts": [
                                slide.get("title").and_then(Value::as_str).unwrap_or_default(),
                                slide.get("description").and_then(Value::as_str).unwrap_or_default(),
                                slide.get("key_message").and_then(Value::as_str).unwrap_or_default(),
                            ],
                        })
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    async fn improvements_from_model(
        &self,
        prompt: &str,
    ) -> anyhow::Result<Vec<Value>> {
        let model =
            self.model.as_ref().ok_or_else(|| anyhow::anyhow!("enhance skill has no model"))?;
        let response = model.generate_text(prompt, None, None).await?;
        match extract_json(&response.content) {
            Ok(Value::Array(improvements)) => Ok(improvements),
            Ok(_) | Err(_) => {
                debug!("improvement response did not decode to an array, skipping");
                Ok(Vec::new())
            }
        }
    }

    async fn enhance_content(
        &self,
        deck: &mut Value,
        intensity: &str,
    ) -> anyhow::Result<Vec<Value>> {
        let prompt = format!(
            "Improve the presentation content below.\n\n\
             Improvement intensity: {intensity}\n\
             Directions:\n\
             - Clarity: remove vague phrasing\n\
             - Brevity: delete the unnecessary\n\
             - Impact: strengthen the key messages\n\n\
             Current content:\n{}\n\n\
             Respond as a JSON array of improvements:\n\
             [{{\"slide_index\": 0, \"type\": \"content\", \"original\": \"...\", \
             \"improved\": \"...\", \"reason\": \"...\"}}]",
            serde_json::to_string(&Self::extract_content(deck))?
        );

        let improvements = self.improvements_from_model(&prompt).await?;
        Self::apply_improvements(deck, &improvements);
        Ok(improvements)
    }

    async fn enhance_flow(&self, deck: &Value, intensity: &str) -> anyhow::Result<Vec<Value>> {
        let prompt = format!(
            "Analyze and improve the logical flow of the presentation.\n\n\
             Improvement intensity: {intensity}\n\
             Analyze:\n\
             - Slide ordering logic\n\
             - Natural transitions\n\
             - Storytelling structure\n\n\
             Current structure:\n{}\n\n\
             Respond as a JSON array:\n\
             [{{\"type\": \"flow\", \"issue\": \"...\", \"suggestion\": \"...\", \
             \"priority\": \"high|medium|low\"}}]",
            serde_json::to_string(&Self::extract_structure(deck))?
        );

        self.improvements_from_model(&prompt).await
    }

    async fn enhance_language(
        &self,
        deck: &mut Value,
        intensity: &str,
    ) -> anyhow::Result<Vec<Value>> {
        let prompt = format!(
            "Improve the language and phrasing of the presentation.\n\n\
             Improvement intensity: {intensity}\n\
             Improve:\n\
             - Grammar mistakes\n\
             - Professional phrasing\n\
             - Tone appropriate for the audience\n\n\
             Current text:\n{}\n\n\
             Respond as a JSON array:\n\
             [{{\"slide_index\": 0, \"type\": \"language\", \"original\": \"...\", \
             \"improved\": \"...\", \"reason\": \"...\"}}]",
            serde_json::to_string(&Self::extract_text(deck))?
        );

        let improvements = self.improvements_from_model(&prompt).await?;
        Self::apply_improvements(deck, &improvements);
        Ok(improvements)
    }

    fn enhance_design() -> Vec<Value> {
        vec![json!({
            "type": "design",
            "suggestion": "Vary the layouts for visual diversity",
            "slides": [],
        })]
    }

    fn apply_improvements(deck: &mut Value, improvements: &[Value]) {
        let Some(slides) = deck.get_mut("slides").and_then(Value::as_array_mut) else {
            return;
        };

        for improvement in improvements {
            let Some(index) = improvement.get("slide_index").and_then(Value::as_u64) else {
                continue;
            };
            let Some(slide) = slides.get_mut(index as usize) else {
                continue;
            };
            let improved = improvement.get("improved").and_then(Value::as_str).unwrap_or_default();
            if improved.is_empty() {
                continue;
            }

            match improvement.get("type").and_then(Value::as_str) {
                Some("language") => {
                    // Replace whichever text field carried the original phrasing
                    let original =
                        improvement.get("original").and_then(Value::as_str).unwrap_or_default();
                    for key in ["title", "description", "key_message"] {
                        if slide.get(key).and_then(Value::as_str) == Some(original) {
                            slide[key] = json!(improved);
                            break;
                        }
                    }
                }
                _ => {
                    slide["description"] = json!(improved);
                }
            }
        }
    }
}

#[async_trait]
impl Skill for EnhanceSkill {
    fn metadata(&self) -> SkillMetadata {
        SkillMetadata {
            name: "enhance".to_string(),
            display_name: "Quality Enhancement".to_string(),
            description: "Improves the deck's content, flow, and language.".to_string(),
            category: SkillCategory::Enhancement,
            command: "/enhance".to_string(),
            parameters: vec![
                SkillParameter::optional("target", ParameterKind::String, "What to improve")
                    .with_default(json!("all"))
                    .with_choices(vec![
                        json!("all"),
                        json!("content"),
                        json!("design"),
                        json!("flow"),
                        json!("language"),
                    ]),
                SkillParameter::optional(
                    "slide_index",
                    ParameterKind::Integer,
                    "Specific slide index (-1 for the whole deck)",
                )
                .with_default(json!(-1)),
                SkillParameter::optional("intensity", ParameterKind::String, "How aggressively")
                    .with_default(json!("normal"))
                    .with_choices(vec![json!("light"), json!("normal"), json!("aggressive")]),
            ],
            examples: vec![
                "/enhance --target content".to_string(),
                "/enhance --slide_index 3 --target language".to_string(),
                "/enhance --intensity aggressive".to_string(),
            ],
            requires: vec!["outline".to_string()],
            produces: vec!["enhanced_deck".to_string()],
        }
    }

    async fn execute(&self, input: &SkillInput) -> anyhow::Result<SkillOutput> {
        let target = input.string("target").unwrap_or("all").to_string();
        let intensity = input.string("intensity").unwrap_or("normal").to_string();

        // The deck to improve: the context's working deck, else the outline
        // produced earlier in the pipeline
        let mut deck = input.context.deck.clone().or_else(|| {
            input
                .context
                .get_previous_output("outline")
                .filter(|output| output.success)
                .and_then(|output| output.data.clone())
        });

        let Some(deck) = deck.as_mut() else {
            return Ok(SkillOutput::failure("no deck to enhance"));
        };

        let mut improvements = Vec::new();
        match target.as_str() {
            "content" => improvements.extend(self.enhance_content(deck, &intensity).await?),
            "design" => improvements.extend(Self::enhance_design()),
            "flow" => improvements.extend(self.enhance_flow(deck, &intensity).await?),
            "language" => improvements.extend(self.enhance_language(deck, &intensity).await?),
            _ => {
                improvements.extend(self.enhance_content(deck, &intensity).await?);
                improvements.extend(self.enhance_flow(deck, &intensity).await?);
                improvements.extend(self.enhance_language(deck, &intensity).await?);
            }
        }

        let data = json!({
            "improvements": improvements,
            "enhanced_deck": deck.clone(),
            "improvement_count": improvements.len(),
        });

        Ok(SkillOutput::success(data)
            .with_metadata("target", json!(target))
            .with_metadata("intensity", json!(intensity)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skills::SkillContext;
    use slidesmith_models::MockModel;
    use std::collections::HashMap;

    fn skill() -> EnhanceSkill {
        EnhanceSkill::new(Some(Arc::new(MockModel::new("mock".to_string()))))
    }

    fn deck() -> Value {
        json!({
            "title": "Deck",
            "slides": [
                {"title": "One", "description": "first", "key_message": "m1"},
                {"title": "Two", "description": "second", "key_message": "m2"}
            ]
        })
    }

    #[tokio::test]
    async fn test_enhance_fails_without_deck() {
        let output = skill().run(SkillInput::default()).await;
        assert!(!output.success);
        assert!(output.error.unwrap().contains("no deck"));
    }

    #[tokio::test]
    async fn test_enhance_uses_outline_output() {
        let mut context = SkillContext::new();
        context
            .previous_outputs
            .insert("outline".to_string(), SkillOutput::success(deck()));

        let input = SkillInput { parameters: HashMap::new(), context };
        let output = skill().run(input).await;

        assert!(output.success);
        let data = output.data.unwrap();
        assert_eq!(data["enhanced_deck"]["title"], "Deck");
        assert_eq!(data["improvement_count"], json!(0));
    }

    #[tokio::test]
    async fn test_enhance_design_is_static_suggestion() {
        let mut context = SkillContext::new();
        context.deck = Some(deck());

        let mut parameters = HashMap::new();
        parameters.insert("target".to_string(), json!("design"));
        let input = SkillInput { parameters, context };
        let output = skill().run(input).await;

        assert!(output.success);
        assert_eq!(output.data.unwrap()["improvement_count"], json!(1));
    }

    #[test]
    fn test_apply_improvements_rewrites_description() {
        let mut deck = deck();
        let improvements = vec![json!({
            "slide_index": 1,
            "type": "content",
            "original": "second",
            "improved": "a sharper second",
        })];
        EnhanceSkill::apply_improvements(&mut deck, &improvements);
        assert_eq!(deck["slides"][1]["description"], "a sharper second");
    }

    #[test]
    fn test_apply_language_improvement_matches_field() {
        let mut deck = deck();
        let improvements = vec![json!({
            "slide_index": 0,
            "type": "language",
            "original": "m1",
            "improved": "a better message",
        })];
        EnhanceSkill::apply_improvements(&mut deck, &improvements);
        assert_eq!(deck["slides"][0]["key_message"], "a better message");
        // Other fields untouched
        assert_eq!(deck["slides"][0]["title"], "One");
    }
}
