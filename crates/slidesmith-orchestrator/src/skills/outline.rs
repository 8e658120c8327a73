//! Outline skill - presentation structure generation.

use crate::skills::{
    ParameterKind, Skill, SkillCategory, SkillInput, SkillMetadata, SkillOutput, SkillParameter,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use slidesmith_abstraction::{extract_json, Model};
use std::sync::Arc;

/// Outline skill - presentation structure generation.
pub struct OutlineSkill {
    model: Option<Arc<dyn Model + Send + Sync>>,
}

impl OutlineSkill {
    /// Creates the skill. Without a model it can only report metadata.
    #[must_use]
    pub fn new(model: Option<Arc<dyn Model + Send + Sync>>) -> Self {
        Self { model }
    }

    fn build_prompt(
        topic: &str,
        slide_count: i64,
        purpose: &str,
        audience: Option<&str>,
        research_data: Option<&Value>,
        template_structure: Option<&Value>,
    ) -> String {
        let purpose_instruction = match purpose {
            "persuade" => "Persuade the audience and drive action",
            "educate" => "Educational and easy to understand",
            "inspire" => "Inspire and motivate",
            _ => "Convey information clearly",
        };

        let research_section = research_data.map_or_else(String::new, |data| {
            let key_points = data
                .get("key_points")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .take(5)
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .unwrap_or_default();
            let trends = data
                .get("trends")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .take(3)
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .unwrap_or_default();
            let summary: String = data
                .get("summary")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .chars()
                .take(300)
                .collect();
            format!(
                "\n\nResearch findings:\n- Key points: {key_points}\n- Trends: {trends}\n- Summary: {summary}\n"
            )
        });

        let template_section = template_structure.map_or_else(String::new, |structure| {
            format!(
                "\n\nRecommended slide structure:\n{}\n",
                serde_json::to_string_pretty(structure).unwrap_or_default()
            )
        });

        format!(
            "Generate a presentation outline.\n\n\
             Topic: {topic}\n\
             Slide count: {slide_count}\n\
             Purpose: {purpose_instruction}\n\
             Audience: {}{research_section}{template_section}\n\n\
             Respond as JSON in this shape:\n\
             {{\n\
               \"title\": \"presentation title\",\n\
               \"subtitle\": \"subtitle\",\n\
               \"slides\": [\n\
                 {{\"index\": 0, \"title\": \"slide title\", \
             \"type\": \"title|content|bullets|chart|quote|conclusion\", \
             \"description\": \"what the slide covers\", \
             \"key_message\": \"the key message\"}}\n\
               ],\n\
               \"narrative\": \"the overall storyline\",\n\
               \"takeaways\": [\"takeaway 1\", \"takeaway 2\"]\n\
             }}",
            audience.unwrap_or("general")
        )
    }

    fn template_structure(template_id: &str) -> Option<Value> {
        match template_id {
            "pitch_deck" => Some(json!([
                {"type": "title", "name": "Cover"},
                {"type": "problem", "name": "Problem"},
                {"type": "solution", "name": "Solution"},
                {"type": "market", "name": "Market size"},
                {"type": "business_model", "name": "Business model"},
                {"type": "team", "name": "Team"},
                {"type": "ask", "name": "The ask"}
            ])),
            "quarterly_report" => Some(json!([
                {"type": "title", "name": "Cover"},
                {"type": "highlights", "name": "Highlights"},
                {"type": "metrics", "name": "Key metrics"},
                {"type": "analysis", "name": "Analysis"},
                {"type": "challenges", "name": "Challenges"},
                {"type": "next_steps", "name": "Next steps"}
            ])),
            _ => None,
        }
    }

    /// Fallback when the response carries no JSON: one slide per line.
    fn parse_text_outline(text: &str, slide_count: i64) -> Value {
        let slides: Vec<Value> = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .take(slide_count.max(0) as usize)
            .enumerate()
            .map(|(i, line)| {
                json!({
                    "index": i,
                    "title": line.trim(),
                    "type": if i == 0 { "title" } else { "content" },
                    "description": "",
                    "key_message": "",
                })
            })
            .collect();

        let title = slides
            .first()
            .and_then(|slide| slide.get("title"))
            .cloned()
            .unwrap_or_else(|| json!("Untitled"));

        json!({"title": title, "slides": slides})
    }
}

#[async_trait]
impl Skill for OutlineSkill {
    fn metadata(&self) -> SkillMetadata {
        SkillMetadata {
            name: "outline".to_string(),
            display_name: "Outline Generation".to_string(),
            description: "Generates a presentation outline from the topic and any prior \
                          research results."
                .to_string(),
            category: SkillCategory::Content,
            command: "/outline".to_string(),
            parameters: vec![
                SkillParameter::required("topic", ParameterKind::String, "Presentation topic"),
                SkillParameter::optional("slide_count", ParameterKind::Integer, "Slide count")
                    .with_default(json!(10)),
                SkillParameter::optional("purpose", ParameterKind::String, "Presentation purpose")
                    .with_default(json!("inform"))
                    .with_choices(vec![
                        json!("inform"),
                        json!("persuade"),
                        json!("educate"),
                        json!("inspire"),
                    ]),
                SkillParameter::optional("audience", ParameterKind::String, "Target audience"),
                SkillParameter::optional("template", ParameterKind::String, "Template ID"),
            ],
            examples: vec![
                "/outline \"AI trends\" --slide_count 12".to_string(),
                "/outline \"Investment proposal\" --purpose persuade --template pitch_deck"
                    .to_string(),
            ],
            requires: vec!["research".to_string()],
            produces: vec!["outline".to_string()],
        }
    }

    async fn execute(&self, input: &SkillInput) -> anyhow::Result<SkillOutput> {
        let model =
            self.model.as_ref().ok_or_else(|| anyhow::anyhow!("outline skill has no model"))?;

        let topic = input.string("topic").unwrap_or_default().to_string();
        let slide_count = input.integer("slide_count").unwrap_or(10);
        let purpose = input.string("purpose").unwrap_or("inform").to_string();
        let audience = input.string("audience");
        let template = input.string("template");

        // Prior research output, when the pipeline ran it
        let research_data = input
            .context
            .get_previous_output("research")
            .filter(|output| output.success)
            .and_then(|output| output.data.clone());

        let template_structure = template.and_then(Self::template_structure);

        let prompt = Self::build_prompt(
            &topic,
            slide_count,
            &purpose,
            audience,
            research_data.as_ref(),
            template_structure.as_ref(),
        );

        let response = model.generate_text(&prompt, None, None).await?;
        let outline_data = extract_json(&response.content)
            .unwrap_or_else(|_| Self::parse_text_outline(&response.content, slide_count));

        let slides = outline_data.get("slides").cloned().unwrap_or_else(|| json!([]));
        let slide_total = slides.as_array().map_or(0, Vec::len);

        let data = json!({
            "title": outline_data.get("title").cloned().unwrap_or_else(|| json!(topic)),
            "subtitle": outline_data.get("subtitle").cloned().unwrap_or_else(|| json!("")),
            "slides": slides,
            "narrative": outline_data.get("narrative").cloned().unwrap_or_else(|| json!("")),
            "key_takeaways": outline_data.get("takeaways").cloned().unwrap_or_else(|| json!([])),
        });

        Ok(SkillOutput::success(data).with_metadata("slide_count", json!(slide_total)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skills::SkillContext;
    use slidesmith_models::MockModel;
    use std::collections::HashMap;

    fn skill() -> OutlineSkill {
        OutlineSkill::new(Some(Arc::new(MockModel::new("mock".to_string()))))
    }

    #[tokio::test]
    async fn test_outline_from_text_fallback() {
        let mut parameters = HashMap::new();
        parameters.insert("topic".to_string(), json!("AI trends"));
        let output = skill().run(SkillInput::from_parameters(parameters)).await;

        assert!(output.success);
        let data = output.data.unwrap();
        assert!(!data["slides"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_outline_reads_prior_research() {
        let mut context = SkillContext::new();
        context.previous_outputs.insert(
            "research".to_string(),
            SkillOutput::success(json!({
                "key_points": ["a", "b"],
                "trends": ["t"],
                "summary": "short"
            })),
        );

        let mut parameters = HashMap::new();
        parameters.insert("topic".to_string(), json!("AI trends"));
        let input = SkillInput { parameters, context };

        let output = skill().run(input).await;
        assert!(output.success);
    }

    #[test]
    fn test_template_structures_exist() {
        assert!(OutlineSkill::template_structure("pitch_deck").is_some());
        assert!(OutlineSkill::template_structure("quarterly_report").is_some());
        assert!(OutlineSkill::template_structure("unknown").is_none());
    }

    #[test]
    fn test_parse_text_outline_limits_slides() {
        let text = "One\nTwo\nThree\nFour";
        let outline = OutlineSkill::parse_text_outline(text, 2);
        assert_eq!(outline["slides"].as_array().unwrap().len(), 2);
        assert_eq!(outline["title"], "One");
    }
}
