//! Research skill - information gathering for a topic.

use crate::skills::{
    ParameterKind, Skill, SkillCategory, SkillInput, SkillMetadata, SkillOutput, SkillParameter,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use slidesmith_abstraction::{extract_json, Model};
use std::sync::Arc;

/// Maximum reference text fed into a single prompt.
const REFERENCE_EXCERPT_LIMIT: usize = 5000;

/// Research skill - information gathering for a topic.
pub struct ResearchSkill {
    model: Option<Arc<dyn Model + Send + Sync>>,
}

impl ResearchSkill {
    /// Creates the skill. Without a model it can only report metadata.
    #[must_use]
    pub fn new(model: Option<Arc<dyn Model + Send + Sync>>) -> Self {
        Self { model }
    }

    fn build_prompt(topic: &str, language: &str, reference: Option<&str>, depth: &str) -> String {
        let depth_instruction = match depth {
            "quick" => "Summarize only 3-5 core points, quickly",
            "deep" => "Include in-depth analysis, multiple perspectives, and detailed data",
            _ => "Cover the main information, statistics, and trends in balance",
        };

        let reference_section = reference.map_or_else(String::new, |text| {
            let excerpt: String = text.chars().take(REFERENCE_EXCERPT_LIMIT).collect();
            format!("\n\nReference material:\n{excerpt}\n")
        });

        format!(
            "Research the following topic for a presentation.\n\n\
             Topic: {topic}\n\
             Research depth: {depth_instruction}\n\
             Output language: {language}{reference_section}\n\n\
             Gather:\n\
             1. Key points (key_points): the topic's core content\n\
             2. Statistics (statistics): relevant data\n\
             3. Quotes (quotes): quotable lines\n\
             4. Trends (trends): current developments\n\
             5. Summary (summary): an overall summary\n\n\
             Respond as JSON."
        )
    }

    /// Fallback when the response carries no JSON: keep the text as summary.
    fn parse_text_response(text: &str) -> Value {
        json!({
            "key_points": [],
            "statistics": [],
            "quotes": [],
            "trends": [],
            "summary": text.chars().take(500).collect::<String>(),
        })
    }
}

#[async_trait]
impl Skill for ResearchSkill {
    fn metadata(&self) -> SkillMetadata {
        SkillMetadata {
            name: "research".to_string(),
            display_name: "Topic Research".to_string(),
            description: "Gathers key points, statistics, quotes, and trends for a topic, \
                          optionally mining supplied reference material."
                .to_string(),
            category: SkillCategory::Research,
            command: "/research".to_string(),
            parameters: vec![
                SkillParameter::required("topic", ParameterKind::String, "Topic to research"),
                SkillParameter::optional("depth", ParameterKind::String, "Research depth")
                    .with_default(json!("normal"))
                    .with_choices(vec![json!("quick"), json!("normal"), json!("deep")]),
                SkillParameter::optional("language", ParameterKind::String, "Output language")
                    .with_default(json!("en")),
                SkillParameter::optional(
                    "reference",
                    ParameterKind::String,
                    "Reference material text",
                ),
            ],
            examples: vec![
                "/research \"AI trends 2026\"".to_string(),
                "/research \"Climate change\" --depth deep".to_string(),
                "/research \"Startup funding\" --language en".to_string(),
            ],
            requires: vec![],
            produces: vec!["research_findings".to_string()],
        }
    }

    async fn execute(&self, input: &SkillInput) -> anyhow::Result<SkillOutput> {
        let model =
            self.model.as_ref().ok_or_else(|| anyhow::anyhow!("research skill has no model"))?;

        let topic = input.string("topic").unwrap_or_default().to_string();
        let depth = input.string("depth").unwrap_or("normal").to_string();
        let language = input.string("language").unwrap_or("en").to_string();
        let reference = input.string("reference");

        let prompt = Self::build_prompt(&topic, &language, reference, &depth);
        let response = model.generate_text(&prompt, None, None).await?;

        let research_data = extract_json(&response.content)
            .unwrap_or_else(|_| Self::parse_text_response(&response.content));

        let data = json!({
            "topic": topic,
            "key_points": research_data.get("key_points").cloned().unwrap_or_else(|| json!([])),
            "statistics": research_data.get("statistics").cloned().unwrap_or_else(|| json!([])),
            "quotes": research_data.get("quotes").cloned().unwrap_or_else(|| json!([])),
            "trends": research_data.get("trends").cloned().unwrap_or_else(|| json!([])),
            "sources": research_data.get("sources").cloned().unwrap_or_else(|| json!([])),
            "summary": research_data.get("summary").cloned().unwrap_or_else(|| json!("")),
        });

        Ok(SkillOutput::success(data)
            .with_metadata("depth", json!(depth))
            .with_metadata("language", json!(language)))
    }
}
