//! Export skill - writes the deck to disk.
//!
//! Native JSON and Markdown are handled here; binary presentation formats
//! belong to external exporters and yield a typed unsupported-format
//! failure.

use crate::skills::{
    ParameterKind, Skill, SkillCategory, SkillInput, SkillMetadata, SkillOutput, SkillParameter,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use slidesmith_abstraction::Model;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Export skill - writes the deck to disk.
pub struct ExportSkill {
    // The model is unused; exporting is pure serialization. Kept so the
    // constructor signature matches every other skill in the registry.
    _model: Option<Arc<dyn Model + Send + Sync>>,
}

impl ExportSkill {
    /// Creates the skill.
    #[must_use]
    pub fn new(model: Option<Arc<dyn Model + Send + Sync>>) -> Self {
        Self { _model: model }
    }

    fn generate_output_path(deck: &Value, format: &str) -> PathBuf {
        let title = deck.get("title").and_then(Value::as_str).unwrap_or("presentation");
        let safe_title: String = title
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '-' || *c == '_')
            .collect();
        let safe_title = safe_title.trim();
        let stem = if safe_title.is_empty() { "presentation" } else { safe_title };
        PathBuf::from("output").join(format!("{stem}.{format}"))
    }

    fn export_json(deck: &Value, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(deck)?)?;
        Ok(())
    }

    fn export_markdown(deck: &Value, path: &Path, include_notes: bool) -> anyhow::Result<()> {
        let mut markdown = String::new();

        let title = deck.get("title").and_then(Value::as_str).unwrap_or("Presentation");
        markdown.push_str(&format!("# {title}\n"));
        if let Some(subtitle) = deck.get("subtitle").and_then(Value::as_str) {
            if !subtitle.is_empty() {
                markdown.push_str(&format!("\n_{subtitle}_\n"));
            }
        }

        if let Some(slides) = deck.get("slides").and_then(Value::as_array) {
            for (i, slide) in slides.iter().enumerate() {
                let slide_title = slide.get("title").and_then(Value::as_str).unwrap_or("");
                markdown.push_str(&format!("\n---\n\n## {}. {slide_title}\n", i + 1));

                let body = slide
                    .get("description")
                    .and_then(Value::as_str)
                    .filter(|text| !text.is_empty())
                    .or_else(|| slide.get("body").and_then(Value::as_str))
                    .or_else(|| slide.get("content").and_then(Value::as_str))
                    .unwrap_or("");
                if !body.is_empty() {
                    markdown.push_str(&format!("\n{body}\n"));
                }

                if let Some(bullets) = slide.get("bullet_points").and_then(Value::as_array) {
                    for bullet in bullets.iter().filter_map(Value::as_str) {
                        markdown.push_str(&format!("- {bullet}\n"));
                    }
                }

                if include_notes {
                    if let Some(notes) = slide.get("notes").and_then(Value::as_str) {
                        if !notes.is_empty() {
                            markdown.push_str(&format!("\n> Notes: {notes}\n"));
                        }
                    }
                }
            }
        }

        if let Some(takeaways) = deck.get("key_takeaways").and_then(Value::as_array) {
            if !takeaways.is_empty() {
                markdown.push_str("\n---\n\n## Key takeaways\n\n");
                for takeaway in takeaways.iter().filter_map(Value::as_str) {
                    markdown.push_str(&format!("- {takeaway}\n"));
                }
            }
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, markdown)?;
        Ok(())
    }
}

#[async_trait]
impl Skill for ExportSkill {
    fn metadata(&self) -> SkillMetadata {
        SkillMetadata {
            name: "export".to_string(),
            display_name: "Export".to_string(),
            description: "Writes the presentation to disk as JSON or Markdown.".to_string(),
            category: SkillCategory::Export,
            command: "/export".to_string(),
            parameters: vec![
                SkillParameter::optional("format", ParameterKind::String, "Output format")
                    .with_default(json!("json"))
                    .with_choices(vec![json!("json"), json!("markdown")]),
                SkillParameter::optional("output_path", ParameterKind::String, "Output path"),
                SkillParameter::optional(
                    "include_notes",
                    ParameterKind::Boolean,
                    "Include speaker notes",
                )
                .with_default(json!(true)),
            ],
            examples: vec![
                "/export --format json".to_string(),
                "/export --format markdown --output_path ./out/deck.md".to_string(),
            ],
            requires: vec!["outline".to_string()],
            produces: vec!["exported_file".to_string()],
        }
    }

    async fn execute(&self, input: &SkillInput) -> anyhow::Result<SkillOutput> {
        let format = input.string("format").unwrap_or("json").to_string();
        let include_notes = input.boolean("include_notes").unwrap_or(true);

        // The deck to export: the context's working deck, else the latest
        // pipeline output that produced one
        let deck = input.context.deck.clone().or_else(|| {
            ["enhance", "outline"].iter().find_map(|name| {
                input
                    .context
                    .get_previous_output(name)
                    .filter(|output| output.success)
                    .and_then(|output| output.data.clone())
                    .map(|data| {
                        data.get("enhanced_deck").cloned().unwrap_or(data)
                    })
            })
        });

        let Some(deck) = deck else {
            return Ok(SkillOutput::failure("no deck to export"));
        };

        let path = input
            .string("output_path")
            .map(PathBuf::from)
            .unwrap_or_else(|| Self::generate_output_path(&deck, &format));

        match format.as_str() {
            "json" => Self::export_json(&deck, &path)?,
            "markdown" => Self::export_markdown(&deck, &path, include_notes)?,
            other => {
                return Ok(SkillOutput::failure(format!("unsupported format: {other}")));
            }
        }

        let file_size = fs::metadata(&path).map(|meta| meta.len()).unwrap_or(0);

        Ok(SkillOutput::success(json!({
            "format": format,
            "output_path": path.to_string_lossy(),
            "file_size": file_size,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skills::SkillContext;
    use std::collections::HashMap;

    fn deck() -> Value {
        json!({
            "title": "Quarterly Results",
            "subtitle": "Q3",
            "slides": [
                {"title": "Opening", "description": "Welcome", "notes": "smile"},
                {"title": "Numbers", "bullet_points": ["up 10%", "down 2%"]}
            ],
            "key_takeaways": ["Revenue is up"]
        })
    }

    fn input_with_deck(extra: &[(&str, Value)]) -> SkillInput {
        let mut context = SkillContext::new();
        context.deck = Some(deck());
        let mut parameters = HashMap::new();
        for (key, value) in extra {
            parameters.insert((*key).to_string(), value.clone());
        }
        SkillInput { parameters, context }
    }

    #[tokio::test]
    async fn test_export_fails_without_deck() {
        let skill = ExportSkill::new(None);
        let output = skill.run(SkillInput::default()).await;
        assert!(!output.success);
        assert!(output.error.unwrap().contains("no deck"));
    }

    #[tokio::test]
    async fn test_export_json_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deck.json");

        let skill = ExportSkill::new(None);
        let output = skill
            .run(input_with_deck(&[("output_path", json!(path.to_string_lossy()))]))
            .await;

        assert!(output.success);
        let data = output.data.unwrap();
        assert!(data["file_size"].as_u64().unwrap() > 0);

        let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["title"], "Quarterly Results");
    }

    #[tokio::test]
    async fn test_export_markdown_includes_notes_and_bullets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deck.md");

        let skill = ExportSkill::new(None);
        let output = skill
            .run(input_with_deck(&[
                ("format", json!("markdown")),
                ("output_path", json!(path.to_string_lossy())),
            ]))
            .await;

        assert!(output.success);
        let markdown = fs::read_to_string(&path).unwrap();
        assert!(markdown.contains("# Quarterly Results"));
        assert!(markdown.contains("- up 10%"));
        assert!(markdown.contains("> Notes: smile"));
        assert!(markdown.contains("## Key takeaways"));
    }

    #[tokio::test]
    async fn test_export_unsupported_format_fails() {
        let skill = ExportSkill::new(None);
        let output = skill.run(input_with_deck(&[("format", json!("pptx"))])).await;
        assert!(!output.success);
        assert!(output.error.unwrap().contains("must be one of"));
    }

    #[test]
    fn test_output_path_sanitizes_title() {
        let deck = json!({"title": "Q3: The <Best> Quarter!"});
        let path = ExportSkill::generate_output_path(&deck, "json");
        assert_eq!(path, PathBuf::from("output/Q3 The Best Quarter.json"));
    }

    #[tokio::test]
    async fn test_export_prefers_enhanced_deck_from_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deck.json");

        let mut context = SkillContext::new();
        context.previous_outputs.insert(
            "enhance".to_string(),
            SkillOutput::success(json!({
                "enhanced_deck": {"title": "Enhanced", "slides": []},
                "improvements": [],
            })),
        );

        let mut parameters = HashMap::new();
        parameters.insert("output_path".to_string(), json!(path.to_string_lossy()));
        let input = SkillInput { parameters, context };

        let output = ExportSkill::new(None).run(input).await;
        assert!(output.success);
        let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["title"], "Enhanced");
    }
}
