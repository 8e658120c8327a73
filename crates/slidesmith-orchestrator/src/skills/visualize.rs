//! Visualize skill - turns raw data into chart definitions.
//!
//! Entirely local: parsing, chart-type inference, and chart assembly need
//! no model call.

use crate::skills::{
    ParameterKind, Skill, SkillCategory, SkillInput, SkillMetadata, SkillOutput, SkillParameter,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use slidesmith_abstraction::Model;
use std::sync::Arc;

/// Visualize skill - turns raw data into chart definitions.
pub struct VisualizeSkill {
    // The model is unused today; visualization is rule-based. Kept so the
    // constructor signature matches every other skill in the registry.
    _model: Option<Arc<dyn Model + Send + Sync>>,
}

struct ParsedData {
    labels: Vec<String>,
    values: Vec<f64>,
}

impl VisualizeSkill {
    /// Creates the skill.
    #[must_use]
    pub fn new(model: Option<Arc<dyn Model + Send + Sync>>) -> Self {
        Self { _model: model }
    }

    /// Parses JSON, "label: value" pairs, or bare number lists.
    fn parse_data(data: &str) -> ParsedData {
        if let Ok(value) = serde_json::from_str::<Value>(data) {
            let labels = value
                .get("labels")
                .and_then(Value::as_array)
                .map(|items| {
                    items.iter().filter_map(Value::as_str).map(str::to_string).collect()
                })
                .unwrap_or_default();
            let values = value
                .get("values")
                .and_then(Value::as_array)
                .map(|items| items.iter().filter_map(Value::as_f64).collect())
                .unwrap_or_default();
            return ParsedData { labels, values };
        }

        let mut labels = Vec::new();
        let mut values = Vec::new();

        if data.contains(':') {
            // "A: 40%, B: 30%" form
            for pair in data.split(',') {
                if let Some((label, value_text)) = pair.split_once(':') {
                    let cleaned = value_text.trim().trim_end_matches('%');
                    if let Ok(value) = cleaned.parse::<f64>() {
                        labels.push(label.trim().to_string());
                        values.push(value);
                    }
                }
            }
        } else if data.chars().any(|c| c.is_ascii_digit()) {
            for part in data.replace(',', " ").split_whitespace() {
                if let Ok(value) = part.parse::<f64>() {
                    values.push(value);
                }
            }
            labels = (0..values.len()).map(|i| format!("Item {}", i + 1)).collect();
        }

        ParsedData { labels, values }
    }

    /// Infers the chart type: shares summing to ~100 become a pie, four or
    /// more monotonic values become a line, everything else a bar.
    fn determine_chart_type(data: &ParsedData) -> &'static str {
        if data.values.is_empty() {
            return "bar";
        }

        let total: f64 = data.values.iter().sum();
        if (95.0..=105.0).contains(&total) {
            return "pie";
        }

        if data.values.len() >= 4 {
            let diffs: Vec<f64> =
                data.values.windows(2).map(|pair| pair[1] - pair[0]).collect();
            if diffs.iter().all(|d| *d >= 0.0) || diffs.iter().all(|d| *d <= 0.0) {
                return "line";
            }
        }

        "bar"
    }

    fn color_palette(style: &str) -> Vec<&'static str> {
        match style {
            "colorful" => vec!["#e53e3e", "#38a169", "#3182ce", "#d69e2e", "#805ad5"],
            "minimal" => vec!["#4a5568", "#718096", "#a0aec0", "#cbd5e0", "#e2e8f0"],
            "bold" => vec!["#1a365d", "#2c7a7b", "#744210", "#553c9a", "#9b2c2c"],
            _ => vec!["#3182ce", "#48bb78", "#ed8936", "#9f7aea", "#f56565"],
        }
    }

    fn build_chart(data: &ParsedData, chart_type: &str, title: &str, style: &str) -> Value {
        let colors = Self::color_palette(style);
        let used_colors: Vec<&str> = colors.into_iter().take(data.values.len().max(1)).collect();

        match chart_type {
            "pie" => json!({
                "type": "pie",
                "title": title,
                "data": {
                    "labels": data.labels,
                    "datasets": [{
                        "data": data.values,
                        "backgroundColor": used_colors,
                    }]
                }
            }),
            "line" => json!({
                "type": "line",
                "title": title,
                "data": {
                    "labels": data.labels,
                    "datasets": [{
                        "label": if title.is_empty() { "Data" } else { title },
                        "data": data.values,
                        "borderColor": used_colors.first().copied().unwrap_or("#3182ce"),
                        "fill": false,
                    }]
                }
            }),
            _ => json!({
                "type": "bar",
                "title": title,
                "data": {
                    "labels": data.labels,
                    "datasets": [{
                        "label": if title.is_empty() { "Data" } else { title },
                        "data": data.values,
                        "backgroundColor": used_colors,
                    }]
                }
            }),
        }
    }

    fn recommended_size(chart_type: &str) -> Value {
        match chart_type {
            "pie" => json!({"width": 500, "height": 500}),
            "line" => json!({"width": 800, "height": 400}),
            "timeline" => json!({"width": 900, "height": 300}),
            "process" => json!({"width": 800, "height": 200}),
            "bar" => json!({"width": 700, "height": 400}),
            _ => json!({"width": 600, "height": 400}),
        }
    }
}

#[async_trait]
impl Skill for VisualizeSkill {
    fn metadata(&self) -> SkillMetadata {
        SkillMetadata {
            name: "visualize".to_string(),
            display_name: "Data Visualization".to_string(),
            description: "Turns data into charts, diagrams, and infographics.".to_string(),
            category: SkillCategory::Design,
            command: "/visualize".to_string(),
            parameters: vec![
                SkillParameter::required(
                    "data",
                    ParameterKind::String,
                    "The data to visualize (text or JSON)",
                ),
                SkillParameter::optional("type", ParameterKind::String, "Visualization type")
                    .with_default(json!("auto"))
                    .with_choices(vec![
                        json!("auto"),
                        json!("bar"),
                        json!("line"),
                        json!("pie"),
                        json!("timeline"),
                        json!("process"),
                        json!("comparison"),
                    ]),
                SkillParameter::optional("title", ParameterKind::String, "Chart title"),
                SkillParameter::optional("style", ParameterKind::String, "Visual style")
                    .with_default(json!("clean"))
                    .with_choices(vec![
                        json!("clean"),
                        json!("colorful"),
                        json!("minimal"),
                        json!("bold"),
                    ]),
            ],
            examples: vec![
                "/visualize \"Revenue: 100, 120, 150, 180\" --type bar".to_string(),
                "/visualize \"A: 40%, B: 30%, C: 20%, D: 10%\" --type pie".to_string(),
            ],
            requires: vec![],
            produces: vec!["chart_data".to_string(), "visualization".to_string()],
        }
    }

    async fn execute(&self, input: &SkillInput) -> anyhow::Result<SkillOutput> {
        let data_text = input.string("data").unwrap_or_default();
        let requested_type = input.string("type").unwrap_or("auto").to_string();
        let title = input.string("title").unwrap_or_default().to_string();
        let style = input.string("style").unwrap_or("clean").to_string();

        let parsed = Self::parse_data(data_text);

        let chart_type = if requested_type == "auto" {
            Self::determine_chart_type(&parsed).to_string()
        } else {
            requested_type
        };

        let chart_data = Self::build_chart(&parsed, &chart_type, &title, &style);

        let data = json!({
            "chart_type": chart_type,
            "chart_data": chart_data,
            "style": style,
            "recommended_size": Self::recommended_size(&chart_type),
        });

        Ok(SkillOutput::success(data).with_metadata("visualization_type", json!(chart_type)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn run_with(data: &str, extra: &[(&str, Value)]) -> SkillInput {
        let mut parameters = HashMap::new();
        parameters.insert("data".to_string(), json!(data));
        for (key, value) in extra {
            parameters.insert((*key).to_string(), value.clone());
        }
        SkillInput::from_parameters(parameters)
    }

    #[tokio::test]
    async fn test_percentages_become_a_pie() {
        let skill = VisualizeSkill::new(None);
        let output = skill.run(run_with("A: 40%, B: 30%, C: 20%, D: 10%", &[])).await;
        assert!(output.success);
        assert_eq!(output.data.unwrap()["chart_type"], "pie");
    }

    #[tokio::test]
    async fn test_monotonic_series_becomes_a_line() {
        let skill = VisualizeSkill::new(None);
        let output = skill.run(run_with("Q1: 100, Q2: 120, Q3: 150, Q4: 180", &[])).await;
        assert!(output.success);
        assert_eq!(output.data.unwrap()["chart_type"], "line");
    }

    #[tokio::test]
    async fn test_explicit_type_wins_over_auto() {
        let skill = VisualizeSkill::new(None);
        let output = skill
            .run(run_with("A: 40%, B: 30%, C: 20%, D: 10%", &[("type", json!("bar"))]))
            .await;
        assert_eq!(output.data.unwrap()["chart_type"], "bar");
    }

    #[test]
    fn test_parse_bare_numbers_gets_generated_labels() {
        let parsed = VisualizeSkill::parse_data("10 25 17");
        assert_eq!(parsed.values, vec![10.0, 25.0, 17.0]);
        assert_eq!(parsed.labels[0], "Item 1");
    }

    #[test]
    fn test_parse_json_input() {
        let parsed =
            VisualizeSkill::parse_data(r#"{"labels": ["x", "y"], "values": [1, 2]}"#);
        assert_eq!(parsed.labels, vec!["x", "y"]);
        assert_eq!(parsed.values, vec![1.0, 2.0]);
    }

    #[test]
    fn test_empty_data_defaults_to_bar() {
        let parsed = VisualizeSkill::parse_data("no numbers here");
        assert_eq!(VisualizeSkill::determine_chart_type(&parsed), "bar");
    }
}
