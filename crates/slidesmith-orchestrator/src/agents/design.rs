//! Design agent - layout and visual planning.

use crate::context::{
    AgentConfig, DeckDesign, FontPairing, GenerationContext, ImagePosition, SlideDesign,
    SlideLayout, Visualization,
};
use crate::error::AgentError;
use crate::structured::{add_usage, call_structured};
use crate::{Agent, AgentExecution, AgentOutput};
use async_trait::async_trait;
use serde_json::{json, Value};
use slidesmith_abstraction::Model;
use std::sync::Arc;
use tracing::debug;

/// Design agent - layout and visual planning.
pub struct DesignAgent {
    model: Arc<dyn Model + Send + Sync>,
    config: AgentConfig,
}

impl DesignAgent {
    /// Creates a design agent.
    #[must_use]
    pub fn new(model: Arc<dyn Model + Send + Sync>) -> Self {
        Self { model, config: AgentConfig::new() }
    }

    /// Overrides agent settings ("fallback_template" replaces the template
    /// used when selection does not decode).
    #[must_use]
    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    fn fallback_template(&self) -> String {
        self.config
            .get("fallback_template")
            .and_then(Value::as_str)
            .unwrap_or("business")
            .to_string()
    }

    fn layout_names() -> String {
        SlideLayout::ALL.iter().map(|layout| layout.as_str()).collect::<Vec<_>>().join(", ")
    }

    async fn select_template(
        &self,
        context: &GenerationContext,
        tokens: &mut u64,
    ) -> Result<String, AgentError> {
        let request = &context.request;

        // A user-chosen template always wins
        if let Some(template_id) = &request.template_id {
            return Ok(template_id.clone());
        }

        let prompt = format!(
            "Choose the template category that fits this presentation.\n\n\
             Topic: {}\nPurpose: {}\nAudience: {}\nStyle: {}\n\n\
             Available template categories:\n\
             - business: business, investment, reporting\n\
             - education: teaching, lectures, research\n\
             - marketing: marketing, product introductions\n\
             - creative: creative, artistic\n\
             - minimal: minimal, clean\n\n\
             Respond as JSON: {{\"template_id\": \"category\"}}",
            request.topic,
            request.purpose.as_deref().unwrap_or("inform"),
            request.audience.as_deref().unwrap_or("general"),
            request.style.as_deref().unwrap_or("professional")
        );

        let schema = json!({
            "type": "object",
            "properties": {"template_id": {"type": "string"}},
            "required": ["template_id"]
        });

        match call_structured(self.model.as_ref(), &self.system_prompt(), &prompt, &schema).await {
            Ok(call) => {
                add_usage(tokens, call.usage.as_ref());
                let template_id = call
                    .data
                    .get("template_id")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                if template_id.is_empty() {
                    Ok(self.fallback_template())
                } else {
                    Ok(template_id)
                }
            }
            Err(AgentError::Decode(e)) => {
                debug!(error = %e, "template selection did not decode, using fallback");
                Ok(self.fallback_template())
            }
            Err(e) => Err(e),
        }
    }

    async fn assign_layouts(
        &self,
        context: &GenerationContext,
        tokens: &mut u64,
    ) -> Result<Vec<SlideDesign>, AgentError> {
        let Some(content) = &context.content else {
            return Ok(Vec::new());
        };
        if content.slides.is_empty() {
            return Ok(Vec::new());
        }

        let slides_info: Vec<Value> = content
            .slides
            .iter()
            .map(|slide| {
                json!({
                    "index": slide.index,
                    "title": slide.title,
                    "has_bullets": !slide.bullet_points.is_empty(),
                    "bullet_count": slide.bullet_points.len(),
                    "content_length": slide.body.len(),
                    "is_first": slide.index == 0,
                    "is_last": slide.index + 1 == content.slides.len(),
                })
            })
            .collect();

        let prompt = format!(
            "Assign a layout to every slide.\n\n\
             Available layouts:\n{}\n\n\
             Slide information:\n{}\n\n\
             Rules:\n\
             1. First slide = \"title\"\n\
             2. Last slide = \"title\" or \"contact\"\n\
             3. Never use the same layout more than twice in a row\n\
             4. Three or more bullets = \"bullet_points\"\n\
             5. Comparisons = \"comparison\" or \"two_column\"\n\n\
             Respond as JSON: {{\"slides\": [{{\"index\": 0, \"layout\": \"title\", \
             \"visualization\": null, \"image_position\": null}}, ...]}}",
            Self::layout_names(),
            serde_json::to_string_pretty(&slides_info)
                .map_err(|e| AgentError::Other(e.to_string()))?
        );

        let schema = json!({
            "type": "object",
            "properties": {
                "slides": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "index": {"type": "integer"},
                            "layout": {"type": "string"},
                            "visualization": {"type": "string"},
                            "image_position": {"type": "string"}
                        }
                    }
                }
            },
            "required": ["slides"]
        });

        let assignments = match call_structured(
            self.model.as_ref(),
            &self.system_prompt(),
            &prompt,
            &schema,
        )
        .await
        {
            Ok(call) => {
                add_usage(tokens, call.usage.as_ref());
                call.data
                    .get("slides")
                    .and_then(Value::as_array)
                    .map(|entries| entries.iter().map(Self::parse_assignment).collect::<Vec<_>>())
                    .unwrap_or_default()
            }
            Err(AgentError::Decode(e)) => {
                debug!(error = %e, "layout assignment did not decode, using defaults");
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        if assignments.is_empty() {
            Ok(Self::default_layouts(content.slides.len()))
        } else {
            Ok(assignments)
        }
    }

    fn parse_assignment(entry: &Value) -> SlideDesign {
        let index = entry.get("index").and_then(Value::as_u64).unwrap_or(0) as usize;
        let layout = entry
            .get("layout")
            .and_then(Value::as_str)
            .and_then(|name| name.parse::<SlideLayout>().ok())
            .unwrap_or(SlideLayout::TitleContent);

        let visualization =
            entry.get("visualization").and_then(Value::as_str).and_then(|name| match name {
                "chart" => Some(Visualization::Chart),
                "diagram" => Some(Visualization::Diagram),
                "timeline" => Some(Visualization::Timeline),
                _ => None,
            });

        let image_position =
            entry.get("image_position").and_then(Value::as_str).and_then(|name| match name {
                "left" => Some(ImagePosition::Left),
                "right" => Some(ImagePosition::Right),
                "background" => Some(ImagePosition::Background),
                _ => None,
            });

        SlideDesign {
            index,
            layout,
            color_emphasis: String::new(),
            visualization,
            image_position,
        }
    }

    /// Deterministic fallback: title opener, contact closer, generic content
    /// in between.
    pub(crate) fn default_layouts(count: usize) -> Vec<SlideDesign> {
        (0..count)
            .map(|index| {
                let layout = if index == 0 {
                    SlideLayout::Title
                } else if index + 1 == count {
                    SlideLayout::Contact
                } else {
                    SlideLayout::TitleContent
                };
                SlideDesign::new(index, layout)
            })
            .collect()
    }

    fn color_scheme_for(theme: &str) -> String {
        match theme {
            "business" => "navy",
            "education" => "green",
            "minimal" => "monochrome",
            "creative" => "vibrant",
            "dark" => "dark_blue",
            "warm" => "orange",
            "cool" => "teal",
            _ => "blue",
        }
        .to_string()
    }

    fn font_pairing_for(style: Option<&str>) -> FontPairing {
        match style {
            Some("casual") => {
                FontPairing { heading: "Nunito Sans".to_string(), body: "Nunito Sans".to_string() }
            }
            Some("creative") => {
                FontPairing { heading: "Archivo Black".to_string(), body: "Inter".to_string() }
            }
            Some("formal") => {
                FontPairing { heading: "Source Serif 4".to_string(), body: "Inter".to_string() }
            }
            _ => FontPairing { heading: "Inter".to_string(), body: "Inter".to_string() },
        }
    }
}

#[async_trait]
impl Agent for DesignAgent {
    fn name(&self) -> &str {
        "design_agent"
    }

    fn description(&self) -> &str {
        "Chooses the template and assigns a layout to every slide"
    }

    fn system_prompt(&self) -> String {
        format!(
            "You are a presentation design specialist. You choose layouts and \
             visual elements that fit the content.\n\n\
             Available layouts:\n{}\n\n\
             Design principles:\n\
             1. Pick the layout that matches the content type\n\
             2. Keep visual variety (avoid repeating the same layout)\n\
             3. Visualize to emphasize the key message\n\
             4. Use consistent colors and fonts\n\
             5. Design to hold the audience's attention\n\n\
             Title slide = title\n\
             Last slide = title or contact\n\
             Data and statistics = chart\n\
             Comparisons = comparison or two_column\n\
             Stories and chronology = timeline\n\
             General content = title_content, bullet_points, image_left, image_right",
            Self::layout_names()
        )
    }

    async fn execute(&self, context: &GenerationContext) -> Result<AgentExecution, AgentError> {
        let request = &context.request;
        let mut tokens = 0u64;

        // 1. Template
        let template_id = self.select_template(context, &mut tokens).await?;

        // 2. Per-slide layouts
        let slides = self.assign_layouts(context, &mut tokens).await?;

        // 3. Colors and fonts are local decisions
        let color_scheme = Self::color_scheme_for(&request.theme);
        let font_pairing = Self::font_pairing_for(request.style.as_deref());

        let design = DeckDesign { template_id, color_scheme, font_pairing, slides };

        let mut execution = AgentExecution::new(AgentOutput::Design(design));
        execution.tokens_used = tokens;
        Ok(execution)
    }
}
