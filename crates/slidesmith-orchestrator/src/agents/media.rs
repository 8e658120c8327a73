//! Media agent - image lookup and chart preparation.
//!
//! Image lookups fan out through the bounded executor so at most a handful
//! of requests hit the external provider at once. One slide's lookup
//! failure never affects its siblings or the phase.

use crate::context::{
    AgentConfig, ChartSpec, DeckMedia, GenerationContext, ImageStyle, SlideMedia, Visualization,
};
use crate::error::AgentError;
use crate::fanout::FanOutExecutor;
use crate::providers::ImageProvider;
use crate::structured::{add_usage, call_structured};
use crate::{Agent, AgentExecution, AgentOutput};
use async_trait::async_trait;
use serde_json::{json, Value};
use slidesmith_abstraction::Model;
use std::sync::Arc;
use tracing::{debug, warn};

/// One slide's image requirement, produced by the keyword analysis call.
#[derive(Debug, Clone)]
struct ImageRequirement {
    index: usize,
    keywords: String,
}

/// Media agent - image lookup and chart preparation.
pub struct MediaAgent {
    model: Arc<dyn Model + Send + Sync>,
    image_provider: Arc<dyn ImageProvider>,
    fan_out: FanOutExecutor,
    config: AgentConfig,
}

impl MediaAgent {
    /// Creates a media agent.
    ///
    /// # Arguments
    /// * `model` - The model used for keyword analysis
    /// * `image_provider` - The image lookup backend
    /// * `fan_out` - Bounded executor for concurrent lookups
    #[must_use]
    pub fn new(
        model: Arc<dyn Model + Send + Sync>,
        image_provider: Arc<dyn ImageProvider>,
        fan_out: FanOutExecutor,
    ) -> Self {
        Self { model, image_provider, fan_out, config: AgentConfig::new() }
    }

    /// Overrides agent settings ("image_style" forces photo, illustration,
    /// or icon imagery).
    #[must_use]
    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    fn image_style_override(&self) -> Option<ImageStyle> {
        match self.config.get("image_style").and_then(Value::as_str) {
            Some("photo") => Some(ImageStyle::Photo),
            Some("illustration") => Some(ImageStyle::Illustration),
            Some("icon") => Some(ImageStyle::Icon),
            _ => None,
        }
    }

    async fn analyze_image_requirements(
        &self,
        context: &GenerationContext,
        tokens: &mut u64,
    ) -> Result<Vec<ImageRequirement>, AgentError> {
        let Some(content) = &context.content else {
            return Ok(Vec::new());
        };
        if content.slides.is_empty() {
            return Ok(Vec::new());
        }

        let design = context.design.as_ref();
        let slides_info: Vec<Value> = content
            .slides
            .iter()
            .enumerate()
            .map(|(i, slide)| {
                let layout = design
                    .and_then(|d| d.slides.get(i))
                    .map_or("title_content".to_string(), |d| d.layout.to_string());
                let needs_image = design
                    .and_then(|d| d.slides.get(i))
                    .is_some_and(|d| d.layout.needs_image());
                json!({
                    "index": i,
                    "title": slide.title,
                    "content": slide.body.chars().take(200).collect::<String>(),
                    "layout": layout,
                    "needs_image": needs_image,
                })
            })
            .collect();

        let prompt = format!(
            "Generate image search keywords for each slide.\n\n\
             Slide information:\n{}\n\n\
             Rules:\n\
             1. Use English keywords (search accuracy)\n\
             2. Two to four words each\n\
             3. Specific, unambiguous keywords\n\
             4. Omit keywords when needs_image is false\n\n\
             Respond as JSON: {{\"slides\": [{{\"index\": 0, \"keywords\": \
             \"business meeting\", \"style\": \"photo\"}}, ...]}}",
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
                            "keywords": {"type": "string"},
                            "style": {"type": "string"}
                        }
                    }
                }
            },
            "required": ["slides"]
        });

        match call_structured(self.model.as_ref(), &self.system_prompt(), &prompt, &schema).await {
            Ok(call) => {
                add_usage(tokens, call.usage.as_ref());
                let requirements = call
                    .data
                    .get("slides")
                    .and_then(Value::as_array)
                    .map(|entries| {
                        entries
                            .iter()
                            .map(|entry| ImageRequirement {
                                index: entry
                                    .get("index")
                                    .and_then(Value::as_u64)
                                    .unwrap_or(0)
                                    as usize,
                                keywords: entry
                                    .get("keywords")
                                    .and_then(Value::as_str)
                                    .unwrap_or_default()
                                    .to_string(),
                            })
                            .collect::<Vec<_>>()
                    })
                    .unwrap_or_default();

                if requirements.is_empty() {
                    Ok(Self::default_requirements(content.slides.len()))
                } else {
                    Ok(requirements)
                }
            }
            Err(AgentError::Decode(e)) => {
                debug!(error = %e, "keyword analysis did not decode, using empty keywords");
                Ok(Self::default_requirements(content.slides.len()))
            }
            Err(e) => Err(e),
        }
    }

    fn default_requirements(count: usize) -> Vec<ImageRequirement> {
        (0..count).map(|index| ImageRequirement { index, keywords: String::new() }).collect()
    }

    /// Fetches one image per requirement with bounded concurrency.
    async fn process_images(&self, requirements: Vec<ImageRequirement>) -> Vec<SlideMedia> {
        let indices: Vec<usize> = requirements.iter().map(|req| req.index).collect();
        let provider = Arc::clone(&self.image_provider);

        let mut results = self
            .fan_out
            .execute(requirements, move |_position, req: ImageRequirement| {
                let provider = Arc::clone(&provider);
                async move {
                    let mut media = SlideMedia::new(req.index);
                    if req.keywords.is_empty() {
                        return Ok(media);
                    }

                    match provider.search_image(&req.keywords).await {
                        Ok(Some(mut asset)) => {
                            if asset.source.is_empty() {
                                asset.source = "image_provider".to_string();
                            }
                            if asset.alt_text.is_empty() {
                                asset.alt_text = req.keywords.clone();
                            }
                            media.images.push(asset);
                        }
                        Ok(None) => {}
                        Err(e) => {
                            // One slide's lookup failure leaves that slide empty
                            warn!(index = req.index, error = %e, "image lookup failed");
                        }
                    }
                    Ok(media)
                }
            })
            .await;

        // A panicked sub-task leaves a default in its slot; restore its index
        for (media, index) in results.iter_mut().zip(indices) {
            media.index = index;
        }
        results
    }

    /// Attaches a chart to every slide whose design asks for one, using the
    /// first research statistic as the data source.
    fn process_charts(context: &GenerationContext, slides: &mut [SlideMedia]) {
        let Some(design) = &context.design else { return };
        let Some(research) = &context.research else { return };
        let Some(stat) = research.statistics.first() else { return };

        for (i, slide_design) in design.slides.iter().enumerate() {
            if slide_design.visualization == Some(Visualization::Chart) {
                if let Some(media) = slides.get_mut(i) {
                    media.charts.push(ChartSpec {
                        chart_type: "bar".to_string(),
                        title: stat.description.clone(),
                        data: stat.value.clone(),
                        source: stat.source.clone(),
                    });
                }
            }
        }
    }

    fn image_style_for(style: Option<&str>) -> ImageStyle {
        match style {
            Some("creative") => ImageStyle::Illustration,
            _ => ImageStyle::Photo,
        }
    }
}

#[async_trait]
impl Agent for MediaAgent {
    fn name(&self) -> &str {
        "media_agent"
    }

    fn description(&self) -> &str {
        "Finds images and prepares charts for the slides"
    }

    fn system_prompt(&self) -> String {
        "You are a presentation visuals specialist. You decide which images, \
         icons, and charts fit each slide's content.\n\n\
         Image selection principles:\n\
         1. Images directly related to the content\n\
         2. Professional, high-quality visuals\n\
         3. A consistent style throughout\n\
         4. Images that complement the text rather than repeat it\n\
         5. Precise image search keywords"
            .to_string()
    }

    async fn execute(&self, context: &GenerationContext) -> Result<AgentExecution, AgentError> {
        let request = &context.request;
        let mut tokens = 0u64;

        // Images disabled: an empty media record, not a failure
        if !request.include_images {
            return Ok(AgentExecution::new(AgentOutput::Media(DeckMedia::default())));
        }

        // 1. Keyword analysis per slide
        let requirements = self.analyze_image_requirements(context, &mut tokens).await?;

        // 2. Bounded-concurrency lookups
        let mut slides = self.process_images(requirements).await;

        // 3. Charts where the design asks for them
        if request.include_charts {
            Self::process_charts(context, &mut slides);
        }

        let media = DeckMedia {
            slides,
            image_style: self
                .image_style_override()
                .unwrap_or_else(|| Self::image_style_for(request.style.as_deref())),
            color_filter: None,
        };

        let mut execution = AgentExecution::new(AgentOutput::Media(media));
        execution.tokens_used = tokens;
        Ok(execution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{
        DeckContent, DeckDesign, GenerationRequest, ImageAsset, ResearchFindings, SlideContent,
        SlideDesign, SlideLayout, Statistic,
    };
    use crate::providers::NoopImageProvider;
    use slidesmith_models::MockModel;

    struct StaticImages;

    #[async_trait]
    impl ImageProvider for StaticImages {
        async fn search_image(&self, keywords: &str) -> anyhow::Result<Option<ImageAsset>> {
            Ok(Some(ImageAsset {
                url: format!("https://img.example/{}", keywords.replace(' ', "-")),
                source: String::new(),
                alt_text: String::new(),
            }))
        }
    }

    /// Model that returns keywords for every slide.
    struct KeywordModel;

    #[async_trait]
    impl Model for KeywordModel {
        async fn generate_text(
            &self,
            _prompt: &str,
            _system_prompt: Option<&str>,
            _parameters: Option<slidesmith_abstraction::ModelParameters>,
        ) -> Result<slidesmith_abstraction::ModelResponse, slidesmith_abstraction::ModelError>
        {
            Ok(slidesmith_abstraction::ModelResponse {
                content: String::new(),
                model_id: None,
                usage: None,
            })
        }

        async fn generate_structured(
            &self,
            _prompt: &str,
            _system_prompt: Option<&str>,
            _schema: &Value,
            _parameters: Option<slidesmith_abstraction::ModelParameters>,
        ) -> Result<slidesmith_abstraction::StructuredResponse, slidesmith_abstraction::ModelError>
        {
            Ok(slidesmith_abstraction::StructuredResponse {
                data: json!({"slides": [
                    {"index": 0, "keywords": "city skyline", "style": "photo"},
                    {"index": 1, "keywords": "", "style": "photo"},
                    {"index": 2, "keywords": "team meeting", "style": "photo"}
                ]}),
                model_id: None,
                usage: None,
            })
        }

        fn model_id(&self) -> &str {
            "keyword-model"
        }
    }

    fn context_with_deck() -> GenerationContext {
        let mut context = GenerationContext::new(GenerationRequest::new("Quarterly results"));
        context.content = Some(DeckContent {
            title: "Deck".to_string(),
            slides: (0..3)
                .map(|index| SlideContent {
                    index,
                    title: format!("Slide {index}"),
                    ..SlideContent::default()
                })
                .collect(),
            ..DeckContent::default()
        });
        context
    }

    #[tokio::test]
    async fn test_media_disabled_returns_empty_record() {
        let mut context = context_with_deck();
        context.request.include_images = false;

        let agent = MediaAgent::new(
            Arc::new(MockModel::new("mock".to_string())),
            Arc::new(NoopImageProvider),
            FanOutExecutor::default(),
        );
        let result = agent.run(&context).await;
        assert!(result.success);
        match result.output {
            Some(AgentOutput::Media(media)) => assert!(media.slides.is_empty()),
            other => panic!("unexpected output: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_images_fetched_only_for_slides_with_keywords() {
        let agent = MediaAgent::new(
            Arc::new(KeywordModel),
            Arc::new(StaticImages),
            FanOutExecutor::new(2),
        );
        let result = agent.run(&context_with_deck()).await;
        assert!(result.success);
        match result.output {
            Some(AgentOutput::Media(media)) => {
                assert_eq!(media.slides.len(), 3);
                assert_eq!(media.slides[0].images.len(), 1);
                assert!(media.slides[1].images.is_empty());
                assert_eq!(media.slides[2].images.len(), 1);
                assert_eq!(media.slides[0].images[0].alt_text, "city skyline");
                assert_eq!(media.slides[0].images[0].source, "image_provider");
            }
            other => panic!("unexpected output: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_provider_failure_leaves_only_that_slide_empty() {
        struct FlakyImages;

        #[async_trait]
        impl ImageProvider for FlakyImages {
            async fn search_image(&self, keywords: &str) -> anyhow::Result<Option<ImageAsset>> {
                if keywords == "city skyline" {
                    anyhow::bail!("provider timeout");
                }
                Ok(Some(ImageAsset {
                    url: "https://img.example/ok".to_string(),
                    source: "test".to_string(),
                    alt_text: keywords.to_string(),
                }))
            }
        }

        let agent =
            MediaAgent::new(Arc::new(KeywordModel), Arc::new(FlakyImages), FanOutExecutor::new(2));
        let result = agent.run(&context_with_deck()).await;
        assert!(result.success);
        match result.output {
            Some(AgentOutput::Media(media)) => {
                assert!(media.slides[0].images.is_empty());
                assert_eq!(media.slides[2].images.len(), 1);
            }
            other => panic!("unexpected output: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_charts_attached_where_design_requests_them() {
        let mut context = context_with_deck();
        context.research = Some(ResearchFindings {
            statistics: vec![Statistic {
                value: "42%".to_string(),
                description: "Adoption rate".to_string(),
                source: "Survey".to_string(),
            }],
            ..ResearchFindings::default()
        });
        let mut design = DeckDesign::default();
        design.slides = vec![
            SlideDesign::new(0, SlideLayout::Title),
            SlideDesign {
                visualization: Some(Visualization::Chart),
                ..SlideDesign::new(1, SlideLayout::Chart)
            },
            SlideDesign::new(2, SlideLayout::TitleContent),
        ];
        context.design = Some(design);

        let agent = MediaAgent::new(
            Arc::new(KeywordModel),
            Arc::new(NoopImageProvider),
            FanOutExecutor::default(),
        );
        let result = agent.run(&context).await;
        match result.output {
            Some(AgentOutput::Media(media)) => {
                assert!(media.slides[0].charts.is_empty());
                assert_eq!(media.slides[1].charts.len(), 1);
                assert_eq!(media.slides[1].charts[0].data, "42%");
            }
            other => panic!("unexpected output: {other:?}"),
        }
    }
}
