//! Shared generation record threaded through every phase and skill.
//!
//! One `GenerationContext` exists per generation run. Agents receive a shared
//! reference for reading; only the orchestrator that owns the run writes the
//! per-phase output slots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;
use tracing::warn;
use uuid::Uuid;

/// Lifecycle status of a generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    /// Record created from user input; no phase has started.
    Initializing,
    /// At least one phase has begun.
    InProgress,
    /// The terminal phase finished.
    Completed,
    /// A mandatory phase failed irrecoverably.
    Failed,
}

impl GenerationStatus {
    fn rank(self) -> u8 {
        match self {
            Self::Initializing => 0,
            Self::InProgress => 1,
            Self::Completed | Self::Failed => 2,
        }
    }
}

/// The five ordered phases of a full generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationPhase {
    /// Topic research and information gathering.
    Research,
    /// Slide content writing.
    Content,
    /// Layout and visual planning.
    Design,
    /// Image and chart preparation.
    Media,
    /// Quality review.
    Review,
}

impl GenerationPhase {
    /// All phases in execution order.
    pub const ALL: [Self; 5] =
        [Self::Research, Self::Content, Self::Design, Self::Media, Self::Review];

    /// Returns the phase name as reported through callbacks.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Research => "research",
            Self::Content => "content",
            Self::Design => "design",
            Self::Media => "media",
            Self::Review => "review",
        }
    }

    /// Returns the progress interval `(start, end)` owned by this phase.
    #[must_use]
    pub fn progress_range(self) -> (f32, f32) {
        match self {
            Self::Research => (0.0, 20.0),
            Self::Content => (20.0, 50.0),
            Self::Design => (50.0, 60.0),
            Self::Media => (60.0, 90.0),
            Self::Review => (90.0, 100.0),
        }
    }
}

impl std::fmt::Display for GenerationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User input describing the deck to generate. Immutable once set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The presentation topic.
    pub topic: String,
    /// Target number of slides.
    pub slide_count: usize,
    /// Output language (BCP 47-ish tag, e.g. "en", "ko").
    pub language: String,
    /// Visual theme name.
    pub theme: String,
    /// Optional template identifier; overrides template selection.
    pub template_id: Option<String>,
    /// Optional reference text to mine for key points.
    pub reference_content: Option<String>,
    /// Optional audience description (e.g. "executives", "students").
    pub audience: Option<String>,
    /// Optional purpose (e.g. "persuade", "educate").
    pub purpose: Option<String>,
    /// Optional expected presentation duration.
    pub duration_minutes: Option<u32>,
    /// Optional writing/visual style (e.g. "formal", "creative").
    pub style: Option<String>,
    /// Whether to prepare charts from research statistics.
    pub include_charts: bool,
    /// Whether to fetch images for slides.
    pub include_images: bool,
}

impl GenerationRequest {
    /// Creates a request with defaults for everything but the topic.
    #[must_use]
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            slide_count: 10,
            language: "en".to_string(),
            theme: "default".to_string(),
            template_id: None,
            reference_content: None,
            audience: None,
            purpose: None,
            duration_minutes: None,
            style: None,
            include_charts: true,
            include_images: true,
        }
    }

    /// Sets the target slide count.
    #[must_use]
    pub fn with_slide_count(mut self, slide_count: usize) -> Self {
        self.slide_count = slide_count;
        self
    }

    /// Sets the output language.
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Sets the visual theme.
    #[must_use]
    pub fn with_theme(mut self, theme: impl Into<String>) -> Self {
        self.theme = theme.into();
        self
    }
}

/// A statistic surfaced by research.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Statistic {
    /// The value, kept as text ("42%", "3.5x").
    #[serde(default)]
    pub value: String,
    /// What the value measures.
    #[serde(default)]
    pub description: String,
    /// Where the value came from.
    #[serde(default)]
    pub source: String,
}

/// A quotable line surfaced by research.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Quote {
    /// The quoted text.
    #[serde(default)]
    pub text: String,
    /// Attribution.
    #[serde(default)]
    pub author: String,
}

/// A web source surfaced by research.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceRef {
    /// Page title.
    #[serde(default)]
    pub title: String,
    /// Page URL.
    #[serde(default)]
    pub url: String,
    /// Short excerpt.
    #[serde(default)]
    pub snippet: String,
}

/// Research phase output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchFindings {
    /// Core points the deck should make.
    #[serde(default)]
    pub key_points: Vec<String>,
    /// Supporting statistics.
    #[serde(default)]
    pub statistics: Vec<Statistic>,
    /// Quotable lines.
    #[serde(default)]
    pub quotes: Vec<Quote>,
    /// Web sources consulted.
    #[serde(default)]
    pub sources: Vec<SourceRef>,
    /// Current trends around the topic.
    #[serde(default)]
    pub trends: Vec<String>,
    /// Adjacent topics worth mentioning.
    #[serde(default)]
    pub related_topics: Vec<String>,
    /// One-paragraph topic summary.
    #[serde(default)]
    pub summary: String,
}

impl ResearchFindings {
    /// Placeholder used when the research phase fails: present but empty,
    /// so downstream phases can proceed without special-casing.
    #[must_use]
    pub fn skipped() -> Self {
        Self { summary: "research skipped".to_string(), ..Self::default() }
    }
}

/// Content of a single slide.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlideContent {
    /// Zero-based position in the deck.
    pub index: usize,
    /// Slide title.
    pub title: String,
    /// Body prose (may be empty when bullets carry the content).
    #[serde(default)]
    pub body: String,
    /// Bulleted content.
    #[serde(default)]
    pub bullet_points: Vec<String>,
    /// Speaker notes.
    #[serde(default)]
    pub notes: String,
    /// Transition phrase leading in from the previous slide.
    #[serde(default)]
    pub transition_text: String,
    /// The one thing the audience should remember.
    #[serde(default)]
    pub key_message: String,
}

/// Content phase output: the written deck.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeckContent {
    /// Presentation title.
    pub title: String,
    /// Presentation subtitle.
    #[serde(default)]
    pub subtitle: String,
    /// Slides in order.
    #[serde(default)]
    pub slides: Vec<SlideContent>,
    /// Overall storyline.
    #[serde(default)]
    pub overall_narrative: String,
    /// Closing takeaways.
    #[serde(default)]
    pub key_takeaways: Vec<String>,
}

/// The closed set of slide layouts the design phase can assign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlideLayout {
    /// Title slide.
    Title,
    /// Title plus body content.
    TitleContent,
    /// Two-column layout.
    TwoColumn,
    /// Title plus hero image.
    TitleImage,
    /// Image left, text right.
    ImageLeft,
    /// Image right, text left.
    ImageRight,
    /// Full-bleed image.
    ImageFull,
    /// Bulleted list.
    BulletPoints,
    /// Side-by-side comparison.
    Comparison,
    /// Chronological timeline.
    Timeline,
    /// Chart-centric slide.
    Chart,
    /// Large quotation.
    #[serde(rename = "quote")]
    Quotation,
    /// Team introduction.
    Team,
    /// Contact / call-to-action closer.
    Contact,
}

impl SlideLayout {
    /// Every assignable layout, used when prompting the model.
    pub const ALL: [Self; 14] = [
        Self::Title,
        Self::TitleContent,
        Self::TwoColumn,
        Self::TitleImage,
        Self::ImageLeft,
        Self::ImageRight,
        Self::ImageFull,
        Self::BulletPoints,
        Self::Comparison,
        Self::Timeline,
        Self::Chart,
        Self::Quotation,
        Self::Team,
        Self::Contact,
    ];

    /// Returns the wire name of the layout.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::TitleContent => "title_content",
            Self::TwoColumn => "two_column",
            Self::TitleImage => "title_image",
            Self::ImageLeft => "image_left",
            Self::ImageRight => "image_right",
            Self::ImageFull => "image_full",
            Self::BulletPoints => "bullet_points",
            Self::Comparison => "comparison",
            Self::Timeline => "timeline",
            Self::Chart => "chart",
            Self::Quotation => "quote",
            Self::Team => "team",
            Self::Contact => "contact",
        }
    }

    /// Whether slides with this layout want an accompanying image.
    #[must_use]
    pub fn needs_image(self) -> bool {
        matches!(
            self,
            Self::TitleImage | Self::ImageLeft | Self::ImageRight | Self::ImageFull | Self::TwoColumn
        )
    }
}

impl FromStr for SlideLayout {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.iter().copied().find(|layout| layout.as_str() == s).ok_or(())
    }
}

impl std::fmt::Display for SlideLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Visualization hint attached to a slide design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visualization {
    /// Data chart.
    Chart,
    /// Box-and-arrow diagram.
    Diagram,
    /// Chronological timeline.
    Timeline,
}

/// Image placement hint attached to a slide design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImagePosition {
    /// Image on the left half.
    Left,
    /// Image on the right half.
    Right,
    /// Image behind the content.
    Background,
}

/// Design decisions for a single slide.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlideDesign {
    /// Zero-based position in the deck.
    pub index: usize,
    /// Assigned layout.
    pub layout: SlideLayout,
    /// Accent color hint.
    #[serde(default)]
    pub color_emphasis: String,
    /// Optional visualization request.
    #[serde(default)]
    pub visualization: Option<Visualization>,
    /// Optional image placement.
    #[serde(default)]
    pub image_position: Option<ImagePosition>,
}

impl SlideDesign {
    /// Creates a design entry with just an index and layout.
    #[must_use]
    pub fn new(index: usize, layout: SlideLayout) -> Self {
        Self { index, layout, color_emphasis: String::new(), visualization: None, image_position: None }
    }
}

/// Heading/body font pairing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FontPairing {
    /// Heading font family.
    pub heading: String,
    /// Body font family.
    pub body: String,
}

/// Design phase output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeckDesign {
    /// Chosen template identifier.
    pub template_id: String,
    /// Chosen color scheme name.
    pub color_scheme: String,
    /// Font pairing.
    #[serde(default)]
    pub font_pairing: FontPairing,
    /// Per-slide design decisions.
    #[serde(default)]
    pub slides: Vec<SlideDesign>,
}

/// An image attached to a slide.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageAsset {
    /// Image URL.
    pub url: String,
    /// Provider that supplied it.
    #[serde(default)]
    pub source: String,
    /// Accessibility text / search keywords.
    #[serde(default)]
    pub alt_text: String,
}

/// A chart prepared for a slide.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChartSpec {
    /// Chart kind ("bar", "line", "pie").
    pub chart_type: String,
    /// Chart title.
    #[serde(default)]
    pub title: String,
    /// The underlying value, kept as text.
    #[serde(default)]
    pub data: String,
    /// Data source attribution.
    #[serde(default)]
    pub source: String,
}

/// Media attached to a single slide.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlideMedia {
    /// Zero-based position in the deck.
    pub index: usize,
    /// Fetched images.
    #[serde(default)]
    pub images: Vec<ImageAsset>,
    /// Icon identifiers.
    #[serde(default)]
    pub icons: Vec<String>,
    /// Prepared charts.
    #[serde(default)]
    pub charts: Vec<ChartSpec>,
    /// Diagram descriptions.
    #[serde(default)]
    pub diagrams: Vec<String>,
}

impl SlideMedia {
    /// Creates an empty media record for the given slide.
    #[must_use]
    pub fn new(index: usize) -> Self {
        Self { index, ..Self::default() }
    }
}

/// Overall image style for the deck.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageStyle {
    /// Photographic imagery.
    #[default]
    Photo,
    /// Illustrated imagery.
    Illustration,
    /// Icon-based imagery.
    Icon,
}

/// Media phase output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeckMedia {
    /// Per-slide media, aligned with the deck's slide order.
    #[serde(default)]
    pub slides: Vec<SlideMedia>,
    /// Overall image style.
    #[serde(default)]
    pub image_style: ImageStyle,
    /// Optional color filter applied to imagery.
    #[serde(default)]
    pub color_filter: Option<String>,
}

/// Category of a review issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Terminology/style/tone consistency.
    Consistency,
    /// Content clarity and completeness.
    Quality,
    /// Readability and contrast.
    Accessibility,
    /// Layout appropriateness.
    Style,
}

/// Severity of a review issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    /// Optional improvement.
    Suggestion,
    /// Fix recommended.
    Warning,
    /// Must be fixed.
    Critical,
}

/// A single issue flagged by review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewIssue {
    /// Affected slide, if the issue is slide-local.
    pub slide_index: Option<usize>,
    /// Issue category.
    pub kind: IssueKind,
    /// Issue severity.
    pub severity: IssueSeverity,
    /// What is wrong.
    pub description: String,
    /// How to fix it.
    pub suggestion: String,
}

/// Review phase output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewReport {
    /// True when no critical issues were found.
    pub passed: bool,
    /// Quality score in `[0.0, 1.0]`.
    pub overall_score: f32,
    /// Issues found.
    #[serde(default)]
    pub issues: Vec<ReviewIssue>,
    /// What the deck does well.
    #[serde(default)]
    pub strengths: Vec<String>,
    /// Suggested improvements.
    #[serde(default)]
    pub improvement_suggestions: Vec<String>,
}

impl ReviewReport {
    /// Default verdict substituted when the review phase itself fails.
    #[must_use]
    pub fn default_pass() -> Self {
        Self {
            passed: true,
            overall_score: 0.7,
            issues: Vec::new(),
            strengths: Vec::new(),
            improvement_suggestions: Vec::new(),
        }
    }
}

/// Kind of an inter-agent message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Asks another agent for something.
    Request,
    /// Answers a request.
    Response,
    /// One-way information.
    Notification,
}

/// An inter-agent message. Delivery is best-effort: the log is append-only
/// observability data and nothing reads it back into phase logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMessage {
    /// Sending agent name.
    pub from_agent: String,
    /// Receiving agent name.
    pub to_agent: String,
    /// Message kind.
    pub kind: MessageKind,
    /// Arbitrary payload.
    pub payload: Value,
    /// When the message was posted.
    pub timestamp: DateTime<Utc>,
}

impl AgentMessage {
    /// Creates a notification message stamped now.
    #[must_use]
    pub fn notification(
        from_agent: impl Into<String>,
        to_agent: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self {
            from_agent: from_agent.into(),
            to_agent: to_agent.into(),
            kind: MessageKind::Notification,
            payload,
            timestamp: Utc::now(),
        }
    }
}

/// Shared execution record for one generation run.
///
/// The orchestrator that created the record owns it exclusively for the
/// duration of the run; no two concurrent runs ever share one record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationContext {
    /// Unique run identifier.
    pub run_id: Uuid,

    /// The immutable user input.
    pub request: GenerationRequest,

    /// Research phase output; `None` until research completes.
    pub research: Option<ResearchFindings>,
    /// Content phase output; `None` until content completes.
    pub content: Option<DeckContent>,
    /// Design phase output; `None` until design completes.
    pub design: Option<DeckDesign>,
    /// Media phase output; `None` until media completes.
    pub media: Option<DeckMedia>,
    /// Review phase output; `None` until review completes.
    pub review: Option<ReviewReport>,

    /// Lifecycle status; monotonic except for [`GenerationContext::reset`].
    pub status: GenerationStatus,
    /// Phase currently executing, advisory only.
    pub current_phase: Option<GenerationPhase>,
    /// Completion percentage in `[0.0, 100.0]`, advisory only.
    pub progress_percent: f32,

    /// Append-only inter-agent message log.
    pub messages: Vec<AgentMessage>,

    /// Record creation time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}

impl GenerationContext {
    /// Creates a fresh record in the `Initializing` state.
    #[must_use]
    pub fn new(request: GenerationRequest) -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            request,
            research: None,
            content: None,
            design: None,
            media: None,
            review: None,
            status: GenerationStatus::Initializing,
            current_phase: None,
            progress_percent: 0.0,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Moves the status forward. Backward transitions are ignored with a warning.
    pub fn advance_status(&mut self, status: GenerationStatus) {
        if status.rank() < self.status.rank() {
            warn!(
                from = ?self.status,
                to = ?status,
                "ignoring backward status transition"
            );
            return;
        }
        self.status = status;
        self.touch();
    }

    /// Records the phase the run is currently in and its progress anchor.
    pub fn set_phase(&mut self, phase: GenerationPhase, progress: f32) {
        self.current_phase = Some(phase);
        self.set_progress(progress);
    }

    /// Updates the progress cursor. Progress never moves backward.
    pub fn set_progress(&mut self, progress: f32) {
        if progress >= self.progress_percent {
            self.progress_percent = progress.clamp(0.0, 100.0);
        }
        self.touch();
    }

    /// Appends messages to the observability log.
    pub fn record_messages(&mut self, messages: impl IntoIterator<Item = AgentMessage>) {
        self.messages.extend(messages);
        self.touch();
    }

    /// Clears all outputs and returns the record to `Initializing`.
    ///
    /// This is the only sanctioned backward status transition.
    pub fn reset(&mut self) {
        self.research = None;
        self.content = None;
        self.design = None;
        self.media = None;
        self.review = None;
        self.status = GenerationStatus::Initializing;
        self.current_phase = None;
        self.progress_percent = 0.0;
        self.messages.clear();
        self.touch();
    }

    /// Assembles the record's populated slots into a single exportable value.
    #[must_use]
    pub fn to_deck_value(&self) -> Value {
        serde_json::json!({
            "run_id": self.run_id,
            "request": self.request,
            "research": self.research,
            "content": self.content,
            "design": self.design,
            "media": self.media,
            "review": self.review,
        })
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Extra configuration for agents, keyed by free-form setting name.
pub type AgentConfig = HashMap<String, Value>;
