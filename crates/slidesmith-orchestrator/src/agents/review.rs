//! Review agent - quality checks and improvement suggestions.

use crate::context::{
    AgentConfig, DeckContent, GenerationContext, IssueKind, IssueSeverity, ReviewIssue,
    ReviewReport,
};
use crate::error::AgentError;
use crate::structured::{add_usage, call_structured};
use crate::{Agent, AgentExecution, AgentOutput};
use async_trait::async_trait;
use serde_json::{json, Value};
use slidesmith_abstraction::Model;
use std::sync::Arc;
use tracing::debug;

/// Titles longer than this draw a warning.
const MAX_TITLE_LENGTH: usize = 60;
/// Slides with more bullets than this draw a warning.
const MAX_BULLET_COUNT: usize = 7;
/// Decks shorter than this draw a warning.
const MIN_SLIDE_COUNT: usize = 3;

/// Review agent - quality checks and improvement suggestions.
pub struct ReviewAgent {
    model: Arc<dyn Model + Send + Sync>,
    config: AgentConfig,
}

impl ReviewAgent {
    /// Creates a review agent.
    #[must_use]
    pub fn new(model: Arc<dyn Model + Send + Sync>) -> Self {
        Self { model, config: AgentConfig::new() }
    }

    /// Overrides agent settings ("max_title_length" adjusts the title
    /// length rule).
    #[must_use]
    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    fn max_title_length(&self) -> usize {
        self.config
            .get("max_title_length")
            .and_then(Value::as_u64)
            .map_or(MAX_TITLE_LENGTH, |length| length as usize)
    }

    /// Deterministic checks that need no model call.
    fn run_rule_based_checks(&self, content: &DeckContent) -> Vec<ReviewIssue> {
        let mut issues = Vec::new();
        let slide_count = content.slides.len();
        let max_title_length = self.max_title_length();

        for slide in &content.slides {
            if slide.title.chars().count() > max_title_length {
                issues.push(ReviewIssue {
                    slide_index: Some(slide.index),
                    kind: IssueKind::Quality,
                    severity: IssueSeverity::Warning,
                    description: format!(
                        "Slide {} title is too long ({} characters)",
                        slide.index + 1,
                        slide.title.chars().count()
                    ),
                    suggestion: format!("Shorten the title to {max_title_length} characters"),
                });
            }

            if slide.bullet_points.len() > MAX_BULLET_COUNT {
                issues.push(ReviewIssue {
                    slide_index: Some(slide.index),
                    kind: IssueKind::Quality,
                    severity: IssueSeverity::Warning,
                    description: format!(
                        "Slide {} has too many bullets ({})",
                        slide.index + 1,
                        slide.bullet_points.len()
                    ),
                    suggestion: "Trim to 5-7 core points or split the slide".to_string(),
                });
            }

            let is_interior = slide.index != 0 && slide.index + 1 != slide_count;
            if slide.body.is_empty() && slide.bullet_points.is_empty() && is_interior {
                issues.push(ReviewIssue {
                    slide_index: Some(slide.index),
                    kind: IssueKind::Quality,
                    severity: IssueSeverity::Critical,
                    description: format!("Slide {} has no content", slide.index + 1),
                    suggestion: "Add content to the slide".to_string(),
                });
            }
        }

        if slide_count < MIN_SLIDE_COUNT {
            issues.push(ReviewIssue {
                slide_index: None,
                kind: IssueKind::Quality,
                severity: IssueSeverity::Warning,
                description: "The deck has very few slides".to_string(),
                suggestion: "Five or more slides are recommended".to_string(),
            });
        }

        issues
    }

    async fn run_model_review(
        &self,
        content: &DeckContent,
        tokens: &mut u64,
    ) -> Result<ModelReview, AgentError> {
        let slides_summary: Vec<Value> = content
            .slides
            .iter()
            .map(|slide| {
                json!({
                    "index": slide.index,
                    "title": slide.title,
                    "content_preview": slide.body.chars().take(100).collect::<String>(),
                    "bullet_count": slide.bullet_points.len(),
                })
            })
            .collect();

        let prompt = format!(
            "Review this presentation and assess its quality.\n\n\
             Presentation title: {}\nSlide count: {}\n\n\
             Slide summaries:\n{}\n\n\
             Review for:\n\
             1. Storytelling flow\n\
             2. Content clarity\n\
             3. Consistency across slides\n\
             4. Audience fit\n\n\
             Respond as JSON with issues (slide_index, issue_type, severity, \
             description, suggestion), strengths, and suggestions arrays.",
            content.title,
            content.slides.len(),
            serde_json::to_string_pretty(&slides_summary)
                .map_err(|e| AgentError::Other(e.to_string()))?
        );

        let schema = json!({
            "type": "object",
            "properties": {
                "issues": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "slide_index": {"type": "integer"},
                            "issue_type": {"type": "string"},
                            "severity": {"type": "string"},
                            "description": {"type": "string"},
                            "suggestion": {"type": "string"}
                        }
                    }
                },
                "strengths": {"type": "array", "items": {"type": "string"}},
                "suggestions": {"type": "array", "items": {"type": "string"}}
            },
            "required": ["issues"]
        });

        match call_structured(self.model.as_ref(), &self.system_prompt(), &prompt, &schema).await {
            Ok(call) => {
                add_usage(tokens, call.usage.as_ref());
                Ok(ModelReview {
                    issues: call
                        .data
                        .get("issues")
                        .and_then(Value::as_array)
                        .map(|entries| entries.iter().map(Self::parse_issue).collect())
                        .unwrap_or_default(),
                    strengths: string_array(&call.data, "strengths"),
                    suggestions: string_array(&call.data, "suggestions"),
                })
            }
            Err(AgentError::Decode(e)) => {
                debug!(error = %e, "model review did not decode, keeping rule-based issues only");
                Ok(ModelReview::default())
            }
            Err(e) => Err(e),
        }
    }

    fn parse_issue(entry: &Value) -> ReviewIssue {
        let kind = match entry.get("issue_type").and_then(Value::as_str) {
            Some("consistency") => IssueKind::Consistency,
            Some("accessibility") => IssueKind::Accessibility,
            Some("style") => IssueKind::Style,
            _ => IssueKind::Quality,
        };
        let severity = match entry.get("severity").and_then(Value::as_str) {
            Some("critical") => IssueSeverity::Critical,
            Some("warning") => IssueSeverity::Warning,
            _ => IssueSeverity::Suggestion,
        };
        ReviewIssue {
            slide_index: entry.get("slide_index").and_then(Value::as_u64).map(|i| i as usize),
            kind,
            severity,
            description: entry
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            suggestion: entry
                .get("suggestion")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        }
    }

    /// Score starts at 1.0 and loses a fixed deduction per issue severity.
    fn calculate_score(issues: &[ReviewIssue]) -> f32 {
        let total_deduction: f32 = issues
            .iter()
            .map(|issue| match issue.severity {
                IssueSeverity::Critical => 0.15,
                IssueSeverity::Warning => 0.05,
                IssueSeverity::Suggestion => 0.02,
            })
            .sum();

        let score = (1.0 - total_deduction).max(0.0);
        (score * 100.0).round() / 100.0
    }
}

#[derive(Default)]
struct ModelReview {
    issues: Vec<ReviewIssue>,
    strengths: Vec<String>,
    suggestions: Vec<String>,
}

#[async_trait]
impl Agent for ReviewAgent {
    fn name(&self) -> &str {
        "review_agent"
    }

    fn description(&self) -> &str {
        "Reviews deck quality and flags issues by severity"
    }

    fn system_prompt(&self) -> String {
        "You are a presentation quality specialist. You review generated \
         presentations and suggest improvements.\n\n\
         Review areas:\n\
         1. Consistency: terminology, style, tone\n\
         2. Quality: content clarity and completeness\n\
         3. Flow: logical structure and storytelling\n\
         4. Accessibility: readability, color contrast\n\
         5. Design: layout appropriateness\n\n\
         Issue severities:\n\
         - critical: must be fixed\n\
         - warning: fix recommended\n\
         - suggestion: optional improvement"
            .to_string()
    }

    async fn execute(&self, context: &GenerationContext) -> Result<AgentExecution, AgentError> {
        let content = context
            .content
            .as_ref()
            .ok_or_else(|| AgentError::MissingInput("deck content".to_string()))?;
        let mut tokens = 0u64;

        // 1. Rule-based checks
        let mut issues = self.run_rule_based_checks(content);

        // 2. Model review
        let model_review = self.run_model_review(content, &mut tokens).await?;
        issues.extend(model_review.issues);

        // 3. Verdict
        let overall_score = Self::calculate_score(&issues);
        let passed = !issues.iter().any(|issue| issue.severity == IssueSeverity::Critical);

        let report = ReviewReport {
            passed,
            overall_score,
            issues,
            strengths: model_review.strengths,
            improvement_suggestions: model_review.suggestions,
        };

        let mut execution = AgentExecution::new(AgentOutput::Review(report));
        execution.tokens_used = tokens;
        Ok(execution)
    }
}

fn string_array(value: &Value, field: &str) -> Vec<String> {
    value
        .get(field)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default()
}
