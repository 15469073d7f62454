//! Quality review of the drafted post.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{Agent, voice_lines};
use crate::core::types::StageName;
use crate::io::prompt::REVIEW_TEMPLATE;
use crate::state::{PostState, StateField};

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewOutput {
    pub feedback: String,
    pub suggestions: Vec<String>,
    /// 1..=10, enforced by the output schema.
    pub score: u8,
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct QualityReview;

#[async_trait]
impl Agent for QualityReview {
    type Output = ReviewOutput;

    const NAME: StageName = StageName::QualityReview;
    const TEMPLATE: &'static str = REVIEW_TEMPLATE;

    fn required_fields(&self) -> &'static [StateField] {
        &[
            StateField::Topic,
            StateField::HookText,
            StateField::BodyText,
            StateField::CtaText,
        ]
    }

    fn owned_fields(&self) -> &'static [StateField] {
        &[
            StateField::QaFeedback,
            StateField::QaSuggestions,
            StateField::QaScore,
            StateField::QaIssues,
        ]
    }

    fn slots(&self, state: &PostState, _gathered: Option<&str>) -> Value {
        json!({
            "topic": state.text(StateField::Topic),
            "hook": state.text(StateField::HookText),
            "body": state.text(StateField::BodyText),
            "cta": state.text(StateField::CtaText),
            "promise": state.identity.as_deref().map(|spec| spec.promise.as_str()),
            "voice": voice_lines(state),
        })
    }

    fn apply(&self, output: ReviewOutput, state: &mut PostState) {
        let content = format!(
            "QA Review:\nScore: {}/10\nFeedback: {}\nSuggestions: {}\nIssues: {}",
            output.score,
            output.feedback,
            output.suggestions.join(", "),
            output.issues.join(", ")
        );
        state.qa_feedback = Some(output.feedback);
        state.qa_suggestions = output.suggestions;
        state.qa_score = Some(output.score);
        state.qa_issues = output.issues;
        state.push_message(StageName::QualityReview, content);
    }
}
