//! Body generation grounded in research context.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{Agent, voice_lines};
use crate::core::types::{StageName, Verdict};
use crate::core::validators::ValidatorSet;
use crate::io::prompt::BODY_TEMPLATE;
use crate::state::{PostState, ResearchItem, StateField};

pub const NO_RESEARCH_DATA: &str = "No research data available";

#[derive(Debug, Clone, Deserialize)]
pub struct BodyOutput {
    pub body_text: String,
    pub key_points: Vec<String>,
    pub tone: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BodyGeneration;

/// Research items as `source: snippet` lines.
pub fn research_context(items: &[ResearchItem]) -> String {
    if items.is_empty() {
        return NO_RESEARCH_DATA.to_string();
    }
    items
        .iter()
        .map(|item| format!("{}: {}", item.source, item.snippet))
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl Agent for BodyGeneration {
    type Output = BodyOutput;

    const NAME: StageName = StageName::BodyGeneration;
    const TEMPLATE: &'static str = BODY_TEMPLATE;

    fn required_fields(&self) -> &'static [StateField] {
        &[StateField::Topic, StateField::HookText]
    }

    fn owned_fields(&self) -> &'static [StateField] {
        &[StateField::BodyText]
    }

    fn slots(&self, state: &PostState, _gathered: Option<&str>) -> Value {
        json!({
            "topic": state.text(StateField::Topic),
            "hook": state.text(StateField::HookText),
            "research": research_context(&state.research_items),
            "key_points": state.brief.as_ref().map(|brief| brief.key_points.as_slice()).unwrap_or_default(),
            "voice": voice_lines(state),
            "stories": state
                .identity
                .as_deref()
                .map(|spec| spec.signature_stories.as_slice())
                .unwrap_or_default(),
        })
    }

    fn validate(&self, output: &BodyOutput, validators: &ValidatorSet) -> Verdict {
        validators.check_structure(&output.body_text)
    }

    fn content<'o>(&self, output: &'o BodyOutput) -> Option<&'o str> {
        Some(&output.body_text)
    }

    fn apply(&self, output: BodyOutput, state: &mut PostState) {
        let content = format!(
            "Generated body text: {}\nKey points: {}",
            output.body_text,
            output.key_points.join(", ")
        );
        state.body_text = Some(output.body_text);
        state.push_message(StageName::BodyGeneration, content);
    }
}
