//! Call-to-action generation.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use super::Agent;
use crate::core::types::{StageName, Verdict};
use crate::core::validators::ValidatorSet;
use crate::io::prompt::CTA_TEMPLATE;
use crate::state::{PostState, StateField};

#[derive(Debug, Clone, Deserialize)]
pub struct CtaOutput {
    pub cta_text: String,
    pub action_type: String,
    pub urgency_level: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CtaGeneration;

#[async_trait]
impl Agent for CtaGeneration {
    type Output = CtaOutput;

    const NAME: StageName = StageName::CtaGeneration;
    const TEMPLATE: &'static str = CTA_TEMPLATE;

    fn required_fields(&self) -> &'static [StateField] {
        &[StateField::Topic, StateField::BodyText]
    }

    fn owned_fields(&self) -> &'static [StateField] {
        &[StateField::CtaText]
    }

    fn slots(&self, state: &PostState, _gathered: Option<&str>) -> Value {
        json!({
            "topic": state.text(StateField::Topic),
            "body": state.text(StateField::BodyText),
            "cta_style": state.identity.as_deref().map(|spec| spec.cta_style.as_str()),
        })
    }

    fn validate(&self, output: &CtaOutput, validators: &ValidatorSet) -> Verdict {
        validators.check_structure(&output.cta_text)
    }

    fn content<'o>(&self, output: &'o CtaOutput) -> Option<&'o str> {
        Some(&output.cta_text)
    }

    fn apply(&self, output: CtaOutput, state: &mut PostState) {
        let content = format!(
            "Generated CTA: {}\nAction Type: {}\nUrgency Level: {}",
            output.cta_text, output.action_type, output.urgency_level
        );
        state.cta_text = Some(output.cta_text);
        state.push_message(StageName::CtaGeneration, content);
    }
}
