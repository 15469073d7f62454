//! Hook generation, optionally constrained by the creator's approved templates.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{Agent, voice_lines};
use crate::core::types::{StageName, Verdict};
use crate::core::validators::ValidatorSet;
use crate::io::prompt::HOOK_TEMPLATE;
use crate::state::{PostState, StateField};

#[derive(Debug, Clone, Deserialize)]
pub struct HookOutput {
    pub hook_text: String,
    pub tone: String,
    pub target_audience: String,
}

/// Writes the opening line. The brand-aware variant requires an identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct HookGeneration {
    brand_aware: bool,
}

impl HookGeneration {
    pub fn generic() -> Self {
        Self { brand_aware: false }
    }

    pub fn brand_aware() -> Self {
        Self { brand_aware: true }
    }

    pub fn is_brand_aware(&self) -> bool {
        self.brand_aware
    }
}

#[async_trait]
impl Agent for HookGeneration {
    type Output = HookOutput;

    const NAME: StageName = StageName::HookGeneration;
    const TEMPLATE: &'static str = HOOK_TEMPLATE;

    fn required_fields(&self) -> &'static [StateField] {
        if self.brand_aware {
            &[StateField::Topic, StateField::Identity]
        } else {
            &[StateField::Topic]
        }
    }

    fn owned_fields(&self) -> &'static [StateField] {
        &[StateField::HookText]
    }

    fn slots(&self, state: &PostState, _gathered: Option<&str>) -> Value {
        let identity = state.identity.as_deref();
        json!({
            "topic": state.text(StateField::Topic),
            "brief": state.brief,
            "creator": identity.map(|spec| spec.creator.as_str()),
            "promise": identity.map(|spec| spec.promise.as_str()),
            "voice": voice_lines(state),
            "pillars": identity.map(|spec| spec.pillars_ranked.as_slice()).unwrap_or_default(),
            "templates": identity.map(|spec| spec.hook_templates.as_slice()).unwrap_or_default(),
        })
    }

    fn validate(&self, output: &HookOutput, validators: &ValidatorSet) -> Verdict {
        validators.check_hook(&output.hook_text)
    }

    fn content<'o>(&self, output: &'o HookOutput) -> Option<&'o str> {
        Some(&output.hook_text)
    }

    fn apply(&self, output: HookOutput, state: &mut PostState) {
        let content = format!(
            "Generated hook: {}\nTone: {}\nTarget Audience: {}",
            output.hook_text, output.tone, output.target_audience
        );
        state.hook_text = Some(output.hook_text);
        state.push_message(StageName::HookGeneration, content);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::Stage;
    use crate::error::PipelineError;
    use crate::io::prompt::PromptEngine;
    use crate::test_support::populated_state;

    #[test]
    fn brand_aware_hook_requires_identity() {
        let mut state = populated_state();
        state.identity = None;
        let err = HookGeneration::brand_aware().precondition(&state).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::MissingInput {
                stage: StageName::HookGeneration,
                field: StateField::Identity
            }
        ));
        assert!(HookGeneration::generic().precondition(&state).is_ok());
    }

    #[test]
    fn brand_prompt_lists_templates_and_voice() {
        let state = populated_state();
        let spec = HookGeneration::brand_aware()
            .build_prompt(&PromptEngine::new(24_000), &state, None)
            .expect("prompt");
        assert!(spec.prompt.contains("Did you know {fact}?"));
        assert!(spec.prompt.contains("energy: high"));
        assert!(spec.prompt.contains("### Brand Pillars"));
    }
}
