//! Final post assembly.
//!
//! The post text is composed here, CTA last. The model only contributes the
//! optional image reference and hashtags.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use super::Agent;
use crate::core::types::StageName;
use crate::io::prompt::ASSEMBLE_TEMPLATE;
use crate::state::{PostPayload, PostState, StateField};

#[derive(Debug, Clone, Deserialize)]
pub struct AssemblyOutput {
    #[serde(default)]
    pub image_url: Option<String>,
    pub hashtags: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Assembly;

pub fn compose_post_text(hook: &str, body: &str, cta: &str) -> String {
    format!("{}\n\n{}\n\n{}", hook.trim(), body.trim(), cta.trim())
}

fn composed_text(state: &PostState) -> String {
    compose_post_text(
        state.text(StateField::HookText).unwrap_or_default(),
        state.text(StateField::BodyText).unwrap_or_default(),
        state.text(StateField::CtaText).unwrap_or_default(),
    )
}

#[async_trait]
impl Agent for Assembly {
    type Output = AssemblyOutput;

    const NAME: StageName = StageName::Assembly;
    const TEMPLATE: &'static str = ASSEMBLE_TEMPLATE;

    fn required_fields(&self) -> &'static [StateField] {
        &[
            StateField::Topic,
            StateField::HookText,
            StateField::BodyText,
            StateField::CtaText,
        ]
    }

    fn owned_fields(&self) -> &'static [StateField] {
        &[StateField::PostPayload]
    }

    fn slots(&self, state: &PostState, _gathered: Option<&str>) -> Value {
        json!({
            "topic": state.text(StateField::Topic),
            "text": composed_text(state),
            "hashtags": state.brief.as_ref().map(|brief| brief.hashtags.as_slice()).unwrap_or_default(),
            "visual": state.identity.as_deref().map(|spec| &spec.visual),
        })
    }

    fn apply(&self, output: AssemblyOutput, state: &mut PostState) {
        let text = composed_text(state);
        let image_url = output
            .image_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());
        let hashtags = if output.hashtags.is_empty() {
            state
                .brief
                .as_ref()
                .map(|brief| brief.hashtags.clone())
                .unwrap_or_default()
        } else {
            output.hashtags
        };
        let content = format!("Final post assembled successfully:\n{text}");
        state.post_payload = Some(PostPayload {
            text,
            image_url,
            hashtags,
        });
        state.push_message(StageName::Assembly, content);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::populated_state;

    #[test]
    fn text_is_hook_body_cta_with_cta_last() {
        let mut state = populated_state();
        Assembly.apply(
            AssemblyOutput {
                image_url: Some("  ".to_string()),
                hashtags: vec!["#remote".to_string()],
            },
            &mut state,
        );
        let payload = state.post_payload.expect("payload");
        let hook = state.hook_text.as_deref().expect("hook");
        let cta = state.cta_text.as_deref().expect("cta");
        assert!(payload.text.starts_with(hook));
        assert!(payload.text.ends_with(cta));
        assert_eq!(payload.text.matches("\n\n").count(), 2);
        assert_eq!(payload.image_url, None, "blank image reference is absent");
        assert_eq!(payload.hashtags, vec!["#remote"]);
    }

    #[test]
    fn empty_model_hashtags_fall_back_to_brief() {
        let mut state = populated_state();
        let brief_tags = state.brief.as_ref().expect("brief").hashtags.clone();
        Assembly.apply(
            AssemblyOutput {
                image_url: Some("https://img.example/cover.png".to_string()),
                hashtags: Vec::new(),
            },
            &mut state,
        );
        let payload = state.post_payload.expect("payload");
        assert_eq!(payload.hashtags, brief_tags);
        assert_eq!(payload.image_url.as_deref(), Some("https://img.example/cover.png"));
    }
}
