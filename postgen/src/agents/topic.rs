//! Topic selection and brief.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use super::Agent;
use crate::core::types::StageName;
use crate::io::prompt::TOPIC_TEMPLATE;
use crate::state::{Brief, PostState, StateField};

#[derive(Debug, Clone, Deserialize)]
pub struct TopicOutput {
    pub topic: String,
    pub brief: Brief,
}

/// Picks a topic when none was given and always writes the brief.
#[derive(Debug, Clone, Copy, Default)]
pub struct TopicSelection;

#[async_trait]
impl Agent for TopicSelection {
    type Output = TopicOutput;

    const NAME: StageName = StageName::TopicSelection;
    const TEMPLATE: &'static str = TOPIC_TEMPLATE;

    fn required_fields(&self) -> &'static [StateField] {
        &[]
    }

    fn owned_fields(&self) -> &'static [StateField] {
        &[StateField::Topic, StateField::Brief]
    }

    fn slots(&self, state: &PostState, _gathered: Option<&str>) -> Value {
        let identity = state.identity.as_deref();
        json!({
            "topic": state.text(StateField::Topic),
            "promise": identity.map(|spec| spec.promise.as_str()),
            "pillars": identity.map(|spec| spec.pillars_ranked.as_slice()).unwrap_or_default(),
        })
    }

    fn apply(&self, output: TopicOutput, state: &mut PostState) {
        if !state.has(StateField::Topic) {
            state.topic = Some(output.topic.trim().to_string());
        }
        let topic = state.topic.clone().unwrap_or_default();
        let content = format!(
            "Selected topic: {topic}\nBrief: {} ({} key points)",
            output.brief.title,
            output.brief.key_points.len()
        );
        state.brief = Some(output.brief);
        state.push_message(StageName::TopicSelection, content);
    }
}
