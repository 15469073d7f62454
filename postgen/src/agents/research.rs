//! Research extraction from a best-effort search.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::Agent;
use crate::core::types::StageName;
use crate::io::prompt::RESEARCH_TEMPLATE;
use crate::io::research::ResearchSource;
use crate::state::{PostState, ResearchItem, StateField};

pub const NO_SEARCH_RESULTS: &str = "No search results";

#[derive(Debug, Clone, Deserialize)]
pub struct ResearchOutput {
    pub items: Vec<ResearchItem>,
}

/// Searches for the topic and extracts research items from the results.
pub struct ResearchStage {
    source: Arc<dyn ResearchSource>,
}

impl ResearchStage {
    pub fn new(source: Arc<dyn ResearchSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl Agent for ResearchStage {
    type Output = ResearchOutput;

    const NAME: StageName = StageName::Research;
    const TEMPLATE: &'static str = RESEARCH_TEMPLATE;

    fn required_fields(&self) -> &'static [StateField] {
        &[StateField::Topic]
    }

    fn owned_fields(&self) -> &'static [StateField] {
        &[StateField::ResearchItems]
    }

    async fn gather(&self, state: &PostState) -> Option<String> {
        let topic = state.text(StateField::Topic)?;
        match self.source.search(topic).await {
            Ok(results) if !results.trim().is_empty() => Some(results),
            Ok(_) => {
                debug!(topic, "search returned no results");
                None
            }
            Err(err) => {
                warn!(topic, error = %format!("{err:#}"), "search failed, continuing without results");
                None
            }
        }
    }

    fn slots(&self, state: &PostState, gathered: Option<&str>) -> Value {
        json!({
            "topic": state.text(StateField::Topic),
            "search_results": gathered.unwrap_or(NO_SEARCH_RESULTS),
        })
    }

    fn apply(&self, output: ResearchOutput, state: &mut PostState) {
        let found = output.items.len();
        state.research_items.extend(output.items);
        let topic = state.text(StateField::Topic).unwrap_or_default().to_string();
        state.push_message(
            StageName::Research,
            format!("Research completed for topic: {topic}. Found {found} items."),
        );
    }
}
