//! Shared state threaded through every stage of one pipeline run.
//!
//! Stages operate on the concrete [`PostState`]. Untyped key-value maps only
//! appear at the pipeline boundary ([`PostState::from_map`] and
//! [`PostState::to_map`]).

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::core::types::StageName;
use crate::core::validators::{ValidationConfig, ValidatorSet};
use crate::identity::IdentitySpec;

/// Named fields of [`PostState`], used for preconditions, ownership, and maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateField {
    Topic,
    Brief,
    ResearchItems,
    HookText,
    BodyText,
    CtaText,
    Identity,
    Validators,
    QaFeedback,
    QaSuggestions,
    QaScore,
    QaIssues,
    PostPayload,
    Messages,
}

impl StateField {
    pub const ALL: [StateField; 14] = [
        StateField::Topic,
        StateField::Brief,
        StateField::ResearchItems,
        StateField::HookText,
        StateField::BodyText,
        StateField::CtaText,
        StateField::Identity,
        StateField::Validators,
        StateField::QaFeedback,
        StateField::QaSuggestions,
        StateField::QaScore,
        StateField::QaIssues,
        StateField::PostPayload,
        StateField::Messages,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StateField::Topic => "topic",
            StateField::Brief => "brief",
            StateField::ResearchItems => "research_items",
            StateField::HookText => "hook_text",
            StateField::BodyText => "body_text",
            StateField::CtaText => "cta_text",
            StateField::Identity => "identity",
            StateField::Validators => "validators",
            StateField::QaFeedback => "qa_feedback",
            StateField::QaSuggestions => "qa_suggestions",
            StateField::QaScore => "qa_score",
            StateField::QaIssues => "qa_issues",
            StateField::PostPayload => "post_payload",
            StateField::Messages => "messages",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.as_str() == name)
    }
}

impl fmt::Display for StateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPoint {
    pub heading: String,
    pub content: String,
    #[serde(default)]
    pub optional_visual: Option<String>,
    #[serde(default)]
    pub call_to_action: Option<String>,
}

/// Structured outline produced alongside topic selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brief {
    pub title: String,
    pub target_audience: String,
    pub key_points: Vec<KeyPoint>,
    pub tone: String,
    pub hashtags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchItem {
    pub source: String,
    pub snippet: String,
}

/// Final output of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostPayload {
    pub text: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub hashtags: Vec<String>,
}

/// Human-readable summary appended by a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageMessage {
    pub stage: StageName,
    pub content: String,
}

/// A present map field had the wrong shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("state field `{field}` has the wrong shape: {message}")]
pub struct SchemaError {
    pub field: String,
    pub message: String,
}

/// Mutable aggregate owned by exactly one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PostState {
    pub topic: Option<String>,
    pub brief: Option<Brief>,
    pub research_items: Vec<ResearchItem>,
    pub hook_text: Option<String>,
    pub body_text: Option<String>,
    pub cta_text: Option<String>,
    pub identity: Option<Arc<IdentitySpec>>,
    pub validators: Option<Arc<ValidatorSet>>,
    pub qa_feedback: Option<String>,
    pub qa_suggestions: Vec<String>,
    pub qa_score: Option<u8>,
    pub qa_issues: Vec<String>,
    pub post_payload: Option<PostPayload>,
    pub messages: Vec<StageMessage>,
}

impl PostState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a run with an optional caller-supplied topic. Blank topics count as absent.
    pub fn with_topic(topic: Option<String>) -> Self {
        Self {
            topic: topic
                .map(|topic| topic.trim().to_string())
                .filter(|topic| !topic.is_empty()),
            ..Self::default()
        }
    }

    /// Attach the shared, read-only identity and its bound validators.
    pub fn attach_identity(&mut self, identity: Arc<IdentitySpec>, validators: Arc<ValidatorSet>) {
        self.identity = Some(identity);
        self.validators = Some(validators);
    }

    /// True when `field` is populated (present, non-blank, non-empty).
    pub fn has(&self, field: StateField) -> bool {
        match field {
            StateField::Topic => non_blank(&self.topic),
            StateField::Brief => self.brief.is_some(),
            StateField::ResearchItems => !self.research_items.is_empty(),
            StateField::HookText => non_blank(&self.hook_text),
            StateField::BodyText => non_blank(&self.body_text),
            StateField::CtaText => non_blank(&self.cta_text),
            StateField::Identity => self.identity.is_some(),
            StateField::Validators => self.validators.is_some(),
            StateField::QaFeedback => non_blank(&self.qa_feedback),
            StateField::QaSuggestions => !self.qa_suggestions.is_empty(),
            StateField::QaScore => self.qa_score.is_some(),
            StateField::QaIssues => !self.qa_issues.is_empty(),
            StateField::PostPayload => self.post_payload.is_some(),
            StateField::Messages => !self.messages.is_empty(),
        }
    }

    /// Populated value of a required text field, or `None` if missing.
    pub fn text(&self, field: StateField) -> Option<&str> {
        let value = match field {
            StateField::Topic => &self.topic,
            StateField::HookText => &self.hook_text,
            StateField::BodyText => &self.body_text,
            StateField::CtaText => &self.cta_text,
            StateField::QaFeedback => &self.qa_feedback,
            _ => return None,
        };
        value.as_deref().map(str::trim).filter(|text| !text.is_empty())
    }

    pub fn push_message(&mut self, stage: StageName, content: impl Into<String>) {
        self.messages.push(StageMessage {
            stage,
            content: content.into(),
        });
    }

    /// Build a state from an untyped map handed across the pipeline boundary.
    ///
    /// Each known key is decoded independently so a wrong shape names its field.
    /// `null` counts as absent. `validators` is never read from the map; it is
    /// re-bound from `identity` with the default validation config.
    pub fn from_map(map: &Map<String, Value>) -> Result<Self, SchemaError> {
        for key in map.keys() {
            match StateField::parse(key) {
                None => debug!(key = %key, "ignoring unknown state key"),
                Some(StateField::Validators) => {
                    debug!("ignoring validators in state map (derived from identity)");
                }
                Some(_) => {}
            }
        }

        let qa_score: Option<u8> = read(map, StateField::QaScore)?;
        if let Some(score) = qa_score.filter(|score| !(1..=10).contains(score)) {
            return Err(SchemaError {
                field: StateField::QaScore.as_str().to_string(),
                message: format!("score {score} outside 1..=10"),
            });
        }

        let identity: Option<IdentitySpec> = read(map, StateField::Identity)?;
        let identity = identity.map(Arc::new);
        let validators = identity
            .as_deref()
            .map(|spec| ValidatorSet::bind(spec, &ValidationConfig::default()))
            .transpose()
            .map_err(|err| SchemaError {
                field: StateField::Identity.as_str().to_string(),
                message: err.to_string(),
            })?
            .map(Arc::new);

        Ok(Self {
            topic: read(map, StateField::Topic)?,
            brief: read(map, StateField::Brief)?,
            research_items: read(map, StateField::ResearchItems)?.unwrap_or_default(),
            hook_text: read(map, StateField::HookText)?,
            body_text: read(map, StateField::BodyText)?,
            cta_text: read(map, StateField::CtaText)?,
            identity,
            validators,
            qa_feedback: read(map, StateField::QaFeedback)?,
            qa_suggestions: read(map, StateField::QaSuggestions)?.unwrap_or_default(),
            qa_score,
            qa_issues: read(map, StateField::QaIssues)?.unwrap_or_default(),
            post_payload: read(map, StateField::PostPayload)?,
            messages: read(map, StateField::Messages)?.unwrap_or_default(),
        })
    }

    /// Serialize to an untyped map. `validators` is omitted; absent values are `null`.
    pub fn to_map(&self) -> Result<Map<String, Value>, serde_json::Error> {
        let mut map = Map::new();
        let mut put = |field: StateField, value: Value| {
            map.insert(field.as_str().to_string(), value);
        };
        put(StateField::Topic, serde_json::to_value(&self.topic)?);
        put(StateField::Brief, serde_json::to_value(&self.brief)?);
        put(StateField::ResearchItems, serde_json::to_value(&self.research_items)?);
        put(StateField::HookText, serde_json::to_value(&self.hook_text)?);
        put(StateField::BodyText, serde_json::to_value(&self.body_text)?);
        put(StateField::CtaText, serde_json::to_value(&self.cta_text)?);
        put(StateField::Identity, serde_json::to_value(self.identity.as_deref())?);
        put(StateField::QaFeedback, serde_json::to_value(&self.qa_feedback)?);
        put(StateField::QaSuggestions, serde_json::to_value(&self.qa_suggestions)?);
        put(StateField::QaScore, serde_json::to_value(self.qa_score)?);
        put(StateField::QaIssues, serde_json::to_value(&self.qa_issues)?);
        put(StateField::PostPayload, serde_json::to_value(&self.post_payload)?);
        put(StateField::Messages, serde_json::to_value(&self.messages)?);
        Ok(map)
    }
}

fn non_blank(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|text| !text.trim().is_empty())
}

fn read<T: DeserializeOwned>(
    map: &Map<String, Value>,
    field: StateField,
) -> Result<Option<T>, SchemaError> {
    match map.get(field.as_str()) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|err| SchemaError {
                field: field.as_str().to_string(),
                message: err.to_string(),
            }),
    }
}
