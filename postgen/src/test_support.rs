//! Test-only helpers: fixture identities and states plus scripted collaborators.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use async_trait::async_trait;
use serde_json::{Value, json};

use crate::core::types::StageName;
use crate::core::validators::{ValidationConfig, ValidatorSet};
use crate::identity::{IdentitySpec, VisualSpec};
use crate::io::model::{ModelClient, ModelError, PromptSpec};
use crate::io::research::ResearchSource;
use crate::state::{Brief, KeyPoint, PostState, ResearchItem};

pub const HOOK: &str = "Did you know remote teams ship 20% faster?";
pub const BODY: &str = "Remote teams lose hours to meetings. Cut one recurring call. \
                        Write a short update instead. Your team gets focus time back.";
pub const CTA: &str = "What is one meeting you could cancel this week?";

/// Deterministic identity with two approved hook templates.
pub fn identity() -> IdentitySpec {
    let mut voice = BTreeMap::new();
    voice.insert("energy".to_string(), Value::from("high"));
    voice.insert("register".to_string(), Value::from("plain"));
    IdentitySpec {
        creator: "Dana Ortiz".to_string(),
        promise: "Practical remote-work habits that stick".to_string(),
        voice,
        visual: VisualSpec {
            primary_color: "#0a66c2".to_string(),
            background: "white".to_string(),
            font_family: "Inter".to_string(),
            icon: None,
        },
        pillars_ranked: vec![
            "focus".to_string(),
            "async communication".to_string(),
            "team health".to_string(),
        ],
        signature_stories: vec!["The week I cancelled every recurring meeting".to_string()],
        hook_templates: vec![
            "Did you know {fact}?".to_string(),
            "Here's why {claim}.".to_string(),
        ],
        cta_style: "Ask a direct question".to_string(),
    }
}

pub fn brief() -> Brief {
    Brief {
        title: "Remote work productivity".to_string(),
        target_audience: "engineering managers".to_string(),
        key_points: vec![
            KeyPoint {
                heading: "Fewer meetings".to_string(),
                content: "Replace status calls with written updates".to_string(),
                optional_visual: None,
                call_to_action: None,
            },
            KeyPoint {
                heading: "Focus blocks".to_string(),
                content: "Protect two hours a day".to_string(),
                optional_visual: Some("calendar screenshot".to_string()),
                call_to_action: Some("Block your calendar".to_string()),
            },
        ],
        tone: "practical".to_string(),
        hashtags: vec!["#remotework".to_string(), "#productivity".to_string()],
    }
}

pub fn research_items() -> Vec<ResearchItem> {
    vec![
        ResearchItem {
            source: "survey.example".to_string(),
            snippet: "Teams with written updates hold 30% fewer meetings".to_string(),
        },
        ResearchItem {
            source: "blog.example".to_string(),
            snippet: "Focus blocks raise weekly output".to_string(),
        },
    ]
}

/// State as it looks after CTA generation, with the fixture identity bound.
pub fn populated_state() -> PostState {
    let mut state = PostState::with_topic(Some("Remote work productivity".to_string()));
    state.brief = Some(brief());
    state.research_items = research_items();
    state.hook_text = Some(HOOK.to_string());
    state.body_text = Some(BODY.to_string());
    state.cta_text = Some(CTA.to_string());
    let spec = Arc::new(identity());
    let validators = ValidatorSet::bind(&spec, &ValidationConfig::default())
        .expect("fixture templates compile");
    state.attach_identity(spec, Arc::new(validators));
    state.push_message(StageName::TopicSelection, "Selected topic: Remote work productivity");
    state.push_message(StageName::Research, "Found 2 items.");
    state.push_message(StageName::HookGeneration, format!("Generated hook: {HOOK}"));
    state.push_message(StageName::BodyGeneration, format!("Generated body text: {BODY}"));
    state.push_message(StageName::CtaGeneration, format!("Generated CTA: {CTA}"));
    state
}

pub fn topic_reply(topic: &str) -> Value {
    json!({ "topic": topic, "brief": serde_json::to_value(brief()).expect("brief") })
}

pub fn research_reply(items: &[ResearchItem]) -> Value {
    json!({ "items": items })
}

pub fn hook_reply(text: &str) -> Value {
    json!({ "hook_text": text, "tone": "curious", "target_audience": "engineering managers" })
}

pub fn body_reply(text: &str) -> Value {
    json!({ "body_text": text, "key_points": ["fewer meetings", "focus time"], "tone": "practical" })
}

pub fn cta_reply(text: &str) -> Value {
    json!({ "cta_text": text, "action_type": "comment", "urgency_level": "medium" })
}

pub fn review_reply(score: u8) -> Value {
    json!({
        "feedback": "Clear and concrete.",
        "suggestions": ["Add one number to the body"],
        "score": score,
        "issues": [],
    })
}

pub fn assembly_reply() -> Value {
    json!({ "image_url": null, "hashtags": ["#remotework", "#focus"] })
}

/// One request observed by a [`ScriptedModel`].
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub stage: StageName,
    /// Full prompt including corrective guidance.
    pub prompt: String,
    pub guidance: Vec<String>,
}

/// Model client that answers from per-stage reply queues and records every call.
///
/// A stage with an exhausted queue gets a `ModelError::Request`.
#[derive(Debug, Default)]
pub struct ScriptedModel {
    replies: Mutex<HashMap<StageName, VecDeque<Result<Value, ModelError>>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replies for a full brand-aware run that passes every validator.
    pub fn full_run(topic: &str) -> Self {
        Self::new()
            .reply(StageName::TopicSelection, topic_reply(topic))
            .reply(StageName::Research, research_reply(&research_items()))
            .reply(StageName::HookGeneration, hook_reply(HOOK))
            .reply(StageName::BodyGeneration, body_reply(BODY))
            .reply(StageName::CtaGeneration, cta_reply(CTA))
            .reply(StageName::QualityReview, review_reply(7))
            .reply(StageName::Assembly, assembly_reply())
    }

    pub fn reply(self, stage: StageName, value: Value) -> Self {
        self.push(stage, Ok(value))
    }

    pub fn fail(self, stage: StageName, err: ModelError) -> Self {
        self.push(stage, Err(err))
    }

    fn push(mut self, stage: StageName, reply: Result<Value, ModelError>) -> Self {
        self.replies
            .get_mut()
            .expect("replies lock")
            .entry(stage)
            .or_default()
            .push_back(reply);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn calls_for(&self, stage: StageName) -> usize {
        self.calls
            .lock()
            .expect("calls lock")
            .iter()
            .filter(|call| call.stage == stage)
            .count()
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn invoke(&self, request: &PromptSpec) -> Result<Value, ModelError> {
        self.calls.lock().expect("calls lock").push(RecordedCall {
            stage: request.stage,
            prompt: request.full_prompt(),
            guidance: request.guidance.clone(),
        });
        self.replies
            .lock()
            .expect("replies lock")
            .get_mut(&request.stage)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| {
                Err(ModelError::Request(format!(
                    "no scripted reply for {}",
                    request.stage
                )))
            })
    }
}

/// Research source returning fixed text.
#[derive(Debug, Clone)]
pub struct StaticResearch {
    results: String,
}

impl StaticResearch {
    pub fn new(results: impl Into<String>) -> Self {
        Self {
            results: results.into(),
        }
    }
}

#[async_trait]
impl ResearchSource for StaticResearch {
    async fn search(&self, _query: &str) -> anyhow::Result<String> {
        Ok(self.results.clone())
    }
}

/// Research source whose every search fails.
#[derive(Debug, Clone, Copy)]
pub struct FailingResearch;

#[async_trait]
impl ResearchSource for FailingResearch {
    async fn search(&self, query: &str) -> anyhow::Result<String> {
        Err(anyhow!("search backend unavailable for {query:?}"))
    }
}
