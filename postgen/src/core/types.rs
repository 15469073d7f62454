//! Shared deterministic types for the pipeline core.
//!
//! These types define stable contracts between core components. They should not
//! depend on external state or I/O.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stage identifiers, in roster order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    TopicSelection,
    Research,
    HookGeneration,
    BodyGeneration,
    CtaGeneration,
    QualityReview,
    Assembly,
}

impl StageName {
    /// Fixed execution order of the pipeline.
    pub const ORDER: [StageName; 7] = [
        StageName::TopicSelection,
        StageName::Research,
        StageName::HookGeneration,
        StageName::BodyGeneration,
        StageName::CtaGeneration,
        StageName::QualityReview,
        StageName::Assembly,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StageName::TopicSelection => "topic_selection",
            StageName::Research => "research",
            StageName::HookGeneration => "hook_generation",
            StageName::BodyGeneration => "body_generation",
            StageName::CtaGeneration => "cta_generation",
            StageName::QualityReview => "quality_review",
            StageName::Assembly => "assembly",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a structural or template check on generated text.
///
/// A rejection never escapes the stage that produced it: it triggers at most
/// one corrective regeneration and is otherwise accepted with a warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected(String),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted)
    }
}
