//! Validators bound to one identity.
//!
//! A [`ValidatorSet`] is built once per identity and shared read-only across
//! runs. Every check is pure and returns a [`Verdict`] or a score.

use serde::{Deserialize, Serialize};

use super::readability;
use super::structure::{self, StructureLimits};
use super::template::{self, HookTemplate, TemplateError};
use super::types::Verdict;
use crate::identity::IdentitySpec;

/// Tunable limits for the structural and tone checks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub max_sentence_words: usize,
    pub max_emojis: usize,
    /// Minimum tone score (0.0..=1.0) before a readability regeneration.
    pub tone_threshold: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_sentence_words: 25,
            max_emojis: 1,
            tone_threshold: 0.6,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidatorSet {
    templates: Vec<HookTemplate>,
    limits: StructureLimits,
    tone_threshold: f64,
}

impl ValidatorSet {
    pub fn bind(identity: &IdentitySpec, config: &ValidationConfig) -> Result<Self, TemplateError> {
        let templates = identity
            .hook_templates
            .iter()
            .map(|source| HookTemplate::compile(source))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            templates,
            limits: StructureLimits {
                max_sentence_words: config.max_sentence_words,
                max_emojis: config.max_emojis,
            },
            tone_threshold: config.tone_threshold,
        })
    }

    /// A hook must fully match one approved template. No templates, no constraint.
    pub fn check_hook(&self, text: &str) -> Verdict {
        if self.templates.is_empty() || template::first_match(&self.templates, text).is_some() {
            Verdict::Accepted
        } else {
            Verdict::Rejected(template::NO_TEMPLATE_MATCH.to_string())
        }
    }

    pub fn check_structure(&self, text: &str) -> Verdict {
        match structure::check_structure(text, self.limits) {
            None => Verdict::Accepted,
            Some(reason) => Verdict::Rejected(reason.to_string()),
        }
    }

    pub fn tone_score(&self, text: &str) -> f64 {
        readability::tone_score(text)
    }

    pub fn tone_threshold(&self) -> f64 {
        self.tone_threshold
    }

    pub fn template_sources(&self) -> impl Iterator<Item = &str> {
        self.templates.iter().map(HookTemplate::source)
    }
}
