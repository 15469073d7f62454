//! Brand identity specification consumed read-only by the validators and the
//! brand-aware prompts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Visual identity specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualSpec {
    /// Hex color, `#rgb` or `#rrggbb`.
    pub primary_color: String,
    pub background: String,
    pub font_family: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// A creator's voice, approved templates, and style rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentitySpec {
    pub creator: String,
    pub promise: String,
    /// Free-form voice descriptors (e.g. `"energy": "high"`).
    pub voice: BTreeMap<String, Value>,
    pub visual: VisualSpec,
    /// Brand pillars, most important first.
    pub pillars_ranked: Vec<String>,
    pub signature_stories: Vec<String>,
    /// Approved hook templates; `{placeholder}` spans match any non-empty text.
    pub hook_templates: Vec<String>,
    pub cta_style: String,
}

impl IdentitySpec {
    /// Voice descriptors rendered as `key: value` lines in key order.
    pub fn voice_lines(&self) -> Vec<String> {
        self.voice
            .iter()
            .map(|(key, value)| match value {
                Value::String(text) => format!("{key}: {text}"),
                other => format!("{key}: {other}"),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::identity;

    #[test]
    fn voice_lines_unquote_strings_and_keep_key_order() {
        let mut spec = identity();
        spec.voice.insert("warmth".to_string(), Value::from(8));
        let lines = spec.voice_lines();
        assert_eq!(lines, vec!["energy: high", "register: plain", "warmth: 8"]);
    }

    #[test]
    fn icon_is_optional_in_json() {
        let raw = serde_json::json!({
            "primary_color": "#0a66c2",
            "background": "white",
            "font_family": "Inter"
        });
        let visual: VisualSpec = serde_json::from_value(raw).expect("visual");
        assert_eq!(visual.icon, None);
    }
}
