//! Prompt pack builder for deterministic model input.

use std::sync::LazyLock;

use minijinja::Environment;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

pub const TOPIC_TEMPLATE: &str = "topic";
pub const RESEARCH_TEMPLATE: &str = "research";
pub const HOOK_TEMPLATE: &str = "hook";
pub const BODY_TEMPLATE: &str = "body";
pub const CTA_TEMPLATE: &str = "cta";
pub const REVIEW_TEMPLATE: &str = "review";
pub const ASSEMBLE_TEMPLATE: &str = "assemble";

const TEMPLATES: [(&str, &str); 7] = [
    (TOPIC_TEMPLATE, include_str!("prompts/topic.md")),
    (RESEARCH_TEMPLATE, include_str!("prompts/research.md")),
    (HOOK_TEMPLATE, include_str!("prompts/hook.md")),
    (BODY_TEMPLATE, include_str!("prompts/body.md")),
    (CTA_TEMPLATE, include_str!("prompts/cta.md")),
    (REVIEW_TEMPLATE, include_str!("prompts/review.md")),
    (ASSEMBLE_TEMPLATE, include_str!("prompts/assemble.md")),
];

/// Droppable sections, least important first.
const DROP_ORDER: [&str; 5] = ["research", "stories", "pillars", "voice", "brief"];

/// Template engine wrapper around minijinja that renders budgeted prompt packs.
pub struct PromptEngine {
    env: Environment<'static>,
    budget_bytes: usize,
}

impl PromptEngine {
    pub fn new(budget_bytes: usize) -> Self {
        let mut env = Environment::new();
        for (name, source) in TEMPLATES {
            env.add_template(name, source)
                .expect("embedded prompt template should be valid");
        }
        Self { env, budget_bytes }
    }

    /// Render `template` with `slots`, then fit the result into the byte budget.
    pub fn render(&self, template: &str, slots: &Value) -> Result<String, minijinja::Error> {
        let rendered = self.env.get_template(template)?.render(slots)?;
        let mut sections = parse_sections(&rendered);
        apply_budget_to_sections(&mut sections, self.budget_bytes);
        Ok(render_sections(&sections))
    }
}

/// A parsed section from rendered template output.
#[derive(Debug, Clone)]
struct ParsedSection {
    /// Section identifier (e.g., "contract", "research").
    key: String,
    /// Whether this section is required (cannot be dropped).
    required: bool,
    /// Full section content including header.
    content: String,
}

static SECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<!--\s*section:(\w+)\s+(required|droppable)\s*-->")
        .expect("section marker regex should be valid")
});

/// Parse sections from rendered template output using HTML comment markers.
///
/// Markers follow format: `<!-- section:KEY required|droppable -->`
fn parse_sections(rendered: &str) -> Vec<ParsedSection> {
    let markers: Vec<_> = SECTION_RE.captures_iter(rendered).collect();
    let mut sections = Vec::new();

    for (i, caps) in markers.iter().enumerate() {
        let (Some(whole), Some(key), Some(kind)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        let required = kind.as_str() == "required";
        let end = markers
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map_or(rendered.len(), |next| next.start());

        let content = rendered[whole.end()..end].trim().to_string();
        if !content.is_empty() || required {
            sections.push(ParsedSection {
                key: key.as_str().to_string(),
                required,
                content,
            });
        }
    }

    sections
}

/// Apply budget to parsed sections, dropping droppable sections as needed.
///
/// Drop order: research -> stories -> pillars -> voice -> brief
fn apply_budget_to_sections(sections: &mut Vec<ParsedSection>, budget: usize) {
    let total_len = |secs: &[ParsedSection]| -> usize { secs.iter().map(|s| s.content.len()).sum() };

    if total_len(sections) <= budget {
        return;
    }

    for key in DROP_ORDER {
        if total_len(sections) <= budget {
            break;
        }
        if let Some(idx) = sections.iter().position(|s| s.key == key && !s.required) {
            debug!(
                section = key,
                bytes_dropped = sections[idx].content.len(),
                "dropped section for budget"
            );
            sections.remove(idx);
        }
    }

    // Still over budget: truncate the last section.
    let other_len: usize = sections
        .iter()
        .take(sections.len().saturating_sub(1))
        .map(|s| s.content.len())
        .sum();
    let allowed = budget.saturating_sub(other_len);
    let Some(last) = sections.last_mut() else {
        return;
    };
    if last.content.len() > allowed {
        let before_len = last.content.len();
        let marker = "\n[truncated]";
        let keep = floor_char_boundary(&last.content, allowed.saturating_sub(marker.len()));
        last.content.truncate(keep);
        if allowed > marker.len() {
            last.content.push_str(marker);
        }
        debug!(
            section = last.key,
            before_len,
            after_len = last.content.len(),
            "truncated section for budget"
        );
    }
}

fn floor_char_boundary(text: &str, index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    (0..=index).rev().find(|&i| text.is_char_boundary(i)).unwrap_or(0)
}

/// Render sections back to a single string.
fn render_sections(sections: &[ParsedSection]) -> String {
    sections
        .iter()
        .map(|s| s.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}
