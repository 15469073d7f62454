//! Hook template matching.
//!
//! A template such as `"Did you know {fact}?"` compiles to an anchored regex in
//! which every `{name}` placeholder matches any non-empty span and every other
//! character is literal. Braces that do not form a placeholder (unbalanced,
//! empty, or nested) are literal too.

use regex::Regex;

/// Reason reported when a hook matches none of the approved templates.
pub const NO_TEMPLATE_MATCH: &str = "no template match";

/// An approved template that cannot be compiled into a matcher.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("hook template {template:?} cannot be compiled: {message}")]
pub struct TemplateError {
    pub template: String,
    pub message: String,
}

/// An approved hook template compiled for full-string matching.
#[derive(Debug, Clone)]
pub struct HookTemplate {
    source: String,
    pattern: Regex,
}

impl HookTemplate {
    /// Compile `source`. Only fails when the pattern exceeds the regex size
    /// limit, which very long templates can do.
    pub fn compile(source: &str) -> Result<Self, TemplateError> {
        let pattern = Regex::new(&template_pattern(source)).map_err(|err| TemplateError {
            template: source.to_string(),
            message: err.to_string(),
        })?;
        Ok(Self {
            source: source.to_string(),
            pattern,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, candidate: &str) -> bool {
        self.pattern.is_match(candidate)
    }
}

/// Index of the first template that fully matches `candidate`.
pub fn first_match(templates: &[HookTemplate], candidate: &str) -> Option<usize> {
    templates
        .iter()
        .position(|template| template.matches(candidate))
}

fn template_pattern(source: &str) -> String {
    let mut pattern = String::from(r"(?s)\A");
    let mut literal = String::new();
    let mut rest = source;

    while let Some(open) = rest.find('{') {
        let after_open = &rest[open + 1..];
        let placeholder = after_open
            .find('}')
            .map(|close| &after_open[..close])
            .filter(|name| !name.is_empty() && !name.contains('{'));

        match placeholder {
            Some(name) => {
                literal.push_str(&rest[..open]);
                pattern.push_str(&regex::escape(&literal));
                literal.clear();
                pattern.push_str(".+");
                rest = &after_open[name.len() + 1..];
            }
            None => {
                literal.push_str(&rest[..=open]);
                rest = after_open;
            }
        }
    }

    literal.push_str(rest);
    pattern.push_str(&regex::escape(&literal));
    pattern.push_str(r"\z");
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compiled(sources: &[&str]) -> Vec<HookTemplate> {
        sources
            .iter()
            .map(|source| HookTemplate::compile(source).expect("compile"))
            .collect()
    }

    #[test]
    fn placeholder_matches_any_non_empty_span() {
        let templates = compiled(&["Did you know {fact}?", "Here's why {claim}."]);
        assert_eq!(first_match(&templates, "Did you know AI saves time?"), Some(0));
        assert_eq!(first_match(&templates, "Here's why rust wins."), Some(1));
        assert_eq!(first_match(&templates, "AI saves time."), None);
    }

    #[test]
    fn placeholder_requires_at_least_one_character() {
        let templates = compiled(&["Did you know {fact}?"]);
        assert_eq!(first_match(&templates, "Did you know x?"), Some(0));
        assert_eq!(first_match(&templates, "Did you know ?"), None);
        assert_eq!(first_match(&templates, "Did you know?"), None);
    }

    #[test]
    fn literal_text_must_match_exactly_and_fully() {
        let templates = compiled(&["Stop {habit}. Start {habit}."]);
        assert!(templates[0].matches("Stop scrolling. Start writing."));
        assert!(!templates[0].matches("stop scrolling. Start writing."));
        assert!(!templates[0].matches("Stop scrolling. Start writing"));
        assert!(!templates[0].matches("Please Stop scrolling. Start writing."));
        // A placeholder may absorb text that looks like more template.
        assert!(templates[0].matches("Stop scrolling. Start writing. Now."));
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        let templates = compiled(&["(1) {tip} [+] $5.00"]);
        assert!(templates[0].matches("(1) batch your email [+] $5.00"));
        assert!(!templates[0].matches("1 batch your email + $5x00"));
    }

    #[test]
    fn malformed_braces_are_literal() {
        let templates = compiled(&["Use {} and {open"]);
        assert!(templates[0].matches("Use {} and {open"));
        assert!(!templates[0].matches("Use x and y"));
    }

    #[test]
    fn oversized_template_is_an_error() {
        let huge = format!("{}{{tail}}", "word ".repeat(400_000));
        let err = HookTemplate::compile(&huge).unwrap_err();
        assert_eq!(err.template.len(), huge.len());
    }

    #[test]
    fn placeholder_spans_newlines() {
        let templates = compiled(&["Lesson: {lesson}"]);
        assert!(templates[0].matches("Lesson: ship early\nand often"));
    }
}
