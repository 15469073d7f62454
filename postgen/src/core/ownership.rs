//! Field ownership checks between consecutive stage snapshots.

use std::sync::Arc;

use super::types::StageName;
use crate::state::{PostState, StateField};

/// Validate that `stage` only touched the fields it owns.
///
/// Given the state before (`prev`) and after (`next`) the stage, this check
/// enforces:
/// - Fields outside `owned` are unchanged (identity and validators by pointer or value).
/// - `research_items` only grows by appending, even for its owner.
/// - Owned fields that were already populated in `prev` are unchanged.
/// - `messages` grew by exactly one entry, attributed to `stage`.
///
/// Returns a list of stable error messages in field order.
pub fn check_stage_ownership(
    prev: &PostState,
    next: &PostState,
    stage: StageName,
    owned: &[StateField],
) -> Vec<String> {
    let mut errors = Vec::new();

    for field in StateField::ALL {
        if field == StateField::Messages {
            continue;
        }
        let is_owner = owned.contains(&field);
        if field == StateField::ResearchItems && is_owner {
            if !next.research_items.starts_with(&prev.research_items) {
                errors.push(format!("stage '{stage}' rewrote existing research_items"));
            }
            continue;
        }
        if field_unchanged(prev, next, field) {
            continue;
        }
        if !is_owner {
            errors.push(format!("stage '{stage}' modified field '{field}' it does not own"));
        } else if prev.has(field) {
            errors.push(format!("stage '{stage}' overwrote populated field '{field}'"));
        }
    }

    check_messages(prev, next, stage, &mut errors);
    errors
}

fn check_messages(prev: &PostState, next: &PostState, stage: StageName, errors: &mut Vec<String>) {
    if !next.messages.starts_with(&prev.messages) {
        errors.push(format!("stage '{stage}' rewrote existing messages"));
        return;
    }
    let appended = &next.messages[prev.messages.len()..];
    match appended {
        [message] if message.stage == stage => {}
        [message] => errors.push(format!(
            "stage '{stage}' appended a message attributed to '{}'",
            message.stage
        )),
        _ => errors.push(format!(
            "stage '{stage}' appended {} messages, expected exactly 1",
            appended.len()
        )),
    }
}

fn field_unchanged(prev: &PostState, next: &PostState, field: StateField) -> bool {
    match field {
        StateField::Topic => prev.topic == next.topic,
        StateField::Brief => prev.brief == next.brief,
        StateField::ResearchItems => prev.research_items == next.research_items,
        StateField::HookText => prev.hook_text == next.hook_text,
        StateField::BodyText => prev.body_text == next.body_text,
        StateField::CtaText => prev.cta_text == next.cta_text,
        StateField::Identity => same_shared(&prev.identity, &next.identity, |a, b| a == b),
        StateField::Validators => same_shared(&prev.validators, &next.validators, |_, _| false),
        StateField::QaFeedback => prev.qa_feedback == next.qa_feedback,
        StateField::QaSuggestions => prev.qa_suggestions == next.qa_suggestions,
        StateField::QaScore => prev.qa_score == next.qa_score,
        StateField::QaIssues => prev.qa_issues == next.qa_issues,
        StateField::PostPayload => prev.post_payload == next.post_payload,
        StateField::Messages => prev.messages == next.messages,
    }
}

fn same_shared<T>(prev: &Option<Arc<T>>, next: &Option<Arc<T>>, eq: impl Fn(&T, &T) -> bool) -> bool {
    match (prev, next) {
        (None, None) => true,
        (Some(a), Some(b)) => Arc::ptr_eq(a, b) || eq(a, b),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::validators::{ValidationConfig, ValidatorSet};
    use crate::state::ResearchItem;
    use crate::test_support::{identity, populated_state};

    fn item(source: &str) -> ResearchItem {
        ResearchItem {
            source: source.to_string(),
            snippet: "snippet".to_string(),
        }
    }

    /// A stage writing only its own fields and one message passes.
    #[test]
    fn ownership_allows_owned_write_with_one_message() {
        let mut prev = populated_state();
        prev.cta_text = None;
        let mut next = prev.clone();
        next.cta_text = Some("Follow for more.".to_string());
        next.push_message(StageName::CtaGeneration, "cta ready");
        let errors =
            check_stage_ownership(&prev, &next, StageName::CtaGeneration, &[StateField::CtaText]);
        assert!(errors.is_empty(), "{errors:?}");
    }

    #[test]
    fn ownership_reports_foreign_field_write() {
        let prev = populated_state();
        let mut next = prev.clone();
        next.topic = Some("Something else".to_string());
        next.push_message(StageName::BodyGeneration, "body");
        let errors =
            check_stage_ownership(&prev, &next, StageName::BodyGeneration, &[StateField::BodyText]);
        assert_eq!(
            errors,
            vec!["stage 'body_generation' modified field 'topic' it does not own"]
        );
    }

    #[test]
    fn ownership_reports_overwrite_of_populated_owned_field() {
        let prev = populated_state();
        let mut next = prev.clone();
        next.hook_text = Some("A different hook.".to_string());
        next.push_message(StageName::HookGeneration, "hook");
        let errors =
            check_stage_ownership(&prev, &next, StageName::HookGeneration, &[StateField::HookText]);
        assert!(errors.iter().any(|err| err.contains("overwrote populated field 'hook_text'")));
    }

    #[test]
    fn research_items_are_append_only() {
        let mut prev = PostState::with_topic(Some("AI".to_string()));
        prev.research_items = vec![item("a")];

        let mut appended = prev.clone();
        appended.research_items.push(item("b"));
        appended.push_message(StageName::Research, "research");
        assert!(
            check_stage_ownership(&prev, &appended, StageName::Research, &[StateField::ResearchItems])
                .is_empty()
        );

        let mut replaced = prev.clone();
        replaced.research_items = vec![item("b")];
        replaced.push_message(StageName::Research, "research");
        let errors =
            check_stage_ownership(&prev, &replaced, StageName::Research, &[StateField::ResearchItems]);
        assert!(errors.iter().any(|err| err.contains("rewrote existing research_items")));
    }

    #[test]
    fn identity_and_validators_compare_by_pointer() {
        let spec = Arc::new(identity());
        let validators =
            Arc::new(ValidatorSet::bind(&spec, &ValidationConfig::default()).expect("bind"));
        let mut prev = populated_state();
        prev.attach_identity(Arc::clone(&spec), Arc::clone(&validators));

        let mut next = prev.clone();
        next.push_message(StageName::QualityReview, "review");
        assert!(check_stage_ownership(&prev, &next, StageName::QualityReview, &[]).is_empty());

        let rebound = ValidatorSet::bind(&spec, &ValidationConfig::default()).expect("bind");
        next.validators = Some(Arc::new(rebound));
        let errors = check_stage_ownership(&prev, &next, StageName::QualityReview, &[]);
        assert!(errors.iter().any(|err| err.contains("'validators'")));
    }

    #[test]
    fn messages_must_grow_by_exactly_one_from_this_stage() {
        let prev = populated_state();

        let silent = prev.clone();
        let errors = check_stage_ownership(&prev, &silent, StageName::Assembly, &[]);
        assert_eq!(errors, vec!["stage 'assembly' appended 0 messages, expected exactly 1"]);

        let mut misattributed = prev.clone();
        misattributed.push_message(StageName::Research, "wrong stage");
        let errors = check_stage_ownership(&prev, &misattributed, StageName::Assembly, &[]);
        assert!(errors[0].contains("attributed to 'research'"));

        let mut rewritten = prev.clone();
        rewritten.messages.clear();
        rewritten.push_message(StageName::Assembly, "assembled");
        let errors = check_stage_ownership(&prev, &rewritten, StageName::Assembly, &[]);
        assert!(errors.iter().any(|err| err.contains("rewrote existing messages")));
    }
}
