//! Stage abstractions and the concrete pipeline stages.
//!
//! Concrete stages implement the typed [`Agent`] trait. A blanket impl turns
//! every agent into an object-safe [`Stage`] so the pipeline can hold an
//! ordered roster of boxed stages.

use std::fmt;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::core::types::{StageName, Verdict};
use crate::core::validators::ValidatorSet;
use crate::error::PipelineError;
use crate::io::model::{ModelClient, PromptSpec};
use crate::io::prompt::PromptEngine;
use crate::io::schemas::output_schema;
use crate::state::{PostState, StateField};

pub mod assemble;
pub mod body;
pub mod cta;
pub mod hook;
pub mod regenerate;
pub mod research;
pub mod review;
pub mod topic;

pub use assemble::Assembly;
pub use body::BodyGeneration;
pub use cta::CtaGeneration;
pub use hook::HookGeneration;
pub use research::ResearchStage;
pub use review::QualityReview;
pub use topic::TopicSelection;

/// Shared collaborators handed to every stage of a run.
#[derive(Clone, Copy)]
pub struct StageContext<'a> {
    pub model: &'a dyn ModelClient,
    pub prompts: &'a PromptEngine,
}

/// What a completed stage reports back to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageOutcome {
    pub model_calls: usize,
}

/// Object-safe stage contract driven by the pipeline.
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> StageName;

    /// Fields this stage may write (besides appending one message).
    fn owns(&self) -> &'static [StateField];

    /// Check declared inputs in order and report the first missing one.
    fn precondition(&self, state: &PostState) -> Result<(), PipelineError>;

    /// Precondition, prompt, invoke, validate/regenerate, apply.
    async fn run(
        &self,
        ctx: &StageContext<'_>,
        state: &mut PostState,
    ) -> Result<StageOutcome, PipelineError>;
}

/// Typed stage definition.
#[async_trait]
pub trait Agent: Send + Sync {
    type Output: DeserializeOwned + Send + fmt::Debug;

    const NAME: StageName;
    /// Prompt template rendered for this stage.
    const TEMPLATE: &'static str;

    fn required_fields(&self) -> &'static [StateField];

    fn owned_fields(&self) -> &'static [StateField];

    /// Best-effort external context fetched before prompting.
    async fn gather(&self, _state: &PostState) -> Option<String> {
        None
    }

    /// Template slots for this stage. Must not touch anything but `state`.
    fn slots(&self, state: &PostState, gathered: Option<&str>) -> Value;

    fn build_prompt(
        &self,
        prompts: &PromptEngine,
        state: &PostState,
        gathered: Option<&str>,
    ) -> Result<PromptSpec, PipelineError> {
        let slots = self.slots(state, gathered);
        let prompt = prompts.render(Self::TEMPLATE, &slots).map_err(|err| {
            PipelineError::InvariantViolation(format!("render {} prompt: {err}", Self::TEMPLATE))
        })?;
        Ok(PromptSpec {
            stage: Self::NAME,
            template: Self::TEMPLATE,
            slots,
            prompt,
            output_schema: output_schema(Self::NAME),
            guidance: Vec::new(),
        })
    }

    /// Structural or template check on generated output.
    fn validate(&self, _output: &Self::Output, _validators: &ValidatorSet) -> Verdict {
        Verdict::Accepted
    }

    /// Generated text subject to regeneration; `None` opts out entirely.
    fn content<'o>(&self, _output: &'o Self::Output) -> Option<&'o str> {
        None
    }

    /// Write owned fields and append exactly one message.
    fn apply(&self, output: Self::Output, state: &mut PostState);
}

#[async_trait]
impl<A: Agent> Stage for A {
    fn name(&self) -> StageName {
        A::NAME
    }

    fn owns(&self) -> &'static [StateField] {
        self.owned_fields()
    }

    fn precondition(&self, state: &PostState) -> Result<(), PipelineError> {
        match self
            .required_fields()
            .iter()
            .find(|field| !state.has(**field))
        {
            Some(field) => Err(PipelineError::MissingInput {
                stage: A::NAME,
                field: *field,
            }),
            None => Ok(()),
        }
    }

    async fn run(
        &self,
        ctx: &StageContext<'_>,
        state: &mut PostState,
    ) -> Result<StageOutcome, PipelineError> {
        self.precondition(state)?;
        let gathered = self.gather(state).await;
        let prompt = self.build_prompt(ctx.prompts, state, gathered.as_deref())?;
        let refined =
            regenerate::refine(self, ctx.model, &prompt, state.validators.as_deref()).await?;
        self.apply(refined.output, state);
        Ok(StageOutcome {
            model_calls: refined.model_calls,
        })
    }
}

/// Voice descriptor lines of the attached identity, if any.
pub(crate) fn voice_lines(state: &PostState) -> Vec<String> {
    state
        .identity
        .as_deref()
        .map(|spec| spec.voice_lines())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::populated_state;

    #[test]
    fn precondition_reports_first_missing_field_in_declaration_order() {
        let mut state = populated_state();
        state.body_text = None;
        state.hook_text = None;
        let err = QualityReview.precondition(&state).unwrap_err();
        match err {
            PipelineError::MissingInput { stage, field } => {
                assert_eq!(stage, StageName::QualityReview);
                assert_eq!(field, StateField::HookText);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn blank_text_does_not_satisfy_precondition() {
        let mut state = populated_state();
        state.body_text = Some("   ".to_string());
        let err = CtaGeneration.precondition(&state).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::MissingInput {
                field: StateField::BodyText,
                ..
            }
        ));
    }

    #[test]
    fn prompts_carry_stage_schema_and_template() {
        let prompts = PromptEngine::new(24_000);
        let spec = BodyGeneration
            .build_prompt(&prompts, &populated_state(), None)
            .expect("prompt");
        assert_eq!(spec.stage, StageName::BodyGeneration);
        assert_eq!(spec.template, "body");
        assert_eq!(spec.output_schema, output_schema(StageName::BodyGeneration));
        assert!(spec.guidance.is_empty());
    }
}
