//! Orchestration for one post-generation run.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::agents::{
    Assembly, BodyGeneration, CtaGeneration, HookGeneration, QualityReview, ResearchStage, Stage,
    StageContext, TopicSelection,
};
use crate::core::ownership::check_stage_ownership;
use crate::core::types::StageName;
use crate::core::validators::ValidatorSet;
use crate::error::PipelineError;
use crate::identity::IdentitySpec;
use crate::io::config::PipelineConfig;
use crate::io::identity_store::{IdentityError, IdentityProvider};
use crate::io::model::ModelClient;
use crate::io::prompt::PromptEngine;
use crate::io::research::ResearchSource;
use crate::state::{PostPayload, PostState};

/// Result of one completed stage, handed to the progress observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageReport {
    pub stage: StageName,
    /// Model invocations spent, including regenerations.
    pub model_calls: usize,
    pub elapsed: Duration,
}

/// Runs the fixed stage roster against one state per run.
///
/// A pipeline is immutable once built, so independent runs may share it.
pub struct Pipeline {
    model: Arc<dyn ModelClient>,
    research: Arc<dyn ResearchSource>,
    prompts: PromptEngine,
    stages: Vec<Box<dyn Stage>>,
    identity: Option<Arc<IdentitySpec>>,
    validators: Option<Arc<ValidatorSet>>,
    config: PipelineConfig,
}

fn roster(research: &Arc<dyn ResearchSource>, hook: HookGeneration) -> Vec<Box<dyn Stage>> {
    vec![
        Box::new(TopicSelection),
        Box::new(ResearchStage::new(Arc::clone(research))),
        Box::new(hook),
        Box::new(BodyGeneration),
        Box::new(CtaGeneration),
        Box::new(QualityReview),
        Box::new(Assembly),
    ]
}

impl Pipeline {
    /// Brand-unaware pipeline: no identity, no validators.
    pub fn new(
        model: Arc<dyn ModelClient>,
        research: Arc<dyn ResearchSource>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            stages: roster(&research, HookGeneration::generic()),
            prompts: PromptEngine::new(config.prompt_budget_bytes),
            model,
            research,
            identity: None,
            validators: None,
            config,
        }
    }

    /// Bind `identity` once and switch the hook stage to its brand-aware variant.
    ///
    /// Fails when an approved hook template cannot be compiled.
    pub fn with_identity(mut self, identity: IdentitySpec) -> Result<Self, PipelineError> {
        let validators = bind_validators(&identity, &self.config)?;
        info!(
            creator = %identity.creator,
            templates = identity.hook_templates.len(),
            "bound identity validators"
        );
        self.identity = Some(Arc::new(identity));
        self.validators = Some(Arc::new(validators));
        self.stages = roster(&self.research, HookGeneration::brand_aware());
        Ok(self)
    }

    /// Load the active identity once from `provider`, then bind it.
    pub async fn with_identity_provider(
        self,
        provider: &dyn IdentityProvider,
    ) -> Result<Self, PipelineError> {
        let identity = provider.load_active_identity().await?;
        self.with_identity(identity)
    }

    pub fn stage_names(&self) -> Vec<StageName> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    pub fn identity(&self) -> Option<&IdentitySpec> {
        self.identity.as_deref()
    }

    /// Generate one post for `topic` (or a model-selected topic).
    pub async fn run(&self, topic: Option<String>) -> Result<PostPayload, PipelineError> {
        self.run_cancellable(topic, &CancellationToken::new()).await
    }

    pub async fn run_cancellable(
        &self,
        topic: Option<String>,
        cancel: &CancellationToken,
    ) -> Result<PostPayload, PipelineError> {
        let state = self
            .run_state(PostState::with_topic(topic), cancel, |_| {})
            .await?;
        state
            .post_payload
            .ok_or_else(|| PipelineError::InvariantViolation("no payload produced".to_string()))
    }

    /// Run every stage in order over `state` and return the final state.
    ///
    /// Checks cancellation before each stage and races each stage against
    /// `cancel`; after each stage, verifies field ownership and reports progress.
    #[instrument(skip_all, fields(topic = state.topic.as_deref().unwrap_or("<select>")))]
    pub async fn run_state(
        &self,
        mut state: PostState,
        cancel: &CancellationToken,
        mut on_stage: impl FnMut(&StageReport),
    ) -> Result<PostState, PipelineError> {
        self.bind_state(&mut state)?;
        let ctx = StageContext {
            model: self.model.as_ref(),
            prompts: &self.prompts,
        };

        for stage in &self.stages {
            let name = stage.name();
            if cancel.is_cancelled() {
                info!(stage = %name, "run cancelled before stage");
                return Err(PipelineError::Cancelled);
            }

            let snapshot = state.clone();
            let started = Instant::now();
            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    info!(stage = %name, "run cancelled during stage");
                    return Err(PipelineError::Cancelled);
                }
                result = stage.run(&ctx, &mut state) => result,
            };
            let outcome = result.inspect_err(|err| {
                warn!(stage = %name, error = %err, "stage failed");
            })?;

            let violations = check_stage_ownership(&snapshot, &state, name, stage.owns());
            if !violations.is_empty() {
                return Err(PipelineError::InvariantViolation(violations.join("; ")));
            }

            let report = StageReport {
                stage: name,
                model_calls: outcome.model_calls,
                elapsed: started.elapsed(),
            };
            info!(
                stage = %name,
                model_calls = report.model_calls,
                elapsed_ms = report.elapsed.as_millis() as u64,
                "stage complete"
            );
            on_stage(&report);
        }

        if state.post_payload.is_none() {
            return Err(PipelineError::InvariantViolation(
                "no payload produced".to_string(),
            ));
        }
        Ok(state)
    }

    /// Run from an untyped state map and return the final state as a map.
    pub async fn run_map(&self, map: Map<String, Value>) -> Result<Map<String, Value>, PipelineError> {
        let state = PostState::from_map(&map)?;
        let done = self
            .run_state(state, &CancellationToken::new(), |_| {})
            .await?;
        done.to_map()
            .map_err(|err| PipelineError::InvariantViolation(format!("serialize final state: {err}")))
    }

    /// Attach the pipeline's identity, or re-bind validators for an identity
    /// the state already carries using this pipeline's validation config.
    fn bind_state(&self, state: &mut PostState) -> Result<(), PipelineError> {
        match (&self.identity, &self.validators) {
            (Some(identity), Some(validators)) => {
                state.attach_identity(Arc::clone(identity), Arc::clone(validators));
            }
            _ => {
                if let Some(identity) = &state.identity {
                    let validators = bind_validators(identity, &self.config)?;
                    state.validators = Some(Arc::new(validators));
                }
            }
        }
        Ok(())
    }
}

fn bind_validators(
    identity: &IdentitySpec,
    config: &PipelineConfig,
) -> Result<ValidatorSet, PipelineError> {
    ValidatorSet::bind(identity, &config.validation).map_err(|err| {
        PipelineError::Identity(IdentityError::Invalid {
            source_name: identity.creator.clone(),
            message: err.to_string(),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::research::NoResearch;
    use crate::test_support::{ScriptedModel, identity};

    fn pipeline(model: ScriptedModel) -> Pipeline {
        Pipeline::new(
            Arc::new(model),
            Arc::new(NoResearch),
            PipelineConfig::default(),
        )
    }

    #[test]
    fn roster_runs_in_fixed_order() {
        let pipeline = pipeline(ScriptedModel::new());
        assert_eq!(pipeline.stage_names(), StageName::ORDER.to_vec());
    }

    #[tokio::test]
    async fn identity_provider_binds_brand_aware_roster() {
        let provider = crate::io::identity_store::StaticIdentityProvider::new(identity());
        let pipeline = pipeline(ScriptedModel::new())
            .with_identity_provider(&provider)
            .await
            .expect("identity");
        assert_eq!(pipeline.identity().map(|spec| spec.creator.as_str()), Some("Dana Ortiz"));
        assert_eq!(pipeline.stage_names(), StageName::ORDER.to_vec());
    }

    #[tokio::test]
    async fn missing_identity_fails_before_any_stage() {
        let provider = crate::io::identity_store::StaticIdentityProvider::empty();
        let result = pipeline(ScriptedModel::new())
            .with_identity_provider(&provider)
            .await;
        assert!(matches!(result, Err(PipelineError::Identity(_))));
    }

    #[test]
    fn uncompilable_template_rejects_identity() {
        let mut spec = identity();
        spec.hook_templates.push(format!("{}{{tail}}", "word ".repeat(400_000)));
        let result = pipeline(ScriptedModel::new()).with_identity(spec);
        match result {
            Err(PipelineError::Identity(IdentityError::Invalid { source_name, .. })) => {
                assert_eq!(source_name, "Dana Ortiz");
            }
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("identity should be rejected"),
        }
    }

    #[tokio::test]
    async fn state_identity_is_rebound_with_pipeline_config() {
        let mut config = PipelineConfig::default();
        config.validation.max_emojis = 0;
        let pipeline = Pipeline::new(Arc::new(ScriptedModel::new()), Arc::new(NoResearch), config);
        let mut state = PostState::new();
        state.identity = Some(Arc::new(identity()));
        pipeline.bind_state(&mut state).expect("bind");
        let validators = state.validators.expect("validators");
        assert!(!validators.check_structure("Hi \u{1F44B}.").is_accepted());
    }
}
