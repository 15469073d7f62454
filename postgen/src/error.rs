//! Errors surfaced by a pipeline run.

use crate::core::types::StageName;
use crate::io::identity_store::IdentityError;
use crate::io::model::ModelError;
use crate::state::{SchemaError, StateField};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A stage ran before one of its declared inputs was populated.
    #[error("stage {stage} is missing required input `{field}`")]
    MissingInput { stage: StageName, field: StateField },

    #[error("stage {stage} model invocation failed")]
    Model {
        stage: StageName,
        #[source]
        source: ModelError,
    },

    /// The pipeline or a stage broke its own contract.
    #[error("pipeline invariant violated: {0}")]
    InvariantViolation(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("identity unavailable")]
    Identity(#[from] IdentityError),

    #[error("pipeline run cancelled")]
    Cancelled,
}

impl PipelineError {
    /// Stage the failure is attributed to, when there is one.
    pub fn stage(&self) -> Option<StageName> {
        match self {
            PipelineError::MissingInput { stage, .. } | PipelineError::Model { stage, .. } => {
                Some(*stage)
            }
            _ => None,
        }
    }
}
