//! Bounded validation-triggered regeneration.
//!
//! Hook, body and CTA output gets at most two corrective regenerations: one
//! for a structural or template rejection, one for a low tone score. Second
//! failures are logged and accepted.

use tracing::{debug, warn};

use super::Agent;
use crate::core::types::Verdict;
use crate::core::validators::ValidatorSet;
use crate::error::PipelineError;
use crate::io::model::{ModelClient, PromptSpec, invoke_structured};

pub const READABILITY_GUIDANCE: &str =
    "Rewrite for readability: use shorter sentences and simpler, everyday words.";

/// Accepted output plus the number of model calls spent on it.
#[derive(Debug)]
pub struct Refined<T> {
    pub output: T,
    pub model_calls: usize,
}

pub fn rejection_guidance(reason: &str) -> String {
    format!("The previous output was rejected ({reason}). Produce a new version that fixes this.")
}

/// Invoke the agent's prompt and run the regeneration loop on the result.
///
/// The loop only runs when `validators` is bound and the agent exposes
/// content. The tone check only runs on a candidate that passed the structural
/// or template check. Guidance accumulates, so the tone retry keeps earlier
/// corrections.
pub async fn refine<A: Agent>(
    agent: &A,
    model: &dyn ModelClient,
    prompt: &PromptSpec,
    validators: Option<&ValidatorSet>,
) -> Result<Refined<A::Output>, PipelineError> {
    let mut output = invoke::<A>(model, prompt).await?;
    let mut model_calls = 1;

    let Some(validators) = validators else {
        return Ok(Refined { output, model_calls });
    };
    if agent.content(&output).is_none() {
        return Ok(Refined { output, model_calls });
    }

    let mut current = prompt.clone();
    if let Verdict::Rejected(reason) = agent.validate(&output, validators) {
        warn!(stage = %A::NAME, reason = %reason, "output rejected, regenerating");
        current = current.with_guidance(rejection_guidance(&reason));
        output = invoke::<A>(model, &current).await?;
        model_calls += 1;
        if let Verdict::Rejected(again) = agent.validate(&output, validators) {
            warn!(stage = %A::NAME, reason = %again, "regenerated output still rejected, accepting");
            return Ok(Refined { output, model_calls });
        }
    }

    let threshold = validators.tone_threshold();
    let score = agent
        .content(&output)
        .map_or(1.0, |text| validators.tone_score(text));
    if score < threshold {
        warn!(stage = %A::NAME, score, threshold, "tone score below threshold, regenerating");
        current = current.with_guidance(READABILITY_GUIDANCE);
        output = invoke::<A>(model, &current).await?;
        model_calls += 1;
        let rescored = agent
            .content(&output)
            .map_or(1.0, |text| validators.tone_score(text));
        if rescored < threshold {
            warn!(stage = %A::NAME, score = rescored, threshold, "regenerated tone still low, accepting");
        }
    }

    debug!(stage = %A::NAME, model_calls, "output accepted");
    Ok(Refined { output, model_calls })
}

async fn invoke<A: Agent>(
    model: &dyn ModelClient,
    prompt: &PromptSpec,
) -> Result<A::Output, PipelineError> {
    invoke_structured(model, prompt)
        .await
        .map_err(|source| PipelineError::Model {
            stage: A::NAME,
            source,
        })
}
