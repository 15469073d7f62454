//! Model client abstraction for stage invocation.
//!
//! The [`ModelClient`] trait decouples stages from the actual language-model
//! backend. Tests use scripted clients that return predetermined payloads
//! without any network access.

use async_trait::async_trait;
use jsonschema::Draft;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::core::types::StageName;

/// Parameters for one structured model invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptSpec {
    /// Stage issuing the request.
    pub stage: StageName,
    /// Name of the prompt template the prompt was rendered from.
    pub template: &'static str,
    /// Values the template was rendered with.
    pub slots: Value,
    /// Rendered prompt text.
    pub prompt: String,
    /// JSON Schema (Draft 2020-12) the structured output must satisfy.
    pub output_schema: Value,
    /// Corrective notes appended for regeneration, oldest first.
    pub guidance: Vec<String>,
}

impl PromptSpec {
    /// Copy of this request with one more corrective note appended to the prompt.
    pub fn with_guidance(&self, note: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.guidance.push(note.into());
        next
    }

    /// Prompt text including any corrective guidance.
    pub fn full_prompt(&self) -> String {
        if self.guidance.is_empty() {
            return self.prompt.clone();
        }
        let mut buf = self.prompt.clone();
        buf.push_str("\n\n<guidance>\nThe previous attempt was rejected. Fix the following:\n");
        for note in &self.guidance {
            buf.push_str("- ");
            buf.push_str(note);
            buf.push('\n');
        }
        buf.push_str("</guidance>");
        buf
    }
}

/// Failure reported by the model boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("model request failed: {0}")]
    Request(String),
    #[error("model quota exhausted: {0}")]
    Quota(String),
    #[error("model returned malformed output: {0}")]
    Malformed(String),
    #[error("model output does not match schema: {}", .0.join("; "))]
    SchemaMismatch(Vec<String>),
    #[error("invalid output schema: {0}")]
    InvalidSchema(String),
}

/// Abstraction over language-model backends.
///
/// Implementations own transport, retries, and token limits. The returned
/// value is either the structured object or a JSON string containing it.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn invoke(&self, request: &PromptSpec) -> Result<Value, ModelError>;
}

/// Invoke the model and load its output as `T`.
///
/// This is the single normalization point for model output: a string payload
/// is parsed as JSON (markdown code fences stripped), the value is validated
/// against `request.output_schema`, then deserialized.
#[instrument(skip_all, fields(stage = %request.stage, template = request.template))]
pub async fn invoke_structured<T: DeserializeOwned>(
    client: &dyn ModelClient,
    request: &PromptSpec,
) -> Result<T, ModelError> {
    let raw = client.invoke(request).await?;
    let value = normalize_payload(raw)?;
    validate_schema(&value, &request.output_schema)?;
    let parsed = serde_json::from_value(value).map_err(|err| ModelError::Malformed(err.to_string()))?;
    debug!("parsed structured model output");
    Ok(parsed)
}

fn normalize_payload(raw: Value) -> Result<Value, ModelError> {
    match raw {
        Value::String(text) => serde_json::from_str(strip_code_fence(&text))
            .map_err(|err| ModelError::Malformed(format!("payload is not JSON: {err}"))),
        other => Ok(other),
    }
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. `json`) on the opening fence line.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Validate JSON instance against a JSON Schema (Draft 2020-12).
fn validate_schema(instance: &Value, schema: &Value) -> Result<(), ModelError> {
    let compiled = jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(schema)
        .map_err(|err| ModelError::InvalidSchema(err.to_string()))?;
    let messages: Vec<String> = compiled
        .iter_errors(instance)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        return Err(ModelError::SchemaMismatch(messages));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    struct FixedModel(Value);

    #[async_trait]
    impl ModelClient for FixedModel {
        async fn invoke(&self, _request: &PromptSpec) -> Result<Value, ModelError> {
            Ok(self.0.clone())
        }
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Tagged {
        tags: Vec<String>,
    }

    fn request() -> PromptSpec {
        PromptSpec {
            stage: StageName::Research,
            template: "research",
            slots: json!({}),
            prompt: "prompt".to_string(),
            output_schema: json!({
                "type": "object",
                "required": ["tags"],
                "properties": { "tags": { "type": "array", "items": { "type": "string" } } }
            }),
            guidance: Vec::new(),
        }
    }

    #[tokio::test]
    async fn structured_object_is_validated_and_parsed() {
        let model = FixedModel(json!({ "tags": ["a", "b"] }));
        let parsed: Tagged = invoke_structured(&model, &request()).await.expect("parse");
        assert_eq!(parsed.tags, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn fenced_json_string_is_normalized() {
        let model = FixedModel(Value::from("```json\n{\"tags\": [\"x\"]}\n```"));
        let parsed: Tagged = invoke_structured(&model, &request()).await.expect("parse");
        assert_eq!(parsed.tags, vec!["x"]);
    }

    #[tokio::test]
    async fn string_where_list_expected_is_schema_mismatch() {
        let model = FixedModel(json!({ "tags": "a, b" }));
        let err = invoke_structured::<Tagged>(&model, &request()).await.unwrap_err();
        assert!(matches!(err, ModelError::SchemaMismatch(_)), "{err:?}");
    }

    #[tokio::test]
    async fn non_json_text_is_malformed() {
        let model = FixedModel(Value::from("Sure! Here are some tags."));
        let err = invoke_structured::<Tagged>(&model, &request()).await.unwrap_err();
        assert!(matches!(err, ModelError::Malformed(_)), "{err:?}");
    }

    #[test]
    fn guidance_is_appended_in_order() {
        let spec = request().with_guidance("no template match").with_guidance("simplify");
        let prompt = spec.full_prompt();
        assert!(prompt.starts_with("prompt"));
        let first = prompt.find("- no template match").expect("first note");
        let second = prompt.find("- simplify").expect("second note");
        assert!(first < second);
        assert_eq!(request().full_prompt(), "prompt");
    }

    #[test]
    fn strip_code_fence_handles_plain_and_fenced_text() {
        assert_eq!(strip_code_fence("  {\"a\":1} "), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```json\n{\"a\":1}```"), "{\"a\":1}");
    }
}
