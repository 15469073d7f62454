//! Identity loading with schema validation.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use jsonschema::Draft;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::core::template::HookTemplate;
use crate::identity::IdentitySpec;
use crate::io::schemas::identity_schema;

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("no active identity found ({0})")]
    NotFound(String),
    #[error("invalid identity {source_name}: {message}")]
    Invalid { source_name: String, message: String },
}

/// Source of the creator's active identity spec.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn load_active_identity(&self) -> Result<IdentitySpec, IdentityError>;
}

/// Identity read from a local JSON or TOML file.
#[derive(Debug, Clone)]
pub struct FileIdentityProvider {
    path: PathBuf,
}

impl FileIdentityProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl IdentityProvider for FileIdentityProvider {
    async fn load_active_identity(&self) -> Result<IdentitySpec, IdentityError> {
        let contents = tokio::fs::read_to_string(&self.path).await;
        decode_identity(&self.path, contents)
    }
}

/// Identity held in memory.
#[derive(Debug, Clone)]
pub struct StaticIdentityProvider {
    identity: Option<IdentitySpec>,
}

impl StaticIdentityProvider {
    pub fn new(identity: IdentitySpec) -> Self {
        Self {
            identity: Some(identity),
        }
    }

    /// Provider with no active identity.
    pub fn empty() -> Self {
        Self { identity: None }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn load_active_identity(&self) -> Result<IdentitySpec, IdentityError> {
        self.identity
            .clone()
            .ok_or_else(|| IdentityError::NotFound("no identity configured".to_string()))
    }
}

/// Load and validate an identity file. `.toml` files are parsed as TOML,
/// everything else as JSON.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_identity(path: &Path) -> Result<IdentitySpec, IdentityError> {
    decode_identity(path, fs::read_to_string(path))
}

fn decode_identity(
    path: &Path,
    contents: std::io::Result<String>,
) -> Result<IdentitySpec, IdentityError> {
    let source_name = path.display().to_string();
    let contents = match contents {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(IdentityError::NotFound(source_name));
        }
        Err(err) => {
            return Err(IdentityError::Invalid {
                source_name,
                message: format!("read failed: {err}"),
            });
        }
    };

    let is_toml = path.extension().is_some_and(|ext| ext == "toml");
    let value: Value = if is_toml {
        toml::from_str(&contents).map_err(|err| invalid(&source_name, format!("parse toml: {err}")))?
    } else {
        serde_json::from_str(&contents)
            .map_err(|err| invalid(&source_name, format!("parse json: {err}")))?
    };
    parse_identity(&source_name, value)
}

/// Validate a raw identity value against the identity schema and deserialize it.
pub fn parse_identity(source_name: &str, value: Value) -> Result<IdentitySpec, IdentityError> {
    let compiled = jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(identity_schema())
        .map_err(|err| invalid(source_name, format!("compile identity schema: {err}")))?;
    let messages: Vec<String> = compiled
        .iter_errors(&value)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        return Err(invalid(source_name, messages.join("; ")));
    }
    let spec: IdentitySpec =
        serde_json::from_value(value).map_err(|err| invalid(source_name, err.to_string()))?;
    for template in &spec.hook_templates {
        HookTemplate::compile(template).map_err(|err| invalid(source_name, err.to_string()))?;
    }
    debug!(creator = %spec.creator, templates = spec.hook_templates.len(), "loaded identity");
    Ok(spec)
}

fn invalid(source_name: &str, message: String) -> IdentityError {
    IdentityError::Invalid {
        source_name: source_name.to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::identity;
    use serde_json::json;

    fn write_json(dir: &Path, spec: &Value) -> PathBuf {
        let path = dir.join("identity.json");
        fs::write(&path, serde_json::to_string_pretty(spec).expect("json")).expect("write");
        path
    }

    #[tokio::test]
    async fn file_provider_loads_json_identity() {
        let temp = tempfile::tempdir().expect("tempdir");
        let raw = serde_json::to_value(identity()).expect("value");
        let provider = FileIdentityProvider::new(write_json(temp.path(), &raw));
        let spec = provider.load_active_identity().await.expect("load");
        assert_eq!(spec, identity());
    }

    #[test]
    fn toml_identity_is_accepted() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("identity.toml");
        fs::write(
            &path,
            r##"
creator = "Dana Ortiz"
promise = "Practical remote-work habits that stick"
pillars_ranked = ["focus", "async communication"]
signature_stories = []
hook_templates = ["Did you know {fact}?"]
cta_style = "direct question"

[voice]
energy = "high"

[visual]
primary_color = "#0a66c2"
background = "white"
font_family = "Inter"
"##,
        )
        .expect("write");
        let spec = load_identity(&path).expect("load");
        assert_eq!(spec.creator, "Dana Ortiz");
        assert_eq!(spec.hook_templates, vec!["Did you know {fact}?"]);
    }

    #[test]
    fn missing_file_is_not_found() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = load_identity(&temp.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, IdentityError::NotFound(_)), "{err:?}");
    }

    #[test]
    fn bad_color_is_rejected_by_schema() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut raw = serde_json::to_value(identity()).expect("value");
        raw["visual"]["primary_color"] = Value::from("blue");
        let err = load_identity(&write_json(temp.path(), &raw)).unwrap_err();
        match err {
            IdentityError::Invalid { message, .. } => assert!(message.contains("blue"), "{message}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn short_hex_color_is_accepted() {
        let mut raw = serde_json::to_value(identity()).expect("value");
        raw["visual"]["primary_color"] = Value::from("#0af");
        assert!(parse_identity("inline", raw).is_ok());
    }

    #[test]
    fn uncompilable_hook_template_is_invalid() {
        let mut raw = serde_json::to_value(identity()).expect("value");
        raw["hook_templates"] = json!([format!("{}{{tail}}", "word ".repeat(400_000))]);
        let err = parse_identity("inline", raw).unwrap_err();
        match err {
            IdentityError::Invalid { source_name, message } => {
                assert_eq!(source_name, "inline");
                assert!(message.contains("cannot be compiled"), "{message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn file_provider_reports_missing_file_as_not_found() {
        let temp = tempfile::tempdir().expect("tempdir");
        let provider = FileIdentityProvider::new(temp.path().join("absent.toml"));
        let err = provider.load_active_identity().await.unwrap_err();
        assert!(matches!(err, IdentityError::NotFound(_)), "{err:?}");
    }

    #[tokio::test]
    async fn empty_static_provider_reports_not_found() {
        let err = StaticIdentityProvider::empty()
            .load_active_identity()
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::NotFound(_)));
    }
}
