//! Pipeline configuration stored as TOML (by default `postgen.toml`).

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::validators::ValidationConfig;

pub const DEFAULT_CONFIG_PATH: &str = "postgen.toml";

/// Pipeline configuration (TOML).
///
/// This file is intended to be edited by humans. Missing fields default to
/// the values the validators were tuned with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum rendered prompt size; low-priority sections are dropped first.
    pub prompt_budget_bytes: usize,

    pub validation: ValidationConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            prompt_budget_bytes: 24_000,
            validation: ValidationConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.prompt_budget_bytes == 0 {
            return Err(anyhow!("prompt_budget_bytes must be > 0"));
        }
        if self.validation.max_sentence_words == 0 {
            return Err(anyhow!("validation.max_sentence_words must be > 0"));
        }
        let threshold = self.validation.tone_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(anyhow!(
                "validation.tone_threshold must be within 0.0..=1.0 (got {threshold})"
            ));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `PipelineConfig::default()`.
pub fn load_config(path: &Path) -> Result<PipelineConfig> {
    if !path.exists() {
        let cfg = PipelineConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: PipelineConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &PipelineConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    if !parent.as_os_str().is_empty() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, PipelineConfig::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("nested").join("postgen.toml");
        let mut cfg = PipelineConfig::default();
        cfg.validation.max_emojis = 3;
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("postgen.toml");
        fs::write(&path, "[validation]\ntone_threshold = 0.5\n").expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.prompt_budget_bytes, 24_000);
        assert_eq!(cfg.validation.max_sentence_words, 25);
        assert!((cfg.validation.tone_threshold - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("postgen.toml");
        fs::write(&path, "[validation]\ntone_threshold = 1.5\n").expect("write");
        let err = load_config(&path).unwrap_err();
        assert!(format!("{err:#}").contains("tone_threshold"));
    }
}
