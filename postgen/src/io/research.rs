//! Best-effort web research capability.

use async_trait::async_trait;

/// Search backend used by the research stage.
///
/// Failures are not fatal: the stage logs them and continues with no results.
#[async_trait]
pub trait ResearchSource: Send + Sync {
    /// Search for `query` and return raw result text (may be empty).
    async fn search(&self, query: &str) -> anyhow::Result<String>;
}

/// Research source that never finds anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoResearch;

#[async_trait]
impl ResearchSource for NoResearch {
    async fn search(&self, _query: &str) -> anyhow::Result<String> {
        Ok(String::new())
    }
}
