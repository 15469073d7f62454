//! Brand-aware social post generation pipeline.
//!
//! A run threads one [`state::PostState`] through a fixed roster of stages
//! (topic, research, hook, body, CTA, review, assembly). The architecture
//! enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (template matching, structural
//!   rules, readability, ownership checks). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting boundaries (model client, research, identity
//!   files, prompt rendering, config). Isolated behind traits to enable
//!   scripted collaborators in tests.
//!
//! [`agents`] implements the stages on top of both, and [`pipeline`] drives
//! them in order.

pub mod agents;
pub mod core;
pub mod error;
pub mod exit_codes;
pub mod identity;
pub mod io;
pub mod logging;
pub mod pipeline;
pub mod state;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use error::PipelineError;
pub use pipeline::{Pipeline, StageReport};
