//! I/O boundaries: model, research, identity, prompts, and config.

pub mod config;
pub mod identity_store;
pub mod model;
pub mod prompt;
pub mod research;
pub mod schemas;
