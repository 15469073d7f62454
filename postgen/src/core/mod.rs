//! Deterministic, pure logic shared by the pipeline.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod ownership;
pub mod readability;
pub mod structure;
pub mod template;
pub mod types;
pub mod validators;
