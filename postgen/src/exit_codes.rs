//! Stable exit codes for postgen CLI commands.

/// Command succeeded and any checked text passed every validator.
pub const OK: i32 = 0;
/// Command failed due to an invalid identity, config, or other errors.
pub const INVALID: i32 = 1;
/// `postgen lint` or `postgen tone` found text the validators reject.
pub const REJECTED: i32 = 2;
