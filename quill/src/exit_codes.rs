//! Stable exit codes for quill CLI commands.

/// Command succeeded (or the shell exited normally).
pub const OK: i32 = 0;
/// Command reported a failure result (mutation error, failed plan).
pub const FAILED: i32 = 1;
/// Startup failed: invalid config, workspace root, or arguments.
pub const INVALID: i32 = 2;
