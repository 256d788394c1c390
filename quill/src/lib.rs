//! Sandboxed workspace mutation engine with undo/redo and fail-fast plans.
//!
//! The crate keeps a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (path normalization, diffs, edits,
//!   history, plan state). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (filesystem, config, ignore files,
//!   agent processes). Isolated behind traits so tests can script them.
//!
//! [`engine::MutationEngine`] applies file mutations and owns the undo/redo
//! history. [`plan::PlanRunner`] drives a step interpreter over a plan, and
//! [`shell`] exposes both as commands.

pub mod core;
pub mod engine;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod plan;
pub mod shell;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
