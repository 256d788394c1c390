//! Deterministic, pure logic shared by the engine and the plan runner.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data and return deterministic outputs suitable for tests.

pub mod diff;
pub mod edit;
pub mod history;
pub mod plan_state;
pub mod sandbox;
pub mod types;
