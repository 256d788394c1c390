//! Side-effecting helpers: filesystem, config, ignore rules, and the agent process.

pub mod agent;
pub mod config;
pub mod fs_ops;
pub mod ignore;
pub mod process;
pub mod prompt;
