//! Side-effecting operations: processes, containers, oracles, files.

pub mod config;
pub mod oracle;
pub mod plan_store;
pub mod process;
pub mod prompt;
pub mod sandbox;
