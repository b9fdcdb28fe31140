//! Self-correcting data-analysis plan runner.
//!
//! This crate turns a natural-language analysis request into an ordered plan
//! of tool invocations, executes them against a shared mutable workspace,
//! and repairs failing code steps by resubmitting the failure transcript to
//! an external repair oracle. The architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (plan and table types, the
//!   workspace merge, the code sanitizer). No I/O, fully testable in
//!   isolation.
//! - **[`io`]**: Side-effecting operations (subprocesses, the docker
//!   sandbox, oracle commands, config and plan files). Isolated to enable
//!   scripting in tests.
//! - **[`tools`]**: The registry the executor dispatches through, plus the
//!   registered tools themselves.
//!
//! [`executor`] coordinates core logic with I/O: the step loop, the bounded
//! per-step retry loop, and the fail-fast policy live there.

pub mod core;
pub mod executor;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod tools;
pub mod validate;
