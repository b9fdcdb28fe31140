//! Tool registry and dispatch.
//!
//! Every registered tool sees the same calling convention: an ambient
//! argument bag (request text, live workspace) plus the step's declared
//! arguments, filtered down to the names the tool actually accepts. The
//! filter keeps call sites generic — no per-tool branching in the executor.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;

use crate::core::workspace::{Workspace, WorkspaceUpdate};
use crate::io::config::AgentConfig;
use crate::io::sandbox::{DockerSandbox, Sandbox, SandboxLimits};

pub mod answer;
pub mod interpreter;
pub mod scraper;

/// Argument name every code-bearing tool declares.
pub const CODE_ARG: &str = "code";

/// One filtered tool invocation.
#[derive(Debug)]
pub struct ToolCall<'a> {
    /// Ambient request text.
    pub request: &'a str,
    /// Read-only view of the live workspace.
    pub workspace: &'a Workspace,
    /// Arguments the target tool declared, already filtered.
    pub args: BTreeMap<String, Value>,
}

impl ToolCall<'_> {
    pub fn str_arg(&self, name: &str) -> Option<&str> {
        self.args.get(name).and_then(Value::as_str)
    }
}

/// A registered operation invocable by name.
///
/// Tools signal ordinary failure through an error-status
/// [`WorkspaceUpdate`]; returning `Err` is reserved for faults outside the
/// tool's protocol (the executor treats those as fatal).
pub trait Tool {
    fn name(&self) -> &'static str;

    /// Argument names this tool's signature declares; the dispatcher filters
    /// the candidate bag down to these.
    fn accepted_args(&self) -> &'static [&'static str];

    fn invoke(&self, call: &ToolCall<'_>) -> Result<WorkspaceUpdate>;
}

/// Keep only the candidate arguments the target tool declares. Pure.
pub fn filter_args(
    accepted: &[&str],
    candidate: &BTreeMap<String, Value>,
) -> BTreeMap<String, Value> {
    candidate
        .iter()
        .filter(|(name, _)| accepted.contains(&name.as_str()))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

/// Name-to-tool registry backing the executor's dispatch.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Resolve a step's declared tool name. `None` is a configuration error
    /// the executor treats as fatal.
    pub fn resolve(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(Box::as_ref)
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }
}

/// Registry with the three production tools, backed by a docker sandbox.
pub fn default_registry(config: &AgentConfig) -> ToolRegistry {
    let sandbox: Arc<dyn Sandbox> = Arc::new(DockerSandbox::new(
        config.sandbox.image.clone(),
        config.output_limit_bytes,
    ));
    let limits = SandboxLimits {
        timeout: config.sandbox_timeout(),
        memory: config.sandbox.memory_limit.clone(),
    };

    let mut registry = ToolRegistry::new();
    registry.register(Box::new(scraper::WebScraper::new(config.http_timeout())));
    registry.register(Box::new(interpreter::PythonInterpreter::new(
        sandbox.clone(),
        limits.clone(),
    )));
    registry.register(Box::new(answer::AnswerGenerator::new(sandbox, limits)));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct NoopTool;

    impl Tool for NoopTool {
        fn name(&self) -> &'static str {
            "noop"
        }

        fn accepted_args(&self) -> &'static [&'static str] {
            &["code"]
        }

        fn invoke(&self, _call: &ToolCall<'_>) -> Result<WorkspaceUpdate> {
            Ok(WorkspaceUpdate::success())
        }
    }

    #[test]
    fn filter_keeps_only_declared_names() {
        let mut candidate = BTreeMap::new();
        candidate.insert("code".to_string(), json!("df.head()"));
        candidate.insert("url".to_string(), json!("http://x"));
        candidate.insert("request".to_string(), json!("the request"));

        let filtered = filter_args(&["code"], &candidate);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.get("code"), Some(&json!("df.head()")));
    }

    #[test]
    fn registry_resolves_registered_names_only() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(NoopTool));

        assert!(registry.resolve("noop").is_some());
        assert!(registry.resolve("not_a_tool").is_none());
        assert_eq!(registry.tool_names(), vec!["noop"]);
    }
}
