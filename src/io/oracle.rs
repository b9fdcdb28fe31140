//! Planner and repair oracle abstractions plus the command-backed default.
//!
//! The [`PlanOracle`] and [`RepairOracle`] traits decouple the core from the
//! reasoning backend. [`CommandOracle`] spawns a configured command, feeds
//! the rendered prompt on stdin, and reads the completion from stdout —
//! tests use scripted oracles that never spawn anything.

use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info, instrument, warn};

use crate::core::plan::Plan;
use crate::core::table::Table;
use crate::io::process::run_command_with_timeout;
use crate::io::prompt::PromptEngine;
use crate::validate::parse_and_validate;

/// Parse retries for malformed planner replies. This retry belongs to the
/// oracle adapter: the execution core only ever receives a validated plan.
const PLAN_PARSE_ATTEMPTS: u32 = 3;

/// Produces a plan for a request, optionally informed by a preview of the
/// data already in the workspace.
pub trait PlanOracle {
    fn plan(&self, request: &str, preview: Option<&Table>) -> Result<Plan>;
}

/// Proposes replacement code for a failing step given the full failure
/// transcript. Stateless from the core's perspective; the core enforces the
/// retry ceiling, not the oracle.
pub trait RepairOracle {
    fn repair(
        &self,
        request: &str,
        plan_text: &str,
        failing_step: u32,
        history: &str,
    ) -> Result<String>;
}

/// Oracle backed by a prompt-on-stdin, completion-on-stdout command (an LLM
/// CLI, typically).
pub struct CommandOracle {
    command: Vec<String>,
    timeout: Duration,
    output_limit_bytes: usize,
    engine: PromptEngine,
}

impl CommandOracle {
    pub fn new(command: Vec<String>, timeout: Duration, output_limit_bytes: usize) -> Self {
        Self {
            command,
            timeout,
            output_limit_bytes,
            engine: PromptEngine::new(),
        }
    }

    #[instrument(skip_all, fields(prompt_bytes = prompt.len()))]
    fn complete(&self, prompt: &str) -> Result<String> {
        let program = self
            .command
            .first()
            .ok_or_else(|| anyhow!("oracle command is empty"))?;
        let mut cmd = Command::new(program);
        cmd.args(&self.command[1..]);

        info!(%program, "calling oracle");
        let output = run_command_with_timeout(
            cmd,
            Some(prompt.as_bytes()),
            self.timeout,
            self.output_limit_bytes,
        )
        .context("run oracle command")?;

        if output.timed_out {
            return Err(anyhow!("oracle timed out after {:?}", self.timeout));
        }
        if !output.status.success() {
            return Err(anyhow!(
                "oracle command failed with status {:?}: {}",
                output.status.code(),
                output.stderr_text().trim()
            ));
        }
        Ok(output.stdout_text())
    }
}

impl PlanOracle for CommandOracle {
    fn plan(&self, request: &str, preview: Option<&Table>) -> Result<Plan> {
        let prompt = self.engine.render_planner(request, preview)?;
        for attempt in 1..=PLAN_PARSE_ATTEMPTS {
            let reply = self.complete(&prompt)?;
            let cleaned = strip_fences(&reply);
            match parse_and_validate(&cleaned) {
                Ok(plan) => {
                    debug!(steps = plan.steps.len(), "received valid plan");
                    return Ok(plan);
                }
                Err(err) => {
                    warn!(attempt, err = %err, "planner reply was not a valid plan");
                }
            }
        }
        Err(anyhow!(
            "could not obtain a valid JSON plan after {PLAN_PARSE_ATTEMPTS} attempts"
        ))
    }
}

impl RepairOracle for CommandOracle {
    fn repair(
        &self,
        request: &str,
        plan_text: &str,
        failing_step: u32,
        history: &str,
    ) -> Result<String> {
        let prompt = self
            .engine
            .render_debugger(request, plan_text, failing_step, history)?;
        let reply = self.complete(&prompt)?;
        Ok(strip_fences(&reply))
    }
}

/// Strip a surrounding markdown code fence (```json / ```python) from an
/// oracle reply.
pub fn strip_fences(text: &str) -> String {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    // Drop the language tag line, then the closing fence.
    let body = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => return trimmed.to_string(),
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_fence() {
        let fenced = "```json\n[{\"step\": 1}]\n```";
        assert_eq!(strip_fences(fenced), "[{\"step\": 1}]");
    }

    #[test]
    fn strips_python_fence() {
        let fenced = "```python\ndf = df.head()\n```\n";
        assert_eq!(strip_fences(fenced), "df = df.head()");
    }

    #[test]
    fn leaves_unfenced_text_alone() {
        assert_eq!(strip_fences("  df = df.head()\n"), "df = df.head()");
    }

    #[test]
    fn command_oracle_parses_plan_from_stdout() {
        let plan_json =
            r#"[{"step": 1, "tool": "web_scraper", "args": {"url": "http://x"}}]"#;
        let oracle = CommandOracle::new(
            vec![
                "sh".to_string(),
                "-c".to_string(),
                format!("cat > /dev/null; echo '{plan_json}'"),
            ],
            Duration::from_secs(5),
            10_000,
        );
        let plan = oracle.plan("request", None).expect("plan");
        assert_eq!(plan.steps.len(), 1);
        assert_eq!(plan.steps[0].tool, "web_scraper");
    }

    #[test]
    fn command_oracle_gives_up_on_persistent_garbage() {
        let oracle = CommandOracle::new(
            vec![
                "sh".to_string(),
                "-c".to_string(),
                "cat > /dev/null; echo not json".to_string(),
            ],
            Duration::from_secs(5),
            10_000,
        );
        let err = oracle.plan("request", None).unwrap_err();
        assert!(err.to_string().contains("valid JSON plan"));
    }

    #[test]
    fn command_oracle_surfaces_command_failure() {
        let oracle = CommandOracle::new(
            vec!["sh".to_string(), "-c".to_string(), "exit 3".to_string()],
            Duration::from_secs(5),
            10_000,
        );
        let err = oracle
            .repair("request", "[]", 1, "history")
            .unwrap_err();
        assert!(err.to_string().contains("status"));
    }
}
