//! Plan executor and retry controller.
//!
//! Walks the plan in ascending step-number order, dispatches each step
//! through the tool registry, and drives the bounded self-correction loop
//! when a code-bearing step fails. Fail-fast: once the workspace carries an
//! error the plan halts — partial artifacts stay behind for diagnostics, but
//! no later step may run against state known to be inconsistent.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::core::plan::{Plan, Step};
use crate::core::sanitize::sanitize;
use crate::core::types::{AttemptRecord, ErrorHistory};
use crate::core::workspace::Workspace;
use crate::io::oracle::RepairOracle;
use crate::tools::{CODE_ARG, Tool, ToolCall, ToolRegistry, filter_args};

/// Why a plan halted early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HaltReason {
    /// A step names a tool missing from the registry. A configuration error:
    /// never retried, and nothing executes.
    UnknownTool { tool: String },
    /// The failing step used up its retry ceiling; `error` is the last
    /// attempt's failure text.
    RetriesExhausted { error: String },
    /// A tool (or the repair oracle) raised outside its normal failure
    /// protocol. Environmental rather than code-fixable, so it consumes no
    /// retries.
    UnexpectedFault { error: String },
}

/// Terminal state of one plan run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanOutcome {
    Completed,
    Halted { step: u32, reason: HaltReason },
}

/// Summary of one `execute` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    /// Steps that ran to success before the plan finished or halted.
    pub steps_run: u32,
    pub outcome: PlanOutcome,
}

impl ExecutionReport {
    pub fn completed(&self) -> bool {
        self.outcome == PlanOutcome::Completed
    }
}

enum StepRun {
    Succeeded,
    Halt(HaltReason),
}

/// Owns the step loop and the per-step bounded self-correction loop.
pub struct PlanExecutor<'a> {
    registry: &'a ToolRegistry,
    repair: &'a dyn RepairOracle,
    max_retries: u32,
}

impl<'a> PlanExecutor<'a> {
    pub fn new(registry: &'a ToolRegistry, repair: &'a dyn RepairOracle, max_retries: u32) -> Self {
        Self {
            registry,
            repair,
            max_retries,
        }
    }

    /// Execute a plan against the workspace.
    ///
    /// All plan-level failure modes land in the workspace (`status`,
    /// `error_message`) and in the returned report; this function itself
    /// never fails.
    #[instrument(skip_all, fields(steps = plan.steps.len()))]
    pub fn execute(
        &self,
        request: &str,
        plan: &Plan,
        workspace: &mut Workspace,
    ) -> ExecutionReport {
        let ordered = plan.in_order();

        // Resolve every tool name up front: an unknown tool is a
        // configuration error and must halt before any step executes.
        for step in &ordered {
            if self.registry.resolve(&step.tool).is_none() {
                let message = format!("Tool '{}' not found.", step.tool);
                warn!(
                    step = step.step,
                    tool = %step.tool,
                    available = ?self.registry.tool_names(),
                    "unknown tool, halting plan"
                );
                workspace.mark_error(message);
                return ExecutionReport {
                    steps_run: 0,
                    outcome: PlanOutcome::Halted {
                        step: step.step,
                        reason: HaltReason::UnknownTool {
                            tool: step.tool.clone(),
                        },
                    },
                };
            }
        }

        let plan_text = plan.to_text();
        let mut steps_run = 0;
        for step in ordered {
            let tool = self
                .registry
                .resolve(&step.tool)
                .expect("tool names were resolved up front");
            info!(step = step.step, tool = %step.tool, "executing step");
            match self.run_step(request, &plan_text, step, tool, workspace) {
                StepRun::Succeeded => steps_run += 1,
                StepRun::Halt(reason) => {
                    warn!(step = step.step, "halting plan");
                    return ExecutionReport {
                        steps_run,
                        outcome: PlanOutcome::Halted {
                            step: step.step,
                            reason,
                        },
                    };
                }
            }
        }

        info!(steps_run, "plan completed");
        ExecutionReport {
            steps_run,
            outcome: PlanOutcome::Completed,
        }
    }

    /// Run one step's bounded retry loop.
    fn run_step(
        &self,
        request: &str,
        plan_text: &str,
        step: &Step,
        tool: &dyn Tool,
        workspace: &mut Workspace,
    ) -> StepRun {
        let mut history = ErrorHistory::new();
        let mut current_code: Option<String> = step.code().map(|c| sanitize(c).into_owned());

        let mut attempt = 0;
        loop {
            attempt += 1;
            let args = filter_args(tool.accepted_args(), &candidate_args(request, step, &current_code));
            let result = tool.invoke(&ToolCall {
                request,
                workspace,
                args,
            });

            match result {
                Err(fault) => {
                    let message =
                        format!("Unexpected fault in tool '{}': {fault:#}", tool.name());
                    warn!(step = step.step, attempt, "tool raised outside its protocol");
                    workspace.mark_error(message.clone());
                    return StepRun::Halt(HaltReason::UnexpectedFault { error: message });
                }
                Ok(update) if update.is_success() => {
                    workspace.merge(update);
                    return StepRun::Succeeded;
                }
                Ok(update) => {
                    let error = update.failure_text();
                    warn!(step = step.step, attempt, error = %error, "attempt failed");
                    history.push(AttemptRecord {
                        attempt,
                        code: current_code.clone().unwrap_or_default(),
                        error: error.clone(),
                    });

                    if attempt >= self.max_retries {
                        warn!(step = step.step, "max retries reached, failing step");
                        workspace
                            .mark_error(format!("Max retries reached. Last error: {error}"));
                        return StepRun::Halt(HaltReason::RetriesExhausted { error });
                    }

                    // The oracle is the only mutator of the failing attempt's
                    // code; the controller never edits code itself.
                    match self
                        .repair
                        .repair(request, plan_text, step.step, &history.transcript())
                    {
                        Ok(corrected) => {
                            info!(step = step.step, attempt, "received repaired code");
                            current_code = Some(sanitize(&corrected).into_owned());
                        }
                        Err(err) => {
                            let message = format!("Repair oracle failed: {err:#}");
                            warn!(step = step.step, "repair oracle failed, halting plan");
                            workspace.mark_error(message.clone());
                            return StepRun::Halt(HaltReason::UnexpectedFault { error: message });
                        }
                    }
                }
            }
        }
    }
}

/// Candidate argument bag for one attempt: the ambient request text, then the
/// step's declared arguments (step-local wins over ambient on a name clash),
/// then the retry loop's current code.
fn candidate_args(
    request: &str,
    step: &Step,
    current_code: &Option<String>,
) -> BTreeMap<String, Value> {
    let mut candidate = BTreeMap::new();
    candidate.insert("request".to_string(), Value::String(request.to_string()));
    for (name, value) in &step.args {
        candidate.insert(name.clone(), value.clone());
    }
    if let Some(code) = current_code {
        candidate.insert(CODE_ARG.to_string(), Value::String(code.clone()));
    }
    candidate
}
