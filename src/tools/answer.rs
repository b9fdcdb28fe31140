//! `answer_generator`: runs an answer-producing code step and captures its
//! printed output as the `final_answer` artifact.
//!
//! Mechanically identical to the interpreter — same sandbox, same retry
//! semantics — except that the run's stdout is the terminal value instead of
//! a new table.

use std::sync::Arc;

use anyhow::Result;

use crate::core::workspace::WorkspaceUpdate;
use crate::io::sandbox::{EmitMode, Sandbox, SandboxLimits, SandboxRequest};
use crate::tools::{CODE_ARG, Tool, ToolCall};

pub struct AnswerGenerator {
    sandbox: Arc<dyn Sandbox>,
    limits: SandboxLimits,
}

impl AnswerGenerator {
    pub fn new(sandbox: Arc<dyn Sandbox>, limits: SandboxLimits) -> Self {
        Self { sandbox, limits }
    }
}

impl Tool for AnswerGenerator {
    fn name(&self) -> &'static str {
        "answer_generator"
    }

    fn accepted_args(&self) -> &'static [&'static str] {
        &[CODE_ARG]
    }

    fn invoke(&self, call: &ToolCall<'_>) -> Result<WorkspaceUpdate> {
        let Some(code) = call.str_arg(CODE_ARG) else {
            return Ok(WorkspaceUpdate::failure(
                "answer_generator requires a 'code' argument",
            ));
        };

        let request = SandboxRequest::from_workspace(
            code,
            call.workspace,
            EmitMode::Answer,
            self.limits.clone(),
        );
        let run = self.sandbox.run(&request)?;
        if !run.succeeded() {
            return Ok(WorkspaceUpdate::failure(run.failure_text()));
        }

        let answer = run.stdout.trim();
        if answer.is_empty() {
            return Ok(WorkspaceUpdate::failure(
                "Answer step printed nothing; the final step must print the answer.",
            ));
        }
        Ok(WorkspaceUpdate::success().with_final_answer(answer))
    }
}
