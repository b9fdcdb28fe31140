//! `python_interpreter`: runs a code step in the sandbox and merges the
//! mutated table back into the workspace.

use std::sync::Arc;

use anyhow::Result;
use tracing::warn;

use crate::core::table::Table;
use crate::core::workspace::WorkspaceUpdate;
use crate::io::sandbox::{EmitMode, Sandbox, SandboxLimits, SandboxRequest};
use crate::tools::{CODE_ARG, Tool, ToolCall};

pub struct PythonInterpreter {
    sandbox: Arc<dyn Sandbox>,
    limits: SandboxLimits,
}

impl PythonInterpreter {
    pub fn new(sandbox: Arc<dyn Sandbox>, limits: SandboxLimits) -> Self {
        Self { sandbox, limits }
    }
}

impl Tool for PythonInterpreter {
    fn name(&self) -> &'static str {
        "python_interpreter"
    }

    fn accepted_args(&self) -> &'static [&'static str] {
        &[CODE_ARG]
    }

    fn invoke(&self, call: &ToolCall<'_>) -> Result<WorkspaceUpdate> {
        let Some(code) = call.str_arg(CODE_ARG) else {
            return Ok(WorkspaceUpdate::failure(
                "python_interpreter requires a 'code' argument",
            ));
        };

        let request = SandboxRequest::from_workspace(
            code,
            call.workspace,
            EmitMode::Table,
            self.limits.clone(),
        );
        let run = self.sandbox.run(&request)?;
        if !run.succeeded() {
            return Ok(WorkspaceUpdate::failure(run.failure_text()));
        }

        // The epilogue's emission must be the only stdout; anything else
        // (stray prints from the step's code) breaks the parse and is fed
        // back to the repair loop like any other code error.
        match Table::from_split_json(&run.stdout) {
            Ok(table) => Ok(WorkspaceUpdate::success().with_table(table)),
            Err(err) => {
                warn!(err = %err, "sandbox emitted an unparsable table");
                Ok(WorkspaceUpdate::failure(format!(
                    "Sandbox output was not a valid table; remove print statements \
                     from the code. Parse error: {err:#}"
                )))
            }
        }
    }
}
