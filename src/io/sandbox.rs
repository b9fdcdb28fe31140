//! Isolated execution environment for untrusted code snippets.
//!
//! The [`Sandbox`] trait decouples the retry controller from the isolation
//! backend (currently `docker run`). Tests use scripted sandboxes that return
//! predetermined results without spawning containers.
//!
//! # Boundary protocol
//!
//! One JSON context blob goes in, bind-mounted read-only; a fixed prologue
//! deserializes it into `df` / `html_content` bindings, the caller's code
//! runs, and in table mode a fixed epilogue prints the mutated `df` as
//! split-orient JSON on stdout. Stdout is the artifact, stderr the
//! diagnostic, the exit code the outcome. The container and the context file
//! are torn down after every run; a container whose run times out is
//! force-removed by name, so nothing survives between invocations.

use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, instrument, warn};

use crate::core::table::Table;
use crate::core::workspace::Workspace;
use crate::io::process::run_command_with_timeout;

/// Path the context blob is mounted at inside the container.
const CONTEXT_MOUNT: &str = "/app/context.json";

static CONTAINER_SEQ: AtomicU64 = AtomicU64::new(0);

/// Unique container name per run, so a timed-out container can be removed.
fn container_name() -> String {
    format!(
        "analyst-sandbox-{}-{}",
        std::process::id(),
        CONTAINER_SEQ.fetch_add(1, Ordering::Relaxed)
    )
}

/// Which artifact the run's final emission is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitMode {
    /// Epilogue prints the mutated `df`; stdout is the new table.
    Table,
    /// No epilogue; the code's own printed output is the final answer.
    Answer,
}

/// Resource ceilings for one sandbox run. Mandatory: a breach is an ordinary
/// failure, never a host crash.
#[derive(Debug, Clone)]
pub struct SandboxLimits {
    pub timeout: Duration,
    /// Memory ceiling in docker syntax, e.g. `512m`.
    pub memory: String,
}

/// One sandbox invocation: code plus a snapshot of the workspace artifacts.
///
/// The snapshot is a copy — the sandbox can never race the executor on the
/// live workspace.
#[derive(Debug, Clone)]
pub struct SandboxRequest {
    pub code: String,
    /// Current `table` artifact as split-orient JSON.
    pub table_json: String,
    /// Current `raw_document` artifact, empty if absent.
    pub raw_document: String,
    pub emit: EmitMode,
    pub limits: SandboxLimits,
}

impl SandboxRequest {
    /// Snapshot the workspace's structured artifacts for one run. An absent
    /// table serializes as an empty table so the prologue always binds `df`.
    pub fn from_workspace(
        code: impl Into<String>,
        workspace: &Workspace,
        emit: EmitMode,
        limits: SandboxLimits,
    ) -> Self {
        let table_json = workspace
            .table
            .as_ref()
            .map(Table::to_split_json)
            .unwrap_or_else(|| Table::default().to_split_json());
        Self {
            code: code.into(),
            table_json,
            raw_document: workspace.raw_document.clone().unwrap_or_default(),
            emit,
            limits,
        }
    }
}

/// Outcome of one sandbox run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxRun {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
}

impl SandboxRun {
    /// A run succeeded only with exit code 0, no timeout, and a silent
    /// stderr; any diagnostic output means the code needs repair.
    pub fn succeeded(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0) && self.stderr.trim().is_empty()
    }

    /// Human-readable failure text for the retry loop.
    pub fn failure_text(&self) -> String {
        if self.timed_out {
            return "Execution timed out inside the sandbox.".to_string();
        }
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        format!(
            "Sandbox exited with status {:?} and no diagnostic output.",
            self.exit_code
        )
    }
}

/// Abstraction over isolation backends.
pub trait Sandbox {
    /// Run one code snippet against a workspace snapshot.
    ///
    /// `Ok` covers both successful and failed code — inspect the
    /// [`SandboxRun`]. `Err` means the backend itself could not run
    /// (e.g. docker missing), which is an environmental fault.
    fn run(&self, request: &SandboxRequest) -> Result<SandboxRun>;
}

/// Sandbox that spawns a fresh, resource-bounded, network-less container per
/// run.
#[derive(Debug, Clone)]
pub struct DockerSandbox {
    program: String,
    image: String,
    output_limit_bytes: usize,
}

impl DockerSandbox {
    pub fn new(image: impl Into<String>, output_limit_bytes: usize) -> Self {
        Self {
            program: "docker".to_string(),
            image: image.into(),
            output_limit_bytes,
        }
    }

    /// Killing a timed-out `docker run` only kills the CLI process; dockerd
    /// keeps the container alive (and `--rm` only fires when it exits), so a
    /// runaway snippet must be force-removed by name.
    fn remove_container(&self, name: &str) {
        let mut cmd = Command::new(&self.program);
        cmd.arg("rm").arg("-f").arg(name);
        match run_command_with_timeout(cmd, None, Duration::from_secs(10), self.output_limit_bytes)
        {
            Ok(output) if output.status.success() => {
                debug!(name, "removed timed-out container");
            }
            Ok(output) => {
                warn!(name, stderr = %output.stderr_text().trim(), "container removal failed");
            }
            Err(err) => {
                warn!(name, err = %err, "container removal failed");
            }
        }
    }
}

impl Sandbox for DockerSandbox {
    #[instrument(skip_all, fields(image = %self.image, emit = ?request.emit))]
    fn run(&self, request: &SandboxRequest) -> Result<SandboxRun> {
        let context_blob = serde_json::json!({
            "df": request.table_json,
            "html_content": request.raw_document,
        })
        .to_string();

        // NamedTempFile removes the blob on drop, completing the teardown.
        let mut context_file =
            tempfile::NamedTempFile::new().context("create sandbox context file")?;
        std::io::Write::write_all(&mut context_file, context_blob.as_bytes())
            .context("write sandbox context file")?;

        let wrapper = build_wrapper(&request.code, request.emit);
        let name = container_name();

        let mut cmd = Command::new(&self.program);
        cmd.arg("run")
            .arg("--rm")
            .arg("--name")
            .arg(&name)
            .arg("--network")
            .arg("none")
            .arg("--memory")
            .arg(&request.limits.memory)
            .arg("-v")
            .arg(format!(
                "{}:{CONTEXT_MOUNT}:ro",
                context_file.path().display()
            ))
            .arg(&self.image)
            .arg("python")
            .arg("-c")
            .arg(&wrapper);

        info!("starting sandbox container");
        let output = run_command_with_timeout(
            cmd,
            None,
            request.limits.timeout,
            self.output_limit_bytes,
        )
        .context("run sandbox container")?;

        if output.timed_out {
            self.remove_container(&name);
        }

        let run = SandboxRun {
            stdout: output.stdout_text(),
            stderr: output.stderr_text(),
            exit_code: output.status.code(),
            timed_out: output.timed_out,
        };
        debug!(succeeded = run.succeeded(), "sandbox run finished");
        Ok(run)
    }
}

/// Wrap caller code in the fixed prologue (deserialize artifacts into named
/// bindings) and, in table mode, the fixed epilogue (emit the mutated `df`).
fn build_wrapper(code: &str, emit: EmitMode) -> String {
    let mut wrapper = String::new();
    wrapper.push_str("import io, json, sys\n");
    wrapper.push_str("import pandas as pd\n\n");
    wrapper.push_str(&format!("with open('{CONTEXT_MOUNT}', 'r') as f:\n"));
    wrapper.push_str("    context = json.load(f)\n");
    wrapper.push_str("df = pd.read_json(io.StringIO(context['df']), orient='split')\n");
    wrapper.push_str("html_content = context['html_content']\n\n");
    wrapper.push_str(code);
    wrapper.push('\n');
    if emit == EmitMode::Table {
        wrapper.push_str("\nprint(df.to_json(orient='split'))\n");
    }
    wrapper
}
