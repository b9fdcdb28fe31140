//! Test-only scripted collaborators and builders.
//!
//! Scripted doubles queue predetermined responses so executor tests never
//! spawn containers or oracle processes. Panics on an exhausted queue are
//! deliberate: a test that consumes more responses than it scripted is
//! broken.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::rc::Rc;

use anyhow::{Result, anyhow};
use serde_json::Value;

use crate::core::table::Table;
use crate::core::workspace::WorkspaceUpdate;
use crate::io::sandbox::{Sandbox, SandboxRequest, SandboxRun};
use crate::tools::{Tool, ToolCall};

/// Build a table from string columns and JSON rows.
pub fn table(columns: &[&str], rows: Vec<Vec<Value>>) -> Table {
    Table::new(columns.iter().map(|c| (*c).to_string()).collect(), rows)
}

/// Sandbox run that ends with exit 0 and the given stdout.
pub fn sandbox_ok(stdout: &str) -> SandboxRun {
    SandboxRun {
        stdout: stdout.to_string(),
        stderr: String::new(),
        exit_code: Some(0),
        timed_out: false,
    }
}

/// Sandbox run that failed with the given stderr diagnostic.
pub fn sandbox_err(stderr: &str) -> SandboxRun {
    SandboxRun {
        stdout: String::new(),
        stderr: stderr.to_string(),
        exit_code: Some(1),
        timed_out: false,
    }
}

/// Sandbox returning queued results, recording each request it saw.
#[derive(Default)]
pub struct ScriptedSandbox {
    results: RefCell<VecDeque<SandboxRun>>,
    pub requests: RefCell<Vec<SandboxRequest>>,
}

impl ScriptedSandbox {
    pub fn new(results: Vec<SandboxRun>) -> Self {
        Self {
            results: RefCell::new(results.into()),
            requests: RefCell::new(Vec::new()),
        }
    }
}

impl Sandbox for ScriptedSandbox {
    fn run(&self, request: &SandboxRequest) -> Result<SandboxRun> {
        self.requests.borrow_mut().push(request.clone());
        self.results
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("scripted sandbox exhausted"))
    }
}

/// Arguments one repair call was made with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairCall {
    pub failing_step: u32,
    pub history: String,
}

/// Repair oracle returning queued replacement code, recording each call.
#[derive(Default)]
pub struct ScriptedRepair {
    replies: RefCell<VecDeque<String>>,
    pub calls: RefCell<Vec<RepairCall>>,
}

impl ScriptedRepair {
    pub fn new(replies: Vec<&str>) -> Self {
        Self {
            replies: RefCell::new(replies.into_iter().map(str::to_string).collect()),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Oracle that should never be consulted.
    pub fn unused() -> Self {
        Self::default()
    }
}

impl crate::io::oracle::RepairOracle for ScriptedRepair {
    fn repair(
        &self,
        _request: &str,
        _plan_text: &str,
        failing_step: u32,
        history: &str,
    ) -> Result<String> {
        self.calls.borrow_mut().push(RepairCall {
            failing_step,
            history: history.to_string(),
        });
        self.replies
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("scripted repair oracle exhausted"))
    }
}

/// One scripted tool invocation outcome.
pub enum ScriptedInvoke {
    Update(WorkspaceUpdate),
    Fault(String),
}

/// Invocation a scripted tool observed.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservedCall {
    pub tool: String,
    pub args: BTreeMap<String, Value>,
}

/// Shared journal of tool invocations, for asserting cross-tool ordering.
pub type CallJournal = Rc<RefCell<Vec<ObservedCall>>>;

pub fn call_journal() -> CallJournal {
    Rc::new(RefCell::new(Vec::new()))
}

/// Tool returning queued outcomes, logging every invocation to the journal.
pub struct ScriptedTool {
    name: &'static str,
    accepted: &'static [&'static str],
    outcomes: RefCell<VecDeque<ScriptedInvoke>>,
    journal: CallJournal,
}

impl ScriptedTool {
    pub fn new(
        name: &'static str,
        accepted: &'static [&'static str],
        outcomes: Vec<ScriptedInvoke>,
        journal: CallJournal,
    ) -> Self {
        Self {
            name,
            accepted,
            outcomes: RefCell::new(outcomes.into()),
            journal,
        }
    }
}

impl Tool for ScriptedTool {
    fn name(&self) -> &'static str {
        self.name
    }

    fn accepted_args(&self) -> &'static [&'static str] {
        self.accepted
    }

    fn invoke(&self, call: &ToolCall<'_>) -> Result<WorkspaceUpdate> {
        self.journal.borrow_mut().push(ObservedCall {
            tool: self.name.to_string(),
            args: call.args.clone(),
        });
        match self.outcomes.borrow_mut().pop_front() {
            Some(ScriptedInvoke::Update(update)) => Ok(update),
            Some(ScriptedInvoke::Fault(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("scripted tool '{}' exhausted", self.name)),
        }
    }
}
