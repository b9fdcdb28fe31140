//! The mutable workspace threaded through plan execution.
//!
//! Tools never mutate the workspace directly: they return a
//! [`WorkspaceUpdate`] and the executor applies it through [`Workspace::merge`]
//! so the overwrite semantics stay in one tested place.

use crate::core::table::Table;
use crate::core::types::RunStatus;

/// Shared mutable state for one plan run.
///
/// Created empty (or pre-seeded by an upstream phase) at run start and owned
/// exclusively by the executor thread for the whole plan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workspace {
    /// Primary structured result.
    pub table: Option<Table>,
    /// Unstructured source text, e.g. fetched markup.
    pub raw_document: Option<String>,
    /// Sticky run status; `Error` halts the plan after the failing step.
    pub status: RunStatus,
    /// Present iff `status` is `Error`.
    pub error_message: Option<String>,
    /// Terminal output once an answer-producing step has run.
    pub final_answer: Option<String>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_failed(&self) -> bool {
        self.status == RunStatus::Error
    }

    /// Put the workspace into the terminal error state.
    pub fn mark_error(&mut self, message: impl Into<String>) {
        self.status = RunStatus::Error;
        self.error_message = Some(message.into());
    }

    /// Apply a partial update. Later values win; absent (`None`) fields leave
    /// the target untouched. A successful update clears any stale
    /// `error_message` so a repaired step leaves no residue behind.
    pub fn merge(&mut self, update: WorkspaceUpdate) {
        if let Some(table) = update.table {
            self.table = Some(table);
        }
        if let Some(raw_document) = update.raw_document {
            self.raw_document = Some(raw_document);
        }
        if let Some(final_answer) = update.final_answer {
            self.final_answer = Some(final_answer);
        }
        match update.status {
            Some(RunStatus::Error) => {
                self.status = RunStatus::Error;
                if let Some(message) = update.error_message {
                    self.error_message = Some(message);
                }
            }
            Some(RunStatus::Success) | None => {
                self.status = RunStatus::Success;
                self.error_message = None;
            }
        }
    }
}

/// Partial workspace produced by one tool invocation.
///
/// `status: None` means the tool reported nothing, which counts as success.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkspaceUpdate {
    pub table: Option<Table>,
    pub raw_document: Option<String>,
    pub status: Option<RunStatus>,
    pub error_message: Option<String>,
    pub final_answer: Option<String>,
}

impl WorkspaceUpdate {
    /// Successful update carrying no artifacts.
    pub fn success() -> Self {
        Self {
            status: Some(RunStatus::Success),
            ..Self::default()
        }
    }

    /// Failure update with the given diagnostic text.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: Some(RunStatus::Error),
            error_message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn with_table(mut self, table: Table) -> Self {
        self.table = Some(table);
        self
    }

    pub fn with_raw_document(mut self, raw_document: impl Into<String>) -> Self {
        self.raw_document = Some(raw_document.into());
        self
    }

    pub fn with_final_answer(mut self, final_answer: impl Into<String>) -> Self {
        self.final_answer = Some(final_answer.into());
        self
    }

    /// Absent status defaults to success.
    pub fn is_success(&self) -> bool {
        !matches!(self.status, Some(RunStatus::Error))
    }

    /// Failure text, substituting a stock message when the tool reported an
    /// error without one.
    pub fn failure_text(&self) -> String {
        self.error_message
            .clone()
            .unwrap_or_else(|| "An unknown error occurred.".to_string())
    }
}
