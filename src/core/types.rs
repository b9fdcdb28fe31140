//! Shared deterministic types for the execution core.
//!
//! These types define stable contracts between core components. They should not
//! depend on external state or I/O and must remain deterministic across runs.

use serde::{Deserialize, Serialize};

/// Run-level status carried in the workspace.
///
/// Once a plan run turns `Error` the executor stops advancing; only the retry
/// loop of the step that failed may still run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    #[default]
    Success,
    Error,
}

/// One failed execution attempt of a code-bearing step.
///
/// Ephemeral: records live only as long as the owning [`ErrorHistory`], which
/// is discarded when the step succeeds or the plan moves on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    /// 1-indexed attempt number within the step's retry loop.
    pub attempt: u32,
    /// The code that was executed for this attempt.
    pub code: String,
    /// The failure text the tool reported.
    pub error: String,
}

/// Append-only log of failed attempts for the step currently being retried.
///
/// Rendered as a transcript and handed to the repair oracle on every
/// subsequent attempt so it can avoid repeating prior mistakes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorHistory {
    records: Vec<AttemptRecord>,
}

impl ErrorHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: AttemptRecord) {
        self.records.push(record);
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Last recorded failure text, if any attempt has failed.
    pub fn last_error(&self) -> Option<&str> {
        self.records.last().map(|r| r.error.as_str())
    }

    /// Render the history as transcript text for the repair oracle.
    pub fn transcript(&self) -> String {
        let mut buf = String::new();
        for record in &self.records {
            buf.push_str(&format!("--- Attempt {} ---\n", record.attempt));
            buf.push_str("Code:\n");
            buf.push_str(record.code.trim_end());
            buf.push_str("\nError:\n");
            buf.push_str(record.error.trim_end());
            buf.push_str("\n\n");
        }
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_lists_attempts_in_order() {
        let mut history = ErrorHistory::new();
        history.push(AttemptRecord {
            attempt: 1,
            code: "df.bad()".to_string(),
            error: "AttributeError: bad".to_string(),
        });
        history.push(AttemptRecord {
            attempt: 2,
            code: "df.head()".to_string(),
            error: "NameError: df".to_string(),
        });

        let transcript = history.transcript();
        let first = transcript.find("Attempt 1").expect("attempt 1");
        let second = transcript.find("Attempt 2").expect("attempt 2");
        assert!(first < second);
        assert!(transcript.contains("AttributeError: bad"));
        assert_eq!(history.last_error(), Some("NameError: df"));
    }

    #[test]
    fn empty_history_renders_empty_transcript() {
        let history = ErrorHistory::new();
        assert!(history.is_empty());
        assert_eq!(history.transcript(), "");
    }
}
