//! End-to-end scenario: a scraped document, a failing-then-repaired cleaning
//! step, and an answer step, driven through the real interpreter and answer
//! tools with a scripted sandbox backend.

use std::sync::Arc;

use serde_json::json;

use analyst::core::plan::Plan;
use analyst::core::workspace::Workspace;
use analyst::executor::PlanExecutor;
use analyst::io::sandbox::{EmitMode, SandboxLimits};
use analyst::test_support::{
    ScriptedRepair, ScriptedSandbox, sandbox_err, sandbox_ok, table,
};
use analyst::tools::answer::AnswerGenerator;
use analyst::tools::interpreter::PythonInterpreter;
use analyst::tools::{Tool, ToolCall, ToolRegistry};
use analyst::validate::parse_and_validate;

use anyhow::Result;
use std::time::Duration;

use analyst::core::workspace::WorkspaceUpdate;

/// Stand-in for the network-facing scraper: same protocol, canned document.
struct CannedScraper;

impl Tool for CannedScraper {
    fn name(&self) -> &'static str {
        "web_scraper"
    }

    fn accepted_args(&self) -> &'static [&'static str] {
        &["url"]
    }

    fn invoke(&self, call: &ToolCall<'_>) -> Result<WorkspaceUpdate> {
        assert_eq!(call.str_arg("url"), Some("http://x"));
        Ok(WorkspaceUpdate::success().with_raw_document("<table>films</table>"))
    }
}

fn limits() -> SandboxLimits {
    SandboxLimits {
        timeout: Duration::from_secs(5),
        memory: "512m".to_string(),
    }
}

#[test]
fn three_step_plan_recovers_from_one_failure() {
    let cleaned = table(&["Title"], vec![vec![json!("Avatar")], vec![json!("Titanic")]]);

    // Sandbox script: step 2 fails once with a naming error, succeeds after
    // repair; step 3 prints the row count.
    let sandbox = Arc::new(ScriptedSandbox::new(vec![
        sandbox_err("NameError: name 'tabel' is not defined"),
        sandbox_ok(&cleaned.to_split_json()),
        sandbox_ok("2\n"),
    ]));

    let mut registry = ToolRegistry::new();
    registry.register(Box::new(CannedScraper));
    registry.register(Box::new(PythonInterpreter::new(sandbox.clone(), limits())));
    registry.register(Box::new(AnswerGenerator::new(sandbox.clone(), limits())));

    let repair = ScriptedRepair::new(vec!["df = df.head(2)"]);
    let executor = PlanExecutor::new(&registry, &repair, 3);

    let plan = parse_and_validate(
        r#"[{"step": 1, "tool": "web_scraper", "args": {"url": "http://x"}},
            {"step": 2, "tool": "python_interpreter", "args": {"code": "tabel = tabel[:2]"}},
            {"step": 3, "tool": "answer_generator", "args": {"code": "print(df.shape[0])"}}]"#,
    )
    .expect("plan");

    let mut workspace = Workspace::new();
    let report = executor.execute("keep the first two films", &plan, &mut workspace);

    assert!(report.completed());
    assert_eq!(report.steps_run, 3);
    assert!(!workspace.is_failed());
    assert_eq!(workspace.error_message, None);
    assert_eq!(workspace.final_answer.as_deref(), Some("2"));
    assert_eq!(workspace.table, Some(cleaned.clone()));
    assert_eq!(
        workspace.raw_document.as_deref(),
        Some("<table>films</table>")
    );

    // One repair, for step 2, carrying the failure transcript.
    let calls = repair.calls.borrow();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].failing_step, 2);
    assert!(calls[0].history.contains("NameError"));
    assert!(calls[0].history.contains("tabel = tabel[:2]"));

    // Three sandbox runs: failed attempt, repaired attempt, answer step.
    let requests = sandbox.requests.borrow();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].code, "tabel = tabel[:2]");
    assert_eq!(requests[0].emit, EmitMode::Table);
    assert_eq!(requests[1].code, "df = df.head(2)");
    // The answer step's snapshot carries the cleaned table and the document.
    assert_eq!(requests[2].emit, EmitMode::Answer);
    assert_eq!(requests[2].table_json, cleaned.to_split_json());
    assert_eq!(requests[2].raw_document, "<table>films</table>");
}

#[test]
fn failed_cleaning_step_preserves_partial_artifacts() {
    // Every attempt fails: the plan halts, but the document scraped in
    // step 1 stays in the workspace for diagnostics.
    let sandbox = Arc::new(ScriptedSandbox::new(vec![
        sandbox_err("KeyError: 'Gross'"),
        sandbox_err("KeyError: 'Gross'"),
    ]));

    let mut registry = ToolRegistry::new();
    registry.register(Box::new(CannedScraper));
    registry.register(Box::new(PythonInterpreter::new(sandbox.clone(), limits())));

    let repair = ScriptedRepair::new(vec!["df['Gross']"]);
    let executor = PlanExecutor::new(&registry, &repair, 2);

    let plan = parse_and_validate(
        r#"[{"step": 1, "tool": "web_scraper", "args": {"url": "http://x"}},
            {"step": 2, "tool": "python_interpreter", "args": {"code": "df[' Gross ']"}}]"#,
    )
    .expect("plan");

    let mut workspace = Workspace::new();
    let report = executor.execute("clean the gross column", &plan, &mut workspace);

    assert!(!report.completed());
    assert_eq!(report.steps_run, 1);
    assert!(workspace.is_failed());
    assert!(
        workspace
            .error_message
            .as_deref()
            .expect("error message")
            .contains("KeyError: 'Gross'")
    );
    assert_eq!(
        workspace.raw_document.as_deref(),
        Some("<table>films</table>"),
        "partial artifacts must be preserved for diagnostics"
    );
}
