//! Prompt rendering for the planner and debugger oracles.
//!
//! The execution core never depends on prompt text — only the command-backed
//! oracle implementations in [`crate::io::oracle`] render these templates.

use anyhow::Result;
use minijinja::{Environment, context};
use serde::Serialize;

use crate::core::table::Table;

const PLANNER_TEMPLATE: &str = include_str!("prompts/planner.md");
const DEBUGGER_TEMPLATE: &str = include_str!("prompts/debugger.md");

/// Rows of table preview shown to the planner.
const PREVIEW_ROWS: usize = 5;

/// Table preview context for template rendering.
#[derive(Debug, Clone, Serialize)]
struct PreviewContext {
    columns: String,
    head: String,
}

impl PreviewContext {
    fn from_table(table: &Table) -> Self {
        Self {
            columns: table.columns.join(", "),
            head: table.preview(PREVIEW_ROWS),
        }
    }
}

/// Template engine wrapper around minijinja.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.add_template("planner", PLANNER_TEMPLATE)
            .expect("planner template should be valid");
        env.add_template("debugger", DEBUGGER_TEMPLATE)
            .expect("debugger template should be valid");
        Self { env }
    }

    /// Render the planner prompt, with a data preview when a table already
    /// exists in the workspace.
    pub fn render_planner(&self, request: &str, preview: Option<&Table>) -> Result<String> {
        let template = self.env.get_template("planner")?;
        let rendered = template.render(context! {
            request => request.trim(),
            preview => preview.map(PreviewContext::from_table),
        })?;
        Ok(rendered)
    }

    /// Render the debugger prompt for a failing step.
    pub fn render_debugger(
        &self,
        request: &str,
        plan_text: &str,
        failing_step: u32,
        history: &str,
    ) -> Result<String> {
        let template = self.env.get_template("debugger")?;
        let rendered = template.render(context! {
            request => request.trim(),
            plan_text => plan_text.trim(),
            failing_step => failing_step,
            history => history.trim(),
        })?;
        Ok(rendered)
    }
}

impl Default for PromptEngine {
    fn default() -> Self {
        Self::new()
    }
}
