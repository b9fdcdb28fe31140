//! Plan and step types plus their structural invariants.
//!
//! A plan is an ordered sequence of steps, unique by step number. Execution
//! order is ascending step number regardless of the order the planner emitted
//! them in.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One instruction in a plan: a tool name and its declared arguments.
///
/// Immutable once dispatched. A repaired version of a failing step only ever
/// swaps the `code` argument, never the tool or number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// 1-indexed step number; drives execution order.
    pub step: u32,
    pub tool: String,
    #[serde(default)]
    pub args: BTreeMap<String, Value>,
}

impl Step {
    /// The step's declared `code` argument, if it carries one.
    pub fn code(&self) -> Option<&str> {
        self.args.get("code").and_then(Value::as_str)
    }
}

/// Ordered instructions the executor carries out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Plan {
    pub steps: Vec<Step>,
}

impl Plan {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Steps in execution order (ascending step number).
    pub fn in_order(&self) -> Vec<&Step> {
        let mut ordered: Vec<&Step> = self.steps.iter().collect();
        ordered.sort_by_key(|s| s.step);
        ordered
    }

    /// Render the plan as text for oracle prompts.
    pub fn to_text(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "[]".to_string())
    }
}

/// Check plan invariants: non-empty, step numbers ≥ 1 and unique, tool names
/// non-empty. Returns one message per violation, in deterministic order.
pub fn validate_invariants(plan: &Plan) -> Vec<String> {
    let mut errors = Vec::new();
    if plan.is_empty() {
        errors.push("plan has no steps".to_string());
    }
    let mut seen = BTreeSet::new();
    for step in &plan.steps {
        if step.step < 1 {
            errors.push(format!("step number {} must be >= 1", step.step));
        }
        if !seen.insert(step.step) {
            errors.push(format!("duplicate step number {}", step.step));
        }
        if step.tool.trim().is_empty() {
            errors.push(format!("step {} has an empty tool name", step.step));
        }
    }
    errors
}
