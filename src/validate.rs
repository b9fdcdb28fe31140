//! Plan validation: JSON Schema plus structural invariants.
//!
//! Every plan entering the executor — fresh from the planner oracle, loaded
//! from the cache, or handed in on the command line — goes through
//! [`parse_and_validate`].

use anyhow::{Context, Result, anyhow};
use jsonschema::validator_for;
use serde_json::Value;

use crate::core::plan::{Plan, validate_invariants};

const PLAN_SCHEMA: &str = include_str!("../schemas/plan/v1.schema.json");

/// Parse plan JSON and validate it against the schema and the structural
/// invariants (unique step numbers, numbers ≥ 1, non-empty tool names).
pub fn parse_and_validate(raw: &str) -> Result<Plan> {
    let value: Value = serde_json::from_str(raw.trim()).context("parse plan JSON")?;
    validate_schema(&value)?;
    let plan: Plan = serde_json::from_value(value).context("deserialize plan")?;
    let errors = validate_invariants(&plan);
    if !errors.is_empty() {
        return Err(anyhow!("plan invariants failed: {}", errors.join("; ")));
    }
    Ok(plan)
}

fn validate_schema(plan: &Value) -> Result<()> {
    let schema_value: Value =
        serde_json::from_str(PLAN_SCHEMA).context("parse bundled plan schema")?;
    let compiled =
        validator_for(&schema_value).map_err(|err| anyhow!("invalid schema: {err}"))?;
    if !compiled.is_valid(plan) {
        let messages = compiled
            .iter_errors(plan)
            .map(|err| err.to_string())
            .collect::<Vec<_>>();
        return Err(anyhow!(
            "plan schema validation failed: {}",
            messages.join("; ")
        ));
    }
    Ok(())
}
