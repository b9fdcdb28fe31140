//! Optional plan cache on disk.
//!
//! Re-planning is the most expensive call in a run, so a generated plan can
//! be written next to the request and reused. Cached plans are revalidated on
//! load — a stale or hand-edited file must not smuggle an invalid plan past
//! the oracle adapter.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::core::plan::Plan;
use crate::io::config::write_atomic;
use crate::validate::parse_and_validate;

/// Load a cached plan if the file exists, validating it like a fresh oracle
/// reply.
pub fn load_cached_plan(path: &Path) -> Result<Option<Plan>> {
    if !path.exists() {
        debug!(path = %path.display(), "no cached plan");
        return Ok(None);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("read cached plan {}", path.display()))?;
    let plan = parse_and_validate(&contents)
        .with_context(|| format!("cached plan {} is invalid", path.display()))?;
    info!(path = %path.display(), steps = plan.steps.len(), "loaded cached plan");
    Ok(Some(plan))
}

/// Write a plan to the cache (temp file + rename).
pub fn write_plan_cache(path: &Path, plan: &Plan) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(plan).context("serialize plan")?;
    buf.push('\n');
    write_atomic(path, &buf).with_context(|| format!("write plan cache {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::plan::Step;
    use std::collections::BTreeMap;

    fn sample_plan() -> Plan {
        Plan::new(vec![Step {
            step: 1,
            tool: "web_scraper".to_string(),
            args: BTreeMap::new(),
        }])
    }

    #[test]
    fn missing_cache_is_none() {
        let temp = tempfile::tempdir().expect("tempdir");
        let loaded = load_cached_plan(&temp.path().join("plan.json")).expect("load");
        assert_eq!(loaded, None);
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("plan.json");
        write_plan_cache(&path, &sample_plan()).expect("write");
        let loaded = load_cached_plan(&path).expect("load");
        assert_eq!(loaded, Some(sample_plan()));
    }

    #[test]
    fn invalid_cache_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("plan.json");
        fs::write(&path, r#"[{"step": 1, "tool": ""}]"#).expect("write");
        let err = load_cached_plan(&path).unwrap_err();
        assert!(format!("{err:#}").contains("invalid"));
    }
}
