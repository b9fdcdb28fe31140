//! The `table` artifact and its split-orient JSON interchange codec.
//!
//! Tables cross the sandbox boundary as pandas split-orient JSON
//! (`{"columns": [...], "index": [...], "data": [[...], ...]}`), which is the
//! one format both sides agree on. The codec must satisfy a round-trip law:
//! encode → decode → encode preserves columns, row order, and cell values.

use anyhow::{Context, Result, anyhow};
use serde_json::{Value, json};

/// A 2-D labeled dataset: ordered columns, ordered rows, JSON cell values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Encode to split-orient JSON text. `index` is a plain 0..n range; pandas
    /// requires the field but the executor never reads it back.
    pub fn to_split_json(&self) -> String {
        let index: Vec<usize> = (0..self.rows.len()).collect();
        json!({
            "columns": self.columns,
            "index": index,
            "data": self.rows,
        })
        .to_string()
    }

    /// Decode from split-orient JSON text.
    ///
    /// Column labels may arrive as strings or numbers (pandas keeps whatever
    /// dtype the source had); numeric labels are rendered to their decimal
    /// text. Row order is taken from `data`, not `index`.
    pub fn from_split_json(raw: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(raw.trim()).context("parse split-orient table JSON")?;
        let obj = value
            .as_object()
            .ok_or_else(|| anyhow!("split-orient table must be a JSON object"))?;
        let columns = obj
            .get("columns")
            .and_then(Value::as_array)
            .ok_or_else(|| anyhow!("split-orient table missing 'columns' array"))?
            .iter()
            .map(column_label)
            .collect::<Result<Vec<_>>>()?;
        let rows = obj
            .get("data")
            .and_then(Value::as_array)
            .ok_or_else(|| anyhow!("split-orient table missing 'data' array"))?
            .iter()
            .map(|row| {
                row.as_array()
                    .cloned()
                    .ok_or_else(|| anyhow!("split-orient table row must be an array"))
            })
            .collect::<Result<Vec<_>>>()?;
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(anyhow!(
                    "row {i} has {} cells but table has {} columns",
                    row.len(),
                    columns.len()
                ));
            }
        }
        Ok(Self { columns, rows })
    }

    /// Render the first `limit` rows as preview text for oracle prompts.
    pub fn preview(&self, limit: usize) -> String {
        let mut buf = String::new();
        buf.push_str(&self.columns.join(" | "));
        buf.push('\n');
        for row in self.rows.iter().take(limit) {
            let cells: Vec<String> = row.iter().map(cell_text).collect();
            buf.push_str(&cells.join(" | "));
            buf.push('\n');
        }
        buf
    }
}

fn column_label(value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(anyhow!("unsupported column label: {other}")),
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
