//! Keeps tool responses small enough for an agent's context window.

pub mod attributes;
pub mod budget;
pub mod feed;
pub mod projection;

use serde_json::Value;

use crate::config::settings::ShapingConfig;
use crate::shaping::budget::{truncate_to_budget, SizeBudget};
use crate::shaping::projection::EntityKind;

#[derive(Debug, Clone, PartialEq)]
pub struct ShapingResult {
    pub data: Vec<Value>,
    pub truncated: bool,
    pub original_count: usize,
    pub returned_count: usize,
    pub message: Option<String>,
}

impl ShapingResult {
    pub fn complete(data: Vec<Value>) -> Self {
        let count = data.len();
        Self {
            data,
            truncated: false,
            original_count: count,
            returned_count: count,
            message: None,
        }
    }

    pub fn truncated(data: Vec<Value>, original_count: usize) -> Self {
        let returned_count = data.len();
        let message = format!(
            "Showing {} of {} results. {} results omitted due to response size limits. \
             Use more specific search filters to narrow the results.",
            returned_count,
            original_count,
            original_count - returned_count
        );
        Self {
            data,
            truncated: true,
            original_count,
            returned_count,
            message: Some(message),
        }
    }

    /// Pretty JSON of the data, with the truncation notice trailing it.
    pub fn render(&self) -> String {
        let mut out = to_pretty_json(&self.data);
        if let Some(message) = &self.message {
            out.push_str("\n\n# ");
            out.push_str(message);
        }
        out
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResponseShaper {
    budget: SizeBudget,
}

impl ResponseShaper {
    pub fn new(budget: SizeBudget) -> Self {
        Self { budget }
    }

    pub fn from_config(cfg: &ShapingConfig) -> Self {
        Self::new(SizeBudget::from_config(cfg))
    }

    pub fn shape_record(&self, record: Value) -> Value {
        attributes::collapse_attributes(record)
    }

    pub fn shape_collection(&self, kind: EntityKind, payload: Value) -> ShapingResult {
        let records = projection::project_all(kind, &into_records(payload));
        truncate_to_budget(records, &self.budget)
    }

    pub fn shape_feed(&self, payload: Value) -> ShapingResult {
        let entries = into_records(payload)
            .into_iter()
            .map(feed::minimize_feed_entry)
            .collect();
        truncate_to_budget(entries, &self.budget)
    }
}

/// Collection payloads are arrays; `null` means no results.
fn into_records(payload: Value) -> Vec<Value> {
    match payload {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

pub fn to_pretty_json<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string())
}
