//! Response rendering - backend JSON to compact text
//!
//! One renderer per tool family. Renderers are pure and never fail: a payload
//! missing what a renderer expects still produces a readable line.

mod admin;
mod graph;
mod memory;
mod search;
pub mod views;

pub use graph::{DerivationGraph, render_reference};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use views::{WriteView, decode};

/// Which renderer a tool's response goes through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderKind {
    Observe,
    Update,
    Commit,
    Resolve,
    Find,
    Recall,
    Pending,
    Insights,
    Reference,
    Roots,
    Zones,
    Between,
    Surprising,
    SessionRecap,
    Admin,
    Json,
}

impl RenderKind {
    /// Write tools whose reply may be a draft awaiting commit
    pub fn may_draft(&self) -> bool {
        matches!(self, Self::Observe | Self::Update | Self::Commit)
    }
}

/// Render a backend reply; `request` is the body that was sent
pub fn render(kind: RenderKind, data: &Value, request: &Map<String, Value>) -> String {
    if kind.may_draft() {
        let write: WriteView = decode(data);
        if write.is_draft() {
            return memory::render_draft(&write, request);
        }
    }

    match kind {
        RenderKind::Observe => memory::render_observe(data, request),
        RenderKind::Update => memory::render_update(data, request),
        RenderKind::Commit => memory::render_commit(data, request),
        RenderKind::Resolve => memory::render_resolve(data),
        RenderKind::Recall => memory::render_recall(data),
        RenderKind::SessionRecap => memory::render_session_recap(data),
        RenderKind::Find => search::render_find(data, request),
        RenderKind::Pending => search::render_pending(data),
        RenderKind::Insights => search::render_insights(data, request),
        RenderKind::Roots => search::render_roots(data),
        RenderKind::Zones => search::render_zones(data),
        RenderKind::Between => search::render_between(data),
        RenderKind::Surprising => search::render_surprising(data),
        RenderKind::Reference => render_reference(data, request),
        RenderKind::Admin => admin::render_admin(data),
        RenderKind::Json => pretty_json(data),
    }
}

/// Whole percentage from either a fraction (<= 1) or a percentage (> 1).
///
/// The unit is guessed from magnitude; callers must not mix conventions
/// within one field.
pub fn pct(value: f64) -> i64 {
    if value <= 1.0 {
        (value * 100.0).round() as i64
    } else {
        value.round() as i64
    }
}

/// UTC calendar date for a Unix timestamp in seconds or milliseconds.
///
/// Values below 1e12 are taken as seconds. Unit is guessed from magnitude.
pub fn format_timestamp(ts: f64) -> String {
    let ms = if ts < 1e12 { ts * 1000.0 } else { ts };
    DateTime::<Utc>::from_timestamp_millis(ms as i64)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "?".to_string())
}

/// Deadline text for a `resolves_by` value
pub fn format_deadline(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "no deadline".to_string(),
        Some(Value::Number(n)) => n.as_f64().map(format_timestamp).unwrap_or_else(|| "?".to_string()),
        Some(Value::String(s)) => match s.trim().parse::<f64>() {
            Ok(ts) => format_timestamp(ts),
            Err(_) => s.clone(),
        },
        Some(other) => other.to_string(),
    }
}

/// Marker appended to a memory line for its state
pub fn outcome_icon(state: Option<&str>, outcome: Option<&str>) -> &'static str {
    match (state, outcome) {
        (Some("resolved"), Some("incorrect")) => " ❌",
        (Some("resolved"), Some("superseded")) => " ⏰",
        (Some("resolved"), Some("correct")) => " ✅",
        (Some("resolved"), Some("voided")) => " 🚫",
        (Some("violated"), _) => " ⚠️",
        (Some("confirmed"), _) => " ✓",
        _ => "",
    }
}

/// First `max` characters of `text`
pub fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

pub fn pretty_json(data: &Value) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string())
}

/// String argument from the request body
fn request_str<'a>(request: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    request.get(key).and_then(Value::as_str)
}
