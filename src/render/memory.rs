//! Renderers for single-memory tools: writes, drafts, resolve, recall, recap

use serde_json::{Map, Value};

use super::views::{ConnectionView, MemoryView, ResolveView, SessionRecapView, WriteView, decode};
use super::{pretty_json, request_str, truncate};

const STORED_PREVIEW_CHARS: usize = 100;

pub(super) fn render_observe(data: &Value, request: &Map<String, Value>) -> String {
    let view: WriteView = decode(data);
    let content = request_str(request, "content").unwrap_or("");
    let preview = truncate(content, STORED_PREVIEW_CHARS);
    let ellipsis = if content.chars().count() > STORED_PREVIEW_CHARS { "..." } else { "" };
    format!("Stored [{}]\n{}{}", view.id().unwrap_or("?"), preview, ellipsis)
}

pub(super) fn render_update(data: &Value, request: &Map<String, Value>) -> String {
    let view: WriteView = decode(data);
    let id = view.id().or_else(|| request_str(request, "memory_id")).unwrap_or("?");
    let mut fields: Vec<&str> = request
        .keys()
        .map(String::as_str)
        .filter(|k| *k != "memory_id")
        .collect();
    fields.sort_unstable();

    if fields.is_empty() {
        format!("Updated [{}]", id)
    } else {
        format!("Updated [{}]\nFields: {}", id, fields.join(", "))
    }
}

pub(super) fn render_commit(data: &Value, request: &Map<String, Value>) -> String {
    let view: WriteView = decode(data);
    let id = view.id().or_else(|| request_str(request, "memory_id")).unwrap_or("?");
    match view.state.as_deref() {
        Some(state) => format!("Committed [{}] ({})", id, state),
        None => format!("Committed [{}]", id),
    }
}

/// A write the backend kept as a draft; spell out what is missing and what to call next
pub(super) fn render_draft(view: &WriteView, request: &Map<String, Value>) -> String {
    let id = view.id().or_else(|| request_str(request, "memory_id")).unwrap_or("?");
    let mut lines = vec![format!("Draft [{}] saved but not committed", id)];

    let warnings = view.warnings.clone().unwrap_or_default();
    let missing = warnings.missing_fields.unwrap_or_default();
    if !missing.is_empty() {
        lines.push(format!("Missing: {}", missing.join(", ")));
    }
    if let Some(reasoning) = warnings.reasoning.filter(|r| !r.is_empty()) {
        lines.push(format!("Reasoning: {}", reasoning));
    }

    let next = warnings.suggested_action.filter(|a| !a.is_empty()).unwrap_or_else(|| {
        format!(
            "add the missing fields with update(memory_id=\"{id}\", ...), then call commit(memory_id=\"{id}\")"
        )
    });
    lines.push(format!("Next: {}", next));

    lines.join("\n")
}

pub(super) fn render_resolve(data: &Value) -> String {
    let view: ResolveView = decode(data);
    let mut text = format!(
        "[{}] resolved:{}",
        view.memory_id.as_deref().unwrap_or("?"),
        view.outcome.as_deref().unwrap_or("?")
    );
    if let Some(count) = view.cascade_count.filter(|c| *c > 0) {
        text.push_str(&format!(" ({} cascade)", count));
    }
    if let Some(err) = view.cascade_error.filter(|e| !e.is_empty()) {
        text.push_str(&format!(" cascade_error: {}", err));
    }
    text
}

pub(super) fn render_recall(data: &Value) -> String {
    let memory: MemoryView = match data.get("memory") {
        Some(inner) => decode(inner),
        None => decode(data),
    };

    let state_label = match (memory.state(), memory.outcome()) {
        (Some("resolved"), Some(outcome)) if !outcome.is_empty() => format!("resolved:{}", outcome),
        (Some(state), _) => state.to_string(),
        (None, _) => "active".to_string(),
    };

    let confidence = memory
        .confidence_pct()
        .map(|p| format!("{}%", p))
        .unwrap_or_else(|| "untested".to_string());

    let mut traits = Vec::new();
    if memory.has_source() {
        traits.push("sourced");
    }
    if memory.is_derived() {
        traits.push("derived");
    }
    if memory.is_time_bound() {
        traits.push("time-bound");
    }
    let trait_label = if traits.is_empty() { "standalone".to_string() } else { traits.join(", ") };

    let mut lines = vec![
        format!("[{}] {}", memory.id(), memory.content()),
        format!("{} | {} | {}", trait_label, state_label, confidence),
    ];

    if let Some(source) = memory.source.as_deref().filter(|s| !s.is_empty()) {
        lines.push(format!("Source: {}", source));
    }

    for violation in memory.violations.as_deref().unwrap_or(&[]) {
        lines.push(format!(
            "Violation: \"{}\" (by {})",
            violation.condition.as_deref().unwrap_or(""),
            violation.obs_id.as_deref().unwrap_or("?")
        ));
    }

    let connections: Vec<ConnectionView> = data
        .get("connections")
        .map(decode::<Vec<ConnectionView>>)
        .unwrap_or_default();
    if !connections.is_empty() {
        let ids: Vec<String> = connections
            .iter()
            .map(|c| format!("[{}]", c.target_id.as_deref().unwrap_or("?")))
            .collect();
        lines.push(format!("Connections: {}", ids.join(", ")));
    }

    lines.join("\n").trim_end().to_string()
}

pub(super) fn render_session_recap(data: &Value) -> String {
    if data.get("summary").is_none() {
        return pretty_json(data);
    }

    let view: SessionRecapView = decode(data);
    let mut text = format!(
        "=== SESSION RECAP === ({} memories)\n\n{}",
        view.total.unwrap_or(0),
        view.summary.unwrap_or_default()
    );
    let ids = view.memory_ids.unwrap_or_default();
    if !ids.is_empty() {
        let ids: Vec<String> = ids.iter().map(|id| format!("[{}]", id)).collect();
        text.push_str(&format!("\n\nReferenced: {}", ids.join(", ")));
    }
    text
}
