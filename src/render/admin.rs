//! Admin tool replies
//!
//! Admin endpoints answer with loosely shaped objects. The first recognised
//! key decides the line; anything else falls back to pretty JSON.

use serde_json::Value;

use super::views::{AdminView, decode};
use super::{pretty_json, truncate};

const PREVIEW_ITEMS: usize = 10;
const PREVIEW_CONTENT_CHARS: usize = 80;

fn dry_run_suffix(view: &AdminView) -> &'static str {
    if view.dry_run.unwrap_or(false) { " (dry run)" } else { "" }
}

fn preview_line(item: &Value) -> String {
    match item {
        Value::Object(fields) => format!(
            "  [{}] {}",
            fields.get("id").and_then(Value::as_str).unwrap_or("?"),
            truncate(fields.get("content").and_then(Value::as_str).unwrap_or(""), PREVIEW_CONTENT_CHARS)
        ),
        Value::String(id) => format!("  [{}] ", id),
        other => format!("  [{}] ", other),
    }
}

pub(super) fn render_admin(data: &Value) -> String {
    let view: AdminView = decode(data);
    let has = |key: &str| data.get(key).is_some();

    if let Some(count) = view.retracted {
        let mut text = format!("Retracted {} memor{}", count, if count == 1 { "y" } else { "ies" });
        if let Some(cascade) = view.cascade_retracted.filter(|c| *c > 0) {
            text.push_str(&format!(" + {} cascade", cascade));
        }
        if let Some(reason) = view.reason.as_deref().filter(|r| !r.is_empty()) {
            text.push_str(&format!(" ({})", reason));
        }
        return text;
    }

    if has("pending_count") || has("event_types") {
        return pretty_json(data);
    }

    if let Some(purged) = view.purged {
        return format!("Purged {} events{}", purged, dry_run_suffix(&view));
    }

    if view.previous_state.is_some() || view.new_state.is_some() {
        return format!(
            "[{}] {} → {}",
            view.memory_id.as_deref().unwrap_or("?"),
            view.previous_state.as_deref().unwrap_or("?"),
            view.new_state.as_deref().or(view.state.as_deref()).unwrap_or("?")
        );
    }

    if let Some(cleaned) = view.cleaned {
        return format!("Cleaned {} condition vectors{}", cleaned, dry_run_suffix(&view));
    }

    // previews come before the bare "Done" so a small dry-run payload still lists its items
    if let Some(items) = &view.would_retract {
        let mut lines = vec![format!("Would retract {} memories:", items.len())];
        lines.extend(items.iter().take(PREVIEW_ITEMS).map(preview_line));
        return lines.join("\n");
    }

    let small = data.as_object().is_some_and(|fields| fields.len() <= 2);
    if view.success.unwrap_or(false) && small {
        return "Done".to_string();
    }

    pretty_json(data)
}
