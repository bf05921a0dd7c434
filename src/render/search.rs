//! Renderers for listing tools

use serde_json::{Map, Value};

use super::views::{FindView, MemoryView, MixedListView, PageView, RootsView, ZoneView, decode, memory_or_wrapped};
use super::{format_deadline, outcome_icon, pct, request_str, truncate};

const FIND_CONTENT_CHARS: usize = 80;
const ZONE_CONTENT_CHARS: usize = 60;

fn memory_line(memory: &MemoryView) -> String {
    format!("[{}] {}", memory.id(), memory.content())
}

fn surprise_suffix(surprise: Option<f64>) -> String {
    surprise.map(|s| format!(" surp:{}%", pct(s))).unwrap_or_default()
}

pub(super) fn render_find(data: &Value, request: &Map<String, Value>) -> String {
    let view: FindView = decode(data);
    let query = view
        .query
        .as_deref()
        .or_else(|| request_str(request, "query"))
        .unwrap_or("");

    let hits = view.results.unwrap_or_default();
    if hits.is_empty() {
        return format!("No results for \"{}\"", query);
    }

    let entries: Vec<String> = hits
        .iter()
        .enumerate()
        .map(|(i, hit)| {
            let memory = hit.memory.clone().unwrap_or_default();
            format!(
                "{}. [{}] {}{}\n   sim:{}% conf:{}%{}",
                i + 1,
                memory.id(),
                truncate(memory.content(), FIND_CONTENT_CHARS),
                outcome_icon(memory.state(), memory.outcome()),
                pct(hit.similarity.unwrap_or(0.0)),
                pct(hit.confidence.unwrap_or(0.0)),
                surprise_suffix(hit.surprise)
            )
        })
        .collect();

    format!("Found {} for \"{}\":\n\n{}", hits.len(), query, entries.join("\n\n"))
}

pub(super) fn render_pending(data: &Value) -> String {
    let page: PageView = decode(data);
    if page.items().is_empty() {
        return "No pending time-bound memories".to_string();
    }

    let entries: Vec<String> = page
        .items()
        .iter()
        .map(|m| format!("{}\n   Resolves by: {}", memory_line(m), format_deadline(m.resolves_by.as_ref())))
        .collect();

    let (first, last, total) = page.window();
    format!(
        "=== PENDING RESOLUTION === (showing {}-{} of {})\n\n{}",
        first,
        last,
        total,
        entries.join("\n\n")
    )
}

pub(super) fn render_insights(data: &Value, request: &Map<String, Value>) -> String {
    let page: PageView = decode(data);
    let view = page
        .view
        .as_deref()
        .or_else(|| request_str(request, "view"))
        .unwrap_or("?");

    if page.items().is_empty() {
        return format!("No memories in \"{}\" view", view);
    }

    let lines: Vec<String> = page
        .items()
        .iter()
        .map(|m| {
            let tested = m
                .confidence_pct()
                .map(|conf| format!(" ({}% conf, {} tests)", conf, m.times_tested()))
                .unwrap_or_default();
            format!("{}{}{}", memory_line(m), outcome_icon(m.state(), m.outcome()), tested)
        })
        .collect();

    let (first, last, total) = page.window();
    format!(
        "=== {} === (showing {}-{} of {})\n\n{}",
        view.to_uppercase(),
        first,
        last,
        total,
        lines.join("\n")
    )
}

pub(super) fn render_roots(data: &Value) -> String {
    let view: RootsView = decode(data);
    let roots = view.roots.or(view.results).unwrap_or_default();
    if roots.is_empty() {
        return "No root memories found".to_string();
    }

    let lines: Vec<String> = roots.iter().map(memory_line).collect();
    format!("Root memories ({}):\n\n{}", roots.len(), lines.join("\n"))
}

pub(super) fn render_zones(data: &Value) -> String {
    let view: ZoneView = decode(data);
    let members = view.memories.unwrap_or_default();
    if members.is_empty() {
        return "Empty zone".to_string();
    }

    let stats = view.stats.unwrap_or_default();
    let total = stats.total_memories.unwrap_or(members.len() as u64);
    let edges = stats
        .total_edges
        .unwrap_or_else(|| view.edges.as_ref().map_or(0, Vec::len) as u64);

    let mut lines = vec![format!("Zone: {} members, {} edges", total, edges)];
    lines.extend(
        members
            .iter()
            .map(|m| format!("[{}] {}", m.id(), truncate(m.content(), ZONE_CONTENT_CHARS))),
    );
    lines.join("\n")
}

pub(super) fn render_between(data: &Value) -> String {
    let view: MixedListView = decode(data);
    let bridges = view.bridges.or(view.results).unwrap_or_default();
    if bridges.is_empty() {
        return "No bridging memories found".to_string();
    }

    let lines: Vec<String> = bridges.iter().map(|b| memory_line(&memory_or_wrapped(b))).collect();
    format!("Bridges ({}):\n\n{}", bridges.len(), lines.join("\n"))
}

pub(super) fn render_surprising(data: &Value) -> String {
    let view: MixedListView = decode(data);
    let items = view.results.or(view.memories).unwrap_or_default();
    if items.is_empty() {
        return "No surprising memories found".to_string();
    }

    let lines: Vec<String> = items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let memory = memory_or_wrapped(item);
            // wrapper score wins over the memory's own
            let surprise = item.get("surprise").and_then(Value::as_f64).or(memory.surprise);
            format!("{}. {}{}", i + 1, memory_line(&memory), surprise_suffix(surprise))
        })
        .collect();

    format!("Most surprising ({}):\n\n{}", items.len(), lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_find_empty_uses_request_query() {
        let text = render_find(&json!({"results": []}), &request(json!({"query": "foo"})));
        assert_eq!(text, "No results for \"foo\"");
    }

    #[test]
    fn test_find_empty_prefers_echoed_query() {
        let text = render_find(&json!({"query": "bar", "results": []}), &request(json!({"query": "foo"})));
        assert_eq!(text, "No results for \"bar\"");
    }

    #[test]
    fn test_find_numbered_hits() {
        let data = json!({
            "query": "rates",
            "results": [
                {
                    "memory": {"id": "m1", "content": "Rates fall", "state": "confirmed"},
                    "similarity": 0.912,
                    "confidence": 0.5,
                    "surprise": 0.25
                },
                {
                    "memory": {"id": "m2", "content": "Yields drop", "state": "resolved", "outcome": "correct"},
                    "similarity": 80,
                    "confidence": 0
                }
            ]
        });

        assert_eq!(
            render_find(&data, &Map::new()),
            "Found 2 for \"rates\":\n\n\
             1. [m1] Rates fall ✓\n   sim:91% conf:50% surp:25%\n\n\
             2. [m2] Yields drop ✅\n   sim:80% conf:0%"
        );
    }

    #[test]
    fn test_find_caps_content_and_defaults_scores() {
        let long = "z".repeat(120);
        let data = json!({"query": "q", "results": [{"memory": {"id": "m1", "content": long}}]});
        let text = render_find(&data, &Map::new());
        assert!(text.contains(&format!("1. [m1] {}\n", "z".repeat(80))));
        assert!(text.ends_with("sim:0% conf:0%"));
    }

    #[test]
    fn test_find_keeps_hits_beside_a_malformed_one() {
        let data = json!({
            "query": "metals",
            "results": [
                {"memory": {"id": "m1", "content": "Copper up"}, "similarity": 0.8, "confidence": 0.5},
                {"memory": {"id": "m2", "content": "Tin flat", "times_tested": 2.5}, "similarity": "high", "confidence": 0.4}
            ]
        });
        assert_eq!(
            render_find(&data, &Map::new()),
            "Found 2 for \"metals\":\n\n\
             1. [m1] Copper up\n   sim:80% conf:50%\n\n\
             2. [m2] Tin flat\n   sim:0% conf:40%"
        );
    }

    #[test]
    fn test_pending_keeps_items_beside_a_malformed_one() {
        let data = json!({
            "memories": [
                {"id": "m1", "content": "a", "confirmations": -1},
                {"id": "m2", "content": "b"}
            ]
        });
        assert_eq!(
            render_pending(&data),
            "=== PENDING RESOLUTION === (showing 1-2 of 2)\n\n\
             [m1] a\n   Resolves by: no deadline\n\n\
             [m2] b\n   Resolves by: no deadline"
        );
    }

    #[test]
    fn test_pending() {
        let data = json!({
            "memories": [
                {"id": "m1", "content": "CPI below 3%", "resolves_by": 1_700_000_000},
                {"id": "m2", "content": "No date"}
            ],
            "total": 12,
            "offset": 10
        });

        assert_eq!(
            render_pending(&data),
            "=== PENDING RESOLUTION === (showing 11-12 of 12)\n\n\
             [m1] CPI below 3%\n   Resolves by: 2023-11-14\n\n\
             [m2] No date\n   Resolves by: no deadline"
        );
        assert_eq!(render_pending(&json!({"memories": []})), "No pending time-bound memories");
    }

    #[test]
    fn test_insights() {
        let data = json!({
            "view": "failing",
            "memories": [
                {"id": "m1", "content": "Oil spikes", "state": "violated", "times_tested": 4, "confirmations": 1},
                {"id": "m2", "content": "Untested idea"}
            ]
        });

        assert_eq!(
            render_insights(&data, &Map::new()),
            "=== FAILING === (showing 1-2 of 2)\n\n\
             [m1] Oil spikes ⚠️ (25% conf, 4 tests)\n\
             [m2] Untested idea"
        );
    }

    #[test]
    fn test_insights_empty_names_requested_view() {
        let text = render_insights(&json!({"memories": []}), &request(json!({"view": "orphans"})));
        assert_eq!(text, "No memories in \"orphans\" view");
        assert_eq!(render_insights(&json!({}), &Map::new()), "No memories in \"?\" view");
    }

    #[test]
    fn test_roots() {
        let data = json!({"roots": [{"id": "r1", "content": "Base premise"}]});
        assert_eq!(render_roots(&data), "Root memories (1):\n\n[r1] Base premise");

        let data = json!({"results": [{"id": "r2"}]});
        assert_eq!(render_roots(&data), "Root memories (1):\n\n[r2] ");

        assert_eq!(render_roots(&json!({})), "No root memories found");
    }

    #[test]
    fn test_zones() {
        let data = json!({
            "memories": [{"id": "a", "content": "x".repeat(70)}, {"id": "b", "content": "short"}],
            "edges": [{}, {}, {}],
            "stats": {"total_memories": 9}
        });
        assert_eq!(
            render_zones(&data),
            format!("Zone: 9 members, 3 edges\n[a] {}\n[b] short", "x".repeat(60))
        );
        assert_eq!(render_zones(&json!({"memories": []})), "Empty zone");
    }

    #[test]
    fn test_between_accepts_bare_and_wrapped() {
        let data = json!({
            "bridges": [
                {"id": "m1", "content": "bare"},
                {"memory": {"id": "m2", "content": "wrapped"}, "score": 0.4}
            ]
        });
        assert_eq!(render_between(&data), "Bridges (2):\n\n[m1] bare\n[m2] wrapped");
        assert_eq!(render_between(&json!({"bridges": []})), "No bridging memories found");
    }

    #[test]
    fn test_surprising() {
        let data = json!({
            "results": [
                {"memory": {"id": "m1", "content": "Gold up", "surprise": 0.1}, "surprise": 0.9},
                {"id": "m2", "content": "Bare", "surprise": 75},
                {"id": "m3", "content": "No score"}
            ]
        });
        assert_eq!(
            render_surprising(&data),
            "Most surprising (3):\n\n\
             1. [m1] Gold up surp:90%\n\
             2. [m2] Bare surp:75%\n\
             3. [m3] No score"
        );
    }

    #[test]
    fn test_surprising_falls_back_to_memories_key() {
        let data = json!({"memories": [{"id": "m1", "content": "only", "surprise": 0.5}]});
        assert_eq!(render_surprising(&data), "Most surprising (1):\n\n1. [m1] only surp:50%");
        assert_eq!(render_surprising(&json!({})), "No surprising memories found");
    }
}
