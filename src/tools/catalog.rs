//! Built-in tool tables
//!
//! Both surfaces are declared here as data. `validate()` checks the contract
//! invariants once, at start-up, before any tool is served.

use std::collections::HashMap;

use serde_json::json;

use crate::error::{GatewayError, Result};
use crate::render::RenderKind;

use super::definition::{ParamKind, ParamSpec, Route, Surface, Tool, ToolContract};

const MEMORY_STATES: &[&str] = &["active", "confirmed", "violated", "resolved"];

fn required(name: &str, kind: ParamKind, description: &str) -> ParamSpec {
    ParamSpec::required(name, kind, description)
}

fn optional(name: &str, kind: ParamKind, description: &str) -> ParamSpec {
    ParamSpec::optional(name, kind, description)
}

fn dry_run(description: &str) -> ParamSpec {
    optional("dry_run", ParamKind::Boolean, description).with_default(json!(true))
}

/// Parameters shared by observe and update
fn memory_fields(tool: Tool) -> Tool {
    tool.with_param(optional("source", ParamKind::String, "Free-text provenance (e.g. \"market\", \"sec-10k\", \"human\")"))
        .with_param(optional("source_url", ParamKind::String, "URL where this information came from"))
        .with_param(optional("derived_from", ParamKind::StringList, "Source memory IDs this memory derives from"))
        .with_param(optional("invalidates_if", ParamKind::StringList, "Conditions that would prove this wrong"))
        .with_param(optional("confirms_if", ParamKind::StringList, "Conditions that would strengthen this"))
        .with_param(optional("assumes", ParamKind::StringList, "Underlying assumptions"))
        .with_param(optional(
            "resolves_by",
            ParamKind::Deadline,
            "Deadline as date string (e.g. \"2026-03-15\") or Unix timestamp",
        ))
        .with_param(optional(
            "outcome_condition",
            ParamKind::String,
            "Success/failure criteria (required if resolves_by set)",
        ))
        .with_param(optional("tags", ParamKind::StringList, "Tags for categorization"))
        .with_param(optional(
            "obsidian_sources",
            ParamKind::StringList,
            "Obsidian vault file paths that reference this memory",
        ))
}

fn user_tools() -> Vec<Tool> {
    vec![
        memory_fields(
            Tool::new(
                "observe",
                "Store a new memory: something seen, read, inferred or predicted. \
                 At least one of `source` or `derived_from` is required.",
                Route::post("/observe"),
            )
            .with_contract(ToolContract::mutating())
            .with_render(RenderKind::Observe)
            .with_param(required("content", ParamKind::String, "The memory content")),
        )
        .with_param(optional(
            "atomic_override",
            ParamKind::Boolean,
            "Bypass the atomicity check for intentionally composite notes",
        )),
        memory_fields(
            Tool::new(
                "update",
                "Update a memory's content or metadata. Lists are merged, not replaced. \
                 For a changed thesis use resolve(outcome=\"superseded\") and observe instead.",
                Route::post("/update"),
            )
            .with_contract(ToolContract::mutating())
            .with_render(RenderKind::Update)
            .with_param(required("memory_id", ParamKind::String, "ID of the memory to update"))
            .with_param(optional("content", ParamKind::String, "New content text (replaces existing)")),
        ),
        Tool::new(
            "commit",
            "Commit a draft memory once its missing fields have been added.",
            Route::post("/commit"),
        )
        .with_contract(ToolContract::mutating_idempotent())
        .with_render(RenderKind::Commit)
        .with_param(required("memory_id", ParamKind::String, "ID of the draft to commit")),
        Tool::new(
            "resolve",
            "Resolve a memory as correct, incorrect, superseded or voided.",
            Route::post("/resolve"),
        )
        .with_contract(ToolContract::mutating_idempotent())
        .with_render(RenderKind::Resolve)
        .with_param(required("memory_id", ParamKind::String, "ID of the memory to resolve"))
        .with_param(required(
            "outcome",
            ParamKind::one_of(&["correct", "incorrect", "voided", "superseded"]),
            "How the memory turned out",
        ))
        .with_param(required("reason", ParamKind::String, "Why this outcome was chosen (audit trail)"))
        .with_param(optional(
            "replaced_by",
            ParamKind::String,
            "ID of the newer memory that replaces this one (creates a supersedes edge)",
        ))
        .with_param(optional(
            "force",
            ParamKind::Boolean,
            "Allow re-resolving an already resolved memory (default false)",
        )),
        Tool::new(
            "refresh_stats",
            "Recompute system statistics (times-tested distribution, per-source learned confidence).",
            Route::post("/refresh-stats"),
        )
        .with_contract(ToolContract::mutating_idempotent())
        .with_param(
            optional("summary_only", ParamKind::Boolean, "Return current stats without recomputing")
                .with_default(json!(false)),
        ),
        Tool::new(
            "find",
            "Search memories by meaning. Ranked by similarity, confidence, surprise and centrality.",
            Route::post("/find"),
        )
        .with_render(RenderKind::Find)
        .with_param(required("query", ParamKind::String, "Natural language search query"))
        .with_param(optional("has_source", ParamKind::Boolean, "Only memories with an external source"))
        .with_param(optional("has_derived_from", ParamKind::Boolean, "Only memories derived from others"))
        .with_param(optional("time_bound", ParamKind::Boolean, "Only time-bound memories"))
        .with_param(optional("limit", ParamKind::int(1, 100), "Max results").with_default(json!(10)))
        .with_param(optional("min_similarity", ParamKind::number(0.0, 1.0), "Minimum similarity (0-1)")),
        Tool::new(
            "recall",
            "Get a memory by ID with confidence stats, state and derivation edges.",
            Route::get("/recall/{memory_id}"),
        )
        .with_render(RenderKind::Recall)
        .with_param(required("memory_id", ParamKind::String, "ID of the memory to recall")),
        Tool::new(
            "stats",
            "Memory statistics: counts by type, edge count, robustness.",
            Route::get("/stats"),
        ),
        Tool::new(
            "pending",
            "List time-bound memories awaiting resolution.",
            Route::get("/pending"),
        )
        .with_render(RenderKind::Pending)
        .with_param(optional("overdue", ParamKind::Boolean, "Only overdue memories").with_default(json!(false)))
        .with_param(optional("limit", ParamKind::int(1, 100), "Max results").with_default(json!(20)))
        .with_param(optional("offset", ParamKind::int_at_least(0), "Skip first N results").with_default(json!(0))),
        Tool::new(
            "insights",
            "Analyze knowledge graph health through one of several views.",
            Route::get("/insights/{view}"),
        )
        .with_render(RenderKind::Insights)
        .with_param(
            optional(
                "view",
                ParamKind::one_of(&["hubs", "orphans", "untested", "failing", "recent"]),
                "Which view to show",
            )
            .with_default(json!("recent")),
        )
        .with_param(optional("limit", ParamKind::int_at_least(1), "Max results").with_default(json!(20)))
        .with_param(optional("offset", ParamKind::int_at_least(0), "Skip first N results").with_default(json!(0))),
        Tool::new(
            "reference",
            "Follow the derivation graph from a memory.",
            Route::get("/reference/{memory_id}"),
        )
        .with_render(RenderKind::Reference)
        .with_param(required("memory_id", ParamKind::String, "ID of the memory to traverse from"))
        .with_param(
            optional(
                "direction",
                ParamKind::one_of(&["up", "down", "both"]),
                "up (ancestors), down (descendants) or both",
            )
            .with_default(json!("both")),
        )
        .with_param(optional("depth", ParamKind::int(1, 10), "Max traversal depth").with_default(json!(2))),
        Tool::new(
            "roots",
            "Trace a memory back to its root perceptions.",
            Route::get("/roots/{memory_id}"),
        )
        .with_render(RenderKind::Roots)
        .with_param(required("memory_id", ParamKind::String, "ID of the memory to trace")),
        Tool::new(
            "zones",
            "Return a locally consistent reasoning zone around a seed query or memory.",
            Route::post("/zones"),
        )
        .with_render(RenderKind::Zones)
        .with_param(optional("query", ParamKind::String, "Semantic seed query (optional if memory_id given)"))
        .with_param(optional("memory_id", ParamKind::String, "Seed memory ID (optional if query given)"))
        .with_param(optional("max_depth", ParamKind::int(1, 5), "Graph traversal depth").with_default(json!(3)))
        .with_param(optional("max_size", ParamKind::int(1, 100), "Max zone members").with_default(json!(30)))
        .with_param(
            optional("include_semantic", ParamKind::Boolean, "Add semantic matches when the zone is small")
                .with_default(json!(true)),
        )
        .with_param(
            optional("min_edge_strength", ParamKind::number(0.0, 1.0), "Minimum edge strength to traverse")
                .with_default(json!(0.3)),
        ),
        Tool::new(
            "between",
            "Find memories that bridge the given memories.",
            Route::post("/between"),
        )
        .with_render(RenderKind::Between)
        .with_param(required("memory_ids", ParamKind::StringList, "IDs to bridge (at least 2)"))
        .with_param(optional("limit", ParamKind::int(1, 20), "Max bridges").with_default(json!(5))),
        Tool::new(
            "surprising",
            "Find the most surprising memories: highest prediction error against the graph.",
            Route::get("/surprising"),
        )
        .with_render(RenderKind::Surprising)
        .with_param(optional("limit", ParamKind::int(1, 50), "Max results").with_default(json!(10)))
        .with_param(
            optional("min_surprise", ParamKind::number(0.0, 1.0), "Minimum surprise (0-1)").with_default(json!(0.3)),
        ),
        Tool::new(
            "session_recap",
            "Summarize memories accessed in the current session.",
            Route::post("/session-recap"),
        )
        .with_render(RenderKind::SessionRecap)
        .with_param(optional("minutes", ParamKind::int(1, 1440), "Time window in minutes").with_default(json!(30)))
        .with_param(optional("limit", ParamKind::int(1, 100), "Max memories").with_default(json!(30)))
        .with_param(optional(
            "raw",
            ParamKind::Boolean,
            "Skip summarization and return the structured list (default false)",
        )),
    ]
}

fn admin_tools() -> Vec<Tool> {
    let admin = |tool: Tool| tool.with_surface(Surface::Admin).with_render(RenderKind::Admin);

    vec![
        admin(Tool::new(
            "queue_status",
            "Event queue state: pending counts, event type distribution, stuck sessions.",
            Route::post("/admin/queue-status"),
        ))
        .with_param(
            optional("detail_level", ParamKind::one_of(&["summary", "detailed"]), "Amount of detail")
                .with_default(json!("summary")),
        )
        .with_param(optional("session_id", ParamKind::String, "Filter by session ID")),
        admin(Tool::new(
            "queue_purge",
            "Delete stale or dispatched events from the queue.",
            Route::post("/admin/queue-purge"),
        ))
        .with_contract(ToolContract::destructive())
        .with_param(required(
            "mode",
            ParamKind::one_of(&["dispatched_only", "session", "all_pending"]),
            "dispatched_only (safe), session (one session) or all_pending (everything)",
        ))
        .with_param(optional("session_id", ParamKind::String, "Required when mode=session"))
        .with_param(
            optional("older_than_hours", ParamKind::number_at_least(0.0), "Only events older than N hours")
                .with_default(json!(24)),
        )
        .with_param(dry_run("Preview what would be deleted")),
        admin(Tool::new(
            "memory_state",
            "Override a memory's state. Triggers cascade propagation when appropriate.",
            Route::post("/admin/memory-state"),
        ))
        .with_contract(ToolContract::mutating())
        .with_param(required("memory_id", ParamKind::String, "Memory ID to update"))
        .with_param(required("new_state", ParamKind::one_of(MEMORY_STATES), "Target state"))
        .with_param(required("reason", ParamKind::String, "Explanation for the change (audit trail)"))
        .with_param(optional(
            "outcome",
            ParamKind::one_of(&["correct", "incorrect", "voided"]),
            "Required when new_state=resolved",
        )),
        admin(Tool::new(
            "condition_vectors_cleanup",
            "Delete condition vectors of non-active memories to stop stale exposure checks.",
            Route::post("/admin/condition-vectors-cleanup"),
        ))
        .with_contract(ToolContract::destructive())
        .with_param(optional("memory_id", ParamKind::String, "Clean one memory (omit for a batch)"))
        .with_param(optional("batch_size", ParamKind::int(1, 200), "Memories to process").with_default(json!(50)))
        .with_param(dry_run("Preview what would be cleaned")),
        admin(Tool::new(
            "system_diagnostics",
            "System health: memory states, exposure status, queue health, graph metrics.",
            Route::get("/admin/system-diagnostics"),
        ))
        .with_render(RenderKind::Json)
        .with_param(
            optional("include_samples", ParamKind::Boolean, "Include sample memories per state")
                .with_default(json!(false)),
        ),
        admin(Tool::new(
            "force_dispatch",
            "View the pending events of a session, as they would be dispatched.",
            Route::get("/admin/force-dispatch"),
        ))
        .with_param(required("session_id", ParamKind::String, "Session ID to inspect")),
        admin(Tool::new(
            "graph_health",
            "Find graph anomalies: orphan edges, broken derivations, duplicate edges.",
            Route::get("/admin/graph-health"),
        ))
        .with_render(RenderKind::Json)
        .with_param(
            optional(
                "check",
                ParamKind::one_of(&["orphan_edges", "broken_derivations", "duplicate_edges", "all"]),
                "Which check to run",
            )
            .with_default(json!("all")),
        ),
        admin(Tool::new(
            "bulk_retract",
            "Retract a memory and optionally every memory derived from it.",
            Route::post("/admin/bulk-retract"),
        ))
        .with_contract(ToolContract::destructive())
        .with_param(required("memory_id", ParamKind::String, "Memory ID to retract"))
        .with_param(required("reason", ParamKind::String, "Retraction reason"))
        .with_param(
            optional("cascade", ParamKind::Boolean, "Also retract derived descendants").with_default(json!(false)),
        )
        .with_param(dry_run("Preview what would be retracted")),
        admin(Tool::new(
            "re_evaluate_violations",
            "Re-check violated memories with the current judge to find false positives.",
            Route::post("/admin/re-evaluate-violations"),
        ))
        .with_contract(ToolContract::mutating())
        .with_param(optional("memory_id", ParamKind::String, "Re-evaluate one memory (omit for a batch)"))
        .with_param(optional("batch_size", ParamKind::int(1, 50), "Violated memories to process").with_default(json!(10)))
        .with_param(dry_run("Preview results without changing state"))
        .with_param(
            optional(
                "confidence_threshold",
                ParamKind::number(0.0, 1.0),
                "Minimum confidence to keep a violation",
            )
            .with_default(json!(0.7)),
        ),
        admin(Tool::new(
            "backfill_surprise",
            "Compute surprise scores for memories missing them, with parallel workers.",
            Route::post("/admin/backfill-surprise"),
        ))
        .with_contract(ToolContract::mutating())
        .with_param(optional("parallelism", ParamKind::int(1, 20), "Parallel workers").with_default(json!(5)))
        .with_param(optional("batch_size", ParamKind::int(1, 500), "Memories per batch").with_default(json!(50)))
        .with_param(dry_run("Preview what would be backfilled")),
    ]
}

/// Ordered set of tools exposed by one server
#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    tools: Vec<Tool>,
    index: HashMap<String, usize>,
}

impl ToolCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in tool, user tools first
    pub fn builtin() -> Self {
        Self::from_tools(user_tools().into_iter().chain(admin_tools()))
    }

    /// Built-in tools exposed on `surface`
    pub fn for_surface(surface: Surface) -> Self {
        Self::from_tools(Self::builtin().tools.into_iter().filter(|t| surface.exposes(t.surface)))
    }

    pub fn from_tools(tools: impl IntoIterator<Item = Tool>) -> Self {
        let mut catalog = Self::new();
        for tool in tools {
            catalog.add(tool);
        }
        catalog
    }

    /// Add a tool, replacing any tool of the same name in place
    pub fn add(&mut self, tool: Tool) {
        match self.index.get(&tool.name) {
            Some(&i) => self.tools[i] = tool,
            None => {
                self.index.insert(tool.name.clone(), self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    /// Check contract invariants for every tool
    pub fn validate(&self) -> Result<()> {
        self.tools.iter().try_for_each(validate_tool)
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    /// List tool names in declaration order
    pub fn list(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }

    /// Get all tools in declaration order
    pub fn all(&self) -> impl Iterator<Item = &Tool> {
        self.tools.iter()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }
}

fn validate_tool(tool: &Tool) -> Result<()> {
    let fail = |msg: String| Err(GatewayError::Contract(format!("{}: {}", tool.name, msg)));
    let contract = tool.contract;

    if contract.read_only && contract.destructive {
        return fail("read-only tool cannot be destructive".to_string());
    }

    if contract.destructive {
        match tool.param("dry_run") {
            None => return fail("destructive tool has no dry_run parameter".to_string()),
            Some(p) if p.kind != ParamKind::Boolean => return fail("dry_run must be boolean".to_string()),
            Some(p) if p.default != Some(json!(true)) => return fail("dry_run must default to true".to_string()),
            Some(_) => {}
        }
    }

    for placeholder in tool.route.placeholders() {
        match tool.param(placeholder) {
            None => return fail(format!("route placeholder {{{}}} has no parameter", placeholder)),
            Some(p) if !p.required && p.default.is_none() => {
                return fail(format!("route placeholder {{{}}} must be required or defaulted", placeholder));
            }
            Some(_) => {}
        }
    }

    let mut seen = std::collections::HashSet::new();
    for param in &tool.params {
        if !seen.insert(param.name.as_str()) {
            return fail(format!("parameter {} declared twice", param.name));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_validates() {
        let catalog = ToolCatalog::builtin();
        assert!(catalog.validate().is_ok());
        assert_eq!(catalog.len(), 26);
    }

    #[test]
    fn test_surfaces() {
        let user = ToolCatalog::for_surface(Surface::User);
        assert_eq!(user.len(), 16);
        assert!(user.contains("find"));
        assert!(!user.contains("bulk_retract"));

        let admin = ToolCatalog::for_surface(Surface::Admin);
        assert_eq!(admin.len(), 10);
        assert!(admin.contains("queue_purge"));
        assert!(!admin.contains("observe"));

        assert_eq!(ToolCatalog::for_surface(Surface::All).len(), 26);
    }

    #[test]
    fn test_declaration_order() {
        let user = ToolCatalog::for_surface(Surface::User);
        let names = user.list();
        assert_eq!(names[0], "observe");
        assert_eq!(names[names.len() - 1], "session_recap");
    }

    #[test]
    fn test_every_destructive_tool_defaults_to_dry_run() {
        let catalog = ToolCatalog::builtin();
        let destructive: Vec<&Tool> = catalog.all().filter(|t| t.contract.destructive).collect();
        assert_eq!(destructive.len(), 3);
        for tool in destructive {
            let dry_run = tool.param("dry_run").unwrap();
            assert_eq!(dry_run.default, Some(json!(true)), "{}", tool.name);
        }
    }

    #[test]
    fn test_bulk_retract_cascade_defaults_off() {
        let catalog = ToolCatalog::builtin();
        let tool = catalog.get("bulk_retract").unwrap();
        assert_eq!(tool.param("cascade").unwrap().default, Some(json!(false)));
    }

    #[test]
    fn test_rejects_destructive_without_dry_run() {
        let tool = Tool::new("wipe", "Delete everything", Route::post("/admin/wipe"))
            .with_surface(Surface::Admin)
            .with_contract(ToolContract::destructive());
        let err = ToolCatalog::from_tools([tool]).validate().unwrap_err();
        assert!(matches!(err, GatewayError::Contract(_)));
        assert!(err.to_string().contains("no dry_run"));
    }

    #[test]
    fn test_rejects_dry_run_defaulting_false() {
        let tool = Tool::new("wipe", "Delete everything", Route::post("/admin/wipe"))
            .with_contract(ToolContract::destructive())
            .with_param(ParamSpec::optional("dry_run", ParamKind::Boolean, "Preview").with_default(json!(false)));
        let err = ToolCatalog::from_tools([tool]).validate().unwrap_err();
        assert!(err.to_string().contains("default to true"));
    }

    #[test]
    fn test_rejects_read_only_destructive() {
        let mut contract = ToolContract::destructive();
        contract.read_only = true;
        let tool = Tool::new("odd", "Odd", Route::get("/odd"))
            .with_contract(contract)
            .with_param(ParamSpec::optional("dry_run", ParamKind::Boolean, "Preview").with_default(json!(true)));
        assert!(ToolCatalog::from_tools([tool]).validate().is_err());
    }

    #[test]
    fn test_rejects_unbacked_placeholder() {
        let tool = Tool::new("recall", "Recall", Route::get("/recall/{memory_id}"));
        let err = ToolCatalog::from_tools([tool]).validate().unwrap_err();
        assert!(err.to_string().contains("{memory_id}"));

        let tool = Tool::new("recall", "Recall", Route::get("/recall/{memory_id}"))
            .with_param(ParamSpec::optional("memory_id", ParamKind::String, "ID"));
        assert!(ToolCatalog::from_tools([tool]).validate().is_err());
    }

    #[test]
    fn test_add_replaces_in_place() {
        let mut catalog = ToolCatalog::from_tools([
            Tool::new("a", "first", Route::get("/a")),
            Tool::new("b", "second", Route::get("/b")),
        ]);
        catalog.add(Tool::new("a", "replaced", Route::get("/a")));
        assert_eq!(catalog.list(), vec!["a", "b"]);
        assert_eq!(catalog.get("a").unwrap().description, "replaced");
    }
}
