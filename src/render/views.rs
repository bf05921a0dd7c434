//! Partial views of backend payloads
//!
//! Every field is optional and decodes on its own: a missing key or a value
//! of the wrong type becomes `None`, and list items that are not objects are
//! skipped, so one malformed field never hides its siblings. Each renderer
//! picks its placeholder from there.

use log::debug;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use serde_with::{DefaultOnError, VecSkipError, serde_as};

/// Decode `value` into a view, falling back to the empty view when it is not an object
pub fn decode<T: DeserializeOwned + Default>(value: &Value) -> T {
    match serde_json::from_value(value.clone()) {
        Ok(view) => view,
        Err(e) => {
            debug!("Payload did not match {}: {}", std::any::type_name::<T>(), e);
            T::default()
        }
    }
}

/// Decode a list item that is either a memory or a `{"memory": {...}}` wrapper
pub fn memory_or_wrapped(item: &Value) -> MemoryView {
    if item.get("content").is_some() {
        decode(item)
    } else if let Some(inner) = item.get("memory") {
        decode(inner)
    } else {
        decode(item)
    }
}

#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MemoryView {
    #[serde_as(as = "DefaultOnError")]
    pub id: Option<String>,
    #[serde_as(as = "DefaultOnError")]
    pub content: Option<String>,
    #[serde_as(as = "DefaultOnError")]
    pub state: Option<String>,
    #[serde_as(as = "DefaultOnError")]
    pub outcome: Option<String>,
    #[serde_as(as = "DefaultOnError")]
    pub source: Option<String>,
    #[serde_as(as = "DefaultOnError<Option<VecSkipError<_>>>")]
    pub derived_from: Option<Vec<String>>,
    /// Unix seconds/milliseconds, or a date string
    pub resolves_by: Option<Value>,
    #[serde_as(as = "DefaultOnError")]
    pub times_tested: Option<u64>,
    #[serde_as(as = "DefaultOnError")]
    pub confirmations: Option<u64>,
    #[serde_as(as = "DefaultOnError<Option<VecSkipError<_>>>")]
    pub violations: Option<Vec<ViolationView>>,
    #[serde_as(as = "DefaultOnError")]
    pub surprise: Option<f64>,
}

impl MemoryView {
    pub fn id(&self) -> &str {
        self.id.as_deref().unwrap_or("?")
    }

    pub fn content(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }

    pub fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    pub fn outcome(&self) -> Option<&str> {
        self.outcome.as_deref()
    }

    pub fn times_tested(&self) -> u64 {
        self.times_tested.unwrap_or(0)
    }

    pub fn confirmations(&self) -> u64 {
        self.confirmations.unwrap_or(0)
    }

    /// Share of tests that confirmed, as a whole percentage
    pub fn confidence_pct(&self) -> Option<i64> {
        let tested = self.times_tested();
        if tested == 0 {
            None
        } else {
            Some((self.confirmations() as f64 / tested as f64 * 100.0).round() as i64)
        }
    }

    pub fn has_source(&self) -> bool {
        self.source.as_deref().is_some_and(|s| !s.is_empty())
    }

    pub fn is_derived(&self) -> bool {
        self.derived_from.as_ref().is_some_and(|d| !d.is_empty())
    }

    pub fn is_time_bound(&self) -> bool {
        match &self.resolves_by {
            None | Some(Value::Null) => false,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
            Some(Value::String(s)) => !s.is_empty(),
            Some(_) => true,
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ViolationView {
    #[serde_as(as = "DefaultOnError")]
    pub condition: Option<String>,
    #[serde_as(as = "DefaultOnError")]
    pub obs_id: Option<String>,
}

#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FindView {
    #[serde_as(as = "DefaultOnError")]
    pub query: Option<String>,
    #[serde_as(as = "DefaultOnError<Option<VecSkipError<_>>>")]
    pub results: Option<Vec<FindHitView>>,
}

#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FindHitView {
    #[serde_as(as = "DefaultOnError")]
    pub memory: Option<MemoryView>,
    #[serde_as(as = "DefaultOnError")]
    pub similarity: Option<f64>,
    #[serde_as(as = "DefaultOnError")]
    pub confidence: Option<f64>,
    #[serde_as(as = "DefaultOnError")]
    pub surprise: Option<f64>,
}

#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConnectionView {
    #[serde_as(as = "DefaultOnError")]
    pub target_id: Option<String>,
}

#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ResolveView {
    #[serde_as(as = "DefaultOnError")]
    pub memory_id: Option<String>,
    #[serde_as(as = "DefaultOnError")]
    pub outcome: Option<String>,
    #[serde_as(as = "DefaultOnError")]
    pub cascade_count: Option<u64>,
    #[serde_as(as = "DefaultOnError")]
    pub cascade_error: Option<String>,
}

/// Paged memory listing (pending, insights)
#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PageView {
    #[serde_as(as = "DefaultOnError")]
    pub view: Option<String>,
    #[serde_as(as = "DefaultOnError<Option<VecSkipError<_>>>")]
    pub memories: Option<Vec<MemoryView>>,
    #[serde_as(as = "DefaultOnError<Option<VecSkipError<_>>>")]
    pub results: Option<Vec<MemoryView>>,
    #[serde_as(as = "DefaultOnError")]
    pub total: Option<u64>,
    #[serde_as(as = "DefaultOnError")]
    pub offset: Option<u64>,
}

impl PageView {
    pub fn items(&self) -> &[MemoryView] {
        self.memories
            .as_deref()
            .or(self.results.as_deref())
            .unwrap_or(&[])
    }

    /// `(first, last, total)`, 1-based
    pub fn window(&self) -> (u64, u64, u64) {
        let count = self.items().len() as u64;
        let offset = self.offset.unwrap_or(0);
        (offset + 1, offset + count, self.total.unwrap_or(count))
    }
}

#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GraphView {
    #[serde_as(as = "DefaultOnError")]
    pub root: Option<String>,
    #[serde_as(as = "DefaultOnError<Option<VecSkipError<_>>>")]
    pub nodes: Option<Vec<NodeView>>,
    #[serde_as(as = "DefaultOnError<Option<VecSkipError<_>>>")]
    pub edges: Option<Vec<EdgeView>>,
}

#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NodeView {
    #[serde_as(as = "DefaultOnError")]
    pub id: Option<String>,
    #[serde_as(as = "DefaultOnError")]
    pub content: Option<String>,
}

#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EdgeView {
    #[serde_as(as = "DefaultOnError")]
    pub source_id: Option<String>,
    #[serde_as(as = "DefaultOnError")]
    pub target_id: Option<String>,
    #[serde_as(as = "DefaultOnError")]
    pub edge_type: Option<String>,
}

#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RootsView {
    #[serde_as(as = "DefaultOnError<Option<VecSkipError<_>>>")]
    pub roots: Option<Vec<MemoryView>>,
    #[serde_as(as = "DefaultOnError<Option<VecSkipError<_>>>")]
    pub results: Option<Vec<MemoryView>>,
}

#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ZoneView {
    #[serde_as(as = "DefaultOnError<Option<VecSkipError<_>>>")]
    pub memories: Option<Vec<MemoryView>>,
    #[serde_as(as = "DefaultOnError")]
    pub edges: Option<Vec<Value>>,
    #[serde_as(as = "DefaultOnError")]
    pub stats: Option<ZoneStatsView>,
}

#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ZoneStatsView {
    #[serde_as(as = "DefaultOnError")]
    pub total_memories: Option<u64>,
    #[serde_as(as = "DefaultOnError")]
    pub total_edges: Option<u64>,
}

/// Listing whose items may be bare memories or wrappers (between, surprising)
#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MixedListView {
    #[serde_as(as = "DefaultOnError")]
    pub bridges: Option<Vec<Value>>,
    #[serde_as(as = "DefaultOnError")]
    pub results: Option<Vec<Value>>,
    #[serde_as(as = "DefaultOnError")]
    pub memories: Option<Vec<Value>>,
}

#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SessionRecapView {
    #[serde_as(as = "DefaultOnError")]
    pub summary: Option<String>,
    #[serde_as(as = "DefaultOnError<Option<VecSkipError<_>>>")]
    pub memory_ids: Option<Vec<String>>,
    #[serde_as(as = "DefaultOnError")]
    pub total: Option<u64>,
}

/// Reply to observe, update and commit
#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WriteView {
    #[serde_as(as = "DefaultOnError")]
    pub id: Option<String>,
    #[serde_as(as = "DefaultOnError")]
    pub memory_id: Option<String>,
    #[serde_as(as = "DefaultOnError")]
    pub status: Option<String>,
    #[serde_as(as = "DefaultOnError")]
    pub state: Option<String>,
    #[serde_as(as = "DefaultOnError")]
    pub warnings: Option<WarningsView>,
}

impl WriteView {
    pub fn is_draft(&self) -> bool {
        self.status.as_deref() == Some("draft")
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref().or(self.memory_id.as_deref())
    }
}

#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WarningsView {
    #[serde_as(as = "DefaultOnError<Option<VecSkipError<_>>>")]
    pub missing_fields: Option<Vec<String>>,
    #[serde_as(as = "DefaultOnError")]
    pub reasoning: Option<String>,
    #[serde_as(as = "DefaultOnError")]
    pub suggested_action: Option<String>,
}

#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AdminView {
    #[serde_as(as = "DefaultOnError")]
    pub success: Option<bool>,
    #[serde_as(as = "DefaultOnError")]
    pub retracted: Option<u64>,
    #[serde_as(as = "DefaultOnError")]
    pub cascade_retracted: Option<u64>,
    #[serde_as(as = "DefaultOnError")]
    pub reason: Option<String>,
    pub pending_count: Option<Value>,
    pub event_types: Option<Value>,
    #[serde_as(as = "DefaultOnError")]
    pub purged: Option<u64>,
    #[serde_as(as = "DefaultOnError")]
    pub dry_run: Option<bool>,
    #[serde_as(as = "DefaultOnError")]
    pub memory_id: Option<String>,
    #[serde_as(as = "DefaultOnError")]
    pub previous_state: Option<String>,
    #[serde_as(as = "DefaultOnError")]
    pub new_state: Option<String>,
    #[serde_as(as = "DefaultOnError")]
    pub state: Option<String>,
    #[serde_as(as = "DefaultOnError")]
    pub cleaned: Option<u64>,
    #[serde_as(as = "DefaultOnError")]
    pub would_retract: Option<Vec<Value>>,
}

/// Items are kept raw; anything but a string `content` is shown as JSON text
#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NotificationsView {
    #[serde_as(as = "DefaultOnError")]
    pub notifications: Option<Vec<Value>>,
}
