//! Tool definitions and contract classification
//!
//! A tool is pure data: its parameters, what it promises about side effects,
//! which backend route it maps to and which renderer formats the reply.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::backend::HttpMethod;
use crate::render::RenderKind;

/// Which tool set a server instance exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Surface {
    /// Agent-facing memory tools
    #[default]
    User,
    /// Operator tools under `/admin`
    Admin,
    /// Both sets
    All,
}

impl std::str::FromStr for Surface {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            "all" | "both" => Ok(Self::All),
            other => Err(format!("Unknown surface '{}' (expected user, admin or all)", other)),
        }
    }
}

impl Surface {
    /// Whether a tool declared for `surface` is exposed on this one
    pub fn exposes(&self, surface: Surface) -> bool {
        *self == Self::All || *self == surface
    }
}

impl std::fmt::Display for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Admin => write!(f, "admin"),
            Self::All => write!(f, "all"),
        }
    }
}

/// Side-effect promises a tool makes to the agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolContract {
    pub read_only: bool,
    pub destructive: bool,
    pub idempotent: bool,
}

impl ToolContract {
    pub const fn read_only() -> Self {
        Self {
            read_only: true,
            destructive: false,
            idempotent: true,
        }
    }

    pub const fn mutating() -> Self {
        Self {
            read_only: false,
            destructive: false,
            idempotent: false,
        }
    }

    pub const fn mutating_idempotent() -> Self {
        Self {
            read_only: false,
            destructive: false,
            idempotent: true,
        }
    }

    /// Deletes or retracts data; must carry `dry_run` defaulting to true.
    /// Repeating the same request has no further effect.
    pub const fn destructive() -> Self {
        Self {
            read_only: false,
            destructive: true,
            idempotent: true,
        }
    }

    /// Short label for listings
    pub fn label(&self) -> &'static str {
        match (self.read_only, self.destructive, self.idempotent) {
            (true, _, _) => "read-only",
            (false, true, _) => "destructive",
            (false, false, true) => "idempotent",
            (false, false, false) => "mutating",
        }
    }

    /// MCP tool annotations
    pub fn annotations(&self) -> Value {
        json!({
            "readOnlyHint": self.read_only,
            "destructiveHint": self.destructive,
            "idempotentHint": self.idempotent,
        })
    }
}

/// Accepted shape of one parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParamKind {
    String,
    /// Date string or Unix timestamp
    Deadline,
    Integer { min: Option<i64>, max: Option<i64> },
    Number { min: Option<f64>, max: Option<f64> },
    Boolean,
    StringList,
    Enum { values: Vec<String> },
}

impl ParamKind {
    pub fn int(min: i64, max: i64) -> Self {
        Self::Integer {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn int_at_least(min: i64) -> Self {
        Self::Integer { min: Some(min), max: None }
    }

    pub fn number(min: f64, max: f64) -> Self {
        Self::Number {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn number_at_least(min: f64) -> Self {
        Self::Number { min: Some(min), max: None }
    }

    pub fn one_of(values: &[&str]) -> Self {
        Self::Enum {
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    /// JSON schema fragment for this kind
    fn schema(&self) -> Map<String, Value> {
        let mut schema = Map::new();
        match self {
            Self::String => {
                schema.insert("type".into(), json!("string"));
            }
            Self::Deadline => {
                schema.insert("type".into(), json!(["string", "number"]));
            }
            Self::Integer { min, max } => {
                schema.insert("type".into(), json!("integer"));
                if let Some(min) = min {
                    schema.insert("minimum".into(), json!(min));
                }
                if let Some(max) = max {
                    schema.insert("maximum".into(), json!(max));
                }
            }
            Self::Number { min, max } => {
                schema.insert("type".into(), json!("number"));
                if let Some(min) = min {
                    schema.insert("minimum".into(), json!(min));
                }
                if let Some(max) = max {
                    schema.insert("maximum".into(), json!(max));
                }
            }
            Self::Boolean => {
                schema.insert("type".into(), json!("boolean"));
            }
            Self::StringList => {
                schema.insert("type".into(), json!("array"));
                schema.insert("items".into(), json!({"type": "string"}));
            }
            Self::Enum { values } => {
                schema.insert("type".into(), json!("string"));
                schema.insert("enum".into(), json!(values));
            }
        }
        schema
    }
}

/// One declared parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub description: String,
    pub kind: ParamKind,
    pub required: bool,
    #[serde(default)]
    pub default: Option<Value>,
}

impl ParamSpec {
    pub fn required(name: impl Into<String>, kind: ParamKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind,
            required: true,
            default: None,
        }
    }

    pub fn optional(name: impl Into<String>, kind: ParamKind, description: impl Into<String>) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind, description)
        }
    }

    /// Value sent when the caller omits the parameter
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    fn schema(&self) -> Value {
        let mut schema = self.kind.schema();
        schema.insert("description".into(), json!(self.description));
        if let Some(default) = &self.default {
            schema.insert("default".into(), default.clone());
        }
        Value::Object(schema)
    }
}

/// Backend endpoint a tool maps to. `{name}` segments are filled from parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub method: HttpMethod,
    pub path: String,
}

impl Route {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.into(),
        }
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Post,
            path: path.into(),
        }
    }

    /// Placeholder names in path order
    pub fn placeholders(&self) -> Vec<&str> {
        self.path
            .split('/')
            .filter_map(|seg| seg.strip_prefix('{').and_then(|s| s.strip_suffix('}')))
            .collect()
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// A tool definition with its contract and routing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    /// Tool name (e.g., "observe", "bulk_retract")
    pub name: String,
    /// Human-readable description for the agent
    pub description: String,
    pub surface: Surface,
    pub contract: ToolContract,
    pub route: Route,
    pub params: Vec<ParamSpec>,
    pub render: RenderKind,
}

impl Tool {
    /// Create a read-only user tool that renders as JSON
    pub fn new(name: impl Into<String>, description: impl Into<String>, route: Route) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            surface: Surface::User,
            contract: ToolContract::read_only(),
            route,
            params: Vec::new(),
            render: RenderKind::Json,
        }
    }

    pub fn with_surface(mut self, surface: Surface) -> Self {
        self.surface = surface;
        self
    }

    pub fn with_contract(mut self, contract: ToolContract) -> Self {
        self.contract = contract;
        self
    }

    pub fn with_render(mut self, render: RenderKind) -> Self {
        self.render = render;
        self
    }

    /// Append a parameter
    pub fn with_param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    /// Look up a declared parameter
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// JSON schema for the tool's arguments
    pub fn input_schema(&self) -> Value {
        let properties: Map<String, Value> = self.params.iter().map(|p| (p.name.clone(), p.schema())).collect();
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }

    /// Entry for an MCP `tools/list` reply
    pub fn to_mcp_descriptor(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema(),
            "annotations": self.contract.annotations(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_parse() {
        assert_eq!("user".parse::<Surface>(), Ok(Surface::User));
        assert_eq!("ADMIN".parse::<Surface>(), Ok(Surface::Admin));
        assert_eq!("all".parse::<Surface>(), Ok(Surface::All));
        assert_eq!(" both ".parse::<Surface>(), Ok(Surface::All));
        assert!("root".parse::<Surface>().unwrap_err().contains("root"));
    }

    #[test]
    fn test_surface_exposes() {
        assert!(Surface::User.exposes(Surface::User));
        assert!(!Surface::User.exposes(Surface::Admin));
        assert!(Surface::All.exposes(Surface::Admin));
        assert!(Surface::All.exposes(Surface::User));
    }

    #[test]
    fn test_surface_serialization() {
        assert_eq!(serde_json::to_string(&Surface::Admin).unwrap(), "\"admin\"");
        let surface: Surface = serde_json::from_str("\"all\"").unwrap();
        assert_eq!(surface, Surface::All);
        assert_eq!(Surface::default(), Surface::User);
    }

    #[test]
    fn test_contract_labels() {
        assert_eq!(ToolContract::read_only().label(), "read-only");
        assert_eq!(ToolContract::mutating().label(), "mutating");
        assert_eq!(ToolContract::mutating_idempotent().label(), "idempotent");
        assert_eq!(ToolContract::destructive().label(), "destructive");
    }

    #[test]
    fn test_contract_annotations() {
        let hints = ToolContract::destructive().annotations();
        assert_eq!(hints["readOnlyHint"], false);
        assert_eq!(hints["destructiveHint"], true);
        assert_eq!(hints["idempotentHint"], true);
    }

    #[test]
    fn test_route_placeholders() {
        assert_eq!(Route::get("/recall/{memory_id}").placeholders(), vec!["memory_id"]);
        assert!(Route::post("/find").placeholders().is_empty());
        assert_eq!(Route::get("/insights/{view}").to_string(), "GET /insights/{view}");
    }

    #[test]
    fn test_input_schema() {
        let tool = Tool::new("pending", "List pending", Route::get("/pending"))
            .with_param(ParamSpec::optional("overdue", ParamKind::Boolean, "Only overdue").with_default(json!(false)))
            .with_param(ParamSpec::optional("limit", ParamKind::int(1, 100), "Max results").with_default(json!(20)))
            .with_param(ParamSpec::required("view", ParamKind::one_of(&["a", "b"]), "View"));

        let schema = tool.input_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["view"]));
        assert_eq!(schema["properties"]["overdue"]["type"], "boolean");
        assert_eq!(schema["properties"]["overdue"]["default"], false);
        assert_eq!(schema["properties"]["limit"]["minimum"], 1);
        assert_eq!(schema["properties"]["limit"]["maximum"], 100);
        assert_eq!(schema["properties"]["view"]["enum"], json!(["a", "b"]));
        assert_eq!(schema["additionalProperties"], false);
    }

    #[test]
    fn test_param_lookup() {
        let tool = Tool::new("t", "d", Route::post("/t"))
            .with_param(ParamSpec::required("content", ParamKind::String, "Text"));
        assert!(tool.param("content").unwrap().required);
        assert!(tool.param("missing").is_none());
    }

    #[test]
    fn test_mcp_descriptor() {
        let tool = Tool::new("stats", "Memory statistics", Route::get("/stats"));
        let descriptor = tool.to_mcp_descriptor();
        assert_eq!(descriptor["name"], "stats");
        assert_eq!(descriptor["annotations"]["readOnlyHint"], true);
        assert!(descriptor["inputSchema"]["properties"].as_object().unwrap().is_empty());
    }
}
