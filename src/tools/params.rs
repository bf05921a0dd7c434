//! Argument validation and request shaping
//!
//! Turns the caller's arguments into exactly what the backend receives:
//! unknown or ill-typed arguments are rejected, nulls and unset optionals
//! are dropped, defaults are filled in, path placeholders are substituted and
//! GET requests get their parameters as a query string.

use serde_json::{Map, Number, Value};

use crate::backend::{HttpMethod, QueryParams};
use crate::error::{GatewayError, Result};

use super::definition::{ParamKind, ParamSpec, Tool};

/// A tool call ready to send
#[derive(Debug, Clone, PartialEq)]
pub struct ShapedRequest {
    pub method: HttpMethod,
    /// Route with placeholders filled
    pub path: String,
    /// JSON body for POST routes; empty for GET
    pub body: Map<String, Value>,
    /// Query string for GET routes; empty for POST
    pub query: QueryParams,
    /// Every argument that was sent, path parameters included
    pub arguments: Map<String, Value>,
}

/// Validate `args` against `tool` and build the backend request
pub fn shape(tool: &Tool, args: &Map<String, Value>) -> Result<ShapedRequest> {
    if let Some(unknown) = args.keys().find(|k| tool.param(k).is_none()) {
        return Err(invalid(tool, format!("unknown parameter '{}'", unknown)));
    }

    // declaration order, kept for query strings
    let mut values: Vec<(&str, Value)> = Vec::new();
    for spec in &tool.params {
        match args.get(&spec.name).filter(|v| !v.is_null()) {
            Some(value) => {
                check_value(spec, value).map_err(|msg| invalid(tool, msg))?;
                values.push((spec.name.as_str(), normalize(spec, value)));
            }
            None if spec.required => {
                return Err(invalid(tool, format!("missing required parameter '{}'", spec.name)));
            }
            None => {
                if let Some(default) = &spec.default {
                    values.push((spec.name.as_str(), default.clone()));
                }
            }
        }
    }

    let arguments: Map<String, Value> = values.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();

    let mut path = tool.route.path.clone();
    for placeholder in tool.route.placeholders() {
        let index = values
            .iter()
            .position(|(name, _)| *name == placeholder)
            .ok_or_else(|| invalid(tool, format!("no value for path parameter '{}'", placeholder)))?;
        let (_, value) = values.remove(index);
        let segment = match &value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        path = path.replace(&format!("{{{}}}", placeholder), &urlencoding::encode(&segment));
    }

    let (body, query) = match tool.route.method {
        HttpMethod::Post => (values.into_iter().map(|(k, v)| (k.to_string(), v)).collect(), Vec::new()),
        HttpMethod::Get => (Map::new(), to_query(values)),
    };

    Ok(ShapedRequest {
        method: tool.route.method,
        path,
        body,
        query,
        arguments,
    })
}

fn invalid(tool: &Tool, msg: String) -> GatewayError {
    GatewayError::InvalidParams(format!("{}: {}", tool.name, msg))
}

fn check_value(spec: &ParamSpec, value: &Value) -> std::result::Result<(), String> {
    let name = &spec.name;
    match &spec.kind {
        ParamKind::String => {
            value.as_str().ok_or_else(|| format!("'{}' must be a string", name))?;
        }
        ParamKind::Deadline => {
            if !(value.is_string() || value.is_number()) {
                return Err(format!("'{}' must be a date string or Unix timestamp", name));
            }
        }
        ParamKind::Boolean => {
            value.as_bool().ok_or_else(|| format!("'{}' must be a boolean", name))?;
        }
        ParamKind::StringList => {
            let all_strings = value.as_array().is_some_and(|items| items.iter().all(Value::is_string));
            if !all_strings {
                return Err(format!("'{}' must be a list of strings", name));
            }
        }
        ParamKind::Enum { values } => {
            let s = value.as_str().ok_or_else(|| format!("'{}' must be a string", name))?;
            if !values.iter().any(|v| v == s) {
                return Err(format!("'{}' must be one of: {}", name, values.join(", ")));
            }
        }
        ParamKind::Integer { min, max } => {
            let n = as_integer(value).ok_or_else(|| format!("'{}' must be an integer", name))?;
            if min.is_some_and(|m| n < m) || max.is_some_and(|m| n > m) {
                return Err(format!("'{}' out of range: {}", name, bounds(min, max)));
            }
        }
        ParamKind::Number { min, max } => {
            let n = value.as_f64().ok_or_else(|| format!("'{}' must be a number", name))?;
            if min.is_some_and(|m| n < m) || max.is_some_and(|m| n > m) {
                return Err(format!("'{}' out of range: {}", name, bounds(min, max)));
            }
        }
    }
    Ok(())
}

/// Integer value, accepting whole floats such as `10.0`
fn as_integer(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| f as i64)
    })
}

fn normalize(spec: &ParamSpec, value: &Value) -> Value {
    match spec.kind {
        ParamKind::Integer { .. } => as_integer(value)
            .map(|n| Value::Number(Number::from(n)))
            .unwrap_or_else(|| value.clone()),
        _ => value.clone(),
    }
}

fn bounds<T: std::fmt::Display>(min: &Option<T>, max: &Option<T>) -> String {
    match (min, max) {
        (Some(min), Some(max)) => format!("expected {}..={}", min, max),
        (Some(min), None) => format!("expected >= {}", min),
        (None, Some(max)) => format!("expected <= {}", max),
        (None, None) => "unbounded".to_string(),
    }
}

/// Query pairs: `true` booleans as "true", `false` omitted, lists repeated
fn to_query(values: Vec<(&str, Value)>) -> QueryParams {
    let mut query = Vec::new();
    for (name, value) in values {
        match value {
            Value::Bool(true) => query.push((name.to_string(), "true".to_string())),
            Value::Bool(false) | Value::Null => {}
            Value::String(s) => query.push((name.to_string(), s)),
            Value::Array(items) => {
                for item in items {
                    let text = match item {
                        Value::String(s) => s,
                        other => other.to_string(),
                    };
                    query.push((name.to_string(), text));
                }
            }
            other => query.push((name.to_string(), other.to_string())),
        }
    }
    query
}
