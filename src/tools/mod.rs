//! Tool System - definitions, built-in catalog, argument shaping and invocation

mod catalog;
mod definition;
mod gateway;
mod params;

pub use catalog::ToolCatalog;
pub use definition::{ParamKind, ParamSpec, Route, Surface, Tool, ToolContract};
pub use gateway::ToolGateway;
pub use params::{ShapedRequest, shape};
