//! Declarative REST tool bindings.
//!
//! A [`ToolsConfig`] describes an API once (base URL, shared headers) and a set of tools, each an
//! HTTP call template with an input schema. [`ToolRegistry`] validates the configuration up front
//! and turns `(tool name, JSON arguments)` into a validated, executed HTTP request.
//!
//! The crate has no server surface of its own: hosts wire [`ToolRegistry::list_tools`] and
//! [`ToolRegistry::call_tool`] into whatever protocol they speak.

pub mod builder;
pub mod config;
pub mod context;
pub mod error;
pub mod expression;
pub mod redact;
pub mod registry;
pub mod response;
pub mod schema;
pub mod semantics;
pub mod transport;

pub use config::{ToolDefinition, ToolsConfig};
pub use context::{CallContext, EnvSnapshot};
pub use error::{CallError, ConfigError, ErrorKind, TransportError};
pub use registry::{CallResult, ToolOutput, ToolRegistry};
pub use transport::{HttpTransport, ReqwestTransport, TransportRequest, TransportResponse};
