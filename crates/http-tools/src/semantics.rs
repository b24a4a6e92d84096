//! HTTP semantics helpers.
//!
//! Tool descriptors carry MCP `ToolAnnotations` derived from RFC 9110 method semantics, so a
//! client can tell read-only tools from destructive ones without running them.

use reqwest::Method;
use rmcp::model::ToolAnnotations;

/// The methods a tool may be configured with.
pub const SUPPORTED_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
];

/// Parse a configured method name (case-insensitive), restricted to [`SUPPORTED_METHODS`].
#[must_use]
pub fn parse_method(raw: &str) -> Option<Method> {
    let method: Method = raw.trim().to_ascii_uppercase().parse().ok()?;
    SUPPORTED_METHODS.contains(&method).then_some(method)
}

/// `(read_only, destructive, idempotent)` hints for a method.
fn hints(method: &Method) -> (Option<bool>, Option<bool>, Option<bool>) {
    if method == Method::GET {
        (Some(true), Some(false), Some(true))
    } else if method == Method::POST {
        (Some(false), Some(false), Some(false))
    } else if method == Method::PUT || method == Method::DELETE {
        (Some(false), Some(true), Some(true))
    } else if method == Method::PATCH {
        // PATCH may or may not be idempotent; do not guess.
        (Some(false), Some(true), None)
    } else {
        (None, None, None)
    }
}

/// Generate MCP tool annotations for an HTTP-backed tool.
///
/// `openWorldHint` is always `true`: every tool talks to an external API.
#[must_use]
pub fn annotations_for_method(method: &Method) -> ToolAnnotations {
    let (read_only_hint, destructive_hint, idempotent_hint) = hints(method);
    ToolAnnotations {
        title: None,
        read_only_hint,
        destructive_hint,
        idempotent_hint,
        open_world_hint: Some(true),
    }
}
