//! Error types for `restbind-http-tools`.
//!
//! Errors are split by phase: [`ConfigError`] is raised while loading a configuration,
//! [`CallError`] while serving a single tool call. Every variant keeps the structured context
//! (tool, field, token, status) a caller needs to render an actionable message.

use crate::redact::sanitize_reqwest_error;
use crate::schema::Violation;
use serde_json::Value;
use thiserror::Error;

/// Load-time configuration errors. The whole configuration is rejected.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration document could not be parsed.
    #[error("Configuration error: failed to parse configuration: {0}")]
    Parse(String),

    #[error("Configuration error: invalid baseUrl '{url}': {message}")]
    InvalidBaseUrl { url: String, message: String },

    #[error(
        "Configuration error: invalid tool name '{name}' (expected lowercase snake_case, e.g. 'get_user')"
    )]
    InvalidToolName { name: String },

    #[error("Configuration error: duplicate tool name '{name}'")]
    DuplicateTool { name: String },

    #[error("Configuration error: invalid HTTP method '{method}' in tool '{tool}'")]
    InvalidMethod { tool: String, method: String },

    /// A `{placeholder}` in the path template has no `pathParams` binding.
    #[error(
        "Configuration error: path placeholder '{{{placeholder}}}' in tool '{tool}' has no pathParams entry"
    )]
    MissingPathParam { tool: String, placeholder: String },

    #[error("Configuration error: invalid inputSchema for tool '{tool}': {message}")]
    InvalidSchema { tool: String, message: String },

    #[error("Configuration error: invalid responseTransform '{path}' in tool '{tool}': {message}")]
    InvalidResponseTransform {
        tool: String,
        path: String,
        message: String,
    },

    #[error("Configuration error: failed to build HTTP transport: {0}")]
    Transport(String),
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value.to_string())
    }
}

/// Transport-level failures. Messages never contain URL credentials or query strings.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("response too large: {0}")]
    BodyTooLarge(String),
    #[error("http transport error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(value: reqwest::Error) -> Self {
        let msg = sanitize_reqwest_error(&value);
        if value.is_timeout() {
            Self::Timeout(msg)
        } else if value.is_connect() {
            Self::Connect(msg)
        } else {
            Self::Other(msg)
        }
    }
}

/// Coarse classification of a [`CallError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The call could not be matched against the loaded configuration (unknown tool).
    Configuration,
    /// The arguments do not satisfy the tool's input schema.
    Validation,
    /// The request could not be assembled from the arguments (unresolved path placeholder).
    Binding,
    /// The request was sent but failed (network error, timeout, non-2xx status).
    Transport,
}

/// Per-call errors. Every variant except [`CallError::Http`] and [`CallError::Transport`]
/// aborts the call before any network I/O.
#[derive(Debug, Error)]
pub enum CallError {
    #[error("Tool not found: {name}")]
    UnknownTool { name: String },

    #[error("Invalid arguments for tool '{tool}': {message}")]
    InvalidArguments { tool: String, message: String },

    #[error("Missing required argument(s) for tool '{tool}': {}", .missing.join(", "))]
    MissingArguments { tool: String, missing: Vec<String> },

    #[error("Invalid arguments for tool '{tool}': {}", join_violations(.violations))]
    Validation {
        tool: String,
        violations: Vec<Violation>,
    },

    #[error("Unresolved path parameter {token} in '{path}' (tool '{tool}')")]
    UnresolvedPathParam {
        tool: String,
        token: String,
        path: String,
    },

    #[error("Invalid request URL for tool '{tool}': {message}")]
    InvalidUrl { tool: String, message: String },

    /// The API answered with a non-2xx status.
    #[error("API returned {status} {reason}")]
    Http {
        status: u16,
        reason: String,
        body: Option<Value>,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl CallError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownTool { .. } => ErrorKind::Configuration,
            Self::InvalidArguments { .. }
            | Self::MissingArguments { .. }
            | Self::Validation { .. } => ErrorKind::Validation,
            Self::UnresolvedPathParam { .. } | Self::InvalidUrl { .. } => ErrorKind::Binding,
            Self::Http { .. } | Self::Transport(_) => ErrorKind::Transport,
        }
    }

    /// HTTP status code, when the API answered.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Raw error body returned by the API, when available.
    #[must_use]
    pub fn error_body(&self) -> Option<&Value> {
        match self {
            Self::Http { body, .. } => body.as_ref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_separate_lookup_from_validation() {
        let unknown = CallError::UnknownTool {
            name: "nope".to_string(),
        };
        let invalid = CallError::MissingArguments {
            tool: "get_user".to_string(),
            missing: vec!["id".to_string(), "org".to_string()],
        };
        assert_eq!(unknown.kind(), ErrorKind::Configuration);
        assert_eq!(invalid.kind(), ErrorKind::Validation);
        assert!(invalid.to_string().contains("id, org"));
    }

    #[test]
    fn http_error_exposes_status_and_body() {
        let err = CallError::Http {
            status: 404,
            reason: "Not Found".to_string(),
            body: Some(serde_json::json!({"error": "missing"})),
        };
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(err.status(), Some(404));
        assert_eq!(
            err.error_body().and_then(|b| b.get("error")),
            Some(&serde_json::json!("missing"))
        );
        assert_eq!(err.to_string(), "API returned 404 Not Found");
    }
}
