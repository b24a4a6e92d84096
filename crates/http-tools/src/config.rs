//! Declarative configuration for REST-backed tools.
//!
//! String values in `pathParams`, `queryParams`, `headers` and `bodyTemplate` may contain
//! binding expressions (see [`crate::expression`]).

use crate::error::ConfigError;
use crate::schema::InputSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Transport timeout applied when `timeoutMs` is not configured.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Top-level configuration: one API, many tools.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsConfig {
    /// Base URL every tool path is appended to.
    pub base_url: String,

    /// Headers sent with every request. Tool-level headers win on conflict.
    #[serde(default)]
    pub headers: Map<String, Value>,

    /// Per-request timeout in milliseconds. `0` disables the timeout.
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Maximum response body size (bytes). Unlimited when unset.
    #[serde(default)]
    pub max_response_bytes: Option<usize>,

    #[serde(default)]
    pub tools: Vec<ToolDefinition>,
}

/// One callable tool: an HTTP call template plus the schema its arguments must satisfy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Unique lowercase snake_case identifier.
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// One of GET, POST, PUT, PATCH, DELETE (case-insensitive).
    pub method: String,

    /// Path template; every `{name}` token needs a `pathParams` entry.
    pub path: String,

    #[serde(default)]
    pub path_params: Map<String, Value>,

    #[serde(default)]
    pub query_params: Map<String, Value>,

    #[serde(default)]
    pub headers: Map<String, Value>,

    /// Request body for POST/PUT/PATCH; ignored for GET/DELETE.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_template: Option<Value>,

    /// Dot path (e.g. `data.items`) projected out of a successful response body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_transform: Option<String>,

    pub input_schema: InputSchema,
}

impl ToolsConfig {
    /// Parse a configuration document. JSON is tried first, then YAML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the document does not fit this data model. A
    /// syntactically valid JSON document always reports the JSON error.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        // Syntactically valid JSON never falls through to YAML: serde_yaml would coerce
        // mistyped scalars (`"baseUrl": 1`) instead of rejecting them.
        let json_err = match serde_json::from_str::<Value>(content) {
            Ok(_) => return Ok(serde_json::from_str(content)?),
            Err(e) => e,
        };
        serde_yaml::from_str(content).map_err(|yaml_err| {
            if looks_like_json(content) {
                ConfigError::from(json_err)
            } else {
                ConfigError::Parse(yaml_err.to_string())
            }
        })
    }

    /// Effective per-request timeout in milliseconds (`None` = no timeout).
    #[must_use]
    pub fn effective_timeout_ms(&self) -> Option<u64> {
        match self.timeout_ms {
            Some(0) => None,
            Some(ms) => Some(ms),
            None => Some(DEFAULT_TIMEOUT_MS),
        }
    }
}

fn looks_like_json(content: &str) -> bool {
    content.trim_start().starts_with('{')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_json_config() {
        let cfg = ToolsConfig::parse(
            r#"{
                "baseUrl": "https://api.example.com",
                "headers": {"Authorization": "Bearer {env.API_TOKEN}"},
                "tools": [{
                    "name": "get_user",
                    "description": "Fetch a user",
                    "method": "GET",
                    "path": "/users/{id}",
                    "pathParams": {"id": "{args.id}"},
                    "inputSchema": {
                        "type": "object",
                        "properties": {"id": {"type": "string"}},
                        "required": ["id"]
                    }
                }]
            }"#,
        )
        .expect("valid config");

        assert_eq!(cfg.tools.len(), 1);
        assert_eq!(cfg.tools[0].path_params.len(), 1);
        assert!(cfg.tools[0].body_template.is_none());
        assert_eq!(cfg.effective_timeout_ms(), Some(DEFAULT_TIMEOUT_MS));
    }

    #[test]
    fn parses_yaml_config() {
        let cfg = ToolsConfig::parse(
            r"
baseUrl: https://api.example.com
timeoutMs: 0
tools:
  - name: create_item
    method: post
    path: /items
    bodyTemplate:
      name: '{args.name}'
      tags: ['{args.tag?}']
    inputSchema:
      type: object
      properties:
        name: { type: string, minLength: 1 }
",
        )
        .expect("valid yaml config");

        assert_eq!(cfg.tools[0].method, "post");
        assert_eq!(cfg.effective_timeout_ms(), None);
        assert!(cfg.tools[0].body_template.is_some());
    }

    #[test]
    fn reports_json_error_for_json_documents() {
        let err = ToolsConfig::parse(r#"{"baseUrl": "x", "tools": [{"name": 1}]}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn mistyped_json_is_not_coerced_through_yaml() {
        let err = ToolsConfig::parse(r#"{"baseUrl": 1, "timeoutMs": 500}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(ref m) if m.contains("invalid type")), "{err}");

        let err = ToolsConfig::parse(r#"{"baseUrl": "https://x", "timeoutMs": "500"}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
