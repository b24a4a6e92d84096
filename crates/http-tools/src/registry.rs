//! Tool registry: load-time validation of a [`ToolsConfig`] and per-call orchestration.
//!
//! A call runs `lookup -> required args -> schema validation -> build -> execute -> project`
//! and stops at the first failing step. Only `execute` performs I/O.

use crate::builder::{RequestDescriptor, build_request, placeholders};
use crate::config::{ToolDefinition, ToolsConfig};
use crate::context::{CallContext, EnvSnapshot};
use crate::error::{CallError, ConfigError};
use crate::redact::{mask_headers, redact_url};
use crate::response::{Diagnostic, ResponsePath, decode_body, filter_headers};
use crate::schema::{self, InputSchema, ObjectSchema};
use crate::semantics::{annotations_for_method, parse_method};
use crate::transport::{HttpTransport, ReqwestTransport, TransportRequest};
use reqwest::{Method, StatusCode};
use rmcp::model::{CallToolResult, Content, JsonObject, Tool};
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

/// Successful call result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolOutput {
    pub status: u16,
    /// Filtered response headers (see [`filter_headers`]).
    pub headers: BTreeMap<String, String>,
    pub body: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// Outcome of [`ToolRegistry::call_tool`].
pub type CallResult = std::result::Result<ToolOutput, CallError>;

#[derive(Debug)]
struct RegisteredTool {
    definition: ToolDefinition,
    method: Method,
    schema: ObjectSchema,
    response_path: Option<ResponsePath>,
    descriptor: Tool,
}

/// Immutable set of tools built from one configuration.
///
/// Cheap to clone and safe to share across tasks. To reload, build a new registry and swap it in.
#[derive(Clone)]
pub struct ToolRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    base_url: Url,
    base_headers: Map<String, Value>,
    timeout: Option<Duration>,
    tools: Vec<RegisteredTool>,
    by_name: HashMap<String, usize>,
    env: EnvSnapshot,
    transport: Arc<dyn HttpTransport>,
}

impl ToolRegistry {
    /// Validate and index a configuration, sending requests through `transport`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid: bad base URL, bad tool name, duplicate
    /// tool names, unsupported method, non-object input schema, a path placeholder without a
    /// `pathParams` entry, or a malformed `responseTransform`.
    pub fn load(
        config: ToolsConfig,
        env: EnvSnapshot,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, ConfigError> {
        let base_url = parse_base_url(&config.base_url)?;
        let timeout = config.effective_timeout_ms().map(Duration::from_millis);

        let mut tools = Vec::with_capacity(config.tools.len());
        let mut by_name: HashMap<String, usize> = HashMap::new();

        for definition in config.tools {
            if by_name.contains_key(&definition.name) {
                return Err(ConfigError::DuplicateTool {
                    name: definition.name,
                });
            }
            let tool = register_tool(definition)?;
            by_name.insert(tool.definition.name.clone(), tools.len());
            tools.push(tool);
        }

        info!(
            base_url = %base_url,
            tools = tools.len(),
            "loaded tool configuration"
        );

        Ok(Self {
            inner: Arc::new(RegistryInner {
                base_url,
                base_headers: config.headers,
                timeout,
                tools,
                by_name,
                env,
                transport,
            }),
        })
    }

    /// [`ToolRegistry::load`] with a [`ReqwestTransport`] honoring `maxResponseBytes`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client cannot be built.
    pub fn with_reqwest(config: ToolsConfig, env: EnvSnapshot) -> Result<Self, ConfigError> {
        let transport = ReqwestTransport::new(config.max_response_bytes)
            .map_err(|e| ConfigError::Transport(e.to_string()))?;
        Self::load(config, env, Arc::new(transport))
    }

    /// Externally-facing tool descriptors, in configuration order.
    #[must_use]
    pub fn list_tools(&self) -> Vec<Tool> {
        self.inner
            .tools
            .iter()
            .map(|t| t.descriptor.clone())
            .collect()
    }

    /// Validate, build and execute a call.
    ///
    /// `arguments` must be a JSON object (or `null`, treated as empty).
    ///
    /// # Errors
    ///
    /// Returns a [`CallError`]; see [`CallError::kind`] for the failure class.
    pub async fn call_tool(&self, tool_name: &str, arguments: Value) -> CallResult {
        let tool = self.lookup(tool_name)?;
        let name = tool.definition.name.as_str();

        let args = match arguments {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(CallError::InvalidArguments {
                    tool: name.to_string(),
                    message: format!("arguments must be an object, got {other}"),
                });
            }
        };

        let missing = schema::missing_required(&tool.schema, &args);
        if !missing.is_empty() {
            warn!(tool = %name, missing = ?missing, "validation failed: missing required arguments");
            return Err(CallError::MissingArguments {
                tool: name.to_string(),
                missing,
            });
        }

        let violations = schema::validate_arguments(&tool.schema, &args);
        if !violations.is_empty() {
            warn!(tool = %name, violations = violations.len(), "validation failed");
            return Err(CallError::Validation {
                tool: name.to_string(),
                violations,
            });
        }

        let ctx = CallContext::new(args, self.inner.env.clone());
        let request = build_request(
            &tool.definition,
            &tool.method,
            &self.inner.base_headers,
            &ctx,
        )?;

        self.execute(tool, request).await
    }

    fn lookup(&self, tool_name: &str) -> Result<&RegisteredTool, CallError> {
        self.inner
            .by_name
            .get(tool_name)
            .map(|&i| &self.inner.tools[i])
            .ok_or_else(|| CallError::UnknownTool {
                name: tool_name.to_string(),
            })
    }

    async fn execute(&self, tool: &RegisteredTool, request: RequestDescriptor) -> CallResult {
        let name = tool.definition.name.as_str();
        let url = join_url(&self.inner.base_url, &request.path).map_err(|message| {
            CallError::InvalidUrl {
                tool: name.to_string(),
                message,
            }
        })?;

        debug!(
            tool = %name,
            method = %request.method,
            url = %redact_url(&url),
            headers = ?mask_headers(&request.headers),
            query_params = request.query.len(),
            has_body = request.body.is_some(),
            "request started"
        );

        let started = Instant::now();
        let response = self
            .inner
            .transport
            .send(TransportRequest {
                method: request.method,
                url,
                headers: request.headers,
                query: request.query,
                body: request.body,
                timeout: self.inner.timeout,
            })
            .await;
        let elapsed_ms = started.elapsed().as_millis();

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                warn!(tool = %name, error = %e, elapsed_ms, "request failed");
                return Err(CallError::Transport(e));
            }
        };

        let body = decode_body(&response.body, response.header("content-type"));
        let status = StatusCode::from_u16(response.status).ok();

        if !status.is_some_and(|s| s.is_success()) {
            warn!(tool = %name, status = response.status, elapsed_ms, "request failed");
            let reason = status
                .and_then(|s| s.canonical_reason())
                .unwrap_or("Unknown")
                .to_string();
            let body = match body {
                Value::String(s) if s.is_empty() => None,
                other => Some(other),
            };
            return Err(CallError::Http {
                status: response.status,
                reason,
                body,
            });
        }

        info!(tool = %name, status = response.status, elapsed_ms, "request succeeded");

        let mut diagnostics = Vec::new();
        let body = match &tool.response_path {
            Some(path) => {
                let (projected, diagnostic) = path.project(body);
                if let Some(d) = diagnostic {
                    warn!(tool = %name, diagnostic = %d, "response transform path not found");
                    diagnostics.push(d);
                }
                projected
            }
            None => body,
        };

        Ok(ToolOutput {
            status: response.status,
            headers: filter_headers(&response.headers),
            body,
            diagnostics,
        })
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("base_url", &self.inner.base_url.as_str())
            .field("tools", &self.inner.by_name.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidBaseUrl {
        url: raw.to_string(),
        message: e.to_string(),
    })?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidBaseUrl {
            url: raw.to_string(),
            message: format!("unsupported scheme '{}'", url.scheme()),
        });
    }
    // Tool paths are appended to the base path; a query or fragment would swallow them.
    if url.query().is_some() || url.fragment().is_some() {
        return Err(ConfigError::InvalidBaseUrl {
            url: redact_url(&url),
            message: "must not contain a query string or fragment (use queryParams)".to_string(),
        });
    }
    Ok(url)
}

fn join_url(base: &Url, path: &str) -> Result<Url, String> {
    let joined = format!("{}{}", base.as_str().trim_end_matches('/'), path);
    Url::parse(&joined).map_err(|e| e.to_string())
}

fn register_tool(definition: ToolDefinition) -> Result<RegisteredTool, ConfigError> {
    let name = definition.name.clone();
    if !is_valid_tool_name(&name) {
        return Err(ConfigError::InvalidToolName { name });
    }

    let method = parse_method(&definition.method).ok_or_else(|| ConfigError::InvalidMethod {
        tool: name.clone(),
        method: definition.method.clone(),
    })?;

    for token in placeholders(&definition.path) {
        let placeholder = &token[1..token.len() - 1];
        if !definition.path_params.contains_key(placeholder) {
            return Err(ConfigError::MissingPathParam {
                tool: name,
                placeholder: placeholder.to_string(),
            });
        }
    }

    let Some(schema) = definition.input_schema.as_object().cloned() else {
        return Err(ConfigError::InvalidSchema {
            tool: name,
            message: format!(
                "top-level type must be 'object', got '{}'",
                definition.input_schema.type_name()
            ),
        });
    };

    for undeclared in schema.undeclared_required() {
        warn!(
            tool = %name,
            property = %undeclared,
            "required property is not declared in inputSchema.properties"
        );
    }

    let response_path = definition
        .response_transform
        .as_deref()
        .map(|raw| {
            ResponsePath::parse(raw).map_err(|message| ConfigError::InvalidResponseTransform {
                tool: name.clone(),
                path: raw.to_string(),
                message,
            })
        })
        .transpose()?;

    let descriptor = build_descriptor(&definition, &method, &schema)?;

    Ok(RegisteredTool {
        definition,
        method,
        schema,
        response_path,
        descriptor,
    })
}

fn is_valid_tool_name(name: &str) -> bool {
    let mut bytes = name.bytes();
    bytes.next().is_some_and(|b| b.is_ascii_lowercase())
        && bytes.all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
}

fn build_descriptor(
    definition: &ToolDefinition,
    method: &Method,
    schema: &ObjectSchema,
) -> Result<Tool, ConfigError> {
    let mut advertised = schema.clone();
    if advertised.additional_properties.is_none() {
        advertised.additional_properties = Some(false);
    }

    let schema_obj: JsonObject = match serde_json::to_value(InputSchema::Object(advertised)) {
        Ok(Value::Object(obj)) => obj,
        Ok(_) => JsonObject::new(),
        Err(e) => {
            return Err(ConfigError::InvalidSchema {
                tool: definition.name.clone(),
                message: e.to_string(),
            });
        }
    };

    let mut tool = Tool::new(
        definition.name.clone(),
        definition.description.clone(),
        Arc::new(schema_obj),
    );
    tool.annotations = Some(annotations_for_method(method));
    Ok(tool)
}

impl ToolOutput {
    /// Convert into an MCP tool result (text content plus structured content).
    #[must_use]
    pub fn into_call_tool_result(self) -> CallToolResult {
        // Some MCP clients only render `content` and ignore `structured_content`.
        let text = match &self.body {
            Value::String(s) => s.clone(),
            body => body.to_string(),
        };
        let structured = json!({
            "status": self.status,
            "headers": self.headers,
            "body": self.body,
        });

        CallToolResult {
            content: vec![Content::text(text)],
            structured_content: Some(structured),
            is_error: Some(false),
            meta: None,
        }
    }
}

impl CallError {
    /// Convert into an MCP tool result with `is_error` set.
    #[must_use]
    pub fn into_call_tool_result(self) -> CallToolResult {
        let mut detail = json!({
            "message": self.to_string(),
            "kind": format!("{:?}", self.kind()),
        });
        if let Some(status) = self.status() {
            detail["status"] = json!(status);
        }
        if let Some(body) = self.error_body() {
            detail["body"] = body.clone();
        }
        if let CallError::Validation { violations, .. } = &self {
            detail["violations"] = json!(violations);
        }

        CallToolResult {
            content: vec![Content::text(self.to_string())],
            structured_content: Some(detail),
            is_error: Some(true),
            meta: None,
        }
    }
}
