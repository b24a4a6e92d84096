//! Turns a tool definition plus a call context into a concrete request.
//!
//! Steps, in order:
//! 1. resolve `pathParams` and substitute each `{name}` in the path (values percent-encoded);
//! 2. fail if any `{...}` token is left in the path;
//! 3. resolve base headers and tool headers, tool headers winning;
//! 4. resolve `queryParams`, dropping `null` and empty values;
//! 5. resolve `bodyTemplate` for POST/PUT/PATCH only.

use crate::config::ToolDefinition;
use crate::context::CallContext;
use crate::error::CallError;
use crate::expression::{resolve_map, resolve_value, value_to_string};
use reqwest::Method;
use serde_json::{Map, Value};

/// A fully resolved request, relative to the configured base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub method: Method,
    /// Path with placeholders substituted, always starting with `/`.
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

/// Build the request for one call.
///
/// # Errors
///
/// Returns [`CallError::UnresolvedPathParam`] if a path placeholder is still present after
/// substitution (for example because its binding resolved to nothing).
pub fn build_request(
    tool: &ToolDefinition,
    method: &Method,
    base_headers: &Map<String, Value>,
    ctx: &CallContext,
) -> Result<RequestDescriptor, CallError> {
    let path = build_path(tool, ctx)?;
    let headers = build_headers(base_headers, &tool.headers, ctx);
    let query = build_query(&tool.query_params, ctx);

    let body = if carries_body(method) {
        tool.body_template
            .as_ref()
            .and_then(|t| resolve_value(t, ctx).into_value())
    } else {
        None
    };

    Ok(RequestDescriptor {
        method: method.clone(),
        path,
        headers,
        query,
        body,
    })
}

fn carries_body(method: &Method) -> bool {
    *method == Method::POST || *method == Method::PUT || *method == Method::PATCH
}

fn build_path(tool: &ToolDefinition, ctx: &CallContext) -> Result<String, CallError> {
    let mut path = tool.path.clone();
    if !path.starts_with('/') {
        path = format!("/{path}");
    }

    for (name, value) in resolve_map(&tool.path_params, ctx) {
        if value.is_null() {
            continue;
        }
        let encoded = encode_component(&value_to_string(&value));
        path = path.replace(&format!("{{{name}}}"), &encoded);
    }

    if let Some(token) = find_placeholder(&path) {
        return Err(CallError::UnresolvedPathParam {
            tool: tool.name.clone(),
            token: token.to_string(),
            path,
        });
    }
    Ok(path)
}

/// First `{name}` token in a path template, braces included.
#[must_use]
pub fn find_placeholder(path: &str) -> Option<&str> {
    placeholders(path).next()
}

/// Every `{name}` token in a path template, braces included.
pub fn placeholders(path: &str) -> impl Iterator<Item = &str> {
    let mut cursor = 0;
    std::iter::from_fn(move || {
        while let Some(offset) = path[cursor..].find('{') {
            let open = cursor + offset;
            let close = open + 1 + path[open + 1..].find('}')?;
            cursor = close + 1;
            if close > open + 1 {
                return Some(&path[open..=close]);
            }
        }
        None
    })
}

fn build_headers(
    base: &Map<String, Value>,
    tool: &Map<String, Value>,
    ctx: &CallContext,
) -> Vec<(String, String)> {
    let mut headers: Vec<(String, String)> = Vec::new();
    for (name, value) in resolve_map(base, ctx).into_iter().chain(resolve_map(tool, ctx)) {
        if value.is_null() {
            continue;
        }
        let value = value_to_string(&value);
        // Header names are case-insensitive on the wire; keep the latest spelling.
        if let Some(existing) = headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&name)) {
            *existing = (name, value);
        } else {
            headers.push((name, value));
        }
    }
    headers
}

fn build_query(params: &Map<String, Value>, ctx: &CallContext) -> Vec<(String, String)> {
    let mut query = Vec::new();
    for (name, value) in resolve_map(params, ctx) {
        match value {
            Value::Array(items) => {
                for item in &items {
                    if let Some(v) = non_empty_query_value(item) {
                        query.push((name.clone(), v));
                    }
                }
            }
            other => {
                if let Some(v) = non_empty_query_value(&other) {
                    query.push((name, v));
                }
            }
        }
    }
    query
}

fn non_empty_query_value(value: &Value) -> Option<String> {
    if value.is_null() {
        return None;
    }
    let s = value_to_string(value);
    if s.is_empty() { None } else { Some(s) }
}

/// Percent-encode a path segment or query component: everything outside the RFC 3986
/// unreserved set is escaped, including `/`, `&` and `=`.
#[must_use]
pub fn encode_component(s: &str) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = String::with_capacity(s.len());
    for &b in s.as_bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~') {
            out.push(b as char);
        } else {
            out.push('%');
            out.push(HEX[usize::from(b >> 4)] as char);
            out.push(HEX[usize::from(b & 0x0F)] as char);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EnvSnapshot;
    use serde_json::json;

    fn tool(v: Value) -> ToolDefinition {
        let mut base = json!({
            "name": "t",
            "description": "",
            "method": "GET",
            "path": "/",
            "inputSchema": {"type": "object"}
        });
        if let (Some(base), Some(extra)) = (base.as_object_mut(), v.as_object()) {
            for (k, v) in extra {
                base.insert(k.clone(), v.clone());
            }
        }
        serde_json::from_value(base).expect("tool definition parses")
    }

    fn ctx(args: Value) -> CallContext {
        let env: EnvSnapshot = [("TOKEN", "abc")].into_iter().collect();
        CallContext::new(args.as_object().cloned().unwrap_or_default(), env)
    }

    #[test]
    fn path_values_are_percent_encoded() {
        let t = tool(json!({"path": "/users/{id}", "pathParams": {"id": "{args.user_id}"}}));
        let req = build_request(&t, &Method::GET, &Map::new(), &ctx(json!({"user_id": "a b"})))
            .expect("builds");
        assert_eq!(req.path, "/users/a%20b");

        let req = build_request(&t, &Method::GET, &Map::new(), &ctx(json!({"user_id": "x/../y"})))
            .expect("builds");
        assert_eq!(req.path, "/users/x%2F..%2Fy");
    }

    #[test]
    fn unresolved_placeholder_names_first_token() {
        let t = tool(json!({
            "path": "/orgs/{org}/repos/{repo}",
            "pathParams": {"org": "{args.org}", "repo": "{args.repo}"}
        }));
        let err = build_request(&t, &Method::GET, &Map::new(), &ctx(json!({"repo": "r"})))
            .unwrap_err();
        match err {
            CallError::UnresolvedPathParam { token, path, .. } => {
                assert_eq!(token, "{org}");
                assert_eq!(path, "/orgs/{org}/repos/r");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn query_drops_null_empty_and_omitted_values() {
        let t = tool(json!({
            "queryParams": {
                "limit": "{args.limit || 25}",
                "cursor": "{args.cursor?}",
                "filter": "{args.filter}",
                "empty": "",
                "nothing": "{args.nothing || null}",
                "tags": "{args.tags}"
            }
        }));
        let req = build_request(
            &t,
            &Method::GET,
            &Map::new(),
            &ctx(json!({"tags": ["a", "", "b"]})),
        )
        .expect("builds");
        assert_eq!(
            req.query,
            vec![
                ("limit".to_string(), "25".to_string()),
                ("tags".to_string(), "a".to_string()),
                ("tags".to_string(), "b".to_string()),
            ]
        );
    }

    #[test]
    fn tool_headers_override_base_headers_case_insensitively() {
        let mut base = Map::new();
        base.insert("Authorization".to_string(), json!("Bearer {env.TOKEN}"));
        base.insert("Accept".to_string(), json!("application/json"));
        let t = tool(json!({
            "headers": {"accept": "text/plain", "X-Trace": "{args.trace?}"}
        }));

        let req = build_request(&t, &Method::GET, &base, &ctx(json!({}))).expect("builds");
        assert_eq!(
            req.headers,
            vec![
                ("Authorization".to_string(), "Bearer abc".to_string()),
                ("accept".to_string(), "text/plain".to_string()),
            ]
        );
    }

    #[test]
    fn body_only_for_methods_that_carry_one() {
        let t = tool(json!({
            "bodyTemplate": {"name": "{args.name}", "age": "{args.age}", "nick": "{args.nick?}"}
        }));
        let c = ctx(json!({"name": "ada", "age": 36}));

        for m in [Method::POST, Method::PUT, Method::PATCH] {
            let req = build_request(&t, &m, &Map::new(), &c).expect("builds");
            assert_eq!(req.body, Some(json!({"name": "ada", "age": 36})));
        }
        for m in [Method::GET, Method::DELETE] {
            let req = build_request(&t, &m, &Map::new(), &c).expect("builds");
            assert_eq!(req.body, None);
        }
    }

    #[test]
    fn placeholders_are_listed_in_order() {
        let found: Vec<&str> = placeholders("/a/{x}/b/{}/{y}").collect();
        assert_eq!(found, vec!["{x}", "{y}"]);
        assert_eq!(find_placeholder("/plain/path"), None);
    }

    #[test]
    fn encode_component_keeps_unreserved_only() {
        assert_eq!(encode_component("a b&c=d"), "a%20b%26c%3Dd");
        assert_eq!(encode_component("a:b/c"), "a%3Ab%2Fc");
        assert_eq!(encode_component("A-z_0.9~"), "A-z_0.9~");
        assert_eq!(encode_component("é"), "%C3%A9");
    }
}
