//! Turning a raw transport response into tool output.

use crate::redact::is_sensitive_header;
use base64::Engine as _;
use mime::Mime;
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::fmt;

const FORWARDED_HEADERS: &[&str] = &[
    "content-type",
    "content-length",
    "etag",
    "last-modified",
    "location",
    "retry-after",
    "x-request-id",
];

/// Decode a response body.
///
/// UTF-8 that parses as JSON becomes JSON; other UTF-8 stays a string. Anything else is wrapped
/// as `{ "encoding": "base64", "mimeType": ..., "data": ... }`.
#[must_use]
pub fn decode_body(bytes: &[u8], content_type: Option<&str>) -> Value {
    let Ok(text) = std::str::from_utf8(bytes) else {
        let b64 = base64::engine::general_purpose::STANDARD.encode(bytes);
        return json!({
            "encoding": "base64",
            "mimeType": content_type,
            "data": b64
        });
    };

    if text.trim().is_empty() {
        return Value::String(text.to_string());
    }
    if (is_json_content_type(content_type) || !is_text_content_type(content_type))
        && let Ok(v) = serde_json::from_str(text)
    {
        return v;
    }
    Value::String(text.to_string())
}

fn parse_mime(content_type: Option<&str>) -> Option<Mime> {
    content_type?.parse::<Mime>().ok()
}

fn is_json_content_type(content_type: Option<&str>) -> bool {
    parse_mime(content_type)
        .is_some_and(|m| m.subtype() == mime::JSON || m.suffix() == Some(mime::JSON))
}

fn is_text_content_type(content_type: Option<&str>) -> bool {
    parse_mime(content_type).is_some_and(|m| m.type_() == mime::TEXT)
}

/// The subset of response headers returned to callers, keyed by lowercase name.
#[must_use]
pub fn filter_headers(headers: &[(String, String)]) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for (name, value) in headers {
        let lower = name.to_ascii_lowercase();
        if is_sensitive_header(&lower) {
            continue;
        }
        if FORWARDED_HEADERS.contains(&lower.as_str()) || lower.starts_with("x-ratelimit-") {
            out.entry(lower).or_insert_with(|| value.clone());
        }
    }
    out
}

/// A parsed `responseTransform` dot path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponsePath {
    raw: String,
    segments: Vec<String>,
}

/// Non-fatal problems noticed while producing a successful result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Diagnostic {
    /// The `responseTransform` path did not exist in the body; the body was returned unchanged.
    #[serde(rename_all = "camelCase")]
    Projection {
        path: String,
        missing_segment: String,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Projection {
                path,
                missing_segment,
            } => write!(
                f,
                "response transform '{path}' not applied: segment '{missing_segment}' not found"
            ),
        }
    }
}

impl ResponsePath {
    /// # Errors
    ///
    /// Returns an error message if the path is empty or contains an empty segment.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err("path must not be empty".to_string());
        }
        let segments: Vec<String> = trimmed.split('.').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err("path must not contain empty segments".to_string());
        }
        Ok(Self {
            raw: trimmed.to_string(),
            segments,
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Project `body` through the path.
    ///
    /// Objects are indexed by key and arrays by numeric segment. On a miss, the body is returned
    /// unchanged along with a [`Diagnostic::Projection`].
    #[must_use]
    pub fn project(&self, body: Value) -> (Value, Option<Diagnostic>) {
        let mut cur = &body;
        for segment in &self.segments {
            let next = match cur {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            };
            match next {
                Some(v) => cur = v,
                None => {
                    let diagnostic = Diagnostic::Projection {
                        path: self.raw.clone(),
                        missing_segment: segment.clone(),
                    };
                    return (body, Some(diagnostic));
                }
            }
        }
        let projected = cur.clone();
        (projected, None)
    }
}
