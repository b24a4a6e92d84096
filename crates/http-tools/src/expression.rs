//! Binding expressions embedded in configuration strings.
//!
//! Grammar (inside any string value of the tool configuration):
//!
//! ```text
//! {args.NAME}                 call argument
//! {env.NAME}                  environment variable
//! {args.NAME || default}      argument, falling back to a literal
//! {args.NAME?}                optional: the enclosing key is omitted when absent
//! ```
//!
//! `NAME` matches `[a-zA-Z_][a-zA-Z0-9_]*`. Anything that does not match the grammar (including
//! unknown namespaces such as `{foo.bar}`) is kept as literal text.
//!
//! A string that consists of exactly one expression resolves to the bound value with its JSON
//! type intact. When expressions are mixed with literal text, each one is substituted by its
//! string form and the result is always a string.

use crate::context::CallContext;
use serde_json::{Map, Number, Value};

/// Namespace an expression reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprKind {
    Args,
    Env,
}

/// Literal given after `||`.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultLiteral {
    Value(Value),
    /// The literal `undefined`: resolves exactly like a missing binding.
    Undefined,
}

/// One parsed `{kind.key ...}` unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub kind: ExprKind,
    pub key: String,
    pub default: Option<DefaultLiteral>,
    pub optional: bool,
}

/// Outcome of resolving an expression or a value containing expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Value(Value),
    /// Drop the enclosing mapping key entirely.
    Omit,
    /// No binding, no default, not optional.
    Undefined,
}

impl Resolved {
    #[must_use]
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Value(v) => Some(v),
            Self::Omit | Self::Undefined => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Segment<'a> {
    Text(&'a str),
    Expr(Expression),
}

impl Expression {
    /// Parse a complete expression token, braces included (e.g. `{args.limit || 25}`).
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        let inner = token.strip_prefix('{')?.strip_suffix('}')?;
        if inner.contains('}') {
            return None;
        }
        parse_inner(inner)
    }

    /// Look the key up in its namespace, falling back to the default literal, then to the
    /// optional marker.
    #[must_use]
    pub fn resolve(&self, ctx: &CallContext) -> Resolved {
        let bound = match self.kind {
            ExprKind::Args => ctx.arg(&self.key).cloned(),
            ExprKind::Env => ctx.env_var(&self.key).map(|v| Value::String(v.to_string())),
        };
        if let Some(v) = bound {
            return Resolved::Value(v);
        }

        match &self.default {
            Some(DefaultLiteral::Value(v)) => Resolved::Value(v.clone()),
            Some(DefaultLiteral::Undefined) => Resolved::Undefined,
            None if self.optional => Resolved::Omit,
            None => Resolved::Undefined,
        }
    }
}

/// Resolve a single string.
#[must_use]
pub fn resolve_str(s: &str, ctx: &CallContext) -> Resolved {
    let segments = tokenize(s);

    if let [Segment::Expr(expr)] = segments.as_slice() {
        return expr.resolve(ctx);
    }
    if !segments.iter().any(|seg| matches!(seg, Segment::Expr(_))) {
        return Resolved::Value(Value::String(s.to_string()));
    }

    let mut out = String::with_capacity(s.len());
    for segment in &segments {
        match segment {
            Segment::Text(t) => out.push_str(t),
            Segment::Expr(expr) => {
                // Absent bindings inside a larger string render as nothing.
                if let Resolved::Value(v) = expr.resolve(ctx) {
                    out.push_str(&value_to_string(&v));
                }
            }
        }
    }
    Resolved::Value(Value::String(out))
}

/// Resolve an arbitrary JSON value, recursing into arrays and objects.
///
/// Object keys whose value resolves to [`Resolved::Omit`] or [`Resolved::Undefined`] are
/// dropped. Inside arrays there is no key to drop, so such elements become `null`.
#[must_use]
pub fn resolve_value(value: &Value, ctx: &CallContext) -> Resolved {
    match value {
        Value::String(s) => resolve_str(s, ctx),
        Value::Array(items) => Resolved::Value(Value::Array(
            items
                .iter()
                .map(|item| resolve_value(item, ctx).into_value().unwrap_or(Value::Null))
                .collect(),
        )),
        Value::Object(map) => Resolved::Value(Value::Object(resolve_map(map, ctx))),
        other => Resolved::Value(other.clone()),
    }
}

/// Resolve every value of a mapping, keeping key order and dropping omitted keys.
#[must_use]
pub fn resolve_map(map: &Map<String, Value>, ctx: &CallContext) -> Map<String, Value> {
    let mut out = Map::new();
    for (k, v) in map {
        if let Some(resolved) = resolve_value(v, ctx).into_value() {
            out.insert(k.clone(), resolved);
        }
    }
    out
}

/// String form used when a value is interpolated into text, a path, a header or a query.
///
/// Strings are inserted raw; everything else (including `null`) uses its JSON text.
#[must_use]
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn tokenize(s: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut text_start = 0;
    let mut cursor = 0;

    while let Some(offset) = s[cursor..].find('{') {
        let open = cursor + offset;
        let Some(close_offset) = s[open + 1..].find('}') else {
            break;
        };
        let close = open + 1 + close_offset;

        if let Some(expr) = Expression::parse(&s[open..=close]) {
            if text_start < open {
                segments.push(Segment::Text(&s[text_start..open]));
            }
            segments.push(Segment::Expr(expr));
            text_start = close + 1;
            cursor = close + 1;
        } else {
            cursor = open + 1;
        }
    }

    if text_start < s.len() {
        segments.push(Segment::Text(&s[text_start..]));
    }
    segments
}

fn parse_inner(inner: &str) -> Option<Expression> {
    let (kind, rest) = if let Some(rest) = inner.strip_prefix("args.") {
        (ExprKind::Args, rest)
    } else if let Some(rest) = inner.strip_prefix("env.") {
        (ExprKind::Env, rest)
    } else {
        return None;
    };

    let name_len = identifier_len(rest);
    if name_len == 0 {
        return None;
    }
    let (key, rest) = rest.split_at(name_len);

    let (optional, rest) = match rest.strip_prefix('?') {
        Some(r) => (true, r),
        None => (false, rest),
    };

    let default = if rest.is_empty() {
        None
    } else {
        let literal = rest.trim_start().strip_prefix("||")?;
        Some(parse_default_literal(literal.trim()))
    };

    Some(Expression {
        kind,
        key: key.to_string(),
        default,
        optional,
    })
}

fn identifier_len(s: &str) -> usize {
    let mut len = 0;
    for (i, b) in s.bytes().enumerate() {
        let ok = if i == 0 {
            b.is_ascii_alphabetic() || b == b'_'
        } else {
            b.is_ascii_alphanumeric() || b == b'_'
        };
        if !ok {
            break;
        }
        len += 1;
    }
    len
}

/// Precedence: quoted string, integer, float, boolean, `null`, `undefined`, raw text.
fn parse_default_literal(text: &str) -> DefaultLiteral {
    if let Some(quoted) = strip_quotes(text) {
        return DefaultLiteral::Value(Value::String(quoted.to_string()));
    }

    if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(n) = text.parse::<u64>() {
            return DefaultLiteral::Value(Value::Number(n.into()));
        }
        if let Some(n) = text.parse::<f64>().ok().and_then(Number::from_f64) {
            return DefaultLiteral::Value(Value::Number(n));
        }
    }

    if is_decimal(text)
        && let Some(n) = text.parse::<f64>().ok().and_then(Number::from_f64)
    {
        return DefaultLiteral::Value(Value::Number(n));
    }

    match text {
        "true" => DefaultLiteral::Value(Value::Bool(true)),
        "false" => DefaultLiteral::Value(Value::Bool(false)),
        "null" => DefaultLiteral::Value(Value::Null),
        "undefined" => DefaultLiteral::Undefined,
        _ => DefaultLiteral::Value(Value::String(text.to_string())),
    }
}

fn strip_quotes(text: &str) -> Option<&str> {
    if text.len() < 2 {
        return None;
    }
    ['"', '\'']
        .into_iter()
        .find_map(|q| text.strip_prefix(q)?.strip_suffix(q))
}

fn is_decimal(text: &str) -> bool {
    let Some((int, frac)) = text.split_once('.') else {
        return false;
    };
    !int.is_empty()
        && !frac.is_empty()
        && int.bytes().all(|b| b.is_ascii_digit())
        && frac.bytes().all(|b| b.is_ascii_digit())
}
