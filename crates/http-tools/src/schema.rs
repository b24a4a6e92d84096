//! Structural input schemas and argument validation.
//!
//! A small subset of JSON Schema: one `type` per schema plus the usual
//! scalar constraints, nested `properties` and array `items`. There is no `$ref`, `oneOf` or
//! other combinator. Validation never stops at the first problem: every violation is reported.

use regex::Regex;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// A schema node, tagged by its JSON type.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InputSchema {
    Object(ObjectSchema),
    String(StringSchema),
    Number(NumberSchema),
    Integer(NumberSchema),
    Boolean(ScalarSchema),
    Array(ArraySchema),
    Null(ScalarSchema),
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub properties: Properties,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    /// Captured and advertised, not enforced (unknown arguments are ignored).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StringSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<Pattern>,
}

/// Shared by `number` and `integer`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
}

/// `boolean` and `null`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScalarSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArraySchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<InputSchema>>,
}

/// Declared object properties, kept in configured order.
#[derive(Debug, Clone, Default)]
pub struct Properties(Vec<(String, InputSchema)>);

impl Properties {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&InputSchema> {
        self.0.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    #[must_use]
    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &InputSchema)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl Serialize for Properties {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(k, v)| (k, v)))
    }
}

impl<'de> Deserialize<'de> for Properties {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // serde_json's map keeps insertion order (`preserve_order`).
        let raw = Map::<String, Value>::deserialize(deserializer)?;
        raw.into_iter()
            .map(|(name, schema)| {
                serde_json::from_value(schema)
                    .map(|s| (name.clone(), s))
                    .map_err(|e| D::Error::custom(format!("property '{name}': {e}")))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

/// A `pattern` constraint, compiled when the configuration is loaded.
#[derive(Debug, Clone)]
pub struct Pattern(Regex);

impl Pattern {
    /// # Errors
    ///
    /// Returns an error if `pattern` is not a valid regular expression.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Self)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        self.0.is_match(text)
    }
}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::new(&raw).map_err(|e| D::Error::custom(format!("invalid pattern '{raw}': {e}")))
    }
}

/// One failed check, addressed by a JSON path such as `$.user.tags[2]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub path: String,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

impl InputSchema {
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Object(_) => "object",
            Self::String(_) => "string",
            Self::Number(_) => "number",
            Self::Integer(_) => "integer",
            Self::Boolean(_) => "boolean",
            Self::Array(_) => "array",
            Self::Null(_) => "null",
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&ObjectSchema> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    fn allowed(&self) -> Option<&[Value]> {
        match self {
            Self::String(s) => s.allowed.as_deref(),
            Self::Number(n) | Self::Integer(n) => n.allowed.as_deref(),
            Self::Boolean(s) | Self::Null(s) => s.allowed.as_deref(),
            Self::Object(_) | Self::Array(_) => None,
        }
    }
}

impl ObjectSchema {
    /// Names listed in `required` but missing from `properties`.
    #[must_use]
    pub fn undeclared_required(&self) -> Vec<&str> {
        self.required
            .iter()
            .filter(|r| !self.properties.contains_key(r))
            .map(String::as_str)
            .collect()
    }
}

/// Required arguments that are absent or `null`, in `required` order.
#[must_use]
pub fn missing_required(schema: &ObjectSchema, args: &Map<String, Value>) -> Vec<String> {
    schema
        .required
        .iter()
        .filter(|name| args.get(name.as_str()).is_none_or(Value::is_null))
        .cloned()
        .collect()
}

/// Validate call arguments against the declared properties.
///
/// Arguments without a declared property are ignored, and `null` values are skipped (presence is
/// checked separately by [`missing_required`]).
#[must_use]
pub fn validate_arguments(schema: &ObjectSchema, args: &Map<String, Value>) -> Vec<Violation> {
    let mut violations = Vec::new();
    validate_properties(schema, args, "$", &mut violations);
    violations
}

fn validate_properties(
    schema: &ObjectSchema,
    map: &Map<String, Value>,
    path: &str,
    out: &mut Vec<Violation>,
) {
    for (name, prop) in schema.properties.iter() {
        let Some(value) = map.get(name) else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        validate_value(prop, value, &format!("{path}.{name}"), out);
    }
}

fn validate_value(schema: &InputSchema, value: &Value, path: &str, out: &mut Vec<Violation>) {
    if !type_matches(schema, value) {
        out.push(Violation {
            path: path.to_string(),
            message: format!(
                "expected {}, got {}",
                schema.type_name(),
                describe_value_type(value)
            ),
        });
        return;
    }

    if let Some(allowed) = schema.allowed()
        && !allowed.iter().any(|a| values_equal(a, value))
    {
        out.push(Violation {
            path: path.to_string(),
            message: format!(
                "must be one of {}, got {value}",
                Value::Array(allowed.to_vec())
            ),
        });
    }

    match schema {
        InputSchema::String(s) => {
            if let Value::String(text) = value {
                check_string(s, text, path, out);
            }
        }
        InputSchema::Number(n) | InputSchema::Integer(n) => {
            if let Some(x) = value.as_f64() {
                check_range(n, x, path, out);
            }
        }
        InputSchema::Object(o) => {
            if let Value::Object(map) = value {
                for missing in missing_required(o, map) {
                    out.push(Violation {
                        path: format!("{path}.{missing}"),
                        message: "is required".to_string(),
                    });
                }
                validate_properties(o, map, path, out);
            }
        }
        InputSchema::Array(a) => {
            if let (Value::Array(items), Some(item_schema)) = (value, a.items.as_deref()) {
                for (i, item) in items.iter().enumerate() {
                    validate_value(item_schema, item, &format!("{path}[{i}]"), out);
                }
            }
        }
        InputSchema::Boolean(_) | InputSchema::Null(_) => {}
    }
}

fn type_matches(schema: &InputSchema, value: &Value) -> bool {
    match schema {
        InputSchema::Object(_) => value.is_object(),
        InputSchema::String(_) => value.is_string(),
        InputSchema::Number(_) => value.is_number(),
        InputSchema::Integer(_) => is_whole_number(value),
        InputSchema::Boolean(_) => value.is_boolean(),
        InputSchema::Array(_) => value.is_array(),
        InputSchema::Null(_) => value.is_null(),
    }
}

fn is_whole_number(value: &Value) -> bool {
    let Value::Number(n) = value else {
        return false;
    };
    if n.is_i64() || n.is_u64() {
        return true;
    }
    n.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0)
}

fn check_string(schema: &StringSchema, text: &str, path: &str, out: &mut Vec<Violation>) {
    let len = text.chars().count();
    if let Some(min) = schema.min_length
        && len < min
    {
        out.push(Violation {
            path: path.to_string(),
            message: format!("length {len} is shorter than minLength {min}"),
        });
    }
    if let Some(max) = schema.max_length
        && len > max
    {
        out.push(Violation {
            path: path.to_string(),
            message: format!("length {len} is longer than maxLength {max}"),
        });
    }
    if let Some(pattern) = &schema.pattern
        && !pattern.is_match(text)
    {
        out.push(Violation {
            path: path.to_string(),
            message: format!("does not match pattern '{}'", pattern.as_str()),
        });
    }
}

fn check_range(schema: &NumberSchema, x: f64, path: &str, out: &mut Vec<Violation>) {
    if let Some(min) = schema.minimum
        && x < min
    {
        out.push(Violation {
            path: path.to_string(),
            message: format!("must be >= {min}, got {x}"),
        });
    }
    if let Some(max) = schema.maximum
        && x > max
    {
        out.push(Violation {
            path: path.to_string(),
            message: format!("must be <= {max}, got {x}"),
        });
    }
}

/// JSON equality where `1` and `1.0` compare equal.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn describe_value_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object_schema(v: Value) -> ObjectSchema {
        let schema: InputSchema = serde_json::from_value(v).expect("schema parses");
        schema.as_object().cloned().expect("object schema")
    }

    fn args(v: Value) -> Map<String, Value> {
        v.as_object().cloned().expect("object args")
    }

    #[test]
    fn integer_range_rejects_out_of_range_and_fractions() {
        let schema = object_schema(json!({
            "type": "object",
            "properties": {"n": {"type": "integer", "minimum": 1, "maximum": 100}}
        }));

        assert_eq!(validate_arguments(&schema, &args(json!({"n": 0}))).len(), 1);
        assert_eq!(validate_arguments(&schema, &args(json!({"n": 3.5}))).len(), 1);
        assert!(validate_arguments(&schema, &args(json!({"n": 1}))).is_empty());
        assert!(validate_arguments(&schema, &args(json!({"n": 100}))).is_empty());
        assert!(validate_arguments(&schema, &args(json!({"n": 42.0}))).is_empty());

        let v = validate_arguments(&schema, &args(json!({"n": 3.5})));
        assert_eq!(v[0].path, "$.n");
        assert!(v[0].message.contains("expected integer"));
    }

    #[test]
    fn reports_every_violation_not_just_the_first() {
        let schema = object_schema(json!({
            "type": "object",
            "properties": {
                "name": {"type": "string", "minLength": 3, "pattern": "^[a-z]+$"},
                "size": {"type": "number", "maximum": 10},
                "color": {"type": "string", "enum": ["red", "green"]},
                "active": {"type": "boolean"}
            }
        }));

        let v = validate_arguments(
            &schema,
            &args(json!({"name": "A", "size": 11, "color": "blue", "active": "yes"})),
        );
        let paths: Vec<&str> = v.iter().map(|v| v.path.as_str()).collect();
        // name: minLength + pattern; size: maximum; color: enum; active: type.
        assert_eq!(v.len(), 5, "{v:?}");
        assert!(paths.contains(&"$.name"));
        assert!(paths.contains(&"$.size"));
        assert!(paths.contains(&"$.color"));
        assert!(paths.contains(&"$.active"));
    }

    #[test]
    fn nested_objects_and_array_items_are_validated_with_paths() {
        let schema = object_schema(json!({
            "type": "object",
            "properties": {
                "user": {
                    "type": "object",
                    "required": ["email"],
                    "properties": {
                        "email": {"type": "string"},
                        "age": {"type": "integer", "minimum": 0}
                    }
                },
                "tags": {"type": "array", "items": {"type": "string", "maxLength": 4}}
            }
        }));

        let v = validate_arguments(
            &schema,
            &args(json!({"user": {"age": -1}, "tags": ["ok", "too-long", 3]})),
        );
        let rendered: Vec<String> = v.iter().map(ToString::to_string).collect();
        assert!(rendered.iter().any(|m| m.starts_with("$.user.email: is required")));
        assert!(rendered.iter().any(|m| m.starts_with("$.user.age: must be >= 0")));
        assert!(rendered.iter().any(|m| m.starts_with("$.tags[1]: length 8")));
        assert!(rendered.iter().any(|m| m.starts_with("$.tags[2]: expected string")));
        assert_eq!(v.len(), 4);
    }

    #[test]
    fn unknown_and_null_arguments_are_not_flagged() {
        let schema = object_schema(json!({
            "type": "object",
            "properties": {"q": {"type": "string"}}
        }));
        assert!(validate_arguments(&schema, &args(json!({"q": null, "extra": 1}))).is_empty());
    }

    #[test]
    fn missing_required_lists_absent_and_null_arguments() {
        let schema = object_schema(json!({
            "type": "object",
            "required": ["a", "b", "c"],
            "properties": {"a": {"type": "string"}, "b": {"type": "string"}}
        }));
        let missing = missing_required(&schema, &args(json!({"a": "x", "b": null})));
        assert_eq!(missing, vec!["b".to_string(), "c".to_string()]);
        assert_eq!(schema.undeclared_required(), vec!["c"]);
    }

    #[test]
    fn invalid_pattern_is_rejected_when_parsing() {
        let err = serde_json::from_value::<InputSchema>(json!({
            "type": "string",
            "pattern": "(unclosed"
        }))
        .unwrap_err();
        assert!(err.to_string().contains("invalid pattern"));
    }

    #[test]
    fn unknown_type_is_rejected_when_parsing() {
        assert!(serde_json::from_value::<InputSchema>(json!({"type": "date"})).is_err());
        assert!(serde_json::from_value::<InputSchema>(json!({"properties": {}})).is_err());
    }

    #[test]
    fn properties_keep_configured_order() {
        let schema = object_schema(json!({
            "type": "object",
            "properties": {
                "zeta": {"type": "string"},
                "alpha": {"type": "integer"},
                "mid": {"type": "boolean"}
            }
        }));
        let names: Vec<&str> = schema.properties.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);

        let v = validate_arguments(&schema, &args(json!({"mid": 1, "alpha": "x", "zeta": 2})));
        let paths: Vec<&str> = v.iter().map(|v| v.path.as_str()).collect();
        assert_eq!(paths, vec!["$.zeta", "$.alpha", "$.mid"]);

        let serialized = serde_json::to_string(&InputSchema::Object(schema)).expect("serializes");
        let zeta = serialized.find("zeta").expect("zeta");
        let alpha = serialized.find("alpha").expect("alpha");
        assert!(zeta < alpha, "{serialized}");
    }

    #[test]
    fn serializes_back_to_json_schema_shape() {
        let schema: InputSchema = serde_json::from_value(json!({
            "type": "object",
            "properties": {"id": {"type": "string", "pattern": "^[0-9]+$"}},
            "required": ["id"]
        }))
        .expect("schema parses");
        assert_eq!(
            serde_json::to_value(&schema).expect("serializes"),
            json!({
                "type": "object",
                "properties": {"id": {"type": "string", "pattern": "^[0-9]+$"}},
                "required": ["id"]
            })
        );
    }
}
