use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ParseError;

/// Document syntax accepted by [`parse_document`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Format {
    /// JSON text (default).
    #[default]
    Json,
    /// YAML text, converted into the JSON data model.
    Yaml,
}

/// Parses document text into a JSON value.
///
/// Blank input yields `Ok(None)` so an empty editor pane is not an error.
///
/// ```
/// # use jsoncompare_core::{parse_document, Format};
/// let value = parse_document("answer: 42\n", Format::Yaml)?.unwrap();
/// assert_eq!(value["answer"], 42);
/// assert!(parse_document("  \n", Format::Json)?.is_none());
/// # Ok::<(), jsoncompare_core::ParseError>(())
/// ```
pub fn parse_document(input: &str, format: Format) -> Result<Option<Value>, ParseError> {
    if input.trim().is_empty() {
        return Ok(None);
    }
    let value = match format {
        Format::Json => serde_json::from_str(input)?,
        Format::Yaml => serde_yaml::from_str(input)?,
    };
    Ok(Some(value))
}

/// Strict equality on JSON values.
///
/// Primitives compare by value, with numbers compared numerically so `1` and
/// `1.0` are equal. Containers are never strictly equal to anything; callers
/// recurse into them instead.
#[must_use]
pub fn strict_equals(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) if a.is_f64() || b.is_f64() => x == y,
            _ => a == b,
        },
        (Value::String(a), Value::String(b)) => a == b,
        _ => false,
    }
}

/// Reports whether the value is an object or an array.
#[must_use]
pub fn is_container(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}

/// Short name of the value's kind, used in error messages.
#[must_use]
pub fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
