//! Recursive key and element ordering for the "sort" action of a pane.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::task::{checkpoint, CancellationToken};
use crate::Cancelled;

/// Controls what [`sort_value`] reorders.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOptions {
    /// Reorder array elements as well as object keys.
    pub arrays: bool,
}

impl Default for SortOptions {
    fn default() -> Self {
        Self { arrays: true }
    }
}

impl SortOptions {
    /// Enables or disables array element ordering.
    #[must_use]
    pub fn with_arrays(mut self, arrays: bool) -> Self {
        self.arrays = arrays;
        self
    }
}

/// Returns a copy of `value` with object keys ordered case-insensitively.
///
/// Keys that only differ by case keep their original relative order. When
/// [`SortOptions::arrays`] is set, array elements are sorted recursively and
/// then ordered by their compact JSON text as JavaScript's `JSON.stringify`
/// renders it, compared by UTF-16 code unit (so `"a"` precedes numbers and
/// `10` sorts before `9`).
///
/// ```
/// # use jsoncompare_core::{sort_value, SortOptions};
/// # use serde_json::json;
/// let sorted = sort_value(&json!({"b": [3, 10, 2], "A": {"z": 0, "y": 1}}), SortOptions::default());
/// assert_eq!(sorted.to_string(), r#"{"A":{"y":1,"z":0},"b":[10,2,3]}"#);
/// ```
#[must_use]
pub fn sort_value(value: &Value, options: SortOptions) -> Value {
    // Without a token the walk cannot be interrupted.
    sort_with(value, options, None).unwrap_or_else(|_| value.clone())
}

/// [`sort_value`] that checks `cancel` at every container.
pub fn sort_value_cancellable(
    value: &Value,
    options: SortOptions,
    cancel: &CancellationToken,
) -> Result<Value, Cancelled> {
    sort_with(value, options, Some(cancel))
}

fn sort_with(value: &Value, options: SortOptions, cancel: Option<&CancellationToken>) -> Result<Value, Cancelled> {
    match value {
        Value::Object(map) => {
            checkpoint(cancel)?;
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_by(|a, b| compare_keys(a, b));
            let mut sorted = Map::with_capacity(map.len());
            for key in keys {
                sorted.insert(key.clone(), sort_with(&map[key.as_str()], options, cancel)?);
            }
            Ok(Value::Object(sorted))
        }
        Value::Array(items) => {
            checkpoint(cancel)?;
            let mut sorted = items.iter().map(|item| sort_with(item, options, cancel)).collect::<Result<Vec<_>, _>>()?;
            if options.arrays {
                sorted.sort_by_cached_key(|item| {
                    let mut text = String::new();
                    write_js_json(item, &mut text);
                    text.encode_utf16().collect::<Vec<_>>()
                });
            }
            Ok(Value::Array(sorted))
        }
        primitive => Ok(primitive.clone()),
    }
}

fn compare_keys(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

/// Compact JSON as JavaScript's `JSON.stringify` writes it: integral numbers
/// carry no fractional part.
fn write_js_json(value: &Value, out: &mut String) {
    match value {
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e21 => out.push_str(&format!("{f:.0}")),
            _ => out.push_str(&n.to_string()),
        },
        Value::Array(items) => {
            out.push('[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                write_js_json(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            out.push('{');
            for (index, (key, item)) in map.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_js_json(item, out);
            }
            out.push('}');
        }
        primitive => out.push_str(&primitive.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn keys(value: &Value) -> Vec<&str> {
        value.as_object().map(|m| m.keys().map(String::as_str).collect()).unwrap_or_default()
    }

    #[test]
    fn keys_sort_case_insensitively_and_stably() {
        let sorted = sort_value(&json!({"b": 1, "B": 2, "a": 3, "C": 4}), SortOptions::default());
        assert_eq!(keys(&sorted), ["a", "b", "B", "C"]);
    }

    fn js_json(value: &Value) -> String {
        let mut text = String::new();
        write_js_json(value, &mut text);
        text
    }

    #[test]
    fn arrays_use_serialized_order() {
        let sorted = sort_value(&json!([10, 9, 1, null, "a", true]), SortOptions::default());
        assert_eq!(sorted, json!(["a", 1, 10, 9, null, true]));
    }

    #[test]
    fn arrays_can_be_left_alone() {
        let doc = json!([3, 1, {"b": 0, "a": 0}]);
        let sorted = sort_value(&doc, SortOptions::default().with_arrays(false));
        assert_eq!(sorted, json!([3, 1, {"a": 0, "b": 0}]));
        assert_eq!(keys(&sorted[2]), ["a", "b"]);
    }

    #[test]
    fn integral_floats_serialize_like_integers() {
        assert_eq!(js_json(&json!(2.0)), "2");
        assert_eq!(js_json(&json!(2.5)), "2.5");
        assert_eq!(js_json(&json!([1, null, {"k": "v\"", "n": 3.0}])), r#"[1,null,{"k":"v\"","n":3}]"#);
    }

    #[test]
    fn objects_in_arrays_are_ordered_after_their_own_keys() {
        let sorted = sort_value(&json!([{"id": 2}, {"id": 1}]), SortOptions::default());
        assert_eq!(sorted, json!([{"id": 1}, {"id": 2}]));

        let sorted = sort_value(&json!([{"z": 0, "a": 2}, {"a": 1, "z": 9}]), SortOptions::default());
        assert_eq!(sorted, json!([{"a": 1, "z": 9}, {"a": 2, "z": 0}]));
    }

    #[test]
    fn cancelled_sort_gives_up() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(sort_value_cancellable(&json!({"b": 1}), SortOptions::default(), &cancel), Err(Cancelled));
        assert_eq!(sort_value_cancellable(&json!(3), SortOptions::default(), &cancel), Ok(json!(3)));
    }
}
