use serde_json::{Map, Value};

use super::Difference;
use crate::path::{join_index, join_key, ROOT};
use crate::value::{kind_name, strict_equals};
use crate::task::{checkpoint, CancellationToken};
use crate::{Cancelled, DiffError};

/// Type-aware recursive comparison of two documents.
///
/// Keys are visited in insertion order and indices in increasing order; the
/// result lists keep that order. Arrays are compared strictly by position:
/// indices present only on the right are `right.extra`, while indices present
/// only on the left compare against nothing and are reported as `different`
/// on both sides.
///
/// ```
/// # use jsoncompare_core::structural_diff;
/// # use serde_json::json;
/// let diff = structural_diff(&json!({"a": [1, 2]}), &json!({"a": [1, 2, 3]}))?;
/// assert_eq!(diff.right.extra, ["$.a.[2]"]);
/// assert!(diff.left.is_empty());
/// # Ok::<(), jsoncompare_core::DiffError>(())
/// ```
pub fn structural_diff(lhs: &Value, rhs: &Value) -> Result<Difference, DiffError> {
    walk(lhs, rhs, None)
}

/// [`structural_diff`] that checks `cancel` at every container and returns
/// [`DiffError::Cancelled`] once it fires.
///
/// ```
/// # use jsoncompare_core::{structural_diff_cancellable, CancellationToken, DiffError};
/// # use serde_json::json;
/// let cancel = CancellationToken::new();
/// cancel.cancel();
/// let err = structural_diff_cancellable(&json!({"a": 1}), &json!({}), &cancel).unwrap_err();
/// assert!(matches!(err, DiffError::Cancelled(_)));
/// ```
pub fn structural_diff_cancellable(
    lhs: &Value,
    rhs: &Value,
    cancel: &CancellationToken,
) -> Result<Difference, DiffError> {
    walk(lhs, rhs, Some(cancel))
}

fn walk(lhs: &Value, rhs: &Value, cancel: Option<&CancellationToken>) -> Result<Difference, DiffError> {
    let mut walker = Walker { cancel, diff: Difference::default() };
    match (lhs, rhs) {
        (Value::Object(left), Value::Object(right)) => walker.objects(left, right, ROOT)?,
        (Value::Array(left), Value::Array(right)) => walker.arrays(left, right, ROOT)?,
        _ => {
            return Err(DiffError::InvalidInput { left: kind_name(lhs), right: kind_name(rhs) });
        }
    }
    Ok(walker.diff)
}

struct Walker<'a> {
    cancel: Option<&'a CancellationToken>,
    diff: Difference,
}

impl Walker<'_> {
    fn objects(&mut self, lhs: &Map<String, Value>, rhs: &Map<String, Value>, base: &str) -> Result<(), Cancelled> {
        checkpoint(self.cancel)?;
        for (key, value) in lhs {
            let path = join_key(base, key);
            match rhs.get(key) {
                Some(other) => self.values(value, other, path)?,
                None => self.diff.left.missing.push(path),
            }
        }
        for key in rhs.keys() {
            if !lhs.contains_key(key) {
                self.diff.right.extra.push(join_key(base, key));
            }
        }
        Ok(())
    }

    fn arrays(&mut self, lhs: &[Value], rhs: &[Value], base: &str) -> Result<(), Cancelled> {
        checkpoint(self.cancel)?;
        for (index, value) in lhs.iter().enumerate() {
            let path = join_index(base, index);
            match rhs.get(index) {
                Some(other) => self.values(value, other, path)?,
                None => self.diff.record_different(path),
            }
        }
        for index in lhs.len()..rhs.len() {
            self.diff.right.extra.push(join_index(base, index));
        }
        Ok(())
    }

    fn values(&mut self, lhs: &Value, rhs: &Value, path: String) -> Result<(), Cancelled> {
        match (lhs, rhs) {
            (Value::Object(left), Value::Object(right)) => self.objects(left, right, &path)?,
            (Value::Array(left), Value::Array(right)) => self.arrays(left, right, &path)?,
            _ if strict_equals(lhs, rhs) => {}
            _ => self.diff.record_different(path),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn added_key_is_right_extra() {
        let diff = structural_diff(&json!({"a": 1}), &json!({"a": 1, "b": 2})).unwrap();
        assert_eq!(diff.right.extra, ["$.b"]);
        assert!(diff.left.is_empty());
        assert!(diff.right.different.is_empty() && diff.right.missing.is_empty());
    }

    #[test]
    fn removed_key_is_left_missing() {
        let diff = structural_diff(&json!({"a": 1}), &json!({})).unwrap();
        assert_eq!(diff.left.missing, ["$.a"]);
        assert!(diff.right.is_empty());
    }

    #[test]
    fn changed_value_is_different_on_both_sides() {
        let diff = structural_diff(&json!({"a": 1}), &json!({"a": 2})).unwrap();
        assert_eq!(diff.left.different, ["$.a"]);
        assert_eq!(diff.right.different, ["$.a"]);
    }

    #[test]
    fn kind_mismatch_is_different_without_recursion() {
        let diff = structural_diff(&json!({"a": {"x": 1}}), &json!({"a": [1]})).unwrap();
        assert_eq!(diff.left.different, ["$.a"]);
        let diff = structural_diff(&json!({"a": null}), &json!({"a": {}})).unwrap();
        assert_eq!(diff.right.different, ["$.a"]);
    }

    #[test]
    fn nested_changes_keep_traversal_order() {
        let lhs = json!({"z": {"b": 1, "a": 2}, "y": [1, {"k": "v"}]});
        let rhs = json!({"z": {"b": 2, "a": 3}, "y": [1, {"k": "w", "n": 0}]});
        let diff = structural_diff(&lhs, &rhs).unwrap();
        assert_eq!(diff.left.different, ["$.z.b", "$.z.a", "$.y.[1].k"]);
        assert_eq!(diff.right.extra, ["$.y.[1].n"]);
    }

    #[test]
    fn shorter_right_array_reports_different() {
        let diff = structural_diff(&json!([1, 2, 3]), &json!([1])).unwrap();
        assert_eq!(diff.left.different, ["$.[1]", "$.[2]"]);
        assert_eq!(diff.right.different, ["$.[1]", "$.[2]"]);
        assert!(diff.left.missing.is_empty() && diff.left.extra.is_empty());
    }

    #[test]
    fn insertion_shifts_indices_into_different() {
        let diff = structural_diff(&json!([1, 2]), &json!([0, 1, 2])).unwrap();
        assert_eq!(diff.left.different, ["$.[0]", "$.[1]"]);
        assert_eq!(diff.right.extra, ["$.[2]"]);
    }

    #[test]
    fn dotted_keys_are_quoted() {
        let diff = structural_diff(&json!({"a.b": 1}), &json!({"a.b": 2})).unwrap();
        assert_eq!(diff.left.different, ["$.\"a.b\""]);
    }

    #[test]
    fn top_level_primitives_are_rejected() {
        let err = structural_diff(&json!(1), &json!({})).unwrap_err();
        assert_eq!(err, DiffError::InvalidInput { left: "number", right: "object" });
        assert!(structural_diff(&json!({}), &json!([])).is_err());
    }

    #[test]
    fn cancelled_walk_stops_before_recording() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let lhs = json!({"a": {"b": 1}});
        let err = structural_diff_cancellable(&lhs, &json!({"a": {"b": 2}}), &cancel).unwrap_err();
        assert_eq!(err, DiffError::Cancelled(Cancelled));
        assert!(structural_diff_cancellable(&lhs, &lhs, &CancellationToken::new()).unwrap().is_empty());
    }
}
