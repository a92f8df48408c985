use serde_json::Value;

use super::{Difference, JsonDiff};
use crate::normalize::{normalize, normalize_cancellable, Normalized};
use crate::task::{checkpoint, CancellationToken};
use crate::value::is_container;
use crate::{Cancelled, HashCache};

/// Compares the normalized forms of two documents.
///
/// Returns `None` unless both inputs are containers. Only `left.missing`,
/// `left.different`, `right.extra` and `right.different` are ever populated.
/// A nested change reports the enclosing containers as well, since their
/// hashes differ too.
///
/// ```
/// # use jsoncompare_core::{flat_diff, HashCache};
/// # use serde_json::json;
/// let cache = HashCache::default();
/// let diff = flat_diff(&json!({"a": {"b": 1}}), &json!({"a": {"b": 2}}), &cache).unwrap();
/// assert_eq!(diff.left.different, ["$.a", "$.a.b"]);
/// ```
#[must_use]
pub fn flat_diff(lhs: &Value, rhs: &Value, cache: &HashCache) -> Option<Difference> {
    // Without a token the walk cannot be interrupted.
    flat_walk(lhs, rhs, cache, None).unwrap_or_default()
}

/// [`flat_diff`] that checks `cancel` while normalizing and scanning.
pub fn flat_diff_cancellable(
    lhs: &Value,
    rhs: &Value,
    cache: &HashCache,
    cancel: &CancellationToken,
) -> Result<Option<Difference>, Cancelled> {
    flat_walk(lhs, rhs, cache, Some(cancel))
}

fn flat_walk(
    lhs: &Value,
    rhs: &Value,
    cache: &HashCache,
    cancel: Option<&CancellationToken>,
) -> Result<Option<Difference>, Cancelled> {
    if !is_container(lhs) || !is_container(rhs) {
        return Ok(None);
    }
    let (lhs, rhs) = match cancel {
        Some(cancel) => (normalize_cancellable(lhs, cache, cancel)?, normalize_cancellable(rhs, cache, cancel)?),
        None => (normalize(lhs, cache), normalize(rhs, cache)),
    };

    let mut diff = Difference::default();
    scan(&lhs, &rhs, &mut diff.left, cancel, |side, path| side.missing.push(path))?;
    scan(&rhs, &lhs, &mut diff.right, cancel, |side, path| side.extra.push(path))?;
    Ok(Some(diff))
}

/// Walks `this` against `other`, skipping the descendants of containers whose
/// hashes match on both sides.
fn scan(
    this: &Normalized,
    other: &Normalized,
    out: &mut JsonDiff,
    cancel: Option<&CancellationToken>,
    absent: impl Fn(&mut JsonDiff, String),
) -> Result<(), Cancelled> {
    let mut skip: Option<String> = None;
    for (path, leaf) in this {
        if skip.as_deref().is_some_and(|prefix| path.starts_with(prefix)) {
            continue;
        }
        skip = None;
        if leaf.is_hash() {
            checkpoint(cancel)?;
        }
        match other.get(path) {
            None => absent(out, path.clone()),
            Some(theirs) if leaf.same_as(theirs) => {
                if leaf.is_hash() {
                    skip = Some(format!("{path}."));
                }
            }
            Some(_) => out.different.push(path.clone()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn primitives_yield_none() {
        let cache = HashCache::default();
        assert!(flat_diff(&json!(1), &json!({}), &cache).is_none());
        assert!(flat_diff(&json!([]), &json!("x"), &cache).is_none());
    }

    #[test]
    fn identical_documents_are_empty() {
        let cache = HashCache::default();
        let doc = json!({"a": [1, {"b": null}], "c": "d"});
        assert!(flat_diff(&doc, &doc, &cache).unwrap().is_empty());
    }

    #[test]
    fn added_and_removed_keys() {
        let cache = HashCache::default();
        let diff = flat_diff(&json!({"a": 1, "gone": 0}), &json!({"a": 1, "b": 2}), &cache).unwrap();
        assert_eq!(diff.left.missing, ["$.gone"]);
        assert_eq!(diff.right.extra, ["$.b"]);
        assert!(diff.left.extra.is_empty());
        assert!(diff.right.missing.is_empty());
    }

    #[test]
    fn added_subtree_reports_every_new_path() {
        let cache = HashCache::default();
        let diff = flat_diff(&json!({}), &json!({"n": {"x": 1}}), &cache).unwrap();
        assert_eq!(diff.right.extra, ["$.n", "$.n.x"]);
    }

    #[test]
    fn equal_subtrees_are_skipped_but_siblings_are_not() {
        let cache = HashCache::default();
        let lhs = json!({"same": {"deep": [1, 2]}, "same2": 1});
        let rhs = json!({"same": {"deep": [1, 2]}, "same2": 2});
        let diff = flat_diff(&lhs, &rhs, &cache).unwrap();
        assert_eq!(diff.left.different, ["$.same2"]);
        assert_eq!(diff.right.different, ["$.same2"]);
    }

    #[test]
    fn type_change_reports_container_and_children() {
        let cache = HashCache::default();
        let diff = flat_diff(&json!({"a": [1]}), &json!({"a": 1}), &cache).unwrap();
        assert_eq!(diff.left.different, ["$.a"]);
        assert_eq!(diff.left.missing, ["$.a.[0]"]);
        assert_eq!(diff.right.different, ["$.a"]);
    }

    #[test]
    fn reordered_keys_are_not_a_difference() {
        let cache = HashCache::default();
        let diff = flat_diff(&json!({"x": {"a": 1, "b": 2}}), &json!({"x": {"b": 2, "a": 1}}), &cache).unwrap();
        assert!(diff.is_empty(), "{diff:?}");
    }

    #[test]
    fn integral_floats_equal_integers() {
        let cache = HashCache::default();
        let diff = flat_diff(&json!({"x": {"n": 1}}), &json!({"x": {"n": 1.0}}), &cache).unwrap();
        assert!(diff.is_empty(), "{diff:?}");
    }

    #[test]
    fn cancelled_scan_gives_up() {
        let cache = HashCache::default();
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(flat_diff_cancellable(&json!({"a": 1}), &json!({}), &cache, &cancel), Err(Cancelled));
        assert_eq!(flat_diff_cancellable(&json!(1), &json!({}), &cache, &cancel), Ok(None));
    }
}
