//! Tree normalizer.
//!
//! Flattens a JSON document into an ordered mapping from encoded path to a
//! comparable [`Leaf`]. Nested containers are represented twice: once as a
//! [`Leaf::Hash`] of their contents, and once through their descendants'
//! entries, which follow the container entry directly.
//!
//! Container hashes are combined bottom-up from the children's digests.
//! Object members are combined in key order, so two objects that differ only
//! in key order hash identically, and numbers are digested in the form
//! [`strict_equals`] compares them.

use indexmap::IndexMap;
use serde_json::{Number, Value};

use crate::hash::{hash_bytes, to_hex, HashCache, HashCode};
use crate::path::{escape_key, join_index, join_key, ROOT};
use crate::task::{checkpoint, CancellationToken};
use crate::value::strict_equals;
use crate::Cancelled;

const OBJECT_TAG: &str = "object:";
const ARRAY_TAG: &str = "array:";

/// Comparable value stored for one path.
#[derive(Clone, Debug, PartialEq)]
pub enum Leaf {
    /// A primitive JSON value.
    Value(Value),
    /// Hash of a nested container's contents.
    Hash(HashCode),
}

impl Leaf {
    /// Compares two leaves using strict primitive equality.
    ///
    /// ```
    /// # use jsoncompare_core::Leaf;
    /// # use serde_json::json;
    /// assert!(Leaf::Value(json!(1)).same_as(&Leaf::Value(json!(1.0))));
    /// assert!(!Leaf::Value(json!(1)).same_as(&Leaf::Hash([0; 8])));
    /// ```
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Value(a), Self::Value(b)) => strict_equals(a, b),
            (Self::Hash(a), Self::Hash(b)) => a == b,
            _ => false,
        }
    }

    /// Reports whether this leaf stands in for a nested container.
    #[must_use]
    pub fn is_hash(&self) -> bool {
        matches!(self, Self::Hash(_))
    }
}

/// Ordered path → leaf mapping produced by [`normalize`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Normalized {
    entries: IndexMap<String, Leaf>,
}

impl Normalized {
    /// Returns the leaf stored for `path`.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Leaf> {
        self.entries.get(path)
    }

    /// Reports whether `path` is present.
    #[must_use]
    pub fn contains_key(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Indicates whether the mapping is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in document order.
    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Leaf> {
        self.entries.iter()
    }

    /// Iterates paths in document order.
    pub fn keys(&self) -> indexmap::map::Keys<'_, String, Leaf> {
        self.entries.keys()
    }
}

impl<'a> IntoIterator for &'a Normalized {
    type Item = (&'a String, &'a Leaf);
    type IntoIter = indexmap::map::Iter<'a, String, Leaf>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Normalizes `value` rooted at `$`.
///
/// ```
/// # use jsoncompare_core::{normalize, HashCache, Leaf};
/// # use serde_json::json;
/// let cache = HashCache::default();
/// let flat = normalize(&json!({"a": {"b": 1}, "c.d": [true]}), &cache);
/// let paths: Vec<_> = flat.keys().cloned().collect();
/// assert_eq!(paths, ["$.a", "$.a.b", "$.\"c.d\"", "$.\"c.d\".[0]"]);
/// assert_eq!(flat.get("$.a.b"), Some(&Leaf::Value(json!(1))));
/// assert!(flat.get("$.a").unwrap().is_hash());
/// ```
#[must_use]
pub fn normalize(value: &Value, cache: &HashCache) -> Normalized {
    normalize_at(value, ROOT, cache)
}

/// Normalizes `value` with entries rooted at `root` instead of `$`.
///
/// A trailing `.` on `root` is ignored. Non-container values normalize to an
/// empty mapping.
#[must_use]
pub fn normalize_at(value: &Value, root: &str, cache: &HashCache) -> Normalized {
    // Without a token the walk cannot be interrupted.
    flatten(value, root, cache, None).unwrap_or_default()
}

/// [`normalize`] that checks `cancel` at every container.
pub fn normalize_cancellable(
    value: &Value,
    cache: &HashCache,
    cancel: &CancellationToken,
) -> Result<Normalized, Cancelled> {
    flatten(value, ROOT, cache, Some(cancel))
}

/// Hash of a container's contents, memoized through `cache`.
///
/// Objects and arrays are tagged separately so `{}` and `[]` hash differently.
///
/// ```
/// # use jsoncompare_core::{subtree_hash, HashCache};
/// # use serde_json::json;
/// let cache = HashCache::default();
/// assert_eq!(subtree_hash(&json!({"a": 1, "b": 2.0}), &cache), subtree_hash(&json!({"b": 2, "a": 1}), &cache));
/// assert!(subtree_hash(&json!("leaf"), &cache).is_none());
/// ```
#[must_use]
pub fn subtree_hash(value: &Value, cache: &HashCache) -> Option<HashCode> {
    if !matches!(value, Value::Object(_) | Value::Array(_)) {
        return None;
    }
    let mut walker = Walker { cache, cancel: None, entries: None };
    walker.visit(value, ROOT).ok()
}

fn flatten(
    value: &Value,
    root: &str,
    cache: &HashCache,
    cancel: Option<&CancellationToken>,
) -> Result<Normalized, Cancelled> {
    let root = root.strip_suffix('.').unwrap_or(root);
    let mut walker = Walker { cache, cancel, entries: Some(IndexMap::new()) };
    walker.visit(value, root)?;
    Ok(Normalized { entries: walker.entries.unwrap_or_default() })
}

struct Walker<'a> {
    cache: &'a HashCache,
    cancel: Option<&'a CancellationToken>,
    // `None` when only the hash is wanted.
    entries: Option<IndexMap<String, Leaf>>,
}

impl Walker<'_> {
    /// Records the children of `value` under `path` and returns its digest.
    fn visit(&mut self, value: &Value, path: &str) -> Result<HashCode, Cancelled> {
        match value {
            Value::Object(map) => {
                checkpoint(self.cancel)?;
                let mut members = Vec::with_capacity(map.len());
                for (key, child) in map {
                    let digest = self.child(child, join_key(path, key))?;
                    members.push((key.as_str(), digest));
                }
                members.sort_unstable_by(|a, b| a.0.cmp(b.0));
                let mut combined = String::from(OBJECT_TAG);
                for (key, digest) in members {
                    combined.push_str(&format!("\"{}\"={};", escape_key(key), to_hex(&digest)));
                }
                Ok(self.cache.hash(&combined))
            }
            Value::Array(items) => {
                checkpoint(self.cancel)?;
                let mut combined = String::from(ARRAY_TAG);
                for (index, child) in items.iter().enumerate() {
                    let digest = self.child(child, join_index(path, index))?;
                    combined.push_str(&to_hex(&digest));
                    combined.push(';');
                }
                Ok(self.cache.hash(&combined))
            }
            primitive => Ok(primitive_digest(primitive)),
        }
    }

    fn child(&mut self, child: &Value, path: String) -> Result<HashCode, Cancelled> {
        if !matches!(child, Value::Object(_) | Value::Array(_)) {
            if let Some(entries) = self.entries.as_mut() {
                entries.insert(path, Leaf::Value(child.clone()));
            }
            return Ok(primitive_digest(child));
        }
        // The container's entry precedes its descendants; its hash is filled
        // in once they are done.
        let slot = self.entries.as_mut().map(|entries| entries.insert_full(path.clone(), Leaf::Hash([0; 8])).0);
        let digest = self.visit(child, &path)?;
        if let (Some(entries), Some(slot)) = (self.entries.as_mut(), slot) {
            entries[slot] = Leaf::Hash(digest);
        }
        Ok(digest)
    }
}

fn primitive_digest(value: &Value) -> HashCode {
    let text = match value {
        Value::Null => "null".to_owned(),
        Value::Bool(flag) => format!("bool:{flag}"),
        Value::Number(number) => format!("number:{}", canonical_number(number)),
        Value::String(text) => format!("string:{text}"),
        Value::Array(_) | Value::Object(_) => String::new(),
    };
    hash_bytes(text.as_bytes())
}

/// Renders numbers that compare equal under [`strict_equals`] identically:
/// integral floats are written as integers.
fn canonical_number(number: &Number) -> String {
    if let Some(int) = number.as_i64() {
        return int.to_string();
    }
    if let Some(int) = number.as_u64() {
        return int.to_string();
    }
    match number.as_f64() {
        Some(float) if float.fract() == 0.0 && float.abs() < 9.0e18 => (float as i64).to_string(),
        Some(float) => float.to_string(),
        None => number.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn primitives_normalize_to_nothing() {
        let cache = HashCache::default();
        assert!(normalize(&json!(42), &cache).is_empty());
        assert!(normalize(&json!("x"), &cache).is_empty());
    }

    #[test]
    fn empty_containers_have_no_entries_but_are_hashed_by_parent() {
        let cache = HashCache::default();
        assert!(normalize(&json!({}), &cache).is_empty());
        let flat = normalize(&json!({"a": {}, "b": []}), &cache);
        assert_eq!(flat.len(), 2);
        assert_ne!(flat.get("$.a"), flat.get("$.b"));
    }

    #[test]
    fn custom_root_prefixes_every_path() {
        let cache = HashCache::default();
        let flat = normalize_at(&json!([{"k": 1}]), "$.items.", &cache);
        let paths: Vec<_> = flat.keys().cloned().collect();
        assert_eq!(paths, ["$.items.[0]", "$.items.[0].k"]);
    }

    #[test]
    fn quotes_are_escaped_in_keys() {
        let cache = HashCache::default();
        let flat = normalize(&json!({"it's": 1, "a.\"b\"": 2}), &cache);
        let paths: Vec<_> = flat.keys().cloned().collect();
        assert_eq!(paths, ["$.it\\'s", "$.\"a.\\\"b\\\"\""]);
    }

    #[test]
    fn equal_subtrees_hash_identically_wherever_they_live() {
        let cache = HashCache::default();
        let flat = normalize(&json!({"x": {"n": [1, 2]}, "y": {"n": [1, 2]}}), &cache);
        assert_eq!(flat.get("$.x"), flat.get("$.y"));
        assert_eq!(flat.get("$.x.n"), flat.get("$.y.n"));
        assert_eq!(subtree_hash(&json!({"n": [1, 2]}), &cache).map(Leaf::Hash).as_ref(), flat.get("$.x"));
    }

    #[test]
    fn normalization_is_deterministic() {
        let cache = HashCache::new(1);
        let doc = json!({"a": [1, {"b": null}], "c": {"d": "e"}});
        assert_eq!(normalize(&doc, &cache), normalize(&doc, &HashCache::default()));
    }

    #[test]
    fn decoded_paths_match_keys() {
        let cache = HashCache::default();
        let doc = json!({"a.b": {"c'd": [0, {"": 1}]}});
        for path in normalize(&doc, &cache).keys() {
            assert_eq!(&crate::Path::decode(path).encode(), path);
        }
    }

    #[test]
    fn key_order_does_not_change_container_hashes() {
        let cache = HashCache::default();
        let lhs = normalize(&json!({"x": {"a": 1, "b": [2, {"c": 3, "d": 4}]}}), &cache);
        let rhs = normalize(&json!({"x": {"b": [2, {"d": 4, "c": 3}], "a": 1}}), &cache);
        assert_eq!(lhs.get("$.x"), rhs.get("$.x"));
        assert_eq!(lhs.get("$.x.b"), rhs.get("$.x.b"));
    }

    #[test]
    fn array_order_still_matters() {
        let cache = HashCache::default();
        assert_ne!(subtree_hash(&json!([1, 2]), &cache), subtree_hash(&json!([2, 1]), &cache));
    }

    #[test]
    fn numerically_equal_numbers_hash_identically() {
        let cache = HashCache::default();
        assert_eq!(subtree_hash(&json!({"n": 1}), &cache), subtree_hash(&json!({"n": 1.0}), &cache));
        assert_eq!(subtree_hash(&json!([-0.0]), &cache), subtree_hash(&json!([0]), &cache));
        assert_ne!(subtree_hash(&json!({"n": 1}), &cache), subtree_hash(&json!({"n": 1.5}), &cache));
        assert_ne!(subtree_hash(&json!({"n": 1}), &cache), subtree_hash(&json!({"n": "1"}), &cache));
    }

    #[test]
    fn cancelled_normalization_gives_up() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let cache = HashCache::default();
        assert_eq!(normalize_cancellable(&json!({"a": [1]}), &cache, &cancel), Err(Cancelled));
        assert_eq!(normalize_cancellable(&json!({"a": [1]}), &cache, &CancellationToken::new()).map(|n| n.len()), Ok(2));
    }
}
