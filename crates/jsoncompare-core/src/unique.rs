//! Navigable list of unique differences.

use serde::{Deserialize, Serialize};

use crate::Difference;

/// One navigable difference.
///
/// At least one of the two paths is set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueDiffEntry {
    /// Location in the left document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_left: Option<String>,
    /// Location in the right document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_right: Option<String>,
}

impl UniqueDiffEntry {
    /// A change present at the same location on both sides.
    #[must_use]
    pub fn paired(path: impl Into<String>) -> Self {
        let path = path.into();
        Self { path_left: Some(path.clone()), path_right: Some(path) }
    }

    /// A location that only exists on the left.
    #[must_use]
    pub fn left_only(path: impl Into<String>) -> Self {
        Self { path_left: Some(path.into()), path_right: None }
    }

    /// A location that only exists on the right.
    #[must_use]
    pub fn right_only(path: impl Into<String>) -> Self {
        Self { path_left: None, path_right: Some(path.into()) }
    }
}

/// Ordered, deduplicated differences with a 1-based cursor.
///
/// The cursor is `0` when there is nothing to navigate and otherwise always
/// within `1..=len`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueDiffs {
    entries: Vec<UniqueDiffEntry>,
    index: usize,
}

impl UniqueDiffs {
    /// Wraps `entries` with the cursor on the first one.
    #[must_use]
    pub fn new(entries: Vec<UniqueDiffEntry>) -> Self {
        let index = usize::from(!entries.is_empty());
        Self { entries, index }
    }

    /// Returns all entries in navigation order.
    #[must_use]
    pub fn entries(&self) -> &[UniqueDiffEntry] {
        &self.entries
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Indicates whether there is nothing to navigate.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 1-based cursor position, `0` when empty.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Entry under the cursor.
    #[must_use]
    pub fn current(&self) -> Option<&UniqueDiffEntry> {
        self.index.checked_sub(1).and_then(|i| self.entries.get(i))
    }

    /// Advances the cursor, wrapping from the last entry to the first.
    ///
    /// ```
    /// # use jsoncompare_core::{UniqueDiffEntry, UniqueDiffs};
    /// let mut diffs = UniqueDiffs::new(vec![
    ///     UniqueDiffEntry::paired("$.a"),
    ///     UniqueDiffEntry::left_only("$.b"),
    /// ]);
    /// assert_eq!(diffs.next().unwrap().path_left.as_deref(), Some("$.b"));
    /// assert_eq!(diffs.next().unwrap().path_left.as_deref(), Some("$.a"));
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<&UniqueDiffEntry> {
        if self.entries.is_empty() {
            return None;
        }
        self.index = if self.index >= self.entries.len() { 1 } else { self.index + 1 };
        self.current()
    }

    /// Moves the cursor back, wrapping from the first entry to the last.
    pub fn previous(&mut self) -> Option<&UniqueDiffEntry> {
        if self.entries.is_empty() {
            return None;
        }
        self.index = if self.index <= 1 { self.entries.len() } else { self.index - 1 };
        self.current()
    }
}

/// Collapses a [`Difference`] into navigable entries.
///
/// Every `left.different` path becomes a paired entry and every
/// `left.missing` path a left-only entry. A `right.extra` path becomes a
/// right-only entry unless another right-extra path is a string prefix of it,
/// so an added subtree is visited once. Among identical right-extra paths the
/// first is kept.
///
/// ```
/// # use jsoncompare_core::{reduce, Difference, JsonDiff};
/// let diff = Difference {
///     left: JsonDiff { missing: vec!["$.old".into()], ..JsonDiff::default() },
///     right: JsonDiff { extra: vec!["$.n".into(), "$.n.x".into()], ..JsonDiff::default() },
/// };
/// let unique = reduce(&diff);
/// assert_eq!(unique.len(), 2);
/// assert_eq!(unique.index(), 1);
/// ```
#[must_use]
pub fn reduce(diff: &Difference) -> UniqueDiffs {
    let mut entries = Vec::with_capacity(diff.left.different.len() + diff.left.missing.len());
    entries.extend(diff.left.different.iter().map(UniqueDiffEntry::paired));
    entries.extend(diff.left.missing.iter().map(UniqueDiffEntry::left_only));

    let extra = &diff.right.extra;
    for (position, path) in extra.iter().enumerate() {
        let shadowed = extra.iter().enumerate().any(|(other_position, other)| {
            if other == path {
                other_position < position
            } else {
                path.starts_with(other.as_str())
            }
        });
        if !shadowed {
            entries.push(UniqueDiffEntry::right_only(path));
        }
    }
    UniqueDiffs::new(entries)
}
