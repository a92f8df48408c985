//! Diff data structures and algorithms.
//!
//! Two algorithms produce the same [`Difference`] shape:
//! [`structural_diff`] walks both trees together and is the primary one;
//! [`flat_diff`] compares the normalized path → leaf mappings of each side.

mod flat;
mod structural;

pub use flat::{flat_diff, flat_diff_cancellable};
pub use structural::{structural_diff, structural_diff_cancellable};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::task::CancellationToken;
use crate::{DiffError, HashCache, Path};

/// Paths that differ from one side's perspective.
///
/// ```
/// # use jsoncompare_core::JsonDiff;
/// let diff = JsonDiff::default();
/// assert!(diff.is_empty());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonDiff {
    /// Same location, value or type mismatch.
    #[serde(default)]
    pub different: Vec<String>,
    /// Location exists only on this side.
    #[serde(default)]
    pub extra: Vec<String>,
    /// Location exists only on the other side.
    #[serde(default)]
    pub missing: Vec<String>,
}

impl JsonDiff {
    /// Indicates whether all three lists are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.different.is_empty() && self.extra.is_empty() && self.missing.is_empty()
    }

    /// Total number of recorded paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.different.len() + self.extra.len() + self.missing.len()
    }

    /// Classifies a rendered location against this side's lists.
    ///
    /// A location matches a list when the list holds the path itself or one of
    /// its descendants, so ancestors of a change are highlighted too. The root
    /// is never classified. `different` wins over `missing`, which wins over
    /// `extra`.
    ///
    /// ```
    /// # use jsoncompare_core::{Classification, JsonDiff, Path};
    /// let diff = JsonDiff { different: vec!["$.a.b".into()], ..JsonDiff::default() };
    /// assert_eq!(diff.classify(&Path::decode("$.a")), Classification::Different);
    /// assert_eq!(diff.classify(&Path::decode("$.ab")), Classification::Unchanged);
    /// ```
    #[must_use]
    pub fn classify(&self, path: &Path) -> Classification {
        if path.is_empty() {
            return Classification::Unchanged;
        }
        let target = path.encode();
        let covers = |list: &[String]| list.iter().any(|entry| is_same_or_descendant(entry, &target));
        if covers(&self.different) {
            Classification::Different
        } else if covers(&self.missing) {
            Classification::Missing
        } else if covers(&self.extra) {
            Classification::Extra
        } else {
            Classification::Unchanged
        }
    }
}

fn is_same_or_descendant(entry: &str, target: &str) -> bool {
    entry.strip_prefix(target).is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
}

/// Result of comparing two documents.
///
/// `left` is computed with the left document as the reference, `right` with
/// the right document. The two are not mirror images: algorithms report
/// omissions under `left.missing` and additions under `right.extra`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Difference {
    /// Left-hand perspective.
    pub left: JsonDiff,
    /// Right-hand perspective.
    pub right: JsonDiff,
}

impl Difference {
    /// Indicates whether no differences were recorded on either side.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.left.is_empty() && self.right.is_empty()
    }

    /// Returns one side's perspective.
    #[must_use]
    pub fn side(&self, side: Side) -> &JsonDiff {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    /// Classifies a rendered location on the given side.
    #[must_use]
    pub fn classify(&self, side: Side, path: &Path) -> Classification {
        self.side(side).classify(path)
    }

    pub(crate) fn record_different(&mut self, path: String) {
        self.left.different.push(path.clone());
        self.right.different.push(path);
    }
}

/// One of the two compared documents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// The left-hand document.
    Left,
    /// The right-hand document.
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => f.write_str("left"),
            Self::Right => f.write_str("right"),
        }
    }
}

/// Visual classification of a rendered location.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    /// The value differs from the other side.
    Different,
    /// The location is absent on the other side.
    Missing,
    /// The location was introduced on this side.
    Extra,
    /// Nothing to report.
    Unchanged,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Different => f.write_str("different"),
            Self::Missing => f.write_str("missing"),
            Self::Extra => f.write_str("extra"),
            Self::Unchanged => f.write_str("none"),
        }
    }
}

/// Selects the diff algorithm.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// Type-aware recursion over both trees.
    #[default]
    Structural,
    /// Normalize both trees, then compare path → leaf mappings.
    Flat,
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Structural => f.write_str("structural"),
            Self::Flat => f.write_str("flat"),
        }
    }
}

impl FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "structural" => Ok(Self::Structural),
            "flat" => Ok(Self::Flat),
            other => Err(format!("unknown diff algorithm: {other}")),
        }
    }
}

/// Runs the selected algorithm.
///
/// The structural algorithm rejects top-level values that are not both
/// objects or both arrays; the flat algorithm returns `Ok(None)` for
/// non-container input instead.
///
/// ```
/// # use jsoncompare_core::{compare, Algorithm, HashCache};
/// # use serde_json::json;
/// let cache = HashCache::default();
/// let diff = compare(&json!({"a": 1}), &json!({"a": 2}), Algorithm::Structural, &cache)?;
/// assert_eq!(diff.unwrap().left.different, ["$.a"]);
/// assert!(compare(&json!(1), &json!(2), Algorithm::Flat, &cache)?.is_none());
/// # Ok::<(), jsoncompare_core::DiffError>(())
/// ```
pub fn compare(
    lhs: &Value,
    rhs: &Value,
    algorithm: Algorithm,
    cache: &HashCache,
) -> Result<Option<Difference>, DiffError> {
    match algorithm {
        Algorithm::Structural => structural_diff(lhs, rhs).map(Some),
        Algorithm::Flat => Ok(flat_diff(lhs, rhs, cache)),
    }
}

/// [`compare`] that stops with [`DiffError::Cancelled`] once `cancel` fires.
pub fn compare_cancellable(
    lhs: &Value,
    rhs: &Value,
    algorithm: Algorithm,
    cache: &HashCache,
    cancel: &CancellationToken,
) -> Result<Option<Difference>, DiffError> {
    match algorithm {
        Algorithm::Structural => structural_diff_cancellable(lhs, rhs, cancel).map(Some),
        Algorithm::Flat => Ok(flat_diff_cancellable(lhs, rhs, cache, cancel)?),
    }
}
