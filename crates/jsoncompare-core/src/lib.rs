//! Structural JSON comparison with navigable differences.
//!
//! `jsoncompare-core` diffs two JSON documents path by path, collapses the
//! result into a list of stops that can be stepped through, and runs the work
//! on cancellable background tasks so an interactive caller never observes a
//! stale result.
//!
//! ```
//! use jsoncompare_core::{reduce, structural_diff, Path};
//! use serde_json::json;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let before = json!({"name": "jcmp", "tags": ["a"]});
//!     let after = json!({"name": "jcmp", "tags": ["a", "b"], "v": 2});
//!
//!     let diff = structural_diff(&before, &after)?;
//!     assert_eq!(diff.right.extra, ["$.tags.[1]", "$.v"]);
//!
//!     let stops = reduce(&diff);
//!     assert_eq!(stops.len(), 2);
//!
//!     let path = Path::decode(&diff.right.extra[0]);
//!     assert_eq!(path.editor_segments(), ["tags", "1"]);
//!     Ok(())
//! }
//! ```
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod collab;
pub mod diff;
mod error;
mod hash;
mod normalize;
mod options;
pub mod path;
pub mod session;
mod sort;
pub mod task;
mod unique;
mod value;

pub use collab::{
    ComparisonData, ComparisonRecord, ComparisonSide, ComparisonStore, Editor, EditorContent, EditorMode, MemoryEditor,
    MemoryStore,
};
pub use diff::{
    compare, compare_cancellable, flat_diff, flat_diff_cancellable, structural_diff, structural_diff_cancellable,
    Algorithm, Classification, Difference, JsonDiff, Side,
};
pub use error::{Cancelled, DiffError, EditorError, OptionsError, ParseError, SessionError, StoreError, TaskError};
pub use hash::{hash_bytes, HashCache, HashCode, DEFAULT_HASH_CACHE_CAPACITY};
pub use normalize::{normalize, normalize_at, normalize_cancellable, subtree_hash, Leaf, Normalized};
pub use options::EngineConfig;
pub use path::{Path, PathSegment};
pub use session::Session;
pub use sort::{sort_value, sort_value_cancellable, SortOptions};
pub use task::{CancellationToken, Pending, Task, TaskStatus};
pub use unique::{reduce, UniqueDiffEntry, UniqueDiffs};
pub use value::{is_container, kind_name, parse_document, strict_equals, Format};

/// Returns the semantic version of the `jsoncompare-core` crate.
///
/// ```
/// assert!(!jsoncompare_core::version().is_empty());
/// ```
#[must_use]
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
