//! Contracts for the editor widget and the comparison store.
//!
//! The engine only calls into these; it never owns editor state or manages
//! persistence. [`MemoryEditor`] and [`MemoryStore`] are plain in-process
//! implementations used by the CLI and the tests.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::{EditorError, StoreError};

/// How an editor currently presents its document.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditorMode {
    /// Collapsible tree view; supports focusing a location.
    #[default]
    Tree,
    /// Raw text view.
    Text,
}

/// Document held by an editor.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum EditorContent {
    /// Parsed JSON.
    Json(Value),
    /// Raw text, possibly malformed.
    Text(String),
    /// Nothing loaded.
    #[default]
    Empty,
}

impl EditorContent {
    /// Returns the JSON value, parsing text content on demand.
    ///
    /// Malformed text yields `None`; the parse error is logged and otherwise
    /// ignored.
    ///
    /// ```
    /// # use jsoncompare_core::EditorContent;
    /// assert!(EditorContent::Text("[1, 2]".into()).to_json().is_some());
    /// assert!(EditorContent::Text("[1, 2".into()).to_json().is_none());
    /// ```
    #[must_use]
    pub fn to_json(&self) -> Option<Value> {
        match self {
            Self::Json(value) => Some(value.clone()),
            Self::Text(text) => match serde_json::from_str(text) {
                Ok(value) => Some(value),
                Err(err) => {
                    debug!(error = %err, "ignoring malformed editor text");
                    None
                }
            },
            Self::Empty => None,
        }
    }
}

/// Tree/text editor widget.
pub trait Editor {
    /// Current document.
    fn get(&self) -> EditorContent;

    /// Replaces the document.
    fn set(&mut self, content: EditorContent) -> Result<(), EditorError>;

    /// Current presentation mode.
    fn mode(&self) -> EditorMode {
        EditorMode::Tree
    }

    /// Moves keyboard focus into the editor.
    fn focus(&mut self) -> Result<(), EditorError>;

    /// Expands every node whose segments satisfy `predicate`.
    fn expand(&mut self, predicate: &dyn Fn(&[String]) -> bool);

    /// Scrolls the node at `segments` into view.
    fn scroll_to(&mut self, segments: &[String]) -> Result<(), EditorError>;

    /// Reports whether a node is rendered at `segments`.
    fn find_element(&self, segments: &[String]) -> bool;
}

/// In-memory [`Editor`] that records the calls made on it.
#[derive(Clone, Debug, Default)]
pub struct MemoryEditor {
    content: EditorContent,
    mode: EditorMode,
    focus_count: usize,
    expanded: Vec<Vec<String>>,
    scrolled_to: Option<Vec<String>>,
}

impl MemoryEditor {
    /// Creates an editor holding `content`.
    #[must_use]
    pub fn new(content: EditorContent) -> Self {
        Self { content, ..Self::default() }
    }

    /// Creates an editor holding parsed JSON.
    #[must_use]
    pub fn with_json(value: Value) -> Self {
        Self::new(EditorContent::Json(value))
    }

    /// Switches the presentation mode.
    #[must_use]
    pub fn with_mode(mut self, mode: EditorMode) -> Self {
        self.mode = mode;
        self
    }

    /// Number of times [`Editor::focus`] was called.
    #[must_use]
    pub fn focus_count(&self) -> usize {
        self.focus_count
    }

    /// Container nodes expanded so far, in document order per call.
    #[must_use]
    pub fn expanded(&self) -> &[Vec<String>] {
        &self.expanded
    }

    /// Target of the last successful [`Editor::scroll_to`].
    #[must_use]
    pub fn scrolled_to(&self) -> Option<&[String]> {
        self.scrolled_to.as_deref()
    }

    fn lookup(&self, segments: &[String]) -> Option<Value> {
        let mut current = self.content.to_json()?;
        for segment in segments {
            current = match current {
                Value::Object(mut map) => map.remove(segment)?,
                Value::Array(mut items) => {
                    let index: usize = segment.parse().ok()?;
                    if index >= items.len() {
                        return None;
                    }
                    items.swap_remove(index)
                }
                _ => return None,
            };
        }
        Some(current)
    }
}

fn collect_containers(value: &Value, prefix: &mut Vec<String>, out: &mut Vec<Vec<String>>) {
    let children: Vec<(String, &Value)> = match value {
        Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
        Value::Array(items) => items.iter().enumerate().map(|(i, v)| (i.to_string(), v)).collect(),
        _ => return,
    };
    out.push(prefix.clone());
    for (segment, child) in children {
        prefix.push(segment);
        collect_containers(child, prefix, out);
        prefix.pop();
    }
}

impl Editor for MemoryEditor {
    fn get(&self) -> EditorContent {
        self.content.clone()
    }

    fn set(&mut self, content: EditorContent) -> Result<(), EditorError> {
        self.content = content;
        Ok(())
    }

    fn mode(&self) -> EditorMode {
        self.mode
    }

    fn focus(&mut self) -> Result<(), EditorError> {
        self.focus_count += 1;
        Ok(())
    }

    fn expand(&mut self, predicate: &dyn Fn(&[String]) -> bool) {
        let Some(document) = self.content.to_json() else {
            return;
        };
        let mut containers = Vec::new();
        collect_containers(&document, &mut Vec::new(), &mut containers);
        self.expanded.extend(containers.into_iter().filter(|segments| predicate(segments)));
    }

    fn scroll_to(&mut self, segments: &[String]) -> Result<(), EditorError> {
        if self.lookup(segments).is_none() {
            return Err(EditorError::Failed(format!("no node at /{}", segments.join("/"))));
        }
        self.scrolled_to = Some(segments.to_vec());
        Ok(())
    }

    fn find_element(&self, segments: &[String]) -> bool {
        self.lookup(segments).is_some()
    }
}

/// One pane of a saved comparison.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComparisonSide {
    /// Pane title.
    pub title: String,
    /// Pane document.
    pub data: Value,
}

/// Both panes of a saved comparison.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComparisonData {
    /// Left pane.
    pub json_left: ComparisonSide,
    /// Right pane.
    pub json_right: ComparisonSide,
}

/// Saved comparison, keyed by an integer id in a [`ComparisonStore`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRecord {
    /// Display title, `"<left> vs <right>"` when saved by a session.
    pub title: String,
    /// Pane titles and documents.
    pub data: ComparisonData,
}

/// CRUD storage for saved comparisons.
pub trait ComparisonStore {
    /// Loads a record.
    fn get(&self, id: u64) -> Result<ComparisonRecord, StoreError>;

    /// Inserts a record and returns its new id.
    fn put(&mut self, record: ComparisonRecord) -> Result<u64, StoreError>;

    /// Replaces an existing record.
    fn update(&mut self, id: u64, record: ComparisonRecord) -> Result<(), StoreError>;

    /// Removes a record.
    fn delete(&mut self, id: u64) -> Result<(), StoreError>;

    /// Lists all records ordered by id.
    fn list(&self) -> Result<Vec<(u64, ComparisonRecord)>, StoreError>;
}

/// [`ComparisonStore`] backed by a map; serializable so it can be persisted
/// as a JSON file.
///
/// ```
/// # use jsoncompare_core::{ComparisonStore, MemoryStore};
/// let store = MemoryStore::default();
/// assert!(store.list()?.is_empty());
/// # Ok::<(), jsoncompare_core::StoreError>(())
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStore {
    next_id: u64,
    records: BTreeMap<u64, ComparisonRecord>,
}

impl ComparisonStore for MemoryStore {
    fn get(&self, id: u64) -> Result<ComparisonRecord, StoreError> {
        self.records.get(&id).cloned().ok_or(StoreError::NotFound { id })
    }

    fn put(&mut self, record: ComparisonRecord) -> Result<u64, StoreError> {
        // Ids start at 1 and are never reused.
        self.next_id += 1;
        self.records.insert(self.next_id, record);
        Ok(self.next_id)
    }

    fn update(&mut self, id: u64, record: ComparisonRecord) -> Result<(), StoreError> {
        match self.records.get_mut(&id) {
            Some(slot) => {
                *slot = record;
                Ok(())
            }
            None => Err(StoreError::NotFound { id }),
        }
    }

    fn delete(&mut self, id: u64) -> Result<(), StoreError> {
        self.records.remove(&id).map(|_| ()).ok_or(StoreError::NotFound { id })
    }

    fn list(&self) -> Result<Vec<(u64, ComparisonRecord)>, StoreError> {
        Ok(self.records.iter().map(|(id, record)| (*id, record.clone())).collect())
    }
}
