//! Comparison session: the state behind a two-pane compare view.
//!
//! A [`Session`] owns the background tasks for diffing, reducing and sorting,
//! the latest [`Difference`], and the navigation cursor over its
//! [`UniqueDiffs`]. Editors and storage are passed in per call.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::collab::{ComparisonData, ComparisonRecord, ComparisonSide, ComparisonStore, Editor, EditorContent, EditorMode};
use crate::task::{checkpoint, CancellationToken, Pending, Task};
use crate::{
    compare_cancellable, reduce, sort_value_cancellable, Algorithm, Classification, Difference, EditorError,
    EngineConfig, HashCache, Path, SessionError, Side, SortOptions, TaskError, UniqueDiffEntry, UniqueDiffs,
};

/// Shortest accepted pane title, in characters.
pub const MIN_TITLE_LEN: usize = 3;
/// Longest accepted pane title, in characters.
pub const MAX_TITLE_LEN: usize = 30;

const DEFAULT_LEFT_TITLE: &str = "Sample 1";
const DEFAULT_RIGHT_TITLE: &str = "Sample 2";

type DiffTask = Task<(Arc<HashCache>, Algorithm), (Value, Value), Option<Difference>>;
type SortTask = Task<SortOptions, Value, Value>;

/// Interactive comparison of two editor panes.
///
/// ```
/// use jsoncompare_core::{EngineConfig, MemoryEditor, Session};
/// use serde_json::json;
///
/// let config = EngineConfig::default().with_debounce(std::time::Duration::ZERO)?;
/// let mut session = Session::new(config);
/// let left = MemoryEditor::with_json(json!({"a": 1, "b": [1, 2]}));
/// let right = MemoryEditor::with_json(json!({"a": 2, "b": [1, 2, 3]}));
///
/// session.on_change(&left, &right);
/// session.settle();
/// assert_eq!(session.unique_diffs().len(), 2);
/// assert_eq!(session.next().and_then(|e| e.path_right).as_deref(), Some("$.b.[2]"));
/// # Ok::<(), jsoncompare_core::OptionsError>(())
/// ```
#[derive(Debug)]
pub struct Session {
    config: EngineConfig,
    diff_task: DiffTask,
    unique_task: Task<(), Difference, UniqueDiffs>,
    left_sort: SortTask,
    right_sort: SortTask,
    pending: Option<Pending<Option<Difference>>>,
    difference: Option<Difference>,
    unique: UniqueDiffs,
    left_title: String,
    right_title: String,
    assigned_id: Option<u64>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Session {
    /// Creates an idle session.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        let cache = Arc::new(HashCache::new(config.hash_cache_capacity()));
        let diff_task = Task::with_deps(
            (cache, config.algorithm()),
            |(cache, algorithm): &(Arc<HashCache>, Algorithm), (lhs, rhs): (Value, Value), cancel: &CancellationToken| {
                compare_cancellable(&lhs, &rhs, *algorithm, cache, cancel)
            },
        )
        .with_name("diff");
        let unique_task = Task::new(|diff: Difference, cancel: &CancellationToken| {
            checkpoint(Some(cancel)).map(|()| reduce(&diff))
        })
        .with_name("unique");
        let sort = |options: &SortOptions, value: Value, cancel: &CancellationToken| {
            sort_value_cancellable(&value, *options, cancel)
        };
        let left_sort = Task::with_deps(config.sort_options(), sort).with_name("sort-left");
        let right_sort = Task::with_deps(config.sort_options(), sort).with_name("sort-right");

        Self {
            config,
            diff_task,
            unique_task,
            left_sort,
            right_sort,
            pending: None,
            difference: None,
            unique: UniqueDiffs::default(),
            left_title: DEFAULT_LEFT_TITLE.to_owned(),
            right_title: DEFAULT_RIGHT_TITLE.to_owned(),
            assigned_id: None,
        }
    }

    /// Configuration this session was created with.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Latest settled difference, if any.
    #[must_use]
    pub fn difference(&self) -> Option<&Difference> {
        self.difference.as_ref()
    }

    /// Navigable differences derived from [`difference`](Self::difference).
    #[must_use]
    pub fn unique_diffs(&self) -> &UniqueDiffs {
        &self.unique
    }

    /// Pane titles.
    #[must_use]
    pub fn titles(&self) -> (&str, &str) {
        (&self.left_title, &self.right_title)
    }

    /// Replaces the pane titles. They are validated on [`save`](Self::save).
    pub fn set_titles(&mut self, left: impl Into<String>, right: impl Into<String>) {
        self.left_title = left.into();
        self.right_title = right.into();
    }

    /// Id of the stored comparison this session was loaded from or saved to.
    #[must_use]
    pub fn assigned_id(&self) -> Option<u64> {
        self.assigned_id
    }

    /// Binds the session to a stored record, or unbinds it with `None`, so the
    /// next [`save`](Self::save) updates that record instead of adding one.
    pub fn assign_id(&mut self, id: Option<u64>) {
        self.assigned_id = id;
    }

    /// Reacts to an edit in either pane.
    ///
    /// Restarts the debounced diff when both panes hold valid JSON; otherwise
    /// cancels any in-flight diff and clears the current difference.
    pub fn on_change(&mut self, left: &dyn Editor, right: &dyn Editor) {
        match (left.get().to_json(), right.get().to_json()) {
            (Some(lhs), Some(rhs)) => {
                debug!("scheduling diff");
                self.unique_task.kill();
                self.pending = Some(self.diff_task.invoke_after(self.config.debounce(), (lhs, rhs)));
            }
            _ => {
                debug!("a pane has no valid JSON, clearing difference");
                self.diff_task.kill();
                self.pending = None;
                self.clear();
            }
        }
    }

    /// Waits for the scheduled diff, then reduces it into navigable entries.
    ///
    /// A failed diff leaves the session without a difference. Returns the
    /// difference now in effect.
    pub fn settle(&mut self) -> Option<&Difference> {
        if let Some(pending) = self.pending.take() {
            match pending.wait() {
                Ok(Some(diff)) => self.apply(diff),
                Ok(None) => self.clear(),
                Err(TaskError::Cancelled) => debug!("diff was superseded"),
                Err(err) => {
                    warn!(error = %err, "diff failed, no difference available");
                    self.clear();
                }
            }
        }
        self.difference.as_ref()
    }

    fn apply(&mut self, diff: Difference) {
        match self.unique_task.invoke(diff.clone()).wait() {
            Ok(unique) => {
                info!(differences = unique.len(), "difference updated");
                self.unique = unique;
            }
            Err(err) => {
                warn!(error = %err, "failed to reduce difference");
                self.unique = UniqueDiffs::default();
            }
        }
        self.difference = Some(diff);
    }

    fn clear(&mut self) {
        self.difference = None;
        self.unique = UniqueDiffs::default();
    }

    /// Advances to the next difference, wrapping around.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<UniqueDiffEntry> {
        self.unique.next().cloned()
    }

    /// Steps back to the previous difference, wrapping around.
    pub fn previous(&mut self) -> Option<UniqueDiffEntry> {
        self.unique.previous().cloned()
    }

    /// Brings `entry` into view in each pane that has a path for it.
    ///
    /// Panes in text mode are skipped.
    pub fn focus(
        &self,
        entry: &UniqueDiffEntry,
        left: &mut dyn Editor,
        right: &mut dyn Editor,
    ) -> Result<(), SessionError> {
        if let Some(path) = &entry.path_left {
            focus_pane(Side::Left, path, left)?;
        }
        if let Some(path) = &entry.path_right {
            focus_pane(Side::Right, path, right)?;
        }
        Ok(())
    }

    /// Classifies a rendered location in one pane.
    #[must_use]
    pub fn classify(&self, side: Side, path: &Path) -> Classification {
        self.difference.as_ref().map_or(Classification::Unchanged, |diff| diff.classify(side, path))
    }

    /// Sorts one pane's document and writes it back in the pane's mode.
    ///
    /// Call [`on_change`](Self::on_change) afterwards to refresh the diff.
    pub fn sort_side(&self, side: Side, editor: &mut dyn Editor) -> Result<(), SessionError> {
        let value = editor.get().to_json().ok_or(SessionError::MissingContent { side })?;
        let task = match side {
            Side::Left => &self.left_sort,
            Side::Right => &self.right_sort,
        };
        let sorted = task.invoke(value).wait()?;
        let content = match editor.mode() {
            EditorMode::Text => EditorContent::Text(sorted.to_string()),
            EditorMode::Tree => EditorContent::Json(sorted),
        };
        editor.set(content)?;
        Ok(())
    }

    /// Loads a stored comparison into both panes and schedules a diff.
    pub fn load(
        &mut self,
        store: &dyn ComparisonStore,
        id: u64,
        left: &mut dyn Editor,
        right: &mut dyn Editor,
    ) -> Result<(), SessionError> {
        let record = store.get(id)?;
        let ComparisonData { json_left, json_right } = record.data;
        left.set(EditorContent::Json(json_left.data))?;
        right.set(EditorContent::Json(json_right.data))?;
        self.left_title = json_left.title;
        self.right_title = json_right.title;
        self.assigned_id = Some(id);
        info!(id, title = %record.title, "loaded comparison");
        self.on_change(left, right);
        Ok(())
    }

    /// Stores both panes, updating the record this session is bound to or
    /// inserting a new one. Returns the record id.
    pub fn save(
        &mut self,
        store: &mut dyn ComparisonStore,
        left: &dyn Editor,
        right: &dyn Editor,
    ) -> Result<u64, SessionError> {
        self.validate_titles()?;
        let left_data = left.get().to_json().ok_or(SessionError::MissingContent { side: Side::Left })?;
        let right_data = right.get().to_json().ok_or(SessionError::MissingContent { side: Side::Right })?;
        let record = ComparisonRecord {
            title: format!("{} vs {}", self.left_title, self.right_title),
            data: ComparisonData {
                json_left: ComparisonSide { title: self.left_title.clone(), data: left_data },
                json_right: ComparisonSide { title: self.right_title.clone(), data: right_data },
            },
        };
        let id = match self.assigned_id {
            Some(id) => {
                store.update(id, record)?;
                id
            }
            None => {
                let id = store.put(record)?;
                self.assigned_id = Some(id);
                id
            }
        };
        info!(id, "saved comparison");
        Ok(id)
    }

    fn validate_titles(&self) -> Result<(), SessionError> {
        let left = self.left_title.chars().count();
        let right = self.right_title.chars().count();
        if left < MIN_TITLE_LEN {
            return Err(SessionError::TitleTooShort { side: Side::Left });
        }
        if right < MIN_TITLE_LEN {
            return Err(SessionError::TitleTooShort { side: Side::Right });
        }
        if left > MAX_TITLE_LEN {
            return Err(SessionError::TitleTooLong { side: Side::Left });
        }
        if right > MAX_TITLE_LEN {
            return Err(SessionError::TitleTooLong { side: Side::Right });
        }
        Ok(())
    }
}

fn focus_pane(side: Side, path: &str, editor: &mut dyn Editor) -> Result<(), EditorError> {
    if editor.mode() != EditorMode::Tree {
        debug!(%side, "pane is not in tree mode, skipping focus");
        return Ok(());
    }
    let target = Path::decode(path).editor_segments();
    editor.focus()?;
    editor.expand(&|segments: &[String]| target.starts_with(segments));
    editor.scroll_to(&target)?;
    if !editor.find_element(&target) {
        debug!(%side, path, "focused location is not rendered");
    }
    Ok(())
}
