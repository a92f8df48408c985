use thiserror::Error;

use crate::Side;

/// Errors that can occur while parsing editor or file content into a JSON value.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The provided JSON input was invalid.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// The provided YAML input was invalid.
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Errors produced by the structural diff.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DiffError {
    /// The two top-level values were not both objects or both arrays.
    #[error("invalid input JSON: expected two objects or two arrays, got {left} and {right}")]
    InvalidInput {
        /// Kind of the left-hand value.
        left: &'static str,
        /// Kind of the right-hand value.
        right: &'static str,
    },
    /// The comparison observed its cancellation token and stopped early.
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

/// A long-running walk noticed its cancellation token and gave up.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("computation was cancelled")]
pub struct Cancelled;

/// Errors surfaced through a [`Pending`](crate::Pending) task result.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// The task function failed, panicked, or its worker could not be started.
    #[error("task execution failed: {message}")]
    Execution {
        /// The original error message.
        message: String,
    },
    /// The invocation was killed or superseded before it settled.
    #[error("task invocation was cancelled")]
    Cancelled,
}

/// Errors emitted when constructing an [`EngineConfig`](crate::EngineConfig).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OptionsError {
    /// The subtree hash cache must hold at least one entry.
    #[error("hash cache capacity must be greater than zero")]
    ZeroCacheCapacity,
}

/// Errors reported by an editor collaborator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EditorError {
    /// The editor refused or failed an operation.
    #[error("editor operation failed: {0}")]
    Failed(String),
}

/// Errors reported by a [`ComparisonStore`](crate::ComparisonStore).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No comparison is stored under the requested id.
    #[error("comparison {id} not found")]
    NotFound {
        /// The requested id.
        id: u64,
    },
    /// The storage backend failed.
    #[error("storage backend failed: {0}")]
    Backend(String),
}

/// Errors raised by [`Session`](crate::Session) operations that touch
/// collaborators.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A pane title is shorter than the allowed minimum.
    #[error("{side} title is too short")]
    TitleTooShort {
        /// The pane whose title was rejected.
        side: Side,
    },
    /// A pane title is longer than the allowed maximum.
    #[error("{side} title is too long")]
    TitleTooLong {
        /// The pane whose title was rejected.
        side: Side,
    },
    /// A pane holds no valid JSON document.
    #[error("{side} pane has no valid JSON content")]
    MissingContent {
        /// The pane without content.
        side: Side,
    },
    /// The storage collaborator failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The editor collaborator failed.
    #[error(transparent)]
    Editor(#[from] EditorError),
    /// A background task failed.
    #[error(transparent)]
    Task(#[from] TaskError),
}
