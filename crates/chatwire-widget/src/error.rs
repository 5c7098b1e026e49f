//! Errors raised while replaying a widget patch.

use crate::NodePath;
use thiserror::Error;

/// Result type alias for widget operations.
pub type WidgetResult<T> = Result<T, WidgetError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WidgetError {
    /// A non-root operation was replayed without a tree to apply it to.
    #[error("patch requires an existing root")]
    MissingRoot,

    /// `insert_root` was replayed on top of an existing tree.
    #[error("root already present")]
    RootAlreadyPresent,

    /// A child index along a path or at an insertion point does not exist.
    #[error("index {index} out of bounds (len: {len}) at {path}")]
    IndexOutOfBounds {
        /// Parent node whose children were indexed.
        path: NodePath,
        /// Offending index.
        index: usize,
        /// Number of children present.
        len: usize,
    },

    /// A reorder permutation does not cover the parent's children exactly once.
    #[error("invalid reorder at {path}: {reason}")]
    InvalidReorder { path: NodePath, reason: String },

    /// A remove targeted a child whose stable key differs from the recorded one.
    #[error("key mismatch at {path}[{index}]: expected {expected:?}, found {found:?}")]
    KeyMismatch {
        path: NodePath,
        index: usize,
        expected: String,
        found: Option<String>,
    },
}
