//! Widget tree model and diff engine.
//!
//! A [`WidgetNode`] is an immutable description of one UI element. The diff
//! engine compares two snapshots of a tree and produces a [`WidgetPatch`]: an
//! ordered list of [`PatchOp`]s that, replayed with [`apply_patch`] against the
//! earlier snapshot, reproduces the later one.
//!
//! ```
//! use chatwire_widget::{apply_patch, diff, WidgetNode};
//!
//! let before = WidgetNode::new("Card").with_child(WidgetNode::new("Text").with_attr("value", "hi"));
//! let after = WidgetNode::new("Card").with_child(WidgetNode::new("Text").with_attr("value", "hello"));
//!
//! let patch = diff(Some(&before), &after);
//! assert_eq!(apply_patch(Some(&before), &patch).unwrap(), after);
//! ```

mod apply;
mod diff;
mod error;
mod node;
mod op;
mod path;

pub use apply::apply_patch;
pub use diff::diff;
pub use error::{WidgetError, WidgetResult};
pub use node::WidgetNode;
pub use op::{PatchOp, WidgetPatch};
pub use path::NodePath;
