//! Patch operations emitted by the diff engine.

use crate::{NodePath, WidgetNode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A single edit applied to a widget tree.
///
/// Paths are positional and refer to the tree as left by the preceding
/// operations of the same patch, so a patch must be replayed in order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PatchOp {
    /// Install a root where there was none.
    InsertRoot { node: WidgetNode },

    /// Insert `node` as the `index`-th child of `parent`, shifting later children right.
    Insert {
        parent: NodePath,
        index: usize,
        node: WidgetNode,
    },

    /// Remove the `index`-th child of `parent`.
    ///
    /// `key` records the stable key the removed child was known by, when it had one.
    Remove {
        parent: NodePath,
        index: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key: Option<String>,
    },

    /// Replace the subtree at `path` (kind or key changed).
    Replace { path: NodePath, node: WidgetNode },

    /// Change attributes of the node at `path`; only changed names are listed.
    UpdateAttributes {
        path: NodePath,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        set: BTreeMap<String, Value>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        unset: Vec<String>,
    },

    /// Permute the children of `parent`: new child `i` is old child `order[i]`.
    Reorder { parent: NodePath, order: Vec<usize> },
}

impl PatchOp {
    /// Name of the operation as it appears on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            PatchOp::InsertRoot { .. } => "insert_root",
            PatchOp::Insert { .. } => "insert",
            PatchOp::Remove { .. } => "remove",
            PatchOp::Replace { .. } => "replace",
            PatchOp::UpdateAttributes { .. } => "update_attributes",
            PatchOp::Reorder { .. } => "reorder",
        }
    }
}

/// Ordered edit sequence turning one widget tree into another.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WidgetPatch {
    ops: Vec<PatchOp>,
}

impl WidgetPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn ops(&self) -> &[PatchOp] {
        &self.ops
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PatchOp> {
        self.ops.iter()
    }

    pub(crate) fn push(&mut self, op: PatchOp) {
        self.ops.push(op);
    }
}

impl From<Vec<PatchOp>> for WidgetPatch {
    fn from(ops: Vec<PatchOp>) -> Self {
        Self { ops }
    }
}

impl IntoIterator for WidgetPatch {
    type Item = PatchOp;
    type IntoIter = std::vec::IntoIter<PatchOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}

impl<'a> IntoIterator for &'a WidgetPatch {
    type Item = &'a PatchOp;
    type IntoIter = std::slice::Iter<'a, PatchOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ops_are_tagged_by_name() {
        let op = PatchOp::Remove {
            parent: NodePath::root(),
            index: 1,
            key: Some("row-2".into()),
        };
        let value = serde_json::to_value(&op).unwrap();
        assert_eq!(
            value,
            json!({"op": "remove", "parent": [], "index": 1, "key": "row-2"})
        );
        assert_eq!(op.name(), "remove");
    }

    #[test]
    fn patch_serializes_as_op_array() {
        let patch = WidgetPatch::from(vec![PatchOp::Reorder {
            parent: NodePath::root(),
            order: vec![1, 0],
        }]);
        let value = serde_json::to_value(&patch).unwrap();
        assert_eq!(value, json!([{"op": "reorder", "parent": [], "order": [1, 0]}]));
        let back: WidgetPatch = serde_json::from_value(value).unwrap();
        assert_eq!(back, patch);
    }
}
