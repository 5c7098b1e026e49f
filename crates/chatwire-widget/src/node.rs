//! Immutable widget tree values.

use crate::NodePath;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One UI element and its subtree.
///
/// Serialized flat, with kind-specific attributes next to the structural fields:
///
/// ```json
/// {"type": "Button", "key": "submit", "label": "Send", "children": []}
/// ```
///
/// `type`, `key` and `children` are reserved and never appear in `attrs`.
/// Attributes live in a `BTreeMap` so serialization order never depends on
/// insertion order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WidgetNode {
    /// Node kind tag (`Card`, `Text`, `Button`, ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// Stable key used to correlate a node across snapshots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Ordered child nodes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<WidgetNode>,
    /// Kind-specific attributes.
    #[serde(flatten)]
    pub attrs: BTreeMap<String, Value>,
}

impl WidgetNode {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            key: None,
            children: Vec::new(),
            attrs: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_child(mut self, child: WidgetNode) -> Self {
        self.children.push(child);
        self
    }

    #[must_use]
    pub fn with_children(mut self, children: impl IntoIterator<Item = WidgetNode>) -> Self {
        self.children.extend(children);
        self
    }

    /// Whether `other` may be diffed in place against this node.
    ///
    /// Nodes of different kinds or different keys are never patched into one
    /// another; the diff engine replaces them wholesale.
    pub fn same_identity(&self, other: &WidgetNode) -> bool {
        self.kind == other.kind && self.key == other.key
    }

    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name)
    }

    /// Resolve a positional path below this node.
    pub fn get(&self, path: &NodePath) -> Option<&WidgetNode> {
        path.iter()
            .try_fold(self, |node, idx| node.children.get(*idx))
    }

    /// Depth-first search for the first node carrying `key`.
    pub fn find_by_key(&self, key: &str) -> Option<&WidgetNode> {
        if self.key.as_deref() == Some(key) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find_by_key(key))
    }

    /// Total number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(WidgetNode::node_count).sum::<usize>()
    }
}
