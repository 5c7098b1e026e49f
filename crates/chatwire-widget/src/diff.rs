//! Structural diff between two widget trees.
//!
//! Children are paired in two passes: first by stable key (regardless of
//! position), then positionally for unkeyed children. For each parent the
//! engine emits, in this order:
//!
//! 1. removes for unpaired old children, highest index first,
//! 2. one reorder when the surviving children changed relative order,
//! 3. inserts for unpaired new children, lowest index first,
//! 4. the recursive diff of every pair, at its final position.
//!
//! Pairs whose kind (or key) differ are replaced wholesale. Output only depends
//! on the two input trees, so the same pair always yields the same bytes.

use crate::{NodePath, PatchOp, WidgetNode, WidgetPatch};
use std::collections::{BTreeMap, HashMap};

/// Compute the patch that turns `previous` into `next`.
///
/// An absent `previous` yields a single `insert_root`; identical trees yield an
/// empty patch.
pub fn diff(previous: Option<&WidgetNode>, next: &WidgetNode) -> WidgetPatch {
    let mut patch = WidgetPatch::new();
    match previous {
        None => patch.push(PatchOp::InsertRoot { node: next.clone() }),
        Some(prev) => diff_node(prev, next, &NodePath::root(), &mut patch),
    }
    patch
}

fn diff_node(prev: &WidgetNode, next: &WidgetNode, path: &NodePath, patch: &mut WidgetPatch) {
    if !prev.same_identity(next) {
        patch.push(PatchOp::Replace {
            path: path.clone(),
            node: next.clone(),
        });
        return;
    }
    diff_attrs(prev, next, path, patch);
    diff_children(&prev.children, &next.children, path, patch);
}

fn diff_attrs(prev: &WidgetNode, next: &WidgetNode, path: &NodePath, patch: &mut WidgetPatch) {
    let set: BTreeMap<_, _> = next
        .attrs
        .iter()
        .filter(|(name, value)| prev.attrs.get(*name) != Some(*value))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    let unset: Vec<String> = prev
        .attrs
        .keys()
        .filter(|name| !next.attrs.contains_key(*name))
        .cloned()
        .collect();
    if set.is_empty() && unset.is_empty() {
        return;
    }
    patch.push(PatchOp::UpdateAttributes {
        path: path.clone(),
        set,
        unset,
    });
}

/// For each new child, the index of the old child it is paired with.
fn pair_children(prev: &[WidgetNode], next: &[WidgetNode]) -> Vec<Option<usize>> {
    let mut by_key: HashMap<&str, usize> = HashMap::new();
    for (i, node) in prev.iter().enumerate() {
        if let Some(key) = node.key.as_deref() {
            by_key.entry(key).or_insert(i);
        }
    }

    let mut claimed = vec![false; prev.len()];
    let mut pairs = vec![None; next.len()];

    for (j, node) in next.iter().enumerate() {
        let Some(key) = node.key.as_deref() else {
            continue;
        };
        if let Some(&i) = by_key.get(key) {
            if !claimed[i] {
                claimed[i] = true;
                pairs[j] = Some(i);
            }
        }
    }

    // Unkeyed children only pair with an unkeyed child at the same position.
    for (j, node) in next.iter().enumerate() {
        if pairs[j].is_some() || node.key.is_some() {
            continue;
        }
        if prev.get(j).is_some_and(|old| old.key.is_none()) && !claimed[j] {
            claimed[j] = true;
            pairs[j] = Some(j);
        }
    }

    pairs
}

fn diff_children(
    prev: &[WidgetNode],
    next: &[WidgetNode],
    parent: &NodePath,
    patch: &mut WidgetPatch,
) {
    let pairs = pair_children(prev, next);

    let mut kept = vec![false; prev.len()];
    for &i in pairs.iter().flatten() {
        kept[i] = true;
    }

    for i in (0..prev.len()).rev() {
        if !kept[i] {
            patch.push(PatchOp::Remove {
                parent: parent.clone(),
                index: i,
                key: prev[i].key.clone(),
            });
        }
    }

    // Rank of each surviving old child among the survivors, in old order.
    let mut rank = vec![usize::MAX; prev.len()];
    for (r, i) in (0..prev.len()).filter(|i| kept[*i]).enumerate() {
        rank[i] = r;
    }
    let order: Vec<usize> = pairs.iter().flatten().map(|&i| rank[i]).collect();
    if order.iter().enumerate().any(|(pos, &r)| pos != r) {
        patch.push(PatchOp::Reorder {
            parent: parent.clone(),
            order,
        });
    }

    for (j, pair) in pairs.iter().enumerate() {
        if pair.is_none() {
            patch.push(PatchOp::Insert {
                parent: parent.clone(),
                index: j,
                node: next[j].clone(),
            });
        }
    }

    for (j, pair) in pairs.iter().enumerate() {
        if let Some(i) = *pair {
            diff_node(&prev[i], &next[j], &parent.child(j), patch);
        }
    }
}
