//! Patch replay.

use crate::{NodePath, PatchOp, WidgetError, WidgetNode, WidgetPatch, WidgetResult};

/// Replay `patch` on top of `previous` and return the resulting tree.
///
/// Operations are applied in order; the first failing operation aborts the
/// replay and its error is returned.
pub fn apply_patch(previous: Option<&WidgetNode>, patch: &WidgetPatch) -> WidgetResult<WidgetNode> {
    let mut root = previous.cloned();
    for op in patch {
        apply_op(&mut root, op)?;
    }
    root.ok_or(WidgetError::MissingRoot)
}

fn apply_op(root: &mut Option<WidgetNode>, op: &PatchOp) -> WidgetResult<()> {
    match op {
        PatchOp::InsertRoot { node } => {
            if root.is_some() {
                return Err(WidgetError::RootAlreadyPresent);
            }
            *root = Some(node.clone());
        }
        PatchOp::Replace { path, node } => {
            *node_mut(root, path)? = node.clone();
        }
        PatchOp::UpdateAttributes { path, set, unset } => {
            let target = node_mut(root, path)?;
            for name in unset {
                target.attrs.remove(name);
            }
            for (name, value) in set {
                target.attrs.insert(name.clone(), value.clone());
            }
        }
        PatchOp::Insert {
            parent,
            index,
            node,
        } => {
            let target = node_mut(root, parent)?;
            let len = target.children.len();
            if *index > len {
                return Err(WidgetError::IndexOutOfBounds {
                    path: parent.clone(),
                    index: *index,
                    len,
                });
            }
            target.children.insert(*index, node.clone());
        }
        PatchOp::Remove { parent, index, key } => {
            let target = node_mut(root, parent)?;
            let len = target.children.len();
            let Some(child) = target.children.get(*index) else {
                return Err(WidgetError::IndexOutOfBounds {
                    path: parent.clone(),
                    index: *index,
                    len,
                });
            };
            if let Some(expected) = key {
                if child.key.as_deref() != Some(expected.as_str()) {
                    return Err(WidgetError::KeyMismatch {
                        path: parent.clone(),
                        index: *index,
                        expected: expected.clone(),
                        found: child.key.clone(),
                    });
                }
            }
            target.children.remove(*index);
        }
        PatchOp::Reorder { parent, order } => {
            let target = node_mut(root, parent)?;
            reorder(&mut target.children, order, parent)?;
        }
    }
    Ok(())
}

fn reorder(children: &mut Vec<WidgetNode>, order: &[usize], parent: &NodePath) -> WidgetResult<()> {
    let invalid = |reason: String| WidgetError::InvalidReorder {
        path: parent.clone(),
        reason,
    };
    if order.len() != children.len() {
        return Err(invalid(format!(
            "order has {} entries for {} children",
            order.len(),
            children.len()
        )));
    }
    let mut seen = vec![false; order.len()];
    for &i in order {
        match seen.get_mut(i) {
            Some(slot) if !*slot => *slot = true,
            _ => return Err(invalid(format!("index {i} is out of range or repeated"))),
        }
    }
    let mut slots: Vec<Option<WidgetNode>> = children.drain(..).map(Some).collect();
    let reordered = order
        .iter()
        .filter_map(|&i| slots.get_mut(i).and_then(Option::take))
        .collect();
    *children = reordered;
    Ok(())
}

fn node_mut<'a>(
    root: &'a mut Option<WidgetNode>,
    path: &NodePath,
) -> WidgetResult<&'a mut WidgetNode> {
    let mut node = root.as_mut().ok_or(WidgetError::MissingRoot)?;
    for (depth, &idx) in path.iter().enumerate() {
        let len = node.children.len();
        node = node
            .children
            .get_mut(idx)
            .ok_or_else(|| WidgetError::IndexOutOfBounds {
                path: path.prefix(depth),
                index: idx,
                len,
            })?;
    }
    Ok(node)
}
