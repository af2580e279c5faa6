//! Traversal primitives over the diagram forest.
//!
//! All operations are pure: they return new vectors and leave the input
//! untouched. Any subtree that does not contain a change is returned as the
//! very same `Arc`, so callers can detect change with `Arc::ptr_eq`.

use crate::id::DiagramId;
use crate::model::Diagram;
use std::collections::HashSet;
use std::sync::Arc;

/// Depth-first lookup into every itemable's children.
pub fn get_diagram_by_id<'a>(items: &'a [Arc<Diagram>], id: DiagramId) -> Option<&'a Arc<Diagram>> {
    for item in items {
        if item.id == id {
            return Some(item);
        }
        if let Some(found) = item.items().and_then(|children| get_diagram_by_id(children, id)) {
            return Some(found);
        }
    }
    None
}

pub fn contains_id(items: &[Arc<Diagram>], id: DiagramId) -> bool {
    get_diagram_by_id(items, id).is_some()
}

/// The generic map primitive.
///
/// `f` sees every node pre-order and returns its replacement (return the
/// argument's clone of the `Arc` to leave it alone). Children of the
/// *returned* node are then visited. A node whose children all come back
/// pointer-equal is kept as is.
pub fn apply_function_recursively<F>(items: &[Arc<Diagram>], f: &mut F) -> Vec<Arc<Diagram>>
where
    F: FnMut(&Arc<Diagram>) -> Arc<Diagram>,
{
    items.iter().map(|item| map_node(item, f)).collect()
}

fn map_node<F>(item: &Arc<Diagram>, f: &mut F) -> Arc<Diagram>
where
    F: FnMut(&Arc<Diagram>) -> Arc<Diagram>,
{
    let mapped = f(item);
    let Some(children) = mapped.items() else {
        return mapped;
    };
    let new_children = apply_function_recursively(children, f);
    if all_ptr_eq(children, &new_children) {
        return mapped;
    }
    let mut node = (*mapped).clone();
    if let Some(slot) = node.items_mut() {
        *slot = new_children;
    }
    Arc::new(node)
}

/// Element-wise `Arc::ptr_eq`.
pub fn all_ptr_eq(a: &[Arc<Diagram>], b: &[Arc<Diagram>]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| Arc::ptr_eq(x, y))
}

/// Replace the node whose id matches `target.id`, wherever it lives.
pub fn replace_diagram(items: &[Arc<Diagram>], target: &Arc<Diagram>) -> Vec<Arc<Diagram>> {
    apply_function_recursively(items, &mut |d| {
        if d.id == target.id {
            Arc::clone(target)
        } else {
            Arc::clone(d)
        }
    })
}

/// Replace several nodes in one pass.
pub fn replace_diagrams(items: &[Arc<Diagram>], targets: &[Arc<Diagram>]) -> Vec<Arc<Diagram>> {
    if targets.is_empty() {
        return items.to_vec();
    }
    apply_function_recursively(items, &mut |d| {
        targets
            .iter()
            .find(|t| t.id == d.id)
            .map_or_else(|| Arc::clone(d), Arc::clone)
    })
}

/// Drop every node in `ids` together with its whole subtree.
pub fn remove_diagrams_by_id(items: &[Arc<Diagram>], ids: &HashSet<DiagramId>) -> Vec<Arc<Diagram>> {
    items
        .iter()
        .filter(|item| !ids.contains(&item.id))
        .map(|item| {
            let Some(children) = item.items() else {
                return Arc::clone(item);
            };
            let kept = remove_diagrams_by_id(children, ids);
            if all_ptr_eq(children, &kept) {
                return Arc::clone(item);
            }
            let mut node = (**item).clone();
            if let Some(slot) = node.items_mut() {
                *slot = kept;
            }
            Arc::new(node)
        })
        .collect()
}

/// Visit every node pre-order.
pub fn for_each_diagram<'a, F>(items: &'a [Arc<Diagram>], f: &mut F)
where
    F: FnMut(&'a Arc<Diagram>),
{
    for item in items {
        f(item);
        if let Some(children) = item.items() {
            for_each_diagram(children, f);
        }
    }
}

/// Every id in the forest, pre-order.
pub fn collect_ids(items: &[Arc<Diagram>]) -> Vec<DiagramId> {
    let mut out = Vec::new();
    for_each_diagram(items, &mut |d| out.push(d.id));
    out
}

/// Child-index path from the top level to `id`.
pub fn diagram_path(items: &[Arc<Diagram>], id: DiagramId) -> Option<Vec<usize>> {
    for (i, item) in items.iter().enumerate() {
        if item.id == id {
            return Some(vec![i]);
        }
        if let Some(mut rest) = item.items().and_then(|c| diagram_path(c, id)) {
            rest.insert(0, i);
            return Some(rest);
        }
    }
    None
}

pub fn get_diagram_by_path<'a>(items: &'a [Arc<Diagram>], path: &[usize]) -> Option<&'a Arc<Diagram>> {
    let (first, rest) = path.split_first()?;
    let node = items.get(*first)?;
    if rest.is_empty() {
        Some(node)
    } else {
        get_diagram_by_path(node.items()?, rest)
    }
}

/// The itemable directly containing `id`; `None` for top-level or missing ids.
pub fn get_parent<'a>(items: &'a [Arc<Diagram>], id: DiagramId) -> Option<&'a Arc<Diagram>> {
    for item in items {
        let Some(children) = item.items() else {
            continue;
        };
        if children.iter().any(|c| c.id == id) {
            return Some(item);
        }
        if let Some(found) = get_parent(children, id) {
            return Some(found);
        }
    }
    None
}

/// Ids of every ancestor of `id`, innermost first.
pub fn ancestor_ids(items: &[Arc<Diagram>], id: DiagramId) -> Vec<DiagramId> {
    let mut out = Vec::new();
    let mut current = id;
    while let Some(parent) = get_parent(items, current) {
        out.push(parent.id);
        current = parent.id;
    }
    out
}

/// Run `f` on the sibling list that holds `id` along with its index.
///
/// Returns `None` when `id` is not in the forest.
pub fn modify_siblings_of<F>(items: &[Arc<Diagram>], id: DiagramId, f: F) -> Option<Vec<Arc<Diagram>>>
where
    F: FnOnce(&mut Vec<Arc<Diagram>>, usize),
{
    let mut f = Some(f);
    modify_siblings_inner(items, id, &mut f)
}

fn modify_siblings_inner<F>(
    items: &[Arc<Diagram>],
    id: DiagramId,
    f: &mut Option<F>,
) -> Option<Vec<Arc<Diagram>>>
where
    F: FnOnce(&mut Vec<Arc<Diagram>>, usize),
{
    if let Some(index) = items.iter().position(|d| d.id == id) {
        let mut list = items.to_vec();
        let op = f.take()?;
        op(&mut list, index);
        return Some(list);
    }
    for (i, item) in items.iter().enumerate() {
        let Some(children) = item.items() else {
            continue;
        };
        if let Some(new_children) = modify_siblings_inner(children, id, f) {
            let mut node = (**item).clone();
            if let Some(slot) = node.items_mut() {
                *slot = new_children;
            }
            let mut list = items.to_vec();
            list[i] = Arc::new(node);
            return Some(list);
        }
    }
    None
}

/// Append `diagrams` to the children of the itemable `target_id`.
///
/// Returns `None` when the target is missing or cannot hold items.
pub fn append_to_itemable(
    items: &[Arc<Diagram>],
    target_id: DiagramId,
    diagrams: &[Arc<Diagram>],
) -> Option<Vec<Arc<Diagram>>> {
    let target = get_diagram_by_id(items, target_id)?;
    let mut node = (**target).clone();
    node.items_mut()?.extend(diagrams.iter().cloned());
    Some(replace_diagram(items, &Arc::new(node)))
}
