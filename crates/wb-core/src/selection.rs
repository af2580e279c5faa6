//! Selection, grouping and stacking utilities.

use crate::error::GeometryError;
use crate::geometry::{calc_items_bounding_box, OrientedBox};
use crate::id::DiagramId;
use crate::layout::refresh_group_frames;
use crate::model::{Diagram, ItemableType};
use crate::registry::create_group_state;
use crate::tree::{all_ptr_eq, apply_function_recursively, get_diagram_by_id, modify_siblings_of, remove_diagrams_by_id};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

// ─── Selection ───────────────────────────────────────────────────────────

/// Every selected diagram, pre-order. A selected node absorbs its subtree.
pub fn get_selected_diagrams(items: &[Arc<Diagram>]) -> Vec<Arc<Diagram>> {
    let mut out = Vec::new();
    collect_selected(items, &mut out);
    out
}

fn collect_selected(items: &[Arc<Diagram>], out: &mut Vec<Arc<Diagram>>) {
    for item in items {
        if item.ui.is_selected {
            out.push(Arc::clone(item));
        } else if let Some(children) = item.items() {
            collect_selected(children, out);
        }
    }
}

pub fn get_selected_ids(items: &[Arc<Diagram>]) -> Vec<DiagramId> {
    get_selected_diagrams(items).iter().map(|d| d.id).collect()
}

/// Select exactly `ids`; everything else is deselected.
pub fn set_selection(items: &[Arc<Diagram>], ids: &HashSet<DiagramId>) -> Vec<Arc<Diagram>> {
    apply_function_recursively(items, &mut |d| {
        let selected = ids.contains(&d.id);
        if d.ui.is_selected == selected && (selected || !d.ui.is_text_editing) {
            return Arc::clone(d);
        }
        let mut next = (**d).clone();
        next.ui.is_selected = selected;
        if !selected {
            next.ui.is_text_editing = false;
        }
        Arc::new(next)
    })
}

pub fn clear_selection(items: &[Arc<Diagram>]) -> Vec<Arc<Diagram>> {
    set_selection(items, &HashSet::new())
}

/// Transform-handle box for the selection.
///
/// A single framed item keeps its own orientation; several items get the
/// axis-aligned union of their rotated extents.
///
/// # Errors
///
/// Returns [`GeometryError::EmptyItems`] when nothing is selected.
pub fn selection_oriented_box(selected: &[Arc<Diagram>]) -> Result<OrientedBox, GeometryError> {
    if let [single] = selected {
        if let Some(b) = single.oriented_box() {
            return Ok(b);
        }
    }
    let bounds = calc_items_bounding_box(selected)?;
    Ok(OrientedBox::axis_aligned(bounds.center(), bounds.width, bounds.height))
}

// ─── Group cleanup ───────────────────────────────────────────────────────

/// Post-order cleanup: empty groups vanish, singleton groups collapse into
/// their child, and surviving groups recompute `rotate_enabled`.
pub fn cleanup_groups(items: &[Arc<Diagram>]) -> Vec<Arc<Diagram>> {
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let Some(children) = item.items() else {
            out.push(Arc::clone(item));
            continue;
        };
        let mut cleaned = cleanup_groups(children);
        let is_group = item.itemable_type() == Some(ItemableType::Group);

        if is_group && cleaned.len() <= 1 {
            log::debug!("group {} collapsed ({} children left)", item.id, cleaned.len());
            out.extend(cleaned.pop());
            continue;
        }

        let rotate_enabled = cleaned
            .iter()
            .all(|c| c.frame().is_none_or(|f| f.rotate_enabled));
        let flag_changed = is_group && item.frame().is_some_and(|f| f.rotate_enabled != rotate_enabled);

        if all_ptr_eq(children, &cleaned) && !flag_changed {
            out.push(Arc::clone(item));
            continue;
        }
        let mut node = (**item).clone();
        if let Some(slot) = node.items_mut() {
            *slot = cleaned;
        }
        if is_group {
            if let Some(frame) = node.frame_mut() {
                frame.rotate_enabled = rotate_enabled;
            }
        }
        out.push(Arc::new(node));
    }
    out
}

// ─── Grouping ────────────────────────────────────────────────────────────

/// Wrap `ids` into a new group placed where the first of them was.
///
/// Returns the new forest and the group id, or `None` when fewer than two
/// of the ids exist.
pub fn group_diagrams(items: &[Arc<Diagram>], ids: &[DiagramId]) -> Option<(Vec<Arc<Diagram>>, DiagramId)> {
    let members: Vec<Arc<Diagram>> = ids
        .iter()
        .filter_map(|id| get_diagram_by_id(items, *id).cloned())
        .collect();
    if members.len() < 2 {
        return None;
    }
    let first = members[0].id;
    let others: HashSet<DiagramId> = members[1..].iter().map(|d| d.id).collect();

    let mut group = create_group_state(members.clone());
    group.ui.is_selected = true;
    let group_id = group.id;
    let group = Arc::new(group);
    log::debug!("grouping {} diagrams into {}", members.len(), group_id);

    let without = remove_diagrams_by_id(items, &others);
    let placed = modify_siblings_of(&without, first, |list, i| list[i] = Arc::clone(&group))?;
    let unselected = apply_function_recursively(&placed, &mut |d| {
        if d.ui.is_selected && d.id != group_id {
            let mut next = (**d).clone();
            next.ui.is_selected = false;
            Arc::new(next)
        } else {
            Arc::clone(d)
        }
    });
    Some((refresh_group_frames(&cleanup_groups(&unselected)), group_id))
}

/// Replace each group in `ids` with its children, in place.
pub fn ungroup_diagrams(items: &[Arc<Diagram>], ids: &[DiagramId]) -> Option<Vec<Arc<Diagram>>> {
    let mut current = items.to_vec();
    let mut any = false;
    for id in ids {
        let Some(group) = get_diagram_by_id(&current, *id).cloned() else {
            continue;
        };
        if group.itemable_type() != Some(ItemableType::Group) {
            continue;
        }
        let children = group.items().cloned().unwrap_or_default();
        if let Some(next) = modify_siblings_of(&current, *id, |list, i| {
            list.splice(i..=i, children);
        }) {
            current = next;
            any = true;
        }
    }
    any.then(|| refresh_group_frames(&cleanup_groups(&current)))
}

/// Move `ids` (with their subtrees) out of any container to the top level.
pub fn extract_to_top_level(items: &[Arc<Diagram>], ids: &[DiagramId]) -> Option<Vec<Arc<Diagram>>> {
    let moving: Vec<Arc<Diagram>> = ids
        .iter()
        .filter(|id| !items.iter().any(|d| d.id == **id))
        .filter_map(|id| get_diagram_by_id(items, *id).cloned())
        .collect();
    if moving.is_empty() {
        return None;
    }
    let set: HashSet<DiagramId> = moving.iter().map(|d| d.id).collect();
    let mut next = remove_diagrams_by_id(items, &set);
    next.extend(moving);
    Some(refresh_group_frames(&cleanup_groups(&next)))
}

// ─── Stack order ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StackOrderChange {
    BringToFront,
    SendToBack,
    BringForward,
    SendBackward,
}

/// Reorder `id` within the sibling list that holds it. Later siblings paint
/// on top.
pub fn change_stack_order(
    items: &[Arc<Diagram>],
    id: DiagramId,
    change: StackOrderChange,
) -> Option<Vec<Arc<Diagram>>> {
    modify_siblings_of(items, id, |list, i| {
        let last = list.len() - 1;
        let target = match change {
            StackOrderChange::BringToFront => last,
            StackOrderChange::SendToBack => 0,
            StackOrderChange::BringForward => (i + 1).min(last),
            StackOrderChange::SendBackward => i.saturating_sub(1),
        };
        if target != i {
            let d = list.remove(i);
            list.insert(target, d);
        }
    })
}
