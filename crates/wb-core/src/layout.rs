//! Derived container geometry.
//!
//! Group frames are computed from their children. Canvas containers grow to
//! fit children that overflow them, keeping a padding margin.

use crate::error::GeometryError;
use crate::geometry::{calc_unrotated_itemable_bounding_box, rotate_point, Bounds, OrientedBox, Point, EPSILON};
use crate::model::{Diagram, ItemableType};
use crate::registry::DiagramRegistry;
use crate::tree::all_ptr_eq;
use std::sync::Arc;

fn boxes_match(a: &OrientedBox, b: &OrientedBox) -> bool {
    (a.x - b.x).abs() < EPSILON
        && (a.y - b.y).abs() < EPSILON
        && (a.width - b.width).abs() < EPSILON
        && (a.height - b.height).abs() < EPSILON
        && (a.rotation - b.rotation).abs() < EPSILON
}

/// Frame a group should have for its current children.
///
/// The box is measured in the group's own (unrotated) frame, so a rotated
/// group keeps its rotation and gets the tight local extent.
///
/// # Errors
///
/// Returns [`GeometryError::EmptyItems`] for a group without children.
pub fn group_frame_from_children(group: &Diagram) -> Result<OrientedBox, GeometryError> {
    let rotation = group.frame().map_or(0.0, |f| f.rotation);
    let items = group.items().map(Vec::as_slice).unwrap_or_default();
    let local = calc_unrotated_itemable_bounding_box(items, rotation)?;
    let mut frame = OrientedBox::from_unrotated(&local, rotation);
    if let Some(f) = group.frame() {
        frame.scale_x = f.scale_x;
        frame.scale_y = f.scale_y;
    }
    Ok(frame)
}

/// Recompute every group frame, innermost first.
///
/// Empty groups are left alone (cleanup removes them). Unchanged subtrees
/// are returned as the same `Arc`.
pub fn refresh_group_frames(items: &[Arc<Diagram>]) -> Vec<Arc<Diagram>> {
    items.iter().map(refresh_group_frame_node).collect()
}

fn refresh_group_frame_node(item: &Arc<Diagram>) -> Arc<Diagram> {
    let Some(children) = item.items() else {
        return Arc::clone(item);
    };
    let refreshed = refresh_group_frames(children);
    let children_changed = !all_ptr_eq(children, &refreshed);

    let new_frame = match item.itemable_type() {
        Some(ItemableType::Group) if !refreshed.is_empty() => {
            let mut candidate = (**item).clone();
            if let Some(slot) = candidate.items_mut() {
                slot.clone_from(&refreshed);
            }
            group_frame_from_children(&candidate)
                .ok()
                .filter(|f| item.oriented_box().is_none_or(|current| !boxes_match(f, &current)))
        }
        _ => None,
    };

    if !children_changed && new_frame.is_none() {
        return Arc::clone(item);
    }
    let mut node = (**item).clone();
    if let Some(slot) = node.items_mut() {
        *slot = refreshed;
    }
    if let Some(frame) = new_frame {
        node.set_oriented_box(&frame);
    }
    Arc::new(node)
}

/// Grow a canvas so its children fit with `padding` on every overflowing
/// side. Returns `None` when everything already fits or the canvas is empty.
pub fn fit_canvas_to_children(canvas: &Diagram, padding: f64, registry: &DiagramRegistry) -> Option<Diagram> {
    if canvas.itemable_type() != Some(ItemableType::Canvas) {
        return None;
    }
    let frame = canvas.oriented_box()?;
    let content = calc_unrotated_itemable_bounding_box(canvas.items()?, frame.rotation).ok()?;

    let c = rotate_point(frame.x, frame.y, 0.0, 0.0, -frame.rotation);
    let current = Bounds {
        x: c.x - frame.width / 2.0,
        y: c.y - frame.height / 2.0,
        width: frame.width,
        height: frame.height,
    };

    let mut left = current.x;
    let mut top = current.y;
    let mut right = current.right();
    let mut bottom = current.bottom();
    if content.x < left {
        left = content.x - padding;
    }
    if content.y < top {
        top = content.y - padding;
    }
    if content.right() > right {
        right = content.right() + padding;
    }
    if content.bottom() > bottom {
        bottom = content.bottom() + padding;
    }

    let grown = Bounds {
        x: left,
        y: top,
        width: right - left,
        height: bottom - top,
    };
    if grown == current {
        return None;
    }
    log::debug!(
        "canvas {} grows from {}x{} to {}x{}",
        canvas.id,
        current.width,
        current.height,
        grown.width,
        grown.height
    );

    let center: Point = grown.center();
    let center = rotate_point(center.x, center.y, 0.0, 0.0, frame.rotation);
    let mut next = canvas.clone();
    next.set_oriented_box(&OrientedBox {
        x: center.x,
        y: center.y,
        width: grown.width,
        height: grown.height,
        ..frame
    });
    registry.update_connect_points(&mut next);
    Some(next)
}

/// Apply [`fit_canvas_to_children`] to every canvas, innermost first.
pub fn auto_expand_canvases(items: &[Arc<Diagram>], padding: f64, registry: &DiagramRegistry) -> Vec<Arc<Diagram>> {
    items
        .iter()
        .map(|item| {
            let Some(children) = item.items() else {
                return Arc::clone(item);
            };
            let expanded = auto_expand_canvases(children, padding, registry);
            let mut node = if all_ptr_eq(children, &expanded) {
                Arc::clone(item)
            } else {
                let mut n = (**item).clone();
                if let Some(slot) = n.items_mut() {
                    *slot = expanded;
                }
                Arc::new(n)
            };
            if let Some(grown) = fit_canvas_to_children(&node, padding, registry) {
                node = Arc::new(grown);
            }
            node
        })
        .collect()
}
