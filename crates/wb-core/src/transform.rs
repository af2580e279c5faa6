//! Transform propagation from a resized/rotated container to its subtree.
//!
//! All coordinates are canvas-absolute, so one affine remapping (start frame
//! → end frame) applies to every descendant at any depth. Each descendant's
//! center is remapped, its own rotation picks up the container's rotation
//! delta, and its size is scaled along its own axes.

use crate::error::GeometryError;
use crate::geometry::{affine_transformation, inverse_affine_transformation, OrientedBox, Point, EPSILON};
use crate::model::{Diagram, ItemableType};
use crate::registry::DiagramRegistry;
use std::sync::Arc;

fn ratio(end: f64, start: f64) -> f64 {
    if start.abs() < EPSILON { 1.0 } else { end / start }
}

/// Map a canvas point expressed relative to `start` onto `end`.
///
/// The point is taken into the start frame's unrotated local space, scaled
/// by the end/start dimension ratios, then placed with the end frame's flip
/// factors, rotation and center.
///
/// # Errors
///
/// Returns [`GeometryError::DegenerateScale`] if `start` has a zero scale.
pub fn calculate_transformed_center(
    child_x: f64,
    child_y: f64,
    start: &OrientedBox,
    end: &OrientedBox,
) -> Result<Point, GeometryError> {
    let local = inverse_affine_transformation(
        child_x,
        child_y,
        start.scale_x,
        start.scale_y,
        start.rotation,
        start.x,
        start.y,
    )?;
    let scaled = Point::new(
        local.x * ratio(end.width, start.width),
        local.y * ratio(end.height, start.height),
    );
    Ok(affine_transformation(
        scaled.x,
        scaled.y,
        end.scale_x,
        end.scale_y,
        end.rotation,
        end.x,
        end.y,
    ))
}

/// Remap one descendant (and, recursively, its own children).
fn transform_descendant(
    child: &Diagram,
    start: &OrientedBox,
    end: &OrientedBox,
    registry: &DiagramRegistry,
) -> Result<Diagram, GeometryError> {
    let mut next = child.clone();
    let center = calculate_transformed_center(child.x, child.y, start, end)?;
    next.x = center.x;
    next.y = center.y;

    let rx = ratio(end.width, start.width);
    let ry = ratio(end.height, start.height);
    let flip_x = start.scale_x.signum() != end.scale_x.signum();
    let flip_y = start.scale_y.signum() != end.scale_y.signum();

    if let Some(frame) = next.frame_mut() {
        let phi = frame.rotation - start.rotation;
        let (sin, cos) = phi.sin_cos();
        frame.width *= (rx * cos).hypot(ry * sin);
        frame.height *= (rx * sin).hypot(ry * cos);
        let phi = if flip_x != flip_y { -phi } else { phi };
        frame.rotation = end.rotation + phi;
        if flip_x {
            frame.scale_x = -frame.scale_x;
        }
        if flip_y {
            frame.scale_y = -frame.scale_y;
        }
    }

    if let Some(points) = next.path_points_mut() {
        for p in points.iter_mut() {
            let moved = calculate_transformed_center(p.x, p.y, start, end)?;
            p.x = moved.x;
            p.y = moved.y;
        }
    }

    if let Some(items) = next.items_mut() {
        let mut mapped = Vec::with_capacity(items.len());
        for item in items.iter() {
            mapped.push(Arc::new(transform_descendant(item, start, end, registry)?));
        }
        *items = mapped;
    }

    registry.update_connect_points(&mut next);
    Ok(next)
}

/// Commit a frame change of `end` onto its subtree.
///
/// `end` is the container with its new center/frame; its `items` are still
/// in the geometry of `start`. Groups and composites scale their children
/// with the frame. Canvas containers only carry children along rigidly
/// (move and rotate) since their children live in their own sub-space.
/// Anchors of the container and of every descendant are regenerated with
/// `registry`'s generators.
///
/// # Errors
///
/// Returns [`GeometryError::DegenerateScale`] if `start` has a zero scale.
pub fn propagate_transform(
    start: &Diagram,
    end: &Diagram,
    registry: &DiagramRegistry,
) -> Result<Diagram, GeometryError> {
    let mut next = end.clone();
    registry.update_connect_points(&mut next);

    let (Some(from), Some(mut to)) = (start.oriented_box(), end.oriented_box()) else {
        return Ok(next);
    };
    if next.items().is_none_or(Vec::is_empty) || from == to {
        return Ok(next);
    }

    if end.itemable_type() == Some(ItemableType::Canvas) {
        to.width = from.width;
        to.height = from.height;
        to.scale_x = from.scale_x;
        to.scale_y = from.scale_y;
    }

    let is_translation = from.width == to.width
        && from.height == to.height
        && from.rotation == to.rotation
        && from.scale_x == to.scale_x
        && from.scale_y == to.scale_y;

    if let Some(items) = next.items_mut() {
        let mut mapped = Vec::with_capacity(items.len());
        for item in items.iter() {
            let child = if is_translation {
                let mut moved = item.translated(to.x - from.x, to.y - from.y);
                refresh_anchors_deep(&mut moved, registry);
                moved
            } else {
                transform_descendant(item, &from, &to, registry)?
            };
            mapped.push(Arc::new(child));
        }
        *items = mapped;
    }
    Ok(next)
}

fn refresh_anchors_deep(diagram: &mut Diagram, registry: &DiagramRegistry) {
    registry.update_connect_points(diagram);
    if let Some(items) = diagram.items_mut() {
        for item in items.iter_mut() {
            let mut child = (**item).clone();
            refresh_anchors_deep(&mut child, registry);
            *item = Arc::new(child);
        }
    }
}

/// Constrain a requested size to the start aspect ratio.
///
/// The axis with the larger relative change wins. A zero start dimension
/// leaves the request unconstrained.
pub fn apply_keep_proportion(
    start_width: f64,
    start_height: f64,
    width: f64,
    height: f64,
) -> (f64, f64) {
    if start_width.abs() < EPSILON || start_height.abs() < EPSILON {
        return (width, height);
    }
    let fx = width / start_width;
    let fy = height / start_height;
    let f = if (fx - 1.0).abs() >= (fy - 1.0).abs() { fx } else { fy };
    (start_width * f, start_height * f)
}
