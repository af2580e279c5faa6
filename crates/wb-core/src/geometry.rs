//! Geometry kernel: rotation, affine transforms and bounding boxes.
//!
//! Everything here is pure. Angles are radians; the y axis points down, so a
//! positive angle turns clockwise on screen.

use crate::error::GeometryError;
use crate::model::{Diagram, ItemableType};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Tolerance used by float comparisons across the crate.
pub const EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn approx_eq(self, other: Point) -> bool {
        (self.x - other.x).abs() < EPSILON && (self.y - other.y).abs() < EPSILON
    }

    #[must_use]
    pub fn offset(self, dx: f64, dy: f64) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }
}

pub fn degrees_to_radians(degrees: f64) -> f64 {
    degrees.to_radians()
}

pub fn radians_to_degrees(radians: f64) -> f64 {
    radians.to_degrees()
}

/// Wrap an angle into `[0, 2π)`.
pub fn normalize_radians(radians: f64) -> f64 {
    radians.rem_euclid(std::f64::consts::TAU)
}

/// Rotate `(x, y)` about the pivot `(cx, cy)`.
pub fn rotate_point(x: f64, y: f64, cx: f64, cy: f64, radians: f64) -> Point {
    let (sin, cos) = radians.sin_cos();
    let dx = x - cx;
    let dy = y - cy;
    Point::new(cx + dx * cos - dy * sin, cy + dx * sin + dy * cos)
}

/// Scale by `(sx, sy)`, rotate by `theta`, then translate by `(tx, ty)`.
pub fn affine_transformation(
    px: f64,
    py: f64,
    sx: f64,
    sy: f64,
    theta: f64,
    tx: f64,
    ty: f64,
) -> Point {
    let r = rotate_point(px * sx, py * sy, 0.0, 0.0, theta);
    Point::new(r.x + tx, r.y + ty)
}

/// Exact inverse of [`affine_transformation`].
///
/// # Errors
///
/// Returns [`GeometryError::DegenerateScale`] when `sx` or `sy` is zero.
pub fn inverse_affine_transformation(
    px: f64,
    py: f64,
    sx: f64,
    sy: f64,
    theta: f64,
    tx: f64,
    ty: f64,
) -> Result<Point, GeometryError> {
    if sx == 0.0 || sy == 0.0 {
        return Err(GeometryError::DegenerateScale { sx, sy });
    }
    let r = rotate_point(px - tx, py - ty, 0.0, 0.0, -theta);
    Ok(Point::new(r.x / sx, r.y / sy))
}

// ─── Boxes ───────────────────────────────────────────────────────────────

/// Axis-aligned box, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    /// Smallest box covering every point.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::EmptyItems`] for an empty iterator.
    pub fn from_points(points: impl IntoIterator<Item = Point>) -> Result<Self, GeometryError> {
        let mut iter = points.into_iter();
        let first = iter.next().ok_or(GeometryError::EmptyItems)?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in iter {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Ok(Self {
            x: min_x,
            y: min_y,
            width: max_x - min_x,
            height: max_y - min_y,
        })
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px <= self.right() && py >= self.y && py <= self.bottom()
    }

    /// `other` lies entirely inside `self`.
    pub fn contains_bounds(&self, other: &Bounds) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    pub fn intersects(&self, other: &Bounds) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    #[must_use]
    pub fn union(&self, other: &Bounds) -> Bounds {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Bounds {
            x,
            y,
            width: self.right().max(other.right()) - x,
            height: self.bottom().max(other.bottom()) - y,
        }
    }

    #[must_use]
    pub fn inflate(&self, margin: f64) -> Bounds {
        Bounds {
            x: self.x - margin,
            y: self.y - margin,
            width: self.width + margin * 2.0,
            height: self.height + margin * 2.0,
        }
    }
}

/// A center-anchored, possibly rotated and flipped box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrientedBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub rotation: f64,
    pub scale_x: f64,
    pub scale_y: f64,
}

impl OrientedBox {
    /// Unrotated box around a center.
    pub fn axis_aligned(center: Point, width: f64, height: f64) -> Self {
        Self {
            x: center.x,
            y: center.y,
            width,
            height,
            rotation: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Map a point from this box's local space (origin at center, unrotated)
    /// into canvas space.
    pub fn local_to_canvas(&self, local: Point) -> Point {
        let r = rotate_point(local.x, local.y, 0.0, 0.0, self.rotation);
        Point::new(r.x + self.x, r.y + self.y)
    }

    /// Inverse of [`OrientedBox::local_to_canvas`].
    pub fn canvas_to_local(&self, canvas: Point) -> Point {
        rotate_point(canvas.x - self.x, canvas.y - self.y, 0.0, 0.0, -self.rotation)
    }

    /// Corners in canvas space: top-left, top-right, bottom-right, bottom-left.
    pub fn corners(&self) -> [Point; 4] {
        let hw = self.width / 2.0;
        let hh = self.height / 2.0;
        [
            self.local_to_canvas(Point::new(-hw, -hh)),
            self.local_to_canvas(Point::new(hw, -hh)),
            self.local_to_canvas(Point::new(hw, hh)),
            self.local_to_canvas(Point::new(-hw, hh)),
        ]
    }

    /// Axis-aligned hull of the rotated box.
    pub fn bounds(&self) -> Bounds {
        let [a, b, c, d] = self.corners();
        let min_x = a.x.min(b.x).min(c.x).min(d.x);
        let min_y = a.y.min(b.y).min(c.y).min(d.y);
        let max_x = a.x.max(b.x).max(c.x).max(d.x);
        let max_y = a.y.max(b.y).max(c.y).max(d.y);
        Bounds {
            x: min_x,
            y: min_y,
            width: max_x - min_x,
            height: max_y - min_y,
        }
    }

    /// Hit test honouring rotation.
    pub fn contains(&self, p: Point) -> bool {
        let local = self.canvas_to_local(p);
        local.x.abs() <= self.width / 2.0 + EPSILON && local.y.abs() <= self.height / 2.0 + EPSILON
    }

    /// Rebuild a box from an unrotated extent measured in a space rotated by
    /// `-rotation` about the origin.
    pub fn from_unrotated(bounds: &Bounds, rotation: f64) -> Self {
        let c = bounds.center();
        let center = rotate_point(c.x, c.y, 0.0, 0.0, rotation);
        Self {
            x: center.x,
            y: center.y,
            width: bounds.width,
            height: bounds.height,
            rotation,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }
}

// ─── Diagram extents ─────────────────────────────────────────────────────

/// Push every point that defines the visible extent of `item`.
fn collect_extent_points(item: &Diagram, out: &mut Vec<Point>) {
    match item.itemable_type() {
        Some(ItemableType::Group) => {
            // The group frame can be stale mid-gesture; trust the children.
            for child in item.items().into_iter().flatten() {
                collect_extent_points(child, out);
            }
            return;
        }
        Some(ItemableType::Composite) => {
            for child in item.items().into_iter().flatten() {
                collect_extent_points(child, out);
            }
        }
        Some(ItemableType::Canvas) | None => {}
    }

    if let Some(line) = item.as_connect_line() {
        out.extend(line.points.iter().map(|p| p.point()));
    } else if let Some(b) = item.oriented_box() {
        out.extend(b.corners());
    } else {
        out.push(item.center());
    }
}

/// Axis-aligned box covering every (possibly rotated) item.
///
/// # Errors
///
/// Returns [`GeometryError::EmptyItems`] when nothing contributes an extent.
pub fn calc_items_bounding_box(items: &[Arc<Diagram>]) -> Result<Bounds, GeometryError> {
    let mut points = Vec::with_capacity(items.len() * 4);
    for item in items {
        collect_extent_points(item, &mut points);
    }
    Bounds::from_points(points)
}

/// Box covering `items` after undoing a container's `rotation`.
///
/// Every descendant point is rotated by `-rotation` about the canvas origin,
/// so the result is axis-aligned in the container's local frame. Feed it to
/// [`OrientedBox::from_unrotated`] to get the container frame back.
///
/// # Errors
///
/// Returns [`GeometryError::EmptyItems`] when nothing contributes an extent.
pub fn calc_unrotated_itemable_bounding_box(
    items: &[Arc<Diagram>],
    rotation: f64,
) -> Result<Bounds, GeometryError> {
    let mut points = Vec::with_capacity(items.len() * 4);
    for item in items {
        collect_extent_points(item, &mut points);
    }
    Bounds::from_points(
        points
            .into_iter()
            .map(|p| rotate_point(p.x, p.y, 0.0, 0.0, -rotation)),
    )
}
