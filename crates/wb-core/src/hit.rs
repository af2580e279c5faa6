//! Hit testing: point → diagram lookup.
//!
//! Walks the forest front-to-back (last painted is topmost) and honours
//! each frame's rotation.

use crate::geometry::{calc_items_bounding_box, Bounds, Point};
use crate::id::DiagramId;
use crate::model::{Diagram, ItemableType};
use std::sync::Arc;

/// Extra slop around connect line strokes.
const LINE_HIT_SLOP: f64 = 4.0;

/// Find the topmost diagram at `(px, py)`.
///
/// Children of itemables are tried before the container itself. Groups have
/// no body of their own, so they are only hit through their children.
pub fn hit_test(items: &[Arc<Diagram>], px: f64, py: f64) -> Option<DiagramId> {
    let p = Point::new(px, py);
    items.iter().rev().find_map(|item| hit_test_node(item, p))
}

fn hit_test_node(item: &Diagram, p: Point) -> Option<DiagramId> {
    if let Some(children) = item.items() {
        if let Some(hit) = children.iter().rev().find_map(|c| hit_test_node(c, p)) {
            return Some(hit);
        }
        if item.itemable_type() == Some(ItemableType::Group) {
            return None;
        }
    }
    hits_body(item, p).then_some(item.id)
}

fn hits_body(item: &Diagram, p: Point) -> bool {
    if let Some(line) = item.as_connect_line() {
        let tolerance = line.stroke_width / 2.0 + LINE_HIT_SLOP;
        return line
            .points
            .windows(2)
            .any(|w| distance_to_segment(p, w[0].point(), w[1].point()) <= tolerance);
    }
    item.oriented_box().is_some_and(|b| b.contains(p))
}

fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len2 = dx * dx + dy * dy;
    if len2 == 0.0 {
        return p.distance(a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len2).clamp(0.0, 1.0);
    p.distance(Point::new(a.x + t * dx, a.y + t * dy))
}

/// Like [`hit_test`] but returns the top-level diagram that owns the hit.
pub fn hit_test_top_level(items: &[Arc<Diagram>], px: f64, py: f64) -> Option<DiagramId> {
    let p = Point::new(px, py);
    items
        .iter()
        .rev()
        .find(|item| hit_test_node(item, p).is_some())
        .map(|item| item.id)
}

/// Top-level diagrams lying entirely inside `rect`. Used for marquee
/// selection.
pub fn diagrams_in_rect(items: &[Arc<Diagram>], rect: &Bounds) -> Vec<DiagramId> {
    items
        .iter()
        .filter(|item| {
            calc_items_bounding_box(std::slice::from_ref(*item))
                .is_ok_and(|b| rect.contains_bounds(&b))
        })
        .map(|item| item.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{create_canvas_state, create_connect_line_state, create_group_state, create_rectangle_state};
    use crate::model::PathPoint;
    use pretty_assertions::assert_eq;
    use std::f64::consts::FRAC_PI_4;

    #[test]
    fn topmost_wins() {
        let a = create_rectangle_state(0.0, 0.0);
        let b = create_rectangle_state(40.0, 0.0);
        let (a_id, b_id) = (a.id, b.id);
        let items = vec![Arc::new(a), Arc::new(b)];
        assert_eq!(hit_test(&items, 20.0, 0.0), Some(b_id));
        assert_eq!(hit_test(&items, -40.0, 0.0), Some(a_id));
        assert_eq!(hit_test(&items, 500.0, 500.0), None);
    }

    #[test]
    fn rotation_is_honoured() {
        let mut r = create_rectangle_state(0.0, 0.0);
        r.frame_mut().unwrap().rotation = FRAC_PI_4;
        let id = r.id;
        let items = vec![Arc::new(r)];
        // corner of the unrotated square is outside the diamond
        assert_eq!(hit_test(&items, 48.0, 48.0), None);
        assert_eq!(hit_test(&items, 0.0, 65.0), Some(id));
    }

    #[test]
    fn groups_are_hit_through_children() {
        let a = create_rectangle_state(0.0, 0.0);
        let b = create_rectangle_state(300.0, 0.0);
        let a_id = a.id;
        let group = create_group_state(vec![Arc::new(a), Arc::new(b)]);
        let group_id = group.id;
        let items = vec![Arc::new(group)];
        assert_eq!(hit_test(&items, 0.0, 0.0), Some(a_id));
        assert_eq!(hit_test(&items, 150.0, 0.0), None);
        assert_eq!(hit_test_top_level(&items, 0.0, 0.0), Some(group_id));
    }

    #[test]
    fn canvas_body_is_hit() {
        let canvas = create_canvas_state(0.0, 0.0, vec![Arc::new(create_rectangle_state(0.0, 0.0))]);
        let id = canvas.id;
        assert_eq!(hit_test(&[Arc::new(canvas)], 150.0, 100.0), Some(id));
    }

    #[test]
    fn lines_are_hit_near_their_stroke() {
        let a = DiagramId::fresh();
        let line = create_connect_line_state(a, a, vec![PathPoint::new(0.0, 0.0), PathPoint::new(100.0, 0.0)]);
        let id = line.id;
        let items = vec![Arc::new(line)];
        assert_eq!(hit_test(&items, 50.0, 3.0), Some(id));
        assert_eq!(hit_test(&items, 50.0, 20.0), None);
    }

    #[test]
    fn marquee_selects_contained_top_level_items() {
        let a = create_rectangle_state(0.0, 0.0);
        let b = create_rectangle_state(500.0, 0.0);
        let a_id = a.id;
        let items = vec![Arc::new(a), Arc::new(b)];
        let rect = Bounds { x: -60.0, y: -60.0, width: 200.0, height: 200.0 };
        assert_eq!(diagrams_in_rect(&items, &rect), vec![a_id]);
    }
}
