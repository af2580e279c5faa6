//! Integration tests: structural properties of the diagram forest.
//!
//! Exercises `wb-core` across modules: factories → tree edits → cleanup →
//! transform propagation.

use std::collections::HashSet;
use std::f64::consts::FRAC_PI_2;
use std::sync::Arc;
use wb_core::geometry::rotate_point;
use wb_core::registry::{create_canvas_state, create_ellipse_state, create_group_state, create_rectangle_state};
use wb_core::tree::{collect_ids, get_diagram_by_id, remove_diagrams_by_id};
use wb_core::*;

/// Two rectangles grouped inside a canvas, a nested group with an empty
/// group, and a loose ellipse.
fn sample_forest() -> Vec<Arc<Diagram>> {
    let inner = create_group_state(vec![
        Arc::new(create_rectangle_state(0.0, 0.0)),
        Arc::new(create_rectangle_state(150.0, 0.0)),
    ]);
    let canvas = create_canvas_state(0.0, 300.0, vec![Arc::new(inner)]);
    let empty = create_group_state(vec![]);
    let singleton = create_group_state(vec![Arc::new(create_ellipse_state(600.0, 0.0)), Arc::new(empty)]);
    vec![
        Arc::new(canvas),
        Arc::new(singleton),
        Arc::new(create_ellipse_state(900.0, 0.0)),
    ]
}

fn sorted(mut ids: Vec<DiagramId>) -> Vec<DiagramId> {
    ids.sort_by_key(ToString::to_string);
    ids
}

// ─── Group cleanup ───────────────────────────────────────────────────────

#[test]
fn cleanup_is_idempotent() {
    let once = cleanup_groups(&sample_forest());
    let twice = cleanup_groups(&once);
    assert!(tree::all_ptr_eq(&once, &twice));
}

#[test]
fn cleanup_leaves_no_empty_or_singleton_groups() {
    let cleaned = cleanup_groups(&sample_forest());
    let mut groups = Vec::new();
    tree::for_each_diagram(&cleaned, &mut |d| {
        if d.diagram_type() == DiagramType::Group {
            groups.push(d.items().map_or(0, Vec::len));
        }
    });
    assert_eq!(groups, vec![2]);
    // the singleton group became its ellipse
    assert_eq!(cleaned[1].diagram_type(), DiagramType::Ellipse);
}

// ─── Remove / re-add symmetry ────────────────────────────────────────────

#[test]
fn removing_and_re_adding_subtrees_keeps_every_id() {
    let forest = cleanup_groups(&sample_forest());
    let all = collect_ids(&forest);
    let inner_group = forest[0].items().expect("canvas children")[0].id;
    let loose = forest[2].id;
    let removed_ids = HashSet::from([inner_group, loose]);

    let removed: Vec<Arc<Diagram>> = removed_ids
        .iter()
        .filter_map(|id| get_diagram_by_id(&forest, *id).cloned())
        .collect();
    let mut rebuilt = remove_diagrams_by_id(&forest, &removed_ids);
    assert!(collect_ids(&rebuilt).iter().all(|id| !removed_ids.contains(id)));
    rebuilt.extend(removed);

    assert_eq!(sorted(collect_ids(&rebuilt)), sorted(all));
}

// ─── Transform propagation ───────────────────────────────────────────────

#[test]
fn quarter_turn_of_a_group_moves_children_about_its_center() {
    let mut small = create_rectangle_state(100.0, 100.0);
    if let Some(frame) = small.frame_mut() {
        frame.width = 50.0;
        frame.height = 50.0;
    }
    let small_id = small.id;
    let group = create_group_state(vec![Arc::new(small), Arc::new(create_rectangle_state(200.0, 100.0))]);
    let center = group.center();

    let mut end = group.clone();
    if let Some(frame) = end.frame_mut() {
        frame.rotation = FRAC_PI_2;
    }
    let rotated = propagate_transform(&group, &end, &DiagramRegistry::with_defaults()).expect("non-degenerate scale");
    let child = get_diagram_by_id(rotated.items().expect("group children"), small_id).expect("child kept");

    let expected = rotate_point(100.0, 100.0, center.x, center.y, FRAC_PI_2);
    assert!(child.center().approx_eq(expected));
    assert!(lint_diagrams(&[Arc::new(rotated)], &DiagramRegistry::with_defaults()).is_empty());
}
