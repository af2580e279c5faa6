//! Integration tests: undo/redo history (wb-editor).
//!
//! Verifies that committed events can be undone and redone through the
//! engine, that gestures commit once, and that cancelled gestures never
//! reach history.

use std::sync::Arc;
use wb_core::registry::create_rectangle_state;
use wb_core::*;
use wb_editor::events::*;
use wb_editor::gesture::MoveGesture;
use wb_editor::{CanvasEngine, EditorConfig};

fn make_engine(items: Vec<Diagram>, config: EditorConfig) -> CanvasEngine {
    let _ = env_logger::builder().is_test(true).try_init();
    CanvasEngine::new(items.into_iter().map(Arc::new).collect(), DiagramRegistry::with_defaults(), config)
}

fn add(engine: &mut CanvasEngine, x: f64) {
    engine.handle(EditorEvent::AddDiagram(AddDiagramEvent {
        event_id: EventId::new(),
        diagram_type: DiagramType::Rectangle,
        x,
        y: 0.0,
    }));
}

fn undo(engine: &mut CanvasEngine) {
    engine.handle(EditorEvent::Undo { event_id: EventId::new() });
}

fn redo(engine: &mut CanvasEngine) {
    engine.handle(EditorEvent::Redo { event_id: EventId::new() });
}

fn xs(engine: &CanvasEngine) -> Vec<f64> {
    engine.items().iter().map(|d| d.x).collect()
}

// ─── Basic undo/redo ────────────────────────────────────────────────────

#[test]
fn undo_restores_previous_state() {
    let mut engine = make_engine(vec![], EditorConfig::default());
    add(&mut engine, 0.0);
    add(&mut engine, 200.0);
    assert_eq!(xs(&engine), vec![0.0, 200.0]);

    undo(&mut engine);
    assert_eq!(xs(&engine), vec![0.0]);
    undo(&mut engine);
    assert!(engine.items().is_empty());

    // nothing left: a further undo is a no-op
    undo(&mut engine);
    assert!(engine.items().is_empty());
    assert!(!engine.history().can_undo());
}

#[test]
fn redo_reapplies_and_new_commit_clears_redo() {
    let mut engine = make_engine(vec![], EditorConfig::default());
    add(&mut engine, 0.0);
    add(&mut engine, 200.0);
    undo(&mut engine);
    redo(&mut engine);
    assert_eq!(xs(&engine), vec![0.0, 200.0]);

    undo(&mut engine);
    add(&mut engine, 500.0);
    assert!(!engine.history().can_redo());
    redo(&mut engine);
    assert_eq!(xs(&engine), vec![0.0, 500.0]);
}

#[test]
fn undo_drops_selection_flags() {
    let mut engine = make_engine(vec![], EditorConfig::default());
    add(&mut engine, 0.0);
    add(&mut engine, 200.0);
    assert!(engine.items()[1].ui.is_selected);

    undo(&mut engine);
    assert!(engine.items().iter().all(|d| !d.ui.is_selected));
    assert!(engine.state().selected_diagram_path_index.is_empty());
}

#[test]
fn history_limit_caps_undo_depth() {
    let config = EditorConfig {
        history_limit: 3,
        ..EditorConfig::default()
    };
    let mut engine = make_engine(vec![], config);
    for i in 0..6 {
        add(&mut engine, f64::from(i) * 150.0);
    }
    assert_eq!(engine.history().undo_len(), 3);

    for _ in 0..10 {
        undo(&mut engine);
    }
    assert_eq!(engine.items().len(), 3);
}

// ─── Gestures ────────────────────────────────────────────────────────────

#[test]
fn undo_after_drag_returns_to_the_start_position() {
    let rect = create_rectangle_state(0.0, 0.0);
    let target = Arc::new(rect.clone());
    let mut engine = make_engine(vec![rect], EditorConfig::default());

    let (gesture, started) = MoveGesture::begin(vec![target], Point::new(0.0, 0.0));
    for event in started
        .into_iter()
        .chain(gesture.update(Point::new(30.0, 0.0), false))
        .chain(gesture.finish(Point::new(60.0, 20.0), false))
    {
        engine.handle(event);
    }
    assert_eq!((engine.items()[0].x, engine.items()[0].y), (60.0, 20.0));

    undo(&mut engine);
    assert_eq!((engine.items()[0].x, engine.items()[0].y), (0.0, 0.0));
    redo(&mut engine);
    assert_eq!((engine.items()[0].x, engine.items()[0].y), (60.0, 20.0));
}

#[test]
fn cancel_restores_snapshot_without_history() {
    let rect = create_rectangle_state(0.0, 0.0);
    let target = Arc::new(rect.clone());
    let mut engine = make_engine(vec![rect], EditorConfig::default());

    let (gesture, started) = MoveGesture::begin(vec![target], Point::new(0.0, 0.0));
    for event in started.into_iter().chain(gesture.update(Point::new(90.0, 90.0), false)) {
        engine.handle(event);
    }
    assert_eq!(engine.items()[0].x, 90.0);
    engine.handle(gesture.cancel());

    assert_eq!((engine.items()[0].x, engine.items()[0].y), (0.0, 0.0));
    assert_eq!(engine.state().interaction_state, InteractionState::Idle);
    assert_eq!(engine.history().undo_len(), 0);
}

#[test]
fn undo_mid_gesture_abandons_the_gesture() {
    let rect = create_rectangle_state(0.0, 0.0);
    let target = Arc::new(rect.clone());
    let mut engine = make_engine(vec![rect], EditorConfig::default());
    add(&mut engine, 400.0);

    let (gesture, started) = MoveGesture::begin(vec![target], Point::new(0.0, 0.0));
    for event in started.into_iter().chain(gesture.update(Point::new(50.0, 0.0), false)) {
        engine.handle(event);
    }
    undo(&mut engine);

    // the drag is rolled back first, then the add is undone
    assert_eq!(xs(&engine), vec![0.0]);
    assert_eq!(engine.state().interaction_state, InteractionState::Idle);
}

#[test]
fn style_and_structure_changes_are_separate_steps() {
    let rect = create_rectangle_state(0.0, 0.0);
    let id = rect.id;
    let mut engine = make_engine(vec![rect], EditorConfig::default());

    engine.handle(EditorEvent::DiagramStyleChange(DiagramStyleChangeEvent {
        event_id: EventId::new(),
        id,
        data: StylePatch {
            fill: "#336699".parse().ok(),
            ..StylePatch::default()
        },
    }));
    engine.handle(EditorEvent::StackOrderChange(StackOrderChangeEvent {
        event_id: EventId::new(),
        id,
        change_type: StackOrderChange::SendToBack,
    }));
    // already at the back: nothing to commit
    assert_eq!(engine.history().undo_len(), 1);

    undo(&mut engine);
    let fill = engine.items()[0].paint().map(|p| p.fill.to_hex());
    assert_ne!(fill.as_deref(), Some("#336699"));
}
