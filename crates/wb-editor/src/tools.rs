//! Tool system for canvas interactions.
//!
//! Each tool translates [`InputEvent`]s into [`EditorEvent`]s for the
//! [`CanvasEngine`](crate::pipeline::CanvasEngine). Tools read the current
//! forest but never mutate it; the selection lives on the diagrams.
//!
//! ## Modifier behaviors
//!
//! | Modifier | Select Tool | Insert Tool | Connect Tool |
//! |----------|-------------|-------------|--------------|
//! | **Shift** | Toggle selection, axis-constrain drag, extend marquee | - | - |

use crate::events::{AddDiagramEvent, ConnectShapesEvent, EditorEvent, EventId, SelectDiagramsEvent};
use crate::gesture::MoveGesture;
use crate::input::InputEvent;
use std::sync::Arc;
use wb_core::hit::{diagrams_in_rect, hit_test, hit_test_top_level};
use wb_core::selection::get_selected_ids;
use wb_core::tree::get_diagram_by_id;
use wb_core::{Bounds, Diagram, DiagramId, DiagramType, Point};

/// Pointer travel before a press turns into a drag.
const DRAG_THRESHOLD: f64 = 3.0;

/// The active tool determines how input events are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    Select,
    Insert(DiagramType),
    Connect,
}

/// Trait for tools that handle input and produce pipeline events.
pub trait Tool {
    fn kind(&self) -> ToolKind;

    /// Handle an input event against the current forest.
    fn handle(&mut self, event: &InputEvent, items: &[Arc<Diagram>]) -> Vec<EditorEvent>;
}

// ─── Select Tool ─────────────────────────────────────────────────────────

#[derive(Debug, Default)]
enum SelectState {
    #[default]
    Idle,
    /// Pressed on a diagram; not yet past the drag threshold.
    Pressed { origin: Point, targets: Vec<Arc<Diagram>> },
    Dragging(MoveGesture),
    Marquee { origin: Point, current: Point },
}

#[derive(Debug, Default)]
pub struct SelectTool {
    state: SelectState,
}

impl SelectTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current marquee rectangle, for rendering the rubber band.
    pub fn marquee_rect(&self) -> Option<Bounds> {
        match self.state {
            SelectState::Marquee { origin, current } => Some(normalize_rect(origin, current)),
            _ => None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, SelectState::Dragging(_))
    }

    fn press(&mut self, p: Point, shift: bool, items: &[Arc<Diagram>]) -> Vec<EditorEvent> {
        let selected = get_selected_ids(items);
        let Some(hit) = hit_test_top_level(items, p.x, p.y) else {
            self.state = SelectState::Marquee { origin: p, current: p };
            if shift || selected.is_empty() {
                return vec![];
            }
            return vec![EditorEvent::ClearSelection { event_id: EventId::new() }];
        };

        let next: Vec<DiagramId> = if shift {
            // Shift+click: toggle in/out of the selection
            if selected.contains(&hit) {
                selected.iter().copied().filter(|id| *id != hit).collect()
            } else {
                selected.iter().copied().chain([hit]).collect()
            }
        } else if selected.contains(&hit) {
            // keep the selection so a multi-drag can start
            selected.clone()
        } else {
            vec![hit]
        };

        self.state = if next.contains(&hit) {
            SelectState::Pressed {
                origin: p,
                targets: next.iter().filter_map(|id| get_diagram_by_id(items, *id)).cloned().collect(),
            }
        } else {
            SelectState::Idle
        };

        if next == selected {
            return vec![];
        }
        vec![EditorEvent::SelectDiagrams(SelectDiagramsEvent {
            event_id: EventId::new(),
            ids: next,
            extend: false,
        })]
    }
}

impl Tool for SelectTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Select
    }

    fn handle(&mut self, event: &InputEvent, items: &[Arc<Diagram>]) -> Vec<EditorEvent> {
        let shift = event.modifiers().shift;
        match (*event, std::mem::take(&mut self.state)) {
            (InputEvent::PointerDown { x, y, .. }, SelectState::Dragging(gesture)) => {
                // a second press while dragging aborts the first drag
                let mut events = vec![gesture.cancel()];
                events.extend(self.press(Point::new(x, y), shift, items));
                events
            }
            (InputEvent::PointerDown { x, y, .. }, _) => self.press(Point::new(x, y), shift, items),

            (InputEvent::PointerMove { x, y, .. }, SelectState::Pressed { origin, targets }) => {
                let p = Point::new(x, y);
                if p.distance(origin) < DRAG_THRESHOLD {
                    self.state = SelectState::Pressed { origin, targets };
                    return vec![];
                }
                let (gesture, mut events) = MoveGesture::begin(targets, origin);
                events.extend(gesture.update(p, shift));
                self.state = SelectState::Dragging(gesture);
                events
            }
            (InputEvent::PointerMove { x, y, .. }, SelectState::Dragging(gesture)) => {
                let events = gesture.update(Point::new(x, y), shift);
                self.state = SelectState::Dragging(gesture);
                events
            }
            (InputEvent::PointerMove { x, y, .. }, SelectState::Marquee { origin, .. }) => {
                self.state = SelectState::Marquee {
                    origin,
                    current: Point::new(x, y),
                };
                vec![]
            }

            (InputEvent::PointerUp { x, y, .. }, SelectState::Dragging(gesture)) => {
                gesture.finish(Point::new(x, y), shift)
            }
            (InputEvent::PointerUp { x, y, .. }, SelectState::Marquee { origin, .. }) => {
                let p = Point::new(x, y);
                if p.distance(origin) < DRAG_THRESHOLD {
                    return vec![];
                }
                let ids = diagrams_in_rect(items, &normalize_rect(origin, p));
                if ids.is_empty() && shift {
                    return vec![];
                }
                vec![EditorEvent::SelectDiagrams(SelectDiagramsEvent {
                    event_id: EventId::new(),
                    ids,
                    extend: shift,
                })]
            }

            (InputEvent::Cancel, SelectState::Dragging(gesture)) => vec![gesture.cancel()],
            // anything else leaves the tool idle
            _ => vec![],
        }
    }
}

fn normalize_rect(a: Point, b: Point) -> Bounds {
    Bounds {
        x: a.x.min(b.x),
        y: a.y.min(b.y),
        width: (b.x - a.x).abs(),
        height: (b.y - a.y).abs(),
    }
}

// ─── Insert Tool ─────────────────────────────────────────────────────────

/// Places a new diagram of `diagram_type` where the pointer is released.
#[derive(Debug, Clone, Copy)]
pub struct InsertTool {
    pub diagram_type: DiagramType,
}

impl InsertTool {
    pub fn new(diagram_type: DiagramType) -> Self {
        Self { diagram_type }
    }
}

impl Tool for InsertTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Insert(self.diagram_type)
    }

    fn handle(&mut self, event: &InputEvent, _items: &[Arc<Diagram>]) -> Vec<EditorEvent> {
        match *event {
            InputEvent::PointerUp { x, y, .. } => vec![EditorEvent::AddDiagram(AddDiagramEvent {
                event_id: EventId::new(),
                diagram_type: self.diagram_type,
                x,
                y,
            })],
            _ => vec![],
        }
    }
}

// ─── Connect Tool ────────────────────────────────────────────────────────

/// Drag from one connectable shape to another to draw a connect line.
#[derive(Debug, Default)]
pub struct ConnectTool {
    source: Option<DiagramId>,
}

impl ConnectTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(&self) -> Option<DiagramId> {
        self.source
    }
}

fn connectable_at(items: &[Arc<Diagram>], p: Point) -> Option<DiagramId> {
    let id = hit_test(items, p.x, p.y)?;
    get_diagram_by_id(items, id).filter(|d| d.is_connectable()).map(|d| d.id)
}

impl Tool for ConnectTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Connect
    }

    fn handle(&mut self, event: &InputEvent, items: &[Arc<Diagram>]) -> Vec<EditorEvent> {
        match *event {
            InputEvent::PointerDown { x, y, .. } => {
                self.source = connectable_at(items, Point::new(x, y));
                vec![]
            }
            InputEvent::PointerUp { x, y, .. } => {
                let Some(source) = self.source.take() else {
                    return vec![];
                };
                match connectable_at(items, Point::new(x, y)) {
                    Some(target) if target != source => vec![EditorEvent::ConnectShapes(ConnectShapesEvent {
                        event_id: EventId::new(),
                        source_shape_id: source,
                        target_shape_id: target,
                        source_anchor: None,
                        target_anchor: None,
                        start_arrow_head: None,
                        end_arrow_head: None,
                        line_style: None,
                        path_type: None,
                    })],
                    _ => vec![],
                }
            }
            InputEvent::Cancel => {
                self.source = None;
                vec![]
            }
            InputEvent::PointerMove { .. } => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventPhase;
    use crate::input::Modifiers;
    use pretty_assertions::assert_eq;
    use wb_core::registry::create_rectangle_state;

    fn two_rects() -> Vec<Arc<Diagram>> {
        vec![
            Arc::new(create_rectangle_state(0.0, 0.0)),
            Arc::new(create_rectangle_state(300.0, 0.0)),
        ]
    }

    fn phases(events: &[EditorEvent]) -> Vec<EventPhase> {
        events
            .iter()
            .filter_map(|e| match e {
                EditorEvent::DiagramChange(c) => Some(c.phase),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn click_selects_without_dragging() {
        let items = two_rects();
        let mut tool = SelectTool::new();
        let down = tool.handle(&InputEvent::down(10.0, 10.0), &items);
        let [EditorEvent::SelectDiagrams(select)] = down.as_slice() else {
            panic!("expected a select, got {down:?}");
        };
        assert_eq!(select.ids, vec![items[0].id]);
        assert!(tool.handle(&InputEvent::moved(11.0, 10.0), &items).is_empty());
        assert!(tool.handle(&InputEvent::up(11.0, 10.0), &items).is_empty());
    }

    #[test]
    fn drag_emits_one_gesture() {
        let items = two_rects();
        let mut tool = SelectTool::new();
        tool.handle(&InputEvent::down(0.0, 0.0), &items);
        let first = tool.handle(&InputEvent::moved(20.0, 0.0), &items);
        assert_eq!(phases(&first), vec![EventPhase::Started, EventPhase::InProgress]);
        assert!(tool.is_dragging());
        let last = tool.handle(&InputEvent::up(40.0, 0.0), &items);
        assert_eq!(phases(&last), vec![EventPhase::Ended]);
        assert_eq!(first[0].event_id(), last[0].event_id());
    }

    #[test]
    fn empty_click_clears_and_marquee_selects() {
        let mut items = two_rects();
        let mut selected = (*items[1]).clone();
        selected.ui.is_selected = true;
        items[1] = Arc::new(selected);

        let mut tool = SelectTool::new();
        let down = tool.handle(&InputEvent::down(-100.0, -100.0), &items);
        assert!(matches!(down.as_slice(), [EditorEvent::ClearSelection { .. }]));
        tool.handle(&InputEvent::moved(60.0, 60.0), &items);
        assert_eq!(
            tool.marquee_rect(),
            Some(Bounds { x: -100.0, y: -100.0, width: 160.0, height: 160.0 })
        );
        let up = tool.handle(&InputEvent::up(60.0, 60.0), &items);
        let [EditorEvent::SelectDiagrams(select)] = up.as_slice() else {
            panic!("expected a select, got {up:?}");
        };
        assert_eq!(select.ids, vec![items[0].id]);
        assert!(tool.marquee_rect().is_none());
    }

    #[test]
    fn shift_click_toggles() {
        let mut items = two_rects();
        let mut selected = (*items[0]).clone();
        selected.ui.is_selected = true;
        items[0] = Arc::new(selected);

        let mut tool = SelectTool::new();
        let shift_down = |x, y| InputEvent::PointerDown { x, y, modifiers: Modifiers::SHIFT };
        let add = tool.handle(&shift_down(300.0, 0.0), &items);
        let [EditorEvent::SelectDiagrams(select)] = add.as_slice() else {
            panic!("expected a select, got {add:?}");
        };
        assert_eq!(select.ids, vec![items[0].id, items[1].id]);

        let remove = tool.handle(&shift_down(0.0, 0.0), &items);
        let [EditorEvent::SelectDiagrams(select)] = remove.as_slice() else {
            panic!("expected a select, got {remove:?}");
        };
        assert!(select.ids.is_empty());
    }

    #[test]
    fn cancel_mid_drag_cancels_the_gesture() {
        let items = two_rects();
        let mut tool = SelectTool::new();
        tool.handle(&InputEvent::down(0.0, 0.0), &items);
        let started = tool.handle(&InputEvent::moved(20.0, 0.0), &items);
        let cancel = tool.handle(&InputEvent::Cancel, &items);
        let [EditorEvent::CancelInteraction { event_id }] = cancel.as_slice() else {
            panic!("expected a cancel, got {cancel:?}");
        };
        assert_eq!(*event_id, started[0].event_id());
        assert!(!tool.is_dragging());
    }

    #[test]
    fn insert_tool_adds_on_release() {
        let mut tool = InsertTool::new(DiagramType::Ellipse);
        assert!(tool.handle(&InputEvent::down(5.0, 6.0), &[]).is_empty());
        let up = tool.handle(&InputEvent::up(5.0, 6.0), &[]);
        let [EditorEvent::AddDiagram(add)] = up.as_slice() else {
            panic!("expected an add, got {up:?}");
        };
        assert_eq!((add.diagram_type, add.x, add.y), (DiagramType::Ellipse, 5.0, 6.0));
        assert_eq!(tool.kind(), ToolKind::Insert(DiagramType::Ellipse));
    }

    #[test]
    fn connect_tool_links_two_shapes() {
        let items = two_rects();
        let mut tool = ConnectTool::new();
        tool.handle(&InputEvent::down(0.0, 0.0), &items);
        assert_eq!(tool.source(), Some(items[0].id));
        let up = tool.handle(&InputEvent::up(300.0, 0.0), &items);
        let [EditorEvent::ConnectShapes(connect)] = up.as_slice() else {
            panic!("expected a connect, got {up:?}");
        };
        assert_eq!((connect.source_shape_id, connect.target_shape_id), (items[0].id, items[1].id));

        tool.handle(&InputEvent::down(0.0, 0.0), &items);
        assert!(tool.handle(&InputEvent::up(10.0, 0.0), &items).is_empty());
    }
}
