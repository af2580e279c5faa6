//! Pointer gestures → `DiagramChangeEvent`s.
//!
//! A gesture owns one [`EventId`] for its whole life and emits absolute
//! requests (start diagram plus where it should end up now), so the pipeline
//! can replay any tick against its snapshot.

use crate::events::{DiagramChangeEvent, EditorEvent, EventId, EventPhase};
use std::f64::consts::PI;
use std::sync::Arc;
use wb_core::geometry::{normalize_radians, rotate_point};
use wb_core::transform::apply_keep_proportion;
use wb_core::{Diagram, OrientedBox, Point};

/// Rotation snap step while shift is held.
const ROTATE_SNAP: f64 = PI / 12.0;

fn change(event_id: EventId, phase: EventPhase, start: &Arc<Diagram>, end: Diagram) -> EditorEvent {
    EditorEvent::DiagramChange(DiagramChangeEvent {
        event_id,
        id: start.id,
        phase,
        start_diagram: Arc::clone(start),
        end_diagram: Arc::new(end),
        min_x: None,
        min_y: None,
    })
}

// ─── Move ────────────────────────────────────────────────────────────────

/// Drag one or more diagrams. Every target shares the gesture's event id.
#[derive(Debug, Clone)]
pub struct MoveGesture {
    event_id: EventId,
    targets: Vec<Arc<Diagram>>,
    origin: Point,
}

impl MoveGesture {
    pub fn begin(targets: Vec<Arc<Diagram>>, pointer: Point) -> (Self, Vec<EditorEvent>) {
        let gesture = Self {
            event_id: EventId::new(),
            targets,
            origin: pointer,
        };
        let events = gesture.events(EventPhase::Started, Point::new(0.0, 0.0));
        (gesture, events)
    }

    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    /// Shift locks the drag to the dominant axis.
    pub fn update(&self, pointer: Point, axis_lock: bool) -> Vec<EditorEvent> {
        self.events(EventPhase::InProgress, self.delta(pointer, axis_lock))
    }

    pub fn finish(self, pointer: Point, axis_lock: bool) -> Vec<EditorEvent> {
        self.events(EventPhase::Ended, self.delta(pointer, axis_lock))
    }

    pub fn cancel(self) -> EditorEvent {
        EditorEvent::CancelInteraction { event_id: self.event_id }
    }

    fn delta(&self, pointer: Point, axis_lock: bool) -> Point {
        let dx = pointer.x - self.origin.x;
        let dy = pointer.y - self.origin.y;
        match axis_lock {
            true if dx.abs() >= dy.abs() => Point::new(dx, 0.0),
            true => Point::new(0.0, dy),
            false => Point::new(dx, dy),
        }
    }

    fn events(&self, phase: EventPhase, delta: Point) -> Vec<EditorEvent> {
        self.targets
            .iter()
            .map(|t| change(self.event_id, phase, t, t.translated(delta.x, delta.y)))
            .collect()
    }
}

// ─── Resize ──────────────────────────────────────────────────────────────

/// Handle being dragged, in the frame's local (unrotated) space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeHandle {
    TopLeft,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
}

impl ResizeHandle {
    /// Which way each axis grows when the handle moves outward.
    fn direction(self) -> (f64, f64) {
        match self {
            ResizeHandle::TopLeft => (-1.0, -1.0),
            ResizeHandle::Top => (0.0, -1.0),
            ResizeHandle::TopRight => (1.0, -1.0),
            ResizeHandle::Right => (1.0, 0.0),
            ResizeHandle::BottomRight => (1.0, 1.0),
            ResizeHandle::Bottom => (0.0, 1.0),
            ResizeHandle::BottomLeft => (-1.0, 1.0),
            ResizeHandle::Left => (-1.0, 0.0),
        }
    }
}

/// Resize by a handle, keeping the opposite edge fixed. Dragging past the
/// opposite edge flips the diagram.
#[derive(Debug, Clone)]
pub struct ResizeGesture {
    event_id: EventId,
    target: Arc<Diagram>,
    handle: ResizeHandle,
    origin: Point,
    start: OrientedBox,
}

impl ResizeGesture {
    /// `None` for diagrams without a frame.
    pub fn begin(target: Arc<Diagram>, handle: ResizeHandle, pointer: Point) -> Option<(Self, EditorEvent)> {
        let start = target.oriented_box()?;
        let started = change(EventId::new(), EventPhase::Started, &target, (*target).clone());
        let gesture = Self {
            event_id: started.event_id(),
            target,
            handle,
            origin: pointer,
            start,
        };
        Some((gesture, started))
    }

    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    /// Shift forces proportional resizing even without `keep_proportion`.
    pub fn update(&self, pointer: Point, shift: bool) -> EditorEvent {
        change(self.event_id, EventPhase::InProgress, &self.target, self.resized(pointer, shift))
    }

    pub fn finish(self, pointer: Point, shift: bool) -> EditorEvent {
        change(self.event_id, EventPhase::Ended, &self.target, self.resized(pointer, shift))
    }

    pub fn cancel(self) -> EditorEvent {
        EditorEvent::CancelInteraction { event_id: self.event_id }
    }

    fn resized(&self, pointer: Point, shift: bool) -> Diagram {
        let start = self.start;
        let local = rotate_point(
            pointer.x - self.origin.x,
            pointer.y - self.origin.y,
            0.0,
            0.0,
            -start.rotation,
        );
        let (hx, hy) = self.handle.direction();
        let mut w = start.width + hx * local.x;
        let mut h = start.height + hy * local.y;

        let keep = shift || self.target.frame().is_some_and(|f| f.keep_proportion);
        if keep {
            let (kw, kh) = apply_keep_proportion(start.width, start.height, w.abs(), h.abs());
            w = kw.copysign(w);
            h = kh.copysign(h);
        }

        // opposite edge stays put: shift the center by half the growth
        let center = start.local_to_canvas(Point::new(
            hx * (w - start.width) / 2.0,
            hy * (h - start.height) / 2.0,
        ));
        let next = OrientedBox {
            x: center.x,
            y: center.y,
            width: w.abs(),
            height: h.abs(),
            rotation: start.rotation,
            scale_x: if w < 0.0 { -start.scale_x } else { start.scale_x },
            scale_y: if h < 0.0 { -start.scale_y } else { start.scale_y },
        };
        let mut end = (*self.target).clone();
        end.set_oriented_box(&next);
        end
    }
}

// ─── Rotate ──────────────────────────────────────────────────────────────

/// Rotate about the diagram center following the pointer angle.
#[derive(Debug, Clone)]
pub struct RotateGesture {
    event_id: EventId,
    target: Arc<Diagram>,
    center: Point,
    start_angle: f64,
    start_rotation: f64,
}

impl RotateGesture {
    /// `None` when the diagram has no frame or rotation is disabled.
    pub fn begin(target: Arc<Diagram>, pointer: Point) -> Option<(Self, EditorEvent)> {
        let frame = target.frame()?;
        if !frame.rotate_enabled {
            return None;
        }
        let start_rotation = frame.rotation;
        let center = target.center();
        let started = change(EventId::new(), EventPhase::Started, &target, (*target).clone());
        let gesture = Self {
            event_id: started.event_id(),
            start_angle: (pointer.y - center.y).atan2(pointer.x - center.x),
            target,
            center,
            start_rotation,
        };
        Some((gesture, started))
    }

    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    /// Shift snaps to 15° steps.
    pub fn update(&self, pointer: Point, snap: bool) -> EditorEvent {
        change(self.event_id, EventPhase::InProgress, &self.target, self.rotated(pointer, snap))
    }

    pub fn finish(self, pointer: Point, snap: bool) -> EditorEvent {
        change(self.event_id, EventPhase::Ended, &self.target, self.rotated(pointer, snap))
    }

    pub fn cancel(self) -> EditorEvent {
        EditorEvent::CancelInteraction { event_id: self.event_id }
    }

    fn rotated(&self, pointer: Point, snap: bool) -> Diagram {
        let angle = (pointer.y - self.center.y).atan2(pointer.x - self.center.x);
        let mut rotation = normalize_radians(self.start_rotation + angle - self.start_angle);
        if snap {
            rotation = normalize_radians((rotation / ROTATE_SNAP).round() * ROTATE_SNAP);
        }
        let mut end = (*self.target).clone();
        if let Some(frame) = end.frame_mut() {
            frame.rotation = rotation;
        }
        end
    }
}
