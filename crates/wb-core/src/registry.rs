//! Diagram factories and the injectable type registry.
//!
//! `create_*_state` functions build seeded defaults with anchors already in
//! place. `DiagramRegistry` maps each creatable type to its factory and
//! anchor generator; the editor receives one at construction.

use crate::connect::{default_anchor_generator, update_connect_points_with, AnchorGenerator};
use crate::geometry::{Bounds, OrientedBox};
use crate::id::DiagramId;
use crate::layout::group_frame_from_children;
use crate::model::{
    AnchorName, ArrowHead, Color, ConnectLine, ConnectPoints, Container, Diagram, DiagramKind,
    DiagramType, Frame, Group, Image, LineStyle, Paint, PathPoint, PathShape, PathType, Shape, TextProps,
};
use crate::tree::apply_function_recursively;
use std::collections::HashMap;
use std::sync::Arc;

// ─── Factories ───────────────────────────────────────────────────────────

fn with_anchors(mut d: Diagram) -> Diagram {
    if let Some(generator) = default_anchor_generator(d.diagram_type()) {
        update_connect_points_with(&mut d, generator);
    }
    d
}

fn shape(width: f64, height: f64, paint: Paint, text: TextProps) -> Shape {
    Shape {
        frame: Frame::sized(width, height),
        paint,
        text,
        corner_radius: 0.0,
        connect_points: ConnectPoints::new(),
    }
}

pub fn create_rectangle_state(x: f64, y: f64) -> Diagram {
    with_anchors(Diagram::new(
        DiagramId::fresh(),
        x,
        y,
        DiagramKind::Rectangle(shape(100.0, 100.0, Paint::default(), TextProps::default())),
    ))
}

pub fn create_ellipse_state(x: f64, y: f64) -> Diagram {
    with_anchors(Diagram::new(
        DiagramId::fresh(),
        x,
        y,
        DiagramKind::Ellipse(shape(100.0, 100.0, Paint::default(), TextProps::default())),
    ))
}

pub fn create_text_state(x: f64, y: f64) -> Diagram {
    let paint = Paint {
        fill: Color::TRANSPARENT,
        stroke: Color::TRANSPARENT,
        stroke_width: 0.0,
    };
    let text = TextProps {
        text: "Text".to_owned(),
        ..TextProps::default()
    };
    with_anchors(Diagram::new(
        DiagramId::fresh(),
        x,
        y,
        DiagramKind::Text(shape(120.0, 40.0, paint, text)),
    ))
}

pub fn create_image_state(x: f64, y: f64, src: impl Into<String>) -> Diagram {
    with_anchors(Diagram::new(
        DiagramId::fresh(),
        x,
        y,
        DiagramKind::Image(Image {
            frame: Frame::sized(200.0, 150.0),
            src: src.into(),
            connect_points: ConnectPoints::new(),
        }),
    ))
}

/// Free-form path framed by its points.
pub fn create_path_state(points: Vec<PathPoint>) -> Diagram {
    let bounds = Bounds::from_points(points.iter().map(PathPoint::point)).unwrap_or_default();
    let c = bounds.center();
    Diagram::new(
        DiagramId::fresh(),
        c.x,
        c.y,
        DiagramKind::Path(PathShape {
            frame: Frame::sized(bounds.width, bounds.height),
            stroke: Color::BLACK,
            stroke_width: 2.0,
            points,
        }),
    )
}

/// Group whose frame is derived from `items`; an empty group gets a
/// zero-sized frame at the origin.
pub fn create_group_state(items: Vec<Arc<Diagram>>) -> Diagram {
    let mut group = Diagram::new(
        DiagramId::fresh(),
        0.0,
        0.0,
        DiagramKind::Group(Group {
            frame: Frame::sized(0.0, 0.0),
            items,
        }),
    );
    if let Ok(frame) = group_frame_from_children(&group) {
        group.set_oriented_box(&frame);
    }
    let rotate_enabled = group
        .items()
        .is_none_or(|items| items.iter().all(|c| c.frame().is_none_or(|f| f.rotate_enabled)));
    if let Some(frame) = group.frame_mut() {
        frame.rotate_enabled = rotate_enabled;
    }
    group
}

fn container(width: f64, height: f64, label: &str, items: Vec<Arc<Diagram>>) -> Container {
    Container {
        frame: Frame::sized(width, height),
        paint: Paint {
            fill: Color::WHITE,
            stroke: Color::rgb8(0xB2, 0xBE, 0xC3),
            stroke_width: 1.0,
        },
        text: TextProps {
            text: label.to_owned(),
            vertical_align: crate::model::VerticalAlign::Top,
            ..TextProps::default()
        },
        connect_points: ConnectPoints::new(),
        items,
    }
}

pub fn create_canvas_state(x: f64, y: f64, items: Vec<Arc<Diagram>>) -> Diagram {
    with_anchors(Diagram::new(
        DiagramId::fresh(),
        x,
        y,
        DiagramKind::Canvas(container(400.0, 300.0, "Frame", items)),
    ))
}

/// Agent node with its embedded prompt input as a child.
pub fn create_agent_node_state(x: f64, y: f64) -> Diagram {
    let mut input = create_text_state(x, y + 30.0);
    if let Some(text) = input.text_mut() {
        text.text.clear();
    }
    if let Some(frame) = input.frame_mut() {
        frame.width = 200.0;
    }
    let input = with_anchors(input);
    with_anchors(Diagram::new(
        DiagramId::fresh(),
        x,
        y,
        DiagramKind::AgentNode(container(240.0, 160.0, "Agent", vec![Arc::new(input)])),
    ))
}

/// Manually routed line between two owners.
pub fn create_connect_line_state(start_owner_id: DiagramId, end_owner_id: DiagramId, points: Vec<PathPoint>) -> Diagram {
    let c = Bounds::from_points(points.iter().map(PathPoint::point))
        .unwrap_or_default()
        .center();
    Diagram::new(
        DiagramId::fresh(),
        c.x,
        c.y,
        DiagramKind::ConnectLine(ConnectLine {
            stroke: Color::BLACK,
            stroke_width: 2.0,
            line_style: LineStyle::Solid,
            path_type: PathType::Polyline,
            start_arrow_head: ArrowHead::None,
            end_arrow_head: ArrowHead::Triangle,
            auto_routing: false,
            start_owner_id,
            end_owner_id,
            start_anchor: AnchorName::RightCenter,
            end_anchor: AnchorName::LeftCenter,
            points,
        }),
    )
}

// ─── Registry ────────────────────────────────────────────────────────────

/// Creates a default diagram centered at `(x, y)`.
pub type DiagramFactory = fn(f64, f64) -> Diagram;

#[derive(Clone, Copy)]
struct Entry {
    factory: Option<DiagramFactory>,
    anchors: Option<AnchorGenerator>,
}

/// Type → factory / anchor generator lookup. Built explicitly and passed to
/// whoever needs it.
#[derive(Clone, Default)]
pub struct DiagramRegistry {
    entries: HashMap<DiagramType, Entry>,
}

impl std::fmt::Debug for DiagramRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagramRegistry")
            .field("types", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl DiagramRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry covering the built-in catalog.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let factories: [(DiagramType, DiagramFactory); 6] = [
            (DiagramType::Rectangle, create_rectangle_state),
            (DiagramType::Ellipse, create_ellipse_state),
            (DiagramType::Text, create_text_state),
            (DiagramType::Image, |x, y| create_image_state(x, y, "")),
            (DiagramType::Canvas, |x, y| create_canvas_state(x, y, Vec::new())),
            (DiagramType::AgentNode, create_agent_node_state),
        ];
        for (ty, factory) in factories {
            registry.register(ty, Some(factory), default_anchor_generator(ty));
        }
        registry
    }

    /// Add or replace a type's entry.
    pub fn register(&mut self, ty: DiagramType, factory: Option<DiagramFactory>, anchors: Option<AnchorGenerator>) {
        self.entries.insert(ty, Entry { factory, anchors });
    }

    pub fn is_registered(&self, ty: DiagramType) -> bool {
        self.entries.contains_key(&ty)
    }

    /// Build a new diagram of `ty` at `(x, y)`, or `None` if the type has
    /// no factory.
    pub fn create(&self, ty: DiagramType, x: f64, y: f64) -> Option<Diagram> {
        let entry = self.entries.get(&ty)?;
        let mut d = (entry.factory?)(x, y);
        if let Some(generator) = entry.anchors {
            update_connect_points_with(&mut d, generator);
        }
        Some(d)
    }

    pub fn anchor_generator(&self, ty: DiagramType) -> Option<AnchorGenerator> {
        self.entries.get(&ty).and_then(|e| e.anchors)
    }

    /// Regenerate the anchors of a connectable diagram.
    pub fn update_connect_points(&self, diagram: &mut Diagram) {
        if let Some(generator) = self.anchor_generator(diagram.diagram_type()) {
            update_connect_points_with(diagram, generator);
        }
    }

    /// Regenerate anchors of every connectable diagram whose frame no longer
    /// matches them.
    pub fn refresh_connect_points(&self, items: &[Arc<Diagram>]) -> Vec<Arc<Diagram>> {
        apply_function_recursively(items, &mut |d| {
            let (Some(generator), Some(frame), Some(points)) = (
                self.anchor_generator(d.diagram_type()),
                d.oriented_box(),
                d.connect_points(),
            ) else {
                return Arc::clone(d);
            };
            if anchors_match(points, &frame, generator) {
                return Arc::clone(d);
            }
            let mut next = (**d).clone();
            update_connect_points_with(&mut next, generator);
            Arc::new(next)
        })
    }
}

fn anchors_match(points: &ConnectPoints, frame: &OrientedBox, generator: AnchorGenerator) -> bool {
    let expected = generator(frame);
    points.len() == expected.len()
        && points.iter().all(|cp| {
            expected
                .iter()
                .any(|(name, p)| *name == cp.name && p.approx_eq(cp.point()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connect::connect_points_are_current;
    use pretty_assertions::assert_eq;

    #[test]
    fn factories_seed_anchors() {
        for d in [
            create_rectangle_state(0.0, 0.0),
            create_ellipse_state(0.0, 0.0),
            create_text_state(0.0, 0.0),
            create_image_state(0.0, 0.0, "cat.png"),
            create_canvas_state(0.0, 0.0, vec![]),
            create_agent_node_state(0.0, 0.0),
        ] {
            assert_eq!(d.connect_points().map(|c| c.len()), Some(8), "{}", d.diagram_type());
            assert!(connect_points_are_current(&d, &DiagramRegistry::with_defaults()));
            assert!(d.validate().is_ok());
        }
    }

    #[test]
    fn agent_node_embeds_input() {
        let node = create_agent_node_state(10.0, 10.0);
        let items = node.items().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].diagram_type(), DiagramType::Text);
    }

    #[test]
    fn registry_creates_registered_types_only() {
        let registry = DiagramRegistry::with_defaults();
        let r = registry.create(DiagramType::Ellipse, 5.0, 6.0).unwrap();
        assert_eq!(r.diagram_type(), DiagramType::Ellipse);
        assert_eq!((r.x, r.y), (5.0, 6.0));
        assert!(registry.create(DiagramType::Group, 0.0, 0.0).is_none());
        assert!(registry.create(DiagramType::ConnectLine, 0.0, 0.0).is_none());
        assert!(DiagramRegistry::new().create(DiagramType::Rectangle, 0.0, 0.0).is_none());
    }

    #[test]
    fn custom_generator_is_used() {
        fn all_at_center(b: &OrientedBox) -> [(AnchorName, crate::geometry::Point); 8] {
            AnchorName::ALL.map(|n| (n, b.center()))
        }
        let mut registry = DiagramRegistry::with_defaults();
        registry.register(DiagramType::Rectangle, Some(create_rectangle_state), Some(all_at_center));
        let r = registry.create(DiagramType::Rectangle, 7.0, 8.0).unwrap();
        assert!(r.connect_points().unwrap().iter().all(|cp| (cp.x, cp.y) == (7.0, 8.0)));
    }

    #[test]
    fn refresh_only_touches_stale_shapes() {
        let registry = DiagramRegistry::with_defaults();
        let fresh = Arc::new(create_rectangle_state(0.0, 0.0));
        let mut stale = create_rectangle_state(0.0, 0.0);
        stale.x = 300.0;
        let items = vec![Arc::clone(&fresh), Arc::new(stale)];
        let out = registry.refresh_connect_points(&items);
        assert!(Arc::ptr_eq(&out[0], &fresh));
        assert!(connect_points_are_current(&out[1], &DiagramRegistry::with_defaults()));
    }

    #[test]
    fn group_factory_derives_frame() {
        let g = create_group_state(vec![
            Arc::new(create_rectangle_state(0.0, 0.0)),
            Arc::new(create_rectangle_state(100.0, 0.0)),
        ]);
        assert_eq!((g.x, g.y), (50.0, 0.0));
        assert_eq!(g.frame().unwrap().width, 200.0);
        let empty = create_group_state(vec![]);
        assert_eq!(empty.frame().unwrap().width, 0.0);
    }
}
