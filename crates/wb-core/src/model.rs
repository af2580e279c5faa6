//! Core diagram data model for whiteboard canvases.
//!
//! The canvas is a forest of `Diagram` values. Every diagram has an id, a
//! center position and a `DiagramKind` payload from a closed catalog. The
//! payload structs compose capability components (`Frame`, `Paint`,
//! `TextProps`, connect points, child items) so each kind carries exactly
//! the capabilities it supports. Children are held behind `Arc` so that
//! unchanged subtrees are shared between successive states.
//!
//! Coordinates are canvas units. Child centers are stored in the same canvas
//! space as their parent, which keeps group transforms a pure remapping of
//! centers.

use crate::error::ModelError;
use crate::geometry::{OrientedBox, Point};
use crate::id::DiagramId;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

// ─── Colors & Paint ──────────────────────────────────────────────────────

/// RGBA color. Stored as 4 × f32 [0.0, 1.0], serialized as a hex string.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color from 8-bit channels.
    pub const fn rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, 1.0)
    }

    /// Emit as `#RRGGBB`, or `#RRGGBBAA` when not fully opaque.
    pub fn to_hex(&self) -> String {
        let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        let (r, g, b, a) = (channel(self.r), channel(self.g), channel(self.b), channel(self.a));
        if a == 255 {
            format!("#{r:02X}{g:02X}{b:02X}")
        } else {
            format!("#{r:02X}{g:02X}{b:02X}{a:02X}")
        }
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Accepts `#RGB`, `#RRGGBB`, `#RRGGBBAA` (the `#` is optional) and the
/// keywords `transparent` / `none`.
impl FromStr for Color {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, ModelError> {
        let text = s.trim();
        if matches!(text, "transparent" | "none") {
            return Ok(Self::TRANSPARENT);
        }
        let digits = text.strip_prefix('#').unwrap_or(text);
        let invalid = || ModelError::InvalidColor { value: s.to_owned() };
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        // every byte is an ASCII hex digit, so byte slicing is safe
        let channels: Vec<u8> = match digits.len() {
            3 => digits
                .chars()
                .filter_map(|c| c.to_digit(16))
                .map(|v| v as u8 * 17)
                .collect(),
            6 | 8 => (0..digits.len())
                .step_by(2)
                .filter_map(|i| u8::from_str_radix(&digits[i..i + 2], 16).ok())
                .collect(),
            _ => return Err(invalid()),
        };
        let unit = |i: usize| channels.get(i).map_or(1.0, |&v| f32::from(v) / 255.0);
        Ok(Self::rgba(unit(0), unit(1), unit(2), unit(3)))
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Paint capability: fill + stroke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paint {
    pub fill: Color,
    pub stroke: Color,
    pub stroke_width: f64,
}

impl Default for Paint {
    fn default() -> Self {
        Self {
            fill: Color::WHITE,
            stroke: Color::BLACK,
            stroke_width: 1.0,
        }
    }
}

// ─── Text ────────────────────────────────────────────────────────────────

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

/// Vertical text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VerticalAlign {
    Top,
    #[default]
    Center,
    Bottom,
}

/// Text capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextProps {
    pub text: String,
    pub font_size: f64,
    pub font_color: Color,
    pub font_weight: u16,
    pub text_align: TextAlign,
    pub vertical_align: VerticalAlign,
}

impl Default for TextProps {
    fn default() -> Self {
        Self {
            text: String::new(),
            font_size: 16.0,
            font_color: Color::BLACK,
            font_weight: 400,
            text_align: TextAlign::Center,
            vertical_align: VerticalAlign::Center,
        }
    }
}

// ─── Frame ───────────────────────────────────────────────────────────────

/// Size, orientation and constraint capability.
///
/// The center lives on the owning `Diagram`; `rotation` is in radians and
/// `scale_x`/`scale_y` are ±1 flip factors (any non-zero value is accepted).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default = "one")]
    pub scale_x: f64,
    #[serde(default = "one")]
    pub scale_y: f64,
    /// Aspect-ratio lock applied to resize deltas.
    #[serde(default)]
    pub keep_proportion: bool,
    #[serde(default = "yes")]
    pub rotate_enabled: bool,
}

fn one() -> f64 {
    1.0
}

fn yes() -> bool {
    true
}

impl Frame {
    /// Validated constructor.
    pub fn new(
        width: f64,
        height: f64,
        rotation: f64,
        scale_x: f64,
        scale_y: f64,
    ) -> Result<Self, ModelError> {
        let frame = Self {
            width,
            height,
            rotation,
            scale_x,
            scale_y,
            keep_proportion: false,
            rotate_enabled: true,
        };
        frame.validate()?;
        Ok(frame)
    }

    /// Unrotated, unflipped frame of the given size.
    pub fn sized(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            rotation: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            keep_proportion: false,
            rotate_enabled: true,
        }
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        for (field, value) in [
            ("width", self.width),
            ("height", self.height),
            ("rotation", self.rotation),
            ("scaleX", self.scale_x),
            ("scaleY", self.scale_y),
        ] {
            if !value.is_finite() {
                return Err(ModelError::NonFinite { field, value });
            }
        }
        if self.width < 0.0 {
            return Err(ModelError::Negative {
                field: "width",
                value: self.width,
            });
        }
        if self.height < 0.0 {
            return Err(ModelError::Negative {
                field: "height",
                value: self.height,
            });
        }
        for (field, value) in [("scaleX", self.scale_x), ("scaleY", self.scale_y)] {
            if value.abs() != 1.0 {
                return Err(ModelError::NotAFlip { field, value });
            }
        }
        Ok(())
    }
}

// ─── Connect points ──────────────────────────────────────────────────────

/// Named boundary anchors a connect line may attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnchorName {
    #[serde(rename = "topCenterPoint")]
    TopCenter,
    #[serde(rename = "bottomCenterPoint")]
    BottomCenter,
    #[serde(rename = "leftCenterPoint")]
    LeftCenter,
    #[serde(rename = "rightCenterPoint")]
    RightCenter,
    #[serde(rename = "topLeftPoint")]
    TopLeft,
    #[serde(rename = "topRightPoint")]
    TopRight,
    #[serde(rename = "bottomLeftPoint")]
    BottomLeft,
    #[serde(rename = "bottomRightPoint")]
    BottomRight,
}

impl AnchorName {
    /// Every anchor, edge centers first.
    pub const ALL: [AnchorName; 8] = [
        AnchorName::TopCenter,
        AnchorName::BottomCenter,
        AnchorName::LeftCenter,
        AnchorName::RightCenter,
        AnchorName::TopLeft,
        AnchorName::TopRight,
        AnchorName::BottomLeft,
        AnchorName::BottomRight,
    ];

    /// Outward normal in the shape's unrotated local space.
    pub fn local_normal(self) -> Point {
        const D: f64 = std::f64::consts::FRAC_1_SQRT_2;
        match self {
            AnchorName::TopCenter => Point::new(0.0, -1.0),
            AnchorName::BottomCenter => Point::new(0.0, 1.0),
            AnchorName::LeftCenter => Point::new(-1.0, 0.0),
            AnchorName::RightCenter => Point::new(1.0, 0.0),
            AnchorName::TopLeft => Point::new(-D, -D),
            AnchorName::TopRight => Point::new(D, -D),
            AnchorName::BottomLeft => Point::new(-D, D),
            AnchorName::BottomRight => Point::new(D, D),
        }
    }
}

/// A named anchor in canvas coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectPoint {
    pub id: DiagramId,
    pub name: AnchorName,
    pub x: f64,
    pub y: f64,
}

impl ConnectPoint {
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

pub type ConnectPoints = SmallVec<[ConnectPoint; 8]>;

// ─── Connect lines ───────────────────────────────────────────────────────

/// One vertex of a connect line or free-form path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathPoint {
    pub id: DiagramId,
    pub x: f64,
    pub y: f64,
}

impl PathPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            id: DiagramId::fresh(),
            x,
            y,
        }
    }

    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// How a connect line's ordered points are turned into a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PathType {
    Straight,
    #[default]
    Polyline,
    Curve,
    Rounded,
}

/// Marker drawn at either end of a connect line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ArrowHead {
    #[default]
    None,
    Triangle,
    Circle,
    Square,
}

/// Stroke dash pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LineStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
}

impl LineStyle {
    /// SVG `stroke-dasharray` for a given stroke width.
    pub fn dash_array(self, stroke_width: f64) -> Option<String> {
        match self {
            LineStyle::Solid => None,
            LineStyle::Dashed => Some(format!("{} {}", stroke_width * 4.0, stroke_width * 2.0)),
            LineStyle::Dotted => Some(format!("{stroke_width} {}", stroke_width * 2.0)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectLine {
    pub stroke: Color,
    pub stroke_width: f64,
    #[serde(default)]
    pub line_style: LineStyle,
    #[serde(default)]
    pub path_type: PathType,
    #[serde(default)]
    pub start_arrow_head: ArrowHead,
    #[serde(default)]
    pub end_arrow_head: ArrowHead,
    pub auto_routing: bool,
    pub start_owner_id: DiagramId,
    pub end_owner_id: DiagramId,
    pub start_anchor: AnchorName,
    pub end_anchor: AnchorName,
    pub points: Vec<PathPoint>,
}

// ─── Diagram payloads ────────────────────────────────────────────────────

/// Rectangle / ellipse / text payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shape {
    #[serde(flatten)]
    pub frame: Frame,
    #[serde(flatten)]
    pub paint: Paint,
    #[serde(flatten)]
    pub text: TextProps,
    #[serde(default)]
    pub corner_radius: f64,
    #[serde(default)]
    pub connect_points: ConnectPoints,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    #[serde(flatten)]
    pub frame: Frame,
    pub src: String,
    #[serde(default)]
    pub connect_points: ConnectPoints,
}

/// Free-form polyline drawn inside a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathShape {
    #[serde(flatten)]
    pub frame: Frame,
    pub stroke: Color,
    pub stroke_width: f64,
    pub points: Vec<PathPoint>,
}

/// Pure grouping container; its frame is derived from its children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    #[serde(flatten)]
    pub frame: Frame,
    pub items: Vec<Arc<Diagram>>,
}

/// Container with its own geometry (canvas frame, agent node).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    #[serde(flatten)]
    pub frame: Frame,
    #[serde(flatten)]
    pub paint: Paint,
    #[serde(flatten)]
    pub text: TextProps,
    #[serde(default)]
    pub connect_points: ConnectPoints,
    pub items: Vec<Arc<Diagram>>,
}

/// Closed catalog of diagram kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DiagramKind {
    Rectangle(Shape),
    Ellipse(Shape),
    Text(Shape),
    Image(Image),
    Path(PathShape),
    Group(Group),
    Canvas(Container),
    AgentNode(Container),
    ConnectLine(ConnectLine),
}

/// The `type` tag of a diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagramType {
    Rectangle,
    Ellipse,
    Text,
    Image,
    Path,
    Group,
    Canvas,
    AgentNode,
    ConnectLine,
}

impl DiagramType {
    pub const ALL: [DiagramType; 9] = [
        DiagramType::Rectangle,
        DiagramType::Ellipse,
        DiagramType::Text,
        DiagramType::Image,
        DiagramType::Path,
        DiagramType::Group,
        DiagramType::Canvas,
        DiagramType::AgentNode,
        DiagramType::ConnectLine,
    ];
}

impl fmt::Display for DiagramType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// How an itemable diagram relates to its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ItemableType {
    /// Bounds derived from children; no intrinsic shape.
    Group,
    /// Intrinsic geometry and children.
    Composite,
    /// Frame whose children form an independent sub-space.
    Canvas,
}

// ─── Diagram ─────────────────────────────────────────────────────────────

/// Editing-only flags. Never persisted; rehydrated as defaults on undo/redo.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UiFlags {
    pub is_selected: bool,
    pub show_outline: bool,
    pub is_text_editing: bool,
    pub hide_transform_control: bool,
    pub show_connect_points: bool,
}

/// A single node in the canvas forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagram {
    pub id: DiagramId,
    /// Center position.
    pub x: f64,
    pub y: f64,
    #[serde(flatten)]
    pub kind: DiagramKind,
    #[serde(skip)]
    pub ui: UiFlags,
}

impl Diagram {
    pub fn new(id: DiagramId, x: f64, y: f64, kind: DiagramKind) -> Self {
        Self {
            id,
            x,
            y,
            kind,
            ui: UiFlags::default(),
        }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn diagram_type(&self) -> DiagramType {
        match &self.kind {
            DiagramKind::Rectangle(_) => DiagramType::Rectangle,
            DiagramKind::Ellipse(_) => DiagramType::Ellipse,
            DiagramKind::Text(_) => DiagramType::Text,
            DiagramKind::Image(_) => DiagramType::Image,
            DiagramKind::Path(_) => DiagramType::Path,
            DiagramKind::Group(_) => DiagramType::Group,
            DiagramKind::Canvas(_) => DiagramType::Canvas,
            DiagramKind::AgentNode(_) => DiagramType::AgentNode,
            DiagramKind::ConnectLine(_) => DiagramType::ConnectLine,
        }
    }

    pub fn frame(&self) -> Option<&Frame> {
        match &self.kind {
            DiagramKind::Rectangle(s) | DiagramKind::Ellipse(s) | DiagramKind::Text(s) => {
                Some(&s.frame)
            }
            DiagramKind::Image(i) => Some(&i.frame),
            DiagramKind::Path(p) => Some(&p.frame),
            DiagramKind::Group(g) => Some(&g.frame),
            DiagramKind::Canvas(c) | DiagramKind::AgentNode(c) => Some(&c.frame),
            DiagramKind::ConnectLine(_) => None,
        }
    }

    pub fn frame_mut(&mut self) -> Option<&mut Frame> {
        match &mut self.kind {
            DiagramKind::Rectangle(s) | DiagramKind::Ellipse(s) | DiagramKind::Text(s) => {
                Some(&mut s.frame)
            }
            DiagramKind::Image(i) => Some(&mut i.frame),
            DiagramKind::Path(p) => Some(&mut p.frame),
            DiagramKind::Group(g) => Some(&mut g.frame),
            DiagramKind::Canvas(c) | DiagramKind::AgentNode(c) => Some(&mut c.frame),
            DiagramKind::ConnectLine(_) => None,
        }
    }

    pub fn paint(&self) -> Option<&Paint> {
        match &self.kind {
            DiagramKind::Rectangle(s) | DiagramKind::Ellipse(s) | DiagramKind::Text(s) => {
                Some(&s.paint)
            }
            DiagramKind::Canvas(c) | DiagramKind::AgentNode(c) => Some(&c.paint),
            _ => None,
        }
    }

    pub fn paint_mut(&mut self) -> Option<&mut Paint> {
        match &mut self.kind {
            DiagramKind::Rectangle(s) | DiagramKind::Ellipse(s) | DiagramKind::Text(s) => {
                Some(&mut s.paint)
            }
            DiagramKind::Canvas(c) | DiagramKind::AgentNode(c) => Some(&mut c.paint),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<&TextProps> {
        match &self.kind {
            DiagramKind::Rectangle(s) | DiagramKind::Ellipse(s) | DiagramKind::Text(s) => {
                Some(&s.text)
            }
            DiagramKind::Canvas(c) | DiagramKind::AgentNode(c) => Some(&c.text),
            _ => None,
        }
    }

    pub fn text_mut(&mut self) -> Option<&mut TextProps> {
        match &mut self.kind {
            DiagramKind::Rectangle(s) | DiagramKind::Ellipse(s) | DiagramKind::Text(s) => {
                Some(&mut s.text)
            }
            DiagramKind::Canvas(c) | DiagramKind::AgentNode(c) => Some(&mut c.text),
            _ => None,
        }
    }

    /// `Some` exactly for connectable kinds.
    pub fn connect_points(&self) -> Option<&ConnectPoints> {
        match &self.kind {
            DiagramKind::Rectangle(s) | DiagramKind::Ellipse(s) | DiagramKind::Text(s) => {
                Some(&s.connect_points)
            }
            DiagramKind::Image(i) => Some(&i.connect_points),
            DiagramKind::Canvas(c) | DiagramKind::AgentNode(c) => Some(&c.connect_points),
            _ => None,
        }
    }

    pub fn connect_points_mut(&mut self) -> Option<&mut ConnectPoints> {
        match &mut self.kind {
            DiagramKind::Rectangle(s) | DiagramKind::Ellipse(s) | DiagramKind::Text(s) => {
                Some(&mut s.connect_points)
            }
            DiagramKind::Image(i) => Some(&mut i.connect_points),
            DiagramKind::Canvas(c) | DiagramKind::AgentNode(c) => Some(&mut c.connect_points),
            _ => None,
        }
    }

    pub fn is_connectable(&self) -> bool {
        self.connect_points().is_some()
    }

    pub fn itemable_type(&self) -> Option<ItemableType> {
        match &self.kind {
            DiagramKind::Group(_) => Some(ItemableType::Group),
            DiagramKind::Canvas(_) => Some(ItemableType::Canvas),
            DiagramKind::AgentNode(_) => Some(ItemableType::Composite),
            _ => None,
        }
    }

    pub fn items(&self) -> Option<&Vec<Arc<Diagram>>> {
        match &self.kind {
            DiagramKind::Group(g) => Some(&g.items),
            DiagramKind::Canvas(c) | DiagramKind::AgentNode(c) => Some(&c.items),
            _ => None,
        }
    }

    pub fn items_mut(&mut self) -> Option<&mut Vec<Arc<Diagram>>> {
        match &mut self.kind {
            DiagramKind::Group(g) => Some(&mut g.items),
            DiagramKind::Canvas(c) | DiagramKind::AgentNode(c) => Some(&mut c.items),
            _ => None,
        }
    }

    pub fn as_connect_line(&self) -> Option<&ConnectLine> {
        match &self.kind {
            DiagramKind::ConnectLine(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_connect_line_mut(&mut self) -> Option<&mut ConnectLine> {
        match &mut self.kind {
            DiagramKind::ConnectLine(l) => Some(l),
            _ => None,
        }
    }

    /// Vertices of a connect line or free-form path.
    pub fn path_points_mut(&mut self) -> Option<&mut Vec<PathPoint>> {
        match &mut self.kind {
            DiagramKind::ConnectLine(l) => Some(&mut l.points),
            DiagramKind::Path(p) => Some(&mut p.points),
            _ => None,
        }
    }

    pub fn path_points(&self) -> Option<&Vec<PathPoint>> {
        match &self.kind {
            DiagramKind::ConnectLine(l) => Some(&l.points),
            DiagramKind::Path(p) => Some(&p.points),
            _ => None,
        }
    }

    /// Center + frame as one value, for geometry routines.
    pub fn oriented_box(&self) -> Option<OrientedBox> {
        self.frame().map(|f| OrientedBox {
            x: self.x,
            y: self.y,
            width: f.width,
            height: f.height,
            rotation: f.rotation,
            scale_x: f.scale_x,
            scale_y: f.scale_y,
        })
    }

    /// Copy center and frame fields from an oriented box.
    pub fn set_oriented_box(&mut self, b: &OrientedBox) {
        self.x = b.x;
        self.y = b.y;
        if let Some(frame) = self.frame_mut() {
            frame.width = b.width;
            frame.height = b.height;
            frame.rotation = b.rotation;
            frame.scale_x = b.scale_x;
            frame.scale_y = b.scale_y;
        }
    }

    /// Move the diagram, its anchors, its path points and its whole subtree.
    #[must_use]
    pub fn translated(&self, dx: f64, dy: f64) -> Diagram {
        let mut moved = self.clone();
        moved.x += dx;
        moved.y += dy;
        if let Some(points) = moved.connect_points_mut() {
            for p in points.iter_mut() {
                p.x += dx;
                p.y += dy;
            }
        }
        if let Some(points) = moved.path_points_mut() {
            for p in points.iter_mut() {
                p.x += dx;
                p.y += dy;
            }
        }
        if let Some(items) = moved.items_mut() {
            for child in items.iter_mut() {
                *child = Arc::new(child.translated(dx, dy));
            }
        }
        moved
    }

    /// Recursive validation used at the data boundary.
    pub fn validate(&self) -> Result<(), ModelError> {
        for (field, value) in [("x", self.x), ("y", self.y)] {
            if !value.is_finite() {
                return Err(ModelError::NonFinite { field, value });
            }
        }
        if let Some(frame) = self.frame() {
            frame.validate()?;
        }
        if let Some(points) = self.path_points() {
            for p in points {
                if !p.x.is_finite() || !p.y.is_finite() {
                    return Err(ModelError::NonFinite {
                        field: "point",
                        value: if p.x.is_finite() { p.y } else { p.x },
                    });
                }
            }
        }
        if let Some(items) = self.items() {
            for child in items {
                child.validate()?;
            }
        }
        Ok(())
    }
}

// ─── Canvas state ────────────────────────────────────────────────────────

/// Whether a continuous gesture is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    Changing,
}

/// Visible window onto the infinite canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub min_x: f64,
    pub min_y: f64,
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            min_x: 0.0,
            min_y: 0.0,
            zoom: 1.0,
        }
    }
}

impl Viewport {
    /// Convert a screen-space point to canvas coordinates.
    pub fn screen_to_canvas(&self, screen: Point) -> Point {
        Point::new(
            self.min_x + screen.x / self.zoom,
            self.min_y + screen.y / self.zoom,
        )
    }

    /// Convert a canvas point to screen coordinates.
    pub fn canvas_to_screen(&self, canvas: Point) -> Point {
        Point::new(
            (canvas.x - self.min_x) * self.zoom,
            (canvas.y - self.min_y) * self.zoom,
        )
    }

    /// Zoom by `factor` keeping `screen` anchored over the same canvas point.
    #[must_use]
    pub fn zoom_at(&self, screen: Point, factor: f64) -> Viewport {
        let anchor = self.screen_to_canvas(screen);
        let zoom = (self.zoom * factor).clamp(0.05, 20.0);
        Viewport {
            min_x: anchor.x - screen.x / zoom,
            min_y: anchor.y - screen.y / zoom,
            zoom,
        }
    }
}

/// Aggregate root: the whole canvas at one instant.
///
/// Always replaced wholesale; `items` share unchanged subtrees with the
/// previous state through `Arc`.
#[derive(Debug, Clone, Default)]
pub struct SvgCanvasState {
    pub items: Vec<Arc<Diagram>>,
    pub viewport: Viewport,
    pub interaction_state: InteractionState,
    /// Selected id → child-index path from the top level.
    pub selected_diagram_path_index: HashMap<DiagramId, Vec<usize>>,
}

impl SvgCanvasState {
    pub fn new(items: Vec<Arc<Diagram>>) -> Self {
        let mut state = Self {
            items,
            ..Default::default()
        };
        state.reindex_selection();
        state
    }

    /// Recompute `selected_diagram_path_index` from the current items.
    pub fn reindex_selection(&mut self) {
        let mut index = HashMap::new();
        collect_selected_paths(&self.items, &mut Vec::new(), &mut index);
        self.selected_diagram_path_index = index;
    }
}

fn collect_selected_paths(
    items: &[Arc<Diagram>],
    prefix: &mut Vec<usize>,
    out: &mut HashMap<DiagramId, Vec<usize>>,
) {
    for (i, item) in items.iter().enumerate() {
        prefix.push(i);
        if item.ui.is_selected {
            out.insert(item.id, prefix.clone());
        }
        if let Some(children) = item.items() {
            collect_selected_paths(children, prefix, out);
        }
        prefix.pop();
    }
}
