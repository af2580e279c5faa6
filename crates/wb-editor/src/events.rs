//! Event payloads consumed by the change pipeline.
//!
//! UI gestures, keyboard shortcuts and LLM tool calls all speak this same
//! vocabulary. Every event carries an [`EventId`]; history entries are keyed
//! by it, so repeated commits under one id coalesce into a single undo step.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;
use wb_core::selection::StackOrderChange;
use wb_core::{
    AnchorName, ArrowHead, Color, Diagram, DiagramId, DiagramKind, DiagramType, LineStyle, PathType,
    TextAlign, VerticalAlign,
};

/// Correlates every event of one interaction.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event:{}", self.0)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Position of an event inside a continuous gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventPhase {
    Started,
    InProgress,
    Ended,
}

// ─── Geometric change ────────────────────────────────────────────────────

/// Move, resize, rotate or content edit of one diagram.
///
/// `end_diagram` carries the requested center and frame. Its children are
/// ignored: the pipeline takes them from the pre-gesture snapshot and
/// propagates the frame change onto them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramChangeEvent {
    pub event_id: EventId,
    pub id: DiagramId,
    pub phase: EventPhase,
    pub start_diagram: Arc<Diagram>,
    pub end_diagram: Arc<Diagram>,
    /// Viewport origin to apply with this tick (auto-scroll while dragging).
    #[serde(default)]
    pub min_x: Option<f64>,
    #[serde(default)]
    pub min_y: Option<f64>,
}

// ─── Style & constraints ─────────────────────────────────────────────────

/// Partial style update. `None` fields are left alone; fields the target
/// has no capability for are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StylePatch {
    pub fill: Option<Color>,
    pub stroke: Option<Color>,
    pub stroke_width: Option<f64>,
    pub corner_radius: Option<f64>,
    pub font_size: Option<f64>,
    pub font_color: Option<Color>,
    pub font_weight: Option<u16>,
    pub text_align: Option<TextAlign>,
    pub vertical_align: Option<VerticalAlign>,
    pub line_style: Option<LineStyle>,
    pub path_type: Option<PathType>,
    pub start_arrow_head: Option<ArrowHead>,
    pub end_arrow_head: Option<ArrowHead>,
}

impl StylePatch {
    /// Write the patch into `diagram`; returns whether anything changed.
    ///
    /// Negative or non-finite widths and sizes are skipped.
    pub fn apply(&self, diagram: &mut Diagram) -> bool {
        let before = diagram.clone();
        let width = self.stroke_width.filter(|w| w.is_finite() && *w >= 0.0);

        if let Some(paint) = diagram.paint_mut() {
            set(&mut paint.fill, self.fill);
            set(&mut paint.stroke, self.stroke);
            set(&mut paint.stroke_width, width);
        }
        if let Some(text) = diagram.text_mut() {
            set(&mut text.font_size, self.font_size.filter(|s| s.is_finite() && *s > 0.0));
            set(&mut text.font_color, self.font_color);
            set(&mut text.font_weight, self.font_weight);
            set(&mut text.text_align, self.text_align);
            set(&mut text.vertical_align, self.vertical_align);
        }
        match &mut diagram.kind {
            DiagramKind::Rectangle(shape) | DiagramKind::Ellipse(shape) | DiagramKind::Text(shape) => {
                set(&mut shape.corner_radius, self.corner_radius.filter(|r| r.is_finite() && *r >= 0.0));
            }
            DiagramKind::Path(path) => {
                set(&mut path.stroke, self.stroke);
                set(&mut path.stroke_width, width);
            }
            DiagramKind::ConnectLine(line) => {
                set(&mut line.stroke, self.stroke);
                set(&mut line.stroke_width, width);
                set(&mut line.line_style, self.line_style);
                set(&mut line.path_type, self.path_type);
                set(&mut line.start_arrow_head, self.start_arrow_head);
                set(&mut line.end_arrow_head, self.end_arrow_head);
            }
            _ => {}
        }
        *diagram != before
    }
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *slot = v;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramStyleChangeEvent {
    pub event_id: EventId,
    pub id: DiagramId,
    pub data: StylePatch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramConstraintChangeEvent {
    pub event_id: EventId,
    pub id: DiagramId,
    #[serde(default)]
    pub keep_proportion: Option<bool>,
    #[serde(default)]
    pub rotate_enabled: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackOrderChangeEvent {
    pub event_id: EventId,
    pub id: DiagramId,
    pub change_type: StackOrderChange,
}

// ─── Structural ──────────────────────────────────────────────────────────

/// Move subtrees into any itemable. Diagrams already in the forest are
/// removed from their old place first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendDiagramsEvent {
    pub event_id: EventId,
    pub target_id: DiagramId,
    pub diagrams: Vec<Arc<Diagram>>,
}

/// Like [`AppendDiagramsEvent`] but the target must be a canvas frame,
/// which then grows to fit its new children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddDiagramsToFrameEvent {
    pub event_id: EventId,
    pub target_id: DiagramId,
    pub diagrams: Vec<Arc<Diagram>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectShapesEvent {
    pub event_id: EventId,
    pub source_shape_id: DiagramId,
    pub target_shape_id: DiagramId,
    #[serde(default)]
    pub source_anchor: Option<AnchorName>,
    #[serde(default)]
    pub target_anchor: Option<AnchorName>,
    #[serde(default)]
    pub start_arrow_head: Option<ArrowHead>,
    #[serde(default)]
    pub end_arrow_head: Option<ArrowHead>,
    #[serde(default)]
    pub line_style: Option<LineStyle>,
    #[serde(default)]
    pub path_type: Option<PathType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddDiagramEvent {
    pub event_id: EventId,
    pub diagram_type: DiagramType,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectDiagramsEvent {
    pub event_id: EventId,
    pub ids: Vec<DiagramId>,
    /// Add to the current selection instead of replacing it.
    #[serde(default)]
    pub extend: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasteEvent {
    pub event_id: EventId,
    /// Clipboard text as produced by `copy_diagrams`.
    pub text: String,
}

// ─── Envelope ────────────────────────────────────────────────────────────

/// Everything the pipeline accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum EditorEvent {
    DiagramChange(DiagramChangeEvent),
    DiagramStyleChange(DiagramStyleChangeEvent),
    DiagramConstraintChange(DiagramConstraintChangeEvent),
    StackOrderChange(StackOrderChangeEvent),
    AppendDiagrams(AppendDiagramsEvent),
    AddDiagramsToFrame(AddDiagramsToFrameEvent),
    #[serde(rename_all = "camelCase")]
    ExtractSelectedDiagramsToTopLevel { event_id: EventId },
    ConnectShapes(ConnectShapesEvent),
    AddDiagram(AddDiagramEvent),
    #[serde(rename_all = "camelCase")]
    GroupDiagrams { event_id: EventId },
    #[serde(rename_all = "camelCase")]
    UngroupDiagrams { event_id: EventId },
    #[serde(rename_all = "camelCase")]
    DeleteSelectedDiagrams { event_id: EventId },
    SelectDiagrams(SelectDiagramsEvent),
    #[serde(rename_all = "camelCase")]
    ClearSelection { event_id: EventId },
    Paste(PasteEvent),
    #[serde(rename_all = "camelCase")]
    Undo { event_id: EventId },
    #[serde(rename_all = "camelCase")]
    Redo { event_id: EventId },
    #[serde(rename_all = "camelCase")]
    CancelInteraction { event_id: EventId },
}

impl EditorEvent {
    pub fn event_id(&self) -> EventId {
        match self {
            Self::DiagramChange(e) => e.event_id,
            Self::DiagramStyleChange(e) => e.event_id,
            Self::DiagramConstraintChange(e) => e.event_id,
            Self::StackOrderChange(e) => e.event_id,
            Self::AppendDiagrams(e) => e.event_id,
            Self::AddDiagramsToFrame(e) => e.event_id,
            Self::ConnectShapes(e) => e.event_id,
            Self::AddDiagram(e) => e.event_id,
            Self::SelectDiagrams(e) => e.event_id,
            Self::Paste(e) => e.event_id,
            Self::ExtractSelectedDiagramsToTopLevel { event_id }
            | Self::GroupDiagrams { event_id }
            | Self::UngroupDiagrams { event_id }
            | Self::DeleteSelectedDiagrams { event_id }
            | Self::ClearSelection { event_id }
            | Self::Undo { event_id }
            | Self::Redo { event_id }
            | Self::CancelInteraction { event_id } => *event_id,
        }
    }

    /// Short name for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DiagramChange(_) => "diagramChange",
            Self::DiagramStyleChange(_) => "diagramStyleChange",
            Self::DiagramConstraintChange(_) => "diagramConstraintChange",
            Self::StackOrderChange(_) => "stackOrderChange",
            Self::AppendDiagrams(_) => "appendDiagrams",
            Self::AddDiagramsToFrame(_) => "addDiagramsToFrame",
            Self::ExtractSelectedDiagramsToTopLevel { .. } => "extractSelectedDiagramsToTopLevel",
            Self::ConnectShapes(_) => "connectShapes",
            Self::AddDiagram(_) => "addDiagram",
            Self::GroupDiagrams { .. } => "groupDiagrams",
            Self::UngroupDiagrams { .. } => "ungroupDiagrams",
            Self::DeleteSelectedDiagrams { .. } => "deleteSelectedDiagrams",
            Self::SelectDiagrams(_) => "selectDiagrams",
            Self::ClearSelection { .. } => "clearSelection",
            Self::Paste(_) => "paste",
            Self::Undo { .. } => "undo",
            Self::Redo { .. } => "redo",
            Self::CancelInteraction { .. } => "cancelInteraction",
        }
    }
}
