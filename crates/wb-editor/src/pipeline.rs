//! Change pipeline: the single owner of `SvgCanvasState`.
//!
//! Every producer (pointer gestures, shortcuts, tool calls) feeds
//! [`EditorEvent`]s into [`CanvasEngine::handle`]. Each event follows the
//! same shape: apply, refresh derived state (group frames, canvas growth,
//! anchors, connect lines), then maybe commit history.
//!
//! Continuous gestures are split into phases:
//!
//! - **Started** snapshots the forest and caches the connect lines attached
//!   to the moving subtree, so later ticks never rescan for them.
//! - **InProgress** re-applies the frame change against the snapshot and
//!   refreshes only the cached lines. No history write.
//! - **Ended** applies the last tick, grows canvases, returns to `Idle` and
//!   commits one history entry keyed by the event id.
//!
//! A referenced id that does not exist turns the event into a logged no-op.

use crate::bus::{EventBus, Subscription};
use crate::clipboard::Clipboard;
use crate::config::EditorConfig;
use crate::events::*;
use crate::history::HistoryStack;
use crate::shortcuts::{ShortcutAction, events_for_shortcut};
use crate::viewport::{InertialPan, auto_scroll_delta, pan_viewport};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use wb_core::connect::{ConnectOptions, ConnectionIndex, create_connect_line, refresh_connect_lines, refresh_lines};
use wb_core::data::{Document, copy_diagrams, paste_diagrams, validate_diagrams};
use wb_core::layout::{auto_expand_canvases, refresh_group_frames};
use wb_core::path::{build_path, path_to_svg_d};
use wb_core::selection::{
    change_stack_order, cleanup_groups, clear_selection, extract_to_top_level, get_selected_diagrams,
    get_selected_ids, group_diagrams, set_selection, ungroup_diagrams,
};
use wb_core::tree::{
    all_ptr_eq, append_to_itemable, collect_ids, contains_id, for_each_diagram, get_diagram_by_id,
    remove_diagrams_by_id, replace_diagram, replace_diagrams,
};
use wb_core::{
    DataError, Diagram, DiagramId, DiagramRegistry, InteractionState, ItemableType, Point, SvgCanvasState,
    propagate_transform,
};

/// Per-gesture cache, alive from `Started` to the last `Ended`.
#[derive(Debug)]
struct GestureCache {
    event_id: EventId,
    /// Forest as it was when the gesture started.
    snapshot: Vec<Arc<Diagram>>,
    index: ConnectionIndex,
    /// Diagrams driven by this gesture that have not ended yet.
    active: HashSet<DiagramId>,
    /// Connect lines attached to anything the gesture moves.
    lines: HashSet<DiagramId>,
}

impl GestureCache {
    fn track(&mut self, id: DiagramId) -> bool {
        let Some(node) = get_diagram_by_id(&self.snapshot, id) else {
            return false;
        };
        let subtree = collect_ids(std::slice::from_ref(node));
        self.lines.extend(self.index.connected_line_ids(subtree));
        self.active.insert(id);
        true
    }
}

pub struct CanvasEngine {
    state: SvgCanvasState,
    registry: DiagramRegistry,
    config: EditorConfig,
    history: HistoryStack,
    gesture: Option<GestureCache>,
    inertia: Option<InertialPan>,
    changes: EventBus<SvgCanvasState>,
}

impl CanvasEngine {
    /// Build an engine over `items`. Stale anchors are regenerated and the
    /// result becomes the history baseline.
    pub fn new(items: Vec<Arc<Diagram>>, registry: DiagramRegistry, config: EditorConfig) -> Self {
        let items = registry.refresh_connect_points(&items);
        let history = HistoryStack::new(&items, config.history_limit);
        Self {
            state: SvgCanvasState::new(items),
            registry,
            config,
            history,
            gesture: None,
            inertia: None,
            changes: EventBus::new(),
        }
    }

    pub fn from_document(document: Document, registry: DiagramRegistry, config: EditorConfig) -> Self {
        Self::new(document.into_items(), registry, config)
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn state(&self) -> &SvgCanvasState {
        &self.state
    }

    pub fn items(&self) -> &[Arc<Diagram>] {
        &self.state.items
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn registry(&self) -> &DiagramRegistry {
        &self.registry
    }

    pub fn history(&self) -> &HistoryStack {
        &self.history
    }

    pub fn document(&self) -> Document {
        Document::new(&self.state.items)
    }

    /// Replace the whole canvas, e.g. after opening a file.
    pub fn load_document(&mut self, document: Document) {
        let items = self.registry.refresh_connect_points(&document.into_items());
        self.gesture = None;
        self.history.reset(&items);
        self.state = SvgCanvasState {
            viewport: self.state.viewport,
            ..SvgCanvasState::new(items)
        };
        self.notify();
    }

    /// Listen for state replacements. Delivered after every event that
    /// changed something.
    pub fn subscribe(&self, listener: impl Fn(&SvgCanvasState) + 'static) -> Subscription<SvgCanvasState> {
        self.changes.subscribe(listener)
    }

    fn notify(&self) {
        self.changes.publish(&self.state);
    }

    // ─── Dispatch ────────────────────────────────────────────────────────

    pub fn handle(&mut self, event: EditorEvent) {
        if matches!(&event, EditorEvent::DiagramChange(e) if e.phase == EventPhase::InProgress) {
            log::trace!("{} {}", event.kind(), event.event_id());
        } else {
            log::debug!("{} {}", event.kind(), event.event_id());
        }

        let before_items = self.state.items.clone();
        let before_view = self.state.viewport;
        let before_phase = self.state.interaction_state;

        match event {
            EditorEvent::DiagramChange(e) => self.on_diagram_change(&e),
            EditorEvent::DiagramStyleChange(e) => self.on_style_change(&e),
            EditorEvent::DiagramConstraintChange(e) => self.on_constraint_change(&e),
            EditorEvent::StackOrderChange(e) => self.on_stack_order_change(&e),
            EditorEvent::AppendDiagrams(e) => {
                self.move_into(e.event_id, "appendDiagrams", e.target_id, &e.diagrams, false);
            }
            EditorEvent::AddDiagramsToFrame(e) => {
                self.move_into(e.event_id, "addDiagramsToFrame", e.target_id, &e.diagrams, true);
            }
            EditorEvent::ExtractSelectedDiagramsToTopLevel { event_id } => self.on_extract(event_id),
            EditorEvent::ConnectShapes(e) => self.on_connect(&e),
            EditorEvent::AddDiagram(e) => self.on_add_diagram(&e),
            EditorEvent::GroupDiagrams { event_id } => self.on_group(event_id),
            EditorEvent::UngroupDiagrams { event_id } => self.on_ungroup(event_id),
            EditorEvent::DeleteSelectedDiagrams { event_id } => self.on_delete_selected(event_id),
            EditorEvent::SelectDiagrams(e) => self.on_select(&e),
            EditorEvent::ClearSelection { .. } => {
                self.set_items_without_history(clear_selection(&self.state.items));
            }
            EditorEvent::Paste(e) => self.on_paste(&e),
            EditorEvent::Undo { .. } => self.on_undo(),
            EditorEvent::Redo { .. } => self.on_redo(),
            EditorEvent::CancelInteraction { .. } => self.cancel_interaction(),
        }

        if !all_ptr_eq(&before_items, &self.state.items)
            || before_items.len() != self.state.items.len()
            || before_view != self.state.viewport
            || before_phase != self.state.interaction_state
        {
            self.notify();
        }
    }

    // ─── Continuous changes ──────────────────────────────────────────────

    fn on_diagram_change(&mut self, event: &DiagramChangeEvent) {
        let tracked = self
            .gesture
            .as_ref()
            .is_some_and(|g| g.event_id == event.event_id && g.active.contains(&event.id));
        if !tracked {
            if event.phase != EventPhase::Started {
                log::debug!("{:?} for {} without Started; starting the gesture here", event.phase, event.id);
            }
            if !self.begin_gesture(event) {
                return;
            }
        }

        self.apply_gesture_tick(event);
        if event.phase == EventPhase::Ended {
            self.end_gesture(event.event_id, event.id);
        }
    }

    fn begin_gesture(&mut self, event: &DiagramChangeEvent) -> bool {
        if !contains_id(&self.state.items, event.id) {
            log::warn!("diagramChange: diagram {} not found; ignoring", event.id);
            return false;
        }
        self.inertia = None;

        if let Some(gesture) = self.gesture.as_mut().filter(|g| g.event_id == event.event_id) {
            if gesture.track(event.id) {
                return true;
            }
            log::warn!("diagramChange: {} appeared mid-gesture; ignoring", event.id);
            return false;
        }

        if let Some(stale) = self.gesture.take() {
            log::warn!(
                "gesture {} never ended; superseded by {}",
                stale.event_id,
                event.event_id
            );
        }
        let snapshot = self.state.items.clone();
        let mut gesture = GestureCache {
            event_id: event.event_id,
            index: ConnectionIndex::build(&snapshot),
            snapshot,
            active: HashSet::new(),
            lines: HashSet::new(),
        };
        gesture.track(event.id);
        log::debug!(
            "gesture {} started on {} ({} attached lines)",
            event.event_id,
            event.id,
            gesture.lines.len()
        );
        self.gesture = Some(gesture);
        self.state.interaction_state = InteractionState::Changing;
        true
    }

    /// Re-apply the requested frame against the snapshot. Ticks are absolute,
    /// so replaying or skipping one never accumulates drift.
    fn apply_gesture_tick(&mut self, event: &DiagramChangeEvent) {
        let Some(gesture) = self.gesture.as_ref() else {
            return;
        };
        let Some(base) = get_diagram_by_id(&gesture.snapshot, event.id) else {
            return;
        };

        let mut end = (*event.end_diagram).clone();
        end.id = base.id;
        // selection and editing flags belong to the live state, not the gesture
        if let Some(current) = get_diagram_by_id(&self.state.items, event.id) {
            end.ui.clone_from(&current.ui);
        }
        if let (Some(slot), Some(children)) = (end.items_mut(), base.items()) {
            slot.clone_from(children);
        }
        if let Err(e) = end.validate() {
            log::warn!("diagramChange: rejected frame for {}: {e}", event.id);
            return;
        }
        let next = match propagate_transform(base, &end, &self.registry) {
            Ok(next) => next,
            Err(e) => {
                log::warn!("diagramChange: cannot transform {}: {e}", event.id);
                return;
            }
        };

        let items = replace_diagram(&self.state.items, &Arc::new(next));
        let items = refresh_group_frames(&items);
        let items = refresh_lines(
            &items,
            &gesture.lines,
            &gesture.snapshot,
            self.config.connect_line_margin,
            &self.registry,
        );
        log::trace!("tick {}: refreshed {} lines", event.event_id, gesture.lines.len());
        self.state.items = items;

        if let Some(min_x) = event.min_x {
            self.state.viewport.min_x = min_x;
        }
        if let Some(min_y) = event.min_y {
            self.state.viewport.min_y = min_y;
        }
    }

    fn end_gesture(&mut self, event_id: EventId, id: DiagramId) {
        let Some(gesture) = self.gesture.as_mut() else {
            return;
        };
        gesture.active.remove(&id);
        let finished = gesture.active.is_empty();

        let previous = gesture.snapshot.clone();
        let items = auto_expand_canvases(&self.state.items, self.config.frame_padding, &self.registry);
        let items = refresh_group_frames(&items);
        let grown = changed_ids(&self.state.items, &items);
        let items = self.registry.refresh_connect_points(&items);
        let items = if grown.is_empty() {
            items
        } else {
            refresh_connect_lines(&grown, &items, &previous, self.config.connect_line_margin, &self.registry)
        };

        self.state.items = items;
        self.state.reindex_selection();
        if all_ptr_eq(&previous, &self.state.items) {
            log::debug!("gesture {event_id}: no net change");
        } else {
            self.history.push(event_id, &self.state.items);
        }
        if finished {
            self.gesture = None;
            self.state.interaction_state = InteractionState::Idle;
            log::debug!("gesture {event_id} ended");
        }
    }

    /// Roll back an unfinished gesture to its snapshot.
    pub fn cancel_interaction(&mut self) {
        let Some(gesture) = self.gesture.take() else {
            log::debug!("cancelInteraction: no gesture in flight");
            return;
        };
        log::debug!("gesture {} cancelled", gesture.event_id);
        self.state.items = gesture.snapshot;
        self.state.interaction_state = InteractionState::Idle;
        self.state.reindex_selection();
    }

    // ─── Property changes ────────────────────────────────────────────────

    fn on_style_change(&mut self, event: &DiagramStyleChangeEvent) {
        let Some(target) = get_diagram_by_id(&self.state.items, event.id) else {
            log::warn!("diagramStyleChange: diagram {} not found; ignoring", event.id);
            return;
        };
        let mut next = (**target).clone();
        if !event.data.apply(&mut next) {
            log::debug!("diagramStyleChange: nothing applicable to {}", event.id);
            return;
        }
        if let Err(e) = next.validate() {
            log::warn!("diagramStyleChange: rejected for {}: {e}", event.id);
            return;
        }
        let items = replace_diagram(&self.state.items, &Arc::new(next));
        self.commit_structural(event.event_id, "diagramStyleChange", items);
    }

    fn on_constraint_change(&mut self, event: &DiagramConstraintChangeEvent) {
        let Some(target) = get_diagram_by_id(&self.state.items, event.id) else {
            log::warn!("diagramConstraintChange: diagram {} not found; ignoring", event.id);
            return;
        };
        let mut next = (**target).clone();
        let Some(frame) = next.frame_mut() else {
            log::warn!("diagramConstraintChange: {} has no frame; ignoring", event.id);
            return;
        };
        if let Some(keep) = event.keep_proportion {
            frame.keep_proportion = keep;
        }
        if let Some(rotate) = event.rotate_enabled {
            frame.rotate_enabled = rotate;
        }
        let items = replace_diagram(&self.state.items, &Arc::new(next));
        self.commit_structural(event.event_id, "diagramConstraintChange", items);
    }

    fn on_stack_order_change(&mut self, event: &StackOrderChangeEvent) {
        let Some(items) = change_stack_order(&self.state.items, event.id, event.change_type) else {
            log::warn!("stackOrderChange: diagram {} not found; ignoring", event.id);
            return;
        };
        self.commit_structural(event.event_id, "stackOrderChange", items);
    }

    // ─── Structural changes ──────────────────────────────────────────────

    fn move_into(
        &mut self,
        event_id: EventId,
        kind: &str,
        target_id: DiagramId,
        diagrams: &[Arc<Diagram>],
        require_canvas: bool,
    ) {
        let Some(target) = get_diagram_by_id(&self.state.items, target_id) else {
            log::warn!("{kind}: target {target_id} not found; ignoring");
            return;
        };
        if require_canvas && target.itemable_type() != Some(ItemableType::Canvas) {
            log::warn!("{kind}: target {target_id} is not a frame; ignoring");
            return;
        }
        if target.items().is_none() {
            log::warn!("{kind}: target {target_id} cannot hold diagrams; ignoring");
            return;
        }
        if diagrams.iter().any(|d| contains_id(std::slice::from_ref(d), target_id)) {
            log::warn!("{kind}: cannot move {target_id} into itself; ignoring");
            return;
        }

        if let Err(e) = validate_diagrams(diagrams) {
            log::warn!("{kind}: rejected payload: {e}");
            return;
        }

        let ids: HashSet<DiagramId> = diagrams.iter().map(|d| d.id).collect();
        let removed = remove_diagrams_by_id(&self.state.items, &ids);
        // Payload subtrees replace the moved nodes; any other reuse would
        // put an id in the forest twice.
        let remaining: HashSet<DiagramId> = collect_ids(&removed).into_iter().collect();
        if let Some(taken) = collect_ids(diagrams).into_iter().find(|id| remaining.contains(id)) {
            log::warn!("{kind}: id {taken} already exists outside the moved diagrams; ignoring");
            return;
        }
        let Some(items) = append_to_itemable(&removed, target_id, diagrams) else {
            log::warn!("{kind}: target {target_id} vanished while moving; ignoring");
            return;
        };
        self.commit_structural(event_id, kind, items);
    }

    fn on_extract(&mut self, event_id: EventId) {
        let ids = get_selected_ids(&self.state.items);
        let Some(items) = extract_to_top_level(&self.state.items, &ids) else {
            log::debug!("extractSelectedDiagramsToTopLevel: nothing nested is selected");
            return;
        };
        self.commit_structural(event_id, "extractSelectedDiagramsToTopLevel", items);
    }

    fn on_connect(&mut self, event: &ConnectShapesEvent) {
        if event.source_shape_id == event.target_shape_id {
            log::warn!("connectShapes: {} cannot connect to itself; ignoring", event.source_shape_id);
            return;
        }
        let defaults = ConnectOptions::default();
        let options = ConnectOptions {
            source_anchor: event.source_anchor,
            target_anchor: event.target_anchor,
            start_arrow_head: event.start_arrow_head.unwrap_or(defaults.start_arrow_head),
            end_arrow_head: event.end_arrow_head.unwrap_or(defaults.end_arrow_head),
            line_style: event.line_style.unwrap_or(defaults.line_style),
            path_type: event.path_type.unwrap_or(defaults.path_type),
            ..defaults
        };
        let Some(connection) = create_connect_line(
            &self.state.items,
            event.source_shape_id,
            event.target_shape_id,
            &options,
            self.config.connect_line_margin,
            &self.registry,
        ) else {
            log::warn!(
                "connectShapes: {} -> {} not connectable or not found; ignoring",
                event.source_shape_id,
                event.target_shape_id
            );
            return;
        };
        let mut items = replace_diagrams(&self.state.items, &connection.updated_owners);
        items.push(Arc::new(connection.line));
        self.commit_structural(event.event_id, "connectShapes", items);
    }

    fn on_add_diagram(&mut self, event: &AddDiagramEvent) {
        let Some(mut diagram) = self.registry.create(event.diagram_type, event.x, event.y) else {
            log::warn!("addDiagram: no factory registered for {}; ignoring", event.diagram_type);
            return;
        };
        diagram.ui.is_selected = true;
        let mut items = clear_selection(&self.state.items);
        items.push(Arc::new(diagram));
        self.commit_structural(event.event_id, "addDiagram", items);
    }

    fn on_group(&mut self, event_id: EventId) {
        let ids = get_selected_ids(&self.state.items);
        let Some((items, group_id)) = group_diagrams(&self.state.items, &ids) else {
            log::debug!("groupDiagrams: need at least two selected diagrams");
            return;
        };
        log::debug!("grouped {} diagrams into {group_id}", ids.len());
        self.commit_structural(event_id, "groupDiagrams", items);
    }

    fn on_ungroup(&mut self, event_id: EventId) {
        let ids = get_selected_ids(&self.state.items);
        let Some(items) = ungroup_diagrams(&self.state.items, &ids) else {
            log::debug!("ungroupDiagrams: no selected group");
            return;
        };
        self.commit_structural(event_id, "ungroupDiagrams", items);
    }

    fn on_delete_selected(&mut self, event_id: EventId) {
        let ids: HashSet<DiagramId> = get_selected_ids(&self.state.items).into_iter().collect();
        if ids.is_empty() {
            log::debug!("deleteSelectedDiagrams: nothing selected");
            return;
        }
        let items = remove_diagrams_by_id(&self.state.items, &ids);
        self.commit_structural(event_id, "deleteSelectedDiagrams", items);
    }

    fn on_select(&mut self, event: &SelectDiagramsEvent) {
        let mut ids: HashSet<DiagramId> = HashSet::new();
        for id in &event.ids {
            if contains_id(&self.state.items, *id) {
                ids.insert(*id);
            } else {
                log::warn!("selectDiagrams: diagram {id} not found; skipping");
            }
        }
        if event.extend {
            ids.extend(get_selected_ids(&self.state.items));
        }
        self.set_items_without_history(set_selection(&self.state.items, &ids));
    }

    fn on_paste(&mut self, event: &PasteEvent) {
        let pasted = match paste_diagrams(&event.text, self.config.paste_offset) {
            Ok(pasted) => pasted,
            Err(e) => {
                log::debug!("paste: ignored: {e}");
                return;
            }
        };
        if pasted.is_empty() {
            log::debug!("paste: clipboard held no diagrams");
            return;
        }
        let mut items = clear_selection(&self.state.items);
        items.extend(pasted.into_iter().map(|d| {
            let mut d = (*d).clone();
            d.ui.is_selected = true;
            Arc::new(d)
        }));
        self.commit_structural(event.event_id, "paste", items);
    }

    /// Refresh derived state and commit one history entry.
    fn commit_structural(&mut self, event_id: EventId, kind: &str, items: Vec<Arc<Diagram>>) {
        let previous = self.state.items.clone();
        let items = cleanup_groups(&items);
        let items = refresh_group_frames(&items);
        let items = auto_expand_canvases(&items, self.config.frame_padding, &self.registry);
        let items = self.registry.refresh_connect_points(&items);
        let changed = changed_ids(&previous, &items);
        let items = refresh_connect_lines(&changed, &items, &previous, self.config.connect_line_margin, &self.registry);

        if items.len() == previous.len() && all_ptr_eq(&previous, &items) {
            log::debug!("{kind}: no change");
            return;
        }
        self.state.items = items;
        self.state.reindex_selection();
        self.history.push(event_id, &self.state.items);
    }

    fn set_items_without_history(&mut self, items: Vec<Arc<Diagram>>) {
        self.state.items = items;
        self.state.reindex_selection();
    }

    // ─── History ─────────────────────────────────────────────────────────

    fn on_undo(&mut self) {
        if self.gesture.is_some() {
            self.cancel_interaction();
        }
        match self.history.undo() {
            Some(items) => self.set_items_without_history(items),
            None => log::debug!("undo: history is empty"),
        }
    }

    fn on_redo(&mut self) {
        if self.gesture.is_some() {
            self.cancel_interaction();
        }
        match self.history.redo() {
            Some(items) => self.set_items_without_history(items),
            None => log::debug!("redo: nothing to redo"),
        }
    }

    // ─── Clipboard & shortcuts ───────────────────────────────────────────

    /// Clipboard text for the current selection.
    ///
    /// # Errors
    ///
    /// Propagates serialization failures.
    pub fn copy_selection(&self) -> Result<String, DataError> {
        copy_diagrams(&get_selected_diagrams(&self.state.items))
    }

    /// Run a resolved keyboard shortcut. Clipboard actions go through
    /// `clipboard`; everything else becomes ordinary events.
    pub fn run_shortcut(&mut self, action: ShortcutAction, clipboard: &mut dyn Clipboard) {
        let event_id = EventId::new();
        match action {
            ShortcutAction::Copy | ShortcutAction::Cut => {
                if get_selected_ids(&self.state.items).is_empty() {
                    return;
                }
                match self.copy_selection() {
                    Ok(text) => clipboard.write_text(text),
                    Err(e) => {
                        log::warn!("copy failed: {e}");
                        return;
                    }
                }
                if action == ShortcutAction::Cut {
                    self.handle(EditorEvent::DeleteSelectedDiagrams { event_id });
                }
            }
            ShortcutAction::Paste => match clipboard.read_text() {
                Some(text) => self.handle(EditorEvent::Paste(PasteEvent { event_id, text })),
                None => log::debug!("paste: clipboard is empty"),
            },
            _ => {
                for event in events_for_shortcut(action, &self.state.items, event_id) {
                    self.handle(event);
                }
            }
        }
    }

    // ─── Viewport ────────────────────────────────────────────────────────

    /// Pan by a screen-space delta. Cancels any running inertia.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.inertia = None;
        self.state.viewport = pan_viewport(&self.state.viewport, dx, dy);
        self.notify();
    }

    pub fn zoom_at(&mut self, screen: Point, factor: f64) {
        self.state.viewport = self.state.viewport.zoom_at(screen, factor);
        self.notify();
    }

    /// Begin decelerating after a grab-scroll release. `velocity` is in
    /// screen px per millisecond, in the direction the content was dragged.
    pub fn start_inertia(&mut self, velocity: Point, now: Instant) {
        self.inertia = Some(InertialPan::new(
            velocity,
            now,
            self.config.inertia_friction,
            self.config.inertia_min_speed,
        ));
    }

    pub fn is_inertia_running(&self) -> bool {
        self.inertia.is_some()
    }

    /// Advance inertial panning; returns whether another tick is wanted.
    pub fn tick(&mut self, now: Instant) -> bool {
        let Some(inertia) = self.inertia.as_mut() else {
            return false;
        };
        match inertia.step(now) {
            Some(delta) => {
                // content follows the drag, so the viewport moves against it
                self.state.viewport = pan_viewport(&self.state.viewport, -delta.x, -delta.y);
                self.notify();
                true
            }
            None => {
                self.inertia = None;
                false
            }
        }
    }

    /// Pan when the cursor is near a viewport edge during a drag. Returns
    /// the applied screen delta.
    pub fn auto_scroll(&mut self, cursor: Point, view_width: f64, view_height: f64) -> Point {
        let delta = auto_scroll_delta(
            cursor,
            view_width,
            view_height,
            self.config.auto_scroll_edge,
            self.config.auto_scroll_speed,
        );
        if delta.x != 0.0 || delta.y != 0.0 {
            self.state.viewport = pan_viewport(&self.state.viewport, delta.x, delta.y);
            self.notify();
        }
        delta
    }

    // ─── Rendering helpers ───────────────────────────────────────────────

    /// SVG `d` attribute for a connect line.
    pub fn connect_line_path(&self, id: DiagramId) -> Option<String> {
        let line = get_diagram_by_id(&self.state.items, id)?.as_connect_line()?;
        let points: Vec<Point> = line.points.iter().map(|p| p.point()).collect();
        let cmds = build_path(&points, line.path_type, self.config.rounded_corner_radius);
        Some(path_to_svg_d(&cmds))
    }
}

/// Ids present in `after` whose node is not shared with `before`.
fn changed_ids(before: &[Arc<Diagram>], after: &[Arc<Diagram>]) -> HashSet<DiagramId> {
    let mut known: HashMap<DiagramId, *const Diagram> = HashMap::new();
    for_each_diagram(before, &mut |d| {
        known.insert(d.id, Arc::as_ptr(d));
    });
    let mut changed = HashSet::new();
    for_each_diagram(after, &mut |d| {
        if known.get(&d.id) != Some(&Arc::as_ptr(d)) {
            changed.insert(d.id);
        }
    });
    changed
}
