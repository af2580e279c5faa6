//! Keyboard shortcut mapping.
//!
//! Maps key + modifier chords to [`ShortcutAction`]s, then actions to
//! pipeline events. On macOS `meta` is ⌘; elsewhere `ctrl` plays that role.

use crate::events::{EditorEvent, EventId, SelectDiagramsEvent, StackOrderChangeEvent};
use std::sync::Arc;
use wb_core::Diagram;
use wb_core::selection::{StackOrderChange, get_selected_ids};

/// Actions that keyboard shortcuts can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    // ── Edit ──
    Undo,
    Redo,
    Delete,
    SelectAll,
    Copy,
    Cut,
    Paste,
    Deselect,

    // ── Structure ──
    Group,
    Ungroup,
    ExtractToTopLevel,

    // ── Z-order ──
    SendBackward,
    BringForward,
    SendToBack,
    BringToFront,
}

pub struct ShortcutMap;

impl ShortcutMap {
    /// Resolve a key event to an action.
    ///
    /// `key` is the `KeyboardEvent.key` value (e.g. `"z"`, `"Delete"`).
    /// Returns `None` if the chord has no binding.
    pub fn resolve(key: &str, ctrl: bool, shift: bool, _alt: bool, meta: bool) -> Option<ShortcutAction> {
        let cmd = ctrl || meta;

        if cmd && shift {
            return match key {
                "z" | "Z" => Some(ShortcutAction::Redo),
                "g" | "G" => Some(ShortcutAction::Ungroup),
                "e" | "E" => Some(ShortcutAction::ExtractToTopLevel),
                "[" | "{" => Some(ShortcutAction::SendToBack),
                "]" | "}" => Some(ShortcutAction::BringToFront),
                _ => None,
            };
        }

        if cmd {
            return match key {
                "z" | "Z" => Some(ShortcutAction::Undo),
                "y" | "Y" => Some(ShortcutAction::Redo),
                "a" | "A" => Some(ShortcutAction::SelectAll),
                "c" | "C" => Some(ShortcutAction::Copy),
                "x" | "X" => Some(ShortcutAction::Cut),
                "v" | "V" => Some(ShortcutAction::Paste),
                "g" | "G" => Some(ShortcutAction::Group),
                "[" => Some(ShortcutAction::SendBackward),
                "]" => Some(ShortcutAction::BringForward),
                _ => None,
            };
        }

        if shift {
            return None;
        }

        match key {
            "Delete" | "Backspace" => Some(ShortcutAction::Delete),
            "Escape" => Some(ShortcutAction::Deselect),
            _ => None,
        }
    }
}

/// Events an action expands to against the current forest.
///
/// Clipboard actions need a clipboard and yield nothing here. Z-order
/// actions emit one event per selected diagram, all sharing `event_id` so
/// they commit as one undo step. Send-to-back walks the selection topmost
/// first so the selected diagrams keep their relative order.
pub fn events_for_shortcut(action: ShortcutAction, items: &[Arc<Diagram>], event_id: EventId) -> Vec<EditorEvent> {
    let stack = |change: StackOrderChange| -> Vec<EditorEvent> {
        let mut ids = get_selected_ids(items);
        if change == StackOrderChange::SendToBack {
            ids.reverse();
        }
        ids.into_iter()
            .map(|id| {
                EditorEvent::StackOrderChange(StackOrderChangeEvent {
                    event_id,
                    id,
                    change_type: change,
                })
            })
            .collect()
    };

    match action {
        ShortcutAction::Undo => vec![EditorEvent::Undo { event_id }],
        ShortcutAction::Redo => vec![EditorEvent::Redo { event_id }],
        ShortcutAction::Delete => vec![EditorEvent::DeleteSelectedDiagrams { event_id }],
        ShortcutAction::SelectAll => vec![EditorEvent::SelectDiagrams(SelectDiagramsEvent {
            event_id,
            ids: items.iter().map(|d| d.id).collect(),
            extend: false,
        })],
        ShortcutAction::Deselect => vec![EditorEvent::ClearSelection { event_id }],
        ShortcutAction::Group => vec![EditorEvent::GroupDiagrams { event_id }],
        ShortcutAction::Ungroup => vec![EditorEvent::UngroupDiagrams { event_id }],
        ShortcutAction::ExtractToTopLevel => vec![EditorEvent::ExtractSelectedDiagramsToTopLevel { event_id }],
        ShortcutAction::SendBackward => stack(StackOrderChange::SendBackward),
        ShortcutAction::BringForward => stack(StackOrderChange::BringForward),
        ShortcutAction::SendToBack => stack(StackOrderChange::SendToBack),
        ShortcutAction::BringToFront => stack(StackOrderChange::BringToFront),
        ShortcutAction::Copy | ShortcutAction::Cut | ShortcutAction::Paste => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wb_core::registry::create_rectangle_state;

    #[test]
    fn resolve_undo_redo() {
        // Cmd+Z → Undo
        assert_eq!(ShortcutMap::resolve("z", false, false, false, true), Some(ShortcutAction::Undo));
        // Ctrl+Z → Undo
        assert_eq!(ShortcutMap::resolve("z", true, false, false, false), Some(ShortcutAction::Undo));
        // Cmd+Shift+Z → Redo
        assert_eq!(ShortcutMap::resolve("Z", false, true, false, true), Some(ShortcutAction::Redo));
        assert_eq!(ShortcutMap::resolve("y", true, false, false, false), Some(ShortcutAction::Redo));
    }

    #[test]
    fn resolve_grouping() {
        assert_eq!(ShortcutMap::resolve("g", false, false, false, true), Some(ShortcutAction::Group));
        assert_eq!(ShortcutMap::resolve("g", false, true, false, true), Some(ShortcutAction::Ungroup));
        assert_eq!(ShortcutMap::resolve("g", false, false, false, false), None);
    }

    #[test]
    fn resolve_z_order() {
        assert_eq!(ShortcutMap::resolve("[", false, false, false, true), Some(ShortcutAction::SendBackward));
        assert_eq!(ShortcutMap::resolve("]", false, false, false, true), Some(ShortcutAction::BringForward));
        assert_eq!(ShortcutMap::resolve("{", false, true, false, true), Some(ShortcutAction::SendToBack));
        assert_eq!(ShortcutMap::resolve("]", true, true, false, false), Some(ShortcutAction::BringToFront));
    }

    #[test]
    fn resolve_plain_keys() {
        assert_eq!(ShortcutMap::resolve("Backspace", false, false, false, false), Some(ShortcutAction::Delete));
        assert_eq!(ShortcutMap::resolve("Escape", false, false, false, false), Some(ShortcutAction::Deselect));
        assert_eq!(ShortcutMap::resolve("Delete", false, true, false, false), None);
        assert_eq!(ShortcutMap::resolve("q", false, false, false, false), None);
    }

    #[test]
    fn z_order_expands_per_selected_diagram() {
        let mut a = create_rectangle_state(0.0, 0.0);
        let mut b = create_rectangle_state(200.0, 0.0);
        a.ui.is_selected = true;
        b.ui.is_selected = true;
        let items = vec![Arc::new(a), Arc::new(b), Arc::new(create_rectangle_state(400.0, 0.0))];
        let event_id = EventId::new();
        let events = events_for_shortcut(ShortcutAction::BringToFront, &items, event_id);
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.event_id() == event_id));
    }

    #[test]
    fn select_all_takes_top_level_ids() {
        let items = vec![
            Arc::new(create_rectangle_state(0.0, 0.0)),
            Arc::new(create_rectangle_state(200.0, 0.0)),
        ];
        let events = events_for_shortcut(ShortcutAction::SelectAll, &items, EventId::new());
        let [EditorEvent::SelectDiagrams(select)] = events.as_slice() else {
            panic!("expected a single select event, got {events:?}");
        };
        assert_eq!(select.ids, vec![items[0].id, items[1].id]);
        assert!(events_for_shortcut(ShortcutAction::Copy, &items, EventId::new()).is_empty());
    }
}
