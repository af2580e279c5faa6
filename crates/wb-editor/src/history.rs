//! Undo/redo history.
//!
//! History is snapshot based: each committed interaction stores the whole
//! forest as `DiagramData`, and undo/redo replace `items` wholesale. A commit
//! carrying the same `EventId` as the newest entry replaces that entry, which
//! keeps one gesture (or one multi-target shortcut) a single undo step.

use crate::events::EventId;
use std::sync::Arc;
use wb_core::data::{from_data, to_data};
use wb_core::{Diagram, DiagramData};

/// One committed state.
#[derive(Debug, Clone, PartialEq)]
pub struct SvgCanvasHistory {
    pub event_id: EventId,
    pub items: Vec<DiagramData>,
}

/// Bounded undo/redo stacks.
///
/// The newest entry in `past` is always the present state, so undo needs at
/// least two entries.
#[derive(Debug)]
pub struct HistoryStack {
    past: Vec<SvgCanvasHistory>,
    future: Vec<SvgCanvasHistory>,
    /// Maximum undo depth.
    limit: usize,
}

impl HistoryStack {
    /// Start a history whose baseline is `items`.
    pub fn new(items: &[Arc<Diagram>], limit: usize) -> Self {
        let mut stack = Self {
            past: Vec::with_capacity(limit.min(64) + 1),
            future: Vec::new(),
            limit,
        };
        stack.reset(items);
        stack
    }

    /// Drop all entries and use `items` as the new baseline.
    pub fn reset(&mut self, items: &[Arc<Diagram>]) {
        self.past.clear();
        self.future.clear();
        self.past.push(SvgCanvasHistory {
            event_id: EventId::new(),
            items: to_data(items),
        });
    }

    /// Commit the present state under `event_id`.
    pub fn push(&mut self, event_id: EventId, items: &[Arc<Diagram>]) {
        let entry = SvgCanvasHistory {
            event_id,
            items: to_data(items),
        };
        self.future.clear();
        if self.past.len() > 1 && self.past.last().is_some_and(|top| top.event_id == event_id) {
            log::trace!("history: coalescing commit for {event_id}");
            if let Some(top) = self.past.last_mut() {
                *top = entry;
            }
            return;
        }
        self.past.push(entry);
        if self.past.len() > self.limit + 1 {
            self.past.remove(0);
        }
    }

    /// Step back; returns the state to show.
    pub fn undo(&mut self) -> Option<Vec<Arc<Diagram>>> {
        if self.past.len() < 2 {
            return None;
        }
        let undone = self.past.pop()?;
        self.future.push(undone);
        self.past.last().map(|e| from_data(e.items.clone()))
    }

    /// Step forward again; returns the state to show.
    pub fn redo(&mut self) -> Option<Vec<Arc<Diagram>>> {
        let entry = self.future.pop()?;
        let items = from_data(entry.items.clone());
        self.past.push(entry);
        Some(items)
    }

    pub fn can_undo(&self) -> bool {
        self.past.len() > 1
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Committed entries that can be undone.
    pub fn undo_len(&self) -> usize {
        self.past.len().saturating_sub(1)
    }

    pub fn redo_len(&self) -> usize {
        self.future.len()
    }

    /// The present entry.
    pub fn current(&self) -> Option<&SvgCanvasHistory> {
        self.past.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wb_core::registry::create_rectangle_state;

    fn forest(n: usize) -> Vec<Arc<Diagram>> {
        (0..n)
            .map(|i| Arc::new(create_rectangle_state(i as f64 * 150.0, 0.0)))
            .collect()
    }

    #[test]
    fn undo_redo_walks_entries() {
        let mut history = HistoryStack::new(&forest(0), 10);
        let one = forest(1);
        let two = forest(2);
        history.push(EventId::new(), &one);
        history.push(EventId::new(), &two);
        assert_eq!(history.undo_len(), 2);

        assert_eq!(history.undo().unwrap().len(), 1);
        assert_eq!(history.undo().unwrap().len(), 0);
        assert!(history.undo().is_none());
        assert!(history.can_redo());

        assert_eq!(history.redo().unwrap().len(), 1);
        assert_eq!(history.redo_len(), 1);
    }

    #[test]
    fn same_event_id_replaces_top() {
        let mut history = HistoryStack::new(&[], 10);
        let id = EventId::new();
        history.push(id, &forest(1));
        history.push(id, &forest(2));
        history.push(id, &forest(3));
        assert_eq!(history.undo_len(), 1);
        assert_eq!(history.current().unwrap().items.len(), 3);
    }

    #[test]
    fn new_commit_clears_redo() {
        let mut history = HistoryStack::new(&[], 10);
        history.push(EventId::new(), &forest(1));
        history.undo();
        assert!(history.can_redo());
        history.push(EventId::new(), &forest(2));
        assert!(!history.can_redo());
    }

    #[test]
    fn oldest_entries_are_dropped_past_the_limit() {
        let mut history = HistoryStack::new(&[], 3);
        for n in 1..=5 {
            history.push(EventId::new(), &forest(n));
        }
        assert_eq!(history.undo_len(), 3);
        let mut last = None;
        while let Some(items) = history.undo() {
            last = Some(items.len());
        }
        assert_eq!(last, Some(2));
    }
}
