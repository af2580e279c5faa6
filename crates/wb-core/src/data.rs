//! Serializable projection of diagrams, persistence documents and the
//! clipboard format.
//!
//! Everything crossing this boundary is validated before it reaches the
//! editor: a rejected payload is never partially applied.

use crate::error::DataError;
use crate::id::DiagramId;
use crate::layout::refresh_group_frames;
use crate::model::{Diagram, UiFlags};
use crate::selection::cleanup_groups;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Current persisted document version.
pub const DOCUMENT_VERSION: u32 = 1;

/// A diagram tree without editing-only state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiagramData(pub Diagram);

impl From<&Diagram> for DiagramData {
    fn from(d: &Diagram) -> Self {
        DiagramData(strip_ui(d))
    }
}

fn strip_ui(d: &Diagram) -> Diagram {
    let mut out = d.clone();
    out.ui = UiFlags::default();
    if let Some(items) = out.items_mut() {
        for child in items.iter_mut() {
            *child = Arc::new(strip_ui(child));
        }
    }
    out
}

impl DiagramData {
    /// Rehydrate as a live diagram; transient flags start at their defaults.
    pub fn into_diagram(self) -> Diagram {
        self.0
    }
}

/// Project a forest into its serializable form.
pub fn to_data(items: &[Arc<Diagram>]) -> Vec<DiagramData> {
    items.iter().map(|d| DiagramData::from(&**d)).collect()
}

/// Rebuild a forest from its serializable form.
pub fn from_data(data: Vec<DiagramData>) -> Vec<Arc<Diagram>> {
    data.into_iter().map(|d| Arc::new(d.into_diagram())).collect()
}

/// Check field validity and forest-wide id uniqueness.
///
/// # Errors
///
/// Returns the first [`DataError::InvalidDiagram`] or
/// [`DataError::DuplicateId`] found.
pub fn validate_items(items: &[DiagramData]) -> Result<(), DataError> {
    validate_forest(items.iter().map(|d| &d.0))
}

/// [`validate_items`] for live diagrams, e.g. an event payload.
///
/// # Errors
///
/// Same as [`validate_items`].
pub fn validate_diagrams(items: &[Arc<Diagram>]) -> Result<(), DataError> {
    validate_forest(items.iter().map(|d| &**d))
}

fn validate_forest<'a>(items: impl IntoIterator<Item = &'a Diagram>) -> Result<(), DataError> {
    let mut seen = HashSet::new();
    for item in items {
        validate_node(item, &mut seen)?;
    }
    Ok(())
}

fn validate_node(d: &Diagram, seen: &mut HashSet<DiagramId>) -> Result<(), DataError> {
    if !seen.insert(d.id) {
        return Err(DataError::DuplicateId(d.id));
    }
    d.validate()
        .map_err(|source| DataError::InvalidDiagram { id: d.id, source })?;
    for child in d.items().into_iter().flatten() {
        validate_node(child, seen)?;
    }
    Ok(())
}

// ─── Document ────────────────────────────────────────────────────────────

/// Persisted canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub version: u32,
    pub items: Vec<DiagramData>,
}

impl Document {
    pub fn new(items: &[Arc<Diagram>]) -> Self {
        Self {
            version: DOCUMENT_VERSION,
            items: to_data(items),
        }
    }

    fn check(self) -> Result<Self, DataError> {
        if self.version != DOCUMENT_VERSION {
            return Err(DataError::UnsupportedVersion {
                found: self.version,
                expected: DOCUMENT_VERSION,
            });
        }
        validate_items(&self.items)?;
        Ok(self)
    }

    pub fn to_json(&self) -> Result<String, DataError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and validate a JSON document.
    ///
    /// # Errors
    ///
    /// Syntax errors, unknown versions and invalid diagrams are rejected.
    pub fn from_json(text: &str) -> Result<Self, DataError> {
        serde_json::from_str::<Document>(text)?.check()
    }

    /// Compact binary encoding (named fields).
    pub fn to_msgpack(&self) -> Result<Vec<u8>, DataError> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    pub fn from_msgpack(bytes: &[u8]) -> Result<Self, DataError> {
        rmp_serde::from_slice::<Document>(bytes)?.check()
    }

    pub fn into_items(self) -> Vec<Arc<Diagram>> {
        from_data(self.items)
    }
}

// ─── Clipboard ───────────────────────────────────────────────────────────

/// Serialize diagrams as the clipboard JSON array.
pub fn copy_diagrams(items: &[Arc<Diagram>]) -> Result<String, DataError> {
    Ok(serde_json::to_string(&to_data(items))?)
}

/// Parse clipboard text into fresh diagrams ready to insert.
///
/// Every node gets a new id (anchors and path points too) and is moved by
/// `offset` on both axes. Connect lines are kept only when both owners are
/// part of the paste; their owner ids are re-pointed at the copies.
///
/// # Errors
///
/// Malformed JSON or invalid diagrams reject the whole paste.
pub fn paste_diagrams(text: &str, offset: f64) -> Result<Vec<Arc<Diagram>>, DataError> {
    let data: Vec<DiagramData> = serde_json::from_str(text).inspect_err(|e| {
        log::warn!("rejected clipboard payload: {e}");
    })?;
    validate_items(&data).inspect_err(|e| log::warn!("rejected clipboard payload: {e}"))?;

    let diagrams: Vec<Diagram> = data.into_iter().map(DiagramData::into_diagram).collect();
    let mut mapping = HashMap::new();
    for d in &diagrams {
        assign_fresh_ids(d, &mut mapping);
    }

    let pasted: Vec<Arc<Diagram>> = diagrams
        .iter()
        .filter_map(|d| remap(d, &mapping))
        .map(|d| Arc::new(d.translated(offset, offset)))
        .collect();
    Ok(refresh_group_frames(&cleanup_groups(&pasted)))
}

fn assign_fresh_ids(d: &Diagram, mapping: &mut HashMap<DiagramId, DiagramId>) {
    mapping.insert(d.id, DiagramId::fresh());
    for child in d.items().into_iter().flatten() {
        assign_fresh_ids(child, mapping);
    }
}

/// Copy with ids replaced; `None` for lines that would dangle.
fn remap(d: &Diagram, mapping: &HashMap<DiagramId, DiagramId>) -> Option<Diagram> {
    let mut out = d.clone();
    out.id = *mapping.get(&d.id)?;

    if let Some(line) = out.as_connect_line_mut() {
        let (Some(start), Some(end)) = (
            mapping.get(&line.start_owner_id),
            mapping.get(&line.end_owner_id),
        ) else {
            log::debug!("dropping pasted line {}: owner outside the paste", d.id);
            return None;
        };
        line.start_owner_id = *start;
        line.end_owner_id = *end;
    }
    if let Some(points) = out.connect_points_mut() {
        for p in points.iter_mut() {
            p.id = DiagramId::fresh();
        }
    }
    if let Some(points) = out.path_points_mut() {
        for p in points.iter_mut() {
            p.id = DiagramId::fresh();
        }
    }
    if let Some(items) = out.items_mut() {
        *items = items
            .iter()
            .filter_map(|child| remap(child, mapping))
            .map(Arc::new)
            .collect();
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connect::{create_connect_line, ConnectOptions};
    use crate::registry::{create_group_state, create_rectangle_state, DiagramRegistry};
    use crate::tree::collect_ids;
    use pretty_assertions::assert_eq;

    #[test]
    fn projection_strips_transient_flags() {
        let mut r = create_rectangle_state(0.0, 0.0);
        r.ui.is_text_editing = true;
        r.ui.hide_transform_control = true;
        let g = create_group_state(vec![Arc::new(r), Arc::new(create_rectangle_state(200.0, 0.0))]);
        let data = DiagramData::from(&g);
        let child = &data.0.items().unwrap()[0];
        assert_eq!(child.ui, UiFlags::default());
    }

    #[test]
    fn document_json_and_msgpack_roundtrip() {
        let items = vec![
            Arc::new(create_rectangle_state(0.0, 0.0)),
            Arc::new(create_group_state(vec![
                Arc::new(create_rectangle_state(100.0, 100.0)),
                Arc::new(create_rectangle_state(300.0, 100.0)),
            ])),
        ];
        let doc = Document::new(&items);

        let json = doc.to_json().unwrap();
        assert!(json.contains("\"version\": 1"));
        let back = Document::from_json(&json).unwrap();
        assert_eq!(back, doc);

        let bytes = doc.to_msgpack().unwrap();
        let back = Document::from_msgpack(&bytes).unwrap();
        assert_eq!(collect_ids(&back.into_items()), collect_ids(&items));
    }

    #[test]
    fn unknown_version_is_rejected() {
        let json = r#"{"version": 7, "items": []}"#;
        assert!(matches!(
            Document::from_json(json),
            Err(DataError::UnsupportedVersion { found: 7, expected: 1 })
        ));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let r = create_rectangle_state(0.0, 0.0);
        let doc = Document {
            version: 1,
            items: vec![DiagramData::from(&r), DiagramData::from(&r)],
        };
        let json = serde_json::to_string(&doc).unwrap();
        assert!(matches!(Document::from_json(&json), Err(DataError::DuplicateId(id)) if id == r.id));
    }

    #[test]
    fn invalid_frame_is_rejected() {
        let mut r = create_rectangle_state(0.0, 0.0);
        r.frame_mut().unwrap().scale_x = 0.0;
        let text = copy_diagrams(&[Arc::new(r)]).unwrap();
        assert!(matches!(paste_diagrams(&text, 20.0), Err(DataError::InvalidDiagram { .. })));
        assert!(matches!(paste_diagrams("[{", 20.0), Err(DataError::Json(_))));
    }

    #[test]
    fn paste_assigns_fresh_ids_and_offsets() {
        let items = vec![
            Arc::new(create_rectangle_state(0.0, 0.0)),
            Arc::new(create_rectangle_state(200.0, 50.0)),
        ];
        let text = copy_diagrams(&items).unwrap();
        let pasted = paste_diagrams(&text, 20.0).unwrap();
        assert_eq!(pasted.len(), 2);
        for (orig, copy) in items.iter().zip(&pasted) {
            assert_ne!(orig.id, copy.id);
            assert_eq!((copy.x, copy.y), (orig.x + 20.0, orig.y + 20.0));
            assert!(crate::connect::connect_points_are_current(copy, &DiagramRegistry::with_defaults()));
        }
        assert_ne!(pasted[0].id, pasted[1].id);
    }

    #[test]
    fn paste_keeps_internal_lines_and_drops_dangling_ones() {
        let a = Arc::new(create_rectangle_state(0.0, 0.0));
        let b = Arc::new(create_rectangle_state(300.0, 0.0));
        let items = vec![Arc::clone(&a), Arc::clone(&b)];
        let line = create_connect_line(&items, a.id, b.id, &ConnectOptions::default(), 20.0, &DiagramRegistry::with_defaults())
            .unwrap()
            .line;

        let with_both = vec![Arc::clone(&a), Arc::clone(&b), Arc::new(line.clone())];
        let pasted = paste_diagrams(&copy_diagrams(&with_both).unwrap(), 20.0).unwrap();
        assert_eq!(pasted.len(), 3);
        let l = pasted[2].as_connect_line().unwrap();
        assert_eq!(l.start_owner_id, pasted[0].id);
        assert_eq!(l.end_owner_id, pasted[1].id);

        let only_a = vec![a, Arc::new(line)];
        let pasted = paste_diagrams(&copy_diagrams(&only_a).unwrap(), 20.0).unwrap();
        assert_eq!(pasted.len(), 1);
    }
}
