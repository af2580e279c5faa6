//! Lint diagnostics for diagram forests.
//!
//! Reports structural issues without modifying anything. This is how callers
//! find orphaned connect lines: the core never cascade-deletes them.

use crate::connect::connect_points_are_current;
use crate::id::DiagramId;
use crate::model::{Diagram, ItemableType};
use crate::registry::DiagramRegistry;
use crate::tree::{contains_id, for_each_diagram};
use std::collections::HashSet;
use std::sync::Arc;

// ─── Diagnostic types ────────────────────────────────────────────────────

/// Severity of a lint finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LintSeverity {
    /// Breaks an invariant the editor relies on.
    Warning,
    /// Harmless but unexpected.
    Info,
}

/// A single lint diagnostic for a diagram.
#[derive(Debug, Clone, PartialEq)]
pub struct LintDiagnostic {
    pub diagram_id: DiagramId,
    pub message: String,
    pub severity: LintSeverity,
    /// Short rule identifier (e.g. "orphan-connect-line").
    pub rule: &'static str,
}

// ─── Public API ──────────────────────────────────────────────────────────

/// Run all lint rules over the forest. Anchors are checked against
/// `registry`'s generators.
#[must_use]
pub fn lint_diagrams(items: &[Arc<Diagram>], registry: &DiagramRegistry) -> Vec<LintDiagnostic> {
    let mut diags = Vec::new();
    lint_duplicate_ids(items, &mut diags);
    lint_degenerate_groups(items, &mut diags);
    lint_orphan_lines(items, &mut diags);
    lint_stale_connect_points(items, registry, &mut diags);
    diags
}

/// Ids of connect lines whose owners are gone.
pub fn orphaned_connect_lines(items: &[Arc<Diagram>]) -> Vec<DiagramId> {
    let mut out = Vec::new();
    for_each_diagram(items, &mut |d| {
        if let Some(line) = d.as_connect_line() {
            if !contains_id(items, line.start_owner_id) || !contains_id(items, line.end_owner_id) {
                out.push(d.id);
            }
        }
    });
    out
}

// ─── Rules ───────────────────────────────────────────────────────────────

fn lint_duplicate_ids(items: &[Arc<Diagram>], diags: &mut Vec<LintDiagnostic>) {
    let mut seen = HashSet::new();
    for_each_diagram(items, &mut |d| {
        if !seen.insert(d.id) {
            diags.push(LintDiagnostic {
                diagram_id: d.id,
                message: format!("Id `{}` is used by more than one diagram.", d.id),
                severity: LintSeverity::Warning,
                rule: "duplicate-id",
            });
        }
    });
}

fn lint_degenerate_groups(items: &[Arc<Diagram>], diags: &mut Vec<LintDiagnostic>) {
    for_each_diagram(items, &mut |d| {
        if d.itemable_type() != Some(ItemableType::Group) {
            return;
        }
        match d.items().map_or(0, Vec::len) {
            0 => diags.push(LintDiagnostic {
                diagram_id: d.id,
                message: format!("Group `{}` has no children.", d.id),
                severity: LintSeverity::Warning,
                rule: "empty-group",
            }),
            1 => diags.push(LintDiagnostic {
                diagram_id: d.id,
                message: format!("Group `{}` wraps a single diagram.", d.id),
                severity: LintSeverity::Info,
                rule: "singleton-group",
            }),
            _ => {}
        }
    });
}

fn lint_orphan_lines(items: &[Arc<Diagram>], diags: &mut Vec<LintDiagnostic>) {
    for id in orphaned_connect_lines(items) {
        diags.push(LintDiagnostic {
            diagram_id: id,
            message: format!("Connect line `{id}` references a diagram that no longer exists."),
            severity: LintSeverity::Warning,
            rule: "orphan-connect-line",
        });
    }
}

fn lint_stale_connect_points(items: &[Arc<Diagram>], registry: &DiagramRegistry, diags: &mut Vec<LintDiagnostic>) {
    for_each_diagram(items, &mut |d| {
        if !connect_points_are_current(d, registry) {
            diags.push(LintDiagnostic {
                diagram_id: d.id,
                message: format!("Anchors of `{}` do not match its frame.", d.id),
                severity: LintSeverity::Warning,
                rule: "stale-connect-points",
            });
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connect::{create_connect_line, ConnectOptions};
    use crate::registry::{create_group_state, create_rectangle_state};
    use crate::tree::remove_diagrams_by_id;
    use pretty_assertions::assert_eq;

    fn rules(diags: &[LintDiagnostic]) -> Vec<&'static str> {
        diags.iter().map(|d| d.rule).collect()
    }

    #[test]
    fn clean_forest_has_no_findings() {
        let items = vec![
            Arc::new(create_rectangle_state(0.0, 0.0)),
            Arc::new(create_group_state(vec![
                Arc::new(create_rectangle_state(200.0, 0.0)),
                Arc::new(create_rectangle_state(400.0, 0.0)),
            ])),
        ];
        assert!(lint_diagrams(&items, &DiagramRegistry::with_defaults()).is_empty());
    }

    #[test]
    fn orphaned_line_is_reported_not_removed() {
        let a = Arc::new(create_rectangle_state(0.0, 0.0));
        let b = Arc::new(create_rectangle_state(300.0, 0.0));
        let line = create_connect_line(&[a.clone(), b.clone()], a.id, b.id, &ConnectOptions::default(), 20.0, &DiagramRegistry::with_defaults())
            .unwrap()
            .line;
        let line_id = line.id;
        let items = vec![a.clone(), b, Arc::new(line)];
        let after = remove_diagrams_by_id(&items, &HashSet::from([a.id]));

        assert_eq!(after.len(), 2);
        assert_eq!(orphaned_connect_lines(&after), vec![line_id]);
        assert_eq!(rules(&lint_diagrams(&after, &DiagramRegistry::with_defaults())), vec!["orphan-connect-line"]);
    }

    #[test]
    fn structural_problems_are_reported() {
        let r = Arc::new(create_rectangle_state(0.0, 0.0));
        let mut stale = create_rectangle_state(0.0, 0.0);
        stale.x = 50.0;
        let items = vec![
            Arc::clone(&r),
            Arc::clone(&r),
            Arc::new(create_group_state(vec![])),
            Arc::new(create_group_state(vec![Arc::new(stale)])),
        ];
        let found = rules(&lint_diagrams(&items, &DiagramRegistry::with_defaults()));
        assert_eq!(
            found,
            vec!["duplicate-id", "empty-group", "singleton-group", "stale-connect-points"]
        );
    }
}
