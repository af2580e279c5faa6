//! Connection engine: anchors, frame-to-frame routing and line refresh.
//!
//! Connectable shapes carry a full set of named anchors that tracks their
//! frame. Connect lines reference their owners by id and remember which
//! anchor they hang off, so a moved owner can either re-route the whole
//! line (`auto_routing`) or drag just the matching endpoint along.

use crate::geometry::{affine_transformation, Bounds, OrientedBox, Point, EPSILON};
use crate::id::DiagramId;
use crate::model::{
    AnchorName, ArrowHead, Color, ConnectLine, ConnectPoint, ConnectPoints, Diagram, DiagramKind,
    DiagramType, LineStyle, PathPoint, PathType,
};
use crate::registry::DiagramRegistry;
use crate::tree::{apply_function_recursively, for_each_diagram, get_diagram_by_id};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

// ─── Anchor generation ───────────────────────────────────────────────────

/// Produces the eight anchors of a shape for a given frame.
pub type AnchorGenerator = fn(&OrientedBox) -> [(AnchorName, Point); 8];

fn place(b: &OrientedBox, lx: f64, ly: f64) -> Point {
    affine_transformation(lx, ly, b.scale_x, b.scale_y, b.rotation, b.x, b.y)
}

/// Edge centers and frame corners.
pub fn rectangle_anchors(b: &OrientedBox) -> [(AnchorName, Point); 8] {
    let hw = b.width / 2.0;
    let hh = b.height / 2.0;
    AnchorName::ALL.map(|name| {
        let (lx, ly) = match name {
            AnchorName::TopCenter => (0.0, -hh),
            AnchorName::BottomCenter => (0.0, hh),
            AnchorName::LeftCenter => (-hw, 0.0),
            AnchorName::RightCenter => (hw, 0.0),
            AnchorName::TopLeft => (-hw, -hh),
            AnchorName::TopRight => (hw, -hh),
            AnchorName::BottomLeft => (-hw, hh),
            AnchorName::BottomRight => (hw, hh),
        };
        (name, place(b, lx, ly))
    })
}

/// Edge centers and the four 45° points on the ellipse boundary.
pub fn ellipse_anchors(b: &OrientedBox) -> [(AnchorName, Point); 8] {
    let hw = b.width / 2.0;
    let hh = b.height / 2.0;
    AnchorName::ALL.map(|name| {
        let n = name.local_normal();
        (name, place(b, n.x * hw, n.y * hh))
    })
}

/// Built-in generator for a type. `DiagramRegistry::with_defaults` registers these.
pub fn default_anchor_generator(diagram_type: DiagramType) -> Option<AnchorGenerator> {
    match diagram_type {
        DiagramType::Ellipse => Some(ellipse_anchors),
        DiagramType::Rectangle
        | DiagramType::Text
        | DiagramType::Image
        | DiagramType::Canvas
        | DiagramType::AgentNode => Some(rectangle_anchors),
        DiagramType::Path | DiagramType::Group | DiagramType::ConnectLine => None,
    }
}

/// Outward unit normal of an anchor in canvas space.
pub fn anchor_normal(b: &OrientedBox, name: AnchorName) -> Point {
    let n = name.local_normal();
    let flipped = Point::new(n.x * b.scale_x.signum(), n.y * b.scale_y.signum());
    affine_transformation(flipped.x, flipped.y, 1.0, 1.0, b.rotation, 0.0, 0.0)
}

/// Fresh anchor set for the diagram's current frame, keeping the ids of
/// anchors that already exist.
pub fn generate_connect_points(diagram: &Diagram, generator: AnchorGenerator) -> Option<ConnectPoints> {
    let existing = diagram.connect_points()?;
    let frame = diagram.oriented_box()?;
    Some(
        generator(&frame)
            .into_iter()
            .map(|(name, p)| ConnectPoint {
                id: existing
                    .iter()
                    .find(|cp| cp.name == name)
                    .map_or_else(DiagramId::fresh, |cp| cp.id),
                name,
                x: p.x,
                y: p.y,
            })
            .collect(),
    )
}

/// Recompute the anchors of a connectable diagram in place.
pub fn update_connect_points_with(diagram: &mut Diagram, generator: AnchorGenerator) {
    if let Some(points) = generate_connect_points(diagram, generator) {
        if let Some(slot) = diagram.connect_points_mut() {
            *slot = points;
        }
    }
}

/// Whether every stored anchor sits where `registry`'s generator puts it.
pub fn connect_points_are_current(diagram: &Diagram, registry: &DiagramRegistry) -> bool {
    let (Some(points), Some(frame), Some(generator)) = (
        diagram.connect_points(),
        diagram.oriented_box(),
        registry.anchor_generator(diagram.diagram_type()),
    ) else {
        return true;
    };
    let expected = generator(&frame);
    points.iter().all(|cp| {
        expected
            .iter()
            .find(|(name, _)| *name == cp.name)
            .is_some_and(|(_, p)| p.approx_eq(cp.point()))
    })
}

/// Look up `requested` (or `default`) on the shape.
///
/// A missing anchor is synthesized from the frame and appended to the
/// shape's `connect_points`, so the caller should store the shape back.
/// Returns `None` for non-connectable diagrams.
pub fn find_connect_point(
    shape: &mut Diagram,
    requested: Option<AnchorName>,
    default: AnchorName,
    registry: &DiagramRegistry,
) -> Option<ConnectPoint> {
    let name = requested.unwrap_or(default);
    if let Some(found) = shape.connect_points()?.iter().find(|cp| cp.name == name) {
        return Some(found.clone());
    }
    let generator = registry.anchor_generator(shape.diagram_type())?;
    let frame = shape.oriented_box()?;
    let (_, p) = generator(&frame).into_iter().find(|(n, _)| *n == name)?;
    let point = ConnectPoint {
        id: DiagramId::fresh(),
        name,
        x: p.x,
        y: p.y,
    };
    shape.connect_points_mut()?.push(point.clone());
    Some(point)
}

// ─── Routing ─────────────────────────────────────────────────────────────

/// Pick the facing pair of edge-center anchors for two frames.
pub fn best_anchors(from: &OrientedBox, to: &OrientedBox) -> (AnchorName, AnchorName) {
    let a = from.bounds();
    let b = to.bounds();
    let dx = b.center().x - a.center().x;
    let dy = b.center().y - a.center().y;

    let h_overlap = a.x < b.right() && a.right() > b.x;
    let v_overlap = a.y < b.bottom() && a.bottom() > b.y;
    let mostly_vertical = dy.abs() > dx.abs() * 1.5;

    let vertical = if (h_overlap && !v_overlap) || mostly_vertical {
        true
    } else if v_overlap && !h_overlap {
        false
    } else {
        dx.abs() <= dy.abs()
    };

    match (vertical, dx > 0.0, dy > 0.0) {
        (true, _, true) => (AnchorName::BottomCenter, AnchorName::TopCenter),
        (true, _, false) => (AnchorName::TopCenter, AnchorName::BottomCenter),
        (false, true, _) => (AnchorName::RightCenter, AnchorName::LeftCenter),
        (false, false, _) => (AnchorName::LeftCenter, AnchorName::RightCenter),
    }
}

fn dot(a: Point, b: Point) -> f64 {
    a.x * b.x + a.y * b.y
}

fn direction(from: Point, to: Point) -> Point {
    let len = from.distance(to);
    if len < EPSILON {
        Point::default()
    } else {
        Point::new((to.x - from.x) / len, (to.y - from.y) / len)
    }
}

fn is_axis_aligned(n: Point) -> bool {
    n.x.abs() < EPSILON || n.y.abs() < EPSILON
}

/// Drop repeated points and merge straight runs that keep their heading.
pub fn simplify_path(points: Vec<Point>) -> Vec<Point> {
    let mut out: Vec<Point> = Vec::with_capacity(points.len());
    for p in points {
        if out.last().is_some_and(|last| last.approx_eq(p)) {
            continue;
        }
        while out.len() >= 2 {
            let a = out[out.len() - 2];
            let b = out[out.len() - 1];
            let (ab, bp) = (direction(a, b), direction(b, p));
            let cross = ab.x * bp.y - ab.y * bp.x;
            if cross.abs() < EPSILON && dot(ab, bp) > 0.0 {
                out.pop();
            } else {
                break;
            }
        }
        out.push(p);
    }
    out
}

/// Liang–Barsky clip of segment `a`–`b` against the frame shrunk by half a
/// unit, so segments that only graze the border do not count.
fn segment_crosses_interior(a: Point, b: Point, frame: &OrientedBox) -> bool {
    let hw = frame.width / 2.0 - 0.5;
    let hh = frame.height / 2.0 - 0.5;
    if hw <= 0.0 || hh <= 0.0 {
        return false;
    }
    let p = frame.canvas_to_local(a);
    let q = frame.canvas_to_local(b);
    let (dx, dy) = (q.x - p.x, q.y - p.y);
    let (mut t0, mut t1) = (0.0_f64, 1.0_f64);
    for (pk, qk) in [(-dx, p.x + hw), (dx, hw - p.x), (-dy, p.y + hh), (dy, hh - p.y)] {
        if pk.abs() < EPSILON {
            if qk < 0.0 {
                return false;
            }
            continue;
        }
        let r = qk / pk;
        if pk < 0.0 {
            if r > t1 {
                return false;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return false;
            }
            t1 = t1.min(r);
        }
    }
    t1 - t0 > EPSILON
}

fn is_valid_route(path: &[Point], n_source: Point, n_target: Point, frames: [&OrientedBox; 2]) -> bool {
    if path.len() < 2 {
        return false;
    }
    if dot(direction(path[0], path[1]), n_source) <= 0.0 {
        return false;
    }
    let last = path.len() - 1;
    if dot(direction(path[last - 1], path[last]), n_target) >= 0.0 {
        return false;
    }
    let reverses = path
        .windows(3)
        .any(|w| dot(direction(w[0], w[1]), direction(w[1], w[2])) < -0.5);
    if reverses {
        return false;
    }
    !path
        .windows(2)
        .any(|w| frames.iter().any(|f| segment_crosses_interior(w[0], w[1], f)))
}

fn route_score(path: &[Point], margin: f64) -> f64 {
    let length: f64 = path.windows(2).map(|w| w[0].distance(w[1])).sum();
    length + path.len().saturating_sub(2) as f64 * margin
}

/// Orthogonal route between two anchors.
///
/// The path leaves `source` along its outward normal for `margin` units and
/// enters `target` against its normal over the same distance. In between,
/// candidate L, Z and detour shapes are tried and the shortest one that
/// stays out of both frames wins. Rotated anchors whose normals are not
/// axis-aligned get the two stubs joined directly.
pub fn generate_optimal_frame_to_frame_connection(
    source: &ConnectPoint,
    source_frame: &OrientedBox,
    target: &ConnectPoint,
    target_frame: &OrientedBox,
    margin: f64,
) -> Vec<Point> {
    let start = source.point();
    let end = target.point();
    let n_s = anchor_normal(source_frame, source.name);
    let n_t = anchor_normal(target_frame, target.name);
    let s1 = start.offset(n_s.x * margin, n_s.y * margin);
    let e1 = end.offset(n_t.x * margin, n_t.y * margin);

    if !is_axis_aligned(n_s) || !is_axis_aligned(n_t) {
        return simplify_path(vec![start, s1, e1, end]);
    }

    let hull: Bounds = source_frame
        .bounds()
        .union(&target_frame.bounds())
        .inflate(margin);
    let mid_x = (s1.x + e1.x) / 2.0;
    let mid_y = (s1.y + e1.y) / 2.0;
    let middles = [
        vec![Point::new(e1.x, s1.y)],
        vec![Point::new(s1.x, e1.y)],
        vec![Point::new(mid_x, s1.y), Point::new(mid_x, e1.y)],
        vec![Point::new(s1.x, mid_y), Point::new(e1.x, mid_y)],
        vec![Point::new(s1.x, hull.y), Point::new(e1.x, hull.y)],
        vec![Point::new(s1.x, hull.bottom()), Point::new(e1.x, hull.bottom())],
        vec![Point::new(hull.x, s1.y), Point::new(hull.x, e1.y)],
        vec![Point::new(hull.right(), s1.y), Point::new(hull.right(), e1.y)],
    ];

    let candidates: Vec<Vec<Point>> = middles
        .into_iter()
        .map(|middle| {
            let mut path = Vec::with_capacity(middle.len() + 4);
            path.push(start);
            path.push(s1);
            path.extend(middle);
            path.push(e1);
            path.push(end);
            simplify_path(path)
        })
        .collect();

    let best = candidates
        .iter()
        .filter(|path| is_valid_route(path, n_s, n_t, [source_frame, target_frame]))
        .min_by(|a, b| route_score(a, margin).total_cmp(&route_score(b, margin)));

    match best {
        Some(path) => path.clone(),
        None => {
            log::trace!("no clean route between {} and {}; using L fallback", source.id, target.id);
            candidates.into_iter().next().unwrap_or_else(|| vec![start, end])
        }
    }
}

// ─── Connect lines ───────────────────────────────────────────────────────

/// Style and anchor choices for a new connect line.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectOptions {
    pub source_anchor: Option<AnchorName>,
    pub target_anchor: Option<AnchorName>,
    pub start_arrow_head: ArrowHead,
    pub end_arrow_head: ArrowHead,
    pub line_style: LineStyle,
    pub path_type: PathType,
    pub stroke: Color,
    pub stroke_width: f64,
    pub auto_routing: bool,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            source_anchor: None,
            target_anchor: None,
            start_arrow_head: ArrowHead::None,
            end_arrow_head: ArrowHead::Triangle,
            line_style: LineStyle::Solid,
            path_type: PathType::Polyline,
            stroke: Color::BLACK,
            stroke_width: 2.0,
            auto_routing: true,
        }
    }
}

/// A new connect line plus any owners whose anchors were memoized.
#[derive(Debug, Clone)]
pub struct Connection {
    pub line: Diagram,
    pub updated_owners: Vec<Arc<Diagram>>,
}

fn to_path_points(points: &[Point], previous: &[PathPoint]) -> Vec<PathPoint> {
    points
        .iter()
        .enumerate()
        .map(|(i, p)| PathPoint {
            id: previous.get(i).map_or_else(DiagramId::fresh, |old| old.id),
            x: p.x,
            y: p.y,
        })
        .collect()
}

fn recenter(line: &mut Diagram) {
    let Some(points) = line.path_points() else {
        return;
    };
    if let Ok(bounds) = Bounds::from_points(points.iter().map(PathPoint::point)) {
        let c = bounds.center();
        line.x = c.x;
        line.y = c.y;
    }
}

/// Build an auto-routed line between two connectable diagrams.
///
/// Returns `None` when either id is missing or not connectable.
pub fn create_connect_line(
    items: &[Arc<Diagram>],
    source_id: DiagramId,
    target_id: DiagramId,
    options: &ConnectOptions,
    margin: f64,
    registry: &DiagramRegistry,
) -> Option<Connection> {
    let mut source = (**get_diagram_by_id(items, source_id)?).clone();
    let mut target = (**get_diagram_by_id(items, target_id)?).clone();
    let source_frame = source.oriented_box()?;
    let target_frame = target.oriented_box()?;
    let (default_start, default_end) = best_anchors(&source_frame, &target_frame);

    let source_count = source.connect_points()?.len();
    let target_count = target.connect_points()?.len();
    let start = find_connect_point(&mut source, options.source_anchor, default_start, registry)?;
    let end = find_connect_point(&mut target, options.target_anchor, default_end, registry)?;

    let route = generate_optimal_frame_to_frame_connection(&start, &source_frame, &end, &target_frame, margin);
    let mut line = Diagram::new(
        DiagramId::fresh(),
        0.0,
        0.0,
        DiagramKind::ConnectLine(ConnectLine {
            stroke: options.stroke,
            stroke_width: options.stroke_width,
            line_style: options.line_style,
            path_type: options.path_type,
            start_arrow_head: options.start_arrow_head,
            end_arrow_head: options.end_arrow_head,
            auto_routing: options.auto_routing,
            start_owner_id: source_id,
            end_owner_id: target_id,
            start_anchor: start.name,
            end_anchor: end.name,
            points: to_path_points(&route, &[]),
        }),
    );
    recenter(&mut line);

    let mut updated_owners = Vec::new();
    if source.connect_points().map(|c| c.len()) != Some(source_count) {
        updated_owners.push(Arc::new(source));
    }
    if target.connect_points().map(|c| c.len()) != Some(target_count) {
        updated_owners.push(Arc::new(target));
    }
    Some(Connection { line, updated_owners })
}

/// Current position of an owner's anchor, synthesizing it if needed.
fn anchor_position(owner: &Diagram, name: AnchorName, registry: &DiagramRegistry) -> Option<ConnectPoint> {
    let mut scratch = owner.clone();
    find_connect_point(&mut scratch, Some(name), name, registry)
}

/// Re-route `line` from its owners' current frames.
pub fn route_connect_line(
    line: &Diagram,
    start_owner: &Diagram,
    end_owner: &Diagram,
    margin: f64,
    registry: &DiagramRegistry,
) -> Option<Diagram> {
    let data = line.as_connect_line()?;
    let start = anchor_position(start_owner, data.start_anchor, registry)?;
    let end = anchor_position(end_owner, data.end_anchor, registry)?;
    let route = generate_optimal_frame_to_frame_connection(
        &start,
        &start_owner.oriented_box()?,
        &end,
        &end_owner.oriented_box()?,
        margin,
    );
    let mut next = line.clone();
    let points = to_path_points(&route, &data.points);
    if let Some(slot) = next.path_points_mut() {
        *slot = points;
    }
    recenter(&mut next);
    Some(next)
}

fn anchor_delta(
    current: &[Arc<Diagram>],
    previous: &[Arc<Diagram>],
    owner: DiagramId,
    name: AnchorName,
    registry: &DiagramRegistry,
) -> Point {
    let now = get_diagram_by_id(current, owner).and_then(|d| anchor_position(d, name, registry));
    let before = get_diagram_by_id(previous, owner).and_then(|d| anchor_position(d, name, registry));
    match (now, before) {
        (Some(n), Some(b)) => Point::new(n.x - b.x, n.y - b.y),
        _ => Point::default(),
    }
}

/// Refresh exactly the lines in `line_ids`.
///
/// `previous` is the state the owners' deltas are measured against (the
/// gesture's pre-change snapshot). Auto-routed lines are re-routed; manual
/// lines start from their `previous` points and have each endpoint dragged
/// by its anchor's delta, or are translated whole when both anchors moved
/// together.
pub fn refresh_lines(
    items: &[Arc<Diagram>],
    line_ids: &HashSet<DiagramId>,
    previous: &[Arc<Diagram>],
    margin: f64,
    registry: &DiagramRegistry,
) -> Vec<Arc<Diagram>> {
    if line_ids.is_empty() {
        return items.to_vec();
    }
    let snapshot = items;
    apply_function_recursively(items, &mut |d| {
        if !line_ids.contains(&d.id) {
            return Arc::clone(d);
        }
        let Some(data) = d.as_connect_line() else {
            return Arc::clone(d);
        };
        let (Some(start_owner), Some(end_owner)) = (
            get_diagram_by_id(snapshot, data.start_owner_id),
            get_diagram_by_id(snapshot, data.end_owner_id),
        ) else {
            log::trace!("connect line {} has a missing owner; left as is", d.id);
            return Arc::clone(d);
        };

        if data.auto_routing {
            return route_connect_line(d, start_owner, end_owner, margin, registry)
                .map_or_else(|| Arc::clone(d), Arc::new);
        }

        let base = get_diagram_by_id(previous, d.id).map_or_else(|| Arc::clone(d), Arc::clone);
        let start_delta = anchor_delta(snapshot, previous, data.start_owner_id, data.start_anchor, registry);
        let end_delta = anchor_delta(snapshot, previous, data.end_owner_id, data.end_anchor, registry);

        let mut next = (*base).clone();
        // The line may have moved with a container; keep its current style.
        next.kind = d.kind.clone();
        let base_points = base
            .as_connect_line()
            .map(|l| l.points.clone())
            .unwrap_or_default();
        if start_delta.approx_eq(end_delta) {
            let moved = base.translated(start_delta.x, start_delta.y);
            next.x = moved.x;
            next.y = moved.y;
            if let (Some(slot), Some(points)) = (next.path_points_mut(), moved.path_points()) {
                *slot = points.clone();
            }
        } else if let Some(slot) = next.path_points_mut() {
            *slot = base_points;
            let last = slot.len().saturating_sub(1);
            if let Some(first) = slot.first_mut() {
                first.x += start_delta.x;
                first.y += start_delta.y;
            }
            if last > 0 {
                slot[last].x += end_delta.x;
                slot[last].y += end_delta.y;
            }
            recenter(&mut next);
        }
        Arc::new(next)
    })
}

/// Refresh every line attached to a diagram in `updated`.
pub fn refresh_connect_lines(
    updated: &HashSet<DiagramId>,
    items: &[Arc<Diagram>],
    previous: &[Arc<Diagram>],
    margin: f64,
    registry: &DiagramRegistry,
) -> Vec<Arc<Diagram>> {
    let index = ConnectionIndex::build(items);
    let lines = index.connected_line_ids(updated.iter().copied());
    refresh_lines(items, &lines, previous, margin, registry)
}

/// Lines that reference `id` as either owner.
pub fn get_connected_diagrams(items: &[Arc<Diagram>], id: DiagramId) -> Vec<Arc<Diagram>> {
    let mut out = Vec::new();
    for_each_diagram(items, &mut |d| {
        if let Some(line) = d.as_connect_line() {
            if line.start_owner_id == id || line.end_owner_id == id {
                out.push(Arc::clone(d));
            }
        }
    });
    out
}

// ─── Connectivity index ──────────────────────────────────────────────────

/// Owner graph: one node per owner id, one edge per line (start → end),
/// weighted with the line id.
#[derive(Debug, Default)]
pub struct ConnectionIndex {
    graph: DiGraph<DiagramId, DiagramId>,
    nodes: HashMap<DiagramId, NodeIndex>,
}

impl ConnectionIndex {
    pub fn build(items: &[Arc<Diagram>]) -> Self {
        let mut index = Self::default();
        for_each_diagram(items, &mut |d| {
            if let Some(line) = d.as_connect_line() {
                let a = index.node(line.start_owner_id);
                let b = index.node(line.end_owner_id);
                index.graph.add_edge(a, b, d.id);
            }
        });
        index
    }

    fn node(&mut self, id: DiagramId) -> NodeIndex {
        if let Some(&idx) = self.nodes.get(&id) {
            return idx;
        }
        let idx = self.graph.add_node(id);
        self.nodes.insert(id, idx);
        idx
    }

    /// Ids of every line touching any of `owners`.
    pub fn connected_line_ids(&self, owners: impl IntoIterator<Item = DiagramId>) -> HashSet<DiagramId> {
        let mut out = HashSet::new();
        for owner in owners {
            let Some(&idx) = self.nodes.get(&owner) else {
                continue;
            };
            for dir in [Direction::Outgoing, Direction::Incoming] {
                out.extend(self.graph.edges_directed(idx, dir).map(|e| *e.weight()));
            }
        }
        out
    }

    /// Diagrams directly connected to `id` by some line.
    pub fn neighbors(&self, id: DiagramId) -> Vec<DiagramId> {
        self.nodes
            .get(&id)
            .map(|&idx| self.graph.neighbors_undirected(idx).map(|n| self.graph[n]).collect())
            .unwrap_or_default()
    }

    pub fn line_count(&self) -> usize {
        self.graph.edge_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{create_ellipse_state, create_rectangle_state};
    use crate::tree::replace_diagram;
    use pretty_assertions::assert_eq;
    use std::f64::consts::FRAC_PI_2;

    const MARGIN: f64 = 20.0;

    fn registry() -> DiagramRegistry {
        DiagramRegistry::with_defaults()
    }

    fn anchor(d: &Diagram, name: AnchorName) -> Point {
        d.connect_points()
            .unwrap()
            .iter()
            .find(|cp| cp.name == name)
            .unwrap()
            .point()
    }

    fn two_boxes() -> Vec<Arc<Diagram>> {
        vec![
            Arc::new(create_rectangle_state(100.0, 100.0)),
            Arc::new(create_rectangle_state(400.0, 100.0)),
        ]
    }

    #[test]
    fn rectangle_anchors_follow_rotation() {
        let mut r = create_rectangle_state(0.0, 0.0);
        assert!(anchor(&r, AnchorName::TopCenter).approx_eq(Point::new(0.0, -50.0)));
        assert!(anchor(&r, AnchorName::BottomRight).approx_eq(Point::new(50.0, 50.0)));

        r.frame_mut().unwrap().rotation = FRAC_PI_2;
        assert!(!connect_points_are_current(&r, &registry()));
        registry().update_connect_points(&mut r);
        assert!(connect_points_are_current(&r, &registry()));
        assert!(anchor(&r, AnchorName::TopCenter).approx_eq(Point::new(50.0, 0.0)));
    }

    #[test]
    fn ellipse_corner_anchors_sit_on_the_boundary() {
        let e = create_ellipse_state(0.0, 0.0);
        let p = anchor(&e, AnchorName::TopRight);
        let f = e.frame().unwrap();
        let (a, b) = (f.width / 2.0, f.height / 2.0);
        assert!(((p.x / a).powi(2) + (p.y / b).powi(2) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn anchor_ids_survive_regeneration() {
        let mut r = create_rectangle_state(0.0, 0.0);
        let before: Vec<_> = r.connect_points().unwrap().iter().map(|c| c.id).collect();
        r.x = 500.0;
        registry().update_connect_points(&mut r);
        let after: Vec<_> = r.connect_points().unwrap().iter().map(|c| c.id).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn find_connect_point_memoizes_missing_anchor() {
        let mut r = create_rectangle_state(0.0, 0.0);
        r.connect_points_mut().unwrap().clear();
        let p = find_connect_point(&mut r, None, AnchorName::LeftCenter, &registry()).unwrap();
        assert!(p.point().approx_eq(Point::new(-50.0, 0.0)));
        assert_eq!(r.connect_points().unwrap().len(), 1);
        // second lookup reuses it
        let again = find_connect_point(&mut r, Some(AnchorName::LeftCenter), AnchorName::TopCenter, &registry()).unwrap();
        assert_eq!(again.id, p.id);
    }

    #[test]
    fn best_anchors_face_each_other() {
        let a = OrientedBox::axis_aligned(Point::new(0.0, 0.0), 100.0, 100.0);
        let right = OrientedBox::axis_aligned(Point::new(300.0, 0.0), 100.0, 100.0);
        let below = OrientedBox::axis_aligned(Point::new(0.0, 300.0), 100.0, 100.0);
        assert_eq!(best_anchors(&a, &right), (AnchorName::RightCenter, AnchorName::LeftCenter));
        assert_eq!(best_anchors(&right, &a), (AnchorName::LeftCenter, AnchorName::RightCenter));
        assert_eq!(best_anchors(&a, &below), (AnchorName::BottomCenter, AnchorName::TopCenter));
    }

    #[test]
    fn route_starts_and_ends_on_anchors() {
        let items = two_boxes();
        let conn = create_connect_line(&items, items[0].id, items[1].id, &ConnectOptions::default(), MARGIN, &registry()).unwrap();
        let line = conn.line.as_connect_line().unwrap();
        let first = line.points.first().unwrap().point();
        let last = line.points.last().unwrap().point();
        assert!(first.approx_eq(anchor(&items[0], AnchorName::RightCenter)));
        assert!(last.approx_eq(anchor(&items[1], AnchorName::LeftCenter)));
        assert_eq!(line.points.len(), 2);
        assert!(conn.updated_owners.is_empty());
    }

    #[test]
    fn route_avoids_frame_interiors() {
        // Target is behind the source: the route has to go around.
        let a = create_rectangle_state(300.0, 100.0);
        let b = create_rectangle_state(100.0, 100.0);
        let fa = a.oriented_box().unwrap();
        let fb = b.oriented_box().unwrap();
        let mut a2 = a.clone();
        let mut b2 = b.clone();
        let start = find_connect_point(&mut a2, Some(AnchorName::RightCenter), AnchorName::RightCenter, &registry()).unwrap();
        let end = find_connect_point(&mut b2, Some(AnchorName::LeftCenter), AnchorName::LeftCenter, &registry()).unwrap();

        let path = generate_optimal_frame_to_frame_connection(&start, &fa, &end, &fb, MARGIN);
        assert!(path[0].approx_eq(start.point()));
        assert!(path.last().unwrap().approx_eq(end.point()));
        for w in path.windows(2) {
            assert!(!segment_crosses_interior(w[0], w[1], &fa));
            assert!(!segment_crosses_interior(w[0], w[1], &fb));
            // orthogonal
            assert!((w[0].x - w[1].x).abs() < EPSILON || (w[0].y - w[1].y).abs() < EPSILON);
        }
        // leaves to the right, enters from the left
        assert!(path[1].x > path[0].x);
        let n = path.len();
        assert!(path[n - 1].x > path[n - 2].x);
    }

    #[test]
    fn simplify_merges_straight_runs_only() {
        let path = simplify_path(vec![
            Point::new(0.0, 0.0),
            Point::new(5.0, 0.0),
            Point::new(5.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
        ]);
        assert_eq!(path, vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(10.0, 10.0)]);

        // a reversal is not merged
        let back = simplify_path(vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(5.0, 0.0)]);
        assert_eq!(back.len(), 3);
    }

    #[test]
    fn manual_line_endpoint_follows_owner_delta() {
        let items = two_boxes();
        let options = ConnectOptions {
            auto_routing: false,
            ..ConnectOptions::default()
        };
        let conn = create_connect_line(&items, items[0].id, items[1].id, &options, MARGIN, &registry()).unwrap();
        let line_id = conn.line.id;
        let mut before = items.clone();
        before.push(Arc::new(conn.line));

        let mut moved = before[0].translated(10.0, 10.0);
        registry().update_connect_points(&mut moved);
        let after = replace_diagram(&before, &Arc::new(moved));

        let refreshed = refresh_connect_lines(&HashSet::from([items[0].id]), &after, &before, MARGIN, &registry());
        let old = get_diagram_by_id(&before, line_id).unwrap().as_connect_line().unwrap().points.clone();
        let new = get_diagram_by_id(&refreshed, line_id).unwrap().as_connect_line().unwrap().points.clone();
        assert!(new[0].point().approx_eq(old[0].point().offset(10.0, 10.0)));
        assert!(new.last().unwrap().point().approx_eq(old.last().unwrap().point()));
    }

    #[test]
    fn manual_line_translates_when_both_owners_move() {
        let items = two_boxes();
        let options = ConnectOptions {
            auto_routing: false,
            ..ConnectOptions::default()
        };
        let conn = create_connect_line(&items, items[0].id, items[1].id, &options, MARGIN, &registry()).unwrap();
        let line_id = conn.line.id;
        let mut before = items.clone();
        before.push(Arc::new(conn.line));

        let mut after = before.clone();
        for i in 0..2 {
            let mut d = after[i].translated(-5.0, 7.0);
            registry().update_connect_points(&mut d);
            after[i] = Arc::new(d);
        }
        let updated = HashSet::from([items[0].id, items[1].id]);
        let refreshed = refresh_connect_lines(&updated, &after, &before, MARGIN, &registry());
        let old = get_diagram_by_id(&before, line_id).unwrap();
        let new = get_diagram_by_id(&refreshed, line_id).unwrap();
        for (a, b) in old.path_points().unwrap().iter().zip(new.path_points().unwrap()) {
            assert!(b.point().approx_eq(a.point().offset(-5.0, 7.0)));
        }
        assert!((new.x - old.x - -5.0).abs() < EPSILON);
    }

    #[test]
    fn connection_index_finds_lines_by_owner() {
        let items = two_boxes();
        let conn = create_connect_line(&items, items[0].id, items[1].id, &ConnectOptions::default(), MARGIN, &registry()).unwrap();
        let line_id = conn.line.id;
        let mut all = items.clone();
        all.push(Arc::new(conn.line));

        let index = ConnectionIndex::build(&all);
        assert_eq!(index.line_count(), 1);
        assert_eq!(index.connected_line_ids([items[1].id]), HashSet::from([line_id]));
        assert_eq!(index.neighbors(items[0].id), vec![items[1].id]);
        assert!(index.connected_line_ids([line_id]).is_empty());
        assert_eq!(get_connected_diagrams(&all, items[0].id).len(), 1);
    }

    #[test]
    fn missing_owner_leaves_line_untouched() {
        let items = two_boxes();
        let conn = create_connect_line(&items, items[0].id, items[1].id, &ConnectOptions::default(), MARGIN, &registry()).unwrap();
        let line = Arc::new(conn.line);
        let only_line = vec![Arc::clone(&line)];
        let out = refresh_lines(&only_line, &HashSet::from([line.id]), &only_line, MARGIN, &registry());
        assert!(Arc::ptr_eq(&out[0], &line));
    }

    #[test]
    fn routes_use_the_registered_generator() {
        fn pushed_out(b: &OrientedBox) -> [(AnchorName, Point); 8] {
            rectangle_anchors(b).map(|(name, p)| {
                let n = anchor_normal(b, name);
                (name, p.offset(n.x * 10.0, n.y * 10.0))
            })
        }
        let mut custom = registry();
        custom.register(DiagramType::Rectangle, None, Some(pushed_out));
        let items = custom.refresh_connect_points(&two_boxes());
        let conn = create_connect_line(&items, items[0].id, items[1].id, &ConnectOptions::default(), MARGIN, &custom)
            .unwrap();
        let first = conn.line.path_points().unwrap()[0].point();
        assert!(first.approx_eq(Point::new(160.0, 100.0)));
        assert!(connect_points_are_current(&items[0], &custom));
        assert!(!connect_points_are_current(&items[0], &registry()));
    }
}
