//! Connector path synthesis.
//!
//! Routing produces an ordered point list; this module turns that list into
//! drawing commands for the selected `PathType`. Every algorithm consumes
//! the same points, so routing and rendering stay independent.

use crate::geometry::Point;
use crate::model::PathType;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// A path drawing command in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PathCmd {
    MoveTo(f64, f64),
    LineTo(f64, f64),
    QuadTo(f64, f64, f64, f64), // control, end
    Close,
}

fn midpoint(a: Point, b: Point) -> Point {
    Point::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
}

/// Build drawing commands for `points`.
///
/// `corner_radius` only matters for `PathType::Rounded`; each corner's
/// radius is clamped to half the shorter adjacent segment.
pub fn build_path(points: &[Point], path_type: PathType, corner_radius: f64) -> Vec<PathCmd> {
    let Some((&first, rest)) = points.split_first() else {
        return Vec::new();
    };
    let mut cmds = vec![PathCmd::MoveTo(first.x, first.y)];
    let Some(&last) = rest.last() else {
        return cmds;
    };

    match path_type {
        PathType::Straight => cmds.push(PathCmd::LineTo(last.x, last.y)),
        PathType::Polyline => cmds.extend(rest.iter().map(|p| PathCmd::LineTo(p.x, p.y))),
        PathType::Curve => {
            // Quadratic segments through the midpoints, using each interior
            // vertex as the control point.
            for pair in points[1..].windows(2) {
                let end = midpoint(pair[0], pair[1]);
                cmds.push(PathCmd::QuadTo(pair[0].x, pair[0].y, end.x, end.y));
            }
            cmds.push(PathCmd::LineTo(last.x, last.y));
        }
        PathType::Rounded => {
            for w in points.windows(3) {
                let (prev, corner, next) = (w[0], w[1], w[2]);
                let len_in = prev.distance(corner);
                let len_out = corner.distance(next);
                let r = corner_radius.min(len_in / 2.0).min(len_out / 2.0);
                if r <= 0.0 || len_in == 0.0 || len_out == 0.0 {
                    cmds.push(PathCmd::LineTo(corner.x, corner.y));
                    continue;
                }
                let a = Point::new(
                    corner.x - (corner.x - prev.x) / len_in * r,
                    corner.y - (corner.y - prev.y) / len_in * r,
                );
                let b = Point::new(
                    corner.x + (next.x - corner.x) / len_out * r,
                    corner.y + (next.y - corner.y) / len_out * r,
                );
                cmds.push(PathCmd::LineTo(a.x, a.y));
                cmds.push(PathCmd::QuadTo(corner.x, corner.y, b.x, b.y));
            }
            cmds.push(PathCmd::LineTo(last.x, last.y));
        }
    }
    cmds
}

/// Serialize commands as an SVG `d` attribute.
pub fn path_to_svg_d(cmds: &[PathCmd]) -> String {
    let mut d = String::new();
    for cmd in cmds {
        if !d.is_empty() {
            d.push(' ');
        }
        // Writing into a String cannot fail.
        let _ = match cmd {
            PathCmd::MoveTo(x, y) => write!(d, "M {x} {y}"),
            PathCmd::LineTo(x, y) => write!(d, "L {x} {y}"),
            PathCmd::QuadTo(cx, cy, x, y) => write!(d, "Q {cx} {cy} {x} {y}"),
            PathCmd::Close => write!(d, "Z"),
        };
    }
    d
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn zigzag() -> Vec<Point> {
        vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0), Point::new(100.0, 50.0)]
    }

    #[test]
    fn straight_uses_endpoints_only() {
        let d = path_to_svg_d(&build_path(&zigzag(), PathType::Straight, 10.0));
        assert_eq!(d, "M 0 0 L 100 50");
    }

    #[test]
    fn polyline_visits_every_point() {
        let d = path_to_svg_d(&build_path(&zigzag(), PathType::Polyline, 10.0));
        assert_eq!(d, "M 0 0 L 100 0 L 100 50");
    }

    #[test]
    fn curve_uses_interior_points_as_controls() {
        let cmds = build_path(&zigzag(), PathType::Curve, 10.0);
        assert_eq!(
            cmds,
            vec![
                PathCmd::MoveTo(0.0, 0.0),
                PathCmd::QuadTo(100.0, 0.0, 100.0, 25.0),
                PathCmd::LineTo(100.0, 50.0),
            ]
        );
    }

    #[test]
    fn rounded_corners_are_clamped() {
        let cmds = build_path(&zigzag(), PathType::Rounded, 10.0);
        assert_eq!(
            cmds,
            vec![
                PathCmd::MoveTo(0.0, 0.0),
                PathCmd::LineTo(90.0, 0.0),
                PathCmd::QuadTo(100.0, 0.0, 100.0, 10.0),
                PathCmd::LineTo(100.0, 50.0),
            ]
        );

        let short = vec![Point::new(0.0, 0.0), Point::new(4.0, 0.0), Point::new(4.0, 100.0)];
        let cmds = build_path(&short, PathType::Rounded, 10.0);
        assert_eq!(cmds[1], PathCmd::LineTo(2.0, 0.0));
    }

    #[test]
    fn degenerate_inputs() {
        assert!(build_path(&[], PathType::Polyline, 0.0).is_empty());
        assert_eq!(
            build_path(&[Point::new(1.0, 2.0)], PathType::Curve, 0.0),
            vec![PathCmd::MoveTo(1.0, 2.0)]
        );
        assert_eq!(path_to_svg_d(&[PathCmd::MoveTo(0.0, 0.0), PathCmd::Close]), "M 0 0 Z");
    }
}
