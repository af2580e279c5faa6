//! Continuous viewport effects: edge auto-scroll and inertial panning.
//!
//! Both are driven by the host's animation loop. Nothing here owns a timer;
//! callers pass in `Instant`s so the math stays deterministic under test.

use std::time::Instant;
use wb_core::{Point, Viewport};

/// Reference frame length for friction, in milliseconds.
const FRAME_MS: f64 = 16.0;

/// Longest step accepted in one tick, so a stalled loop does not jump.
const MAX_STEP_MS: f64 = 64.0;

/// Per-tick pan (screen px) when the cursor sits inside the edge band.
///
/// The step grows linearly from 0 at the inner edge of the band to `speed`
/// at the viewport border. Outside the band the result is zero.
pub fn auto_scroll_delta(cursor: Point, view_width: f64, view_height: f64, edge: f64, speed: f64) -> Point {
    Point::new(
        axis_scroll(cursor.x, view_width, edge, speed),
        axis_scroll(cursor.y, view_height, edge, speed),
    )
}

fn axis_scroll(pos: f64, extent: f64, edge: f64, speed: f64) -> f64 {
    if edge <= 0.0 || extent <= 0.0 {
        return 0.0;
    }
    let near = edge - pos;
    let far = pos - (extent - edge);
    if near > 0.0 {
        -speed * (near / edge).min(1.0)
    } else if far > 0.0 {
        speed * (far / edge).min(1.0)
    } else {
        0.0
    }
}

/// Shift the viewport by a screen-space delta.
#[must_use]
pub fn pan_viewport(viewport: &Viewport, dx: f64, dy: f64) -> Viewport {
    Viewport {
        min_x: viewport.min_x + dx / viewport.zoom,
        min_y: viewport.min_y + dy / viewport.zoom,
        zoom: viewport.zoom,
    }
}

/// Decelerating pan after a grab-scroll release.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InertialPan {
    /// Screen px per millisecond.
    velocity: Point,
    last: Instant,
    friction: f64,
    min_speed: f64,
}

impl InertialPan {
    pub fn new(velocity: Point, now: Instant, friction: f64, min_speed: f64) -> Self {
        Self {
            velocity,
            last: now,
            friction: friction.clamp(0.0, 1.0),
            min_speed,
        }
    }

    pub fn velocity(&self) -> Point {
        self.velocity
    }

    pub fn is_finished(&self) -> bool {
        self.velocity.x.hypot(self.velocity.y) < self.min_speed
    }

    /// Advance to `now`; returns the screen delta to pan by, or `None` once
    /// the motion has died out.
    pub fn step(&mut self, now: Instant) -> Option<Point> {
        if self.is_finished() {
            return None;
        }
        let dt = now
            .saturating_duration_since(self.last)
            .as_secs_f64()
            .min(MAX_STEP_MS / 1000.0)
            * 1000.0;
        self.last = now;
        if dt <= 0.0 {
            return Some(Point::new(0.0, 0.0));
        }
        let delta = Point::new(self.velocity.x * dt, self.velocity.y * dt);
        let decay = self.friction.powf(dt / FRAME_MS);
        self.velocity = Point::new(self.velocity.x * decay, self.velocity.y * decay);
        Some(delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    #[test]
    fn no_scroll_away_from_edges() {
        assert_eq!(
            auto_scroll_delta(Point::new(400.0, 300.0), 800.0, 600.0, 40.0, 12.0),
            Point::new(0.0, 0.0)
        );
    }

    #[test]
    fn scroll_grows_toward_the_border() {
        let half = auto_scroll_delta(Point::new(20.0, 300.0), 800.0, 600.0, 40.0, 12.0);
        assert_eq!(half, Point::new(-6.0, 0.0));
        let full = auto_scroll_delta(Point::new(810.0, 600.0), 800.0, 600.0, 40.0, 12.0);
        assert_eq!(full, Point::new(12.0, 12.0));
    }

    #[test]
    fn pan_respects_zoom() {
        let vp = Viewport { min_x: 0.0, min_y: 0.0, zoom: 2.0 };
        let moved = pan_viewport(&vp, 10.0, -20.0);
        assert_eq!((moved.min_x, moved.min_y), (5.0, -10.0));
    }

    #[test]
    fn inertia_decays_and_stops() {
        let t0 = Instant::now();
        let mut pan = InertialPan::new(Point::new(1.0, 0.0), t0, 0.5, 0.05);
        let first = pan.step(t0 + Duration::from_millis(16)).unwrap();
        assert!((first.x - 16.0).abs() < 1e-9);
        assert!((pan.velocity().x - 0.5).abs() < 1e-9);

        let mut t = t0 + Duration::from_millis(16);
        let mut steps = 0;
        while pan.step(t).is_some() {
            t += Duration::from_millis(16);
            steps += 1;
            assert!(steps < 100, "inertia never settled");
        }
        assert!(pan.is_finished());
    }
}
