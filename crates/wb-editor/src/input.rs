//! Unified pointer input.
//!
//! Hosts convert mouse, touch and pen events into [`InputEvent`]s in canvas
//! coordinates (`Viewport::screen_to_canvas`) before handing them to a tool.

use wb_core::Point;

/// Modifier keys held during a pointer event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub alt: bool,
    pub ctrl: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        alt: false,
        ctrl: false,
        meta: false,
    };

    pub const SHIFT: Modifiers = Modifiers {
        shift: true,
        ..Modifiers::NONE
    };
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerDown { x: f64, y: f64, modifiers: Modifiers },
    PointerMove { x: f64, y: f64, modifiers: Modifiers },
    PointerUp { x: f64, y: f64, modifiers: Modifiers },
    /// Pointer capture lost or the drag was aborted.
    Cancel,
}

impl InputEvent {
    pub fn down(x: f64, y: f64) -> Self {
        Self::PointerDown { x, y, modifiers: Modifiers::NONE }
    }

    pub fn moved(x: f64, y: f64) -> Self {
        Self::PointerMove { x, y, modifiers: Modifiers::NONE }
    }

    pub fn up(x: f64, y: f64) -> Self {
        Self::PointerUp { x, y, modifiers: Modifiers::NONE }
    }

    /// Position if this is a pointer event.
    pub fn position(&self) -> Option<Point> {
        match self {
            Self::PointerDown { x, y, .. } | Self::PointerMove { x, y, .. } | Self::PointerUp { x, y, .. } => {
                Some(Point::new(*x, *y))
            }
            Self::Cancel => None,
        }
    }

    pub fn modifiers(&self) -> Modifiers {
        match self {
            Self::PointerDown { modifiers, .. }
            | Self::PointerMove { modifiers, .. }
            | Self::PointerUp { modifiers, .. } => *modifiers,
            Self::Cancel => Modifiers::NONE,
        }
    }
}
