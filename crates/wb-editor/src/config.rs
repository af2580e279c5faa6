//! Editor tunables.
//!
//! Everything a host may want to override lives here. The struct
//! deserializes with `#[serde(default)]`, so a partial JSON object only
//! replaces the fields it names.

use serde::{Deserialize, Serialize};
use wb_core::DataError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// Committed history entries kept for undo (oldest dropped first).
    pub history_limit: usize,
    /// Pixel delta applied to pasted diagrams on both axes.
    pub paste_offset: f64,
    /// Margin kept around children when a canvas frame grows to fit them.
    pub frame_padding: f64,
    /// Stub length routed out of and into each anchor.
    pub connect_line_margin: f64,
    /// Corner radius for `Rounded` connect lines.
    pub rounded_corner_radius: f64,
    /// Width of the auto-scroll band along each viewport edge (px).
    pub auto_scroll_edge: f64,
    /// Largest auto-scroll step per tick (px).
    pub auto_scroll_speed: f64,
    /// Velocity kept per 16ms of inertial panning.
    pub inertia_friction: f64,
    /// Inertial panning stops below this speed (px/ms).
    pub inertia_min_speed: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_limit: 100,
            paste_offset: 20.0,
            frame_padding: 20.0,
            connect_line_margin: 20.0,
            rounded_corner_radius: 10.0,
            auto_scroll_edge: 40.0,
            auto_scroll_speed: 12.0,
            inertia_friction: 0.92,
            inertia_min_speed: 0.05,
        }
    }
}

impl EditorConfig {
    /// Parse overrides from JSON; missing fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Json`] for malformed input.
    pub fn from_json(text: &str) -> Result<Self, DataError> {
        Ok(serde_json::from_str(text)?)
    }
}
