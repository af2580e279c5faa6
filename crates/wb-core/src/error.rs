//! Error types for the diagram core.
//!
//! Geometry errors are contract violations (the caller passed input the
//! kernel cannot handle). Data errors come from the clipboard/persistence
//! boundary. Model errors come from capability constructors.

use crate::id::DiagramId;

/// Invalid input handed to the geometry kernel.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("bounding box of an empty item list is undefined")]
    EmptyItems,

    #[error("inverse affine transformation with zero scale (sx={sx}, sy={sy})")]
    DegenerateScale { sx: f64, sy: f64 },
}

/// Constructor-time validation failure of a capability value.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("{field} must be finite, got {value}")]
    NonFinite { field: &'static str, value: f64 },

    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: f64 },

    /// Size lives in width/height; scale only flips an axis.
    #[error("{field} must be 1 or -1, got {value}")]
    NotAFlip { field: &'static str, value: f64 },

    #[error("invalid color `{value}`")]
    InvalidColor { value: String },
}

/// Persisted or clipboard data rejected at the boundary.
#[derive(thiserror::Error, Debug)]
pub enum DataError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("msgpack encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("msgpack decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    #[error("duplicate diagram id `{0}`")]
    DuplicateId(DiagramId),

    #[error("invalid diagram `{id}`: {source}")]
    InvalidDiagram {
        id: DiagramId,
        #[source]
        source: ModelError,
    },

    #[error("unsupported document version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
}
