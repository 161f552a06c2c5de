//! Error types for the subsurf-mesh crate.

use thiserror::Error;

/// Error raised while building or editing a [`Mesh`](crate::Mesh).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MeshError {
    /// The face/corner description is inconsistent.
    #[error("Invalid topology: {0}")]
    InvalidTopology(String),

    /// A vertex index points past the vertex array.
    #[error("Index {index} out of bounds (max: {max})")]
    IndexOutOfBounds { index: usize, max: usize },

    /// A per-corner layer does not have one entry per corner.
    #[error("Layer `{name}` has {actual} entries, expected {expected}")]
    LayerLength {
        name: String,
        expected: usize,
        actual: usize,
    },
}

/// Result type alias using [`MeshError`].
pub type Result<T, E = MeshError> = std::result::Result<T, E>;
