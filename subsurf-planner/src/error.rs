//! Error types for the subsurf-planner crate.
//!
//! Evaluation itself never fails: a modifier that cannot do its work passes
//! the input mesh through and, where the user has to know about it, leaves
//! a [`ModifierError`] on its stack entry. [`Error`] is reserved for API
//! misuse and bad persisted data.

use thiserror::Error;

/// Main error type for subsurf-planner operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Persisted modifier settings are out of range.
    #[error("Invalid modifier configuration: {0}")]
    InvalidConfig(String),

    /// Mesh construction failed.
    #[error("Mesh error: {0}")]
    Mesh(#[from] subsurf_mesh::MeshError),

    /// A descriptor was realized with data of a different mesh.
    #[error("Descriptor expects {expected} control points, got {actual}")]
    DescriptorMismatch { expected: usize, actual: usize },

    /// There is no modifier of that name in the stack.
    #[error("No modifier named `{0}` in the stack")]
    ModifierNotFound(String),

    /// Settings could not be parsed.
    #[cfg(feature = "serde")]
    #[error("Failed to parse settings: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// Result type alias using our Error type.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A persistent, user visible message attached to a modifier.
///
/// The stack clears it at the start of every evaluation, so it only ever
/// describes the latest pass.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ModifierError {
    /// No subdivision backend is available in this build.
    #[error("Disabled, built without subdivision support")]
    Unsupported,

    /// The modifier produced geometry it could not assemble into a mesh.
    #[error("Failed to build result mesh: {0}")]
    InvalidResult(String),
}

impl From<subsurf_mesh::MeshError> for ModifierError {
    fn from(error: subsurf_mesh::MeshError) -> Self {
        ModifierError::InvalidResult(error.to_string())
    }
}

impl From<Error> for ModifierError {
    fn from(error: Error) -> Self {
        ModifierError::InvalidResult(error.to_string())
    }
}
