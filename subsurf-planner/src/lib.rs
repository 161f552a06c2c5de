//! # Subdivision Resolution Planner
//!
//! Decision logic of a subdivision surface modifier: which level to
//! subdivide at, whether the work can be left to the draw code, and whether
//! a previously built subdivision descriptor can be reused.
//!
//! The crate does not own a scene. Everything an evaluation depends on
//! ([`SceneLimits`], [`EvalFlags`], [`EvalEnvironment`], the backend and the
//! enablement of the other modifiers) is passed in explicitly, mostly through
//! a [`ModifierStack`]:
//!
//! ```
//! use std::sync::Arc;
//!
//! use subsurf_mesh::Mesh;
//! use subsurf_planner::cpu::CpuBackend;
//! use subsurf_planner::{
//!     EvalEnvironment, EvalFlags, ModifierConfig, ModifierStack, SceneLimits, StackInputs,
//!     SubsurfModifier,
//! };
//!
//! let quad = Arc::new(
//!     Mesh::new(
//!         vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
//!         &[4],
//!         vec![0, 1, 2, 3],
//!     )
//!     .unwrap(),
//! );
//!
//! let mut stack = ModifierStack::new();
//! stack.push("Subdivision", SubsurfModifier::new(ModifierConfig::default()));
//!
//! let backend = CpuBackend;
//! let inputs = StackInputs {
//!     flags: EvalFlags::VIEWPORT,
//!     scene: &SceneLimits::default(),
//!     environment: &EvalEnvironment::headless(),
//!     backend: &backend,
//! };
//!
//! // Headless: nothing to defer to, the mesh is subdivided right away.
//! let result = stack.evaluate(&inputs, quad);
//! assert_eq!(result.mesh.face_count(), 4);
//! assert_eq!(result.deferred, None);
//! ```
//!
//! ## Descriptor Lifetime
//!
//! Each subdivision modifier owns a [`RuntimeCache`] with one descriptor
//! slot per [`BackendKind`]. Slot descriptors are reused while topology and
//! settings stay the same and are freed exactly once, when they go stale or
//! when the modifier is removed. See the [`cache`] module.
//!
//! ## Features
#![doc = document_features::document_features!()]

pub mod backend;
pub mod cache;
pub mod context;
#[cfg(feature = "cpu_backend")]
pub mod cpu;
pub mod custom_normals;
pub mod error;
pub mod mirror;
pub mod modifier;
pub mod resolution;
pub mod settings;
pub mod stack;
pub mod subsurf;

pub use backend::{DefaultBackend, DescriptorBuilder, MeshRealizer, UnsupportedBackend};
pub use cache::{BackendKind, DescriptorLease, RuntimeCache, WrapperSettings};
pub use context::{EvalEnvironment, EvalFlags, ModifierEvalContext};
pub use error::{Error, ModifierError, Result};
pub use mirror::MirrorModifier;
pub use modifier::{Modifier, ModifierKind, ModifierOutput, ModifierTypeInfo};
pub use settings::{
    BoundarySmooth, ModifierConfig, SceneLimits, SubdivSettings, SubdivisionType, UvSmooth,
};
pub use stack::{ModifierMode, ModifierStack, StackInputs, StackResult, StackSnapshot};
pub use subsurf::{DiagnosticNote, Evaluation, SubsurfDiagnostics, SubsurfModifier};
