//! Subdivision backend interface.
//!
//! The planner never subdivides anything itself. It talks to two
//! collaborators:
//! * A [`DescriptorBuilder`] turns a mesh plus [`SubdivSettings`] into an
//!   opaque descriptor (the expensive, topology dependent part).
//! * A [`MeshRealizer`] turns a descriptor plus the current vertex positions
//!   into geometry (the cheap part, repeated whenever vertices move).
//!
//! [`UnsupportedBackend`] stands in when no backend was compiled in.
use std::convert::Infallible;

use subsurf_mesh::{Float3, Mesh};

use crate::settings::{SubdivSettings, ToCcgSettings, ToMeshSettings};
use crate::Result;

/// Builds and frees subdivision descriptors.
pub trait DescriptorBuilder {
    /// Opaque precomputed subdivision data.
    type Descriptor;

    /// Returns `false` if this backend cannot subdivide at all.
    fn is_supported(&self) -> bool {
        true
    }

    /// Builds a descriptor. `None` signals unusable topology, e.g. an empty
    /// mesh.
    fn build(&self, mesh: &Mesh, settings: &SubdivSettings) -> Option<Self::Descriptor>;

    /// Returns `true` if `descriptor` was built from the same topology and
    /// settings and can be used for `mesh` as is.
    fn is_reusable(&self, descriptor: &Self::Descriptor, mesh: &Mesh, settings: &SubdivSettings)
        -> bool;

    /// Releases a descriptor.
    fn free(&self, descriptor: Self::Descriptor) {
        drop(descriptor);
    }
}

/// Produces geometry from a descriptor.
pub trait MeshRealizer: DescriptorBuilder {
    /// Realizes a flat subdivided mesh.
    fn to_mesh(
        &self,
        descriptor: &Self::Descriptor,
        settings: &ToMeshSettings,
        base: &Mesh,
    ) -> Result<Mesh>;

    /// Realizes a grid based subdivided mesh.
    fn to_ccg(
        &self,
        descriptor: &Self::Descriptor,
        settings: &ToCcgSettings,
        base: &Mesh,
    ) -> Result<Mesh>;

    /// Moves the coarse vertices onto the limit surface.
    fn deform_coarse_vertices(
        &self,
        descriptor: &Self::Descriptor,
        base: &Mesh,
        positions: &mut [Float3],
    );
}

/// Backend used when subdivision support is not compiled in.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnsupportedBackend;

impl DescriptorBuilder for UnsupportedBackend {
    type Descriptor = Infallible;

    fn is_supported(&self) -> bool {
        false
    }

    fn build(&self, _mesh: &Mesh, _settings: &SubdivSettings) -> Option<Infallible> {
        None
    }

    fn is_reusable(
        &self,
        descriptor: &Infallible,
        _mesh: &Mesh,
        _settings: &SubdivSettings,
    ) -> bool {
        match *descriptor {}
    }
}

impl MeshRealizer for UnsupportedBackend {
    fn to_mesh(
        &self,
        descriptor: &Infallible,
        _settings: &ToMeshSettings,
        _base: &Mesh,
    ) -> Result<Mesh> {
        match *descriptor {}
    }

    fn to_ccg(
        &self,
        descriptor: &Infallible,
        _settings: &ToCcgSettings,
        _base: &Mesh,
    ) -> Result<Mesh> {
        match *descriptor {}
    }

    fn deform_coarse_vertices(
        &self,
        descriptor: &Infallible,
        _base: &Mesh,
        _positions: &mut [Float3],
    ) {
        match *descriptor {}
    }
}

/// The backend this build ships with.
#[cfg(feature = "cpu_backend")]
pub type DefaultBackend = crate::cpu::CpuBackend;

/// The backend this build ships with.
#[cfg(not(feature = "cpu_backend"))]
pub type DefaultBackend = UnsupportedBackend;
