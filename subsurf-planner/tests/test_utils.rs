//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::sync::Arc;

use approx::assert_abs_diff_eq;
use subsurf_mesh::{Float3, Mesh};
use subsurf_planner::cpu::{CpuBackend, CpuDescriptor};
use subsurf_planner::settings::{SubdivSettings, ToCcgSettings, ToMeshSettings};
use subsurf_planner::{DescriptorBuilder, MeshRealizer, Result};

/// Installs a test logger; `RUST_LOG=debug` shows the planner's decisions.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Unit cube centered at the origin.
pub fn cube() -> Mesh {
    let positions = vec![
        [-0.5, -0.5, -0.5], // 0
        [0.5, -0.5, -0.5],  // 1
        [-0.5, 0.5, -0.5],  // 2
        [0.5, 0.5, -0.5],   // 3
        [-0.5, 0.5, 0.5],   // 4
        [0.5, 0.5, 0.5],    // 5
        [-0.5, -0.5, 0.5],  // 6
        [0.5, -0.5, 0.5],   // 7
    ];
    let corner_verts = vec![
        0, 1, 3, 2, // back
        2, 3, 5, 4, // top
        4, 5, 7, 6, // front
        6, 7, 1, 0, // bottom
        0, 2, 4, 6, // left
        1, 7, 5, 3, // right
    ];
    Mesh::new(positions, &[4; 6], corner_verts).unwrap()
}

/// A single unit quad in the XY plane.
pub fn quad() -> Mesh {
    Mesh::new(
        vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
        ],
        &[4],
        vec![0, 1, 2, 3],
    )
    .unwrap()
}

pub fn arc(mesh: Mesh) -> Arc<Mesh> {
    Arc::new(mesh)
}

pub fn assert_point_eq(actual: Float3, expected: Float3) {
    for axis in 0..3 {
        assert_abs_diff_eq!(actual[axis], expected[axis], epsilon = 1.0e-5);
    }
}

pub fn assert_unit_length(v: Float3) {
    let length = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    assert_abs_diff_eq!(length, 1.0, epsilon = 1.0e-5);
}

/// A [`CpuDescriptor`] tagged with the build it came from.
#[derive(Debug)]
pub struct Tracked {
    pub id: usize,
    pub descriptor: CpuDescriptor,
}

/// [`CpuBackend`] that records every build and free.
#[derive(Debug, Default)]
pub struct CountingBackend {
    inner: CpuBackend,
    built: Cell<usize>,
    freed: RefCell<Vec<usize>>,
}

impl CountingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of descriptors built so far.
    pub fn built(&self) -> usize {
        self.built.get()
    }

    /// Ids of freed descriptors, in order.
    pub fn freed(&self) -> Vec<usize> {
        self.freed.borrow().clone()
    }

    /// Descriptors built and not freed yet.
    pub fn live(&self) -> usize {
        self.built() - self.freed.borrow().len()
    }

    /// Returns `true` if no descriptor was freed twice.
    pub fn freed_at_most_once(&self) -> bool {
        let mut ids = self.freed();
        let len = ids.len();
        ids.sort_unstable();
        ids.dedup();
        ids.len() == len
    }
}

impl DescriptorBuilder for CountingBackend {
    type Descriptor = Tracked;

    fn build(&self, mesh: &Mesh, settings: &SubdivSettings) -> Option<Tracked> {
        let descriptor = self.inner.build(mesh, settings)?;
        let id = self.built.get();
        self.built.set(id + 1);
        Some(Tracked { id, descriptor })
    }

    fn is_reusable(&self, tracked: &Tracked, mesh: &Mesh, settings: &SubdivSettings) -> bool {
        self.inner.is_reusable(&tracked.descriptor, mesh, settings)
    }

    fn free(&self, tracked: Tracked) {
        self.freed.borrow_mut().push(tracked.id);
    }
}

impl MeshRealizer for CountingBackend {
    fn to_mesh(&self, tracked: &Tracked, settings: &ToMeshSettings, base: &Mesh) -> Result<Mesh> {
        self.inner.to_mesh(&tracked.descriptor, settings, base)
    }

    fn to_ccg(&self, tracked: &Tracked, settings: &ToCcgSettings, base: &Mesh) -> Result<Mesh> {
        self.inner.to_ccg(&tracked.descriptor, settings, base)
    }

    fn deform_coarse_vertices(&self, tracked: &Tracked, base: &Mesh, positions: &mut [Float3]) {
        self.inner
            .deform_coarse_vertices(&tracked.descriptor, base, positions)
    }
}
