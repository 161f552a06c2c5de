//! Built-in CPU subdivision backend.
//!
//! A [`CpuDescriptor`] stores the result of uniformly refining the coarse
//! topology as [`StencilTable`]s. Realizing the descriptor for new vertex
//! positions only evaluates the stencils, so meshes that deform without
//! changing topology reuse the descriptor.
//!
//! ```
//! use subsurf_mesh::Mesh;
//! use subsurf_planner::backend::{DescriptorBuilder, MeshRealizer};
//! use subsurf_planner::cpu::CpuBackend;
//! use subsurf_planner::settings::{SubdivSettings, ToMeshSettings};
//! use subsurf_planner::ModifierConfig;
//!
//! let quad = Mesh::new(
//!     vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
//!     &[4],
//!     vec![0, 1, 2, 3],
//! )
//! .unwrap();
//!
//! let backend = CpuBackend;
//! let settings = SubdivSettings::new(&ModifierConfig::default(), 2);
//! let descriptor = backend.build(&quad, &settings).unwrap();
//!
//! let result = backend
//!     .to_mesh(
//!         &descriptor,
//!         &ToMeshSettings { resolution: 5, use_optimal_display: false },
//!         &quad,
//!     )
//!     .unwrap();
//! assert_eq!(result.face_count(), 16);
//! ```
use log::{debug, warn};
use subsurf_mesh::{EdgeCrease, Float3, GridLayout, Mesh};

use crate::backend::{DescriptorBuilder, MeshRealizer};
use crate::resolution::resolution_from_level;
use crate::settings::{SubdivSettings, ToCcgSettings, ToMeshSettings};
use crate::{Error, Result};

mod refine;
pub mod stencil_table;

use refine::Level;
pub use stencil_table::{Stencil, StencilTable};

/// Subdivision descriptor of the [`CpuBackend`].
#[derive(Clone, Debug)]
pub struct CpuDescriptor {
    settings: SubdivSettings,
    base_vertex_count: usize,
    base_face_offsets: Vec<u32>,
    base_corner_verts: Vec<u32>,
    base_creases: Vec<EdgeCrease>,
    vertex_stencils: StencilTable,
    corner_stencils: StencilTable,
    limit_stencils: StencilTable,
    face_offsets: Vec<u32>,
    corner_verts: Vec<u32>,
    control_edges: Vec<[u32; 2]>,
}

impl CpuDescriptor {
    #[inline]
    pub fn settings(&self) -> &SubdivSettings {
        &self.settings
    }

    /// Number of refinement steps baked into the descriptor.
    #[inline]
    pub fn level(&self) -> u32 {
        self.settings.level
    }

    /// Stencils of the refined vertices over the coarse vertices.
    #[inline]
    pub fn vertex_stencils(&self) -> &StencilTable {
        &self.vertex_stencils
    }

    /// Stencils of the refined corners over the coarse corners.
    #[inline]
    pub fn corner_stencils(&self) -> &StencilTable {
        &self.corner_stencils
    }

    /// Limit positions of the coarse vertices.
    #[inline]
    pub fn limit_stencils(&self) -> &StencilTable {
        &self.limit_stencils
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertex_stencils.len()
    }

    #[inline]
    pub fn face_count(&self) -> usize {
        self.face_offsets.len() - 1
    }

    /// Refined edges lying on an edge of the coarse cage.
    #[inline]
    pub fn control_edges(&self) -> &[[u32; 2]] {
        &self.control_edges
    }

    fn check_controls(&self, table: &StencilTable, actual: usize) -> Result<()> {
        if table.control_vertex_count() == actual {
            Ok(())
        } else {
            Err(Error::DescriptorMismatch {
                expected: table.control_vertex_count(),
                actual,
            })
        }
    }
}

/// Uniform Catmull-Clark and simple subdivision on the CPU.
#[derive(Clone, Copy, Debug, Default)]
pub struct CpuBackend;

impl DescriptorBuilder for CpuBackend {
    type Descriptor = CpuDescriptor;

    fn build(&self, mesh: &Mesh, settings: &SubdivSettings) -> Option<CpuDescriptor> {
        let Some(mut level) = Level::base(mesh, settings) else {
            debug!("topology cannot be subdivided");
            return None;
        };
        for _ in 0..settings.level {
            level = level.refine(settings);
        }
        debug!(
            "refined to level {}: {} vertices, {} faces",
            settings.level,
            level.vertex_count,
            level.face_count()
        );

        let limit_rows = level.limit_rows(settings);
        let vertex_stencils = if settings.use_limit_surface {
            StencilTable::from_rows(&limit_rows, mesh.vertex_count())
        } else {
            StencilTable::from_rows(&level.vertex_rows, mesh.vertex_count())
        };
        // Coarse vertices keep their index on every level.
        let limit_stencils =
            StencilTable::from_rows(&limit_rows[..mesh.vertex_count()], mesh.vertex_count());
        let corner_stencils = StencilTable::from_rows(&level.corner_rows, mesh.corner_count());

        let control_edges = level
            .edges
            .iter()
            .zip(&level.edge_original)
            .filter_map(|(&edge, &original)| original.then_some(edge))
            .collect();

        Some(CpuDescriptor {
            settings: *settings,
            base_vertex_count: mesh.vertex_count(),
            base_face_offsets: mesh.face_offsets().to_vec(),
            base_corner_verts: mesh.corner_verts().to_vec(),
            base_creases: mesh.creases().to_vec(),
            vertex_stencils,
            corner_stencils,
            limit_stencils,
            face_offsets: level.face_offsets,
            corner_verts: level.corner_verts,
            control_edges,
        })
    }

    fn is_reusable(
        &self,
        descriptor: &CpuDescriptor,
        mesh: &Mesh,
        settings: &SubdivSettings,
    ) -> bool {
        descriptor.settings == *settings
            && descriptor.base_vertex_count == mesh.vertex_count()
            && descriptor.base_face_offsets == mesh.face_offsets()
            && descriptor.base_corner_verts == mesh.corner_verts()
            && (!settings.use_creases || descriptor.base_creases == mesh.creases())
    }
}

impl MeshRealizer for CpuBackend {
    fn to_mesh(
        &self,
        descriptor: &CpuDescriptor,
        settings: &ToMeshSettings,
        base: &Mesh,
    ) -> Result<Mesh> {
        if settings.resolution != resolution_from_level(descriptor.level()) {
            debug!(
                "resolution {} does not match descriptor level {}",
                settings.resolution,
                descriptor.level()
            );
        }

        descriptor.check_controls(&descriptor.vertex_stencils, base.vertex_count())?;
        let positions = descriptor
            .vertex_stencils
            .evaluate(base.positions())
            .unwrap_or_default();

        let mut mesh = Mesh::from_offsets(
            positions,
            descriptor.face_offsets.clone(),
            descriptor.corner_verts.clone(),
        )?;

        descriptor.check_controls(&descriptor.corner_stencils, base.corner_count())?;
        for (name, data) in base.corner_layers() {
            if let Some(layer) = descriptor.corner_stencils.evaluate(data) {
                mesh.add_corner_layer(name, layer)?;
            }
        }

        if settings.use_optimal_display {
            mesh.set_display_edges(Some(descriptor.control_edges.clone()));
        }
        mesh.set_edit_mode(base.is_edit_mode());
        Ok(mesh)
    }

    fn to_ccg(
        &self,
        descriptor: &CpuDescriptor,
        settings: &ToCcgSettings,
        base: &Mesh,
    ) -> Result<Mesh> {
        let mut mesh = self.to_mesh(
            descriptor,
            &ToMeshSettings {
                resolution: settings.resolution,
                use_optimal_display: false,
            },
            base,
        )?;

        let grid_size = resolution_from_level(descriptor.level().saturating_sub(1));
        let vertex_normals = settings.need_normal.then(|| mesh.vertex_normals());
        mesh.set_grids(Some(GridLayout {
            grid_size,
            grid_count: base.corner_count(),
            vertex_normals,
        }));
        Ok(mesh)
    }

    fn deform_coarse_vertices(
        &self,
        descriptor: &CpuDescriptor,
        _base: &Mesh,
        positions: &mut [Float3],
    ) {
        match descriptor.limit_stencils.evaluate(positions) {
            Some(limit) => positions.copy_from_slice(&limit),
            None => warn!(
                "cannot deform {} vertices with a descriptor for {}",
                positions.len(),
                descriptor.limit_stencils.control_vertex_count()
            ),
        }
    }
}
