//! The mirror modifier.
use std::sync::Arc;

use subsurf_mesh::{EdgeCrease, Float3, Mesh};

use crate::backend::MeshRealizer;
use crate::context::ModifierEvalContext;
use crate::modifier::{Modifier, ModifierClass, ModifierOutput, ModifierTypeInfo};
use crate::settings::SceneLimits;

const TYPE_INFO: ModifierTypeInfo = ModifierTypeInfo {
    name: "Mirror",
    class: ModifierClass::Constructive,
    accepts_mesh: true,
    supports_mapping: true,
    supports_edit_mode: true,
    enable_in_edit_mode: true,
    deforms_matrices: false,
};

/// Duplicates the mesh mirrored across the X, Y and/or Z plane of its local
/// space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MirrorModifier {
    /// Mirror across the X, Y, Z axis, applied in that order.
    pub axes: [bool; 3],
}

impl Default for MirrorModifier {
    fn default() -> Self {
        Self {
            axes: [true, false, false],
        }
    }
}

impl MirrorModifier {
    pub fn new(axes: [bool; 3]) -> Self {
        Self { axes }
    }

    pub fn type_info(&self) -> &'static ModifierTypeInfo {
        &TYPE_INFO
    }

    pub fn is_disabled(&self, _scene: &SceneLimits, _use_render_params: bool) -> bool {
        false
    }

    /// Applies all enabled axes to `mesh`.
    pub fn apply(&self, mesh: &Mesh) -> subsurf_mesh::Result<Option<Mesh>> {
        let mut result: Option<Mesh> = None;
        for axis in (0..3).filter(|&axis| self.axes[axis]) {
            let mirrored = mirror_on_axis(result.as_ref().unwrap_or(mesh), axis)?;
            result = Some(mirrored);
        }
        Ok(result)
    }
}

/// Corner of the source face the `corner`-th corner of its mirrored copy
/// comes from. Mirroring flips winding, so all but the first corner reverse.
#[inline]
fn mirrored_corner(start: usize, size: usize, corner: usize) -> usize {
    start + (size - corner) % size
}

fn mirror_vector(mut v: Float3, axis: usize) -> Float3 {
    v[axis] = -v[axis];
    v
}

/// Returns `mesh` plus a copy mirrored across `axis`.
pub fn mirror_on_axis(mesh: &Mesh, axis: usize) -> subsurf_mesh::Result<Mesh> {
    let vertex_count = mesh.vertex_count() as u32;

    let mut positions = mesh.positions().to_vec();
    positions.extend(mesh.positions().iter().map(|&p| mirror_vector(p, axis)));

    let offsets = mesh.face_offsets();
    let corner_count = mesh.corner_count() as u32;
    let mut face_offsets = offsets.to_vec();
    face_offsets.extend(offsets[1..].iter().map(|&offset| offset + corner_count));

    // Source corner of every corner in the result.
    let mut corner_map: Vec<usize> = (0..mesh.corner_count()).collect();
    for face in 0..mesh.face_count() {
        let corners = mesh.face_corners(face);
        let size = corners.len();
        corner_map.extend((0..size).map(|corner| mirrored_corner(corners.start, size, corner)));
    }

    let source_verts = mesh.corner_verts();
    let corner_verts = corner_map
        .iter()
        .enumerate()
        .map(|(corner, &source)| {
            let v = source_verts[source];
            if corner < mesh.corner_count() {
                v
            } else {
                v + vertex_count
            }
        })
        .collect();

    let mut result = Mesh::from_offsets(positions, face_offsets, corner_verts)?;

    let creases = mesh
        .creases()
        .iter()
        .copied()
        .chain(mesh.creases().iter().map(|crease| {
            EdgeCrease::new(
                crease.edge[0] + vertex_count,
                crease.edge[1] + vertex_count,
                crease.crease,
            )
        }))
        .collect();
    result.set_creases(creases)?;

    let sharp_edges: Vec<[u32; 2]> = mesh
        .sharp_edges()
        .iter()
        .copied()
        .chain(
            mesh.sharp_edges()
                .iter()
                .map(|edge| [edge[0] + vertex_count, edge[1] + vertex_count]),
        )
        .collect();
    result.set_sharp_edges(&sharp_edges)?;

    for (name, data) in mesh.corner_layers() {
        let layer = corner_map.iter().map(|&source| data[source]).collect();
        result.add_corner_layer(name, layer)?;
    }

    if let Some(normals) = mesh.custom_normals() {
        let mirrored = corner_map
            .iter()
            .enumerate()
            .map(|(corner, &source)| {
                if corner < mesh.corner_count() {
                    normals[source]
                } else {
                    mirror_vector(normals[source], axis)
                }
            })
            .collect();
        result.set_custom_normals(mirrored)?;
    }

    result.set_edit_mode(mesh.is_edit_mode());
    Ok(result)
}

impl<B: MeshRealizer> Modifier<B> for MirrorModifier {
    fn type_info(&self) -> &'static ModifierTypeInfo {
        &TYPE_INFO
    }

    fn modify_mesh(
        &mut self,
        _ctx: &ModifierEvalContext<'_,
        B>,
        mesh: Arc<Mesh>,
    ) -> ModifierOutput {
        match self.apply(&mesh) {
            Ok(Some(result)) => ModifierOutput::pass_through(Arc::new(result)),
            Ok(None) => ModifierOutput::pass_through(mesh),
            Err(error) => ModifierOutput {
                mesh,
                deferred: false,
                error: Some(error.into()),
            },
        }
    }
}
