//! Normal computation.
//!
//! Face normals use Newell's method so non-planar and concave polygons get a
//! stable result. Vertex normals are the area weighted average of the
//! adjacent face normals.
use std::collections::HashSet;

use ultraviolet::Vec3;

use crate::{edge_key, Float3, Mesh};

static EPSILON: f32 = 1.0e-12;

#[inline]
fn vec3(p: Float3) -> Vec3 {
    Vec3::new(p[0], p[1], p[2])
}

#[inline]
fn float3(v: Vec3) -> Float3 {
    [v.x, v.y, v.z]
}

/// Normalizes `n`, returning `fallback` for (near) zero length vectors.
#[inline]
pub fn normalize_or(n: Float3, fallback: Float3) -> Float3 {
    let v = vec3(n);
    let mag_sq = v.mag_sq();
    if mag_sq < EPSILON {
        fallback
    } else {
        float3(v / mag_sq.sqrt())
    }
}

/// Unnormalized Newell normal; its length is twice the polygon area.
fn newell(mesh: &Mesh, face: &[u32]) -> Vec3 {
    let positions = mesh.positions();
    (0..face.len()).fold(Vec3::zero(), |n, i| {
        let a = vec3(positions[face[i] as usize]);
        let b = vec3(positions[face[(i + 1) % face.len()] as usize]);
        n + Vec3::new(
            (a.y - b.y) * (a.z + b.z),
            (a.z - b.z) * (a.x + b.x),
            (a.x - b.x) * (a.y + b.y),
        )
    })
}

/// Returns one unit normal per face. Degenerate faces get `+Z`.
pub fn face_normals(mesh: &Mesh) -> Vec<Float3> {
    mesh.faces()
        .map(|face| normalize_or(float3(newell(mesh, face)), [0.0, 0.0, 1.0]))
        .collect()
}

/// Returns one unit normal per vertex. Loose vertices get `+Z`.
pub fn vertex_normals(mesh: &Mesh) -> Vec<Float3> {
    let mut sums = vec![Vec3::zero(); mesh.vertex_count()];
    for face in mesh.faces() {
        let n = newell(mesh, face);
        for &v in face {
            sums[v as usize] += n;
        }
    }
    sums.into_iter()
        .map(|n| normalize_or(float3(n), [0.0, 0.0, 1.0]))
        .collect()
}

/// Computes per corner normals without custom normals.
///
/// Corners touching a sharp edge use the face normal, all others the
/// smooth vertex normal.
pub fn corner_normals_auto(mesh: &Mesh) -> Vec<Float3> {
    let face_normals = face_normals(mesh);
    let vertex_normals = vertex_normals(mesh);
    let sharp: HashSet<[u32; 2]> = mesh.sharp_edges().iter().copied().collect();

    let mut normals = Vec::with_capacity(mesh.corner_count());
    for (f, face) in mesh.faces().enumerate() {
        let n = face.len();
        for i in 0..n {
            let v = face[i];
            let next = edge_key(v, face[(i + 1) % n]);
            let prev = edge_key(face[(i + n - 1) % n], v);
            if sharp.contains(&next) || sharp.contains(&prev) {
                normals.push(face_normals[f]);
            } else {
                normals.push(vertex_normals[v as usize]);
            }
        }
    }
    normals
}
