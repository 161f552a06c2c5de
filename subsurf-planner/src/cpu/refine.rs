//! Uniform refinement expressed as stencil rows.
//!
//! Every refinement step splits each `n`-sided face into `n` quads. Child
//! vertices are numbered vertex points first, then edge points, then face
//! points, so a coarse vertex keeps its index on every level:
//!
//! | child vertex      | index         |
//! |-------------------|---------------|
//! | vertex point of v | `v`           |
//! | edge point of e   | `V + e`       |
//! | face point of f   | `V + E + f`   |
//!
//! Each level keeps, for every vertex, a [`Row`] over the *coarse* vertices
//! and, for every corner, a row over the coarse corners. The rows of the
//! last level become the descriptor's stencil tables.
use std::collections::HashMap;

use subsurf_mesh::{edge_key, EdgeCrease, Mesh};

use super::stencil_table::{combine, unit_row, Index, Row};
use crate::settings::{SubdivSettings, SubdivisionType, VtxBoundaryInterpolation};

/// Topology and stencil rows of one refinement level.
#[derive(Clone, Debug)]
pub(crate) struct Level {
    pub vertex_count: usize,
    pub face_offsets: Vec<u32>,
    pub corner_verts: Vec<u32>,
    pub edges: Vec<[u32; 2]>,
    /// Crease sharpness of each edge. Boundaries are not included.
    pub edge_sharpness: Vec<f32>,
    /// The edge lies on an edge of the coarse cage.
    pub edge_original: Vec<bool>,
    /// Edge from each corner to the next corner of its face.
    pub corner_edges: Vec<u32>,
    pub vertex_rows: Vec<Row>,
    pub corner_rows: Vec<Row>,
}

/// Unique edges of a face list plus the edge leaving each corner.
fn build_edges(face_offsets: &[u32], corner_verts: &[u32]) -> (Vec<[u32; 2]>, Vec<u32>) {
    let mut index: HashMap<[u32; 2], u32> = HashMap::new();
    let mut edges = Vec::new();
    let mut corner_edges = vec![0; corner_verts.len()];

    for face in face_offsets.windows(2) {
        let (start, end) = (face[0] as usize, face[1] as usize);
        let n = end - start;
        for i in 0..n {
            let key = edge_key(corner_verts[start + i], corner_verts[start + (i + 1) % n]);
            corner_edges[start + i] = *index.entry(key).or_insert_with(|| {
                edges.push(key);
                (edges.len() - 1) as u32
            });
        }
    }
    (edges, corner_edges)
}

#[inline]
fn decrement_sharpness(sharpness: f32) -> f32 {
    if EdgeCrease::INFINITE_SHARPNESS <= sharpness {
        sharpness
    } else {
        (sharpness - 1.0).max(0.0)
    }
}

/// Incidence information derived from a [`Level`].
struct Adjacency {
    edge_faces: Vec<Vec<usize>>,
    vertex_faces: Vec<Vec<usize>>,
    vertex_edges: Vec<Vec<usize>>,
}

impl Adjacency {
    fn new(level: &Level) -> Self {
        let mut edge_faces = vec![Vec::new(); level.edges.len()];
        let mut vertex_faces = vec![Vec::new(); level.vertex_count];
        let mut vertex_edges = vec![Vec::new(); level.vertex_count];

        for (f, face) in level.face_offsets.windows(2).enumerate() {
            for corner in face[0] as usize..face[1] as usize {
                edge_faces[level.corner_edges[corner] as usize].push(f);
                vertex_faces[level.corner_verts[corner] as usize].push(f);
            }
        }
        for (e, edge) in level.edges.iter().enumerate() {
            vertex_edges[edge[0] as usize].push(e);
            vertex_edges[edge[1] as usize].push(e);
        }

        Self {
            edge_faces,
            vertex_faces,
            vertex_edges,
        }
    }

    /// Boundary edges count as infinitely sharp, as do non-manifold edges.
    fn is_boundary(&self, edge: usize) -> bool {
        self.edge_faces[edge].len() != 2
    }
}

impl Level {
    /// Builds the coarse level. Returns `None` for topology that cannot be
    /// subdivided.
    pub fn base(mesh: &Mesh, settings: &SubdivSettings) -> Option<Self> {
        if mesh.face_count() == 0 {
            return None;
        }
        for face in mesh.faces() {
            if face.len() < 3 {
                return None;
            }
            for (i, &v) in face.iter().enumerate() {
                if mesh.vertex_count() <= v as usize || face[..i].contains(&v) {
                    return None;
                }
            }
        }

        let face_offsets = mesh.face_offsets().to_vec();
        let corner_verts = mesh.corner_verts().to_vec();
        let (edges, corner_edges) = build_edges(&face_offsets, &corner_verts);

        let mut edge_sharpness = vec![0.0; edges.len()];
        if settings.use_creases && !mesh.creases().is_empty() {
            let index: HashMap<[u32; 2], usize> =
                edges.iter().enumerate().map(|(e, &key)| (key, e)).collect();
            for crease in mesh.creases() {
                if let Some(&e) = index.get(&edge_key(crease.edge[0], crease.edge[1])) {
                    edge_sharpness[e] = crease.sharpness().max(edge_sharpness[e]);
                }
            }
        }

        Some(Self {
            vertex_count: mesh.vertex_count(),
            edge_original: vec![true; edges.len()],
            edge_sharpness,
            edges,
            corner_edges,
            vertex_rows: (0..mesh.vertex_count() as Index).map(unit_row).collect(),
            corner_rows: (0..mesh.corner_count() as Index).map(unit_row).collect(),
            face_offsets,
            corner_verts,
        })
    }

    #[inline]
    pub fn face_count(&self) -> usize {
        self.face_offsets.len() - 1
    }

    #[inline]
    fn sharpness(&self, adjacency: &Adjacency, edge: usize) -> f32 {
        if adjacency.is_boundary(edge) {
            EdgeCrease::INFINITE_SHARPNESS
        } else {
            self.edge_sharpness[edge]
        }
    }

    #[inline]
    fn other_end(&self, edge: usize, v: usize) -> usize {
        let [a, b] = self.edges[edge];
        if a as usize == v {
            b as usize
        } else {
            a as usize
        }
    }

    fn midpoint(&self, edge: usize) -> Row {
        let [a, b] = self.edges[edge];
        combine([
            (&self.vertex_rows[a as usize], 0.5),
            (&self.vertex_rows[b as usize], 0.5),
        ])
    }

    /// Returns `true` if the vertex is held in place on a boundary.
    fn is_boundary_corner(
        &self,
        adjacency: &Adjacency,
        settings: &SubdivSettings,
        v: usize,
    ) -> bool {
        settings.vtx_boundary_interpolation == VtxBoundaryInterpolation::EdgeAndCorner
            && adjacency.vertex_faces[v].len() == 1
            && adjacency.vertex_edges[v]
                .iter()
                .any(|&e| adjacency.is_boundary(e))
    }

    /// Applies one uniform refinement step.
    pub fn refine(&self, settings: &SubdivSettings) -> Level {
        let adjacency = Adjacency::new(self);
        let vertex_count = self.vertex_count;
        let edge_count = self.edges.len();
        let linear = settings.scheme == SubdivisionType::Simple;

        let face_rows: Vec<Row> = self
            .face_offsets
            .windows(2)
            .map(|face| {
                let corners = face[0] as usize..face[1] as usize;
                let weight = 1.0 / corners.len() as f32;
                combine(corners.map(|c| (&self.vertex_rows[self.corner_verts[c] as usize], weight)))
            })
            .collect();

        let edge_rows: Vec<Row> = (0..edge_count)
            .map(|e| self.edge_point(&adjacency, &face_rows, linear, e))
            .collect();

        let vertex_rows: Vec<Row> = (0..vertex_count)
            .map(|v| self.vertex_point(&adjacency, &face_rows, settings, v))
            .collect();

        // Child faces: one quad per parent corner.
        let mut face_offsets = Vec::with_capacity(self.corner_verts.len() + 1);
        let mut corner_verts = Vec::with_capacity(self.corner_verts.len() * 4);
        let mut corner_rows = Vec::with_capacity(self.corner_verts.len() * 4);
        face_offsets.push(0);

        let face_point_base = (vertex_count + edge_count) as u32;
        for (f, face) in self.face_offsets.windows(2).enumerate() {
            let start = face[0] as usize;
            let n = face[1] as usize - start;
            let face_corner_row = combine(
                (start..start + n).map(|c| (&self.corner_rows[c], 1.0 / n as f32)),
            );

            for i in 0..n {
                let corner = start + i;
                let next = start + (i + 1) % n;
                let prev = start + (i + n - 1) % n;

                corner_verts.extend([
                    self.corner_verts[corner],
                    vertex_count as u32 + self.corner_edges[corner],
                    face_point_base + f as u32,
                    vertex_count as u32 + self.corner_edges[prev],
                ]);
                corner_rows.extend([
                    self.corner_rows[corner].clone(),
                    combine([(&self.corner_rows[corner], 0.5), (&self.corner_rows[next], 0.5)]),
                    face_corner_row.clone(),
                    combine([(&self.corner_rows[prev], 0.5), (&self.corner_rows[corner], 0.5)]),
                ]);
                face_offsets.push(corner_verts.len() as u32);
            }
        }

        let (edges, corner_edges) = build_edges(&face_offsets, &corner_verts);
        let edge_point_range = vertex_count..vertex_count + edge_count;
        let (edge_sharpness, edge_original): (Vec<f32>, Vec<bool>) = edges
            .iter()
            .map(|&[a, b]| {
                let (a, b) = (a as usize, b as usize);
                // A child edge from a vertex point to an edge point halves its
                // parent edge; every other child edge is interior to a face.
                if a < vertex_count && edge_point_range.contains(&b) {
                    let parent = b - vertex_count;
                    (
                        decrement_sharpness(self.edge_sharpness[parent]),
                        self.edge_original[parent],
                    )
                } else {
                    (0.0, false)
                }
            })
            .unzip();

        let mut all_rows = vertex_rows;
        all_rows.extend(edge_rows);
        all_rows.extend(face_rows);

        Level {
            vertex_count: all_rows.len(),
            face_offsets,
            corner_verts,
            edges,
            edge_sharpness,
            edge_original,
            corner_edges,
            vertex_rows: all_rows,
            corner_rows,
        }
    }

    fn edge_point(&self, adjacency: &Adjacency, face_rows: &[Row], linear: bool, e: usize) -> Row {
        let mid = self.midpoint(e);
        let sharpness = self.sharpness(adjacency, e);
        if linear || 1.0 <= sharpness {
            return mid;
        }

        let [a, b] = self.edges[e];
        let faces = &adjacency.edge_faces[e];
        let smooth = combine([
            (&self.vertex_rows[a as usize], 0.25),
            (&self.vertex_rows[b as usize], 0.25),
            (&face_rows[faces[0]], 0.25),
            (&face_rows[faces[1]], 0.25),
        ]);
        if sharpness <= 0.0 {
            smooth
        } else {
            combine([(&smooth, 1.0 - sharpness), (&mid, sharpness)])
        }
    }

    fn vertex_point(
        &self,
        adjacency: &Adjacency,
        face_rows: &[Row],
        settings: &SubdivSettings,
        v: usize,
    ) -> Row {
        let row = &self.vertex_rows[v];
        let faces = &adjacency.vertex_faces[v];
        let edges = &adjacency.vertex_edges[v];
        if settings.scheme == SubdivisionType::Simple
            || faces.is_empty()
            || self.is_boundary_corner(adjacency, settings, v)
        {
            return row.clone();
        }

        let smooth = if faces.len() == edges.len() {
            let n = edges.len() as f32;
            let q = combine(faces.iter().map(|&f| (&face_rows[f], 1.0 / n)));
            let midpoints: Vec<Row> = edges.iter().map(|&e| self.midpoint(e)).collect();
            let r = combine(midpoints.iter().map(|m| (m, 1.0 / n)));
            combine([(&q, 1.0 / n), (&r, 2.0 / n), (row, (n - 3.0) / n)])
        } else {
            // Non-manifold fan: keep the vertex where it is.
            row.clone()
        };

        let sharp: Vec<usize> = edges
            .iter()
            .copied()
            .filter(|&e| 0.0 < self.sharpness(adjacency, e))
            .collect();
        let sharp_row = match sharp.len() {
            0 | 1 => return smooth,
            2 => {
                let a = self.other_end(sharp[0], v);
                let b = self.other_end(sharp[1], v);
                combine([
                    (row, 0.75),
                    (&self.vertex_rows[a], 0.125),
                    (&self.vertex_rows[b], 0.125),
                ])
            }
            _ => row.clone(),
        };

        let average = sharp
            .iter()
            .map(|&e| self.sharpness(adjacency, e))
            .sum::<f32>()
            / sharp.len() as f32;
        if 1.0 <= average {
            sharp_row
        } else {
            combine([(&sharp_row, average), (&smooth, 1.0 - average)])
        }
    }

    /// Rows placing every vertex of this level on the limit surface.
    ///
    /// Expects a quad level, i.e. one that was refined at least once.
    pub fn limit_rows(&self, settings: &SubdivSettings) -> Vec<Row> {
        if settings.scheme == SubdivisionType::Simple {
            return self.vertex_rows.clone();
        }
        let adjacency = Adjacency::new(self);
        (0..self.vertex_count)
            .map(|v| self.limit_point(&adjacency, settings, v))
            .collect()
    }

    fn limit_point(&self, adjacency: &Adjacency, settings: &SubdivSettings, v: usize) -> Row {
        let row = &self.vertex_rows[v];
        let faces = &adjacency.vertex_faces[v];
        let edges = &adjacency.vertex_edges[v];
        if faces.is_empty() || self.is_boundary_corner(adjacency, settings, v) {
            return row.clone();
        }

        let sharp: Vec<usize> = edges
            .iter()
            .copied()
            .filter(|&e| 1.0 <= self.sharpness(adjacency, e))
            .collect();
        match sharp.len() {
            0 | 1 => self.smooth_limit(adjacency, v).unwrap_or_else(|| row.clone()),
            2 => {
                let a = self.other_end(sharp[0], v);
                let b = self.other_end(sharp[1], v);
                combine([
                    (row, 4.0 / 6.0),
                    (&self.vertex_rows[a], 1.0 / 6.0),
                    (&self.vertex_rows[b], 1.0 / 6.0),
                ])
            }
            _ => row.clone(),
        }
    }

    /// Limit position of an interior vertex surrounded by quads:
    /// `(n²·v + 4·Σ edge neighbors + Σ diagonal neighbors) / (n·(n + 5))`.
    fn smooth_limit(&self, adjacency: &Adjacency, v: usize) -> Option<Row> {
        let faces = &adjacency.vertex_faces[v];
        let edges = &adjacency.vertex_edges[v];
        if faces.len() != edges.len() {
            return None;
        }

        let n = edges.len() as f32;
        let norm = n * (n + 5.0);
        let mut diagonals = Vec::with_capacity(faces.len());
        for &f in faces {
            let start = self.face_offsets[f] as usize;
            let face = &self.corner_verts[start..self.face_offsets[f + 1] as usize];
            if face.len() != 4 {
                return None;
            }
            let i = face.iter().position(|&corner| corner as usize == v)?;
            diagonals.push(face[(i + 2) % 4] as usize);
        }

        let terms = std::iter::once((&self.vertex_rows[v], n * n / norm))
            .chain(
                edges
                    .iter()
                    .map(|&e| (&self.vertex_rows[self.other_end(e, v)], 4.0 / norm)),
            )
            .chain(diagonals.iter().map(|&d| (&self.vertex_rows[d], 1.0 / norm)));
        Some(combine(terms))
    }
}
