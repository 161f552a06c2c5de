//! # Subsurf Mesh
//!
//! A compact polygon mesh used as the input and output of the subdivision
//! modifier stack.
//!
//! Faces are stored the way most DCC tools store them: a flat array of
//! *corner* vertex indices plus an offset array marking where each face
//! starts. Everything that is interpolated per face corner (custom normals,
//! auxiliary layers) is indexed by corner.
//!
//! ```
//! use subsurf_mesh::Mesh;
//!
//! // A single quad.
//! let mesh = Mesh::new(
//!     vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
//!     &[4],
//!     vec![0, 1, 2, 3],
//! )
//! .unwrap();
//!
//! assert_eq!(mesh.face_count(), 1);
//! assert_eq!(mesh.corner_count(), 4);
//! assert_eq!(mesh.edges().len(), 4);
//! ```
//!
//! ## Features
#![doc = document_features::document_features!()]

use std::collections::{BTreeMap, HashSet};
use std::ops::Range;

pub mod error;
pub mod normals;

pub use error::{MeshError, Result};

/// A vertex position or normal.
pub type Float3 = [f32; 3];

/// Returns the edge key for two vertices, independent of their order.
#[inline]
pub fn edge_key(a: u32, b: u32) -> [u32; 2] {
    if a < b {
        [a, b]
    } else {
        [b, a]
    }
}

/// A crease weight assigned to an edge.
///
/// `crease` is in `0..=1`, the range artists edit. Use
/// [`sharpness()`](EdgeCrease::sharpness()) to get the subdivision
/// sharpness.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EdgeCrease {
    pub edge: [u32; 2],
    pub crease: f32,
}

impl EdgeCrease {
    /// Sharpness at or above this value makes a crease infinitely sharp.
    pub const INFINITE_SHARPNESS: f32 = 10.0;

    pub fn new(a: u32, b: u32, crease: f32) -> Self {
        Self {
            edge: edge_key(a, b),
            crease: crease.clamp(0.0, 1.0),
        }
    }

    /// Converts the crease weight into a subdivision sharpness.
    ///
    /// The mapping is quadratic so the low end of the slider gives finer
    /// control.
    #[inline]
    pub fn sharpness(&self) -> f32 {
        self.crease * self.crease * Self::INFINITE_SHARPNESS
    }
}

/// Where normals of a mesh vary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NormalsDomain {
    /// Smooth shading, one normal per vertex.
    Point,
    /// Normals are split per face corner (custom normals or sharp edges).
    Corner,
}

/// Layout of a grid based (CCG) subdivision result.
///
/// Every corner of the coarse mesh owns one grid of
/// `grid_size × grid_size` points, stored as a contiguous block of
/// `(grid_size - 1)²` quads in the result's face array.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridLayout {
    pub grid_size: u32,
    pub grid_count: usize,
    /// Per vertex normals, present if they were requested.
    pub vertex_normals: Option<Vec<Float3>>,
}

impl GridLayout {
    /// Number of faces in each grid.
    #[inline]
    pub fn faces_per_grid(&self) -> usize {
        let side = self.grid_size.saturating_sub(1) as usize;
        side * side
    }

    /// Face range covered by grid `grid`.
    pub fn grid_faces(&self, grid: usize) -> Option<Range<usize>> {
        if grid < self.grid_count {
            let len = self.faces_per_grid();
            Some(grid * len..(grid + 1) * len)
        } else {
            None
        }
    }
}

/// A polygon mesh.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Mesh {
    positions: Vec<Float3>,
    face_offsets: Vec<u32>,
    corner_verts: Vec<u32>,
    creases: Vec<EdgeCrease>,
    sharp_edges: Vec<[u32; 2]>,
    custom_normals: Option<Vec<Float3>>,
    corner_layers: BTreeMap<String, Vec<Float3>>,
    display_edges: Option<Vec<[u32; 2]>>,
    grids: Option<GridLayout>,
    edit_mode: bool,
}

impl Default for Mesh {
    /// An empty mesh without vertices or faces.
    fn default() -> Self {
        Self {
            positions: Vec::new(),
            face_offsets: vec![0],
            corner_verts: Vec::new(),
            creases: Vec::new(),
            sharp_edges: Vec::new(),
            custom_normals: None,
            corner_layers: BTreeMap::new(),
            display_edges: None,
            grids: None,
            edit_mode: false,
        }
    }
}

impl Mesh {
    /// Creates a mesh from positions, face sizes and a flat corner list.
    ///
    /// # Arguments
    ///
    /// * `positions` - The vertex positions.
    /// * `face_sizes` - Number of corners of each face.
    /// * `corner_verts` - Vertex index of each corner, face after face.
    pub fn new(positions: Vec<Float3>, face_sizes: &[u32], corner_verts: Vec<u32>) -> Result<Self> {
        let mut face_offsets = Vec::with_capacity(face_sizes.len() + 1);
        let mut offset = 0u32;
        face_offsets.push(offset);
        for &size in face_sizes {
            offset += size;
            face_offsets.push(offset);
        }

        Self::from_offsets(positions, face_offsets, corner_verts)
    }

    /// Creates a mesh from an offset array (`faces + 1` entries, starting at
    /// zero).
    pub fn from_offsets(
        positions: Vec<Float3>,
        face_offsets: Vec<u32>,
        corner_verts: Vec<u32>,
    ) -> Result<Self> {
        if face_offsets.first().copied().unwrap_or(0) != 0 {
            return Err(MeshError::InvalidTopology(
                "Face offsets must start at zero.".to_string(),
            ));
        }
        let face_offsets = if face_offsets.is_empty() { vec![0] } else { face_offsets };

        if *face_offsets.last().unwrap_or(&0) as usize != corner_verts.len() {
            return Err(MeshError::InvalidTopology(
                "The number of corners is not equal to the sum of face sizes.".to_string(),
            ));
        }

        #[cfg(feature = "topology_validation")]
        {
            if face_offsets.windows(2).any(|w| w[1] < w[0]) {
                return Err(MeshError::InvalidTopology(
                    "Face offsets must not decrease.".to_string(),
                ));
            }
            if let Some(&index) = corner_verts
                .iter()
                .find(|&&v| positions.len() <= v as usize)
            {
                return Err(MeshError::IndexOutOfBounds {
                    index: index as usize,
                    max: positions.len(),
                });
            }
        }

        Ok(Self {
            positions,
            face_offsets,
            corner_verts,
            ..Default::default()
        })
    }

    /// Adds edge creases.
    pub fn with_creases(mut self, creases: Vec<EdgeCrease>) -> Result<Self> {
        self.set_creases(creases)?;
        Ok(self)
    }

    /// Tags edges as sharp for shading.
    pub fn with_sharp_edges(mut self, sharp_edges: &[[u32; 2]]) -> Result<Self> {
        self.set_sharp_edges(sharp_edges)?;
        Ok(self)
    }

    /// Adds custom per corner normals.
    pub fn with_custom_normals(mut self, normals: Vec<Float3>) -> Result<Self> {
        self.set_custom_normals(normals)?;
        Ok(self)
    }

    /// Marks the mesh as being edited interactively.
    pub fn with_edit_mode(mut self, edit_mode: bool) -> Self {
        self.edit_mode = edit_mode;
        self
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn face_count(&self) -> usize {
        self.face_offsets.len() - 1
    }

    #[inline]
    pub fn corner_count(&self) -> usize {
        self.corner_verts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.face_count() == 0
    }

    #[inline]
    pub fn positions(&self) -> &[Float3] {
        &self.positions
    }

    #[inline]
    pub fn positions_mut(&mut self) -> &mut [Float3] {
        &mut self.positions
    }

    /// The positions as a flat buffer of `3 * vertex_count()` floats.
    #[inline]
    pub fn positions_flat(&self) -> &[f32] {
        bytemuck::cast_slice(&self.positions)
    }

    #[inline]
    pub fn face_offsets(&self) -> &[u32] {
        &self.face_offsets
    }

    #[inline]
    pub fn corner_verts(&self) -> &[u32] {
        &self.corner_verts
    }

    /// Returns the corner range of face `face`.
    #[inline]
    pub fn face_corners(&self, face: usize) -> Range<usize> {
        self.face_offsets[face] as usize..self.face_offsets[face + 1] as usize
    }

    /// Returns the vertex indices of face `face`.
    #[inline]
    pub fn face(&self, face: usize) -> &[u32] {
        &self.corner_verts[self.face_corners(face)]
    }

    /// Iterates over the vertex indices of all faces.
    pub fn faces(&self) -> impl Iterator<Item = &[u32]> + '_ {
        (0..self.face_count()).map(move |face| self.face(face))
    }

    /// Returns the unique edges, in order of first appearance.
    pub fn edges(&self) -> Vec<[u32; 2]> {
        let mut seen = HashSet::new();
        let mut edges = Vec::new();
        for face in self.faces() {
            for (i, &v) in face.iter().enumerate() {
                let key = edge_key(v, face[(i + 1) % face.len()]);
                if seen.insert(key) {
                    edges.push(key);
                }
            }
        }
        edges
    }

    #[inline]
    pub fn creases(&self) -> &[EdgeCrease] {
        &self.creases
    }

    /// Replaces the edge creases.
    pub fn set_creases(&mut self, creases: Vec<EdgeCrease>) -> Result<()> {
        for crease in &creases {
            self.check_edge(crease.edge)?;
        }
        self.creases = creases;
        Ok(())
    }

    #[inline]
    pub fn sharp_edges(&self) -> &[[u32; 2]] {
        &self.sharp_edges
    }

    pub fn set_sharp_edges(&mut self, sharp_edges: &[[u32; 2]]) -> Result<()> {
        for &edge in sharp_edges {
            self.check_edge(edge)?;
        }
        self.sharp_edges = sharp_edges.iter().map(|e| edge_key(e[0], e[1])).collect();
        Ok(())
    }

    #[inline]
    pub fn custom_normals(&self) -> Option<&[Float3]> {
        self.custom_normals.as_deref()
    }

    #[inline]
    pub fn has_custom_normals(&self) -> bool {
        self.custom_normals.is_some()
    }

    /// Sets custom normals as given. There must be one per corner.
    pub fn set_custom_normals(&mut self, normals: Vec<Float3>) -> Result<()> {
        self.check_layer_len("custom_normals", normals.len())?;
        self.custom_normals = Some(normals);
        Ok(())
    }

    /// Sets custom normals, normalizing each vector first.
    ///
    /// Zero length vectors fall back to the automatic corner normal.
    pub fn set_custom_normals_normalized(&mut self, normals: &[Float3]) -> Result<()> {
        self.check_layer_len("custom_normals", normals.len())?;
        let fallback = normals::corner_normals_auto(self);
        let normalized = normals
            .iter()
            .zip(fallback)
            .map(|(&n, auto)| normals::normalize_or(n, auto))
            .collect();
        self.custom_normals = Some(normalized);
        Ok(())
    }

    pub fn clear_custom_normals(&mut self) {
        self.custom_normals = None;
    }

    /// Where the normals of this mesh vary.
    pub fn normals_domain(&self) -> NormalsDomain {
        if self.custom_normals.is_some() || !self.sharp_edges.is_empty() {
            NormalsDomain::Corner
        } else {
            NormalsDomain::Point
        }
    }

    /// Per corner normals: the custom normals if present, computed ones
    /// otherwise.
    pub fn corner_normals(&self) -> Vec<Float3> {
        match &self.custom_normals {
            Some(normals) => normals.clone(),
            None => normals::corner_normals_auto(self),
        }
    }

    pub fn face_normals(&self) -> Vec<Float3> {
        normals::face_normals(self)
    }

    pub fn vertex_normals(&self) -> Vec<Float3> {
        normals::vertex_normals(self)
    }

    #[inline]
    pub fn corner_layer(&self, name: &str) -> Option<&[Float3]> {
        self.corner_layers.get(name).map(Vec::as_slice)
    }

    /// Iterates over all auxiliary corner layers.
    pub fn corner_layers(&self) -> impl Iterator<Item = (&str, &[Float3])> + '_ {
        self.corner_layers
            .iter()
            .map(|(name, data)| (name.as_str(), data.as_slice()))
    }

    /// Adds or replaces an auxiliary per corner layer.
    pub fn add_corner_layer(&mut self, name: &str, data: Vec<Float3>) -> Result<()> {
        self.check_layer_len(name, data.len())?;
        self.corner_layers.insert(name.to_string(), data);
        Ok(())
    }

    /// Removes an auxiliary layer, returning its data.
    pub fn remove_corner_layer(&mut self, name: &str) -> Option<Vec<Float3>> {
        self.corner_layers.remove(name)
    }

    #[inline]
    pub fn is_edit_mode(&self) -> bool {
        self.edit_mode
    }

    pub fn set_edit_mode(&mut self, edit_mode: bool) {
        self.edit_mode = edit_mode;
    }

    /// Edges drawn in the viewport when only control edges are shown.
    ///
    /// `None` means every edge is drawn.
    #[inline]
    pub fn display_edges(&self) -> Option<&[[u32; 2]]> {
        self.display_edges.as_deref()
    }

    pub fn set_display_edges(&mut self, edges: Option<Vec<[u32; 2]>>) {
        self.display_edges = edges;
    }

    #[inline]
    pub fn grids(&self) -> Option<&GridLayout> {
        self.grids.as_ref()
    }

    pub fn set_grids(&mut self, grids: Option<GridLayout>) {
        self.grids = grids;
    }

    /// Returns `true` if both meshes share the same connectivity.
    ///
    /// Positions, normals and layers are ignored.
    pub fn same_topology(&self, other: &Mesh) -> bool {
        self.vertex_count() == other.vertex_count()
            && self.face_offsets == other.face_offsets
            && self.corner_verts == other.corner_verts
    }

    fn check_edge(&self, edge: [u32; 2]) -> Result<()> {
        for v in edge {
            if self.vertex_count() <= v as usize {
                return Err(MeshError::IndexOutOfBounds {
                    index: v as usize,
                    max: self.vertex_count(),
                });
            }
        }
        Ok(())
    }

    fn check_layer_len(&self, name: &str, len: usize) -> Result<()> {
        if len != self.corner_count() {
            Err(MeshError::LayerLength {
                name: name.to_string(),
                expected: self.corner_count(),
                actual: len,
            })
        } else {
            Ok(())
        }
    }
}
