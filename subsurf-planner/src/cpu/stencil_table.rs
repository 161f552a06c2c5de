//! Table of subdivision stencils.
//!
//! Every refined (or limit) point is a linear blend of coarse control
//! points. A stencil stores the indices of those control points together
//! with their blending weights, so when the control points move the refined
//! points are recomputed with one weighted sum each, without touching the
//! topology again.
#[cfg(feature = "rayon")]
use rayon::prelude::*;
use subsurf_mesh::Float3;
use ultraviolet::Vec3;

/// Index of a control point.
pub type Index = u32;

/// A stencil under construction: `(control point, weight)` pairs sorted by
/// control point.
pub(crate) type Row = Vec<(Index, f32)>;

/// Returns the identity stencil of control point `index`.
#[inline]
pub(crate) fn unit_row(index: Index) -> Row {
    vec![(index, 1.0)]
}

/// Sums weighted stencils, merging entries that refer to the same control
/// point.
pub(crate) fn combine<'a>(terms: impl IntoIterator<Item = (&'a Row, f32)>) -> Row {
    let mut row: Row = terms
        .into_iter()
        .flat_map(|(row, scale)| row.iter().map(move |&(index, weight)| (index, weight * scale)))
        .collect();
    row.sort_unstable_by_key(|&(index, _)| index);
    row.dedup_by(|next, kept| {
        if next.0 == kept.0 {
            kept.1 += next.1;
            true
        } else {
            false
        }
    });
    row
}

/// Gives read access to a single stencil in a [`StencilTable`].
#[derive(Clone, Copy, Debug)]
pub struct Stencil<'a> {
    indices: &'a [Index],
    weights: &'a [f32],
}

impl<'a> Stencil<'a> {
    /// Returns the indices of the control points.
    #[inline]
    pub fn indices(&self) -> &'a [Index] {
        self.indices
    }

    /// Returns the interpolation weights.
    #[inline]
    pub fn weights(&self) -> &'a [f32] {
        self.weights
    }

    /// Blends `controls` with this stencil's weights.
    #[inline]
    fn apply(&self, controls: &[Float3]) -> Float3 {
        let sum = self
            .indices
            .iter()
            .zip(self.weights)
            .fold(Vec3::zero(), |sum, (&index, &weight)| {
                let [x, y, z] = controls[index as usize];
                sum + Vec3::new(x, y, z) * weight
            });
        [sum.x, sum.y, sum.z]
    }
}

/// Container for stencil data.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StencilTable {
    sizes: Vec<u32>,
    offsets: Vec<Index>,
    indices: Vec<Index>,
    weights: Vec<f32>,
    control_count: usize,
}

impl StencilTable {
    /// Packs stencil rows referring to `control_count` control points.
    pub(crate) fn from_rows(rows: &[Row], control_count: usize) -> Self {
        let total = rows.iter().map(Vec::len).sum();
        let mut table = Self {
            sizes: Vec::with_capacity(rows.len()),
            offsets: Vec::with_capacity(rows.len()),
            indices: Vec::with_capacity(total),
            weights: Vec::with_capacity(total),
            control_count,
        };
        for row in rows {
            table.offsets.push(table.indices.len() as Index);
            table.sizes.push(row.len() as u32);
            for &(index, weight) in row {
                table.indices.push(index);
                table.weights.push(weight);
            }
        }
        table
    }

    /// Returns the number of stencils in the table.
    #[inline]
    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        0 == self.len()
    }

    /// Returns the number of control points indexed in the table.
    #[inline]
    pub fn control_vertex_count(&self) -> usize {
        self.control_count
    }

    /// Returns the stencil at index `i` in the table.
    #[inline]
    pub fn stencil(&self, i: usize) -> Option<Stencil<'_>> {
        let start = *self.offsets.get(i)? as usize;
        let end = start + self.sizes[i] as usize;
        Some(Stencil {
            indices: &self.indices[start..end],
            weights: &self.weights[start..end],
        })
    }

    /// Returns the number of control points of each stencil in the table.
    #[inline]
    pub fn sizes(&self) -> &[u32] {
        &self.sizes
    }

    /// Returns the offset of each stencil into
    /// [`control_indices()`](StencilTable::control_indices()).
    #[inline]
    pub fn offsets(&self) -> &[Index] {
        &self.offsets
    }

    /// Returns the indices of the control points.
    #[inline]
    pub fn control_indices(&self) -> &[Index] {
        &self.indices
    }

    /// Returns the stencil interpolation weights.
    #[inline]
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Computes every stencil's point from `controls`.
    ///
    /// Returns `None` if `controls` does not hold exactly one point per
    /// control point of the table.
    pub fn evaluate(&self, controls: &[Float3]) -> Option<Vec<Float3>> {
        if controls.len() != self.control_count {
            return None;
        }

        #[cfg(feature = "rayon")]
        let points = (0..self.len())
            .into_par_iter()
            .filter_map(|i| self.stencil(i))
            .map(|stencil| stencil.apply(controls))
            .collect();

        #[cfg(not(feature = "rayon"))]
        let points = (0..self.len())
            .filter_map(|i| self.stencil(i))
            .map(|stencil| stencil.apply(controls))
            .collect();

        Some(points)
    }
}
