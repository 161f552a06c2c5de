//! Modifier and scene settings.
//!
//! [`ModifierConfig`] is what gets persisted with the object. The other
//! structs are derived from it per evaluation:
//! * [`SubdivSettings`] – identity of a subdivision descriptor. Two
//!   evaluations with equal settings (and equal topology) share one
//!   descriptor.
//! * [`ToMeshSettings`]/[`ToCcgSettings`] – what the realizer produces from a
//!   descriptor.
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::{Error, Result};

/// Subdivision scheme.
#[repr(u32)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SubdivisionType {
    #[default]
    CatmullClark = 0,
    /// Split faces without smoothing.
    Simple = 1,
}

/// How UV coordinates are smoothed.
#[repr(u32)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UvSmooth {
    None = 0,
    PreserveCorners = 1,
    PreserveCornersAndJunctions = 2,
    PreserveCornersJunctionsAndConcave = 3,
    #[default]
    PreserveBoundaries = 4,
    All = 5,
}

/// How open boundaries are smoothed.
#[repr(u32)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BoundarySmooth {
    /// Smooth boundaries including corners.
    #[default]
    All = 0,
    /// Keep boundary corners sharp.
    PreserveCorners = 1,
}

/// Boundary rule of the vertex interpolation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VtxBoundaryInterpolation {
    /// Boundary edges are sharp, corners are smoothed.
    EdgeOnly,
    /// Boundary edges are sharp and corners are kept in place.
    EdgeAndCorner,
}

impl From<BoundarySmooth> for VtxBoundaryInterpolation {
    fn from(smooth: BoundarySmooth) -> Self {
        match smooth {
            BoundarySmooth::All => VtxBoundaryInterpolation::EdgeOnly,
            BoundarySmooth::PreserveCorners => VtxBoundaryInterpolation::EdgeAndCorner,
        }
    }
}

/// Linear interpolation rule for face-varying data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FVarLinearInterpolation {
    None,
    CornersOnly,
    CornersPlus1,
    CornersPlus2,
    Boundaries,
    All,
}

impl From<UvSmooth> for FVarLinearInterpolation {
    fn from(smooth: UvSmooth) -> Self {
        match smooth {
            UvSmooth::None => FVarLinearInterpolation::All,
            UvSmooth::PreserveCorners => FVarLinearInterpolation::CornersOnly,
            UvSmooth::PreserveCornersAndJunctions => FVarLinearInterpolation::CornersPlus1,
            UvSmooth::PreserveCornersJunctionsAndConcave => FVarLinearInterpolation::CornersPlus2,
            UvSmooth::PreserveBoundaries => FVarLinearInterpolation::Boundaries,
            UvSmooth::All => FVarLinearInterpolation::None,
        }
    }
}

/// Persisted settings of a subdivision surface modifier.
///
/// # Examples
///
/// ```
/// use subsurf_planner::ModifierConfig;
///
/// let config = ModifierConfig {
///     levels: 2,
///     render_levels: 3,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ModifierConfig {
    /// Subdivision level in the viewport.
    pub levels: u32,
    /// Subdivision level for final renders.
    pub render_levels: u32,
    /// Accuracy of the limit surface evaluation.
    pub quality: u32,
    /// Only draw edges that lie on the edges of the control cage.
    pub show_only_control_edges: bool,
    /// Place vertices on the limit surface.
    pub use_limit_surface: bool,
    /// Respect edge creases.
    pub use_creases: bool,
    /// Carry custom corner normals over to the result.
    pub use_custom_normals: bool,
    pub uv_smooth: UvSmooth,
    pub boundary_smooth: BoundarySmooth,
    pub subdivision_type: SubdivisionType,
}

impl ModifierConfig {
    /// Highest subdivision level the modifier accepts.
    pub const MAX_LEVELS: u32 = 11;
    /// Valid range of [`quality`](ModifierConfig::quality).
    pub const QUALITY_RANGE: std::ops::RangeInclusive<u32> = 1..=10;

    /// Checks all values are in range.
    pub fn validate(&self) -> Result<()> {
        if Self::MAX_LEVELS < self.levels || Self::MAX_LEVELS < self.render_levels {
            return Err(Error::InvalidConfig(format!(
                "Subdivision levels {}/{} exceed the maximum of {}.",
                self.levels,
                self.render_levels,
                Self::MAX_LEVELS
            )));
        }
        if !Self::QUALITY_RANGE.contains(&self.quality) {
            return Err(Error::InvalidConfig(format!(
                "Quality {} is out of range {:?}.",
                self.quality,
                Self::QUALITY_RANGE
            )));
        }
        Ok(())
    }

    /// Parses and validates settings stored as RON.
    #[cfg(feature = "serde")]
    pub fn from_ron(source: &str) -> Result<Self> {
        let config: Self = ron::from_str(source)?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for ModifierConfig {
    /// Create a config with the following defaults:
    ///
    /// | Property                  | Value                                                    |
    /// |---------------------------|----------------------------------------------------------|
    /// | `levels`                  | `1`                                                      |
    /// | `render_levels`           | `2`                                                      |
    /// | `quality`                 | `3`                                                      |
    /// | `show_only_control_edges` | `true`                                                   |
    /// | `use_limit_surface`       | `true`                                                   |
    /// | `use_creases`             | `true`                                                   |
    /// | `use_custom_normals`      | `false`                                                  |
    /// | `uv_smooth`               | [`PreserveBoundaries`](UvSmooth::PreserveBoundaries)     |
    /// | `boundary_smooth`         | [`All`](BoundarySmooth::All)                             |
    /// | `subdivision_type`        | [`CatmullClark`](SubdivisionType::CatmullClark)          |
    fn default() -> Self {
        Self {
            levels: 1,
            render_levels: 2,
            quality: 3,
            show_only_control_edges: true,
            use_limit_surface: true,
            use_creases: true,
            use_custom_normals: false,
            uv_smooth: UvSmooth::PreserveBoundaries,
            boundary_smooth: BoundarySmooth::All,
            subdivision_type: SubdivisionType::CatmullClark,
        }
    }
}

/// Scene wide subdivision limits ("simplify").
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SceneLimits {
    /// Limits only apply while this is set.
    pub simplify: bool,
    /// Maximum level in the viewport.
    pub max_subdivision: u32,
    /// Maximum level for final renders.
    pub max_subdivision_render: u32,
}

impl Default for SceneLimits {
    fn default() -> Self {
        Self {
            simplify: false,
            max_subdivision: 6,
            max_subdivision_render: 6,
        }
    }
}

impl SceneLimits {
    /// Limits that always clamp to `max_level`, viewport and render alike.
    pub fn clamped(max_level: u32) -> Self {
        Self {
            simplify: true,
            max_subdivision: max_level,
            max_subdivision_render: max_level,
        }
    }

    /// The level cap for the given mode, if any.
    #[inline]
    pub fn level_clamp(&self, for_render: bool) -> Option<u32> {
        match (self.simplify, for_render) {
            (false, _) => None,
            (true, true) => Some(self.max_subdivision_render),
            (true, false) => Some(self.max_subdivision),
        }
    }
}

/// Settings a subdivision descriptor is built for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubdivSettings {
    pub scheme: SubdivisionType,
    /// Number of uniform refinement steps.
    pub level: u32,
    pub use_creases: bool,
    pub use_limit_surface: bool,
    pub vtx_boundary_interpolation: VtxBoundaryInterpolation,
    pub fvar_linear_interpolation: FVarLinearInterpolation,
}

impl SubdivSettings {
    /// Derives descriptor settings from the modifier config at `level`.
    pub fn new(config: &ModifierConfig, level: u32) -> Self {
        Self {
            scheme: config.subdivision_type,
            level,
            use_creases: config.use_creases,
            use_limit_surface: config.use_limit_surface,
            vtx_boundary_interpolation: config.boundary_smooth.into(),
            fvar_linear_interpolation: config.uv_smooth.into(),
        }
    }
}

/// Options for realizing a descriptor as a flat mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ToMeshSettings {
    /// Points along each edge of a coarse face quadrant, `2^level + 1`.
    pub resolution: u32,
    /// Only report edges lying on the control cage as display edges.
    pub use_optimal_display: bool,
}

/// Options for realizing a descriptor as CCG grids.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ToCcgSettings {
    pub resolution: u32,
    pub need_normal: bool,
    pub need_mask: bool,
}
