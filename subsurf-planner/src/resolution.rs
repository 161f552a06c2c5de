//! Subdivision level and resolution selection.
//!
//! The level requested by a modifier depends on what is evaluated: final
//! renders use [`render_levels`](ModifierConfig::render_levels), everything
//! else uses [`levels`](ModifierConfig::levels). The scene's simplify limit
//! always wins over the per-modifier request.
//!
//! ```
//! use subsurf_planner::resolution::{resolution_from_level, subdiv_level};
//! use subsurf_planner::{ModifierConfig, SceneLimits};
//!
//! let config = ModifierConfig { levels: 6, ..Default::default() };
//! let level = subdiv_level(&config, &SceneLimits::clamped(3), false);
//!
//! assert_eq!(level, 3);
//! assert_eq!(resolution_from_level(level), 9);
//! ```
use crate::settings::{ModifierConfig, SceneLimits};

/// Smallest resolution that actually subdivides.
pub const MIN_RESOLUTION: u32 = 3;

/// Applies the scene limit to a requested level.
#[inline]
pub fn clamp_level(scene: &SceneLimits, level: u32, for_render: bool) -> u32 {
    match scene.level_clamp(for_render) {
        Some(max) => level.min(max),
        None => level,
    }
}

/// Returns the level a modifier evaluates at.
///
/// Levels above [`ModifierConfig::MAX_LEVELS`] are capped.
pub fn subdiv_level(config: &ModifierConfig, scene: &SceneLimits, use_render_params: bool) -> u32 {
    let requested = if use_render_params {
        config.render_levels
    } else {
        config.levels
    };
    clamp_level(
        scene,
        requested.min(ModifierConfig::MAX_LEVELS),
        use_render_params,
    )
}

/// Number of points along a subdivided edge: `2^level + 1`.
#[inline]
pub fn resolution_from_level(level: u32) -> u32 {
    1u32.checked_shl(level)
        .map_or(u32::MAX, |points| points.saturating_add(1))
}

/// Inverse of [`resolution_from_level()`] for resolutions of the form
/// `2^level + 1`.
#[inline]
pub fn level_from_resolution(resolution: u32) -> u32 {
    resolution.saturating_sub(1).max(1).ilog2()
}
