//! Level selection and the pass-through of disabled modifiers.
use std::sync::Arc;

use subsurf_planner::resolution::{clamp_level, resolution_from_level, subdiv_level};
use subsurf_planner::{
    EvalEnvironment, EvalFlags, ModifierConfig, ModifierStack, SceneLimits, StackInputs,
    SubsurfModifier,
};

mod test_utils;
use test_utils::*;

#[test]
fn test_level_below_clamp_is_kept() {
    let config = ModifierConfig {
        levels: 2,
        ..Default::default()
    };
    let level = subdiv_level(&config, &SceneLimits::clamped(4), false);
    assert_eq!(level, 2);
    assert_eq!(resolution_from_level(level), 5);
}

#[test]
fn test_level_above_clamp_is_limited() {
    let config = ModifierConfig {
        levels: 6,
        ..Default::default()
    };
    let level = subdiv_level(&config, &SceneLimits::clamped(3), false);
    assert_eq!(level, 3);
    assert_eq!(resolution_from_level(level), 9);
}

#[test]
fn test_clamp_needs_simplify() {
    let scene = SceneLimits {
        simplify: false,
        max_subdivision: 1,
        max_subdivision_render: 1,
    };
    assert_eq!(clamp_level(&scene, 5, false), 5);
    assert_eq!(clamp_level(&scene, 5, true), 5);
}

#[test]
fn test_render_uses_render_levels_and_clamp() {
    let config = ModifierConfig {
        levels: 1,
        render_levels: 5,
        ..Default::default()
    };
    let scene = SceneLimits {
        simplify: true,
        max_subdivision: 0,
        max_subdivision_render: 3,
    };
    assert_eq!(subdiv_level(&config, &scene, true), 3);
    assert_eq!(subdiv_level(&config, &scene, false), 0);
}

#[test]
fn test_level_is_capped_without_scene_clamp() {
    let config = ModifierConfig {
        levels: 40,
        render_levels: 40,
        ..Default::default()
    };
    let scene = SceneLimits::default();
    assert_eq!(subdiv_level(&config, &scene, false), ModifierConfig::MAX_LEVELS);
    assert_eq!(subdiv_level(&config, &scene, true), 11);
    assert_eq!(subdiv_level(&config, &SceneLimits::clamped(2), false), 2);

    let mut subsurf = SubsurfModifier::<()>::new(config);
    assert!(subsurf.runtime_init(&scene, false));
    assert_eq!(subsurf.runtime().unwrap().settings().level, 11);
}

#[test]
fn test_is_disabled_follows_resolved_level() {
    let subsurf = SubsurfModifier::<()>::new(ModifierConfig {
        levels: 0,
        render_levels: 2,
        ..Default::default()
    });
    let scene = SceneLimits::default();
    assert!(subsurf.is_disabled(&scene, false));
    assert!(!subsurf.is_disabled(&scene, true));
    assert!(subsurf.is_disabled(&SceneLimits::clamped(0), true));
}

#[test]
fn test_level_zero_returns_input() {
    init_logging();
    let backend = CountingBackend::new();
    let mut stack = ModifierStack::new();
    stack.push(
        "Subdivision",
        SubsurfModifier::new(ModifierConfig {
            levels: 0,
            ..Default::default()
        }),
    );

    let input = arc(cube());
    let inputs = StackInputs {
        flags: EvalFlags::VIEWPORT,
        scene: &SceneLimits::default(),
        environment: &EvalEnvironment::headless(),
        backend: &backend,
    };
    let result = stack.evaluate(&inputs, input.clone());

    assert!(Arc::ptr_eq(&result.mesh, &input));
    assert_eq!(result.deferred, None);
    assert_eq!(backend.built(), 0);
}

#[test]
fn test_scene_clamp_to_zero_returns_input() {
    let backend = CountingBackend::new();
    let mut stack = ModifierStack::new();
    stack.push("Subdivision", SubsurfModifier::new(ModifierConfig::default()));

    let input = arc(quad());
    let inputs = StackInputs {
        flags: EvalFlags::VIEWPORT,
        scene: &SceneLimits::clamped(0),
        environment: &EvalEnvironment::headless(),
        backend: &backend,
    };
    let result = stack.evaluate(&inputs, input.clone());

    assert!(Arc::ptr_eq(&result.mesh, &input));
    assert_eq!(backend.built(), 0);
}

#[test]
fn test_clamped_level_drives_tessellation() {
    let backend = CountingBackend::new();
    let mut stack = ModifierStack::new();
    stack.push(
        "Subdivision",
        SubsurfModifier::new(ModifierConfig {
            levels: 4,
            ..Default::default()
        }),
    );

    let inputs = StackInputs {
        flags: EvalFlags::VIEWPORT,
        scene: &SceneLimits::clamped(2),
        environment: &EvalEnvironment::headless(),
        backend: &backend,
    };
    let result = stack.evaluate(&inputs, arc(quad()));

    // Level 2: 4 x 4 quads.
    assert_eq!(result.mesh.face_count(), 16);
    assert_eq!(result.mesh.vertex_count(), 25);
}
