//! When the subdivision modifier leaves its work to the draw code.
use std::sync::Arc;

use subsurf_mesh::Mesh;
use subsurf_planner::{
    Evaluation, EvalEnvironment, EvalFlags, MirrorModifier, ModifierConfig, ModifierStack,
    SceneLimits, StackInputs, StackResult, SubsurfModifier,
};

mod test_utils;
use test_utils::*;

fn subsurf_stack() -> ModifierStack<Tracked> {
    let mut stack = ModifierStack::new();
    stack.push("Subdivision", SubsurfModifier::new(ModifierConfig::default()));
    stack
}

fn evaluate(
    stack: &mut ModifierStack<Tracked>,
    backend: &CountingBackend,
    flags: EvalFlags,
    environment: EvalEnvironment,
    mesh: &Arc<Mesh>,
) -> StackResult {
    let inputs = StackInputs {
        flags,
        scene: &SceneLimits::default(),
        environment: &environment,
        backend,
    };
    stack.evaluate(&inputs, mesh.clone())
}

fn last_evaluation(stack: &ModifierStack<Tracked>, name: &str) -> Option<Evaluation> {
    stack
        .get(name)
        .and_then(|entry| entry.modifier.as_subsurf())
        .and_then(|subsurf| subsurf.last_evaluation())
}

#[test]
fn test_defers_in_interactive_viewport() {
    init_logging();
    let backend = CountingBackend::new();
    let mut stack = subsurf_stack();
    let input = arc(cube());

    let result = evaluate(
        &mut stack,
        &backend,
        EvalFlags::VIEWPORT,
        EvalEnvironment::default(),
        &input,
    );

    assert!(Arc::ptr_eq(&result.mesh, &input));
    assert_eq!(result.deferred, Some(0));
    assert_eq!(last_evaluation(&stack, "Subdivision"), Some(Evaluation::Deferred));
    // Nothing is built until someone asks for it.
    assert_eq!(backend.built(), 0);
}

#[test]
fn test_headless_tessellates_eagerly() {
    let backend = CountingBackend::new();
    let mut stack = subsurf_stack();
    let input = arc(cube());

    let result = evaluate(
        &mut stack,
        &backend,
        EvalFlags::VIEWPORT,
        EvalEnvironment::headless(),
        &input,
    );

    assert!(!Arc::ptr_eq(&result.mesh, &input));
    assert_eq!(result.deferred, None);
    assert_eq!(result.mesh.face_count(), 24);
    assert_eq!(last_evaluation(&stack, "Subdivision"), Some(Evaluation::Tessellated));
    assert_eq!(backend.built(), 1);
}

#[test]
fn test_render_tessellates_eagerly() {
    let backend = CountingBackend::new();
    let mut stack = subsurf_stack();
    let input = arc(cube());

    let result = evaluate(
        &mut stack,
        &backend,
        EvalFlags::RENDER,
        EvalEnvironment::default(),
        &input,
    );

    assert_eq!(result.deferred, None);
    // Render level defaults to 2.
    assert_eq!(result.mesh.face_count(), 96);
}

#[test]
fn test_apply_to_original_never_defers() {
    let backend = CountingBackend::new();
    let mut stack = subsurf_stack();
    let input = arc(cube());

    let flags = EvalFlags {
        render: false,
        apply_to_original: true,
    };
    let result = evaluate(&mut stack, &backend, flags, EvalEnvironment::default(), &input);

    assert_eq!(result.deferred, None);
    assert_eq!(result.mesh.face_count(), 24);
    // Control edges are only reported for display.
    assert!(result.mesh.display_edges().is_none());
}

#[test]
fn test_gpu_preference_off_tessellates_eagerly() {
    let backend = CountingBackend::new();
    let mut stack = subsurf_stack();
    let environment = EvalEnvironment {
        gpu_subdivision: false,
        ..Default::default()
    };

    let result = evaluate(&mut stack, &backend, EvalFlags::VIEWPORT, environment, &arc(cube()));
    assert_eq!(result.deferred, None);
    assert_eq!(result.mesh.face_count(), 24);
}

#[test]
fn test_missing_gpu_compute_tessellates_eagerly() {
    let backend = CountingBackend::new();
    let mut stack = subsurf_stack();
    let environment = EvalEnvironment {
        gpu_compute: false,
        ..Default::default()
    };

    let result = evaluate(&mut stack, &backend, EvalFlags::VIEWPORT, environment, &arc(cube()));
    assert_eq!(result.deferred, None);
}

#[test]
fn test_sharp_edges_force_eager_evaluation() {
    let backend = CountingBackend::new();
    let mut stack = subsurf_stack();
    let mesh = arc(cube().with_sharp_edges(&[[0, 1]]).unwrap());

    let result = evaluate(
        &mut stack,
        &backend,
        EvalFlags::VIEWPORT,
        EvalEnvironment::default(),
        &mesh,
    );

    assert_eq!(result.deferred, None);
    assert_eq!(result.mesh.face_count(), 24);
    let subsurf = stack.get("Subdivision").unwrap().modifier.as_subsurf().unwrap();
    assert!(subsurf.force_disable_gpu_for_mesh(&EvalEnvironment::default(), &mesh));
    assert!(!subsurf.runtime().unwrap().wrapper().has_gpu_subdiv);
}

#[test]
fn test_not_last_modifier_subdivides_in_place() {
    let backend = CountingBackend::new();
    let mut stack = subsurf_stack();
    stack.push("Mirror", MirrorModifier::default());

    let result = evaluate(
        &mut stack,
        &backend,
        EvalFlags::VIEWPORT,
        EvalEnvironment::default(),
        &arc(cube()),
    );

    assert_eq!(result.deferred, None);
    assert_eq!(last_evaluation(&stack, "Subdivision"), Some(Evaluation::Tessellated));
    // Subdivided, then mirrored.
    assert_eq!(result.mesh.face_count(), 48);
}

#[test]
fn test_last_enabled_ignores_disabled_successors() {
    let backend = CountingBackend::new();
    let mut stack = subsurf_stack();
    stack.push("Mirror", MirrorModifier::default());
    stack
        .set_mode("Mirror", subsurf_planner::ModifierMode::RENDER)
        .unwrap();

    let input = arc(cube());
    let result = evaluate(
        &mut stack,
        &backend,
        EvalFlags::VIEWPORT,
        EvalEnvironment::default(),
        &input,
    );

    assert!(Arc::ptr_eq(&result.mesh, &input));
    assert_eq!(result.deferred, Some(0));
}

#[test]
fn test_deferred_result_is_realized_on_demand() {
    let backend = CountingBackend::new();
    let mut stack = subsurf_stack();
    let input = arc(cube());

    let result = evaluate(
        &mut stack,
        &backend,
        EvalFlags::VIEWPORT,
        EvalEnvironment::default(),
        &input,
    );
    assert_eq!(result.deferred, Some(0));

    let descriptor = stack.draw_descriptor(&backend, &result);
    assert!(descriptor.is_some());
    assert_eq!(backend.built(), 1);

    let realized = stack.ensure_subdivision(&backend, &result);
    assert_eq!(realized.face_count(), 24);
    // Cached control edge display setting was applied.
    assert!(realized.display_edges().is_some());
    assert_eq!(backend.built(), 2);

    let subsurf = stack.get("Subdivision").unwrap().modifier.as_subsurf().unwrap();
    let runtime = subsurf.runtime().unwrap();
    assert_eq!(runtime.used_cpu(), 2);
    assert_eq!(runtime.used_gpu(), 2);
    assert_eq!(runtime.slots().len(), 2);
}

#[test]
fn test_ensure_subdivision_passes_through_eager_results() {
    let backend = CountingBackend::new();
    let mut stack = subsurf_stack();

    let result = evaluate(
        &mut stack,
        &backend,
        EvalFlags::VIEWPORT,
        EvalEnvironment::headless(),
        &arc(cube()),
    );
    let realized = stack.ensure_subdivision(&backend, &result);

    assert!(Arc::ptr_eq(&realized, &result.mesh));
    assert!(stack.draw_descriptor(&backend, &result).is_none());
}
