//! The modifier interface and the closed set of modifier behaviors.
use std::sync::Arc;

use subsurf_mesh::{Float3, Mesh};

use crate::backend::MeshRealizer;
use crate::context::ModifierEvalContext;
use crate::error::ModifierError;
use crate::mirror::MirrorModifier;
use crate::settings::SceneLimits;
use crate::subsurf::SubsurfModifier;

/// How a modifier changes its input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModifierClass {
    /// Only moves vertices.
    Deform,
    /// Builds new geometry.
    Constructive,
}

/// Static description of a modifier type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModifierTypeInfo {
    pub name: &'static str,
    pub class: ModifierClass,
    pub accepts_mesh: bool,
    /// Results can be mapped back to the original elements.
    pub supports_mapping: bool,
    pub supports_edit_mode: bool,
    /// New instances are enabled in edit mode.
    pub enable_in_edit_mode: bool,
    /// Implements [`Modifier::deform_matrices()`].
    pub deforms_matrices: bool,
}

/// Result of [`Modifier::modify_mesh()`].
#[derive(Debug)]
pub struct ModifierOutput {
    pub mesh: Arc<Mesh>,
    /// The modifier left subdivision to be realized on demand.
    pub deferred: bool,
    pub error: Option<ModifierError>,
}

impl ModifierOutput {
    /// Output that is the input, untouched.
    pub fn pass_through(mesh: Arc<Mesh>) -> Self {
        Self {
            mesh,
            deferred: false,
            error: None,
        }
    }
}

/// Capabilities shared by all modifier types.
pub trait Modifier<B: MeshRealizer> {
    fn type_info(&self) -> &'static ModifierTypeInfo;

    /// Returns `true` if the settings make the modifier a no-op.
    fn is_disabled(&self, _scene: &SceneLimits, _use_render_params: bool) -> bool {
        false
    }

    fn modify_mesh(&mut self, ctx: &ModifierEvalContext<'_, B>, mesh: Arc<Mesh>) -> ModifierOutput;

    /// Moves `positions` (one per vertex of `mesh`) the way the modifier
    /// would, without changing topology.
    fn deform_matrices(
        &mut self,
        _ctx: &ModifierEvalContext<'_, B>,
        _mesh: &Mesh,
        _positions: &mut [Float3],
    ) -> Option<ModifierError> {
        None
    }

    /// Drops all runtime data, freeing backend resources.
    fn free_runtime(&mut self, _backend: &B) {}
}

/// Every modifier type the stack knows about.
#[derive(Debug)]
pub enum ModifierKind<D> {
    Subsurf(SubsurfModifier<D>),
    Mirror(MirrorModifier),
}

impl<D> From<SubsurfModifier<D>> for ModifierKind<D> {
    fn from(modifier: SubsurfModifier<D>) -> Self {
        ModifierKind::Subsurf(modifier)
    }
}

impl<D> From<MirrorModifier> for ModifierKind<D> {
    fn from(modifier: MirrorModifier) -> Self {
        ModifierKind::Mirror(modifier)
    }
}

impl<D> ModifierKind<D> {
    pub fn type_info(&self) -> &'static ModifierTypeInfo {
        match self {
            ModifierKind::Subsurf(m) => m.type_info(),
            ModifierKind::Mirror(m) => m.type_info(),
        }
    }

    pub fn is_disabled(&self, scene: &SceneLimits, use_render_params: bool) -> bool {
        match self {
            ModifierKind::Subsurf(m) => m.is_disabled(scene, use_render_params),
            ModifierKind::Mirror(m) => m.is_disabled(scene, use_render_params),
        }
    }

    pub fn as_subsurf(&self) -> Option<&SubsurfModifier<D>> {
        match self {
            ModifierKind::Subsurf(subsurf) => Some(subsurf),
            _ => None,
        }
    }

    pub fn as_subsurf_mut(&mut self) -> Option<&mut SubsurfModifier<D>> {
        match self {
            ModifierKind::Subsurf(subsurf) => Some(subsurf),
            _ => None,
        }
    }
}

impl<B: MeshRealizer> Modifier<B> for ModifierKind<B::Descriptor> {
    fn type_info(&self) -> &'static ModifierTypeInfo {
        ModifierKind::type_info(self)
    }

    fn is_disabled(&self, scene: &SceneLimits, use_render_params: bool) -> bool {
        ModifierKind::is_disabled(self, scene, use_render_params)
    }

    fn modify_mesh(&mut self, ctx: &ModifierEvalContext<'_, B>, mesh: Arc<Mesh>) -> ModifierOutput {
        match self {
            ModifierKind::Subsurf(m) => Modifier::<B>::modify_mesh(m, ctx, mesh),
            ModifierKind::Mirror(m) => Modifier::<B>::modify_mesh(m, ctx, mesh),
        }
    }

    fn deform_matrices(
        &mut self,
        ctx: &ModifierEvalContext<'_, B>,
        mesh: &Mesh,
        positions: &mut [Float3],
    ) -> Option<ModifierError> {
        match self {
            ModifierKind::Subsurf(m) => Modifier::<B>::deform_matrices(m, ctx, mesh, positions),
            ModifierKind::Mirror(m) => Modifier::<B>::deform_matrices(m, ctx, mesh, positions),
        }
    }

    fn free_runtime(&mut self, backend: &B) {
        match self {
            ModifierKind::Subsurf(m) => Modifier::<B>::free_runtime(m, backend),
            ModifierKind::Mirror(m) => Modifier::<B>::free_runtime(m, backend),
        }
    }
}
