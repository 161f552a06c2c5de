//! Modifier stack evaluation.
//!
//! The stack runs every modifier enabled for the current *required mode* in
//! order. Before the pass it captures a [`StackSnapshot`] so each modifier
//! can ask whether it is the last one that will run, which is what lets the
//! subdivision modifier leave its work to the draw code.
use std::sync::Arc;

use derive_more::{BitAnd, BitAndAssign, BitOr, BitOrAssign};
use log::debug;
use subsurf_mesh::{Float3, Mesh};

use crate::backend::MeshRealizer;
use crate::context::{EvalEnvironment, EvalFlags, ModifierEvalContext};
use crate::error::ModifierError;
use crate::modifier::{Modifier, ModifierKind, ModifierTypeInfo};
use crate::settings::SceneLimits;
use crate::{Error, Result};

/// Set of evaluation modes a modifier is enabled for.
///
/// ```
/// use subsurf_planner::ModifierMode;
///
/// let mode = ModifierMode::REALTIME | ModifierMode::EDITMODE;
/// assert!(mode.contains(ModifierMode::REALTIME));
/// assert!(!mode.contains(ModifierMode::RENDER));
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, BitOr, BitOrAssign, BitAnd, BitAndAssign,
)]
pub struct ModifierMode(u32);

impl ModifierMode {
    pub const NONE: ModifierMode = ModifierMode(0);
    /// Interactive viewport.
    pub const REALTIME: ModifierMode = ModifierMode(1 << 0);
    /// Final render.
    pub const RENDER: ModifierMode = ModifierMode(1 << 1);
    /// While the mesh is edited.
    pub const EDITMODE: ModifierMode = ModifierMode(1 << 2);
    /// Apply to the edit cage.
    pub const ON_CAGE: ModifierMode = ModifierMode(1 << 3);

    /// Returns `true` if every bit of `other` is set.
    #[inline]
    pub fn contains(self, other: ModifierMode) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn bits(self) -> u32 {
        self.0
    }
}

/// The mode a modifier has to be enabled for to run in this evaluation.
#[inline]
pub fn required_mode(render: bool, edit_mode: bool) -> ModifierMode {
    if render {
        ModifierMode::RENDER
    } else if edit_mode {
        ModifierMode::REALTIME | ModifierMode::EDITMODE
    } else {
        ModifierMode::REALTIME
    }
}

/// Enablement of one stack entry, captured before a pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntryState {
    pub mode: ModifierMode,
    pub supports_edit_mode: bool,
    pub disabled_viewport: bool,
    pub disabled_render: bool,
}

impl EntryState {
    /// The enablement predicate.
    pub fn is_enabled(&self, required: ModifierMode) -> bool {
        if !self.mode.contains(required) {
            return false;
        }
        if required.contains(ModifierMode::EDITMODE) && !self.supports_edit_mode {
            return false;
        }
        if required.contains(ModifierMode::RENDER) {
            !self.disabled_render
        } else {
            !self.disabled_viewport
        }
    }
}

/// Read only view of a stack's enablement.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StackSnapshot {
    entries: Vec<EntryState>,
}

impl StackSnapshot {
    pub fn new(entries: Vec<EntryState>) -> Self {
        Self { entries }
    }

    #[inline]
    pub fn entries(&self) -> &[EntryState] {
        &self.entries
    }

    /// Returns `true` if entry `index` runs for `required`.
    pub fn is_enabled(&self, index: usize, required: ModifierMode) -> bool {
        self.entries
            .get(index)
            .is_some_and(|entry| entry.is_enabled(required))
    }

    /// Index of the last entry enabled for `required`, scanning from the
    /// end of the stack.
    pub fn last_enabled(&self, required: ModifierMode) -> Option<usize> {
        self.entries
            .iter()
            .rposition(|entry| entry.is_enabled(required))
    }
}

/// One named modifier in a stack.
#[derive(Debug)]
pub struct StackEntry<D> {
    pub name: String,
    pub mode: ModifierMode,
    pub modifier: ModifierKind<D>,
    error: Option<ModifierError>,
}

impl<D> StackEntry<D> {
    /// The message left by the latest evaluation, if any.
    #[inline]
    pub fn error(&self) -> Option<&ModifierError> {
        self.error.as_ref()
    }
}

/// Inputs of a stack evaluation.
pub struct StackInputs<'a, B> {
    pub flags: EvalFlags,
    pub scene: &'a SceneLimits,
    pub environment: &'a EvalEnvironment,
    pub backend: &'a B,
}

/// Result of a stack evaluation.
#[derive(Clone, Debug)]
pub struct StackResult {
    pub mesh: Arc<Mesh>,
    /// Index of a modifier whose subdivision is still to be realized.
    pub deferred: Option<usize>,
}

/// An ordered list of modifiers applied to one object's mesh.
#[derive(Debug)]
pub struct ModifierStack<D> {
    entries: Vec<StackEntry<D>>,
}

impl<D> Default for ModifierStack<D> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<D> ModifierStack<D> {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn entries(&self) -> &[StackEntry<D>] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&StackEntry<D>> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut StackEntry<D>> {
        self.entries.iter_mut().find(|entry| entry.name == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.name == name)
    }

    /// Sets the modes a modifier is enabled for.
    pub fn set_mode(&mut self, name: &str, mode: ModifierMode) -> Result<()> {
        let entry = self
            .get_mut(name)
            .ok_or_else(|| Error::ModifierNotFound(name.to_string()))?;
        entry.mode = mode;
        Ok(())
    }
}

impl<D> ModifierStack<D> {
    /// Appends a modifier, enabled for viewport and render (and edit mode if
    /// its type asks for that).
    pub fn push(&mut self, name: &str, modifier: impl Into<ModifierKind<D>>) -> &mut StackEntry<D> {
        let modifier = modifier.into();
        let info: &ModifierTypeInfo = modifier.type_info();
        let mut mode = ModifierMode::REALTIME | ModifierMode::RENDER;
        if info.enable_in_edit_mode {
            mode |= ModifierMode::EDITMODE;
        }
        let index = self.entries.len();
        self.entries.push(StackEntry {
            name: name.to_string(),
            mode,
            modifier,
            error: None,
        });
        &mut self.entries[index]
    }

    /// Removes a modifier, freeing its runtime data.
    pub fn remove<B>(&mut self, name: &str, backend: &B) -> Result<()>
    where
        B: MeshRealizer<Descriptor = D>,
    {
        let index = self
            .position(name)
            .ok_or_else(|| Error::ModifierNotFound(name.to_string()))?;
        let mut entry = self.entries.remove(index);
        Modifier::<B>::free_runtime(&mut entry.modifier, backend);
        debug!("removed modifier `{name}`");
        Ok(())
    }

    /// Captures enablement of every entry.
    pub fn snapshot(&self, scene: &SceneLimits) -> StackSnapshot {
        StackSnapshot::new(
            self.entries
                .iter()
                .map(|entry| EntryState {
                    mode: entry.mode,
                    supports_edit_mode: entry.modifier.type_info().supports_edit_mode,
                    disabled_viewport: entry.modifier.is_disabled(scene, false),
                    disabled_render: entry.modifier.is_disabled(scene, true),
                })
                .collect(),
        )
    }

    /// Runs all enabled modifiers on `mesh`.
    pub fn evaluate<B>(&mut self, inputs: &StackInputs<'_, B>, mesh: Arc<Mesh>) -> StackResult
    where
        B: MeshRealizer<Descriptor = D>,
    {
        let required = required_mode(inputs.flags.render, mesh.is_edit_mode());
        let snapshot = self.snapshot(inputs.scene);

        let mut mesh = mesh;
        let mut deferred = None;
        for (index, entry) in self.entries.iter_mut().enumerate() {
            entry.error = None;
            if !snapshot.is_enabled(index, required) {
                continue;
            }

            let ctx = ModifierEvalContext {
                flags: inputs.flags,
                scene: inputs.scene,
                environment: inputs.environment,
                backend: inputs.backend,
                stack: &snapshot,
                index,
            };
            let output = Modifier::<B>::modify_mesh(&mut entry.modifier, &ctx, mesh);
            if let Some(error) = &output.error {
                debug!("modifier `{}`: {error}", entry.name);
            }
            entry.error = output.error;
            mesh = output.mesh;
            if output.deferred {
                deferred = Some(index);
            }
        }

        StackResult { mesh, deferred }
    }

    /// Computes deformed coarse positions, running modifiers that can deform
    /// without changing topology up to the first one that cannot.
    pub fn deform_positions<B>(&mut self, inputs: &StackInputs<'_, B>, mesh: &Mesh) -> Vec<Float3>
    where
        B: MeshRealizer<Descriptor = D>,
    {
        let required = required_mode(inputs.flags.render, mesh.is_edit_mode());
        let snapshot = self.snapshot(inputs.scene);

        let mut positions = mesh.positions().to_vec();
        for (index, entry) in self.entries.iter_mut().enumerate() {
            if !snapshot.is_enabled(index, required) {
                continue;
            }
            if !entry.modifier.type_info().deforms_matrices {
                break;
            }

            let ctx = ModifierEvalContext {
                flags: inputs.flags,
                scene: inputs.scene,
                environment: inputs.environment,
                backend: inputs.backend,
                stack: &snapshot,
                index,
            };
            entry.error =
                Modifier::<B>::deform_matrices(&mut entry.modifier, &ctx, mesh, &mut positions);
        }
        positions
    }

    /// Realizes a deferred subdivision, e.g. when the draw code needs the
    /// final mesh. Results that were not deferred are returned as is.
    pub fn ensure_subdivision<B>(&mut self, backend: &B, result: &StackResult) -> Arc<Mesh>
    where
        B: MeshRealizer<Descriptor = D>,
    {
        let subsurf = result
            .deferred
            .and_then(|index| self.entries.get_mut(index))
            .and_then(|entry| entry.modifier.as_subsurf_mut());

        match subsurf {
            Some(subsurf) => subsurf.ensure_subdivision(backend, &result.mesh),
            None => result.mesh.clone(),
        }
    }

    /// Hands the draw code the GPU descriptor of a deferred subdivision.
    pub fn draw_descriptor<B>(&mut self, backend: &B, result: &StackResult) -> Option<&D>
    where
        B: MeshRealizer<Descriptor = D>,
    {
        let index = result.deferred?;
        self.entries
            .get_mut(index)?
            .modifier
            .as_subsurf_mut()?
            .draw_descriptor(backend, &result.mesh)
    }
}
