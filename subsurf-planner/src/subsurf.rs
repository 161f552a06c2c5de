//! The subdivision surface modifier.
//!
//! Each evaluation walks the same decision list:
//!
//! 1. No backend compiled in: report [`ModifierError::Unsupported`] and pass
//!    the mesh through.
//! 2. The resolved level is zero: pass the mesh through.
//! 3. Age the recent-use counters.
//! 4. This is the last modifier that runs: remember how to realize the
//!    result and either leave it to the draw code (GPU subdivision) or
//!    realize it right away through [`SubsurfModifier::ensure_subdivision()`].
//! 5. Otherwise realize the subdivision with the CPU descriptor.
//!
//! Descriptors live in the modifier's [`RuntimeCache`] and are reused for as
//! long as topology and settings stay the same.
use std::sync::Arc;

use derive_more::Display;
use log::{debug, warn};
use subsurf_mesh::{Float3, Mesh, NormalsDomain};

use crate::backend::{DescriptorBuilder, MeshRealizer};
use crate::cache::{BackendKind, RuntimeCache, WrapperSettings};
use crate::context::{EvalEnvironment, ModifierEvalContext};
use crate::custom_normals;
use crate::error::ModifierError;
use crate::modifier::{Modifier, ModifierClass, ModifierOutput, ModifierTypeInfo};
use crate::resolution::{resolution_from_level, subdiv_level, MIN_RESOLUTION};
use crate::settings::{ModifierConfig, SceneLimits, SubdivSettings, ToCcgSettings, ToMeshSettings};
use crate::stack::required_mode;
use crate::Result;

const TYPE_INFO: ModifierTypeInfo = ModifierTypeInfo {
    name: "Subdivision",
    class: ModifierClass::Constructive,
    accepts_mesh: true,
    supports_mapping: true,
    supports_edit_mode: true,
    enable_in_edit_mode: true,
    deforms_matrices: true,
};

/// What the modifier realizes a descriptor into.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SubdivOutput {
    /// A flat polygon mesh.
    #[default]
    Mesh,
    /// A mesh with grid layout for multires style access.
    Ccg,
}

/// How the latest evaluation ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Evaluation {
    /// Resolved level is zero.
    Disabled,
    /// No subdivision backend.
    Unsupported,
    /// The backend could not build a descriptor for the input.
    DegenerateTopology,
    /// Left for the draw code.
    Deferred,
    /// Subdivided geometry was produced.
    Tessellated,
}

/// Informational message for the modifier panel.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum DiagnosticNote {
    #[display("Sharp edges or custom normals detected, disabling GPU subdivision")]
    GpuDisabledByMeshState,
    #[display("Using both CPU and GPU subdivision")]
    CpuAndGpu,
}

/// Read only state of a subdivision modifier, for display.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SubsurfDiagnostics {
    pub used_cpu: u32,
    pub used_gpu: u32,
    /// Resolution of the last last-in-stack evaluation.
    pub resolution: u32,
    pub has_gpu_subdiv: bool,
    pub note: Option<DiagnosticNote>,
}

/// A Catmull-Clark (or simple) subdivision surface modifier.
#[derive(Debug)]
pub struct SubsurfModifier<D> {
    pub config: ModifierConfig,
    pub output: SubdivOutput,
    runtime: Option<RuntimeCache<D>>,
    last_evaluation: Option<Evaluation>,
}

impl<D> Default for SubsurfModifier<D> {
    fn default() -> Self {
        Self::new(ModifierConfig::default())
    }
}

impl<D> SubsurfModifier<D> {
    pub fn new(config: ModifierConfig) -> Self {
        Self {
            config,
            output: SubdivOutput::default(),
            runtime: None,
            last_evaluation: None,
        }
    }

    /// Creates a modifier, rejecting out of range settings.
    pub fn try_new(config: ModifierConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config))
    }

    pub fn type_info(&self) -> &'static ModifierTypeInfo {
        &TYPE_INFO
    }

    /// Returns `true` if the resolved level is zero.
    pub fn is_disabled(&self, scene: &SceneLimits, use_render_params: bool) -> bool {
        subdiv_level(&self.config, scene, use_render_params) == 0
    }

    #[inline]
    pub fn runtime(&self) -> Option<&RuntimeCache<D>> {
        self.runtime.as_ref()
    }

    #[inline]
    pub fn last_evaluation(&self) -> Option<Evaluation> {
        self.last_evaluation
    }

    /// Custom normals are requested and the mesh has per corner normals,
    /// either custom ones or split by sharp edges.
    pub fn use_custom_loop_normals(&self, mesh: &Mesh) -> bool {
        self.config.use_custom_normals && mesh.normals_domain() == NormalsDomain::Corner
    }

    /// Returns `true` if the mesh needs normals the GPU path cannot produce.
    pub fn force_disable_gpu_for_mesh(&self, environment: &EvalEnvironment, mesh: &Mesh) -> bool {
        environment.gpu_subdivision
            && (self.use_custom_loop_normals(mesh)
                || mesh.normals_domain() == NormalsDomain::Corner)
    }

    /// Returns `true` if the draw code can subdivide this mesh on the GPU.
    pub fn can_do_gpu_subdiv(&self, environment: &EvalEnvironment, mesh: &Mesh) -> bool {
        environment.gpu_subdivision_available()
            && !self.force_disable_gpu_for_mesh(environment, mesh)
    }

    /// Prepares the runtime cache for an evaluation.
    ///
    /// Returns `false` if the resolved level is zero, in which case there is
    /// nothing to do.
    pub fn runtime_init(&mut self, scene: &SceneLimits, use_render_params: bool) -> bool {
        let level = subdiv_level(&self.config, scene, use_render_params);
        if level == 0 {
            if let Some(runtime) = &mut self.runtime {
                runtime.reset_counters();
            }
            return false;
        }

        let settings = SubdivSettings::new(&self.config, level);
        match &mut self.runtime {
            Some(runtime) => runtime.set_settings(settings),
            None => self.runtime = Some(RuntimeCache::new(settings)),
        }
        true
    }

    /// Realizes the subdivision cached for lazy evaluation.
    ///
    /// This is what the draw code calls when it needs the final mesh after
    /// the modifier deferred. On any failure `mesh` is returned.
    pub fn ensure_subdivision<B>(&mut self, backend: &B, mesh: &Arc<Mesh>) -> Arc<Mesh>
    where
        B: MeshRealizer<Descriptor = D>,
    {
        match self.realize_wrapper(backend, mesh) {
            Ok(Some(result)) => Arc::new(result),
            Ok(None) => mesh.clone(),
            Err(error) => {
                warn!("{error}");
                mesh.clone()
            }
        }
    }

    /// Returns the descriptor the draw code subdivides with on the GPU.
    pub fn draw_descriptor<B>(&mut self, backend: &B, mesh: &Mesh) -> Option<&D>
    where
        B: DescriptorBuilder<Descriptor = D>,
    {
        let runtime = self.runtime.as_mut()?;
        if !runtime.wrapper().has_gpu_subdiv {
            return None;
        }
        runtime.acquire(backend, BackendKind::Gpu, mesh)?;
        runtime.slots().get(BackendKind::Gpu)
    }

    /// Collects what the modifier panel shows.
    pub fn diagnostics(&self, environment: &EvalEnvironment, mesh: &Mesh) -> SubsurfDiagnostics {
        let mut diagnostics = self
            .runtime
            .as_ref()
            .map(|runtime| SubsurfDiagnostics {
                used_cpu: runtime.used_cpu(),
                used_gpu: runtime.used_gpu(),
                resolution: runtime.wrapper().resolution,
                has_gpu_subdiv: runtime.wrapper().has_gpu_subdiv,
                note: None,
            })
            .unwrap_or_default();

        diagnostics.note = if self.force_disable_gpu_for_mesh(environment, mesh) {
            Some(DiagnosticNote::GpuDisabledByMeshState)
        } else if 0 < diagnostics.used_gpu && 0 < diagnostics.used_cpu {
            Some(DiagnosticNote::CpuAndGpu)
        } else {
            None
        };
        diagnostics
    }

    fn realize_wrapper<B>(
        &mut self,
        backend: &B,
        mesh: &Mesh,
    ) -> Result<Option<Mesh>, ModifierError>
    where
        B: MeshRealizer<Descriptor = D>,
    {
        let Some(wrapper) = self.runtime.as_ref().map(|runtime| *runtime.wrapper()) else {
            return Ok(None);
        };
        let use_clnors =
            wrapper.use_loop_normals && mesh.normals_domain() == NormalsDomain::Corner;
        self.realize(
            backend,
            BackendKind::Cpu,
            mesh,
            ToMeshSettings {
                resolution: wrapper.resolution,
                use_optimal_display: wrapper.use_optimal_display,
            },
            use_clnors,
        )
    }

    /// Builds (or reuses) the descriptor of `kind` and realizes it.
    ///
    /// `Ok(None)` means there is nothing to realize and the input should be
    /// passed through.
    fn realize<B>(
        &mut self,
        backend: &B,
        kind: BackendKind,
        mesh: &Mesh,
        settings: ToMeshSettings,
        use_clnors: bool,
    ) -> Result<Option<Mesh>, ModifierError>
    where
        B: MeshRealizer<Descriptor = D>,
    {
        if settings.resolution < MIN_RESOLUTION {
            return Ok(None);
        }
        let output = self.output;
        let Some(runtime) = self.runtime.as_mut() else {
            return Ok(None);
        };
        let Some(lease) = runtime.acquire(backend, kind, mesh) else {
            debug!("no subdivision descriptor for this topology, passing mesh through");
            return Ok(None);
        };

        let snapshot;
        let base = if use_clnors {
            snapshot = custom_normals::snapshot(mesh)?;
            &snapshot
        } else {
            mesh
        };

        let realized = runtime.descriptor(&lease).map(|descriptor| match output {
            SubdivOutput::Mesh => backend.to_mesh(descriptor, &settings, base),
            SubdivOutput::Ccg => backend.to_ccg(
                descriptor,
                &ToCcgSettings {
                    resolution: settings.resolution,
                    need_normal: true,
                    need_mask: false,
                },
                base,
            ),
        });
        runtime.release(backend, lease);

        let Some(realized) = realized else {
            return Ok(None);
        };
        let mut result = realized?;
        if use_clnors {
            custom_normals::restore(&mut result)?;
        }
        Ok(Some(result))
    }

    fn finish(
        &mut self,
        mesh: Arc<Mesh>,
        realized: Result<Option<Mesh>, ModifierError>,
    ) -> ModifierOutput {
        match realized {
            Ok(Some(result)) => {
                self.last_evaluation = Some(Evaluation::Tessellated);
                ModifierOutput::pass_through(Arc::new(result))
            }
            Ok(None) => {
                self.last_evaluation = Some(Evaluation::DegenerateTopology);
                ModifierOutput::pass_through(mesh)
            }
            Err(error) => {
                warn!("subdivision failed: {error}");
                self.last_evaluation = Some(Evaluation::DegenerateTopology);
                ModifierOutput {
                    mesh,
                    deferred: false,
                    error: Some(error),
                }
            }
        }
    }
}

impl<B: MeshRealizer> Modifier<B> for SubsurfModifier<B::Descriptor> {
    fn type_info(&self) -> &'static ModifierTypeInfo {
        &TYPE_INFO
    }

    fn is_disabled(&self, scene: &SceneLimits, use_render_params: bool) -> bool {
        SubsurfModifier::is_disabled(self, scene, use_render_params)
    }

    fn modify_mesh(&mut self, ctx: &ModifierEvalContext<'_, B>, mesh: Arc<Mesh>) -> ModifierOutput {
        if !ctx.backend.is_supported() {
            warn!("subdivision requested but no backend is available");
            self.last_evaluation = Some(Evaluation::Unsupported);
            return ModifierOutput {
                mesh,
                deferred: false,
                error: Some(ModifierError::Unsupported),
            };
        }
        if !self.runtime_init(ctx.scene, ctx.flags.render) {
            self.last_evaluation = Some(Evaluation::Disabled);
            return ModifierOutput::pass_through(mesh);
        }
        if let Some(runtime) = &mut self.runtime {
            runtime.decay_counters();
        }

        let level = subdiv_level(&self.config, ctx.scene, ctx.flags.render);
        let settings = ToMeshSettings {
            resolution: resolution_from_level(level),
            use_optimal_display: self.config.show_only_control_edges
                && !ctx.flags.apply_to_original,
        };

        if !ctx.flags.apply_to_original {
            let required = required_mode(ctx.flags.render, mesh.is_edit_mode());
            if ctx.stack.last_enabled(required) == Some(ctx.index) {
                let has_gpu_subdiv = self.can_do_gpu_subdiv(ctx.environment, &mesh);
                if let Some(runtime) = &mut self.runtime {
                    runtime.set_wrapper(WrapperSettings {
                        resolution: settings.resolution,
                        use_optimal_display: settings.use_optimal_display,
                        use_loop_normals: self.config.use_custom_normals,
                        has_gpu_subdiv,
                    });
                }

                if !ctx.environment.headless && !ctx.flags.render && has_gpu_subdiv {
                    debug!("last modifier in the stack, deferring subdivision to the draw code");
                    self.last_evaluation = Some(Evaluation::Deferred);
                    return ModifierOutput {
                        mesh,
                        deferred: true,
                        error: None,
                    };
                }

                debug!("last modifier in the stack, subdividing now");
                let realized = self.realize_wrapper(ctx.backend, &mesh);
                return self.finish(mesh, realized);
            }
        }

        let use_clnors = self.use_custom_loop_normals(&mesh);
        let realized = self.realize(ctx.backend, BackendKind::Cpu, &mesh, settings, use_clnors);
        self.finish(mesh, realized)
    }

    fn deform_matrices(
        &mut self,
        ctx: &ModifierEvalContext<'_, B>,
        mesh: &Mesh,
        positions: &mut [Float3],
    ) -> Option<ModifierError> {
        if !ctx.backend.is_supported() {
            return Some(ModifierError::Unsupported);
        }
        if !self.runtime_init(ctx.scene, ctx.flags.render) {
            return None;
        }
        let runtime = self.runtime.as_mut()?;

        let lease = if ctx.flags.apply_to_original {
            runtime.acquire_ephemeral(ctx.backend, mesh)
        } else {
            runtime.acquire(ctx.backend, BackendKind::Cpu, mesh)
        }?;
        if let Some(descriptor) = runtime.descriptor(&lease) {
            ctx.backend.deform_coarse_vertices(descriptor, mesh, positions);
        }
        runtime.release(ctx.backend, lease);
        None
    }

    fn free_runtime(&mut self, backend: &B) {
        if let Some(runtime) = self.runtime.take() {
            runtime.free(backend);
        }
    }
}
