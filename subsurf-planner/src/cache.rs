//! Per modifier runtime cache and descriptor lifetime rules.
//!
//! A [`RuntimeCache`] owns at most two descriptors, one per
//! [`BackendKind`]. Descriptors in a slot survive across evaluations and are
//! only freed when they go stale (topology or settings changed) or when the
//! cache is torn down. Descriptors built for one-off work are handed out as
//! [`DescriptorLease::Ephemeral`] and freed by
//! [`release()`](RuntimeCache::release()).
//!
//! Each slot also has a recent-use counter. Using a slot resets it to
//! [`RECENT_USE_EVALUATIONS`], every evaluation decrements it. The counters
//! are informational: nothing is evicted because a counter reached zero.
use derive_more::Display;
use log::{debug, trace};
use subsurf_mesh::Mesh;

use crate::backend::DescriptorBuilder;
use crate::settings::SubdivSettings;

/// Number of evaluations a slot counts as recently used.
pub const RECENT_USE_EVALUATIONS: u32 = 2;

/// Where a descriptor is evaluated.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Modifier stack evaluation and CPU side mesh wrappers.
    #[display("CPU")]
    Cpu,
    /// Draw code doing the subdivision on the GPU.
    #[display("GPU")]
    Gpu,
}

/// Fixed capacity map from [`BackendKind`] to a descriptor.
#[derive(Debug)]
pub struct DescriptorSlots<D> {
    cpu: Option<D>,
    gpu: Option<D>,
}

impl<D> Default for DescriptorSlots<D> {
    fn default() -> Self {
        Self {
            cpu: None,
            gpu: None,
        }
    }
}

impl<D> DescriptorSlots<D> {
    #[inline]
    pub fn get(&self, kind: BackendKind) -> Option<&D> {
        match kind {
            BackendKind::Cpu => self.cpu.as_ref(),
            BackendKind::Gpu => self.gpu.as_ref(),
        }
    }

    #[inline]
    fn slot_mut(&mut self, kind: BackendKind) -> &mut Option<D> {
        match kind {
            BackendKind::Cpu => &mut self.cpu,
            BackendKind::Gpu => &mut self.gpu,
        }
    }

    /// Removes and returns the descriptor of `kind`.
    #[inline]
    pub fn take(&mut self, kind: BackendKind) -> Option<D> {
        self.slot_mut(kind).take()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.cpu.is_some() as usize + self.gpu.is_some() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A descriptor handed out by the cache.
///
/// The variant says who owns it: the cache (persistent) or the caller
/// (ephemeral, must go back through
/// [`release()`](RuntimeCache::release())).
#[derive(Debug)]
pub enum DescriptorLease<D> {
    Persistent(BackendKind),
    Ephemeral(D),
}

/// Settings cached for realizing the subdivision outside of the modifier
/// stack, e.g. lazily from the draw code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WrapperSettings {
    pub resolution: u32,
    pub use_optimal_display: bool,
    pub use_loop_normals: bool,
    pub has_gpu_subdiv: bool,
}

/// Runtime data owned by one modifier instance.
#[derive(Debug)]
pub struct RuntimeCache<D> {
    settings: SubdivSettings,
    wrapper: WrapperSettings,
    used_cpu: u32,
    used_gpu: u32,
    slots: DescriptorSlots<D>,
}

impl<D> RuntimeCache<D> {
    pub fn new(settings: SubdivSettings) -> Self {
        Self {
            settings,
            wrapper: WrapperSettings::default(),
            used_cpu: 0,
            used_gpu: 0,
            slots: DescriptorSlots::default(),
        }
    }

    /// Settings descriptors are currently built for.
    #[inline]
    pub fn settings(&self) -> &SubdivSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: SubdivSettings) {
        self.settings = settings;
    }

    #[inline]
    pub fn wrapper(&self) -> &WrapperSettings {
        &self.wrapper
    }

    pub fn set_wrapper(&mut self, wrapper: WrapperSettings) {
        self.wrapper = wrapper;
    }

    #[inline]
    pub fn used_cpu(&self) -> u32 {
        self.used_cpu
    }

    #[inline]
    pub fn used_gpu(&self) -> u32 {
        self.used_gpu
    }

    #[inline]
    pub fn slots(&self) -> &DescriptorSlots<D> {
        &self.slots
    }

    pub fn reset_counters(&mut self) {
        self.used_cpu = 0;
        self.used_gpu = 0;
    }

    /// Ages both recent-use counters by one evaluation.
    pub fn decay_counters(&mut self) {
        self.used_cpu = self.used_cpu.saturating_sub(1);
        self.used_gpu = self.used_gpu.saturating_sub(1);
        trace!("recent use: cpu {} gpu {}", self.used_cpu, self.used_gpu);
    }

    fn touch(&mut self, kind: BackendKind) {
        match kind {
            BackendKind::Cpu => self.used_cpu = RECENT_USE_EVALUATIONS,
            BackendKind::Gpu => self.used_gpu = RECENT_USE_EVALUATIONS,
        }
    }

    /// Makes sure the slot of `kind` holds a descriptor usable for `mesh`.
    ///
    /// A stale descriptor is freed before its replacement is built. Returns
    /// `None` if the builder rejects the topology; the slot is empty then.
    pub fn acquire<B>(
        &mut self,
        builder: &B,
        kind: BackendKind,
        mesh: &Mesh,
    ) -> Option<DescriptorLease<D>>
    where
        B: DescriptorBuilder<Descriptor = D>,
    {
        self.touch(kind);

        let settings = self.settings;
        let slot = self.slots.slot_mut(kind);
        let reusable = slot
            .as_ref()
            .is_some_and(|descriptor| builder.is_reusable(descriptor, mesh, &settings));

        if reusable {
            debug!("reusing {kind} subdivision descriptor");
        } else {
            if let Some(stale) = slot.take() {
                debug!("freeing stale {kind} subdivision descriptor");
                builder.free(stale);
            }
            debug!("building {kind} subdivision descriptor at level {}", settings.level);
            *slot = builder.build(mesh, &settings);
        }

        slot.as_ref().map(|_| DescriptorLease::Persistent(kind))
    }

    /// Builds a descriptor that is not kept in any slot.
    pub fn acquire_ephemeral<B>(&self, builder: &B, mesh: &Mesh) -> Option<DescriptorLease<D>>
    where
        B: DescriptorBuilder<Descriptor = D>,
    {
        debug!("building ephemeral subdivision descriptor");
        builder
            .build(mesh, &self.settings)
            .map(DescriptorLease::Ephemeral)
    }

    /// Resolves a lease to its descriptor.
    pub fn descriptor<'a>(&'a self, lease: &'a DescriptorLease<D>) -> Option<&'a D> {
        match lease {
            DescriptorLease::Persistent(kind) => self.slots.get(*kind),
            DescriptorLease::Ephemeral(descriptor) => Some(descriptor),
        }
    }

    /// Gives a lease back. Ephemeral descriptors are freed, slot descriptors
    /// stay alive.
    pub fn release<B>(&self, builder: &B, lease: DescriptorLease<D>)
    where
        B: DescriptorBuilder<Descriptor = D>,
    {
        if let DescriptorLease::Ephemeral(descriptor) = lease {
            debug!("freeing ephemeral subdivision descriptor");
            builder.free(descriptor);
        }
    }

    /// Frees every slot descriptor.
    pub fn invalidate<B>(&mut self, builder: &B)
    where
        B: DescriptorBuilder<Descriptor = D>,
    {
        for kind in [BackendKind::Cpu, BackendKind::Gpu] {
            if let Some(descriptor) = self.slots.take(kind) {
                debug!("freeing {kind} subdivision descriptor");
                builder.free(descriptor);
            }
        }
    }

    /// Tears the cache down, freeing all descriptors.
    pub fn free<B>(mut self, builder: &B)
    where
        B: DescriptorBuilder<Descriptor = D>,
    {
        self.invalidate(builder);
    }
}
