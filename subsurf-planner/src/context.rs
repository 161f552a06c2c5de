//! Per evaluation context.
//!
//! Nothing in this crate reads global state. Whatever a modifier needs to
//! know about the scene, the process and its place in the stack is passed in
//! through a [`ModifierEvalContext`].
use crate::settings::SceneLimits;
use crate::stack::StackSnapshot;

/// What the current evaluation is for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EvalFlags {
    /// Evaluating for a final render.
    pub render: bool,
    /// The result is applied to the original data (modifier apply, deform
    /// queries). Rules out deferring work to the draw code.
    pub apply_to_original: bool,
}

impl EvalFlags {
    /// Interactive viewport evaluation.
    pub const VIEWPORT: EvalFlags = EvalFlags {
        render: false,
        apply_to_original: false,
    };

    /// Final render evaluation.
    pub const RENDER: EvalFlags = EvalFlags {
        render: true,
        apply_to_original: false,
    };
}

/// Process wide facts that influence evaluation strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EvalEnvironment {
    /// Running without a UI (batch/background). Nothing guarantees a later
    /// draw pass.
    pub headless: bool,
    /// The user enabled GPU subdivision.
    pub gpu_subdivision: bool,
    /// The GPU backend can run the subdivision compute kernels.
    pub gpu_compute: bool,
}

impl Default for EvalEnvironment {
    fn default() -> Self {
        Self {
            headless: false,
            gpu_subdivision: true,
            gpu_compute: true,
        }
    }
}

impl EvalEnvironment {
    /// A background process without GPU.
    pub fn headless() -> Self {
        Self {
            headless: true,
            gpu_subdivision: false,
            gpu_compute: false,
        }
    }

    /// Whether GPU subdivision may be used at all, ignoring mesh state.
    #[inline]
    pub fn gpu_subdivision_available(&self) -> bool {
        self.gpu_subdivision && self.gpu_compute
    }
}

/// Everything a modifier sees during one evaluation.
pub struct ModifierEvalContext<'a, B> {
    pub flags: EvalFlags,
    pub scene: &'a SceneLimits,
    pub environment: &'a EvalEnvironment,
    /// The subdivision backend (descriptor builder and mesh realizer).
    pub backend: &'a B,
    /// Enablement of every modifier in the stack, captured before the pass.
    pub stack: &'a StackSnapshot,
    /// Position of the evaluated modifier in the stack.
    pub index: usize,
}
