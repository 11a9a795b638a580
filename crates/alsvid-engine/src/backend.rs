//! The backend contract: what a numeric implementation must provide.

use num_complex::Complex64;

use alsvid_compile::OpSet;
use alsvid_ir::{ModeId, Scalar};

use crate::error::EngineResult;

/// A numeric backend executing elementary operations on register state.
///
/// The engine evaluates every parameter before calling in, so backends
/// only ever see concrete numbers. Measurement methods return the
/// sampled values; the *engine*, not the backend, records them into the
/// program registers.
pub trait Backend {
    /// Name of the backend.
    fn name(&self) -> &str;

    /// The operations this backend realizes directly. The engine
    /// compiles every program against this set before dispatching.
    fn native_ops(&self) -> OpSet;

    /// Reset backend state for a register of `num_modes` modes.
    fn begin(&mut self, num_modes: usize) -> EngineResult<()>;

    /// Prepare the vacuum state on a mode.
    fn prepare_vacuum(&mut self, mode: ModeId) -> EngineResult<()>;

    /// Prepare a coherent state with amplitude `alpha`.
    fn prepare_coherent(&mut self, alpha: Complex64, mode: ModeId) -> EngineResult<()>;

    /// Prepare a squeezed vacuum state.
    fn prepare_squeezed(&mut self, r: f64, phi: f64, mode: ModeId) -> EngineResult<()>;

    /// Prepare a displaced squeezed state.
    fn prepare_displaced_squeezed(
        &mut self,
        alpha: Complex64,
        r: f64,
        phi: f64,
        mode: ModeId,
    ) -> EngineResult<()>;

    /// Prepare the Fock state `|n⟩`.
    fn prepare_fock(&mut self, n: u64, mode: ModeId) -> EngineResult<()>;

    /// Prepare a thermal state with mean photon number `nbar`.
    fn prepare_thermal(&mut self, nbar: f64, mode: ModeId) -> EngineResult<()>;

    /// Rotate a mode in phase space.
    fn rotation(&mut self, phi: f64, mode: ModeId) -> EngineResult<()>;

    /// Displace a mode by `alpha`.
    fn displacement(&mut self, alpha: Complex64, mode: ModeId) -> EngineResult<()>;

    /// Squeeze a mode by the complex parameter `z`.
    fn squeeze(&mut self, z: Complex64, mode: ModeId) -> EngineResult<()>;

    /// Apply a beamsplitter across two modes.
    fn beamsplitter(&mut self, theta: f64, phi: f64, m1: ModeId, m2: ModeId) -> EngineResult<()>;

    /// Apply a loss channel with transmissivity `t`.
    fn loss(&mut self, t: f64, mode: ModeId) -> EngineResult<()>;

    /// Apply a thermal loss channel.
    fn thermal_loss(&mut self, t: f64, nbar: f64, mode: ModeId) -> EngineResult<()>;

    /// Measure modes in the photon-number basis, one result per mode.
    fn measure_fock(&mut self, modes: &[ModeId]) -> EngineResult<Vec<Scalar>>;

    /// Measure one quadrature of a mode at angle `phi`.
    fn measure_homodyne(&mut self, phi: f64, mode: ModeId) -> EngineResult<Scalar>;

    /// Heterodyne-measure a mode; the result may be complex.
    fn measure_heterodyne(&mut self, mode: ModeId) -> EngineResult<Scalar>;

    /// Release a mode.
    fn delete(&mut self, mode: ModeId) -> EngineResult<()>;
}
