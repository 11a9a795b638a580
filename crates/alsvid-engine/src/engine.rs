//! Sequential execution of compiled programs.

use num_complex::Complex64;
use tracing::{debug, instrument};

use alsvid_compile::{CompiledProgram, compile};
use alsvid_ir::{Command, OpClass, Operation, Parameter, Program, Scalar};

use crate::backend::Backend;
use crate::error::{EngineError, EngineResult};

/// Drives a backend through a compiled program.
///
/// The engine is the only component that mutates register state: it
/// walks the emitted command list strictly in order, evaluates each
/// command's parameters against the program registers immediately
/// before dispatch, and records measurement results as they arrive.
pub struct Engine<B: Backend> {
    backend: B,
}

impl<B: Backend> Engine<B> {
    /// Create an engine around a backend.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// The wrapped backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable access to the wrapped backend.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Consume the engine, returning the backend.
    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Compile the program for this backend and execute it.
    ///
    /// Measurement results are recorded into the program's registers,
    /// so later inspection (and re-runs of dependent sub-programs) see
    /// the sampled values.
    #[instrument(skip(self, program), fields(program = program.name(), backend = self.backend.name()))]
    pub fn run(&mut self, program: &mut Program) -> EngineResult<CompiledProgram> {
        let target = self.backend.native_ops();
        let compiled = compile(program, &target)?;

        self.backend.begin(program.num_modes())?;
        for cmd in compiled.commands() {
            self.exec(cmd, program)?;
        }
        Ok(compiled)
    }

    fn exec(&mut self, cmd: &Command, program: &mut Program) -> EngineResult<()> {
        let op = cmd.op();
        let modes = cmd.modes();

        // A gate whose leading parameter evaluates to zero is the
        // identity; skip the backend call entirely.
        if op.class() == OpClass::Gate {
            if let Some(&p0) = op.parameters().first() {
                if self.eval(p0, program)?.is_zero() {
                    debug!("skipping identity gate '{}'", op.name());
                    return Ok(());
                }
            }
        }

        match op {
            Operation::Vacuum => self.backend.prepare_vacuum(modes[0]),
            Operation::Coherent(r, phi) => {
                let alpha = self.eval_amplitude(r, phi, program, op.name())?;
                self.backend.prepare_coherent(alpha, modes[0])
            }
            Operation::Squeezed(r, phi) => {
                let r = self.eval_real(r, program, op.name())?;
                let phi = self.eval_real(phi, program, op.name())?;
                self.backend.prepare_squeezed(r, phi, modes[0])
            }
            Operation::DisplacedSqueezed(alpha, r, phi) => {
                let alpha = self.eval(alpha, program)?.as_complex();
                let r = self.eval_real(r, program, op.name())?;
                let phi = self.eval_real(phi, program, op.name())?;
                self.backend
                    .prepare_displaced_squeezed(alpha, r, phi, modes[0])
            }
            Operation::Fock(n) => {
                let n = self.eval_natural(n, program, op.name())?;
                self.backend.prepare_fock(n, modes[0])
            }
            Operation::Thermal(nbar) => {
                let nbar = self.eval_real(nbar, program, op.name())?;
                self.backend.prepare_thermal(nbar, modes[0])
            }

            Operation::Rgate(theta) => {
                let theta = self.eval_real(theta, program, op.name())?;
                self.backend.rotation(theta, modes[0])
            }
            Operation::Dgate(r, phi) => {
                let alpha = self.eval_amplitude(r, phi, program, op.name())?;
                self.backend.displacement(alpha, modes[0])
            }
            Operation::Sgate(r, phi) => {
                let z = self.eval_amplitude(r, phi, program, op.name())?;
                self.backend.squeeze(z, modes[0])
            }
            Operation::BSgate(theta, phi) => {
                let theta = self.eval_real(theta, program, op.name())?;
                let phi = self.eval_real(phi, program, op.name())?;
                self.backend.beamsplitter(theta, phi, modes[0], modes[1])
            }

            Operation::LossChannel(t) => {
                let t = self.eval_real(t, program, op.name())?;
                self.backend.loss(t, modes[0])
            }
            Operation::ThermalLossChannel(t, nbar) => {
                let t = self.eval_real(t, program, op.name())?;
                let nbar = self.eval_real(nbar, program, op.name())?;
                self.backend.thermal_loss(t, nbar, modes[0])
            }

            Operation::MeasureFock => {
                let values = self.backend.measure_fock(modes)?;
                if values.len() != modes.len() {
                    return Err(EngineError::MeasurementArity {
                        op: op.name().to_string(),
                        expected: modes.len(),
                        got: values.len(),
                    });
                }
                for (&mode, value) in modes.iter().zip(values) {
                    program.registers_mut().record_measurement(mode, value)?;
                }
                Ok(())
            }
            Operation::MeasureHomodyne(phi) => {
                let phi = self.eval_real(phi, program, op.name())?;
                let value = self.backend.measure_homodyne(phi, modes[0])?;
                program.registers_mut().record_measurement(modes[0], value)?;
                Ok(())
            }
            Operation::MeasureHeterodyne => {
                let value = self.backend.measure_heterodyne(modes[0])?;
                program.registers_mut().record_measurement(modes[0], value)?;
                Ok(())
            }

            Operation::Delete => {
                // the register slot was released at construction time;
                // only the backend still holds the mode
                for &mode in modes {
                    self.backend.delete(mode)?;
                }
                Ok(())
            }

            Operation::Pgate(_)
            | Operation::MZgate(_, _)
            | Operation::S2gate(_, _)
            | Operation::CXgate(_)
            | Operation::CZgate(_) => Err(EngineError::NoDispatch {
                op: op.name().to_string(),
            }),
        }
    }

    #[allow(clippy::unused_self)]
    fn eval(&self, p: &Parameter, program: &Program) -> EngineResult<Scalar> {
        Ok(p.evaluate(program.registers())?)
    }

    fn eval_real(&self, p: &Parameter, program: &Program, op: &str) -> EngineResult<f64> {
        self.eval(p, program)?
            .as_f64()
            .ok_or_else(|| EngineError::InvalidParameter {
                op: op.to_string(),
                reason: "expected a real value".to_string(),
            })
    }

    fn eval_natural(&self, p: &Parameter, program: &Program, op: &str) -> EngineResult<u64> {
        let value = self.eval(p, program)?;
        value
            .as_i64()
            .and_then(|n| u64::try_from(n).ok())
            .ok_or_else(|| EngineError::InvalidParameter {
                op: op.to_string(),
                reason: "expected a non-negative integer".to_string(),
            })
    }

    /// Evaluate a polar (magnitude, phase) parameter pair into the
    /// complex amplitude `r·e^{iφ}`.
    fn eval_amplitude(
        &self,
        r: &Parameter,
        phi: &Parameter,
        program: &Program,
        op: &str,
    ) -> EngineResult<Complex64> {
        let r = self.eval(r, program)?.as_complex();
        let phi = self.eval_real(phi, program, op)?;
        Ok(r * Complex64::from_polar(1.0, phi))
    }
}
