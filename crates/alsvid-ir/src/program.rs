//! Program construction: the explicit context commands are appended to.
//!
//! A [`Program`] owns its register table, its ordered command list and
//! its free parameters. Operations are applied through
//! [`Program::apply`] (or the fluent per-operation builder methods),
//! which validates targets eagerly: arity, duplicates, activity and
//! parameter ownership are all checked at the call site, never deferred
//! to compile or run time.

use rustc_hash::{FxHashMap, FxHashSet};
use std::f64::consts::FRAC_PI_2;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::command::Command;
use crate::error::{IrError, IrResult};
use crate::operation::Operation;
use crate::parameter::{FreeParameter, Parameter};
use crate::register::{ModeId, Registers};
use crate::scalar::Scalar;

/// Process-wide program id counter, used to pin free parameters to
/// their owning program.
static NEXT_PROGRAM_ID: AtomicU64 = AtomicU64::new(0);

/// An ordered sequence of commands over a register of modes.
#[derive(Debug)]
pub struct Program {
    name: String,
    id: u64,
    registers: Registers,
    circuit: Vec<Command>,
    free_params: FxHashMap<String, FreeParameter>,
}

impl Program {
    /// Create a program with `num_modes` active modes.
    pub fn new(name: impl Into<String>, num_modes: u32) -> Self {
        Self {
            name: name.into(),
            id: NEXT_PROGRAM_ID.fetch_add(1, Ordering::Relaxed),
            registers: Registers::new(num_modes),
            circuit: vec![],
            free_params: FxHashMap::default(),
        }
    }

    /// Name of the program.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of allocated modes.
    pub fn num_modes(&self) -> usize {
        self.registers.num_modes()
    }

    /// The register table.
    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    /// Mutable register table. The executor uses this to record
    /// measurement results; construction code has no business here.
    pub fn registers_mut(&mut self) -> &mut Registers {
        &mut self.registers
    }

    /// The commands appended so far, in program order.
    pub fn commands(&self) -> &[Command] {
        &self.circuit
    }

    /// Allocate a fresh mode.
    pub fn add_mode(&mut self) -> ModeId {
        self.registers.add_mode()
    }

    /// Create (or return the existing) free parameter with this name,
    /// owned by this program.
    pub fn free(&mut self, name: impl Into<String>) -> Parameter {
        let name = name.into();
        let fp = self
            .free_params
            .entry(name.clone())
            .or_insert_with(|| FreeParameter {
                owner: self.id,
                name,
            });
        Parameter::Free(fp.clone())
    }

    /// A measured parameter reading the (future) measurement result of
    /// `mode`. Fails for unknown or released modes.
    pub fn measured(&self, mode: ModeId) -> IrResult<Parameter> {
        Parameter::measured(self.registers.get(mode)?)
    }

    /// Apply an operation to target modes, appending a command.
    pub fn apply(&mut self, op: Operation, modes: &[ModeId]) -> IrResult<()> {
        if modes.is_empty() {
            return Err(IrError::EmptyTargets {
                op_name: op.name().to_string(),
            });
        }
        if let Some(expected) = op.num_modes() {
            if modes.len() != expected as usize {
                return Err(IrError::ModeCountMismatch {
                    op_name: op.name().to_string(),
                    expected,
                    got: u32::try_from(modes.len()).unwrap_or(u32::MAX),
                });
            }
        }

        let mut seen = FxHashSet::default();
        for &mode in modes {
            if !seen.insert(mode) {
                return Err(IrError::DuplicateMode {
                    mode,
                    op_name: Some(op.name().to_string()),
                });
            }
            if !self.registers.contains(mode) {
                return Err(IrError::ModeNotFound {
                    mode,
                    op_name: Some(op.name().to_string()),
                });
            }
            if !self.registers.get(mode)?.is_active() {
                return Err(IrError::InactiveMode {
                    mode,
                    op_name: Some(op.name().to_string()),
                });
            }
        }

        // Measured parameters may outlive the deletion of their mode,
        // but must at least reference a mode of this program.
        for dep in op.measurement_deps() {
            if !self.registers.contains(dep) {
                return Err(IrError::ModeNotFound {
                    mode: dep,
                    op_name: Some(op.name().to_string()),
                });
            }
        }

        for p in op.parameters() {
            for fp in p.free_atoms() {
                if fp.owner != self.id {
                    return Err(IrError::ForeignParameter {
                        name: fp.name.clone(),
                    });
                }
            }
        }

        let is_delete = matches!(op, Operation::Delete);
        self.circuit.push(Command::new(op, modes.to_vec()));
        if is_delete {
            for &mode in modes {
                self.registers.delete(mode)?;
            }
        }
        Ok(())
    }

    /// Bind an owned free parameter to a concrete value across the
    /// whole circuit.
    pub fn bind(&mut self, name: &str, value: impl Into<Scalar>) -> IrResult<()> {
        if !self.free_params.contains_key(name) {
            return Err(IrError::UnknownParameter {
                name: name.to_string(),
            });
        }
        let value = value.into();
        for cmd in &mut self.circuit {
            let op = cmd.op().map_params(|p| p.bind(name, value));
            *cmd = Command::new(op, cmd.modes().to_vec());
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Fluent builders
    // ------------------------------------------------------------------

    /// Prepare the vacuum state on `mode`.
    pub fn vacuum(&mut self, mode: ModeId) -> IrResult<&mut Self> {
        self.apply(Operation::Vacuum, &[mode])?;
        Ok(self)
    }

    /// Prepare a coherent state on `mode`.
    pub fn coherent(
        &mut self,
        r: impl Into<Parameter>,
        phi: impl Into<Parameter>,
        mode: ModeId,
    ) -> IrResult<&mut Self> {
        self.apply(Operation::Coherent(r.into(), phi.into()), &[mode])?;
        Ok(self)
    }

    /// Prepare a squeezed vacuum state on `mode`.
    pub fn squeezed(
        &mut self,
        r: impl Into<Parameter>,
        phi: impl Into<Parameter>,
        mode: ModeId,
    ) -> IrResult<&mut Self> {
        self.apply(Operation::Squeezed(r.into(), phi.into()), &[mode])?;
        Ok(self)
    }

    /// Prepare a displaced squeezed state on `mode`.
    pub fn displaced_squeezed(
        &mut self,
        alpha: impl Into<Parameter>,
        r: impl Into<Parameter>,
        phi: impl Into<Parameter>,
        mode: ModeId,
    ) -> IrResult<&mut Self> {
        self.apply(
            Operation::DisplacedSqueezed(alpha.into(), r.into(), phi.into()),
            &[mode],
        )?;
        Ok(self)
    }

    /// Prepare a Fock state on `mode`.
    pub fn fock(&mut self, n: impl Into<Parameter>, mode: ModeId) -> IrResult<&mut Self> {
        self.apply(Operation::Fock(n.into()), &[mode])?;
        Ok(self)
    }

    /// Prepare a thermal state on `mode`.
    pub fn thermal(&mut self, nbar: impl Into<Parameter>, mode: ModeId) -> IrResult<&mut Self> {
        self.apply(Operation::Thermal(nbar.into()), &[mode])?;
        Ok(self)
    }

    /// Apply a phase-space rotation to `mode`.
    pub fn rgate(&mut self, theta: impl Into<Parameter>, mode: ModeId) -> IrResult<&mut Self> {
        self.apply(Operation::Rgate(theta.into()), &[mode])?;
        Ok(self)
    }

    /// Apply a displacement to `mode`.
    pub fn dgate(
        &mut self,
        r: impl Into<Parameter>,
        phi: impl Into<Parameter>,
        mode: ModeId,
    ) -> IrResult<&mut Self> {
        self.apply(Operation::Dgate(r.into(), phi.into()), &[mode])?;
        Ok(self)
    }

    /// Apply single-mode squeezing to `mode`.
    pub fn sgate(
        &mut self,
        r: impl Into<Parameter>,
        phi: impl Into<Parameter>,
        mode: ModeId,
    ) -> IrResult<&mut Self> {
        self.apply(Operation::Sgate(r.into(), phi.into()), &[mode])?;
        Ok(self)
    }

    /// Apply a quadratic phase to `mode`.
    pub fn pgate(&mut self, s: impl Into<Parameter>, mode: ModeId) -> IrResult<&mut Self> {
        self.apply(Operation::Pgate(s.into()), &[mode])?;
        Ok(self)
    }

    /// Apply a beamsplitter to a pair of modes.
    pub fn bsgate(
        &mut self,
        theta: impl Into<Parameter>,
        phi: impl Into<Parameter>,
        m1: ModeId,
        m2: ModeId,
    ) -> IrResult<&mut Self> {
        self.apply(Operation::BSgate(theta.into(), phi.into()), &[m1, m2])?;
        Ok(self)
    }

    /// Apply a Mach-Zehnder interferometer to a pair of modes.
    pub fn mzgate(
        &mut self,
        phi_ex: impl Into<Parameter>,
        phi_in: impl Into<Parameter>,
        m1: ModeId,
        m2: ModeId,
    ) -> IrResult<&mut Self> {
        self.apply(Operation::MZgate(phi_ex.into(), phi_in.into()), &[m1, m2])?;
        Ok(self)
    }

    /// Apply two-mode squeezing to a pair of modes.
    pub fn s2gate(
        &mut self,
        r: impl Into<Parameter>,
        phi: impl Into<Parameter>,
        m1: ModeId,
        m2: ModeId,
    ) -> IrResult<&mut Self> {
        self.apply(Operation::S2gate(r.into(), phi.into()), &[m1, m2])?;
        Ok(self)
    }

    /// Apply a controlled addition to a pair of modes.
    pub fn cxgate(
        &mut self,
        s: impl Into<Parameter>,
        m1: ModeId,
        m2: ModeId,
    ) -> IrResult<&mut Self> {
        self.apply(Operation::CXgate(s.into()), &[m1, m2])?;
        Ok(self)
    }

    /// Apply a controlled phase to a pair of modes.
    pub fn czgate(
        &mut self,
        s: impl Into<Parameter>,
        m1: ModeId,
        m2: ModeId,
    ) -> IrResult<&mut Self> {
        self.apply(Operation::CZgate(s.into()), &[m1, m2])?;
        Ok(self)
    }

    /// Apply a loss channel to `mode`.
    pub fn loss(&mut self, t: impl Into<Parameter>, mode: ModeId) -> IrResult<&mut Self> {
        self.apply(Operation::LossChannel(t.into()), &[mode])?;
        Ok(self)
    }

    /// Apply a thermal loss channel to `mode`.
    pub fn thermal_loss(
        &mut self,
        t: impl Into<Parameter>,
        nbar: impl Into<Parameter>,
        mode: ModeId,
    ) -> IrResult<&mut Self> {
        self.apply(Operation::ThermalLossChannel(t.into(), nbar.into()), &[mode])?;
        Ok(self)
    }

    /// Measure modes in the photon-number basis.
    pub fn measure_fock(&mut self, modes: &[ModeId]) -> IrResult<&mut Self> {
        self.apply(Operation::MeasureFock, modes)?;
        Ok(self)
    }

    /// Homodyne-measure the quadrature of `mode` at angle `phi`.
    pub fn measure_homodyne(
        &mut self,
        phi: impl Into<Parameter>,
        mode: ModeId,
    ) -> IrResult<&mut Self> {
        self.apply(Operation::MeasureHomodyne(phi.into()), &[mode])?;
        Ok(self)
    }

    /// Measure the position quadrature of `mode`.
    pub fn measure_x(&mut self, mode: ModeId) -> IrResult<&mut Self> {
        self.measure_homodyne(Parameter::fixed(0), mode)
    }

    /// Measure the momentum quadrature of `mode`.
    pub fn measure_p(&mut self, mode: ModeId) -> IrResult<&mut Self> {
        self.measure_homodyne(Parameter::fixed(FRAC_PI_2), mode)
    }

    /// Heterodyne-measure `mode`.
    pub fn measure_heterodyne(&mut self, mode: ModeId) -> IrResult<&mut Self> {
        self.apply(Operation::MeasureHeterodyne, &[mode])?;
        Ok(self)
    }

    /// Release modes from the register.
    pub fn delete(&mut self, modes: &[ModeId]) -> IrResult<&mut Self> {
        self.apply(Operation::Delete, modes)?;
        Ok(self)
    }
}
