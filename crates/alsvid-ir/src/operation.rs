//! The operation catalog: preparations, gates, channels and measurements.
//!
//! Operations are templates: an operation bound to target modes becomes a
//! [`Command`](crate::command::Command). The numeric semantics live in
//! backends; the IR carries each operation's kind, arity, parameters and
//! the two optional capabilities the compiler uses: `decompose` (expand
//! into elementary operations) and `merge` (fuse with a compatible
//! neighbor on the same modes).

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};
use std::fmt;
use thiserror::Error;

use crate::command::Command;
use crate::parameter::Parameter;
use crate::register::ModeId;
use crate::scalar::Scalar;

/// The family an operation belongs to, which determines its merge rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpClass {
    /// Replaces the state of its target mode entirely.
    Preparation,
    /// Unitary transformation; merges by adding leading parameters.
    Gate,
    /// Non-unitary map; merges by multiplying leading parameters.
    Channel,
    /// Produces a measurement result; never merges.
    Measurement,
    /// Register bookkeeping; never merges.
    Meta,
}

/// A continuous-variable circuit operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    /// Prepare the vacuum state.
    Vacuum,
    /// Prepare a coherent state with amplitude `r·e^{iφ}`.
    Coherent(Parameter, Parameter),
    /// Prepare a squeezed vacuum state.
    Squeezed(Parameter, Parameter),
    /// Prepare a displaced squeezed state.
    DisplacedSqueezed(Parameter, Parameter, Parameter),
    /// Prepare a Fock (photon-number) state.
    Fock(Parameter),
    /// Prepare a thermal state with mean photon number `n̄`.
    Thermal(Parameter),

    /// Phase-space rotation.
    Rgate(Parameter),
    /// Displacement with amplitude `r·e^{iφ}`.
    Dgate(Parameter, Parameter),
    /// Single-mode squeezing.
    Sgate(Parameter, Parameter),
    /// Quadratic phase.
    Pgate(Parameter),
    /// Beamsplitter with transmittivity angle θ and phase φ.
    BSgate(Parameter, Parameter),
    /// Mach-Zehnder interferometer with external and internal phases.
    MZgate(Parameter, Parameter),
    /// Two-mode squeezing.
    S2gate(Parameter, Parameter),
    /// Controlled addition in the position basis.
    CXgate(Parameter),
    /// Controlled phase in the position basis.
    CZgate(Parameter),

    /// Loss channel with transmissivity `t`.
    LossChannel(Parameter),
    /// Loss channel coupled to a thermal environment.
    ThermalLossChannel(Parameter, Parameter),

    /// Photon-number measurement of any number of modes.
    MeasureFock,
    /// Homodyne measurement of the quadrature at angle φ.
    MeasureHomodyne(Parameter),
    /// Heterodyne measurement; its result is complex.
    MeasureHeterodyne,

    /// Release the target modes from the register.
    Delete,
}

/// Successful merge outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum Merged {
    /// The pair cancels to the identity; both commands can be dropped.
    Identity,
    /// The pair fuses into a single operation.
    Op(Operation),
}

/// Soft signal that two operations cannot be fused.
///
/// The compiler reacts by keeping both commands; this error is never
/// surfaced to callers of the compile entry point.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    /// The two operations are not of the same kind.
    #[error("Operations '{left}' and '{right}' are not the same kind")]
    DifferentKind {
        /// Name of the earlier operation.
        left: String,
        /// Name of the later operation.
        right: String,
    },

    /// The operation's family does not support merging.
    #[error("Operation '{op}' cannot be merged")]
    NotMergeable {
        /// Name of the operation.
        op: String,
    },

    /// The non-leading parameters of the pair differ.
    #[error("Trailing parameters of '{op}' differ")]
    ParameterMismatch {
        /// Name of the operation.
        op: String,
    },

    /// A side of the pair depends on measurement results.
    #[error("Operation '{op}' depends on measurement results")]
    MeasurementDependent {
        /// Name of the operation.
        op: String,
    },
}

impl Operation {
    /// Get the name of this operation.
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Vacuum => "vacuum",
            Operation::Coherent(_, _) => "coherent",
            Operation::Squeezed(_, _) => "squeezed",
            Operation::DisplacedSqueezed(_, _, _) => "displaced_squeezed",
            Operation::Fock(_) => "fock",
            Operation::Thermal(_) => "thermal",
            Operation::Rgate(_) => "rgate",
            Operation::Dgate(_, _) => "dgate",
            Operation::Sgate(_, _) => "sgate",
            Operation::Pgate(_) => "pgate",
            Operation::BSgate(_, _) => "bsgate",
            Operation::MZgate(_, _) => "mzgate",
            Operation::S2gate(_, _) => "s2gate",
            Operation::CXgate(_) => "cxgate",
            Operation::CZgate(_) => "czgate",
            Operation::LossChannel(_) => "loss",
            Operation::ThermalLossChannel(_, _) => "thermal_loss",
            Operation::MeasureFock => "measure_fock",
            Operation::MeasureHomodyne(_) => "measure_homodyne",
            Operation::MeasureHeterodyne => "measure_heterodyne",
            Operation::Delete => "del",
        }
    }

    /// Number of modes this operation acts on, `None` meaning any
    /// number of modes ≥ 1.
    #[inline]
    pub fn num_modes(&self) -> Option<u32> {
        match self {
            Operation::MeasureFock | Operation::Delete => None,
            Operation::BSgate(_, _)
            | Operation::MZgate(_, _)
            | Operation::S2gate(_, _)
            | Operation::CXgate(_)
            | Operation::CZgate(_) => Some(2),
            _ => Some(1),
        }
    }

    /// The family this operation belongs to.
    #[inline]
    pub fn class(&self) -> OpClass {
        match self {
            Operation::Vacuum
            | Operation::Coherent(_, _)
            | Operation::Squeezed(_, _)
            | Operation::DisplacedSqueezed(_, _, _)
            | Operation::Fock(_)
            | Operation::Thermal(_) => OpClass::Preparation,

            Operation::Rgate(_)
            | Operation::Dgate(_, _)
            | Operation::Sgate(_, _)
            | Operation::Pgate(_)
            | Operation::BSgate(_, _)
            | Operation::MZgate(_, _)
            | Operation::S2gate(_, _)
            | Operation::CXgate(_)
            | Operation::CZgate(_) => OpClass::Gate,

            Operation::LossChannel(_) | Operation::ThermalLossChannel(_, _) => OpClass::Channel,

            Operation::MeasureFock
            | Operation::MeasureHomodyne(_)
            | Operation::MeasureHeterodyne => OpClass::Measurement,

            Operation::Delete => OpClass::Meta,
        }
    }

    /// Check if this is a measurement.
    #[inline]
    pub fn is_measurement(&self) -> bool {
        self.class() == OpClass::Measurement
    }

    /// Check if this is a state preparation.
    #[inline]
    pub fn is_preparation(&self) -> bool {
        self.class() == OpClass::Preparation
    }

    /// Bound parameters, leading parameter first.
    pub fn parameters(&self) -> Vec<&Parameter> {
        match self {
            Operation::Vacuum
            | Operation::MeasureFock
            | Operation::MeasureHeterodyne
            | Operation::Delete => vec![],

            Operation::Fock(p)
            | Operation::Thermal(p)
            | Operation::Rgate(p)
            | Operation::Pgate(p)
            | Operation::CXgate(p)
            | Operation::CZgate(p)
            | Operation::LossChannel(p)
            | Operation::MeasureHomodyne(p) => vec![p],

            Operation::Coherent(a, b)
            | Operation::Squeezed(a, b)
            | Operation::Dgate(a, b)
            | Operation::Sgate(a, b)
            | Operation::BSgate(a, b)
            | Operation::MZgate(a, b)
            | Operation::S2gate(a, b)
            | Operation::ThermalLossChannel(a, b) => vec![a, b],

            Operation::DisplacedSqueezed(a, b, c) => vec![a, b, c],
        }
    }

    /// Check if any bound parameter requires deferred evaluation.
    pub fn is_parameterized(&self) -> bool {
        self.parameters().iter().any(|p| p.is_symbolic())
    }

    /// Modes whose measurement results this operation's parameters read.
    pub fn measurement_deps(&self) -> FxHashSet<ModeId> {
        let mut set = FxHashSet::default();
        for p in self.parameters() {
            set.extend(p.measurement_deps());
        }
        set
    }

    /// Rebuild the same operation kind with a new leading parameter.
    fn with_leading(&self, p: Parameter) -> Operation {
        match self {
            Operation::Fock(_) => Operation::Fock(p),
            Operation::Thermal(_) => Operation::Thermal(p),
            Operation::Rgate(_) => Operation::Rgate(p),
            Operation::Pgate(_) => Operation::Pgate(p),
            Operation::CXgate(_) => Operation::CXgate(p),
            Operation::CZgate(_) => Operation::CZgate(p),
            Operation::LossChannel(_) => Operation::LossChannel(p),
            Operation::Coherent(_, b) => Operation::Coherent(p, b.clone()),
            Operation::Squeezed(_, b) => Operation::Squeezed(p, b.clone()),
            Operation::Dgate(_, b) => Operation::Dgate(p, b.clone()),
            Operation::Sgate(_, b) => Operation::Sgate(p, b.clone()),
            Operation::BSgate(_, b) => Operation::BSgate(p, b.clone()),
            Operation::MZgate(_, b) => Operation::MZgate(p, b.clone()),
            Operation::S2gate(_, b) => Operation::S2gate(p, b.clone()),
            Operation::ThermalLossChannel(_, b) => Operation::ThermalLossChannel(p, b.clone()),
            Operation::DisplacedSqueezed(_, b, c) => {
                Operation::DisplacedSqueezed(p, b.clone(), c.clone())
            }
            _ => self.clone(),
        }
    }

    /// Rebuild the operation with every bound parameter passed through `f`.
    pub fn map_params(&self, f: impl Fn(&Parameter) -> Parameter) -> Operation {
        match self {
            Operation::Vacuum
            | Operation::MeasureFock
            | Operation::MeasureHeterodyne
            | Operation::Delete => self.clone(),

            Operation::Fock(p) => Operation::Fock(f(p)),
            Operation::Thermal(p) => Operation::Thermal(f(p)),
            Operation::Rgate(p) => Operation::Rgate(f(p)),
            Operation::Pgate(p) => Operation::Pgate(f(p)),
            Operation::CXgate(p) => Operation::CXgate(f(p)),
            Operation::CZgate(p) => Operation::CZgate(f(p)),
            Operation::LossChannel(p) => Operation::LossChannel(f(p)),
            Operation::MeasureHomodyne(p) => Operation::MeasureHomodyne(f(p)),

            Operation::Coherent(a, b) => Operation::Coherent(f(a), f(b)),
            Operation::Squeezed(a, b) => Operation::Squeezed(f(a), f(b)),
            Operation::Dgate(a, b) => Operation::Dgate(f(a), f(b)),
            Operation::Sgate(a, b) => Operation::Sgate(f(a), f(b)),
            Operation::BSgate(a, b) => Operation::BSgate(f(a), f(b)),
            Operation::MZgate(a, b) => Operation::MZgate(f(a), f(b)),
            Operation::S2gate(a, b) => Operation::S2gate(f(a), f(b)),
            Operation::ThermalLossChannel(a, b) => Operation::ThermalLossChannel(f(a), f(b)),

            Operation::DisplacedSqueezed(a, b, c) => {
                Operation::DisplacedSqueezed(f(a), f(b), f(c))
            }
        }
    }

    /// Merge with a later operation acting on the exact same modes.
    ///
    /// Neither operand is modified; a successful merge returns a fresh
    /// operation (or [`Merged::Identity`] when the pair cancels).
    pub fn merge(&self, other: &Operation) -> Result<Merged, MergeError> {
        // Sequential preparations: only the last one matters, even
        // across preparation kinds.
        if self.is_preparation() && other.is_preparation() {
            if !self.measurement_deps().is_empty() || !other.measurement_deps().is_empty() {
                return Err(MergeError::MeasurementDependent {
                    op: self.name().to_string(),
                });
            }
            return Ok(Merged::Op(other.clone()));
        }

        if std::mem::discriminant(self) != std::mem::discriminant(other) {
            return Err(MergeError::DifferentKind {
                left: self.name().to_string(),
                right: other.name().to_string(),
            });
        }

        match self.class() {
            OpClass::Measurement | OpClass::Meta => Err(MergeError::NotMergeable {
                op: self.name().to_string(),
            }),
            OpClass::Gate => self.merge_leading(other, std::ops::Add::add),
            OpClass::Channel => self.merge_leading(other, std::ops::Mul::mul),
            // handled above
            OpClass::Preparation => unreachable!("preparation merges are handled eagerly"),
        }
    }

    /// Shared merge body for gates (additive) and channels
    /// (multiplicative): combine leading parameters after
    /// equality-checking the rest.
    fn merge_leading(
        &self,
        other: &Operation,
        combine: fn(Parameter, Parameter) -> Parameter,
    ) -> Result<Merged, MergeError> {
        if !self.measurement_deps().is_empty() || !other.measurement_deps().is_empty() {
            // cannot do arithmetic on deferred measurement results here
            return Err(MergeError::MeasurementDependent {
                op: self.name().to_string(),
            });
        }

        let ps = self.parameters();
        let qs = other.parameters();
        let (Some(&p0), Some(&q0)) = (ps.first(), qs.first()) else {
            return Err(MergeError::NotMergeable {
                op: self.name().to_string(),
            });
        };
        if ps[1..] != qs[1..] {
            return Err(MergeError::ParameterMismatch {
                op: self.name().to_string(),
            });
        }

        let combined = combine(p0.clone(), q0.clone()).simplify();
        let identity_value = match self.class() {
            OpClass::Gate => Scalar::Int(0),
            _ => Scalar::Int(1),
        };
        if combined.const_value() == Some(identity_value) {
            return Ok(Merged::Identity);
        }
        Ok(Merged::Op(self.with_leading(combined)))
    }

    /// Expand into elementary operations, if a decomposition exists.
    ///
    /// The returned commands act only on the given target modes, so the
    /// replaced command's subsystem dependency set is preserved exactly.
    pub fn decompose(&self, modes: &[ModeId]) -> Option<Vec<Command>> {
        match (self, modes) {
            (Operation::DisplacedSqueezed(alpha, r, phi), &[m]) => Some(vec![
                Command::new(Operation::Squeezed(r.clone(), phi.clone()), vec![m]),
                Command::new(
                    Operation::Dgate(alpha.clone(), Parameter::fixed(0)),
                    vec![m],
                ),
            ]),
            (Operation::Pgate(s), &[m]) => {
                // into a squeeze and a rotation
                let temp = s.clone() / Parameter::fixed(2);
                let r = (Parameter::fixed(1) + temp.clone() * temp.clone())
                    .sqrt()
                    .acosh();
                let theta = temp.clone().atan();
                let phi = -(Parameter::fixed(FRAC_PI_2) * temp.sign()) - theta.clone();
                Some(vec![
                    Command::new(Operation::Sgate(r.simplify(), phi.simplify()), vec![m]),
                    Command::new(Operation::Rgate(theta.simplify()), vec![m]),
                ])
            }
            (Operation::MZgate(phi_ex, phi_in), &[a, b]) => {
                // into local phase shifts and two 50-50 beamsplitters
                let bs = || {
                    Operation::BSgate(
                        Parameter::fixed(FRAC_PI_4),
                        Parameter::fixed(FRAC_PI_2),
                    )
                };
                Some(vec![
                    Command::new(Operation::Rgate(phi_ex.clone()), vec![a]),
                    Command::new(bs(), vec![a, b]),
                    Command::new(Operation::Rgate(phi_in.clone()), vec![a]),
                    Command::new(bs(), vec![a, b]),
                ])
            }
            (Operation::S2gate(r, phi), &[a, b]) => {
                // two opposite squeezers sandwiched between 50% beamsplitters
                Some(vec![
                    Command::new(
                        Operation::BSgate(Parameter::fixed(FRAC_PI_4), Parameter::fixed(0)),
                        vec![a, b],
                    ),
                    Command::new(Operation::Sgate(r.clone(), phi.clone()), vec![a]),
                    Command::new(Operation::Sgate(-r.clone(), phi.clone()), vec![b]),
                    Command::new(
                        Operation::BSgate(-Parameter::fixed(FRAC_PI_4), Parameter::fixed(0)),
                        vec![a, b],
                    ),
                ])
            }
            (Operation::CXgate(s), &[a, b]) => {
                let r = (-(s.clone()) / Parameter::fixed(2)).asinh();
                let theta = (-(Parameter::fixed(1) / r.clone().cosh()))
                    .atan2(-r.clone().tanh())
                    * Parameter::fixed(0.5);
                Some(vec![
                    Command::new(
                        Operation::BSgate(theta.clone().simplify(), Parameter::fixed(0)),
                        vec![a, b],
                    ),
                    Command::new(
                        Operation::Sgate(r.clone().simplify(), Parameter::fixed(0)),
                        vec![a],
                    ),
                    Command::new(
                        Operation::Sgate((-r).simplify(), Parameter::fixed(0)),
                        vec![b],
                    ),
                    Command::new(
                        Operation::BSgate(
                            (theta + Parameter::fixed(FRAC_PI_2)).simplify(),
                            Parameter::fixed(0),
                        ),
                        vec![a, b],
                    ),
                ])
            }
            (Operation::CZgate(s), &[a, b]) => {
                // phase-rotated controlled addition
                Some(vec![
                    Command::new(
                        Operation::Rgate(Parameter::fixed(-FRAC_PI_2)),
                        vec![b],
                    ),
                    Command::new(Operation::CXgate(s.clone()), vec![a, b]),
                    Command::new(Operation::Rgate(Parameter::fixed(FRAC_PI_2)), vec![b]),
                ])
            }
            _ => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // homodyne measurements at the two canonical angles have
        // shorthand names
        if let Operation::MeasureHomodyne(phi) = self {
            match phi.const_value() {
                Some(v) if v == Scalar::Int(0) => return write!(f, "MeasureX"),
                Some(v) if v == Scalar::Real(FRAC_PI_2) => return write!(f, "MeasureP"),
                _ => {}
            }
        }

        let display_name = match self {
            Operation::Vacuum => "Vacuum",
            Operation::Coherent(_, _) => "Coherent",
            Operation::Squeezed(_, _) => "Squeezed",
            Operation::DisplacedSqueezed(_, _, _) => "DisplacedSqueezed",
            Operation::Fock(_) => "Fock",
            Operation::Thermal(_) => "Thermal",
            Operation::Rgate(_) => "Rgate",
            Operation::Dgate(_, _) => "Dgate",
            Operation::Sgate(_, _) => "Sgate",
            Operation::Pgate(_) => "Pgate",
            Operation::BSgate(_, _) => "BSgate",
            Operation::MZgate(_, _) => "MZgate",
            Operation::S2gate(_, _) => "S2gate",
            Operation::CXgate(_) => "CXgate",
            Operation::CZgate(_) => "CZgate",
            Operation::LossChannel(_) => "LossChannel",
            Operation::ThermalLossChannel(_, _) => "ThermalLossChannel",
            Operation::MeasureFock => "MeasureFock",
            Operation::MeasureHomodyne(_) => "MeasureHomodyne",
            Operation::MeasureHeterodyne => "MeasureHeterodyne",
            Operation::Delete => "Del",
        };
        let params = self.parameters();
        if params.is_empty() {
            write!(f, "{display_name}")
        } else {
            let rendered: Vec<String> = params.iter().map(|p| p.to_string()).collect();
            write!(f, "{display_name}({})", rendered.join(", "))
        }
    }
}
