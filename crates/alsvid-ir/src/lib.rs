//! Alsvid Circuit Intermediate Representation
//!
//! This crate provides the core data structures for representing
//! continuous-variable photonic circuit programs in Alsvid. It forms the
//! foundation of the compilation stack.
//!
//! # Overview
//!
//! A program is an ordered list of [`Command`]s: operations bound to
//! register modes. Operation parameters are first-class values: a
//! parameter is either a fixed number, a deferred measurement result, a
//! free (unbound) placeholder, or any arithmetic combination of these.
//! The dependency information carried by parameters is what lets the
//! compiler reorder and merge commands without ever moving a command
//! ahead of a measurement it depends on.
//!
//! # Core Components
//!
//! - **Modes and registers**: [`ModeId`], [`RegRef`], [`Registers`] for
//!   addressing subsystems and tracking their measurement state
//! - **Scalars**: [`Scalar`] for concrete integer/real/complex values
//! - **Parameters**: [`Parameter`] for fixed, measured and free
//!   parameters and their symbolic composition
//! - **Operations**: [`Operation`] for the preparation/gate/channel/
//!   measurement catalog with its merge and decompose capabilities
//! - **Commands**: [`Command`] binding an operation to target modes
//! - **Programs**: [`Program`] as the construction context and circuit
//!   container
//!
//! # Example: a deferred-measurement program
//!
//! ```rust
//! use alsvid_ir::{ModeId, Parameter, Program};
//!
//! let mut prog = Program::new("teleport-half", 2);
//!
//! // entangle, then measure mode 0
//! prog.squeezed(0.7, 0.0, ModeId(0)).unwrap();
//! prog.bsgate(0.25, 0.0, ModeId(0), ModeId(1)).unwrap();
//! prog.measure_x(ModeId(0)).unwrap();
//!
//! // displace mode 1 by twice the measurement result of mode 0
//! let m = prog.measured(ModeId(0)).unwrap();
//! prog.dgate(m * Parameter::fixed(2), 0.0, ModeId(1)).unwrap();
//!
//! let cmd = prog.commands().last().unwrap();
//! assert_eq!(cmd.measured_deps(), &[ModeId(0)]);
//! ```
//!
//! # Operation catalog
//!
//! | Operation | Modes | Class |
//! |-----------|-------|-------|
//! | `Vacuum`, `Coherent`, `Squeezed`, `DisplacedSqueezed`, `Fock`, `Thermal` | 1 | preparation |
//! | `Rgate`, `Dgate`, `Sgate`, `Pgate` | 1 | gate |
//! | `BSgate`, `MZgate`, `S2gate`, `CXgate`, `CZgate` | 2 | gate |
//! | `LossChannel`, `ThermalLossChannel` | 1 | channel |
//! | `MeasureFock` | any | measurement |
//! | `MeasureHomodyne`, `MeasureHeterodyne` | 1 | measurement |
//! | `Del` | any | meta |

pub mod command;
pub mod error;
pub mod operation;
pub mod parameter;
pub mod program;
pub mod register;
pub mod scalar;

pub use command::Command;
pub use error::{IrError, IrResult, ParameterError};
pub use operation::{MergeError, Merged, OpClass, Operation};
pub use parameter::{BinaryFn, FreeParameter, Parameter, UnaryFn, evaluate_all};
pub use program::Program;
pub use register::{ModeId, RegRef, Registers};
pub use scalar::Scalar;
