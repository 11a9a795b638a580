//! Commands: operations bound to specific target modes.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::operation::{OpClass, Operation};
use crate::register::ModeId;

/// An operation applied to an ordered tuple of target modes.
///
/// Commands are created during program construction and consumed, never
/// mutated, by the compiler. The measured-dependency list is computed
/// once at construction and kept sorted so graph building is
/// deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    op: Operation,
    modes: Vec<ModeId>,
    measured_deps: Vec<ModeId>,
}

impl Command {
    /// Bind an operation to its target modes.
    pub fn new(op: Operation, modes: Vec<ModeId>) -> Self {
        let mut measured_deps: Vec<ModeId> = op.measurement_deps().into_iter().collect();
        measured_deps.sort_unstable();
        Self {
            op,
            modes,
            measured_deps,
        }
    }

    /// The bound operation.
    #[inline]
    pub fn op(&self) -> &Operation {
        &self.op
    }

    /// The ordered target modes.
    #[inline]
    pub fn modes(&self) -> &[ModeId] {
        &self.modes
    }

    /// Modes whose measurement results this command's parameters read,
    /// sorted ascending.
    #[inline]
    pub fn measured_deps(&self) -> &[ModeId] {
        &self.measured_deps
    }

    /// Check if `mode` is one of the targets.
    #[inline]
    pub fn targets(&self, mode: ModeId) -> bool {
        self.modes.contains(&mode)
    }

    /// Check if this command's parameters depend on a measurement of `mode`.
    #[inline]
    pub fn depends_on(&self, mode: ModeId) -> bool {
        self.measured_deps.binary_search(&mode).is_ok()
    }

    /// Check if the command performs a measurement.
    #[inline]
    pub fn is_measurement(&self) -> bool {
        self.op.is_measurement()
    }

    /// The operation family.
    #[inline]
    pub fn class(&self) -> OpClass {
        self.op.class()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let targets: Vec<String> = self.modes.iter().map(|m| m.to_string()).collect();
        write!(f, "{} | ({})", self.op, targets.join(", "))
    }
}
