//! Error types for the IR crate.

use crate::register::ModeId;
use thiserror::Error;

/// Errors raised while constructing programs and commands.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IrError {
    /// Mode not part of the program register.
    #[error("Mode {mode} not found in program{}", format_op_context(.op_name))]
    ModeNotFound {
        /// The mode that was not found.
        mode: ModeId,
        /// Optional operation name for context.
        op_name: Option<String>,
    },

    /// Mode has been released and cannot be used.
    #[error("Mode {mode} is inactive{}", format_op_context(.op_name))]
    InactiveMode {
        /// The inactive mode.
        mode: ModeId,
        /// Optional operation name for context.
        op_name: Option<String>,
    },

    /// Duplicate target mode within one command.
    #[error("Duplicate mode {mode} in operation{}", format_op_context(.op_name))]
    DuplicateMode {
        /// The duplicate mode.
        mode: ModeId,
        /// Optional operation name for context.
        op_name: Option<String>,
    },

    /// Operation requires a different number of target modes.
    #[error("Operation '{op_name}' acts on {expected} mode(s), got {got}")]
    ModeCountMismatch {
        /// Name of the operation.
        op_name: String,
        /// Expected number of modes.
        expected: u32,
        /// Actual number of modes provided.
        got: u32,
    },

    /// Operation applied to no modes at all.
    #[error("Operation '{op_name}' applied to an empty mode list")]
    EmptyTargets {
        /// Name of the operation.
        op_name: String,
    },

    /// Free parameter owned by a different program.
    #[error("Free parameter '{name}' belongs to another program")]
    ForeignParameter {
        /// Name of the parameter.
        name: String,
    },

    /// Binding a name that no free parameter of the program carries.
    #[error("Program owns no free parameter named '{name}'")]
    UnknownParameter {
        /// Name of the parameter.
        name: String,
    },

    /// Second write to a measurement slot.
    #[error("Mode {mode} already holds a measurement result")]
    MeasurementAlreadySet {
        /// The mode whose slot is already set.
        mode: ModeId,
    },

    /// Parameter evaluation failure.
    #[error(transparent)]
    Parameter(#[from] ParameterError),
}

/// Errors raised when a parameter is evaluated illegally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParameterError {
    /// A measured parameter was read before the measurement was performed.
    #[error("Measurement result of mode {mode} is not available yet")]
    MeasurementNotAvailable {
        /// The mode whose result is missing.
        mode: ModeId,
    },

    /// A free parameter survived to an evaluation that needs a number.
    #[error("Free parameter '{name}' is unbound")]
    UnboundParameter {
        /// Name of the unbound parameter.
        name: String,
    },
}

/// Helper function to format optional operation context.
#[allow(clippy::ref_option)]
fn format_op_context(op_name: &Option<String>) -> String {
    match op_name {
        Some(name) => format!(" (operation: {name})"),
        None => String::new(),
    }
}

/// Result type for IR operations.
pub type IrResult<T> = Result<T, IrError>;
