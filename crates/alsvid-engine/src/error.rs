//! Error types for the engine crate.

use alsvid_compile::CompileError;
use alsvid_ir::{IrError, ParameterError};
use thiserror::Error;

/// Errors that can occur while running a program.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    /// Compilation of the program failed.
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// An IR-level error surfaced during execution.
    #[error(transparent)]
    Ir(#[from] IrError),

    /// Just-in-time parameter evaluation failed.
    ///
    /// The compiler's dependency graph makes this unreachable for
    /// correctly-compiled programs, so it signals a dependency-tracking
    /// bug rather than a recoverable condition.
    #[error(transparent)]
    Parameter(#[from] ParameterError),

    /// A parameter evaluated to a value the backend call cannot accept.
    #[error("Invalid parameter for '{op}': {reason}")]
    InvalidParameter {
        /// Name of the operation being dispatched.
        op: String,
        /// What was wrong with the value.
        reason: String,
    },

    /// The backend declared an operation native but the engine has no
    /// dispatch for it.
    #[error("No dispatch for operation '{op}'; it should have been decomposed")]
    NoDispatch {
        /// Name of the operation.
        op: String,
    },

    /// A measurement returned the wrong number of results.
    #[error("Measurement '{op}' returned {got} results for {expected} modes")]
    MeasurementArity {
        /// Name of the measurement operation.
        op: String,
        /// Number of measured modes.
        expected: usize,
        /// Number of results returned.
        got: usize,
    },

    /// Backend-reported failure.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
