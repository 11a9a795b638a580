//! Error types for the compilation crate.

use alsvid_ir::IrError;
use thiserror::Error;

/// Errors that can occur during compilation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompileError {
    /// An IR-level error surfaced during compilation.
    #[error(transparent)]
    Ir(#[from] IrError),

    /// Operation outside the target set with no decomposition.
    #[error("Operation '{op}' is not supported by target '{target}' and has no decomposition")]
    UnsupportedOperation {
        /// Name of the operation.
        op: String,
        /// Name of the target operation set.
        target: String,
    },

    /// Recursive decomposition failed to bottom out.
    #[error("Decomposition of '{op}' exceeded the recursion limit")]
    RecursionLimit {
        /// Name of the operation.
        op: String,
    },

    /// The command graph contains a dependency cycle.
    #[error("Dependency cycle detected in command graph")]
    CycleDetected,

    /// Invalid node index.
    #[error("Invalid node index")]
    InvalidNode,

    /// Structurally invalid command graph.
    #[error("Invalid command graph: {0}")]
    InvalidGraph(String),
}

/// Result type for compilation operations.
pub type CompileResult<T> = Result<T, CompileError>;
