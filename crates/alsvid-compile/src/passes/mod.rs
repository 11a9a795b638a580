//! Built-in compilation passes.
//!
//! - [`DecomposeOps`]: expand operations outside the target set into
//!   elementary operations
//! - [`MergeCommands`]: fuse wire-adjacent compatible commands

pub mod decompose;
pub mod merge;

pub use decompose::DecomposeOps;
pub use merge::MergeCommands;
