//! Alsvid Execution Engine
//!
//! This crate defines the consumption contract between the compiled
//! command stream and a numeric backend, and the sequential [`Engine`]
//! that drives it.
//!
//! # Overview
//!
//! The engine compiles a program against the backend's native
//! operation set, then scans the emitted commands strictly in order.
//! For each command it evaluates the bound parameters just-in-time
//! (a parameter depending on an earlier measurement reads the value
//! recorded moments before) and dispatches one backend call. The
//! engine is the only writer of register measurement slots.
//!
//! Execution is single-threaded and synchronous; there is no retry,
//! cancellation or timeout machinery at this layer. All errors
//! propagate to the caller.
//!
//! # Writing a backend
//!
//! Implement the [`Backend`] trait: one method per elementary
//! operation, measurement methods returning [`alsvid_ir::Scalar`]
//! values, and [`Backend::native_ops`] naming what the backend
//! realizes directly. Everything outside that set is decomposed by the
//! compiler before the engine ever sees it.

pub mod backend;
pub mod engine;
pub mod error;

pub use backend::Backend;
pub use engine::Engine;
pub use error::{EngineError, EngineResult};
