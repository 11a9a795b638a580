//! Top-level compilation entry point.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use alsvid_ir::{Command, Program};

use crate::error::CompileResult;
use crate::graph::CommandDag;
use crate::manager::PassManagerBuilder;
use crate::target::OpSet;

/// The result of compiling a program for a target.
///
/// Carries the emitted command sequence; an executor must dispatch the
/// commands in exactly this order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledProgram {
    name: String,
    target: String,
    commands: Vec<Command>,
}

impl CompiledProgram {
    /// Name of the source program.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the target the program was compiled for.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The emitted commands, in execution order.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Number of emitted commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Check if the compiled program is empty.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Compile a program for a target operation set.
///
/// Builds the command dependency graph, lowers non-native operations,
/// merges compatible neighbors and emits a stable topological order.
/// Compiling the same program twice yields identical output.
#[instrument(skip(program, target), fields(program = program.name(), target = target.name()))]
pub fn compile(program: &Program, target: &OpSet) -> CompileResult<CompiledProgram> {
    let mut dag = CommandDag::from_commands(program.commands().iter().cloned());

    let pm = PassManagerBuilder::new()
        .with_target(target.clone())
        .build();
    pm.run(&mut dag)?;

    let commands = dag.emit()?;
    debug!(
        "compiled '{}': {} commands in, {} out",
        program.name(),
        program.commands().len(),
        commands.len()
    );

    Ok(CompiledProgram {
        name: program.name().to_string(),
        target: target.name().to_string(),
        commands,
    })
}
