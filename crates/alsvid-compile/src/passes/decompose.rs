//! Decomposition pass: lower operations to a target's native set.

use tracing::trace;

use alsvid_ir::Command;

use crate::error::{CompileError, CompileResult};
use crate::graph::CommandDag;
use crate::pass::{Pass, PassKind};
use crate::target::OpSet;

/// Bound on recursive decomposition; real chains are two or three deep.
const MAX_DEPTH: usize = 32;

/// Rewrites the DAG so every operation is native to the target.
///
/// Each replaced command is expanded in place of its original position,
/// onto the exact target modes of the original, so the subsystem
/// dependency set of the program is unchanged.
pub struct DecomposeOps {
    target: OpSet,
}

impl DecomposeOps {
    /// Create a decomposition pass for the given target.
    pub fn new(target: OpSet) -> Self {
        Self { target }
    }

    fn expand(&self, cmd: Command, out: &mut Vec<Command>, depth: usize) -> CompileResult<()> {
        if self.target.contains(cmd.op().name()) {
            out.push(cmd);
            return Ok(());
        }
        if depth >= MAX_DEPTH {
            return Err(CompileError::RecursionLimit {
                op: cmd.op().name().to_string(),
            });
        }
        match cmd.op().decompose(cmd.modes()) {
            Some(replacement) => {
                trace!(
                    "decomposing '{}' into {} commands",
                    cmd.op().name(),
                    replacement.len()
                );
                for sub in replacement {
                    self.expand(sub, out, depth + 1)?;
                }
                Ok(())
            }
            None => Err(CompileError::UnsupportedOperation {
                op: cmd.op().name().to_string(),
                target: self.target.name().to_string(),
            }),
        }
    }
}

impl Pass for DecomposeOps {
    fn name(&self) -> &'static str {
        "DecomposeOps"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CommandDag) -> CompileResult<()> {
        let commands = dag.emit()?;
        let mut out = Vec::with_capacity(commands.len());
        for cmd in commands {
            self.expand(cmd, &mut out, 0)?;
        }
        *dag = CommandDag::from_commands(out);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alsvid_ir::{ModeId, Operation, Parameter};

    fn dag_of(commands: Vec<Command>) -> CommandDag {
        CommandDag::from_commands(commands)
    }

    #[test]
    fn test_native_ops_pass_through() {
        let mut dag = dag_of(vec![Command::new(
            Operation::Rgate(Parameter::fixed(0.5)),
            vec![ModeId(0)],
        )]);
        DecomposeOps::new(OpSet::gaussian()).run(&mut dag).unwrap();
        assert_eq!(dag.len(), 1);
    }

    #[test]
    fn test_mzgate_lowered_to_gaussian() {
        let mut dag = dag_of(vec![Command::new(
            Operation::MZgate(Parameter::fixed(0.4), Parameter::fixed(0.7)),
            vec![ModeId(0), ModeId(1)],
        )]);
        DecomposeOps::new(OpSet::gaussian()).run(&mut dag).unwrap();

        let names: Vec<_> = dag
            .emit()
            .unwrap()
            .iter()
            .map(|c| c.op().name().to_string())
            .collect();
        assert_eq!(names, ["rgate", "bsgate", "rgate", "bsgate"]);
    }

    #[test]
    fn test_czgate_lowered_recursively() {
        // czgate expands through cxgate, which is itself non-native
        let mut dag = dag_of(vec![Command::new(
            Operation::CZgate(Parameter::fixed(1)),
            vec![ModeId(0), ModeId(1)],
        )]);
        DecomposeOps::new(OpSet::gaussian()).run(&mut dag).unwrap();

        let target = OpSet::gaussian();
        for cmd in dag.emit().unwrap() {
            assert!(
                target.contains(cmd.op().name()),
                "'{}' left in lowered output",
                cmd.op().name()
            );
        }
    }

    #[test]
    fn test_unsupported_without_decomposition_fails() {
        let mut dag = dag_of(vec![Command::new(
            Operation::Fock(Parameter::fixed(2)),
            vec![ModeId(0)],
        )]);
        let err = DecomposeOps::new(OpSet::gaussian()).run(&mut dag);
        assert!(matches!(
            err,
            Err(CompileError::UnsupportedOperation { .. })
        ));
    }
}
