//! Merge pass: fuse wire-adjacent compatible commands.

use petgraph::stable_graph::NodeIndex;
use rustc_hash::FxHashSet;
use tracing::trace;

use alsvid_ir::Merged;

use crate::error::CompileResult;
use crate::graph::CommandDag;
use crate::pass::{Pass, PassKind};

/// Bound on merge rounds; each round strictly shrinks the DAG.
const MAX_ITERATIONS: usize = 100;

/// Fuses chains of directly-connected commands on the same single mode.
///
/// The actual merge rules live in [`alsvid_ir::Operation::merge`]: gates
/// add leading parameters, channels multiply them, and a later state
/// preparation overwrites an earlier one. Merge incompatibility is a
/// soft signal; the pair is simply kept.
pub struct MergeCommands;

impl MergeCommands {
    /// Create a new merge pass.
    pub fn new() -> Self {
        Self
    }

    /// Find disjoint wire-adjacent pairs that can be merged this round.
    #[allow(clippy::unused_self)]
    fn find_mergeable(
        &self,
        dag: &CommandDag,
    ) -> CompileResult<Vec<(NodeIndex, NodeIndex, Merged)>> {
        let mut merges = Vec::new();
        let mut processed: FxHashSet<NodeIndex> = FxHashSet::default();

        for node in dag.topo_nodes()? {
            if processed.contains(&node) {
                continue;
            }
            let Some(cmd) = dag.command(node) else {
                continue;
            };
            if cmd.modes().len() != 1 {
                continue;
            }
            let mode = cmd.modes()[0];

            let Some(succ) = dag.wire_successor(node, mode) else {
                continue;
            };
            if processed.contains(&succ) {
                continue;
            }
            let Some(succ_cmd) = dag.command(succ) else {
                continue;
            };
            if succ_cmd.modes().len() != 1 {
                continue;
            }

            match cmd.op().merge(succ_cmd.op()) {
                Ok(outcome) => {
                    processed.insert(node);
                    processed.insert(succ);
                    merges.push((node, succ, outcome));
                }
                Err(reason) => {
                    // soft failure: keep both commands
                    trace!("merge rejected on {mode}: {reason}");
                }
            }
        }

        Ok(merges)
    }
}

impl Default for MergeCommands {
    fn default() -> Self {
        Self::new()
    }
}

impl Pass for MergeCommands {
    fn name(&self) -> &'static str {
        "MergeCommands"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CommandDag) -> CompileResult<()> {
        for _ in 0..MAX_ITERATIONS {
            let merges = self.find_mergeable(dag)?;
            if merges.is_empty() {
                break;
            }

            for (first, second, outcome) in merges {
                match outcome {
                    Merged::Op(op) => {
                        dag.remove_op(second)?;
                        dag.replace_op(first, op)?;
                    }
                    Merged::Identity => {
                        dag.remove_op(second)?;
                        dag.remove_op(first)?;
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alsvid_ir::{Command, ModeId, Operation, Parameter, Scalar};

    fn run_merge(commands: Vec<Command>) -> Vec<Command> {
        let mut dag = CommandDag::from_commands(commands);
        MergeCommands::new().run(&mut dag).unwrap();
        dag.emit().unwrap()
    }

    #[test]
    fn test_chain_of_rotations_collapses() {
        let out = run_merge(vec![
            Command::new(Operation::Rgate(Parameter::fixed(0.1)), vec![ModeId(0)]),
            Command::new(Operation::Rgate(Parameter::fixed(0.2)), vec![ModeId(0)]),
            Command::new(Operation::Rgate(Parameter::fixed(0.3)), vec![ModeId(0)]),
        ]);
        assert_eq!(out.len(), 1);
        match out[0].op() {
            Operation::Rgate(p) => {
                let v = p.const_value().unwrap().as_complex().re;
                assert!((v - 0.6).abs() < 1e-12);
            }
            other => panic!("unexpected op: {other:?}"),
        }
    }

    #[test]
    fn test_inverse_pair_cancels_entirely() {
        let out = run_merge(vec![
            Command::new(
                Operation::Sgate(Parameter::fixed(0.4), Parameter::fixed(0.0)),
                vec![ModeId(0)],
            ),
            Command::new(
                Operation::Sgate(Parameter::fixed(-0.4), Parameter::fixed(0.0)),
                vec![ModeId(0)],
            ),
        ]);
        assert!(out.is_empty());
    }

    #[test]
    fn test_measurement_blocks_merge() {
        let out = run_merge(vec![
            Command::new(Operation::Rgate(Parameter::fixed(0.1)), vec![ModeId(0)]),
            Command::new(
                Operation::MeasureHomodyne(Parameter::fixed(0)),
                vec![ModeId(0)],
            ),
            Command::new(Operation::Rgate(Parameter::fixed(0.2)), vec![ModeId(0)]),
        ]);
        assert_eq!(out.len(), 3, "gates across a measurement must survive");
    }

    #[test]
    fn test_two_mode_gates_untouched() {
        let out = run_merge(vec![
            Command::new(
                Operation::BSgate(Parameter::fixed(0.1), Parameter::fixed(0.0)),
                vec![ModeId(0), ModeId(1)],
            ),
            Command::new(
                Operation::BSgate(Parameter::fixed(0.2), Parameter::fixed(0.0)),
                vec![ModeId(0), ModeId(1)],
            ),
        ]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_loss_channels_multiply() {
        let out = run_merge(vec![
            Command::new(Operation::LossChannel(Parameter::fixed(0.9)), vec![ModeId(0)]),
            Command::new(Operation::LossChannel(Parameter::fixed(0.9)), vec![ModeId(0)]),
        ]);
        assert_eq!(out.len(), 1);
        match out[0].op() {
            Operation::LossChannel(p) => {
                let v = p.const_value().unwrap().as_complex().re;
                assert!((v - 0.81).abs() < 1e-12);
            }
            other => panic!("unexpected op: {other:?}"),
        }
    }

    #[test]
    fn test_preparation_overwrite_keeps_later() {
        let out = run_merge(vec![
            Command::new(
                Operation::Squeezed(Parameter::fixed(0.5), Parameter::fixed(0.0)),
                vec![ModeId(0)],
            ),
            Command::new(
                Operation::Coherent(Parameter::fixed(1.0), Parameter::fixed(0.0)),
                vec![ModeId(0)],
            ),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].op().name(), "coherent");
        assert_eq!(
            out[0].op().parameters()[0].const_value(),
            Some(Scalar::Real(1.0))
        );
    }

    #[test]
    fn test_interleaved_modes_merge_independently() {
        // q0: 0.1 then 0.2; q1: 0.3 then 0.4, interleaved in program order
        let out = run_merge(vec![
            Command::new(Operation::Rgate(Parameter::fixed(0.1)), vec![ModeId(0)]),
            Command::new(Operation::Rgate(Parameter::fixed(0.3)), vec![ModeId(1)]),
            Command::new(Operation::Rgate(Parameter::fixed(0.2)), vec![ModeId(0)]),
            Command::new(Operation::Rgate(Parameter::fixed(0.4)), vec![ModeId(1)]),
        ]);
        assert_eq!(out.len(), 2);
        let mut angles: Vec<(u32, f64)> = out
            .iter()
            .map(|c| {
                let Operation::Rgate(p) = c.op() else {
                    panic!("unexpected op");
                };
                (c.modes()[0].0, p.const_value().unwrap().as_complex().re)
            })
            .collect();
        angles.sort_by(|a, b| a.0.cmp(&b.0));
        assert!((angles[0].1 - 0.3).abs() < 1e-12);
        assert!((angles[1].1 - 0.7).abs() < 1e-12);
    }
}
