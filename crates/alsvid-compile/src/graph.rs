//! DAG representation of a command sequence.
//!
//! Each command is a node. Edges encode the minimum ordering
//! constraints: a *wire* edge links consecutive commands touching the
//! same mode, and a *measurement* edge links a measurement to every
//! later command whose parameters read its result. Commands with
//! disjoint targets and no measurement dependency between them are
//! unordered and commute freely.

use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use rustc_hash::FxHashMap;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

use alsvid_ir::{Command, ModeId, Operation};

use crate::error::{CompileError, CompileResult};

/// A node in the command DAG.
#[derive(Debug, Clone)]
pub struct DagNode {
    /// The command at this node.
    pub command: Command,
    /// Position of the command in the original program order; used to
    /// break topological ties deterministically.
    pub seq: usize,
}

/// An edge in the command DAG.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DagEdge {
    /// Subsystem ordering: both endpoints target this mode.
    Wire(ModeId),
    /// Causal ordering: the source measures this mode, the target's
    /// parameters read the result.
    Measurement(ModeId),
}

/// DAG over the commands of one program.
///
/// Built by a single scan of the command list. The `wire_front` and
/// `measure_front` indices give O(1) lookup of the previous command on
/// a mode and of the mode's most recent measurement.
///
/// The graph is a [`StableDiGraph`]: removing a node during a merge
/// pass leaves every other node index valid.
#[derive(Debug, Clone, Default)]
pub struct CommandDag {
    graph: StableDiGraph<DagNode, DagEdge>,
    wire_front: FxHashMap<ModeId, NodeIndex>,
    measure_front: FxHashMap<ModeId, NodeIndex>,
    next_seq: usize,
}

impl CommandDag {
    /// Create an empty DAG.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a DAG from commands in program order.
    pub fn from_commands(commands: impl IntoIterator<Item = Command>) -> Self {
        let mut dag = Self::new();
        for cmd in commands {
            dag.push(cmd);
        }
        dag
    }

    /// Append a command, adding its ordering edges.
    pub fn push(&mut self, command: Command) -> NodeIndex {
        let modes: Vec<ModeId> = command.modes().to_vec();
        let deps: Vec<ModeId> = command.measured_deps().to_vec();
        let is_measurement = command.is_measurement();

        let seq = self.next_seq;
        self.next_seq += 1;
        let node = self.graph.add_node(DagNode { command, seq });

        for &mode in &modes {
            if let Some(&prev) = self.wire_front.get(&mode) {
                self.graph.add_edge(prev, node, DagEdge::Wire(mode));
            }
            self.wire_front.insert(mode, node);
        }

        for &dep in &deps {
            // No edge if the mode has not been measured yet: the graph
            // places no constraint, and evaluation will fail at run time.
            if let Some(&src) = self.measure_front.get(&dep) {
                if src != node {
                    self.graph.add_edge(src, node, DagEdge::Measurement(dep));
                }
            }
        }

        if is_measurement {
            for &mode in &modes {
                self.measure_front.insert(mode, node);
            }
        }

        node
    }

    /// Number of command nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Check if the DAG holds no commands.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Get the command at a node.
    #[inline]
    pub fn command(&self, node: NodeIndex) -> Option<&Command> {
        self.graph.node_weight(node).map(|n| &n.command)
    }

    /// Get the original sequence index of a node.
    #[inline]
    pub fn seq(&self, node: NodeIndex) -> Option<usize> {
        self.graph.node_weight(node).map(|n| n.seq)
    }

    /// A reference to the underlying graph.
    pub fn graph(&self) -> &StableDiGraph<DagNode, DagEdge> {
        &self.graph
    }

    /// The next command on the wire of `mode` after `node`, if any.
    pub fn wire_successor(&self, node: NodeIndex, mode: ModeId) -> Option<NodeIndex> {
        self.graph
            .edges_directed(node, Direction::Outgoing)
            .find(|e| matches!(e.weight(), DagEdge::Wire(m) if *m == mode))
            .map(|e| e.target())
    }

    /// Replace the operation at a node, keeping its targets and its
    /// position in the graph.
    pub fn replace_op(&mut self, node: NodeIndex, op: Operation) -> CompileResult<()> {
        let n = self
            .graph
            .node_weight_mut(node)
            .ok_or(CompileError::InvalidNode)?;
        n.command = Command::new(op, n.command.modes().to_vec());
        Ok(())
    }

    /// Remove a command node, reconnecting the wires through it.
    ///
    /// Refuses to remove measurements and commands wired into
    /// measurement-dependency edges: the merge preconditions guarantee
    /// such nodes are never merged away, so hitting this is a pass bug.
    pub fn remove_op(&mut self, node: NodeIndex) -> CompileResult<Command> {
        let cmd = self.command(node).ok_or(CompileError::InvalidNode)?;
        if cmd.is_measurement() {
            return Err(CompileError::InvalidGraph(
                "cannot remove a measurement command".into(),
            ));
        }
        let modes: Vec<ModeId> = cmd.modes().to_vec();

        let has_measurement_edge = self
            .graph
            .edges_directed(node, Direction::Incoming)
            .chain(self.graph.edges_directed(node, Direction::Outgoing))
            .any(|e| matches!(e.weight(), DagEdge::Measurement(_)));
        if has_measurement_edge {
            return Err(CompileError::InvalidGraph(
                "cannot remove a command with measurement-dependency edges".into(),
            ));
        }

        let incoming: Vec<(NodeIndex, ModeId)> = self
            .graph
            .edges_directed(node, Direction::Incoming)
            .filter_map(|e| match e.weight() {
                DagEdge::Wire(m) => Some((e.source(), *m)),
                DagEdge::Measurement(_) => None,
            })
            .collect();
        let outgoing: Vec<(NodeIndex, ModeId)> = self
            .graph
            .edges_directed(node, Direction::Outgoing)
            .filter_map(|e| match e.weight() {
                DagEdge::Wire(m) => Some((e.target(), *m)),
                DagEdge::Measurement(_) => None,
            })
            .collect();

        // Reconnect each wire across the removed node.
        for &(pred, m) in &incoming {
            for &(succ, m2) in &outgoing {
                if m == m2 {
                    self.graph.add_edge(pred, succ, DagEdge::Wire(m));
                }
            }
        }

        // Update the wire front for modes whose front was this node.
        for &mode in &modes {
            if self.wire_front.get(&mode) == Some(&node) {
                match incoming.iter().find(|&&(_, m)| m == mode) {
                    Some(&(pred, _)) => {
                        self.wire_front.insert(mode, pred);
                    }
                    None => {
                        self.wire_front.remove(&mode);
                    }
                }
            }
        }

        let weight = self
            .graph
            .remove_node(node)
            .ok_or(CompileError::InvalidNode)?;
        Ok(weight.command)
    }

    /// Node indices in a stable topological order: ties are broken by
    /// original program position, so the result is deterministic.
    pub fn topo_nodes(&self) -> CompileResult<Vec<NodeIndex>> {
        let mut indegree: FxHashMap<NodeIndex, usize> = FxHashMap::default();
        for node in self.graph.node_indices() {
            indegree.insert(
                node,
                self.graph.edges_directed(node, Direction::Incoming).count(),
            );
        }

        let mut ready: BinaryHeap<Reverse<(usize, NodeIndex)>> = BinaryHeap::new();
        for (&node, &deg) in &indegree {
            if deg == 0 {
                ready.push(Reverse((self.graph[node].seq, node)));
            }
        }

        let mut order = Vec::with_capacity(indegree.len());
        while let Some(Reverse((_, node))) = ready.pop() {
            order.push(node);
            for edge in self.graph.edges_directed(node, Direction::Outgoing) {
                let target = edge.target();
                if let Some(deg) = indegree.get_mut(&target) {
                    *deg -= 1;
                    if *deg == 0 {
                        ready.push(Reverse((self.graph[target].seq, target)));
                    }
                }
            }
        }

        if order.len() != self.graph.node_count() {
            return Err(CompileError::CycleDetected);
        }
        Ok(order)
    }

    /// Emit the commands in the stable topological order.
    pub fn emit(&self) -> CompileResult<Vec<Command>> {
        Ok(self
            .topo_nodes()?
            .into_iter()
            .map(|n| self.graph[n].command.clone())
            .collect())
    }
}
