//! Pass manager for orchestrating compilation.

use tracing::{debug, info, instrument};

use crate::error::CompileResult;
use crate::graph::CommandDag;
use crate::pass::Pass;
use crate::passes::{DecomposeOps, MergeCommands};
use crate::target::OpSet;

/// Manages and executes a sequence of compilation passes.
pub struct PassManager {
    /// The passes to execute, in order.
    passes: Vec<Box<dyn Pass>>,
}

impl PassManager {
    /// Create a new empty pass manager.
    pub fn new() -> Self {
        Self { passes: vec![] }
    }

    /// Add a pass to the manager.
    pub fn add_pass(&mut self, pass: impl Pass + 'static) {
        self.passes.push(Box::new(pass));
    }

    /// Run all passes on the given DAG.
    #[instrument(skip(self, dag))]
    pub fn run(&self, dag: &mut CommandDag) -> CompileResult<()> {
        info!(
            "Running pass manager with {} passes on {} commands",
            self.passes.len(),
            dag.len()
        );

        for pass in &self.passes {
            if pass.should_run(dag) {
                debug!("Running pass: {}", pass.name());
                pass.run(dag)?;
                debug!("Pass {} completed, commands: {}", pass.name(), dag.len());
            } else {
                debug!("Skipping pass: {}", pass.name());
            }
        }

        info!("Pass manager completed, final commands: {}", dag.len());
        Ok(())
    }

    /// Get the number of passes.
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    /// Check if the manager has no passes.
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }
}

impl Default for PassManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for creating pass managers with preset configurations.
pub struct PassManagerBuilder {
    /// Target operation set, if compiling for a concrete backend.
    target: Option<OpSet>,
    /// Whether to run the merge pass.
    merging: bool,
}

impl PassManagerBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            target: None,
            merging: true,
        }
    }

    /// Set the target operation set, enabling the decomposition pass.
    #[must_use]
    pub fn with_target(mut self, target: OpSet) -> Self {
        self.target = Some(target);
        self
    }

    /// Enable or disable the merge pass.
    #[must_use]
    pub fn with_merging(mut self, merging: bool) -> Self {
        self.merging = merging;
        self
    }

    /// Build the pass manager.
    pub fn build(self) -> PassManager {
        let mut pm = PassManager::new();
        if let Some(target) = self.target {
            pm.add_pass(DecomposeOps::new(target));
        }
        if self.merging {
            pm.add_pass(MergeCommands::new());
        }
        pm
    }
}

impl Default for PassManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
