//! Target operation sets.
//!
//! An [`OpSet`] names the operations a backend realizes directly.
//! The decomposition pass expands everything outside the set.

use serde::{Deserialize, Serialize};

/// Native operations of a compilation target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpSet {
    /// Name of the target.
    name: String,
    /// Names of the natively supported operations.
    ops: Vec<String>,
}

impl OpSet {
    /// Create a new operation set.
    pub fn new(
        name: impl Into<String>,
        ops: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            ops: ops.into_iter().map(std::convert::Into::into).collect(),
        }
    }

    /// Name of the target.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check if an operation is native to the target.
    pub fn contains(&self, op: &str) -> bool {
        self.ops.iter().any(|o| o == op)
    }

    /// Get the native operation names.
    pub fn ops(&self) -> &[String] {
        &self.ops
    }

    /// Native set of a Gaussian backend: elementary Gaussian
    /// preparations, gates and channels, plus all measurements.
    /// Fock-state preparation is *not* included and has no
    /// decomposition, so programs using it fail to compile here.
    pub fn gaussian() -> Self {
        Self::new(
            "gaussian",
            [
                "vacuum",
                "coherent",
                "squeezed",
                "thermal",
                "rgate",
                "dgate",
                "sgate",
                "bsgate",
                "loss",
                "thermal_loss",
                "measure_fock",
                "measure_homodyne",
                "measure_heterodyne",
                "del",
            ],
        )
    }

    /// Native set of a Fock-basis backend.
    pub fn fock() -> Self {
        Self::new(
            "fock",
            [
                "vacuum",
                "coherent",
                "squeezed",
                "displaced_squeezed",
                "fock",
                "thermal",
                "rgate",
                "dgate",
                "sgate",
                "bsgate",
                "loss",
                "measure_fock",
                "measure_homodyne",
                "del",
            ],
        )
    }

    /// Every catalog operation; decomposition becomes a no-op.
    pub fn universal() -> Self {
        Self::new(
            "universal",
            [
                "vacuum",
                "coherent",
                "squeezed",
                "displaced_squeezed",
                "fock",
                "thermal",
                "rgate",
                "dgate",
                "sgate",
                "pgate",
                "bsgate",
                "mzgate",
                "s2gate",
                "cxgate",
                "czgate",
                "loss",
                "thermal_loss",
                "measure_fock",
                "measure_homodyne",
                "measure_heterodyne",
                "del",
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains() {
        let target = OpSet::gaussian();
        assert!(target.contains("bsgate"));
        assert!(!target.contains("mzgate"));
        assert!(!target.contains("fock"));
    }

    #[test]
    fn test_universal_covers_gaussian() {
        let universal = OpSet::universal();
        for op in OpSet::gaussian().ops() {
            assert!(universal.contains(op), "universal is missing '{op}'");
        }
    }
}
