//! Register references: addressable subsystem slots and their measurement state.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{IrError, IrResult};
use crate::scalar::Scalar;

/// Unique identifier for a mode (subsystem) within a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModeId(pub u32);

impl fmt::Display for ModeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q{}", self.0)
    }
}

impl From<u32> for ModeId {
    fn from(id: u32) -> Self {
        ModeId(id)
    }
}

impl From<usize> for ModeId {
    fn from(id: usize) -> Self {
        ModeId(u32::try_from(id).expect("ModeId overflow: exceeds u32::MAX"))
    }
}

/// A reference to one subsystem slot of the register.
///
/// Holds the mode's activity flag and, once the mode has been measured,
/// the recorded measurement result. The result is written exactly once,
/// by the executor, and never reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegRef {
    ind: ModeId,
    active: bool,
    val: Option<Scalar>,
}

impl RegRef {
    /// Create an active reference with no recorded measurement.
    pub fn new(ind: ModeId) -> Self {
        Self {
            ind,
            active: true,
            val: None,
        }
    }

    /// The mode this reference addresses.
    #[inline]
    pub fn ind(&self) -> ModeId {
        self.ind
    }

    /// Whether the mode is still part of the active register.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// The recorded measurement result, if the mode has been measured.
    #[inline]
    pub fn val(&self) -> Option<Scalar> {
        self.val
    }
}

impl fmt::Display for RegRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ind)
    }
}

/// The register table of a program: one [`RegRef`] per allocated mode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Registers {
    refs: Vec<RegRef>,
}

impl Registers {
    /// Create a table with `num_modes` active modes.
    pub fn new(num_modes: u32) -> Self {
        let refs = (0..num_modes).map(|i| RegRef::new(ModeId(i))).collect();
        Self { refs }
    }

    /// Allocate a fresh mode and return its id.
    pub fn add_mode(&mut self) -> ModeId {
        let id = ModeId(u32::try_from(self.refs.len()).expect("mode count exceeds u32::MAX"));
        self.refs.push(RegRef::new(id));
        id
    }

    /// Number of allocated modes (active or not).
    #[inline]
    pub fn num_modes(&self) -> usize {
        self.refs.len()
    }

    /// Whether the table is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    /// Whether `mode` has been allocated.
    #[inline]
    pub fn contains(&self, mode: ModeId) -> bool {
        (mode.0 as usize) < self.refs.len()
    }

    /// Look up a reference.
    pub fn get(&self, mode: ModeId) -> IrResult<&RegRef> {
        self.refs
            .get(mode.0 as usize)
            .ok_or(IrError::ModeNotFound {
                mode,
                op_name: None,
            })
    }

    /// The recorded measurement result for `mode`, if any.
    ///
    /// Returns `None` both for unknown modes and for modes that have not
    /// been measured; deferred evaluation treats the two identically.
    #[inline]
    pub fn value(&self, mode: ModeId) -> Option<Scalar> {
        self.refs.get(mode.0 as usize).and_then(RegRef::val)
    }

    /// Record a measurement result. The slot is write-once.
    pub fn record_measurement(&mut self, mode: ModeId, value: Scalar) -> IrResult<()> {
        let r = self
            .refs
            .get_mut(mode.0 as usize)
            .ok_or(IrError::ModeNotFound {
                mode,
                op_name: None,
            })?;
        if !r.active {
            return Err(IrError::InactiveMode {
                mode,
                op_name: None,
            });
        }
        if r.val.is_some() {
            return Err(IrError::MeasurementAlreadySet { mode });
        }
        r.val = Some(value);
        Ok(())
    }

    /// Release a mode: it keeps any recorded measurement result but can
    /// no longer be targeted by new commands.
    pub fn delete(&mut self, mode: ModeId) -> IrResult<()> {
        let r = self
            .refs
            .get_mut(mode.0 as usize)
            .ok_or(IrError::ModeNotFound {
                mode,
                op_name: None,
            })?;
        if !r.active {
            return Err(IrError::InactiveMode {
                mode,
                op_name: None,
            });
        }
        r.active = false;
        Ok(())
    }

    /// Iterate over allocated mode ids.
    pub fn modes(&self) -> impl Iterator<Item = ModeId> + '_ {
        self.refs.iter().map(RegRef::ind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_display() {
        assert_eq!(format!("{}", ModeId(0)), "q0");
        assert_eq!(format!("{}", ModeId(7)), "q7");
    }

    #[test]
    fn test_fresh_register_state() {
        let regs = Registers::new(2);
        assert_eq!(regs.num_modes(), 2);
        let r = regs.get(ModeId(1)).unwrap();
        assert!(r.is_active());
        assert_eq!(r.val(), None);
    }

    #[test]
    fn test_record_measurement_once() {
        let mut regs = Registers::new(1);
        regs.record_measurement(ModeId(0), Scalar::Int(2)).unwrap();
        assert_eq!(regs.value(ModeId(0)), Some(Scalar::Int(2)));

        let err = regs.record_measurement(ModeId(0), Scalar::Int(3));
        assert!(matches!(err, Err(IrError::MeasurementAlreadySet { .. })));
        // first value untouched
        assert_eq!(regs.value(ModeId(0)), Some(Scalar::Int(2)));
    }

    #[test]
    fn test_delete_keeps_value() {
        let mut regs = Registers::new(1);
        regs.record_measurement(ModeId(0), Scalar::Real(0.5)).unwrap();
        regs.delete(ModeId(0)).unwrap();
        assert!(!regs.get(ModeId(0)).unwrap().is_active());
        assert_eq!(regs.value(ModeId(0)), Some(Scalar::Real(0.5)));

        // deleting again is an error
        assert!(matches!(
            regs.delete(ModeId(0)),
            Err(IrError::InactiveMode { .. })
        ));
    }

    #[test]
    fn test_unknown_mode() {
        let regs = Registers::new(1);
        assert!(matches!(
            regs.get(ModeId(5)),
            Err(IrError::ModeNotFound { .. })
        ));
    }
}
