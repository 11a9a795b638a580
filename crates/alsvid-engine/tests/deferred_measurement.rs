//! End-to-end tests: compile + execute with a scripted backend.
//!
//! The scripted backend records every call and replays queued
//! measurement results, which makes the deferred-measurement flow
//! observable: a parameter bound before the measurement exists must
//! evaluate to the sampled value by the time its gate is dispatched.

use std::collections::VecDeque;

use num_complex::Complex64;

use alsvid_compile::OpSet;
use alsvid_engine::{Backend, Engine, EngineError, EngineResult};
use alsvid_ir::{ModeId, Parameter, ParameterError, Program, Scalar};

/// Backend that logs calls and replays scripted measurement results.
#[derive(Default)]
struct ScriptedBackend {
    log: Vec<String>,
    displacements: Vec<(Complex64, ModeId)>,
    rotations: Vec<(f64, ModeId)>,
    homodyne_results: VecDeque<Scalar>,
    fock_results: VecDeque<Scalar>,
    heterodyne_results: VecDeque<Scalar>,
}

impl ScriptedBackend {
    fn pop(queue: &mut VecDeque<Scalar>, what: &str) -> EngineResult<Scalar> {
        queue
            .pop_front()
            .ok_or_else(|| EngineError::Backend(format!("script exhausted for {what}")))
    }
}

impl Backend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    fn native_ops(&self) -> OpSet {
        OpSet::gaussian()
    }

    fn begin(&mut self, num_modes: usize) -> EngineResult<()> {
        self.log.push(format!("begin({num_modes})"));
        Ok(())
    }

    fn prepare_vacuum(&mut self, mode: ModeId) -> EngineResult<()> {
        self.log.push(format!("prepare_vacuum({mode})"));
        Ok(())
    }

    fn prepare_coherent(&mut self, _alpha: Complex64, mode: ModeId) -> EngineResult<()> {
        self.log.push(format!("prepare_coherent({mode})"));
        Ok(())
    }

    fn prepare_squeezed(&mut self, _r: f64, _phi: f64, mode: ModeId) -> EngineResult<()> {
        self.log.push(format!("prepare_squeezed({mode})"));
        Ok(())
    }

    fn prepare_displaced_squeezed(
        &mut self,
        _alpha: Complex64,
        _r: f64,
        _phi: f64,
        mode: ModeId,
    ) -> EngineResult<()> {
        self.log.push(format!("prepare_displaced_squeezed({mode})"));
        Ok(())
    }

    fn prepare_fock(&mut self, n: u64, mode: ModeId) -> EngineResult<()> {
        self.log.push(format!("prepare_fock({n}, {mode})"));
        Ok(())
    }

    fn prepare_thermal(&mut self, _nbar: f64, mode: ModeId) -> EngineResult<()> {
        self.log.push(format!("prepare_thermal({mode})"));
        Ok(())
    }

    fn rotation(&mut self, phi: f64, mode: ModeId) -> EngineResult<()> {
        self.log.push(format!("rotation({mode})"));
        self.rotations.push((phi, mode));
        Ok(())
    }

    fn displacement(&mut self, alpha: Complex64, mode: ModeId) -> EngineResult<()> {
        self.log.push(format!("displacement({mode})"));
        self.displacements.push((alpha, mode));
        Ok(())
    }

    fn squeeze(&mut self, _z: Complex64, mode: ModeId) -> EngineResult<()> {
        self.log.push(format!("squeeze({mode})"));
        Ok(())
    }

    fn beamsplitter(&mut self, _theta: f64, _phi: f64, m1: ModeId, m2: ModeId) -> EngineResult<()> {
        self.log.push(format!("beamsplitter({m1}, {m2})"));
        Ok(())
    }

    fn loss(&mut self, _t: f64, mode: ModeId) -> EngineResult<()> {
        self.log.push(format!("loss({mode})"));
        Ok(())
    }

    fn thermal_loss(&mut self, _t: f64, _nbar: f64, mode: ModeId) -> EngineResult<()> {
        self.log.push(format!("thermal_loss({mode})"));
        Ok(())
    }

    fn measure_fock(&mut self, modes: &[ModeId]) -> EngineResult<Vec<Scalar>> {
        let mut out = Vec::with_capacity(modes.len());
        for mode in modes {
            self.log.push(format!("measure_fock({mode})"));
            out.push(Self::pop(&mut self.fock_results, "measure_fock")?);
        }
        Ok(out)
    }

    fn measure_homodyne(&mut self, _phi: f64, mode: ModeId) -> EngineResult<Scalar> {
        self.log.push(format!("measure_homodyne({mode})"));
        Self::pop(&mut self.homodyne_results, "measure_homodyne")
    }

    fn measure_heterodyne(&mut self, mode: ModeId) -> EngineResult<Scalar> {
        self.log.push(format!("measure_heterodyne({mode})"));
        Self::pop(&mut self.heterodyne_results, "measure_heterodyne")
    }

    fn delete(&mut self, mode: ModeId) -> EngineResult<()> {
        self.log.push(format!("delete({mode})"));
        Ok(())
    }
}

#[test]
fn test_deferred_displacement_receives_measured_value() {
    let mut prog = Program::new("teleport-half", 2);
    prog.squeezed(0.7, 0.0, ModeId(0)).unwrap();
    prog.measure_x(ModeId(0)).unwrap();
    let m = prog.measured(ModeId(0)).unwrap();
    prog.dgate(m * Parameter::fixed(2), 0.0, ModeId(1)).unwrap();

    let mut backend = ScriptedBackend::default();
    backend.homodyne_results.push_back(Scalar::Real(1.5));

    let mut engine = Engine::new(backend);
    engine.run(&mut prog).unwrap();

    // the measurement landed in the register
    assert_eq!(prog.registers().value(ModeId(0)), Some(Scalar::Real(1.5)));

    // and the displacement saw 2 * 1.5
    let backend = engine.backend();
    assert_eq!(backend.displacements.len(), 1);
    let (alpha, mode) = backend.displacements[0];
    assert_eq!(mode, ModeId(1));
    assert!((alpha - Complex64::new(3.0, 0.0)).norm() < 1e-12);
}

#[test]
fn test_measurement_dispatched_before_dependent_despite_interleaving() {
    let mut prog = Program::new("reorder", 3);
    prog.measure_x(ModeId(0)).unwrap();
    prog.rgate(0.7, ModeId(2)).unwrap();
    let m = prog.measured(ModeId(0)).unwrap();
    prog.dgate(m, 0.0, ModeId(1)).unwrap();

    let mut backend = ScriptedBackend::default();
    backend.homodyne_results.push_back(Scalar::Real(-0.25));

    let mut engine = Engine::new(backend);
    engine.run(&mut prog).unwrap();

    let log = &engine.backend().log;
    let measure_pos = log
        .iter()
        .position(|l| l.starts_with("measure_homodyne"))
        .unwrap();
    let displace_pos = log
        .iter()
        .position(|l| l.starts_with("displacement"))
        .unwrap();
    assert!(measure_pos < displace_pos);
}

#[test]
fn test_fock_result_integer_conversion() {
    let mut prog = Program::new("photon-count", 2);
    prog.measure_fock(&[ModeId(0)]).unwrap();
    let m = prog.measured(ModeId(0)).unwrap();
    prog.rgate(m, ModeId(1)).unwrap();

    let mut backend = ScriptedBackend::default();
    backend.fock_results.push_back(Scalar::Int(3));

    let mut engine = Engine::new(backend);
    engine.run(&mut prog).unwrap();

    assert_eq!(prog.registers().value(ModeId(0)), Some(Scalar::Int(3)));
    let (phi, _) = engine.backend().rotations[0];
    assert!((phi - 3.0).abs() < 1e-12);
}

#[test]
fn test_heterodyne_result_is_complex_and_rejected_where_real_needed() {
    let mut prog = Program::new("complex-angle", 2);
    prog.measure_heterodyne(ModeId(0)).unwrap();
    let m = prog.measured(ModeId(0)).unwrap();
    // a rotation angle must be real; a complex sample cannot feed it
    prog.rgate(m, ModeId(1)).unwrap();

    let mut backend = ScriptedBackend::default();
    backend
        .heterodyne_results
        .push_back(Scalar::Complex(Complex64::new(0.5, 0.25)));

    let mut engine = Engine::new(backend);
    let err = engine.run(&mut prog);
    assert!(matches!(err, Err(EngineError::InvalidParameter { .. })));
    // the measurement itself was recorded before the failure
    assert!(matches!(
        prog.registers().value(ModeId(0)),
        Some(Scalar::Complex(_))
    ));
}

#[test]
fn test_unbound_free_parameter_fails_then_bound_runs() {
    let mut prog = Program::new("variational", 1);
    let theta = prog.free("theta");
    prog.rgate(theta, ModeId(0)).unwrap();

    let mut engine = Engine::new(ScriptedBackend::default());
    let err = engine.run(&mut prog);
    assert!(matches!(
        err,
        Err(EngineError::Parameter(ParameterError::UnboundParameter { .. }))
    ));

    prog.bind("theta", 0.6).unwrap();
    let mut engine = Engine::new(ScriptedBackend::default());
    engine.run(&mut prog).unwrap();
    let (phi, _) = engine.backend().rotations[0];
    assert!((phi - 0.6).abs() < 1e-12);
}

#[test]
fn test_zero_leading_parameter_gate_is_skipped() {
    let mut prog = Program::new("identity", 1);
    prog.rgate(0.0, ModeId(0)).unwrap();
    prog.dgate(0.0, 0.3, ModeId(0)).unwrap();

    let mut engine = Engine::new(ScriptedBackend::default());
    engine.run(&mut prog).unwrap();

    let backend = engine.backend();
    assert!(backend.rotations.is_empty());
    assert!(backend.displacements.is_empty());
}

#[test]
fn test_delete_releases_backend_mode() {
    let mut prog = Program::new("release", 2);
    prog.rgate(0.5, ModeId(0)).unwrap();
    prog.delete(&[ModeId(0)]).unwrap();
    prog.rgate(0.5, ModeId(1)).unwrap();

    let mut engine = Engine::new(ScriptedBackend::default());
    engine.run(&mut prog).unwrap();
    assert!(engine.backend().log.contains(&"delete(q0)".to_string()));
}
