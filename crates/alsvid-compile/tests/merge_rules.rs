//! Integration tests for merge behavior through the full compile path.

use alsvid_compile::{CompileError, OpSet, compile};
use alsvid_ir::{ModeId, Operation, Program, Scalar};

#[test]
fn test_adjacent_rotations_fuse() {
    let mut prog = Program::new("fuse", 1);
    prog.rgate(0.25, ModeId(0)).unwrap();
    prog.rgate(0.5, ModeId(0)).unwrap();

    let compiled = compile(&prog, &OpSet::gaussian()).unwrap();
    assert_eq!(compiled.len(), 1);
    match compiled.commands()[0].op() {
        Operation::Rgate(p) => {
            let v = p.const_value().unwrap().as_complex().re;
            assert!((v - 0.75).abs() < 1e-12);
        }
        other => panic!("unexpected op: {other:?}"),
    }
}

#[test]
fn test_preparation_overwrite_through_compile() {
    let mut prog = Program::new("overwrite", 1);
    prog.squeezed(0.5, 0.0, ModeId(0)).unwrap();
    prog.coherent(1.0, 0.0, ModeId(0)).unwrap();
    prog.measure_x(ModeId(0)).unwrap();

    let compiled = compile(&prog, &OpSet::gaussian()).unwrap();
    let names: Vec<_> = compiled
        .commands()
        .iter()
        .map(|c| c.op().name())
        .collect();
    assert_eq!(names, ["coherent", "measure_homodyne"]);
}

#[test]
fn test_measured_parameter_gates_are_never_fused() {
    let mut prog = Program::new("no-fuse", 2);
    prog.measure_x(ModeId(0)).unwrap();
    let m = prog.measured(ModeId(0)).unwrap();
    prog.rgate(m.clone(), ModeId(1)).unwrap();
    prog.rgate(m, ModeId(1)).unwrap();

    let compiled = compile(&prog, &OpSet::gaussian()).unwrap();
    let rotations = compiled
        .commands()
        .iter()
        .filter(|c| c.op().name() == "rgate")
        .count();
    assert_eq!(rotations, 2, "measured-parameter gates must stay separate");
}

#[test]
fn test_measured_parameter_preparation_not_overwritten() {
    let mut prog = Program::new("prep-dep", 2);
    prog.measure_x(ModeId(0)).unwrap();
    let m = prog.measured(ModeId(0)).unwrap();
    prog.coherent(m, 0.0, ModeId(1)).unwrap();
    prog.vacuum(ModeId(1)).unwrap();

    let compiled = compile(&prog, &OpSet::gaussian()).unwrap();
    let preps = compiled
        .commands()
        .iter()
        .filter(|c| c.op().is_preparation())
        .count();
    assert_eq!(preps, 2, "dependent preparation must not be discarded");
}

#[test]
fn test_free_parameter_gates_fuse_symbolically() {
    let mut prog = Program::new("symbolic-fuse", 1);
    let theta = prog.free("theta");
    prog.rgate(theta.clone(), ModeId(0)).unwrap();
    prog.rgate(theta, ModeId(0)).unwrap();

    let compiled = compile(&prog, &OpSet::gaussian()).unwrap();
    assert_eq!(compiled.len(), 1);
    let Operation::Rgate(p) = compiled.commands()[0].op() else {
        panic!("unexpected op");
    };
    assert!(p.is_symbolic(), "fused leading parameter stays symbolic");
}

#[test]
fn test_lowered_chain_is_fully_native() {
    let mut prog = Program::new("mz-chain", 2);
    prog.mzgate(0.1, 0.2, ModeId(0), ModeId(1)).unwrap();
    prog.mzgate(0.3, 0.4, ModeId(0), ModeId(1)).unwrap();

    let compiled = compile(&prog, &OpSet::gaussian()).unwrap();
    for cmd in compiled.commands() {
        assert!(
            OpSet::gaussian().contains(cmd.op().name()),
            "non-native op '{}' in output",
            cmd.op().name()
        );
    }
}

#[test]
fn test_unsupported_op_surfaces_compile_error() {
    let mut prog = Program::new("fock-on-gaussian", 1);
    prog.fock(2, ModeId(0)).unwrap();

    let err = compile(&prog, &OpSet::gaussian());
    assert!(matches!(
        err,
        Err(CompileError::UnsupportedOperation { .. })
    ));

    // the same program is fine on a Fock-basis target
    let compiled = compile(&prog, &OpSet::fock()).unwrap();
    assert_eq!(compiled.len(), 1);
    assert_eq!(
        compiled.commands()[0].op().parameters()[0].const_value(),
        Some(Scalar::Int(2))
    );
}

#[test]
fn test_delete_blocks_reuse_but_compiles() {
    let mut prog = Program::new("del", 2);
    prog.rgate(0.5, ModeId(0)).unwrap();
    prog.delete(&[ModeId(0)]).unwrap();
    prog.rgate(0.5, ModeId(1)).unwrap();

    let compiled = compile(&prog, &OpSet::gaussian()).unwrap();
    let names: Vec<_> = compiled
        .commands()
        .iter()
        .map(|c| c.op().name())
        .collect();
    assert_eq!(names, ["rgate", "del", "rgate"]);
}
