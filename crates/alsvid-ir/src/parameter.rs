//! Operation parameters: fixed values and deferred symbolic expressions.
//!
//! A [`Parameter`] is either an immediate numeric value or an expression
//! tree over two kinds of symbolic atoms: *measured* parameters, which
//! read a register's measurement result when evaluated, and *free*
//! parameters, which are named placeholders owned by one program.
//! Arithmetic on parameters builds composite nodes, so an operation can
//! be bound to e.g. `2 * q0.par + theta` long before either atom has a
//! numeric value.

use num_complex::Complex64;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{IrResult, ParameterError};
use crate::register::{ModeId, RegRef, Registers};
use crate::scalar::Scalar;

/// A named symbolic placeholder owned by exactly one program.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FreeParameter {
    pub(crate) owner: u64,
    pub(crate) name: String,
}

impl FreeParameter {
    /// Name of the parameter.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Unary functions available in parameter expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryFn {
    /// Negation.
    Neg,
    /// Sign (zero maps to zero).
    Sign,
    /// Sine.
    Sin,
    /// Cosine.
    Cos,
    /// Square root.
    Sqrt,
    /// Exponential.
    Exp,
    /// Hyperbolic cosine.
    Cosh,
    /// Hyperbolic tangent.
    Tanh,
    /// Inverse hyperbolic sine.
    Asinh,
    /// Inverse hyperbolic cosine.
    Acosh,
    /// Inverse tangent.
    Atan,
}

/// Binary functions available in parameter expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryFn {
    /// Addition.
    Add,
    /// Subtraction.
    Sub,
    /// Multiplication.
    Mul,
    /// Division.
    Div,
    /// Exponentiation.
    Pow,
    /// Two-argument arctangent (real parts).
    Atan2,
}

/// A symbolic or concrete operation parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Parameter {
    /// An immediate numeric value.
    Fixed(Scalar),
    /// A deferred measurement result of one mode.
    Measured(ModeId),
    /// A named unbound placeholder.
    Free(FreeParameter),
    /// A unary function applied to a subexpression.
    Unary(UnaryFn, Box<Parameter>),
    /// A binary function applied to two subexpressions.
    Binary(BinaryFn, Box<Parameter>, Box<Parameter>),
}

impl Parameter {
    /// Create a fixed parameter.
    pub fn fixed(value: impl Into<Scalar>) -> Self {
        Parameter::Fixed(value.into())
    }

    /// Create a measured parameter from a register reference.
    ///
    /// Fails if the mode has been released: using the measurement of a
    /// released mode is a program-authoring bug, caught at construction.
    pub fn measured(regref: &RegRef) -> IrResult<Self> {
        if !regref.is_active() {
            return Err(crate::error::IrError::InactiveMode {
                mode: regref.ind(),
                op_name: None,
            });
        }
        Ok(Parameter::Measured(regref.ind()))
    }

    /// Check if this expression requires deferred evaluation.
    pub fn is_symbolic(&self) -> bool {
        match self {
            Parameter::Fixed(_) => false,
            Parameter::Measured(_) | Parameter::Free(_) => true,
            Parameter::Unary(_, a) => a.is_symbolic(),
            Parameter::Binary(_, a, b) => a.is_symbolic() || b.is_symbolic(),
        }
    }

    /// The set of modes whose measurement results this expression reads,
    /// however deeply nested.
    pub fn measurement_deps(&self) -> FxHashSet<ModeId> {
        let mut set = FxHashSet::default();
        self.collect_deps(&mut set);
        set
    }

    fn collect_deps(&self, set: &mut FxHashSet<ModeId>) {
        match self {
            Parameter::Fixed(_) | Parameter::Free(_) => {}
            Parameter::Measured(mode) => {
                set.insert(*mode);
            }
            Parameter::Unary(_, a) => a.collect_deps(set),
            Parameter::Binary(_, a, b) => {
                a.collect_deps(set);
                b.collect_deps(set);
            }
        }
    }

    /// All free atoms in this expression.
    pub fn free_atoms(&self) -> Vec<&FreeParameter> {
        let mut out = vec![];
        self.collect_free(&mut out);
        out
    }

    fn collect_free<'a>(&'a self, out: &mut Vec<&'a FreeParameter>) {
        match self {
            Parameter::Fixed(_) | Parameter::Measured(_) => {}
            Parameter::Free(fp) => out.push(fp),
            Parameter::Unary(_, a) => a.collect_free(out),
            Parameter::Binary(_, a, b) => {
                a.collect_free(out);
                b.collect_free(out);
            }
        }
    }

    /// Evaluate the expression against the register state.
    ///
    /// A fixed atom passes through unchanged, preserving its variant.
    /// Anything else is folded numerically and narrowed per the
    /// [`Scalar::narrow`] rule. Evaluation is pure and uncached: once a
    /// register's result becomes available, re-evaluation picks it up.
    pub fn evaluate(&self, registers: &Registers) -> Result<Scalar, ParameterError> {
        if let Parameter::Fixed(v) = self {
            return Ok(*v);
        }
        self.fold(Some(registers)).map(Scalar::narrow)
    }

    /// Evaluate an expression with no symbolic atoms, eagerly.
    ///
    /// Returns `None` as soon as a measured or free atom is encountered.
    pub fn const_value(&self) -> Option<Scalar> {
        if let Parameter::Fixed(v) = self {
            return Some(*v);
        }
        self.fold(None).ok().map(Scalar::narrow)
    }

    fn fold(&self, registers: Option<&Registers>) -> Result<Complex64, ParameterError> {
        match self {
            Parameter::Fixed(v) => Ok(v.as_complex()),
            Parameter::Measured(mode) => registers
                .and_then(|r| r.value(*mode))
                .map(|v| v.as_complex())
                .ok_or(ParameterError::MeasurementNotAvailable { mode: *mode }),
            Parameter::Free(fp) => Err(ParameterError::UnboundParameter {
                name: fp.name.clone(),
            }),
            Parameter::Unary(f, a) => Ok(apply_unary(*f, a.fold(registers)?)),
            Parameter::Binary(f, a, b) => {
                Ok(apply_binary(*f, a.fold(registers)?, b.fold(registers)?))
            }
        }
    }

    /// Collapse constant subexpressions, leaving symbolic atoms in place.
    pub fn simplify(&self) -> Self {
        if let Some(v) = self.const_value() {
            return Parameter::Fixed(v);
        }
        match self {
            Parameter::Unary(f, a) => Parameter::Unary(*f, Box::new(a.simplify())),
            Parameter::Binary(f, a, b) => {
                Parameter::Binary(*f, Box::new(a.simplify()), Box::new(b.simplify()))
            }
            _ => self.clone(),
        }
    }

    /// Substitute a free parameter by name, returning a new expression.
    pub fn bind(&self, name: &str, value: Scalar) -> Self {
        match self {
            Parameter::Free(fp) if fp.name == name => Parameter::Fixed(value),
            Parameter::Fixed(_) | Parameter::Measured(_) | Parameter::Free(_) => self.clone(),
            Parameter::Unary(f, a) => Parameter::Unary(*f, Box::new(a.bind(name, value))),
            Parameter::Binary(f, a, b) => Parameter::Binary(
                *f,
                Box::new(a.bind(name, value)),
                Box::new(b.bind(name, value)),
            ),
        }
    }

    fn unary(self, f: UnaryFn) -> Self {
        Parameter::Unary(f, Box::new(self))
    }

    /// Sign of the expression.
    pub fn sign(self) -> Self {
        self.unary(UnaryFn::Sign)
    }

    /// Sine of the expression.
    pub fn sin(self) -> Self {
        self.unary(UnaryFn::Sin)
    }

    /// Cosine of the expression.
    pub fn cos(self) -> Self {
        self.unary(UnaryFn::Cos)
    }

    /// Square root of the expression.
    pub fn sqrt(self) -> Self {
        self.unary(UnaryFn::Sqrt)
    }

    /// Exponential of the expression.
    pub fn exp(self) -> Self {
        self.unary(UnaryFn::Exp)
    }

    /// Hyperbolic cosine of the expression.
    pub fn cosh(self) -> Self {
        self.unary(UnaryFn::Cosh)
    }

    /// Hyperbolic tangent of the expression.
    pub fn tanh(self) -> Self {
        self.unary(UnaryFn::Tanh)
    }

    /// Inverse hyperbolic sine of the expression.
    pub fn asinh(self) -> Self {
        self.unary(UnaryFn::Asinh)
    }

    /// Inverse hyperbolic cosine of the expression.
    pub fn acosh(self) -> Self {
        self.unary(UnaryFn::Acosh)
    }

    /// Inverse tangent of the expression.
    pub fn atan(self) -> Self {
        self.unary(UnaryFn::Atan)
    }

    /// Two-argument arctangent.
    pub fn atan2(self, other: impl Into<Parameter>) -> Self {
        Parameter::Binary(BinaryFn::Atan2, Box::new(self), Box::new(other.into()))
    }

    /// Raise the expression to a power.
    pub fn pow(self, other: impl Into<Parameter>) -> Self {
        Parameter::Binary(BinaryFn::Pow, Box::new(self), Box::new(other.into()))
    }
}

/// Evaluate a sequence of parameters, preserving order and length.
///
/// Fails on the first parameter that cannot be evaluated.
pub fn evaluate_all<'a>(
    params: impl IntoIterator<Item = &'a Parameter>,
    registers: &Registers,
) -> Result<Vec<Scalar>, ParameterError> {
    params.into_iter().map(|p| p.evaluate(registers)).collect()
}

fn apply_unary(f: UnaryFn, z: Complex64) -> Complex64 {
    match f {
        UnaryFn::Neg => -z,
        UnaryFn::Sign => {
            let n = z.norm();
            if n == 0.0 { Complex64::new(0.0, 0.0) } else { z / n }
        }
        UnaryFn::Sin => z.sin(),
        UnaryFn::Cos => z.cos(),
        UnaryFn::Sqrt => z.sqrt(),
        UnaryFn::Exp => z.exp(),
        UnaryFn::Cosh => z.cosh(),
        UnaryFn::Tanh => z.tanh(),
        UnaryFn::Asinh => z.asinh(),
        UnaryFn::Acosh => z.acosh(),
        UnaryFn::Atan => z.atan(),
    }
}

fn apply_binary(f: BinaryFn, a: Complex64, b: Complex64) -> Complex64 {
    match f {
        BinaryFn::Add => a + b,
        BinaryFn::Sub => a - b,
        BinaryFn::Mul => a * b,
        BinaryFn::Div => a / b,
        BinaryFn::Pow => a.powc(b),
        BinaryFn::Atan2 => Complex64::new(a.re.atan2(b.re), 0.0),
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parameter::Fixed(v) => write!(f, "{v}"),
            Parameter::Measured(mode) => write!(f, "{mode}.par"),
            Parameter::Free(fp) => write!(f, "{}", fp.name),
            Parameter::Unary(UnaryFn::Neg, a) => write!(f, "-({a})"),
            Parameter::Unary(func, a) => {
                let name = match func {
                    UnaryFn::Neg => unreachable!(),
                    UnaryFn::Sign => "sign",
                    UnaryFn::Sin => "sin",
                    UnaryFn::Cos => "cos",
                    UnaryFn::Sqrt => "sqrt",
                    UnaryFn::Exp => "exp",
                    UnaryFn::Cosh => "cosh",
                    UnaryFn::Tanh => "tanh",
                    UnaryFn::Asinh => "asinh",
                    UnaryFn::Acosh => "acosh",
                    UnaryFn::Atan => "atan",
                };
                write!(f, "{name}({a})")
            }
            Parameter::Binary(BinaryFn::Add, a, b) => write!(f, "({a} + {b})"),
            Parameter::Binary(BinaryFn::Sub, a, b) => write!(f, "({a} - {b})"),
            Parameter::Binary(BinaryFn::Mul, a, b) => write!(f, "({a} * {b})"),
            Parameter::Binary(BinaryFn::Div, a, b) => write!(f, "({a} / {b})"),
            Parameter::Binary(BinaryFn::Pow, a, b) => write!(f, "({a}^{b})"),
            Parameter::Binary(BinaryFn::Atan2, a, b) => write!(f, "atan2({a}, {b})"),
        }
    }
}

impl From<Scalar> for Parameter {
    fn from(v: Scalar) -> Self {
        Parameter::Fixed(v)
    }
}

impl From<f64> for Parameter {
    fn from(v: f64) -> Self {
        Parameter::Fixed(Scalar::Real(v))
    }
}

impl From<i64> for Parameter {
    fn from(v: i64) -> Self {
        Parameter::Fixed(Scalar::Int(v))
    }
}

impl From<i32> for Parameter {
    fn from(v: i32) -> Self {
        Parameter::Fixed(Scalar::Int(i64::from(v)))
    }
}

impl From<Complex64> for Parameter {
    fn from(z: Complex64) -> Self {
        Parameter::Fixed(Scalar::Complex(z))
    }
}

impl std::ops::Add for Parameter {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Parameter::Binary(BinaryFn::Add, Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Sub for Parameter {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Parameter::Binary(BinaryFn::Sub, Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Mul for Parameter {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Parameter::Binary(BinaryFn::Mul, Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Div for Parameter {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        Parameter::Binary(BinaryFn::Div, Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Neg for Parameter {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Parameter::Unary(UnaryFn::Neg, Box::new(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_fixed_passthrough() {
        let regs = Registers::new(0);
        let p = Parameter::fixed(1.5);
        assert!(!p.is_symbolic());
        assert_eq!(p.evaluate(&regs).unwrap(), Scalar::Real(1.5));

        // pass-through preserves the variant: a Real(3.0) does not
        // become Int(3)
        let p = Parameter::fixed(3.0);
        assert!(matches!(p.evaluate(&regs).unwrap(), Scalar::Real(_)));
    }

    #[test]
    fn test_fixed_composite_evaluates_eagerly() {
        let regs = Registers::new(0);
        let p = Parameter::fixed(2) + Parameter::fixed(1);
        assert!(!p.is_symbolic());
        assert!(p.measurement_deps().is_empty());
        assert_eq!(p.evaluate(&regs).unwrap(), Scalar::Int(3));
        assert_eq!(p.simplify(), Parameter::Fixed(Scalar::Int(3)));
    }

    #[test]
    fn test_measured_lifecycle() {
        let mut regs = Registers::new(1);
        let p = Parameter::measured(regs.get(ModeId(0)).unwrap()).unwrap();
        assert!(p.is_symbolic());

        // evaluation before the measurement fails, twice, with no side effect
        for _ in 0..2 {
            assert_eq!(
                p.evaluate(&regs),
                Err(ParameterError::MeasurementNotAvailable { mode: ModeId(0) })
            );
        }

        regs.record_measurement(ModeId(0), Scalar::Int(2)).unwrap();
        assert_eq!(p.evaluate(&regs).unwrap(), Scalar::Int(2));
    }

    #[test]
    fn test_measured_from_inactive_mode_rejected() {
        let mut regs = Registers::new(1);
        regs.delete(ModeId(0)).unwrap();
        assert!(Parameter::measured(regs.get(ModeId(0)).unwrap()).is_err());
    }

    #[test]
    fn test_measured_atoms_from_same_mode_are_identical() {
        let regs = Registers::new(1);
        let a = Parameter::measured(regs.get(ModeId(0)).unwrap()).unwrap();
        let b = Parameter::measured(regs.get(ModeId(0)).unwrap()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_nested_dependency_extraction() {
        let regs = Registers::new(3);
        let m1 = Parameter::measured(regs.get(ModeId(1)).unwrap()).unwrap();
        let m2 = Parameter::measured(regs.get(ModeId(2)).unwrap()).unwrap();
        let expr = m1 + Parameter::fixed(2) * m2.sin();
        let deps = expr.measurement_deps();
        assert_eq!(deps.len(), 2);
        assert!(deps.contains(&ModeId(1)));
        assert!(deps.contains(&ModeId(2)));
    }

    #[test]
    fn test_complex_narrowing() {
        let mut regs = Registers::new(1);
        regs.record_measurement(ModeId(0), Scalar::Complex(Complex64::new(1.5, 2.0)))
            .unwrap();
        let p = Parameter::Measured(ModeId(0));
        assert!(matches!(p.evaluate(&regs).unwrap(), Scalar::Complex(_)));

        // a symbolic expression folding to an exact integer narrows to Int
        let q = Parameter::Measured(ModeId(0)) * Parameter::fixed(0.0) + Parameter::fixed(4.0);
        assert_eq!(q.evaluate(&regs).unwrap(), Scalar::Int(4));
    }

    #[test]
    fn test_free_parameter_unbound() {
        let regs = Registers::new(0);
        let theta = Parameter::Free(FreeParameter {
            owner: 0,
            name: "theta".into(),
        });
        assert!(theta.is_symbolic());
        assert!(theta.measurement_deps().is_empty());
        assert_eq!(
            theta.clone().evaluate(&regs),
            Err(ParameterError::UnboundParameter {
                name: "theta".into()
            })
        );

        let bound = theta.bind("theta", Scalar::Real(0.25));
        assert_eq!(bound.evaluate(&regs).unwrap(), Scalar::Real(0.25));
    }

    #[test]
    fn test_evaluate_all_preserves_order() {
        let mut regs = Registers::new(1);
        regs.record_measurement(ModeId(0), Scalar::Int(2)).unwrap();
        let params = [
            Parameter::fixed(0.5),
            Parameter::Measured(ModeId(0)),
            Parameter::fixed(1) + Parameter::fixed(2),
        ];
        let values = evaluate_all(&params, &regs).unwrap();
        assert_eq!(
            values,
            vec![Scalar::Real(0.5), Scalar::Int(2), Scalar::Int(3)]
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Parameter::fixed(0.5)), "0.5");
        assert_eq!(format!("{}", Parameter::Measured(ModeId(0))), "q0.par");
        let sum = Parameter::Measured(ModeId(1)) + Parameter::fixed(2);
        assert_eq!(format!("{sum}"), "(q1.par + 2)");
    }

    proptest! {
        #[test]
        fn prop_const_arithmetic_matches_f64(a in -1.0e3..1.0e3f64, b in -1.0e3..1.0e3f64) {
            let regs = Registers::new(0);
            let expr = (Parameter::fixed(a) + Parameter::fixed(b)) * Parameter::fixed(2.0);
            let got = expr.evaluate(&regs).unwrap().as_complex().re;
            prop_assert!((got - (a + b) * 2.0).abs() < 1.0e-9);
        }

        #[test]
        fn prop_simplify_preserves_value(a in -10.0..10.0f64) {
            let regs = Registers::new(0);
            let expr = Parameter::fixed(a).cos().pow(Parameter::fixed(2))
                + Parameter::fixed(a).sin().pow(Parameter::fixed(2));
            let direct = expr.evaluate(&regs).unwrap().as_complex();
            let simplified = expr.simplify().evaluate(&regs).unwrap().as_complex();
            prop_assert!((direct - simplified).norm() < 1.0e-9);
        }
    }
}
