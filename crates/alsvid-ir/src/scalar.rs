//! Numeric scalar values.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest magnitude at which every f64 still represents an exact integer.
const EXACT_INT_LIMIT: f64 = 9_007_199_254_740_992.0; // 2^53

/// A concrete numeric value: the result of evaluating a parameter, or a
/// measurement outcome recorded in a register.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum Scalar {
    /// An integer value (e.g. a photon count).
    Int(i64),
    /// A real value.
    Real(f64),
    /// A complex value (e.g. a heterodyne sample).
    Complex(Complex64),
}

impl Scalar {
    /// Widen to a complex number.
    #[inline]
    pub fn as_complex(&self) -> Complex64 {
        match self {
            #[allow(clippy::cast_precision_loss)]
            Scalar::Int(v) => Complex64::new(*v as f64, 0.0),
            Scalar::Real(v) => Complex64::new(*v, 0.0),
            Scalar::Complex(z) => *z,
        }
    }

    /// The value as a real number, if its imaginary part is zero.
    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        let z = self.as_complex();
        if z.im == 0.0 { Some(z.re) } else { None }
    }

    /// The value as an integer, if it is one exactly.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Int(v) => Some(*v),
            _ => match Scalar::narrow(self.as_complex()) {
                Scalar::Int(v) => Some(v),
                _ => None,
            },
        }
    }

    /// Check for numeric zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.as_complex() == Complex64::new(0.0, 0.0)
    }

    /// Collapse a complex result into the narrowest variant: a nonzero
    /// imaginary part stays complex, an exact integer becomes `Int`,
    /// anything else is `Real`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn narrow(z: Complex64) -> Self {
        if z.im != 0.0 {
            return Scalar::Complex(z);
        }
        let re = z.re;
        if re.is_finite() && re.fract() == 0.0 && re.abs() < EXACT_INT_LIMIT {
            Scalar::Int(re as i64)
        } else {
            Scalar::Real(re)
        }
    }
}

/// Equality is numeric, not structural: `Int(3) == Real(3.0)`.
impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        self.as_complex() == other.as_complex()
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::Int(i64::from(v))
    }
}

impl From<u32> for Scalar {
    fn from(v: u32) -> Self {
        Scalar::Int(i64::from(v))
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Real(v)
    }
}

impl From<Complex64> for Scalar {
    fn from(z: Complex64) -> Self {
        Scalar::Complex(z)
    }
}

/// Render a real number with 4 significant digits, trimming trailing zeros.
#[allow(clippy::cast_possible_truncation)]
fn fmt_sig4(v: f64) -> String {
    if v == 0.0 {
        return "0".to_string();
    }
    if !v.is_finite() {
        return format!("{v}");
    }
    let exp = v.abs().log10().floor() as i32;
    if !(-4..4).contains(&exp) {
        return format!("{v:.3e}");
    }
    let decimals = usize::try_from((3 - exp).max(0)).unwrap_or(0);
    let s = format!("{v:.decimals$}");
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(v) => write!(f, "{v}"),
            Scalar::Real(v) => write!(f, "{}", fmt_sig4(*v)),
            Scalar::Complex(z) => {
                if z.im >= 0.0 {
                    write!(f, "{}+{}i", fmt_sig4(z.re), fmt_sig4(z.im))
                } else {
                    write!(f, "{}-{}i", fmt_sig4(z.re), fmt_sig4(-z.im))
                }
            }
        }
    }
}
