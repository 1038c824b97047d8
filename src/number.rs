use std::cmp::Ordering;
use std::ops::{Add, Mul, Neg, Sub};

use num_complex::Complex64;
use num_integer::Roots;
use num_rational::Rational64;
use num_traits::{CheckedAdd, CheckedDiv, CheckedMul, CheckedSub, One, Signed, ToPrimitive, Zero};

use crate::error::EvalError;

/// Relative tolerance below which a float component counts as zero.
pub const EPSILON: f64 = 1e-12;

/// One real component: an exact rational, or a float once exactness is lost.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Exact(Rational64),
    Approx(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Integer(i64),
    Rational(Rational64),
    Real(f64),
    Complex(Scalar, Scalar),
}

impl Scalar {
    pub fn zero() -> Self {
        Scalar::Exact(Rational64::zero())
    }

    pub fn one() -> Self {
        Scalar::Exact(Rational64::one())
    }

    pub fn integer(n: i64) -> Self {
        Scalar::Exact(Rational64::from_integer(n))
    }

    pub fn to_f64(self) -> f64 {
        match self {
            Scalar::Exact(r) => r
                .to_f64()
                .unwrap_or_else(|| *r.numer() as f64 / *r.denom() as f64),
            Scalar::Approx(x) => x,
        }
    }

    pub fn is_zero(self) -> bool {
        match self {
            Scalar::Exact(r) => r.is_zero(),
            Scalar::Approx(x) => x == 0.0,
        }
    }

    /// Zero, or a float within [`EPSILON`] of zero relative to `scale`.
    pub fn is_negligible(self, scale: f64) -> bool {
        match self {
            Scalar::Exact(r) => r.is_zero(),
            Scalar::Approx(x) => x.abs() <= EPSILON * scale.max(1.0),
        }
    }

    pub fn is_negative(self) -> bool {
        match self {
            Scalar::Exact(r) => r.is_negative(),
            Scalar::Approx(x) => x < 0.0,
        }
    }

    pub fn abs(self) -> Self {
        if self.is_negative() { -self } else { self }
    }

    fn exact_or(exact: Option<Rational64>, approx: impl FnOnce() -> f64) -> Self {
        match exact {
            Some(r) => Scalar::Exact(r),
            None => Scalar::Approx(approx()),
        }
    }

    /// `self / rhs` for a nonzero `rhs`.
    fn quotient(self, rhs: Scalar) -> Scalar {
        match (self, rhs) {
            (Scalar::Exact(a), Scalar::Exact(b)) => {
                Scalar::exact_or(a.checked_div(&b), || self.to_f64() / rhs.to_f64())
            }
            _ => Scalar::Approx(self.to_f64() / rhs.to_f64()),
        }
    }
}

impl Add for Scalar {
    type Output = Scalar;

    fn add(self, rhs: Scalar) -> Scalar {
        match (self, rhs) {
            (Scalar::Exact(a), Scalar::Exact(b)) => {
                Scalar::exact_or(a.checked_add(&b), || self.to_f64() + rhs.to_f64())
            }
            _ => Scalar::Approx(self.to_f64() + rhs.to_f64()),
        }
    }
}

impl Sub for Scalar {
    type Output = Scalar;

    fn sub(self, rhs: Scalar) -> Scalar {
        match (self, rhs) {
            (Scalar::Exact(a), Scalar::Exact(b)) => {
                Scalar::exact_or(a.checked_sub(&b), || self.to_f64() - rhs.to_f64())
            }
            _ => Scalar::Approx(self.to_f64() - rhs.to_f64()),
        }
    }
}

impl Mul for Scalar {
    type Output = Scalar;

    fn mul(self, rhs: Scalar) -> Scalar {
        match (self, rhs) {
            (Scalar::Exact(a), Scalar::Exact(b)) => {
                Scalar::exact_or(a.checked_mul(&b), || self.to_f64() * rhs.to_f64())
            }
            _ => Scalar::Approx(self.to_f64() * rhs.to_f64()),
        }
    }
}

impl Neg for Scalar {
    type Output = Scalar;

    fn neg(self) -> Scalar {
        match self {
            Scalar::Exact(r) => {
                Scalar::exact_or(Rational64::zero().checked_sub(&r), || -self.to_f64())
            }
            Scalar::Approx(x) => Scalar::Approx(-x),
        }
    }
}

/// Exact square root of a non-negative rational, if it has one.
pub fn exact_sqrt(r: Rational64) -> Option<Rational64> {
    exact_root(r, 2)
}

/// Exact `k`-th root of a non-negative rational, if it has one.
pub fn exact_root(r: Rational64, k: u32) -> Option<Rational64> {
    let (n, d) = (*r.numer(), *r.denom());
    if n < 0 || k == 0 {
        return None;
    }
    let (rn, rd) = (Roots::nth_root(&n, k), Roots::nth_root(&d, k));
    (rn.checked_pow(k) == Some(n) && rd.checked_pow(k) == Some(d)).then(|| Rational64::new(rn, rd))
}

impl From<Scalar> for Number {
    fn from(value: Scalar) -> Self {
        match value {
            Scalar::Exact(r) if r.is_integer() => Number::Integer(*r.numer()),
            Scalar::Exact(r) => Number::Rational(r),
            Scalar::Approx(x) => Number::Real(x),
        }
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number::Integer(value)
    }
}

impl Number {
    /// The imaginary unit.
    pub fn i() -> Self {
        Number::Complex(Scalar::zero(), Scalar::one())
    }

    /// `numer/denom` in lowest terms. Panics on a zero denominator.
    pub fn rational(numer: i64, denom: i64) -> Self {
        Number::from(Scalar::Exact(Rational64::new(numer, denom)))
    }

    /// A complex number with exact integer parts.
    pub fn complex(re: i64, im: i64) -> Self {
        Number::Complex(Scalar::integer(re), Scalar::integer(im))
    }

    pub fn from_complex64(value: Complex64) -> Self {
        Number::Complex(Scalar::Approx(value.re), Scalar::Approx(value.im))
    }

    /// Reads a numeric literal (`42`, `2.5`, `1e-5`) exactly when it fits in
    /// 64-bit rationals, as a float otherwise.
    pub fn parse_literal(literal: &str) -> Option<Number> {
        let (mantissa, exponent) = match literal.find(['e', 'E']) {
            Some(at) => (&literal[..at], literal[at + 1..].parse::<i32>().ok()?),
            None => (literal, 0),
        };
        let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
        let digits = format!("{whole}{fraction}");

        let exact = || -> Option<Rational64> {
            let numer: i64 = digits.parse().ok()?;
            let scale = i32::try_from(fraction.len()).ok()?.checked_sub(exponent)?;
            let power = 10i64.checked_pow(scale.unsigned_abs())?;
            if scale >= 0 {
                Some(Rational64::new(numer, power))
            } else {
                numer.checked_mul(power).map(Rational64::from_integer)
            }
        };

        match exact() {
            Some(r) => Some(Number::from(Scalar::Exact(r))),
            None => literal.parse::<f64>().ok().map(Number::Real),
        }
    }

    pub fn is_complex(&self) -> bool {
        matches!(self, Number::Complex(..))
    }

    /// Real and imaginary components.
    pub fn parts(self) -> (Scalar, Scalar) {
        match self {
            Number::Integer(n) => (Scalar::integer(n), Scalar::zero()),
            Number::Rational(r) => (Scalar::Exact(r), Scalar::zero()),
            Number::Real(x) => (Scalar::Approx(x), Scalar::zero()),
            Number::Complex(re, im) => (re, im),
        }
    }

    /// The value as a real scalar, or `None` for a complex number.
    pub fn real_scalar(self) -> Option<Scalar> {
        match self {
            Number::Complex(..) => None,
            other => Some(other.parts().0),
        }
    }

    /// Real value, ignoring an imaginary part that is exactly or nearly zero.
    pub fn as_real(self) -> Option<Scalar> {
        let (re, im) = self.parts();
        im.is_negligible(re.to_f64().abs()).then_some(re)
    }

    pub fn is_zero(&self) -> bool {
        let (re, im) = self.parts();
        re.is_zero() && im.is_zero()
    }

    /// Zero up to float noise, relative to `scale`.
    pub fn is_negligible(&self, scale: f64) -> bool {
        let (re, im) = self.parts();
        re.is_negligible(scale) && im.is_negligible(scale)
    }

    pub fn as_integer(&self) -> Option<i64> {
        match *self {
            Number::Integer(n) => Some(n),
            Number::Rational(r) if r.is_integer() => Some(*r.numer()),
            Number::Real(x) if x.fract() == 0.0 && x.abs() < 9.0e15 => Some(x as i64),
            Number::Complex(Scalar::Exact(re), Scalar::Exact(im)) if im.is_zero() && re.is_integer() => {
                Some(*re.numer())
            }
            _ => None,
        }
    }

    pub fn to_f64(&self) -> f64 {
        self.parts().0.to_f64()
    }

    pub fn to_complex64(&self) -> Complex64 {
        let (re, im) = self.parts();
        Complex64::new(re.to_f64(), im.to_f64())
    }

    /// False for infinities and NaN in either part.
    pub fn is_finite(&self) -> bool {
        let z = self.to_complex64();
        z.re.is_finite() && z.im.is_finite()
    }

    pub fn magnitude(&self) -> f64 {
        self.to_complex64().norm()
    }

    pub fn checked_div(self, rhs: Number) -> Result<Number, EvalError> {
        if rhs.is_zero() {
            return Err(EvalError::DivisionByZero);
        }
        if !self.is_complex() && !rhs.is_complex() {
            return Ok(Number::from(self.parts().0.quotient(rhs.parts().0)));
        }

        let ((a, b), (c, d)) = (self.parts(), rhs.parts());
        let denom = c * c + d * d;
        if denom.is_zero() {
            return Err(EvalError::DivisionByZero);
        }
        Ok(Number::Complex(
            (a * c + b * d).quotient(denom),
            (b * c - a * d).quotient(denom),
        ))
    }

    pub fn pow(self, exponent: Number) -> Result<Number, EvalError> {
        if let Some(n) = exponent.as_integer() {
            return self.powi(n);
        }
        if self.is_zero() {
            return if exponent.to_f64() > 0.0 {
                Ok(Number::Integer(0))
            } else {
                Err(EvalError::DivisionByZero)
            };
        }

        match (self.real_scalar(), exponent) {
            (Some(base), Number::Rational(r)) => Ok(rational_power(base, r)),
            (Some(base), Number::Real(e)) => {
                let b = base.to_f64();
                if b >= 0.0 {
                    Ok(Number::Real(b.powf(e)))
                } else {
                    Ok(Number::from_complex64(Complex64::new(b, 0.0).powf(e)))
                }
            }
            _ => Ok(Number::from_complex64(
                self.to_complex64().powc(exponent.to_complex64()),
            )),
        }
    }

    /// Integer power by repeated squaring; stays exact until 64-bit overflow.
    pub fn powi(self, n: i64) -> Result<Number, EvalError> {
        if n < 0 && self.is_zero() {
            return Err(EvalError::DivisionByZero);
        }
        let mut result = Number::Integer(1);
        let mut base = self;
        let mut k = n.unsigned_abs();
        while k > 0 {
            if k & 1 == 1 {
                result = result * base;
            }
            k >>= 1;
            if k > 0 {
                base = base * base;
            }
        }
        if n < 0 {
            Number::Integer(1).checked_div(result)
        } else {
            Ok(result)
        }
    }

    /// Principal square root. Negative reals give an imaginary result.
    pub fn sqrt(self) -> Number {
        match self.real_scalar() {
            Some(Scalar::Exact(r)) => {
                let root = match Scalar::Exact(r).abs() {
                    Scalar::Exact(magnitude) => exact_sqrt(magnitude)
                        .map(Scalar::Exact)
                        .unwrap_or_else(|| Scalar::Approx(Scalar::Exact(magnitude).to_f64().sqrt())),
                    // |i64::MIN| has no exact form
                    Scalar::Approx(magnitude) => Scalar::Approx(magnitude.sqrt()),
                };
                if r.is_negative() {
                    Number::Complex(Scalar::zero(), root)
                } else {
                    Number::from(root)
                }
            }
            Some(Scalar::Approx(x)) if x < 0.0 => {
                Number::Complex(Scalar::zero(), Scalar::Approx((-x).sqrt()))
            }
            Some(Scalar::Approx(x)) => Number::Real(x.sqrt()),
            None => Number::from_complex64(self.to_complex64().sqrt()),
        }
    }

    /// Collapses a complex value with a negligible imaginary part to a real
    /// one, and float noise in either part to zero.
    pub fn cleaned(self) -> Number {
        let Number::Complex(re, im) = self else {
            return self;
        };
        let scale = re.to_f64().abs().max(im.to_f64().abs());
        let re = if re.is_negligible(scale) { Scalar::zero() } else { re };
        if im.is_negligible(scale) {
            Number::from(re)
        } else {
            Number::Complex(re, im)
        }
    }

    /// Root display order: larger real part first, then larger imaginary part.
    pub fn root_order(&self, other: &Number) -> Ordering {
        let (a, b) = (self.to_complex64(), other.to_complex64());
        b.re
            .partial_cmp(&a.re)
            .unwrap_or(Ordering::Equal)
            .then(b.im.partial_cmp(&a.im).unwrap_or(Ordering::Equal))
    }

    /// Equal exactly, or within float tolerance.
    pub fn approx_eq(&self, other: &Number) -> bool {
        if self == other {
            return true;
        }
        let scale = self.magnitude().max(other.magnitude()).max(1.0);
        (*self - *other).magnitude() <= 1e-9 * scale
    }
}

/// `base^(p/q)` for a real base, exact when the root is rational. Odd roots of
/// negative bases stay real.
fn rational_power(base: Scalar, exponent: Rational64) -> Number {
    let (p, q) = (*exponent.numer(), *exponent.denom());
    let odd = q % 2 != 0;

    if let (Scalar::Exact(b), Ok(k)) = (base, u32::try_from(q)) {
        let root = match (b.is_negative(), odd) {
            (false, _) => exact_root(b, k),
            (true, true) => Rational64::zero()
                .checked_sub(&b)
                .and_then(|magnitude| exact_root(magnitude, k))
                .map(|root| -root),
            (true, false) => None,
        };
        if let Some(value) = root.and_then(|root| Number::from(Scalar::Exact(root)).powi(p).ok()) {
            return value;
        }
    }

    let (b, e) = (base.to_f64(), Scalar::Exact(exponent).to_f64());
    match (b >= 0.0, odd) {
        (true, _) => Number::Real(b.powf(e)),
        (false, true) => {
            let magnitude = (-b).powf(e);
            Number::Real(if p % 2 == 0 { magnitude } else { -magnitude })
        }
        (false, false) => Number::from_complex64(Complex64::new(b, 0.0).powf(e)),
    }
}

impl Add for Number {
    type Output = Number;

    fn add(self, rhs: Number) -> Number {
        if self.is_complex() || rhs.is_complex() {
            let ((a, b), (c, d)) = (self.parts(), rhs.parts());
            Number::Complex(a + c, b + d)
        } else {
            Number::from(self.parts().0 + rhs.parts().0)
        }
    }
}

impl Sub for Number {
    type Output = Number;

    fn sub(self, rhs: Number) -> Number {
        self + -rhs
    }
}

impl Mul for Number {
    type Output = Number;

    fn mul(self, rhs: Number) -> Number {
        if self.is_complex() || rhs.is_complex() {
            let ((a, b), (c, d)) = (self.parts(), rhs.parts());
            Number::Complex(a * c - b * d, a * d + b * c)
        } else {
            Number::from(self.parts().0 * rhs.parts().0)
        }
    }
}

impl Neg for Number {
    type Output = Number;

    fn neg(self) -> Number {
        match self {
            Number::Complex(re, im) => Number::Complex(-re, -im),
            other => Number::from(-other.parts().0),
        }
    }
}
