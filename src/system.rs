use num_complex::Complex64;
use num_rational::Rational64;

use crate::{
    error::EvalError,
    number::{Number, Scalar},
};

pub type Builtin = fn(&[Number]) -> Result<Number, EvalError>;

pub const NAMES: [&str; 23] = [
    "sqrt", "cbrt", "abs", "exp", "ln", "log", "sin", "cos", "tan", "asin", "acos", "atan",
    "sind", "cosd", "tand", "floor", "ceil", "round", "min", "max", "re", "im", "conj",
];

pub fn lookup(name: &str) -> Option<Builtin> {
    Some(match name {
        "sqrt" => sqrt,
        "cbrt" => cbrt,
        "abs" => abs,
        "exp" => exp,
        "ln" => ln,
        "log" => log,
        "sin" => sin,
        "cos" => cos,
        "tan" => tan,
        "asin" => asin,
        "acos" => acos,
        "atan" => atan,
        "sind" => sind,
        "cosd" => cosd,
        "tand" => tand,
        "floor" => floor,
        "ceil" => ceil,
        "round" => round,
        "min" => min,
        "max" => max,
        "re" => re,
        "im" => im,
        "conj" => conj,
        _ => return None,
    })
}

fn single(function: &'static str, input: &[Number]) -> Result<Number, EvalError> {
    match input {
        [value] => Ok(*value),
        _ => Err(EvalError::Arity {
            function,
            expected: "1 argument",
            found: input.len(),
        }),
    }
}

fn real_only(function: &'static str, input: &[Number]) -> Result<Scalar, EvalError> {
    single(function, input)?
        .as_real()
        .ok_or_else(|| EvalError::Domain(format!("`{function}` is only defined for real numbers")))
}

/// Wraps a float result, rejecting NaN and infinities.
fn finite(function: &str, value: f64) -> Result<Number, EvalError> {
    if value.is_finite() {
        Ok(Number::Real(value))
    } else {
        Err(EvalError::Domain(format!("`{function}` is undefined here")))
    }
}

fn finite_complex(function: &str, value: Complex64) -> Result<Number, EvalError> {
    if value.re.is_finite() && value.im.is_finite() {
        Ok(Number::from_complex64(value))
    } else {
        Err(EvalError::Domain(format!("`{function}` is undefined here")))
    }
}

/// Applies `real` to real arguments inside `domain`, `complex` otherwise.
fn analytic(
    name: &'static str,
    input: &[Number],
    domain: impl Fn(f64) -> bool,
    real: fn(f64) -> f64,
    complex: fn(Complex64) -> Complex64,
) -> Result<Number, EvalError> {
    let value = single(name, input)?;
    match value.real_scalar() {
        Some(x) if domain(x.to_f64()) => finite(name, real(x.to_f64())),
        _ => finite_complex(name, complex(value.to_complex64())),
    }
}

pub fn sqrt(input: &[Number]) -> Result<Number, EvalError> {
    Ok(single("sqrt", input)?.sqrt())
}

pub fn cbrt(input: &[Number]) -> Result<Number, EvalError> {
    let value = single("cbrt", input)?;
    if value.is_complex() {
        return finite_complex("cbrt", value.to_complex64().powf(1.0 / 3.0));
    }
    value.pow(Number::rational(1, 3))
}

pub fn abs(input: &[Number]) -> Result<Number, EvalError> {
    let value = single("abs", input)?;
    match value {
        Number::Complex(re, im) => Ok(Number::from(re * re + im * im).sqrt()),
        real => Ok(Number::from(real.parts().0.abs())),
    }
}

pub fn exp(input: &[Number]) -> Result<Number, EvalError> {
    analytic("exp", input, |_| true, f64::exp, Complex64::exp)
}

pub fn ln(input: &[Number]) -> Result<Number, EvalError> {
    let value = single("ln", input)?;
    if value.is_zero() {
        return Err(EvalError::Domain("`ln` is undefined at 0".to_string()));
    }
    if value == Number::Integer(1) {
        return Ok(Number::Integer(0));
    }
    analytic("ln", input, |x| x > 0.0, f64::ln, Complex64::ln)
}

/// `log(x)` in base 10, `log(b, x)` in base `b`.
pub fn log(input: &[Number]) -> Result<Number, EvalError> {
    let (base, value) = match input {
        [value] => (Number::Integer(10), *value),
        [base, value] => (*base, *value),
        _ => {
            return Err(EvalError::Arity {
                function: "log",
                expected: "1 or 2 arguments",
                found: input.len(),
            });
        }
    };
    if value.is_zero() || base.is_zero() {
        return Err(EvalError::Domain("`log` is undefined at 0".to_string()));
    }
    if base == Number::Integer(1) {
        return Err(EvalError::Domain("`log` base must not be 1".to_string()));
    }
    if let (Some(b), Some(x)) = (base.as_integer(), value.as_integer()) {
        if let Some(k) = exact_log(b, x) {
            return Ok(Number::Integer(k));
        }
    }

    match (base.real_scalar(), value.real_scalar()) {
        (Some(b), Some(x)) if b.to_f64() > 0.0 && x.to_f64() > 0.0 => {
            let (b, x) = (b.to_f64(), x.to_f64());
            let result = if b == 10.0 { x.log10() } else { x.ln() / b.ln() };
            finite("log", result)
        }
        _ => finite_complex("log", value.to_complex64().ln() / base.to_complex64().ln()),
    }
}

/// The `k` with `base^k == x`, for integer arguments where one exists.
fn exact_log(base: i64, x: i64) -> Option<i64> {
    if base < 2 || x < 1 {
        return None;
    }
    let mut power = 1i64;
    let mut k = 0;
    while power < x {
        power = power.checked_mul(base)?;
        k += 1;
    }
    (power == x).then_some(k)
}

pub fn sin(input: &[Number]) -> Result<Number, EvalError> {
    analytic("sin", input, |_| true, f64::sin, Complex64::sin)
}

pub fn cos(input: &[Number]) -> Result<Number, EvalError> {
    analytic("cos", input, |_| true, f64::cos, Complex64::cos)
}

pub fn tan(input: &[Number]) -> Result<Number, EvalError> {
    analytic("tan", input, |_| true, f64::tan, Complex64::tan)
}

pub fn asin(input: &[Number]) -> Result<Number, EvalError> {
    analytic("asin", input, |x| (-1.0..=1.0).contains(&x), f64::asin, Complex64::asin)
}

pub fn acos(input: &[Number]) -> Result<Number, EvalError> {
    analytic("acos", input, |x| (-1.0..=1.0).contains(&x), f64::acos, Complex64::acos)
}

pub fn atan(input: &[Number]) -> Result<Number, EvalError> {
    analytic("atan", input, |_| true, f64::atan, Complex64::atan)
}

/// Exact sine and cosine for whole multiples of 90 degrees.
fn quarter_turn(degrees: Number) -> Option<(i64, i64)> {
    let n = degrees.as_integer()?;
    if n % 90 != 0 {
        return None;
    }
    Some(match (n / 90).rem_euclid(4) {
        0 => (0, 1),
        1 => (1, 0),
        2 => (0, -1),
        _ => (-1, 0),
    })
}

fn to_radians(function: &'static str, input: &[Number]) -> Result<Number, EvalError> {
    let degrees = single(function, input)?;
    let factor = Number::Real(std::f64::consts::PI / 180.0);
    Ok(degrees * factor)
}

pub fn sind(input: &[Number]) -> Result<Number, EvalError> {
    if let Some((sine, _)) = quarter_turn(single("sind", input)?) {
        return Ok(Number::Integer(sine));
    }
    sin(&[to_radians("sind", input)?])
}

pub fn cosd(input: &[Number]) -> Result<Number, EvalError> {
    if let Some((_, cosine)) = quarter_turn(single("cosd", input)?) {
        return Ok(Number::Integer(cosine));
    }
    cos(&[to_radians("cosd", input)?])
}

pub fn tand(input: &[Number]) -> Result<Number, EvalError> {
    match quarter_turn(single("tand", input)?) {
        Some((_, 0)) => Err(EvalError::Domain(
            "`tand` is undefined at odd multiples of 90".to_string(),
        )),
        Some(_) => Ok(Number::Integer(0)),
        None => tan(&[to_radians("tand", input)?]),
    }
}

fn rounding(
    function: &'static str,
    input: &[Number],
    exact: fn(&Rational64) -> Rational64,
    approx: fn(f64) -> f64,
) -> Result<Number, EvalError> {
    match real_only(function, input)? {
        Scalar::Exact(r) => Ok(Number::from(Scalar::Exact(exact(&r)))),
        Scalar::Approx(x) => finite(function, approx(x)),
    }
}

pub fn floor(input: &[Number]) -> Result<Number, EvalError> {
    rounding("floor", input, Rational64::floor, f64::floor)
}

pub fn ceil(input: &[Number]) -> Result<Number, EvalError> {
    rounding("ceil", input, Rational64::ceil, f64::ceil)
}

pub fn round(input: &[Number]) -> Result<Number, EvalError> {
    rounding("round", input, Rational64::round, f64::round)
}

fn extremum(
    function: &'static str,
    input: &[Number],
    keep: fn(f64, f64) -> bool,
) -> Result<Number, EvalError> {
    let mut best: Option<Number> = None;

    for value in input {
        if value.as_real().is_none() {
            return Err(EvalError::Domain(format!(
                "`{function}` only accepts real numbers, got {value}"
            )));
        }
        best = Some(match best {
            Some(current) if !keep(value.to_f64(), current.to_f64()) => current,
            _ => *value,
        });
    }

    best.ok_or(EvalError::Arity {
        function,
        expected: "at least 1 argument",
        found: 0,
    })
}

pub fn min(input: &[Number]) -> Result<Number, EvalError> {
    extremum("min", input, |candidate, current| candidate < current)
}

pub fn max(input: &[Number]) -> Result<Number, EvalError> {
    extremum("max", input, |candidate, current| candidate > current)
}

pub fn re(input: &[Number]) -> Result<Number, EvalError> {
    Ok(Number::from(single("re", input)?.parts().0))
}

pub fn im(input: &[Number]) -> Result<Number, EvalError> {
    Ok(Number::from(single("im", input)?.parts().1))
}

pub fn conj(input: &[Number]) -> Result<Number, EvalError> {
    let (re, im) = single("conj", input)?.parts();
    Ok(Number::Complex(re, -im))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(value: Result<Number, EvalError>, expected: f64) {
        let value = value.expect("builtin should succeed").to_f64();
        assert!((value - expected).abs() < 1e-12, "{value} != {expected}");
    }

    #[test]
    fn every_listed_name_resolves() {
        for name in NAMES {
            assert!(lookup(name).is_some(), "{name} is missing");
        }
        assert!(lookup("print").is_none());
    }

    #[test]
    fn exact_results_stay_exact() {
        assert_eq!(sqrt(&[Number::Integer(16)]), Ok(Number::Integer(4)));
        assert_eq!(cbrt(&[Number::Integer(-27)]), Ok(Number::Integer(-3)));
        assert_eq!(abs(&[Number::rational(-3, 4)]), Ok(Number::rational(3, 4)));
        assert_eq!(abs(&[Number::complex(3, 4)]), Ok(Number::Integer(5)));
        assert_eq!(log(&[Number::Integer(1000)]), Ok(Number::Integer(3)));
        assert_eq!(log(&[Number::Integer(2), Number::Integer(8)]), Ok(Number::Integer(3)));
        assert_eq!(floor(&[Number::rational(-7, 2)]), Ok(Number::Integer(-4)));
        assert_eq!(round(&[Number::rational(5, 2)]), Ok(Number::Integer(3)));
    }

    #[test]
    fn degree_trigonometry() {
        assert_eq!(sind(&[Number::Integer(180)]), Ok(Number::Integer(0)));
        assert_eq!(cosd(&[Number::Integer(-90)]), Ok(Number::Integer(0)));
        approx(sind(&[Number::Integer(30)]), 0.5);
        assert!(matches!(tand(&[Number::Integer(90)]), Err(EvalError::Domain(_))));
    }

    #[test]
    fn leaving_the_real_domain_goes_complex() {
        let value = asin(&[Number::Integer(2)]).unwrap();
        assert!(value.is_complex());
        let value = ln(&[Number::Integer(-1)]).unwrap();
        assert!((value.to_complex64().im - std::f64::consts::PI).abs() < 1e-12);
    }

    #[test]
    fn domain_and_arity_errors() {
        assert!(matches!(ln(&[Number::Integer(0)]), Err(EvalError::Domain(_))));
        assert_eq!(
            sin(&[]),
            Err(EvalError::Arity {
                function: "sin",
                expected: "1 argument",
                found: 0
            })
        );
        assert!(matches!(floor(&[Number::i()]), Err(EvalError::Domain(_))));
        assert!(matches!(max(&[]), Err(EvalError::Arity { .. })));
    }

    #[test]
    fn extremes_keep_exact_values() {
        let values = [Number::rational(1, 3), Number::Integer(-2), Number::rational(1, 2)];
        assert_eq!(max(&values), Ok(Number::rational(1, 2)));
        assert_eq!(min(&values), Ok(Number::Integer(-2)));
    }

    #[test]
    fn complex_parts() {
        let z = Number::complex(3, -4);
        assert_eq!(re(&[z]), Ok(Number::Integer(3)));
        assert_eq!(im(&[z]), Ok(Number::Integer(-4)));
        assert_eq!(conj(&[z]), Ok(Number::complex(3, 4)));
    }
}
