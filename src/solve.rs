use log::{debug, trace};
use num_complex::Complex64;
use num_integer::Integer;
use num_rational::Rational64;
use num_traits::{CheckedAdd, CheckedMul};

use crate::{
    error::SolveError,
    eval::Environment,
    number::{Number, Scalar},
    parse::Equation,
    poly::Polynomial,
};

#[derive(Debug, Clone, PartialEq)]
pub enum SolutionSet {
    /// Distinct roots, larger real part first.
    Roots(Vec<Number>),
    AllReals,
    NoSolution,
}

const MAX_ITERATIONS: usize = 1000;

/// Solves `lhs = rhs` for `unknown`. Without an unknown the equation either
/// always holds or never does.
pub fn solve(
    equation: &Equation<'_>,
    unknown: Option<&str>,
    environment: &Environment<'_>,
) -> Result<SolutionSet, SolveError> {
    let unknowns: Vec<&str> = unknown.into_iter().collect();
    let polynomial = Polynomial::from_equation(equation, &unknowns, environment)?;
    Ok(solve_polynomial(polynomial.univariate()))
}

/// Roots of `c[0] + c[1]x + c[2]x² + …`.
pub fn solve_polynomial(coefficients: Vec<Number>) -> SolutionSet {
    let coefficients = trim(coefficients);
    trace!("coefficients, lowest power first: {coefficients:?}");

    match coefficients.len() {
        0 => SolutionSet::AllReals,
        1 => SolutionSet::NoSolution,
        _ => {
            let mut roots = roots(coefficients);
            for root in &mut roots {
                *root = snap(*root);
            }
            roots.sort_by(Number::root_order);
            roots.dedup_by(|a, b| a.approx_eq(b));
            SolutionSet::Roots(roots)
        }
    }
}

/// Drops leading coefficients that are zero or float noise.
fn trim(mut coefficients: Vec<Number>) -> Vec<Number> {
    let scale = coefficients
        .iter()
        .map(Number::magnitude)
        .fold(0.0, f64::max);
    while coefficients
        .last()
        .is_some_and(|c| c.is_zero() || c.is_negligible(scale))
    {
        coefficients.pop();
    }
    coefficients
}

fn roots(mut coefficients: Vec<Number>) -> Vec<Number> {
    let mut found = Vec::new();

    let zeros = coefficients.iter().take_while(|c| c.is_zero()).count();
    if zeros > 0 {
        trace!("factored out x^{zeros}");
        coefficients.drain(..zeros);
        found.push(Number::Integer(0));
    }

    if coefficients.len() > 3 {
        if let Some(exact) = exact_coefficients(&coefficients) {
            let (rational, rest) = rational_roots(exact);
            found.extend(rational);
            coefficients = rest;
        }
    }

    match coefficients.len() {
        0 | 1 => {}
        2 => found.extend(linear(coefficients[0], coefficients[1])),
        3 => found.extend(quadratic(coefficients[0], coefficients[1], coefficients[2])),
        n => {
            debug!("solving a degree {} factor numerically", n - 1);
            found.extend(durand_kerner(&coefficients));
        }
    }
    found
}

fn linear(b: Number, a: Number) -> Option<Number> {
    (-b).checked_div(a).ok()
}

/// Roots of `ax² + bx + c`, one root when the discriminant vanishes.
fn quadratic(c: Number, b: Number, a: Number) -> Vec<Number> {
    let discriminant = b * b - Number::Integer(4) * a * c;
    trace!("discriminant {discriminant:?}");
    let two_a = Number::Integer(2) * a;
    let scale = (b * b).magnitude().max((a * c).magnitude());

    if discriminant.is_negligible(scale) {
        return (-b).checked_div(two_a).into_iter().collect();
    }

    let root = discriminant.sqrt();
    [-b + root, -b - root]
        .into_iter()
        .filter_map(|numerator| numerator.checked_div(two_a).ok())
        .map(Number::cleaned)
        .collect()
}

/// Real rational coefficients, or `None` once any coefficient is inexact.
fn exact_coefficients(coefficients: &[Number]) -> Option<Vec<Rational64>> {
    coefficients
        .iter()
        .map(|c| match c.real_scalar() {
            Some(Scalar::Exact(r)) => Some(r),
            _ => None,
        })
        .collect()
}

/// Finds the rational roots by the rational root theorem and deflates them out,
/// returning what remains of the polynomial.
fn rational_roots(mut coefficients: Vec<Rational64>) -> (Vec<Number>, Vec<Number>) {
    let mut found = Vec::new();

    'search: while coefficients.len() > 3 {
        let Some(integers) = integer_coefficients(&coefficients) else {
            break;
        };
        let (constant, leading) = (integers[0], integers[integers.len() - 1]);
        for q in divisors(leading) {
            for p in divisors(constant) {
                for candidate in [Rational64::new(p, q), Rational64::new(-p, q)] {
                    if let Some(quotient) = deflate(&coefficients, candidate) {
                        trace!("rational root {candidate}");
                        found.push(Number::from(Scalar::Exact(candidate)));
                        coefficients = quotient;
                        continue 'search;
                    }
                }
            }
        }
        break;
    }

    let rest = coefficients
        .into_iter()
        .map(|r| Number::from(Scalar::Exact(r)))
        .collect();
    (found, rest)
}

/// Scales rational coefficients to integers by their common denominator.
fn integer_coefficients(coefficients: &[Rational64]) -> Option<Vec<i64>> {
    let mut lcm = 1i64;
    for c in coefficients {
        let step = lcm / lcm.gcd(c.denom());
        lcm = step.checked_mul(*c.denom())?;
    }
    coefficients
        .iter()
        .map(|c| (*c.numer()).checked_mul(lcm / c.denom()))
        .collect()
}

/// Positive divisors of `n`, capped to keep the search bounded.
fn divisors(n: i64) -> Vec<i64> {
    const LIMIT: u64 = 1 << 40;
    let n = n.unsigned_abs();
    if n == 0 || n > LIMIT {
        return Vec::new();
    }
    let mut small = Vec::new();
    let mut large = Vec::new();
    let mut d = 1u64;
    while d * d <= n {
        if n % d == 0 {
            small.push(d as i64);
            if d * d != n {
                large.push((n / d) as i64);
            }
        }
        d += 1;
    }
    small.extend(large.into_iter().rev());
    small
}

/// Synthetic division by `(x - root)`, if `root` is exactly a root.
fn deflate(coefficients: &[Rational64], root: Rational64) -> Option<Vec<Rational64>> {
    let mut quotient = vec![Rational64::from_integer(0); coefficients.len() - 1];
    let mut carry = Rational64::from_integer(0);
    for (i, c) in coefficients.iter().enumerate().rev() {
        let value = carry.checked_mul(&root)?.checked_add(c)?;
        if i == 0 {
            return (value == Rational64::from_integer(0)).then_some(quotient);
        }
        quotient[i - 1] = value;
        carry = value;
    }
    None
}

/// All complex roots at once by Durand–Kerner iteration.
fn durand_kerner(coefficients: &[Number]) -> Vec<Number> {
    let coefficients: Vec<Complex64> = coefficients.iter().map(Number::to_complex64).collect();
    let degree = coefficients.len() - 1;
    let leading = coefficients[degree];
    let monic: Vec<Complex64> = coefficients.iter().map(|c| c / leading).collect();

    let evaluate = |z: Complex64| monic.iter().rev().fold(Complex64::new(0.0, 0.0), |acc, c| acc * z + c);

    let seed = Complex64::new(0.4, 0.9);
    let mut roots: Vec<Complex64> = (0..degree).map(|k| seed.powu(k as u32)).collect();

    for iteration in 0..MAX_ITERATIONS {
        let mut change: f64 = 0.0;
        for i in 0..degree {
            let denominator = (0..degree)
                .filter(|&j| j != i)
                .fold(Complex64::new(1.0, 0.0), |acc, j| acc * (roots[i] - roots[j]));
            if denominator.norm() == 0.0 {
                continue;
            }
            let step = evaluate(roots[i]) / denominator;
            roots[i] -= step;
            change = change.max(step.norm());
        }
        if change < 1e-15 {
            trace!("durand-kerner converged after {iteration} iterations");
            break;
        }
    }

    roots.into_iter().map(Number::from_complex64).collect()
}

/// Collapses numeric noise: tiny imaginary parts and near-integers.
fn snap(root: Number) -> Number {
    let root = root.cleaned();
    let Number::Complex(re, im) = root else {
        return snap_real(root);
    };
    let parts = |s: Scalar| match snap_real(Number::from(s)) {
        Number::Integer(n) => Scalar::integer(n),
        _ => s,
    };
    Number::Complex(parts(re), parts(im))
}

fn snap_real(value: Number) -> Number {
    match value {
        Number::Real(x) => {
            let nearest = x.round();
            if (x - nearest).abs() <= 1e-9 * nearest.abs().max(1.0) && nearest.abs() < 9.0e15 {
                Number::Integer(nearest as i64)
            } else {
                value
            }
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn integers(values: &[i64]) -> Vec<Number> {
        values.iter().copied().map(Number::Integer).collect()
    }

    fn roots_of(coefficients: &[i64]) -> Vec<Number> {
        match solve_polynomial(integers(coefficients)) {
            SolutionSet::Roots(roots) => roots,
            other => panic!("expected roots, got {other:?}"),
        }
    }

    #[test]
    fn linear_equations() {
        assert_eq!(roots_of(&[-6, 3]), integers(&[2]));
        assert_eq!(roots_of(&[1, 3]), vec![Number::rational(-1, 3)]);
    }

    #[test]
    fn degenerate_equations() {
        assert_eq!(solve_polynomial(integers(&[0])), SolutionSet::AllReals);
        assert_eq!(solve_polynomial(integers(&[5])), SolutionSet::NoSolution);
        assert_eq!(solve_polynomial(integers(&[5, 0, 0])), SolutionSet::NoSolution);
    }

    #[test]
    fn quadratic_roots_are_ordered() {
        assert_eq!(roots_of(&[-4, 0, 1]), integers(&[2, -2]));
        assert_eq!(roots_of(&[6, -5, 1]), integers(&[3, 2]));
        assert_eq!(roots_of(&[1, 0, 1]), vec![Number::complex(0, 1), Number::complex(0, -1)]);
    }

    #[test]
    fn repeated_root_is_reported_once() {
        assert_eq!(roots_of(&[1, -2, 1]), integers(&[1]));
        assert_eq!(roots_of(&[-1, 3, -3, 1]), integers(&[1]));
    }

    #[test]
    fn irrational_quadratic_roots() {
        let roots = roots_of(&[-2, 0, 1]);
        assert_eq!(roots.len(), 2);
        assert!((roots[0].to_f64() - std::f64::consts::SQRT_2).abs() < 1e-12);
        assert!((roots[1].to_f64() + std::f64::consts::SQRT_2).abs() < 1e-12);
    }

    #[test]
    fn cubic_with_rational_roots() {
        // (x - 1)(x - 2)(2x + 1)
        assert_eq!(
            roots_of(&[2, 1, -5, 2]),
            vec![Number::Integer(2), Number::Integer(1), Number::rational(-1, 2)]
        );
        assert_eq!(roots_of(&[0, 0, -1, 1]), integers(&[1, 0]));
    }

    #[test]
    fn quartic_falls_back_to_numeric_roots() {
        // x^4 - 2 has roots ±2^(1/4) and ±2^(1/4) i
        let roots = roots_of(&[-2, 0, 0, 0, 1]);
        let r = 2f64.powf(0.25);
        assert_eq!(roots.len(), 4);
        assert!((roots[0].to_f64() - r).abs() < 1e-9);
        assert!((roots[1].to_complex64().im - r).abs() < 1e-9);
        assert!((roots[2].to_complex64().im + r).abs() < 1e-9);
        assert!((roots[3].to_f64() + r).abs() < 1e-9);
    }

    #[test]
    fn quintic_numeric_roots_snap_to_integers() {
        // (x^2 + 1)(x - 3)(x^2 - 2): one rational root, the rest numeric
        let roots = roots_of(&[6, -2, 3, -1, -3, 1]);
        assert_eq!(roots[0], Number::Integer(3));
        assert_eq!(roots.len(), 5);
    }

    #[test]
    fn divisors_are_sorted() {
        assert_eq!(divisors(12), vec![1, 2, 3, 4, 6, 12]);
        assert_eq!(divisors(-9), vec![1, 3, 9]);
        assert!(divisors(0).is_empty());
    }
}
