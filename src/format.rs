use std::fmt::Display;

use clap::ValueEnum;
use num_rational::Rational64;
use num_traits::Signed;

use crate::{
    number::{Number, Scalar},
    solve::SolutionSet,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Style {
    /// Plain text: `x = 1/2, -1`, `3 - 2i`.
    #[default]
    Ascii,
    /// Unicode symbols, with square roots shown as surds: `(1 + √5)/2`.
    Unicode,
    /// LaTeX math: `\frac{1}{2}`, `\sqrt{2}`.
    Latex,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Formatter {
    style: Style,
}

/// `(p + s·a√k)/q`, a float recognized as a quadratic surd.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Surd {
    p: i64,
    negative: bool,
    a: i64,
    k: i64,
    q: i64,
}

impl Formatter {
    pub fn new(style: Style) -> Self {
        Formatter { style }
    }

    pub fn number(&self, value: &Number) -> String {
        match value.cleaned() {
            Number::Integer(n) => n.to_string(),
            Number::Rational(r) => self.rational(r),
            Number::Real(x) => self.real(x),
            Number::Complex(re, im) => self.complex(re, im),
        }
    }

    /// `x = 2, -2` for roots; the empty and full sets in the style's notation.
    pub fn solutions(&self, unknown: Option<&str>, solutions: &SolutionSet) -> String {
        match (solutions, unknown, self.style) {
            (SolutionSet::Roots(roots), unknown, _) => {
                let roots = roots
                    .iter()
                    .map(|root| self.number(root))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{} = {roots}", unknown.unwrap_or("x"))
            }
            (SolutionSet::AllReals, None, _) | (SolutionSet::AllReals, _, Style::Ascii) => {
                "infinite solutions".to_string()
            }
            (SolutionSet::NoSolution, None, _) | (SolutionSet::NoSolution, _, Style::Ascii) => {
                "no solution".to_string()
            }
            (SolutionSet::AllReals, Some(x), Style::Unicode) => format!("{x} ∈ ℝ"),
            (SolutionSet::NoSolution, Some(x), Style::Unicode) => format!("{x} ∈ ∅"),
            (SolutionSet::AllReals, Some(x), Style::Latex) => format!("{x} \\in \\mathbb{{R}}"),
            (SolutionSet::NoSolution, Some(x), Style::Latex) => format!("{x} \\in \\emptyset"),
        }
    }

    /// `x = 3, y = 2`.
    pub fn bindings(&self, bindings: &[(String, Number)]) -> String {
        bindings
            .iter()
            .map(|(name, value)| format!("{name} = {}", self.number(value)))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn scalar(&self, value: Scalar) -> String {
        match value {
            Scalar::Exact(r) if r.is_integer() => r.numer().to_string(),
            Scalar::Exact(r) => self.rational(r),
            Scalar::Approx(x) => self.real(x),
        }
    }

    fn rational(&self, r: Rational64) -> String {
        match self.style {
            Style::Latex => {
                let sign = if r.is_negative() { "-" } else { "" };
                format!("{sign}\\frac{{{}}}{{{}}}", r.numer().unsigned_abs(), r.denom())
            }
            _ => format!("{}/{}", r.numer(), r.denom()),
        }
    }

    fn real(&self, x: f64) -> String {
        if self.style != Style::Ascii {
            if let Some(surd) = Surd::recognize(x) {
                return self.surd(surd);
            }
        }
        format_real(x)
    }

    fn surd(&self, Surd { p, negative, a, k, q }: Surd) -> String {
        let sign = if negative { "-" } else { "+" };
        let radical = match (self.style, a) {
            (Style::Latex, 1) => format!("\\sqrt{{{k}}}"),
            (Style::Latex, a) => format!("{a}\\sqrt{{{k}}}"),
            (_, 1) => format!("√{k}"),
            (_, a) => format!("{a}√{k}"),
        };
        let numerator = match p {
            0 if negative => format!("-{radical}"),
            0 => radical,
            p => format!("{p} {sign} {radical}"),
        };
        match (self.style, q) {
            (_, 1) => numerator,
            (Style::Latex, q) => match numerator.strip_prefix('-') {
                Some(positive) if p == 0 => format!("-\\frac{{{positive}}}{{{q}}}"),
                _ => format!("\\frac{{{numerator}}}{{{q}}}"),
            },
            (_, q) if p == 0 => format!("{numerator}/{q}"),
            (_, q) => format!("({numerator})/{q}"),
        }
    }

    fn complex(&self, re: Scalar, im: Scalar) -> String {
        let text = self.scalar(im.abs());
        let coefficient = if text == "1" {
            String::new()
        } else if self.style != Style::Latex && (text.contains('/') || text.contains(' ')) {
            format!("({text})")
        } else {
            text
        };

        if re.is_zero() {
            let sign = if im.is_negative() { "-" } else { "" };
            format!("{sign}{coefficient}i")
        } else {
            let sign = if im.is_negative() { "-" } else { "+" };
            format!("{} {sign} {coefficient}i", self.scalar(re))
        }
    }
}

/// At most ten decimals with trailing zeros trimmed; scientific notation
/// outside `[1e-10, 1e15)`.
pub fn format_real(x: f64) -> String {
    if x == 0.0 {
        return "0".to_string();
    }
    if !x.is_finite() {
        return x.to_string();
    }

    let magnitude = x.abs();
    let text = if (1e-10..1e15).contains(&magnitude) {
        trim_fraction(&format!("{x:.10}")).to_string()
    } else {
        let text = format!("{x:.10e}");
        match text.split_once('e') {
            Some((mantissa, exponent)) => format!("{}e{exponent}", trim_fraction(mantissa)),
            None => text,
        }
    };

    if text == "-0" { "0".to_string() } else { text }
}

fn trim_fraction(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

impl Surd {
    const MAX_DENOMINATOR: i64 = 12;
    const MAX_OFFSET: i64 = 50;
    const MAX_RADICAND: i64 = 10_000;
    const TOLERANCE: f64 = 1e-10;

    /// Finds small integers with `x = (p ± a√k)/q`, `k` square-free and > 1.
    fn recognize(x: f64) -> Option<Surd> {
        if !x.is_finite() || x.abs() > 1e6 {
            return None;
        }
        for q in 1..=Self::MAX_DENOMINATOR {
            let scaled = x * q as f64;
            for offset in 0..=Self::MAX_OFFSET {
                for p in [offset, -offset] {
                    if offset == 0 && p < 0 {
                        continue;
                    }
                    let t = scaled - p as f64;
                    let square = t * t;
                    let m = square.round();
                    if m < 2.0
                        || m > Self::MAX_RADICAND as f64
                        || (square - m).abs() > Self::TOLERANCE * m
                    {
                        continue;
                    }
                    let (a, k) = split_square(m as i64);
                    if k == 1 || gcd3(p, a, q) != 1 {
                        continue;
                    }
                    return Some(Surd {
                        p,
                        negative: t < 0.0,
                        a,
                        k,
                        q,
                    });
                }
            }
        }
        None
    }
}

/// `m = a²·k` with `k` square-free.
fn split_square(m: i64) -> (i64, i64) {
    let mut a = 1;
    let mut k = m;
    let mut f = 2;
    while f * f <= k {
        while k % (f * f) == 0 {
            k /= f * f;
            a *= f;
        }
        f += 1;
    }
    (a, k)
}

fn gcd3(a: i64, b: i64, c: i64) -> i64 {
    use num_integer::Integer;
    a.gcd(&b).gcd(&c)
}

impl Display for Number {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", Formatter::default().number(self))
    }
}

impl Display for SolutionSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", Formatter::default().solutions(None, self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ascii(value: Number) -> String {
        Formatter::new(Style::Ascii).number(&value)
    }

    #[test]
    fn integers_and_rationals() {
        assert_eq!(ascii(Number::Integer(-12)), "-12");
        assert_eq!(ascii(Number::rational(-3, 4)), "-3/4");
        assert_eq!(
            Formatter::new(Style::Latex).number(&Number::rational(-3, 4)),
            "-\\frac{3}{4}"
        );
    }

    #[test]
    fn reals() {
        assert_eq!(ascii(Number::Real(0.1 + 0.2)), "0.3");
        assert_eq!(ascii(Number::Real(-0.0)), "0");
        assert_eq!(ascii(Number::Real(2.5)), "2.5");
        assert_eq!(ascii(Number::Real(1e20)), "1e20");
        assert_eq!(ascii(Number::Real(1.5e-12)), "1.5e-12");
        assert_eq!(ascii(Number::Real(-1e-11 / 3.0)), "-3.3333333333e-12");
    }

    #[test]
    fn complex_numbers() {
        assert_eq!(ascii(Number::complex(5, -1)), "5 - i");
        assert_eq!(ascii(Number::complex(5, 1)), "5 + i");
        assert_eq!(ascii(Number::complex(0, -1)), "-i");
        assert_eq!(ascii(Number::complex(0, 2)), "2i");
        assert_eq!(ascii(Number::complex(-3, 0)), "-3");
        assert_eq!(
            ascii(Number::Complex(
                Scalar::Exact(Rational64::new(1, 2)),
                Scalar::Exact(Rational64::new(3, 4))
            )),
            "1/2 + (3/4)i"
        );
    }

    #[test]
    fn unit_float_imaginary_part_prints_as_i() {
        assert_eq!(ascii(Number::Complex(Scalar::zero(), Scalar::Approx(1.0))), "i");
        assert_eq!(ascii(Number::Complex(Scalar::zero(), Scalar::Approx(-1.0))), "-i");
        assert_eq!(
            ascii(Number::Complex(Scalar::integer(2), Scalar::Approx(1.0 + 1e-15))),
            "2 + i"
        );
        assert_eq!(ascii(Number::Complex(Scalar::zero(), Scalar::Approx(1.5))), "1.5i");
    }

    #[test]
    fn latex_fraction_with_the_smallest_numerator() {
        let latex = Formatter::new(Style::Latex);
        let r = Rational64::new_raw(i64::MIN, 3);
        assert_eq!(latex.number(&Number::Rational(r)), "-\\frac{9223372036854775808}{3}");
    }

    #[test]
    fn solution_sets() {
        let ascii = Formatter::new(Style::Ascii);
        let unicode = Formatter::new(Style::Unicode);
        let roots = SolutionSet::Roots(vec![Number::Integer(2), Number::Integer(-2)]);
        assert_eq!(ascii.solutions(Some("x"), &roots), "x = 2, -2");
        assert_eq!(ascii.solutions(Some("x"), &SolutionSet::AllReals), "infinite solutions");
        assert_eq!(ascii.solutions(None, &SolutionSet::NoSolution), "no solution");
        assert_eq!(unicode.solutions(Some("t"), &SolutionSet::AllReals), "t ∈ ℝ");
        assert_eq!(unicode.solutions(Some("t"), &SolutionSet::NoSolution), "t ∈ ∅");
    }

    #[test]
    fn bindings() {
        let bindings = vec![
            ("x".to_string(), Number::Integer(3)),
            ("y".to_string(), Number::rational(1, 2)),
        ];
        assert_eq!(Formatter::default().bindings(&bindings), "x = 3, y = 1/2");
    }

    #[test]
    fn surds() {
        let unicode = Formatter::new(Style::Unicode);
        let latex = Formatter::new(Style::Latex);
        let golden = Number::Real((1.0 + 5f64.sqrt()) / 2.0);

        assert_eq!(unicode.number(&Number::Real(2f64.sqrt())), "√2");
        assert_eq!(unicode.number(&Number::Real(-2.0 * 3f64.sqrt())), "-2√3");
        assert_eq!(unicode.number(&golden), "(1 + √5)/2");
        assert_eq!(unicode.number(&Number::Real(2f64.sqrt() / 2.0)), "√2/2");
        assert_eq!(latex.number(&golden), "\\frac{1 + \\sqrt{5}}{2}");
        assert_eq!(latex.number(&Number::Real(-(2f64.sqrt()) / 2.0)), "-\\frac{\\sqrt{2}}{2}");
        assert_eq!(ascii(golden), "1.6180339887");
    }

    #[test]
    fn formatting_is_idempotent() {
        let value = Number::Complex(Scalar::Approx(0.5), Scalar::Exact(Rational64::new(-7, 3)));
        let unicode = Formatter::new(Style::Unicode);
        assert_eq!(unicode.number(&value), unicode.number(&value));
        assert_eq!(unicode.number(&value), "0.5 - (7/3)i");
    }
}
