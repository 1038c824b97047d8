use std::collections::BTreeMap;

use crate::{
    error::SolveError,
    eval::{self, Environment},
    number::Number,
    parse::{Atom, Equation, Op, TokenTree},
};

/// Highest power of an unknown the solvers accept.
pub const MAX_DEGREE: u32 = 64;

/// A polynomial over a fixed, ordered list of unknowns. Each monomial key holds
/// one exponent per unknown.
#[derive(Debug, Clone, PartialEq)]
pub struct Polynomial {
    arity: usize,
    terms: BTreeMap<Vec<u32>, Number>,
}

impl Polynomial {
    pub fn constant(arity: usize, value: Number) -> Self {
        let mut polynomial = Polynomial {
            arity,
            terms: BTreeMap::new(),
        };
        polynomial.accumulate(vec![0; arity], value);
        polynomial
    }

    pub fn variable(arity: usize, index: usize) -> Self {
        let mut monomial = vec![0; arity];
        monomial[index] = 1;
        let mut polynomial = Polynomial {
            arity,
            terms: BTreeMap::new(),
        };
        polynomial.accumulate(monomial, Number::Integer(1));
        polynomial
    }

    /// `lhs - rhs` of the equation as a polynomial in `unknowns`.
    pub fn from_equation(
        equation: &Equation<'_>,
        unknowns: &[&str],
        environment: &Environment<'_>,
    ) -> Result<Self, SolveError> {
        let lhs = Self::from_tree(&equation.lhs, unknowns, environment)?;
        let rhs = Self::from_tree(&equation.rhs, unknowns, environment)?;
        Ok(lhs.sub(&rhs))
    }

    pub fn from_tree(
        tree: &TokenTree<'_>,
        unknowns: &[&str],
        environment: &Environment<'_>,
    ) -> Result<Self, SolveError> {
        let arity = unknowns.len();
        let Some(unknown) = first_mentioned(tree, unknowns) else {
            return Ok(Self::constant(arity, eval::evaluate(tree, environment)?));
        };

        match tree {
            TokenTree::Atom(Atom::Ident(name, _)) => {
                let index = unknowns
                    .iter()
                    .position(|candidate| candidate == name)
                    .unwrap_or_default();
                Ok(Self::variable(arity, index))
            }
            TokenTree::Cons(op, trees) => {
                let operand = |i: usize| -> Result<Self, SolveError> {
                    match trees.get(i) {
                        Some(tree) => Self::from_tree(tree, unknowns, environment),
                        None => Err(SolveError::UnsupportedForm(format!("malformed `{op}`"))),
                    }
                };
                match (op, trees.len()) {
                    (Op::Minus, 1) => Ok(operand(0)?.neg()),
                    (Op::Plus, 1) => operand(0),
                    (Op::Plus, 2) => Ok(operand(0)?.add(&operand(1)?)),
                    (Op::Minus, 2) => Ok(operand(0)?.sub(&operand(1)?)),
                    (Op::Star, 2) => operand(0)?.mul(&operand(1)?),
                    (Op::Percent, 1) => operand(0)?.divide(Number::Integer(100)),
                    (Op::Slash, 2) => {
                        if first_mentioned(&trees[1], unknowns).is_some() {
                            return Err(SolveError::UnsupportedForm(format!(
                                "`{unknown}` appears in a denominator"
                            )));
                        }
                        let divisor = eval::evaluate(&trees[1], environment)?;
                        operand(0)?.divide(divisor)
                    }
                    (Op::Caret, 2) => {
                        if first_mentioned(&trees[1], unknowns).is_some() {
                            return Err(SolveError::UnsupportedForm(format!(
                                "`{unknown}` appears in an exponent"
                            )));
                        }
                        let exponent = eval::evaluate(&trees[1], environment)?;
                        match exponent.as_integer() {
                            Some(n) if (0..=i64::from(MAX_DEGREE)).contains(&n) => {
                                operand(0)?.pow(n as u32)
                            }
                            Some(n) if n > i64::from(MAX_DEGREE) => {
                                Err(SolveError::UnsupportedForm(format!(
                                    "`{unknown}` is raised to a power above {MAX_DEGREE}"
                                )))
                            }
                            _ => Err(SolveError::UnsupportedForm(format!(
                                "`{unknown}` is raised to a negative or fractional power"
                            ))),
                        }
                    }
                    (Op::Root, _) => Err(SolveError::UnsupportedForm(format!(
                        "`{unknown}` appears under a square root"
                    ))),
                    (op, _) => Err(SolveError::UnsupportedForm(format!(
                        "`{op}` cannot be applied to `{unknown}`"
                    ))),
                }
            }
            TokenTree::Call { name, .. } => Err(SolveError::UnsupportedForm(format!(
                "`{unknown}` appears inside `{name}`"
            ))),
            TokenTree::Atom(_) => Ok(Self::constant(arity, eval::evaluate(tree, environment)?)),
        }
    }

    fn accumulate(&mut self, monomial: Vec<u32>, value: Number) {
        let sum = match self.terms.remove(&monomial) {
            Some(existing) => existing + value,
            None => value,
        };
        if !sum.is_zero() {
            self.terms.insert(monomial, sum);
        }
    }

    pub fn add(&self, other: &Self) -> Self {
        let mut sum = self.clone();
        for (monomial, value) in &other.terms {
            sum.accumulate(monomial.clone(), *value);
        }
        sum
    }

    pub fn neg(&self) -> Self {
        Polynomial {
            arity: self.arity,
            terms: self
                .terms
                .iter()
                .map(|(monomial, value)| (monomial.clone(), -*value))
                .collect(),
        }
    }

    pub fn sub(&self, other: &Self) -> Self {
        self.add(&other.neg())
    }

    pub fn mul(&self, other: &Self) -> Result<Self, SolveError> {
        let mut product = Self::constant(self.arity, Number::Integer(0));
        for (left, a) in &self.terms {
            for (right, b) in &other.terms {
                let monomial: Vec<u32> = left.iter().zip(right).map(|(x, y)| x + y).collect();
                if monomial.iter().any(|&exponent| exponent > MAX_DEGREE) {
                    return Err(SolveError::UnsupportedForm(format!(
                        "degree above {MAX_DEGREE}"
                    )));
                }
                product.accumulate(monomial, *a * *b);
            }
        }
        Ok(product)
    }

    pub fn pow(&self, n: u32) -> Result<Self, SolveError> {
        let mut result = Self::constant(self.arity, Number::Integer(1));
        for _ in 0..n {
            result = result.mul(self)?;
        }
        Ok(result)
    }

    pub fn divide(&self, divisor: Number) -> Result<Self, SolveError> {
        let mut terms = BTreeMap::new();
        for (monomial, value) in &self.terms {
            terms.insert(monomial.clone(), value.checked_div(divisor)?);
        }
        Ok(Polynomial {
            arity: self.arity,
            terms,
        })
    }

    pub fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    /// Highest total degree of any term.
    pub fn degree(&self) -> u32 {
        self.terms
            .keys()
            .map(|monomial| monomial.iter().sum())
            .max()
            .unwrap_or(0)
    }

    /// Coefficients in the first unknown, lowest power first. A polynomial
    /// without unknowns yields its constant.
    pub fn univariate(&self) -> Vec<Number> {
        let degree = self.degree() as usize;
        let mut coefficients = vec![Number::Integer(0); degree + 1];
        for (monomial, value) in &self.terms {
            let power = monomial.first().copied().unwrap_or(0) as usize;
            coefficients[power] = *value;
        }
        coefficients
    }

    /// Splits a linear polynomial into per-unknown coefficients and the
    /// constant moved to the right-hand side.
    pub fn linear_row(&self, unknowns: &[&str]) -> Result<(Vec<Number>, Number), SolveError> {
        let mut coefficients = vec![Number::Integer(0); self.arity];
        let mut constant = Number::Integer(0);
        for (monomial, value) in &self.terms {
            match monomial.iter().sum::<u32>() {
                0 => constant = -*value,
                1 => {
                    let index = monomial.iter().position(|&e| e == 1).unwrap_or_default();
                    coefficients[index] = *value;
                }
                _ => {
                    let term = monomial
                        .iter()
                        .zip(unknowns)
                        .filter(|(exponent, _)| **exponent > 0)
                        .map(|(exponent, name)| match exponent {
                            1 => name.to_string(),
                            e => format!("{name}^{e}"),
                        })
                        .collect::<Vec<_>>()
                        .join("*");
                    return Err(SolveError::UnsupportedForm(format!(
                        "nonlinear term `{term}` in a system of equations"
                    )));
                }
            }
        }
        Ok((coefficients, constant))
    }
}

/// The first of `unknowns` that occurs in `tree`.
fn first_mentioned<'a>(tree: &TokenTree<'_>, unknowns: &[&'a str]) -> Option<&'a str> {
    unknowns.iter().copied().find(|name| tree.mentions(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::{Parsed, Parser};

    fn polynomial(input: &str, unknowns: &[&str]) -> Result<Polynomial, SolveError> {
        let Ok(Parsed::Equations(system)) = Parser::new(input).parse() else {
            panic!("{input:?} should parse as an equation");
        };
        Polynomial::from_equation(&system.equations[0], unknowns, &Environment::new())
    }

    #[test]
    fn collects_like_terms() {
        let p = polynomial("x^2 - 4 = 0", &["x"]).unwrap();
        assert_eq!(
            p.univariate(),
            vec![Number::Integer(-4), Number::Integer(0), Number::Integer(1)]
        );

        let p = polynomial("(x+1)^2 = x^2", &["x"]).unwrap();
        assert_eq!(p.univariate(), vec![Number::Integer(1), Number::Integer(2)]);
    }

    #[test]
    fn constant_divisors_are_fine() {
        let p = polynomial("x/2 + 1/3 = 0", &["x"]).unwrap();
        assert_eq!(
            p.univariate(),
            vec![Number::rational(1, 3), Number::rational(1, 2)]
        );
    }

    #[test]
    fn unsupported_forms() {
        for input in ["1/x = 2", "sqrt(x) = 2", "2^x = 8", "x^(1/2) = 3", "x^-1 = 1", "√x = 1"] {
            assert!(
                matches!(polynomial(input, &["x"]), Err(SolveError::UnsupportedForm(_))),
                "{input} should be unsupported"
            );
        }
    }

    #[test]
    fn linear_rows() {
        let p = polynomial("2x - y + 3 = 1", &["x", "y"]).unwrap();
        let (coefficients, constant) = p.linear_row(&["x", "y"]).unwrap();
        assert_eq!(coefficients, vec![Number::Integer(2), Number::Integer(-1)]);
        assert_eq!(constant, Number::Integer(-2));

        let p = polynomial("x*y = 1", &["x", "y"]).unwrap();
        assert!(matches!(
            p.linear_row(&["x", "y"]),
            Err(SolveError::UnsupportedForm(message)) if message.contains("x*y")
        ));
    }

    #[test]
    fn degree_is_capped() {
        assert!(polynomial("x^65 = 1", &["x"]).is_err());
        assert!(polynomial("(x^40)^2 = 1", &["x"]).is_err());
        assert_eq!(polynomial("x^64 = 1", &["x"]).unwrap().degree(), 64);
    }
}
