use std::{borrow::Cow, collections::HashMap};

use miette::SourceSpan;

use crate::{
    error::EvalError,
    number::Number,
    parse::{Atom, Op, TokenTree},
    system,
};

/// Variable bindings visible to the evaluator.
#[derive(Debug, Default, Clone)]
pub struct Environment<'de> {
    values: HashMap<Cow<'de, str>, Number>,
}

impl<'de> Environment<'de> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Number> {
        self.values.get(name).copied()
    }

    pub fn define(&mut self, name: Cow<'de, str>, value: Number) {
        self.values.insert(name, value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }
}

/// Named constants, which are never unknowns.
pub fn constant(name: &str) -> Option<Number> {
    match name {
        "pi" | "π" => Some(Number::Real(std::f64::consts::PI)),
        "e" => Some(Number::Real(std::f64::consts::E)),
        _ => None,
    }
}

/// Looks `name` up in the bindings first, then among the constants.
pub fn resolve(environment: &Environment<'_>, name: &str) -> Option<Number> {
    environment.get(name).or_else(|| constant(name))
}

pub fn evaluate(tree: &TokenTree<'_>, environment: &Environment<'_>) -> Result<Number, EvalError> {
    Ok(match tree {
        TokenTree::Atom(atom) => match *atom {
            Atom::Number(value) => value,
            Atom::Imaginary => Number::i(),
            Atom::Ident(name, offset) => {
                let Some(value) = resolve(environment, name) else {
                    return Err(EvalError::UnboundVariable {
                        name: name.to_string(),
                        span: SourceSpan::from(offset..offset + name.len()),
                    });
                };
                value
            }
        },
        TokenTree::Cons(op, trees) => {
            let values = trees
                .iter()
                .map(|tree| evaluate(tree, environment))
                .collect::<Result<Vec<_>, _>>()?;
            match (op, values.as_slice()) {
                (Op::Minus, [value]) => -*value,
                (Op::Plus, [value]) => *value,
                (Op::Root, [value]) => value.sqrt().cleaned(),
                (Op::Percent, [value]) => value.checked_div(Number::Integer(100))?,
                (Op::Plus, [lhs, rhs]) => *lhs + *rhs,
                (Op::Minus, [lhs, rhs]) => *lhs - *rhs,
                (Op::Star, [lhs, rhs]) => *lhs * *rhs,
                (Op::Slash, [lhs, rhs]) => lhs.checked_div(*rhs)?,
                (Op::Caret, [lhs, rhs]) => lhs.pow(*rhs)?.cleaned(),
                (op, values) => {
                    return Err(EvalError::Domain(format!(
                        "`{op}` cannot take {} operands",
                        values.len()
                    )));
                }
            }
        }
        TokenTree::Call {
            name,
            offset,
            arguments,
        } => {
            let Some(function) = system::lookup(name) else {
                return Err(EvalError::UnknownFunction {
                    name: name.to_string(),
                    span: SourceSpan::from(*offset..*offset + name.len()),
                    available: format!("available functions: {}", system::NAMES.join(" ")),
                });
            };
            let values = arguments
                .iter()
                .map(|tree| evaluate(tree, environment))
                .collect::<Result<Vec<_>, _>>()?;
            function(&values)?.cleaned()
        }
    })
}
