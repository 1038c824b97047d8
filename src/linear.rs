use log::trace;

use crate::{
    error::SolveError,
    eval::Environment,
    number::Number,
    parse::Equation,
    poly::Polynomial,
};

/// Solves a system of linear equations by Gauss–Jordan elimination with
/// partial pivoting. Bindings come back in the order of `unknowns`.
pub fn solve_system(
    equations: &[Equation<'_>],
    unknowns: &[&str],
    environment: &Environment<'_>,
) -> Result<Vec<(String, Number)>, SolveError> {
    let mut rows = Vec::with_capacity(equations.len());
    for equation in equations {
        let polynomial = Polynomial::from_equation(equation, unknowns, environment)?;
        let (mut row, constant) = polynomial.linear_row(unknowns)?;
        row.push(constant);
        rows.push(row);
    }

    let columns = unknowns.len();
    let scale = rows
        .iter()
        .flatten()
        .map(Number::magnitude)
        .fold(1.0, f64::max);
    let negligible = |value: &Number| value.is_zero() || value.is_negligible(scale);

    let mut pivots = Vec::new();
    for column in 0..columns {
        let rank = pivots.len();
        let Some(best) = (rank..rows.len())
            .filter(|&r| !negligible(&rows[r][column]))
            .max_by(|&a, &b| {
                rows[a][column]
                    .magnitude()
                    .total_cmp(&rows[b][column].magnitude())
            })
        else {
            continue;
        };
        rows.swap(rank, best);
        trace!("pivot on {} in row {rank}", unknowns[column]);

        let pivot = rows[rank][column];
        for value in rows[rank].iter_mut() {
            *value = value.checked_div(pivot)?;
        }

        for r in 0..rows.len() {
            let factor = rows[r][column];
            if r == rank || factor.is_zero() {
                continue;
            }
            for c in 0..=columns {
                let delta = factor * rows[rank][c];
                rows[r][c] = rows[r][c] - delta;
            }
        }
        pivots.push(column);
    }

    let rank = pivots.len();
    if rows[rank..].iter().any(|row| !negligible(&row[columns])) {
        return Err(SolveError::Inconsistent);
    }
    if rank < columns {
        let free = (0..columns)
            .filter(|column| !pivots.contains(column))
            .map(|column| unknowns[column].to_string())
            .collect();
        return Err(SolveError::Underdetermined { free });
    }

    let mut bindings: Vec<(String, Number)> = pivots
        .iter()
        .enumerate()
        .map(|(row, &column)| (unknowns[column].to_string(), rows[row][columns].cleaned()))
        .collect();
    bindings.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(bindings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::{Parsed, Parser};

    fn solve(input: &str) -> Result<Vec<(String, Number)>, SolveError> {
        let Ok(Parsed::Equations(system)) = Parser::new(input).parse() else {
            panic!("{input:?} should parse as equations");
        };
        let unknowns: Vec<&str> = system.unknowns.iter().copied().collect();
        solve_system(&system.equations, &unknowns, &Environment::new())
    }

    fn binding(name: &str, value: Number) -> (String, Number) {
        (name.to_string(), value)
    }

    #[test]
    fn two_by_two() {
        assert_eq!(
            solve("x+y=5, x-y=1"),
            Ok(vec![binding("x", Number::Integer(3)), binding("y", Number::Integer(2))])
        );
    }

    #[test]
    fn three_by_three_with_fractions() {
        assert_eq!(
            solve("2a + b - c = 8, -3a - b + 2c = -11, -2a + b + 2c = -3"),
            Ok(vec![
                binding("a", Number::Integer(2)),
                binding("b", Number::Integer(3)),
                binding("c", Number::Integer(-1)),
            ])
        );
        assert_eq!(
            solve("3x + y = 1, x - y = 0"),
            Ok(vec![binding("x", Number::rational(1, 4)), binding("y", Number::rational(1, 4))])
        );
    }

    #[test]
    fn redundant_equations_are_fine() {
        assert_eq!(
            solve("x + y = 2, 2x + 2y = 4, x - y = 0"),
            Ok(vec![binding("x", Number::Integer(1)), binding("y", Number::Integer(1))])
        );
    }

    #[test]
    fn inconsistent_is_checked_first() {
        assert_eq!(solve("x + y = 1, x + y = 2"), Err(SolveError::Inconsistent));
        assert_eq!(solve("x + y + z = 1, x + y + z = 2"), Err(SolveError::Inconsistent));
    }

    #[test]
    fn underdetermined_lists_free_unknowns() {
        assert_eq!(
            solve("x + y = 2, 2x + 2y = 4"),
            Err(SolveError::Underdetermined {
                free: vec!["y".to_string()]
            })
        );
        assert_eq!(
            solve("x + y = 5"),
            Err(SolveError::Underdetermined {
                free: vec!["y".to_string()]
            })
        );
    }

    #[test]
    fn nonlinear_systems_are_rejected() {
        assert!(matches!(solve("x*y = 1, x + y = 2"), Err(SolveError::UnsupportedForm(_))));
        assert!(matches!(solve("x^2 = 1, y = 2"), Err(SolveError::UnsupportedForm(_))));
    }

    #[test]
    fn complex_coefficients() {
        assert_eq!(
            solve("x + y = 2i, x - y = 0"),
            Ok(vec![binding("x", Number::complex(0, 1)), binding("y", Number::complex(0, 1))])
        );
    }
}
