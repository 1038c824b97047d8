//! Property-based tests for the calculation pipeline.

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::{Answer, Environment, Formatter, Number, SolutionSet, Style, calculate};

    fn small_int() -> impl Strategy<Value = i64> {
        -1000i64..1000i64
    }

    fn non_zero_int() -> impl Strategy<Value = i64> {
        prop_oneof![(-1000i64..=-1i64), (1i64..=1000i64)]
    }

    fn style() -> impl Strategy<Value = Style> {
        prop_oneof![Just(Style::Ascii), Just(Style::Unicode), Just(Style::Latex)]
    }

    fn value_of(input: &str) -> Number {
        match calculate(input, &Environment::new()) {
            Ok(Answer::Value(value)) => value,
            other => panic!("{input:?} gave {other:?}"),
        }
    }

    proptest! {
        #[test]
        fn integer_sums_stay_integers(a in small_int(), b in small_int()) {
            prop_assert_eq!(value_of(&format!("{a} + {b}")), Number::Integer(a + b));
        }

        #[test]
        fn formatted_rationals_read_back(n in small_int(), d in non_zero_int()) {
            let value = Number::rational(n, d);
            prop_assert_eq!(value_of(&value.to_string()), value);
        }

        #[test]
        fn formatting_is_idempotent(
            re in -1.0e6f64..1.0e6,
            n in small_int(),
            d in non_zero_int(),
            style in style(),
        ) {
            let formatter = Formatter::new(style);
            for value in [
                Number::Real(re),
                Number::rational(n, d),
                Number::Complex(Number::rational(n, d).parts().0, Number::Real(re).parts().0),
            ] {
                prop_assert_eq!(formatter.number(&value), formatter.number(&value));
            }
        }

        #[test]
        fn quadratics_with_integer_roots(r1 in -50i64..50, r2 in -50i64..50) {
            let answer = calculate(&format!("(x - {r1})(x - {r2}) = 0"), &Environment::new());
            let mut expected = vec![Number::Integer(r1.max(r2))];
            if r1 != r2 {
                expected.push(Number::Integer(r1.min(r2)));
            }
            prop_assert_eq!(
                answer.ok(),
                Some(Answer::Solutions {
                    unknown: Some("x".to_string()),
                    set: SolutionSet::Roots(expected),
                })
            );
        }

        #[test]
        fn linear_systems_recover_their_solution(
            x in small_int(),
            y in small_int(),
            a in non_zero_int(),
            b in small_int(),
        ) {
            // x + b·y and a·x - y are independent whenever a·b != -1
            prop_assume!(a * b != -1);
            let input = format!("x + {b}y = {}, {a}x - y = {}", x + b * y, a * x - y);
            let answer = calculate(&input, &Environment::new());
            prop_assert_eq!(
                answer.ok(),
                Some(Answer::Bindings(vec![
                    ("x".to_string(), Number::Integer(x)),
                    ("y".to_string(), Number::Integer(y)),
                ]))
            );
        }
    }
}
