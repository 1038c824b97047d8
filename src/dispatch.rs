use std::{
    borrow::Cow,
    io::{self, BufRead, Write},
};

use log::{debug, info};
use miette::{NamedSource, Report};

use crate::{
    error::{CalcError, EvalError},
    eval::{self, Environment},
    format::{Formatter, Style},
    linear::solve_system,
    number::Number,
    parse::{Parsed, Parser},
    solve::{SolutionSet, solve},
};

pub const USAGE: &str = "\
Usage: mathcalc [OPTIONS] <EXPRESSION>...

Evaluates an expression or solves equations.

Examples:
  mathcalc \"2 + 2\"               4
  mathcalc \"(3+2i)*(1-i)\"        5 - i
  mathcalc \"x^2-4=0\"             x = 2, -2
  mathcalc \"x+y=5, x-y=1\"        x = 3, y = 2

Options:
  -f, --format <STYLE>  Output style: ascii, unicode, latex [default: ascii]
  -i, --interactive     Read one input per line; `ans` holds the last value
      --explain         Show errors as full diagnostics
      --tokens          Print the token stream instead of calculating
      --ast             Print the parsed tree instead of calculating
  -v, --verbose...      Log more (repeat for more detail)
  -h, --help            Print help
  -V, --version         Print version";

/// A successful calculation, before formatting.
#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    Value(Number),
    Solutions {
        unknown: Option<String>,
        set: SolutionSet,
    },
    Bindings(Vec<(String, Number)>),
}

impl Answer {
    pub fn render(&self, formatter: &Formatter) -> String {
        match self {
            Answer::Value(value) => formatter.number(value),
            Answer::Solutions { unknown, set } => formatter.solutions(unknown.as_deref(), set),
            Answer::Bindings(bindings) => formatter.bindings(bindings),
        }
    }
}

/// Parses `input` and evaluates or solves it, depending on its shape.
pub fn calculate(input: &str, environment: &Environment<'_>) -> Result<Answer, CalcError> {
    let parsed = Parser::new(input).parse()?;
    debug!("parsed `{input}` as {parsed}");

    let mut system = match parsed {
        Parsed::Expression(tree) => {
            debug!("evaluating");
            let value = eval::evaluate(&tree, environment)?;
            if !value.is_finite() {
                return Err(EvalError::Domain("result is not a finite number".to_string()).into());
            }
            return Ok(Answer::Value(value));
        }
        Parsed::Equations(system) => system,
    };

    system.unknowns.retain(|name| !environment.contains(name));
    let unknowns: Vec<&str> = system.unknowns.iter().copied().collect();

    match (system.equations.as_slice(), unknowns.as_slice()) {
        (equations, []) => {
            debug!("checking {} equation(s) without unknowns", equations.len());
            let mut set = SolutionSet::AllReals;
            for equation in equations {
                if solve(equation, None, environment)? == SolutionSet::NoSolution {
                    set = SolutionSet::NoSolution;
                }
            }
            Ok(Answer::Solutions { unknown: None, set })
        }
        ([equation], [unknown]) => {
            debug!("solving for {unknown}");
            Ok(Answer::Solutions {
                unknown: Some(unknown.to_string()),
                set: solve(equation, Some(*unknown), environment)?,
            })
        }
        (equations, unknowns) => {
            debug!(
                "solving a system of {} equation(s) in {}",
                equations.len(),
                unknowns.join(", ")
            );
            Ok(Answer::Bindings(solve_system(equations, unknowns, environment)?))
        }
    }
}

/// The result of one invocation: what to print and how to exit.
#[derive(Debug)]
pub struct Outcome {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    /// The failure as a full diagnostic, with the input attached as source.
    pub report: Option<Report>,
}

impl Outcome {
    fn success(stdout: String) -> Self {
        Outcome {
            stdout,
            stderr: String::new(),
            exit_code: 0,
            report: None,
        }
    }

    fn failure(error: CalcError, input: &str) -> Self {
        let stderr = format!("Error: {error}");
        let report = match error {
            // These already carry the input.
            CalcError::Lex(_) | CalcError::Syntax(_) => Report::new(error),
            error => Report::new(error)
                .with_source_code(NamedSource::new("input", input.to_string())),
        };
        Outcome {
            stdout: String::new(),
            stderr,
            exit_code: 1,
            report: Some(report),
        }
    }
}

/// Joins `args` with single spaces and calculates the result.
pub fn run<S: AsRef<str>>(args: &[S], style: Style) -> Outcome {
    let words: Vec<&str> = args.iter().map(|arg| arg.as_ref()).collect();
    if words.is_empty() || matches!(words.as_slice(), ["--help"] | ["-h"]) {
        return Outcome::success(USAGE.to_string());
    }

    let input = words.join(" ");
    info!("input: {input}");
    match calculate(&input, &Environment::new()) {
        Ok(answer) => Outcome::success(answer.render(&Formatter::new(style))),
        Err(error) => Outcome::failure(error, &input),
    }
}

/// Reads inputs line by line until `exit`, `quit` or end of input. The last
/// numeric result is bound to `ans`.
pub fn interactive<R: BufRead, W: Write>(
    mut reader: R,
    mut writer: W,
    style: Style,
    explain: bool,
) -> io::Result<()> {
    let formatter = Formatter::new(style);
    let mut environment = Environment::new();
    let mut line = String::new();

    loop {
        write!(writer, ">>> ")?;
        writer.flush()?;

        line.clear();
        if reader.read_line(&mut line)? == 0 {
            writeln!(writer)?;
            break;
        }
        let input = line.trim();
        match input {
            "" => continue,
            "exit" | "quit" => break,
            _ => {}
        }

        match calculate(input, &environment) {
            Ok(answer) => {
                if let Answer::Value(value) = answer {
                    environment.define(Cow::Borrowed("ans"), value);
                }
                writeln!(writer, "{}", answer.render(&formatter))?;
            }
            Err(error) => {
                let outcome = Outcome::failure(error, input);
                match outcome.report {
                    Some(report) if explain => writeln!(writer, "{report:?}")?,
                    _ => writeln!(writer, "{}", outcome.stderr)?,
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calc(input: &str) -> Result<Answer, CalcError> {
        calculate(input, &Environment::new())
    }

    #[test]
    fn expressions_are_evaluated() {
        assert_eq!(calc("2 + 2").unwrap(), Answer::Value(Number::Integer(4)));
    }

    #[test]
    fn overflowing_floats_are_rejected() {
        for input in ["1e400", "10.5^400", "1e400 - 1e400"] {
            assert!(
                matches!(calc(input), Err(CalcError::Eval(EvalError::Domain(_)))),
                "{input:?} should fail"
            );
        }
        assert!(calc("1/1e400").is_ok());
    }

    #[test]
    fn single_equation_goes_to_the_solver() {
        assert_eq!(
            calc("x^2-4=0").unwrap(),
            Answer::Solutions {
                unknown: Some("x".to_string()),
                set: SolutionSet::Roots(vec![Number::Integer(2), Number::Integer(-2)]),
            }
        );
    }

    #[test]
    fn equations_without_unknowns() {
        let all = Answer::Solutions {
            unknown: None,
            set: SolutionSet::AllReals,
        };
        let none = Answer::Solutions {
            unknown: None,
            set: SolutionSet::NoSolution,
        };
        assert_eq!(calc("0=0").unwrap(), all);
        assert_eq!(calc("0=5").unwrap(), none);
        assert_eq!(calc("2+2=4, 1=1").unwrap(), all);
        assert_eq!(calc("2+2=4, 1=2").unwrap(), none);
    }

    #[test]
    fn one_equation_in_two_unknowns_is_underdetermined() {
        assert!(matches!(
            calc("x + y = 5"),
            Err(CalcError::Solve(crate::error::SolveError::Underdetermined { .. }))
        ));
    }

    #[test]
    fn run_formats_or_fails() {
        let outcome = run(&["x+y=5,", "x-y=1"], Style::Ascii);
        assert_eq!(outcome.stdout, "x = 3, y = 2");
        assert_eq!(outcome.exit_code, 0);

        let outcome = run(&["2 +"], Style::Ascii);
        assert_eq!(outcome.exit_code, 1);
        assert!(outcome.stdout.is_empty());
        assert!(outcome.stderr.starts_with("Error: "));
        assert!(outcome.report.is_some());
    }

    #[test]
    fn usage_without_arguments() {
        let outcome = run::<&str>(&[], Style::Ascii);
        assert_eq!(outcome.exit_code, 0);
        assert!(outcome.stdout.starts_with("Usage: mathcalc"));
    }

    #[test]
    fn repl_binds_ans_and_survives_errors() {
        let input = "2 + 3\n\nans * 2\n1/0\nans\nquit\n4\n";
        let mut output = Vec::new();
        interactive(input.as_bytes(), &mut output, Style::Ascii, false).unwrap();
        let output = String::from_utf8(output).unwrap();
        assert_eq!(
            output,
            ">>> 5\n>>> >>> 10\n>>> Error: division by zero\n>>> 10\n>>> "
        );
    }

    #[test]
    fn repl_stops_at_end_of_input() {
        let mut output = Vec::new();
        interactive("x^2 = 9".as_bytes(), &mut output, Style::Unicode, false).unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), ">>> x = 3, -3\n>>> \n");
    }
}
