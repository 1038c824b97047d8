use std::io::{self, Write};

use clap::{ArgAction, Parser};
use env_logger::Env;
use log::debug;
use mathcalc::{Lexer, Style};
use miette::{IntoDiagnostic, WrapErr};

#[derive(Parser, Debug)]
#[command(version, about = "Evaluates expressions and solves equations")]
struct Args {
    /// Output style
    #[arg(short, long, value_enum, default_value_t = Style::Ascii)]
    format: Style,

    /// Read one input per line; `ans` holds the last value
    #[arg(short, long)]
    interactive: bool,

    /// Show errors as full diagnostics
    #[arg(long)]
    explain: bool,

    /// Print the token stream instead of calculating
    #[arg(long, conflicts_with = "ast")]
    tokens: bool,

    /// Print the parsed tree instead of calculating
    #[arg(long)]
    ast: bool,

    /// Log more (repeat for more detail)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// The expression or equations, joined with spaces
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    expression: Vec<String>,
}

fn main() -> miette::Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();
    debug!("{args:?}");

    if args.interactive {
        let stdin = io::stdin();
        return mathcalc::interactive(stdin.lock(), io::stdout(), args.format, args.explain)
            .into_diagnostic()
            .wrap_err("interactive session failed");
    }

    if args.tokens || args.ast {
        let input = args.expression.join(" ");
        if args.tokens {
            for token in Lexer::new(&input) {
                match token {
                    Ok(token) => println!("{token}"),
                    Err(e) => fail(mathcalc::CalcError::from(e), &input, args.explain),
                }
            }
            println!("EOF");
        } else {
            match mathcalc::Parser::new(&input).parse() {
                Ok(parsed) => println!("{parsed}"),
                Err(e) => fail(e, &input, args.explain),
            }
        }
        return Ok(());
    }

    let outcome = mathcalc::run(&args.expression, args.format);
    if outcome.exit_code == 0 {
        let mut stdout = io::stdout();
        writeln!(stdout, "{}", outcome.stdout)
            .into_diagnostic()
            .wrap_err("writing the answer failed")?;
        return Ok(());
    }

    match outcome.report {
        Some(report) if args.explain => eprintln!("{report:?}"),
        _ => eprintln!("{}", outcome.stderr),
    }
    std::process::exit(outcome.exit_code);
}

fn fail(error: mathcalc::CalcError, input: &str, explain: bool) -> ! {
    if explain {
        let report =
            miette::Report::new(error).with_source_code(miette::NamedSource::new("input", input.to_string()));
        eprintln!("{report:?}");
    } else {
        eprintln!("Error: {error}");
    }
    std::process::exit(1);
}
