pub mod dispatch;
pub mod error;
pub mod eval;
pub mod format;
pub mod lex;
pub mod linear;
pub mod number;
pub mod parse;
pub mod poly;
pub mod solve;
pub mod system;

mod proptests;

pub use dispatch::{Answer, Outcome, USAGE, calculate, interactive, run};
pub use error::{CalcError, EvalError, LexError, SolveError, SyntaxError};
pub use eval::{Environment, evaluate};
pub use format::{Formatter, Style};
pub use lex::{Lexer, Token, TokenKind, tokenize};
pub use number::Number;
pub use parse::{Parsed, Parser};
pub use solve::SolutionSet;
