use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
#[error("Unexpected character '{token}'")]
#[diagnostic(help("remove or correct the character: `{token}`"))]
pub struct LexError {
    #[source_code]
    pub(crate) src: NamedSource<String>,

    #[label("this character")]
    pub(crate) bad_bit: SourceSpan,

    pub token: char,
}

impl LexError {
    /// Byte offset of the offending character.
    pub fn position(&self) -> usize {
        self.bad_bit.offset()
    }
}

#[derive(Error, Debug, Diagnostic)]
#[error("expected {expected}, found {found}")]
#[diagnostic(help("{hint}"))]
pub struct SyntaxError {
    #[source_code]
    pub(crate) src: NamedSource<String>,

    #[label("here")]
    pub(crate) bad_bit: SourceSpan,

    pub expected: String,
    pub found: String,
    pub(crate) hint: &'static str,
}

impl SyntaxError {
    pub fn position(&self) -> usize {
        self.bad_bit.offset()
    }
}

#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum EvalError {
    #[error("unbound variable `{name}`")]
    #[diagnostic(help("only equations (containing `=`) may mention unknowns"))]
    UnboundVariable {
        name: String,
        #[label("no value for this name")]
        span: SourceSpan,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("unknown function `{name}`")]
    UnknownFunction {
        name: String,
        #[label("not a builtin")]
        span: SourceSpan,
        #[help]
        available: String,
    },

    #[error("`{function}` expects {expected}, got {found}")]
    Arity {
        function: &'static str,
        expected: &'static str,
        found: usize,
    },

    #[error("{0}")]
    Domain(String),
}

#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum SolveError {
    #[error("unsupported equation form: {0}")]
    #[diagnostic(help(
        "only polynomial equations in one unknown and systems of linear equations can be solved"
    ))]
    UnsupportedForm(String),

    #[error("inconsistent system: the equations contradict each other")]
    Inconsistent,

    #[error("underdetermined system: {} not fixed by the equations", .free.join(", "))]
    #[diagnostic(help("add one independent equation per free unknown"))]
    Underdetermined { free: Vec<String> },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Eval(#[from] EvalError),
}

/// Everything the pipeline can fail with, one variant per stage.
#[derive(Error, Debug, Diagnostic)]
pub enum CalcError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Solve(#[from] SolveError),
}
