use std::collections::BTreeSet;
use std::fmt::Display;

use crate::{
    Lexer,
    error::CalcError,
    eval,
    lex::{Token, TokenKind},
    number::Number,
    system,
};

pub struct Parser<'de> {
    lexer: Lexer<'de>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenTree<'de> {
    Atom(Atom<'de>),
    Cons(Op, Vec<TokenTree<'de>>),
    Call {
        name: &'de str,
        offset: usize,
        arguments: Vec<TokenTree<'de>>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Atom<'de> {
    Number(Number),
    /// A name and the byte offset where it starts.
    Ident(&'de str, usize),
    Imaginary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Percent,
    Root,
}

/// `lhs = rhs`, read as `lhs - rhs = 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct Equation<'de> {
    pub lhs: TokenTree<'de>,
    pub rhs: TokenTree<'de>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EquationSystem<'de> {
    pub equations: Vec<Equation<'de>>,
    /// Every name the equations mention except the named constants.
    pub unknowns: BTreeSet<&'de str>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Parsed<'de> {
    Expression(TokenTree<'de>),
    Equations(EquationSystem<'de>),
}

impl<'de> Parser<'de> {
    pub fn new(whole: &'de str) -> Self {
        Parser {
            lexer: Lexer::new(whole),
        }
    }

    /// Parses the whole input: a bare expression, or one or more
    /// comma-separated equations.
    pub fn parse(mut self) -> Result<Parsed<'de>, CalcError> {
        let mut pieces = Vec::new();
        loop {
            let lhs = self.parse_within(0)?;
            let rhs = match self.lexer.peek_token()? {
                Some(Token {
                    kind: TokenKind::Equal,
                    ..
                }) => {
                    self.lexer.next();
                    Some(self.parse_within(0)?)
                }
                _ => None,
            };

            match self.lexer.next() {
                None => {
                    if rhs.is_none() && !pieces.is_empty() {
                        return Err(self.lexer.eof("`=`").into());
                    }
                    pieces.push((lhs, rhs));
                    break;
                }
                Some(Ok(token)) if token.kind == TokenKind::Comma => {
                    if rhs.is_none() {
                        return Err(self.lexer.unexpected(&token, "`=`").into());
                    }
                    pieces.push((lhs, rhs));
                }
                Some(Ok(token)) if token.kind == TokenKind::Equal => {
                    return Err(self.lexer.unexpected(&token, "`,` or end of input").into());
                }
                Some(Ok(token)) => {
                    let expected = if rhs.is_some() {
                        "`,` or end of input"
                    } else {
                        "an operator or end of input"
                    };
                    return Err(self.lexer.unexpected(&token, expected).into());
                }
                Some(Err(e)) => return Err(e.into()),
            }
        }

        if let [(_, None)] = pieces.as_slice() {
            let Some((expression, _)) = pieces.pop() else {
                return Err(self.lexer.eof("an expression").into());
            };
            return Ok(Parsed::Expression(expression));
        }

        let mut unknowns = BTreeSet::new();
        let mut equations = Vec::with_capacity(pieces.len());
        for (lhs, rhs) in pieces {
            let Some(rhs) = rhs else {
                return Err(self.lexer.eof("`=`").into());
            };
            lhs.collect_names(&mut unknowns);
            rhs.collect_names(&mut unknowns);
            equations.push(Equation { lhs, rhs });
        }
        Ok(Parsed::Equations(EquationSystem {
            equations,
            unknowns,
        }))
    }

    pub fn parse_within(&mut self, min_bp: u8) -> Result<TokenTree<'de>, CalcError> {
        let lhs = match self.lexer.next() {
            Some(Ok(token)) => token,
            None => return Err(self.lexer.eof("an expression").into()),
            Some(Err(e)) => return Err(e.into()),
        };

        let mut lhs = match lhs {
            Token {
                kind: TokenKind::Number(n),
                ..
            } => TokenTree::Atom(Atom::Number(n)),
            Token {
                kind: TokenKind::Imaginary,
                ..
            } => TokenTree::Atom(Atom::Imaginary),
            Token {
                kind: TokenKind::Ident,
                literal,
                offset,
            } => {
                if self.is_call(literal)? {
                    self.lexer.next();
                    let arguments = self.parse_arguments()?;
                    TokenTree::Call {
                        name: literal,
                        offset,
                        arguments,
                    }
                } else {
                    TokenTree::Atom(Atom::Ident(literal, offset))
                }
            }
            Token {
                kind: TokenKind::LeftParen,
                ..
            } => {
                let inner = self.parse_within(0)?;
                self.lexer.expect(TokenKind::RightParen, "`)`")?;
                inner
            }
            Token {
                kind: TokenKind::Plus,
                ..
            } => self.parse_within(prefix_binding_power(Op::Plus))?,
            Token {
                kind: TokenKind::Minus | TokenKind::Root,
                ..
            } => {
                let op = match lhs.kind {
                    TokenKind::Minus => Op::Minus,
                    _ => Op::Root,
                };
                let rhs = self.parse_within(prefix_binding_power(op))?;
                TokenTree::Cons(op, vec![rhs])
            }
            token => return Err(self.lexer.unexpected(&token, "an expression").into()),
        };

        loop {
            let Some(token) = self.lexer.peek_token()? else {
                break;
            };

            let (op, implicit) = match token.kind {
                TokenKind::Plus => (Op::Plus, false),
                TokenKind::Minus => (Op::Minus, false),
                TokenKind::Star => (Op::Star, false),
                TokenKind::Slash => (Op::Slash, false),
                TokenKind::Caret => (Op::Caret, false),
                TokenKind::Percent | TokenKind::Superscript(_) => {
                    if POSTFIX_BINDING_POWER < min_bp {
                        break;
                    }
                    self.lexer.next();
                    lhs = match token.kind {
                        TokenKind::Superscript(n) => TokenTree::Cons(
                            Op::Caret,
                            vec![lhs, TokenTree::Atom(Atom::Number(Number::from(i64::from(n))))],
                        ),
                        _ => TokenTree::Cons(Op::Percent, vec![lhs]),
                    };
                    continue;
                }
                kind if kind.starts_operand() => (Op::Star, true),
                TokenKind::RightParen | TokenKind::Comma | TokenKind::Equal => break,
                _ => return Err(self.lexer.unexpected(&token, "an operator").into()),
            };

            let (l_bp, r_bp) = infix_binding_power(op);
            if l_bp < min_bp {
                break;
            }
            if !implicit {
                self.lexer.next();
            }
            let rhs = self.parse_within(r_bp)?;
            lhs = TokenTree::Cons(op, vec![lhs, rhs]);
        }

        Ok(lhs)
    }

    /// A name followed by `(` is a call when it is a builtin or longer than a
    /// single letter; `x(x + 1)` stays a product.
    fn is_call(&mut self, name: &str) -> Result<bool, CalcError> {
        let paren_follows = matches!(
            self.lexer.peek_token()?,
            Some(Token {
                kind: TokenKind::LeftParen,
                ..
            })
        );
        Ok(paren_follows && (system::lookup(name).is_some() || name.chars().count() > 1))
    }

    fn parse_arguments(&mut self) -> Result<Vec<TokenTree<'de>>, CalcError> {
        let mut arguments = Vec::new();
        if let Some(Token {
            kind: TokenKind::RightParen,
            ..
        }) = self.lexer.peek_token()?
        {
            self.lexer.next();
            return Ok(arguments);
        }

        loop {
            arguments.push(self.parse_within(0)?);
            match self.lexer.next() {
                Some(Ok(Token {
                    kind: TokenKind::Comma,
                    ..
                })) => continue,
                Some(Ok(Token {
                    kind: TokenKind::RightParen,
                    ..
                })) => break,
                Some(Ok(token)) => {
                    return Err(self.lexer.unexpected(&token, "`,` or `)`").into());
                }
                Some(Err(e)) => return Err(e.into()),
                None => return Err(self.lexer.eof("`)`").into()),
            }
        }
        Ok(arguments)
    }
}

const POSTFIX_BINDING_POWER: u8 = 9;

fn prefix_binding_power(op: Op) -> u8 {
    match op {
        Op::Plus | Op::Minus => 5,
        _ => 9,
    }
}

fn infix_binding_power(op: Op) -> (u8, u8) {
    match op {
        Op::Plus | Op::Minus => (1, 2),
        Op::Star | Op::Slash => (3, 4),
        Op::Caret => (8, 7),
        Op::Percent | Op::Root => (POSTFIX_BINDING_POWER, POSTFIX_BINDING_POWER),
    }
}

impl<'de> TokenTree<'de> {
    /// Adds every non-constant name in the tree to `names`.
    pub fn collect_names(&self, names: &mut BTreeSet<&'de str>) {
        match self {
            TokenTree::Atom(Atom::Ident(name, _)) if eval::constant(name).is_none() => {
                names.insert(*name);
            }
            TokenTree::Atom(_) => {}
            TokenTree::Cons(_, trees) => trees.iter().for_each(|tree| tree.collect_names(names)),
            TokenTree::Call { arguments, .. } => {
                arguments.iter().for_each(|tree| tree.collect_names(names))
            }
        }
    }

    /// Whether `name` occurs anywhere in the tree.
    pub fn mentions(&self, name: &str) -> bool {
        match self {
            TokenTree::Atom(Atom::Ident(ident, _)) => *ident == name,
            TokenTree::Atom(_) => false,
            TokenTree::Cons(_, trees) => trees.iter().any(|tree| tree.mentions(name)),
            TokenTree::Call { arguments, .. } => arguments.iter().any(|tree| tree.mentions(name)),
        }
    }
}

impl Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Op::Plus => "+",
                Op::Minus => "-",
                Op::Star => "*",
                Op::Slash => "/",
                Op::Caret => "^",
                Op::Percent => "%",
                Op::Root => "√",
            }
        )
    }
}

impl Display for Atom<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Atom::Number(n) => write!(f, "{n}"),
            Atom::Ident(name, _) => write!(f, "{name}"),
            Atom::Imaginary => write!(f, "i"),
        }
    }
}

impl Display for TokenTree<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenTree::Atom(atom) => write!(f, "{atom}"),
            TokenTree::Cons(op, trees) => {
                write!(f, "({op}")?;
                for tree in trees {
                    write!(f, " {tree}")?;
                }
                write!(f, ")")
            }
            TokenTree::Call {
                name, arguments, ..
            } => {
                write!(f, "(call {name}")?;
                for argument in arguments {
                    write!(f, " {argument}")?;
                }
                write!(f, ")")
            }
        }
    }
}

impl Display for Equation<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(= {} {})", self.lhs, self.rhs)
    }
}

impl Display for Parsed<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Parsed::Expression(tree) => write!(f, "{tree}"),
            Parsed::Equations(system) => {
                for (i, equation) in system.equations.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{equation}")?;
                }
                Ok(())
            }
        }
    }
}
