use std::fmt::Display;

use miette::{NamedSource, SourceSpan};

use crate::error::{CalcError, LexError, SyntaxError};
use crate::number::Number;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token<'de> {
    pub kind: TokenKind,
    pub literal: &'de str,
    /// Byte offset of `literal` in the input.
    pub offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenKind {
    LeftParen,
    RightParen,
    Comma,
    Minus,
    Plus,
    Star,
    Slash,
    Caret,
    Percent,
    Equal,
    Root,
    Superscript(u32),
    Ident,
    Imaginary,
    Number(Number),
}

impl Display for Token<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lit = self.literal;
        match self.kind {
            TokenKind::LeftParen => write!(f, "LEFT_PAREN {lit}"),
            TokenKind::RightParen => write!(f, "RIGHT_PAREN {lit}"),
            TokenKind::Comma => write!(f, "COMMA {lit}"),
            TokenKind::Minus => write!(f, "MINUS {lit}"),
            TokenKind::Plus => write!(f, "PLUS {lit}"),
            TokenKind::Star => write!(f, "STAR {lit}"),
            TokenKind::Slash => write!(f, "SLASH {lit}"),
            TokenKind::Caret => write!(f, "CARET {lit}"),
            TokenKind::Percent => write!(f, "PERCENT {lit}"),
            TokenKind::Equal => write!(f, "EQUAL {lit}"),
            TokenKind::Root => write!(f, "ROOT {lit}"),
            TokenKind::Superscript(n) => write!(f, "SUPERSCRIPT {lit} {n}"),
            TokenKind::Ident => write!(f, "IDENTIFIER {lit}"),
            TokenKind::Imaginary => write!(f, "IMAGINARY {lit}"),
            TokenKind::Number(n) => write!(f, "NUMBER {lit} {n}"),
        }
    }
}

impl TokenKind {
    /// Whether a token of this kind can begin an operand, which is what
    /// triggers implicit multiplication after another operand.
    pub fn starts_operand(&self) -> bool {
        matches!(
            self,
            TokenKind::Number(_)
                | TokenKind::Ident
                | TokenKind::Imaginary
                | TokenKind::LeftParen
                | TokenKind::Root
        )
    }
}

pub struct Lexer<'de> {
    whole: &'de str,
    rest: &'de str,
    byte: usize,
    peeked: Option<Result<Token<'de>, LexError>>,
}

/// Tokenizes the whole input. Calling it again restarts from the beginning.
pub fn tokenize(input: &str) -> Result<Vec<Token<'_>>, LexError> {
    Lexer::new(input).collect()
}

impl<'de> Lexer<'de> {
    pub fn new(input: &'de str) -> Self {
        Lexer {
            whole: input,
            rest: input,
            byte: 0,
            peeked: None,
        }
    }

    pub fn expect(&mut self, expected: TokenKind, what: &str) -> Result<Token<'de>, CalcError> {
        match self.next() {
            Some(Ok(token)) if token.kind == expected => Ok(token),
            Some(Ok(token)) => Err(self.unexpected(&token, what).into()),
            Some(Err(e)) => Err(e.into()),
            None => Err(self.eof(what).into()),
        }
    }

    pub fn peek(&mut self) -> Option<&Result<Token<'de>, LexError>> {
        if self.peeked.is_some() {
            return self.peeked.as_ref();
        }
        self.peeked = self.next();
        self.peeked.as_ref()
    }

    /// Like [`Lexer::peek`], but hands over a lexing error instead of lending it.
    pub fn peek_token(&mut self) -> Result<Option<Token<'de>>, LexError> {
        match self.peek() {
            None => Ok(None),
            Some(Ok(token)) => Ok(Some(*token)),
            Some(Err(_)) => match self.peeked.take() {
                Some(Err(e)) => Err(e),
                _ => Ok(None),
            },
        }
    }

    fn source(&self) -> NamedSource<String> {
        NamedSource::new("input", self.whole.to_string())
    }

    pub(crate) fn unexpected(&self, token: &Token<'de>, expected: &str) -> SyntaxError {
        SyntaxError {
            src: self.source(),
            bad_bit: SourceSpan::from(token.offset..token.offset + token.literal.len()),
            expected: expected.to_string(),
            found: format!("`{}`", token.literal),
            hint: "check for a missing operator or an unbalanced parenthesis",
        }
    }

    pub(crate) fn eof(&self, expected: &str) -> SyntaxError {
        let end = self.whole.len();
        SyntaxError {
            src: self.source(),
            bad_bit: SourceSpan::from(end.saturating_sub(1)..end),
            expected: expected.to_string(),
            found: "end of input".to_string(),
            hint: "the input ended unexpectedly, possibly after an operator or before a closing parenthesis",
        }
    }

    fn bad_char(&self, offset: usize, token: char) -> LexError {
        LexError {
            src: self.source(),
            bad_bit: SourceSpan::from(offset..offset + token.len_utf8()),
            token,
        }
    }
}

fn superscript_digit(c: char) -> Option<u32> {
    match c {
        '⁰' => Some(0),
        '¹' => Some(1),
        '²' => Some(2),
        '³' => Some(3),
        '⁴' => Some(4),
        '⁵' => Some(5),
        '⁶' => Some(6),
        '⁷' => Some(7),
        '⁸' => Some(8),
        '⁹' => Some(9),
        _ => None,
    }
}

fn is_ident_continue(c: char) -> bool {
    (c.is_alphabetic() && c != 'π') || c.is_ascii_digit() || c == '_'
}

impl<'de> Iterator for Lexer<'de> {
    type Item = Result<Token<'de>, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(peeked) = self.peeked.take() {
            return Some(peeked);
        }
        loop {
            let mut chars = self.rest.chars();
            let c = chars.next()?;
            let offset = self.byte;
            let literal = &self.rest[..c.len_utf8()];
            let cur = self.rest;
            self.rest = chars.as_str();
            self.byte += c.len_utf8();

            enum Started {
                Ident,
                Number,
                Superscript,
            }

            let just = |kind: TokenKind| {
                Some(Ok(Token {
                    kind,
                    literal,
                    offset,
                }))
            };

            let started = match c {
                '(' => return just(TokenKind::LeftParen),
                ')' => return just(TokenKind::RightParen),
                ',' => return just(TokenKind::Comma),
                '-' | '−' => return just(TokenKind::Minus),
                '+' => return just(TokenKind::Plus),
                '*' | '×' | '·' | '⋅' => return just(TokenKind::Star),
                '/' | '÷' => return just(TokenKind::Slash),
                '^' => return just(TokenKind::Caret),
                '%' => return just(TokenKind::Percent),
                '=' => return just(TokenKind::Equal),
                '√' => return just(TokenKind::Root),
                'π' => return just(TokenKind::Ident),
                '0'..='9' => Started::Number,
                '.' if self.rest.starts_with(|c: char| c.is_ascii_digit()) => Started::Number,
                c if superscript_digit(c).is_some() => Started::Superscript,
                c if c.is_alphabetic() || c == '_' => Started::Ident,
                c if c.is_whitespace() => continue,
                c => return Some(Err(self.bad_char(offset, c))),
            };

            let end = match started {
                Started::Ident => cur
                    .find(|c: char| !is_ident_continue(c))
                    .unwrap_or(cur.len()),
                Started::Superscript => cur
                    .find(|c: char| superscript_digit(c).is_none())
                    .unwrap_or(cur.len()),
                Started::Number => number_end(cur),
            };

            let literal = &cur[..end];
            let extra_bytes = literal.len() - c.len_utf8();
            self.byte += extra_bytes;
            self.rest = &self.rest[extra_bytes..];

            let kind = match started {
                Started::Ident if literal == "i" => TokenKind::Imaginary,
                Started::Ident => TokenKind::Ident,
                Started::Superscript => {
                    let value = literal.chars().filter_map(superscript_digit).try_fold(
                        0u32,
                        |acc, digit| acc.checked_mul(10)?.checked_add(digit),
                    );
                    match value {
                        Some(n) => TokenKind::Superscript(n),
                        None => return Some(Err(self.bad_char(offset, c))),
                    }
                }
                Started::Number => {
                    // 1.2.3
                    if self.rest.starts_with('.') {
                        return Some(Err(self.bad_char(self.byte, '.')));
                    }
                    match Number::parse_literal(literal) {
                        Some(n) => TokenKind::Number(n),
                        None => return Some(Err(self.bad_char(offset, c))),
                    }
                }
            };

            return Some(Ok(Token {
                kind,
                literal,
                offset,
            }));
        }
    }
}

/// Length of the numeric literal at the start of `s`: digits, an optional
/// fraction, and an exponent only when a digit follows the `e`.
fn number_end(s: &str) -> usize {
    let digits = |s: &str| s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());

    let mut end = digits(s);
    if s[end..].starts_with('.') {
        end += 1 + digits(&s[end + 1..]);
    }
    if let Some(exponent) = s[end..].strip_prefix(['e', 'E']) {
        let unsigned = exponent.strip_prefix(['+', '-']).unwrap_or(exponent);
        let exponent_digits = digits(unsigned);
        if exponent_digits > 0 {
            end += 1 + (exponent.len() - unsigned.len()) + exponent_digits;
        }
    }
    end
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input)
            .expect("input should tokenize")
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn operators_and_parens() {
        assert_eq!(
            kinds("( + - * / ^ ) , = %"),
            vec![
                TokenKind::LeftParen,
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Star,
                TokenKind::Slash,
                TokenKind::Caret,
                TokenKind::RightParen,
                TokenKind::Comma,
                TokenKind::Equal,
                TokenKind::Percent,
            ]
        );
    }

    #[test]
    fn numbers_are_exact() {
        assert_eq!(
            kinds("42 3.25 .5 1e-5"),
            vec![
                TokenKind::Number(Number::Integer(42)),
                TokenKind::Number(Number::rational(13, 4)),
                TokenKind::Number(Number::rational(1, 2)),
                TokenKind::Number(Number::rational(1, 100_000)),
            ]
        );
    }

    #[test]
    fn e_without_exponent_digits_is_an_identifier() {
        assert_eq!(
            kinds("2e"),
            vec![TokenKind::Number(Number::Integer(2)), TokenKind::Ident]
        );
    }

    #[test]
    fn imaginary_unit_after_number() {
        let tokens = tokenize("2i + i").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Number(Number::Integer(2)));
        assert_eq!(tokens[1].kind, TokenKind::Imaginary);
        assert_eq!(tokens[3].kind, TokenKind::Imaginary);
        assert_eq!(tokens[3].offset, 5);
    }

    #[test]
    fn identifiers_keep_digits_and_underscores() {
        let tokens = tokenize("sqrt(x_1) + x2").unwrap();
        let idents: Vec<_> = tokens
            .iter()
            .filter(|token| token.kind == TokenKind::Ident)
            .map(|token| token.literal)
            .collect();
        assert_eq!(idents, vec!["sqrt", "x_1", "x2"]);
    }

    #[test]
    fn unicode_operators() {
        assert_eq!(
            kinds("2×3÷4−x²·√π"),
            vec![
                TokenKind::Number(Number::Integer(2)),
                TokenKind::Star,
                TokenKind::Number(Number::Integer(3)),
                TokenKind::Slash,
                TokenKind::Number(Number::Integer(4)),
                TokenKind::Minus,
                TokenKind::Ident,
                TokenKind::Superscript(2),
                TokenKind::Star,
                TokenKind::Root,
                TokenKind::Ident,
            ]
        );
    }

    #[test]
    fn unexpected_character_reports_position() {
        let err = tokenize("2 + $").unwrap_err();
        assert_eq!(err.token, '$');
        assert_eq!(err.position(), 4);
    }

    #[test]
    fn second_decimal_point_is_rejected() {
        let err = tokenize("1.2.3").unwrap_err();
        assert_eq!(err.token, '.');
        assert_eq!(err.position(), 3);
    }

    #[test]
    fn tokenizing_is_restartable() {
        let input = "3(4+5) - 2i";
        assert_eq!(tokenize(input).unwrap(), tokenize(input).unwrap());
    }

    #[test]
    fn peek_does_not_consume() {
        let mut lexer = Lexer::new("1 2");
        let peeked = *lexer.peek().unwrap().as_ref().unwrap();
        assert_eq!(lexer.next().unwrap().unwrap(), peeked);
        assert_eq!(lexer.next().unwrap().unwrap().literal, "2");
        assert!(lexer.next().is_none());
    }
}
