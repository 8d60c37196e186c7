//! Reader for the canonical term form produced by `Display for Term`
//!
//! Accepts `2*x - y + 3 <= z`, `x = 4`, `-a >= -1` and constant-only terms
//! like `0 <= 1`. Variables may appear on either side; the result is
//! normalized to `Σ a·v ⋈ c`. `>=` is rewritten by negation.

use crate::error::{Error, Result};
use crate::term::{Coefficients, Relation, Term};
use crate::var::Var;
use logos::Logos;

#[derive(Logos, Debug, PartialEq, Clone)]
#[logos(skip r"[ \t\r\n\f]+")]
enum Token<'a> {
    #[regex(r"[0-9]+(\.[0-9]*)?([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),

    #[regex(r"[A-Za-z_][A-Za-z0-9_.]*", |lex| lex.slice())]
    Ident(&'a str),

    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("<=")]
    Le,

    #[token(">=")]
    Ge,

    #[token("=")]
    #[token("==")]
    Eq,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Comparison {
    Le,
    Ge,
    Eq,
}

/// Parse a single term in canonical form.
pub fn parse_term(input: &str) -> Result<Term> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        input,
    };

    let mut coefficients = Coefficients::new();
    let mut constant = 0.0;

    // left side contributes with sign +1, right side with -1
    parser.side(1.0, &mut coefficients, &mut constant)?;
    let comparison = parser.comparison()?;
    parser.side(-1.0, &mut coefficients, &mut constant)?;
    if parser.pos < tokens.len() {
        return Err(parser.unexpected());
    }

    // Σ a·v + k ⋈ 0  becomes  Σ a·v ⋈ -k
    let (coefficients, constant, relation) = match comparison {
        Comparison::Le => (coefficients, -constant, Relation::Le),
        Comparison::Eq => (coefficients, -constant, Relation::Eq),
        Comparison::Ge => (
            coefficients.into_iter().map(|(v, c)| (v, -c)).collect(),
            constant,
            Relation::Le,
        ),
    };
    Term::new(coefficients, constant, relation)
}

fn tokenize(input: &str) -> Result<Vec<Token<'_>>> {
    let mut lexer = Token::lexer(input);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next() {
        match token {
            Ok(token) => tokens.push(token),
            Err(()) => {
                return Err(Error::Syntax(format!(
                    "unexpected `{}` in `{}`",
                    lexer.slice(),
                    input
                )))
            }
        }
    }
    Ok(tokens)
}

struct Parser<'t, 'a> {
    tokens: &'t [Token<'a>],
    pos: usize,
    input: &'t str,
}

impl<'t, 'a> Parser<'t, 'a> {
    fn peek(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.pos)
    }

    fn unexpected(&self) -> Error {
        match self.peek() {
            Some(token) => Error::Syntax(format!("unexpected {:?} in `{}`", token, self.input)),
            None => Error::Syntax(format!("unexpected end of `{}`", self.input)),
        }
    }

    fn comparison(&mut self) -> Result<Comparison> {
        let comparison = match self.peek() {
            Some(Token::Le) => Comparison::Le,
            Some(Token::Ge) => Comparison::Ge,
            Some(Token::Eq) => Comparison::Eq,
            _ => return Err(self.unexpected()),
        };
        self.pos += 1;
        Ok(comparison)
    }

    /// One side of the relation: a signed sum of monomials.
    fn side(&mut self, side_sign: f64, coefficients: &mut Coefficients, constant: &mut f64) -> Result<()> {
        let mut first = true;
        loop {
            let sign = match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    1.0
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    -1.0
                }
                _ if first => 1.0,
                _ => return Ok(()),
            };
            first = false;
            self.monomial(side_sign * sign, coefficients, constant)?;
        }
    }

    fn monomial(&mut self, sign: f64, coefficients: &mut Coefficients, constant: &mut f64) -> Result<()> {
        match self.peek().cloned() {
            Some(Token::Number(value)) => {
                self.pos += 1;
                if self.peek() == Some(&Token::Star) {
                    self.pos += 1;
                }
                match self.peek().cloned() {
                    Some(Token::Ident(name)) => {
                        self.pos += 1;
                        *coefficients.entry(Var::from(name)).or_insert(0.0) += sign * value;
                    }
                    _ => *constant += sign * value,
                }
                Ok(())
            }
            Some(Token::Ident(name)) => {
                self.pos += 1;
                *coefficients.entry(Var::from(name)).or_insert(0.0) += sign;
                Ok(())
            }
            _ => Err(self.unexpected()),
        }
    }
}
