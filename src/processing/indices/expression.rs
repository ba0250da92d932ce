// src/processing/indices/expression.rs
//! User-defined band-math indices.
//!
//! Grammar, lowest to highest precedence:
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := '-' unary | power
//! power   := primary ('^' unary)?
//! primary := number | band | func '(' expr ')' | '(' expr ')'
//! ```
//!
//! Functions: `sqrt`, `abs`, `exp`, `ln`. Identifiers other than functions
//! must name a composite band.

use std::iter::Peekable;
use std::str::Chars;

use super::{checked_div, checked_sqrt, IndexCalculator};
use crate::error::{FireError, FireResult};
use crate::raster::Band;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Op(char),
    LParen,
    RParen,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Func {
    Sqrt,
    Abs,
    Exp,
    Ln,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Number(f64),
    /// Position in `ExpressionIndex::bands`
    Input(usize),
    Neg(Box<Expr>),
    Binary(char, Box<Expr>, Box<Expr>),
    Call(Func, Box<Expr>),
}

impl Expr {
    fn eval(&self, values: &[f64]) -> Option<f64> {
        let value = match self {
            Expr::Number(n) => *n,
            Expr::Input(slot) => values[*slot],
            Expr::Neg(inner) => -inner.eval(values)?,
            Expr::Binary(op, lhs, rhs) => {
                let (l, r) = (lhs.eval(values)?, rhs.eval(values)?);
                match op {
                    '+' => l + r,
                    '-' => l - r,
                    '*' => l * r,
                    '/' => checked_div(l, r)?,
                    _ => l.powf(r),
                }
            }
            Expr::Call(func, arg) => {
                let x = arg.eval(values)?;
                match func {
                    Func::Sqrt => checked_sqrt(x)?,
                    Func::Abs => x.abs(),
                    Func::Exp => x.exp(),
                    Func::Ln => (x > 0.0).then(|| x.ln())?,
                }
            }
        };
        value.is_finite().then_some(value)
    }
}

fn tokenize(source: &str) -> FireResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars: Peekable<Chars> = source.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '0'..='9' | '.' => {
                let mut literal = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        literal.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let number = literal
                    .parse()
                    .map_err(|_| FireError::config(format!("invalid number '{literal}'")))?;
                tokens.push(Token::Number(number));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_alphanumeric() || d == '_' {
                        ident.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            '+' | '-' | '*' | '/' | '^' => {
                tokens.push(Token::Op(c));
                chars.next();
            }
            '(' => {
                tokens.push(Token::LParen);
                chars.next();
            }
            ')' => {
                tokens.push(Token::RParen);
                chars.next();
            }
            other => {
                return Err(FireError::config(format!("unexpected character '{other}'")));
            }
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    bands: Vec<Band>,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: Token) -> FireResult<()> {
        match self.next() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(FireError::config(format!("expected {expected:?}, found {token:?}"))),
            None => Err(FireError::config(format!("expected {expected:?}, found end of input"))),
        }
    }

    fn expr(&mut self) -> FireResult<Expr> {
        let mut lhs = self.term()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek().cloned() {
            self.pos += 1;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(self.term()?));
        }
        Ok(lhs)
    }

    fn term(&mut self) -> FireResult<Expr> {
        let mut lhs = self.unary()?;
        while let Some(Token::Op(op @ ('*' | '/'))) = self.peek().cloned() {
            self.pos += 1;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(self.unary()?));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> FireResult<Expr> {
        if self.peek() == Some(&Token::Op('-')) {
            self.pos += 1;
            return Ok(Expr::Neg(Box::new(self.unary()?)));
        }
        self.power()
    }

    fn power(&mut self) -> FireResult<Expr> {
        let base = self.primary()?;
        if self.peek() == Some(&Token::Op('^')) {
            self.pos += 1;
            return Ok(Expr::Binary('^', Box::new(base), Box::new(self.unary()?)));
        }
        Ok(base)
    }

    fn primary(&mut self) -> FireResult<Expr> {
        match self.next() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::LParen) => {
                let inner = self.expr()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => {
                let func = match name.to_lowercase().as_str() {
                    "sqrt" => Some(Func::Sqrt),
                    "abs" => Some(Func::Abs),
                    "exp" => Some(Func::Exp),
                    "ln" => Some(Func::Ln),
                    _ => None,
                };
                if let Some(func) = func {
                    self.expect(Token::LParen)?;
                    let arg = self.expr()?;
                    self.expect(Token::RParen)?;
                    return Ok(Expr::Call(func, Box::new(arg)));
                }
                let band: Band = name.parse()?;
                if !band.is_composite() {
                    return Err(FireError::config(format!(
                        "band {band} is not part of the composite"
                    )));
                }
                let slot = match self.bands.iter().position(|b| *b == band) {
                    Some(slot) => slot,
                    None => {
                        self.bands.push(band);
                        self.bands.len() - 1
                    }
                };
                Ok(Expr::Input(slot))
            }
            Some(token) => Err(FireError::config(format!("unexpected token {token:?}"))),
            None => Err(FireError::config("unexpected end of expression")),
        }
    }
}

/// Index evaluated from a parsed band-math expression
#[derive(Debug, Clone)]
pub struct ExpressionIndex {
    name: String,
    source: String,
    bands: Vec<Band>,
    root: Expr,
}

impl ExpressionIndex {
    pub fn parse(name: impl Into<String>, source: impl Into<String>) -> FireResult<Self> {
        let name = name.into();
        let source = source.into();
        let with_context =
            |e: FireError| FireError::config(format!("expression for index {name}: {e}"));

        let tokens = tokenize(&source).map_err(with_context)?;
        let mut parser = Parser {
            tokens,
            pos: 0,
            bands: Vec::new(),
        };
        let root = parser.expr().map_err(with_context)?;
        if let Some(token) = parser.peek() {
            return Err(with_context(FireError::config(format!(
                "trailing input at {token:?}"
            ))));
        }

        Ok(Self {
            name,
            source,
            bands: parser.bands,
            root,
        })
    }
}

impl IndexCalculator for ExpressionIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn required_bands(&self) -> &[Band] {
        &self.bands
    }

    fn formula(&self) -> String {
        self.source.clone()
    }

    fn evaluate(&self, values: &[f64]) -> Option<f64> {
        self.root.eval(values)
    }
}
