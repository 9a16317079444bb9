//! Attribute filter expressions.
//!
//! A small query language modelled on dataframe `query` strings:
//!
//! ```text
//! admin == 'Spain' and not name in ['Las Palmas', 'Santa Cruz de Tenerife']
//! (pop_max >= 100000) | (`feature class` != "Populated place")
//! ```
//!
//! Comparisons against a null value are false except `!=`. Unknown columns
//! evaluate to null.

use std::cmp::Ordering;
use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

use thiserror::Error;

use super::{AttrValue, Feature, Layer};

/// A filter expression failed to parse.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Invalid filter expression at position {position}: {message}")]
pub struct FilterError {
    pub position: usize,
    pub message: String,
}

impl FilterError {
    fn new(position: usize, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Literal(AttrValue),
    Cmp(CmpOp),
    And,
    Or,
    Not,
    In,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(AttrValue),
    Column(String),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Compare(CmpOp, Box<Expr>, Box<Expr>),
    In {
        operand: Box<Expr>,
        list: Vec<AttrValue>,
        negated: bool,
    },
}

/// A parsed filter expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    source: String,
    expr: Expr,
}

impl Filter {
    /// Parses an expression.
    pub fn parse(source: &str) -> Result<Self, FilterError> {
        let tokens = tokenize(source)?;
        let mut parser = Parser {
            tokens,
            pos: 0,
            len: source.len(),
        };
        let expr = parser.parse_or()?;
        if let Some((pos, token)) = parser.tokens.get(parser.pos) {
            return Err(FilterError::new(
                *pos,
                format!("unexpected token {:?}", token),
            ));
        }
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, feature: &Feature) -> bool {
        truthy(&self.expr, feature)
    }

    /// Keeps the features of `layer` that match.
    pub fn apply(&self, layer: Layer) -> Layer {
        layer.retain(|f| self.matches(f))
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl std::str::FromStr for Filter {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Filter::parse(s)
    }
}

fn truthy(expr: &Expr, feature: &Feature) -> bool {
    match expr {
        Expr::Not(inner) => !truthy(inner, feature),
        Expr::And(a, b) => truthy(a, feature) && truthy(b, feature),
        Expr::Or(a, b) => truthy(a, feature) || truthy(b, feature),
        Expr::Compare(op, a, b) => compare(*op, &value(a, feature), &value(b, feature)),
        Expr::In {
            operand,
            list,
            negated,
        } => {
            let v = value(operand, feature);
            let found = !v.is_null() && list.iter().any(|item| compare(CmpOp::Eq, &v, item));
            found != *negated
        }
        other => value(other, feature).is_truthy(),
    }
}

fn value(expr: &Expr, feature: &Feature) -> AttrValue {
    match expr {
        Expr::Literal(v) => v.clone(),
        Expr::Column(name) => feature.get(name).clone(),
        other => AttrValue::Bool(truthy(other, feature)),
    }
}

fn compare(op: CmpOp, a: &AttrValue, b: &AttrValue) -> bool {
    let ordering = match (a, b) {
        (AttrValue::Null, _) | (_, AttrValue::Null) => None,
        (AttrValue::Text(x), AttrValue::Text(y)) => Some(x.cmp(y)),
        (AttrValue::Text(_), _) | (_, AttrValue::Text(_)) => None,
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y),
            _ => None,
        },
    };

    match (op, ordering) {
        (CmpOp::Ne, None) => true,
        (_, None) => false,
        (CmpOp::Eq, Some(o)) => o == Ordering::Equal,
        (CmpOp::Ne, Some(o)) => o != Ordering::Equal,
        (CmpOp::Lt, Some(o)) => o == Ordering::Less,
        (CmpOp::Le, Some(o)) => o != Ordering::Greater,
        (CmpOp::Gt, Some(o)) => o == Ordering::Greater,
        (CmpOp::Ge, Some(o)) => o != Ordering::Less,
    }
}

fn tokenize(source: &str) -> Result<Vec<(usize, Token)>, FilterError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(pos, c)) = chars.peek() {
        let token = match c {
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            '(' | ')' | '[' | ']' | ',' | '&' | '|' | '~' => {
                chars.next();
                match c {
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    '[' => Token::LBracket,
                    ']' => Token::RBracket,
                    ',' => Token::Comma,
                    '&' => Token::And,
                    '|' => Token::Or,
                    _ => Token::Not,
                }
            }
            '=' | '!' | '<' | '>' => {
                chars.next();
                let followed_by_eq = chars.next_if(|&(_, n)| n == '=').is_some();
                match (c, followed_by_eq) {
                    ('=', true) => Token::Cmp(CmpOp::Eq),
                    ('!', true) => Token::Cmp(CmpOp::Ne),
                    ('<', false) => Token::Cmp(CmpOp::Lt),
                    ('<', true) => Token::Cmp(CmpOp::Le),
                    ('>', false) => Token::Cmp(CmpOp::Gt),
                    ('>', true) => Token::Cmp(CmpOp::Ge),
                    _ => return Err(FilterError::new(pos, format!("expected '=' after '{}'", c))),
                }
            }
            '\'' | '"' => Token::Literal(AttrValue::Text(read_quoted(&mut chars, c, pos)?)),
            '`' => Token::Ident(read_quoted(&mut chars, '`', pos)?),
            c if c.is_ascii_digit() || c == '.' || c == '-' => read_number(&mut chars, pos)?,
            c if c.is_alphabetic() || c == '_' => {
                let mut word = String::new();
                while let Some((_, n)) = chars.next_if(|&(_, n)| n.is_alphanumeric() || n == '_') {
                    word.push(n);
                }
                match word.as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    "in" => Token::In,
                    "True" | "true" => Token::Literal(AttrValue::Bool(true)),
                    "False" | "false" => Token::Literal(AttrValue::Bool(false)),
                    "None" | "null" => Token::Literal(AttrValue::Null),
                    _ => Token::Ident(word),
                }
            }
            other => {
                return Err(FilterError::new(
                    pos,
                    format!("unexpected character '{}'", other),
                ))
            }
        };
        tokens.push((pos, token));
    }

    Ok(tokens)
}

fn read_quoted(
    chars: &mut Peekable<CharIndices<'_>>,
    quote: char,
    start: usize,
) -> Result<String, FilterError> {
    chars.next();
    let mut out = String::new();
    loop {
        match chars.next() {
            Some((_, '\\')) => match chars.next() {
                Some((_, escaped)) => out.push(escaped),
                None => break,
            },
            Some((_, c)) if c == quote => return Ok(out),
            Some((_, c)) => out.push(c),
            None => break,
        }
    }
    Err(FilterError::new(start, "unterminated quoted string"))
}

fn read_number(
    chars: &mut Peekable<CharIndices<'_>>,
    start: usize,
) -> Result<Token, FilterError> {
    let mut text = String::new();
    if let Some((_, '-')) = chars.next_if(|&(_, c)| c == '-') {
        text.push('-');
    }
    while let Some((_, c)) =
        chars.next_if(|&(_, c)| c.is_ascii_digit() || c == '.' || c == '_' || c == 'e' || c == 'E')
    {
        if c != '_' {
            text.push(c);
        }
    }
    text.parse::<f64>()
        .map(|n| Token::Literal(AttrValue::Number(n)))
        .map_err(|_| FilterError::new(start, format!("invalid number '{}'", text)))
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    len: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn position(&self) -> usize {
        self.tokens.get(self.pos).map(|(p, _)| *p).unwrap_or(self.len)
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token, what: &str) -> Result<(), FilterError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(FilterError::new(self.position(), format!("expected {}", what)))
        }
    }

    fn parse_or(&mut self) -> Result<Expr, FilterError> {
        let mut lhs = self.parse_and()?;
        while self.eat(&Token::Or) {
            let rhs = self.parse_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, FilterError> {
        let mut lhs = self.parse_not()?;
        while self.eat(&Token::And) {
            let rhs = self.parse_not()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expr, FilterError> {
        if self.eat(&Token::Not) {
            return Ok(Expr::Not(Box::new(self.parse_not()?)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, FilterError> {
        let lhs = self.parse_operand()?;

        match self.peek() {
            Some(Token::Cmp(op)) => {
                let op = *op;
                self.pos += 1;
                let rhs = self.parse_operand()?;
                Ok(Expr::Compare(op, Box::new(lhs), Box::new(rhs)))
            }
            Some(Token::In) => {
                self.pos += 1;
                let list = self.parse_list()?;
                Ok(Expr::In {
                    operand: Box::new(lhs),
                    list,
                    negated: false,
                })
            }
            Some(Token::Not) if self.tokens.get(self.pos + 1).map(|(_, t)| t) == Some(&Token::In) => {
                self.pos += 2;
                let list = self.parse_list()?;
                Ok(Expr::In {
                    operand: Box::new(lhs),
                    list,
                    negated: true,
                })
            }
            _ => Ok(lhs),
        }
    }

    fn parse_operand(&mut self) -> Result<Expr, FilterError> {
        let position = self.position();
        match self.tokens.get(self.pos).map(|(_, t)| t.clone()) {
            Some(Token::Literal(v)) => {
                self.pos += 1;
                Ok(Expr::Literal(v))
            }
            Some(Token::Ident(name)) => {
                self.pos += 1;
                Ok(Expr::Column(name))
            }
            Some(Token::LParen) => {
                self.pos += 1;
                let inner = self.parse_or()?;
                self.expect(&Token::RParen, "')'")?;
                Ok(inner)
            }
            Some(token) => Err(FilterError::new(
                position,
                format!("unexpected token {:?}", token),
            )),
            None => Err(FilterError::new(position, "unexpected end of expression")),
        }
    }

    fn parse_list(&mut self) -> Result<Vec<AttrValue>, FilterError> {
        self.expect(&Token::LBracket, "'['")?;
        let mut items = Vec::new();
        if self.eat(&Token::RBracket) {
            return Ok(items);
        }
        loop {
            let position = self.position();
            match self.tokens.get(self.pos).map(|(_, t)| t.clone()) {
                Some(Token::Literal(v)) => {
                    self.pos += 1;
                    items.push(v);
                }
                _ => return Err(FilterError::new(position, "expected a literal in list")),
            }
            if self.eat(&Token::RBracket) {
                return Ok(items);
            }
            self.expect(&Token::Comma, "',' or ']'")?;
        }
    }
}
