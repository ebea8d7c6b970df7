//! Row predicates for conditional relations.
//!
//! A condition is compiled once against the ordered field names of the file
//! type that declares it, then evaluated against each tokenized row. Field
//! references are resolved to column indices at compile time.
//!
//! Supported syntax:
//!
//! - comparisons: `field == 'x'`, `field != "x"`, `<`, `<=`, `>`, `>=`
//!   (ordering compares numerically and is false for non-numeric values)
//! - membership: `field in ['AWS', 'Collab']`, `field not in {...}`, `field ∈ {...}`
//! - boolean: `&&` / `and`, `||` / `or`, `!` / `not`, parentheses, `true`, `false`
//! - `null` and `''` match an empty value

use std::fmt;

/// Failure to compile a condition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConditionError {
    #[error("condition is empty")]
    Empty,
    #[error("unexpected character {found:?} at offset {offset}")]
    UnexpectedChar { found: char, offset: usize },
    #[error("unterminated string literal starting at offset {offset}")]
    UnterminatedString { offset: usize },
    #[error("expected {expected} at offset {offset}, found {found}")]
    Unexpected {
        expected: &'static str,
        found: String,
        offset: usize,
    },
    #[error("unknown field {name}")]
    UnknownField { name: String },
}

/// A row handed to a condition does not have the arity it was compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("row has {actual} values, condition expects {expected}")]
pub struct InvalidRowError {
    pub expected: usize,
    pub actual: usize,
}

/// A compiled, immutable row predicate.
#[derive(Debug, Clone)]
pub struct ConditionEvaluator {
    source: String,
    field_count: usize,
    expr: Expr,
}

impl ConditionEvaluator {
    /// Compile `source` against the ordered field names of a file type.
    pub fn compile<S: AsRef<str>>(source: &str, field_names: &[S]) -> Result<Self, ConditionError> {
        let tokens = tokenize(source)?;
        if tokens.is_empty() {
            return Err(ConditionError::Empty);
        }
        let mut parser = Parser {
            tokens,
            pos: 0,
            end: source.len(),
            field_names,
        };
        let expr = parser.parse_or()?;
        if let Some(token) = parser.peek() {
            return Err(ConditionError::Unexpected {
                expected: "end of condition",
                found: token.token.to_string(),
                offset: token.offset,
            });
        }
        Ok(Self {
            source: source.to_string(),
            field_count: field_names.len(),
            expr,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Number of fields a row must carry.
    pub fn field_count(&self) -> usize {
        self.field_count
    }

    pub fn evaluate<S: AsRef<str>>(&self, row: &[S]) -> Result<bool, InvalidRowError> {
        if row.len() != self.field_count {
            return Err(InvalidRowError {
                expected: self.field_count,
                actual: row.len(),
            });
        }
        Ok(self.expr.eval(row))
    }
}

impl fmt::Display for ConditionEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[derive(Debug, Clone)]
enum Expr {
    Const(bool),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
    Compare {
        left: Operand,
        op: CompareOp,
        right: Operand,
    },
    Membership {
        operand: Operand,
        values: Vec<Option<String>>,
        negated: bool,
    },
}

#[derive(Debug, Clone)]
enum Operand {
    Field(usize),
    Literal(String),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Expr {
    fn eval<S: AsRef<str>>(&self, row: &[S]) -> bool {
        match self {
            Expr::Const(value) => *value,
            Expr::And(items) => items.iter().all(|item| item.eval(row)),
            Expr::Or(items) => items.iter().any(|item| item.eval(row)),
            Expr::Not(inner) => !inner.eval(row),
            Expr::Compare { left, op, right } => {
                let left = left.resolve(row);
                let right = right.resolve(row);
                match op {
                    CompareOp::Eq => left == right,
                    CompareOp::Ne => left != right,
                    CompareOp::Lt | CompareOp::Le | CompareOp::Gt | CompareOp::Ge => {
                        let (Some(left), Some(right)) = (numeric(left), numeric(right)) else {
                            return false;
                        };
                        match op {
                            CompareOp::Lt => left < right,
                            CompareOp::Le => left <= right,
                            CompareOp::Gt => left > right,
                            _ => left >= right,
                        }
                    }
                }
            }
            Expr::Membership {
                operand,
                values,
                negated,
            } => {
                let value = operand.resolve(row);
                let found = values.iter().any(|candidate| candidate.as_deref() == value);
                found != *negated
            }
        }
    }
}

impl Operand {
    fn resolve<'a, S: AsRef<str>>(&'a self, row: &'a [S]) -> Option<&'a str> {
        match self {
            Operand::Field(index) => {
                let value = row[*index].as_ref();
                (!value.is_empty()).then_some(value)
            }
            Operand::Literal(value) => Some(value.as_str()),
            Operand::Null => None,
        }
    }
}

fn numeric(value: Option<&str>) -> Option<f64> {
    value.and_then(|value| value.trim().parse::<f64>().ok())
}

// ============================================================================
// Lexer
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Number(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Not,
    In,
    NotIn,
    Null,
    True,
    False,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(name) => write!(f, "identifier {name}"),
            Token::Str(value) => write!(f, "string {value:?}"),
            Token::Number(value) => write!(f, "number {value}"),
            Token::LParen => f.write_str("'('"),
            Token::RParen => f.write_str("')'"),
            Token::LBracket => f.write_str("'['"),
            Token::RBracket => f.write_str("']'"),
            Token::LBrace => f.write_str("'{'"),
            Token::RBrace => f.write_str("'}'"),
            Token::Comma => f.write_str("','"),
            Token::Eq => f.write_str("'=='"),
            Token::Ne => f.write_str("'!='"),
            Token::Lt => f.write_str("'<'"),
            Token::Le => f.write_str("'<='"),
            Token::Gt => f.write_str("'>'"),
            Token::Ge => f.write_str("'>='"),
            Token::And => f.write_str("'&&'"),
            Token::Or => f.write_str("'||'"),
            Token::Not => f.write_str("'!'"),
            Token::In => f.write_str("'in'"),
            Token::NotIn => f.write_str("'not in'"),
            Token::Null => f.write_str("null"),
            Token::True => f.write_str("true"),
            Token::False => f.write_str("false"),
        }
    }
}

#[derive(Debug, Clone)]
struct Spanned {
    token: Token,
    offset: usize,
}

fn tokenize(source: &str) -> Result<Vec<Spanned>, ConditionError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some((offset, ch)) = chars.next() {
        if ch.is_whitespace() {
            continue;
        }
        let token = match ch {
            '(' => Token::LParen,
            ')' => Token::RParen,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            '{' => Token::LBrace,
            '}' => Token::RBrace,
            ',' => Token::Comma,
            '∈' => Token::In,
            '∉' => Token::NotIn,
            '=' | '&' | '|' => {
                if chars.next_if(|&(_, next)| next == ch).is_none() {
                    return Err(ConditionError::UnexpectedChar { found: ch, offset });
                }
                match ch {
                    '=' => Token::Eq,
                    '&' => Token::And,
                    _ => Token::Or,
                }
            }
            '!' => {
                if chars.next_if(|&(_, next)| next == '=').is_some() {
                    Token::Ne
                } else {
                    Token::Not
                }
            }
            '<' | '>' => {
                let inclusive = chars.next_if(|&(_, next)| next == '=').is_some();
                match (ch, inclusive) {
                    ('<', false) => Token::Lt,
                    ('<', true) => Token::Le,
                    ('>', false) => Token::Gt,
                    _ => Token::Ge,
                }
            }
            '"' | '\'' => {
                let mut value = String::new();
                let mut closed = false;
                while let Some((_, next)) = chars.next() {
                    match next {
                        '\\' => {
                            if let Some((_, escaped)) = chars.next() {
                                value.push(escaped);
                            }
                        }
                        quote if quote == ch => {
                            closed = true;
                            break;
                        }
                        other => value.push(other),
                    }
                }
                if !closed {
                    return Err(ConditionError::UnterminatedString { offset });
                }
                Token::Str(value)
            }
            '-' | '0'..='9' => {
                let mut value = String::from(ch);
                while let Some((_, next)) =
                    chars.next_if(|&(_, next)| next.is_ascii_digit() || next == '.')
                {
                    value.push(next);
                }
                if value == "-" {
                    return Err(ConditionError::UnexpectedChar { found: ch, offset });
                }
                Token::Number(value)
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut value = String::from(c);
                while let Some((_, next)) = chars
                    .next_if(|&(_, next)| next.is_alphanumeric() || next == '_' || next == '.')
                {
                    value.push(next);
                }
                match value.to_ascii_lowercase().as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    "in" => Token::In,
                    "null" => Token::Null,
                    "true" => Token::True,
                    "false" => Token::False,
                    _ => Token::Ident(value),
                }
            }
            other => return Err(ConditionError::UnexpectedChar { found: other, offset }),
        };
        tokens.push(Spanned { token, offset });
    }
    Ok(tokens)
}

// ============================================================================
// Parser
// ============================================================================

struct Parser<'a, S> {
    tokens: Vec<Spanned>,
    pos: usize,
    end: usize,
    field_names: &'a [S],
}

impl<S: AsRef<str>> Parser<'_, S> {
    fn peek(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    fn peek_token(&self) -> Option<&Token> {
        self.peek().map(|spanned| &spanned.token)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek_token() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn unexpected(&self, expected: &'static str) -> ConditionError {
        match self.peek() {
            Some(spanned) => ConditionError::Unexpected {
                expected,
                found: spanned.token.to_string(),
                offset: spanned.offset,
            },
            None => ConditionError::Unexpected {
                expected,
                found: "end of condition".to_string(),
                offset: self.end,
            },
        }
    }

    fn parse_or(&mut self) -> Result<Expr, ConditionError> {
        let mut items = vec![self.parse_and()?];
        while self.eat(&Token::Or) {
            items.push(self.parse_and()?);
        }
        Ok(if items.len() == 1 {
            items.remove(0)
        } else {
            Expr::Or(items)
        })
    }

    fn parse_and(&mut self) -> Result<Expr, ConditionError> {
        let mut items = vec![self.parse_unary()?];
        while self.eat(&Token::And) {
            items.push(self.parse_unary()?);
        }
        Ok(if items.len() == 1 {
            items.remove(0)
        } else {
            Expr::And(items)
        })
    }

    fn parse_unary(&mut self) -> Result<Expr, ConditionError> {
        if self.eat(&Token::Not) {
            return Ok(Expr::Not(Box::new(self.parse_unary()?)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ConditionError> {
        if self.eat(&Token::LParen) {
            let inner = self.parse_or()?;
            if !self.eat(&Token::RParen) {
                return Err(self.unexpected("')'"));
            }
            return Ok(inner);
        }
        if let Some(value @ (Token::True | Token::False)) = self.peek_token() {
            let constant = *value == Token::True;
            let followed_by_operator = self
                .tokens
                .get(self.pos + 1)
                .is_some_and(|next| comparison_op(&next.token).is_some());
            if !followed_by_operator {
                self.pos += 1;
                return Ok(Expr::Const(constant));
            }
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ConditionError> {
        let left = self.parse_operand()?;
        if let Some(op) = self.peek_token().and_then(comparison_op) {
            self.pos += 1;
            let right = self.parse_operand()?;
            return Ok(Expr::Compare { left, op, right });
        }
        let negated = match self.peek_token() {
            Some(Token::In) => false,
            Some(Token::NotIn) => true,
            Some(Token::Not) if self.tokens.get(self.pos + 1).map(|t| &t.token) == Some(&Token::In) => {
                self.pos += 1;
                true
            }
            _ => return Err(self.unexpected("comparison or 'in'")),
        };
        self.pos += 1;
        let values = self.parse_list()?;
        Ok(Expr::Membership {
            operand: left,
            values,
            negated,
        })
    }

    fn parse_operand(&mut self) -> Result<Operand, ConditionError> {
        let Some(spanned) = self.peek().cloned() else {
            return Err(self.unexpected("field or literal"));
        };
        let operand = match spanned.token {
            Token::Ident(name) => {
                let index = self
                    .field_names
                    .iter()
                    .position(|field| field.as_ref() == name)
                    .ok_or(ConditionError::UnknownField { name })?;
                Operand::Field(index)
            }
            Token::Str(value) if value.is_empty() => Operand::Null,
            Token::Str(value) | Token::Number(value) => Operand::Literal(value),
            Token::True => Operand::Literal("true".to_string()),
            Token::False => Operand::Literal("false".to_string()),
            Token::Null => Operand::Null,
            _ => return Err(self.unexpected("field or literal")),
        };
        self.pos += 1;
        Ok(operand)
    }

    fn parse_list(&mut self) -> Result<Vec<Option<String>>, ConditionError> {
        let close = match self.peek_token() {
            Some(Token::LBracket) => Token::RBracket,
            Some(Token::LBrace) => Token::RBrace,
            Some(Token::LParen) => Token::RParen,
            _ => return Err(self.unexpected("'[', '{' or '('")),
        };
        self.pos += 1;
        let mut values = Vec::new();
        if self.eat(&close) {
            return Ok(values);
        }
        loop {
            let value = match self.peek_token() {
                Some(Token::Str(value) | Token::Number(value) | Token::Ident(value)) => {
                    (!value.is_empty()).then(|| value.clone())
                }
                Some(Token::True) => Some("true".to_string()),
                Some(Token::False) => Some("false".to_string()),
                Some(Token::Null) => None,
                _ => return Err(self.unexpected("list value")),
            };
            self.pos += 1;
            values.push(value);
            if self.eat(&close) {
                return Ok(values);
            }
            if !self.eat(&Token::Comma) {
                return Err(self.unexpected("',' or end of list"));
            }
        }
    }
}

fn comparison_op(token: &Token) -> Option<CompareOp> {
    match token {
        Token::Eq => Some(CompareOp::Eq),
        Token::Ne => Some(CompareOp::Ne),
        Token::Lt => Some(CompareOp::Lt),
        Token::Le => Some(CompareOp::Le),
        Token::Gt => Some(CompareOp::Gt),
        Token::Ge => Some(CompareOp::Ge),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_operators_and_keywords() {
        let tokens: Vec<Token> = tokenize("a != 'x' AND b in [-888, \"y\"]")
            .expect("tokenize")
            .into_iter()
            .map(|spanned| spanned.token)
            .collect();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("a".to_string()),
                Token::Ne,
                Token::Str("x".to_string()),
                Token::And,
                Token::Ident("b".to_string()),
                Token::In,
                Token::LBracket,
                Token::Number("-888".to_string()),
                Token::Comma,
                Token::Str("y".to_string()),
                Token::RBracket,
            ]
        );
    }

    #[test]
    fn single_equals_is_rejected() {
        assert_eq!(
            tokenize("a = 'x'").unwrap_err(),
            ConditionError::UnexpectedChar {
                found: '=',
                offset: 2
            }
        );
    }
}
