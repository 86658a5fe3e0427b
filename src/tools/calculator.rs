//! Calculator tool.
//!
//! Evaluates arithmetic expressions with `+ - * / %`, `**` for powers, unary
//! signs and parentheses. There are no variables or functions.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::error::{AgentError, Result};
use crate::tool::{decode_arguments, Tool};

pub struct CalculateTool;

#[derive(Deserialize)]
struct CalculateArgs {
    expression: String,
}

#[async_trait]
impl Tool for CalculateTool {
    fn name(&self) -> &str {
        "calculate"
    }

    async fn call(&self, arguments: &str) -> Result<String> {
        let args: CalculateArgs = decode_arguments(self.name(), arguments)?;
        let value = evaluate(&args.expression).map_err(|err| AgentError::ToolInvocation {
            name: self.name().into(),
            message: err.to_string(),
        })?;
        Ok(format_number(value))
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("empty expression")]
    Empty,
    #[error("unexpected character `{0}` at position {1}")]
    UnexpectedChar(char, usize),
    #[error("invalid number `{0}`")]
    InvalidNumber(String),
    #[error("unexpected `{0}` at position {1}")]
    UnexpectedToken(String, usize),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("division by zero")]
    DivisionByZero,
    #[error("result is not a finite number")]
    NonFinite,
    #[error("expression nests deeper than 256 levels")]
    TooDeep,
}

/// Nesting allowed for parentheses, unary signs and `**` chains combined.
const MAX_DEPTH: usize = 256;

/// Evaluate an arithmetic expression.
pub fn evaluate(expression: &str) -> std::result::Result<f64, EvalError> {
    let tokens = tokenize(expression)?;
    if tokens.is_empty() {
        return Err(EvalError::Empty);
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    if let Some((token, at)) = parser.tokens.get(parser.pos) {
        return Err(EvalError::UnexpectedToken(token.to_string(), *at));
    }
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EvalError::NonFinite)
    }
}

/// Integral values print without a fractional part.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Power,
    LParen,
    RParen,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{n}"),
            Token::Plus => f.write_str("+"),
            Token::Minus => f.write_str("-"),
            Token::Star => f.write_str("*"),
            Token::Slash => f.write_str("/"),
            Token::Percent => f.write_str("%"),
            Token::Power => f.write_str("**"),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
        }
    }
}

fn tokenize(input: &str) -> std::result::Result<Vec<(Token, usize)>, EvalError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let start = i;
        let token = match c {
            c if c.is_whitespace() => {
                i += 1;
                continue;
            }
            '0'..='9' | '.' => {
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        while j < chars.len() && chars[j].is_ascii_digit() {
                            j += 1;
                        }
                        i = j;
                    }
                }
                let literal: String = chars[start..i].iter().collect();
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| EvalError::InvalidNumber(literal.clone()))?;
                tokens.push((Token::Number(value), start));
                continue;
            }
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' if chars.get(i + 1) == Some(&'*') => {
                i += 1;
                Token::Power
            }
            '*' => Token::Star,
            '/' => Token::Slash,
            '%' => Token::Percent,
            '(' => Token::LParen,
            ')' => Token::RParen,
            other => return Err(EvalError::UnexpectedChar(other, start)),
        };
        i += 1;
        tokens.push((token, start));
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(token, _)| token)
    }

    fn next(&mut self) -> std::result::Result<(Token, usize), EvalError> {
        let item = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or(EvalError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(item)
    }

    fn expr(&mut self) -> std::result::Result<f64, EvalError> {
        let mut value = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    value += self.term()?;
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    value -= self.term()?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn term(&mut self) -> std::result::Result<f64, EvalError> {
        let mut value = self.unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.pos += 1;
                    value *= self.unary()?;
                }
                Some(Token::Slash) => {
                    self.pos += 1;
                    let rhs = self.unary()?;
                    if rhs == 0.0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    value /= rhs;
                }
                Some(Token::Percent) => {
                    self.pos += 1;
                    let rhs = self.unary()?;
                    if rhs == 0.0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    value %= rhs;
                }
                _ => return Ok(value),
            }
        }
    }

    // Every nested construct re-enters here, so this is where depth is bounded.
    fn unary(&mut self) -> std::result::Result<f64, EvalError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(EvalError::TooDeep);
        }
        let value = self.signed();
        self.depth -= 1;
        value
    }

    fn signed(&mut self) -> std::result::Result<f64, EvalError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(-self.unary()?)
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    // `**` binds tighter than unary minus on its left and is right-associative.
    fn power(&mut self) -> std::result::Result<f64, EvalError> {
        let base = self.primary()?;
        if self.peek() == Some(&Token::Power) {
            self.pos += 1;
            let exponent = self.unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> std::result::Result<f64, EvalError> {
        match self.next()? {
            (Token::Number(n), _) => Ok(n),
            (Token::LParen, _) => {
                let value = self.expr()?;
                match self.next()? {
                    (Token::RParen, _) => Ok(value),
                    (token, at) => Err(EvalError::UnexpectedToken(token.to_string(), at)),
                }
            }
            (token, at) => Err(EvalError::UnexpectedToken(token.to_string(), at)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn respects_precedence_and_associativity() {
        assert_eq!(evaluate("2 + 3 * 4").unwrap(), 14.0);
        assert_eq!(evaluate("(2 + 3) * 4").unwrap(), 20.0);
        assert_eq!(evaluate("2 ** 3 ** 2").unwrap(), 512.0);
        assert_eq!(evaluate("-2 ** 2").unwrap(), -4.0);
        assert_eq!(evaluate("10 - 4 - 3").unwrap(), 3.0);
        assert_eq!(evaluate("7 % 4").unwrap(), 3.0);
        assert_eq!(evaluate("1.5e2 / 3").unwrap(), 50.0);
    }

    #[test]
    fn reports_malformed_input() {
        assert_eq!(evaluate("2 +"), Err(EvalError::UnexpectedEnd));
        assert_eq!(evaluate(""), Err(EvalError::Empty));
        assert_eq!(evaluate("(1 + 2"), Err(EvalError::UnexpectedEnd));
        assert_eq!(evaluate("2 $ 2"), Err(EvalError::UnexpectedChar('$', 2)));
        assert_eq!(
            evaluate("1 2"),
            Err(EvalError::UnexpectedToken("2".into(), 2))
        );
        assert_eq!(evaluate("1..2"), Err(EvalError::InvalidNumber("1..2".into())));
    }

    #[test]
    fn rejects_division_by_zero_and_overflow() {
        assert_eq!(evaluate("10 / 0"), Err(EvalError::DivisionByZero));
        assert_eq!(evaluate("5 % (2 - 2)"), Err(EvalError::DivisionByZero));
        assert_eq!(evaluate("10 ** 400"), Err(EvalError::NonFinite));
    }

    #[test]
    fn formats_integral_results_without_fraction() {
        assert_eq!(format_number(4.0), "4");
        assert_eq!(format_number(-12.0), "-12");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
    }

    #[test]
    fn bounds_nesting_depth() {
        assert_eq!(evaluate(&"(".repeat(100_000)), Err(EvalError::TooDeep));
        assert_eq!(
            evaluate(&format!("{}1", "-".repeat(200_000))),
            Err(EvalError::TooDeep)
        );
        assert_eq!(
            evaluate(&format!("{}2", "2 ** ".repeat(1_000))),
            Err(EvalError::TooDeep)
        );

        let nested = format!("{}1{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(evaluate(&nested).unwrap(), 1.0);
        assert_eq!(evaluate(&format!("{}1", "-".repeat(100))).unwrap(), 1.0);
    }

    #[tokio::test]
    async fn tool_returns_canonical_text() {
        let tool = CalculateTool;
        assert_eq!(tool.call(r#"{"expression":"2 + 2"}"#).await.unwrap(), "4");
        assert_eq!(tool.call(r#"{"expression":"7 / 2"}"#).await.unwrap(), "3.5");
    }

    #[tokio::test]
    async fn tool_requires_expression() {
        let err = CalculateTool.call(r#"{"expr":"1"}"#).await.unwrap_err();
        assert!(matches!(err, AgentError::InvalidArguments { .. }));
    }
}
