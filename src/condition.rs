//! Gating condition evaluation.
//!
//! [`ArgumentConditionEvaluator`] understands a small expression language over
//! the invocation's arguments:
//!
//! ```text
//! #query.id == null && !#preview
//! #0 != null || #mode == 'all'
//! ```
//!
//! `#name` refers to a parameter by name, `#0` by position, and `.field`
//! reads a field of an object or a key of a map. Operands compare with `==`
//! and `!=` and combine with `!`, `&&`, `||` and parentheses.
//!
//! Reading a missing field or key yields `null`, and so does reading any
//! field of `null`. A bare operand holds only when it is `true`; `null`,
//! numbers and text count as false.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::EvalError;
use crate::target::CallTarget;
use crate::value::Value;

/// Evaluates a gating condition against one invocation.
pub trait ConditionEvaluator: Send + Sync {
    /// Returns whether paging should be applied to this invocation.
    ///
    /// # Errors
    ///
    /// Returns an [`EvalError`] when the expression cannot be parsed or
    /// evaluated. The invocation is aborted before the wrapped call runs.
    fn evaluate(
        &self,
        expression: &str,
        target: &CallTarget,
        args: &[Value],
    ) -> Result<bool, EvalError>;
}

/// Stock evaluator for argument expressions.
///
/// Parsed expressions are cached by their text.
///
/// # Examples
///
/// ```
/// use paging_core::{ArgumentConditionEvaluator, CallTarget, ConditionEvaluator, ParamType, Value};
///
/// let target = CallTarget::builder("svc::m").named_param("id", ParamType::Int).build();
/// let evaluator = ArgumentConditionEvaluator::new();
///
/// assert!(evaluator.evaluate("#id == null", &target, &[Value::Null]).unwrap());
/// assert!(!evaluator.evaluate("#id == null", &target, &[Value::Int(7)]).unwrap());
/// ```
#[derive(Debug, Default)]
pub struct ArgumentConditionEvaluator {
    parsed: Mutex<HashMap<String, Arc<Expr>>>,
}

impl ArgumentConditionEvaluator {
    /// Creates an evaluator with an empty expression cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn parse(&self, expression: &str) -> Result<Arc<Expr>, EvalError> {
        let mut parsed = self.parsed.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(expr) = parsed.get(expression) {
            return Ok(Arc::clone(expr));
        }
        let expr = Arc::new(Parser::new(expression)?.parse()?);
        parsed.insert(expression.to_string(), Arc::clone(&expr));
        Ok(expr)
    }
}

impl ConditionEvaluator for ArgumentConditionEvaluator {
    fn evaluate(
        &self,
        expression: &str,
        target: &CallTarget,
        args: &[Value],
    ) -> Result<bool, EvalError> {
        let expr = self.parse(expression)?;
        Scope {
            expression,
            target,
            args,
        }
        .truth(&expr)
    }
}

#[derive(Debug, PartialEq)]
enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Eq(Operand, Operand),
    Ne(Operand, Operand),
    Operand(Operand),
}

#[derive(Debug, PartialEq)]
enum Operand {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
    Ref { root: Root, path: Vec<String> },
}

#[derive(Debug, PartialEq)]
enum Root {
    Index(usize),
    Name(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ref(String),
    Ident(String),
    Int(i64),
    Text(String),
    Dot,
    Eq,
    Ne,
    And,
    Or,
    Not,
    Open,
    Close,
}

fn tokenize(expression: &str) -> Result<Vec<Token>, EvalError> {
    let fail = |message: String| EvalError::new(expression, message);
    let mut tokens = Vec::new();
    let mut chars = expression.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '#' => {
                chars.next();
                let name = take_word(&mut chars);
                if name.is_empty() {
                    return Err(fail("expected a parameter after '#'".to_string()));
                }
                tokens.push(Token::Ref(name));
            }
            '.' => {
                chars.next();
                tokens.push(Token::Dot);
            }
            '(' | ')' => {
                chars.next();
                tokens.push(if c == '(' { Token::Open } else { Token::Close });
            }
            '=' | '!' | '&' | '|' => {
                chars.next();
                let next = chars.peek().copied();
                let token = match (c, next) {
                    ('=', Some('=')) => Token::Eq,
                    ('!', Some('=')) => Token::Ne,
                    ('&', Some('&')) => Token::And,
                    ('|', Some('|')) => Token::Or,
                    ('!', _) => {
                        tokens.push(Token::Not);
                        continue;
                    }
                    _ => return Err(fail(format!("unexpected '{}'", c))),
                };
                chars.next();
                tokens.push(token);
            }
            '\'' => {
                chars.next();
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(ch) => text.push(ch),
                        None => return Err(fail("unterminated text literal".to_string())),
                    }
                }
                tokens.push(Token::Text(text));
            }
            c if c.is_ascii_digit() || c == '-' => {
                chars.next();
                let mut digits = c.to_string();
                digits.push_str(&take_word(&mut chars));
                let n = digits
                    .parse()
                    .map_err(|_| fail(format!("invalid number '{}'", digits)))?;
                tokens.push(Token::Int(n));
            }
            c if c.is_alphabetic() || c == '_' => {
                tokens.push(Token::Ident(take_word(&mut chars)));
            }
            other => return Err(fail(format!("unexpected '{}'", other))),
        }
    }
    Ok(tokens)
}

fn take_word(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut word = String::new();
    while let Some(&c) = chars.peek() {
        if !(c.is_alphanumeric() || c == '_') {
            break;
        }
        word.push(c);
        chars.next();
    }
    word
}

struct Parser<'a> {
    expression: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(expression: &'a str) -> Result<Self, EvalError> {
        Ok(Self {
            expression,
            tokens: tokenize(expression)?,
            pos: 0,
        })
    }

    fn parse(mut self) -> Result<Expr, EvalError> {
        let expr = self.or()?;
        match self.tokens.get(self.pos) {
            None => Ok(expr),
            Some(token) => Err(self.fail(format!("unexpected {:?}", token))),
        }
    }

    fn fail(&self, message: impl Into<String>) -> EvalError {
        EvalError::new(self.expression, message)
    }

    fn next_if(&mut self, expected: &Token) -> bool {
        if self.tokens.get(self.pos) == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn or(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.and()?;
        while self.next_if(&Token::Or) {
            left = Expr::Or(Box::new(left), Box::new(self.and()?));
        }
        Ok(left)
    }

    fn and(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.unary()?;
        while self.next_if(&Token::And) {
            left = Expr::And(Box::new(left), Box::new(self.unary()?));
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, EvalError> {
        if self.next_if(&Token::Not) {
            return Ok(Expr::Not(Box::new(self.unary()?)));
        }
        if self.next_if(&Token::Open) {
            let inner = self.or()?;
            if !self.next_if(&Token::Close) {
                return Err(self.fail("expected ')'"));
            }
            return Ok(inner);
        }
        let left = self.operand()?;
        if self.next_if(&Token::Eq) {
            Ok(Expr::Eq(left, self.operand()?))
        } else if self.next_if(&Token::Ne) {
            Ok(Expr::Ne(left, self.operand()?))
        } else {
            Ok(Expr::Operand(left))
        }
    }

    fn operand(&mut self) -> Result<Operand, EvalError> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| self.fail("unexpected end of expression"))?;
        self.pos += 1;
        match token {
            Token::Int(n) => Ok(Operand::Int(n)),
            Token::Text(s) => Ok(Operand::Text(s)),
            Token::Ident(word) => match word.as_str() {
                "null" => Ok(Operand::Null),
                "true" => Ok(Operand::Bool(true)),
                "false" => Ok(Operand::Bool(false)),
                _ => Err(self.fail(format!("unknown identifier '{}'", word))),
            },
            Token::Ref(name) => {
                let root = match name.parse::<usize>() {
                    Ok(index) => Root::Index(index),
                    Err(_) => Root::Name(name),
                };
                let mut path = Vec::new();
                while self.next_if(&Token::Dot) {
                    match self.tokens.get(self.pos) {
                        Some(Token::Ident(field)) => {
                            path.push(field.clone());
                            self.pos += 1;
                        }
                        _ => return Err(self.fail("expected a field name after '.'")),
                    }
                }
                Ok(Operand::Ref { root, path })
            }
            other => Err(self.fail(format!("unexpected {:?}", other))),
        }
    }
}

struct Scope<'a> {
    expression: &'a str,
    target: &'a CallTarget,
    args: &'a [Value],
}

impl Scope<'_> {
    fn fail(&self, message: impl Into<String>) -> EvalError {
        EvalError::new(self.expression, message)
    }

    fn truth(&self, expr: &Expr) -> Result<bool, EvalError> {
        match expr {
            Expr::Or(l, r) => Ok(self.truth(l)? || self.truth(r)?),
            Expr::And(l, r) => Ok(self.truth(l)? && self.truth(r)?),
            Expr::Not(inner) => Ok(!self.truth(inner)?),
            Expr::Eq(l, r) => self.equals(l, r),
            Expr::Ne(l, r) => self.equals(l, r).map(|eq| !eq),
            Expr::Operand(operand) => Ok(matches!(self.value(operand)?, Value::Bool(true))),
        }
    }

    fn equals(&self, left: &Operand, right: &Operand) -> Result<bool, EvalError> {
        let (left, right) = (self.value(left)?, self.value(right)?);
        match (&left, &right) {
            (Value::Null, Value::Null) => Ok(true),
            (Value::Bool(a), Value::Bool(b)) => Ok(a == b),
            (Value::Int(a), Value::Int(b)) => Ok(a == b),
            (Value::Text(a), Value::Text(b)) => Ok(a == b),
            (Value::Map(_) | Value::Object(_), _) | (_, Value::Map(_) | Value::Object(_))
                if !left.is_null() && !right.is_null() =>
            {
                Err(self.fail(format!(
                    "cannot compare {} with {}",
                    left.type_name(),
                    right.type_name()
                )))
            }
            _ => Ok(false),
        }
    }

    fn value(&self, operand: &Operand) -> Result<Value, EvalError> {
        match operand {
            Operand::Null => Ok(Value::Null),
            Operand::Bool(b) => Ok(Value::Bool(*b)),
            Operand::Int(n) => Ok(Value::Int(*n)),
            Operand::Text(s) => Ok(Value::Text(s.clone())),
            Operand::Ref { root, path } => {
                let mut value = self.root(root)?;
                for field in path {
                    value = match &value {
                        Value::Null => Value::Null,
                        Value::Map(map) => map.get(field).cloned().unwrap_or(Value::Null),
                        Value::Object(object) => object.field(field).unwrap_or(Value::Null),
                        other => {
                            return Err(self.fail(format!(
                                "cannot read '{}' of {}",
                                field,
                                other.type_name()
                            )))
                        }
                    };
                }
                Ok(value)
            }
        }
    }

    fn root(&self, root: &Root) -> Result<Value, EvalError> {
        let index = match root {
            Root::Index(index) => *index,
            Root::Name(name) => self
                .target
                .param_names()
                .and_then(|names| names.iter().position(|n| *n == name.as_str()))
                .ok_or_else(|| self.fail(format!("no parameter named '{}'", name)))?,
        };
        self.args
            .get(index)
            .cloned()
            .ok_or_else(|| self.fail(format!("no argument at index {}", index)))
    }
}
