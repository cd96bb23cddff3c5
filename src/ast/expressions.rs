use std::fmt;

use regex::Regex;

use crate::ast::{ComparisonOp, EqualityOp, LogicalOp, UnaryOp};

/// Root of a query or of any parenthesized sub-query.
///
/// An empty expression (`""` or `()`) is vacuously true.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Expression {
    pub equality: Option<Equality>,
}

/// One precedence level: an operand followed by any number of
/// `(operator, operand)` links.
///
/// Links combine right to left, so `a > b > c` means `a > (b > c)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Chain<O, T> {
    pub first: T,
    pub rest: Vec<(O, T)>,
}

/// `==` / `!=` level, the loosest.
pub type Equality = Chain<EqualityOp, Comparison>;

/// `>` / `<` / `>=` / `<=` level.
pub type Comparison = Chain<ComparisonOp, Logical>;

/// `and` / `or` level, the tightest binary level.
pub type Logical = Chain<LogicalOp, Unary>;

/// Prefix operator chain ending in a primary.
#[derive(Debug, Clone, PartialEq)]
pub enum Unary {
    Prefix(UnaryOp, Box<Unary>),
    Primary(Primary),
}

/// Atom of the grammar.
#[derive(Debug, Clone, PartialEq)]
pub enum Primary {
    /// `true` / `false`
    Boolean(bool),

    /// Numeric literal
    Number(f64),

    /// String literal, quotes retained
    ///
    /// # Example
    /// ```text
    /// "hello"
    /// ```
    String(String),

    /// Regex literal, compiled when parsed
    ///
    /// # Example
    /// ```text
    /// r"catalogue.*"
    /// ```
    Regex(Pattern),

    /// Parenthesized expression
    SubExpression(Box<Expression>),

    /// Field reference or call
    ///
    /// # Examples
    /// ```text
    /// request.path
    /// http.request.path[1]
    /// response.headers["content-type"].contains("json")
    /// rule(description: "x", query: http, assert: true)
    /// ```
    Call(CallExpression),
}

/// A dotted identifier with either a subscript (and optional chained
/// helper) or an argument list.
#[derive(Debug, Clone, PartialEq)]
pub struct CallExpression {
    pub identifier: String,
    pub select: Option<SelectExpression>,
    /// `Some` when written as `identifier(...)`, even with no arguments.
    pub parameters: Option<Vec<Parameter>>,
}

/// Subscript applied to a resolved field, optionally followed by a helper.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectExpression {
    pub subscript: Option<Subscript>,
    pub call: Option<HelperCall>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Subscript {
    /// `[1]`
    Index(usize),
    /// `["user-agent"]`, quotes retained
    Key(String),
}

/// `.name(args)` chained after a subscript.
#[derive(Debug, Clone, PartialEq)]
pub struct HelperCall {
    pub name: String,
    pub parameters: Vec<Parameter>,
}

/// Call argument, optionally tagged (`description: "..."`).
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub tag: Option<String>,
    pub expression: Expression,
}

/// A compiled regex literal. Two patterns are equal when their source
/// literals are equal.
#[derive(Debug, Clone)]
pub struct Pattern {
    literal: String,
    regex: Regex,
}

impl Pattern {
    /// Compiles a quoted pattern literal such as `"carts.*"`.
    ///
    /// Surrounding quotes are removed and `\\` / `\"` are unescaped; every
    /// other escape reaches the regex engine untouched.
    pub fn new(literal: &str) -> Result<Self, regex::Error> {
        let inner = literal
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .unwrap_or(literal);

        let mut source = String::with_capacity(inner.len());
        let mut chars = inner.chars().peekable();
        while let Some(ch) = chars.next() {
            if ch == '\\' {
                match chars.peek() {
                    Some('\\') | Some('"') => {
                        if let Some(next) = chars.next() {
                            source.push(next);
                        }
                        continue;
                    }
                    _ => {}
                }
            }
            source.push(ch);
        }

        Ok(Pattern {
            literal: literal.to_string(),
            regex: Regex::new(&source)?,
        })
    }

    /// The quoted literal as written in the query.
    pub fn literal(&self) -> &str {
        &self.literal
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.literal == other.literal
    }
}

impl<O: Copy, T> Chain<O, T> {
    pub fn single(first: T) -> Self {
        Chain {
            first,
            rest: Vec::new(),
        }
    }

    /// Evaluates every operand left to right, then combines the results
    /// right to left.
    pub fn try_fold_right<'s, V, E>(
        &'s self,
        mut eval: impl FnMut(&'s T) -> Result<V, E>,
        mut combine: impl FnMut(O, V, V) -> V,
    ) -> Result<V, E> {
        let head = eval(&self.first)?;

        let mut tail = Vec::with_capacity(self.rest.len());
        for (op, operand) in &self.rest {
            tail.push((*op, eval(operand)?));
        }

        let mut acc: Option<(O, V)> = None;
        for (op, value) in tail.into_iter().rev() {
            acc = Some(match acc {
                None => (op, value),
                Some((next_op, right)) => (op, combine(next_op, value, right)),
            });
        }

        Ok(match acc {
            None => head,
            Some((op, right)) => combine(op, head, right),
        })
    }
}

// Display prints the canonical query text; parsing it yields an equal tree.

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.equality {
            Some(equality) => write!(f, "{}", equality),
            None => Ok(()),
        }
    }
}

impl<O: fmt::Display, T: fmt::Display> fmt::Display for Chain<O, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.first)?;
        for (op, operand) in &self.rest {
            write!(f, " {} {}", op, operand)?;
        }
        Ok(())
    }
}

impl fmt::Display for Unary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unary::Prefix(op, inner) => write!(f, "{}{}", op, inner),
            Unary::Primary(primary) => write!(f, "{}", primary),
        }
    }
}

impl fmt::Display for Primary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Primary::Boolean(b) => write!(f, "{}", b),
            Primary::Number(n) => write!(f, "{}", n),
            Primary::String(s) => f.write_str(s),
            Primary::Regex(pattern) => write!(f, "r{}", pattern.literal()),
            Primary::SubExpression(expr) => write!(f, "({})", expr),
            Primary::Call(call) => write!(f, "{}", call),
        }
    }
}

impl fmt::Display for CallExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identifier)?;
        if let Some(parameters) = &self.parameters {
            write_parameters(f, parameters)?;
        }
        if let Some(select) = &self.select {
            match &select.subscript {
                Some(Subscript::Index(i)) => write!(f, "[{}]", i)?,
                Some(Subscript::Key(key)) => write!(f, "[{}]", key)?,
                None => {}
            }
            if let Some(call) = &select.call {
                write!(f, ".{}", call.name)?;
                write_parameters(f, &call.parameters)?;
            }
        }
        Ok(())
    }
}

fn write_parameters(f: &mut fmt::Formatter<'_>, parameters: &[Parameter]) -> fmt::Result {
    f.write_str("(")?;
    for (i, param) in parameters.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        if let Some(tag) = &param.tag {
            write!(f, "{}: ", tag)?;
        }
        write!(f, "{}", param.expression)?;
    }
    f.write_str(")")
}
