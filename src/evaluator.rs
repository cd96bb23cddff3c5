use std::borrow::Cow;

use serde_json::Value as JsonValue;

use crate::{
    ast::{
        CallExpression, Comparison, ComparisonOp, Equality, EqualityOp, Expression, Logical,
        LogicalOp, Parameter, Primary, Subscript, Unary, UnaryOp,
    },
    helpers::{HelperFn, Helpers},
    value::Value,
};

/// Errors that can occur during query evaluation.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    /// The record is not valid JSON
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// The query produced something other than a boolean verdict
    #[error("Type error: query evaluated to {found}, expected boolean")]
    Type { found: &'static str },

    /// A helper received an argument of the wrong type
    #[error("Type mismatch: {helper}() argument {argument} must be a string, got {found}")]
    TypeMismatch {
        helper: &'static str,
        argument: usize,
        found: &'static str,
    },

    /// A helper received too few arguments
    #[error("Type mismatch: {helper}() needs at least {expected} arguments, got {found}")]
    Arity {
        helper: &'static str,
        expected: usize,
        found: usize,
    },

    /// Call to a helper that is not registered
    #[error("Name error: unknown helper \"{0}\"")]
    Name(String),
}

/// Evaluates compiled queries against JSON records.
///
/// An evaluator holds no per-record state; one instance can be shared by
/// any number of threads evaluating any number of records.
///
/// # Examples
///
/// ```
/// use capql::{parse, Evaluator};
///
/// let expr = parse(r#"http.request.path[1] == "hello""#).unwrap();
/// let evaluator = Evaluator::new();
///
/// let record = r#"{"http": {"request": {"path": ["a", "hello"]}}}"#;
/// assert!(evaluator.eval(&expr, record).unwrap());
/// assert!(!evaluator.eval(&expr, "{}").unwrap());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    helpers: Helpers,
}

impl Evaluator {
    /// Creates an evaluator with the builtin helpers.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_helpers(helpers: Helpers) -> Self {
        Evaluator { helpers }
    }

    pub fn helpers(&self) -> &Helpers {
        &self.helpers
    }

    /// Decodes `json` and tests it against `expr`.
    pub fn eval(&self, expr: &Expression, json: &str) -> Result<bool, EvalError> {
        let record: JsonValue = serde_json::from_str(json)?;
        self.matches(expr, &record)
    }

    /// Tests an already decoded record against `expr`.
    pub fn matches(&self, expr: &Expression, record: &JsonValue) -> Result<bool, EvalError> {
        match self.evaluate(expr, record)? {
            Value::Boolean(verdict) => Ok(verdict),
            other => Err(EvalError::Type {
                found: other.type_name(),
            }),
        }
    }

    /// Evaluates `expr` to a value without forcing it to a boolean.
    pub fn evaluate<'a>(
        &self,
        expr: &'a Expression,
        record: &'a JsonValue,
    ) -> Result<Value<'a>, EvalError> {
        match &expr.equality {
            Some(equality) => self.eval_equality(equality, record),
            None => Ok(Value::Boolean(true)),
        }
    }

    fn eval_equality<'a>(
        &self,
        equality: &'a Equality,
        record: &'a JsonValue,
    ) -> Result<Value<'a>, EvalError> {
        equality.try_fold_right(
            |comparison| self.eval_comparison(comparison, record),
            |op, left, right| {
                let equal = equals(&left, &right);
                Value::Boolean(match op {
                    EqualityOp::Equal => equal,
                    EqualityOp::NotEqual => !equal,
                })
            },
        )
    }

    fn eval_comparison<'a>(
        &self,
        comparison: &'a Comparison,
        record: &'a JsonValue,
    ) -> Result<Value<'a>, EvalError> {
        comparison.try_fold_right(
            |logical| self.eval_logical(logical, record),
            |op, left, right| {
                let (left, right) = (left.as_float(), right.as_float());
                Value::Boolean(match op {
                    ComparisonOp::GreaterThan => left > right,
                    ComparisonOp::LessThan => left < right,
                    ComparisonOp::GreaterEqual => left >= right,
                    ComparisonOp::LessEqual => left <= right,
                })
            },
        )
    }

    fn eval_logical<'a>(
        &self,
        logical: &'a Logical,
        record: &'a JsonValue,
    ) -> Result<Value<'a>, EvalError> {
        logical.try_fold_right(
            |unary| self.eval_unary(unary, record),
            |op, left, right| {
                Value::Boolean(match op {
                    LogicalOp::And => left.as_bool() && right.as_bool(),
                    LogicalOp::Or => left.as_bool() || right.as_bool(),
                })
            },
        )
    }

    /// `!` flips booleans and `-` negates numbers; any other operand passes
    /// through unchanged.
    fn eval_unary<'a>(
        &self,
        unary: &'a Unary,
        record: &'a JsonValue,
    ) -> Result<Value<'a>, EvalError> {
        match unary {
            Unary::Primary(primary) => self.eval_primary(primary, record),
            Unary::Prefix(op, inner) => {
                let value = self.eval_unary(inner, record)?;
                Ok(match (op, value) {
                    (UnaryOp::Not, Value::Boolean(b)) => Value::Boolean(!b),
                    (UnaryOp::Negate, Value::Float(n)) => Value::Float(-n),
                    (UnaryOp::Negate, Value::Integer(n)) => match n.checked_neg() {
                        Some(negated) => Value::Integer(negated),
                        None => Value::Float(-(n as f64)),
                    },
                    (_, other) => other,
                })
            }
        }
    }

    fn eval_primary<'a>(
        &self,
        primary: &'a Primary,
        record: &'a JsonValue,
    ) -> Result<Value<'a>, EvalError> {
        match primary {
            Primary::Boolean(b) => Ok(Value::Boolean(*b)),
            Primary::Number(n) => Ok(Value::Float(*n)),
            Primary::String(s) => Ok(Value::String(Cow::Borrowed(unquote(s)))),
            Primary::Regex(pattern) => Ok(Value::Regex(pattern.regex())),
            Primary::SubExpression(expr) => self.evaluate(expr, record),
            Primary::Call(call) => self.eval_call(call, record),
        }
    }

    fn eval_call<'a>(
        &self,
        call: &'a CallExpression,
        record: &'a JsonValue,
    ) -> Result<Value<'a>, EvalError> {
        // name(args): plain helper invocation
        if let Some(parameters) = &call.parameters {
            let helper = self.lookup(&call.identifier)?;
            let args = self.eval_parameters(Vec::new(), parameters, record)?;
            return helper(&args);
        }

        let resolved = resolve_path(record, &call.identifier);
        let mut value = resolved.map_or(Value::Boolean(false), Value::from_json);

        let Some(select) = &call.select else {
            return Ok(value);
        };

        if let (Some(json), Some(subscript)) = (resolved, &select.subscript) {
            value = apply_subscript(json, subscript).map_or(Value::Boolean(false), Value::from_json);
        }

        if let Some(helper_call) = &select.call {
            let helper = self.lookup(&helper_call.name)?;
            let args = self.eval_parameters(vec![value], &helper_call.parameters, record)?;
            value = helper(&args)?;
        }

        Ok(value)
    }

    fn eval_parameters<'a>(
        &self,
        mut args: Vec<Value<'a>>,
        parameters: &'a [Parameter],
        record: &'a JsonValue,
    ) -> Result<Vec<Value<'a>>, EvalError> {
        args.reserve(parameters.len());
        for param in parameters {
            args.push(self.evaluate(&param.expression, record)?);
        }
        Ok(args)
    }

    fn lookup(&self, name: &str) -> Result<HelperFn, EvalError> {
        self.helpers
            .get(name)
            .ok_or_else(|| EvalError::Name(name.to_string()))
    }
}

/// `==` semantics: a regex on either side (left checked first) matches the
/// other side's text; otherwise both sides compare as text.
fn equals(left: &Value<'_>, right: &Value<'_>) -> bool {
    match (left, right) {
        (Value::Regex(pattern), other) => pattern.is_match(&other.as_string()),
        (other, Value::Regex(pattern)) => pattern.is_match(&other.as_string()),
        _ => left.as_string() == right.as_string(),
    }
}

/// Strips the surrounding quote characters of a string literal.
pub(crate) fn unquote(literal: &str) -> &str {
    literal.trim_matches('"')
}

/// Looks up a dotted path, walking object keys from the record root.
pub fn resolve_path<'a>(record: &'a JsonValue, path: &str) -> Option<&'a JsonValue> {
    path.split('.')
        .try_fold(record, |current, segment| current.as_object()?.get(segment))
}

fn apply_subscript<'a>(json: &'a JsonValue, subscript: &Subscript) -> Option<&'a JsonValue> {
    match subscript {
        Subscript::Index(index) => json.as_array()?.get(*index),
        Subscript::Key(key) => json.as_object()?.get(unquote(key)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_nested_paths() {
        let record = json!({"a": {"b": {"c": 1}}, "x": [1]});
        assert_eq!(resolve_path(&record, "a.b.c"), Some(&json!(1)));
        assert_eq!(resolve_path(&record, "a.z"), None);
        assert_eq!(resolve_path(&record, "x.0"), None);
    }

    #[test]
    fn regex_wins_on_the_left() {
        let re = regex::Regex::new("^a").unwrap();
        let other = regex::Regex::new("b").unwrap();
        assert!(equals(&Value::Regex(&re), &Value::String("abc".into())));
        assert!(equals(&Value::String("abc".into()), &Value::Regex(&re)));
        // Both regexes: the left one is matched against "" (a regex has no text).
        assert!(!equals(&Value::Regex(&re), &Value::Regex(&other)));
    }
}
