//! Named helper functions callable from queries.
//!
//! A helper is invoked either directly, `contains(a, "b")`, or chained off a
//! subscripted field, `headers["content-type"].contains("json")`. In the
//! chained form the field value is passed as the first argument.

use std::{collections::HashMap, fmt, sync::OnceLock};

use chrono::NaiveDateTime;
use regex::Regex;

use crate::{evaluator::EvalError, value::Value};

/// Signature every helper implements.
pub type HelperFn = for<'a> fn(&[Value<'a>]) -> Result<Value<'a>, EvalError>;

/// Layout accepted by `datetime`, e.g. `01/02/2024 3:04:05 PM`.
pub const DATETIME_LAYOUT: &str = "%m/%d/%Y %-I:%M:%S %p";

/// chrono's parser tolerates unpadded fields and lowercase meridiems, so the
/// exact shape of [`DATETIME_LAYOUT`] is checked first.
fn datetime_shape() -> Option<&'static Regex> {
    static SHAPE: OnceLock<Option<Regex>> = OnceLock::new();
    SHAPE
        .get_or_init(|| Regex::new(r"^\d{2}/\d{2}/\d{4} \d{1,2}:\d{2}:\d{2} [AP]M$").ok())
        .as_ref()
}

/// Table of helpers available to an [`Evaluator`](crate::Evaluator).
///
/// ```
/// use capql::{Helpers, Value};
///
/// let helpers = Helpers::builtin();
/// let contains = helpers.get("contains").unwrap();
/// let result = contains(&[Value::String("abc".into()), Value::String("b".into())]).unwrap();
/// assert_eq!(result, Value::Boolean(true));
/// ```
#[derive(Clone)]
pub struct Helpers {
    table: HashMap<String, HelperFn>,
}

impl Helpers {
    /// A table with no helpers at all.
    pub fn empty() -> Self {
        Helpers {
            table: HashMap::new(),
        }
    }

    /// `startsWith`, `endsWith`, `contains` and `datetime`.
    pub fn builtin() -> Self {
        let mut helpers = Self::empty();
        helpers.register("startsWith", starts_with);
        helpers.register("endsWith", ends_with);
        helpers.register("contains", contains);
        helpers.register("datetime", datetime);
        helpers
    }

    /// Adds or replaces a helper, returning the one it replaced.
    pub fn register(&mut self, name: impl Into<String>, helper: HelperFn) -> Option<HelperFn> {
        self.table.insert(name.into(), helper)
    }

    pub fn get(&self, name: &str) -> Option<HelperFn> {
        self.table.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.table.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for Helpers {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Debug for Helpers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

/// Fetches argument `index` (0-based), which must already be a string.
pub fn string_arg<'v>(
    helper: &'static str,
    args: &'v [Value<'_>],
    index: usize,
) -> Result<&'v str, EvalError> {
    let value = args.get(index).ok_or(EvalError::Arity {
        helper,
        expected: index + 1,
        found: args.len(),
    })?;

    value.as_str().ok_or_else(|| EvalError::TypeMismatch {
        helper,
        argument: index + 1,
        found: value.type_name(),
    })
}

fn starts_with<'a>(args: &[Value<'a>]) -> Result<Value<'a>, EvalError> {
    let subject = string_arg("startsWith", args, 0)?;
    let prefix = string_arg("startsWith", args, 1)?;
    Ok(Value::Boolean(subject.starts_with(prefix)))
}

fn ends_with<'a>(args: &[Value<'a>]) -> Result<Value<'a>, EvalError> {
    let subject = string_arg("endsWith", args, 0)?;
    let suffix = string_arg("endsWith", args, 1)?;
    Ok(Value::Boolean(subject.ends_with(suffix)))
}

fn contains<'a>(args: &[Value<'a>]) -> Result<Value<'a>, EvalError> {
    let subject = string_arg("contains", args, 0)?;
    let needle = string_arg("contains", args, 1)?;
    Ok(Value::Boolean(subject.contains(needle)))
}

/// Parses the second argument as a UTC timestamp and returns Unix seconds,
/// or `false` when it does not match [`DATETIME_LAYOUT`]. The first argument
/// is never read.
fn datetime<'a>(args: &[Value<'a>]) -> Result<Value<'a>, EvalError> {
    let text = string_arg("datetime", args, 1)?;
    if !datetime_shape().is_some_and(|shape| shape.is_match(text)) {
        return Ok(Value::Boolean(false));
    }
    Ok(match NaiveDateTime::parse_from_str(text, DATETIME_LAYOUT) {
        Ok(parsed) => Value::Integer(parsed.and_utc().timestamp()),
        Err(_) => Value::Boolean(false),
    })
}
