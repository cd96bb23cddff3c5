use std::borrow::Cow;

use regex::Regex;
use serde_json::{Map, Value as JsonValue};

/// A runtime value flowing between operators.
///
/// Values borrow from the compiled query (string literals, regex literals)
/// and from the record being evaluated (strings, arrays, objects), so
/// evaluating a record never copies it.
///
/// Every operator works through one of the three coercions below. Each is
/// total: variants an operator has no meaning for fall back to that
/// coercion's zero value (`false`, `""`, `0`).
///
/// # Examples
///
/// ```
/// use capql::Value;
///
/// assert!(Value::String("x".into()).as_bool());
/// assert!(!Value::Integer(-1).as_bool());
/// assert_eq!(Value::Float(3.14).as_string(), "3.14");
/// assert_eq!(Value::String("abc".into()).as_float(), 0.0);
/// ```
#[derive(Debug, Clone)]
pub enum Value<'a> {
    /// JSON null
    Null,

    /// JSON boolean, or the verdict of an operator
    Boolean(bool),

    /// Integer number from a record or a helper
    Integer(i64),

    /// Floating-point number, including every numeric literal
    Float(f64),

    /// UTF-8 string
    String(Cow<'a, str>),

    /// Compiled regex literal
    Regex(&'a Regex),

    /// JSON array inside the record
    Array(&'a [JsonValue]),

    /// JSON object inside the record
    Object(&'a Map<String, JsonValue>),
}

impl<'a> Value<'a> {
    /// Views a JSON value without copying it.
    pub fn from_json(json: &'a JsonValue) -> Self {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Boolean(*b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Float(n.as_f64().unwrap_or(0.0)),
            },
            JsonValue::String(s) => Value::String(Cow::Borrowed(s)),
            JsonValue::Array(items) => Value::Array(items),
            JsonValue::Object(map) => Value::Object(map),
        }
    }

    /// Truthiness used by `and`/`or`.
    ///
    /// Empty string, zero, negative numbers and null are false.
    pub fn as_bool(&self) -> bool {
        match self {
            Value::Boolean(b) => *b,
            Value::String(s) => !s.is_empty(),
            Value::Integer(n) => *n > 0,
            Value::Float(n) => *n > 0.0,
            Value::Null => false,
            Value::Regex(_) | Value::Array(_) | Value::Object(_) => false,
        }
    }

    /// Text used by `==`/`!=` and by regex matching.
    pub fn as_string(&self) -> Cow<'_, str> {
        match self {
            Value::String(s) => Cow::Borrowed(s.as_ref()),
            Value::Integer(n) => Cow::Owned(n.to_string()),
            Value::Float(n) => Cow::Owned(format_float(*n)),
            Value::Boolean(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
            Value::Null => Cow::Borrowed("null"),
            Value::Regex(_) | Value::Array(_) | Value::Object(_) => Cow::Borrowed(""),
        }
    }

    /// Number used by `>`, `<`, `>=`, `<=`.
    ///
    /// Strings that do not parse as a float are `0`, and so are numerals too
    /// large for one. Spelled-out `inf` and `nan` keep their meaning.
    pub fn as_float(&self) -> f64 {
        match self {
            Value::Float(n) => *n,
            Value::Integer(n) => *n as f64,
            Value::String(s) => parse_float(s),
            Value::Boolean(true) => 1.0,
            Value::Boolean(false) => 0.0,
            Value::Null => 0.0,
            Value::Regex(_) | Value::Array(_) | Value::Object(_) => 0.0,
        }
    }

    /// Returns the value as a string if it already is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    /// Human-readable type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Regex(_) => "regex",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}

impl PartialEq for Value<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Regex(a), Value::Regex(b)) => a.as_str() == b.as_str(),
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            _ => false,
        }
    }
}

/// Formats a float with six significant digits, switching to exponent form
/// for exponents below -4 or from 6 up (`1e+21`, `1.5e-07`).
pub fn format_float(n: f64) -> String {
    const PRECISION: i32 = 6;

    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }

    // Round to the target precision first; the exponent can shift by one.
    let scientific = format!("{:.*e}", (PRECISION - 1) as usize, n);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some(parts) => parts,
        None => return scientific,
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= PRECISION {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{}{:02}",
            trim_fraction(mantissa),
            sign,
            exponent.unsigned_abs()
        )
    } else {
        let decimals = (PRECISION - 1 - exponent).max(0) as usize;
        trim_fraction(&format!("{:.*}", decimals, n)).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

fn parse_float(text: &str) -> f64 {
    match text.parse::<f64>() {
        Ok(n) if n.is_finite() || n.is_nan() => n,
        Ok(n) if spells_infinity(text) => n,
        Ok(_) | Err(_) => 0.0,
    }
}

fn spells_infinity(text: &str) -> bool {
    text.trim_start_matches(['+', '-'])
        .get(..3)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("inf"))
}
