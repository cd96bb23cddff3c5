//! Assertion rules written with the tagged call syntax.
//!
//! ```text
//! rule(
//!     description: "Latency test",
//!     query: http and (service == r"carts.*"),
//!     assert: response.elapsedTime >= 1
//! )
//! and
//! rule(description: "JSON body", query: http, assert: response.body.ok)
//! ```
//!
//! The grammar accepts any call with any tags; this module is where the
//! `rule` name and its `description`/`query`/`assert` tags get meaning. For
//! every record a rule is skipped when `query` is false, otherwise it passes
//! or fails on `assert`.

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::{
    ast::{CallExpression, Expression, LogicalOp, Primary, Unary},
    evaluator::{unquote, EvalError, Evaluator},
    parser::{parse, ParseError},
};

/// Name of the call that declares a rule.
pub const RULE_CALL: &str = "rule";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuleError {
    #[error("Syntax error: {0}")]
    Syntax(#[from] ParseError),

    #[error("Not a rule set: {0}")]
    NotARuleSet(String),

    #[error("Rule {index}: missing \"{tag}\" argument")]
    MissingTag { index: usize, tag: &'static str },

    #[error("Rule {index}: duplicate \"{tag}\" argument")]
    DuplicateTag { index: usize, tag: String },

    #[error("Rule {index}: unexpected argument \"{tag}\"")]
    UnknownTag { index: usize, tag: String },

    #[error("Rule {index}: every argument needs a tag")]
    Untagged { index: usize },

    #[error("Rule {index}: description must be a string literal")]
    Description { index: usize },
}

/// One `rule(...)` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub description: String,
    pub query: Expression,
    pub assert: Expression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// `query` did not select the record
    Skipped,
    Passed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleOutcome<'r> {
    pub description: &'r str,
    pub verdict: Verdict,
}

/// Rules joined with `and` at the top level of a query.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Parses rule text (macros should already be expanded).
    pub fn parse(text: &str) -> Result<Self, RuleError> {
        Self::from_expression(&parse(text)?)
    }

    pub fn from_expression(expr: &Expression) -> Result<Self, RuleError> {
        let Some(equality) = &expr.equality else {
            return Ok(RuleSet::default());
        };

        if !equality.rest.is_empty() || !equality.first.rest.is_empty() {
            return Err(RuleError::NotARuleSet(
                "rules can only be joined with \"and\"".to_string(),
            ));
        }
        let logical = &equality.first.first;

        if let Some((op, _)) = logical.rest.iter().find(|(op, _)| *op != LogicalOp::And) {
            return Err(RuleError::NotARuleSet(format!(
                "rules can only be joined with \"and\", found \"{}\"",
                op
            )));
        }

        let operands = std::iter::once(&logical.first).chain(logical.rest.iter().map(|(_, u)| u));
        let rules = operands
            .enumerate()
            .map(|(i, unary)| match unary {
                Unary::Primary(Primary::Call(call))
                    if call.identifier == RULE_CALL && call.parameters.is_some() =>
                {
                    Rule::from_call(i + 1, call)
                }
                other => Err(RuleError::NotARuleSet(format!(
                    "expected {}(...), found {}",
                    RULE_CALL, other
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RuleSet { rules })
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Runs every rule against one record.
    pub fn check<'r>(
        &'r self,
        evaluator: &Evaluator,
        record: &JsonValue,
    ) -> Result<Vec<RuleOutcome<'r>>, EvalError> {
        self.rules
            .iter()
            .map(|rule| {
                Ok(RuleOutcome {
                    description: &rule.description,
                    verdict: rule.check(evaluator, record)?,
                })
            })
            .collect()
    }
}

impl Rule {
    /// `index` is 1-based and only used in error messages.
    pub fn from_call(index: usize, call: &CallExpression) -> Result<Self, RuleError> {
        let mut description = None;
        let mut query = None;
        let mut assert = None;

        for param in call.parameters.iter().flatten() {
            let tag = param.tag.as_deref().ok_or(RuleError::Untagged { index })?;
            let slot = match tag {
                "description" => {
                    let text = string_literal(&param.expression)
                        .ok_or(RuleError::Description { index })?;
                    if description.replace(text.to_string()).is_some() {
                        return Err(RuleError::DuplicateTag {
                            index,
                            tag: tag.to_string(),
                        });
                    }
                    continue;
                }
                "query" => &mut query,
                "assert" => &mut assert,
                _ => {
                    return Err(RuleError::UnknownTag {
                        index,
                        tag: tag.to_string(),
                    });
                }
            };
            if slot.replace(param.expression.clone()).is_some() {
                return Err(RuleError::DuplicateTag {
                    index,
                    tag: tag.to_string(),
                });
            }
        }

        Ok(Rule {
            description: description.ok_or(RuleError::MissingTag {
                index,
                tag: "description",
            })?,
            query: query.ok_or(RuleError::MissingTag { index, tag: "query" })?,
            assert: assert.ok_or(RuleError::MissingTag {
                index,
                tag: "assert",
            })?,
        })
    }

    pub fn check(&self, evaluator: &Evaluator, record: &JsonValue) -> Result<Verdict, EvalError> {
        if !evaluator.matches(&self.query, record)? {
            return Ok(Verdict::Skipped);
        }
        Ok(if evaluator.matches(&self.assert, record)? {
            Verdict::Passed
        } else {
            Verdict::Failed
        })
    }
}

/// The text of an expression that is nothing but a string literal.
fn string_literal(expr: &Expression) -> Option<&str> {
    let equality = expr.equality.as_ref()?;
    let comparison = &equality.first;
    let logical = &comparison.first;
    if !equality.rest.is_empty() || !comparison.rest.is_empty() || !logical.rest.is_empty() {
        return None;
    }
    match &logical.first {
        Unary::Primary(Primary::String(s)) => Some(unquote(s)),
        _ => None,
    }
}
