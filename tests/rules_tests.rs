// tests/rules_tests.rs

use capql::{EvalError, Evaluator, RuleError, RuleSet, Verdict};
use serde_json::{json, Value};

const RULES: &str = r#"
rule(
    description: "Carts latency",
    query: (service == r"carts.*"),
    assert: response.elapsedTime >= 1
)
and
rule(
    description: "JSON body has a name",
    query: response.headers["content-type"].contains("json"),
    assert: response.body.name == "Holy"
)
"#;

fn record(service: &str, elapsed: f64, content_type: &str, name: Option<&str>) -> Value {
    let mut body = json!({});
    if let Some(name) = name {
        body["name"] = json!(name);
    }
    json!({
        "service": service,
        "response": {
            "elapsedTime": elapsed,
            "headers": {"content-type": content_type},
            "body": body,
        }
    })
}

fn verdicts(rules: &RuleSet, record: &Value) -> Vec<Verdict> {
    rules
        .check(&Evaluator::new(), record)
        .unwrap()
        .into_iter()
        .map(|outcome| outcome.verdict)
        .collect()
}

// ============================================================================
// Parsing rule sets
// ============================================================================

#[test]
fn test_parse_rule_set() {
    let rules = RuleSet::parse(RULES).unwrap();
    assert_eq!(rules.len(), 2);
    assert_eq!(rules.rules()[0].description, "Carts latency");
    assert_eq!(rules.rules()[1].description, "JSON body has a name");
    assert_eq!(
        rules.rules()[0].assert.to_string(),
        "response.elapsedTime >= 1"
    );
}

#[test]
fn test_tags_in_any_order() {
    let rules =
        RuleSet::parse(r#"rule(assert: true, query: http, description: "reordered")"#).unwrap();
    assert_eq!(rules.rules()[0].description, "reordered");
    assert_eq!(rules.rules()[0].query.to_string(), "http");
}

#[test]
fn test_empty_rule_text() {
    let rules = RuleSet::parse("").unwrap();
    assert!(rules.is_empty());
}

#[test]
fn test_rules_must_be_joined_with_and() {
    let err = RuleSet::parse(
        r#"rule(description: "a", query: x, assert: y) or rule(description: "b", query: x, assert: y)"#,
    )
    .unwrap_err();
    assert!(matches!(err, RuleError::NotARuleSet(_)));
}

#[test]
fn test_only_rule_calls_allowed() {
    assert!(matches!(
        RuleSet::parse("http and x"),
        Err(RuleError::NotARuleSet(_))
    ));
    assert!(matches!(
        RuleSet::parse(r#"check(description: "a", query: x, assert: y)"#),
        Err(RuleError::NotARuleSet(_))
    ));
    assert!(matches!(
        RuleSet::parse(r#"rule(description: "a", query: x, assert: y) == true"#),
        Err(RuleError::NotARuleSet(_))
    ));
}

#[test]
fn test_missing_tag() {
    let err = RuleSet::parse(r#"rule(description: "a", query: x)"#).unwrap_err();
    assert_eq!(
        err,
        RuleError::MissingTag {
            index: 1,
            tag: "assert"
        }
    );
}

#[test]
fn test_errors_name_the_rule() {
    let err = RuleSet::parse(
        r#"rule(description: "a", query: x, assert: y) and rule(description: "b", query: x, assert: y, extra: 1)"#,
    )
    .unwrap_err();
    assert_eq!(
        err,
        RuleError::UnknownTag {
            index: 2,
            tag: "extra".to_string()
        }
    );
    assert_eq!(err.to_string(), "Rule 2: unexpected argument \"extra\"");
}

#[test]
fn test_duplicate_tag() {
    let err = RuleSet::parse(r#"rule(description: "a", query: x, query: y, assert: z)"#)
        .unwrap_err();
    assert!(matches!(err, RuleError::DuplicateTag { index: 1, .. }));
}

#[test]
fn test_untagged_argument() {
    let err = RuleSet::parse(r#"rule("a", query: x, assert: y)"#).unwrap_err();
    assert_eq!(err, RuleError::Untagged { index: 1 });
}

#[test]
fn test_description_must_be_a_literal() {
    let err = RuleSet::parse(r#"rule(description: name, query: x, assert: y)"#).unwrap_err();
    assert_eq!(err, RuleError::Description { index: 1 });
}

#[test]
fn test_syntax_errors_pass_through() {
    assert!(matches!(
        RuleSet::parse("rule(description: "),
        Err(RuleError::Syntax(_))
    ));
}

// ============================================================================
// Checking records
// ============================================================================

#[test]
fn test_passing_record() {
    let rules = RuleSet::parse(RULES).unwrap();
    let r = record("carts-v1", 2.0, "application/json", Some("Holy"));
    assert_eq!(verdicts(&rules, &r), vec![Verdict::Passed, Verdict::Passed]);
}

#[test]
fn test_skipped_record() {
    let rules = RuleSet::parse(RULES).unwrap();
    let r = record("catalogue", 0.0, "text/html", None);
    assert_eq!(verdicts(&rules, &r), vec![Verdict::Skipped, Verdict::Skipped]);
}

#[test]
fn test_failing_record() {
    let rules = RuleSet::parse(RULES).unwrap();
    let r = record("carts", 0.5, "application/json", Some("Other"));
    assert_eq!(verdicts(&rules, &r), vec![Verdict::Failed, Verdict::Failed]);
}

#[test]
fn test_outcomes_carry_descriptions() {
    let rules = RuleSet::parse(RULES).unwrap();
    let r = record("carts", 5.0, "text/plain", None);
    let outcomes = rules.check(&Evaluator::new(), &r).unwrap();
    assert_eq!(outcomes[0].description, "Carts latency");
    assert_eq!(outcomes[0].verdict, Verdict::Passed);
    assert_eq!(outcomes[1].verdict, Verdict::Skipped);
    assert_eq!(
        serde_json::to_value(&outcomes[1]).unwrap(),
        json!({"description": "JSON body has a name", "verdict": "skipped"})
    );
}

#[test]
fn test_evaluation_errors_propagate() {
    let rules = RuleSet::parse(RULES).unwrap();
    // no content-type header: contains() receives false
    let r = json!({"service": "carts", "response": {"elapsedTime": 1, "headers": {}}});
    let err = rules.check(&Evaluator::new(), &r).unwrap_err();
    assert!(matches!(err, EvalError::TypeMismatch { .. }));
}

#[test]
fn test_rule_call_is_not_a_helper() {
    let expr = capql::parse(r#"rule(description: "a", query: true, assert: true)"#).unwrap();
    let err = Evaluator::new().eval(&expr, "{}").unwrap_err();
    assert!(matches!(err, EvalError::Name(ref name) if name == "rule"));
}
