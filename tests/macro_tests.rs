// tests/macro_tests.rs

use std::borrow::Cow;

use capql::{parse, Evaluator, MacroError, Macros};

fn macros(definitions: &[(&str, &str)]) -> Macros {
    let mut macros = Macros::new();
    for (name, expansion) in definitions {
        macros.define(*name, *expansion).unwrap();
    }
    macros
}

// ============================================================================
// Expansion
// ============================================================================

#[test]
fn test_whole_tokens_only() {
    let m = macros(&[("http", r#"proto.name == "http""#)]);
    assert_eq!(
        m.expand("http and x"),
        r#"proto.name == "http" and x"#
    );
    assert_eq!(m.expand("http.request == 1"), "http.request == 1");
    assert_eq!(m.expand("xhttp or http_2"), "xhttp or http_2");
    assert_eq!(m.expand("(http)"), r#"(proto.name == "http")"#);
}

#[test]
fn test_dotted_macro_names() {
    let m = macros(&[("req.ua", r#"request.headers["user-agent"]"#)]);
    assert_eq!(
        m.expand(r#"req.ua == "curl""#),
        r#"request.headers["user-agent"] == "curl""#
    );
    assert_eq!(m.expand("req.ua.x"), "req.ua.x");
}

#[test]
fn test_string_literals_are_untouched() {
    let m = macros(&[("http", "proto")]);
    assert_eq!(m.expand(r#""http" == http"#), r#""http" == proto"#);
    assert_eq!(
        m.expand(r#""say \"http\"" == http"#),
        r#""say \"http\"" == proto"#
    );
}

#[test]
fn test_regex_literals_are_untouched() {
    let m = macros(&[("r", "replaced"), ("cat", "dog")]);
    assert_eq!(m.expand(r#"a == r"cat""#), r#"a == r"cat""#);
    assert_eq!(m.expand("r and cat"), "replaced and dog");
}

#[test]
fn test_expansion_is_a_single_pass() {
    let m = macros(&[("a", "b"), ("b", "c")]);
    assert_eq!(m.expand("a"), "b");
    assert_eq!(m.expand("a == b"), "b == c");
}

#[test]
fn test_unknown_names_are_left_alone() {
    let m = macros(&[("http", "proto")]);
    assert_eq!(m.expand("grpc and amqp"), "grpc and amqp");
}

#[test]
fn test_unchanged_query_is_borrowed() {
    let m = macros(&[("http", "proto")]);
    assert!(matches!(m.expand("tcp and udp"), Cow::Borrowed(_)));
    assert!(matches!(Macros::new().expand("http"), Cow::Borrowed(_)));
    assert!(matches!(m.expand("http"), Cow::Owned(_)));
}

#[test]
fn test_redefinition_overwrites() {
    let mut m = macros(&[("http", "one")]);
    m.define("http", "two").unwrap();
    assert_eq!(m.len(), 1);
    assert_eq!(m.get("http"), Some("two"));
    assert_eq!(m.expand("http"), "two");
}

// ============================================================================
// Definitions
// ============================================================================

#[test]
fn test_define_from_payload() {
    let mut m = Macros::new();
    m.define_from(r#"http~proto.name == "http""#).unwrap();
    assert_eq!(m.get("http"), Some(r#"proto.name == "http""#));

    m.define_from(" probe ~ request.headers[\"user-agent\"].startsWith(\"kube\") ")
        .unwrap();
    assert_eq!(
        m.get("probe"),
        Some(r#"request.headers["user-agent"].startsWith("kube")"#)
    );
}

#[test]
fn test_malformed_definitions() {
    let mut m = Macros::new();
    assert!(matches!(
        m.define_from("no separator"),
        Err(MacroError::MalformedDefinition(_))
    ));
    assert!(matches!(
        m.define_from("two words~x"),
        Err(MacroError::InvalidName(_))
    ));
    assert!(matches!(
        m.define_from("~x"),
        Err(MacroError::InvalidName(_))
    ));
    assert!(m.is_empty());
}

#[test]
fn test_collect_from_pairs() {
    let m: Macros = vec![("http".to_string(), "proto".to_string())]
        .into_iter()
        .collect();
    assert_eq!(m.expand("!http"), "!proto");
}

// ============================================================================
// Expanded queries
// ============================================================================

#[test]
fn test_expanded_query_evaluates() {
    let m = macros(&[
        ("http", r#"(proto.name == "http")"#),
        ("probe", r#"request.headers["user-agent"].startsWith("kube-probe")"#),
    ]);
    let expr = parse(&m.expand("http and !probe")).unwrap();
    let evaluator = Evaluator::new();

    let browser = r#"{"proto": {"name": "http"}, "request": {"headers": {"user-agent": "Mozilla"}}}"#;
    let probe = r#"{"proto": {"name": "http"}, "request": {"headers": {"user-agent": "kube-probe/1.2"}}}"#;
    assert!(evaluator.eval(&expr, browser).unwrap());
    assert!(!evaluator.eval(&expr, probe).unwrap());
}
