// tests/cli_tests.rs

use std::io::{Cursor, Write};

use capql::cli::{
    execute_check, execute_filter, execute_rules, CliError, FilterOptions, RulesSummary,
    SessionOptions,
};
use capql::Session;

const INPUT: &str = r#"{"service": "carts", "response": {"elapsedTime": 2}}

{"service": "catalogue", "response": {"elapsedTime": 0}}
not json
{"service": "carts-v2", "response": {"elapsedTime": 0.2}}
"#;

fn lines(out: Vec<u8>) -> Vec<String> {
    String::from_utf8(out)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn test_check() {
    let session = Session::new();
    assert!(execute_check(&session, r#"service == r"carts""#).is_ok());
    assert!(matches!(
        execute_check(&session, "service =="),
        Err(CliError::Parse(_))
    ));
}

#[test]
fn test_filter_skips_blank_and_invalid_lines() {
    let mut session = Session::new();
    let options = FilterOptions {
        query: r#"service == r"^carts""#.to_string(),
        metadata: false,
    };

    let mut out = Vec::new();
    let stats = execute_filter(&mut session, &options, Cursor::new(INPUT), &mut out).unwrap();
    assert_eq!(stats.total, 4);
    assert_eq!(stats.number_of_written, 2);

    let written = lines(out);
    assert_eq!(written.len(), 2);
    assert!(written[1].contains("carts-v2"));
}

#[test]
fn test_filter_with_metadata() {
    let mut session = Session::new();
    let options = FilterOptions {
        query: "response.elapsedTime > 1".to_string(),
        metadata: true,
    };

    let mut out = Vec::new();
    execute_filter(&mut session, &options, Cursor::new(INPUT), &mut out).unwrap();
    assert_eq!(
        lines(out).last().map(String::as_str),
        Some(r#"/metadata {"current":4,"total":4,"numberOfWritten":1}"#)
    );
}

#[test]
fn test_rules_report() {
    let session = Session::new();
    let rules = r#"rule(description: "fast carts", query: (service == r"^carts"), assert: response.elapsedTime < 1)"#;

    let mut out = Vec::new();
    let summary = execute_rules(&session, rules, Cursor::new(INPUT), &mut out).unwrap();
    assert_eq!(
        summary,
        RulesSummary {
            records: 3,
            passed: 1,
            failed: 1,
            skipped: 1,
        }
    );

    let reports: Vec<serde_json::Value> = lines(out)
        .iter()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(reports.len(), 3);
    assert_eq!(
        reports[0],
        serde_json::json!({
            "record": 0,
            "outcomes": [{"description": "fast carts", "verdict": "failed"}]
        })
    );
    assert_eq!(reports[2]["record"], 3);
}

#[test]
fn test_rules_use_session_macros() {
    let options = SessionOptions {
        config: None,
        macros: vec![r#"carts~(service == r"^carts")"#.to_string()],
    };
    let session = options.build().unwrap();
    let rules = r#"rule(description: "d", query: carts, assert: true)"#;

    let mut out: Vec<u8> = Vec::new();
    let summary = execute_rules(&session, rules, Cursor::new(INPUT), &mut out).unwrap();
    assert_eq!(summary.passed, 2);
    assert_eq!(summary.skipped, 1);
}

#[test]
fn test_session_options_with_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[macros]\nslow = 'response.elapsedTime >= 1'").unwrap();

    let options = SessionOptions {
        config: Some(file.path().to_path_buf()),
        macros: vec!["fast~!slow".to_string()],
    };
    let mut session = options.build().unwrap();

    let filter = FilterOptions {
        query: "slow".to_string(),
        metadata: false,
    };
    let mut out = Vec::new();
    let stats = execute_filter(&mut session, &filter, Cursor::new(INPUT), &mut out).unwrap();
    assert_eq!(stats.number_of_written, 1);
}

#[test]
fn test_session_options_reject_bad_macro() {
    let options = SessionOptions {
        config: None,
        macros: vec!["missing tilde".to_string()],
    };
    assert!(matches!(options.build(), Err(CliError::Macro(_))));
}
