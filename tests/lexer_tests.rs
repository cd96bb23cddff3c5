// tests/lexer_tests.rs

use capql::ast::Token;
use capql::lexer::{Lexer, Position};

fn tokens(input: &str) -> Vec<Token> {
    Lexer::new(input)
        .tokenize()
        .unwrap()
        .into_iter()
        .map(|spanned| spanned.token)
        .collect()
}

fn ident(name: &str) -> Token {
    Token::Identifier(name.to_string())
}

fn string(raw: &str) -> Token {
    Token::String(raw.to_string())
}

// ============================================================================
// Literals
// ============================================================================

#[test]
fn test_numbers() {
    assert_eq!(
        tokens("5 3.14 1e3 2.5E-2"),
        vec![
            Token::Number(5.0),
            Token::Number(3.14),
            Token::Number(1000.0),
            Token::Number(0.025),
            Token::Eof,
        ]
    );
}

#[test]
fn test_minus_is_never_part_of_a_number() {
    assert_eq!(
        tokens("-1"),
        vec![Token::Minus, Token::Number(1.0), Token::Eof]
    );
}

#[test]
fn test_strings_keep_quotes_and_escapes() {
    assert_eq!(
        tokens(r#""hello" "say \"hi\"""#),
        vec![string("\"hello\""), string(r#""say \"hi\"""#), Token::Eof]
    );
}

#[test]
fn test_regex_literal() {
    assert_eq!(
        tokens(r#"r"catalogue.*""#),
        vec![Token::Regex("\"catalogue.*\"".to_string()), Token::Eof]
    );
}

#[test]
fn test_r_alone_is_an_identifier() {
    assert_eq!(
        tokens(r#"r == request"#),
        vec![ident("r"), Token::EqEq, ident("request"), Token::Eof]
    );
}

// ============================================================================
// Identifiers and keywords
// ============================================================================

#[test]
fn test_dotted_identifier_is_one_token() {
    assert_eq!(
        tokens("request.headers.x"),
        vec![ident("request.headers.x"), Token::Eof]
    );
}

#[test]
fn test_keywords_need_whole_words() {
    assert_eq!(
        tokens("android and order or truely"),
        vec![
            ident("android"),
            Token::And,
            ident("order"),
            Token::Or,
            ident("truely"),
            Token::Eof,
        ]
    );
}

#[test]
fn test_tagged_arguments() {
    assert_eq!(
        tokens("rule(description: \"d\", query: http)"),
        vec![
            ident("rule"),
            Token::LParen,
            ident("description"),
            Token::Colon,
            string("\"d\""),
            Token::Comma,
            ident("query"),
            Token::Colon,
            ident("http"),
            Token::RParen,
            Token::Eof,
        ]
    );
}

// ============================================================================
// Operators
// ============================================================================

#[test]
fn test_operators() {
    assert_eq!(
        tokens("== != > < >= <= ! -"),
        vec![
            Token::EqEq,
            Token::NotEq,
            Token::Gt,
            Token::Lt,
            Token::GtEq,
            Token::LtEq,
            Token::Exclamation,
            Token::Minus,
            Token::Eof,
        ]
    );
}

#[test]
fn test_subscript_then_helper() {
    assert_eq!(
        tokens("path[1].endsWith(\"x\")"),
        vec![
            ident("path"),
            Token::LBracket,
            Token::Number(1.0),
            Token::RBracket,
            Token::Dot,
            ident("endsWith"),
            Token::LParen,
            string("\"x\""),
            Token::RParen,
            Token::Eof,
        ]
    );
}

// ============================================================================
// Positions and errors
// ============================================================================

#[test]
fn test_positions_track_lines() {
    let spanned = Lexer::new("http\n  and x").tokenize().unwrap();
    assert_eq!(
        spanned[1].position,
        Position {
            offset: 7,
            line: 2,
            column: 3
        }
    );
}

#[test]
fn test_single_equals_is_an_error() {
    let err = Lexer::new("a = b").tokenize().unwrap_err();
    assert_eq!(err.position.column, 3);
    assert!(err.message.contains("=="));
}

#[test]
fn test_unterminated_string() {
    let err = Lexer::new("a == \"open").tokenize().unwrap_err();
    assert_eq!(err.position.column, 6);
    assert_eq!(err.to_string(), "1:6: unterminated string literal");
}

#[test]
fn test_unexpected_character() {
    let err = Lexer::new("a @ b").tokenize().unwrap_err();
    assert_eq!(err.to_string(), "1:3: unexpected character '@'");
}

#[test]
fn test_number_out_of_range() {
    let err = Lexer::new("a == 1e999").tokenize().unwrap_err();
    assert_eq!(err.to_string(), "1:6: number out of range \"1e999\"");
    assert!(Lexer::new("1e308").tokenize().is_ok());
}
