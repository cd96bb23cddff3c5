use std::fmt;

use crate::ast::Token;

/// Location of a token in the query text. Lines and columns start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A token together with where it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{position}: {message}")]
pub struct LexError {
    pub position: Position,
    pub message: String,
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    /// Lexes the whole input. The last token is always [`Token::Eof`].
    pub fn tokenize(mut self) -> Result<Vec<Spanned>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let spanned = self.next_token()?;
            let done = spanned.token == Token::Eof;
            tokens.push(spanned);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        if let Some(ch) = self.current_char() {
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            self.position += 1;
        }
    }

    fn here(&self) -> Position {
        Position {
            offset: self.position,
            line: self.line,
            column: self.column,
        }
    }

    fn error(&self, position: Position, message: impl Into<String>) -> LexError {
        LexError {
            position,
            message: message.into(),
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn is_identifier_start(ch: char) -> bool {
        ch.is_ascii_alphabetic() || ch == '_'
    }

    fn is_identifier_char(ch: char) -> bool {
        ch.is_ascii_alphanumeric() || ch == '_'
    }

    /// Reads `segment(.segment)*`. A dot only continues the identifier when
    /// another segment follows it directly.
    fn read_identifier(&mut self) -> String {
        let mut result = String::new();
        loop {
            while let Some(ch) = self.current_char() {
                if Self::is_identifier_char(ch) {
                    result.push(ch);
                    self.advance();
                } else {
                    break;
                }
            }

            if self.current_char() == Some('.')
                && self.peek_char(1).is_some_and(Self::is_identifier_start)
            {
                result.push('.');
                self.advance();
            } else {
                return result;
            }
        }
    }

    /// Reads a double-quoted string and returns it verbatim, quotes included.
    fn read_string(&mut self) -> Result<String, LexError> {
        let start = self.here();
        let mut result = String::from('"');
        self.advance(); // Consume opening quote

        while let Some(ch) = self.current_char() {
            match ch {
                '"' => {
                    result.push(ch);
                    self.advance();
                    return Ok(result);
                }
                '\\' => {
                    result.push(ch);
                    self.advance();
                    match self.current_char() {
                        Some(escaped) => {
                            result.push(escaped);
                            self.advance();
                        }
                        None => {
                            return Err(self.error(start, "unterminated string literal"));
                        }
                    }
                }
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        Err(self.error(start, "unterminated string literal"))
    }

    fn read_number(&mut self) -> Result<Token, LexError> {
        let start = self.here();
        let mut number = String::new();

        while let Some(ch) = self.current_char().filter(char::is_ascii_digit) {
            number.push(ch);
            self.advance();
        }

        if self.current_char() == Some('.') && self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
        {
            number.push('.');
            self.advance();
            while let Some(ch) = self.current_char().filter(char::is_ascii_digit) {
                number.push(ch);
                self.advance();
            }
        }

        if matches!(self.current_char(), Some('e') | Some('E')) {
            let digits_at = match self.peek_char(1) {
                Some('+') | Some('-') => 2,
                _ => 1,
            };
            if self.peek_char(digits_at).is_some_and(|c| c.is_ascii_digit()) {
                for _ in 0..digits_at {
                    if let Some(ch) = self.current_char() {
                        number.push(ch);
                    }
                    self.advance();
                }
                while let Some(ch) = self.current_char().filter(char::is_ascii_digit) {
                    number.push(ch);
                    self.advance();
                }
            }
        }

        match number.parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(Token::Number(n)),
            Ok(_) => Err(self.error(start, format!("number out of range \"{}\"", number))),
            Err(_) => Err(self.error(start, format!("invalid number \"{}\"", number))),
        }
    }

    fn single(&mut self, token: Token) -> Token {
        self.advance();
        token
    }

    fn pair(&mut self, second: char, double: Token, single: Token) -> Token {
        if self.peek_char(1) == Some(second) {
            self.advance();
            self.advance();
            double
        } else {
            self.advance();
            single
        }
    }

    pub fn next_token(&mut self) -> Result<Spanned, LexError> {
        self.skip_whitespace();
        let position = self.here();

        let token = match self.current_char() {
            None => Token::Eof,
            Some('(') => self.single(Token::LParen),
            Some(')') => self.single(Token::RParen),
            Some('[') => self.single(Token::LBracket),
            Some(']') => self.single(Token::RBracket),
            Some('.') => self.single(Token::Dot),
            Some(',') => self.single(Token::Comma),
            Some(':') => self.single(Token::Colon),
            Some('-') => self.single(Token::Minus),
            Some('=') => {
                if self.peek_char(1) == Some('=') {
                    self.advance();
                    self.advance();
                    Token::EqEq
                } else {
                    return Err(self.error(
                        position,
                        "unexpected \"=\" (did you mean \"==\"?)",
                    ));
                }
            }
            Some('!') => self.pair('=', Token::NotEq, Token::Exclamation),
            Some('>') => self.pair('=', Token::GtEq, Token::Gt),
            Some('<') => self.pair('=', Token::LtEq, Token::Lt),
            Some('"') => Token::String(self.read_string()?),
            Some('r') if self.peek_char(1) == Some('"') => {
                self.advance(); // Consume the `r` prefix
                Token::Regex(self.read_string()?)
            }
            Some(ch) if Self::is_identifier_start(ch) => {
                let ident = self.read_identifier();

                match ident.as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "true" => Token::Boolean(true),
                    "false" => Token::Boolean(false),
                    _ => Token::Identifier(ident),
                }
            }
            Some(ch) if ch.is_ascii_digit() => self.read_number()?,
            Some(ch) => {
                return Err(self.error(position, format!("unexpected character '{}'", ch)));
            }
        };

        Ok(Spanned { token, position })
    }
}

#[test]
fn test_keywords() {
    let tokens: Vec<Token> = Lexer::new("and or true false")
        .tokenize()
        .unwrap()
        .into_iter()
        .map(|s| s.token)
        .collect();
    assert_eq!(
        tokens,
        vec![
            Token::And,
            Token::Or,
            Token::Boolean(true),
            Token::Boolean(false),
            Token::Eof
        ]
    );
}

#[test]
fn test_chained_helper() {
    let tokens: Vec<Token> = Lexer::new(r#"h["ua"].startsWith("kube")"#)
        .tokenize()
        .unwrap()
        .into_iter()
        .map(|s| s.token)
        .collect();
    assert_eq!(
        tokens,
        vec![
            Token::Identifier("h".to_string()),
            Token::LBracket,
            Token::String("\"ua\"".to_string()),
            Token::RBracket,
            Token::Dot,
            Token::Identifier("startsWith".to_string()),
            Token::LParen,
            Token::String("\"kube\"".to_string()),
            Token::RParen,
            Token::Eof,
        ]
    );
}
