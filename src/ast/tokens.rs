#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    /// Numeric literal, always carried as a float
    ///
    /// # Examples
    /// ```text
    /// 5
    /// 3.14
    /// 1e3
    /// ```
    Number(f64),

    /// String literal enclosed in double quotes
    ///
    /// The surrounding quotes and any escapes are kept verbatim; they are
    /// stripped when the literal is evaluated.
    ///
    /// # Examples
    /// ```text
    /// "hello"
    /// "application/json"
    /// ```
    String(String),

    /// Regular expression literal, `r` followed by a quoted pattern
    ///
    /// Holds the quoted pattern text, quotes included.
    ///
    /// # Examples
    /// ```text
    /// r"catalogue.*"
    /// r"(\d+(?:\.\d+)?)"
    /// ```
    Regex(String),

    /// Boolean values
    ///
    /// # Examples
    /// ```text
    /// true
    /// false
    /// ```
    Boolean(bool),

    // Identifiers
    /// Field path or helper name
    ///
    /// Dotted segments form a single token.
    ///
    /// # Examples
    /// ```text
    /// http
    /// request.headers.x
    /// response.elapsedTime
    /// ```
    Identifier(String),

    // Equality
    /// Equality operator
    EqEq,

    /// Inequality operator
    NotEq,

    // Comparison
    /// Less than
    Lt,

    /// Greater than
    Gt,

    /// Less than or equal
    LtEq,

    /// Greater than or equal
    GtEq,

    // Logical
    /// Logical AND (word, not symbol)
    ///
    /// # Examples
    /// ```text
    /// http and request.method == "GET"
    /// ```
    And,

    /// Logical OR (word, not symbol)
    ///
    /// # Examples
    /// ```text
    /// http or amqp
    /// ```
    Or,

    // Unary
    /// Negation
    Exclamation,

    /// Numeric negation
    Minus,

    // Delimiters
    /// Left bracket for subscripts
    LBracket,

    /// Right bracket
    RBracket,

    /// Left parenthesis for grouping or calls
    LParen,

    /// Right parenthesis
    RParen,

    /// Dot before a chained helper call
    Dot,

    /// Comma separating call arguments
    Comma,

    /// Colon after an argument tag
    Colon,

    /// End of input
    Eof,
}

impl Token {
    /// Short description used in syntax errors.
    pub fn describe(&self) -> String {
        match self {
            Token::Number(n) => format!("number {}", n),
            Token::String(s) => format!("string {}", s),
            Token::Regex(s) => format!("regex r{}", s),
            Token::Boolean(b) => format!("\"{}\"", b),
            Token::Identifier(name) => format!("identifier \"{}\"", name),
            Token::EqEq => "\"==\"".to_string(),
            Token::NotEq => "\"!=\"".to_string(),
            Token::Lt => "\"<\"".to_string(),
            Token::Gt => "\">\"".to_string(),
            Token::LtEq => "\"<=\"".to_string(),
            Token::GtEq => "\">=\"".to_string(),
            Token::And => "\"and\"".to_string(),
            Token::Or => "\"or\"".to_string(),
            Token::Exclamation => "\"!\"".to_string(),
            Token::Minus => "\"-\"".to_string(),
            Token::LBracket => "\"[\"".to_string(),
            Token::RBracket => "\"]\"".to_string(),
            Token::LParen => "\"(\"".to_string(),
            Token::RParen => "\")\"".to_string(),
            Token::Dot => "\".\"".to_string(),
            Token::Comma => "\",\"".to_string(),
            Token::Colon => "\":\"".to_string(),
            Token::Eof => "end of input".to_string(),
        }
    }
}
