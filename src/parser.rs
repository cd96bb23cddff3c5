use std::mem;

use crate::{
    ast::{
        CallExpression, Chain, Comparison, ComparisonOp, Equality, EqualityOp, Expression,
        HelperCall, Logical, LogicalOp, Parameter, Pattern, Primary, SelectExpression, Subscript,
        Token, Unary, UnaryOp,
    },
    lexer::{LexError, Lexer, Position, Spanned},
};

/// Deepest nesting of parentheses, prefix operators and call arguments
/// accepted before parsing gives up.
///
/// Each level costs several recursive frames, so the limit has to fit in
/// the 2 MiB stack of a spawned thread even in unoptimized builds.
pub const MAX_DEPTH: usize = 64;

/// Malformed query text.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{position}: {message}")]
pub struct ParseError {
    pub position: Position,
    pub message: String,
}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        ParseError {
            position: e.position,
            message: e.message,
        }
    }
}

/// Parses a complete query.
///
/// ```
/// use capql::parse;
///
/// let expr = parse(r#"http and request.method == "GET""#).unwrap();
/// assert!(expr.equality.is_some());
/// assert!(parse("a ==").is_err());
/// ```
pub fn parse(text: &str) -> Result<Expression, ParseError> {
    Parser::new(text)?.parse()
}

pub struct Parser {
    tokens: Vec<Spanned>,
    index: usize,
    current_token: Token,
    depth: usize,
}

impl Parser {
    pub fn new(text: &str) -> Result<Self, ParseError> {
        let mut tokens = Lexer::new(text).tokenize()?;
        let current_token = match tokens.first_mut() {
            Some(first) => mem::replace(&mut first.token, Token::Eof),
            None => Token::Eof,
        };
        Ok(Parser {
            tokens,
            index: 0,
            current_token,
            depth: 0,
        })
    }

    fn position(&self) -> Position {
        self.tokens
            .get(self.index)
            .or_else(|| self.tokens.last())
            .map(|s| s.position)
            .unwrap_or_default()
    }

    fn advance(&mut self) -> Token {
        if self.index + 1 < self.tokens.len() {
            self.index += 1;
        }
        let next = match self.tokens.get_mut(self.index) {
            Some(spanned) => mem::replace(&mut spanned.token, Token::Eof),
            None => Token::Eof,
        };
        mem::replace(&mut self.current_token, next)
    }

    fn peek(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.index + offset).map(|s| &s.token)
    }

    fn check(&self, token: &Token) -> bool {
        mem::discriminant(&self.current_token) == mem::discriminant(token)
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        ParseError {
            position: self.position(),
            message: format!(
                "unexpected {} (expected {})",
                self.current_token.describe(),
                expected
            ),
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), ParseError> {
        if !self.check(&expected) {
            return Err(self.unexpected(&expected.describe()));
        }
        self.advance();
        Ok(())
    }

    fn descend(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ParseError {
                position: self.position(),
                message: format!("expression nested deeper than {} levels", MAX_DEPTH),
            });
        }
        Ok(())
    }

    fn ascend(&mut self) {
        self.depth -= 1;
    }

    /// Parses the whole input; trailing tokens are an error.
    pub fn parse(&mut self) -> Result<Expression, ParseError> {
        let expr = self.parse_expression()?;
        self.expect(Token::Eof)?;
        Ok(expr)
    }

    /// An expression may be empty right before `)` or the end of input.
    pub fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        if self.check(&Token::Eof) || self.check(&Token::RParen) {
            return Ok(Expression::default());
        }
        Ok(Expression {
            equality: Some(self.parse_equality()?),
        })
    }

    fn parse_equality(&mut self) -> Result<Equality, ParseError> {
        let mut chain = Chain::single(self.parse_comparison()?);

        loop {
            let op = match &self.current_token {
                Token::EqEq => EqualityOp::Equal,
                Token::NotEq => EqualityOp::NotEqual,
                _ => break,
            };

            self.advance();
            chain.rest.push((op, self.parse_comparison()?));
        }
        Ok(chain)
    }

    fn parse_comparison(&mut self) -> Result<Comparison, ParseError> {
        let mut chain = Chain::single(self.parse_logical()?);

        loop {
            let op = match &self.current_token {
                Token::Gt => ComparisonOp::GreaterThan,
                Token::Lt => ComparisonOp::LessThan,
                Token::GtEq => ComparisonOp::GreaterEqual,
                Token::LtEq => ComparisonOp::LessEqual,
                _ => break,
            };

            self.advance();
            chain.rest.push((op, self.parse_logical()?));
        }
        Ok(chain)
    }

    fn parse_logical(&mut self) -> Result<Logical, ParseError> {
        let mut chain = Chain::single(self.parse_unary()?);

        loop {
            let op = match &self.current_token {
                Token::And => LogicalOp::And,
                Token::Or => LogicalOp::Or,
                _ => break,
            };

            self.advance();
            chain.rest.push((op, self.parse_unary()?));
        }
        Ok(chain)
    }

    fn parse_unary(&mut self) -> Result<Unary, ParseError> {
        let op = match &self.current_token {
            Token::Exclamation => UnaryOp::Not,
            Token::Minus => UnaryOp::Negate,
            _ => return Ok(Unary::Primary(self.parse_primary()?)),
        };

        self.advance();
        self.descend()?;
        let inner = self.parse_unary();
        self.ascend();
        Ok(Unary::Prefix(op, Box::new(inner?)))
    }

    fn parse_primary(&mut self) -> Result<Primary, ParseError> {
        let position = self.position();

        match &self.current_token {
            Token::Boolean(_)
            | Token::Number(_)
            | Token::String(_)
            | Token::Regex(_)
            | Token::Identifier(_)
            | Token::LParen => {}
            _ => return Err(self.unexpected("a value, field or \"(\"")),
        }

        match self.advance() {
            Token::Boolean(b) => Ok(Primary::Boolean(b)),
            Token::Number(n) => Ok(Primary::Number(n)),
            Token::String(s) => Ok(Primary::String(s)),
            Token::Regex(literal) => Pattern::new(&literal)
                .map(Primary::Regex)
                .map_err(|e| ParseError {
                    position,
                    message: format!("invalid regex r{}: {}", literal, e),
                }),
            Token::LParen => {
                self.descend()?;
                let expr = self.parse_expression();
                self.ascend();
                let expr = expr?;
                self.expect(Token::RParen)?;
                Ok(Primary::SubExpression(Box::new(expr)))
            }
            Token::Identifier(identifier) => self.parse_call(identifier).map(Primary::Call),
            _ => Err(ParseError {
                position,
                message: "unexpected token".to_string(),
            }),
        }
    }

    /// Parses what follows a field or call identifier.
    fn parse_call(&mut self, identifier: String) -> Result<CallExpression, ParseError> {
        if self.check(&Token::LParen) {
            self.advance(); // consume '('
            let parameters = self.parse_parameters()?;
            return Ok(CallExpression {
                identifier,
                select: None,
                parameters: Some(parameters),
            });
        }

        if !self.check(&Token::LBracket) {
            return Ok(CallExpression {
                identifier,
                select: None,
                parameters: None,
            });
        }

        self.advance(); // consume '['
        let subscript = self.parse_subscript()?;
        self.expect(Token::RBracket)?;

        let call = if self.check(&Token::Dot) {
            self.advance(); // consume '.'
            let name = match &self.current_token {
                Token::Identifier(name) if !name.contains('.') => name.clone(),
                _ => return Err(self.unexpected("helper name")),
            };
            self.advance();
            self.expect(Token::LParen)?;
            let parameters = self.parse_parameters()?;
            Some(HelperCall { name, parameters })
        } else {
            None
        };

        Ok(CallExpression {
            identifier,
            select: Some(SelectExpression {
                subscript: Some(subscript),
                call,
            }),
            parameters: None,
        })
    }

    fn parse_subscript(&mut self) -> Result<Subscript, ParseError> {
        match &self.current_token {
            Token::Number(n) if n.fract() == 0.0 && *n >= 0.0 && *n <= usize::MAX as f64 => {
                let index = *n as usize;
                self.advance();
                Ok(Subscript::Index(index))
            }
            Token::String(_) => match self.advance() {
                Token::String(key) => Ok(Subscript::Key(key)),
                _ => Err(self.unexpected("string key")),
            },
            _ => Err(self.unexpected("non-negative integer index or string key")),
        }
    }

    /// Parses `param, param, ...)` after the opening parenthesis, closing
    /// parenthesis included. A trailing comma is allowed.
    fn parse_parameters(&mut self) -> Result<Vec<Parameter>, ParseError> {
        self.descend()?;
        let result = self.parse_parameter_list();
        self.ascend();
        result
    }

    fn parse_parameter_list(&mut self) -> Result<Vec<Parameter>, ParseError> {
        let mut parameters = Vec::new();

        while !self.check(&Token::RParen) {
            let tag = match (&self.current_token, self.peek(1)) {
                (Token::Identifier(tag), Some(Token::Colon)) => {
                    let tag = tag.clone();
                    self.advance(); // tag
                    self.advance(); // ':'
                    Some(tag)
                }
                _ => None,
            };

            if self.check(&Token::Comma) || self.check(&Token::RParen) || self.check(&Token::Eof)
            {
                return Err(self.unexpected("argument"));
            }

            let expression = self.parse_expression()?;
            parameters.push(Parameter { tag, expression });

            if self.check(&Token::Comma) {
                self.advance();
            } else if !self.check(&Token::RParen) {
                return Err(self.unexpected("\",\" or \")\""));
            }
        }

        self.expect(Token::RParen)?;
        Ok(parameters)
    }
}
