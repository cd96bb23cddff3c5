pub mod ast;
pub mod cli;
pub mod config;
pub mod evaluator;
pub mod helpers;
pub mod lexer;
pub mod macros;
pub mod parser;
pub mod protocol;
pub mod rules;
pub mod session;
pub mod value;

pub use ast::{Expression, Token};
pub use config::{Config, ConfigError};
pub use evaluator::{EvalError, Evaluator};
pub use helpers::{HelperFn, Helpers};
pub use lexer::{LexError, Lexer, Position};
pub use macros::{MacroError, Macros};
pub use parser::{parse, ParseError, Parser};
pub use protocol::{Command, Frame, Metadata, ProtocolError};
pub use rules::{Rule, RuleError, RuleOutcome, RuleSet, Verdict};
pub use session::{Session, SessionError};
pub use value::Value;
