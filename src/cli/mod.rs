//! CLI support for capql
//!
//! Provides programmatic access to the `capql` subcommands so they can be
//! embedded in other tools and tested without spawning a process.

mod check;
mod filter;
mod rules;

pub use check::execute_check;
pub use filter::{execute_filter, FilterOptions};
pub use rules::{execute_rules, RulesSummary};

use std::{
    io::{self, BufRead},
    path::PathBuf,
};

use crate::{protocol::MAX_LINE_BYTES, Config, ConfigError, MacroError, Session};

/// Errors that can occur during CLI operations
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Parse error: {0}")]
    Parse(#[from] crate::ParseError),

    #[error("Evaluation error: {0}")]
    Eval(#[from] crate::EvalError),

    #[error(transparent)]
    Session(#[from] crate::SessionError),

    #[error(transparent)]
    Rule(#[from] crate::RuleError),

    #[error(transparent)]
    Macro(#[from] MacroError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("No input provided. Use --input or pipe records to stdin.")]
    NoInput,

    #[error("{failed} of {checked} rule checks failed")]
    RulesFailed { failed: usize, checked: usize },
}

/// Options shared by every subcommand that builds a [`Session`].
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// TOML configuration file
    pub config: Option<PathBuf>,
    /// `name~expansion` definitions applied after the configuration file
    pub macros: Vec<String>,
}

impl SessionOptions {
    pub fn build(&self) -> Result<Session, CliError> {
        let config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        let mut session = Session::from_config(&config)?;
        for definition in &self.macros {
            session.macros_mut().define_from(definition)?;
        }
        Ok(session)
    }
}

/// Non-empty input lines.
pub(crate) fn read_records(input: impl BufRead) -> Result<Vec<String>, CliError> {
    let mut records = Vec::new();
    for (index, line) in input.lines().enumerate() {
        let line = line?;
        if line.len() > MAX_LINE_BYTES {
            return Err(CliError::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("line {} exceeds {} bytes", index + 1, MAX_LINE_BYTES),
            )));
        }
        if !line.trim().is_empty() {
            records.push(line);
        }
    }
    Ok(records)
}
