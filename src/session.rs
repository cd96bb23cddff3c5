//! Server-side handling of the language commands.
//!
//! A [`Session`] owns the macro table and an evaluator and answers
//! `/validate`, `/macro`, `/query` and `/single` over records handed to it by
//! the caller. Storage and transport stay outside.

use std::io::{self, Write};

use crate::{
    ast::Expression,
    config::{Config, DEFAULT_METADATA_INTERVAL},
    evaluator::{EvalError, Evaluator},
    macros::{MacroError, Macros},
    parser::{parse, ParseError},
    protocol::{Command, Metadata, ProtocolError, OK},
};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Syntax error: {0}")]
    Syntax(#[from] ParseError),

    #[error("Evaluation error: {0}")]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Macro(#[from] MacroError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Record \"{0}\" not found")]
    NotFound(String),

    #[error("Command {0} is handled by the record store")]
    Unsupported(Command),
}

#[derive(Debug, Clone)]
pub struct Session {
    macros: Macros,
    evaluator: Evaluator,
    metadata_interval: Option<usize>,
}

impl Default for Session {
    fn default() -> Self {
        Session {
            macros: Macros::new(),
            evaluator: Evaluator::new(),
            metadata_interval: Some(DEFAULT_METADATA_INTERVAL),
        }
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_evaluator(evaluator: Evaluator) -> Self {
        Session {
            evaluator,
            ..Self::default()
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, MacroError> {
        let mut session = Self::new();
        session.metadata_interval = Some(config.metadata_interval);
        for (name, expansion) in &config.macros {
            session.macros.define(name.as_str(), expansion.as_str())?;
        }
        Ok(session)
    }

    pub fn macros(&self) -> &Macros {
        &self.macros
    }

    pub fn macros_mut(&mut self) -> &mut Macros {
        &mut self.macros
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    /// Records between two progress frames. `Some(0)` sends only the final
    /// frame, `None` sends none.
    pub fn set_metadata_interval(&mut self, interval: Option<usize>) {
        self.metadata_interval = interval;
    }

    /// Expands macros and parses the result.
    pub fn compile(&self, query: &str) -> Result<Expression, ParseError> {
        let expanded = self.macros.expand(query);
        parse(&expanded).inspect_err(|e| log::debug!("query {:?} rejected: {}", query, e))
    }

    /// `/validate` reply: `OK` or the syntax error text.
    pub fn validate(&self, query: &str) -> String {
        match self.compile(query) {
            Ok(_) => OK.to_string(),
            Err(e) => e.to_string(),
        }
    }

    /// `/macro` reply for a `name~expansion` payload: `OK` or the error text.
    pub fn define_macro(&mut self, definition: &str) -> String {
        match self.macros.define_from(definition) {
            Ok(()) => OK.to_string(),
            Err(e) => e.to_string(),
        }
    }

    /// Streams every record matching `expr` to `out`, one per line, with a
    /// `/metadata` frame every `metadata_interval` records and after the
    /// last one (unless frames are disabled).
    ///
    /// Records that are not valid JSON do not match. Any other evaluation
    /// error stops the query.
    pub fn run_query<S: AsRef<str>, W: Write>(
        &self,
        expr: &Expression,
        records: &[S],
        out: &mut W,
    ) -> Result<Metadata, SessionError> {
        let mut metadata = Metadata {
            total: records.len() as u64,
            ..Metadata::default()
        };
        let mut frame_pending = self.metadata_interval.is_some();

        for (index, record) in records.iter().enumerate() {
            let record = record.as_ref();
            metadata.current = index as u64 + 1;

            match self.evaluator.eval(expr, record) {
                Ok(true) => {
                    writeln!(out, "{}", record)?;
                    metadata.number_of_written += 1;
                }
                Ok(false) => {}
                Err(EvalError::Decode(e)) => {
                    log::warn!("record {} is not valid JSON, treating as no match: {}", index, e);
                }
                Err(e) => return Err(e.into()),
            }

            match self.metadata_interval {
                Some(interval) if interval > 0 && (index + 1) % interval == 0 => {
                    writeln!(out, "{}", metadata.to_line()?)?;
                    frame_pending = false;
                }
                Some(_) => frame_pending = true,
                None => {}
            }
        }

        if frame_pending {
            writeln!(out, "{}", metadata.to_line()?)?;
        }

        log::debug!(
            "query scanned {} records, wrote {}",
            metadata.current,
            metadata.number_of_written
        );
        Ok(metadata)
    }

    /// Compiles and runs `query` in one step.
    pub fn query<S: AsRef<str>, W: Write>(
        &self,
        query: &str,
        records: &[S],
        out: &mut W,
    ) -> Result<Metadata, SessionError> {
        let expr = self.compile(query)?;
        self.run_query(&expr, records, out)
    }

    /// Dispatches one control line and its payload.
    ///
    /// `/single` takes the position of a record in `records`. `/insert`,
    /// `/limit` and `/metadata` belong to the record store.
    pub fn handle<S: AsRef<str>, W: Write>(
        &mut self,
        command: Command,
        payload: &str,
        records: &[S],
        out: &mut W,
    ) -> Result<(), SessionError> {
        match command {
            Command::Validate => writeln!(out, "{}", self.validate(payload))?,
            Command::Macro => writeln!(out, "{}", self.define_macro(payload))?,
            Command::Query => {
                self.query(payload, records, out)?;
            }
            Command::Single => {
                let record = payload
                    .trim()
                    .parse::<usize>()
                    .ok()
                    .and_then(|id| records.get(id))
                    .ok_or_else(|| SessionError::NotFound(payload.trim().to_string()))?;
                writeln!(out, "{}", record.as_ref())?;
            }
            Command::Insert | Command::Limit | Command::Metadata => {
                return Err(SessionError::Unsupported(command));
            }
        }
        Ok(())
    }
}
