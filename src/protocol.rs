//! Line protocol spoken around the query core.
//!
//! A session starts with a control line (`/query`, `/validate`, ...) followed
//! by payload lines. Replies are newline-delimited records, interleaved with
//! `/metadata {...}` progress frames and `%...%` sentinel lines.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Upper bound on a single protocol line (200 MiB).
pub const MAX_LINE_BYTES: usize = 209_715_200;

/// Sentinel asking the reader to stop reading this channel.
pub const CLOSE_CHANNEL: &str = "%close%";

/// Sentinel announcing the server is hanging up.
pub const CLOSE_CONNECTION: &str = "%quit%";

/// Reply to a successful `/validate`, `/macro` or `/limit`.
pub const OK: &str = "OK";

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Unknown command \"{0}\"")]
    UnknownCommand(String),

    #[error("Malformed metadata frame: {0}")]
    Metadata(#[from] serde_json::Error),
}

/// Session mode selected by a control line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Insert,
    Query,
    Single,
    Validate,
    Macro,
    Limit,
    Metadata,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Insert => "/insert",
            Command::Query => "/query",
            Command::Single => "/single",
            Command::Validate => "/validate",
            Command::Macro => "/macro",
            Command::Limit => "/limit",
            Command::Metadata => "/metadata",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Command {
    type Err = ProtocolError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        match line.trim_end() {
            "/insert" => Ok(Command::Insert),
            "/query" => Ok(Command::Query),
            "/single" => Ok(Command::Single),
            "/validate" => Ok(Command::Validate),
            "/macro" => Ok(Command::Macro),
            "/limit" => Ok(Command::Limit),
            "/metadata" => Ok(Command::Metadata),
            other => Err(ProtocolError::UnknownCommand(other.to_string())),
        }
    }
}

/// Query progress streamed alongside matching records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Records scanned so far
    pub current: u64,
    /// Records available to the query
    pub total: u64,
    /// Records written back so far
    pub number_of_written: u64,
}

impl Metadata {
    /// The full `/metadata {...}` line, without the trailing newline.
    pub fn to_line(&self) -> Result<String, ProtocolError> {
        Ok(format!(
            "{} {}",
            Command::Metadata,
            serde_json::to_string(self)?
        ))
    }
}

/// One line read back from a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame<'a> {
    /// A record, passed through verbatim
    Record(&'a str),
    Metadata(Metadata),
    /// `%close%`
    Close,
    /// `%quit%`
    Quit,
    /// Any other `%name%` line, with the percent signs removed
    Event(&'a str),
}

impl<'a> Frame<'a> {
    /// Classifies a line (trailing `\r`/`\n` ignored).
    pub fn decode(line: &'a str) -> Result<Self, ProtocolError> {
        let line = line.trim_end_matches(['\r', '\n']);

        if let Some(payload) = line
            .strip_prefix(Command::Metadata.as_str())
            .and_then(|rest| rest.strip_prefix(' '))
        {
            return Ok(Frame::Metadata(serde_json::from_str(payload)?));
        }

        if let Some(name) = sentinel(line) {
            return Ok(match line {
                CLOSE_CHANNEL => Frame::Close,
                CLOSE_CONNECTION => Frame::Quit,
                _ => Frame::Event(name),
            });
        }

        Ok(Frame::Record(line))
    }

    /// True for frames that end the stream being read.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Frame::Close | Frame::Quit)
    }
}

/// Name inside a line wrapped entirely in `%...%`.
fn sentinel(line: &str) -> Option<&str> {
    line.strip_prefix('%')?.strip_suffix('%')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_round_trip_through_text() {
        for command in [
            Command::Insert,
            Command::Query,
            Command::Single,
            Command::Validate,
            Command::Macro,
            Command::Limit,
            Command::Metadata,
        ] {
            assert_eq!(command.as_str().parse::<Command>().unwrap(), command);
        }
        assert!("/drop".parse::<Command>().is_err());
    }
}
