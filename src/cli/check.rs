//! Validate query syntax

use super::CliError;
use crate::Session;

/// Expands macros and parses `query`, failing fast on the first error.
pub fn execute_check(session: &Session, query: &str) -> Result<(), CliError> {
    session.compile(query)?;
    Ok(())
}
