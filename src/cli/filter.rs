//! Run a query over newline-delimited JSON records

use std::io::{BufRead, Write};

use super::{read_records, CliError};
use crate::{Metadata, Session};

/// Options for the filter command
#[derive(Debug, Clone, Default)]
pub struct FilterOptions {
    /// The query to run
    pub query: String,
    /// Interleave `/metadata` progress frames with the matches
    pub metadata: bool,
}

/// Writes every matching record to `out`.
pub fn execute_filter(
    session: &mut Session,
    options: &FilterOptions,
    input: impl BufRead,
    out: &mut impl Write,
) -> Result<Metadata, CliError> {
    let expr = session.compile(&options.query)?;
    let records = read_records(input)?;

    if !options.metadata {
        session.set_metadata_interval(None);
    }

    Ok(session.run_query(&expr, &records, out)?)
}
