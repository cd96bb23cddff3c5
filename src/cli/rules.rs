//! Check assertion rules against newline-delimited JSON records

use std::io::{BufRead, Write};

use serde::Serialize;

use super::{read_records, CliError};
use crate::{RuleSet, Session, Verdict};

/// Totals across every record and rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RulesSummary {
    pub records: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

#[derive(Serialize)]
struct RecordReport<'r> {
    record: usize,
    outcomes: Vec<crate::RuleOutcome<'r>>,
}

/// Writes one JSON report line per record and returns the totals.
///
/// Records that are not valid JSON are skipped with a warning.
pub fn execute_rules(
    session: &Session,
    rules: &str,
    input: impl BufRead,
    out: &mut impl Write,
) -> Result<RulesSummary, CliError> {
    let rule_set = RuleSet::parse(&session.macros().expand(rules))?;
    log::debug!("checking {} rules", rule_set.len());

    let mut summary = RulesSummary::default();
    for (index, line) in read_records(input)?.iter().enumerate() {
        let record: serde_json::Value = match serde_json::from_str(line) {
            Ok(record) => record,
            Err(e) => {
                log::warn!("record {} is not valid JSON, skipping: {}", index, e);
                continue;
            }
        };

        let outcomes = rule_set.check(session.evaluator(), &record)?;
        summary.records += 1;
        for outcome in &outcomes {
            match outcome.verdict {
                Verdict::Passed => summary.passed += 1,
                Verdict::Failed => summary.failed += 1,
                Verdict::Skipped => summary.skipped += 1,
            }
        }

        let report = RecordReport {
            record: index,
            outcomes,
        };
        writeln!(out, "{}", serde_json::to_string(&report)?)?;
    }

    Ok(summary)
}
