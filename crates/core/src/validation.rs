//! Answer validation utilities.
//!
//! Follow-up answers arrive as free text. These helpers turn them into typed values or an
//! `InvalidAnswer` error the caller recovers from by asking again.

use crate::{TriageError, TriageResult};
use triage_types::Severity;

/// Parses a yes/no answer.
///
/// Accepts `yes`, `y`, `no` and `n` in any case, surrounded by whitespace.
///
/// # Errors
///
/// Returns `TriageError::InvalidAnswer` for anything else.
pub fn parse_presence_answer(input: &str) -> TriageResult<bool> {
    match input.trim().to_ascii_lowercase().as_str() {
        "yes" | "y" => Ok(true),
        "no" | "n" => Ok(false),
        _ => Err(TriageError::InvalidAnswer(
            "please answer 'yes' or 'no'".into(),
        )),
    }
}

/// Parses a severity rating on the 1 to 5 scale.
///
/// # Errors
///
/// Returns `TriageError::InvalidAnswer` if the input is not a whole number from 1 to 5.
pub fn parse_severity_answer(input: &str) -> TriageResult<Severity> {
    input
        .parse::<Severity>()
        .map_err(|e| TriageError::InvalidAnswer(e.to_string()))
}
