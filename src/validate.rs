//! Field normalization and validation. Each function takes input the way an
//! adapter handed it over and either returns the canonical stored form or a
//! `RepoError::Validation` naming the offending field.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::error::RepoError;
use crate::models::{DateInput, SalaryInput, Status};

/// Trims a required text field and rejects it when nothing is left.
pub fn required_text(field: &'static str, value: &str) -> Result<String, RepoError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RepoError::validation(field, "must not be empty"));
    }
    Ok(trimmed.to_string())
}

pub fn status(value: &str) -> Result<Status, RepoError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RepoError::validation("status", "must not be empty"));
    }
    trimmed.parse().map_err(|_| {
        RepoError::validation(
            "status",
            format!(
                "'{}' is not one of applied, interviewing, offered, rejected",
                trimmed
            ),
        )
    })
}

/// Permissive URL check: a scheme prefix or any dot is accepted. Empty text
/// normalizes to absent.
pub fn job_url(value: &str) -> Result<Option<String>, RepoError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let looks_like_url = trimmed.starts_with("http://")
        || trimmed.starts_with("https://")
        || trimmed.contains('.');
    if !looks_like_url {
        return Err(RepoError::validation(
            "job_url",
            "must start with http:// or https://, or contain a '.'",
        ));
    }
    Ok(Some(trimmed.to_string()))
}

/// Normalizes any accepted date form to a date-time. Text must be exactly
/// YYYY-MM-DD; a bare date becomes midnight; a date-time passes through
/// with sub-seconds dropped, since the store keeps whole seconds only.
pub fn date_applied(input: &DateInput) -> Result<NaiveDateTime, RepoError> {
    match input {
        DateInput::Text(raw) => {
            let trimmed = raw.trim();
            // chrono's %m/%d also accept single digits, so pin the length
            // to keep the format strict.
            if trimmed.len() != 10 {
                return Err(RepoError::validation(
                    "date_applied",
                    format!("'{}' is not a YYYY-MM-DD date", trimmed),
                ));
            }
            let date = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map_err(|_| {
                RepoError::validation(
                    "date_applied",
                    format!("'{}' is not a YYYY-MM-DD date", trimmed),
                )
            })?;
            Ok(date.and_time(NaiveTime::MIN))
        }
        DateInput::Date(date) => Ok(date.and_time(NaiveTime::MIN)),
        DateInput::DateTime(dt) => Ok(dt.with_nanosecond(0).unwrap_or(*dt)),
    }
}

/// Normalizes a salary to a non-negative number, or absent for empty text.
pub fn salary(input: &SalaryInput) -> Result<Option<f64>, RepoError> {
    let value = match input {
        SalaryInput::Number(n) => *n,
        SalaryInput::Text(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed.parse::<f64>().map_err(|_| {
                RepoError::validation("salary", format!("'{}' is not a number", trimmed))
            })?
        }
    };
    if value.is_nan() || value < 0.0 {
        return Err(RepoError::validation("salary", "must be a non-negative number"));
    }
    Ok(Some(value))
}

/// Trims free text; empty becomes absent.
pub fn remarks(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
