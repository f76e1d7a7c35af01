use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where an application stands. Stored lower-case; parsing is
/// case-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Applied,
    Interviewing,
    Offered,
    Rejected,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Applied => "applied",
            Status::Interviewing => "interviewing",
            Status::Offered => "offered",
            Status::Rejected => "rejected",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for Status {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "applied" => Ok(Status::Applied),
            "interviewing" => Ok(Status::Interviewing),
            "offered" => Ok(Status::Offered),
            "rejected" => Ok(Status::Rejected),
            _ => Err(UnknownStatus(s.trim().to_string())),
        }
    }
}

/// One stored job application. `id` is assigned by the store and never
/// changes; `company`, `position`, `status` and `date_applied` are always
/// present, the rest are optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobApplication {
    pub id: String,
    pub company: String,
    pub position: String,
    pub status: Status,
    pub date_applied: NaiveDateTime,
    pub salary: Option<f64>,
    pub job_url: Option<String>,
    pub remarks: Option<String>,
}

/// Date input as the adapter received it: raw text (must be exactly
/// YYYY-MM-DD), a bare date (promoted to midnight), or a full date-time
/// (passed through).
#[derive(Debug, Clone)]
pub enum DateInput {
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

/// Salary input as received: already numeric, or raw text still to be
/// parsed. Empty text normalizes to "no salary".
#[derive(Debug, Clone)]
pub enum SalaryInput {
    Number(f64),
    Text(String),
}

/// Fields for a new application, pre-validation. Normalization and the
/// field invariants are applied by `Database::create_job`.
#[derive(Debug, Clone)]
pub struct JobDraft {
    pub company: String,
    pub position: String,
    pub status: String,
    pub date_applied: DateInput,
    pub salary: Option<SalaryInput>,
    pub job_url: Option<String>,
    pub remarks: Option<String>,
}

/// Tri-state for one optional field in a partial update. The adapter
/// decides which variant applies before the patch reaches the repository.
#[derive(Debug, Clone, Default)]
pub enum FieldPatch<T> {
    #[default]
    Unchanged,
    Set(T),
    Clear,
}

impl<T> FieldPatch<T> {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, FieldPatch::Unchanged)
    }
}

/// Partial update. Required fields can be set or left alone but never
/// cleared, so plain `Option` is enough for them.
#[derive(Debug, Clone, Default)]
pub struct JobPatch {
    pub company: Option<String>,
    pub position: Option<String>,
    pub status: Option<String>,
    pub date_applied: Option<DateInput>,
    pub salary: FieldPatch<SalaryInput>,
    pub job_url: FieldPatch<String>,
    pub remarks: FieldPatch<String>,
}

impl JobPatch {
    pub fn is_empty(&self) -> bool {
        self.company.is_none()
            && self.position.is_none()
            && self.status.is_none()
            && self.date_applied.is_none()
            && self.salary.is_unchanged()
            && self.job_url.is_unchanged()
            && self.remarks.is_unchanged()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_case_insensitive() {
        assert_eq!("Applied".parse::<Status>().unwrap(), Status::Applied);
        assert_eq!(
            "INTERVIEWING".parse::<Status>().unwrap(),
            Status::Interviewing
        );
        assert_eq!("  offered ".parse::<Status>().unwrap(), Status::Offered);
        assert!("ghosted".parse::<Status>().is_err());
    }

    #[test]
    fn test_status_serializes_lower_case() {
        let json = serde_json::to_string(&Status::Rejected).unwrap();
        assert_eq!(json, "\"rejected\"");
    }

    #[test]
    fn test_empty_patch() {
        assert!(JobPatch::default().is_empty());
        let patch = JobPatch {
            salary: FieldPatch::Clear,
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }
}
