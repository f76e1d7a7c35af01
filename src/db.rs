use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use rusqlite::{Connection, params};

use crate::error::RepoError;
use crate::models::{FieldPatch, JobApplication, JobDraft, JobPatch, Status};
use crate::validate;

/// How `date_applied` is written into the applications table.
const STORED_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const JOB_COLUMNS: &str = "id, company, position, status, date_applied, salary, job_url, remarks";

/// The record repository: one applications collection behind a single
/// connection. The connection is wrapped in a mutex so one handle can be
/// shared by concurrent callers; each operation is a single logical store
/// request relying on SQLite's per-statement atomicity.
pub struct Database {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    pub fn open_default() -> Result<Self> {
        Self::open(&Self::default_path())
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    fn default_path() -> PathBuf {
        // Use XDG data directory or fallback
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "jobtrack") {
            proj_dirs.data_dir().join("jobtrack.db")
        } else {
            PathBuf::from("jobtrack.db")
        }
    }

    /// Ensures the applications table exists. `INTEGER PRIMARY KEY` is the
    /// lookup index on the identifier.
    pub fn init(&self) -> Result<()> {
        self.conn().execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS applications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                company TEXT NOT NULL,
                position TEXT NOT NULL,
                status TEXT NOT NULL CHECK (status IN ('applied', 'interviewing', 'offered', 'rejected')),
                date_applied TEXT NOT NULL,
                salary REAL,
                job_url TEXT,
                remarks TEXT
            );
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Validates and persists a new application, returning the assigned id.
    /// First validation failure wins and nothing is written.
    pub fn create_job(&self, draft: &JobDraft) -> Result<String, RepoError> {
        let company = validate::required_text("company", &draft.company)?;
        let position = validate::required_text("position", &draft.position)?;
        let status = validate::status(&draft.status)?;
        let job_url = match &draft.job_url {
            Some(url) => validate::job_url(url)?,
            None => None,
        };
        let date_applied = validate::date_applied(&draft.date_applied)?;
        let salary = match &draft.salary {
            Some(s) => validate::salary(s)?,
            None => None,
        };
        let remarks = draft.remarks.as_deref().and_then(validate::remarks);

        let conn = self.conn();
        conn.execute(
            "INSERT INTO applications (company, position, status, date_applied, salary, job_url, remarks)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                company,
                position,
                status.as_str(),
                date_applied.format(STORED_DATE_FORMAT).to_string(),
                salary,
                job_url,
                remarks
            ],
        )?;
        Ok(conn.last_insert_rowid().to_string())
    }

    pub fn get_job(&self, id: &str) -> Result<Option<JobApplication>, RepoError> {
        let Some(rowid) = parse_id(id) else {
            return Ok(None);
        };
        lookup(&self.conn(), rowid)
    }

    /// Every stored application in the store's natural retrieval order.
    pub fn list_jobs(&self) -> Result<Vec<JobApplication>, RepoError> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare(&format!("SELECT {} FROM applications", JOB_COLUMNS))?;
        let rows = stmt.query_map([], row_to_application)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Applies a partial update. The target is looked up first, so a missing
    /// record reports NotFound before any field is validated; a patch that
    /// changes nothing still succeeds and returns the stored record.
    pub fn update_job(&self, id: &str, patch: &JobPatch) -> Result<JobApplication, RepoError> {
        let rowid = parse_id(id).ok_or_else(|| RepoError::NotFound(id.to_string()))?;

        let conn = self.conn();
        let existing = lookup(&conn, rowid)?.ok_or_else(|| RepoError::NotFound(id.to_string()))?;

        if patch.is_empty() {
            return Ok(existing);
        }

        let company = match &patch.company {
            Some(value) => validate::required_text("company", value)?,
            None => existing.company.clone(),
        };
        let position = match &patch.position {
            Some(value) => validate::required_text("position", value)?,
            None => existing.position.clone(),
        };
        let status = match &patch.status {
            Some(value) => validate::status(value)?,
            None => existing.status,
        };
        let job_url = match &patch.job_url {
            FieldPatch::Set(value) => validate::job_url(value)?,
            FieldPatch::Clear => None,
            FieldPatch::Unchanged => existing.job_url.clone(),
        };
        let date_applied = match &patch.date_applied {
            Some(input) => validate::date_applied(input)?,
            None => existing.date_applied,
        };
        let salary = match &patch.salary {
            FieldPatch::Set(input) => validate::salary(input)?,
            FieldPatch::Clear => None,
            FieldPatch::Unchanged => existing.salary,
        };
        let remarks = match &patch.remarks {
            FieldPatch::Set(value) => validate::remarks(value),
            FieldPatch::Clear => None,
            FieldPatch::Unchanged => existing.remarks.clone(),
        };

        let updated = JobApplication {
            id: existing.id.clone(),
            company,
            position,
            status,
            date_applied,
            salary,
            job_url,
            remarks,
        };

        if updated == existing {
            return Ok(existing);
        }

        conn.execute(
            "UPDATE applications
             SET company = ?1, position = ?2, status = ?3, date_applied = ?4,
                 salary = ?5, job_url = ?6, remarks = ?7
             WHERE id = ?8",
            params![
                updated.company,
                updated.position,
                updated.status.as_str(),
                updated.date_applied.format(STORED_DATE_FORMAT).to_string(),
                updated.salary,
                updated.job_url,
                updated.remarks,
                rowid
            ],
        )?;
        Ok(updated)
    }

    /// Removes the record if present. A malformed or unknown id reads as
    /// "nothing to delete", never a fatal error.
    pub fn delete_job(&self, id: &str) -> Result<bool, RepoError> {
        let Some(rowid) = parse_id(id) else {
            return Ok(false);
        };
        let removed = self
            .conn()
            .execute("DELETE FROM applications WHERE id = ?1", [rowid])?;
        Ok(removed > 0)
    }

    pub fn count_jobs(&self) -> Result<i64, RepoError> {
        let count = self
            .conn()
            .query_row("SELECT COUNT(*) FROM applications", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn parse_id(id: &str) -> Option<i64> {
    id.trim().parse().ok()
}

fn lookup(conn: &Connection, rowid: i64) -> Result<Option<JobApplication>, RepoError> {
    let result = conn.query_row(
        &format!("SELECT {} FROM applications WHERE id = ?1", JOB_COLUMNS),
        [rowid],
        row_to_application,
    );
    match result {
        Ok(job) => Ok(Some(job)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn row_to_application(row: &rusqlite::Row) -> rusqlite::Result<JobApplication> {
    let id: i64 = row.get(0)?;
    let status_text: String = row.get(3)?;
    let status: Status = status_text.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let date_text: String = row.get(4)?;
    let date_applied = NaiveDateTime::parse_from_str(&date_text, STORED_DATE_FORMAT)
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?;
    Ok(JobApplication {
        id: id.to_string(),
        company: row.get(1)?,
        position: row.get(2)?,
        status,
        date_applied,
        salary: row.get(5)?,
        job_url: row.get(6)?,
        remarks: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DateInput, SalaryInput};
    use chrono::NaiveDate;

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.init().unwrap();
        db
    }

    fn sample_draft() -> JobDraft {
        JobDraft {
            company: "  Acme Corp  ".to_string(),
            position: "Backend Engineer".to_string(),
            status: "Applied".to_string(),
            date_applied: DateInput::Text("2024-03-01".to_string()),
            salary: Some(SalaryInput::Number(95_000.0)),
            job_url: Some("https://acme.example/careers/42".to_string()),
            remarks: Some("  referred by Sam  ".to_string()),
        }
    }

    fn midnight(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    #[test]
    fn test_create_then_get_roundtrip() {
        let db = test_db();
        let id = db.create_job(&sample_draft()).unwrap();
        let job = db.get_job(&id).unwrap().unwrap();

        assert_eq!(job.id, id);
        assert_eq!(job.company, "Acme Corp");
        assert_eq!(job.position, "Backend Engineer");
        assert_eq!(job.status, Status::Applied);
        assert_eq!(job.date_applied, midnight(2024, 3, 1));
        assert_eq!(job.salary, Some(95_000.0));
        assert_eq!(job.job_url.as_deref(), Some("https://acme.example/careers/42"));
        assert_eq!(job.remarks.as_deref(), Some("referred by Sam"));
    }

    #[test]
    fn test_create_rejects_bad_status_without_writing() {
        let db = test_db();
        let draft = JobDraft {
            status: "ghosted".to_string(),
            ..sample_draft()
        };
        let err = db.create_job(&draft).unwrap_err();
        assert!(matches!(err, RepoError::Validation { field: "status", .. }));
        assert_eq!(db.count_jobs().unwrap(), 0);
    }

    #[test]
    fn test_create_rejects_bad_date() {
        let db = test_db();
        let draft = JobDraft {
            date_applied: DateInput::Text("2024-13-01".to_string()),
            ..sample_draft()
        };
        assert!(matches!(
            db.create_job(&draft).unwrap_err(),
            RepoError::Validation { field: "date_applied", .. }
        ));
        assert_eq!(db.count_jobs().unwrap(), 0);
    }

    #[test]
    fn test_create_salary_bounds() {
        let db = test_db();
        let negative = JobDraft {
            salary: Some(SalaryInput::Number(-1.0)),
            ..sample_draft()
        };
        assert!(matches!(
            db.create_job(&negative).unwrap_err(),
            RepoError::Validation { field: "salary", .. }
        ));

        let zero = JobDraft {
            salary: Some(SalaryInput::Number(0.0)),
            ..sample_draft()
        };
        let id = db.create_job(&zero).unwrap();
        assert_eq!(db.get_job(&id).unwrap().unwrap().salary, Some(0.0));
    }

    #[test]
    fn test_first_validation_failure_wins() {
        let db = test_db();
        // Both company and salary are bad; company is checked first.
        let draft = JobDraft {
            company: "  ".to_string(),
            salary: Some(SalaryInput::Number(-1.0)),
            ..sample_draft()
        };
        assert!(matches!(
            db.create_job(&draft).unwrap_err(),
            RepoError::Validation { field: "company", .. }
        ));
    }

    #[test]
    fn test_update_empty_patch_is_noop() {
        let db = test_db();
        let id = db.create_job(&sample_draft()).unwrap();
        let before = db.get_job(&id).unwrap().unwrap();
        let after = db.update_job(&id, &JobPatch::default()).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_update_missing_id_is_not_found_before_validation() {
        let db = test_db();
        // Invalid status would fail validation, but NotFound wins.
        let patch = JobPatch {
            status: Some("ghosted".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            db.update_job("9999", &patch).unwrap_err(),
            RepoError::NotFound(_)
        ));
        assert!(matches!(
            db.update_job("not-an-id", &patch).unwrap_err(),
            RepoError::NotFound(_)
        ));
    }

    #[test]
    fn test_update_applies_partial_fields() {
        let db = test_db();
        let id = db.create_job(&sample_draft()).unwrap();
        let patch = JobPatch {
            status: Some("INTERVIEWING".to_string()),
            ..Default::default()
        };
        let updated = db.update_job(&id, &patch).unwrap();
        assert_eq!(updated.status, Status::Interviewing);
        // Everything else untouched
        assert_eq!(updated.company, "Acme Corp");
        assert_eq!(updated.salary, Some(95_000.0));
        assert_eq!(db.get_job(&id).unwrap().unwrap(), updated);
    }

    #[test]
    fn test_update_invalid_field_aborts_whole_patch() {
        let db = test_db();
        let id = db.create_job(&sample_draft()).unwrap();
        let patch = JobPatch {
            company: Some("Globex".to_string()),
            salary: FieldPatch::Set(SalaryInput::Number(-10.0)),
            ..Default::default()
        };
        assert!(db.update_job(&id, &patch).is_err());
        // The valid company change must not have been applied.
        assert_eq!(db.get_job(&id).unwrap().unwrap().company, "Acme Corp");
    }

    #[test]
    fn test_update_empty_string_clears_salary() {
        let db = test_db();
        let id = db.create_job(&sample_draft()).unwrap();

        let clear = JobPatch {
            salary: FieldPatch::Set(SalaryInput::Text(String::new())),
            ..Default::default()
        };
        let updated = db.update_job(&id, &clear).unwrap();
        assert_eq!(updated.salary, None);

        // Omitting the field leaves the (now absent) salary untouched
        // and a fresh record keeps its salary through unrelated patches.
        let id2 = db.create_job(&sample_draft()).unwrap();
        let unrelated = JobPatch {
            position: Some("Staff Engineer".to_string()),
            ..Default::default()
        };
        let updated2 = db.update_job(&id2, &unrelated).unwrap();
        assert_eq!(updated2.salary, Some(95_000.0));
    }

    #[test]
    fn test_update_clear_variant_clears_optionals() {
        let db = test_db();
        let id = db.create_job(&sample_draft()).unwrap();
        let patch = JobPatch {
            salary: FieldPatch::Clear,
            job_url: FieldPatch::Clear,
            remarks: FieldPatch::Clear,
            ..Default::default()
        };
        let updated = db.update_job(&id, &patch).unwrap();
        assert_eq!(updated.salary, None);
        assert_eq!(updated.job_url, None);
        assert_eq!(updated.remarks, None);
    }

    #[test]
    fn test_update_fractional_timestamp_returns_stored_state() {
        let db = test_db();
        let id = db.create_job(&sample_draft()).unwrap();
        let fractional = NaiveDate::from_ymd_opt(2024, 3, 2)
            .unwrap()
            .and_hms_milli_opt(9, 30, 0, 500)
            .unwrap();
        let patch = JobPatch {
            date_applied: Some(DateInput::DateTime(fractional)),
            ..Default::default()
        };
        let returned = db.update_job(&id, &patch).unwrap();
        let stored = db.get_job(&id).unwrap().unwrap();
        assert_eq!(returned, stored);
        assert_eq!(
            stored.date_applied,
            NaiveDate::from_ymd_opt(2024, 3, 2).unwrap().and_hms_opt(9, 30, 0).unwrap()
        );
        // Re-applying the same patch is now a recognizable no-op.
        assert_eq!(db.update_job(&id, &patch).unwrap(), stored);
    }

    #[test]
    fn test_update_is_idempotent() {
        let db = test_db();
        let id = db.create_job(&sample_draft()).unwrap();
        let patch = JobPatch {
            status: Some("offered".to_string()),
            salary: FieldPatch::Set(SalaryInput::Text("120000".to_string())),
            ..Default::default()
        };
        let first = db.update_job(&id, &patch).unwrap();
        let second = db.update_job(&id, &patch).unwrap();
        assert_eq!(first, second);
        assert_eq!(db.get_job(&id).unwrap().unwrap(), first);
    }

    #[test]
    fn test_delete_twice() {
        let db = test_db();
        let id = db.create_job(&sample_draft()).unwrap();
        assert!(db.delete_job(&id).unwrap());
        assert!(db.list_jobs().unwrap().is_empty());
        assert!(!db.delete_job(&id).unwrap());
    }

    #[test]
    fn test_delete_malformed_id_is_not_found() {
        let db = test_db();
        assert!(!db.delete_job("definitely-not-a-rowid").unwrap());
    }

    #[test]
    fn test_count_tracks_list() {
        let db = test_db();
        assert_eq!(db.count_jobs().unwrap(), 0);
        assert!(db.list_jobs().unwrap().is_empty());

        let a = db.create_job(&sample_draft()).unwrap();
        let _b = db.create_job(&sample_draft()).unwrap();
        assert_eq!(db.count_jobs().unwrap() as usize, db.list_jobs().unwrap().len());
        assert_eq!(db.count_jobs().unwrap(), 2);

        db.delete_job(&a).unwrap();
        assert_eq!(db.count_jobs().unwrap() as usize, db.list_jobs().unwrap().len());
        assert_eq!(db.count_jobs().unwrap(), 1);
    }

    #[test]
    fn test_ids_are_unique_and_stable() {
        let db = test_db();
        let a = db.create_job(&sample_draft()).unwrap();
        let b = db.create_job(&sample_draft()).unwrap();
        assert_ne!(a, b);
        let patch = JobPatch {
            status: Some("rejected".to_string()),
            ..Default::default()
        };
        assert_eq!(db.update_job(&a, &patch).unwrap().id, a);
    }
}
