//! HTTP adapter: translates the JSON wire format into repository calls and
//! repository outcomes into status codes. No logic of its own beyond that
//! translation.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer};
use serde_json::{Value, json};

use crate::db::Database;
use crate::error::RepoError;
use crate::models::{DateInput, FieldPatch, JobApplication, JobDraft, JobPatch, SalaryInput};

pub fn router(db: Arc<Database>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/jobs/", post(create_job).get(list_jobs))
        .route("/jobs/:id", put(update_job).delete(delete_job))
        .with_state(db)
}

/// Repository outcomes rendered as HTTP responses: validation 400,
/// not-found 404, store failure 500.
pub struct ApiError(RepoError);

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self.0 {
            RepoError::Validation { .. } => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", self.0.to_string())
            }
            RepoError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", self.0.to_string()),
            RepoError::Storage(e) => {
                tracing::error!("Storage error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "A storage error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

/// GET /health
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "jobtrack"
    }))
}

/// Salary on the wire: a JSON number or a numeric string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SalaryField {
    Number(f64),
    Text(String),
}

impl From<SalaryField> for SalaryInput {
    fn from(field: SalaryField) -> Self {
        match field {
            SalaryField::Number(n) => SalaryInput::Number(n),
            SalaryField::Text(s) => SalaryInput::Text(s),
        }
    }
}

/// Decides the discriminated date input at the adapter boundary: timestamp
/// strings become structured date-times, anything else stays raw text for
/// the strict YYYY-MM-DD rule.
fn date_input_from_wire(raw: &str) -> DateInput {
    let trimmed = raw.trim();
    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        return DateInput::DateTime(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return DateInput::DateTime(dt.naive_utc());
    }
    DateInput::Text(trimmed.to_string())
}

#[derive(Debug, Deserialize)]
struct CreateJobRequest {
    company: String,
    position: String,
    status: String,
    date_applied: String,
    #[serde(default)]
    salary: Option<SalaryField>,
    #[serde(default)]
    job_url: Option<String>,
    #[serde(default)]
    remarks: Option<String>,
}

impl CreateJobRequest {
    fn into_draft(self) -> JobDraft {
        JobDraft {
            company: self.company,
            position: self.position,
            status: self.status,
            date_applied: date_input_from_wire(&self.date_applied),
            salary: self.salary.map(Into::into),
            job_url: self.job_url,
            remarks: self.remarks,
        }
    }
}

/// Distinguishes "field absent" (outer None) from "field explicitly null"
/// (inner None) during deserialization.
fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}

#[derive(Debug, Default, Deserialize)]
struct UpdateJobRequest {
    company: Option<String>,
    position: Option<String>,
    status: Option<String>,
    date_applied: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    salary: Option<Option<SalaryField>>,
    #[serde(default, deserialize_with = "double_option")]
    job_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    remarks: Option<Option<String>>,
}

impl UpdateJobRequest {
    fn into_patch(self) -> JobPatch {
        JobPatch {
            company: self.company,
            position: self.position,
            status: self.status,
            date_applied: self.date_applied.as_deref().map(date_input_from_wire),
            salary: match self.salary {
                None => FieldPatch::Unchanged,
                Some(None) => FieldPatch::Clear,
                Some(Some(value)) => FieldPatch::Set(value.into()),
            },
            job_url: match self.job_url {
                None => FieldPatch::Unchanged,
                Some(None) => FieldPatch::Clear,
                Some(Some(value)) => FieldPatch::Set(value),
            },
            remarks: match self.remarks {
                None => FieldPatch::Unchanged,
                Some(None) => FieldPatch::Clear,
                Some(Some(value)) => FieldPatch::Set(value),
            },
        }
    }
}

/// POST /jobs/
async fn create_job(
    State(db): State<Arc<Database>>,
    Json(req): Json<CreateJobRequest>,
) -> Result<(StatusCode, Json<JobApplication>), ApiError> {
    let id = db.create_job(&req.into_draft())?;
    let job = db
        .get_job(&id)?
        .ok_or_else(|| RepoError::NotFound(id.clone()))?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /jobs/
async fn list_jobs(
    State(db): State<Arc<Database>>,
) -> Result<Json<Vec<JobApplication>>, ApiError> {
    Ok(Json(db.list_jobs()?))
}

/// PUT /jobs/:id
async fn update_job(
    State(db): State<Arc<Database>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateJobRequest>,
) -> Result<Json<JobApplication>, ApiError> {
    Ok(Json(db.update_job(&id, &req.into_patch())?))
}

/// DELETE /jobs/:id
async fn delete_job(
    State(db): State<Arc<Database>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if db.delete_job(&id)? {
        Ok(Json(json!({ "message": "Job application deleted" })))
    } else {
        Err(RepoError::NotFound(id).into())
    }
}
