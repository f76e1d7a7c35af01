use thiserror::Error;

/// Repository error taxonomy. Validation never reaches the store, NotFound
/// targets a missing record, Storage wraps the underlying store failure.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("no job application with id '{0}'")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl RepoError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        RepoError::Validation {
            field,
            message: message.into(),
        }
    }
}
