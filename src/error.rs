use thiserror::Error;

/// Errors surfaced by the diary core and its collaborators.
#[derive(Debug, Error)]
pub enum DiaryError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    Conflict(String),

    #[error("Failed to save: {0}")]
    Persist(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Upstream service error: {0}")]
    Upstream(String),
}

impl DiaryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DiaryError::NotFound(_))
    }
}

impl From<anyhow::Error> for DiaryError {
    fn from(err: anyhow::Error) -> Self {
        DiaryError::Storage(format!("{err:#}"))
    }
}

/// Failure reported by a persist callback. Only the reason is kept; the
/// coordinator shows it to the user and waits for the next attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct PersistError {
    pub reason: String,
}

impl PersistError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl From<DiaryError> for PersistError {
    fn from(err: DiaryError) -> Self {
        PersistError::new(err.to_string())
    }
}
