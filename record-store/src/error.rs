use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum RecordStoreError {
    #[error("No PEI versions found for student {0}")]
    NoVersions(Uuid),

    #[error("Version {version} not found for student {student_id}")]
    VersionNotFound { student_id: Uuid, version: u32 },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Persistence failure: {0}")]
    Persistence(String),
}

impl RecordStoreError {
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence(message.into())
    }

    /// Transient failures worth retrying on the primary write path.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }
}

pub type Result<T> = std::result::Result<T, RecordStoreError>;
