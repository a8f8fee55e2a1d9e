use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Audit storage error: {0}")]
    Storage(String),

    #[error("Audit worker is no longer running")]
    WorkerGone,
}

pub type Result<T> = std::result::Result<T, AuditError>;
