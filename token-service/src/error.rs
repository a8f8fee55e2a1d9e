use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Invalid TTL: {0}")]
    InvalidTtl(String),

    #[error("Token not found")]
    NotFound,

    #[error("Token has expired")]
    Expired,

    #[error("Token has been revoked")]
    Revoked,
}

pub type Result<T> = std::result::Result<T, TokenError>;
