use access_engine::DenyReason;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

/// Standard API error response structure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Error type/code
    pub error_type: String,
    /// Human-readable error message
    pub message: String,
    /// Timestamp when the error occurred
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Standard API success response wrapper.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationInfo>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaginationInfo {
    pub page: u32,
    pub page_size: u32,
    pub returned: usize,
}

/// Main API error enum. One variant per taxonomy entry; the status map
/// below is the single source of truth for HTTP codes.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Authentication error: {message}")]
    Authentication { message: String },

    #[error("Authorization error: {message}")]
    Authorization { message: String },

    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error("Resource conflict: {message}")]
    Conflict { message: String },

    #[error("Access token expired")]
    TokenExpired,

    #[error("Access token revoked")]
    TokenRevoked,

    #[error("Service unavailable: {message}")]
    ServiceUnavailable { message: String },

    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::Authorization {
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::Authentication { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Authorization { .. } => StatusCode::FORBIDDEN,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::TokenExpired => StatusCode::UNAUTHORIZED,
            ApiError::TokenRevoked => StatusCode::FORBIDDEN,
            ApiError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error type string.
    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "validation_error",
            ApiError::Authentication { .. } => "authentication_error",
            ApiError::Authorization { .. } => "authorization_error",
            ApiError::NotFound { .. } => "not_found",
            ApiError::Conflict { .. } => "conflict",
            ApiError::TokenExpired => "token_expired",
            ApiError::TokenRevoked => "token_revoked",
            ApiError::ServiceUnavailable { .. } => "service_unavailable",
            ApiError::Internal { .. } => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error_id = Uuid::new_v4().to_string();
        let status_code = self.status_code();

        error!(
            error_id = %error_id,
            error_type = %self.error_type(),
            status_code = %status_code.as_u16(),
            error = %self,
            "API error occurred"
        );

        let error_response = ApiErrorResponse {
            error_id,
            error_type: self.error_type().to_string(),
            message: self.to_string(),
            timestamp: chrono::Utc::now(),
        };

        (status_code, Json(error_response)).into_response()
    }
}

impl From<tenant_directory::DirectoryError> for ApiError {
    fn from(err: tenant_directory::DirectoryError) -> Self {
        use tenant_directory::DirectoryError as E;
        match err {
            E::NotFound { entity, .. } => ApiError::not_found(entity),
            E::Validation(message) => ApiError::validation(message),
            E::Conflict(message) => ApiError::conflict(message),
        }
    }
}

impl From<record_store::RecordStoreError> for ApiError {
    fn from(err: record_store::RecordStoreError) -> Self {
        use record_store::RecordStoreError as E;
        match err {
            E::NoVersions(_) => ApiError::not_found("pei_version"),
            E::VersionNotFound { .. } => ApiError::not_found("pei_version"),
            E::Conflict(message) => ApiError::conflict(message),
            E::Validation(message) => ApiError::validation(message),
            E::Persistence(message) => ApiError::ServiceUnavailable { message },
        }
    }
}

impl From<token_service::TokenError> for ApiError {
    fn from(err: token_service::TokenError) -> Self {
        use token_service::TokenError as E;
        match err {
            E::InvalidTtl(message) => ApiError::validation(message),
            E::NotFound => ApiError::not_found("family_token"),
            E::Expired => ApiError::TokenExpired,
            E::Revoked => ApiError::TokenRevoked,
        }
    }
}

impl From<audit_engine::AuditError> for ApiError {
    fn from(err: audit_engine::AuditError) -> Self {
        ApiError::internal(err.to_string())
    }
}

impl From<DenyReason> for ApiError {
    fn from(reason: DenyReason) -> Self {
        ApiError::authorization(reason.to_string())
    }
}

/// Helper function to create successful API responses.
pub fn api_success<T>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data,
        pagination: None,
    })
}

/// Helper function to create paginated responses.
pub fn api_paginated<T>(data: Vec<T>, page: u32, page_size: u32) -> Json<ApiResponse<Vec<T>>> {
    let returned = data.len();
    Json(ApiResponse {
        success: true,
        data,
        pagination: Some(PaginationInfo {
            page,
            page_size,
            returned,
        }),
    })
}

/// Type alias for API results.
pub type ApiResult<T> = Result<T, ApiError>;
