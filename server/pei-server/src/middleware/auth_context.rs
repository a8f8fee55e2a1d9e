//! Authentication context extraction
//!
//! Resolves the `Authorization: Bearer <principal-id>` credential against
//! the directory. Token exchange and session mechanics belong to the outer
//! surface; the core's contract is that an authenticated principal id
//! reaches it and resolves to a live directory record.

use crate::{error::ApiError, server::PeiCollabServer};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tenant_directory::Principal;
use uuid::Uuid;

/// The authenticated principal behind a request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub principal: Principal,
}

fn extract_bearer(parts: &Parts) -> Result<Uuid, ApiError> {
    let auth_header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::authentication("Missing Authorization header"))?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        ApiError::authentication("Invalid Authorization header format. Expected: Bearer <token>")
    })?;

    Uuid::parse_str(token.trim())
        .map_err(|_| ApiError::authentication("Malformed principal credential"))
}

#[async_trait]
impl FromRequestParts<PeiCollabServer> for AuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &PeiCollabServer,
    ) -> Result<Self, Self::Rejection> {
        let principal_id = extract_bearer(parts)?;
        let principal = state
            .directory
            .principal(principal_id)
            .map_err(|_| ApiError::authentication("Unknown principal"))?;
        Ok(AuthContext { principal })
    }
}
