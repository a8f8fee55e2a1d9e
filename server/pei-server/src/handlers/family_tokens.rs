//! Family token endpoints: issue (admin/coordinator-scoped) and revoke.

use crate::{
    error::{api_success, ApiError, ApiResponse, ApiResult},
    handlers::enforce,
    middleware::AuthContext,
    server::PeiCollabServer,
};
use access_engine::{Action, Actor};
use audit_engine::{ActionKind, AuditEntry, EntityType};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use token_service::AccessToken;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct IssueTokenRequest {
    pub ttl_seconds: i64,
    /// Revoke any live token for the student before issuing.
    #[serde(default)]
    pub regenerate: bool,
}

/// POST /students/:id/family-tokens
pub async fn issue_token(
    State(server): State<PeiCollabServer>,
    Path(student_id): Path<Uuid>,
    auth: AuthContext,
    Json(request): Json<IssueTokenRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<AccessToken>>)> {
    let student = server.directory.student(student_id)?;
    let actor = Actor::Principal(auth.principal);
    enforce(
        &server,
        &actor,
        server
            .access
            .authorize(&actor, Action::ManageFamilyAccess, &student),
        ActionKind::IssueFamilyToken,
        EntityType::Student,
        student.id,
    )
    .await?;

    let ttl = chrono::Duration::seconds(request.ttl_seconds);
    let token = if request.regenerate {
        server.tokens.reissue(student_id, actor.audit_id(), ttl)?
    } else {
        server.tokens.issue(student_id, actor.audit_id(), ttl)?
    };
    server
        .audit
        .record(AuditEntry::success(
            actor.audit_id(),
            ActionKind::IssueFamilyToken,
            EntityType::FamilyToken,
            token.id,
        ))
        .await;

    Ok((StatusCode::CREATED, api_success(token)))
}

/// DELETE /family-tokens/:token_id
///
/// Idempotent: revoking an already-revoked or expired token succeeds.
pub async fn revoke_token(
    State(server): State<PeiCollabServer>,
    Path(token_id): Path<Uuid>,
    auth: AuthContext,
) -> ApiResult<Json<ApiResponse<Value>>> {
    let token = server
        .tokens
        .get(token_id)
        .ok_or_else(|| ApiError::not_found("family_token"))?;
    let student = server.directory.student(token.student_id)?;
    let actor = Actor::Principal(auth.principal);
    enforce(
        &server,
        &actor,
        server
            .access
            .authorize(&actor, Action::ManageFamilyAccess, &student),
        ActionKind::RevokeFamilyToken,
        EntityType::FamilyToken,
        token_id,
    )
    .await?;

    server.tokens.revoke(token_id, actor.audit_id())?;
    server
        .audit
        .record(AuditEntry::success(
            actor.audit_id(),
            ActionKind::RevokeFamilyToken,
            EntityType::FamilyToken,
            token_id,
        ))
        .await;

    Ok(api_success(json!({ "revoked": true })))
}
