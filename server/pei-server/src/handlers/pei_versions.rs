//! PEI version endpoints: create, read active, list, compare.
//!
//! Every handler follows the same shape: resolve the student, authorize
//! through the access engine, perform the operation, record the audit
//! entry. Denials are recorded too (see `enforce`).

use crate::{
    error::{api_paginated, api_success, ApiError, ApiResponse, ApiResult},
    handlers::enforce,
    middleware::AuthContext,
    server::PeiCollabServer,
    types::PaginationParams,
};
use access_engine::{Action, Actor};
use audit_engine::{ActionKind, AuditEntry, EntityType};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use record_store::{diff_payloads, PeiPayload, PeiVersion, VersionDiff};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

/// Create PEI Version request. Each section is a free-form JSON document;
/// missing sections default to empty objects.
#[derive(Debug, Deserialize)]
pub struct CreateVersionRequest {
    pub diagnosis: Option<Value>,
    pub planning: Option<Value>,
    pub evaluation: Option<Value>,
}

impl CreateVersionRequest {
    fn into_payload(self) -> PeiPayload {
        PeiPayload::new(
            self.diagnosis.unwrap_or_else(|| json!({})),
            self.planning.unwrap_or_else(|| json!({})),
            self.evaluation.unwrap_or_else(|| json!({})),
        )
    }
}

/// POST /students/:id/pei-versions
pub async fn create_version(
    State(server): State<PeiCollabServer>,
    Path(student_id): Path<Uuid>,
    auth: AuthContext,
    Json(request): Json<CreateVersionRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<PeiVersion>>)> {
    let student = server.directory.student(student_id)?;
    let actor = Actor::Principal(auth.principal);
    enforce(
        &server,
        &actor,
        server.access.authorize(&actor, Action::WritePei, &student),
        ActionKind::CreatePeiVersion,
        EntityType::Student,
        student.id,
    )
    .await?;

    let payload = request.into_payload();
    // Changed-fields summary relative to the version being retired; a
    // first version reports every section.
    let changed_fields = match server.records.get_active(student_id).await {
        Ok(prior) => diff_payloads(&prior.payload, &payload)
            .into_iter()
            .map(|change| change.field)
            .collect(),
        Err(_) => vec![
            "diagnosis".to_string(),
            "planning".to_string(),
            "evaluation".to_string(),
        ],
    };

    let version = server
        .records
        .create_version(student_id, actor.audit_id(), payload)
        .await?;
    server
        .audit
        .record(
            AuditEntry::success(
                actor.audit_id(),
                ActionKind::CreatePeiVersion,
                EntityType::PeiVersion,
                version.id,
            )
            .with_changed_fields(changed_fields),
        )
        .await;

    Ok((StatusCode::CREATED, api_success(version)))
}

#[derive(Debug, Deserialize)]
pub struct ActiveVersionQuery {
    pub access_token: Option<String>,
}

/// GET /students/:id/pei-versions/active
///
/// Reachable by an authenticated principal, or by a family holding a
/// valid access token passed as `?access_token=`.
pub async fn get_active_version(
    State(server): State<PeiCollabServer>,
    Path(student_id): Path<Uuid>,
    Query(query): Query<ActiveVersionQuery>,
    auth: Option<AuthContext>,
) -> ApiResult<Json<ApiResponse<PeiVersion>>> {
    let student = server.directory.student(student_id)?;

    let actor = match query.access_token {
        Some(secret) => match server.tokens.validate(&secret) {
            Ok(token) => {
                server
                    .audit
                    .record(AuditEntry::success(
                        token.id,
                        ActionKind::ValidateFamilyToken,
                        EntityType::FamilyToken,
                        token.id,
                    ))
                    .await;
                Actor::FamilyToken {
                    token_id: token.id,
                    student_id: token.student_id,
                }
            }
            Err(err) => {
                server
                    .audit
                    .record(AuditEntry::denied(
                        Uuid::nil(),
                        ActionKind::ValidateFamilyToken,
                        EntityType::Student,
                        student_id,
                    ))
                    .await;
                return Err(err.into());
            }
        },
        None => {
            let auth =
                auth.ok_or_else(|| ApiError::authentication("Missing Authorization header"))?;
            Actor::Principal(auth.principal)
        }
    };

    enforce(
        &server,
        &actor,
        server.access.authorize(&actor, Action::ReadPei, &student),
        ActionKind::ReadActivePei,
        EntityType::Student,
        student.id,
    )
    .await?;

    let version = server.records.get_active(student_id).await?;
    server
        .audit
        .record(AuditEntry::success(
            actor.audit_id(),
            ActionKind::ReadActivePei,
            EntityType::PeiVersion,
            version.id,
        ))
        .await;

    Ok(api_success(version))
}

/// GET /students/:id/pei-versions
pub async fn list_versions(
    State(server): State<PeiCollabServer>,
    Path(student_id): Path<Uuid>,
    Query(pagination): Query<PaginationParams>,
    auth: AuthContext,
) -> ApiResult<Json<ApiResponse<Vec<PeiVersion>>>> {
    let student = server.directory.student(student_id)?;
    let actor = Actor::Principal(auth.principal);
    enforce(
        &server,
        &actor,
        server.access.authorize(&actor, Action::ReadPei, &student),
        ActionKind::ListPeiVersions,
        EntityType::Student,
        student.id,
    )
    .await?;

    let versions = server
        .records
        .list_versions(
            student_id,
            pagination.offset(),
            Some(pagination.page_size() as usize),
        )
        .await?;
    server
        .audit
        .record(AuditEntry::success(
            actor.audit_id(),
            ActionKind::ListPeiVersions,
            EntityType::Student,
            student.id,
        ))
        .await;

    Ok(api_paginated(
        versions,
        pagination.page(),
        pagination.page_size(),
    ))
}

#[derive(Debug, Deserialize)]
pub struct CompareQuery {
    pub from: u32,
    pub to: u32,
}

/// GET /students/:id/pei-versions/compare?from=&to=
pub async fn compare_versions(
    State(server): State<PeiCollabServer>,
    Path(student_id): Path<Uuid>,
    Query(query): Query<CompareQuery>,
    auth: AuthContext,
) -> ApiResult<Json<ApiResponse<VersionDiff>>> {
    let student = server.directory.student(student_id)?;
    let actor = Actor::Principal(auth.principal);
    enforce(
        &server,
        &actor,
        server.access.authorize(&actor, Action::ReadPei, &student),
        ActionKind::ComparePeiVersions,
        EntityType::Student,
        student.id,
    )
    .await?;

    let diff = server
        .records
        .compare_versions(student_id, query.from, query.to)
        .await?;
    server
        .audit
        .record(AuditEntry::success(
            actor.audit_id(),
            ActionKind::ComparePeiVersions,
            EntityType::Student,
            student.id,
        ))
        .await;

    Ok(api_success(diff))
}
