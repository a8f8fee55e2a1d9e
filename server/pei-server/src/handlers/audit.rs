//! Audit trail query endpoint, admin/education-secretary only.

use crate::{
    error::{api_paginated, ApiResponse, ApiResult},
    handlers::enforce,
    middleware::AuthContext,
    server::PeiCollabServer,
};
use access_engine::{Action, Actor};
use audit_engine::{ActionKind, AuditEntry, AuditQuery, EntityType};
use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct AuditQueryParams {
    pub entity_type: Option<EntityType>,
    pub entity_id: Option<Uuid>,
    pub actor_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// GET /audit?entity_type=&entity_id=&actor_id=&from=&to=
pub async fn query_audit(
    State(server): State<PeiCollabServer>,
    Query(params): Query<AuditQueryParams>,
    auth: AuthContext,
) -> ApiResult<Json<ApiResponse<Vec<AuditEntry>>>> {
    let actor = Actor::Principal(auth.principal.clone());
    enforce(
        &server,
        &actor,
        server
            .access
            .authorize_tenant(&actor, Action::ReadAudit, auth.principal.tenant_id),
        ActionKind::QueryAuditLog,
        EntityType::AuditLog,
        Uuid::nil(),
    )
    .await?;

    let page = params.page.unwrap_or(1).max(1);
    let page_size = params.page_size.unwrap_or(50).clamp(1, 200);
    let filter = AuditQuery {
        entity_type: params.entity_type,
        entity_id: params.entity_id,
        actor_id: params.actor_id,
        from: params.from,
        to: params.to,
        offset: ((page - 1) as usize) * page_size as usize,
        limit: Some(page_size as usize),
    };

    let entries = server.audit.query(&filter).await?;
    server
        .audit
        .record(AuditEntry::success(
            actor.audit_id(),
            ActionKind::QueryAuditLog,
            EntityType::AuditLog,
            Uuid::nil(),
        ))
        .await;

    Ok(api_paginated(entries, page, page_size))
}
