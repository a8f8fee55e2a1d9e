//! Directory endpoints: tenants, principals, students, staff assignment
//! and guardianship. Registration is open (accounts start pending);
//! everything else is directory-management scoped.

use crate::{
    error::{api_success, ApiResponse, ApiResult},
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
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tenant_directory::{Principal, Role, Student, Tenant, TenantKind};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateTenantRequest {
    pub parent_id: Option<Uuid>,
    pub kind: TenantKind,
    pub name: String,
}

/// POST /tenants
pub async fn create_tenant(
    State(server): State<PeiCollabServer>,
    auth: AuthContext,
    Json(request): Json<CreateTenantRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Tenant>>)> {
    let actor = Actor::Principal(auth.principal);
    // Creating a root network is a system-wide operation; anything else is
    // scoped to the parent node.
    let decision = match request.parent_id {
        Some(parent_id) => server
            .access
            .authorize_tenant(&actor, Action::ManageDirectory, parent_id),
        None => server.access.authorize_system(&actor, Action::ManageDirectory),
    };
    enforce(
        &server,
        &actor,
        decision,
        ActionKind::CreateTenant,
        EntityType::Tenant,
        request.parent_id.unwrap_or_else(Uuid::nil),
    )
    .await?;

    let tenant = server
        .directory
        .create_tenant(request.parent_id, request.kind, request.name)?;
    server
        .audit
        .record(AuditEntry::success(
            actor.audit_id(),
            ActionKind::CreateTenant,
            EntityType::Tenant,
            tenant.id,
        ))
        .await;

    Ok((StatusCode::CREATED, api_success(tenant)))
}

#[derive(Debug, Deserialize)]
pub struct RegisterPrincipalRequest {
    pub tenant_id: Uuid,
    pub role: Role,
    pub display_name: String,
}

/// POST /principals
///
/// Open registration: the principal starts `Pending` and is unusable
/// until approved by a directory manager.
pub async fn register_principal(
    State(server): State<PeiCollabServer>,
    Json(request): Json<RegisterPrincipalRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Principal>>)> {
    let principal = server.directory.register_principal(
        request.tenant_id,
        request.role,
        request.display_name,
    )?;
    server
        .audit
        .record(AuditEntry::success(
            principal.id,
            ActionKind::RegisterPrincipal,
            EntityType::Principal,
            principal.id,
        ))
        .await;

    Ok((StatusCode::CREATED, api_success(principal)))
}

/// POST /principals/:id/approve
pub async fn approve_principal(
    State(server): State<PeiCollabServer>,
    Path(principal_id): Path<Uuid>,
    auth: AuthContext,
) -> ApiResult<Json<ApiResponse<Principal>>> {
    let target = server.directory.principal(principal_id)?;
    let actor = Actor::Principal(auth.principal);
    enforce(
        &server,
        &actor,
        server
            .access
            .authorize_tenant(&actor, Action::ManageDirectory, target.tenant_id),
        ActionKind::ApprovePrincipal,
        EntityType::Principal,
        principal_id,
    )
    .await?;

    let approved = server.directory.approve_principal(principal_id)?;
    server
        .audit
        .record(
            AuditEntry::success(
                actor.audit_id(),
                ActionKind::ApprovePrincipal,
                EntityType::Principal,
                principal_id,
            )
            .with_changed_fields(vec!["status".to_string()]),
        )
        .await;

    Ok(api_success(approved))
}

/// POST /principals/:id/suspend
pub async fn suspend_principal(
    State(server): State<PeiCollabServer>,
    Path(principal_id): Path<Uuid>,
    auth: AuthContext,
) -> ApiResult<Json<ApiResponse<Principal>>> {
    let target = server.directory.principal(principal_id)?;
    let actor = Actor::Principal(auth.principal);
    enforce(
        &server,
        &actor,
        server
            .access
            .authorize_tenant(&actor, Action::ManageDirectory, target.tenant_id),
        ActionKind::SuspendPrincipal,
        EntityType::Principal,
        principal_id,
    )
    .await?;

    let suspended = server.directory.suspend_principal(principal_id)?;
    server
        .audit
        .record(
            AuditEntry::success(
                actor.audit_id(),
                ActionKind::SuspendPrincipal,
                EntityType::Principal,
                principal_id,
            )
            .with_changed_fields(vec!["status".to_string()]),
        )
        .await;

    Ok(api_success(suspended))
}

#[derive(Debug, Deserialize)]
pub struct CreateStudentRequest {
    pub name: String,
    pub tenant_id: Uuid,
    pub enrolled_at: Option<DateTime<Utc>>,
}

/// POST /students
pub async fn create_student(
    State(server): State<PeiCollabServer>,
    auth: AuthContext,
    Json(request): Json<CreateStudentRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Student>>)> {
    let actor = Actor::Principal(auth.principal);
    enforce(
        &server,
        &actor,
        server
            .access
            .authorize_tenant(&actor, Action::ManageDirectory, request.tenant_id),
        ActionKind::CreateStudent,
        EntityType::Tenant,
        request.tenant_id,
    )
    .await?;

    let student = server.directory.create_student(
        request.name,
        request.tenant_id,
        request.enrolled_at.unwrap_or_else(Utc::now),
    )?;
    server
        .audit
        .record(AuditEntry::success(
            actor.audit_id(),
            ActionKind::CreateStudent,
            EntityType::Student,
            student.id,
        ))
        .await;

    Ok((StatusCode::CREATED, api_success(student)))
}

#[derive(Debug, Deserialize)]
pub struct EnrollStudentRequest {
    pub tenant_id: Uuid,
    pub at: Option<DateTime<Utc>>,
}

/// POST /students/:id/enrollments
pub async fn enroll_student(
    State(server): State<PeiCollabServer>,
    Path(student_id): Path<Uuid>,
    auth: AuthContext,
    Json(request): Json<EnrollStudentRequest>,
) -> ApiResult<Json<ApiResponse<Student>>> {
    let actor = Actor::Principal(auth.principal);
    enforce(
        &server,
        &actor,
        server
            .access
            .authorize_tenant(&actor, Action::ManageDirectory, request.tenant_id),
        ActionKind::EnrollStudent,
        EntityType::Student,
        student_id,
    )
    .await?;

    let student = server.directory.enroll_student(
        student_id,
        request.tenant_id,
        request.at.unwrap_or_else(Utc::now),
    )?;
    server
        .audit
        .record(
            AuditEntry::success(
                actor.audit_id(),
                ActionKind::EnrollStudent,
                EntityType::Student,
                student_id,
            )
            .with_changed_fields(vec!["tenant_id".to_string(), "enrollments".to_string()]),
        )
        .await;

    Ok(api_success(student))
}

#[derive(Debug, Deserialize)]
pub struct StudentLinkRequest {
    pub principal_id: Uuid,
}

/// POST /students/:id/staff
pub async fn assign_staff(
    State(server): State<PeiCollabServer>,
    Path(student_id): Path<Uuid>,
    auth: AuthContext,
    Json(request): Json<StudentLinkRequest>,
) -> ApiResult<Json<ApiResponse<serde_json::Value>>> {
    let student = server.directory.student(student_id)?;
    let actor = Actor::Principal(auth.principal);
    enforce(
        &server,
        &actor,
        server
            .access
            .authorize_tenant(&actor, Action::ManageDirectory, student.tenant_id),
        ActionKind::AssignStaff,
        EntityType::Student,
        student_id,
    )
    .await?;

    server.directory.assign_staff(student_id, request.principal_id)?;
    server
        .audit
        .record(AuditEntry::success(
            actor.audit_id(),
            ActionKind::AssignStaff,
            EntityType::Student,
            student_id,
        ))
        .await;

    Ok(api_success(serde_json::json!({ "assigned": true })))
}

/// POST /students/:id/guardians
pub async fn link_guardian(
    State(server): State<PeiCollabServer>,
    Path(student_id): Path<Uuid>,
    auth: AuthContext,
    Json(request): Json<StudentLinkRequest>,
) -> ApiResult<Json<ApiResponse<serde_json::Value>>> {
    let student = server.directory.student(student_id)?;
    let actor = Actor::Principal(auth.principal);
    enforce(
        &server,
        &actor,
        server
            .access
            .authorize_tenant(&actor, Action::ManageDirectory, student.tenant_id),
        ActionKind::LinkGuardian,
        EntityType::Student,
        student_id,
    )
    .await?;

    server
        .directory
        .link_guardian(student_id, request.principal_id)?;
    server
        .audit
        .record(AuditEntry::success(
            actor.audit_id(),
            ActionKind::LinkGuardian,
            EntityType::Student,
            student_id,
        ))
        .await;

    Ok(api_success(serde_json::json!({ "linked": true })))
}
