use crate::{
    handlers::{audit, directory, family_tokens, health, pei_versions},
    server::PeiCollabServer,
};
use axum::{
    routing::{delete, get, post},
    Router,
};

/// Create health check routes.
pub fn health_routes() -> Router<PeiCollabServer> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/version", get(health::version_info))
}

/// Create directory management routes.
pub fn directory_routes() -> Router<PeiCollabServer> {
    Router::new()
        .route("/tenants", post(directory::create_tenant))
        .route("/principals", post(directory::register_principal))
        .route("/principals/:id/approve", post(directory::approve_principal))
        .route("/principals/:id/suspend", post(directory::suspend_principal))
        .route("/students", post(directory::create_student))
        .route("/students/:id/enrollments", post(directory::enroll_student))
        .route("/students/:id/staff", post(directory::assign_staff))
        .route("/students/:id/guardians", post(directory::link_guardian))
}

/// Create PEI version routes.
pub fn pei_version_routes() -> Router<PeiCollabServer> {
    Router::new()
        .route(
            "/students/:id/pei-versions",
            post(pei_versions::create_version).get(pei_versions::list_versions),
        )
        .route(
            "/students/:id/pei-versions/active",
            get(pei_versions::get_active_version),
        )
        .route(
            "/students/:id/pei-versions/compare",
            get(pei_versions::compare_versions),
        )
}

/// Create family token routes.
pub fn family_token_routes() -> Router<PeiCollabServer> {
    Router::new()
        .route("/students/:id/family-tokens", post(family_tokens::issue_token))
        .route("/family-tokens/:token_id", delete(family_tokens::revoke_token))
}

/// Create audit trail routes.
pub fn audit_routes() -> Router<PeiCollabServer> {
    Router::new().route("/audit", get(audit::query_audit))
}

/// Assemble every route group.
pub fn create_routes() -> Router<PeiCollabServer> {
    Router::new()
        .merge(health_routes())
        .merge(directory_routes())
        .merge(pei_version_routes())
        .merge(family_token_routes())
        .merge(audit_routes())
}
