//! PEI Collab Engine HTTP server
//!
//! The external surface of the core: versioned PEI records, row-level
//! access control, the audit trail and time-boxed family tokens. The UI
//! layer is an external collaborator that only consumes these APIs.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod types;

pub use config::EngineConfig;
pub use error::{ApiError, ApiResult};
pub use server::PeiCollabServer;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Create the application router with all routes and middleware.
pub fn create_app(server: PeiCollabServer) -> Router {
    routes::create_routes()
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::create_cors_layer()),
        )
        .with_state(server)
}
