pub mod auth_context;

pub use auth_context::AuthContext;

use tower_http::cors::{Any, CorsLayer};

/// Permissive CORS for the UI layer; tightened per deployment.
pub fn create_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}
