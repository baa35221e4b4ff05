use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Defines endpoints that are unauthenticated and accessible to any client:
/// read-only post data, the identity gateway (register/login), and the
/// health probe.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Unauthenticated endpoint for monitoring and load balancer checks.
        .route("/health", get(|| async { "ok" }))
        // POST /api/auth/register
        // Creates a new member account and returns a signed token.
        .route("/api/auth/register", post(handlers::register))
        // POST /api/auth/login
        // Verifies credentials and returns a signed token.
        .route("/api/auth/login", post(handlers::login))
        // GET /api/posts
        // Lists all posts with author info, newest first.
        .route("/api/posts", get(handlers::get_posts))
        // GET /api/posts/{id}
        // Single post with author and comment authors joined in.
        .route("/api/posts/{id}", get(handlers::get_post))
}
