use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// Defines the routes accessible to any user who has passed the
/// authentication layer: post creation and mutation, commenting, and the
/// caller's own profile.
///
/// Access Control Strategy:
/// Every handler here relies on the `AuthUser` extractor middleware applied
/// on the router layer above this module, which guarantees a validated
/// identity. The ownership checks in `update_post` and `delete_post` run
/// against that identity, strictly after the existence check.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /api/auth/me
        // The authenticated caller's password-stripped profile.
        .route("/api/auth/me", get(handlers::get_me))
        // POST /api/posts
        // Multipart post creation (title, content, optional image upload).
        .route("/api/posts", post(handlers::create_post))
        // PUT/DELETE /api/posts/{id}
        // Owner-only mutation of an existing post.
        .route(
            "/api/posts/{id}",
            put(handlers::update_post).delete(handlers::delete_post),
        )
        // POST /api/posts/{id}/comments
        // Appends a comment; returns the full updated post.
        .route("/api/posts/{id}/comments", post(handlers::add_comment))
}
