use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Admin Router Module
///
/// Routes exclusively accessible to users with the admin role, nested under
/// `/api/admin`. Each handler authenticates via the `AuthUser` extractor and
/// then runs the explicit role check through the authorization gate.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /api/admin/stats
        // Dashboard counters (total posts, users, comments).
        .route("/stats", get(handlers::get_admin_stats))
}
