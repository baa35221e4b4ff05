/// Router Module Index
///
/// Organizes the application's routing logic into security-segregated
/// modules, so access control is applied explicitly at the module level (via
/// Axum layers) rather than per-handler ad hoc.

/// Routes accessible to all clients: post reads, registration, login, health.
pub mod public;

/// Routes protected by the `AuthUser` extractor middleware.
/// Requires a validated bearer token (or the local dev bypass).
pub mod authenticated;

/// Routes restricted to users with the admin role. Authentication happens at
/// the extractor; the role check runs through the authorization gate inside
/// the handlers.
pub mod admin;
