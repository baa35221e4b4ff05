use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Core Application Schemas ---

/// Role
///
/// The fixed role enumeration used by the authorization gate. Stored in the
/// database as lowercase text and serialized the same way on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    #[default]
    Member,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Admin => "admin",
        }
    }

    /// Maps the stored text form back to the enumeration. Unknown values
    /// (a migration gone wrong, manual edits) fall back to the least
    /// privileged role.
    pub fn from_str_or_member(s: &str) -> Self {
        match s {
            "admin" => Role::Admin,
            _ => Role::Member,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User
///
/// The password-stripped public view of a user record. This is the shape
/// attached to authenticated requests and returned by the profile endpoint;
/// the password hash never leaves the repository layer.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    // Avatar image filename, served from the uploads directory.
    pub avatar: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// UserSummary
///
/// The author fields joined into post and comment responses (the original
/// API's `populate('author', 'name avatar')`).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub avatar: String,
}

/// Post
///
/// A post as returned by the listing endpoint: author joined in, comments
/// omitted.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    // Featured image filename under /uploads; the placeholder when no upload
    // was provided at creation.
    pub featured_image: String,
    pub author: UserSummary,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Comment
///
/// A comment with its author joined in. Comments are append-only sub-records
/// of a post; the API never edits or deletes them individually.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Comment {
    pub id: i64,
    pub user: UserSummary,
    pub content: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// PostDetail
///
/// The single-post view: author joined in plus the full comment list,
/// newest comment first.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PostDetail {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub featured_image: String,
    pub author: UserSummary,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub comments: Vec<Comment>,
}

/// PostRecord
///
/// The raw post row without any joins. Loaded by the mutation handlers to
/// confirm existence and run the ownership check before touching the record.
#[derive(Debug, Clone, FromRow, Default)]
pub struct PostRecord {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
    pub featured_image: String,
    pub created_at: DateTime<Utc>,
}

// --- Internal Write Payloads ---

/// NewPost
///
/// Repository input for post creation, assembled by the create handler from
/// the multipart form. The author is always the authenticated caller and is
/// immutable after creation.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
    pub featured_image: String,
}

/// NewUser
///
/// Repository input for registration. Carries the argon2 hash, never the
/// plaintext password.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub avatar: String,
}

/// StoredCredentials
///
/// The minimal record the login handler needs to verify a password. Kept
/// separate from `User` so the hash never rides along on profile lookups.
#[derive(Debug, Clone)]
pub struct StoredCredentials {
    pub id: Uuid,
    pub password_hash: String,
}

// --- Request Payloads (Input Schemas) ---

/// UpdatePostRequest
///
/// Partial update payload for PUT /api/posts/{id}. All fields are `Option<T>`
/// with `skip_serializing_if`, so only provided fields are overridden.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdatePostRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured_image: Option<String>,
}

/// CreateCommentRequest
///
/// Input payload for posting a new comment.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateCommentRequest {
    pub content: String,
}

/// RegisterRequest
///
/// Input payload for the public registration endpoint. New accounts are
/// always created with the member role; admin accounts are provisioned out
/// of band.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// LoginRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

// --- Response Envelopes ---

/// ApiResponse
///
/// The standard success envelope: `{success: true, data}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// ListResponse
///
/// The listing envelope: `{success: true, count, data}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse<T> {
    pub success: bool,
    pub count: usize,
    pub data: Vec<T>,
}

impl<T> ListResponse<T> {
    pub fn ok(data: Vec<T>) -> Self {
        Self {
            success: true,
            count: data.len(),
            data,
        }
    }
}

/// TokenResponse
///
/// Returned by register and login: `{success: true, token}`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct TokenResponse {
    pub success: bool,
    pub token: String,
}

/// Empty
///
/// Serializes to `{}`; the delete endpoint's success payload.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Empty {}

// --- Dashboard Schemas (Output) ---

/// DashboardStats
///
/// Output schema for the admin statistics endpoint (GET /api/admin/stats).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct DashboardStats {
    pub total_posts: i64,
    pub total_users: i64,
    pub total_comments: i64,
}
