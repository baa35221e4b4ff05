use crate::{
    AppState,
    auth::{AuthUser, authorize, create_token},
    error::ApiError,
    models::{
        ApiResponse, CreateCommentRequest, DashboardStats, Empty, ListResponse, LoginRequest,
        NewPost, NewUser, Post, PostDetail, PostRecord, RegisterRequest, Role, TokenResponse,
        UpdatePostRequest, User,
    },
};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
};
use uuid::Uuid;

// Placeholder filenames assigned when no upload is provided.
pub const DEFAULT_FEATURED_IMAGE: &str = "default-blog.jpg";
pub const DEFAULT_AVATAR: &str = "default-avatar.jpg";

/// ensure_owner
///
/// The ownership check for post mutations: the acting user must be the
/// stored author. Callers must confirm existence first so a missing post
/// reports 404 rather than 401.
fn ensure_owner(post: &PostRecord, user_id: Uuid, action: &'static str) -> Result<(), ApiError> {
    if post.author_id != user_id {
        return Err(ApiError::NotAuthorized(action));
    }
    Ok(())
}

fn bad_multipart(err: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::BadRequest(err.to_string())
}

// --- Post Handlers ---

/// get_posts
///
/// [Public Route] Lists all posts with their author's name and avatar joined
/// in, newest first.
#[utoipa::path(
    get,
    path = "/api/posts",
    responses((status = 200, description = "All posts", body = [Post]))
)]
pub async fn get_posts(
    State(state): State<AppState>,
) -> Result<Json<ListResponse<Post>>, ApiError> {
    let posts = state.repo.list_posts().await?;
    Ok(Json(ListResponse::ok(posts)))
}

/// get_post
///
/// [Public Route] Retrieves a single post by id, with the author and each
/// comment's author joined in.
#[utoipa::path(
    get,
    path = "/api/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Found", body = PostDetail),
        (status = 404, description = "Post not found")
    )
)]
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<PostDetail>>, ApiError> {
    let post = state
        .repo
        .get_post_detail(id)
        .await?
        .ok_or(ApiError::NotFound("Post"))?;

    Ok(Json(ApiResponse::ok(post)))
}

/// create_post
///
/// [Authenticated Route] Creates a post from a multipart form (`title`,
/// `content`, optional `image`). An uploaded image is written to the upload
/// store under a generated name; without one the placeholder filename is
/// assigned. The author is always the authenticated caller.
///
/// If a step after the upload fails, the stored file is not removed; the
/// orphan is accepted (see DESIGN notes).
#[utoipa::path(
    post,
    path = "/api/posts",
    responses(
        (status = 201, description = "Created", body = PostDetail),
        (status = 400, description = "Missing title or content")
    )
)]
pub async fn create_post(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<PostDetail>>), ApiError> {
    let mut title: Option<String> = None;
    let mut content: Option<String> = None;
    let mut featured_image = DEFAULT_FEATURED_IMAGE.to_string();

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        // The name is copied out first; reading the field consumes it.
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        match name.as_str() {
            "title" => title = Some(field.text().await.map_err(bad_multipart)?),
            "content" => content = Some(field.text().await.map_err(bad_multipart)?),
            "image" => {
                let original_name = field.file_name().unwrap_or("upload").to_string();
                let bytes = field.bytes().await.map_err(bad_multipart)?;
                featured_image = state.uploads.save(&original_name, &bytes).await?;
            }
            // Unknown fields are ignored, matching the original form contract.
            _ => {}
        }
    }

    let title = title
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Please add a title".to_string()))?;
    let content = content
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Please add content".to_string()))?;

    let post = state
        .repo
        .create_post(NewPost {
            author_id: user_id,
            title,
            content,
            featured_image,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(post))))
}

/// update_post
///
/// [Authenticated Route] Applies partial overrides to a post. Existence is
/// confirmed before the ownership check so a missing post reports 404 and a
/// foreign post reports 401.
#[utoipa::path(
    put,
    path = "/api/posts/{id}",
    request_body = UpdatePostRequest,
    responses(
        (status = 200, description = "Updated", body = PostDetail),
        (status = 401, description = "Not the author"),
        (status = 404, description = "Post not found")
    )
)]
pub async fn update_post(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePostRequest>,
) -> Result<Json<ApiResponse<PostDetail>>, ApiError> {
    let post = state
        .repo
        .find_post(id)
        .await?
        .ok_or(ApiError::NotFound("Post"))?;

    ensure_owner(&post, user_id, "update")?;

    let updated = state
        .repo
        .update_post(id, payload)
        .await?
        .ok_or(ApiError::NotFound("Post"))?;

    Ok(Json(ApiResponse::ok(updated)))
}

/// delete_post
///
/// [Authenticated Route] Removes a post after the same existence and
/// ownership checks as update. The featured image file is intentionally left
/// in the uploads directory.
#[utoipa::path(
    delete,
    path = "/api/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 401, description = "Not the author"),
        (status = 404, description = "Post not found")
    )
)]
pub async fn delete_post(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Empty>>, ApiError> {
    let post = state
        .repo
        .find_post(id)
        .await?
        .ok_or(ApiError::NotFound("Post"))?;

    ensure_owner(&post, user_id, "delete")?;

    if !state.repo.delete_post(id).await? {
        // The row vanished between the check and the delete.
        return Err(ApiError::NotFound("Post"));
    }

    Ok(Json(ApiResponse::ok(Empty {})))
}

// --- Comment Handler ---

/// add_comment
///
/// [Authenticated Route] Appends a comment to a post and returns the full
/// updated post, comments newest first. The append is a single atomic row
/// insert; the newest-first order is reconstructed at read time.
#[utoipa::path(
    post,
    path = "/api/posts/{id}/comments",
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment added", body = PostDetail),
        (status = 404, description = "Post not found")
    )
)]
pub async fn add_comment(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PostDetail>>), ApiError> {
    state
        .repo
        .find_post(post_id)
        .await?
        .ok_or(ApiError::NotFound("Post"))?;

    let post = state
        .repo
        .add_comment(post_id, user_id, payload.content)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(post))))
}

// --- Auth Handlers ---

/// register
///
/// [Public Route] Creates a new member account and returns a signed token.
/// The password is argon2-hashed before it reaches the repository; the
/// plaintext is never stored or logged.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = TokenResponse),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    if payload.name.trim().is_empty()
        || payload.email.trim().is_empty()
        || payload.password.is_empty()
    {
        return Err(ApiError::BadRequest(
            "Please provide a name, email and password".to_string(),
        ));
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(payload.password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {}", e)))?
        .to_string();

    let user = state
        .repo
        .create_user(NewUser {
            name: payload.name,
            email: payload.email,
            password_hash,
            // Registration never grants elevated roles.
            role: Role::Member,
            avatar: DEFAULT_AVATAR.to_string(),
        })
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                ApiError::Conflict("Email already registered")
            }
            other => ApiError::Database(other),
        })?;

    let token = create_token(user.id, &state.config.jwt_secret, state.config.jwt_ttl_secs)?;

    Ok((
        StatusCode::CREATED,
        Json(TokenResponse {
            success: true,
            token,
        }),
    ))
}

/// login
///
/// [Public Route] Verifies the argon2 hash and issues a token. Unknown email
/// and wrong password produce the same response, so the endpoint does not
/// reveal which accounts exist.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = TokenResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let creds = state
        .repo
        .find_credentials(&payload.email)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    let parsed_hash = PasswordHash::new(&creds.password_hash)
        .map_err(|e| ApiError::Internal(format!("invalid stored password hash: {}", e)))?;

    Argon2::default()
        .verify_password(payload.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::InvalidCredentials)?;

    let token = create_token(creds.id, &state.config.jwt_secret, state.config.jwt_ttl_secs)?;

    Ok(Json(TokenResponse {
        success: true,
        token,
    }))
}

/// get_me
///
/// [Authenticated Route] Returns the caller's password-stripped profile.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses((status = 200, description = "Profile", body = User))
)]
pub async fn get_me(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let user = state
        .repo
        .get_user(id)
        .await?
        .ok_or(ApiError::UnknownUser)?;

    Ok(Json(ApiResponse::ok(user)))
}

// --- Admin Handlers ---

/// get_admin_stats
///
/// [Admin Route] Dashboard counters, restricted to the admin role through
/// the authorization gate.
#[utoipa::path(
    get,
    path = "/api/admin/stats",
    responses(
        (status = 200, description = "Stats", body = DashboardStats),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn get_admin_stats(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<DashboardStats>>, ApiError> {
    authorize(&user, &[Role::Admin])?;

    let stats = state.repo.get_stats().await?;
    Ok(Json(ApiResponse::ok(stats)))
}
