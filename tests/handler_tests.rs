use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use blog_api::{
    ApiError, AppState,
    auth::AuthUser,
    config::AppConfig,
    handlers,
    models::{
        CreateCommentRequest, DashboardStats, LoginRequest, NewPost, NewUser, Post, PostDetail,
        PostRecord, RegisterRequest, Role, StoredCredentials, UpdatePostRequest, User, UserSummary,
    },
    repository::Repository,
    storage::MockUploadStore,
};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

// --- Mock Repository Implementation ---

// The central control point for handler tests: pre-canned outputs plus a
// small amount of recorded state for verification.
struct MockRepoControl {
    posts_to_return: Vec<Post>,
    detail_to_return: Option<PostDetail>,
    record_to_return: Option<PostRecord>,
    delete_result: bool,
    user_to_return: Option<User>,
    credentials_to_return: Option<StoredCredentials>,
    stats_to_return: DashboardStats,

    // Comment store, kept newest-first like the real read queries return it.
    comments: Mutex<Vec<blog_api::models::Comment>>,
    // Captures the registration payload the handler sends down.
    created_user: Mutex<Option<NewUser>>,
}

impl Default for MockRepoControl {
    fn default() -> Self {
        MockRepoControl {
            posts_to_return: vec![],
            detail_to_return: Some(PostDetail::default()),
            record_to_return: Some(PostRecord::default()),
            delete_result: true,
            user_to_return: None,
            credentials_to_return: None,
            stats_to_return: DashboardStats::default(),
            comments: Mutex::new(vec![]),
            created_user: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Repository for MockRepoControl {
    async fn list_posts(&self) -> Result<Vec<Post>, sqlx::Error> {
        Ok(self.posts_to_return.clone())
    }

    async fn get_post_detail(&self, _id: Uuid) -> Result<Option<PostDetail>, sqlx::Error> {
        Ok(self.detail_to_return.clone())
    }

    async fn find_post(&self, _id: Uuid) -> Result<Option<PostRecord>, sqlx::Error> {
        Ok(self.record_to_return.clone())
    }

    async fn create_post(&self, post: NewPost) -> Result<PostDetail, sqlx::Error> {
        Ok(PostDetail {
            title: post.title,
            content: post.content,
            featured_image: post.featured_image,
            ..PostDetail::default()
        })
    }

    async fn update_post(
        &self,
        _id: Uuid,
        req: UpdatePostRequest,
    ) -> Result<Option<PostDetail>, sqlx::Error> {
        Ok(self.detail_to_return.clone().map(|mut detail| {
            if let Some(title) = req.title {
                detail.title = title;
            }
            if let Some(content) = req.content {
                detail.content = content;
            }
            detail
        }))
    }

    async fn delete_post(&self, _id: Uuid) -> Result<bool, sqlx::Error> {
        Ok(self.delete_result)
    }

    async fn add_comment(
        &self,
        _post_id: Uuid,
        user_id: Uuid,
        content: String,
    ) -> Result<PostDetail, sqlx::Error> {
        let mut comments = self.comments.lock().unwrap();
        let comment = blog_api::models::Comment {
            id: comments.len() as i64 + 1,
            user: UserSummary {
                id: user_id,
                ..UserSummary::default()
            },
            content,
            created_at: chrono::Utc::now(),
        };
        comments.insert(0, comment);

        Ok(PostDetail {
            comments: comments.clone(),
            ..self.detail_to_return.clone().unwrap_or_default()
        })
    }

    async fn get_user(&self, _id: Uuid) -> Result<Option<User>, sqlx::Error> {
        Ok(self.user_to_return.clone())
    }

    async fn find_credentials(
        &self,
        _email: &str,
    ) -> Result<Option<StoredCredentials>, sqlx::Error> {
        Ok(self.credentials_to_return.clone())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, sqlx::Error> {
        *self.created_user.lock().unwrap() = Some(user.clone());
        Ok(User {
            id: Uuid::from_u128(999),
            name: user.name,
            email: user.email,
            role: user.role,
            avatar: user.avatar,
            created_at: chrono::Utc::now(),
        })
    }

    async fn get_stats(&self) -> Result<DashboardStats, sqlx::Error> {
        Ok(self.stats_to_return.clone())
    }
}

// --- Test Utilities ---

const OWNER_ID: Uuid = Uuid::from_u128(123);
const OTHER_ID: Uuid = Uuid::from_u128(456);

fn create_test_state(repo: MockRepoControl) -> AppState {
    AppState {
        repo: Arc::new(repo),
        uploads: Arc::new(MockUploadStore::new()),
        config: AppConfig::default(),
    }
}

fn acting_user(id: Uuid, role: Role) -> AuthUser {
    AuthUser {
        id,
        name: "Handler Test".to_string(),
        role,
    }
}

fn owned_record(author_id: Uuid) -> PostRecord {
    PostRecord {
        id: Uuid::from_u128(7),
        author_id,
        title: "Owned".to_string(),
        content: "Body".to_string(),
        featured_image: "default-blog.jpg".to_string(),
        created_at: chrono::Utc::now(),
    }
}

// --- Post Handler Tests ---

#[tokio::test]
async fn get_posts_wraps_results_in_list_envelope() {
    let posts = vec![
        Post {
            title: "newer".to_string(),
            ..Post::default()
        },
        Post {
            title: "older".to_string(),
            ..Post::default()
        },
    ];
    let state = create_test_state(MockRepoControl {
        posts_to_return: posts,
        ..MockRepoControl::default()
    });

    let Json(body) = handlers::get_posts(State(state)).await.unwrap();

    assert!(body.success);
    assert_eq!(body.count, 2);
    // The repository's newest-first order passes through untouched.
    assert_eq!(body.data[0].title, "newer");
    assert_eq!(body.data[1].title, "older");
}

#[tokio::test]
async fn get_post_missing_reports_not_found() {
    let state = create_test_state(MockRepoControl {
        detail_to_return: None,
        ..MockRepoControl::default()
    });

    let result = handlers::get_post(State(state), Path(Uuid::from_u128(7))).await;

    assert!(matches!(result, Err(ApiError::NotFound("Post"))));
}

#[tokio::test]
async fn update_post_missing_reports_not_found_before_ownership() {
    // No record at all: even a non-owner caller must see 404, not 401.
    let state = create_test_state(MockRepoControl {
        record_to_return: None,
        ..MockRepoControl::default()
    });

    let result = handlers::update_post(
        acting_user(OTHER_ID, Role::Member),
        State(state),
        Path(Uuid::from_u128(7)),
        Json(UpdatePostRequest::default()),
    )
    .await;

    assert!(matches!(result, Err(ApiError::NotFound("Post"))));
}

#[tokio::test]
async fn update_post_by_non_owner_rejected() {
    let state = create_test_state(MockRepoControl {
        record_to_return: Some(owned_record(OWNER_ID)),
        ..MockRepoControl::default()
    });

    let result = handlers::update_post(
        acting_user(OTHER_ID, Role::Member),
        State(state),
        Path(Uuid::from_u128(7)),
        Json(UpdatePostRequest {
            title: Some("hijacked".to_string()),
            ..UpdatePostRequest::default()
        }),
    )
    .await;

    assert!(matches!(result, Err(ApiError::NotAuthorized("update"))));
}

#[tokio::test]
async fn update_post_by_owner_applies_overrides() {
    let state = create_test_state(MockRepoControl {
        record_to_return: Some(owned_record(OWNER_ID)),
        ..MockRepoControl::default()
    });

    let result = handlers::update_post(
        acting_user(OWNER_ID, Role::Member),
        State(state),
        Path(Uuid::from_u128(7)),
        Json(UpdatePostRequest {
            title: Some("Updated Title".to_string()),
            ..UpdatePostRequest::default()
        }),
    )
    .await;

    let Json(body) = result.unwrap();
    assert!(body.success);
    assert_eq!(body.data.title, "Updated Title");
}

#[tokio::test]
async fn delete_post_by_non_owner_rejected() {
    let state = create_test_state(MockRepoControl {
        record_to_return: Some(owned_record(OWNER_ID)),
        ..MockRepoControl::default()
    });

    let result = handlers::delete_post(
        acting_user(OTHER_ID, Role::Member),
        State(state),
        Path(Uuid::from_u128(7)),
    )
    .await;

    assert!(matches!(result, Err(ApiError::NotAuthorized("delete"))));
}

#[tokio::test]
async fn delete_post_by_owner_returns_empty_payload() {
    let state = create_test_state(MockRepoControl {
        record_to_return: Some(owned_record(OWNER_ID)),
        delete_result: true,
        ..MockRepoControl::default()
    });

    let result = handlers::delete_post(
        acting_user(OWNER_ID, Role::Member),
        State(state),
        Path(Uuid::from_u128(7)),
    )
    .await;

    let Json(body) = result.unwrap();
    assert!(body.success);
    assert_eq!(serde_json::to_value(&body.data).unwrap(), serde_json::json!({}));
}

// --- Comment Handler Tests ---

#[tokio::test]
async fn add_comment_missing_post_reports_not_found() {
    let state = create_test_state(MockRepoControl {
        record_to_return: None,
        ..MockRepoControl::default()
    });

    let result = handlers::add_comment(
        acting_user(OWNER_ID, Role::Member),
        State(state),
        Path(Uuid::from_u128(7)),
        Json(CreateCommentRequest {
            content: "nice post".to_string(),
        }),
    )
    .await;

    assert!(matches!(result, Err(ApiError::NotFound("Post"))));
}

#[tokio::test]
async fn add_comment_prepends_newest_first() {
    let state = create_test_state(MockRepoControl::default());

    // Seed two comments, then add a third; each call returns the full list.
    for content in ["C2", "C1", "C3"] {
        let (status, Json(body)) = handlers::add_comment(
            acting_user(OWNER_ID, Role::Member),
            State(state.clone()),
            Path(Uuid::from_u128(7)),
            Json(CreateCommentRequest {
                content: content.to_string(),
            }),
        )
        .await
        .unwrap();

        assert_eq!(status, StatusCode::CREATED);
        assert!(body.success);
        assert_eq!(body.data.comments[0].content, content);
    }

    // Final order: last added first.
    let (_, Json(body)) = handlers::add_comment(
        acting_user(OWNER_ID, Role::Member),
        State(state),
        Path(Uuid::from_u128(7)),
        Json(CreateCommentRequest {
            content: "C4".to_string(),
        }),
    )
    .await
    .unwrap();

    let order: Vec<&str> = body
        .data
        .comments
        .iter()
        .map(|c| c.content.as_str())
        .collect();
    assert_eq!(order, vec!["C4", "C3", "C1", "C2"]);
}

// --- Auth Handler Tests ---

#[tokio::test]
async fn register_returns_created_with_token() {
    let state = create_test_state(MockRepoControl::default());

    let (status, Json(body)) = handlers::register(
        State(state),
        Json(RegisterRequest {
            name: "New User".to_string(),
            email: "new@example.com".to_string(),
            password: "hunter2".to_string(),
        }),
    )
    .await
    .unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert!(body.success);
    assert!(!body.token.is_empty());
}

#[tokio::test]
async fn register_sends_argon2_hash_to_repository() {
    let control = Arc::new(MockRepoControl::default());
    let state = AppState {
        repo: control.clone(),
        uploads: Arc::new(MockUploadStore::new()),
        config: AppConfig::default(),
    };

    handlers::register(
        State(state),
        Json(RegisterRequest {
            name: "New User".to_string(),
            email: "new@example.com".to_string(),
            password: "hunter2".to_string(),
        }),
    )
    .await
    .unwrap();

    let created = control.created_user.lock().unwrap().clone().unwrap();
    assert_eq!(created.role, Role::Member);
    assert_eq!(created.avatar, "default-avatar.jpg");
    assert_ne!(created.password_hash, "hunter2");

    // The stored hash must verify against the original password.
    let parsed = PasswordHash::new(&created.password_hash).unwrap();
    assert!(
        Argon2::default()
            .verify_password(b"hunter2", &parsed)
            .is_ok()
    );
}

#[tokio::test]
async fn register_rejects_blank_fields() {
    let state = create_test_state(MockRepoControl::default());

    let result = handlers::register(
        State(state),
        Json(RegisterRequest {
            name: "".to_string(),
            email: "new@example.com".to_string(),
            password: "hunter2".to_string(),
        }),
    )
    .await;

    assert!(matches!(result, Err(ApiError::BadRequest(_))));
}

fn hashed_credentials(password: &str) -> StoredCredentials {
    let salt = SaltString::generate(&mut OsRng);
    StoredCredentials {
        id: OWNER_ID,
        password_hash: Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .unwrap()
            .to_string(),
    }
}

#[tokio::test]
async fn login_with_wrong_password_rejected() {
    let state = create_test_state(MockRepoControl {
        credentials_to_return: Some(hashed_credentials("correct-password")),
        ..MockRepoControl::default()
    });

    let result = handlers::login(
        State(state),
        Json(LoginRequest {
            email: "member@example.com".to_string(),
            password: "wrong-password".to_string(),
        }),
    )
    .await;

    assert!(matches!(result, Err(ApiError::InvalidCredentials)));
}

#[tokio::test]
async fn login_with_unknown_email_rejected() {
    let state = create_test_state(MockRepoControl::default());

    let result = handlers::login(
        State(state),
        Json(LoginRequest {
            email: "ghost@example.com".to_string(),
            password: "whatever".to_string(),
        }),
    )
    .await;

    assert!(matches!(result, Err(ApiError::InvalidCredentials)));
}

#[tokio::test]
async fn login_with_valid_credentials_issues_token() {
    let state = create_test_state(MockRepoControl {
        credentials_to_return: Some(hashed_credentials("correct-password")),
        ..MockRepoControl::default()
    });

    let Json(body) = handlers::login(
        State(state),
        Json(LoginRequest {
            email: "member@example.com".to_string(),
            password: "correct-password".to_string(),
        }),
    )
    .await
    .unwrap();

    assert!(body.success);
    assert!(!body.token.is_empty());
}

// --- Admin Handler Tests ---

#[tokio::test]
async fn admin_stats_forbidden_for_member() {
    let state = create_test_state(MockRepoControl::default());

    let result =
        handlers::get_admin_stats(acting_user(OWNER_ID, Role::Member), State(state)).await;

    assert!(matches!(result, Err(ApiError::Forbidden(Role::Member))));
}

#[tokio::test]
async fn admin_stats_allowed_for_admin() {
    let state = create_test_state(MockRepoControl {
        stats_to_return: DashboardStats {
            total_posts: 3,
            total_users: 2,
            total_comments: 5,
        },
        ..MockRepoControl::default()
    });

    let Json(body) = handlers::get_admin_stats(acting_user(OWNER_ID, Role::Admin), State(state))
        .await
        .unwrap();

    assert!(body.success);
    assert_eq!(body.data.total_posts, 3);
    assert_eq!(body.data.total_comments, 5);
}
