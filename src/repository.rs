use crate::models::{
    Comment, DashboardStats, NewPost, NewUser, Post, PostDetail, PostRecord, Role,
    StoredCredentials, UpdatePostRequest, User, UserSummary,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::sync::Arc;
use uuid::Uuid;

/// Repository Trait
///
/// Defines the abstract contract for all persistence operations, so the
/// handlers interact with the data layer without knowing the concrete
/// implementation (Postgres in production, mocks in tests).
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn Repository>`) safely shareable across Axum's task boundaries.
///
/// Every method returns `Result<_, sqlx::Error>`; callers convert storage
/// failures into the generic 500 response.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Posts ---
    // Listing with author joined in, newest first.
    async fn list_posts(&self) -> Result<Vec<Post>, sqlx::Error>;
    // Single post with author and comment authors joined in.
    async fn get_post_detail(&self, id: Uuid) -> Result<Option<PostDetail>, sqlx::Error>;
    // Raw row lookup used by the mutation handlers for the existence and
    // ownership checks.
    async fn find_post(&self, id: Uuid) -> Result<Option<PostRecord>, sqlx::Error>;
    async fn create_post(&self, post: NewPost) -> Result<PostDetail, sqlx::Error>;
    // Partial update with COALESCE semantics. Ownership is checked by the
    // handler before this is called; None means the row vanished meanwhile.
    async fn update_post(
        &self,
        id: Uuid,
        req: UpdatePostRequest,
    ) -> Result<Option<PostDetail>, sqlx::Error>;
    async fn delete_post(&self, id: Uuid) -> Result<bool, sqlx::Error>;

    // --- Comments ---
    // Atomic single-row insert; returns the full updated post.
    async fn add_comment(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        content: String,
    ) -> Result<PostDetail, sqlx::Error>;

    // --- Users ---
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, sqlx::Error>;
    async fn find_credentials(
        &self,
        email: &str,
    ) -> Result<Option<StoredCredentials>, sqlx::Error>;
    async fn create_user(&self, user: NewUser) -> Result<User, sqlx::Error>;

    // --- Admin ---
    async fn get_stats(&self) -> Result<DashboardStats, sqlx::Error>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the
/// application state.
pub type RepositoryState = Arc<dyn Repository>;

// --- Row Structs ---
//
// Flat join rows. sqlx maps these directly; the nested response models are
// assembled from them below.

#[derive(FromRow)]
struct PostRow {
    id: Uuid,
    title: String,
    content: String,
    featured_image: String,
    created_at: DateTime<Utc>,
    author_id: Uuid,
    author_name: String,
    author_avatar: String,
}

impl PostRow {
    fn into_post(self) -> Post {
        Post {
            id: self.id,
            title: self.title,
            content: self.content,
            featured_image: self.featured_image,
            author: UserSummary {
                id: self.author_id,
                name: self.author_name,
                avatar: self.author_avatar,
            },
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct CommentRow {
    id: i64,
    content: String,
    created_at: DateTime<Utc>,
    user_id: Uuid,
    user_name: String,
    user_avatar: String,
}

impl CommentRow {
    fn into_comment(self) -> Comment {
        Comment {
            id: self.id,
            user: UserSummary {
                id: self.user_id,
                name: self.user_name,
                avatar: self.user_avatar,
            },
            content: self.content,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    role: String,
    avatar: String,
    created_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> User {
        User {
            id: self.id,
            name: self.name,
            email: self.email,
            role: Role::from_str_or_member(&self.role),
            avatar: self.avatar,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRow {
    id: Uuid,
    password_hash: String,
}

// Base SELECT for post responses; callers append WHERE/ORDER BY.
const POST_SELECT: &str = r#"
    SELECT p.id, p.title, p.content, p.featured_image, p.created_at,
           u.id AS author_id, u.name AS author_name, u.avatar AS author_avatar
    FROM posts p
    JOIN users u ON p.author_id = u.id
"#;

const COMMENT_SELECT: &str = r#"
    SELECT c.id, c.content, c.created_at,
           u.id AS user_id, u.name AS user_name, u.avatar AS user_avatar
    FROM comments c
    JOIN users u ON c.user_id = u.id
    WHERE c.post_id = $1
    ORDER BY c.created_at DESC, c.id DESC
"#;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by the
/// PostgreSQL database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Loads the comments of a post, newest first. The serial id breaks
    /// same-timestamp ties so the order is exactly insertion-reversed.
    async fn comments_for(&self, post_id: Uuid) -> Result<Vec<Comment>, sqlx::Error> {
        let rows = sqlx::query_as::<_, CommentRow>(COMMENT_SELECT)
            .bind(post_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(CommentRow::into_comment).collect())
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    /// Lists all posts with their author joined in, sorted by creation time
    /// descending.
    async fn list_posts(&self) -> Result<Vec<Post>, sqlx::Error> {
        let query = format!("{} ORDER BY p.created_at DESC", POST_SELECT);

        let rows = sqlx::query_as::<_, PostRow>(&query)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(PostRow::into_post).collect())
    }

    /// Retrieves a single post by id, with the author and every comment's
    /// author joined in.
    async fn get_post_detail(&self, id: Uuid) -> Result<Option<PostDetail>, sqlx::Error> {
        let query = format!("{} WHERE p.id = $1", POST_SELECT);

        let row = sqlx::query_as::<_, PostRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let comments = self.comments_for(id).await?;
        let post = row.into_post();

        Ok(Some(PostDetail {
            id: post.id,
            title: post.title,
            content: post.content,
            featured_image: post.featured_image,
            author: post.author,
            created_at: post.created_at,
            comments,
        }))
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<PostRecord>, sqlx::Error> {
        sqlx::query_as::<_, PostRecord>(
            "SELECT id, author_id, title, content, featured_image, created_at \
             FROM posts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Inserts a new post and returns the enriched detail view. The author
    /// column is written once here and never updated afterwards.
    async fn create_post(&self, post: NewPost) -> Result<PostDetail, sqlx::Error> {
        let new_id = Uuid::new_v4();

        sqlx::query(
            "INSERT INTO posts (id, author_id, title, content, featured_image, created_at) \
             VALUES ($1, $2, $3, $4, $5, NOW())",
        )
        .bind(new_id)
        .bind(post.author_id)
        .bind(&post.title)
        .bind(&post.content)
        .bind(&post.featured_image)
        .execute(&self.pool)
        .await?;

        self.get_post_detail(new_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Applies caller-supplied overrides via COALESCE, so only provided
    /// fields change. The author column is deliberately absent from the
    /// SET list.
    async fn update_post(
        &self,
        id: Uuid,
        req: UpdatePostRequest,
    ) -> Result<Option<PostDetail>, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE posts \
             SET title = COALESCE($2, title), \
                 content = COALESCE($3, content), \
                 featured_image = COALESCE($4, featured_image) \
             WHERE id = $1",
        )
        .bind(id)
        .bind(req.title)
        .bind(req.content)
        .bind(req.featured_image)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get_post_detail(id).await
    }

    /// Removes the post row. Comments go with it via the ON DELETE CASCADE
    /// constraint; the featured image file is left on disk.
    async fn delete_post(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Inserts one comment row and rehydrates the post. The insert is atomic
    /// at the store, so two concurrent comments on the same post both land.
    async fn add_comment(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        content: String,
    ) -> Result<PostDetail, sqlx::Error> {
        sqlx::query(
            "INSERT INTO comments (post_id, user_id, content, created_at) \
             VALUES ($1, $2, $3, NOW())",
        )
        .bind(post_id)
        .bind(user_id)
        .bind(&content)
        .execute(&self.pool)
        .await?;

        self.get_post_detail(post_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Retrieves the password-stripped user record used by the token
    /// verifier and the profile endpoint.
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email, role, avatar, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(UserRow::into_user))
    }

    /// Looks up the id and password hash by email for login verification.
    async fn find_credentials(
        &self,
        email: &str,
    ) -> Result<Option<StoredCredentials>, sqlx::Error> {
        let row = sqlx::query_as::<_, CredentialsRow>(
            "SELECT id, password_hash FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| StoredCredentials {
            id: r.id,
            password_hash: r.password_hash,
        }))
    }

    /// Creates a user at registration. The unique index on email surfaces
    /// duplicates as a database error the register handler maps to a 409.
    async fn create_user(&self, user: NewUser) -> Result<User, sqlx::Error> {
        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (id, name, email, password_hash, role, avatar, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, NOW()) \
             RETURNING id, name, email, role, avatar, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(&user.avatar)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_user())
    }

    /// Compiles the counters for the admin dashboard.
    async fn get_stats(&self) -> Result<DashboardStats, sqlx::Error> {
        let total_posts = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM posts")
            .fetch_one(&self.pool)
            .await?;
        let total_users = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        let total_comments = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM comments")
            .fetch_one(&self.pool)
            .await?;

        Ok(DashboardStats {
            total_posts,
            total_users,
            total_comments,
        })
    }
}
