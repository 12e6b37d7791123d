use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{PostStore, UserStore, VoteStore, VoteTransaction};
use crate::{
    error::{AppError, Result},
    models::{Post, PostWithCreator, User, Vote},
};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn insert_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password, role, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password)
        .bind(user.role)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(email_taken_as_conflict)?;

        Ok(())
    }
}

// The pre-insert lookup can race with another signup; users.email's unique
// index is the real guard.
fn email_taken_as_conflict(err: sqlx::Error) -> AppError {
    match err.as_database_error() {
        Some(db_err) if db_err.is_unique_violation() => {
            AppError::Conflict("Email already registered".to_string())
        }
        _ => AppError::Database(err),
    }
}

#[async_trait]
impl PostStore for PgStore {
    async fn get_posts_with_creator_name(&self) -> Result<Vec<PostWithCreator>> {
        let posts = sqlx::query_as::<_, PostWithCreator>(
            r#"
            SELECT
                p.id, p.creator_id, p.content, p.likes, p.dislikes,
                p.created_at, p.updated_at,
                u.name AS creator_name
            FROM posts p
            JOIN users u ON p.creator_id = u.id
            ORDER BY p.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(posts)
    }

    async fn find_post_by_id(&self, post_id: Uuid) -> Result<Option<Post>> {
        let post = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = $1")
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(post)
    }

    async fn insert_post(&self, post: &Post) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO posts (id, creator_id, content, likes, dislikes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(post.id)
        .bind(post.creator_id)
        .bind(&post.content)
        .bind(post.likes)
        .bind(post.dislikes)
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_post(&self, post: &Post) -> Result<()> {
        // Counters are owned by the vote transaction and left alone here.
        let result = sqlx::query("UPDATE posts SET content = $1, updated_at = $2 WHERE id = $3")
            .bind(&post.content)
            .bind(post.updated_at)
            .bind(post.id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Post not found".to_string()));
        }

        Ok(())
    }

    async fn delete_post_by_id(&self, post_id: Uuid) -> Result<()> {
        // likes_dislikes rows go with the post (ON DELETE CASCADE)
        sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(post_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl VoteStore for PgStore {
    async fn begin(&self) -> Result<Box<dyn VoteTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgVoteTransaction { tx }))
    }
}

pub struct PgVoteTransaction {
    tx: Transaction<'static, Postgres>,
}

fn expect_one_row(rows_affected: u64, what: &str, user_id: Uuid, post_id: Uuid) -> Result<()> {
    if rows_affected == 1 {
        Ok(())
    } else {
        Err(AppError::InvariantViolation(format!(
            "{what} touched {rows_affected} vote records for user {user_id} on post {post_id}"
        )))
    }
}

#[async_trait]
impl VoteTransaction for PgVoteTransaction {
    async fn find_post_for_update(&mut self, post_id: Uuid) -> Result<Option<Post>> {
        let post = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = $1 FOR UPDATE")
            .bind(post_id)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(post)
    }

    async fn find_vote(&mut self, user_id: Uuid, post_id: Uuid) -> Result<Option<Vote>> {
        let flag = sqlx::query_scalar::<_, i16>(
            "SELECT like_flag FROM likes_dislikes WHERE user_id = $1 AND post_id = $2",
        )
        .bind(user_id)
        .bind(post_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        flag.map(|flag| {
            Vote::from_flag(flag)
                .ok_or_else(|| AppError::Internal(format!("Invalid like_flag: {}", flag)))
        })
        .transpose()
    }

    async fn insert_vote(&mut self, user_id: Uuid, post_id: Uuid, vote: Vote) -> Result<()> {
        sqlx::query("INSERT INTO likes_dislikes (user_id, post_id, like_flag) VALUES ($1, $2, $3)")
            .bind(user_id)
            .bind(post_id)
            .bind(vote.as_flag())
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn update_vote(&mut self, user_id: Uuid, post_id: Uuid, vote: Vote) -> Result<()> {
        let result = sqlx::query(
            "UPDATE likes_dislikes SET like_flag = $1 WHERE user_id = $2 AND post_id = $3",
        )
        .bind(vote.as_flag())
        .bind(user_id)
        .bind(post_id)
        .execute(&mut *self.tx)
        .await?;

        expect_one_row(result.rows_affected(), "update", user_id, post_id)
    }

    async fn delete_vote(&mut self, user_id: Uuid, post_id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM likes_dislikes WHERE user_id = $1 AND post_id = $2")
            .bind(user_id)
            .bind(post_id)
            .execute(&mut *self.tx)
            .await?;

        expect_one_row(result.rows_affected(), "delete", user_id, post_id)
    }

    async fn save_post(&mut self, post: &Post) -> Result<()> {
        sqlx::query("UPDATE posts SET likes = $1, dislikes = $2 WHERE id = $3")
            .bind(post.likes)
            .bind(post.dislikes)
            .bind(post.id)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
