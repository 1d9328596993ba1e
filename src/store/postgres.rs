use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{PasswordHash, RefreshTokenRecord};
use crate::error::DatabaseError;
use crate::store::{Chirp, Credential, RecordStore, UserProfile};

/// Postgres-backed record store
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
impl RecordStore for PgStore {
    async fn create_user(
        &self,
        email: &str,
        password_hash: &PasswordHash,
    ) -> Result<UserProfile, DatabaseError> {
        let now = Utc::now();

        let user = sqlx::query_as::<_, UserProfile>(
            r#"
            INSERT INTO users (id, created_at, updated_at, email, hashed_password)
            VALUES ($1, $2, $2, $3, $4)
            RETURNING id, created_at, updated_at, email, is_chirpy_red
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(now)
        .bind(email)
        .bind(password_hash.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_credential_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Credential>, DatabaseError> {
        let row = sqlx::query_as::<_, (Uuid, String)>(
            "SELECT id, hashed_password FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(user_id, hash)| Credential {
            user_id,
            password_hash: PasswordHash::from_stored(hash),
        }))
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<UserProfile>, DatabaseError> {
        let user = sqlx::query_as::<_, UserProfile>(
            "SELECT id, created_at, updated_at, email, is_chirpy_red FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn update_user_credentials(
        &self,
        user_id: Uuid,
        email: &str,
        password_hash: &PasswordHash,
    ) -> Result<UserProfile, DatabaseError> {
        sqlx::query_as::<_, UserProfile>(
            r#"
            UPDATE users
            SET email = $2, hashed_password = $3, updated_at = $4
            WHERE id = $1
            RETURNING id, created_at, updated_at, email, is_chirpy_red
            "#,
        )
        .bind(user_id)
        .bind(email)
        .bind(password_hash.as_str())
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound("user".to_string()))
    }

    async fn upgrade_user_to_red(&self, user_id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE users SET is_chirpy_red = TRUE, updated_at = $2 WHERE id = $1",
        )
        .bind(user_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("user".to_string()));
        }
        Ok(())
    }

    async fn reset_users(&self) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM users").execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn insert_refresh_token(
        &self,
        token: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (token, created_at, updated_at, user_id, expires_at, revoked_at)
            VALUES ($1, $2, $2, $3, $4, NULL)
            "#,
        )
        .bind(token)
        .bind(Utc::now())
        .bind(user_id)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_refresh_token(
        &self,
        token: &str,
    ) -> Result<Option<RefreshTokenRecord>, DatabaseError> {
        let record = sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            SELECT token, user_id, created_at, updated_at, expires_at, revoked_at
            FROM refresh_tokens
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn mark_refresh_token_revoked(
        &self,
        token: &str,
        revoked_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        // COALESCE keeps the first revocation time when two revokes race.
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = COALESCE(revoked_at, $2), updated_at = $2
            WHERE token = $1
            "#,
        )
        .bind(token)
        .bind(revoked_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("refresh token".to_string()));
        }
        Ok(())
    }

    async fn create_chirp(&self, body: &str, user_id: Uuid) -> Result<Chirp, DatabaseError> {
        let chirp = sqlx::query_as::<_, Chirp>(
            r#"
            INSERT INTO chirps (id, created_at, updated_at, body, user_id)
            VALUES ($1, $2, $2, $3, $4)
            RETURNING id, created_at, updated_at, body, user_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(Utc::now())
        .bind(body)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(chirp)
    }

    async fn list_chirps(&self, author: Option<Uuid>) -> Result<Vec<Chirp>, DatabaseError> {
        let chirps = sqlx::query_as::<_, Chirp>(
            r#"
            SELECT id, created_at, updated_at, body, user_id
            FROM chirps
            WHERE $1::uuid IS NULL OR user_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(author)
        .fetch_all(&self.pool)
        .await?;

        Ok(chirps)
    }

    async fn find_chirp(&self, chirp_id: Uuid) -> Result<Option<Chirp>, DatabaseError> {
        let chirp = sqlx::query_as::<_, Chirp>(
            "SELECT id, created_at, updated_at, body, user_id FROM chirps WHERE id = $1",
        )
        .bind(chirp_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(chirp)
    }

    async fn delete_chirp(&self, chirp_id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM chirps WHERE id = $1")
            .bind(chirp_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("chirp".to_string()));
        }
        Ok(())
    }
}
