//! Record store contract
//!
//! Every operation touches a single row (or one filtered scan) and is
//! atomic on its own. `PgStore` is the production backend; `MemoryStore`
//! serves tests and local runs without Postgres.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::{PasswordHash, RefreshTokenRecord};
use crate::error::DatabaseError;

/// A user as returned to callers. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct UserProfile {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub email: String,
    pub is_chirpy_red: bool,
}

/// What login needs to check a password.
#[derive(Debug, Clone)]
pub struct Credential {
    pub user_id: Uuid,
    pub password_hash: PasswordHash,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Chirp {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub body: String,
    pub user_id: Uuid,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fails with `UniqueConstraintViolation` if the email is taken.
    async fn create_user(
        &self,
        email: &str,
        password_hash: &PasswordHash,
    ) -> Result<UserProfile, DatabaseError>;

    async fn find_credential_by_email(&self, email: &str)
        -> Result<Option<Credential>, DatabaseError>;

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<UserProfile>, DatabaseError>;

    async fn update_user_credentials(
        &self,
        user_id: Uuid,
        email: &str,
        password_hash: &PasswordHash,
    ) -> Result<UserProfile, DatabaseError>;

    async fn upgrade_user_to_red(&self, user_id: Uuid) -> Result<(), DatabaseError>;

    /// Deletes every user together with their refresh tokens and chirps.
    async fn reset_users(&self) -> Result<u64, DatabaseError>;

    /// Fails with `UniqueConstraintViolation` if the token already exists.
    async fn insert_refresh_token(
        &self,
        token: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError>;

    async fn find_refresh_token(
        &self,
        token: &str,
    ) -> Result<Option<RefreshTokenRecord>, DatabaseError>;

    /// Stamps `revoked_at` unless the row already carries one.
    async fn mark_refresh_token_revoked(
        &self,
        token: &str,
        revoked_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError>;

    async fn create_chirp(&self, body: &str, user_id: Uuid) -> Result<Chirp, DatabaseError>;

    /// Oldest first.
    async fn list_chirps(&self, author: Option<Uuid>) -> Result<Vec<Chirp>, DatabaseError>;

    async fn find_chirp(&self, chirp_id: Uuid) -> Result<Option<Chirp>, DatabaseError>;

    async fn delete_chirp(&self, chirp_id: Uuid) -> Result<(), DatabaseError>;
}
