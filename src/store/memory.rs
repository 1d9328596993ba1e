use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::{PasswordHash, RefreshTokenRecord};
use crate::error::DatabaseError;
use crate::store::{Chirp, Credential, RecordStore, UserProfile};

struct UserRow {
    profile: UserProfile,
    password_hash: PasswordHash,
}

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, UserRow>,
    refresh_tokens: HashMap<String, RefreshTokenRecord>,
    chirps: Vec<Chirp>,
}

impl Tables {
    fn email_taken_by_other(&self, email: &str, user_id: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|row| row.profile.email == email && Some(row.profile.id) != user_id)
    }
}

/// In-process record store. Each operation holds the table lock for its
/// whole read-modify-write, matching the single-row atomicity of `PgStore`.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn duplicate_email() -> DatabaseError {
    DatabaseError::UniqueConstraintViolation("users_email_key".to_string())
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn create_user(
        &self,
        email: &str,
        password_hash: &PasswordHash,
    ) -> Result<UserProfile, DatabaseError> {
        let mut tables = self.tables.write().await;
        if tables.email_taken_by_other(email, None) {
            return Err(duplicate_email());
        }

        let now = Utc::now();
        let profile = UserProfile {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            email: email.to_string(),
            is_chirpy_red: false,
        };
        tables.users.insert(
            profile.id,
            UserRow {
                profile: profile.clone(),
                password_hash: password_hash.clone(),
            },
        );

        Ok(profile)
    }

    async fn find_credential_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Credential>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|row| row.profile.email == email)
            .map(|row| Credential {
                user_id: row.profile.id,
                password_hash: row.password_hash.clone(),
            }))
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<UserProfile>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(&user_id).map(|row| row.profile.clone()))
    }

    async fn update_user_credentials(
        &self,
        user_id: Uuid,
        email: &str,
        password_hash: &PasswordHash,
    ) -> Result<UserProfile, DatabaseError> {
        let mut tables = self.tables.write().await;
        if tables.email_taken_by_other(email, Some(user_id)) {
            return Err(duplicate_email());
        }

        let row = tables
            .users
            .get_mut(&user_id)
            .ok_or_else(|| DatabaseError::NotFound("user".to_string()))?;
        row.profile.email = email.to_string();
        row.profile.updated_at = Utc::now();
        row.password_hash = password_hash.clone();

        Ok(row.profile.clone())
    }

    async fn upgrade_user_to_red(&self, user_id: Uuid) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write().await;
        let row = tables
            .users
            .get_mut(&user_id)
            .ok_or_else(|| DatabaseError::NotFound("user".to_string()))?;
        row.profile.is_chirpy_red = true;
        row.profile.updated_at = Utc::now();
        Ok(())
    }

    async fn reset_users(&self) -> Result<u64, DatabaseError> {
        let mut tables = self.tables.write().await;
        let deleted = tables.users.len() as u64;
        *tables = Tables::default();
        Ok(deleted)
    }

    async fn insert_refresh_token(
        &self,
        token: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&user_id) {
            return Err(DatabaseError::UnexpectedError(
                "refresh token references a missing user".to_string(),
            ));
        }
        if tables.refresh_tokens.contains_key(token) {
            return Err(DatabaseError::UniqueConstraintViolation(
                "refresh_tokens_pkey".to_string(),
            ));
        }

        let now = Utc::now();
        tables.refresh_tokens.insert(
            token.to_string(),
            RefreshTokenRecord {
                token: token.to_string(),
                user_id,
                created_at: now,
                updated_at: now,
                expires_at,
                revoked_at: None,
            },
        );
        Ok(())
    }

    async fn find_refresh_token(
        &self,
        token: &str,
    ) -> Result<Option<RefreshTokenRecord>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.refresh_tokens.get(token).cloned())
    }

    async fn mark_refresh_token_revoked(
        &self,
        token: &str,
        revoked_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write().await;
        let record = tables
            .refresh_tokens
            .get_mut(token)
            .ok_or_else(|| DatabaseError::NotFound("refresh token".to_string()))?;
        record.revoked_at.get_or_insert(revoked_at);
        record.updated_at = revoked_at;
        Ok(())
    }

    async fn create_chirp(&self, body: &str, user_id: Uuid) -> Result<Chirp, DatabaseError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&user_id) {
            return Err(DatabaseError::UnexpectedError(
                "chirp references a missing user".to_string(),
            ));
        }

        let now = Utc::now();
        let chirp = Chirp {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            body: body.to_string(),
            user_id,
        };
        tables.chirps.push(chirp.clone());
        Ok(chirp)
    }

    async fn list_chirps(&self, author: Option<Uuid>) -> Result<Vec<Chirp>, DatabaseError> {
        let tables = self.tables.read().await;
        // Insertion order is creation order.
        Ok(tables
            .chirps
            .iter()
            .filter(|chirp| author.map_or(true, |id| chirp.user_id == id))
            .cloned()
            .collect())
    }

    async fn find_chirp(&self, chirp_id: Uuid) -> Result<Option<Chirp>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.chirps.iter().find(|chirp| chirp.id == chirp_id).cloned())
    }

    async fn delete_chirp(&self, chirp_id: Uuid) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write().await;
        let before = tables.chirps.len();
        tables.chirps.retain(|chirp| chirp.id != chirp_id);

        if tables.chirps.len() == before {
            return Err(DatabaseError::NotFound("chirp".to_string()));
        }
        Ok(())
    }
}
