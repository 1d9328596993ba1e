/// Session Lifecycle
///
/// Login, refresh, revoke and bearer checks on top of the record store.
/// Access tokens are stateless; refresh tokens live in the store and move
/// through `Active -> Revoked | Expired`. A refresh never rotates the refresh
/// token: it stays usable until it expires or is revoked.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::jwt::{AccessTokenCodec, TokenError};
use crate::auth::password::{PasswordError, PasswordHash, PasswordHasher, MAX_PASSWORD_BYTES};
use crate::auth::refresh_token::{generate_refresh_token, RefreshTokenState};
use crate::configuration::{JwtSettings, PasswordSettings};
use crate::error::{AppError, AuthError, ConfigError, DatabaseError};
use crate::store::{RecordStore, UserProfile};

/// Verified against when the email is unknown, so the response time does not
/// reveal which emails are registered.
const DUMMY_PASSWORD: &str = "chirpy-timing-equalizer";

fn token_ttl(name: &str, seconds: i64) -> Result<Duration, AppError> {
    if !(1..=JwtSettings::MAX_EXPIRY_SECONDS).contains(&seconds) {
        return Err(ConfigError::InvalidValue(format!(
            "{} must be between 1 and {} seconds",
            name,
            JwtSettings::MAX_EXPIRY_SECONDS
        ))
        .into());
    }
    Duration::try_seconds(seconds)
        .ok_or_else(|| ConfigError::InvalidValue(format!("{} is out of range", name)).into())
}

/// Result of a successful login
#[derive(Debug, Clone, Serialize)]
pub struct LoginSession {
    #[serde(flatten)]
    pub user: UserProfile,
    #[serde(rename = "token")]
    pub access_token: String,
    pub refresh_token: String,
}

pub struct SessionManager {
    store: Arc<dyn RecordStore>,
    hasher: PasswordHasher,
    codec: AccessTokenCodec,
    access_token_ttl: Duration,
    refresh_token_ttl: Duration,
    dummy_hash: PasswordHash,
}

impl SessionManager {
    /// # Errors
    /// Fails on an empty signing key, an unusable bcrypt cost or a token
    /// lifetime outside `1..=JwtSettings::MAX_EXPIRY_SECONDS`.
    pub fn new(
        store: Arc<dyn RecordStore>,
        jwt: &JwtSettings,
        password: &PasswordSettings,
    ) -> Result<Self, AppError> {
        let access_token_ttl = token_ttl("jwt.access_token_expiry", jwt.access_token_expiry)?;
        let refresh_token_ttl = token_ttl("jwt.refresh_token_expiry", jwt.refresh_token_expiry)?;
        let codec = AccessTokenCodec::new(&jwt.secret, jwt.issuer.clone())?;
        let hasher = PasswordHasher::new(password.cost)?;
        let dummy_hash = hasher.hash(DUMMY_PASSWORD)?;

        Ok(Self {
            store,
            hasher,
            codec,
            access_token_ttl,
            refresh_token_ttl,
            dummy_hash,
        })
    }

    pub fn codec(&self) -> &AccessTokenCodec {
        &self.codec
    }

    /// Create an account. Duplicate emails surface as a conflict.
    pub async fn register(&self, email: &str, password: &str) -> Result<UserProfile, AppError> {
        let hash = self.hasher.hash_blocking(password.to_string()).await?;
        let user = self.store.create_user(email, &hash).await?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Replace the email and password of an existing account.
    pub async fn change_credentials(
        &self,
        user_id: Uuid,
        email: &str,
        password: &str,
    ) -> Result<UserProfile, AppError> {
        let hash = self.hasher.hash_blocking(password.to_string()).await?;
        let user = self
            .store
            .update_user_credentials(user_id, email, &hash)
            .await
            .map_err(|e| match e {
                // The account behind a valid token is gone.
                DatabaseError::NotFound(_) => AppError::Auth(AuthError::TokenInvalid),
                other => AppError::Database(other),
            })?;

        tracing::info!(user_id = %user.id, "User credentials updated");
        Ok(user)
    }

    /// Exchange email and password for an access/refresh token pair.
    ///
    /// Unknown email and wrong password fail identically.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginSession, AppError> {
        // bcrypt only reads the first 72 bytes, so a longer input could match
        // a stored password it merely starts with.
        if password.len() > MAX_PASSWORD_BYTES {
            tracing::warn!("Login rejected: password exceeds bcrypt input limit");
            return Err(AuthError::InvalidCredentials.into());
        }

        let credential = self.store.find_credential_by_email(email).await?;

        let (user_id, hash) = match credential {
            Some(credential) => (Some(credential.user_id), credential.password_hash),
            None => (None, self.dummy_hash.clone()),
        };

        let verified = self.hasher.verify_blocking(password.to_string(), hash).await;
        let user_id = match (user_id, verified) {
            (Some(user_id), Ok(())) => user_id,
            (None, Ok(())) | (_, Err(PasswordError::Mismatch)) => {
                tracing::warn!("Login rejected: unknown email or wrong password");
                return Err(AuthError::InvalidCredentials.into());
            }
            (_, Err(e)) => return Err(e.into()),
        };

        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let access_token = self.codec.issue(user.id, self.access_token_ttl)?;
        let refresh_token = generate_refresh_token()?;
        let expires_at = Utc::now()
            .checked_add_signed(self.refresh_token_ttl)
            .ok_or_else(|| AppError::Internal("refresh token expiry overflowed".to_string()))?;
        self.store
            .insert_refresh_token(&refresh_token, user.id, expires_at)
            .await?;

        tracing::info!(user_id = %user.id, "User logged in");
        Ok(LoginSession {
            user,
            access_token,
            refresh_token,
        })
    }

    /// Issue a new access token for an active refresh token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, AppError> {
        self.refresh_at(refresh_token, Utc::now()).await
    }

    pub async fn refresh_at(
        &self,
        refresh_token: &str,
        now: DateTime<Utc>,
    ) -> Result<String, AppError> {
        let record = self
            .store
            .find_refresh_token(refresh_token)
            .await?
            .ok_or_else(|| {
                tracing::warn!("Refresh rejected: unknown refresh token");
                AuthError::RefreshTokenRejected
            })?;

        let state = record.state_at(now).map_err(|fault| {
            tracing::error!(user_id = %record.user_id, error = %fault, "Refresh token store is inconsistent");
            AppError::Internal(fault.to_string())
        })?;

        match state {
            RefreshTokenState::Active => {
                let access_token =
                    self.codec
                        .issue_at(record.user_id, self.access_token_ttl, now)?;
                tracing::info!(user_id = %record.user_id, "Access token refreshed");
                Ok(access_token)
            }
            RefreshTokenState::Revoked | RefreshTokenState::Expired => {
                tracing::warn!(user_id = %record.user_id, state = ?state, "Refresh rejected");
                Err(AuthError::RefreshTokenRejected.into())
            }
        }
    }

    /// Revoke a refresh token. Revoking a dead token again is a no-op.
    pub async fn revoke(&self, refresh_token: &str) -> Result<(), AppError> {
        self.revoke_at(refresh_token, Utc::now()).await
    }

    pub async fn revoke_at(&self, refresh_token: &str, now: DateTime<Utc>) -> Result<(), AppError> {
        let record = self
            .store
            .find_refresh_token(refresh_token)
            .await?
            .ok_or(AuthError::RefreshTokenRejected)?;

        let state = record.state_at(now).map_err(|fault| {
            tracing::error!(user_id = %record.user_id, error = %fault, "Refresh token store is inconsistent");
            AppError::Internal(fault.to_string())
        })?;

        if state != RefreshTokenState::Active {
            tracing::debug!(user_id = %record.user_id, state = ?state, "Refresh token already unusable");
            return Ok(());
        }

        self.store
            .mark_refresh_token_revoked(refresh_token, now)
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound(_) => AppError::Auth(AuthError::RefreshTokenRejected),
                other => AppError::Database(other),
            })?;

        tracing::info!(user_id = %record.user_id, "Refresh token revoked");
        Ok(())
    }

    /// Validate an access token and return its subject.
    pub fn authenticate(&self, access_token: &str) -> Result<Uuid, AppError> {
        self.codec.validate(access_token).map_err(|e| {
            tracing::debug!(error = %e, "Access token rejected");
            match e {
                TokenError::MissingKey | TokenError::Signing(_) => AppError::from(e),
                TokenError::Expired => AuthError::TokenExpired.into(),
                _ => AuthError::TokenInvalid.into(),
            }
        })
    }

    /// The check every handler runs before mutating data owned by
    /// `resource_owner`.
    pub fn verify_bearer_for_resource(
        &self,
        access_token: &str,
        resource_owner: Uuid,
    ) -> Result<Uuid, AppError> {
        let subject = self.authenticate(access_token)?;
        ensure_owner(subject, resource_owner)?;
        Ok(subject)
    }
}

/// Forbidden unless `subject` owns the resource.
fn ensure_owner(subject: Uuid, resource_owner: Uuid) -> Result<(), AppError> {
    if subject != resource_owner {
        tracing::warn!(user_id = %subject, owner_id = %resource_owner, "Ownership check failed");
        return Err(AuthError::Forbidden.into());
    }
    Ok(())
}
