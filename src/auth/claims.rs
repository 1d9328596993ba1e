/// JWT Claims structure
///
/// Registered claims only (RFC 7519): issuer, subject, issued-at, expiry.
/// Times are whole NumericDate seconds.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::jwt::TokenError;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Issuer
    pub iss: String,
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Build claims for `subject`, valid from `now` for `ttl`.
    ///
    /// The expiry is truncated to the second, so a sub-second `ttl` can
    /// produce a token that is already expired.
    ///
    /// # Errors
    /// Returns `Signing` if `now + ttl` is not a representable time
    pub fn new(
        subject: Uuid,
        issuer: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<Self, TokenError> {
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| TokenError::Signing("expiry is out of range".to_string()))?;

        Ok(Self {
            iss: issuer.to_string(),
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        })
    }

    /// Extract the user ID from the subject claim
    ///
    /// # Errors
    /// Returns `Malformed` if the subject is not a valid UUID
    pub fn subject(&self) -> Result<Uuid, TokenError> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| TokenError::Malformed("subject is not a user id".to_string()))
    }

    /// Expired once `now` reaches `exp`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }
}
