/// Refresh Token Generation and State
///
/// Refresh tokens are 32 bytes from the operating system's CSPRNG, hex
/// encoded. The stored record is the only state; a token moves from
/// `Active` to either `Revoked` or `Expired` and never back.

use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use uuid::Uuid;

const REFRESH_TOKEN_BYTES: usize = 32;

#[derive(Debug, thiserror::Error)]
#[error("secure random source unavailable: {0}")]
pub struct EntropyError(String);

/// Generate a new refresh token
///
/// # Errors
/// Fails if the OS random source cannot be read. There is no fallback to a
/// weaker generator.
pub fn generate_refresh_token() -> Result<String, EntropyError> {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| EntropyError(e.to_string()))?;

    Ok(hex::encode(bytes))
}

/// A persisted refresh token row.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct RefreshTokenRecord {
    pub token: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTokenState {
    Active,
    Expired,
    Revoked,
}

/// A row whose `revoked_at` lies after the evaluation time. Revocation always
/// stamps the current time, so this row was written by something else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("refresh token is marked revoked at {revoked_at}, which is after {now}")]
pub struct FutureRevocation {
    pub revoked_at: DateTime<Utc>,
    pub now: DateTime<Utc>,
}

impl RefreshTokenRecord {
    pub fn state_at(&self, now: DateTime<Utc>) -> Result<RefreshTokenState, FutureRevocation> {
        match self.revoked_at {
            Some(revoked_at) if now >= revoked_at => Ok(RefreshTokenState::Revoked),
            Some(revoked_at) => Err(FutureRevocation { revoked_at, now }),
            None if now >= self.expires_at => Ok(RefreshTokenState::Expired),
            None => Ok(RefreshTokenState::Active),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::collections::HashSet;

    fn record(expires_at: DateTime<Utc>, revoked_at: Option<DateTime<Utc>>) -> RefreshTokenRecord {
        let now = Utc::now();
        RefreshTokenRecord {
            token: generate_refresh_token().unwrap(),
            user_id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            expires_at,
            revoked_at,
        }
    }

    #[test]
    fn test_generate_refresh_token() {
        let token = generate_refresh_token().unwrap();

        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hex::decode(&token).unwrap().len(), REFRESH_TOKEN_BYTES);
    }

    #[test]
    fn test_tokens_do_not_collide() {
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            let token = generate_refresh_token().unwrap();
            assert_eq!(token.len(), 64);
            assert!(seen.insert(token), "duplicate refresh token generated");
        }
    }

    #[test]
    fn test_fresh_token_is_active() {
        let now = Utc::now();
        let row = record(now + Duration::days(60), None);

        assert_eq!(row.state_at(now), Ok(RefreshTokenState::Active));
    }

    #[test]
    fn test_expiry_boundary() {
        let expires_at = Utc::now() + Duration::days(60);
        let row = record(expires_at, None);

        assert_eq!(
            row.state_at(expires_at - Duration::seconds(1)),
            Ok(RefreshTokenState::Active)
        );
        assert_eq!(row.state_at(expires_at), Ok(RefreshTokenState::Expired));
        assert_eq!(
            row.state_at(expires_at + Duration::seconds(1)),
            Ok(RefreshTokenState::Expired)
        );
    }

    #[test]
    fn test_revoked_token() {
        let now = Utc::now();
        let row = record(now + Duration::days(60), Some(now - Duration::minutes(1)));

        assert_eq!(row.state_at(now), Ok(RefreshTokenState::Revoked));
    }

    #[test]
    fn test_revocation_wins_over_expiry() {
        let now = Utc::now();
        let row = record(now - Duration::days(1), Some(now - Duration::days(2)));

        assert_eq!(row.state_at(now), Ok(RefreshTokenState::Revoked));
    }

    #[test]
    fn test_future_revocation_is_a_fault() {
        let now = Utc::now();
        let revoked_at = now + Duration::hours(1);
        let row = record(now + Duration::days(60), Some(revoked_at));

        assert_eq!(row.state_at(now), Err(FutureRevocation { revoked_at, now }));
    }
}
