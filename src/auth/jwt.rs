/// JWT Access Token Issuance and Validation
///
/// Access tokens are HS256-signed, stateless and never revocable. Only the
/// signing key and expiry decide whether one is accepted.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::auth::claims::Claims;

/// The only algorithm this codec signs with or accepts.
const EXPECTED_ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token signature does not verify")]
    BadSignature,
    #[error("token is not signed with HS256")]
    WrongAlgorithm,
    #[error("token has expired")]
    Expired,
    #[error("malformed token: {0}")]
    Malformed(String),
    #[error("signing key is empty")]
    MissingKey,
    #[error("token signing failed: {0}")]
    Signing(String),
}

#[derive(Clone)]
pub struct AccessTokenCodec {
    issuer: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl fmt::Debug for AccessTokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessTokenCodec")
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

impl AccessTokenCodec {
    /// # Errors
    /// Returns `MissingKey` for an empty secret
    pub fn new(secret: &str, issuer: impl Into<String>) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::MissingKey);
        }

        Ok(Self {
            issuer: issuer.into(),
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        })
    }

    /// Issue a signed access token for `subject`, valid for `ttl`
    pub fn issue(&self, subject: Uuid, ttl: Duration) -> Result<String, TokenError> {
        self.issue_at(subject, ttl, Utc::now())
    }

    pub fn issue_at(
        &self,
        subject: Uuid,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = Claims::new(subject, &self.issuer, now, ttl)?;

        encode(&Header::new(EXPECTED_ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Validate an access token and return its subject
    ///
    /// Checks, in order: header algorithm, signature and issuer, expiry,
    /// subject format.
    pub fn validate(&self, token: &str) -> Result<Uuid, TokenError> {
        self.validate_at(token, Utc::now())
    }

    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<Uuid, TokenError> {
        let header = decode_header(token).map_err(map_jwt_error)?;
        match header.alg {
            EXPECTED_ALGORITHM => {}
            _ => return Err(TokenError::WrongAlgorithm),
        }

        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation())
            .map(|data| data.claims)
            .map_err(map_jwt_error)?;

        if claims.is_expired_at(now) {
            return Err(TokenError::Expired);
        }

        claims.subject()
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(EXPECTED_ALGORITHM);
        // Expiry is checked against the caller's clock in `validate_at`.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation.set_issuer(&[&self.issuer]);
        validation
    }
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        ErrorKind::InvalidSignature => TokenError::BadSignature,
        ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => TokenError::WrongAlgorithm,
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Malformed(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec(secret: &str) -> AccessTokenCodec {
        AccessTokenCodec::new(secret, "chirpy").expect("valid secret")
    }

    #[test]
    fn test_issue_and_validate_token() {
        for secret in ["new secret", "20f181b52ec1eeb31b2ad0"] {
            let codec = codec(secret);
            let user_id = Uuid::new_v4();

            let token = codec.issue(user_id, Duration::minutes(1)).expect("Failed to issue token");
            let subject = codec.validate(&token).expect("Failed to validate token");

            assert_eq!(subject, user_id);
        }
    }

    #[tokio::test]
    async fn test_expired_token() {
        let codec = codec("secret");
        let token = codec
            .issue(Uuid::new_v4(), Duration::milliseconds(10))
            .expect("Failed to issue token");

        tokio::time::sleep(std::time::Duration::from_millis(30)).await;

        assert_eq!(codec.validate(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_expiry_uses_supplied_clock() {
        let codec = codec("secret");
        let issued = Utc::now();
        let token = codec.issue_at(Uuid::new_v4(), Duration::hours(1), issued).unwrap();

        assert!(codec.validate_at(&token, issued + Duration::minutes(59)).is_ok());
        assert_eq!(
            codec.validate_at(&token, issued + Duration::hours(1)),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn test_wrong_secret() {
        let token = codec("secret1").issue(Uuid::new_v4(), Duration::minutes(1)).unwrap();

        assert_eq!(codec("secret2").validate(&token), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_tampered_token() {
        let codec = codec("secret");
        let token = codec.issue(Uuid::new_v4(), Duration::minutes(1)).unwrap();

        let tampered = format!("{}X", token);
        assert!(codec.validate(&tampered).is_err());
    }

    #[test]
    fn test_foreign_algorithm_is_rejected() {
        let codec = codec("secret");
        let claims =
            Claims::new(Uuid::new_v4(), "chirpy", Utc::now(), Duration::minutes(1)).unwrap();
        let token = encode(
            &Header::new(Algorithm::HS384),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();

        assert_eq!(codec.validate(&token), Err(TokenError::WrongAlgorithm));
    }

    #[test]
    fn test_wrong_issuer() {
        let token = AccessTokenCodec::new("secret", "someone-else")
            .unwrap()
            .issue(Uuid::new_v4(), Duration::minutes(1))
            .unwrap();

        assert!(matches!(codec("secret").validate(&token), Err(TokenError::Malformed(_))));
    }

    #[test]
    fn test_non_uuid_subject() {
        let claims = Claims {
            iss: "chirpy".to_string(),
            sub: "not-a-uuid".to_string(),
            iat: Utc::now().timestamp(),
            exp: Utc::now().timestamp() + 60,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();

        assert!(matches!(codec("secret").validate(&token), Err(TokenError::Malformed(_))));
    }

    #[test]
    fn test_garbage_token() {
        assert!(matches!(
            codec("secret").validate("invalid.token.here"),
            Err(TokenError::Malformed(_))
        ));
    }

    #[test]
    fn test_empty_secret() {
        assert_eq!(
            AccessTokenCodec::new("", "chirpy").map(|_| ()),
            Err(TokenError::MissingKey)
        );
    }
}
