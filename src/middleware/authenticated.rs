/// Request extractors for authenticated routes
///
/// Handlers take one of these as an argument instead of parsing the
/// `Authorization` header themselves. A failed extraction answers 401 before
/// the handler runs.

use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use std::future::{ready, Ready};
use uuid::Uuid;

use crate::auth::{get_api_key, get_bearer_token, SessionManager};
use crate::error::AppError;

/// Subject of a valid access token.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
}

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

fn authenticate(req: &HttpRequest) -> Result<AuthenticatedUser, AppError> {
    let sessions = req
        .app_data::<web::Data<SessionManager>>()
        .ok_or_else(|| AppError::Internal("session manager not registered".to_string()))?;

    let token = get_bearer_token(req.headers())?;
    let user_id = sessions.authenticate(token)?;

    tracing::debug!(user_id = %user_id, "Access token validated");
    Ok(AuthenticatedUser { user_id })
}

/// Raw bearer credential, for routes that take a refresh token.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

impl FromRequest for BearerToken {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            get_bearer_token(req.headers())
                .map(|token| BearerToken(token.to_string()))
                .map_err(AppError::from),
        )
    }
}

/// Key from `Authorization: ApiKey <key>`. The handler compares it with the
/// configured key.
#[derive(Clone)]
pub struct ApiKey(pub String);

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(..)")
    }
}

impl FromRequest for ApiKey {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            get_api_key(req.headers())
                .map(|key| ApiKey(key.to_string()))
                .map_err(AppError::from),
        )
    }
}
