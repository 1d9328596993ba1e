/// Authentication Routes
///
/// Login, access token refresh and refresh token revocation.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::SessionManager;
use crate::error::{AppError, ErrorContext};
use crate::middleware::BearerToken;

/// User login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct AccessTokenResponse {
    pub token: String,
}

/// POST /api/login
///
/// Returns the user profile with an access token (`token`) and a
/// refresh token (`refresh_token`).
///
/// # Errors
/// - 401: unknown email or wrong password, with the same body for both
pub async fn login(
    form: web::Json<LoginRequest>,
    sessions: web::Data<SessionManager>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_login");

    let session = sessions
        .login(form.email.trim(), &form.password)
        .await
        .map_err(|e| context.record(e))?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %session.user.id,
        "User logged in successfully"
    );

    Ok(HttpResponse::Ok().json(session))
}

/// POST /api/refresh
///
/// Exchanges the refresh token in `Authorization: Bearer` for a new access
/// token. The refresh token itself stays valid.
pub async fn refresh(
    token: BearerToken,
    sessions: web::Data<SessionManager>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("token_refresh");

    let access_token = sessions
        .refresh(&token.0)
        .await
        .map_err(|e| context.record(e))?;

    Ok(HttpResponse::Ok().json(AccessTokenResponse {
        token: access_token,
    }))
}

/// POST /api/revoke
pub async fn revoke(
    token: BearerToken,
    sessions: web::Data<SessionManager>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("token_revoke");

    sessions
        .revoke(&token.0)
        .await
        .map_err(|e| context.record(e))?;

    Ok(HttpResponse::NoContent().finish())
}
