/// User Routes
///
/// Account creation and credential changes. Tokens are only handed out by
/// `POST /api/login`.

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::auth::SessionManager;
use crate::error::{AppError, ErrorContext};
use crate::middleware::AuthenticatedUser;
use crate::validators::is_valid_email;

#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

/// POST /api/users
///
/// # Errors
/// - 400: invalid email, empty or over-long password
/// - 409: email already registered
pub async fn create_user(
    form: web::Json<CredentialsRequest>,
    sessions: web::Data<SessionManager>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_registration");

    let email = is_valid_email(&form.email)?;
    let user = sessions
        .register(&email, &form.password)
        .await
        .map_err(|e| context.record(e))?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user.id,
        "User registered successfully"
    );

    Ok(HttpResponse::Created().json(user))
}

/// PUT /api/users
///
/// Replaces the caller's email and password.
/// **Requires a valid access token.**
pub async fn update_user(
    user: AuthenticatedUser,
    form: web::Json<CredentialsRequest>,
    sessions: web::Data<SessionManager>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_update").with_user_id(user.user_id);

    let email = is_valid_email(&form.email)?;
    let profile = sessions
        .change_credentials(user.user_id, &email, &form.password)
        .await
        .map_err(|e| context.record(e))?;

    Ok(HttpResponse::Ok().json(profile))
}
