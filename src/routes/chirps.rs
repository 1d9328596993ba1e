/// Chirp Routes
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::SessionManager;
use crate::error::{AppError, AuthError, DatabaseError, ErrorContext, ValidationError};
use crate::middleware::{AuthenticatedUser, BearerToken};
use crate::store::RecordStore;
use crate::validators::validate_chirp;

#[derive(Deserialize)]
pub struct CreateChirpRequest {
    pub body: String,
}

#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Deserialize)]
pub struct ListChirpsQuery {
    pub author_id: Option<Uuid>,
    #[serde(default)]
    pub sort: SortOrder,
}

fn parse_chirp_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw)
        .map_err(|_| AppError::Validation(ValidationError::InvalidFormat("chirp id".to_string())))
}

fn chirp_not_found() -> AppError {
    AppError::Database(DatabaseError::NotFound("chirp".to_string()))
}

/// POST /api/chirps
///
/// **Requires a valid access token.** The body is censored before it is
/// stored.
///
/// # Errors
/// - 400: empty body, or 140 characters and longer
/// - 401: missing or invalid token, or the account no longer exists
pub async fn create_chirp(
    user: AuthenticatedUser,
    form: web::Json<CreateChirpRequest>,
    store: web::Data<dyn RecordStore>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("chirp_creation").with_user_id(user.user_id);

    let body = validate_chirp(&form.body)?;

    if store.find_user_by_id(user.user_id).await?.is_none() {
        return Err(context.record(AuthError::TokenInvalid.into()));
    }

    let chirp = store
        .create_chirp(&body, user.user_id)
        .await
        .map_err(|e| context.record(e.into()))?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user.user_id,
        chirp_id = %chirp.id,
        "Chirp created"
    );

    Ok(HttpResponse::Created().json(chirp))
}

/// GET /api/chirps?author_id=<uuid>&sort=asc|desc
pub async fn list_chirps(
    query: web::Query<ListChirpsQuery>,
    store: web::Data<dyn RecordStore>,
) -> Result<HttpResponse, AppError> {
    let mut chirps = store.list_chirps(query.author_id).await?;
    if query.sort == SortOrder::Desc {
        chirps.reverse();
    }

    Ok(HttpResponse::Ok().json(chirps))
}

/// GET /api/chirps/{chirp_id}
pub async fn get_chirp(
    path: web::Path<String>,
    store: web::Data<dyn RecordStore>,
) -> Result<HttpResponse, AppError> {
    let chirp_id = parse_chirp_id(&path)?;
    let chirp = store.find_chirp(chirp_id).await?.ok_or_else(chirp_not_found)?;

    Ok(HttpResponse::Ok().json(chirp))
}

/// DELETE /api/chirps/{chirp_id}
///
/// Only the author may delete a chirp.
///
/// # Errors
/// - 400: malformed chirp id
/// - 401: missing or invalid token
/// - 403: caller is not the author
/// - 404: no such chirp
pub async fn delete_chirp(
    token: BearerToken,
    path: web::Path<String>,
    sessions: web::Data<SessionManager>,
    store: web::Data<dyn RecordStore>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("chirp_deletion");

    let chirp_id = parse_chirp_id(&path)?;
    let chirp = match store.find_chirp(chirp_id).await? {
        Some(chirp) => chirp,
        None => {
            // An invalid token still answers 401, not 404.
            sessions.authenticate(&token.0).map_err(|e| context.record(e))?;
            return Err(chirp_not_found());
        }
    };

    let subject = sessions
        .verify_bearer_for_resource(&token.0, chirp.user_id)
        .map_err(|e| context.record(e))?;

    store.delete_chirp(chirp.id).await?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %subject,
        chirp_id = %chirp.id,
        "Chirp deleted"
    );

    Ok(HttpResponse::NoContent().finish())
}
