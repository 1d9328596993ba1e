/// Payment provider webhooks
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::configuration::PolkaSettings;
use crate::error::{AppError, AuthError, ErrorContext};
use crate::middleware::ApiKey;
use crate::store::RecordStore;

const USER_UPGRADED: &str = "user.upgraded";

/// Compare API keys without an early exit on the first differing byte.
/// Only the length can leak, and the configured key length is not secret.
fn api_key_matches(provided: &str, expected: &str) -> bool {
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}

#[derive(Deserialize)]
pub struct WebhookData {
    pub user_id: Uuid,
}

#[derive(Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    pub data: WebhookData,
}

/// POST /api/polka/webhooks
///
/// Upgrades a user to Chirpy Red on `user.upgraded`. Other events are
/// acknowledged and ignored.
///
/// # Errors
/// - 401: missing or wrong API key
/// - 404: unknown user
pub async fn polka_webhook(
    key: ApiKey,
    event: web::Json<WebhookEvent>,
    polka: web::Data<PolkaSettings>,
    store: web::Data<dyn RecordStore>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("polka_webhook");

    if !api_key_matches(&key.0, &polka.api_key) {
        return Err(context.record(AuthError::InvalidApiKey.into()));
    }

    if event.event != USER_UPGRADED {
        tracing::debug!(event = %event.event, "Ignoring webhook event");
        return Ok(HttpResponse::NoContent().finish());
    }

    let user_id = event.data.user_id;
    store
        .upgrade_user_to_red(user_id)
        .await
        .map_err(|e| context.record(e.into()))?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user_id,
        "User upgraded to Chirpy Red"
    );

    Ok(HttpResponse::NoContent().finish())
}
