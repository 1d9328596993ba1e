/// Admin Routes
///
/// File server metrics and the development-only data reset.

use actix_web::{web, HttpResponse};

use crate::configuration::Platform;
use crate::error::AppError;
use crate::middleware::HitCounter;
use crate::store::RecordStore;

fn metrics_page(hits: u32) -> String {
    format!(
        r#"<html>
  <body>
    <h1>Welcome, Chirpy Admin</h1>
    <p>Chirpy has been visited {} times!</p>
  </body>
</html>"#,
        hits
    )
}

/// GET /admin/metrics
pub async fn metrics(counter: web::Data<HitCounter>) -> HttpResponse {
    let hits = counter.hits();
    tracing::debug!(hits = hits, "Served metrics page");

    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(metrics_page(hits))
}

/// POST /admin/reset
///
/// Deletes every user (with their chirps and refresh tokens) and zeroes the
/// hit counter. Refused outside development.
pub async fn reset(
    platform: web::Data<Platform>,
    counter: web::Data<HitCounter>,
    store: web::Data<dyn RecordStore>,
) -> Result<HttpResponse, AppError> {
    if *platform.get_ref() != Platform::Development {
        tracing::warn!(platform = ?platform.get_ref(), "Reset refused");
        return Ok(HttpResponse::Forbidden()
            .content_type("text/plain; charset=utf-8")
            .body("Forbidden.\n"));
    }

    let deleted = store.reset_users().await?;
    counter.reset();
    tracing::info!(deleted_users = deleted, "Reset users and hit counter");

    Ok(HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body("Reset hit counter.\nReset Users table.\n"))
}
