use actix_files as fs;
use actix_web::dev::Server;
use actix_web::{error::JsonPayloadError, middleware::Logger, web, App, HttpRequest, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::SessionManager;
use crate::configuration::Settings;
use crate::error::{AppError, ValidationError};
use crate::logger::LoggerMiddleware;
use crate::middleware::{HitCounter, HitCounterMiddleware};
use crate::routes::{
    create_chirp, create_user, delete_chirp, get_chirp, health_check, list_chirps, login, metrics,
    polka_webhook, refresh, reset, revoke, update_user,
};
use crate::store::RecordStore;

fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    tracing::warn!(error = %err, "Rejected request body");
    AppError::Validation(ValidationError::InvalidFormat("request body".to_string())).into()
}

pub fn run(
    listener: TcpListener,
    store: Arc<dyn RecordStore>,
    sessions: SessionManager,
    settings: &Settings,
) -> Result<Server, std::io::Error> {
    let store: web::Data<dyn RecordStore> = web::Data::from(store);
    let sessions = web::Data::new(sessions);
    let hit_counter = Arc::new(HitCounter::new());
    let hit_counter_data = web::Data::from(hit_counter.clone());
    let platform = web::Data::new(settings.application.platform);
    let polka = web::Data::new(settings.polka.clone());
    let static_dir = settings.application.static_dir.clone();

    let server = HttpServer::new(move || {
        App::new()
            // Global middleware
            .wrap(Logger::default())
            .wrap(LoggerMiddleware)

            // Shared state
            .app_data(store.clone())
            .app_data(sessions.clone())
            .app_data(hit_counter_data.clone())
            .app_data(platform.clone())
            .app_data(polka.clone())
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))

            .service(
                web::scope("/api")
                    .route("/healthz", web::get().to(health_check))
                    .route("/users", web::post().to(create_user))
                    .route("/users", web::put().to(update_user))
                    .route("/login", web::post().to(login))
                    .route("/refresh", web::post().to(refresh))
                    .route("/revoke", web::post().to(revoke))
                    .route("/chirps", web::post().to(create_chirp))
                    .route("/chirps", web::get().to(list_chirps))
                    .route("/chirps/{chirp_id}", web::get().to(get_chirp))
                    .route("/chirps/{chirp_id}", web::delete().to(delete_chirp))
                    .route("/polka/webhooks", web::post().to(polka_webhook)),
            )
            .service(
                web::scope("/admin")
                    .route("/metrics", web::get().to(metrics))
                    .route("/reset", web::post().to(reset)),
            )

            // Static file serving, every hit counted
            .service(
                web::scope("/app")
                    .wrap(HitCounterMiddleware::new(hit_counter.clone()))
                    .service(fs::Files::new("", &static_dir).index_file("index.html")),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
