use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;
use std::sync::Arc;

use chirpy::auth::SessionManager;
use chirpy::configuration::get_configuration;
use chirpy::startup::run;
use chirpy::store::{MemoryStore, PgStore, RecordStore};
use chirpy::telemetry::init_telemetry;

fn startup_error(kind: std::io::ErrorKind, message: &str) -> std::io::Error {
    std::io::Error::new(kind, message.to_string())
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry("info");

    tracing::info!("Starting application");

    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(startup_error(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    if let Err(e) = configuration.validate() {
        tracing::error!("Invalid configuration: {}", e);
        return Err(startup_error(
            std::io::ErrorKind::InvalidInput,
            "Configuration error",
        ));
    }

    let store: Arc<dyn RecordStore> = if configuration.database.in_memory {
        tracing::warn!("Using the in-memory record store; data is lost on shutdown");
        Arc::new(MemoryStore::new())
    } else {
        tracing::info!("Attempting to connect to database");
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&configuration.database.connection_string())
            .await
            .map_err(|e| {
                tracing::error!("Failed to create connection pool: {}", e);
                startup_error(
                    std::io::ErrorKind::ConnectionRefused,
                    "Database connection error",
                )
            })?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to run migrations: {}", e);
                startup_error(std::io::ErrorKind::Other, "Migration error")
            })?;

        tracing::info!("Database connection pool created successfully");
        Arc::new(PgStore::new(pool))
    };

    let sessions = SessionManager::new(
        store.clone(),
        &configuration.jwt,
        &configuration.password,
    )
    .map_err(|e| {
        tracing::error!("Failed to initialise session manager: {}", e);
        startup_error(std::io::ErrorKind::InvalidInput, "Configuration error")
    })?;

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!(
        platform = ?configuration.application.platform,
        "Server listening on: {}",
        address
    );

    let server = run(listener, store, sessions, &configuration)?;
    server.await
}
