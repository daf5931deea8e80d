use std::net::TcpListener;
use std::sync::Arc;

use token_auth::auth::PasswordHasher;
use token_auth::clock::SystemClock;
use token_auth::configuration::get_configuration;
use token_auth::startup::run;
use token_auth::store::PgUserStore;
use token_auth::telemetry::init_telemetry;

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
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    tracing::info!("Attempting to connect to database");
    let store = PgUserStore::connect(&configuration.database)
        .await
        .map(Arc::new)
        .map_err(|e| {
            tracing::error!("Failed to create connection pool: {}", e);
            std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "Database connection error",
            )
        })?;
    tracing::info!("Database connection pool created successfully");

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    let server = run(
        listener,
        store.clone(),
        configuration.jwt.clone(),
        PasswordHasher::new(configuration.hashing.cost),
        Arc::new(SystemClock),
    )?;

    let result = server.await;

    tracing::info!("Server stopped, closing database pool");
    store.close().await;

    result
}
