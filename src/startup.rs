use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::{AuthService, PasswordHasher, TokenIssuer};
use crate::clock::Clock;
use crate::configuration::JwtSettings;
use crate::logger::LoggerMiddleware;
use crate::middleware::JwtMiddleware;
use crate::routes::{health_check, logout, refresh, sign_in, sign_up};
use crate::store::UserStore;

/// Build the HTTP server around an already constructed store.
///
/// The store handle is owned by the caller, which is responsible for closing
/// it once the returned server has stopped.
pub fn run(
    listener: TcpListener,
    store: Arc<dyn UserStore>,
    jwt_config: JwtSettings,
    hasher: PasswordHasher,
    clock: Arc<dyn Clock>,
) -> Result<Server, std::io::Error> {
    let issuer = Arc::new(TokenIssuer::new(&jwt_config, clock));
    let service = AuthService::new(store, issuer.clone(), hasher).map_err(|e| {
        tracing::error!("Failed to build auth service: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;
    let auth = web::Data::new(service);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(LoggerMiddleware)
            .app_data(auth.clone())
            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/auth")
                    // Public routes
                    .route("/local/signup", web::post().to(sign_up))
                    .route("/local/signin", web::post().to(sign_in))
                    // Guarded routes
                    .service(
                        web::resource("/logout")
                            .wrap(JwtMiddleware::access(issuer.clone()))
                            .route(web::post().to(logout)),
                    )
                    .service(
                        web::resource("/refresh")
                            .wrap(JwtMiddleware::refresh(issuer.clone()))
                            .route(web::post().to(refresh)),
                    ),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
