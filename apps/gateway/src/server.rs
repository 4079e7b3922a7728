use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use db_infra::ServerSettings;
use tracing::error;

use crate::error::AppError;
use crate::middleware::StructuredLogger;
use crate::state::AppState;

/// Bind the HTTP listener and return the not-yet-awaited server.
///
/// No routes are mounted; every request falls through to actix's default 404.
/// The server handles SIGINT/SIGTERM itself and drains in-flight requests.
///
/// actix has no response-write deadline; `write_timeout` bounds how long a
/// connection may linger for the client to disconnect once a response is done.
pub fn build_server(settings: &ServerSettings, state: AppState) -> Result<Server, AppError> {
    let data = web::Data::new(state);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(StructuredLogger)
            .app_data(data.clone())
    })
    .client_request_timeout(settings.read_timeout)
    .client_disconnect_timeout(settings.write_timeout)
    .bind((settings.host.as_str(), settings.port))
    .map_err(|e| {
        error!(host = %settings.host, port = settings.port, error = %e, "server=bind_failed");
        AppError::Server(e)
    })?
    .run();

    Ok(server)
}
