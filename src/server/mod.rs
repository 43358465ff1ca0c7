//! HTTP surface: pet listings CRUD, open-data proxy endpoints and health checks.

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{DefaultBodyLimit, Request},
    http::{header::CONTENT_TYPE, HeaderName, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::{get, put},
    Router,
};
use tokio::net::TcpListener;
use tokio::signal::{self, ctrl_c};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{error, info, warn};

pub mod error;
pub mod health;
pub mod pets;
pub mod proxy;
pub mod state;

use crate::config::Config;
use state::AppState;

const BODY_LIMIT: usize = 10 * 1024 * 1024;

pub fn router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.allowed_origins);

    Router::new()
        .route("/", get(health::root))
        .route("/api/health", get(health::health))
        .route("/api/echo", get(health::echo))
        .route("/api/db/ping", get(health::db_ping))
        .route("/api/pets", get(pets::list_pets).post(pets::create_pet))
        .route(
            "/api/pets/:id",
            put(pets::update_pet).delete(pets::delete_pet),
        )
        .route("/api/adopt", get(proxy::adopt))
        .route("/api/lost", get(proxy::lost))
        .route("/api/shelters", get(proxy::shelters))
        .route("/api/shelters/stats", get(proxy::shelter_stats))
        .route("/api/_debug/open-data/:dataset", get(proxy::probe))
        .fallback(health::not_found)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(middleware::from_fn(log_requests))
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            HeaderValue::from_str(origin)
                .map_err(|_| warn!("Ignoring invalid CORS origin {origin:?}"))
                .ok()
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60))
}

async fn log_requests(request: Request, next: Next) -> Response {
    info!("[REQ] {} {}", request.method(), request.uri());

    let mut response = next.run(request).await;
    response.headers_mut().insert(
        HeaderName::from_static("x-from-backend"),
        HeaderValue::from_static("furfriends-api"),
    );
    response
}

pub async fn serve(config: Config) -> Result<(), Box<dyn Error>> {
    info!("Initializing state...");
    let state = AppState::new(config)?;

    let address = format!("0.0.0.0:{}", state.config.port);
    let app = router(state);

    info!("Binding to {address}");
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
