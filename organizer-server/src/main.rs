mod routes;
mod state;

use anyhow::Result;
use axum::Router;
use axum::http::HeaderValue;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use organizer_core::Settings;

use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let settings = Settings::from_env()?;
    let state = AppState::new(&settings)?;

    let cors = build_cors(&settings.allowed_origins)?;

    let app = Router::new()
        .merge(routes::natural::router())
        .merge(routes::calendar::router())
        .merge(routes::tasks::router())
        .merge(routes::contacts::router())
        .merge(routes::health::router())
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", settings.host, settings.port);
    info!("organizer-server listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Empty allow-list means any origin.
fn build_cors(allowed_origins: &[String]) -> Result<CorsLayer> {
    let cors = if allowed_origins.is_empty() {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins = allowed_origins
            .iter()
            .map(|origin| Ok(origin.parse::<HeaderValue>()?))
            .collect::<Result<Vec<_>>>()?;
        CorsLayer::new().allow_origin(origins)
    };
    Ok(cors.allow_methods(Any).allow_headers(Any))
}
