use axum::Router;
use axum::http::{HeaderValue, Method, header};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use corkboard_api::auth::AppState;

/// Build the full application router. With a configured client origin the
/// CORS layer is locked to it with credentials allowed (cookies don't cross
/// a wildcard); without one it stays permissive for local development.
pub fn app(state: AppState, client_origin: Option<&str>) -> anyhow::Result<Router> {
    let cors = match client_origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin.parse::<HeaderValue>()?)
            .allow_methods([Method::GET, Method::POST, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE])
            .allow_credentials(true),
        None => CorsLayer::permissive(),
    };

    Ok(corkboard_api::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http()))
}
