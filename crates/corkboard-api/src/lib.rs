pub mod auth;
pub mod error;
pub mod messages;
pub mod middleware;
pub mod validate;

use axum::Router;
use axum::routing::{delete, get, post};

use crate::auth::AppState;

/// Assemble the `/api` routes. Every route runs behind the session-restore
/// middleware; per-route authorization happens in the handlers.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/auth", get(auth::auth_status))
        .route("/api/signup", post(auth::signup))
        .route("/api/login", post(auth::login))
        .route("/api/logout", delete(auth::logout))
        .route("/api/membership", post(auth::grant_membership))
        .route(
            "/api/messages",
            get(messages::list_messages).post(messages::post_message),
        )
        .route("/api/messages/{message_id}", delete(messages::delete_message))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::load_session,
        ))
        .with_state(state)
}

/// Parse a timestamp column. SQLite defaults store "YYYY-MM-DD HH:MM:SS"
/// without timezone; treat those as naive UTC.
pub(crate) fn parse_timestamp(raw: &str, context: &str) -> chrono::DateTime<chrono::Utc> {
    raw.parse::<chrono::DateTime<chrono::Utc>>()
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::warn!("Corrupt timestamp '{}' on {}: {}", raw, context, e);
            chrono::DateTime::default()
        })
}
