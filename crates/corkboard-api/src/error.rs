use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use corkboard_types::api::FieldError;

/// Boundary error taxonomy. Validation and authorization failures are
/// produced before any store call; store failures surface as explicit 500s
/// rather than being swallowed.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed")]
    Validation(Vec<FieldError>),
    /// Bad credentials on login. Unknown username and wrong password are
    /// deliberately indistinguishable.
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("authentication required")]
    Unauthenticated,
    #[error("insufficient privileges")]
    Forbidden,
    #[error("{0}")]
    Conflict(&'static str),
    #[error("not found")]
    NotFound,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(errors) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "errors": errors }))).into_response()
            }
            ApiError::InvalidCredentials => {
                json_msg(StatusCode::UNAUTHORIZED, "Invalid username or password")
            }
            ApiError::Unauthenticated => {
                json_msg(StatusCode::UNAUTHORIZED, "Authentication required")
            }
            ApiError::Forbidden => json_msg(StatusCode::FORBIDDEN, "Admin privileges required"),
            ApiError::Conflict(msg) => json_msg(StatusCode::CONFLICT, msg),
            ApiError::NotFound => StatusCode::NOT_FOUND.into_response(),
            ApiError::Store(err) => {
                error!("store failure: {:#}", err);
                json_msg(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

fn json_msg(status: StatusCode, msg: &str) -> Response {
    (status, Json(json!({ "msg": msg }))).into_response()
}

/// Run a blocking store call off the async runtime.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Store(anyhow::anyhow!("blocking task failed: {}", e))
        })?
        .map_err(ApiError::Store)
}
