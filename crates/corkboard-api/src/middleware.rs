use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::cookie::CookieJar;

use corkboard_auth::SessionUser;

use crate::auth::AppState;
use crate::error::{ApiError, blocking};

/// Name of the cookie carrying the opaque session token.
pub const SESSION_COOKIE: &str = "corkboard_sid";

/// The request's authenticated-identity slot: `None` for anonymous callers.
/// Inserted on every request so handlers can gate per-route.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Option<SessionUser>);

/// Restore the session identity from the cookie, sliding its expiry window.
/// A missing, expired or destroyed session leaves the caller anonymous —
/// only the handlers decide whether that is an error.
pub async fn load_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = CookieJar::from_headers(req.headers())
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string());

    let user = match token {
        Some(token) => {
            let sessions = state.sessions.clone();
            blocking(move || sessions.load(&token)).await?
        }
        None => None,
    };

    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}
