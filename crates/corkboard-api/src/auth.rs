use std::sync::Arc;

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::{info, warn};
use uuid::Uuid;

use corkboard_auth::Sessions;
use corkboard_auth::password::{hash_password, verify_password};
use corkboard_db::models::UserRow;
use corkboard_db::{Database, is_unique_violation};
use corkboard_types::api::{
    AuthStatusResponse, LoginRequest, LoginResponse, MembershipRequest, SignupRequest,
    SignupResponse, UserResponse,
};

use crate::error::{ApiError, blocking};
use crate::middleware::{CurrentUser, SESSION_COOKIE};
use crate::validate;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub sessions: Sessions,
    /// Shared static value compared for exact equality on the membership
    /// route. No rotation, no rate limiting.
    pub member_secret: String,
}

const DUPLICATE_USERNAME: &str = "A user with that username already exists";

/// `GET /api/auth` — report the restored identity, or `user: null`.
/// A session whose user record has since disappeared also reads as null.
pub async fn auth_status(
    State(state): State<AppState>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
) -> Result<Json<AuthStatusResponse>, ApiError> {
    let Some(session) = current else {
        return Ok(Json(AuthStatusResponse { user: None }));
    };

    let db = state.db.clone();
    let row = blocking(move || db.get_user_by_id(&session.id.to_string())).await?;

    Ok(Json(AuthStatusResponse {
        user: row.map(user_response),
    }))
}

/// `POST /api/signup` — validate, reject duplicates hard, hash, create,
/// and log the new user straight in (as the original flow does).
pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let errors = validate::validate_signup(&req);
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    // Uniqueness pre-check. Check-then-create is not transactional; racing
    // signups can both pass it, and the UNIQUE index below picks the winner.
    let db = state.db.clone();
    let username = req.username.clone();
    if blocking(move || db.count_by_username(&username)).await? > 0 {
        return Err(ApiError::Conflict(DUPLICATE_USERNAME));
    }

    // Argon2 is CPU-heavy by design; keep it off the async runtime.
    let password = req.password.clone();
    let digest = blocking(move || hash_password(&password)).await?;

    let user_id = Uuid::new_v4();
    let db = state.db.clone();
    let SignupRequest {
        first_name,
        last_name,
        username,
        ..
    } = req;
    let created = {
        let username = username.clone();
        blocking(move || {
            db.create_user(
                &user_id.to_string(),
                &first_name,
                &last_name,
                &username,
                &digest,
            )
        })
        .await
    };
    if let Err(err) = created {
        return Err(match err {
            // The race loser lands here; same outcome as the pre-check.
            ApiError::Store(e) if is_unique_violation(&e) => ApiError::Conflict(DUPLICATE_USERNAME),
            other => other,
        });
    }
    info!("New user: {}", username);

    let db = state.db.clone();
    let row = blocking(move || db.get_user_by_id(&user_id.to_string()))
        .await?
        .ok_or_else(|| ApiError::Store(anyhow::anyhow!("user {} vanished after insert", user_id)))?;

    let sessions = state.sessions.clone();
    let token = blocking(move || sessions.issue(user_id, &username)).await?;

    Ok((
        jar.add(session_cookie(token)),
        Json(SignupResponse {
            user: user_response(row),
        }),
    ))
}

/// `POST /api/login` — one lookup, one hash comparison. Unknown username
/// and wrong password take the same exit; store errors take a different
/// channel entirely.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    let username = req.username.clone();
    let Some(user) = blocking(move || db.get_user_by_username(&username)).await? else {
        return Err(ApiError::InvalidCredentials);
    };

    let password = req.password;
    let digest = user.password.clone();
    if !blocking(move || verify_password(&password, &digest)).await? {
        return Err(ApiError::InvalidCredentials);
    }

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| anyhow::anyhow!("corrupt user id '{}': {}", user.id, e))?;

    let sessions = state.sessions.clone();
    let username = user.username.clone();
    let token = blocking(move || sessions.issue(user_id, &username)).await?;
    info!("User logged in: {}", user.username);

    Ok((
        jar.add(session_cookie(token)),
        Json(LoginResponse {
            user: user_response(user),
            msg: "Logged in".to_string(),
        }),
    ))
}

/// `DELETE /api/logout` — destroy the session record before responding,
/// and clear the cookie. Responds 200 whether or not a session existed.
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        let token = cookie.value().to_string();
        let sessions = state.sessions.clone();
        blocking(move || sessions.destroy(&token)).await?;
    }

    Ok((
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        StatusCode::OK,
    ))
}

/// `POST /api/membership` — active session plus the exact membership secret
/// flips the caller's member and admin flags. Wrong secret reads the same
/// as no session.
pub async fn grant_membership(
    State(state): State<AppState>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    Json(req): Json<MembershipRequest>,
) -> Result<StatusCode, ApiError> {
    let Some(session) = current else {
        return Err(ApiError::Unauthenticated);
    };
    if req.secret != state.member_secret {
        return Err(ApiError::Unauthenticated);
    }

    let db = state.db.clone();
    let user_id = session.id.to_string();
    blocking(move || db.set_role(&user_id, Some(true), Some(true))).await?;
    info!("Membership granted to {}", session.username);

    Ok(StatusCode::OK)
}

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

pub(crate) fn user_response(row: UserRow) -> UserResponse {
    UserResponse {
        id: row.id.parse().unwrap_or_else(|e| {
            warn!("Corrupt user id '{}': {}", row.id, e);
            Uuid::default()
        }),
        created_at: crate::parse_timestamp(&row.created_at, "user"),
        updated_at: crate::parse_timestamp(&row.updated_at, "user"),
        first_name: row.first_name,
        last_name: row.last_name,
        username: row.username,
        is_member: row.is_member,
        is_admin: row.is_admin,
    }
}
