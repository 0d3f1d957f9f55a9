use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{info, warn};
use uuid::Uuid;

use corkboard_types::api::{
    FieldError, MessageAuthor, MessageResponse, MessagesResponse, PostMessageRequest,
    PostMessageResponse,
};

use crate::auth::AppState;
use crate::error::{ApiError, blocking};
use crate::middleware::CurrentUser;
use crate::validate;

/// Display name shown to unauthenticated viewers in place of the real
/// author. Applied at the read boundary only; stored rows keep the real
/// author reference.
pub const ANONYMOUS_AUTHOR: &str = "Anonymous";

/// `GET /api/messages` — everyone may list; only authenticated callers see
/// who wrote what.
pub async fn list_messages(
    State(state): State<AppState>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
) -> Result<Json<MessagesResponse>, ApiError> {
    let db = state.db.clone();
    let rows = blocking(move || db.list_messages()).await?;
    let authenticated = current.is_some();

    let messages = rows
        .into_iter()
        .map(|row| {
            let author = if authenticated {
                MessageAuthor {
                    id: Some(row.author_id.parse().unwrap_or_else(|e| {
                        warn!("Corrupt author_id '{}' on message '{}': {}", row.author_id, row.id, e);
                        Uuid::default()
                    })),
                    // LEFT JOIN miss: the author row is gone
                    username: row
                        .author_username
                        .clone()
                        .unwrap_or_else(|| "unknown".to_string()),
                }
            } else {
                MessageAuthor {
                    id: None,
                    username: ANONYMOUS_AUTHOR.to_string(),
                }
            };

            MessageResponse {
                id: row.id.parse().unwrap_or_else(|e| {
                    warn!("Corrupt message id '{}': {}", row.id, e);
                    Uuid::default()
                }),
                created_at: crate::parse_timestamp(&row.created_at, "message"),
                updated_at: crate::parse_timestamp(&row.updated_at, "message"),
                author,
                title: row.title,
                body: row.body,
            }
        })
        .collect();

    Ok(Json(MessagesResponse { messages }))
}

/// `POST /api/messages` — validated but not session-gated, preserving the
/// original surface. An author id that matches no user is a field error,
/// same as a missing one.
pub async fn post_message(
    State(state): State<AppState>,
    Json(req): Json<PostMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let errors = validate::validate_message(&req);
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let message_id = Uuid::new_v4();
    let db = state.db.clone();
    let PostMessageRequest {
        author,
        title,
        body,
    } = req;

    let author_row = {
        let (author, title, body) = (author.clone(), title.clone(), body.clone());
        blocking(move || {
            let Some(author_row) = db.get_user_by_id(&author)? else {
                return Ok(None);
            };
            db.insert_message(&message_id.to_string(), &author, &title, &body)?;
            Ok(Some(author_row))
        })
        .await?
    };
    let Some(author_row) = author_row else {
        return Err(ApiError::Validation(vec![FieldError {
            field: "author",
            msg: "author must be sent with message",
        }]));
    };

    let author_id: Uuid = author_row
        .id
        .parse()
        .map_err(|e| anyhow::anyhow!("corrupt user id '{}': {}", author_row.id, e))?;
    let now = chrono::Utc::now();

    Ok(Json(PostMessageResponse {
        message: MessageResponse {
            id: message_id,
            author: MessageAuthor {
                id: Some(author_id),
                username: author_row.username,
            },
            title,
            body,
            created_at: now,
            updated_at: now,
        },
    }))
}

/// `DELETE /api/messages/{message_id}` — active session plus the admin flag.
/// The flag is re-read from the store so a grant made after login takes
/// effect immediately; the session projection carries no roles.
pub async fn delete_message(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
) -> Result<StatusCode, ApiError> {
    let Some(session) = current else {
        return Err(ApiError::Unauthenticated);
    };

    let db = state.db.clone();
    let user_id = session.id.to_string();
    let user = blocking(move || db.get_user_by_id(&user_id))
        .await?
        .ok_or(ApiError::NotFound)?;
    if !user.is_admin {
        return Err(ApiError::Forbidden);
    }

    let db = state.db.clone();
    let id = message_id.clone();
    let deleted = blocking(move || db.delete_message(&id)).await?;
    if !deleted {
        return Err(ApiError::NotFound);
    }
    info!("Message {} deleted by {}", message_id, user.username);

    Ok(StatusCode::OK)
}
