use std::sync::Arc;

use anyhow::{Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use corkboard_db::Database;

/// The minimal identity projection stored against a session token.
/// Restoring it is a pass-through, not a password re-verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub username: String,
}

/// Server-side session store with a sliding inactivity window.
///
/// Tokens are opaque 256-bit random values; the client only ever sees the
/// token, never the projection. Expiry is evaluated on access — there is no
/// background sweep.
#[derive(Clone)]
pub struct Sessions {
    db: Arc<Database>,
    ttl: Duration,
}

impl Sessions {
    pub fn new(db: Arc<Database>, ttl: Duration) -> Self {
        Self { db, ttl }
    }

    /// Issue a fresh token for an authenticated user and persist the
    /// {id, username} projection with `expires_at = now + ttl`.
    pub fn issue(&self, user_id: Uuid, username: &str) -> Result<String> {
        let token = generate_token();
        let expires_at = Utc::now() + self.ttl;

        self.db.insert_session(
            &token,
            &user_id.to_string(),
            username,
            &expires_at.to_rfc3339(),
        )?;

        debug!("Issued session for {}", username);
        Ok(token)
    }

    /// Restore the identity behind a token. A live session has its window
    /// pushed forward; an expired one is deleted on the spot.
    pub fn load(&self, token: &str) -> Result<Option<SessionUser>> {
        let Some(row) = self.db.get_session(token)? else {
            return Ok(None);
        };

        let expires_at: DateTime<Utc> = row
            .expires_at
            .parse()
            .map_err(|e| anyhow!("corrupt session expiry '{}': {}", row.expires_at, e))?;

        if expires_at <= Utc::now() {
            self.db.delete_session(token)?;
            debug!("Session for {} expired", row.username);
            return Ok(None);
        }

        let refreshed = Utc::now() + self.ttl;
        self.db.touch_session(token, &refreshed.to_rfc3339())?;

        let id = row
            .user_id
            .parse()
            .map_err(|e| anyhow!("corrupt session user id '{}': {}", row.user_id, e))?;

        Ok(Some(SessionUser {
            id,
            username: row.username,
        }))
    }

    /// Destroy a session record; the token no longer restores an identity.
    pub fn destroy(&self, token: &str) -> Result<()> {
        self.db.delete_session(token)
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    B64.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sessions(ttl_secs: i64) -> Sessions {
        let db = Arc::new(Database::open_in_memory().unwrap());
        Sessions::new(db, Duration::seconds(ttl_secs))
    }

    #[test]
    fn issued_token_restores_same_identity() {
        let sessions = sessions(300);
        let user_id = Uuid::new_v4();

        let token = sessions.issue(user_id, "jo@x.com").unwrap();
        let user = sessions.load(&token).unwrap().unwrap();

        assert_eq!(user.id, user_id);
        assert_eq!(user.username, "jo@x.com");
    }

    #[test]
    fn destroyed_token_no_longer_restores() {
        let sessions = sessions(300);
        let token = sessions.issue(Uuid::new_v4(), "jo@x.com").unwrap();

        sessions.destroy(&token).unwrap();
        assert!(sessions.load(&token).unwrap().is_none());
    }

    #[test]
    fn expired_session_is_removed_on_access() {
        let sessions = sessions(-1);
        let token = sessions.issue(Uuid::new_v4(), "jo@x.com").unwrap();

        assert!(sessions.load(&token).unwrap().is_none());
        // The record is gone, not just filtered out
        assert!(sessions.db.get_session(&token).unwrap().is_none());
    }

    #[test]
    fn load_slides_the_expiry_window_forward() {
        let sessions = sessions(300);
        let token = sessions.issue(Uuid::new_v4(), "jo@x.com").unwrap();

        let before = sessions.db.get_session(&token).unwrap().unwrap().expires_at;
        std::thread::sleep(std::time::Duration::from_millis(20));
        sessions.load(&token).unwrap().unwrap();
        let after = sessions.db.get_session(&token).unwrap().unwrap().expires_at;

        assert!(after > before, "expiry did not advance: {} -> {}", before, after);
    }

    #[test]
    fn unknown_token_is_anonymous() {
        let sessions = sessions(300);
        assert!(sessions.load("no-such-token").unwrap().is_none());
    }

    #[test]
    fn tokens_are_unique_and_opaque() {
        let sessions = sessions(300);
        let a = sessions.issue(Uuid::new_v4(), "a@x.com").unwrap();
        let b = sessions.issue(Uuid::new_v4(), "b@x.com").unwrap();
        assert_ne!(a, b);
        assert!(!a.contains("a@x.com"));
    }
}
