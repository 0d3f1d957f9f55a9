use crate::Database;
use crate::models::{MessageRow, SessionRow, UserRow};
use anyhow::Result;
use rusqlite::Connection;

impl Database {
    // -- Users --

    /// Insert a user record. `password` is the argon2 digest — plaintext
    /// must never reach this layer.
    pub fn create_user(
        &self,
        id: &str,
        first_name: &str,
        last_name: &str,
        username: &str,
        password_hash: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, first_name, last_name, username, password)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (id, first_name, last_name, username, password_hash),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    /// Uniqueness pre-check for signup. Check-then-create is not
    /// transactional; the UNIQUE index on username settles races.
    pub fn count_by_username(&self, username: &str) -> Result<u32> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM users WHERE username = ?1",
                [username],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    /// Update role flags; unset options leave the stored flag untouched.
    pub fn set_role(
        &self,
        id: &str,
        is_admin: Option<bool>,
        is_member: Option<bool>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE users SET
                     is_admin   = COALESCE(?2, is_admin),
                     is_member  = COALESCE(?3, is_member),
                     updated_at = datetime('now')
                 WHERE id = ?1",
                (id, is_admin, is_member),
            )?;
            Ok(())
        })
    }

    // -- Messages --

    pub fn insert_message(&self, id: &str, author_id: &str, title: &str, body: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO messages (id, author_id, title, body) VALUES (?1, ?2, ?3, ?4)",
                (id, author_id, title, body),
            )?;
            Ok(())
        })
    }

    pub fn list_messages(&self) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            // JOIN users to fetch the author username in a single query
            let mut stmt = conn.prepare(
                "SELECT m.id, m.author_id, u.username, m.title, m.body, m.created_at, m.updated_at
                 FROM messages m
                 LEFT JOIN users u ON m.author_id = u.id
                 ORDER BY m.created_at ASC",
            )?;

            let rows = stmt
                .query_map([], |row| {
                    Ok(MessageRow {
                        id: row.get(0)?,
                        author_id: row.get(1)?,
                        author_username: row.get(2)?,
                        title: row.get(3)?,
                        body: row.get(4)?,
                        created_at: row.get(5)?,
                        updated_at: row.get(6)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Returns false when no row matched. The admin check happens in the
    /// HTTP layer; this call trusts its caller.
    pub fn delete_message(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let affected = conn.execute("DELETE FROM messages WHERE id = ?1", [id])?;
            Ok(affected > 0)
        })
    }

    // -- Sessions --

    pub fn insert_session(
        &self,
        id: &str,
        user_id: &str,
        username: &str,
        expires_at: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO sessions (id, user_id, username, expires_at) VALUES (?1, ?2, ?3, ?4)",
                (id, user_id, username, expires_at),
            )?;
            Ok(())
        })
    }

    pub fn get_session(&self, id: &str) -> Result<Option<SessionRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT id, user_id, username, expires_at FROM sessions WHERE id = ?1")?;

            let row = stmt
                .query_row([id], |row| {
                    Ok(SessionRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        username: row.get(2)?,
                        expires_at: row.get(3)?,
                    })
                })
                .optional()?;

            Ok(row)
        })
    }

    /// Push the sliding expiry window forward.
    pub fn touch_session(&self, id: &str, expires_at: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE sessions SET expires_at = ?2 WHERE id = ?1",
                (id, expires_at),
            )?;
            Ok(())
        })
    }

    pub fn delete_session(&self, id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute("DELETE FROM sessions WHERE id = ?1", [id])?;
            Ok(())
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!(
        "SELECT id, first_name, last_name, username, password,
                is_member, is_admin, created_at, updated_at
         FROM users WHERE {} = ?1",
        column
    );
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                first_name: row.get(1)?,
                last_name: row.get(2)?,
                username: row.get(3)?,
                password: row.get(4)?,
                is_member: row.get(5)?,
                is_admin: row.get(6)?,
                created_at: row.get(7)?,
                updated_at: row.get(8)?,
            })
        })
        .optional()?;

    Ok(row)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{Database, is_unique_violation};

    fn seed_user(db: &Database, id: &str, username: &str) {
        db.create_user(id, "Jo", "Public", username, "$argon2id$stub")
            .unwrap();
    }

    #[test]
    fn duplicate_username_hits_unique_index() {
        let db = Database::open_in_memory().unwrap();
        seed_user(&db, "u1", "jo@x.com");

        let err = db
            .create_user("u2", "Jo", "Public", "jo@x.com", "$argon2id$stub")
            .unwrap_err();
        assert!(is_unique_violation(&err));

        assert_eq!(db.count_by_username("jo@x.com").unwrap(), 1);
    }

    #[test]
    fn count_by_username_distinguishes_present_and_absent() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.count_by_username("jo@x.com").unwrap(), 0);
        seed_user(&db, "u1", "jo@x.com");
        assert_eq!(db.count_by_username("jo@x.com").unwrap(), 1);
    }

    #[test]
    fn set_role_updates_only_given_flags() {
        let db = Database::open_in_memory().unwrap();
        seed_user(&db, "u1", "jo@x.com");

        db.set_role("u1", Some(true), None).unwrap();
        let user = db.get_user_by_id("u1").unwrap().unwrap();
        assert!(user.is_admin);
        assert!(!user.is_member);

        db.set_role("u1", None, Some(true)).unwrap();
        let user = db.get_user_by_id("u1").unwrap().unwrap();
        assert!(user.is_admin);
        assert!(user.is_member);
    }

    #[test]
    fn list_messages_joins_author_username() {
        let db = Database::open_in_memory().unwrap();
        seed_user(&db, "u1", "jo@x.com");
        db.insert_message("m1", "u1", "Hi", "First post").unwrap();

        let rows = db.list_messages().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].author_id, "u1");
        assert_eq!(rows[0].author_username.as_deref(), Some("jo@x.com"));
        assert_eq!(rows[0].title, "Hi");
    }

    #[test]
    fn delete_message_reports_missing_rows() {
        let db = Database::open_in_memory().unwrap();
        seed_user(&db, "u1", "jo@x.com");
        db.insert_message("m1", "u1", "Hi", "First post").unwrap();

        assert!(db.delete_message("m1").unwrap());
        assert!(!db.delete_message("m1").unwrap());
        assert!(db.list_messages().unwrap().is_empty());
    }

    #[test]
    fn session_roundtrip_and_delete() {
        let db = Database::open_in_memory().unwrap();
        db.insert_session("tok", "u1", "jo@x.com", "2099-01-01T00:00:00Z")
            .unwrap();

        let row = db.get_session("tok").unwrap().unwrap();
        assert_eq!(row.user_id, "u1");
        assert_eq!(row.username, "jo@x.com");

        db.touch_session("tok", "2099-06-01T00:00:00Z").unwrap();
        let row = db.get_session("tok").unwrap().unwrap();
        assert_eq!(row.expires_at, "2099-06-01T00:00:00Z");

        db.delete_session("tok").unwrap();
        assert!(db.get_session("tok").unwrap().is_none());
    }
}
