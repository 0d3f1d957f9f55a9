/// Database row types — these map directly to SQLite rows.
/// Distinct from the corkboard-types API models to keep the DB layer
/// independent.

pub struct UserRow {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub password: String,
    pub is_member: bool,
    pub is_admin: bool,
    pub created_at: String,
    pub updated_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub author_id: String,
    /// None when the author row no longer exists.
    pub author_username: Option<String>,
    pub title: String,
    pub body: String,
    pub created_at: String,
    pub updated_at: String,
}

pub struct SessionRow {
    pub id: String,
    pub user_id: String,
    pub username: String,
    pub expires_at: String,
}
