/// Database row types — these map directly to SQLite rows.
/// Distinct from clipstream-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub avatar: String,
    pub created_at: String,
}

pub struct VideoRow {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub video_url: String,
    pub cover_url: Option<String>,
    pub ratio: String,
    pub views: i64,
    pub author_id: String,
    pub created_at: String,
    pub author_username: String,
    pub author_avatar: String,
}

pub struct LikeRow {
    pub id: String,
    pub user_id: String,
    pub video_id: String,
    pub created_at: String,
}

pub struct CommentRow {
    pub id: String,
    pub video_id: String,
    pub user_id: String,
    pub content: String,
    pub created_at: String,
    pub author_username: String,
    pub author_avatar: String,
}
