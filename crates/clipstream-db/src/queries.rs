use crate::Database;
use crate::models::{CommentRow, LikeRow, UserRow, VideoRow};
use anyhow::Result;
use clipstream_types::api::SortKey;
use rusqlite::Connection;

const VIDEO_COLUMNS: &str = "v.id, v.title, v.description, v.video_url, v.cover_url, v.ratio, v.views, v.author_id, v.created_at, u.username, u.avatar";

impl Database {
    // -- Users --

    pub fn create_user(&self, id: &str, username: &str, password_hash: &str, avatar: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, password, avatar) VALUES (?1, ?2, ?3, ?4)",
                (id, username, password_hash, avatar),
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

    pub fn update_password(&self, id: &str, password_hash: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET password = ?2 WHERE id = ?1",
                (id, password_hash),
            )?;
            Ok(())
        })
    }

    // -- Videos --

    #[allow(clippy::too_many_arguments)]
    pub fn insert_video(
        &self,
        id: &str,
        title: &str,
        description: Option<&str>,
        video_url: &str,
        cover_url: Option<&str>,
        ratio: &str,
        author_id: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO videos (id, title, description, video_url, cover_url, ratio, author_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![id, title, description, video_url, cover_url, ratio, author_id],
            )?;
            Ok(())
        })
    }

    /// Feed listing: optional substring keyword (title OR description),
    /// optional author filter, one of four sort keys. No pagination.
    pub fn list_videos(
        &self,
        keyword: Option<&str>,
        author_id: Option<&str>,
        sort: SortKey,
    ) -> Result<Vec<VideoRow>> {
        self.with_conn(|conn| {
            let mut sql = format!(
                "SELECT {VIDEO_COLUMNS}
                 FROM videos v
                 LEFT JOIN users u ON v.author_id = u.id"
            );

            let mut clauses: Vec<String> = Vec::new();
            let mut params: Vec<String> = Vec::new();

            if let Some(kw) = keyword.filter(|k| !k.is_empty()) {
                let pattern = format!("%{kw}%");
                params.push(pattern.clone());
                let title_idx = params.len();
                params.push(pattern);
                let desc_idx = params.len();
                clauses.push(format!(
                    "(v.title LIKE ?{title_idx} OR v.description LIKE ?{desc_idx})"
                ));
            }
            if let Some(aid) = author_id {
                params.push(aid.to_string());
                clauses.push(format!("v.author_id = ?{}", params.len()));
            }

            if !clauses.is_empty() {
                sql.push_str(" WHERE ");
                sql.push_str(&clauses.join(" AND "));
            }

            sql.push_str(match sort {
                SortKey::Newest => " ORDER BY v.created_at DESC",
                SortKey::Oldest => " ORDER BY v.created_at ASC",
                SortKey::MostViewed => " ORDER BY v.views DESC",
                SortKey::MostLiked => {
                    " ORDER BY (SELECT COUNT(*) FROM likes l WHERE l.video_id = v.id) DESC"
                }
            });

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(params.iter()), map_video_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    pub fn get_video(&self, id: &str) -> Result<Option<VideoRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {VIDEO_COLUMNS}
                 FROM videos v
                 LEFT JOIN users u ON v.author_id = u.id
                 WHERE v.id = ?1"
            );
            let mut stmt = conn.prepare(&sql)?;
            let row = stmt.query_row([id], map_video_row).optional()?;
            Ok(row)
        })
    }

    /// Partial update of owner-mutable fields; absent fields stay unchanged.
    pub fn update_video(&self, id: &str, title: Option<&str>, description: Option<&str>) -> Result<usize> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE videos
                 SET title = COALESCE(?2, title),
                     description = COALESCE(?3, description)
                 WHERE id = ?1",
                rusqlite::params![id, title, description],
            )?;
            Ok(changed)
        })
    }

    /// Best-effort view bump. A plain UPDATE: silently a no-op for
    /// unknown ids, never decrements.
    pub fn increment_views(&self, id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("UPDATE videos SET views = views + 1 WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    /// Cascading hard delete: comments, likes, then the video row, in one
    /// transaction so a mid-cascade failure cannot leave orphaned rows.
    pub fn delete_video(&self, id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM comments WHERE video_id = ?1", [id])?;
            tx.execute("DELETE FROM likes WHERE video_id = ?1", [id])?;
            tx.execute("DELETE FROM videos WHERE id = ?1", [id])?;
            tx.commit()?;
            Ok(())
        })
    }

    // -- Likes --

    /// Toggle a like: removes if the (user, video) pair exists, inserts if not.
    /// Returns the resulting liked state. The connection lock makes the
    /// check-then-act atomic in-process; the UNIQUE(user_id, video_id)
    /// constraint is the storage-level backstop, and a violation on insert
    /// is reported as an already-liked success rather than an error.
    pub fn toggle_like(&self, id: &str, user_id: &str, video_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let existing: Option<String> = conn
                .query_row(
                    "SELECT id FROM likes WHERE user_id = ?1 AND video_id = ?2",
                    [user_id, video_id],
                    |row| row.get(0),
                )
                .optional()?;

            if let Some(existing_id) = existing {
                conn.execute("DELETE FROM likes WHERE id = ?1", [&existing_id])?;
                Ok(false)
            } else {
                match conn.execute(
                    "INSERT INTO likes (id, user_id, video_id) VALUES (?1, ?2, ?3)",
                    [id, user_id, video_id],
                ) {
                    Ok(_) => Ok(true),
                    Err(rusqlite::Error::SqliteFailure(e, _))
                        if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
                    {
                        // Lost a race against a concurrent toggle-on; the
                        // pair already exists, so the state is "liked".
                        Ok(true)
                    }
                    Err(e) => Err(e.into()),
                }
            }
        })
    }

    pub fn get_likes_for_video(&self, video_id: &str) -> Result<Vec<LikeRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, video_id, created_at FROM likes WHERE video_id = ?1",
            )?;
            let rows = stmt
                .query_map([video_id], map_like_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Batch-fetch likes for a set of video IDs (avoids N+1 on the feed).
    pub fn get_likes_for_videos(&self, video_ids: &[String]) -> Result<Vec<LikeRow>> {
        if video_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> = (1..=video_ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT id, user_id, video_id, created_at FROM likes WHERE video_id IN ({})",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(video_ids.iter()), map_like_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Comments --

    pub fn insert_comment(&self, id: &str, video_id: &str, user_id: &str, content: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO comments (id, video_id, user_id, content) VALUES (?1, ?2, ?3, ?4)",
                [id, video_id, user_id, content],
            )?;
            Ok(())
        })
    }

    /// Comments for the detail view, newest first. rowid breaks ties for
    /// rows created within the same second.
    pub fn get_comments_for_video(&self, video_id: &str) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, c.video_id, c.user_id, c.content, c.created_at, u.username, u.avatar
                 FROM comments c
                 LEFT JOIN users u ON c.user_id = u.id
                 WHERE c.video_id = ?1
                 ORDER BY c.created_at DESC, c.rowid DESC",
            )?;
            let rows = stmt
                .query_map([video_id], |row| {
                    Ok(CommentRow {
                        id: row.get(0)?,
                        video_id: row.get(1)?,
                        user_id: row.get(2)?,
                        content: row.get(3)?,
                        created_at: row.get(4)?,
                        author_username: row
                            .get::<_, Option<String>>(5)?
                            .unwrap_or_else(|| "unknown".to_string()),
                        author_avatar: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn map_video_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<VideoRow> {
    Ok(VideoRow {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        video_url: row.get(3)?,
        cover_url: row.get(4)?,
        ratio: row.get(5)?,
        views: row.get(6)?,
        author_id: row.get(7)?,
        created_at: row.get(8)?,
        author_username: row
            .get::<_, Option<String>>(9)?
            .unwrap_or_else(|| "unknown".to_string()),
        author_avatar: row.get::<_, Option<String>>(10)?.unwrap_or_default(),
    })
}

fn map_like_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<LikeRow> {
    Ok(LikeRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        video_id: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!(
        "SELECT id, username, password, avatar, created_at FROM users WHERE {column} = ?1"
    );
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                password: row.get(2)?,
                avatar: row.get(3)?,
                created_at: row.get(4)?,
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
