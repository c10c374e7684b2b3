use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            username    TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            avatar      TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS videos (
            id          TEXT PRIMARY KEY,
            title       TEXT NOT NULL,
            description TEXT,
            video_url   TEXT NOT NULL,
            cover_url   TEXT,
            ratio       TEXT NOT NULL DEFAULT '3/4',
            views       INTEGER NOT NULL DEFAULT 0,
            author_id   TEXT NOT NULL REFERENCES users(id),
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_videos_author
            ON videos(author_id, created_at);

        CREATE TABLE IF NOT EXISTS likes (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id),
            video_id    TEXT NOT NULL REFERENCES videos(id),
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(user_id, video_id)
        );

        CREATE INDEX IF NOT EXISTS idx_likes_video
            ON likes(video_id);

        CREATE TABLE IF NOT EXISTS comments (
            id          TEXT PRIMARY KEY,
            video_id    TEXT NOT NULL REFERENCES videos(id),
            user_id     TEXT NOT NULL REFERENCES users(id),
            content     TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_comments_video
            ON comments(video_id, created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
