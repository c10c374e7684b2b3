//! Row-to-wire mapping. DB rows keep SQLite-native strings; these
//! helpers surface typed ids and timestamps, logging (not failing) on
//! corrupt stored values.

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use clipstream_db::models::{CommentRow, LikeRow, UserRow, VideoRow};
use clipstream_types::api::{CommentResponse, LikeResponse, UserPublic, VideoResponse};

pub(crate) fn parse_uuid(raw: &str, what: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", what, raw, e);
        Uuid::default()
    })
}

pub(crate) fn parse_created_at(raw: &str, what: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
            // Parse as naive UTC and convert.
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt created_at '{}' on {}: {}", raw, what, e);
            DateTime::default()
        })
}

pub(crate) fn user_public(row: &UserRow) -> UserPublic {
    UserPublic {
        id: parse_uuid(&row.id, "user id"),
        username: row.username.clone(),
        avatar: row.avatar.clone(),
    }
}

pub(crate) fn video_response(row: &VideoRow) -> VideoResponse {
    VideoResponse {
        id: parse_uuid(&row.id, "video id"),
        title: row.title.clone(),
        description: row.description.clone(),
        video_url: row.video_url.clone(),
        cover_url: row.cover_url.clone(),
        ratio: row.ratio.clone(),
        views: row.views,
        author_id: parse_uuid(&row.author_id, "video author_id"),
        created_at: parse_created_at(&row.created_at, "video"),
    }
}

pub(crate) fn video_author(row: &VideoRow) -> UserPublic {
    UserPublic {
        id: parse_uuid(&row.author_id, "video author_id"),
        username: row.author_username.clone(),
        avatar: row.author_avatar.clone(),
    }
}

pub(crate) fn like_response(row: &LikeRow) -> LikeResponse {
    LikeResponse {
        id: parse_uuid(&row.id, "like id"),
        user_id: parse_uuid(&row.user_id, "like user_id"),
        video_id: parse_uuid(&row.video_id, "like video_id"),
        created_at: parse_created_at(&row.created_at, "like"),
    }
}

pub(crate) fn comment_response(row: &CommentRow) -> CommentResponse {
    CommentResponse {
        id: parse_uuid(&row.id, "comment id"),
        content: row.content.clone(),
        user_id: parse_uuid(&row.user_id, "comment user_id"),
        video_id: parse_uuid(&row.video_id, "comment video_id"),
        created_at: parse_created_at(&row.created_at, "comment"),
        user: UserPublic {
            id: parse_uuid(&row.user_id, "comment user_id"),
            username: row.author_username.clone(),
            avatar: row.author_avatar.clone(),
        },
    }
}
