use std::collections::HashMap;

use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{error, warn};
use uuid::Uuid;

use clipstream_media::MediaStore;
use clipstream_types::api::{
    Claims, FeedItem, FeedQuery, LikeResponse, UpdateVideoRequest, VideoDetailResponse,
    VideoResponse,
};

use crate::auth::AppState;
use crate::convert;

/// GET /videos — the feed: optional keyword (substring against title OR
/// description), optional author filter, one of four sort keys. No
/// pagination; all matches come back in one response.
pub async fn list_feed(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let keyword = query.keyword;
    let author = query.author_id.map(|a| a.to_string());
    let sort = query.sort;

    let (rows, like_rows) = tokio::task::spawn_blocking(move || {
        let rows = db
            .db
            .list_videos(keyword.as_deref(), author.as_deref(), sort)
            .map_err(|e| {
                error!("video list query failed: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            })?;

        let video_ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
        let like_rows = db.db.get_likes_for_videos(&video_ids).map_err(|e| {
            error!("feed like fetch failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

        Ok::<_, StatusCode>((rows, like_rows))
    })
    .await
    .map_err(|e| { error!("spawn_blocking join error: {}", e); StatusCode::INTERNAL_SERVER_ERROR })??;

    // Group likes by video id (cheap in-memory work, fine on the async thread)
    let mut like_map: HashMap<String, Vec<LikeResponse>> = HashMap::new();
    for r in &like_rows {
        like_map
            .entry(r.video_id.clone())
            .or_default()
            .push(convert::like_response(r));
    }

    let feed: Vec<FeedItem> = rows
        .into_iter()
        .map(|row| {
            let likes = like_map.remove(&row.id).unwrap_or_default();
            FeedItem {
                author: convert::video_author(&row),
                like_count: likes.len(),
                likes,
                video: convert::video_response(&row),
            }
        })
        .collect();

    Ok(Json(feed))
}

/// GET /videos/{id} — detail view. Bumps the view counter by exactly one
/// per call before the fetch; the bump is fire-and-forget (logged, never
/// surfaced) and a silent no-op for unknown ids.
pub async fn get_detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let vid = id.to_string();

    let (row, comments, likes) = tokio::task::spawn_blocking(move || {
        if let Err(e) = db.db.increment_views(&vid) {
            warn!("view-count bump failed for video {}: {}", vid, e);
        }

        let row = db.db.get_video(&vid).map_err(|e| {
            error!("video detail query failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
        let Some(row) = row else {
            return Ok::<_, StatusCode>((None, vec![], vec![]));
        };

        let comments = db.db.get_comments_for_video(&vid).map_err(|e| {
            error!("comment fetch failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
        let likes = db.db.get_likes_for_video(&vid).map_err(|e| {
            error!("like fetch failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

        Ok((Some(row), comments, likes))
    })
    .await
    .map_err(|e| { error!("spawn_blocking join error: {}", e); StatusCode::INTERNAL_SERVER_ERROR })??;

    let Some(row) = row else {
        return Err(StatusCode::NOT_FOUND);
    };

    Ok(Json(VideoDetailResponse {
        author: convert::video_author(&row),
        video: convert::video_response(&row),
        comments: comments.iter().map(convert::comment_response).collect(),
        likes: likes.iter().map(convert::like_response).collect(),
    }))
}

/// POST /videos — multipart publish: `video` file (required), `cover`
/// file (optional), fields `title` (required), `description`, `ratio`.
pub async fn publish(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, StatusCode> {
    let mut title: Option<String> = None;
    let mut description: Option<String> = None;
    let mut ratio: Option<String> = None;
    let mut video_part: Option<(Option<String>, Bytes)> = None;
    let mut cover_part: Option<(Option<String>, Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?
    {
        match field.name().unwrap_or_default() {
            "title" => title = Some(field.text().await.map_err(|_| StatusCode::BAD_REQUEST)?),
            "description" => {
                description = Some(field.text().await.map_err(|_| StatusCode::BAD_REQUEST)?)
            }
            "ratio" => ratio = Some(field.text().await.map_err(|_| StatusCode::BAD_REQUEST)?),
            "video" => {
                let filename = field.file_name().map(str::to_string);
                let bytes = field.bytes().await.map_err(|_| StatusCode::BAD_REQUEST)?;
                video_part = Some((filename, bytes));
            }
            "cover" => {
                let filename = field.file_name().map(str::to_string);
                let bytes = field.bytes().await.map_err(|_| StatusCode::BAD_REQUEST)?;
                cover_part = Some((filename, bytes));
            }
            _ => {}
        }
    }

    // The video file is the one hard requirement.
    let (video_filename, video_bytes) = video_part.ok_or(StatusCode::BAD_REQUEST)?;
    if video_bytes.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let title = title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or(StatusCode::BAD_REQUEST)?;
    let description = description.filter(|d| !d.is_empty());
    let ratio = ratio.filter(|r| !r.is_empty()).unwrap_or_else(|| "3/4".to_string());

    let stored_video = MediaStore::unique_name("video", video_filename.as_deref());
    state.media.save(&stored_video, &video_bytes).await.map_err(|e| {
        error!("video file write failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    let video_url = format!("/uploads/{stored_video}");

    let cover_url = match cover_part {
        Some((filename, bytes)) if !bytes.is_empty() => {
            let stored_cover = MediaStore::unique_name("cover", filename.as_deref());
            state.media.save(&stored_cover, &bytes).await.map_err(|e| {
                error!("cover file write failed: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            })?;
            Some(format!("/uploads/{stored_cover}"))
        }
        _ => None,
    };

    let video_id = Uuid::new_v4();

    // Run the blocking DB insert off the async runtime
    let db = state.clone();
    let vid = video_id.to_string();
    let aid = claims.sub.to_string();
    let (t, d, vu, cu, r) = (
        title.clone(),
        description.clone(),
        video_url.clone(),
        cover_url.clone(),
        ratio.clone(),
    );
    tokio::task::spawn_blocking(move || {
        db.db
            .insert_video(&vid, &t, d.as_deref(), &vu, cu.as_deref(), &r, &aid)
    })
    .await
    .map_err(|e| { error!("spawn_blocking join error: {}", e); StatusCode::INTERNAL_SERVER_ERROR })?
    .map_err(|e| {
        // The stored files stay behind; orphaned media is an accepted
        // inconsistency, the row is the source of truth.
        error!("insert_video failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok((
        StatusCode::CREATED,
        Json(VideoResponse {
            id: video_id,
            title,
            description,
            video_url,
            cover_url,
            ratio,
            views: 0,
            author_id: claims.sub,
            created_at: chrono::Utc::now(),
        }),
    ))
}

/// PUT /videos/{id} — owner-only partial update of title/description.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateVideoRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    // A provided-but-blank title is a validation error; absent means unchanged.
    let title = req.title.map(|t| t.trim().to_string());
    if title.as_deref() == Some("") {
        return Err(StatusCode::BAD_REQUEST);
    }

    let db = state.clone();
    let vid = id.to_string();
    let caller = claims.sub.to_string();

    let row = tokio::task::spawn_blocking(move || {
        let existing = db
            .db
            .get_video(&vid)
            .map_err(|e| {
                error!("video lookup failed: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            })?
            .ok_or(StatusCode::NOT_FOUND)?;
        if existing.author_id != caller {
            return Err(StatusCode::FORBIDDEN);
        }

        db.db
            .update_video(&vid, title.as_deref(), req.description.as_deref())
            .map_err(|e| {
                error!("video update failed: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            })?;

        db.db
            .get_video(&vid)
            .map_err(|e| {
                error!("video re-fetch failed: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            })?
            .ok_or(StatusCode::NOT_FOUND)
    })
    .await
    .map_err(|e| { error!("spawn_blocking join error: {}", e); StatusCode::INTERNAL_SERVER_ERROR })??;

    Ok(Json(convert::video_response(&row)))
}

/// DELETE /videos/{id} — owner-only hard delete. Dependent comments and
/// likes go with the row in one transaction; the backing media files are
/// removed best-effort afterwards.
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let vid = id.to_string();
    let caller = claims.sub.to_string();

    let row = tokio::task::spawn_blocking(move || {
        let existing = db
            .db
            .get_video(&vid)
            .map_err(|e| {
                error!("video lookup failed: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            })?
            .ok_or(StatusCode::NOT_FOUND)?;
        if existing.author_id != caller {
            return Err(StatusCode::FORBIDDEN);
        }

        db.db.delete_video(&vid).map_err(|e| {
            error!("video delete failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

        Ok::<_, StatusCode>(existing)
    })
    .await
    .map_err(|e| { error!("spawn_blocking join error: {}", e); StatusCode::INTERNAL_SERVER_ERROR })??;

    // Rows are gone; file cleanup failures are logged and swallowed.
    let mut urls = vec![row.video_url.clone()];
    if let Some(cover) = &row.cover_url {
        urls.push(cover.clone());
    }
    for url in urls {
        if let Some(name) = clipstream_media::url_basename(&url) {
            if let Err(e) = state.media.delete(name).await {
                warn!("media cleanup failed for {}: {}", name, e);
            }
        }
    }

    Ok(Json(serde_json::json!({ "message": "video deleted" })))
}
