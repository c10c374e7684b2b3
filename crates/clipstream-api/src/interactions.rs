use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::error;
use uuid::Uuid;

use clipstream_types::api::{Claims, CommentResponse, CreateCommentRequest, ToggleLikeResponse};

use crate::auth::AppState;
use crate::convert;

/// The client caps comments at 100 characters; the server enforces its
/// own independent bound against unbounded storage.
const MAX_COMMENT_LEN: usize = 500;

/// POST /videos/{id}/like — one idempotent-pair action: flips the
/// caller's like state and reports the result. The decide-then-act runs
/// under the DB connection lock; the unique (user, video) index is the
/// storage-level backstop against concurrent double-toggles.
pub async fn toggle_like(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let like_id = Uuid::new_v4();
    let db = state.clone();
    let vid = id.to_string();
    let uid = claims.sub.to_string();

    let is_liked = tokio::task::spawn_blocking(move || {
        if db
            .db
            .get_video(&vid)
            .map_err(|e| {
                error!("video lookup failed: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            })?
            .is_none()
        {
            return Err(StatusCode::NOT_FOUND);
        }

        db.db
            .toggle_like(&like_id.to_string(), &uid, &vid)
            .map_err(|e| {
                error!("toggle_like failed: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            })
    })
    .await
    .map_err(|e| { error!("spawn_blocking join error: {}", e); StatusCode::INTERNAL_SERVER_ERROR })??;

    Ok(Json(ToggleLikeResponse { is_liked }))
}

/// POST /videos/{id}/comments — immutable comment on a video, echoed
/// back with its denormalized author.
pub async fn add_comment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let content = req.content.trim().to_string();
    if content.is_empty() || content.chars().count() > MAX_COMMENT_LEN {
        return Err(StatusCode::BAD_REQUEST);
    }

    let comment_id = Uuid::new_v4();
    let db = state.clone();
    let vid = id.to_string();
    let uid = claims.sub.to_string();
    let text = content.clone();

    let user = tokio::task::spawn_blocking(move || {
        if db
            .db
            .get_video(&vid)
            .map_err(|e| {
                error!("video lookup failed: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            })?
            .is_none()
        {
            return Err(StatusCode::NOT_FOUND);
        }

        db.db
            .insert_comment(&comment_id.to_string(), &vid, &uid, &text)
            .map_err(|e| {
                error!("insert_comment failed: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            })?;

        db.db
            .get_user_by_id(&uid)
            .map_err(|e| {
                error!("comment author lookup failed: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            })?
            .ok_or(StatusCode::INTERNAL_SERVER_ERROR)
    })
    .await
    .map_err(|e| { error!("spawn_blocking join error: {}", e); StatusCode::INTERNAL_SERVER_ERROR })??;

    Ok(Json(CommentResponse {
        id: comment_id,
        content,
        user_id: claims.sub,
        video_id: id,
        created_at: chrono::Utc::now(),
        user: convert::user_public(&user),
    }))
}
