use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
};

use crate::auth::{self, AppState};
use crate::interactions;
use crate::middleware::require_auth;
use crate::videos;

/// 200 MB cap on multipart publish bodies.
const MAX_UPLOAD_SIZE: usize = 200 * 1024 * 1024;

pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/videos", get(videos::list_feed))
        .route("/videos/{id}", get(videos::get_detail))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/auth/change-password", post(auth::change_password))
        .route(
            "/videos",
            post(videos::publish).layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE)),
        )
        .route("/videos/{id}", put(videos::update).delete(videos::remove))
        .route("/videos/{id}/like", post(interactions::toggle_like))
        .route("/videos/{id}/comments", post(interactions::add_comment))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    Router::new().merge(public_routes).merge(protected_routes)
}
