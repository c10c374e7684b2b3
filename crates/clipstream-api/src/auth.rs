use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::{SaltString, rand_core::OsRng}};
use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::error;
use uuid::Uuid;

use clipstream_db::Database;
use clipstream_media::MediaStore;
use clipstream_types::api::{
    ChangePasswordRequest, Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse,
    UserPublic,
};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub media: MediaStore,
    pub jwt_secret: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    // Validate input
    if req.username.is_empty() || req.username.len() > 32 {
        return Err(StatusCode::BAD_REQUEST);
    }
    if req.password.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    // Check if username is taken
    if state
        .db
        .get_user_by_username(&req.username)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .is_some()
    {
        return Err(StatusCode::BAD_REQUEST);
    }

    let password_hash = hash_password(&req.password)?;
    let user_id = Uuid::new_v4();

    // Deterministic placeholder avatar keyed by the username.
    let avatar = format!(
        "https://api.dicebear.com/7.x/avataaars/svg?seed={}",
        req.username
    );

    if let Err(e) = state
        .db
        .create_user(&user_id.to_string(), &req.username, &password_hash, &avatar)
    {
        // Concurrent registration race: the UNIQUE(username) constraint is
        // the final arbiter, so report it like the pre-check would have.
        if clipstream_db::is_unique_violation(&e) {
            return Err(StatusCode::BAD_REQUEST);
        }
        error!("create_user failed: {}", e);
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user: UserPublic {
                id: user_id,
                username: req.username,
                avatar,
            },
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let user = state
        .db
        .get_user_by_username(&req.username)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::BAD_REQUEST)?;

    // Verify password
    let parsed_hash =
        PasswordHash::new(&user.password).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| StatusCode::BAD_REQUEST)?;

    let user_id: Uuid = user.id.parse().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let token = create_token(&state.jwt_secret, user_id)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(LoginResponse {
        token,
        user: UserPublic {
            id: user_id,
            username: user.username,
            avatar: user.avatar,
        },
    }))
}

/// Requires the current password; already-issued tokens stay valid until
/// their natural expiry (no server-side revocation).
pub async fn change_password(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.new_password.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let user = state
        .db
        .get_user_by_id(&claims.sub.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let parsed_hash =
        PasswordHash::new(&user.password).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Argon2::default()
        .verify_password(req.old_password.as_bytes(), &parsed_hash)
        .map_err(|_| StatusCode::BAD_REQUEST)?;

    let new_hash = hash_password(&req.new_password)?;

    state
        .db
        .update_password(&user.id, &new_hash)
        .map_err(|e| {
            error!("update_password failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(serde_json::json!({ "message": "password changed" })))
}

fn hash_password(password: &str) -> Result<String, StatusCode> {
    // Argon2id — slow adaptive hash
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

fn create_token(secret: &str, user_id: Uuid) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        exp: (chrono::Utc::now() + chrono::Duration::hours(24)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
