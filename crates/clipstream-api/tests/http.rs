//! End-to-end tests driving the real router over in-memory SQLite and a
//! temp media directory.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use clipstream_api::auth::{AppState, AppStateInner};
use clipstream_api::routes;
use clipstream_db::Database;
use clipstream_media::MediaStore;

const BOUNDARY: &str = "clipstream-test-boundary";

async fn test_app() -> Router {
    let db = Database::open_in_memory().unwrap();
    let dir = std::env::temp_dir().join(format!("clipstream-http-test-{}", Uuid::new_v4()));
    let media = MediaStore::new(dir).await.unwrap();
    let state: AppState = Arc::new(AppStateInner {
        db,
        media,
        jwt_secret: "test-secret".into(),
    });
    routes::router(state)
}

async fn read_json(resp: axum::response::Response) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    }
}

async fn send_json(
    app: &Router,
    method: &str,
    path: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(request).await.unwrap();
    let status = resp.status();
    (status, read_json(resp).await)
}

async fn register_and_login(app: &Router, username: &str) -> (String, String) {
    let (status, _) = send_json(
        app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "username": username, "password": "hunter22" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send_json(
        app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "username": username, "password": "hunter22" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let token = body["token"].as_str().unwrap().to_string();
    let user_id = body["user"]["id"].as_str().unwrap().to_string();
    (token, user_id)
}

fn multipart_body(title: &str, with_cover: bool) -> String {
    let mut body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"title\"\r\n\r\n{title}\r\n\
         --{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"description\"\r\n\r\na clip about {title}\r\n\
         --{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"video\"; filename=\"clip.mp4\"\r\n\
         Content-Type: video/mp4\r\n\r\nfake video bytes\r\n"
    );
    if with_cover {
        body.push_str(&format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"cover\"; filename=\"cover.png\"\r\n\
             Content-Type: image/png\r\n\r\nfake png bytes\r\n"
        ));
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));
    body
}

async fn publish(app: &Router, token: &str, title: &str) -> Value {
    let request = Request::builder()
        .method("POST")
        .uri("/videos")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(multipart_body(title, true)))
        .unwrap();
    let resp = app.clone().oneshot(request).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    read_json(resp).await
}

#[tokio::test]
async fn register_login_and_protected_call() {
    let app = test_app().await;

    let (status, body) = send_json(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "username": "alice", "password": "hunter22" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["username"], "alice");
    assert!(body["user"]["avatar"].as_str().unwrap().contains("alice"));

    // Second registration with the same username fails.
    let (status, _) = send_json(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "username": "alice", "password": "other-pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send_json(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "username": "alice", "password": "hunter22" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    // The token authorizes a protected call; no token does not.
    let (status, _) = send_json(
        &app,
        "POST",
        "/auth/change-password",
        None,
        Some(json!({ "oldPassword": "hunter22", "newPassword": "hunter23" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send_json(
        &app,
        "POST",
        "/auth/change-password",
        Some(&token),
        Some(json!({ "oldPassword": "hunter22", "newPassword": "hunter23" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Old credentials are dead, new ones work.
    let (status, _) = send_json(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "username": "alice", "password": "hunter22" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send_json(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "username": "alice", "password": "hunter23" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn bad_credentials_and_bad_tokens_rejected() {
    let app = test_app().await;
    register_and_login(&app, "alice").await;

    let (status, _) = send_json(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "username": "alice", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send_json(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "username": "nobody", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let video_id = Uuid::new_v4();
    let (status, _) = send_json(
        &app,
        "POST",
        &format!("/videos/{video_id}/like"),
        Some("not-a-jwt"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn publish_then_feed_lists_it() {
    let app = test_app().await;
    let (token, user_id) = register_and_login(&app, "alice").await;
    let (other_token, _) = register_and_login(&app, "bob").await;

    let video = publish(&app, &token, "pasta night").await;
    assert_eq!(video["title"], "pasta night");
    assert_eq!(video["views"], 0);
    assert!(video["videoUrl"].as_str().unwrap().starts_with("/uploads/"));
    assert!(video["coverUrl"].as_str().unwrap().starts_with("/uploads/"));
    publish(&app, &other_token, "mountain hike").await;

    // Publishing requires a bearer token.
    let request = Request::builder()
        .method("POST")
        .uri("/videos")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body("anon clip", false)))
        .unwrap();
    let resp = app.clone().oneshot(request).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let (status, feed) = send_json(&app, "GET", "/videos", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let feed = feed.as_array().unwrap();
    assert_eq!(feed.len(), 2);
    let first = &feed[0];
    assert!(first["author"]["username"].is_string());
    assert_eq!(first["likeCount"], 0);

    // Keyword matches title or description substrings.
    let (_, hits) = send_json(&app, "GET", "/videos?keyword=pasta", None, None).await;
    assert_eq!(hits.as_array().unwrap().len(), 1);
    assert_eq!(hits[0]["title"], "pasta night");

    // Author filter.
    let (_, mine) = send_json(&app, "GET", &format!("/videos?authorId={user_id}"), None, None).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);
    assert_eq!(mine[0]["author"]["username"], "alice");

    // Unknown sort keys are rejected at the schema boundary.
    let (status, _) = send_json(&app, "GET", "/videos?sort=bogus", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send_json(&app, "GET", "/videos?sort=most-liked", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn detail_fetch_increments_views_each_time() {
    let app = test_app().await;
    let (token, _) = register_and_login(&app, "alice").await;
    let video = publish(&app, &token, "counting views").await;
    let video_id = video["id"].as_str().unwrap();

    let (status, detail) = send_json(&app, "GET", &format!("/videos/{video_id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["video"]["views"], 1);
    assert_eq!(detail["author"]["username"], "alice");
    assert_eq!(detail["comments"].as_array().unwrap().len(), 0);
    assert_eq!(detail["likes"].as_array().unwrap().len(), 0);

    let (_, detail) = send_json(&app, "GET", &format!("/videos/{video_id}"), None, None).await;
    assert_eq!(detail["video"]["views"], 2);

    let missing = Uuid::new_v4();
    let (status, _) = send_json(&app, "GET", &format!("/videos/{missing}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn like_toggle_flips_and_never_duplicates() {
    let app = test_app().await;
    let (token, _) = register_and_login(&app, "alice").await;
    let video = publish(&app, &token, "likeable").await;
    let video_id = video["id"].as_str().unwrap();

    let (status, body) =
        send_json(&app, "POST", &format!("/videos/{video_id}/like"), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isLiked"], true);

    let (_, detail) = send_json(&app, "GET", &format!("/videos/{video_id}"), None, None).await;
    assert_eq!(detail["likes"].as_array().unwrap().len(), 1);

    let (_, body) =
        send_json(&app, "POST", &format!("/videos/{video_id}/like"), Some(&token), None).await;
    assert_eq!(body["isLiked"], false);

    let (_, detail) = send_json(&app, "GET", &format!("/videos/{video_id}"), None, None).await;
    assert_eq!(detail["likes"].as_array().unwrap().len(), 0);

    let missing = Uuid::new_v4();
    let (status, _) =
        send_json(&app, "POST", &format!("/videos/{missing}/like"), Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn comments_are_created_and_listed_newest_first() {
    let app = test_app().await;
    let (token, _) = register_and_login(&app, "alice").await;
    let video = publish(&app, &token, "discussable").await;
    let video_id = video["id"].as_str().unwrap();

    let (status, first) = send_json(
        &app,
        "POST",
        &format!("/videos/{video_id}/comments"),
        Some(&token),
        Some(json!({ "content": "first!" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["content"], "first!");
    assert_eq!(first["user"]["username"], "alice");

    let (_, _second) = send_json(
        &app,
        "POST",
        &format!("/videos/{video_id}/comments"),
        Some(&token),
        Some(json!({ "content": "second!" })),
    )
    .await;

    let (_, detail) = send_json(&app, "GET", &format!("/videos/{video_id}"), None, None).await;
    let comments = detail["comments"].as_array().unwrap();
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0]["content"], "second!");
    assert_eq!(comments[1]["content"], "first!");

    // Server-side validation, independent of the client's cap.
    let (status, _) = send_json(
        &app,
        "POST",
        &format!("/videos/{video_id}/comments"),
        Some(&token),
        Some(json!({ "content": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send_json(
        &app,
        "POST",
        &format!("/videos/{video_id}/comments"),
        Some(&token),
        Some(json!({ "content": "x".repeat(501) })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn owner_update_and_delete_cascade() {
    let app = test_app().await;
    let (alice, _) = register_and_login(&app, "alice").await;
    let (bob, _) = register_and_login(&app, "bob").await;

    let video = publish(&app, &alice, "ephemeral").await;
    let video_id = video["id"].as_str().unwrap();

    // Owner can retitle; others cannot.
    let (status, updated) = send_json(
        &app,
        "PUT",
        &format!("/videos/{video_id}"),
        Some(&alice),
        Some(json!({ "title": "renamed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "renamed");
    assert_eq!(updated["description"], "a clip about ephemeral");

    let (status, _) = send_json(
        &app,
        "PUT",
        &format!("/videos/{video_id}"),
        Some(&bob),
        Some(json!({ "title": "hijacked" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Attach interactions, then delete and verify the cascade.
    send_json(&app, "POST", &format!("/videos/{video_id}/like"), Some(&bob), None).await;
    send_json(
        &app,
        "POST",
        &format!("/videos/{video_id}/comments"),
        Some(&bob),
        Some(json!({ "content": "nice clip" })),
    )
    .await;

    let (status, _) = send_json(&app, "DELETE", &format!("/videos/{video_id}"), Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) =
        send_json(&app, "DELETE", &format!("/videos/{video_id}"), Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].is_string());

    let (status, _) = send_json(&app, "GET", &format!("/videos/{video_id}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, feed) = send_json(&app, "GET", "/videos", None, None).await;
    assert_eq!(feed.as_array().unwrap().len(), 0);

    // Deleting twice reports not-found the second time.
    let (status, _) =
        send_json(&app, "DELETE", &format!("/videos/{video_id}"), Some(&alice), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn publish_without_video_file_is_rejected() {
    let app = test_app().await;
    let (token, _) = register_and_login(&app, "alice").await;

    let body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"title\"\r\n\r\nno file\r\n\
         --{BOUNDARY}--\r\n"
    );
    let request = Request::builder()
        .method("POST")
        .uri("/videos")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(body))
        .unwrap();
    let resp = app.clone().oneshot(request).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
