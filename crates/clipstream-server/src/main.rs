use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use clipstream_api::auth::{AppState, AppStateInner};
use clipstream_api::routes;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clipstream=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("CLIPSTREAM_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("CLIPSTREAM_DB_PATH").unwrap_or_else(|_| "clipstream.db".into());
    let upload_dir = std::env::var("CLIPSTREAM_UPLOAD_DIR").unwrap_or_else(|_| "uploads".into());
    let host = std::env::var("CLIPSTREAM_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("CLIPSTREAM_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database and media store
    let db = clipstream_db::Database::open(&PathBuf::from(&db_path))?;
    let media = clipstream_media::MediaStore::new(PathBuf::from(&upload_dir)).await?;

    // Shared state
    let state: AppState = Arc::new(AppStateInner {
        db,
        media,
        jwt_secret,
    });

    let app = routes::router(state)
        // Media store files are public by generated name.
        .nest_service("/uploads", ServeDir::new(&upload_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("clipstream server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
