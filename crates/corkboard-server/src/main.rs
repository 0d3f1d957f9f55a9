use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use corkboard_api::auth::AppStateInner;
use corkboard_auth::Sessions;
use corkboard_db::Database;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "corkboard=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let db_path = std::env::var("CORKBOARD_DB_PATH").unwrap_or_else(|_| "corkboard.db".into());
    let host = std::env::var("CORKBOARD_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("CORKBOARD_PORT")
        .unwrap_or_else(|_| "8080".into())
        .parse()?;
    let member_secret =
        std::env::var("CORKBOARD_MEMBER_SECRET").unwrap_or_else(|_| "VIP".into());
    let session_ttl_secs: i64 = std::env::var("CORKBOARD_SESSION_TTL_SECS")
        .unwrap_or_else(|_| "300".into())
        .parse()?;
    let client_origin = std::env::var("CORKBOARD_CLIENT_ORIGIN").ok();

    // Init database — users, messages and sessions all live here
    let db = Arc::new(Database::open(&PathBuf::from(&db_path))?);

    // Shared state, torn down with the process
    let state = Arc::new(AppStateInner {
        db: db.clone(),
        sessions: Sessions::new(db, chrono::Duration::seconds(session_ttl_secs)),
        member_secret,
    });

    let app = corkboard_server::app(state, client_origin.as_deref())?;

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Corkboard server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
