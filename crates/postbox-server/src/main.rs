use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use postbox_api::middleware::require_auth;
use postbox_api::token::TokenAuthority;
use postbox_api::{AppState, AppStateInner, auth, messages, users};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "postbox=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let secret =
        std::env::var("POSTBOX_SECRET_KEY").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("POSTBOX_DB_PATH").unwrap_or_else(|_| "postbox.db".into());
    let host = std::env::var("POSTBOX_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("POSTBOX_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Token expiry is opt-in; unset means tokens never expire.
    let ttl = match std::env::var("POSTBOX_TOKEN_TTL_SECS") {
        Ok(raw) => Some(chrono::Duration::seconds(raw.parse()?)),
        Err(_) => None,
    };

    // Init database
    let db = postbox_db::Database::open(&PathBuf::from(&db_path))?;

    // Shared state
    let state: AppState = Arc::new(AppStateInner {
        db,
        tokens: TokenAuthority::new(&secret, ttl),
    });

    // Routes
    let public_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .route("/users", get(users::list_users))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/users/{username}", get(users::get_user))
        .route("/users/{username}/to", get(users::messages_to))
        .route("/users/{username}/from", get(users::messages_from))
        .route("/messages", post(messages::send_message))
        .route("/messages/{id}", get(messages::get_message))
        .route("/messages/{id}/read", post(messages::mark_read))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Postbox server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
