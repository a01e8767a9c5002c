use axum::Json;
use axum::extract::State;

use postbox_types::api::{AuthResponse, LoginRequest, RegisterRequest};

use crate::error::ApiError;
use crate::identity;
use crate::AppState;

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let username = identity::require("username", &req.username)?.to_string();
    let password = identity::require("password", &req.password)?.to_string();

    // Run the credential check off the async runtime: argon2 verification
    // and the store call are both blocking.
    let db = state.clone();
    let username = tokio::task::spawn_blocking(move || {
        identity::authenticate(&db.db, &username, &password)
    })
    .await??;

    let token = state.tokens.issue(&username)?;
    Ok(Json(AuthResponse {
        message: format!("Welcome! {username}"),
        token,
    }))
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let db = state.clone();
    let username =
        tokio::task::spawn_blocking(move || identity::register(&db.db, &req)).await??;

    let token = state.tokens.issue(&username)?;
    Ok(Json(AuthResponse {
        message: format!("Welcome! {username}"),
        token,
    }))
}
