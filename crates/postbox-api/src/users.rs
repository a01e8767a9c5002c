use axum::extract::{Path, State};
use axum::{Extension, Json};

use postbox_types::api::{
    InboxMessage, MessagesResponse, OutboxMessage, UserResponse, UsersResponse,
};

use crate::error::ApiError;
use crate::guard::{self, Principal};
use crate::{AppState, convert};

/// Public directory listing; exposes only the public profile fields.
pub async fn list_users(State(state): State<AppState>) -> Result<Json<UsersResponse>, ApiError> {
    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.list_users()).await??;

    Ok(Json(UsersResponse {
        users: rows.into_iter().map(convert::profile).collect(),
    }))
}

pub async fn get_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(username): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    guard::ensure_correct_user(&principal, &username)?;

    let db = state.clone();
    let row = tokio::task::spawn_blocking(move || db.db.get_user(&username))
        .await??
        .ok_or(ApiError::NotFound("user"))?;

    Ok(Json(UserResponse {
        user: convert::user_detail(row)?,
    }))
}

pub async fn messages_to(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(username): Path<String>,
) -> Result<Json<MessagesResponse<InboxMessage>>, ApiError> {
    guard::ensure_correct_user(&principal, &username)?;

    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.messages_to(&username)).await??;

    Ok(Json(MessagesResponse {
        messages: rows
            .into_iter()
            .map(convert::inbox_message)
            .collect::<Result<_, _>>()?,
    }))
}

pub async fn messages_from(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(username): Path<String>,
) -> Result<Json<MessagesResponse<OutboxMessage>>, ApiError> {
    guard::ensure_correct_user(&principal, &username)?;

    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.messages_from(&username)).await??;

    Ok(Json(MessagesResponse {
        messages: rows
            .into_iter()
            .map(convert::outbox_message)
            .collect::<Result<_, _>>()?,
    }))
}
