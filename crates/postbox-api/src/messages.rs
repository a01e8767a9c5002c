use axum::extract::{Path, State};
use axum::{Extension, Json};
use uuid::Uuid;

use postbox_types::api::{MessageDetail, MessageResponse, ReadReceipt, SendMessageRequest, SentMessage};

use crate::error::ApiError;
use crate::guard::{self, Principal};
use crate::identity;
use crate::{AppState, convert};

/// The sender is always the logged-in principal, never a field of the
/// request body; a spoofed from_username cannot exist by construction.
pub async fn send_message(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<MessageResponse<SentMessage>>, ApiError> {
    let to_username = identity::require("to_username", &req.to_username)?.to_string();
    let body = identity::require("body", &req.body)?.to_string();

    let id = Uuid::new_v4();
    let from_username = principal.0;

    let db = state.clone();
    let message = tokio::task::spawn_blocking(move || {
        if !db.db.user_exists(&to_username)? {
            return Err(ApiError::RecipientNotFound);
        }
        let sent_at = db
            .db
            .insert_message(&id.to_string(), &from_username, &to_username, &body)?;
        Ok(SentMessage {
            id,
            from_username,
            to_username,
            body,
            sent_at: convert::parse_ts(&sent_at)?,
        })
    })
    .await??;

    Ok(Json(MessageResponse { message }))
}

pub async fn get_message(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse<MessageDetail>>, ApiError> {
    let row = fetch_message(&state, id).await?;
    guard::ensure_participant(&principal, &row)?;

    Ok(Json(MessageResponse {
        message: convert::message_detail(row)?,
    }))
}

/// Recipient-only. The read transition is one-way: the store only writes
/// read_at when it is still null, so repeated calls return the original
/// timestamp instead of erroring.
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse<ReadReceipt>>, ApiError> {
    let row = fetch_message(&state, id).await?;
    guard::ensure_recipient(&principal, &row)?;

    let db = state.clone();
    // None only if the row vanished between the fetch above and the update;
    // messages are never deleted, but the store contract still allows it.
    let read_at = tokio::task::spawn_blocking(move || db.db.mark_read(&id.to_string()))
        .await??
        .ok_or(ApiError::NotFound("message"))?;

    Ok(Json(MessageResponse {
        message: ReadReceipt {
            id,
            read_at: convert::parse_ts(&read_at)?,
        },
    }))
}

async fn fetch_message(
    state: &AppState,
    id: Uuid,
) -> Result<postbox_db::models::MessageRow, ApiError> {
    let db = state.clone();
    tokio::task::spawn_blocking(move || db.db.get_message(&id.to_string()))
        .await??
        .ok_or(ApiError::NotFound("message"))
}
