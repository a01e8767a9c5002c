//! Row-to-response conversions. Timestamps and ids are stored as text;
//! anything unparseable is a corrupt row and surfaces as an internal error.

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use postbox_db::models::{MailboxRow, MessageRow, ProfileRow, UserRow};
use postbox_types::api::{InboxMessage, MessageDetail, OutboxMessage};
use postbox_types::models::{PublicProfile, UserDetail};

use crate::error::ApiError;

pub(crate) fn parse_ts(value: &str) -> Result<DateTime<Utc>, ApiError> {
    value
        .parse()
        .map_err(|e| ApiError::Internal(anyhow!("corrupt timestamp '{value}': {e}")))
}

pub(crate) fn parse_opt_ts(value: Option<&str>) -> Result<Option<DateTime<Utc>>, ApiError> {
    value.map(parse_ts).transpose()
}

pub(crate) fn parse_id(value: &str) -> Result<Uuid, ApiError> {
    value
        .parse()
        .map_err(|e| ApiError::Internal(anyhow!("corrupt message id '{value}': {e}")))
}

pub(crate) fn profile(row: ProfileRow) -> PublicProfile {
    PublicProfile {
        username: row.username,
        first_name: row.first_name,
        last_name: row.last_name,
        phone: row.phone,
    }
}

pub(crate) fn user_detail(row: UserRow) -> Result<UserDetail, ApiError> {
    Ok(UserDetail {
        joined_at: parse_ts(&row.joined_at)?,
        last_login_at: parse_opt_ts(row.last_login_at.as_deref())?,
        username: row.username,
        first_name: row.first_name,
        last_name: row.last_name,
        phone: row.phone,
    })
}

pub(crate) fn message_detail(row: MessageRow) -> Result<MessageDetail, ApiError> {
    Ok(MessageDetail {
        id: parse_id(&row.id)?,
        sent_at: parse_ts(&row.sent_at)?,
        read_at: parse_opt_ts(row.read_at.as_deref())?,
        body: row.body,
        from_user: profile(row.from_user),
        to_user: profile(row.to_user),
    })
}

pub(crate) fn inbox_message(row: MailboxRow) -> Result<InboxMessage, ApiError> {
    Ok(InboxMessage {
        id: parse_id(&row.id)?,
        sent_at: parse_ts(&row.sent_at)?,
        read_at: parse_opt_ts(row.read_at.as_deref())?,
        body: row.body,
        from_user: profile(row.counterpart),
    })
}

pub(crate) fn outbox_message(row: MailboxRow) -> Result<OutboxMessage, ApiError> {
    Ok(OutboxMessage {
        id: parse_id(&row.id)?,
        sent_at: parse_ts(&row.sent_at)?,
        read_at: parse_opt_ts(row.read_at.as_deref())?,
        body: row.body,
        to_user: profile(row.counterpart),
    })
}
