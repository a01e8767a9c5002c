use postbox_db::models::MessageRow;

use crate::error::ApiError;

/// The username a request acts as, resolved from a verified token by the
/// `require_auth` middleware and attached as a request extension.
#[derive(Debug, Clone)]
pub struct Principal(pub String);

/// User-scoped operations: the principal may only touch their own
/// profile and mailboxes.
pub fn ensure_correct_user(principal: &Principal, username: &str) -> Result<(), ApiError> {
    if principal.0 == username {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

/// Message detail: readable by either participant.
pub fn ensure_participant(principal: &Principal, message: &MessageRow) -> Result<(), ApiError> {
    if principal.0 == message.from_user.username || principal.0 == message.to_user.username {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

/// Mark-as-read: only the recipient, never the sender.
pub fn ensure_recipient(principal: &Principal, message: &MessageRow) -> Result<(), ApiError> {
    if principal.0 == message.to_user.username {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}
