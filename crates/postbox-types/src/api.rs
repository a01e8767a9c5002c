use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{PublicProfile, UserDetail};

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub message: String,
    pub token: String,
}

// -- Users --

#[derive(Debug, Serialize, Deserialize)]
pub struct UsersResponse {
    pub users: Vec<PublicProfile>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub user: UserDetail,
}

// -- Messages --

/// Unknown fields are deliberately ignored here: a forged `from_username`
/// in the body has no effect, the sender always comes from the token.
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub to_username: String,
    #[serde(default)]
    pub body: String,
}

/// Shape returned from POST /messages. Participants are given by username
/// only; the detail view carries the full profiles.
#[derive(Debug, Serialize, Deserialize)]
pub struct SentMessage {
    pub id: Uuid,
    pub from_username: String,
    pub to_username: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageDetail {
    pub id: Uuid,
    pub body: String,
    pub sent_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
    pub from_user: PublicProfile,
    pub to_user: PublicProfile,
}

/// A message as it appears in the recipient's mailbox listing.
#[derive(Debug, Serialize, Deserialize)]
pub struct InboxMessage {
    pub id: Uuid,
    pub body: String,
    pub sent_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
    pub from_user: PublicProfile,
}

/// A message as it appears in the sender's mailbox listing.
#[derive(Debug, Serialize, Deserialize)]
pub struct OutboxMessage {
    pub id: Uuid,
    pub body: String,
    pub sent_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
    pub to_user: PublicProfile,
}

/// Mark-as-read returns only the receipt, never the body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReadReceipt {
    pub id: Uuid,
    pub read_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse<T> {
    pub message: T,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessagesResponse<T> {
    pub messages: Vec<T>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_request_ignores_forged_sender() {
        let req: SendMessageRequest = serde_json::from_str(
            r#"{"to_username": "bob", "body": "hi", "from_username": "mallory"}"#,
        )
        .unwrap();
        assert_eq!(req.to_username, "bob");
        assert_eq!(req.body, "hi");
    }

    #[test]
    fn login_request_defaults_missing_fields_to_empty() {
        let req: LoginRequest = serde_json::from_str(r#"{"username": "bob"}"#).unwrap();
        assert_eq!(req.username, "bob");
        assert!(req.password.is_empty());
    }
}
