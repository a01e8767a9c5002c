//! Database row types — these map directly to SQLite rows.
//! Distinct from postbox-types API models to keep the DB layer independent.
//! Timestamps stay as the stored RFC 3339 text; the API layer parses them.

/// Fields required to create a user. The password arrives already hashed;
/// plaintext never reaches this crate.
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

#[derive(Debug)]
pub struct UserRow {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub joined_at: String,
    pub last_login_at: Option<String>,
}

/// The (username, password_hash) pair. Only the identity verifier reads it.
pub struct CredentialRow {
    pub username: String,
    pub password_hash: String,
}

/// Public-facing participant fields, as joined into message queries.
pub struct ProfileRow {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

pub struct MessageRow {
    pub id: String,
    pub body: String,
    pub sent_at: String,
    pub read_at: Option<String>,
    pub from_user: ProfileRow,
    pub to_user: ProfileRow,
}

/// Mailbox listing row: a message plus the counterpart participant.
pub struct MailboxRow {
    pub id: String,
    pub body: String,
    pub sent_at: String,
    pub read_at: Option<String>,
    pub counterpart: ProfileRow,
}
