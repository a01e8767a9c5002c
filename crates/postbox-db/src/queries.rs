use chrono::{SecondsFormat, Utc};
use rusqlite::Connection;

use crate::models::{CredentialRow, MailboxRow, MessageRow, NewUser, ProfileRow, UserRow};
use crate::{Database, Result, StoreError};

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl Database {
    // -- Users --

    /// Insert a new user. The username is the primary key; a UNIQUE
    /// violation surfaces as `DuplicateUsername`.
    pub fn create_user(&self, new: &NewUser) -> Result<UserRow> {
        self.with_conn(|conn| {
            let joined_at = now();
            conn.execute(
                "INSERT INTO users (username, password_hash, first_name, last_name, phone, joined_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    new.username,
                    new.password_hash,
                    new.first_name,
                    new.last_name,
                    new.phone,
                    joined_at
                ],
            )
            .map_err(unique_violation)?;

            Ok(UserRow {
                username: new.username.clone(),
                first_name: new.first_name.clone(),
                last_name: new.last_name.clone(),
                phone: new.phone.clone(),
                joined_at,
                last_login_at: None,
            })
        })
    }

    pub fn get_user(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, username))
    }

    pub fn user_exists(&self, username: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM users WHERE username = ?1",
                    [username],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    pub fn list_users(&self) -> Result<Vec<ProfileRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT username, first_name, last_name, phone FROM users ORDER BY username",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(ProfileRow {
                        username: row.get(0)?,
                        first_name: row.get(1)?,
                        last_name: row.get(2)?,
                        phone: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Read the stored credential for authentication. Nothing outside the
    /// identity verifier should call this.
    pub fn get_credential(&self, username: &str) -> Result<Option<CredentialRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT username, password_hash FROM users WHERE username = ?1",
                    [username],
                    |row| {
                        Ok(CredentialRow {
                            username: row.get(0)?,
                            password_hash: row.get(1)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Record a successful authentication. Single-row update, safe to call
    /// after every login or registration.
    pub fn touch_login(&self, username: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET last_login_at = ?1 WHERE username = ?2",
                rusqlite::params![now(), username],
            )?;
            Ok(())
        })
    }

    // -- Messages --

    /// Insert a message and return its sent_at timestamp.
    pub fn insert_message(
        &self,
        id: &str,
        from_username: &str,
        to_username: &str,
        body: &str,
    ) -> Result<String> {
        self.with_conn(|conn| {
            let sent_at = now();
            conn.execute(
                "INSERT INTO messages (id, from_username, to_username, body, sent_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, from_username, to_username, body, sent_at],
            )?;
            Ok(sent_at)
        })
    }

    pub fn get_message(&self, id: &str) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT m.id, m.body, m.sent_at, m.read_at,
                            f.username, f.first_name, f.last_name, f.phone,
                            t.username, t.first_name, t.last_name, t.phone
                     FROM messages m
                     JOIN users f ON m.from_username = f.username
                     JOIN users t ON m.to_username = t.username
                     WHERE m.id = ?1",
                    [id],
                    |row| {
                        Ok(MessageRow {
                            id: row.get(0)?,
                            body: row.get(1)?,
                            sent_at: row.get(2)?,
                            read_at: row.get(3)?,
                            from_user: ProfileRow {
                                username: row.get(4)?,
                                first_name: row.get(5)?,
                                last_name: row.get(6)?,
                                phone: row.get(7)?,
                            },
                            to_user: ProfileRow {
                                username: row.get(8)?,
                                first_name: row.get(9)?,
                                last_name: row.get(10)?,
                                phone: row.get(11)?,
                            },
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Set read_at if it is still null, then return the stored value.
    /// The conditional UPDATE makes repeated calls a no-op: the first
    /// writer wins and later calls read the same timestamp back.
    pub fn mark_read(&self, id: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE messages SET read_at = ?1 WHERE id = ?2 AND read_at IS NULL",
                rusqlite::params![now(), id],
            )?;
            let read_at: Option<Option<String>> = conn
                .query_row(
                    "SELECT read_at FROM messages WHERE id = ?1",
                    [id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(read_at.flatten())
        })
    }

    /// Messages addressed to `username`, each with the sender's profile.
    pub fn messages_to(&self, username: &str) -> Result<Vec<MailboxRow>> {
        self.with_conn(|conn| {
            query_mailbox(
                conn,
                "SELECT m.id, m.body, m.sent_at, m.read_at,
                        u.username, u.first_name, u.last_name, u.phone
                 FROM messages m
                 JOIN users u ON m.from_username = u.username
                 WHERE m.to_username = ?1
                 ORDER BY m.sent_at",
                username,
            )
        })
    }

    /// Messages sent by `username`, each with the recipient's profile.
    pub fn messages_from(&self, username: &str) -> Result<Vec<MailboxRow>> {
        self.with_conn(|conn| {
            query_mailbox(
                conn,
                "SELECT m.id, m.body, m.sent_at, m.read_at,
                        u.username, u.first_name, u.last_name, u.phone
                 FROM messages m
                 JOIN users u ON m.to_username = u.username
                 WHERE m.from_username = ?1
                 ORDER BY m.sent_at",
                username,
            )
        })
    }
}

fn query_user(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let row = conn
        .query_row(
            "SELECT username, first_name, last_name, phone, joined_at, last_login_at
             FROM users WHERE username = ?1",
            [username],
            |row| {
                Ok(UserRow {
                    username: row.get(0)?,
                    first_name: row.get(1)?,
                    last_name: row.get(2)?,
                    phone: row.get(3)?,
                    joined_at: row.get(4)?,
                    last_login_at: row.get(5)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

fn query_mailbox(conn: &Connection, sql: &str, username: &str) -> Result<Vec<MailboxRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([username], |row| {
            Ok(MailboxRow {
                id: row.get(0)?,
                body: row.get(1)?,
                sent_at: row.get(2)?,
                read_at: row.get(3)?,
                counterpart: ProfileRow {
                    username: row.get(4)?,
                    first_name: row.get(5)?,
                    last_name: row.get(6)?,
                    phone: row.get(7)?,
                },
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn unique_violation(err: rusqlite::Error) -> StoreError {
    match err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            StoreError::DuplicateUsername
        }
        other => StoreError::Sqlite(other),
    }
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            password_hash: format!("$argon2id$fake-hash-for-{username}"),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            phone: "555-0100".to_string(),
        }
    }

    #[test]
    fn create_and_fetch_user() {
        let db = test_db();
        db.create_user(&new_user("alice")).unwrap();

        let user = db.get_user("alice").unwrap().unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.first_name, "Test");
        assert!(user.last_login_at.is_none());
        assert!(user.joined_at.parse::<chrono::DateTime<Utc>>().is_ok());
    }

    #[test]
    fn duplicate_username_rejected() {
        let db = test_db();
        db.create_user(&new_user("alice")).unwrap();

        let mut second = new_user("alice");
        second.first_name = "Impostor".to_string();
        let err = db.create_user(&second).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateUsername));

        // First registration untouched
        let user = db.get_user("alice").unwrap().unwrap();
        assert_eq!(user.first_name, "Test");
    }

    #[test]
    fn touch_login_sets_timestamp() {
        let db = test_db();
        db.create_user(&new_user("alice")).unwrap();

        let before = Utc::now();
        db.touch_login("alice").unwrap();

        let user = db.get_user("alice").unwrap().unwrap();
        let logged_in: chrono::DateTime<Utc> =
            user.last_login_at.unwrap().parse().unwrap();
        assert!(logged_in >= before - chrono::Duration::seconds(1));
    }

    #[test]
    fn credential_lookup() {
        let db = test_db();
        db.create_user(&new_user("alice")).unwrap();

        let cred = db.get_credential("alice").unwrap().unwrap();
        assert_eq!(cred.username, "alice");
        assert!(cred.password_hash.contains("fake-hash-for-alice"));

        assert!(db.get_credential("nobody").unwrap().is_none());
    }

    #[test]
    fn message_roundtrip_with_profiles() {
        let db = test_db();
        db.create_user(&new_user("alice")).unwrap();
        db.create_user(&new_user("bob")).unwrap();

        db.insert_message("m1", "alice", "bob", "hi bob").unwrap();

        let m = db.get_message("m1").unwrap().unwrap();
        assert_eq!(m.body, "hi bob");
        assert_eq!(m.from_user.username, "alice");
        assert_eq!(m.to_user.username, "bob");
        assert!(m.read_at.is_none());

        assert!(db.get_message("missing").unwrap().is_none());
    }

    #[test]
    fn mark_read_is_idempotent() {
        let db = test_db();
        db.create_user(&new_user("alice")).unwrap();
        db.create_user(&new_user("bob")).unwrap();
        db.insert_message("m1", "alice", "bob", "hi").unwrap();

        let first = db.mark_read("m1").unwrap().unwrap();
        let second = db.mark_read("m1").unwrap().unwrap();
        assert_eq!(first, second);

        assert!(db.mark_read("missing").unwrap().is_none());
    }

    #[test]
    fn mailbox_listings_filter_by_participant() {
        let db = test_db();
        db.create_user(&new_user("alice")).unwrap();
        db.create_user(&new_user("bob")).unwrap();
        db.create_user(&new_user("carol")).unwrap();

        db.insert_message("m1", "alice", "bob", "one").unwrap();
        db.insert_message("m2", "bob", "alice", "two").unwrap();
        db.insert_message("m3", "carol", "bob", "three").unwrap();

        let to_bob = db.messages_to("bob").unwrap();
        assert_eq!(to_bob.len(), 2);
        assert!(to_bob.iter().all(|m| m.counterpart.username != "bob"));

        let from_alice = db.messages_from("alice").unwrap();
        assert_eq!(from_alice.len(), 1);
        assert_eq!(from_alice[0].counterpart.username, "bob");

        assert!(db.messages_to("carol").unwrap().is_empty());
    }
}
