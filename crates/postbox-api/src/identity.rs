use anyhow::anyhow;
use argon2::password_hash::{SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

use postbox_db::models::NewUser;
use postbox_db::{Database, StoreError};
use postbox_types::api::RegisterRequest;

use crate::error::ApiError;

/// Hash a plaintext password with Argon2id and a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(anyhow!("password hashing failed: {e}")))?;

    Ok(hash.to_string())
}

/// Validate a username/password pair and record the login.
///
/// Unknown username and wrong password both fail `InvalidCredentials`;
/// the caller must not be able to probe for account existence.
pub fn authenticate(db: &Database, username: &str, password: &str) -> Result<String, ApiError> {
    let Some(cred) = db.get_credential(username)? else {
        return Err(ApiError::InvalidCredentials);
    };

    let parsed = PasswordHash::new(&cred.password_hash)
        .map_err(|e| ApiError::Internal(anyhow!("stored hash unparseable: {e}")))?;

    if Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_err()
    {
        return Err(ApiError::InvalidCredentials);
    }

    db.touch_login(&cred.username)?;
    Ok(cred.username)
}

/// Create a user and return the verified username. Registration implicitly
/// authenticates, so the login timestamp is set here too.
pub fn register(db: &Database, req: &RegisterRequest) -> Result<String, ApiError> {
    let username = require("username", &req.username)?;
    let password = require("password", &req.password)?;
    let first_name = require("first_name", &req.first_name)?;
    let last_name = require("last_name", &req.last_name)?;
    let phone = require("phone", &req.phone)?;

    let new = NewUser {
        username: username.to_string(),
        password_hash: hash_password(password)?,
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        phone: phone.to_string(),
    };

    let user = match db.create_user(&new) {
        Ok(user) => user,
        Err(StoreError::DuplicateUsername) => return Err(ApiError::UsernameTaken),
        Err(e) => return Err(e.into()),
    };

    db.touch_login(&user.username)?;
    Ok(user.username)
}

/// Reject empty or whitespace-only required fields.
pub(crate) fn require<'a>(name: &'static str, value: &'a str) -> Result<&'a str, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ApiError::MissingField(name))
    } else {
        Ok(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn bob() -> RegisterRequest {
        RegisterRequest {
            username: "bob".into(),
            password: "pw1".into(),
            first_name: "Bob".into(),
            last_name: "B".into(),
            phone: "555".into(),
        }
    }

    #[test]
    fn register_then_authenticate() {
        let db = test_db();
        let before = chrono::Utc::now();
        assert_eq!(register(&db, &bob()).unwrap(), "bob");

        assert_eq!(authenticate(&db, "bob", "pw1").unwrap(), "bob");

        let user = db.get_user("bob").unwrap().unwrap();
        let logged_in: chrono::DateTime<chrono::Utc> =
            user.last_login_at.unwrap().parse().unwrap();
        assert!(logged_in >= before - chrono::Duration::seconds(1));
    }

    #[test]
    fn wrong_password_and_unknown_user_fail_alike() {
        let db = test_db();
        register(&db, &bob()).unwrap();

        assert!(matches!(
            authenticate(&db, "bob", "wrong"),
            Err(ApiError::InvalidCredentials)
        ));
        assert!(matches!(
            authenticate(&db, "nobody", "pw1"),
            Err(ApiError::InvalidCredentials)
        ));
    }

    #[test]
    fn stored_hash_is_not_the_plaintext() {
        let db = test_db();
        register(&db, &bob()).unwrap();

        let cred = db.get_credential("bob").unwrap().unwrap();
        assert_ne!(cred.password_hash, "pw1");
        assert!(cred.password_hash.starts_with("$argon2"));
    }

    #[test]
    fn duplicate_registration_is_username_taken() {
        let db = test_db();
        register(&db, &bob()).unwrap();

        let mut again = bob();
        again.first_name = "Impostor".into();
        assert!(matches!(register(&db, &again), Err(ApiError::UsernameTaken)));

        // First registration unaffected.
        let user = db.get_user("bob").unwrap().unwrap();
        assert_eq!(user.first_name, "Bob");
    }

    #[test]
    fn all_fields_are_required() {
        let db = test_db();

        let mut req = bob();
        req.phone = "".into();
        assert!(matches!(
            register(&db, &req),
            Err(ApiError::MissingField("phone"))
        ));

        let mut req = bob();
        req.password = "   ".into();
        assert!(matches!(
            register(&db, &req),
            Err(ApiError::MissingField("password"))
        ));
    }
}
