use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// The username the token was issued for.
    pub sub: String,
    pub iat: i64,
    /// Present only when the authority was built with an expiry window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("invalid token")]
    Invalid,
    #[error("token expired")]
    Expired,
}

/// Signs and verifies identity tokens. Built once at startup from the
/// configured secret and held immutably in the shared state; verification
/// is pure and runs on any number of concurrent requests.
pub struct TokenAuthority {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Option<Duration>,
}

impl TokenAuthority {
    /// `ttl = None` (the default configuration) issues tokens without an
    /// exp claim and does not enforce expiry on verification.
    pub fn new(secret: &str, ttl: Option<Duration>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        if ttl.is_none() {
            validation.validate_exp = false;
            validation.required_spec_claims = Default::default();
        }

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    pub fn issue(&self, username: &str) -> anyhow::Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: username.to_string(),
            iat: now.timestamp(),
            exp: self.ttl.map(|ttl| (now + ttl).timestamp()),
        };

        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    /// Returns the username claim of a valid token.
    pub fn verify(&self, token: &str) -> Result<String, TokenError> {
        let data =
            decode::<Claims>(token, &self.decoding, &self.validation).map_err(|err| {
                match err.kind() {
                    ErrorKind::ExpiredSignature => TokenError::Expired,
                    _ => TokenError::Invalid,
                }
            })?;

        Ok(data.claims.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authority() -> TokenAuthority {
        TokenAuthority::new("test-secret", None)
    }

    #[test]
    fn issued_token_verifies_to_its_username() {
        let tokens = authority();
        let token = tokens.issue("alice").unwrap();
        assert_eq!(tokens.verify(&token).unwrap(), "alice");
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let tokens = authority();
        let token = tokens.issue("alice").unwrap();

        // Flip the leading character of the signature segment.
        let (head, sig) = token.rsplit_once('.').unwrap();
        let flipped = if sig.starts_with('A') { 'B' } else { 'A' };
        let tampered = format!("{head}.{flipped}{}", &sig[1..]);

        assert_ne!(token, tampered);
        assert_eq!(tokens.verify(&tampered), Err(TokenError::Invalid));
    }

    #[test]
    fn malformed_token_is_rejected() {
        assert_eq!(authority().verify("not-a-token"), Err(TokenError::Invalid));
        assert_eq!(authority().verify(""), Err(TokenError::Invalid));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = authority().issue("alice").unwrap();
        let other = TokenAuthority::new("different-secret", None);
        assert_eq!(other.verify(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn expiry_enforced_only_when_configured() {
        // A window in the past produces an already-expired token.
        let expiring = TokenAuthority::new("test-secret", Some(Duration::seconds(-5)));
        let expired = expiring.issue("alice").unwrap();
        assert_eq!(expiring.verify(&expired), Err(TokenError::Expired));

        // The default authority enforces nothing and accepts exp-less tokens.
        let open = authority();
        let token = open.issue("alice").unwrap();
        assert_eq!(open.verify(&token).unwrap(), "alice");
    }
}
