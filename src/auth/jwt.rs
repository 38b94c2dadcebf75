use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::users::Roles;

/// Claims carried by the session tokens this service issues.
///
/// `sub` is the user's UUID; `role` is informational, the extractor always
/// reloads the user so role changes take effect immediately.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Roles,
    /// Token issued-at (Unix timestamp).
    pub iat: usize,
    /// Token expiration (Unix timestamp).
    pub exp: usize,
}

impl Claims {
    /// Extract the user UUID from the `sub` claim.
    pub fn user_id(&self) -> Result<Uuid, String> {
        Uuid::parse_str(&self.sub).map_err(|e| format!("Invalid UUID in sub claim: {e}"))
    }
}

/// Sign an HS256 token for `user_id` valid for `maxage_minutes`.
pub fn create_token(
    user_id: Uuid,
    role: Roles,
    secret: &str,
    maxage_minutes: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        role,
        iat: now.timestamp() as usize,
        exp: (now + chrono::Duration::minutes(maxage_minutes)).timestamp() as usize,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Validate an HS256 token and return the decoded claims.
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}

const VERIFY_EMAIL_PURPOSE: &str = "verify_email";

/// Claims of the single-purpose link token emailed at sign-up. Lacking a
/// `role`, it never passes as a session token, and sessions lack `purpose`.
#[derive(Debug, Serialize, Deserialize)]
struct EmailClaims {
    sub: String,
    purpose: String,
    iat: usize,
    exp: usize,
}

pub fn create_email_token(
    user_id: Uuid,
    secret: &str,
    maxage_minutes: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now();
    let claims = EmailClaims {
        sub: user_id.to_string(),
        purpose: VERIFY_EMAIL_PURPOSE.to_string(),
        iat: now.timestamp() as usize,
        exp: (now + chrono::Duration::minutes(maxage_minutes)).timestamp() as usize,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Validate an email-verification token and return the user it was issued for.
pub fn validate_email_token(token: &str, secret: &str) -> Result<Uuid, String> {
    let claims = decode::<EmailClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())?;

    if claims.purpose != VERIFY_EMAIL_PURPOSE {
        return Err("Token was not issued for email verification".to_string());
    }
    Uuid::parse_str(&claims.sub).map_err(|e| format!("Invalid UUID in sub claim: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "unit-test-secret";

    #[test]
    fn email_token_round_trips() {
        let user_id = Uuid::new_v4();
        let token = create_email_token(user_id, SECRET, 60).unwrap();
        assert_eq!(validate_email_token(&token, SECRET), Ok(user_id));
    }

    #[test]
    fn session_and_email_tokens_are_not_interchangeable() {
        let user_id = Uuid::new_v4();
        let session = create_token(user_id, Roles::Client, SECRET, 60).unwrap();
        assert!(validate_email_token(&session, SECRET).is_err());

        let email = create_email_token(user_id, SECRET, 60).unwrap();
        assert!(validate_token(&email, SECRET).is_err());
    }
}
