//! Issuance and verification of signed bearer tokens.
//!
//! Tokens are compact JWTs (HS256) carrying the username as `sub` and a
//! Unix-timestamp `exp`. The signing secret and default lifetime come from
//! process configuration; rotating the secret invalidates all outstanding
//! tokens.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors specific to token verification.
/// Both kinds surface as the same 401 at the HTTP boundary; they are kept
/// distinct here for logging and tests.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Token expired")]
    Expired,

    #[error("Invalid token: {0}")]
    Invalid(String),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
}

pub struct TokenService {
    secret: String,
    default_ttl_minutes: i64,
}

impl TokenService {
    #[must_use]
    pub fn new(secret: impl Into<String>, default_ttl_minutes: i64) -> Self {
        Self {
            secret: secret.into(),
            default_ttl_minutes,
        }
    }

    /// Issue a token for `subject` with the configured default lifetime.
    pub fn issue(&self, subject: &str) -> Result<String, TokenError> {
        self.issue_with_ttl(subject, Duration::minutes(self.default_ttl_minutes))
    }

    /// Issue a token for `subject` expiring `ttl` from now.
    pub fn issue_with_ttl(&self, subject: &str, ttl: Duration) -> Result<String, TokenError> {
        let claims = Claims {
            sub: subject.to_string(),
            exp: (Utc::now() + ttl).timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_ref()),
        )
        .map_err(|e| TokenError::Invalid(e.to_string()))
    }

    /// Verify signature and expiry, returning the subject.
    pub fn verify(&self, token: &str) -> Result<String, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // No leeway: an `exp` in the past is expired, full stop.
        validation.leeway = 0;

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_ref()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid(e.to_string()),
        })?;

        if data.claims.sub.is_empty() {
            return Err(TokenError::Invalid("missing subject claim".to_string()));
        }

        Ok(data.claims.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new("test-secret-key", 60)
    }

    #[test]
    fn test_issue_and_verify_round_trip() {
        let tokens = service();
        let token = tokens.issue("alice").unwrap();

        assert_eq!(tokens.verify(&token).unwrap(), "alice");
    }

    #[test]
    fn test_expired_token_rejected() {
        let tokens = service();
        let token = tokens
            .issue_with_ttl("alice", Duration::minutes(-5))
            .unwrap();

        assert!(matches!(tokens.verify(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = service().issue("alice").unwrap();
        let other = TokenService::new("another-secret", 60);

        assert!(matches!(other.verify(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_malformed_token_rejected() {
        let tokens = service();

        assert!(matches!(
            tokens.verify("definitely.not.a-jwt"),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn test_empty_subject_rejected() {
        let tokens = service();
        let token = tokens.issue("").unwrap();

        assert!(matches!(tokens.verify(&token), Err(TokenError::Invalid(_))));
    }
}
