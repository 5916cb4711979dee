//! Domain service for registration, login, and identity resolution.
//!
//! The error enum is deliberately finer-grained than what callers see:
//! every token/credential failure collapses to a single 401 at the HTTP
//! boundary, while tests and logs can still tell the cases apart.

use serde::Serialize;
use thiserror::Error;

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Username already registered")]
    UsernameTaken,

    #[error("Email already registered")]
    EmailTaken,

    #[error("Incorrect email or password")]
    InvalidCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("No account matches the token subject")]
    UnknownSubject,

    #[error("Admin privileges required")]
    AdminRequired,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Identity attached to an authenticated request.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentUser {
    pub id: i32,
    pub username: String,
    pub is_admin: bool,
}

/// Outcome of a successful registration.
#[derive(Debug, Clone)]
pub struct RegisteredUser {
    pub username: String,
    pub is_admin: bool,
}

/// Outcome of a successful login.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub access_token: String,
    pub username: String,
    pub is_admin: bool,
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Creates an account after independent username/email uniqueness checks.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::UsernameTaken`] or [`AuthError::EmailTaken`] on
    /// either collision. The account is admin only when `admin_code` matches
    /// the configured registration secret.
    async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        admin_code: Option<&str>,
    ) -> Result<RegisteredUser, AuthError>;

    /// Verifies credentials by email and issues a token keyed by username.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] without distinguishing an
    /// unknown email from a wrong password.
    async fn login(&self, email: &str, password: &str) -> Result<IssuedToken, AuthError>;

    /// Same as [`AuthService::login`] but additionally requires the admin
    /// role; valid credentials without it yield [`AuthError::AdminRequired`].
    async fn admin_login(&self, email: &str, password: &str) -> Result<IssuedToken, AuthError>;

    /// Verifies a bearer token and loads the user it names.
    ///
    /// A valid token whose subject no longer exists resolves to
    /// [`AuthError::UnknownSubject`], which callers must not distinguish
    /// from an invalid token.
    async fn resolve(&self, token: &str) -> Result<CurrentUser, AuthError>;
}
