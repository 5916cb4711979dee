//! `SeaORM` implementation of the `AuthService` trait.

use std::sync::Arc;

use async_trait::async_trait;

use crate::db::Store;
use crate::services::auth_service::{
    AuthError, AuthService, CurrentUser, IssuedToken, RegisteredUser,
};
use crate::services::token_service::{TokenError, TokenService};

pub struct SeaOrmAuthService {
    store: Store,
    tokens: Arc<TokenService>,
    admin_secret: String,
}

impl SeaOrmAuthService {
    #[must_use]
    pub fn new(store: Store, tokens: Arc<TokenService>, admin_secret: impl Into<String>) -> Self {
        Self {
            store,
            tokens,
            admin_secret: admin_secret.into(),
        }
    }

    fn issue_for(&self, username: &str, is_admin: bool) -> Result<IssuedToken, AuthError> {
        let access_token = self
            .tokens
            .issue(username)
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        Ok(IssuedToken {
            access_token,
            username: username.to_string(),
            is_admin,
        })
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        admin_code: Option<&str>,
    ) -> Result<RegisteredUser, AuthError> {
        if self.store.get_user_by_username(username).await?.is_some() {
            return Err(AuthError::UsernameTaken);
        }
        if self.store.get_user_by_email(email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        // An unset registration secret means nobody can self-register as admin.
        let is_admin =
            !self.admin_secret.is_empty() && admin_code == Some(self.admin_secret.as_str());

        let user = self
            .store
            .create_user(username, email, password, is_admin)
            .await?;

        tracing::info!(username = %user.username, is_admin, "registered user");

        Ok(RegisteredUser {
            username: user.username,
            is_admin: user.is_admin,
        })
    }

    async fn login(&self, email: &str, password: &str) -> Result<IssuedToken, AuthError> {
        let user = self
            .store
            .authenticate_user(email, password)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        self.issue_for(&user.username, user.is_admin)
    }

    async fn admin_login(&self, email: &str, password: &str) -> Result<IssuedToken, AuthError> {
        let user = self
            .store
            .authenticate_user(email, password)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !user.is_admin {
            return Err(AuthError::AdminRequired);
        }

        self.issue_for(&user.username, true)
    }

    async fn resolve(&self, token: &str) -> Result<CurrentUser, AuthError> {
        let subject = self.tokens.verify(token).map_err(|e| match e {
            TokenError::Expired => AuthError::TokenExpired,
            TokenError::Invalid(_) => AuthError::InvalidToken,
        })?;

        let user = self
            .store
            .get_user_by_username(&subject)
            .await?
            .ok_or(AuthError::UnknownSubject)?;

        Ok(CurrentUser {
            id: user.id,
            username: user.username,
            is_admin: user.is_admin,
        })
    }
}
