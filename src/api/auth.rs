use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use super::{
    AdminTokenResponse, ApiError, AppState, LoginRequest, RegisterRequest, RegisterResponse,
    TokenResponse,
};
use crate::services::CurrentUser;

// ============================================================================
// Middleware
// ============================================================================

/// Authentication middleware for protected routes: verifies the
/// `Authorization: Bearer <token>` header and loads the user it names.
/// Every failure mode (missing header, malformed/expired token, subject
/// no longer present) surfaces as the same 401.
pub async fn require_user(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = bearer_token(request.headers()) else {
        return Err(ApiError::Unauthorized(
            "Could not validate credentials".to_string(),
        ));
    };

    match state.auth().resolve(&token).await {
        Ok(user) => {
            tracing::debug!(username = %user.username, "authenticated request");
            request.extensions_mut().insert(user);
            Ok(next.run(request).await)
        }
        Err(e) => {
            // The internal variant matters for logs; the caller only sees 401.
            tracing::debug!("authentication rejected: {e}");
            Err(e.into())
        }
    }
}

/// Extract the token from an `Authorization: Bearer` header
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        return Some(token.trim().to_string());
    }

    None
}

/// Pure authorization check, applied after authentication succeeded.
pub fn require_admin(user: &CurrentUser) -> Result<(), ApiError> {
    if user.is_admin {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Admin privileges required".to_string()))
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/auth/register
/// Create an account; the admin role is granted only when `admin_code`
/// matches the configured registration secret.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    if payload.username.is_empty() {
        return Err(ApiError::validation("Username is required"));
    }
    if payload.email.is_empty() {
        return Err(ApiError::validation("Email is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let registered = state
        .auth()
        .register(
            &payload.username,
            &payload.email,
            &payload.password,
            payload.admin_code.as_deref(),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            msg: "User registered".to_string(),
            username: registered.username,
            is_admin: registered.is_admin,
        }),
    ))
}

/// POST /api/auth/login
/// Verify email/password and return a bearer token keyed by username.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let issued = state.auth().login(&payload.email, &payload.password).await?;

    Ok(Json(TokenResponse {
        access_token: issued.access_token,
        token_type: "bearer".to_string(),
    }))
}

/// POST /api/auth/admin-login
/// Same as login but the account must hold the admin role; valid
/// credentials without it yield 403 rather than 401.
pub async fn admin_login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AdminTokenResponse>, ApiError> {
    let issued = state
        .auth()
        .admin_login(&payload.email, &payload.password)
        .await?;

    Ok(Json(AdminTokenResponse {
        access_token: issued.access_token,
        token_type: "bearer".to_string(),
        username: issued.username,
        is_admin: issued.is_admin,
    }))
}
