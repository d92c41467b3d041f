//! Authentication route handlers
//!
//! Provides login, refresh and current-user endpoints.

use crate::auth::{create_tokens, refresh_tokens, verify_password, Claims, TokenPair};
use crate::error::{ApiResult, AppError};
use crate::state::SharedState;
use crate::users::UserResponse;
use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub user: UserResponse,
    pub tokens: TokenPair,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub success: bool,
    pub tokens: TokenPair,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub success: bool,
    pub user: UserResponse,
}

/// POST /api/auth/login
///
/// Authenticate with email and password, receive JWT tokens.
pub async fn login(
    State(state): State<SharedState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    req.validate()?;

    let user = state
        .users
        .find_by_email(&req.email)
        .await
        .ok_or_else(|| AppError::Unauthorized("Invalid email or password".to_string()))?;

    if !verify_password(&req.password, &user.password_hash)? {
        warn!("Failed login for {}", req.email);
        return Err(AppError::Unauthorized("Invalid email or password".to_string()));
    }

    let tokens = create_tokens(user.id, &user.email, user.role, &state.jwt_secret)?;
    info!("User {} logged in", user.email);

    Ok(Json(AuthResponse {
        success: true,
        user: UserResponse::from(&user),
        tokens,
    }))
}

/// POST /api/auth/refresh
pub async fn refresh(
    State(state): State<SharedState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let tokens = refresh_tokens(&req.refresh_token, &state.jwt_secret)?;
    Ok(Json(TokenResponse {
        success: true,
        tokens,
    }))
}

/// GET /api/auth/me
pub async fn me(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<MeResponse>> {
    let user = state
        .users
        .find_by_id(claims.sub)
        .await
        .ok_or_else(|| AppError::Unauthorized("User no longer exists".to_string()))?;

    Ok(Json(MeResponse {
        success: true,
        user: UserResponse::from(&user),
    }))
}
