//! User directory routes

use crate::auth::{require_role, Claims, Role};
use crate::error::{validation_error, ApiResult};
use crate::models::SuccessResponse;
use crate::state::SharedState;
use crate::users::{ReviewerCandidate, UserDirectory, UserResponse};
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub role: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListResponse {
    pub users: Vec<UserResponse>,
    pub candidates: Vec<ReviewerCandidate>,
}

/// GET /api/admin/users?role=
pub async fn list_users(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<UserListQuery>,
) -> ApiResult<Json<SuccessResponse<UserListResponse>>> {
    require_role(&claims, Role::Admin)?;

    let role = query
        .role
        .as_deref()
        .map(str::parse::<Role>)
        .transpose()
        .map_err(validation_error)?;

    let users = state.users.list_users(role).await?;

    Ok(Json(SuccessResponse::with_data(
        format!("{} users", users.len()),
        UserListResponse {
            candidates: users.iter().map(|u| u.candidate()).collect(),
            users: users.iter().map(UserResponse::from).collect(),
        },
    )))
}
