use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::validation::{non_blank, validate_id, validate_page};
use super::{ApiError, ApiResponse, AppState};
use crate::db::{Page, UserWithRole};
use crate::domain::access::Principal;
use crate::services::{UserError, UserFilter};

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound(id) => Self::not_found("User", id),
            UserError::Forbidden(denied) => denied.into(),
            UserError::Validation(msg) => Self::validation(msg),
            UserError::Database(msg) => Self::DatabaseError(msg),
            UserError::Internal(msg) => Self::internal(msg),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct UserListQuery {
    pub page: Option<u64>,
    pub role: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: String,
}

/// `GET /api/users?role=&search=&page=`
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<UserListQuery>,
) -> Result<Json<ApiResponse<Page<UserWithRole>>>, ApiError> {
    let page = validate_page(query.page)?;
    let filter = UserFilter {
        role: non_blank(query.role),
        search: non_blank(query.search),
    };

    let users = state
        .shared
        .user_service
        .list(&principal, filter, page)
        .await?;
    Ok(Json(ApiResponse::success(users)))
}

/// `PUT /api/users/{id}/role`
pub async fn change_role(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
    Json(body): Json<RoleRequest>,
) -> Result<Json<ApiResponse<UserWithRole>>, ApiError> {
    let id = validate_id("user", id)?;
    let user = state
        .shared
        .user_service
        .change_role(&principal, id, &body.role)
        .await?;
    Ok(Json(ApiResponse::success(user)))
}
