//! Analytics and dashboard endpoints.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::validation::{non_blank, validate_id};
use super::{
    AdminDashboard, ApiError, ApiResponse, AppState, StudentAnalyticsDto, StudentDashboard,
    TeachingDashboard,
};
use crate::domain::access::Principal;
use crate::services::analytics::{Achievements, AnalyticsReport};
use crate::services::{AnalyticsError, AnalyticsFilter};

impl From<AnalyticsError> for ApiError {
    fn from(err: AnalyticsError) -> Self {
        match err {
            AnalyticsError::StudentNotFound(id) => Self::not_found("Student", id),
            AnalyticsError::Forbidden(denied) => denied.into(),
            AnalyticsError::Validation(msg) => Self::validation(msg),
            AnalyticsError::Database(msg) => Self::DatabaseError(msg),
            AnalyticsError::Internal(msg) => Self::internal(msg),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct AnalyticsQuery {
    /// Days, or `all`.
    pub range: Option<String>,
    pub student: Option<String>,
    pub course: Option<i32>,
}

/// `GET /api/analytics?range=30&student=&course=`
pub async fn get_report(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<ApiResponse<AnalyticsReport>>, ApiError> {
    let filter = AnalyticsFilter {
        range: non_blank(query.range),
        student: non_blank(query.student),
        course_id: query.course,
    };

    let report = state
        .shared
        .analytics_service
        .report(&principal, filter)
        .await?;
    Ok(Json(ApiResponse::success(report)))
}

/// `GET /api/analytics/students/{id}`
pub async fn get_student(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<StudentAnalyticsDto>>, ApiError> {
    let id = validate_id("student", id)?;
    let analytics = state
        .shared
        .analytics_service
        .student_analytics(&principal, id)
        .await?;
    Ok(Json(ApiResponse::success(analytics)))
}

/// `GET /api/dashboard/student`
pub async fn student_dashboard(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<ApiResponse<StudentDashboard>>, ApiError> {
    let dashboard = state
        .shared
        .analytics_service
        .student_dashboard(&principal)
        .await?;
    Ok(Json(ApiResponse::success(dashboard)))
}

/// `GET /api/dashboard/achievements`
pub async fn achievements(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<ApiResponse<Achievements>>, ApiError> {
    let achievements = state
        .shared
        .analytics_service
        .achievements(&principal)
        .await?;
    Ok(Json(ApiResponse::success(achievements)))
}

/// `GET /api/dashboard/admin`
pub async fn admin_dashboard(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<ApiResponse<AdminDashboard>>, ApiError> {
    let dashboard = state
        .shared
        .analytics_service
        .admin_dashboard(&principal)
        .await?;
    Ok(Json(ApiResponse::success(dashboard)))
}

/// `GET /api/dashboard/instructor`
pub async fn teaching_dashboard(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<ApiResponse<TeachingDashboard>>, ApiError> {
    let dashboard = state
        .shared
        .analytics_service
        .teaching_dashboard(&principal)
        .await?;
    Ok(Json(ApiResponse::success(dashboard)))
}
