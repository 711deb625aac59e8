//! Enrollment endpoints: enrolling, progress, and the admin listing.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::validation::{non_blank, validate_id, validate_page};
use super::{ApiError, ApiResponse, AppState, EnrollResponse, EnrollmentDto};
use crate::db::{EnrollmentRow, Page};
use crate::domain::CourseId;
use crate::domain::access::Principal;
use crate::services::{EnrollmentError, EnrollmentFilter};

impl From<EnrollmentError> for ApiError {
    fn from(err: EnrollmentError) -> Self {
        match err {
            EnrollmentError::CourseNotFound(id) => Self::not_found("Course", id),
            EnrollmentError::NotFound(id) => Self::not_found("Enrollment", id),
            EnrollmentError::Forbidden(denied) => denied.into(),
            EnrollmentError::Validation(msg) => Self::validation(msg),
            EnrollmentError::Database(msg) => Self::DatabaseError(msg),
            EnrollmentError::Internal(msg) => Self::internal(msg),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct EnrollmentListQuery {
    pub page: Option<u64>,
    pub status: Option<String>,
    pub course: Option<i32>,
    pub student: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct ProgressRequest {
    pub progress: i32,
}

/// `POST /api/courses/{id}/enroll`
///
/// Enrolling twice is not an error; the second call reports
/// `already_enrolled: true`.
pub async fn enroll(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<EnrollResponse>>, ApiError> {
    let id = CourseId::new(validate_id("course", id)?);
    let response = state
        .shared
        .enrollment_service
        .enroll(&principal, id)
        .await?;
    Ok(Json(ApiResponse::success(response)))
}

/// `GET /api/enrollments?status=&course=&student=&page=`
pub async fn list_enrollments(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<EnrollmentListQuery>,
) -> Result<Json<ApiResponse<Page<EnrollmentRow>>>, ApiError> {
    let page = validate_page(query.page)?;
    let filter = EnrollmentFilter {
        status: non_blank(query.status),
        course_id: query.course,
        student: non_blank(query.student),
    };

    let enrollments = state
        .shared
        .enrollment_service
        .list(&principal, filter, page)
        .await?;
    Ok(Json(ApiResponse::success(enrollments)))
}

/// `PUT /api/enrollments/{id}/status`
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<ApiResponse<EnrollmentDto>>, ApiError> {
    let id = validate_id("enrollment", id)?;
    let enrollment = state
        .shared
        .enrollment_service
        .set_status(&principal, id, &body.status)
        .await?;
    Ok(Json(ApiResponse::success(enrollment)))
}

/// `PUT /api/enrollments/{id}/progress`
pub async fn update_progress(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
    Json(body): Json<ProgressRequest>,
) -> Result<Json<ApiResponse<EnrollmentDto>>, ApiError> {
    let id = validate_id("enrollment", id)?;
    let enrollment = state
        .shared
        .enrollment_service
        .update_progress(&principal, id, body.progress)
        .await?;
    Ok(Json(ApiResponse::success(enrollment)))
}
