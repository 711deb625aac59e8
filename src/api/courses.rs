//! Course catalog and course content endpoints.
//!
//! Listing and detail are public; anonymous callers see published courses
//! only. Everything else runs behind the auth middleware.

use axum::{
    Extension, Json,
    extract::{Multipart, Path, Query, State},
    http::HeaderMap,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_sessions::Session;

use super::forms::MultipartForm;
use super::validation::{validate_id, validate_page};
use super::{
    ApiError, ApiResponse, AppState, CourseDetailDto, CourseDto, MaterialDto, MessageResponse,
    PageQuery, VideoDto, auth,
};
use crate::db::Page;
use crate::domain::CourseId;
use crate::domain::access::Principal;
use crate::services::{CourseError, CourseInput, MaterialInput, VideoInput};

impl From<CourseError> for ApiError {
    fn from(err: CourseError) -> Self {
        match err {
            CourseError::NotFound(id) => Self::not_found("Course", id),
            CourseError::Forbidden(denied) => denied.into(),
            CourseError::Validation(msg) => Self::validation(msg),
            CourseError::Storage(e) => Self::internal(e.to_string()),
            CourseError::Database(msg) => Self::DatabaseError(msg),
            CourseError::Internal(msg) => Self::internal(msg),
        }
    }
}

fn default_level() -> String {
    "beginner".to_string()
}

#[derive(Debug, Deserialize)]
pub struct CourseBody {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub duration_hours: i32,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub is_published: bool,
}

impl From<CourseBody> for CourseInput {
    fn from(body: CourseBody) -> Self {
        Self {
            title: body.title,
            description: body.description,
            level: body.level,
            duration_hours: body.duration_hours,
            price: body.price,
            is_published: body.is_published,
        }
    }
}

fn course_id(id: i32) -> Result<CourseId, ApiError> {
    validate_id("course", id).map(CourseId::new)
}

/// `GET /api/courses?page=N`
pub async fn list_courses(
    State(state): State<Arc<AppState>>,
    session: Session,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<Page<CourseDto>>>, ApiError> {
    let page = validate_page(query.page)?;
    let principal = auth::resolve_principal(&state, &session, &headers).await?;

    let courses = state
        .shared
        .course_service
        .list(principal.as_ref(), page)
        .await?;
    Ok(Json(ApiResponse::success(courses)))
}

/// `GET /api/courses/{id}`
pub async fn get_course(
    State(state): State<Arc<AppState>>,
    session: Session,
    headers: HeaderMap,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<CourseDetailDto>>, ApiError> {
    let id = course_id(id)?;
    let principal = auth::resolve_principal(&state, &session, &headers).await?;

    let detail = state
        .shared
        .course_service
        .detail(principal.as_ref(), id)
        .await?;
    Ok(Json(ApiResponse::success(detail)))
}

/// `POST /api/courses`
pub async fn create_course(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<CourseBody>,
) -> Result<Json<ApiResponse<CourseDto>>, ApiError> {
    let course = state
        .shared
        .course_service
        .create(&principal, body.into())
        .await?;
    Ok(Json(ApiResponse::success(course)))
}

/// `PUT /api/courses/{id}`
pub async fn update_course(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
    Json(body): Json<CourseBody>,
) -> Result<Json<ApiResponse<CourseDto>>, ApiError> {
    let course = state
        .shared
        .course_service
        .update(&principal, course_id(id)?, body.into())
        .await?;
    Ok(Json(ApiResponse::success(course)))
}

/// `DELETE /api/courses/{id}`
pub async fn delete_course(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state
        .shared
        .course_service
        .delete(&principal, course_id(id)?)
        .await?;
    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Course deleted".to_string(),
    })))
}

/// `POST /api/courses/{id}/thumbnail`, multipart field `thumbnail`.
pub async fn upload_thumbnail(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<CourseDto>>, ApiError> {
    let id = course_id(id)?;
    let mut form = MultipartForm::read(multipart).await?;
    let upload = form
        .take_file("thumbnail")
        .ok_or_else(|| ApiError::validation("Missing 'thumbnail' file"))?;

    let course = state
        .shared
        .course_service
        .set_thumbnail(&principal, id, upload)
        .await?;
    Ok(Json(ApiResponse::success(course)))
}

/// `POST /api/courses/{id}/materials`
///
/// Multipart fields: `title`, `material_type`, `order`, `file`.
pub async fn add_material(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<MaterialDto>>, ApiError> {
    let id = course_id(id)?;
    let mut form = MultipartForm::read(multipart).await?;

    let input = MaterialInput {
        title: form.text_or_default("title"),
        material_type: form.text("material_type").unwrap_or("pdf").to_string(),
        order: form.int_or("order", 0)?,
        file: form.take_file("file"),
    };

    let material = state
        .shared
        .course_service
        .add_material(&principal, id, input)
        .await?;
    Ok(Json(ApiResponse::success(material)))
}

/// `POST /api/courses/{id}/videos`
///
/// Multipart fields: `title`, `description`, `duration`, `order`, and
/// `video_file` and/or `video_url`.
pub async fn add_video(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<VideoDto>>, ApiError> {
    let id = course_id(id)?;
    let mut form = MultipartForm::read(multipart).await?;

    let input = VideoInput {
        title: form.text_or_default("title"),
        description: form.text_or_default("description"),
        duration_minutes: form.int_or("duration", 0)?,
        order: form.int_or("order", 0)?,
        video_url: form.text("video_url").map(str::to_string),
        file: form.take_file("video_file"),
    };

    let video = state
        .shared
        .course_service
        .add_video(&principal, id, input)
        .await?;
    Ok(Json(ApiResponse::success(video)))
}
