//! Domain service for the course catalog and course content.

use thiserror::Error;

use crate::api::types::{CourseDetailDto, CourseDto, MaterialDto, VideoDto};
use crate::db::Page;
use crate::domain::CourseId;
use crate::domain::access::{Denied, Principal};
use crate::storage::{StorageError, Upload};

#[derive(Debug, Error)]
pub enum CourseError {
    #[error("Course not found: {0}")]
    NotFound(CourseId),

    #[error(transparent)]
    Forbidden(#[from] Denied),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for CourseError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for CourseError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Editable course fields as submitted by a client.
#[derive(Debug, Clone)]
pub struct CourseInput {
    pub title: String,
    pub description: String,
    pub level: String,
    pub duration_hours: i32,
    pub price: f64,
    pub is_published: bool,
}

#[derive(Debug, Clone)]
pub struct MaterialInput {
    pub title: String,
    pub material_type: String,
    pub order: i32,
    pub file: Option<Upload>,
}

#[derive(Debug, Clone)]
pub struct VideoInput {
    pub title: String,
    pub description: String,
    pub duration_minutes: i32,
    pub order: i32,
    pub file: Option<Upload>,
    pub video_url: Option<String>,
}

/// Domain service trait for courses.
///
/// Read operations accept an optional principal: anonymous callers may
/// browse published courses.
#[async_trait::async_trait]
pub trait CourseService: Send + Sync {
    async fn list(&self, principal: Option<&Principal>, page: u64) -> Result<Page<CourseDto>, CourseError>;

    /// # Errors
    ///
    /// Returns [`CourseError::NotFound`] for missing courses and for drafts
    /// the caller may not see.
    async fn detail(&self, principal: Option<&Principal>, id: CourseId) -> Result<CourseDetailDto, CourseError>;

    async fn create(&self, principal: &Principal, input: CourseInput) -> Result<CourseDto, CourseError>;

    async fn update(
        &self,
        principal: &Principal,
        id: CourseId,
        input: CourseInput,
    ) -> Result<CourseDto, CourseError>;

    /// Deletes a course together with its enrollments, materials and videos.
    async fn delete(&self, principal: &Principal, id: CourseId) -> Result<(), CourseError>;

    async fn set_thumbnail(
        &self,
        principal: &Principal,
        id: CourseId,
        upload: Upload,
    ) -> Result<CourseDto, CourseError>;

    async fn add_material(
        &self,
        principal: &Principal,
        id: CourseId,
        input: MaterialInput,
    ) -> Result<MaterialDto, CourseError>;

    async fn add_video(
        &self,
        principal: &Principal,
        id: CourseId,
        input: VideoInput,
    ) -> Result<VideoDto, CourseError>;
}
