//! Domain service for enrollments: enrolling, progress and status changes.

use thiserror::Error;

use crate::api::types::{EnrollResponse, EnrollmentDto};
use crate::db::{EnrollmentRow, Page};
use crate::domain::access::{Denied, Principal};
use crate::domain::{CourseId, EnrollmentStatus};

#[derive(Debug, Error)]
pub enum EnrollmentError {
    #[error("Course not found: {0}")]
    CourseNotFound(CourseId),

    #[error("Enrollment not found: {0}")]
    NotFound(i32),

    #[error(transparent)]
    Forbidden(#[from] Denied),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for EnrollmentError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for EnrollmentError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Raw filters of the enrollment management listing.
#[derive(Debug, Clone, Default)]
pub struct EnrollmentFilter {
    pub status: Option<String>,
    pub course_id: Option<i32>,
    /// Substring of the student's username.
    pub student: Option<String>,
}

/// Parses an optional status filter. Blank means "any".
///
/// # Errors
///
/// Anything outside `enrolled | completed | dropped` is rejected, including
/// `in_progress`.
pub fn parse_status_filter(raw: Option<&str>) -> Result<Option<EnrollmentStatus>, EnrollmentError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => s
            .parse()
            .map(Some)
            .map_err(|e: crate::domain::ParseEnumError| EnrollmentError::Validation(e.to_string())),
    }
}

#[async_trait::async_trait]
pub trait EnrollmentService: Send + Sync {
    /// Ensures exactly one enrollment exists for the caller and the course.
    ///
    /// # Errors
    ///
    /// Non-students get [`EnrollmentError::Forbidden`]; unpublished courses
    /// are a validation error.
    async fn enroll(&self, principal: &Principal, course_id: CourseId) -> Result<EnrollResponse, EnrollmentError>;

    async fn update_progress(
        &self,
        principal: &Principal,
        enrollment_id: i32,
        progress: i32,
    ) -> Result<EnrollmentDto, EnrollmentError>;

    /// Changes the status; `completed_at` follows the new status.
    async fn set_status(
        &self,
        principal: &Principal,
        enrollment_id: i32,
        status: &str,
    ) -> Result<EnrollmentDto, EnrollmentError>;

    async fn list(
        &self,
        principal: &Principal,
        filter: EnrollmentFilter,
        page: u64,
    ) -> Result<Page<EnrollmentRow>, EnrollmentError>;
}
