//! Domain service for analytics and the role dashboards.

use thiserror::Error;

use crate::api::types::{AdminDashboard, StudentAnalyticsDto, StudentDashboard, TeachingDashboard};
use crate::domain::access::{Denied, Principal};
use crate::services::analytics::{Achievements, AnalyticsReport};

pub const DEFAULT_WINDOW_DAYS: u32 = 30;

/// Longest accepted window, one hundred years.
pub const MAX_WINDOW_DAYS: u32 = 36_500;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("Student not found: {0}")]
    StudentNotFound(i32),

    #[error(transparent)]
    Forbidden(#[from] Denied),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AnalyticsError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AnalyticsError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Raw analytics filters as received from a client.
#[derive(Debug, Clone, Default)]
pub struct AnalyticsFilter {
    /// Window in days, or `all`. Defaults to [`DEFAULT_WINDOW_DAYS`].
    pub range: Option<String>,
    pub student: Option<String>,
    pub course_id: Option<i32>,
}

/// Parses the window: blank means the default, `all` disables it.
///
/// # Errors
///
/// Zero, negative, non-numeric values other than `all`, and windows longer
/// than [`MAX_WINDOW_DAYS`] are rejected.
pub fn parse_window(raw: Option<&str>) -> Result<Option<u32>, AnalyticsError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(Some(DEFAULT_WINDOW_DAYS)),
        Some(s) if s.eq_ignore_ascii_case("all") => Ok(None),
        Some(s) => match s.parse::<u32>() {
            Ok(days) if (1..=MAX_WINDOW_DAYS).contains(&days) => Ok(Some(days)),
            _ => Err(AnalyticsError::Validation(format!(
                "range must be between 1 and {MAX_WINDOW_DAYS} days or 'all', got '{s}'"
            ))),
        },
    }
}

#[async_trait::async_trait]
pub trait AnalyticsService: Send + Sync {
    /// Enrollment analytics over the filtered set. Admin only.
    async fn report(
        &self,
        principal: &Principal,
        filter: AnalyticsFilter,
    ) -> Result<AnalyticsReport, AnalyticsError>;

    async fn student_analytics(
        &self,
        principal: &Principal,
        student_id: i32,
    ) -> Result<StudentAnalyticsDto, AnalyticsError>;

    async fn student_dashboard(&self, principal: &Principal) -> Result<StudentDashboard, AnalyticsError>;

    async fn achievements(&self, principal: &Principal) -> Result<Achievements, AnalyticsError>;

    async fn admin_dashboard(&self, principal: &Principal) -> Result<AdminDashboard, AnalyticsError>;

    /// Courses taught by the caller with their enrollment numbers.
    async fn teaching_dashboard(&self, principal: &Principal) -> Result<TeachingDashboard, AnalyticsError>;
}
