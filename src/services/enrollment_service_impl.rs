//! `SeaORM` implementation of the `EnrollmentService` trait.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::api::types::{EnrollResponse, EnrollmentDto};
use crate::db::repositories::enrollment::Enrollment;
use crate::db::{EnrollmentQuery, EnrollmentRow, Page, Store};
use crate::domain::access::{self, Action, Principal};
use crate::domain::{CourseId, EnrollmentStatus, Progress};
use crate::services::enrollment_service::{
    EnrollmentError, EnrollmentFilter, EnrollmentService, parse_status_filter,
};

pub const ENROLLMENTS_PER_PAGE: u64 = 20;

pub struct SeaOrmEnrollmentService {
    store: Store,
}

impl SeaOrmEnrollmentService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    async fn load(&self, id: i32) -> Result<Enrollment, EnrollmentError> {
        self.store
            .enrollment_repo()
            .get(id)
            .await?
            .ok_or(EnrollmentError::NotFound(id))
    }
}

#[async_trait]
impl EnrollmentService for SeaOrmEnrollmentService {
    async fn enroll(&self, principal: &Principal, course_id: CourseId) -> Result<EnrollResponse, EnrollmentError> {
        access::require(principal, Action::Enroll)?;

        let course = self
            .store
            .course_repo()
            .get(course_id.value())
            .await?
            .ok_or(EnrollmentError::CourseNotFound(course_id))?;

        if !course.is_published {
            return Err(EnrollmentError::Validation(
                "This course is not open for enrollment".to_string(),
            ));
        }

        let (enrollment, created) = self
            .store
            .enrollment_repo()
            .insert_if_absent(principal.user_id.value(), course.id)
            .await?;

        let message = if created {
            metrics::counter!("enrollments_created_total").increment(1);
            info!(
                student_id = %principal.user_id,
                course_id = course.id,
                enrollment_id = enrollment.id,
                "Student enrolled"
            );
            format!("Successfully enrolled in {}!", course.title)
        } else {
            debug!(student_id = %principal.user_id, course_id = course.id, "Already enrolled");
            format!("You are already enrolled in {}.", course.title)
        };

        Ok(EnrollResponse {
            enrollment: enrollment.into(),
            already_enrolled: !created,
            message,
        })
    }

    async fn update_progress(
        &self,
        principal: &Principal,
        enrollment_id: i32,
        progress: i32,
    ) -> Result<EnrollmentDto, EnrollmentError> {
        let enrollment = self.load(enrollment_id).await?;
        let course = self
            .store
            .course_repo()
            .get(enrollment.course_id)
            .await?
            .ok_or_else(|| EnrollmentError::CourseNotFound(enrollment.course_id.into()))?;

        access::require(
            principal,
            Action::UpdateProgress {
                student: enrollment.student_id.into(),
                course_owner: course.instructor_id.into(),
            },
        )?;

        let progress = Progress::new(progress).map_err(|_| {
            EnrollmentError::Validation("Progress must be between 0 and 100".to_string())
        })?;

        let updated = self
            .store
            .enrollment_repo()
            .set_progress(enrollment, progress)
            .await?;

        debug!(enrollment_id = updated.id, progress = updated.progress, "Progress updated");
        Ok(updated.into())
    }

    async fn set_status(
        &self,
        principal: &Principal,
        enrollment_id: i32,
        status: &str,
    ) -> Result<EnrollmentDto, EnrollmentError> {
        access::require(principal, Action::ManageEnrollments)?;

        let status: EnrollmentStatus = status
            .trim()
            .parse()
            .map_err(|e: crate::domain::ParseEnumError| EnrollmentError::Validation(e.to_string()))?;

        let enrollment = self.load(enrollment_id).await?;
        let updated = self
            .store
            .enrollment_repo()
            .set_status(enrollment, status)
            .await?;

        info!(
            enrollment_id = updated.id,
            status = %status,
            by = %principal.username,
            "Enrollment status changed"
        );
        Ok(updated.into())
    }

    async fn list(
        &self,
        principal: &Principal,
        filter: EnrollmentFilter,
        page: u64,
    ) -> Result<Page<EnrollmentRow>, EnrollmentError> {
        access::require(principal, Action::ManageEnrollments)?;

        let query = EnrollmentQuery {
            status: parse_status_filter(filter.status.as_deref())?,
            course_id: filter.course_id,
            student_username: filter
                .student
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            ..EnrollmentQuery::default()
        };

        Ok(self
            .store
            .enrollment_repo()
            .page(&query, page.max(1), ENROLLMENTS_PER_PAGE)
            .await?)
    }
}
