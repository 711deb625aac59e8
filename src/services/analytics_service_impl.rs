//! `SeaORM` implementation of the `AnalyticsService` trait.
//!
//! Rows are fetched once per request and aggregated in memory by
//! [`crate::services::analytics`].

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::debug;

use crate::api::types::{
    AdminDashboard, CourseDto, StudentAnalyticsDto, StudentDashboard, TeachingCourseDto,
    TeachingDashboard,
};
use crate::db::repositories::course::Course;
use crate::db::{EnrollmentQuery, EnrollmentRow, Store, UserWithRole, format_timestamp};
use crate::domain::access::{self, Action, Principal};
use crate::domain::{EnrollmentStatus, Role};
use crate::services::analytics::{
    self, Achievements, AnalyticsReport, EnrollmentTotals, average_progress,
};
use crate::services::analytics_service::{
    AnalyticsError, AnalyticsFilter, AnalyticsService, parse_window,
};
use crate::storage::BlobStore;

const AVAILABLE_COURSES: u64 = 6;
const STUDENT_RECENT_ACTIVITY: usize = 5;
const ADMIN_RECENT: u64 = 5;
const ADMIN_COURSES: u64 = 10;

pub struct SeaOrmAnalyticsService {
    store: Store,
    blobs: Arc<dyn BlobStore>,
}

impl SeaOrmAnalyticsService {
    #[must_use]
    pub fn new(store: Store, blobs: Arc<dyn BlobStore>) -> Self {
        Self { store, blobs }
    }

    async fn course_dtos(&self, courses: Vec<Course>) -> Result<Vec<CourseDto>, AnalyticsError> {
        let ids: Vec<i32> = courses.iter().map(|c| c.id).collect();
        let counts = self.store.enrollment_repo().counts_for_courses(&ids).await?;

        Ok(courses
            .into_iter()
            .map(|course| {
                let count = counts.get(&course.id).copied().unwrap_or(0);
                CourseDto::new(course, count, self.blobs.as_ref())
            })
            .collect())
    }

    async fn own_rows(&self, principal: &Principal) -> Result<Vec<EnrollmentRow>, AnalyticsError> {
        let query = EnrollmentQuery {
            student_id: Some(principal.user_id.value()),
            ..EnrollmentQuery::default()
        };
        Ok(self.store.enrollment_repo().rows(&query).await?)
    }
}

/// Per-course numbers for the teaching dashboard.
fn teaching_course(course: CourseDto, rows: &[&EnrollmentRow]) -> TeachingCourseDto {
    let completed = rows
        .iter()
        .filter(|r| r.status == EnrollmentStatus::Completed.as_str())
        .count() as u64;

    TeachingCourseDto {
        average_progress: average_progress(rows.iter().map(|r| r.progress)),
        completed,
        course,
    }
}

#[async_trait]
impl AnalyticsService for SeaOrmAnalyticsService {
    async fn report(
        &self,
        principal: &Principal,
        filter: AnalyticsFilter,
    ) -> Result<AnalyticsReport, AnalyticsError> {
        access::require(principal, Action::ViewAnalytics)?;

        let window = parse_window(filter.range.as_deref())?;
        let query = EnrollmentQuery {
            course_id: filter.course_id,
            student_search: filter
                .student
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            enrolled_since: window
                .map(|days| format_timestamp(Utc::now() - Duration::days(i64::from(days)))),
            ..EnrollmentQuery::default()
        };

        let (enrollments, profiles) = (self.store.enrollment_repo(), self.store.profile_repo());
        let (rows, total_students) = futures::try_join!(
            enrollments.rows(&query),
            profiles.count_by_role(Role::Student),
        )?;

        debug!(rows = rows.len(), window = ?window, "Building analytics report");
        Ok(analytics::build_report(&rows, total_students, window))
    }

    async fn student_analytics(
        &self,
        principal: &Principal,
        student_id: i32,
    ) -> Result<StudentAnalyticsDto, AnalyticsError> {
        access::require(principal, Action::ViewAnalytics)?;

        let user = self
            .store
            .get_user(student_id)
            .await?
            .ok_or(AnalyticsError::StudentNotFound(student_id))?;
        let role = self.store.get_user_role(user.id).await?;

        let query = EnrollmentQuery {
            student_id: Some(user.id),
            ..EnrollmentQuery::default()
        };
        let enrollments = self.store.enrollment_repo().rows(&query).await?;

        Ok(StudentAnalyticsDto {
            student: UserWithRole { user, role },
            totals: EnrollmentTotals::from_rows(&enrollments),
            average_progress: average_progress(enrollments.iter().map(|r| r.progress)),
            recent_activity: enrollments
                .iter()
                .take(STUDENT_RECENT_ACTIVITY)
                .cloned()
                .collect(),
            enrollments,
        })
    }

    async fn student_dashboard(&self, principal: &Principal) -> Result<StudentDashboard, AnalyticsError> {
        access::require(principal, Action::ViewStudentDashboard)?;

        let enrollments = self.own_rows(principal).await?;
        let available = self
            .store
            .course_repo()
            .available_for_student(principal.user_id.value(), AVAILABLE_COURSES)
            .await?;

        Ok(StudentDashboard {
            totals: EnrollmentTotals::from_rows(&enrollments),
            overall_progress: average_progress(enrollments.iter().map(|r| r.progress)),
            available_courses: self.course_dtos(available).await?,
            enrollments,
        })
    }

    async fn achievements(&self, principal: &Principal) -> Result<Achievements, AnalyticsError> {
        access::require(principal, Action::ViewStudentDashboard)?;
        let rows = self.own_rows(principal).await?;
        Ok(analytics::achievements(&rows))
    }

    async fn admin_dashboard(&self, principal: &Principal) -> Result<AdminDashboard, AnalyticsError> {
        access::require(principal, Action::ViewAdminDashboard)?;

        let users = self.store.user_repo();
        let course_repo = self.store.course_repo();
        let enrollments = self.store.enrollment_repo();
        let (total_users, total_courses, total_enrollments, recent_enrollments, recent_users, courses) = futures::try_join!(
            users.count(),
            course_repo.count(),
            enrollments.count(),
            enrollments.recent(ADMIN_RECENT),
            users.recent(ADMIN_RECENT),
            course_repo.first(ADMIN_COURSES),
        )?;

        Ok(AdminDashboard {
            total_users,
            total_courses,
            total_enrollments,
            recent_enrollments,
            recent_users,
            courses: self.course_dtos(courses).await?,
            system_status: "Operational",
        })
    }

    async fn teaching_dashboard(&self, principal: &Principal) -> Result<TeachingDashboard, AnalyticsError> {
        access::require(principal, Action::ViewTeachingDashboard)?;
        let me = principal.user_id.value();

        let query = EnrollmentQuery {
            instructor_id: Some(me),
            ..EnrollmentQuery::default()
        };
        let (course_repo, enrollment_repo) = (self.store.course_repo(), self.store.enrollment_repo());
        let (courses, rows) = futures::try_join!(
            course_repo.list_by_instructor(me),
            enrollment_repo.rows(&query),
        )?;

        let mut by_course: BTreeMap<i32, Vec<&EnrollmentRow>> = BTreeMap::new();
        for row in &rows {
            by_course.entry(row.course_id).or_default().push(row);
        }

        let students: HashSet<i32> = rows.iter().map(|r| r.student_id).collect();

        let courses = courses
            .into_iter()
            .map(|course| {
                let course_rows = by_course.get(&course.id).map_or(&[][..], Vec::as_slice);
                let dto = CourseDto::new(course, course_rows.len() as u64, self.blobs.as_ref());
                teaching_course(dto, course_rows)
            })
            .collect();

        Ok(TeachingDashboard {
            courses,
            total_students: students.len() as u64,
            total_enrollments: rows.len() as u64,
        })
    }
}
