use anyhow::{Context, Result};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, FromQueryResult,
    JoinType, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Select, Set,
};
use serde::Serialize;
use std::collections::HashMap;

use crate::db::{Page, contains_literal, timestamp_now};
use crate::domain::{EnrollmentStatus, Progress};
use crate::entities::{courses, enrollments, users};

pub use enrollments::Model as Enrollment;

/// Enrollment joined with the student and course it links.
#[derive(Debug, Clone, FromQueryResult, Serialize)]
pub struct EnrollmentRow {
    pub id: i32,
    pub student_id: i32,
    pub student_username: String,
    pub student_email: String,
    pub student_first_name: String,
    pub student_last_name: String,
    pub course_id: i32,
    pub course_title: String,
    pub status: String,
    pub progress: i32,
    pub enrolled_at: String,
    pub completed_at: Option<String>,
}

/// Filters shared by the enrollment management listing and analytics.
#[derive(Debug, Clone, Default)]
pub struct EnrollmentQuery {
    pub status: Option<EnrollmentStatus>,
    pub course_id: Option<i32>,
    pub student_id: Option<i32>,
    /// Only courses taught by this instructor.
    pub instructor_id: Option<i32>,
    /// Case-insensitive substring of the student's username, email, first or last name.
    pub student_search: Option<String>,
    /// Case-insensitive substring of the student's username only.
    pub student_username: Option<String>,
    /// Inclusive lower bound on `enrolled_at` (stored timestamp format).
    pub enrolled_since: Option<String>,
}

impl EnrollmentQuery {
    fn apply(&self, mut select: Select<enrollments::Entity>) -> Select<enrollments::Entity> {
        if let Some(status) = self.status {
            select = select.filter(enrollments::Column::Status.eq(status.as_str()));
        }
        if let Some(course_id) = self.course_id {
            select = select.filter(enrollments::Column::CourseId.eq(course_id));
        }
        if let Some(student_id) = self.student_id {
            select = select.filter(enrollments::Column::StudentId.eq(student_id));
        }
        if let Some(instructor_id) = self.instructor_id {
            select = select.filter(courses::Column::InstructorId.eq(instructor_id));
        }
        if let Some(search) = self.student_search.as_deref().filter(|s| !s.is_empty()) {
            select = select.filter(
                Condition::any()
                    .add(users::Column::Username.like(contains_literal(search)))
                    .add(users::Column::Email.like(contains_literal(search)))
                    .add(users::Column::FirstName.like(contains_literal(search)))
                    .add(users::Column::LastName.like(contains_literal(search))),
            );
        }
        if let Some(username) = self.student_username.as_deref().filter(|s| !s.is_empty()) {
            select = select.filter(users::Column::Username.like(contains_literal(username)));
        }
        if let Some(since) = &self.enrolled_since {
            select = select.filter(enrollments::Column::EnrolledAt.gte(since.as_str()));
        }
        select
    }
}

pub struct EnrollmentRepository {
    conn: DatabaseConnection,
}

impl EnrollmentRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Inserts a fresh enrollment unless the (student, course) pair exists.
    ///
    /// Returns the stored row and whether this call created it. Concurrent
    /// duplicates collapse on the unique index instead of failing.
    pub async fn insert_if_absent(&self, student_id: i32, course_id: i32) -> Result<(Enrollment, bool)> {
        let active = enrollments::ActiveModel {
            student_id: Set(student_id),
            course_id: Set(course_id),
            enrolled_at: Set(timestamp_now()),
            completed_at: Set(None),
            status: Set(EnrollmentStatus::Enrolled.as_str().to_string()),
            progress: Set(0),
            ..Default::default()
        };

        let inserted = enrollments::Entity::insert(active)
            .on_conflict(
                OnConflict::columns([
                    enrollments::Column::StudentId,
                    enrollments::Column::CourseId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(&self.conn)
            .await
            .context("Failed to insert enrollment")?;

        let enrollment = self
            .get_for(student_id, course_id)
            .await?
            .context("Enrollment missing after insert")?;

        Ok((enrollment, inserted > 0))
    }

    pub async fn get(&self, id: i32) -> Result<Option<Enrollment>> {
        enrollments::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query enrollment")
    }

    pub async fn get_for(&self, student_id: i32, course_id: i32) -> Result<Option<Enrollment>> {
        enrollments::Entity::find()
            .filter(enrollments::Column::StudentId.eq(student_id))
            .filter(enrollments::Column::CourseId.eq(course_id))
            .one(&self.conn)
            .await
            .context("Failed to query enrollment")
    }

    pub async fn is_enrolled(&self, student_id: i32, course_id: i32) -> Result<bool> {
        Ok(self.get_for(student_id, course_id).await?.is_some())
    }

    /// Sets the status; `completed_at` is stamped on completion and cleared otherwise.
    pub async fn set_status(&self, enrollment: Enrollment, status: EnrollmentStatus) -> Result<Enrollment> {
        let already_completed = enrollment.status == EnrollmentStatus::Completed.as_str();
        let completed_at = match status {
            EnrollmentStatus::Completed if already_completed => enrollment
                .completed_at
                .clone()
                .or_else(|| Some(timestamp_now())),
            EnrollmentStatus::Completed => Some(timestamp_now()),
            EnrollmentStatus::Enrolled | EnrollmentStatus::Dropped => None,
        };

        let mut active: enrollments::ActiveModel = enrollment.into();
        active.status = Set(status.as_str().to_string());
        active.completed_at = Set(completed_at);

        active
            .update(&self.conn)
            .await
            .context("Failed to update enrollment status")
    }

    pub async fn set_progress(&self, enrollment: Enrollment, progress: Progress) -> Result<Enrollment> {
        let mut active: enrollments::ActiveModel = enrollment.into();
        active.progress = Set(progress.value());

        active
            .update(&self.conn)
            .await
            .context("Failed to update enrollment progress")
    }

    fn joined() -> Select<enrollments::Entity> {
        enrollments::Entity::find()
            .select_only()
            .column(enrollments::Column::Id)
            .column(enrollments::Column::StudentId)
            .column_as(users::Column::Username, "student_username")
            .column_as(users::Column::Email, "student_email")
            .column_as(users::Column::FirstName, "student_first_name")
            .column_as(users::Column::LastName, "student_last_name")
            .column(enrollments::Column::CourseId)
            .column_as(courses::Column::Title, "course_title")
            .column(enrollments::Column::Status)
            .column(enrollments::Column::Progress)
            .column(enrollments::Column::EnrolledAt)
            .column(enrollments::Column::CompletedAt)
            .join(JoinType::InnerJoin, enrollments::Relation::Student.def())
            .join(JoinType::InnerJoin, enrollments::Relation::Course.def())
    }

    /// All matching rows, newest first.
    pub async fn rows(&self, query: &EnrollmentQuery) -> Result<Vec<EnrollmentRow>> {
        query
            .apply(Self::joined())
            .order_by_desc(enrollments::Column::EnrolledAt)
            .order_by_desc(enrollments::Column::Id)
            .into_model::<EnrollmentRow>()
            .all(&self.conn)
            .await
            .context("Failed to query enrollments")
    }

    pub async fn recent(&self, limit: u64) -> Result<Vec<EnrollmentRow>> {
        Self::joined()
            .order_by_desc(enrollments::Column::EnrolledAt)
            .order_by_desc(enrollments::Column::Id)
            .limit(limit)
            .into_model::<EnrollmentRow>()
            .all(&self.conn)
            .await
            .context("Failed to query recent enrollments")
    }

    pub async fn page(
        &self,
        query: &EnrollmentQuery,
        page: u64,
        per_page: u64,
    ) -> Result<Page<EnrollmentRow>> {
        let paginator = query
            .apply(Self::joined())
            .order_by_desc(enrollments::Column::EnrolledAt)
            .order_by_desc(enrollments::Column::Id)
            .into_model::<EnrollmentRow>()
            .paginate(&self.conn, per_page);

        let counts = paginator
            .num_items_and_pages()
            .await
            .context("Failed to count enrollments")?;
        let items = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .context("Failed to list enrollments")?;

        Ok(Page {
            items,
            page,
            per_page,
            total_items: counts.number_of_items,
            total_pages: counts.number_of_pages,
        })
    }

    pub async fn count(&self) -> Result<u64> {
        enrollments::Entity::find()
            .count(&self.conn)
            .await
            .context("Failed to count enrollments")
    }

    pub async fn count_by_status(&self, status: EnrollmentStatus) -> Result<u64> {
        enrollments::Entity::find()
            .filter(enrollments::Column::Status.eq(status.as_str()))
            .count(&self.conn)
            .await
            .context("Failed to count enrollments by status")
    }

    /// Enrollment count per course id; courses without enrollments are absent.
    pub async fn counts_for_courses(&self, course_ids: &[i32]) -> Result<HashMap<i32, u64>> {
        if course_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let results: Vec<(i32, i64)> = enrollments::Entity::find()
            .select_only()
            .column(enrollments::Column::CourseId)
            .column_as(enrollments::Column::Id.count(), "count")
            .filter(enrollments::Column::CourseId.is_in(course_ids.to_vec()))
            .group_by(enrollments::Column::CourseId)
            .into_tuple()
            .all(&self.conn)
            .await
            .context("Failed to count enrollments per course")?;

        Ok(results
            .into_iter()
            .map(|(id, count)| (id, u64::try_from(count).unwrap_or(0)))
            .collect())
    }
}
