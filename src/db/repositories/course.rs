use anyhow::{Context, Result};
use sea_orm::sea_query::Query;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};

use crate::db::{Page, timestamp_now};
use crate::domain::CourseLevel;
use crate::entities::{courses, enrollments};

pub use courses::Model as Course;

/// Which courses a caller may see in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourseVisibility {
    PublishedOnly,
    /// Published courses plus the drafts of one instructor.
    PublishedOrOwnedBy(i32),
    All,
}

impl CourseVisibility {
    fn condition(self) -> Condition {
        match self {
            Self::PublishedOnly => Condition::all().add(courses::Column::IsPublished.eq(true)),
            Self::PublishedOrOwnedBy(owner) => Condition::any()
                .add(courses::Column::IsPublished.eq(true))
                .add(courses::Column::InstructorId.eq(owner)),
            Self::All => Condition::all(),
        }
    }

    #[must_use]
    pub fn allows(self, course: &Course) -> bool {
        match self {
            Self::PublishedOnly => course.is_published,
            Self::PublishedOrOwnedBy(owner) => course.is_published || course.instructor_id == owner,
            Self::All => true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CourseFields {
    pub title: String,
    pub description: String,
    pub level: CourseLevel,
    pub duration_hours: i32,
    pub price_cents: i64,
    pub is_published: bool,
}

pub struct CourseRepository {
    conn: DatabaseConnection,
}

impl CourseRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(&self, instructor_id: i32, fields: CourseFields) -> Result<Course> {
        let now = timestamp_now();
        let active = courses::ActiveModel {
            title: Set(fields.title),
            description: Set(fields.description),
            instructor_id: Set(instructor_id),
            level: Set(fields.level.as_str().to_string()),
            duration_hours: Set(fields.duration_hours),
            price_cents: Set(fields.price_cents),
            is_published: Set(fields.is_published),
            thumbnail: Set(None),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        active
            .insert(&self.conn)
            .await
            .context("Failed to insert course")
    }

    pub async fn get(&self, id: i32) -> Result<Option<Course>> {
        courses::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query course")
    }

    pub async fn update(&self, course: Course, fields: CourseFields) -> Result<Course> {
        let mut active: courses::ActiveModel = course.into();
        active.title = Set(fields.title);
        active.description = Set(fields.description);
        active.level = Set(fields.level.as_str().to_string());
        active.duration_hours = Set(fields.duration_hours);
        active.price_cents = Set(fields.price_cents);
        active.is_published = Set(fields.is_published);
        active.updated_at = Set(timestamp_now());

        active
            .update(&self.conn)
            .await
            .context("Failed to update course")
    }

    pub async fn set_thumbnail(&self, course: Course, key: String) -> Result<Course> {
        let mut active: courses::ActiveModel = course.into();
        active.thumbnail = Set(Some(key));
        active.updated_at = Set(timestamp_now());

        active
            .update(&self.conn)
            .await
            .context("Failed to update course thumbnail")
    }

    /// Deletes the course; enrollments, materials and videos go with it.
    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = courses::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete course")?;

        Ok(result.rows_affected > 0)
    }

    /// Catalog page, newest first.
    pub async fn list(
        &self,
        visibility: CourseVisibility,
        page: u64,
        per_page: u64,
    ) -> Result<Page<Course>> {
        let paginator = courses::Entity::find()
            .filter(visibility.condition())
            .order_by_desc(courses::Column::CreatedAt)
            .order_by_desc(courses::Column::Id)
            .paginate(&self.conn, per_page);

        let counts = paginator
            .num_items_and_pages()
            .await
            .context("Failed to count courses")?;
        let items = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .context("Failed to list courses")?;

        Ok(Page {
            items,
            page,
            per_page,
            total_items: counts.number_of_items,
            total_pages: counts.number_of_pages,
        })
    }

    pub async fn list_by_instructor(&self, instructor_id: i32) -> Result<Vec<Course>> {
        courses::Entity::find()
            .filter(courses::Column::InstructorId.eq(instructor_id))
            .order_by_desc(courses::Column::CreatedAt)
            .order_by_desc(courses::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list instructor courses")
    }

    /// Published courses the student is not enrolled in, newest first.
    pub async fn available_for_student(&self, student_id: i32, limit: u64) -> Result<Vec<Course>> {
        let enrolled = Query::select()
            .column(enrollments::Column::CourseId)
            .from(enrollments::Entity)
            .and_where(enrollments::Column::StudentId.eq(student_id))
            .to_owned();

        courses::Entity::find()
            .filter(courses::Column::IsPublished.eq(true))
            .filter(courses::Column::Id.not_in_subquery(enrolled))
            .order_by_desc(courses::Column::CreatedAt)
            .order_by_desc(courses::Column::Id)
            .limit(limit)
            .all(&self.conn)
            .await
            .context("Failed to query available courses")
    }

    pub async fn first(&self, limit: u64) -> Result<Vec<Course>> {
        courses::Entity::find()
            .order_by_asc(courses::Column::Id)
            .limit(limit)
            .all(&self.conn)
            .await
            .context("Failed to query courses")
    }

    pub async fn count(&self) -> Result<u64> {
        courses::Entity::find()
            .count(&self.conn)
            .await
            .context("Failed to count courses")
    }
}
