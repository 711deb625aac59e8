use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // One enrollment per (student, course); enroll relies on this for ON CONFLICT.
        manager
            .create_index(
                Index::create()
                    .name("idx_enrollments_student_course_unique")
                    .table(Enrollments::Table)
                    .col(Enrollments::StudentId)
                    .col(Enrollments::CourseId)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_enrollments_enrolled_at")
                    .table(Enrollments::Table)
                    .col(Enrollments::EnrolledAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_courses_instructor")
                    .table(Courses::Table)
                    .col(Courses::InstructorId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_courses_instructor")
                    .table(Courses::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_enrollments_enrolled_at")
                    .table(Enrollments::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_enrollments_student_course_unique")
                    .table(Enrollments::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum Enrollments {
    Table,
    StudentId,
    CourseId,
    EnrolledAt,
}

#[derive(DeriveIden)]
enum Courses {
    Table,
    InstructorId,
}
