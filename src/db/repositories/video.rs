use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::db::timestamp_now;
use crate::entities::course_videos;

pub use course_videos::Model as Video;

#[derive(Debug, Clone)]
pub struct NewVideo {
    pub course_id: i32,
    pub title: String,
    pub description: String,
    pub video_file: Option<String>,
    pub video_url: Option<String>,
    pub duration_minutes: i32,
    pub order: i32,
}

pub struct VideoRepository {
    conn: DatabaseConnection,
}

impl VideoRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(&self, video: NewVideo) -> Result<Video> {
        let active = course_videos::ActiveModel {
            course_id: Set(video.course_id),
            title: Set(video.title),
            description: Set(video.description),
            video_file: Set(video.video_file),
            video_url: Set(video.video_url),
            duration_minutes: Set(video.duration_minutes),
            order: Set(video.order),
            uploaded_at: Set(timestamp_now()),
            ..Default::default()
        };

        active
            .insert(&self.conn)
            .await
            .context("Failed to insert course video")
    }

    pub async fn list_for_course(&self, course_id: i32) -> Result<Vec<Video>> {
        course_videos::Entity::find()
            .filter(course_videos::Column::CourseId.eq(course_id))
            .order_by_asc(course_videos::Column::Order)
            .order_by_asc(course_videos::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list course videos")
    }
}
