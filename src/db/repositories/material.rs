use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::db::timestamp_now;
use crate::domain::MaterialType;
use crate::entities::course_materials;

pub use course_materials::Model as Material;

#[derive(Debug, Clone)]
pub struct NewMaterial {
    pub course_id: i32,
    pub title: String,
    pub material_type: MaterialType,
    pub file: String,
    pub order: i32,
}

pub struct MaterialRepository {
    conn: DatabaseConnection,
}

impl MaterialRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(&self, material: NewMaterial) -> Result<Material> {
        let active = course_materials::ActiveModel {
            course_id: Set(material.course_id),
            title: Set(material.title),
            material_type: Set(material.material_type.as_str().to_string()),
            file: Set(material.file),
            uploaded_at: Set(timestamp_now()),
            order: Set(material.order),
            ..Default::default()
        };

        active
            .insert(&self.conn)
            .await
            .context("Failed to insert course material")
    }

    /// Materials of a course in display order.
    pub async fn list_for_course(&self, course_id: i32) -> Result<Vec<Material>> {
        course_materials::Entity::find()
            .filter(course_materials::Column::CourseId.eq(course_id))
            .order_by_asc(course_materials::Column::Order)
            .order_by_asc(course_materials::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list course materials")
    }

    /// File keys of every material of a course, for blob cleanup.
    pub async fn files_for_course(&self, course_id: i32) -> Result<Vec<String>> {
        Ok(self
            .list_for_course(course_id)
            .await?
            .into_iter()
            .map(|m| m.file)
            .collect())
    }
}
