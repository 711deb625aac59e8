use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set,
};

use crate::db::timestamp_now;
use crate::domain::Role;
use crate::entities::profiles;

pub use profiles::Model as Profile;

pub struct ProfileRepository {
    conn: DatabaseConnection,
}

impl ProfileRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(&self, user_id: i32, role: Role) -> Result<Profile> {
        let now = timestamp_now();
        let active = profiles::ActiveModel {
            user_id: Set(user_id),
            role: Set(role.as_str().to_string()),
            bio: Set(String::new()),
            phone: Set(String::new()),
            profile_picture: Set(None),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        active
            .insert(&self.conn)
            .await
            .with_context(|| format!("Failed to create profile for user {user_id}"))
    }

    pub async fn get_by_user(&self, user_id: i32) -> Result<Option<Profile>> {
        profiles::Entity::find()
            .filter(profiles::Column::UserId.eq(user_id))
            .one(&self.conn)
            .await
            .context("Failed to query profile")
    }

    /// Returns `false` when the user has no profile.
    pub async fn set_role(&self, user_id: i32, role: Role) -> Result<bool> {
        let result = profiles::Entity::update_many()
            .col_expr(
                profiles::Column::Role,
                sea_orm::sea_query::Expr::value(role.as_str()),
            )
            .col_expr(
                profiles::Column::UpdatedAt,
                sea_orm::sea_query::Expr::value(timestamp_now()),
            )
            .filter(profiles::Column::UserId.eq(user_id))
            .exec(&self.conn)
            .await
            .context("Failed to update role")?;

        Ok(result.rows_affected > 0)
    }

    pub async fn update_details(&self, profile: Profile, bio: String, phone: String) -> Result<Profile> {
        let mut active: profiles::ActiveModel = profile.into();
        active.bio = Set(bio);
        active.phone = Set(phone);
        active.updated_at = Set(timestamp_now());

        active
            .update(&self.conn)
            .await
            .context("Failed to update profile")
    }

    pub async fn set_picture(&self, profile: Profile, key: String) -> Result<Profile> {
        let mut active: profiles::ActiveModel = profile.into();
        active.profile_picture = Set(Some(key));
        active.updated_at = Set(timestamp_now());

        active
            .update(&self.conn)
            .await
            .context("Failed to update profile picture")
    }

    pub async fn count_by_role(&self, role: Role) -> Result<u64> {
        profiles::Entity::find()
            .filter(profiles::Column::Role.eq(role.as_str()))
            .count(&self.conn)
            .await
            .context("Failed to count profiles")
    }
}
