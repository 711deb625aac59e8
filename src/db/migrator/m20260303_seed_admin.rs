use crate::entities::prelude::*;
use crate::entities::users;
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::{ConnectionTrait, Statement};

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Default API key (regenerate after first login)
pub const DEFAULT_API_KEY: &str = "campus_default_api_key_please_regenerate";

pub const DEFAULT_ADMIN_USERNAME: &str = "admin";

fn hash_default_password() -> Result<String, DbErr> {
    use argon2::{
        Argon2,
        password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
    };

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(b"password", &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| DbErr::Custom(format!("Failed to hash default password: {e}")))
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let now = crate::db::timestamp_now();
        let password_hash = hash_default_password()?;

        let insert = Query::insert()
            .into_table(Users)
            .columns([
                users::Column::Username,
                users::Column::Email,
                users::Column::FirstName,
                users::Column::LastName,
                users::Column::PasswordHash,
                users::Column::ApiKey,
                users::Column::IsSuperuser,
                users::Column::IsActive,
                users::Column::DateJoined,
            ])
            .values_panic([
                DEFAULT_ADMIN_USERNAME.into(),
                "admin@localhost".into(),
                "".into(),
                "".into(),
                password_hash.into(),
                DEFAULT_API_KEY.into(),
                true.into(),
                true.into(),
                now.clone().into(),
            ])
            .on_conflict(
                OnConflict::column(users::Column::Username)
                    .do_nothing()
                    .to_owned(),
            )
            .to_owned();

        manager.exec_stmt(insert).await?;

        let backend = manager.get_database_backend();
        manager
            .get_connection()
            .execute(Statement::from_sql_and_values(
                backend,
                "INSERT OR IGNORE INTO profiles (user_id, role, bio, phone, created_at, updated_at) \
                 SELECT id, 'admin', '', '', ?, ? FROM users WHERE username = ?",
                [now.clone().into(), now.into(), DEFAULT_ADMIN_USERNAME.into()],
            ))
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let delete = Query::delete()
            .from_table(Users)
            .and_where(Expr::col(users::Column::Username).eq(DEFAULT_ADMIN_USERNAME))
            .to_owned();

        manager.exec_stmt(delete).await?;

        Ok(())
    }
}
