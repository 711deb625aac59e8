use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use sea_orm::sea_query::LikeExpr;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, SqlErr, Statement,
};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use repositories::enrollment::{EnrollmentQuery, EnrollmentRow};
pub use repositories::course::CourseVisibility;
pub use repositories::user::{NewUser, User, UserQuery, UserWithRole};

/// Current time as stored in the database: RFC3339, second precision, `Z` suffix.
///
/// A fixed format keeps stored timestamps lexically comparable, which the
/// window filters and month grouping depend on.
#[must_use]
pub fn timestamp_now() -> String {
    format_timestamp(Utc::now())
}

#[must_use]
pub fn format_timestamp(at: chrono::DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Whether a repository error was caused by a unique index rejecting a write.
#[must_use]
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause.downcast_ref::<DbErr>().is_some_and(|db| {
            matches!(db.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
        })
    })
}

/// Escapes `LIKE` wildcards so a search term matches literally.
#[must_use]
pub fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// `LIKE '%term%'` with `term` taken literally.
#[must_use]
pub fn contains_literal(term: &str) -> LikeExpr {
    LikeExpr::new(format!("%{}%", escape_like(term))).escape('\\')
}

/// One page of a listing.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub per_page: u64,
    pub total_items: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total_items: self.total_items,
            total_pages: self.total_pages,
        }
    }
}

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url
                .trim_start_matches("sqlite://")
                .trim_start_matches("sqlite:");
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    #[must_use]
    pub fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn profile_repo(&self) -> repositories::profile::ProfileRepository {
        repositories::profile::ProfileRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn course_repo(&self) -> repositories::course::CourseRepository {
        repositories::course::CourseRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn enrollment_repo(&self) -> repositories::enrollment::EnrollmentRepository {
        repositories::enrollment::EnrollmentRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn material_repo(&self) -> repositories::material::MaterialRepository {
        repositories::material::MaterialRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn video_repo(&self) -> repositories::video::VideoRepository {
        repositories::video::VideoRepository::new(self.conn.clone())
    }

    // ========== Identity shortcuts ==========

    pub async fn get_user(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn verify_api_key(&self, api_key: &str) -> Result<Option<User>> {
        self.user_repo().verify_api_key(api_key).await
    }

    /// Stored role string of a user's profile, `None` when the profile is missing.
    pub async fn get_user_role(&self, user_id: i32) -> Result<Option<String>> {
        Ok(self
            .profile_repo()
            .get_by_user(user_id)
            .await?
            .map(|p| p.role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamps_are_second_precision_utc() {
        let at = Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(format_timestamp(at), "2026-03-04T05:06:07Z");
    }

    #[test]
    fn page_map_keeps_counts() {
        let page = Page {
            items: vec![1, 2],
            page: 2,
            per_page: 2,
            total_items: 4,
            total_pages: 2,
        };
        let mapped = page.map(|n| n * 10);
        assert_eq!(mapped.items, vec![10, 20]);
        assert_eq!(mapped.total_items, 4);
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("alice"), "alice");
    }

    #[tokio::test]
    async fn duplicate_username_is_a_unique_violation() {
        let store = Store::with_pool_options("sqlite::memory:", 1, 1)
            .await
            .unwrap();
        let security = crate::config::SecurityConfig::default();
        let new_user = || NewUser {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password: "correct horse".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            is_superuser: false,
        };

        store.user_repo().create(new_user(), &security).await.unwrap();
        let err = store
            .user_repo()
            .create(new_user(), &security)
            .await
            .unwrap_err();
        assert!(is_unique_violation(&err));
        assert!(!is_unique_violation(&anyhow::anyhow!("unrelated")));
    }

    #[tokio::test]
    async fn migrations_seed_admin_with_profile() {
        // A single connection keeps the in-memory database alive across queries.
        let store = Store::with_pool_options("sqlite::memory:", 1, 1)
            .await
            .unwrap();
        let admin = store.get_user_by_username("admin").await.unwrap().unwrap();
        assert!(admin.is_superuser);
        assert_eq!(
            store.get_user_role(admin.id).await.unwrap().as_deref(),
            Some("admin")
        );
    }
}
