use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::Serialize;
use tokio::task;

use crate::config::SecurityConfig;
use crate::db::{Page, contains_literal, timestamp_now};
use crate::entities::{profiles, users};

/// User data returned from repository (without sensitive password hash)
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub api_key: String,
    pub is_superuser: bool,
    pub is_active: bool,
    pub date_joined: String,
    pub last_login: Option<String>,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            first_name: model.first_name,
            last_name: model.last_name,
            api_key: model.api_key,
            is_superuser: model.is_superuser,
            is_active: model.is_active,
            date_joined: model.date_joined,
            last_login: model.last_login,
        }
    }
}

/// A user listed alongside its profile role (`None` when the profile is missing).
#[derive(Debug, Clone, Serialize)]
pub struct UserWithRole {
    #[serde(flatten)]
    pub user: User,
    pub role: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub is_superuser: bool,
}

/// Filters for the user listing.
#[derive(Debug, Clone, Default)]
pub struct UserQuery {
    pub role: Option<String>,
    /// Case-insensitive substring of username, email, first or last name.
    pub search: Option<String>,
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Inserts the identity row. The caller creates the profile right after.
    pub async fn create(&self, new_user: NewUser, security: &SecurityConfig) -> Result<User> {
        let password = new_user.password;
        let config = security.clone();
        let password_hash = task::spawn_blocking(move || hash_password(&password, Some(&config)))
            .await
            .context("Password hashing task panicked")??;

        let active = users::ActiveModel {
            username: Set(new_user.username),
            email: Set(new_user.email),
            first_name: Set(new_user.first_name),
            last_name: Set(new_user.last_name),
            password_hash: Set(password_hash),
            api_key: Set(generate_api_key()),
            is_superuser: Set(new_user.is_superuser),
            is_active: Set(true),
            date_joined: Set(timestamp_now()),
            last_login: Set(None),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert user")?;

        Ok(User::from(model))
    }

    /// Get user by username
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user by username")?;

        Ok(user.map(User::from))
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> Result<Option<User>> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?;

        Ok(user.map(User::from))
    }

    pub async fn username_or_email_taken(&self, username: &str, email: &str) -> Result<bool> {
        let count = users::Entity::find()
            .filter(
                Condition::any()
                    .add(users::Column::Username.eq(username))
                    .add(users::Column::Email.eq(email)),
            )
            .count(&self.conn)
            .await
            .context("Failed to check for existing user")?;

        Ok(count > 0)
    }

    /// Verifies a password and returns the user it belongs to.
    /// Note: This uses `spawn_blocking` because Argon2 hashing is CPU-intensive
    /// and would block the async runtime if run directly.
    pub async fn verify_password(&self, username: &str, password: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .filter(users::Column::IsActive.eq(true))
            .one(&self.conn)
            .await
            .context("Failed to query user for password verification")?;

        let Some(user) = user else {
            return Ok(None);
        };

        let password_hash = user.password_hash.clone();
        let password = password.to_string();

        let is_valid = task::spawn_blocking(move || {
            let parsed_hash = PasswordHash::new(&password_hash)
                .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

            Ok::<bool, anyhow::Error>(
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed_hash)
                    .is_ok(),
            )
        })
        .await
        .context("Password verification task panicked")??;

        Ok(is_valid.then(|| User::from(user)))
    }

    pub async fn record_login(&self, id: i32) -> Result<()> {
        users::Entity::update_many()
            .col_expr(
                users::Column::LastLogin,
                sea_orm::sea_query::Expr::value(timestamp_now()),
            )
            .filter(users::Column::Id.eq(id))
            .exec(&self.conn)
            .await
            .context("Failed to record login")?;

        Ok(())
    }

    pub async fn update_names(&self, id: i32, first_name: &str, last_name: &str) -> Result<()> {
        users::Entity::update_many()
            .col_expr(
                users::Column::FirstName,
                sea_orm::sea_query::Expr::value(first_name),
            )
            .col_expr(
                users::Column::LastName,
                sea_orm::sea_query::Expr::value(last_name),
            )
            .filter(users::Column::Id.eq(id))
            .exec(&self.conn)
            .await
            .context("Failed to update user names")?;

        Ok(())
    }

    /// Verify API key and return the associated user
    pub async fn verify_api_key(&self, api_key: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::ApiKey.eq(api_key))
            .filter(users::Column::IsActive.eq(true))
            .one(&self.conn)
            .await
            .context("Failed to query user by API key")?;

        Ok(user.map(User::from))
    }

    /// Regenerate API key for a user
    pub async fn regenerate_api_key(&self, id: i32) -> Result<String> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user for API key regeneration")?
            .ok_or_else(|| anyhow::anyhow!("User not found: {id}"))?;

        let new_api_key = generate_api_key();

        let mut active: users::ActiveModel = user.into();
        active.api_key = Set(new_api_key.clone());
        active.update(&self.conn).await?;

        Ok(new_api_key)
    }

    /// Users newest first, with their profile role.
    pub async fn list(&self, query: &UserQuery, page: u64, per_page: u64) -> Result<Page<UserWithRole>> {
        let mut select = users::Entity::find()
            .find_also_related(profiles::Entity)
            .order_by_desc(users::Column::DateJoined)
            .order_by_desc(users::Column::Id);

        if let Some(role) = &query.role {
            select = select.filter(profiles::Column::Role.eq(role.as_str()));
        }

        if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
            select = select.filter(
                Condition::any()
                    .add(users::Column::Username.like(contains_literal(search)))
                    .add(users::Column::Email.like(contains_literal(search)))
                    .add(users::Column::FirstName.like(contains_literal(search)))
                    .add(users::Column::LastName.like(contains_literal(search))),
            );
        }

        let paginator = select.paginate(&self.conn, per_page);
        let counts = paginator
            .num_items_and_pages()
            .await
            .context("Failed to count users")?;
        let rows = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .context("Failed to list users")?;

        Ok(Page {
            items: rows
                .into_iter()
                .map(|(user, profile)| UserWithRole {
                    user: User::from(user),
                    role: profile.map(|p| p.role),
                })
                .collect(),
            page,
            per_page,
            total_items: counts.number_of_items,
            total_pages: counts.number_of_pages,
        })
    }

    pub async fn recent(&self, limit: u64) -> Result<Vec<UserWithRole>> {
        let rows = users::Entity::find()
            .find_also_related(profiles::Entity)
            .order_by_desc(users::Column::DateJoined)
            .order_by_desc(users::Column::Id)
            .limit(limit)
            .all(&self.conn)
            .await
            .context("Failed to query recent users")?;

        Ok(rows
            .into_iter()
            .map(|(user, profile)| UserWithRole {
                user: User::from(user),
                role: profile.map(|p| p.role),
            })
            .collect())
    }

    pub async fn count(&self) -> Result<u64> {
        users::Entity::find()
            .count(&self.conn)
            .await
            .context("Failed to count users")
    }
}

/// Hash a password using Argon2id with optional custom params.
/// If config is None, uses default params.
pub fn hash_password(password: &str, config: Option<&SecurityConfig>) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let argon2 = if let Some(cfg) = config {
        let params = Params::new(
            cfg.argon2_memory_cost_kib,
            cfg.argon2_time_cost,
            cfg.argon2_parallelism,
            None,
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    } else {
        Argon2::default()
    };

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Generate a random API key (64 character hex string)
#[must_use]
pub fn generate_api_key() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();

    bytes.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}
