//! Domain service for user administration.

use thiserror::Error;

use crate::db::{Page, UserWithRole};
use crate::domain::access::{Denied, Principal};

#[derive(Debug, Error)]
pub enum UserError {
    #[error("User not found: {0}")]
    NotFound(i32),

    #[error(transparent)]
    Forbidden(#[from] Denied),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for UserError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for UserError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub role: Option<String>,
    pub search: Option<String>,
}

#[async_trait::async_trait]
pub trait UserService: Send + Sync {
    /// Lists users newest first with their roles. Admin only.
    ///
    /// # Errors
    ///
    /// A role filter outside the enumeration is a validation error.
    async fn list(
        &self,
        principal: &Principal,
        filter: UserFilter,
        page: u64,
    ) -> Result<Page<UserWithRole>, UserError>;

    /// Sets a user's role, creating the profile if it is missing. Admin only.
    async fn change_role(
        &self,
        principal: &Principal,
        user_id: i32,
        role: &str,
    ) -> Result<UserWithRole, UserError>;
}
