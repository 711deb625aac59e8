//! Domain service for identities and their profiles.
//!
//! Handles sign-up, sign-in, principal resolution for the auth middleware,
//! and self-service profile edits.

use thiserror::Error;

use crate::api::types::AccountDto;
use crate::db::NewUser;
use crate::domain::Role;
use crate::domain::access::Principal;
use crate::storage::{StorageError, Upload};

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User not found")]
    UserNotFound,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
    pub first_name: String,
    pub last_name: String,
}

/// Successful sign-in.
#[derive(Debug, Clone, serde::Serialize)]
pub struct LoginResult {
    pub user_id: i32,
    pub username: String,
    pub role: Role,
    /// Landing path for the role.
    pub redirect: &'static str,
    pub api_key: String,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub phone: Option<String>,
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Creates an identity and, immediately after, its profile.
    async fn create_account(&self, new_user: NewUser, role: Role) -> Result<AccountDto, AuthError>;

    /// Validates a sign-up form and creates a student account.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] for bad input or a taken username/email.
    async fn signup(&self, request: SignupRequest) -> Result<LoginResult, AuthError>;

    /// Verifies credentials, repairs a missing profile and records the login.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] if login fails.
    async fn login(&self, username: &str, password: &str) -> Result<LoginResult, AuthError>;

    /// Loads the principal for a session user id. Never writes.
    async fn principal_for_user(&self, user_id: i32) -> Result<Option<Principal>, AuthError>;

    /// Loads the principal owning an API key.
    async fn principal_for_api_key(&self, api_key: &str) -> Result<Option<Principal>, AuthError>;

    async fn account(&self, principal: &Principal) -> Result<AccountDto, AuthError>;

    async fn update_profile(
        &self,
        principal: &Principal,
        update: ProfileUpdate,
    ) -> Result<AccountDto, AuthError>;

    /// Stores a new profile picture, replacing the previous one.
    async fn set_avatar(&self, principal: &Principal, upload: Upload) -> Result<AccountDto, AuthError>;

    /// Regenerates the API key for a user and returns the new one.
    async fn regenerate_api_key(&self, principal: &Principal) -> Result<String, AuthError>;
}
