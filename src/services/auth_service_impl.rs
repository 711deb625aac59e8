//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::types::AccountDto;
use crate::config::Config;
use crate::db::{NewUser, Store, User, is_unique_violation};
use crate::domain::Role;
use crate::domain::access::{Principal, Standing};
use crate::services::auth_service::{
    AuthError, AuthService, LoginResult, ProfileUpdate, SignupRequest,
};
use crate::storage::{BlobKind, BlobStore, Upload, blob_key};

const MAX_USERNAME_LEN: usize = 150;
const ACCOUNT_TAKEN: &str = "A user with that username or email already exists";
const MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;
const AVATAR_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

pub struct SeaOrmAuthService {
    store: Store,
    config: Arc<Config>,
    blobs: Arc<dyn BlobStore>,
}

impl SeaOrmAuthService {
    #[must_use]
    pub fn new(store: Store, config: Arc<Config>, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            store,
            config,
            blobs,
        }
    }

    /// Role given to an identity found without a profile.
    fn default_role(user: &User) -> Role {
        if user.is_superuser || user.username == "admin" {
            Role::Admin
        } else {
            Role::Student
        }
    }

    fn validate_signup(&self, request: &SignupRequest) -> Result<(), AuthError> {
        let username = request.username.trim();
        if username.is_empty() {
            return Err(AuthError::Validation("Username is required".to_string()));
        }
        if username.len() > MAX_USERNAME_LEN {
            return Err(AuthError::Validation(format!(
                "Username must be {MAX_USERNAME_LEN} characters or fewer"
            )));
        }
        if !username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
        {
            return Err(AuthError::Validation(
                "Username may contain only letters, digits and @/./+/-/_".to_string(),
            ));
        }

        if !is_plausible_email(&request.email) {
            return Err(AuthError::Validation("Enter a valid email address".to_string()));
        }

        let min = self.config.security.min_password_length;
        if request.password.chars().count() < min {
            return Err(AuthError::Validation(format!(
                "Password must be at least {min} characters"
            )));
        }
        if request.password != request.password_confirmation {
            return Err(AuthError::Validation(
                "The two password fields didn't match".to_string(),
            ));
        }

        Ok(())
    }

    async fn load_account(&self, user: User) -> Result<AccountDto, AuthError> {
        let profile = self.store.profile_repo().get_by_user(user.id).await?;
        Ok(AccountDto::new(user, profile, self.blobs.as_ref()))
    }

    async fn principal_from_user(&self, user: User) -> Result<Principal, AuthError> {
        let role = self.store.get_user_role(user.id).await?;
        Ok(Principal::new(
            user.id,
            user.username,
            Standing::from_stored(role.as_deref()),
        ))
    }

    async fn current_user(&self, principal: &Principal) -> Result<User, AuthError> {
        self.store
            .get_user(principal.user_id.value())
            .await?
            .ok_or(AuthError::UserNotFound)
    }
}

fn is_plausible_email(email: &str) -> bool {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn create_account(&self, new_user: NewUser, role: Role) -> Result<AccountDto, AuthError> {
        if self
            .store
            .user_repo()
            .username_or_email_taken(&new_user.username, &new_user.email)
            .await?
        {
            return Err(AuthError::Validation(ACCOUNT_TAKEN.to_string()));
        }

        // A concurrent sign-up can still claim the username between the check and the insert.
        let user = match self
            .store
            .user_repo()
            .create(new_user, &self.config.security)
            .await
        {
            Ok(user) => user,
            Err(e) if is_unique_violation(&e) => {
                return Err(AuthError::Validation(ACCOUNT_TAKEN.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let profile = self.store.profile_repo().create(user.id, role).await?;

        info!(user_id = user.id, username = %user.username, role = %role, "Account created");

        Ok(AccountDto::new(user, Some(profile), self.blobs.as_ref()))
    }

    async fn signup(&self, request: SignupRequest) -> Result<LoginResult, AuthError> {
        self.validate_signup(&request)?;

        let new_user = NewUser {
            username: request.username.trim().to_string(),
            email: request.email.trim().to_string(),
            password: request.password.clone(),
            first_name: request.first_name.trim().to_string(),
            last_name: request.last_name.trim().to_string(),
            is_superuser: false,
        };

        let account = self.create_account(new_user, Role::Student).await?;
        self.store.user_repo().record_login(account.user.id).await?;

        Ok(LoginResult {
            user_id: account.user.id,
            username: account.user.username,
            role: Role::Student,
            redirect: Role::Student.home_path(),
            api_key: account.user.api_key,
        })
    }

    async fn login(&self, username: &str, password: &str) -> Result<LoginResult, AuthError> {
        let user = self
            .store
            .user_repo()
            .verify_password(username, password)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let profile = match self.store.profile_repo().get_by_user(user.id).await? {
            Some(profile) => profile,
            None => {
                let role = Self::default_role(&user);
                warn!(user_id = user.id, role = %role, "Profile missing at sign-in, creating one");
                self.store.profile_repo().create(user.id, role).await?
            }
        };

        let role: Role = profile.role.parse().map_err(|_| {
            AuthError::Validation(format!(
                "Account role '{}' is not recognised. Please contact support.",
                profile.role
            ))
        })?;

        self.store.user_repo().record_login(user.id).await?;
        info!(user_id = user.id, role = %role, "User signed in");

        Ok(LoginResult {
            user_id: user.id,
            username: user.username,
            role,
            redirect: role.home_path(),
            api_key: user.api_key,
        })
    }

    async fn principal_for_user(&self, user_id: i32) -> Result<Option<Principal>, AuthError> {
        match self.store.get_user(user_id).await? {
            Some(user) if user.is_active => Ok(Some(self.principal_from_user(user).await?)),
            _ => Ok(None),
        }
    }

    async fn principal_for_api_key(&self, api_key: &str) -> Result<Option<Principal>, AuthError> {
        match self.store.verify_api_key(api_key).await? {
            Some(user) => Ok(Some(self.principal_from_user(user).await?)),
            None => Ok(None),
        }
    }

    async fn account(&self, principal: &Principal) -> Result<AccountDto, AuthError> {
        let user = self.current_user(principal).await?;
        self.load_account(user).await
    }

    async fn update_profile(
        &self,
        principal: &Principal,
        update: ProfileUpdate,
    ) -> Result<AccountDto, AuthError> {
        let user = self.current_user(principal).await?;

        if let Some(phone) = &update.phone
            && phone.chars().count() > 20
        {
            return Err(AuthError::Validation(
                "Phone number must be 20 characters or fewer".to_string(),
            ));
        }

        if update.first_name.is_some() || update.last_name.is_some() {
            let first = update.first_name.as_deref().unwrap_or(&user.first_name);
            let last = update.last_name.as_deref().unwrap_or(&user.last_name);
            self.store
                .user_repo()
                .update_names(user.id, first.trim(), last.trim())
                .await?;
        }

        let profile = self
            .store
            .profile_repo()
            .get_by_user(user.id)
            .await?
            .ok_or_else(|| AuthError::Validation("User profile not found".to_string()))?;

        if update.bio.is_some() || update.phone.is_some() {
            let bio = update.bio.unwrap_or_else(|| profile.bio.clone());
            let phone = update.phone.unwrap_or_else(|| profile.phone.clone());
            self.store
                .profile_repo()
                .update_details(profile, bio, phone)
                .await?;
        }

        let user = self.current_user(principal).await?;
        self.load_account(user).await
    }

    async fn set_avatar(&self, principal: &Principal, upload: Upload) -> Result<AccountDto, AuthError> {
        let user = self.current_user(principal).await?;

        if upload.bytes.is_empty() {
            return Err(AuthError::Validation("The uploaded file is empty".to_string()));
        }
        if upload.bytes.len() > MAX_AVATAR_BYTES {
            return Err(AuthError::Validation(
                "Profile pictures must be 5 MB or smaller".to_string(),
            ));
        }
        if !upload
            .extension()
            .is_some_and(|ext| AVATAR_EXTENSIONS.contains(&ext.as_str()))
        {
            return Err(AuthError::Validation(format!(
                "Profile pictures must be one of: {}",
                AVATAR_EXTENSIONS.join(", ")
            )));
        }

        let profile = self
            .store
            .profile_repo()
            .get_by_user(user.id)
            .await?
            .ok_or_else(|| AuthError::Validation("User profile not found".to_string()))?;

        let key = blob_key(BlobKind::ProfilePicture, user.id, &upload.filename);
        self.blobs.put(&key, upload.bytes).await?;

        let previous = profile.profile_picture.clone();
        let profile = self.store.profile_repo().set_picture(profile, key).await?;

        if let Some(old) = previous
            && let Err(e) = self.blobs.delete(&old).await
        {
            warn!(key = %old, error = %e, "Failed to remove previous profile picture");
        }

        Ok(AccountDto::new(user, Some(profile), self.blobs.as_ref()))
    }

    async fn regenerate_api_key(&self, principal: &Principal) -> Result<String, AuthError> {
        let key = self
            .store
            .user_repo()
            .regenerate_api_key(principal.user_id.value())
            .await?;

        info!(user_id = %principal.user_id, "API key regenerated");
        Ok(key)
    }
}
