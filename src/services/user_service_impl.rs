use async_trait::async_trait;
use tracing::info;

use crate::db::{Page, Store, UserQuery, UserWithRole};
use crate::domain::Role;
use crate::domain::access::{self, Action, Principal};
use crate::services::user_service::{UserError, UserFilter, UserService};

pub const USERS_PER_PAGE: u64 = 10;

pub struct SeaOrmUserService {
    store: Store,
}

impl SeaOrmUserService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}

fn parse_role(raw: &str) -> Result<Role, UserError> {
    raw.trim()
        .parse()
        .map_err(|e: crate::domain::ParseEnumError| UserError::Validation(e.to_string()))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

#[async_trait]
impl UserService for SeaOrmUserService {
    async fn list(
        &self,
        principal: &Principal,
        filter: UserFilter,
        page: u64,
    ) -> Result<Page<UserWithRole>, UserError> {
        access::require(principal, Action::ManageUsers)?;

        let role = non_blank(filter.role)
            .map(|r| parse_role(&r))
            .transpose()?;

        let query = UserQuery {
            role: role.map(|r| r.as_str().to_string()),
            search: non_blank(filter.search),
        };

        Ok(self
            .store
            .user_repo()
            .list(&query, page.max(1), USERS_PER_PAGE)
            .await?)
    }

    async fn change_role(
        &self,
        principal: &Principal,
        user_id: i32,
        role: &str,
    ) -> Result<UserWithRole, UserError> {
        access::require(principal, Action::ManageUsers)?;
        let role = parse_role(role)?;

        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or(UserError::NotFound(user_id))?;

        if !self.store.profile_repo().set_role(user.id, role).await? {
            self.store.profile_repo().create(user.id, role).await?;
        }

        info!(
            user_id = user.id,
            username = %user.username,
            role = %role,
            by = %principal.username,
            "Role changed"
        );

        Ok(UserWithRole {
            user,
            role: Some(role.as_str().to_string()),
        })
    }
}
