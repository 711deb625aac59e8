//! User administration command handlers

use crate::config::Config;
use crate::db::{NewUser, Store, UserQuery};
use crate::domain::Role;
use crate::state::SharedState;

const LIST_PAGE_SIZE: u64 = 50;

pub struct NewUserArgs {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: String,
    pub superuser: bool,
    pub first_name: String,
    pub last_name: String,
}

fn parse_role(raw: &str) -> anyhow::Result<Role> {
    raw.parse()
        .map_err(|e| anyhow::anyhow!("{e} (expected one of: student, instructor, admin)"))
}

pub async fn cmd_create_user(config: &Config, args: NewUserArgs) -> anyhow::Result<()> {
    let role = parse_role(&args.role)?;
    if args.password.chars().count() < config.security.min_password_length {
        anyhow::bail!(
            "Password must be at least {} characters",
            config.security.min_password_length
        );
    }

    let state = SharedState::new(config.clone()).await?;
    let account = state
        .auth_service
        .create_account(
            NewUser {
                username: args.username,
                email: args.email,
                password: args.password,
                first_name: args.first_name,
                last_name: args.last_name,
                is_superuser: args.superuser,
            },
            role,
        )
        .await?;

    println!(
        "✓ Created {} '{}' (ID: {})",
        role, account.user.username, account.user.id
    );
    println!("  API key: {}", account.user.api_key);
    Ok(())
}

pub async fn cmd_set_role(config: &Config, username: &str, role: &str) -> anyhow::Result<()> {
    let role = parse_role(role)?;
    let store = Store::new(&config.general.database_path).await?;

    let Some(user) = store.get_user_by_username(username).await? else {
        println!("User '{}' not found.", username);
        return Ok(());
    };

    if !store.profile_repo().set_role(user.id, role).await? {
        store.profile_repo().create(user.id, role).await?;
    }

    println!("✓ '{}' is now {}", user.username, role);
    Ok(())
}

pub async fn cmd_list_users(config: &Config, role: Option<&str>) -> anyhow::Result<()> {
    let role = role.map(parse_role).transpose()?;
    let store = Store::new(&config.general.database_path).await?;

    let query = UserQuery {
        role: role.map(|r| r.as_str().to_string()),
        search: None,
    };

    let mut page = 1;
    let mut printed = 0;
    loop {
        let users = store.user_repo().list(&query, page, LIST_PAGE_SIZE).await?;
        if page == 1 {
            if users.total_items == 0 {
                println!("No users found.");
                return Ok(());
            }
            println!("Users ({} total)", users.total_items);
            println!("{:-<70}", "");
        }

        for entry in &users.items {
            let role = entry.role.as_deref().unwrap_or("no profile");
            let status = if entry.user.is_active { "" } else { " [inactive]" };
            println!(
                "• {} <{}> [{}]{}",
                entry.user.username, entry.user.email, role, status
            );
            println!(
                "  ID: {} | Joined: {} | Last login: {}",
                entry.user.id,
                entry.user.date_joined,
                entry.user.last_login.as_deref().unwrap_or("never")
            );
            printed += 1;
        }

        if page >= users.total_pages {
            break;
        }
        page += 1;
    }

    tracing::debug!(printed, "Listed users");
    Ok(())
}
