mod stats;
mod users;

pub use stats::cmd_stats;
pub use users::{NewUserArgs, cmd_create_user, cmd_list_users, cmd_set_role};
