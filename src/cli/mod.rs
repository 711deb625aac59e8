//! CLI module - Command-line interface for Campus
//!
//! Without a subcommand the server starts.

mod commands;

use clap::{Parser, Subcommand};

use crate::services::analytics_service::MAX_WINDOW_DAYS;

/// Campus - course catalog and enrollment server
#[derive(Parser)]
#[command(name = "campus")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API server
    #[command(alias = "web")]
    Serve,

    /// Create default config file
    Init,

    /// Create a user together with its profile
    CreateUser {
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// student, instructor or admin
        #[arg(long, default_value = "student")]
        role: String,
        #[arg(long)]
        superuser: bool,
        #[arg(long, default_value = "")]
        first_name: String,
        #[arg(long, default_value = "")]
        last_name: String,
    },

    /// Change the role of an existing user
    SetRole { username: String, role: String },

    /// List users with their roles
    #[command(alias = "users")]
    ListUsers {
        /// Only users with this role
        #[arg(long)]
        role: Option<String>,
    },

    /// Print enrollment analytics
    Stats {
        /// Window in days
        #[arg(
            long,
            default_value_t = 30,
            value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_WINDOW_DAYS))
        )]
        days: u32,
        /// Ignore the window and use every enrollment
        #[arg(long)]
        all: bool,
    },
}

pub use commands::*;
