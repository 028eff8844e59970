//! Bookstore CLI - database migrations and staff management.
//!
//! # Usage
//!
//! ```bash
//! # Apply storefront database migrations
//! bs-cli migrate run
//!
//! # List applied and pending migrations
//! bs-cli migrate status
//!
//! # Promote an account to a management role
//! bs-cli user role -e manager@example.com -r product_manager
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "bs-cli")]
#[command(author, version, about = "Bookstore CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Manage accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum MigrateAction {
    /// Apply pending migrations
    Run,
    /// Show applied and pending migrations
    Status,
}

#[derive(Subcommand)]
enum UserAction {
    /// Set an account's role
    Role {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Role (`customer`, `product_manager`, `sales_manager`)
        #[arg(short, long)]
        role: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate { action } => match action {
            MigrateAction::Run => commands::migrate::run().await?,
            MigrateAction::Status => commands::migrate::status().await?,
        },
        Commands::User { action } => match action {
            UserAction::Role { email, role } => {
                commands::user::set_role(&email, &role).await?;
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_user_role() {
        let cli = Cli::try_parse_from([
            "bs-cli",
            "user",
            "role",
            "-e",
            "pm@example.com",
            "-r",
            "product_manager",
        ])
        .expect("parse");
        assert!(matches!(
            cli.command,
            Commands::User {
                action: UserAction::Role { ref role, .. }
            } if role == "product_manager"
        ));
    }
}
