//! ThinkPad Store CLI - migrations, development server and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply pending database migrations
//! ts-cli migrate
//!
//! # Create an empty migration file
//! ts-cli makemigration add_product_tags
//!
//! # Start the API server (default 127.0.0.1:8000)
//! ts-cli runserver
//! ts-cli runserver 0.0.0.0:8000
//!
//! # Create a superuser
//! ts-cli createsuperuser -u admin -e admin@example.com -p 'a long password'
//!
//! # Upsert products from YAML
//! ts-cli seed products.yaml
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use thinkpad_store_server::telemetry;

mod commands;

#[derive(Parser)]
#[command(name = "ts-cli")]
#[command(author, version, about = "ThinkPad Store CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Create a new, empty migration file
    Makemigration {
        /// Short description, normalized to `snake_case`
        name: String,

        /// Directory to write the migration into
        #[arg(long, default_value = commands::makemigration::DEFAULT_MIGRATIONS_DIR)]
        dir: PathBuf,
    },
    /// Start the API server
    Runserver {
        /// `PORT` or `HOST:PORT` (default from `STORE_HOST`/`STORE_PORT`, i.e. 127.0.0.1:8000)
        address: Option<String>,
    },
    /// Create a superuser account
    Createsuperuser {
        /// Login name
        #[arg(short, long)]
        username: String,

        /// Email address
        #[arg(short, long)]
        email: String,

        /// Password (at least 8 characters)
        #[arg(short, long)]
        password: String,
    },
    /// Upsert products from a YAML file
    Seed {
        /// Path to the YAML file
        file: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    telemetry::init_tracing("thinkpad_store_cli=info,thinkpad_store_server=info");

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Makemigration { name, dir } => {
            commands::makemigration::run(&name, &dir)?;
        }
        Commands::Runserver { address } => commands::runserver::run(address.as_deref()).await?,
        Commands::Createsuperuser {
            username,
            email,
            password,
        } => {
            commands::superuser::create(&username, &email, &password).await?;
        }
        Commands::Seed { file } => commands::seed::products(&file).await?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_runserver_address_is_optional() {
        let cli = Cli::try_parse_from(["ts-cli", "runserver"]).unwrap_or_else(|e| panic!("{e}"));
        assert!(matches!(cli.command, Commands::Runserver { address: None }));

        let cli = Cli::try_parse_from(["ts-cli", "runserver", "8080"]).unwrap_or_else(|e| panic!("{e}"));
        assert!(matches!(
            cli.command,
            Commands::Runserver { address: Some(ref a) } if a == "8080"
        ));
    }

    #[test]
    fn test_createsuperuser_flags() {
        let cli = Cli::try_parse_from([
            "ts-cli", "createsuperuser", "-u", "root", "-e", "root@example.com", "-p", "s3cure-pass",
        ])
        .unwrap_or_else(|e| panic!("{e}"));
        assert!(matches!(
            cli.command,
            Commands::Createsuperuser { ref username, .. } if username == "root"
        ));
    }
}
