//! hearth CLI - property catalog maintenance
//!
//! - Schema migrations and database health checks
//! - Property listing, inspection and deletion (`property` subcommand)
//! - Review moderation and rating statistics (`review` subcommand)

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use hearth_core::db::migrations;
use hearth_core::{Config, ConnectionManager};
use tracing::info;

mod commands;
mod tracing_setup;

use commands::Catalog;

#[derive(Parser, Debug)]
#[command(
    name = "hearth",
    author,
    version,
    about = "Property catalog persistence tooling",
    long_about = "Manage the hearth property catalog: apply the schema, probe the database, \
                  inspect listings and moderate reviews. Connection settings come from \
                  DATABASE_URL or the DB_* environment variables (a .env file is honored)."
)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create catalog tables and indexes (idempotent)
    Migrate,
    /// Check that the database answers within the health timeout
    Health,
    /// Property listing operations (list, show, delete, owner, published)
    Property(commands::property::PropertyArgs),
    /// Review operations (list, stats, verify, delete)
    Review(commands::review::ReviewArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    tracing_setup::init(&tracing_setup::TracingConfig { debug: cli.debug }).ok();

    let config = Config::from_env().context("Invalid configuration")?;
    let db = ConnectionManager::connect_lazy(&config.database)
        .context("Invalid database connection settings")?;

    let result = run(cli.command, &db, &config).await;
    db.close().await;
    result
}

async fn run(command: Commands, db: &ConnectionManager, config: &Config) -> Result<()> {
    match command {
        Commands::Migrate => {
            migrations::run(db).await?;
            println!("✓ schema is up to date");
            Ok(())
        }
        Commands::Health => run_health(db).await,
        Commands::Property(args) => {
            commands::run_property(&Catalog::new(db.clone(), config), args).await
        }
        Commands::Review(args) => {
            commands::run_review(&Catalog::new(db.clone(), config), args).await
        }
    }
}

async fn run_health(db: &ConnectionManager) -> Result<()> {
    if db.test_connection().await {
        let (open, idle) = db.usage();
        info!(open, idle, "database healthy");
        println!("✓ database reachable");
        Ok(())
    } else {
        Err(anyhow!("database unreachable"))
    }
}
