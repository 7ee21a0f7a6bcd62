//! # chroma: Operator Commands for the Catalog Database
//!
//! ## Usage
//! ```bash
//! # Apply pending schema migrations (backs the file up first)
//! chroma migrate
//!
//! # Show the schema version and its history
//! chroma version
//!
//! # Convert legacy single-color products
//! chroma normalize
//!
//! # Catalog figures, machine readable
//! chroma stats --json
//!
//! # Any command against a specific file
//! chroma --db ./catalog.db colors
//! ```
//!
//! ## Database Location
//! 1. `--db <PATH>`
//! 2. `CHROMA_DB_PATH`
//! 3. Platform data directory:
//!    - **macOS**: `~/Library/Application Support/com.chroma.catalog/catalog.db`
//!    - **Windows**: `%APPDATA%\chroma\catalog\data\catalog.db`
//!    - **Linux**: `~/.local/share/catalog/catalog.db`
//!
//! Logs go to stderr (`RUST_LOG` to adjust); command output goes to stdout.

mod error;
mod seed;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use directories::ProjectDirs;
use tracing::error;
use tracing_subscriber::EnvFilter;

use chroma_db::{Database, DbConfig, Migrator};

use crate::error::{CliError, CliResult};

#[derive(Debug, Parser)]
#[command(name = "chroma", about = "Chroma catalog database tool", version, long_about = None)]
struct Cli {
    /// Database file (overrides CHROMA_DB_PATH)
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply pending schema migrations
    Migrate {
        /// Skip the pre-migration backup
        #[arg(long)]
        no_backup: bool,
    },

    /// Copy the database file into the backup directory
    Backup,

    /// Show the schema version and migration history
    Version,

    /// Convert legacy single-color products to color specifications
    Normalize,

    /// Show catalog statistics
    Stats {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// List every color in use, most used first
    Colors,

    /// Fill an empty catalog with sample products
    Seed {
        /// Number of products to generate
        #[arg(short, long, default_value_t = 50)]
        count: usize,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "Command failed");
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let config = match cli.db {
        Some(path) => DbConfig::new(path).with_env_overrides(),
        None => DbConfig::from_env(default_database_path()?),
    };

    match cli.command {
        Command::Migrate { no_backup } => migrate(config, no_backup).await,
        Command::Backup => backup(config).await,
        Command::Version => version(config).await,
        Command::Normalize => normalize(config).await,
        Command::Stats { json } => stats(config, json).await,
        Command::Colors => colors(config).await,
        Command::Seed { count } => {
            let db = Database::new(config).await?;
            let generated = seed::run(&db, count).await?;
            println!("Generated {} products", generated);
            db.close().await;
            Ok(())
        }
    }
}

// =============================================================================
// Commands
// =============================================================================

async fn migrate(config: DbConfig, no_backup: bool) -> CliResult<()> {
    let db = Database::new(config.run_migrations(false)).await?;
    let migrator = db.migrator();

    if !no_backup && migrator.has_pending().await? {
        match migrator.backup().await? {
            Some(path) => println!("Backup written to {}", path.display()),
            None => println!("Nothing to back up"),
        }
    }

    let report = migrator.run_pending().await?;
    if report.applied.is_empty() {
        println!("Schema is up to date (version {})", report.to_version);
    } else {
        println!(
            "Migrated from version {} to {} (applied {:?})",
            report.from_version, report.to_version, report.applied
        );
    }

    db.close().await;
    Ok(())
}

async fn backup(config: DbConfig) -> CliResult<()> {
    let db = Database::new(config.run_migrations(false)).await?;

    match db.migrator().backup().await? {
        Some(path) => println!("Backup written to {}", path.display()),
        None => println!("Nothing to back up"),
    }

    db.close().await;
    Ok(())
}

async fn version(config: DbConfig) -> CliResult<()> {
    let db = Database::new(config.run_migrations(false)).await?;
    let migrator = db.migrator();

    println!(
        "Schema version {} (latest {})",
        migrator.current_version().await?,
        Migrator::latest_version()
    );
    for entry in migrator.history().await? {
        println!("  v{:<3} applied {}", entry.version, entry.applied_at.to_rfc3339());
    }

    db.close().await;
    Ok(())
}

async fn normalize(config: DbConfig) -> CliResult<()> {
    let db = Database::new(config).await?;
    let report = db.legacy_normalizer().run().await?;

    println!("Migrated:             {}", report.migrated);
    println!("Already normalized:   {}", report.already_normalized);
    println!("Without legacy color: {}", report.without_legacy_color);
    println!("Failed:               {}", report.failures.len());
    for failure in &report.failures {
        println!("  {} ({}): {}", failure.product_name, failure.product_id, failure.reason);
    }

    db.close().await;
    Ok(())
}

async fn stats(config: DbConfig, json: bool) -> CliResult<()> {
    let db = Database::new(config).await?;
    let stats = db.products().statistics().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("Products:                 {}", stats.total_products);
        println!("Average print time (min): {:.1}", stats.average_print_time);
        println!("Distinct colors:          {}", stats.distinct_color_count);
        println!("Colors per product:       {:.2}", stats.average_colors_per_product);
        println!("By material:");
        for entry in &stats.products_by_material {
            println!("  {:<6} {}", entry.material, entry.count);
        }
    }

    db.close().await;
    Ok(())
}

async fn colors(config: DbConfig) -> CliResult<()> {
    let db = Database::new(config).await?;

    for color in db.products().available_colors().await? {
        println!(
            "{}  {:<12} {}",
            color.color_hex,
            color.color_name.as_deref().unwrap_or("-"),
            color.product_count
        );
    }

    db.close().await;
    Ok(())
}

// =============================================================================
// Setup
// =============================================================================

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=chroma_db=trace` - Show trace for the storage crate only
/// - Default: INFO, DEBUG for chroma crates
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,chroma=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Platform data directory path for the catalog file.
fn default_database_path() -> CliResult<PathBuf> {
    let proj_dirs =
        ProjectDirs::from("com", "chroma", "catalog").ok_or(CliError::NoDataDirectory)?;

    let data_dir = proj_dirs.data_dir();
    std::fs::create_dir_all(data_dir)?;

    Ok(data_dir.join("catalog.db"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_global_db_after_subcommand() {
        let cli = Cli::try_parse_from(["chroma", "stats", "--json", "--db", "/tmp/x.db"]).unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/x.db")));
        assert!(matches!(cli.command, Command::Stats { json: true }));
    }

    #[test]
    fn test_seed_count_default() {
        let cli = Cli::try_parse_from(["chroma", "seed"]).unwrap();
        assert!(matches!(cli.command, Command::Seed { count: 50 }));
    }
}
