//! # SWAPI Search CLI (`swapi`)
//!
//! The `swapi` binary drives the ETL pipeline and reads back what it loaded.
//!
//! ## Usage
//!
//! ```bash
//! swapi --config ./config/swapi.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `swapi init` | Create the SQLite database and schema |
//! | `swapi sync` | Fetch, resolve, normalize, and replace the stored catalog |
//! | `swapi search "<query>"` | Substring search across every resource |
//! | `swapi list <type>` | Page through one resource type |
//! | `swapi get <type> <id>` | Print one resource as JSON |
//! | `swapi stats` | Show per-type counts and the last sync |
//!
//! ## Examples
//!
//! ```bash
//! swapi init
//! swapi sync
//! swapi search tatooine --type people
//! swapi get films 1
//! ```

use std::collections::HashMap;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use swapi_search::{browse, config, ingest, logging, migrate, search, stats};
use swapi_search_core::ResourceType;

/// SWAPI Search: an ETL pipeline over the Star Wars API catalog with
/// keyword search on top.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/swapi.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "swapi",
    about = "SWAPI Search: ingest, link, and search the Star Wars API catalog",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/swapi.toml`. A missing file means built-in
    /// defaults plus environment overrides.
    #[arg(long, global = true, default_value = "./config/swapi.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Run the full pipeline and replace the stored catalog.
    ///
    /// Fetches every resource type from the configured source, resolves
    /// cross-references, and loads the result in one transaction. A failed
    /// run leaves the previous catalog in place.
    Sync,

    /// Search stored resources.
    Search {
        /// Case-insensitive substring to look for.
        query: String,

        /// Restrict results to one resource type.
        #[arg(long = "type")]
        resource_type: Option<ResourceType>,

        /// Maximum number of results.
        #[arg(long)]
        limit: Option<i64>,

        /// Number of results to skip.
        #[arg(long)]
        offset: Option<i64>,

        /// Print the result page as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List stored resources of one type, by id.
    List {
        resource_type: ResourceType,

        #[arg(long)]
        limit: Option<i64>,

        #[arg(long)]
        offset: Option<i64>,

        #[arg(long)]
        json: bool,
    },

    /// Print one stored resource as JSON.
    Get {
        resource_type: ResourceType,
        id: i64,
    },

    /// Show database statistics.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let env: HashMap<String, String> = std::env::vars().collect();
    let cfg = config::load_config(&cli.config, &env)?;
    logging::init(&cfg.logging)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Sync => {
            ingest::run_sync(&cfg).await?;
        }
        Commands::Search {
            query,
            resource_type,
            limit,
            offset,
            json,
        } => {
            search::run_search(&cfg, &query, resource_type, limit, offset, json).await?;
        }
        Commands::List {
            resource_type,
            limit,
            offset,
            json,
        } => {
            browse::run_list(&cfg, resource_type, limit, offset, json).await?;
        }
        Commands::Get { resource_type, id } => {
            browse::run_get(&cfg, resource_type, id).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
    }

    Ok(())
}
