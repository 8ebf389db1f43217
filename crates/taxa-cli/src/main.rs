//! `taxa`: command-line tool for the Taxa taxonomy store.
//!
//! # Usage
//!
//! ```
//! taxa --database taxa.db init
//! taxa import-csv species.csv --delimiter ';'
//! taxa search --term panthera
//! taxa import-source gbif 5219404
//! taxa --config ~/.config/taxa/config.toml backup
//! ```

mod commands;
mod csv_io;
mod sources;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use commands::Command;
use serde::Deserialize;
use sources::SourceUrls;
use taxa_store_sqlite::SqliteStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "taxa", version, about = "Manage a hierarchical taxonomy database")]
#[command(arg_required_else_help = true)]
struct Args {
  /// Path to a TOML config file (database).
  #[arg(short, long, value_name = "FILE", global = true)]
  config: Option<PathBuf>,

  /// SQLite database file (default: taxa.db).
  #[arg(long, env = "TAXA_DATABASE", global = true)]
  database: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  database: Option<PathBuf>,
  /// Base URLs for `import-source` and `import-batch`.
  #[serde(default)]
  sources:  SourceUrls,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();

  // Load config file if provided.
  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let database = args
    .database
    .or(file_cfg.database)
    .unwrap_or_else(|| PathBuf::from("taxa.db"));

  let store = SqliteStore::open(&database)
    .await
    .with_context(|| format!("opening database {}", database.display()))?;

  let stdin = std::io::stdin();
  let stdout = std::io::stdout();
  commands::run(
    &store,
    &file_cfg.sources,
    args.command,
    &mut stdin.lock(),
    &mut stdout.lock(),
  )
  .await
}
