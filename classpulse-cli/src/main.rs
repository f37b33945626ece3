use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use config::{ConfigLoader, DEFAULT_CONFIG_PATH};

#[derive(Parser)]
#[command(name = "classpulse", about = "Classroom quiz telemetry and analytics")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the TOML config file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Consume queued quiz events into the store
    Consume(commands::consume::ConsumeArgs),
    /// Ingest quiz events from a JSON file
    Ingest(commands::ingest::IngestArgs),
    /// Run an ad-hoc analytics query against the cube
    Query(commands::query::QueryArgs),
    /// Compute a classroom report
    Report(commands::report::ReportArgs),
    /// Create the database schema
    InitDb,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let config = ConfigLoader::load(&cli.config)?;

    match cli.command {
        Commands::Consume(args) => commands::consume::run(args, config).await,
        Commands::Ingest(args) => commands::ingest::run(args, config).await,
        Commands::Query(args) => commands::query::run(args, config).await,
        Commands::Report(args) => commands::report::run(args, config).await,
        Commands::InitDb => commands::init_db(config).await,
    }
}
