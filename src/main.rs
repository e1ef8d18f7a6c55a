// ABOUTME: CLI entry point for postgres-silo-splitter
// ABOUTME: Parses flags and runs the split command

use clap::Parser;
use postgres_silo_splitter::commands;
use postgres_silo_splitter::postgres::DEFAULT_SOURCE_URL;
use postgres_silo_splitter::regions::DEFAULT_MONOLITH_REGION;
use std::path::PathBuf;

/// Convert a monolith database into control + region databases using silo
/// annotations. Intended for development environments.
#[derive(Parser)]
#[command(name = "postgres-silo-splitter")]
#[command(about = "Split a monolith PostgreSQL database into control and region silos", long_about = None)]
struct Cli {
    /// Region name that existing organization mappings use
    #[arg(long, default_value = DEFAULT_MONOLITH_REGION, allow_hyphen_values = true)]
    legacy_region_name: String,
    /// Echo each command and its output
    #[arg(long)]
    verbose: bool,
    /// Drop and recreate the control and region databases
    #[arg(long)]
    reset: bool,
    /// Source database to split
    #[arg(long, default_value = "sentry")]
    database: String,
    /// Silo manifest listing table assignments
    #[arg(long, env = "SILO_MANIFEST", default_value = "silo-manifest.toml")]
    manifest: PathBuf,
    /// Region that organization mappings are moved to (overrides the manifest)
    #[arg(long, env = "SENTRY_MONOLITH_REGION", allow_hyphen_values = true)]
    monolith_region: Option<String>,
    /// Connection used to rewrite organization mappings
    #[arg(long, env = "SILO_SOURCE_URL", default_value = DEFAULT_SOURCE_URL)]
    source_url: String,
    /// PostgreSQL container to run commands in
    #[arg(long)]
    container: Option<String>,
    /// Skip confirmation prompt
    #[arg(short = 'y', long)]
    yes: bool,
    /// Write a JSON report of the run to this path
    #[arg(long)]
    report: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Default to INFO (DEBUG with --verbose) if RUST_LOG not set
    let default_level = if cli.verbose {
        "info,postgres_silo_splitter=debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    commands::split(commands::SplitArgs {
        database: cli.database,
        legacy_region_name: cli.legacy_region_name,
        monolith_region: cli.monolith_region,
        manifest: cli.manifest,
        source_url: cli.source_url,
        container: cli.container,
        reset: cli.reset,
        verbose: cli.verbose,
        yes: cli.yes,
        report: cli.report,
    })
    .await
}
