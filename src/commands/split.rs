// ABOUTME: Split command implementation for creating control and region databases
// ABOUTME: Classifies tables, rewrites mappings, then dumps and restores each silo

use crate::config::{self, SiloManifest};
use crate::executor::{DockerExecutor, ProcessExecutor};
use crate::migration::{
    revise_organization_mappings, MappingRevision, OrganizationMappingStore,
    PostgresMappingStore, SiloSplitter, SplitReport,
};
use crate::regions::{self, DEFAULT_MONOLITH_REGION};
use crate::registry::TableRegistry;
use crate::silo::{classify_tables, SiloMode, SiloTables};
use anyhow::{bail, Context, Result};
use dialoguer::Confirm;
use serde::Serialize;
use std::path::PathBuf;

/// Settings for one split run, as given on the command line
#[derive(Debug, Clone)]
pub struct SplitArgs {
    pub database: String,
    pub legacy_region_name: String,
    pub monolith_region: Option<String>,
    pub manifest: PathBuf,
    pub source_url: String,
    pub container: Option<String>,
    pub reset: bool,
    pub verbose: bool,
    pub yes: bool,
    pub report: Option<PathBuf>,
}

/// Inputs to the driver once configuration has been resolved
#[derive(Debug, Clone)]
pub struct SplitOptions {
    pub database: String,
    pub legacy_region_name: String,
    pub monolith_region: String,
    pub reset: bool,
    pub verbose: bool,
}

/// Summary of a full split
#[derive(Debug, Clone, Serialize)]
pub struct SplitRun {
    pub tables: SiloTables,
    pub mappings: MappingRevision,
    pub control: SplitReport,
    pub region: SplitReport,
}

impl SplitRun {
    pub fn is_success(&self) -> bool {
        self.control.is_success() && self.region.is_success()
    }
}

/// Split the monolith database into control and region databases
///
/// Runs the full workflow:
/// 1. Load the silo manifest and validate region settings
/// 2. Confirm the reset if destination databases will be dropped
/// 3. Locate the PostgreSQL container
/// 4. Classify tables, rewrite mappings, split control, split region
/// 5. Optionally write a JSON run report
///
/// The source database is only connected to when mappings actually need
/// rewriting. Failed container steps are logged and do not stop the run.
pub async fn split(args: SplitArgs) -> Result<()> {
    crate::utils::validate_postgres_identifier(&args.database)
        .with_context(|| format!("Invalid --database value '{}'", args.database))?;

    tracing::info!("Loading silo manifest from {}...", args.manifest.display());
    let manifest = config::load_manifest_from_file(&args.manifest)?;
    let monolith_region = resolve_monolith_region(args.monolith_region.as_deref(), &manifest);
    regions::validate_regions(&manifest.regions, &monolith_region)
        .context("Invalid region configuration")?;
    tracing::info!(
        "✓ Manifest loaded: {} table(s), monolith region '{}'",
        manifest.tables.len(),
        monolith_region
    );

    ensure_reset_confirmed(args.reset, args.yes, confirm_reset)?;

    let executor = DockerExecutor::new()?;
    let container = executor.resolve_container(args.container.as_deref())?;
    let splitter = SiloSplitter::new(executor, container);
    tracing::info!("✓ Using database container '{}'", splitter.container());

    let source_url = crate::utils::replace_database_in_url(&args.source_url, &args.database)
        .context("Failed to build source connection URL")?;
    let store = PostgresMappingStore::lazy(source_url);

    let options = SplitOptions {
        database: args.database,
        legacy_region_name: args.legacy_region_name,
        monolith_region,
        reset: args.reset,
        verbose: args.verbose,
    };
    let run = execute_split(&manifest, &store, &splitter, &options).await?;

    if let Some(path) = &args.report {
        crate::report::write_report(&run, path)?;
    }

    if run.is_success() {
        tracing::info!("✓ Split complete");
    } else {
        tracing::warn!("⚠ Split finished with failed steps; review the errors above");
    }

    Ok(())
}

/// Drive one split with injected collaborators
///
/// Order: classify tables, rewrite mappings, split control, split region.
/// Destination databases are always `control` and `region`.
///
/// # Arguments
///
/// * `registry` - Source of the per-table silo assignments
/// * `store` - Organization mapping table in the source database
/// * `splitter` - Runs the dump and restore steps in the database container
/// * `options` - Source database, region names and step flags
///
/// # Returns
///
/// A `SplitRun` with the classified table sets, the mapping revision and one
/// report per silo database. Failed container steps are recorded there and
/// never stop the run.
///
/// # Errors
///
/// Returns an error if the registry cannot be read, the mapping rewrite
/// fails, or the executor cannot run a command.
pub async fn execute_split<R, S, E>(
    registry: &R,
    store: &S,
    splitter: &SiloSplitter<E>,
    options: &SplitOptions,
) -> Result<SplitRun>
where
    R: TableRegistry + ?Sized,
    S: OrganizationMappingStore + ?Sized,
    E: ProcessExecutor,
{
    let known = registry
        .list_tables_with_silo_metadata()
        .context("Failed to list tables with silo metadata")?;
    let tables = classify_tables(&known);

    let mappings =
        revise_organization_mappings(store, &options.monolith_region, &options.legacy_region_name)
            .await?;

    let control = splitter.split_database(
        tables.control.as_slice(),
        &options.database,
        SiloMode::Control,
        options.reset,
        options.verbose,
    )?;
    let region = splitter.split_database(
        tables.region.as_slice(),
        &options.database,
        SiloMode::Region,
        options.reset,
        options.verbose,
    )?;

    Ok(SplitRun {
        tables,
        mappings,
        control,
        region,
    })
}

/// Flag value, then manifest setting, then the monolith default
fn resolve_monolith_region(flag: Option<&str>, manifest: &SiloManifest) -> String {
    flag.or(manifest.monolith_region.as_deref())
        .unwrap_or(DEFAULT_MONOLITH_REGION)
        .to_string()
}

/// Refuse to continue a `--reset` run the operator declined
///
/// `confirm` is only asked when `reset` is set and `yes` is not.
fn ensure_reset_confirmed<F>(reset: bool, yes: bool, confirm: F) -> Result<()>
where
    F: FnOnce() -> Result<bool>,
{
    if reset && !yes && !confirm()? {
        bail!("Split cancelled by user");
    }
    Ok(())
}

fn confirm_reset() -> Result<bool> {
    println!();
    println!("--reset will DROP and recreate these databases:");
    println!("  ✗ {}", SiloMode::Control);
    println!("  ✗ {}", SiloMode::Region);
    println!();

    Confirm::new()
        .with_prompt("Proceed with the split?")
        .default(false)
        .interact()
        .context("Failed to get confirmation")
}
