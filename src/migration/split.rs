// ABOUTME: Dumps silo tables from the monolith and restores them into a silo database
// ABOUTME: Runs pg_dump/psql inside the database container on a best-effort basis

use crate::executor::{ExecOutput, ProcessExecutor};
use crate::silo::{SiloMode, TableSet};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt;

/// Role every command connects as inside the container
pub const POSTGRES_USER: &str = "postgres";

/// One command issued while splitting a database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitStep {
    Dump,
    DropDatabase,
    CreateDatabase,
    EnsureCitext,
    Restore,
}

impl fmt::Display for SplitStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SplitStep::Dump => "pg_dump",
            SplitStep::DropDatabase => "dropdb",
            SplitStep::CreateDatabase => "createdb",
            SplitStep::EnsureCitext => "citext extension",
            SplitStep::Restore => "restore",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    pub step: SplitStep,
    pub command: String,
    pub exit_code: i32,
    pub output: String,
}

impl StepResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Everything that happened while splitting one silo database
#[derive(Debug, Clone, Serialize)]
pub struct SplitReport {
    pub source: String,
    pub destination: SiloMode,
    pub tables: Vec<String>,
    pub steps: Vec<StepResult>,
}

impl SplitReport {
    pub fn failed_steps(&self) -> impl Iterator<Item = &StepResult> {
        self.steps.iter().filter(|step| !step.success())
    }

    pub fn is_success(&self) -> bool {
        self.failed_steps().next().is_none()
    }

    pub fn step(&self, step: SplitStep) -> Option<&StepResult> {
        self.steps.iter().find(|result| result.step == step)
    }
}

/// Path of the dump file inside the container
pub fn dump_file_path(destination: SiloMode) -> String {
    format!("/tmp/{}-tables.sql", destination.as_str())
}

/// Tables dumped for a destination: its framework seed tables followed by
/// the given tables, without repeats
pub fn dump_tables(tables: &[String], destination: SiloMode) -> Vec<String> {
    let mut set = TableSet::seeded(destination.seed_tables());
    for table in tables {
        set.insert(table);
    }
    set.as_slice().to_vec()
}

pub fn build_dump_command(tables: &[String], source: &str, destination: SiloMode) -> String {
    let mut command = format!("pg_dump -U {} -d {} --clean", POSTGRES_USER, source);
    for table in tables {
        command.push_str(" -t ");
        command.push_str(table);
    }
    command.push_str(" > ");
    command.push_str(&dump_file_path(destination));
    command
}

pub fn build_drop_command(destination: SiloMode) -> String {
    format!("dropdb -U {} --if-exists {}", POSTGRES_USER, destination)
}

pub fn build_create_command(destination: SiloMode) -> String {
    format!("createdb -U {} {}", POSTGRES_USER, destination)
}

pub fn build_citext_command(destination: SiloMode) -> String {
    format!(
        "psql -U {} {} -c \"CREATE EXTENSION IF NOT EXISTS citext\"",
        POSTGRES_USER, destination
    )
}

pub fn build_restore_command(destination: SiloMode) -> String {
    format!(
        "psql -U {} {} < {}",
        POSTGRES_USER,
        destination,
        dump_file_path(destination)
    )
}

/// Runs split steps against one database container
pub struct SiloSplitter<E> {
    executor: E,
    container: String,
}

impl<E: ProcessExecutor> SiloSplitter<E> {
    pub fn new(executor: E, container: impl Into<String>) -> Self {
        Self {
            executor,
            container: container.into(),
        }
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    /// Copy `tables` from `source` into the `destination` silo database
    ///
    /// Steps run in order: dump, optional drop/create, citext, restore. A
    /// step that exits non-zero is logged together with its output and the
    /// remaining steps still run. Nothing is retried or rolled back.
    ///
    /// # Arguments
    ///
    /// * `tables` - Tables to copy; the destination's framework tables are added
    /// * `source` - Name of the monolith database to dump from
    /// * `destination` - Silo database to build
    /// * `reset` - Drop and recreate the destination before restoring
    /// * `verbose` - Echo each command and its output at info level
    ///
    /// # Returns
    ///
    /// A `SplitReport` with every step's command, exit code and output.
    ///
    /// # Errors
    ///
    /// Returns an error if `source` or a table name is not a valid
    /// lowercase identifier, or if the executor cannot run a command at all.
    /// A step that merely exits non-zero is not an error.
    pub fn split_database(
        &self,
        tables: &[String],
        source: &str,
        destination: SiloMode,
        reset: bool,
        verbose: bool,
    ) -> Result<SplitReport> {
        crate::utils::validate_postgres_identifier(source)
            .with_context(|| format!("Invalid source database name '{}'", source))?;
        let tables = dump_tables(tables, destination);
        for table in &tables {
            crate::utils::validate_table_name(table)
                .with_context(|| format!("Invalid table name '{}'", table))?;
        }

        let mut report = SplitReport {
            source: source.to_string(),
            destination,
            tables,
            steps: Vec::new(),
        };

        tracing::info!(">> Dumping tables from {} database", source);
        let dump = build_dump_command(&report.tables, source, destination);
        report
            .steps
            .push(self.run_step(SplitStep::Dump, dump, verbose)?);

        if reset {
            tracing::info!(">> Dropping existing {} database", destination);
            report.steps.push(self.run_step(
                SplitStep::DropDatabase,
                build_drop_command(destination),
                verbose,
            )?);
            report.steps.push(self.run_step(
                SplitStep::CreateDatabase,
                build_create_command(destination),
                verbose,
            )?);
        }

        report.steps.push(self.run_step(
            SplitStep::EnsureCitext,
            build_citext_command(destination),
            verbose,
        )?);

        tracing::info!(">> Building {} database from dump file", destination);
        report.steps.push(self.run_step(
            SplitStep::Restore,
            build_restore_command(destination),
            verbose,
        )?);

        if report.is_success() {
            tracing::info!(
                "✓ {} database built from {} table(s)",
                destination,
                report.tables.len()
            );
        } else {
            tracing::warn!(
                "⚠ {} database finished with {} failed step(s)",
                destination,
                report.failed_steps().count()
            );
        }

        Ok(report)
    }

    fn run_step(&self, step: SplitStep, command: String, verbose: bool) -> Result<StepResult> {
        if verbose {
            tracing::info!(">> Running {}", command);
        } else {
            tracing::debug!("Running {}", command);
        }

        let ExecOutput { exit_code, output } = self
            .executor
            .run(&self.container, &command)
            .with_context(|| {
                format!(
                    "Failed to run {} in container '{}'.\n\
                     Is the container still running?",
                    step, self.container
                )
            })?;

        if exit_code != 0 {
            tracing::error!("✗ {} failed with exit code {}", step, exit_code);
            if !output.trim().is_empty() {
                tracing::error!("{}", output.trim_end());
            }
        } else if verbose && !output.trim().is_empty() {
            tracing::info!("{}", output.trim_end());
        }

        Ok(StepResult {
            step,
            command,
            exit_code,
            output,
        })
    }
}
