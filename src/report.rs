// ABOUTME: JSON run report for a completed split
// ABOUTME: Persists the report atomically next to its final path

use crate::commands::SplitRun;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

pub fn write_report(run: &SplitRun, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create report directory {}", parent.display()))?;
    }

    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temp report in {}", parent.display()))?;

    serde_json::to_writer_pretty(tmp.as_file_mut(), run)
        .with_context(|| format!("Failed to serialize report for {}", path.display()))?;

    tmp.persist(path)
        .with_context(|| format!("Failed to persist report at {}", path.display()))?;

    tracing::info!("✓ Run report written to {}", path.display());
    Ok(())
}
