// ABOUTME: Parses silo manifest files describing table silo assignments
// ABOUTME: Converts TOML format into TableSiloInfo records and region settings

use crate::silo::{SiloMode, TableSiloInfo};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct ManifestConfig {
    #[serde(default)]
    settings: SettingsConfig,
    #[serde(default)]
    tables: toml::Table,
}

#[derive(Debug, Deserialize, Default)]
struct SettingsConfig {
    monolith_region: Option<String>,
    #[serde(default)]
    regions: Vec<String>,
}

/// Parsed silo manifest
#[derive(Debug, Clone, Default)]
pub struct SiloManifest {
    pub monolith_region: Option<String>,
    pub regions: Vec<String>,
    /// Table records in manifest order
    pub tables: Vec<TableSiloInfo>,
}

pub fn load_manifest_from_file(path: &Path) -> Result<SiloManifest> {
    let raw = fs::read_to_string(path).with_context(|| {
        format!(
            "Failed to read silo manifest at {}.\n\
             Pass --manifest or set SILO_MANIFEST to point at the manifest file.",
            path.display()
        )
    })?;
    parse_manifest(&raw)
        .with_context(|| format!("Failed to parse silo manifest at {}", path.display()))
}

pub fn parse_manifest(raw: &str) -> Result<SiloManifest> {
    let parsed: ManifestConfig = toml::from_str(raw).context("Invalid TOML in silo manifest")?;

    let mut tables = Vec::with_capacity(parsed.tables.len());
    for (table, value) in parsed.tables {
        crate::utils::validate_table_name(&table)
            .with_context(|| format!("Invalid table name '{}' in manifest", table))?;
        let modes = parse_modes(&table, &value)?;
        tables.push(TableSiloInfo { table, modes });
    }

    Ok(SiloManifest {
        monolith_region: parsed.settings.monolith_region,
        regions: parsed.settings.regions,
        tables,
    })
}

/// Accepts `"control"`, `["control", "region"]`, or `[]`
fn parse_modes(table: &str, value: &toml::Value) -> Result<Option<BTreeSet<SiloMode>>> {
    let names: Vec<&str> = match value {
        toml::Value::String(mode) => vec![mode.as_str()],
        toml::Value::Array(items) => {
            let mut names = Vec::with_capacity(items.len());
            for item in items {
                match item.as_str() {
                    Some(name) => names.push(name),
                    None => bail!(
                        "Silo modes for table '{}' must be strings, got {}",
                        table,
                        item.type_str()
                    ),
                }
            }
            names
        }
        other => bail!(
            "Silo modes for table '{}' must be a string or an array of strings, got {}",
            table,
            other.type_str()
        ),
    };

    let mut modes = BTreeSet::new();
    for name in names {
        let mode = name
            .parse::<SiloMode>()
            .with_context(|| format!("Invalid silo mode for table '{}'", table))?;
        modes.insert(mode);
    }

    if modes.is_empty() {
        Ok(None)
    } else {
        Ok(Some(modes))
    }
}
