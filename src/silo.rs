// ABOUTME: Silo modes and table classification for control/region splits
// ABOUTME: Builds deduplicated control and region table sets from silo metadata

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

/// Framework-owned tables that always belong to the region silo.
///
/// These tables carry no silo annotation of their own, so their placement
/// is fixed here.
pub const REGION_SEED_TABLES: &[&str] = &["django_migrations", "django_content_type"];

/// Framework-owned tables that always belong to the control silo.
pub const CONTROL_SEED_TABLES: &[&str] = &[
    "django_migrations",
    "django_admin_log",
    "django_content_type",
    "django_site",
    "django_session",
    "auth_user",
    "auth_group",
    "auth_permission",
    "auth_group_permissions",
    "auth_user_groups",
    "auth_user_user_permissions",
];

/// A deployment partition that owns a subset of the database tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiloMode {
    Control,
    Region,
}

impl SiloMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SiloMode::Control => "control",
            SiloMode::Region => "region",
        }
    }

    /// Framework tables this silo always receives
    pub fn seed_tables(&self) -> &'static [&'static str] {
        match self {
            SiloMode::Control => CONTROL_SEED_TABLES,
            SiloMode::Region => REGION_SEED_TABLES,
        }
    }
}

impl fmt::Display for SiloMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SiloMode {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "control" => Ok(SiloMode::Control),
            "region" => Ok(SiloMode::Region),
            other => bail!(
                "Unknown silo mode '{}'. Expected one of: control, region",
                other
            ),
        }
    }
}

/// Silo metadata recorded for one table
///
/// `modes` is `None` when the table has no silo assignment at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSiloInfo {
    pub table: String,
    pub modes: Option<BTreeSet<SiloMode>>,
}

impl TableSiloInfo {
    pub fn new(table: impl Into<String>, modes: &[SiloMode]) -> Self {
        Self {
            table: table.into(),
            modes: Some(modes.iter().copied().collect()),
        }
    }

    pub fn unassigned(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            modes: None,
        }
    }

    fn allows(&self, mode: SiloMode) -> bool {
        self.modes
            .as_ref()
            .map(|modes| modes.contains(&mode))
            .unwrap_or(false)
    }

    fn has_assignment(&self) -> bool {
        self.modes.as_ref().is_some_and(|modes| !modes.is_empty())
    }
}

/// Ordered table list that ignores repeated inserts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TableSet {
    tables: Vec<String>,
    #[serde(skip)]
    seen: HashSet<String>,
}

impl TableSet {
    pub fn seeded(seed: &[&str]) -> Self {
        let mut set = Self::default();
        for table in seed {
            set.insert(table);
        }
        set
    }

    /// Returns `false` when the table was already present
    pub fn insert(&mut self, table: &str) -> bool {
        if !self.seen.insert(table.to_string()) {
            return false;
        }
        self.tables.push(table.to_string());
        true
    }

    pub fn contains(&self, table: &str) -> bool {
        self.seen.contains(table)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.tables
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Result of classifying every known table
#[derive(Debug, Clone, Serialize)]
pub struct SiloTables {
    pub control: TableSet,
    pub region: TableSet,
    pub unassigned: Vec<String>,
}

impl SiloTables {
    pub fn tables_for(&self, mode: SiloMode) -> &TableSet {
        match mode {
            SiloMode::Control => &self.control,
            SiloMode::Region => &self.region,
        }
    }
}

/// Sort tables into control and region sets
///
/// Both sets start from the framework seed lists. Tables without a silo
/// assignment are reported and left out of both sets.
pub fn classify_tables(tables: &[TableSiloInfo]) -> SiloTables {
    let mut result = SiloTables {
        control: TableSet::seeded(SiloMode::Control.seed_tables()),
        region: TableSet::seeded(SiloMode::Region.seed_tables()),
        unassigned: Vec::new(),
    };

    for info in tables {
        if !info.has_assignment() {
            tracing::warn!("⚠ Could not find silo assignment for {}", info.table);
            result.unassigned.push(info.table.clone());
            continue;
        }
        if info.allows(SiloMode::Control) {
            result.control.insert(&info.table);
        }
        if info.allows(SiloMode::Region) {
            result.region.insert(&info.table);
        }
    }

    tracing::info!(
        "✓ Classified tables: {} control, {} region, {} without silo assignment",
        result.control.len(),
        result.region.len(),
        result.unassigned.len()
    );

    result
}
