// ABOUTME: Source of table silo metadata consumed once at startup
// ABOUTME: Provides the TableRegistry trait for manifests and in-memory lists

use crate::config::SiloManifest;
use crate::silo::TableSiloInfo;
use anyhow::Result;

/// Enumerates every known table together with its silo metadata
pub trait TableRegistry {
    fn list_tables_with_silo_metadata(&self) -> Result<Vec<TableSiloInfo>>;
}

impl TableRegistry for Vec<TableSiloInfo> {
    fn list_tables_with_silo_metadata(&self) -> Result<Vec<TableSiloInfo>> {
        Ok(self.clone())
    }
}

impl TableRegistry for SiloManifest {
    fn list_tables_with_silo_metadata(&self) -> Result<Vec<TableSiloInfo>> {
        Ok(self.tables.clone())
    }
}
