// ABOUTME: Rewrites organization mappings from a legacy region to the monolith region
// ABOUTME: Defines the mapping store seam and its PostgreSQL implementation

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::OnceCell;
use tokio_postgres::Client;

/// Table holding organization to region assignments
pub const ORGANIZATION_MAPPING_TABLE: &str = "sentry_organizationmapping";

/// Storage for organization mapping records
#[async_trait]
pub trait OrganizationMappingStore: Send + Sync {
    /// Move every mapping in region `from` to region `to`, returning how
    /// many records changed
    async fn reassign_region(&self, from: &str, to: &str) -> Result<u64>;
}

/// Outcome of a mapping revision
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MappingRevision {
    Unchanged,
    Updated { count: u64, from: String, to: String },
}

impl MappingRevision {
    pub fn count(&self) -> u64 {
        match self {
            MappingRevision::Unchanged => 0,
            MappingRevision::Updated { count, .. } => *count,
        }
    }
}

/// Rewrite mappings that still point at `legacy_region_name`
///
/// Does nothing when the monolith region already carries the legacy name.
/// In that case the store is never touched.
///
/// # Arguments
///
/// * `store` - Mapping table to update
/// * `monolith_region` - Region name the mappings should carry afterwards
/// * `legacy_region_name` - Region name the existing mappings were created with
///
/// # Returns
///
/// `MappingRevision::Unchanged` for the no-op case, otherwise
/// `MappingRevision::Updated` with the number of records rewritten.
///
/// # Errors
///
/// Returns an error if the store cannot connect or the update fails.
pub async fn revise_organization_mappings<S>(
    store: &S,
    monolith_region: &str,
    legacy_region_name: &str,
) -> Result<MappingRevision>
where
    S: OrganizationMappingStore + ?Sized,
{
    if monolith_region == legacy_region_name {
        tracing::info!(
            "> No organization mappings have been modified. Set 'monolith_region' in the \
             manifest (or SENTRY_MONOLITH_REGION) to update monolith mappings."
        );
        return Ok(MappingRevision::Unchanged);
    }

    let count = store
        .reassign_region(legacy_region_name, monolith_region)
        .await
        .with_context(|| {
            format!(
                "Failed to update organization mappings from '{}' to '{}'",
                legacy_region_name, monolith_region
            )
        })?;

    tracing::info!(
        "> {} organization mapping record(s) have been updated from '{}' to '{}'",
        count,
        legacy_region_name,
        monolith_region
    );

    Ok(MappingRevision::Updated {
        count,
        from: legacy_region_name.to_string(),
        to: monolith_region.to_string(),
    })
}

/// Mapping store backed by the source database
///
/// The connection is opened on the first rewrite, so a run that leaves the
/// mappings alone never needs the source database to be reachable.
pub struct PostgresMappingStore {
    connection_string: String,
    client: OnceCell<Client>,
}

impl PostgresMappingStore {
    pub fn new(client: Client) -> Self {
        Self {
            connection_string: String::new(),
            client: OnceCell::new_with(Some(client)),
        }
    }

    /// Store that connects to `connection_string` when first used
    pub fn lazy(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            client: OnceCell::new(),
        }
    }

    /// Connect to the source database right away
    pub async fn connect(connection_string: &str) -> Result<Self> {
        let store = Self::lazy(connection_string);
        store.client().await?;
        Ok(store)
    }

    pub fn is_connected(&self) -> bool {
        self.client.initialized()
    }

    async fn client(&self) -> Result<&Client> {
        self.client
            .get_or_try_init(|| async {
                tracing::info!("Connecting to source database for organization mapping update...");
                let client = crate::postgres::connect_with_retry(&self.connection_string)
                    .await
                    .context(
                        "Failed to connect to source database for organization mapping update",
                    )?;
                tracing::info!("✓ Connected to source");
                Ok(client)
            })
            .await
    }
}

#[async_trait]
impl OrganizationMappingStore for PostgresMappingStore {
    async fn reassign_region(&self, from: &str, to: &str) -> Result<u64> {
        let query = format!(
            "UPDATE {} SET region_name = $1 WHERE region_name = $2",
            ORGANIZATION_MAPPING_TABLE
        );
        let updated = self
            .client()
            .await?
            .execute(&query, &[&to, &from])
            .await
            .with_context(|| format!("Failed to update {}", ORGANIZATION_MAPPING_TABLE))?;
        Ok(updated)
    }
}
