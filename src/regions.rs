// ABOUTME: Region configuration checks run before the split starts
// ABOUTME: Ensures region names are well-formed and the monolith region is known

use anyhow::{bail, Result};
use std::collections::HashSet;

/// Region name used when no monolith region has been configured
pub const DEFAULT_MONOLITH_REGION: &str = "--monolith--";

/// Validate a single region name
///
/// Region names end up as values in `sentry_organizationmapping.region_name`,
/// so they must be non-empty, printable, and fit in the column.
pub fn validate_region_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        bail!("Region name cannot be empty or whitespace-only");
    }
    let length = name.chars().count();
    if length > 48 {
        bail!(
            "Region name '{}' exceeds maximum length of 48 characters (got {})",
            crate::utils::sanitize_identifier(name),
            length
        );
    }
    if name.chars().any(|c| c.is_control() || c.is_whitespace()) {
        bail!(
            "Region name '{}' must not contain whitespace or control characters",
            crate::utils::sanitize_identifier(name)
        );
    }
    Ok(())
}

/// Validate the configured regions against the monolith region
///
/// An empty region list means no region configuration was supplied, and
/// nothing is checked.
pub fn validate_regions(regions: &[String], monolith_region: &str) -> Result<()> {
    if regions.is_empty() {
        return Ok(());
    }

    let mut seen = HashSet::new();
    for region in regions {
        validate_region_name(region)?;
        if !seen.insert(region.as_str()) {
            bail!("Region '{}' is configured more than once", region);
        }
    }

    if !seen.contains(monolith_region) {
        bail!(
            "Monolith region '{}' is not one of the configured regions: {}\n\
             Set 'monolith_region' in the manifest (or SENTRY_MONOLITH_REGION) to a configured region.",
            monolith_region,
            regions.join(", ")
        );
    }

    Ok(())
}
