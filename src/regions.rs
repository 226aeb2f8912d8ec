use crate::api::{Region, RegionDiscovery};
use anyhow::{Context, Result};
use log::{debug, info};

/// Returns the regions to scan: `explicit` verbatim when given, otherwise every region that
/// reports Lambda support. Discovery errors are returned to the caller.
pub async fn enumerate_regions(
    explicit: Option<&[Region]>,
    discovery: &(impl RegionDiscovery + ?Sized),
) -> Result<Vec<Region>> {
    if let Some(regions) = explicit.filter(|regions| !regions.is_empty()) {
        debug!("Using {} configured region(s)", regions.len());
        return Ok(regions.to_vec());
    }

    let regions = discovery
        .lambda_regions()
        .await
        .context("Failed to discover Lambda regions")?;
    info!("Discovered {} Lambda region(s)", regions.len());

    Ok(regions)
}
