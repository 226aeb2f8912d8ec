use anyhow::{Context, Result};
use chrono::Utc;
use log::{LevelFilter, debug, info, trace, warn};
use std::time::Instant;

pub mod api;
pub mod aws;
pub mod pagination;
pub mod regions;
pub mod tally;
pub mod window;

#[cfg(test)]
mod testing;

pub use api::{
    FunctionDescriptor, LATEST, LambdaApi, LambdaClientFactory, Page, Region, RegionDiscovery,
    VersionDescriptor,
};
pub use aws::{AwsClientFactory, AwsLambda, CredentialSource, SsmRegionDiscovery};
pub use tally::{RunSummary, RunTally};
pub use window::RetentionWindow;

use pagination::{FunctionLister, VersionLister};
use regions::enumerate_regions;

pub const APP_NAME: &str = "lambda_version_gc";

#[derive(Debug, Clone)]
pub struct Config {
    /// Regions to scan; `None` scans every region that offers Lambda.
    pub regions: Option<Vec<Region>>,
    /// Newest eligible versions to keep per function, besides the current one and `$LATEST`.
    pub num_to_keep: usize,
    /// Only functions named here are processed; `None` processes all of them.
    pub function_names: Option<Vec<String>>,
    pub dry_run: bool,
    pub credentials: CredentialSource,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            regions: None,
            num_to_keep: 2,
            function_names: None,
            dry_run: false,
            credentials: CredentialSource::Ambient,
        }
    }
}

impl Config {
    fn should_process(&self, function_name: &str) -> bool {
        self.function_names
            .as_ref()
            .is_none_or(|names| names.iter().any(|name| name == function_name))
    }
}

pub fn set_up_logger(calling_module: &'static str, verbose: bool) -> Result<()> {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{}] [{}] {}",
                Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(LevelFilter::Warn)
        .level_for(APP_NAME, level)
        .level_for(calling_module, level)
        .chain(std::io::stdout())
        .apply()?;

    Ok(())
}

/// Deletes, or logs under dry-run, one version that fell out of its function's retention window.
///
/// A failed delete is logged and counted but never returned: the remaining versions and functions
/// are still processed. The version is tallied either way.
async fn delete_version<A: LambdaApi + ?Sized>(
    client: &A,
    version: &VersionDescriptor,
    dry_run: bool,
    tally: &mut RunTally,
) {
    info!(
        "{} {} version {}",
        if dry_run {
            "Deleting (Dry-Run)"
        } else {
            "Deleting"
        },
        version.function_name,
        version.version
    );

    tally.record_deletion(version);

    if dry_run {
        return;
    }

    if let Err(e) = client.delete_function_version(&version.function_arn).await {
        warn!("Could not delete function version: {e:#}");
        tally.record_failed_delete();
    }
}

async fn gc_function<A: LambdaApi + ?Sized>(
    client: &A,
    function: &FunctionDescriptor,
    config: &Config,
    tally: &mut RunTally,
) -> Result<()> {
    info!("Cleaning up {}", function.name);
    debug!(
        "Keeping {} newest version(s) of {} besides {} and {LATEST}",
        config.num_to_keep, function.name, function.current_version
    );

    let mut window = RetentionWindow::for_function(config.num_to_keep, function);
    let mut versions = VersionLister::new(client, function);
    let mut version_ct = 0;

    while let Some(version) = versions.next().await? {
        version_ct += 1;

        if window.is_protected(&version.version) {
            trace!("Keeping {} version {} (live)", function.name, version.version);
            continue;
        }

        if let Some(evicted) = window.offer(version) {
            delete_version(client, &evicted, config.dry_run, tally).await;
        }
    }

    debug!(
        "Kept {}/{version_ct} version(s) of {}: {:?}",
        window.len(),
        function.name,
        window.retained().map(|v| v.version.as_str()).collect::<Vec<_>>()
    );

    Ok(())
}

async fn gc_region<A: LambdaApi + ?Sized>(
    client: &A,
    region: &Region,
    config: &Config,
    tally: &mut RunTally,
) -> Result<()> {
    let mut functions = FunctionLister::new(client);
    let mut function_ct = 0;

    while let Some(function) = functions
        .next()
        .await
        .with_context(|| format!("Failed to list functions in {}", region))?
    {
        if !config.should_process(&function.name) {
            trace!("Skipping {} (not in the function allow-list)", function.name);
            continue;
        }

        function_ct += 1;
        if let Err(e) = gc_function(client, &function, config, tally).await {
            warn!("Failed to process function {}: {e:#}", function.name);
        }
    }

    debug!("Processed {function_ct} function(s) in {region}");
    Ok(())
}

/// Scans every configured region and deletes the versions that fall outside each function's
/// retention window.
///
/// Only region discovery can fail the run. A region whose functions cannot be listed, a function
/// whose versions cannot be listed and a version that cannot be deleted are each logged and
/// skipped.
pub async fn run<F, D>(config: &Config, factory: &F, discovery: &D) -> Result<RunSummary>
where
    F: LambdaClientFactory + ?Sized,
    D: RegionDiscovery + ?Sized,
{
    let start_time = Instant::now();
    let regions = enumerate_regions(config.regions.as_deref(), discovery).await?;

    if regions.is_empty() {
        info!("No regions to scan");
    }

    let mut tally = RunTally::new();

    for region in &regions {
        info!("Scanning {region} region");

        let client = factory.client_for(region).await;
        if let Err(e) = gc_region(&client, region, config, &mut tally).await {
            warn!("Failed to process region {region}: {e:#}");
        }
    }

    let summary = tally.summary(config.dry_run);
    for line in summary.to_string().lines() {
        info!("{line}");
    }
    debug!(
        "Scanned {} region(s) in {:.2}s",
        regions.len(),
        start_time.elapsed().as_secs_f64()
    );

    Ok(summary)
}

/// Runs with the default configuration: every region, keep 2, all functions, ambient credentials.
pub async fn gc_function_versions(dry_run: bool) -> Result<RunSummary> {
    let config = Config {
        dry_run,
        ..Config::default()
    };
    gc_function_versions_with_config(&config).await
}

pub async fn gc_function_versions_with_config(config: &Config) -> Result<RunSummary> {
    let factory = AwsClientFactory::new(config.credentials.clone());
    let discovery = SsmRegionDiscovery::new(config.credentials.clone());

    run(config, &factory, &discovery).await
}
