//! In-memory stand-ins for the Lambda and region discovery services.

use crate::api::{
    FunctionDescriptor, LambdaApi, LambdaClientFactory, Page, Region, RegionDiscovery,
    VersionDescriptor,
};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

const ARN_PREFIX: &str = "arn:aws:lambda:us-east-1:123456789012:function:";

pub fn function(name: &str, current_version: &str) -> FunctionDescriptor {
    FunctionDescriptor {
        name: name.to_string(),
        arn: format!("{ARN_PREFIX}{name}"),
        current_version: current_version.to_string(),
    }
}

pub fn version(function_name: &str, version: &str, code_size: u64) -> VersionDescriptor {
    VersionDescriptor {
        function_name: function_name.to_string(),
        function_arn: format!("{ARN_PREFIX}{function_name}:{version}"),
        version: version.to_string(),
        code_size,
    }
}

pub const MB: u64 = 1024 * 1024;

fn page_at<T: Clone>(pages: &[Vec<T>], marker: Option<String>) -> Result<Page<T>> {
    let idx = match marker {
        None => 0,
        Some(marker) => marker
            .strip_prefix("page-")
            .and_then(|idx| idx.parse::<usize>().ok())
            .ok_or_else(|| anyhow!("InvalidParameterValueException: bad marker {marker}"))?,
    };

    let items = pages.get(idx).cloned().unwrap_or_default();
    let next_marker = (idx + 1 < pages.len()).then(|| format!("page-{}", idx + 1));
    Ok(Page::new(items, next_marker))
}

/// Cloning shares the recorded calls, so a factory can hand out copies and the test can still
/// inspect what was requested.
#[derive(Clone, Default)]
pub struct FakeLambda {
    function_pages: Vec<Vec<FunctionDescriptor>>,
    version_pages: HashMap<String, Vec<Vec<VersionDescriptor>>>,
    fail_list_functions: bool,
    fail_list_versions: HashSet<String>,
    fail_deletes: HashSet<String>,
    version_listings: Arc<Mutex<Vec<String>>>,
    deletes: Arc<Mutex<Vec<String>>>,
}

impl FakeLambda {
    pub fn with_function_pages(mut self, pages: Vec<Vec<FunctionDescriptor>>) -> Self {
        self.function_pages = pages;
        self
    }

    pub fn with_versions(self, function_name: &str, versions: Vec<VersionDescriptor>) -> Self {
        self.with_version_pages(function_name, vec![versions])
    }

    pub fn with_version_pages(
        mut self,
        function_name: &str,
        pages: Vec<Vec<VersionDescriptor>>,
    ) -> Self {
        self.version_pages.insert(function_name.to_string(), pages);
        self
    }

    pub fn failing_list_functions(mut self) -> Self {
        self.fail_list_functions = true;
        self
    }

    pub fn failing_list_versions(mut self, function_name: &str) -> Self {
        self.fail_list_versions.insert(function_name.to_string());
        self
    }

    pub fn failing_delete(mut self, function_name: &str, version: &str) -> Self {
        self.fail_deletes
            .insert(format!("{ARN_PREFIX}{function_name}:{version}"));
        self
    }

    /// Qualified ARNs passed to the delete call, in call order.
    pub fn deleted(&self) -> Vec<String> {
        self.deletes.lock().unwrap().clone()
    }

    /// Function names whose versions were listed, in call order.
    pub fn version_listings(&self) -> Vec<String> {
        let mut listed = self.version_listings.lock().unwrap().clone();
        listed.dedup();
        listed
    }
}

#[async_trait]
impl LambdaApi for FakeLambda {
    async fn list_functions(&self, marker: Option<String>) -> Result<Page<FunctionDescriptor>> {
        if self.fail_list_functions {
            return Err(anyhow!("AccessDeniedException: not authorized to list functions"));
        }
        page_at(&self.function_pages, marker)
    }

    async fn list_versions_by_function(
        &self,
        function_arn: &str,
        marker: Option<String>,
    ) -> Result<Page<VersionDescriptor>> {
        let name = function_arn.rsplit(':').next().unwrap_or(function_arn);
        self.version_listings.lock().unwrap().push(name.to_string());

        if self.fail_list_versions.contains(name) {
            return Err(anyhow!("ServiceException: failed to list versions of {name}"));
        }

        match self.version_pages.get(name) {
            Some(pages) => page_at(pages, marker),
            None => Ok(Page::last(Vec::new())),
        }
    }

    async fn delete_function_version(&self, qualified_arn: &str) -> Result<()> {
        self.deletes.lock().unwrap().push(qualified_arn.to_string());

        if self.fail_deletes.contains(qualified_arn) {
            return Err(anyhow!("ResourceConflictException: {qualified_arn} is in use"));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeFactory {
    regions: HashMap<Region, FakeLambda>,
}

impl FakeFactory {
    pub fn with_region(mut self, region: &str, lambda: FakeLambda) -> Self {
        self.regions.insert(Region::from(region), lambda);
        self
    }

    pub fn lambda(&self, region: &str) -> FakeLambda {
        self.regions
            .get(&Region::from(region))
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl LambdaClientFactory for FakeFactory {
    type Api = FakeLambda;

    async fn client_for(&self, region: &Region) -> FakeLambda {
        self.regions.get(region).cloned().unwrap_or_default()
    }
}

pub struct FakeDiscovery(pub Result<Vec<&'static str>, &'static str>);

#[async_trait]
impl RegionDiscovery for FakeDiscovery {
    async fn lambda_regions(&self) -> Result<Vec<Region>> {
        match &self.0 {
            Ok(regions) => Ok(regions.iter().copied().map(Region::from).collect()),
            Err(message) => Err(anyhow!("{message}")),
        }
    }
}
