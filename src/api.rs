//! Data model and service seams for the function-version garbage collector.
//!
//! The run driver only talks to the Lambda service through [`LambdaApi`], builds region-scoped
//! clients through [`LambdaClientFactory`] and finds regions through [`RegionDiscovery`]. The
//! AWS SDK implementations live in [`crate::aws`].

use anyhow::Result;
use async_trait::async_trait;
use std::fmt;

/// Version label of the always-mutable alias that Lambda serves by default.
pub const LATEST: &str = "$LATEST";

/// An AWS region code, e.g. `us-east-1`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Region(String);

impl Region {
    pub fn new(region: impl Into<String>) -> Self {
        Self(region.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Region {
    fn from(region: &str) -> Self {
        Self::new(region)
    }
}

impl From<String> for Region {
    fn from(region: String) -> Self {
        Self(region)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDescriptor {
    pub name: String,
    pub arn: String,
    /// Label of the version currently served for this function. Never deleted.
    pub current_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionDescriptor {
    pub function_name: String,
    /// Version-qualified ARN, e.g. `arn:aws:lambda:us-east-1:123456789012:function:f1:3`.
    pub function_arn: String,
    pub version: String,
    pub code_size: u64,
}

/// One page of a listing, plus the marker to request the page after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_marker: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_marker: Option<String>) -> Self {
        Self { items, next_marker }
    }

    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, None)
    }
}

/// The Lambda operations the collector consumes.
#[async_trait]
pub trait LambdaApi: Send + Sync {
    async fn list_functions(&self, marker: Option<String>) -> Result<Page<FunctionDescriptor>>;

    /// Lists versions of `function_arn` oldest first, as the service returns them.
    async fn list_versions_by_function(
        &self,
        function_arn: &str,
        marker: Option<String>,
    ) -> Result<Page<VersionDescriptor>>;

    /// Irreversibly deletes the version identified by its qualified ARN.
    async fn delete_function_version(&self, qualified_arn: &str) -> Result<()>;
}

/// Builds a [`LambdaApi`] client scoped to one region.
#[async_trait]
pub trait LambdaClientFactory: Send + Sync {
    type Api: LambdaApi;

    async fn client_for(&self, region: &Region) -> Self::Api;
}

/// Lists every region in which the Lambda service is available.
#[async_trait]
pub trait RegionDiscovery: Send + Sync {
    async fn lambda_regions(&self) -> Result<Vec<Region>>;
}
