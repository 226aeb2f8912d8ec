//! AWS SDK backed implementations of the service seams.

use crate::APP_NAME;
use crate::api::{
    FunctionDescriptor, LambdaApi, LambdaClientFactory, Page, Region, RegionDiscovery,
    VersionDescriptor,
};
use crate::pagination::PageCursor;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::retry::RetryConfig;
use aws_config::{ConfigLoader, Region as AwsRegion, SdkConfig};
use aws_credential_types::Credentials;
use aws_sdk_lambda::operation::list_functions::ListFunctionsOutput;
use aws_sdk_lambda::operation::list_versions_by_function::ListVersionsByFunctionOutput;
use aws_sdk_lambda::types::FunctionConfiguration;
use log::{debug, trace};

/// Public SSM parameter path listing every region that offers Lambda.
const LAMBDA_REGIONS_PARAMETER_PATH: &str =
    "/aws/service/global-infrastructure/services/lambda/regions";

/// Region used to query SSM when none is configured in the environment.
const FALLBACK_DISCOVERY_REGION: &str = "us-east-1";

/// Where the SDK gets its credentials from, in priority order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CredentialSource {
    KeyPair {
        access_key_id: String,
        secret_access_key: String,
    },
    Profile(String),
    #[default]
    Ambient,
}

impl CredentialSource {
    /// An explicit key pair wins over a profile, which wins over the ambient default chain.
    pub fn resolve(
        token_key_id: Option<String>,
        token_secret: Option<String>,
        profile: Option<String>,
    ) -> Self {
        match (token_key_id, token_secret, profile) {
            (Some(access_key_id), Some(secret_access_key), _) => Self::KeyPair {
                access_key_id,
                secret_access_key,
            },
            (_, _, Some(profile)) => Self::Profile(profile),
            _ => Self::Ambient,
        }
    }
}

/// Loads an SDK config using `credentials`, scoped to `region` when one is given.
pub async fn load_sdk_config(credentials: &CredentialSource, region: Option<&Region>) -> SdkConfig {
    let mut loader = ConfigLoader::default().retry_config(RetryConfig::standard());

    loader = match region {
        Some(region) => loader.region(AwsRegion::new(region.as_str().to_string())),
        None => loader.region(
            RegionProviderChain::default_provider().or_else(FALLBACK_DISCOVERY_REGION),
        ),
    };

    loader = match credentials {
        CredentialSource::KeyPair {
            access_key_id,
            secret_access_key,
        } => loader.credentials_provider(Credentials::new(
            access_key_id.clone(),
            secret_access_key.clone(),
            None,
            None,
            APP_NAME,
        )),
        CredentialSource::Profile(profile) => loader.profile_name(profile),
        CredentialSource::Ambient => loader,
    };

    loader.load().await
}

impl TryFrom<FunctionConfiguration> for FunctionDescriptor {
    type Error = anyhow::Error;

    fn try_from(function: FunctionConfiguration) -> Result<Self> {
        let name = function
            .function_name
            .ok_or_else(|| anyhow!("Function is missing a name"))?;
        let arn = function
            .function_arn
            .ok_or_else(|| anyhow!("Function {} is missing an ARN", name))?;
        let current_version = function
            .version
            .ok_or_else(|| anyhow!("Function {} is missing a version", name))?;

        Ok(Self {
            name,
            arn,
            current_version,
        })
    }
}

impl TryFrom<FunctionConfiguration> for VersionDescriptor {
    type Error = anyhow::Error;

    fn try_from(version: FunctionConfiguration) -> Result<Self> {
        let function_name = version
            .function_name
            .ok_or_else(|| anyhow!("Function version is missing a function name"))?;
        let function_arn = version
            .function_arn
            .ok_or_else(|| anyhow!("Version of {} is missing an ARN", function_name))?;
        let label = version
            .version
            .ok_or_else(|| anyhow!("Version {} is missing a version label", function_arn))?;

        Ok(Self {
            function_name,
            function_arn,
            version: label,
            code_size: u64::try_from(version.code_size).unwrap_or_default(),
        })
    }
}

/// A malformed entry fails the whole page.
fn functions_page(output: ListFunctionsOutput) -> Result<Page<FunctionDescriptor>> {
    let functions = output
        .functions
        .unwrap_or_default()
        .into_iter()
        .map(FunctionDescriptor::try_from)
        .collect::<Result<Vec<_>>>()?;

    Ok(Page::new(functions, output.next_marker))
}

fn versions_page(output: ListVersionsByFunctionOutput) -> Result<Page<VersionDescriptor>> {
    let versions = output
        .versions
        .unwrap_or_default()
        .into_iter()
        .map(VersionDescriptor::try_from)
        .collect::<Result<Vec<_>>>()?;

    Ok(Page::new(versions, output.next_marker))
}

/// [`LambdaApi`] over the AWS SDK Lambda client.
#[derive(Debug, Clone)]
pub struct AwsLambda {
    client: aws_sdk_lambda::Client,
}

impl AwsLambda {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_lambda::Client::new(config),
        }
    }
}

#[async_trait]
impl LambdaApi for AwsLambda {
    async fn list_functions(&self, marker: Option<String>) -> Result<Page<FunctionDescriptor>> {
        let output = self
            .client
            .list_functions()
            .set_marker(marker)
            .send()
            .await
            .context("Failed to list functions")?;
        debug!("Listed functions");

        functions_page(output)
    }

    async fn list_versions_by_function(
        &self,
        function_arn: &str,
        marker: Option<String>,
    ) -> Result<Page<VersionDescriptor>> {
        let output = self
            .client
            .list_versions_by_function()
            .function_name(function_arn)
            .set_marker(marker)
            .send()
            .await
            .with_context(|| format!("Failed to list versions of function: {}", function_arn))?;
        debug!("Listed versions of {function_arn}");

        versions_page(output)
    }

    async fn delete_function_version(&self, qualified_arn: &str) -> Result<()> {
        self.client
            .delete_function()
            .function_name(qualified_arn)
            .send()
            .await
            .with_context(|| format!("Failed to delete function version: {}", qualified_arn))?;
        debug!("Deleted {qualified_arn}");

        Ok(())
    }
}

/// Builds region-scoped [`AwsLambda`] clients from one credential source.
#[derive(Debug, Clone, Default)]
pub struct AwsClientFactory {
    credentials: CredentialSource,
}

impl AwsClientFactory {
    pub fn new(credentials: CredentialSource) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl LambdaClientFactory for AwsClientFactory {
    type Api = AwsLambda;

    async fn client_for(&self, region: &Region) -> AwsLambda {
        let config = load_sdk_config(&self.credentials, Some(region)).await;
        AwsLambda::new(&config)
    }
}

/// Discovers Lambda regions from the public global-infrastructure SSM parameters.
#[derive(Debug, Clone, Default)]
pub struct SsmRegionDiscovery {
    credentials: CredentialSource,
}

impl SsmRegionDiscovery {
    pub fn new(credentials: CredentialSource) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl RegionDiscovery for SsmRegionDiscovery {
    async fn lambda_regions(&self) -> Result<Vec<Region>> {
        let config = load_sdk_config(&self.credentials, None).await;
        let client = aws_sdk_ssm::Client::new(&config);

        let mut cursor = PageCursor::new();
        let mut regions = Vec::new();

        while let Some(region) = cursor
            .next_with(|next_token| {
                let client = client.clone();
                async move {
                    trace!("Describing Lambda regions (next_token={next_token:?})");

                    let output = client
                        .get_parameters_by_path()
                        .path(LAMBDA_REGIONS_PARAMETER_PATH)
                        .set_next_token(next_token)
                        .send()
                        .await
                        .context("Failed to read Lambda regions from SSM")?;

                    let page: Vec<Region> = output
                        .parameters
                        .unwrap_or_default()
                        .into_iter()
                        .filter_map(|parameter| parameter.value)
                        .map(Region::from)
                        .collect();

                    anyhow::Ok(Page::new(page, output.next_token))
                }
            })
            .await?
        {
            regions.push(region);
        }

        regions.sort();
        Ok(regions)
    }
}
