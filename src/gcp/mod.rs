//! GCP REST provider
//!
//! Implements [`CloudProvider`] on top of the Cloud Storage, IAM and
//! Resource Manager JSON APIs, authenticated with Application Default
//! Credentials.

pub mod iam;
pub mod policy;
pub mod resource_manager;
pub mod rest;
pub mod storage;

use crate::auth::{AdcCredentials, TokenSource};
use crate::error::ProvisionError;
use crate::provider::{CloudProvider, Connector};
use crate::types::{
    AccountOutcome, BucketOutcome, BucketOwnership, BucketSpec, KeyMaterial, ProjectId,
    RoleOutcome, ServiceAccount, ServiceAccountSpec,
};
use async_trait::async_trait;
use iam::IamClient;
use resource_manager::ResourceManagerClient;
use rest::GoogleRestClient;
use std::sync::Arc;
use storage::{BucketLookup, StorageClient};
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Base URLs of the Google APIs in use
#[derive(Debug, Clone)]
pub struct GcpEndpoints {
    pub resource_manager: String,
    pub storage: String,
    pub iam: String,
}

impl Default for GcpEndpoints {
    fn default() -> Self {
        Self {
            resource_manager: "https://cloudresourcemanager.googleapis.com".to_string(),
            storage: "https://storage.googleapis.com".to_string(),
            iam: "https://iam.googleapis.com".to_string(),
        }
    }
}

impl GcpEndpoints {
    /// Route every API to one base URL
    pub fn single(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/').to_string();
        Self {
            resource_manager: base.clone(),
            storage: base.clone(),
            iam: base,
        }
    }
}

/// Provider bound to one project
pub struct GcpProvider {
    project: ProjectId,
    resource_manager: ResourceManagerClient,
    storage: StorageClient,
    iam: IamClient,
    project_number: OnceCell<String>,
}

impl GcpProvider {
    pub fn new(
        project: ProjectId,
        endpoints: &GcpEndpoints,
        tokens: Arc<dyn TokenSource>,
    ) -> Result<Self, ProvisionError> {
        let rest = GoogleRestClient::new(tokens)?;

        Ok(Self {
            project,
            resource_manager: ResourceManagerClient::new(
                rest.clone(),
                endpoints.resource_manager.clone(),
            ),
            storage: StorageClient::new(rest.clone(), endpoints.storage.clone()),
            iam: IamClient::new(rest, endpoints.iam.clone()),
            project_number: OnceCell::new(),
        })
    }

    async fn project_number(&self) -> Result<&str, ProvisionError> {
        self.project_number
            .get_or_try_init(|| self.resource_manager.project_number(&self.project))
            .await
            .map(String::as_str)
    }

    /// Decide who owns a bucket name that already exists
    async fn classify_existing_bucket(&self, name: &str) -> Result<BucketOutcome, ProvisionError> {
        match self.bucket_ownership(name).await? {
            BucketOwnership::Owned => Ok(BucketOutcome::AlreadyOwned),
            BucketOwnership::Foreign => Ok(BucketOutcome::NameTaken),
            BucketOwnership::Absent => Err(ProvisionError::api(
                format!("Bucket {} reported as existing", name),
                "lookup returned not found",
            )),
        }
    }
}

#[async_trait]
impl CloudProvider for GcpProvider {
    async fn bucket_ownership(&self, name: &str) -> Result<BucketOwnership, ProvisionError> {
        match self.storage.lookup_bucket(name).await? {
            BucketLookup::Visible(Some(owner)) => {
                if owner == self.project_number().await? {
                    Ok(BucketOwnership::Owned)
                } else {
                    debug!(bucket = %name, owner = %owner, "Bucket belongs to another project");
                    Ok(BucketOwnership::Foreign)
                }
            }
            BucketLookup::Visible(None) | BucketLookup::Forbidden => Ok(BucketOwnership::Foreign),
            BucketLookup::NotFound => Ok(BucketOwnership::Absent),
        }
    }

    async fn create_bucket(&self, spec: &BucketSpec) -> Result<BucketOutcome, ProvisionError> {
        match self.storage.insert_bucket(&self.project, spec).await? {
            Ok(bucket) => {
                debug!(bucket = %bucket.name, "Bucket inserted");
                Ok(BucketOutcome::Created)
            }
            Err(e) if e.is_conflict() => self.classify_existing_bucket(&spec.name).await,
            Err(e) => Err(e.into_error(format!("Failed to create bucket {}", spec.name))),
        }
    }

    async fn find_service_account(
        &self,
        email: &str,
    ) -> Result<Option<ServiceAccount>, ProvisionError> {
        self.iam.get_service_account(&self.project, email).await
    }

    async fn create_service_account(
        &self,
        spec: &ServiceAccountSpec,
    ) -> Result<AccountOutcome, ProvisionError> {
        self.iam.create_service_account(&self.project, spec).await
    }

    async fn bind_role(
        &self,
        account: &ServiceAccount,
        role: &str,
    ) -> Result<RoleOutcome, ProvisionError> {
        let member = account.member();
        let mut policy = self.resource_manager.get_iam_policy(&self.project).await?;

        if !policy.add_binding(role, &member) {
            return Ok(RoleOutcome::AlreadyBound);
        }

        self.resource_manager
            .set_iam_policy(&self.project, &policy)
            .await?;
        Ok(RoleOutcome::Granted)
    }

    async fn create_key(&self, account: &ServiceAccount) -> Result<KeyMaterial, ProvisionError> {
        self.iam.create_key(account).await
    }
}

/// Authenticates with ADC, then builds a [`GcpProvider`]
#[derive(Debug, Clone, Default)]
pub struct GcpConnector {
    endpoints: GcpEndpoints,
}

impl GcpConnector {
    pub fn new(endpoints: GcpEndpoints) -> Self {
        Self { endpoints }
    }
}

#[async_trait]
impl Connector for GcpConnector {
    type Provider = GcpProvider;

    async fn connect(&self, project: &ProjectId) -> Result<GcpProvider, ProvisionError> {
        let credentials = AdcCredentials::discover().await?;
        info!("✅ Authentication successful!");

        GcpProvider::new(project.clone(), &self.endpoints, Arc::new(credentials))
    }
}
