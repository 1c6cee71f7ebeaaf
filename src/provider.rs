//! Cloud provider seam
//!
//! The provisioner only talks to these traits, so its sequencing can be
//! exercised against an in-memory fake instead of live GCP.

use crate::error::ProvisionError;
use crate::types::{
    AccountOutcome, BucketOutcome, BucketOwnership, BucketSpec, KeyMaterial, ProjectId,
    RoleOutcome, ServiceAccount, ServiceAccountSpec,
};
use async_trait::async_trait;

/// Provisioning operations against one project
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Read-only ownership check of a bucket name
    async fn bucket_ownership(&self, name: &str) -> Result<BucketOwnership, ProvisionError>;

    /// Try to create a bucket, classifying "already exists" by owner
    async fn create_bucket(&self, spec: &BucketSpec) -> Result<BucketOutcome, ProvisionError>;

    /// Look up a service account by email
    async fn find_service_account(
        &self,
        email: &str,
    ) -> Result<Option<ServiceAccount>, ProvisionError>;

    /// Create the service account
    async fn create_service_account(
        &self,
        spec: &ServiceAccountSpec,
    ) -> Result<AccountOutcome, ProvisionError>;

    /// Ensure `role` is bound to the account on the project policy
    async fn bind_role(
        &self,
        account: &ServiceAccount,
        role: &str,
    ) -> Result<RoleOutcome, ProvisionError>;

    /// Generate a new JSON key for the account
    async fn create_key(&self, account: &ServiceAccount) -> Result<KeyMaterial, ProvisionError>;
}

/// Authenticates and hands back a provider bound to a project
#[async_trait]
pub trait Connector: Send + Sync {
    type Provider: CloudProvider;

    async fn connect(&self, project: &ProjectId) -> Result<Self::Provider, ProvisionError>;
}
