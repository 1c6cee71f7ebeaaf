//! Bootstrap sequence
//!
//! One pass, strictly in order: authenticate, state bucket, service
//! account, role bindings, key export. Every step before the key is
//! create-if-absent, so re-running after a failure or interrupt is safe.
//! Nothing is retried.

use crate::config::SetupConfig;
use crate::error::ProvisionError;
use crate::key_file::write_key_file;
use crate::provider::{CloudProvider, Connector};
use crate::types::{
    AccountReport, BucketOutcome, BucketOwnership, BucketReport, BucketSpec, ProjectId,
    ProvisionSummary, ResourceStatus, RoleOutcome, RoleReport, RoleStatus, ServiceAccount,
    ServiceAccountSpec,
};
use tracing::{error, info, warn};

pub struct Provisioner {
    config: SetupConfig,
}

impl Provisioner {
    pub fn new(config: SetupConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SetupConfig {
        &self.config
    }

    /// Run the whole sequence for `project`
    pub async fn run<C: Connector>(
        &self,
        connector: &C,
        project: &ProjectId,
    ) -> Result<ProvisionSummary, ProvisionError> {
        info!(project = %project, "🚀 Binge+ GCP Infrastructure Setup");

        let provider = connector.connect(project).await?;

        let bucket = self.ensure_state_bucket(&provider, project).await?;
        let (account, account_status) = self.ensure_service_account(&provider, project).await?;
        let roles = self.ensure_role_bindings(&provider, &account).await;
        let key_id = self.export_key(&provider, &account).await?;

        Ok(ProvisionSummary {
            project_id: project.to_string(),
            bucket,
            service_account: AccountReport {
                email: account.email,
                status: account_status,
            },
            roles,
            key_file: self.config.key_file.clone(),
            key_id,
        })
    }

    /// Reuse whichever name this project already owns. Otherwise create
    /// the shared name, or the project-scoped one when the shared name
    /// belongs to another project.
    pub async fn ensure_state_bucket<P: CloudProvider>(
        &self,
        provider: &P,
        project: &ProjectId,
    ) -> Result<BucketReport, ProvisionError> {
        let shared = self.bucket_spec(self.config.shared_bucket.clone());
        let fallback = self.bucket_spec(self.config.fallback_bucket(project.as_str()));

        for (name, is_fallback) in [(&shared.name, false), (&fallback.name, true)] {
            if provider.bucket_ownership(name).await? == BucketOwnership::Owned {
                info!(bucket = %name, "⚠️ Bucket already exists. Skipping creation.");
                return Ok(bucket_report(
                    name.clone(),
                    ResourceStatus::AlreadyExists,
                    is_fallback,
                ));
            }
        }

        match provider.create_bucket(&shared).await? {
            BucketOutcome::Created => {
                info!(bucket = %shared.name, "✅ Terraform state bucket created");
                return Ok(bucket_report(shared.name, ResourceStatus::Created, false));
            }
            BucketOutcome::AlreadyOwned => {
                info!(bucket = %shared.name, "⚠️ Bucket already exists. Skipping creation.");
                return Ok(bucket_report(shared.name, ResourceStatus::AlreadyExists, false));
            }
            BucketOutcome::NameTaken => {
                warn!(
                    bucket = %shared.name,
                    "Bucket name is taken by another project, falling back to a project-scoped name"
                );
            }
        }

        match provider.create_bucket(&fallback).await? {
            BucketOutcome::Created => {
                info!(bucket = %fallback.name, "✅ Terraform state bucket created");
                Ok(bucket_report(fallback.name, ResourceStatus::Created, true))
            }
            BucketOutcome::AlreadyOwned => {
                info!(bucket = %fallback.name, "⚠️ Bucket already exists. Skipping creation.");
                Ok(bucket_report(fallback.name, ResourceStatus::AlreadyExists, true))
            }
            BucketOutcome::NameTaken => Err(ProvisionError::BucketOwnershipConflict {
                shared: shared.name,
                fallback: fallback.name,
                project: project.to_string(),
            }),
        }
    }

    /// Lookup before create; an existing account is never modified
    pub async fn ensure_service_account<P: CloudProvider>(
        &self,
        provider: &P,
        project: &ProjectId,
    ) -> Result<(ServiceAccount, ResourceStatus), ProvisionError> {
        let email = self.config.service_account_email(project.as_str());

        if let Some(account) = provider.find_service_account(&email).await? {
            info!(email = %email, "⚠️ Service account already exists.");
            return Ok((account, ResourceStatus::AlreadyExists));
        }

        let spec = ServiceAccountSpec {
            account_id: self.config.service_account_name.clone(),
            email: email.clone(),
            display_name: self.config.service_account_display_name.clone(),
            description: self.config.service_account_description.clone(),
        };
        let (account, status) = provider.create_service_account(&spec).await?.into_parts();
        if status == ResourceStatus::Created {
            info!(email = %account.email, "✅ Service account created");
        }
        Ok((account, status))
    }

    /// Bind every configured role. Failures are recorded per role and do
    /// not stop the remaining grants.
    pub async fn ensure_role_bindings<P: CloudProvider>(
        &self,
        provider: &P,
        account: &ServiceAccount,
    ) -> Vec<RoleReport> {
        let mut reports = Vec::with_capacity(self.config.roles.len());

        for role in &self.config.roles {
            let status = match provider.bind_role(account, role).await {
                Ok(RoleOutcome::Granted) => {
                    info!(role = %role, "✅ Assigned role");
                    RoleStatus::Granted
                }
                Ok(RoleOutcome::AlreadyBound) => {
                    info!(role = %role, "⚠️ Role already assigned");
                    RoleStatus::AlreadyBound
                }
                Err(e) => {
                    error!(role = %role, error = %e, "❌ Error assigning role");
                    RoleStatus::Failed {
                        reason: e.to_string(),
                    }
                }
            };
            reports.push(RoleReport {
                role: role.clone(),
                status,
            });
        }

        reports
    }

    /// Always issues a new key; returns its id
    pub async fn export_key<P: CloudProvider>(
        &self,
        provider: &P,
        account: &ServiceAccount,
    ) -> Result<String, ProvisionError> {
        let key = provider.create_key(account).await?;
        write_key_file(&self.config.key_file, &key)?;

        info!(
            path = %self.config.key_file.display(),
            key_id = %key.key_id,
            "✅ Service account key saved"
        );
        Ok(key.key_id)
    }

    fn bucket_spec(&self, name: String) -> BucketSpec {
        BucketSpec {
            name,
            location: self.config.bucket_location.clone(),
        }
    }
}

fn bucket_report(name: String, status: ResourceStatus, fallback: bool) -> BucketReport {
    BucketReport {
        name,
        status,
        fallback,
    }
}
