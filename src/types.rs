//! Types shared by the provisioner and cloud providers

use crate::error::ProvisionError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Operator-supplied GCP project id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ProjectId(String);

impl ProjectId {
    /// Accept any non-blank id. Whether the project exists is only
    /// discovered by the first API call against it.
    pub fn parse(raw: &str) -> Result<Self, ProvisionError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ProvisionError::InvalidProjectId(
                "project ID must not be empty".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parameters for a state bucket creation attempt
#[derive(Debug, Clone)]
pub struct BucketSpec {
    pub name: String,
    pub location: String,
}

/// Result of trying to create a bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketOutcome {
    /// Bucket did not exist and was created
    Created,
    /// Bucket exists and belongs to this project
    AlreadyOwned,
    /// Name is held by some other project
    NameTaken,
}

/// Who holds a bucket name, checked without creating anything
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketOwnership {
    /// Exists and belongs to this project
    Owned,
    /// Exists under another project, or is hidden from us
    Foreign,
    Absent,
}

/// Parameters for creating the service account
#[derive(Debug, Clone)]
pub struct ServiceAccountSpec {
    pub account_id: String,
    pub email: String,
    pub display_name: String,
    pub description: String,
}

/// A GCP service account, as returned by the IAM API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccount {
    /// Resource name: `projects/{project}/serviceAccounts/{email}`
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub unique_id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl ServiceAccount {
    /// IAM policy member string for this account
    pub fn member(&self) -> String {
        format!("serviceAccount:{}", self.email)
    }
}

/// Result of creating the service account
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountOutcome {
    Created(ServiceAccount),
    /// Someone else created it between our lookup and create
    AlreadyExists(ServiceAccount),
}

impl AccountOutcome {
    pub fn into_parts(self) -> (ServiceAccount, ResourceStatus) {
        match self {
            AccountOutcome::Created(account) => (account, ResourceStatus::Created),
            AccountOutcome::AlreadyExists(account) => (account, ResourceStatus::AlreadyExists),
        }
    }
}

/// Result of binding one role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleOutcome {
    Granted,
    AlreadyBound,
}

/// Freshly generated service account key
pub struct KeyMaterial {
    /// Key id (last segment of the key resource name)
    pub key_id: String,
    /// Decoded JSON credential file contents
    pub credentials_json: Vec<u8>,
}

// Never print key contents
impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("key_id", &self.key_id)
            .field("credentials_json", &format_args!("<{} bytes>", self.credentials_json.len()))
            .finish()
    }
}

/// Whether a run created a resource or found it in place
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    Created,
    AlreadyExists,
}

impl std::fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceStatus::Created => write!(f, "created"),
            ResourceStatus::AlreadyExists => write!(f, "already exists"),
        }
    }
}

/// Per-role result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RoleStatus {
    Granted,
    AlreadyBound,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleReport {
    pub role: String,
    #[serde(flatten)]
    pub status: RoleStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketReport {
    pub name: String,
    pub status: ResourceStatus,
    /// True when the project-scoped fallback name was used
    pub fallback: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountReport {
    pub email: String,
    pub status: ResourceStatus,
}

/// Outcome of a completed run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionSummary {
    pub project_id: String,
    pub bucket: BucketReport,
    pub service_account: AccountReport,
    pub roles: Vec<RoleReport>,
    pub key_file: PathBuf,
    pub key_id: String,
}

impl ProvisionSummary {
    /// Roles that could not be granted
    pub fn failed_roles(&self) -> Vec<&RoleReport> {
        self.roles
            .iter()
            .filter(|r| matches!(r.status, RoleStatus::Failed { .. }))
            .collect()
    }

    /// True when every role is bound
    pub fn is_complete(&self) -> bool {
        self.failed_roles().is_empty()
    }

    /// Format the summary for the terminal
    pub fn display(&self) -> String {
        let mut out = format!(
            "GCP setup summary for project {}:\n  State bucket: {} ({}{})\n  Service account: {} ({})\n  Roles:\n",
            self.project_id,
            self.bucket.name,
            self.bucket.status,
            if self.bucket.fallback { ", project-scoped fallback" } else { "" },
            self.service_account.email,
            self.service_account.status,
        );
        for report in &self.roles {
            let line = match &report.status {
                RoleStatus::Granted => format!("    ✅ {} (granted)\n", report.role),
                RoleStatus::AlreadyBound => format!("    ✅ {} (already bound)\n", report.role),
                RoleStatus::Failed { reason } => format!("    ❌ {} ({})\n", report.role, reason),
            };
            out.push_str(&line);
        }
        out.push_str(&format!(
            "  Key file: {} (key id {})\n  Keep this file out of version control.",
            self.key_file.display(),
            self.key_id
        ));
        out
    }
}
