//! Setup configuration
//!
//! Fixed identifiers for the Binge+ bootstrap plus the few knobs the CLI
//! exposes (key file path, bucket location).

use std::path::PathBuf;

/// Shared Terraform state bucket name, tried before the project-scoped one
pub const SHARED_STATE_BUCKET: &str = "binge-plus-tfstate";

/// Base name of the automation service account
pub const SERVICE_ACCOUNT_NAME: &str = "binge-plus-sa";

/// Default location for newly created state buckets
pub const DEFAULT_BUCKET_LOCATION: &str = "US-CENTRAL1";

/// Default key file, written to the working directory
pub const DEFAULT_KEY_FILE: &str = "binge-plus-sa-key.json";

/// Roles granted to the service account on the project
pub const REQUIRED_ROLES: &[&str] = &[
    "roles/artifactregistry.admin",
    "roles/bigquery.dataViewer",
    "roles/run.viewer",
    "roles/cloudsql.viewer",
    "roles/compute.admin",
    "roles/compute.networkAdmin",
    "roles/compute.storageAdmin",
    "roles/compute.viewer",
    "roles/resourcemanager.projectIamAdmin",
    "roles/pubsub.viewer",
    "roles/iam.serviceAccountAdmin",
    "roles/iam.serviceAccountKeyAdmin",
    "roles/storage.objectAdmin",
];

/// Everything the provisioner needs besides the project id
#[derive(Debug, Clone)]
pub struct SetupConfig {
    /// Shared state bucket name
    pub shared_bucket: String,
    /// Location for buckets this tool creates
    pub bucket_location: String,
    /// Service account id (the part before `@`)
    pub service_account_name: String,
    /// Display name set when the account is created
    pub service_account_display_name: String,
    /// Description set when the account is created
    pub service_account_description: String,
    /// Roles to bind to the service account
    pub roles: Vec<String>,
    /// Where the exported key is written
    pub key_file: PathBuf,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            shared_bucket: SHARED_STATE_BUCKET.to_string(),
            bucket_location: DEFAULT_BUCKET_LOCATION.to_string(),
            service_account_name: SERVICE_ACCOUNT_NAME.to_string(),
            service_account_display_name: "Binge Plus Service Account".to_string(),
            service_account_description: "Service Account for Binge Plus application".to_string(),
            roles: REQUIRED_ROLES.iter().map(|r| r.to_string()).collect(),
            key_file: PathBuf::from(DEFAULT_KEY_FILE),
        }
    }
}

impl SetupConfig {
    /// Override the key file path
    pub fn key_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.key_file = path.into();
        self
    }

    /// Override the bucket location
    pub fn bucket_location(mut self, location: impl Into<String>) -> Self {
        self.bucket_location = location.into();
        self
    }

    /// Replace the role set
    pub fn roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    /// Project-scoped fallback bucket name
    pub fn fallback_bucket(&self, project_id: &str) -> String {
        format!("{}-tfstate", project_id)
    }

    /// Deterministic service account email for a project
    pub fn service_account_email(&self, project_id: &str) -> String {
        format!(
            "{}@{}.iam.gserviceaccount.com",
            self.service_account_name, project_id
        )
    }
}
