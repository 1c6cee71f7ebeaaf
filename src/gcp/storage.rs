//! Cloud Storage JSON API v1: state bucket creation

use super::rest::GoogleRestClient;
use crate::error::{GoogleApiError, ProvisionError};
use crate::types::{BucketSpec, ProjectId};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Serialize)]
struct InsertBucketRequest<'a> {
    name: &'a str,
    location: &'a str,
    versioning: Versioning,
}

#[derive(Serialize)]
struct Versioning {
    enabled: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    pub name: String,
    #[serde(default)]
    pub project_number: Option<String>,
}

/// What an existing bucket name resolves to from our point of view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BucketLookup {
    /// Visible to us, with its owning project number
    Visible(Option<String>),
    /// Exists but we may not read it, so it belongs to someone else
    Forbidden,
    NotFound,
}

pub struct StorageClient {
    rest: GoogleRestClient,
    base_url: String,
}

impl StorageClient {
    pub fn new(rest: GoogleRestClient, base_url: impl Into<String>) -> Self {
        Self {
            rest,
            base_url: base_url.into(),
        }
    }

    /// Create a versioned bucket. `Err(GoogleApiError)` with 409 means the
    /// name exists somewhere.
    pub async fn insert_bucket(
        &self,
        project: &ProjectId,
        spec: &BucketSpec,
    ) -> Result<Result<Bucket, GoogleApiError>, ProvisionError> {
        let url = format!("{}/storage/v1/b?project={}", self.base_url, project);
        let body = InsertBucketRequest {
            name: &spec.name,
            location: &spec.location,
            versioning: Versioning { enabled: true },
        };

        debug!(bucket = %spec.name, location = %spec.location, "Inserting bucket");
        self.rest.post(&url, &body).await
    }

    pub async fn lookup_bucket(&self, name: &str) -> Result<BucketLookup, ProvisionError> {
        let url = format!("{}/storage/v1/b/{}", self.base_url, name);

        match self.rest.get::<Bucket>(&url).await? {
            Ok(bucket) => Ok(BucketLookup::Visible(bucket.project_number)),
            Err(e) if e.is_forbidden() => Ok(BucketLookup::Forbidden),
            Err(e) if e.is_not_found() => Ok(BucketLookup::NotFound),
            Err(e) => Err(e.into_error(format!("Failed to look up bucket {}", name))),
        }
    }
}
