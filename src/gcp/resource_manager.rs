//! Cloud Resource Manager v1: project lookup and project IAM policy

use super::policy::Policy;
use super::rest::GoogleRestClient;
use crate::error::ProvisionError;
use crate::types::ProjectId;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Project {
    project_number: String,
}

#[derive(Serialize)]
struct SetIamPolicyRequest<'a> {
    policy: &'a Policy,
}

pub struct ResourceManagerClient {
    rest: GoogleRestClient,
    base_url: String,
}

impl ResourceManagerClient {
    pub fn new(rest: GoogleRestClient, base_url: impl Into<String>) -> Self {
        Self {
            rest,
            base_url: base_url.into(),
        }
    }

    /// Numeric project number, used to recognise buckets we own
    pub async fn project_number(&self, project: &ProjectId) -> Result<String, ProvisionError> {
        let url = format!("{}/v1/projects/{}", self.base_url, project);

        match self.rest.get::<Project>(&url).await? {
            Ok(p) => {
                debug!(project = %project, number = %p.project_number, "Resolved project number");
                Ok(p.project_number)
            }
            Err(e) => Err(e.into_error(format!("Failed to look up project {}", project))),
        }
    }

    /// Fetch the project policy at version 3 so conditional bindings survive
    pub async fn get_iam_policy(&self, project: &ProjectId) -> Result<Policy, ProvisionError> {
        let url = format!("{}/v1/projects/{}:getIamPolicy", self.base_url, project);
        let body = json!({ "options": { "requestedPolicyVersion": 3 } });

        self.rest
            .post::<_, Policy>(&url, &body)
            .await?
            .map_err(|e| e.into_error(format!("Failed to read IAM policy of {}", project)))
    }

    /// Write the policy back; the etag it carries guards concurrent edits
    pub async fn set_iam_policy(
        &self,
        project: &ProjectId,
        policy: &Policy,
    ) -> Result<Policy, ProvisionError> {
        let url = format!("{}/v1/projects/{}:setIamPolicy", self.base_url, project);

        self.rest
            .post::<_, Policy>(&url, &SetIamPolicyRequest { policy })
            .await?
            .map_err(|e| e.into_error(format!("Failed to update IAM policy of {}", project)))
    }
}
