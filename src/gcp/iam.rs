//! IAM v1: service accounts and service account keys

use super::rest::GoogleRestClient;
use crate::error::ProvisionError;
use crate::types::{AccountOutcome, KeyMaterial, ProjectId, ServiceAccount, ServiceAccountSpec};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateServiceAccountRequest<'a> {
    account_id: &'a str,
    service_account: ServiceAccountFields<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ServiceAccountFields<'a> {
    display_name: &'a str,
    description: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateKeyRequest {
    private_key_type: &'static str,
    key_algorithm: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceAccountKey {
    name: String,
    #[serde(default)]
    private_key_data: String,
}

pub struct IamClient {
    rest: GoogleRestClient,
    base_url: String,
}

impl IamClient {
    pub fn new(rest: GoogleRestClient, base_url: impl Into<String>) -> Self {
        Self {
            rest,
            base_url: base_url.into(),
        }
    }

    fn account_url(&self, project: &ProjectId, email: &str) -> String {
        format!(
            "{}/v1/projects/{}/serviceAccounts/{}",
            self.base_url, project, email
        )
    }

    pub async fn get_service_account(
        &self,
        project: &ProjectId,
        email: &str,
    ) -> Result<Option<ServiceAccount>, ProvisionError> {
        let url = self.account_url(project, email);

        match self.rest.get::<ServiceAccount>(&url).await? {
            Ok(account) => Ok(Some(account)),
            Err(e) if e.is_not_found() => {
                debug!(email = %email, "Service account not found");
                Ok(None)
            }
            Err(e) => Err(e.into_error(format!("Failed to look up service account {}", email))),
        }
    }

    pub async fn create_service_account(
        &self,
        project: &ProjectId,
        spec: &ServiceAccountSpec,
    ) -> Result<AccountOutcome, ProvisionError> {
        let url = format!("{}/v1/projects/{}/serviceAccounts", self.base_url, project);
        let body = CreateServiceAccountRequest {
            account_id: &spec.account_id,
            service_account: ServiceAccountFields {
                display_name: &spec.display_name,
                description: &spec.description,
            },
        };

        match self.rest.post::<_, ServiceAccount>(&url, &body).await? {
            Ok(account) => Ok(AccountOutcome::Created(account)),
            Err(e) if e.is_conflict() => {
                warn!(email = %spec.email, "Service account was created concurrently, reusing it");
                self.get_service_account(project, &spec.email)
                    .await?
                    .map(AccountOutcome::AlreadyExists)
                    .ok_or_else(|| {
                        ProvisionError::api(
                            format!("Service account {} reported as existing", spec.email),
                            "lookup returned not found",
                        )
                    })
            }
            Err(e) => Err(e.into_error(format!("Failed to create service account {}", spec.email))),
        }
    }

    /// Create a JSON credentials key. A FAILED_PRECONDITION is a quota
    /// error only when it is about the per-account key limit; org policy
    /// and disabled accounts report the same status.
    pub async fn create_key(&self, account: &ServiceAccount) -> Result<KeyMaterial, ProvisionError> {
        let url = format!("{}/v1/{}/keys", self.base_url, account.name);
        let body = CreateKeyRequest {
            private_key_type: "TYPE_GOOGLE_CREDENTIALS_JSON",
            key_algorithm: "KEY_ALG_RSA_2048",
        };
        let context = format!("Failed to create key for {}", account.email);

        let key = match self.rest.post::<_, ServiceAccountKey>(&url, &body).await? {
            Ok(key) => key,
            Err(e) if e.is_quota() || (e.is_failed_precondition() && is_key_limit(&e.message)) =>
            {
                return Err(ProvisionError::Quota {
                    context,
                    message: e.message,
                })
            }
            Err(e) => return Err(e.into_error(context)),
        };

        let credentials_json = STANDARD
            .decode(key.private_key_data.as_bytes())
            .map_err(|e| ProvisionError::api(context.clone(), e))?;
        if credentials_json.is_empty() {
            return Err(ProvisionError::api(context, "response carried no key data"));
        }

        let key_id = key.name.rsplit('/').next().unwrap_or("unknown").to_string();

        Ok(KeyMaterial {
            key_id,
            credentials_json,
        })
    }
}

/// Whether a precondition failure names the per-account key limit
fn is_key_limit(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("key")
        && ["limit", "maximum", "quota", "exceed"]
            .iter()
            .any(|word| message.contains(word))
}
