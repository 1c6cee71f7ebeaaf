//! Application Default Credentials
//!
//! Resolves credentials the same way the gcloud SDKs do:
//! - `GOOGLE_APPLICATION_CREDENTIALS`
//! - Local: `gcloud auth application-default login`
//! - GCE/GKE/Cloud Run: metadata server

use crate::error::ProvisionError;
use async_trait::async_trait;
use gcloud_sdk::{GoogleAuthTokenGenerator, TokenSourceType};
use tracing::debug;

/// OAuth scope covering Storage, IAM and Resource Manager
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Supplies `Authorization` header values for REST calls
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn authorization(&self) -> Result<String, ProvisionError>;
}

/// ADC-backed token source
pub struct AdcCredentials {
    generator: GoogleAuthTokenGenerator,
}

impl AdcCredentials {
    /// Locate ADC and mint a first token.
    ///
    /// Minting up front means a machine without credentials fails here,
    /// before any cloud API is touched.
    pub async fn discover() -> Result<Self, ProvisionError> {
        debug!("Resolving application default credentials");

        let generator = GoogleAuthTokenGenerator::new(
            TokenSourceType::Default,
            vec![CLOUD_PLATFORM_SCOPE.to_string()],
        )
        .await
        .map_err(|e| ProvisionError::Authentication(e.to_string()))?;

        let credentials = Self { generator };
        credentials.authorization().await?;

        debug!("Application default credentials resolved");
        Ok(credentials)
    }
}

#[async_trait]
impl TokenSource for AdcCredentials {
    async fn authorization(&self) -> Result<String, ProvisionError> {
        let token = self
            .generator
            .create_token()
            .await
            .map_err(|e| ProvisionError::Authentication(e.to_string()))?;

        Ok(token.header_value())
    }
}

#[cfg(test)]
pub(crate) struct StaticToken(pub &'static str);

#[cfg(test)]
#[async_trait]
impl TokenSource for StaticToken {
    async fn authorization(&self) -> Result<String, ProvisionError> {
        Ok(format!("Bearer {}", self.0))
    }
}
