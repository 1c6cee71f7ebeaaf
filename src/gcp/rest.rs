//! Authenticated JSON calls against Google REST APIs

use crate::auth::TokenSource;
use crate::error::{GoogleApiError, ProvisionError};
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Outer error: transport or auth. Inner error: the API said no.
pub type ApiResult<T> = Result<Result<T, GoogleApiError>, ProvisionError>;

/// Thin reqwest wrapper that attaches an ADC bearer token
#[derive(Clone)]
pub struct GoogleRestClient {
    http: Client,
    tokens: Arc<dyn TokenSource>,
}

impl GoogleRestClient {
    pub fn new(tokens: Arc<dyn TokenSource>) -> Result<Self, ProvisionError> {
        let http = Client::builder()
            .user_agent(concat!("gcp-bootstrap/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProvisionError::api("Failed to build HTTP client", e))?;

        Ok(Self { http, tokens })
    }

    pub async fn get<T: DeserializeOwned + Send>(&self, url: &str) -> ApiResult<T> {
        self.send(Method::GET, url, None::<&()>).await
    }

    pub async fn post<B, T>(&self, url: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned + Send,
    {
        self.send(Method::POST, url, Some(body)).await
    }

    async fn send<B, T>(&self, method: Method, url: &str, body: Option<&B>) -> ApiResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned + Send,
    {
        debug!(method = %method, url = %url, "Google API request");

        let authorization = self.tokens.authorization().await?;
        let mut request = self
            .http
            .request(method, url)
            .header(AUTHORIZATION, authorization);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProvisionError::api(format!("Request to {} failed", url), e))?;

        let status = response.status();
        if status.is_success() {
            let value = response
                .json::<T>()
                .await
                .map_err(|e| ProvisionError::api(format!("Invalid response from {}", url), e))?;
            Ok(Ok(value))
        } else {
            let body = response.text().await.unwrap_or_default();
            let error = GoogleApiError::from_body(status.as_u16(), &body);
            debug!(url = %url, error = %error, "Google API returned an error");
            Ok(Err(error))
        }
    }
}
