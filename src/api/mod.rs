//! API gateway for the MemoryForge backend
//!
//! A thin typed-request layer: attaches the bearer credential, serializes
//! JSON payloads, and normalizes HTTP failure into [`ApiError`]. All
//! resource controllers go through this client; none of them touch
//! reqwest directly.

mod error;
mod types;

pub use error::ApiError;
pub use types::*;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use url::Url;

/// HTTP client bound to a single backend origin
pub struct ApiClient {
    client: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a client for the given base origin (e.g. `http://host:8080`)
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ApiError::Network(format!("Invalid server URL '{base_url}': {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::from_network_error)?;
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::Network(format!("Invalid endpoint '{path}': {e}")))
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&(impl Serialize + ?Sized)>,
        token: Option<&str>,
    ) -> Result<reqwest::Response, ApiError> {
        let url = self.endpoint(path)?;
        let mut request = self.client.request(method.clone(), url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        tracing::debug!(%method, path, "api request");
        let response = request
            .send()
            .await
            .map_err(ApiError::from_network_error)?;

        if !response.status().is_success() {
            let err = ApiError::from_response(response).await;
            tracing::debug!(path, error = %err, "api request failed");
            return Err(err);
        }
        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// GET returning a JSON body
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        token: Option<&str>,
    ) -> Result<T, ApiError> {
        let response = self
            .send(Method::GET, path, None::<&()>, token)
            .await?;
        Self::decode(response).await
    }

    /// POST returning a JSON body
    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &(impl Serialize + ?Sized),
        token: Option<&str>,
    ) -> Result<T, ApiError> {
        let response = self.send(Method::POST, path, Some(body), token).await?;
        Self::decode(response).await
    }

    /// POST where only the status matters; the body is ignored
    pub async fn post_unit(
        &self,
        path: &str,
        body: &(impl Serialize + ?Sized),
        token: Option<&str>,
    ) -> Result<(), ApiError> {
        self.send(Method::POST, path, Some(body), token).await?;
        Ok(())
    }

    /// POST with no body, status only (logout)
    pub async fn post_empty(&self, path: &str, token: Option<&str>) -> Result<(), ApiError> {
        self.send(Method::POST, path, None::<&()>, token).await?;
        Ok(())
    }

    /// PUT where only the status matters
    pub async fn put_unit(
        &self,
        path: &str,
        body: &(impl Serialize + ?Sized),
        token: Option<&str>,
    ) -> Result<(), ApiError> {
        self.send(Method::PUT, path, Some(body), token).await?;
        Ok(())
    }

    /// DELETE, status only
    pub async fn delete(&self, path: &str, token: Option<&str>) -> Result<(), ApiError> {
        self.send(Method::DELETE, path, None::<&()>, token).await?;
        Ok(())
    }
}
