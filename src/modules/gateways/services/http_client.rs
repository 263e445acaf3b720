use reqwest::{Client, Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

use crate::core::{AppError, Result};

/// Thin JSON client shared by the HTTP gateways.
///
/// Every call is bounded by the configured timeout and never retried.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    client: Client,
    base_url: String,
    service: &'static str,
}

impl GatewayClient {
    pub fn new(service: &'static str, base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to build {} client: {}", service, e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            service,
        })
    }

    pub fn service(&self) -> &'static str {
        self.service
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send::<(), T>(Method::GET, path, None).await
    }

    pub async fn post_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        self.send(Method::POST, path, Some(body)).await
    }

    pub async fn patch_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        self.send(Method::PATCH, path, Some(body)).await
    }

    async fn send<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T> {
        let url = self.url(path);
        let mut request = self.client.request(method.clone(), &url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            tracing::warn!(service = self.service, %method, url = %url, error = %e, "Gateway request failed");
            AppError::from_transport(self.service, &e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                service = self.service,
                %method,
                url = %url,
                status = status.as_u16(),
                body = %body,
                "Gateway returned an error status"
            );
            return Err(map_status(self.service, status));
        }

        response.json::<T>().await.map_err(|e| {
            tracing::warn!(service = self.service, url = %url, error = %e, "Gateway response could not be decoded");
            AppError::from_transport(self.service, &e)
        })
    }
}

/// 404 is the only status that carries meaning for the orchestrator
pub fn map_status(service: &str, status: StatusCode) -> AppError {
    match status {
        StatusCode::NOT_FOUND => AppError::not_found(format!("{} resource not found", service)),
        _ => AppError::unavailable(format!(
            "{} responded with status {}",
            service,
            status.as_u16()
        )),
    }
}
