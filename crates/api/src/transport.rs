//! HTTP transport seam used by the manifest fetcher.

use std::{env, time::Duration};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url, header};
use thiserror::Error;
use tracing::debug;

/// Status and body of a single GET request.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self { status, body: body.into() }
    }
}

/// Connection-level failure; the request produced no HTTP status.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Performs one GET request per call. Retry, timeout, and cancellation
/// policy belong to the caller.
#[async_trait]
pub trait ManifestTransport: Send + Sync {
    async fn get(&self, url: &Url) -> Result<TransportResponse, TransportError>;
}

/// Production transport backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: Client,
    user_agent: String,
}

impl ReqwestTransport {
    /// Build a client that accepts JSON (or the `text/plain` GitHub raw
    /// content is served as) and bounds each request by `request_timeout`.
    pub fn new(request_timeout: Duration) -> Result<Self> {
        let mut default_headers = header::HeaderMap::new();
        default_headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json,text/plain"));

        let http = Client::builder()
            .default_headers(default_headers)
            .connect_timeout(request_timeout)
            .timeout(request_timeout)
            .build()
            .context("build http client")?;

        Ok(Self {
            http,
            user_agent: format!("terraform-provider-bref/{}; {}", env!("CARGO_PKG_VERSION"), env::consts::OS),
        })
    }
}

#[async_trait]
impl ManifestTransport for ReqwestTransport {
    async fn get(&self, url: &Url) -> Result<TransportResponse, TransportError> {
        debug!(%url, "building manifest request");
        let response = self
            .http
            .get(url.clone())
            .header(header::USER_AGENT, &self.user_agent)
            .send()
            .await
            .map_err(|error| TransportError::new(error.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|error| TransportError::new(format!("reading response body: {error}")))?;

        Ok(TransportResponse::new(status, body.to_vec()))
    }
}
