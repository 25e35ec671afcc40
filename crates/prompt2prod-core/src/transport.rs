//! Outbound HTTP seam
//!
//! The adapter and the model catalog talk to the network only through
//! [`UpstreamTransport`], so tests can swap in a deterministic fake.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::UpstreamFailure;

/// One outbound call with a deadline, answering a JSON body or a classified failure
#[async_trait]
pub trait UpstreamTransport: Send + Sync {
    /// POST `body` as JSON to `url`
    async fn post_json(
        &self,
        url: &str,
        body: &Value,
        timeout: Duration,
    ) -> Result<Value, UpstreamFailure>;

    /// GET `url` and decode the JSON answer; any status other than 200 is an HTTP failure
    async fn get_json(&self, url: &str, timeout: Duration) -> Result<Value, UpstreamFailure>;
}

/// reqwest-backed transport sharing one connection pool
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("client", &"<reqwest::Client>")
            .finish()
    }
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder().build()?;
        Ok(Self { client })
    }

    async fn finish(response: reqwest::Response) -> Result<Value, UpstreamFailure> {
        let status = response.status();
        debug!("Upstream answered with status {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Upstream HTTP error {}: {}", status.as_u16(), body);
            return Err(UpstreamFailure::Http {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await.map_err(classify)?;
        serde_json::from_slice(&bytes).map_err(|e| {
            UpstreamFailure::unexpected(format!("malformed upstream response: {}", e))
        })
    }
}

#[async_trait]
impl UpstreamTransport for ReqwestTransport {
    async fn post_json(
        &self,
        url: &str,
        body: &Value,
        timeout: Duration,
    ) -> Result<Value, UpstreamFailure> {
        let response = self
            .client
            .post(url)
            .header("content-type", "application/json")
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(classify)?;

        Self::finish(response).await
    }

    async fn get_json(&self, url: &str, timeout: Duration) -> Result<Value, UpstreamFailure> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if status.is_success() && status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            warn!("Upstream GET answered {} instead of 200", status.as_u16());
            return Err(UpstreamFailure::Http {
                status: status.as_u16(),
                body,
            });
        }

        Self::finish(response).await
    }
}

fn classify(err: reqwest::Error) -> UpstreamFailure {
    if err.is_timeout() {
        UpstreamFailure::Timeout
    } else {
        UpstreamFailure::unexpected(err.to_string())
    }
}
