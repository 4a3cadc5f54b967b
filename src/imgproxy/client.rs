//! HTTP client for the imgproxy service.

use std::time::Duration;

use http::StatusCode;
use tracing::debug;

use crate::error::UpstreamError;

/// Thin wrapper around a pooled `reqwest` client pointed at imgproxy.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct ImgproxyClient {
    http: reqwest::Client,
    base_url: String,
}

impl ImgproxyClient {
    /// Create a client for `base_url`.
    ///
    /// `timeout` bounds connecting and each individual read, never the whole
    /// transfer, so a slow but steady thumbnail stream is not cut off.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    /// Full URL for an already signed path (`/<signature>/rs:fit:...`).
    pub fn url_for(&self, signed_path: &str) -> String {
        format!("{}{}", self.base_url, signed_path)
    }

    /// GET a signed thumbnail.
    ///
    /// Only a 200 counts as success. The body of the returned response has not
    /// been read yet, so the caller can stream it.
    pub async fn fetch_thumbnail(
        &self,
        signed_path: &str,
    ) -> Result<reqwest::Response, UpstreamError> {
        let url = self.url_for(signed_path);
        debug!(url = %url, "Requesting thumbnail from imgproxy");

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await?;
            return Err(UpstreamError::Status { status, body });
        }

        Ok(response)
    }

    /// Call imgproxy's `/health` endpoint and return its status.
    pub async fn health(&self) -> Result<StatusCode, UpstreamError> {
        let response = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        Ok(response.status())
    }
}
