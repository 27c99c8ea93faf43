//! Thin `reqwest` wrapper shared by the node clients.

use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::error::WalletError;

/// Binary serializer media type of Stardust nodes.
pub const SERIALIZER_MEDIA_TYPE: &str = "application/vnd.iota.serializer-v1";

/// HTTP client bound to one node base URL.
#[derive(Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, WalletError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| WalletError::Node(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, WalletError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::BAD_REQUEST {
            return Err(WalletError::Rejected(body));
        }
        Err(WalletError::Node(format!("node returned HTTP {status}: {body}")))
    }

    /// GET returning only the status code; used for health probes.
    pub async fn get_status(&self, path: &str) -> Result<StatusCode, WalletError> {
        let response = self
            .http
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| WalletError::Node(format!("request failed: {e}")))?;
        Ok(response.status())
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, WalletError> {
        let response = self
            .http
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| WalletError::Node(format!("request failed: {e}")))?;
        Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| WalletError::Node(format!("invalid JSON response: {e}")))
    }

    pub async fn get_bytes(&self, path: &str) -> Result<Vec<u8>, WalletError> {
        let response = self
            .http
            .get(self.url(path))
            .header(ACCEPT, SERIALIZER_MEDIA_TYPE)
            .send()
            .await
            .map_err(|e| WalletError::Node(format!("request failed: {e}")))?;
        let bytes = Self::check(response)
            .await?
            .bytes()
            .await
            .map_err(|e| WalletError::Node(format!("invalid body: {e}")))?;
        Ok(bytes.to_vec())
    }

    /// POST a binary body and decode a JSON answer.
    pub async fn post_bytes<T: DeserializeOwned>(
        &self,
        path: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<T, WalletError> {
        let response = self
            .http
            .post(self.url(path))
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| WalletError::Node(format!("request failed: {e}")))?;
        Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| WalletError::Node(format!("invalid JSON response: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_trimmed() {
        let client = HttpClient::new("http://127.0.0.1:14265/").unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:14265");
        assert_eq!(client.url("/health"), "http://127.0.0.1:14265/health");
    }
}
