//! Content pinning (IPFS via Pinata).

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::{multipart, Client, RequestBuilder};
use serde::Deserialize;
use thiserror::Error;

use crate::config::PinningConfig;

#[derive(Error, Debug)]
pub enum PinningError {
    #[error("Pinning service not configured: {0}")]
    NotConfigured(String),

    #[error("Pinning API error ({status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid pinning response: {0}")]
    InvalidResponse(String),
}

pub type Result<T> = std::result::Result<T, PinningError>;

/// Content-addressed identifier plus its gateway URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinnedContent {
    pub hash: String,
    pub url: String,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait PinningService: Send + Sync {
    /// Pin a binary file.
    async fn pin_file(&self, file_name: &str, bytes: Vec<u8>, mime_type: &str) -> Result<PinnedContent>;

    /// Pin a JSON document.
    async fn pin_json(&self, document: &serde_json::Value) -> Result<PinnedContent>;
}

#[derive(Debug, Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

pub struct PinataClient {
    client: Client,
    config: PinningConfig,
}

impl PinataClient {
    pub fn new(config: PinningConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn gateway_url(&self, hash: &str) -> String {
        format!("{}/ipfs/{}", self.config.gateway_url.trim_end_matches('/'), hash)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.api_url.trim_end_matches('/'), path)
    }

    fn authorized(&self, builder: RequestBuilder) -> Result<RequestBuilder> {
        if self.config.api_key.is_empty() || self.config.secret_key.is_empty() {
            return Err(PinningError::NotConfigured("PINATA_API_KEY / PINATA_SECRET_KEY".to_string()));
        }
        Ok(builder
            .header("pinata_api_key", &self.config.api_key)
            .header("pinata_secret_api_key", &self.config.secret_key))
    }

    async fn pinned(&self, response: reqwest::Response) -> Result<PinnedContent> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PinningError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let body: PinResponse = response
            .json()
            .await
            .map_err(|e| PinningError::InvalidResponse(e.to_string()))?;

        Ok(PinnedContent {
            url: self.gateway_url(&body.ipfs_hash),
            hash: body.ipfs_hash,
        })
    }
}

#[async_trait]
impl PinningService for PinataClient {
    async fn pin_file(&self, file_name: &str, bytes: Vec<u8>, mime_type: &str) -> Result<PinnedContent> {
        let part = multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime_type)?;
        let form = multipart::Form::new().part("file", part);

        let request = self.authorized(self.client.post(self.endpoint("/pinning/pinFileToIPFS")))?;
        let response = request.multipart(form).send().await?;
        let pinned = self.pinned(response).await?;
        log::debug!("Pinned file {} as {}", file_name, pinned.hash);
        Ok(pinned)
    }

    async fn pin_json(&self, document: &serde_json::Value) -> Result<PinnedContent> {
        let request = self.authorized(self.client.post(self.endpoint("/pinning/pinJSONToIPFS")))?;
        let response = request.json(document).send().await?;
        let pinned = self.pinned(response).await?;
        log::debug!("Pinned JSON document as {}", pinned.hash);
        Ok(pinned)
    }
}
