//! Collection contract calls.
//!
//! Transactions are signed and submitted by a relay; this side only sends
//! the call parameters and reads back the transaction hash.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::config::ContractConfig;

#[derive(Error, Debug)]
pub enum ContractError {
    #[error("Contract not configured: {0}")]
    NotConfigured(String),

    #[error("Contract relay error ({status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{0}")]
    Rejected(String),

    #[error("Invalid relay response: {0}")]
    InvalidResponse(String),
}

pub type Result<T> = std::result::Result<T, ContractError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintReceipt {
    pub transaction_hash: String,
    /// First token minted; the batch is contiguous from here.
    pub first_token_id: u64,
}

impl MintReceipt {
    /// Ids of a batch of `quantity` tokens. `None` when the range runs past `u64::MAX`.
    pub fn token_ids(&self, quantity: usize) -> Option<Vec<String>> {
        (0..quantity as u64)
            .map(|offset| self.first_token_id.checked_add(offset).map(|id| id.to_string()))
            .collect()
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait CollectionContract: Send + Sync {
    /// Deployed contract address.
    fn address(&self) -> String;

    /// Set the base content reference used to resolve token metadata.
    /// Returns the transaction hash.
    async fn set_base_uri(&self, base_uri: &str) -> Result<String>;

    /// Mint `quantity` tokens in a single transaction.
    async fn mint(&self, quantity: usize) -> Result<MintReceipt>;
}

/// Relay reply: `{success, hash?, tokenId?, error?}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RelayResponse {
    success: bool,
    #[serde(default)]
    hash: Option<String>,
    #[serde(default)]
    token_id: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

impl RelayResponse {
    fn into_hash(self) -> Result<(String, Option<serde_json::Value>)> {
        if !self.success {
            return Err(ContractError::Rejected(
                self.error.unwrap_or_else(|| "Transaction rejected".to_string()),
            ));
        }
        let hash = self
            .hash
            .ok_or_else(|| ContractError::InvalidResponse("missing transaction hash".to_string()))?;
        Ok((hash, self.token_id))
    }
}

fn parse_token_id(value: &serde_json::Value) -> Option<u64> {
    match value {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

pub struct RelayContract {
    client: Client,
    config: ContractConfig,
}

impl RelayContract {
    pub fn new(config: ContractConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    async fn call(&self, path: &str, body: serde_json::Value) -> Result<RelayResponse> {
        if self.config.address.is_empty() {
            return Err(ContractError::NotConfigured("CONTRACT_ADDRESS".to_string()));
        }

        let url = format!("{}{}", self.config.relay_url.trim_end_matches('/'), path);
        let response = self.client.post(&url).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ContractError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ContractError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl CollectionContract for RelayContract {
    fn address(&self) -> String {
        self.config.address.clone()
    }

    async fn set_base_uri(&self, base_uri: &str) -> Result<String> {
        let reply = self
            .call(
                "/collection/base-uri",
                json!({ "contract": self.config.address, "baseUri": base_uri }),
            )
            .await?;
        let (hash, _) = reply.into_hash()?;
        log::info!("Collection base URI set to {} (tx {})", base_uri, hash);
        Ok(hash)
    }

    async fn mint(&self, quantity: usize) -> Result<MintReceipt> {
        let reply = self
            .call(
                "/collection/mint",
                json!({ "contract": self.config.address, "quantity": quantity }),
            )
            .await?;
        let (transaction_hash, token_id) = reply.into_hash()?;
        let first_token_id = token_id
            .as_ref()
            .and_then(parse_token_id)
            .ok_or_else(|| ContractError::InvalidResponse("missing token id".to_string()))?;

        let receipt = MintReceipt {
            transaction_hash,
            first_token_id,
        };
        if receipt.token_ids(quantity).is_none() {
            return Err(ContractError::InvalidResponse(format!(
                "token id {} cannot hold a batch of {}",
                first_token_id, quantity
            )));
        }
        Ok(receipt)
    }
}
