//! Minting Pipeline
//!
//! `pending → uploading → minting → success`, or `failed` from any stage.
//!
//! Characters are pinned strictly one at a time: the first character's
//! metadata hash becomes the collection's base URI, and the pinning service
//! rate-limits bursts. Any error aborts the whole run before anything is
//! minted; already-pinned content is left in place. A failed run is retried
//! from scratch.

use std::sync::Arc;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use super::contract::{CollectionContract, ContractError, MintReceipt};
use super::metadata::build_metadata;
use super::pinning::{PinningError, PinningService};
use super::{Collection, CollectionStatus, StagedCharacter, UploadedContent};
use crate::core::image_gen::{data_url, ImageFormat};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Collection is empty")]
    EmptyCollection,

    #[error("Failed to load image for character {index}: {reason}")]
    ImageUnavailable { index: usize, reason: String },

    #[error("Failed to upload image for character {index}: {source}")]
    ImageUpload {
        index: usize,
        #[source]
        source: PinningError,
    },

    #[error("Failed to upload metadata for character {index}: {source}")]
    MetadataUpload {
        index: usize,
        #[source]
        source: PinningError,
    },

    #[error(transparent)]
    Contract(#[from] ContractError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

// ============================================================================
// Progress
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MintStatus {
    Pending,
    Uploading,
    Minting,
    Success,
    Failed,
}

impl MintStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintProgress {
    pub status: MintStatus,
    /// Percentage in `0..=100`.
    pub progress: f64,
    pub current_step: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_sea_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MintProgress {
    fn at(status: MintStatus, progress: f64, current_step: impl Into<String>) -> Self {
        Self {
            status,
            progress,
            current_step: current_step.into(),
            transaction_hash: None,
            open_sea_link: None,
            error: None,
        }
    }

    pub fn pending() -> Self {
        Self::at(MintStatus::Pending, 0.0, "")
    }

    /// Uploading occupies the first half of the range.
    pub fn uploading(index: usize, total: usize) -> Self {
        Self::at(
            MintStatus::Uploading,
            (index as f64 / total as f64) * 50.0,
            format!("Uploading character {} of {}", index + 1, total),
        )
    }

    pub fn minting() -> Self {
        Self::at(MintStatus::Minting, 75.0, "Minting your collection...")
    }

    pub fn success(transaction_hash: String, open_sea_link: String) -> Self {
        Self {
            transaction_hash: Some(transaction_hash),
            open_sea_link: Some(open_sea_link),
            ..Self::at(MintStatus::Success, 100.0, "Collection minted successfully!")
        }
    }

    pub fn failed(error: String) -> Self {
        Self {
            error: Some(error),
            ..Self::at(MintStatus::Failed, 0.0, "")
        }
    }
}

/// Receives every progress update of a run.
pub trait ProgressSink: Send + Sync {
    fn report(&self, progress: &MintProgress);
}

impl<F> ProgressSink for F
where
    F: Fn(&MintProgress) + Send + Sync,
{
    fn report(&self, progress: &MintProgress) {
        self(progress)
    }
}

/// Discards all progress updates.
pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn report(&self, _progress: &MintProgress) {}
}

// ============================================================================
// Outcome
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_sea_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MintOutcome {
    fn minted(receipt: &MintReceipt, token_ids: Vec<String>, open_sea_link: String) -> Self {
        Self {
            success: true,
            transaction_hash: Some(receipt.transaction_hash.clone()),
            token_ids: Some(token_ids),
            open_sea_link: Some(open_sea_link),
            error: None,
        }
    }

    fn failed(error: String) -> Self {
        Self {
            success: false,
            transaction_hash: None,
            token_ids: None,
            open_sea_link: None,
            error: Some(error),
        }
    }
}

// ============================================================================
// Pipeline
// ============================================================================

pub struct MintingPipeline {
    pinning: Arc<dyn PinningService>,
    contract: Arc<dyn CollectionContract>,
    sink: Arc<dyn ProgressSink>,
    http: Client,
    marketplace_url: String,
    current: MintProgress,
}

impl MintingPipeline {
    pub fn new(
        pinning: Arc<dyn PinningService>,
        contract: Arc<dyn CollectionContract>,
        marketplace_url: impl Into<String>,
    ) -> Self {
        Self {
            pinning,
            contract,
            sink: Arc::new(NoopSink),
            http: Client::new(),
            marketplace_url: marketplace_url.into(),
            current: MintProgress::pending(),
        }
    }

    pub fn with_progress_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Latest reported progress.
    pub fn progress(&self) -> &MintProgress {
        &self.current
    }

    /// Reset to `pending` so the whole pipeline can run again.
    pub fn retry(&mut self) {
        self.report(MintProgress::pending());
    }

    fn report(&mut self, progress: MintProgress) {
        self.sink.report(&progress);
        self.current = progress;
    }

    fn open_sea_link(&self, token_id: u64) -> String {
        format!(
            "{}/{}/{}",
            self.marketplace_url.trim_end_matches('/'),
            self.contract.address(),
            token_id
        )
    }

    /// Pin and mint every character of `collection`.
    ///
    /// Never returns an error: failures are reported through the sink and
    /// folded into the outcome. On success each character carries its
    /// pinned content.
    pub async fn process_collection(&mut self, collection: &mut Collection) -> MintOutcome {
        match self.run(collection).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let message = e.to_string();
                log::error!("Minting error: {}", message);
                collection.status = CollectionStatus::Failed;
                self.report(MintProgress::failed(message.clone()));
                MintOutcome::failed(message)
            }
        }
    }

    async fn run(&mut self, collection: &mut Collection) -> Result<MintOutcome> {
        if collection.is_empty() {
            return Err(PipelineError::EmptyCollection);
        }

        tracing::info!(
            collection = %collection.id,
            characters = collection.len(),
            "Uploading collection"
        );
        collection.status = CollectionStatus::Uploading;
        let uploads = self.upload_collection(&collection.characters).await?;
        for (staged, uploaded) in collection.characters.iter_mut().zip(uploads) {
            staged.ipfs = Some(uploaded);
        }

        tracing::info!(collection = %collection.id, "Minting collection");
        collection.status = CollectionStatus::Minting;
        let outcome = self.mint_collection(&collection.characters).await?;
        collection.status = CollectionStatus::Minted;
        Ok(outcome)
    }

    async fn upload_collection(
        &mut self,
        characters: &[StagedCharacter],
    ) -> Result<Vec<UploadedContent>> {
        let total = characters.len();
        let mut uploads = Vec::with_capacity(total);

        for (i, staged) in characters.iter().enumerate() {
            self.report(MintProgress::uploading(i, total));
            uploads.push(self.upload_character(i, staged).await?);
        }

        log::info!("Uploaded {} characters", total);
        Ok(uploads)
    }

    async fn upload_character(&self, i: usize, staged: &StagedCharacter) -> Result<UploadedContent> {
        let index = i + 1;
        let (bytes, format) = self.image_bytes(index, &staged.character.image).await?;

        let file_name = format!("character-{}.{}", index, format.extension());
        let image = self
            .pinning
            .pin_file(&file_name, bytes, format.mime_type())
            .await
            .map_err(|source| PipelineError::ImageUpload { index, source })?;

        let metadata = build_metadata(&staged.character, &image.url);
        let document = serde_json::to_value(&metadata).map_err(|e| PipelineError::MetadataUpload {
            index,
            source: PinningError::InvalidResponse(e.to_string()),
        })?;
        let pinned_metadata = self
            .pinning
            .pin_json(&document)
            .await
            .map_err(|source| PipelineError::MetadataUpload { index, source })?;

        Ok(UploadedContent {
            image: image.url,
            metadata: pinned_metadata.url,
            image_hash: image.hash,
            metadata_hash: pinned_metadata.hash,
        })
    }

    /// Portrait bytes from an embedded `data:` URL or a remote URL.
    async fn image_bytes(&self, index: usize, image: &str) -> Result<(Vec<u8>, ImageFormat)> {
        let unavailable = |reason: String| PipelineError::ImageUnavailable { index, reason };

        if image.starts_with("data:") {
            let decoded = data_url::decode(image)
                .ok_or_else(|| unavailable("malformed data URL".to_string()))?;
            let format = decoded.format().unwrap_or(ImageFormat::Png);
            return Ok((decoded.bytes, format));
        }

        let url = Url::parse(image).map_err(|e| unavailable(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(unavailable(format!("unsupported image scheme '{}'", url.scheme())));
        }

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?;
        if !response.status().is_success() {
            return Err(unavailable(format!("HTTP {}", response.status().as_u16())));
        }
        let format = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(ImageFormat::from_mime)
            .unwrap_or(ImageFormat::Png);
        let bytes = response.bytes().await.map_err(|e| unavailable(e.to_string()))?;
        Ok((bytes.to_vec(), format))
    }

    async fn mint_collection(&mut self, characters: &[StagedCharacter]) -> Result<MintOutcome> {
        let anchor = characters
            .first()
            .and_then(|c| c.ipfs.as_ref())
            .ok_or(PipelineError::EmptyCollection)?;
        let base_uri = format!("ipfs://{}/", anchor.metadata_hash);
        self.contract.set_base_uri(&base_uri).await?;

        self.report(MintProgress::minting());

        let quantity = characters.len();
        let receipt = self.contract.mint(quantity).await?;
        let token_ids = receipt.token_ids(quantity).ok_or_else(|| {
            ContractError::InvalidResponse(format!(
                "token id {} cannot hold a batch of {}",
                receipt.first_token_id, quantity
            ))
        })?;
        let link = self.open_sea_link(receipt.first_token_id);

        log::info!(
            "Minted {} tokens starting at #{} (tx {})",
            quantity,
            receipt.first_token_id,
            receipt.transaction_hash
        );
        self.report(MintProgress::success(
            receipt.transaction_hash.clone(),
            link.clone(),
        ));
        Ok(MintOutcome::minted(&receipt, token_ids, link))
    }
}
