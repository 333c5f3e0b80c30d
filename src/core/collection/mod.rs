//! Collections
//!
//! A collection is the batch of characters a user confirms for minting. It
//! is an explicit single-owner value: generated by the orchestrator,
//! optionally staged on disk through [`store::CollectionStore`], then handed
//! to [`pipeline::MintingPipeline`] which pins every character and mints the
//! batch in one transaction.

pub mod contract;
pub mod metadata;
pub mod pinning;
pub mod pipeline;
pub mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::character_gen::{GeneratedCharacter, Selection};

pub use contract::{CollectionContract, ContractError, MintReceipt, RelayContract};
pub use metadata::{build_metadata, NftAttribute, NftMetadata};
pub use pinning::{PinataClient, PinnedContent, PinningError, PinningService};
pub use pipeline::{MintOutcome, MintProgress, MintStatus, MintingPipeline, PipelineError, ProgressSink};
pub use store::{CollectionStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionStatus {
    Preparing,
    Uploading,
    Minting,
    Minted,
    Failed,
}

/// Pinned locations of one character's image and metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedContent {
    pub image: String,
    pub metadata: String,
    pub image_hash: String,
    pub metadata_hash: String,
}

/// A character queued for minting, plus its pinned content once uploaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagedCharacter {
    #[serde(flatten)]
    pub character: GeneratedCharacter,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipfs: Option<UploadedContent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionStats {
    pub total_power: i64,
    pub average_power: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: Uuid,
    /// Requested size; may exceed `characters.len()` when generation skipped failures.
    pub size: usize,
    pub selection: Selection,
    pub characters: Vec<StagedCharacter>,
    pub status: CollectionStatus,
    pub timestamp: DateTime<Utc>,
}

impl Collection {
    pub fn new(selection: Selection, size: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            size,
            selection,
            characters: Vec::with_capacity(size),
            status: CollectionStatus::Preparing,
            timestamp: Utc::now(),
        }
    }

    pub fn push(&mut self, character: GeneratedCharacter) {
        self.characters.push(StagedCharacter {
            character,
            ipfs: None,
        });
    }

    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    pub fn stats(&self) -> CollectionStats {
        let total_power: i64 = self.characters.iter().map(|c| c.character.power()).sum();
        let average_power = if self.characters.is_empty() {
            0
        } else {
            (total_power as f64 / self.characters.len() as f64).round() as i64
        };
        CollectionStats {
            total_power,
            average_power,
        }
    }
}
