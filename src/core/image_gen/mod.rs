//! Image Generation
//!
//! Provider-agnostic portrait rendering:
//! - [`ImageGenerator`] - trait implemented by HTTP image providers
//! - [`providers`] - concrete clients (Stability)
//! - [`orchestrator`] - variation fan-out and collection generation
//! - [`data_url`] - `data:` URL encoding for rendered bytes

pub mod data_url;
pub mod orchestrator;
pub mod providers;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::character_gen::CharacterGenError;

pub use orchestrator::{GenerationOrchestrator, ImageDefaults, VariationResult, VariationSet};
pub use providers::StabilityProvider;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug)]
pub enum ImageGenError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("{message}")]
    Upstream { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error(transparent)]
    Validation(#[from] CharacterGenError),

    #[error("Failed to generate any variations")]
    AllVariationsFailed,
}

pub type Result<T> = std::result::Result<T, ImageGenError>;

// ============================================================================
// Request Types
// ============================================================================

pub const MIN_DIMENSION: u32 = 200;
pub const MAX_DIMENSION: u32 = 1024;
pub const DEFAULT_DIMENSION: u32 = 512;

/// Clamp a requested edge length into the provider's accepted range.
pub fn clamp_dimension(value: u32) -> u32 {
    value.clamp(MIN_DIMENSION, MAX_DIMENSION)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Webp,
    Png,
    Jpeg,
}

impl ImageFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Webp => "webp",
            Self::Png => "png",
            Self::Jpeg => "jpeg",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Webp => "image/webp",
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            other => other.as_str(),
        }
    }

    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "image/webp" => Some(Self::Webp),
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub prompt: String,
    pub width: u32,
    pub height: u32,
    pub negative_prompt: Option<String>,
}

impl ImageRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            width: DEFAULT_DIMENSION,
            height: DEFAULT_DIMENSION,
            negative_prompt: None,
        }
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = clamp_dimension(width);
        self.height = clamp_dimension(height);
        self
    }

    pub fn with_negative_prompt(mut self, negative_prompt: impl Into<String>) -> Self {
        self.negative_prompt = Some(negative_prompt.into());
        self
    }
}

// ============================================================================
// Provider Trait
// ============================================================================

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    fn id(&self) -> &'static str;

    /// Encoding of the bytes returned by [`request_image`](Self::request_image).
    fn output_format(&self) -> ImageFormat;

    /// Render one image. Any non-success status is a hard failure.
    async fn request_image(&self, request: &ImageRequest) -> Result<Vec<u8>>;
}
