//! Generation Orchestrator
//!
//! Drives the image generator for one request. Variation mode renders one
//! slot per pose modifier concurrently; each slot fails on its own and the
//! request only fails when every slot did. Collection generation renders
//! characters one at a time and skips failures.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{data_url, ImageGenError, ImageGenerator, ImageRequest, Result, DEFAULT_DIMENSION};
use crate::config::ImageGenConfig;
use crate::core::character_gen::{
    build_prompt, generate_stats, CharacterMetadata, GeneratedCharacter, Selection,
    VARIATION_MODIFIERS,
};
use crate::core::collection::Collection;

// ============================================================================
// Result Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedVariation {
    pub success: bool,
    pub variation: usize,
    /// `data:` URL of the rendered portrait.
    pub image: String,
    pub metadata: CharacterMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedVariation {
    pub success: bool,
    pub variation: usize,
    pub error: String,
}

/// Outcome of one variation slot, serialized as `{success: true, image, ..}`
/// or `{success: false, error, variation}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariationResult {
    Generated(GeneratedVariation),
    Failed(FailedVariation),
}

impl VariationResult {
    fn generated(variation: usize, image: String, metadata: CharacterMetadata) -> Self {
        Self::Generated(GeneratedVariation {
            success: true,
            variation,
            image,
            metadata,
        })
    }

    fn failed(variation: usize, error: String) -> Self {
        Self::Failed(FailedVariation {
            success: false,
            variation,
            error,
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Generated(_))
    }

    pub fn variation(&self) -> usize {
        match self {
            Self::Generated(v) => v.variation,
            Self::Failed(v) => v.variation,
        }
    }

    pub fn as_generated(&self) -> Option<&GeneratedVariation> {
        match self {
            Self::Generated(v) => Some(v),
            Self::Failed(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariationSet {
    pub variations: Vec<VariationResult>,
    pub generated_at: DateTime<Utc>,
}

impl VariationSet {
    pub fn success_count(&self) -> usize {
        self.variations.iter().filter(|v| v.is_success()).count()
    }
}

// ============================================================================
// Options
// ============================================================================

/// Per-deployment image parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDefaults {
    pub width: u32,
    pub height: u32,
    pub negative_prompt: Option<String>,
}

impl Default for ImageDefaults {
    fn default() -> Self {
        Self {
            width: DEFAULT_DIMENSION,
            height: DEFAULT_DIMENSION,
            negative_prompt: None,
        }
    }
}

impl From<&ImageGenConfig> for ImageDefaults {
    fn from(config: &ImageGenConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            negative_prompt: config.negative_prompt.clone(),
        }
    }
}

/// Per-request overrides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationOptions {
    pub variations: bool,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

// ============================================================================
// Orchestrator
// ============================================================================

pub struct GenerationOrchestrator {
    generator: Arc<dyn ImageGenerator>,
    defaults: ImageDefaults,
}

impl GenerationOrchestrator {
    pub fn new(generator: Arc<dyn ImageGenerator>, defaults: ImageDefaults) -> Self {
        Self { generator, defaults }
    }

    fn image_request(&self, prompt: &str, options: &GenerationOptions) -> ImageRequest {
        let request = ImageRequest::new(prompt).with_dimensions(
            options.width.unwrap_or(self.defaults.width),
            options.height.unwrap_or(self.defaults.height),
        );
        match &self.defaults.negative_prompt {
            Some(negative) => request.with_negative_prompt(negative.clone()),
            None => request,
        }
    }

    /// Render one portrait; `variation` selects the pose modifier.
    async fn render(
        &self,
        selection: &Selection,
        variation: Option<usize>,
        options: &GenerationOptions,
    ) -> Result<GeneratedVariation> {
        let prompt = build_prompt(
            &selection.style,
            &selection.character_class,
            &selection.attributes,
            variation,
        );
        let request = self.image_request(&prompt, options);
        let bytes = self.generator.request_image(&request).await?;

        Ok(GeneratedVariation {
            success: true,
            variation: variation.unwrap_or(0),
            image: data_url::encode(&bytes, self.generator.output_format()),
            metadata: CharacterMetadata::new(prompt, selection),
        })
    }

    /// Single-portrait mode: the slot's own error is the request's error.
    pub async fn generate_single(
        &self,
        selection: &Selection,
        options: &GenerationOptions,
    ) -> Result<VariationSet> {
        let rendered = self.render(selection, None, options).await?;
        Ok(VariationSet {
            variations: vec![VariationResult::Generated(rendered)],
            generated_at: Utc::now(),
        })
    }

    /// Render `count` variation slots concurrently.
    ///
    /// Results keep slot order. Fails with
    /// [`ImageGenError::AllVariationsFailed`] only when no slot succeeded.
    pub async fn generate_variations(
        &self,
        selection: &Selection,
        count: usize,
        options: &GenerationOptions,
    ) -> Result<VariationSet> {
        let slots = (0..count.max(1)).map(|index| async move {
            match self.render(selection, Some(index), options).await {
                Ok(rendered) => {
                    VariationResult::generated(index, rendered.image, rendered.metadata)
                }
                Err(e) => {
                    log::warn!("Error generating variation {}: {}", index, e);
                    VariationResult::failed(index, e.to_string())
                }
            }
        });

        let variations = join_all(slots).await;
        if !variations.iter().any(VariationResult::is_success) {
            return Err(ImageGenError::AllVariationsFailed);
        }

        Ok(VariationSet {
            variations,
            generated_at: Utc::now(),
        })
    }

    pub async fn generate(
        &self,
        selection: &Selection,
        options: &GenerationOptions,
    ) -> Result<VariationSet> {
        if options.variations {
            self.generate_variations(selection, VARIATION_MODIFIERS.len(), options)
                .await
        } else {
            self.generate_single(selection, options).await
        }
    }

    /// Render a portrait and roll its stats.
    pub async fn generate_character<R: Rng + Send>(
        &self,
        selection: &Selection,
        rng: &mut R,
    ) -> Result<GeneratedCharacter> {
        let rendered = self
            .render(selection, None, &GenerationOptions::default())
            .await?;
        let (stats, special_power) = generate_stats(
            &selection.character_class,
            selection.attributes.race(),
            selection.attributes.equipment(),
            rng,
        );

        Ok(GeneratedCharacter {
            id: Uuid::new_v4().to_string(),
            image: rendered.image,
            stats,
            special_power,
            metadata: rendered.metadata,
        })
    }

    /// Generate `size` characters one after another.
    ///
    /// A failed character is logged and skipped. `on_progress` receives the
    /// completion percentage after each successful character.
    pub async fn generate_collection<R, F>(
        &self,
        selection: &Selection,
        size: usize,
        rng: &mut R,
        mut on_progress: F,
    ) -> Collection
    where
        R: Rng + Send,
        F: FnMut(f64) + Send,
    {
        let mut collection = Collection::new(selection.clone(), size);

        for i in 0..size {
            let serial = i + 1;
            match self.generate_character(selection, rng).await {
                Ok(mut character) => {
                    character.id = format!("char-{}", serial);
                    character.metadata.name = Some(format!("Character #{}", serial));
                    character.metadata.serial_number = u32::try_from(serial).ok();
                    collection.push(character);
                    on_progress((serial as f64 / size as f64) * 100.0);
                }
                Err(e) => {
                    log::warn!("Failed to generate character {}: {}", serial, e);
                }
            }
        }

        log::info!(
            "Generated {} of {} requested characters",
            collection.len(),
            size
        );
        collection
    }
}
