use async_trait::async_trait;
use reqwest::{multipart, Client};

use crate::config::ImageGenConfig;
use crate::core::image_gen::{ImageFormat, ImageGenError, ImageGenerator, ImageRequest, Result};

/// Stability AI "stable-image" client.
pub struct StabilityProvider {
    client: Client,
    config: ImageGenConfig,
}

impl StabilityProvider {
    pub fn new(config: ImageGenConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[async_trait]
impl ImageGenerator for StabilityProvider {
    fn id(&self) -> &'static str {
        "stability"
    }

    fn output_format(&self) -> ImageFormat {
        self.config.output_format
    }

    async fn request_image(&self, request: &ImageRequest) -> Result<Vec<u8>> {
        if self.config.api_key.is_empty() {
            return Err(ImageGenError::NotConfigured("STABILITY_API_KEY".to_string()));
        }

        let mut form = multipart::Form::new()
            .text("prompt", request.prompt.clone())
            .text("output_format", self.config.output_format.as_str())
            .text("width", request.width.to_string())
            .text("height", request.height.to_string());
        if let Some(negative) = &request.negative_prompt {
            form = form.text("negative_prompt", negative.clone());
        }

        log::debug!(
            "Requesting {}x{} image from {}",
            request.width,
            request.height,
            self.config.endpoint
        );

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .header("Accept", "image/*")
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            log::error!("Stability AI API Error: {}", status.as_u16());
            return Err(ImageGenError::Upstream {
                status: status.as_u16(),
                message: format!("Stability AI API Error: {}", status.as_u16()),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}
