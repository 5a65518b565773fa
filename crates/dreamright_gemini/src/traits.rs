//! Generator-facing traits for text and image generation.
//!
//! The generation pipeline depends on these traits rather than on
//! [`crate::GeminiClient`] directly, so pipeline behavior (sequencing,
//! continuity references, skip logic) can be tested with recording mocks.

use async_trait::async_trait;
use dreamright_error::DreamrightResult;

/// A structured text generation request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextRequest {
    /// User prompt
    pub prompt: String,
    /// Optional system instruction
    pub system_instruction: Option<String>,
    /// Sampling temperature
    pub temperature: Option<f32>,
}

/// A reference image attached to an image generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceImage {
    /// What the reference shows, included in the prompt
    pub description: String,
    /// MIME type of the image bytes
    pub mime_type: String,
    /// Raw image bytes
    pub data: Vec<u8>,
}

impl ReferenceImage {
    /// A PNG reference image.
    pub fn png(description: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            description: description.into(),
            mime_type: "image/png".to_string(),
            data,
        }
    }
}

/// An image generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRequest {
    /// Image prompt
    pub prompt: String,
    /// Reference images for visual consistency
    pub references: Vec<ReferenceImage>,
    /// Aspect ratio, e.g. "9:16"
    pub aspect_ratio: String,
    /// Resolution hint, e.g. "1K"
    pub resolution: String,
    /// Skip the cache lookup and regenerate
    pub overwrite_cache: bool,
}

impl Default for ImageRequest {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            references: Vec::new(),
            aspect_ratio: "1:1".to_string(),
            resolution: "1K".to_string(),
            overwrite_cache: false,
        }
    }
}

/// A generated image plus response metadata for the asset sidecar.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    /// Raw image bytes
    pub data: Vec<u8>,
    /// Model, finish reason, token usage, and cache provenance
    pub metadata: serde_json::Value,
}

/// Structured JSON text generation.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a JSON value matching the schema described in the prompt.
    async fn generate_json(&self, request: &TextRequest) -> DreamrightResult<serde_json::Value>;
}

/// Image generation with reference images.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generate an image.
    async fn generate_image(&self, request: &ImageRequest) -> DreamrightResult<GeneratedImage>;

    /// Name of the model producing images, recorded in asset metadata.
    fn image_model(&self) -> &str;
}
