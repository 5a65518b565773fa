//! Rate-limited Gemini API client for Dreamright.
//!
//! Talks to the Gemini REST API (`v1beta` `generateContent`) for both
//! structured JSON text generation and image generation with reference
//! images. Every request passes through a [`RateLimiter`] configured from
//! `dreamright.toml` tiers, and image responses are cached on disk so
//! reruns of a pipeline don't spend quota on panels that already exist.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod api;
mod cache;
mod client;
mod config;
mod limiter;
mod tier;
mod traits;

pub use api::{
    Candidate, Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
    InlineData, Part, UsageMetadata,
};
pub use cache::ResponseCache;
pub use client::GeminiClient;
pub use config::{DreamrightConfig, GeminiSettings, ModelTierConfig, ProviderConfig, TierConfig};
pub use limiter::{RateLimiter, RateLimiterGuard};
pub use tier::Tier;
pub use traits::{
    GeneratedImage, ImageGenerator, ImageRequest, ReferenceImage, TextGenerator, TextRequest,
};
