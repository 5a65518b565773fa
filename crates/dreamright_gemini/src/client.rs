//! Gemini REST client with rate limiting, retry, and response caching.

use crate::api::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Part,
};
use crate::config::{DreamrightConfig, GeminiSettings, TierConfig};
use crate::limiter::RateLimiter;
use crate::traits::{GeneratedImage, ImageGenerator, ImageRequest, TextGenerator, TextRequest};
use crate::ResponseCache;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use dreamright_error::{DreamrightResult, GeminiError, GeminiErrorKind, JsonError};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

// Image output is billed flat per image on current models
const IMAGE_OUTPUT_TOKENS: u64 = 1290;

/// Client for the Gemini REST API.
///
/// Text and image models carry independent rate limiters because
/// providers publish separate quotas for them. All calls go through
/// [`RateLimiter::execute`], which combines quota waits with
/// exponential-backoff retry on transient errors.
///
/// # Example
///
/// ```no_run
/// use dreamright_gemini::{GeminiClient, ImageGenerator, ImageRequest};
///
/// # async fn demo() -> dreamright_error::DreamrightResult<()> {
/// let client = GeminiClient::new()?;
/// let image = client
///     .generate_image(&ImageRequest {
///         prompt: "A rooftop cafe at dusk, webtoon style".to_string(),
///         aspect_ratio: "16:9".to_string(),
///         ..Default::default()
///     })
///     .await?;
/// assert!(!image.data.is_empty());
/// # Ok(())
/// # }
/// ```
pub struct GeminiClient {
    http: reqwest::Client,
    settings: GeminiSettings,
    text_limiter: RateLimiter<TierConfig>,
    image_limiter: RateLimiter<TierConfig>,
    cache: ResponseCache,
}

impl GeminiClient {
    /// Create a client from the environment and `dreamright.toml` tiers,
    /// using the user-level response cache.
    pub fn new() -> DreamrightResult<Self> {
        let settings = GeminiSettings::from_env()?;
        let config = DreamrightConfig::load()?;
        Self::with_settings(settings, &config, ResponseCache::user())
    }

    /// Create a client with explicit settings, tier config, and cache.
    #[instrument(skip_all, fields(text_model = %settings.text_model, image_model = %settings.image_model))]
    pub fn with_settings(
        settings: GeminiSettings,
        config: &DreamrightConfig,
        cache: ResponseCache,
    ) -> DreamrightResult<Self> {
        let base_tier = config
            .get_tier("gemini", settings.tier.as_deref())
            .unwrap_or_else(|| TierConfig {
                name: "Free".to_string(),
                rpm: Some(15),
                tpm: Some(250_000),
                rpd: Some(250),
                max_concurrent: Some(1),
                models: Default::default(),
            });

        let text_limiter = RateLimiter::new(base_tier.for_model(&settings.text_model));
        let image_limiter = RateLimiter::new(base_tier.for_model(&settings.image_model));

        info!(tier = %base_tier.name, "Created Gemini client");
        Ok(Self {
            http: reqwest::Client::new(),
            settings,
            text_limiter,
            image_limiter,
            cache,
        })
    }

    /// The model used for structured text generation.
    pub fn text_model(&self) -> &str {
        &self.settings.text_model
    }

    /// Generate structured output and deserialize it into `T`.
    ///
    /// Requests `application/json` output and tolerates models that wrap
    /// the JSON in markdown fences anyway.
    pub async fn generate_structured<T: DeserializeOwned>(
        &self,
        request: &TextRequest,
    ) -> DreamrightResult<T> {
        let value = self.generate_json(request).await?;
        serde_json::from_value(value)
            .map_err(|e| JsonError::new(format!("response did not match schema: {}", e)).into())
    }

    #[instrument(skip(self, body), fields(model))]
    async fn post_generate(
        &self,
        model: &str,
        body: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GeminiError> {
        let url = format!("{}/models/{}:generateContent", API_BASE, model);

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.settings.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| GeminiError::new(GeminiErrorKind::ApiRequest(e.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GeminiError::new(GeminiErrorKind::HttpError {
                status_code: status.as_u16(),
                message,
            }));
        }

        response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| GeminiError::new(GeminiErrorKind::InvalidResponse(e.to_string())))
    }

    fn estimate_tokens(text: &str) -> u64 {
        (text.len() as u64 / 4).max(1)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    #[instrument(skip(self, request), fields(prompt_len = request.prompt.len()))]
    async fn generate_json(&self, request: &TextRequest) -> DreamrightResult<serde_json::Value> {
        let body = GenerateContentRequest {
            contents: vec![Content::user(vec![Part::text(&request.prompt)])],
            system_instruction: request.system_instruction.as_deref().map(Content::system),
            generation_config: Some(GenerationConfig {
                temperature: request.temperature,
                response_mime_type: Some("application/json".to_string()),
                response_modalities: None,
            }),
        };

        let estimated = Self::estimate_tokens(&request.prompt);
        let response = self
            .text_limiter
            .execute(estimated, || {
                self.post_generate(&self.settings.text_model, &body)
            })
            .await?;

        let candidate = response
            .candidates
            .first()
            .ok_or_else(|| GeminiError::new(GeminiErrorKind::EmptyResponse))?;

        let raw = candidate.text();
        let text = strip_markdown_fences(&raw);
        if text.is_empty() {
            return Err(GeminiError::new(GeminiErrorKind::EmptyResponse).into());
        }

        debug!(response_len = text.len(), "Parsed structured response");
        serde_json::from_str(text)
            .map_err(|e| JsonError::new(format!("invalid JSON in response: {}", e)).into())
    }
}

#[async_trait]
impl ImageGenerator for GeminiClient {
    #[instrument(skip(self, request), fields(refs = request.references.len(), aspect = %request.aspect_ratio))]
    async fn generate_image(&self, request: &ImageRequest) -> DreamrightResult<GeneratedImage> {
        // Aspect ratio and resolution ride along in the prompt and the
        // cache key, so changing either regenerates
        let prompt = format!(
            "{}\n\nImage format: {} aspect ratio, {} resolution.",
            request.prompt, request.aspect_ratio, request.resolution
        );

        let reference_bytes: Vec<&[u8]> = request
            .references
            .iter()
            .map(|r| r.data.as_slice())
            .collect();
        let params = format!("{}/{}", request.aspect_ratio, request.resolution);
        let cache_key = ResponseCache::key(
            &self.settings.image_model,
            &prompt,
            &reference_bytes,
            &params,
        );

        if !request.overwrite_cache {
            if let Some(data) = self.cache.get(&cache_key).await {
                // The sidecar preserves the original generation record;
                // only the cached flag changes on a hit
                let mut metadata = self
                    .cache
                    .get_metadata(&cache_key)
                    .await
                    .unwrap_or_else(|| serde_json::json!({
                        "model": self.settings.image_model,
                        "cache_key": cache_key,
                    }));
                if let Some(map) = metadata.as_object_mut() {
                    map.insert("cached".to_string(), serde_json::Value::Bool(true));
                }
                return Ok(GeneratedImage { data, metadata });
            }
        }

        let mut parts = Vec::with_capacity(1 + request.references.len() * 2);
        parts.push(Part::text(&prompt));
        for reference in &request.references {
            parts.push(Part::text(format!("Reference image: {}", reference.description)));
            parts.push(Part::inline_image(
                &reference.mime_type,
                BASE64.encode(&reference.data),
            ));
        }

        let body = GenerateContentRequest {
            contents: vec![Content::user(parts)],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                temperature: None,
                response_mime_type: None,
                response_modalities: Some(vec!["IMAGE".to_string()]),
            }),
        };

        let estimated = Self::estimate_tokens(&prompt) + IMAGE_OUTPUT_TOKENS;
        let response = self
            .image_limiter
            .execute(estimated, || {
                self.post_generate(&self.settings.image_model, &body)
            })
            .await?;

        let candidate = response
            .candidates
            .first()
            .ok_or_else(|| GeminiError::new(GeminiErrorKind::EmptyResponse))?;
        let inline = candidate
            .inline_image()
            .ok_or_else(|| GeminiError::new(GeminiErrorKind::MissingImage))?;

        let data = BASE64
            .decode(&inline.data)
            .map_err(|e| GeminiError::new(GeminiErrorKind::Base64Decode(e.to_string())))?;

        let metadata = serde_json::json!({
            "model": response
                .model_version
                .clone()
                .unwrap_or_else(|| self.settings.image_model.clone()),
            "finish_reason": candidate.finish_reason,
            "usage": response.usage_metadata.as_ref().map(|u| serde_json::json!({
                "prompt_tokens": u.prompt_token_count,
                "candidate_tokens": u.candidates_token_count,
                "total_tokens": u.total_token_count,
            })),
            "cached": false,
            "cache_key": cache_key,
        });

        self.cache.put(&cache_key, &data, &metadata).await;

        info!(size = data.len(), "Generated image");
        Ok(GeneratedImage { data, metadata })
    }

    fn image_model(&self) -> &str {
        &self.settings.image_model
    }
}

/// Strip leading/trailing markdown code fences from model output.
fn strip_markdown_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an optional language tag after the opening fence
    let rest = rest
        .split_once('\n')
        .map(|(_, body)| body)
        .unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fences_with_language_tag() {
        assert_eq!(
            strip_markdown_fences("```json\n{\"a\": 1}\n```"),
            "{\"a\": 1}"
        );
        assert_eq!(strip_markdown_fences("```\n[1, 2]\n```"), "[1, 2]");
        assert_eq!(strip_markdown_fences("  {\"a\": 1} "), "{\"a\": 1}");
    }

    #[test]
    fn token_estimate_never_zero() {
        assert_eq!(GeminiClient::estimate_tokens(""), 1);
        assert_eq!(GeminiClient::estimate_tokens("12345678"), 2);
    }
}
