//! TOML-based configuration for rate limits and client settings.
//!
//! Rate limit tiers load with a precedence system:
//! 1. Bundled defaults (`dreamright.toml` shipped with the crate)
//! 2. User config in the home directory (`~/.config/dreamright/dreamright.toml`)
//! 3. User config in the current directory (`./dreamright.toml`)
//!
//! API credentials come from the environment, never from TOML.

use crate::Tier;
use config::{Config, File, FileFormat};
use dreamright_error::{ConfigError, DreamrightResult, GeminiError, GeminiErrorKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, instrument};

/// Model-specific rate limit overrides.
///
/// Only specified fields override the tier-level defaults.
///
/// ```toml
/// [providers.gemini.tiers.free.models."gemini-2.5-flash-image"]
/// rpm = 10
/// rpd = 100
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
pub struct ModelTierConfig {
    /// Requests per minute limit (overrides tier default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpm: Option<u32>,

    /// Tokens per minute limit (overrides tier default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tpm: Option<u64>,

    /// Requests per day limit (overrides tier default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpd: Option<u32>,

    /// Maximum concurrent requests (overrides tier default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrent: Option<u32>,
}

/// Configuration for a specific API tier.
///
/// Implements [`Tier`] so it can drive a `RateLimiter` directly. `None`
/// means unlimited.
///
/// ```toml
/// [providers.gemini.tiers.free]
/// name = "Free"
/// rpm = 10
/// tpm = 250_000
/// rpd = 250
/// max_concurrent = 1
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TierConfig {
    /// Name of the tier (e.g., "Free", "Tier 1")
    pub name: String,

    /// Requests per minute limit
    #[serde(default)]
    pub rpm: Option<u32>,

    /// Tokens per minute limit
    #[serde(default)]
    pub tpm: Option<u64>,

    /// Requests per day limit
    #[serde(default)]
    pub rpd: Option<u32>,

    /// Maximum concurrent requests
    #[serde(default)]
    pub max_concurrent: Option<u32>,

    /// Model-specific overrides
    #[serde(default)]
    pub models: HashMap<String, ModelTierConfig>,
}

impl TierConfig {
    /// Resolve the effective limits for a model, applying any model-specific
    /// overrides on top of the tier defaults.
    pub fn for_model(&self, model: &str) -> TierConfig {
        let Some(overrides) = self.models.get(model) else {
            return self.clone();
        };
        TierConfig {
            name: self.name.clone(),
            rpm: overrides.rpm.or(self.rpm),
            tpm: overrides.tpm.or(self.tpm),
            rpd: overrides.rpd.or(self.rpd),
            max_concurrent: overrides.max_concurrent.or(self.max_concurrent),
            models: HashMap::new(),
        }
    }
}

impl Tier for TierConfig {
    fn rpm(&self) -> Option<u32> {
        self.rpm
    }

    fn tpm(&self) -> Option<u64> {
        self.tpm
    }

    fn rpd(&self) -> Option<u32> {
        self.rpd
    }

    fn max_concurrent(&self) -> Option<u32> {
        self.max_concurrent
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Configuration for a provider.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProviderConfig {
    /// Name of the default tier for this provider
    pub default_tier: String,

    /// Map of tier name to tier configuration
    pub tiers: HashMap<String, TierConfig>,
}

/// Top-level Dreamright configuration.
///
/// # Example
///
/// ```no_run
/// use dreamright_gemini::DreamrightConfig;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = DreamrightConfig::load()?;
/// let tier = config.get_tier("gemini", None).unwrap();
/// println!("RPM: {:?}", tier.rpm);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
pub struct DreamrightConfig {
    /// Map of provider name to provider configuration
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

impl DreamrightConfig {
    /// Load configuration from a specific file path.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> DreamrightResult<Self> {
        debug!("Loading configuration from file");

        Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .map_err(|e| {
                ConfigError::new(format!(
                    "Failed to read configuration from {}: {}",
                    path.as_ref().display(),
                    e
                ))
            })?
            .try_deserialize()
            .map_err(|e| ConfigError::new(format!("Failed to parse configuration: {}", e)).into())
    }

    /// Load configuration with precedence: current dir > home dir > bundled defaults.
    ///
    /// User config files are optional and silently skipped when absent.
    #[instrument]
    pub fn load() -> DreamrightResult<Self> {
        debug!("Loading configuration with precedence: current dir > home dir > bundled defaults");

        const DEFAULT_CONFIG: &str = include_str!("../../../dreamright.toml");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/dreamright/dreamright.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder.add_source(File::with_name("dreamright").required(false));

        builder
            .build()
            .map_err(|e| ConfigError::new(format!("Failed to build configuration: {}", e)))?
            .try_deserialize()
            .map_err(|e| ConfigError::new(format!("Failed to parse configuration: {}", e)).into())
    }

    /// Get tier configuration for a provider, using the provider's default
    /// tier when `tier_name` is `None`.
    #[instrument(skip(self))]
    pub fn get_tier(&self, provider: &str, tier_name: Option<&str>) -> Option<TierConfig> {
        let provider_config = self.providers.get(provider)?;
        let tier = tier_name.unwrap_or(&provider_config.default_tier);

        debug!(provider, tier, "Looking up tier configuration");
        provider_config.tiers.get(tier).cloned()
    }
}

/// Client settings resolved from the environment.
#[derive(Debug, Clone)]
pub struct GeminiSettings {
    /// API key for the Gemini REST API
    pub api_key: String,
    /// Model used for structured text generation
    pub text_model: String,
    /// Model used for image generation
    pub image_model: String,
    /// Rate limit tier name, `None` for the provider default
    pub tier: Option<String>,
}

impl GeminiSettings {
    /// Read settings from the environment.
    ///
    /// The API key comes from `GOOGLE_API_KEY`, falling back to
    /// `GEMINI_API_KEY`. Model names can be overridden with
    /// `DREAMRIGHT_TEXT_MODEL` and `DREAMRIGHT_IMAGE_MODEL`, and the rate
    /// limit tier with `DREAMRIGHT_TIER`.
    pub fn from_env() -> DreamrightResult<Self> {
        let api_key = std::env::var("GOOGLE_API_KEY")
            .or_else(|_| std::env::var("GEMINI_API_KEY"))
            .map_err(|_| GeminiError::new(GeminiErrorKind::MissingApiKey))?;

        Ok(Self {
            api_key,
            text_model: std::env::var("DREAMRIGHT_TEXT_MODEL")
                .unwrap_or_else(|_| "gemini-2.5-flash".to_string()),
            image_model: std::env::var("DREAMRIGHT_IMAGE_MODEL")
                .unwrap_or_else(|_| "gemini-2.5-flash-image".to_string()),
            tier: std::env::var("DREAMRIGHT_TIER").ok(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tier_with_override() -> TierConfig {
        let mut models = HashMap::new();
        models.insert(
            "gemini-2.5-flash-image".to_string(),
            ModelTierConfig {
                rpm: Some(10),
                rpd: Some(100),
                ..Default::default()
            },
        );
        TierConfig {
            name: "Free".to_string(),
            rpm: Some(15),
            tpm: Some(250_000),
            rpd: Some(250),
            max_concurrent: Some(1),
            models,
        }
    }

    #[test]
    fn model_override_wins_but_inherits_gaps() {
        let tier = tier_with_override();
        let resolved = tier.for_model("gemini-2.5-flash-image");
        assert_eq!(resolved.rpm, Some(10));
        assert_eq!(resolved.rpd, Some(100));
        assert_eq!(resolved.tpm, Some(250_000));
        assert_eq!(resolved.max_concurrent, Some(1));
    }

    #[test]
    fn unknown_model_uses_tier_defaults() {
        let tier = tier_with_override();
        let resolved = tier.for_model("gemini-2.5-flash");
        assert_eq!(resolved.rpm, Some(15));
        assert_eq!(resolved.rpd, Some(250));
    }

    #[test]
    fn bundled_defaults_parse() {
        let config = DreamrightConfig::load().unwrap();
        let tier = config.get_tier("gemini", None).unwrap();
        assert!(tier.rpm.is_some());

        assert!(config.get_tier("gemini", Some("missing")).is_none());
        assert!(config.get_tier("openai", None).is_none());
    }
}
