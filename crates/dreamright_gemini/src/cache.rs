//! Disk cache for generated images.
//!
//! Image generation is the expensive half of a pipeline run, so responses
//! are cached on disk keyed by a SHA-256 over everything that affects the
//! output: model, prompt, reference image bytes, and generation
//! parameters. Each entry holds the image payload plus a JSON metadata
//! sidecar recording the original generation. `--overwrite` bypasses the
//! lookup but still refreshes the stored entry.

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Content-keyed disk cache.
///
/// Entries live two directory levels deep
/// (`{base}/{key[0:2]}/{key[2:4]}/{key}`) to keep directory sizes sane.
#[derive(Debug, Clone)]
pub struct ResponseCache {
    base_path: PathBuf,
}

impl ResponseCache {
    /// Open a cache rooted at `base_path`.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Open the user-level cache under the platform cache directory,
    /// falling back to `.cache/` in the current directory.
    pub fn user() -> Self {
        let base = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from(".cache"))
            .join("dreamright");
        Self::new(base)
    }

    /// Compute a cache key over the request inputs.
    ///
    /// The key is stable across runs: same model, prompt, references, and
    /// parameters always hash to the same entry.
    pub fn key(model: &str, prompt: &str, references: &[&[u8]], params: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(model.as_bytes());
        hasher.update([0u8]);
        hasher.update(prompt.as_bytes());
        hasher.update([0u8]);
        for reference in references {
            hasher.update(Sha256::digest(reference));
        }
        hasher.update(params.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.base_path.join(&key[0..2]).join(&key[2..4]).join(key)
    }

    /// Look up a cached response.
    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let path = self.entry_path(key);
        match tokio::fs::read(&path).await {
            Ok(data) => {
                debug!(key, size = data.len(), "Cache hit");
                Some(data)
            }
            Err(_) => None,
        }
    }

    /// Look up the metadata sidecar stored alongside a cached response.
    pub async fn get_metadata(&self, key: &str) -> Option<serde_json::Value> {
        let path = self.entry_path(key).with_extension("json");
        let bytes = tokio::fs::read(&path).await.ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    /// Store a response and its metadata sidecar. Failures are logged and
    /// swallowed; a missed cache write must never fail the generation that
    /// produced the data.
    pub async fn put(&self, key: &str, data: &[u8], metadata: &serde_json::Value) {
        let path = self.entry_path(key);
        if let Some(parent) = path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                debug!(key, error = %e, "Cache directory creation failed");
                return;
            }
        }

        if let Err(e) = self.write_atomic(&path, data).await {
            debug!(key, error = %e, "Cache write failed");
            return;
        }

        match serde_json::to_vec_pretty(metadata) {
            Ok(sidecar) => {
                let sidecar_path = path.with_extension("json");
                if let Err(e) = self.write_atomic(&sidecar_path, &sidecar).await {
                    debug!(key, error = %e, "Cache sidecar write failed");
                }
            }
            Err(e) => debug!(key, error = %e, "Cache metadata serialization failed"),
        }
    }

    async fn write_atomic(&self, path: &Path, data: &[u8]) -> std::io::Result<()> {
        let mut temp = path.as_os_str().to_owned();
        temp.push(".tmp");
        let temp_path = PathBuf::from(temp);
        tokio::fs::write(&temp_path, data).await?;
        tokio::fs::rename(&temp_path, path).await
    }

    /// The cache root directory.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn key_is_stable_and_input_sensitive() {
        let refs: Vec<&[u8]> = vec![b"ref-image"];
        let a = ResponseCache::key("model-a", "a rooftop at dusk", &refs, "16:9/1K");
        let b = ResponseCache::key("model-a", "a rooftop at dusk", &refs, "16:9/1K");
        assert_eq!(a, b);

        let different_prompt = ResponseCache::key("model-a", "a rooftop at dawn", &refs, "16:9/1K");
        assert_ne!(a, different_prompt);

        let different_refs = ResponseCache::key("model-a", "a rooftop at dusk", &[], "16:9/1K");
        assert_ne!(a, different_refs);

        let different_params = ResponseCache::key("model-a", "a rooftop at dusk", &refs, "9:16/1K");
        assert_ne!(a, different_params);
    }

    #[tokio::test]
    async fn round_trips_through_disk() {
        let temp_dir = TempDir::new().unwrap();
        let cache = ResponseCache::new(temp_dir.path());

        let key = ResponseCache::key("m", "p", &[], "");
        assert!(cache.get(&key).await.is_none());
        assert!(cache.get_metadata(&key).await.is_none());

        let metadata = serde_json::json!({"model": "m", "finish_reason": "STOP"});
        cache.put(&key, b"image-bytes", &metadata).await;
        assert_eq!(cache.get(&key).await.unwrap(), b"image-bytes");
        assert_eq!(cache.get_metadata(&key).await.unwrap(), metadata);
    }
}
