//! JSON file storage for projects and generated assets.

use dreamright_core::Project;
use dreamright_error::{DreamrightResult, JsonError, StorageError, StorageErrorKind};
use std::path::{Path, PathBuf};

const PROJECT_FILE: &str = "project.json";
const ASSETS_DIR: &str = "assets";

/// Storage backend keeping project state in `project.json` and assets as
/// PNG files with JSON metadata sidecars.
///
/// All writes go through a temp file + rename so a crash mid-write never
/// leaves a truncated `project.json` or asset behind.
#[derive(Debug, Clone)]
pub struct JsonStorage {
    root: PathBuf,
}

impl JsonStorage {
    /// Open storage rooted at a project directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The project root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The assets directory under the project root.
    pub fn assets_path(&self) -> PathBuf {
        self.root.join(ASSETS_DIR)
    }

    /// Whether a `project.json` exists at the root.
    pub fn project_exists(&self) -> bool {
        self.root.join(PROJECT_FILE).exists()
    }

    /// Resolve an assets-relative path to an absolute one.
    pub fn absolute_asset_path(&self, relative: &str) -> PathBuf {
        self.assets_path().join(relative)
    }

    /// Whether an asset file exists.
    pub fn asset_exists(&self, relative: &str) -> bool {
        self.absolute_asset_path(relative).exists()
    }

    /// Load the project from `project.json`.
    #[tracing::instrument(skip(self), fields(root = %self.root.display()))]
    pub async fn load_project(&self) -> DreamrightResult<Project> {
        let path = self.root.join(PROJECT_FILE);
        let data = tokio::fs::read_to_string(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::new(StorageErrorKind::NoProject(self.root.display().to_string()))
            } else {
                StorageError::new(StorageErrorKind::FileRead(format!(
                    "{}: {}",
                    path.display(),
                    e
                )))
            }
        })?;

        let project: Project = serde_json::from_str(&data)
            .map_err(|e| JsonError::new(format!("{}: {}", path.display(), e)))?;

        tracing::debug!(name = %project.name, "Loaded project");
        Ok(project)
    }

    /// Save the project to `project.json` atomically.
    #[tracing::instrument(skip(self, project), fields(name = %project.name))]
    pub async fn save_project(&self, project: &Project) -> DreamrightResult<()> {
        let json = serde_json::to_string_pretty(project)
            .map_err(|e| JsonError::new(format!("serializing project: {}", e)))?;

        self.write_atomic(&self.root.join(PROJECT_FILE), json.as_bytes())
            .await?;

        tracing::debug!("Saved project");
        Ok(())
    }

    /// Save an asset image and its metadata sidecar.
    ///
    /// Returns the assets-relative path of the saved image, suitable for
    /// storing in `project.json`. The sidecar lands next to the image with
    /// a `.json` extension.
    #[tracing::instrument(skip(self, data, metadata), fields(folder, filename, size = data.len()))]
    pub async fn save_asset(
        &self,
        folder: &str,
        filename: &str,
        data: &[u8],
        metadata: &serde_json::Value,
    ) -> DreamrightResult<String> {
        let dir = self.assets_path().join(folder);
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                "{}: {}",
                dir.display(),
                e
            )))
        })?;

        let image_path = dir.join(filename);
        self.write_atomic(&image_path, data).await?;

        let sidecar = serde_json::to_string_pretty(metadata)
            .map_err(|e| JsonError::new(format!("serializing asset metadata: {}", e)))?;
        let sidecar_path = image_path.with_extension("json");
        self.write_atomic(&sidecar_path, sidecar.as_bytes()).await?;

        let folder = folder.trim_end_matches('/');
        // An empty folder must not produce a leading slash, which would
        // make the "relative" path resolve as absolute.
        let relative = if folder.is_empty() {
            filename.to_string()
        } else {
            format!("{}/{}", folder, filename)
        };
        tracing::info!(path = %relative, size = data.len(), "Saved asset");
        Ok(relative)
    }

    /// Read an asset by its assets-relative path.
    pub async fn read_asset(&self, relative: &str) -> DreamrightResult<Vec<u8>> {
        let path = self.absolute_asset_path(relative);
        tokio::fs::read(&path)
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    StorageError::new(StorageErrorKind::NotFound(relative.to_string()))
                } else {
                    StorageError::new(StorageErrorKind::FileRead(format!(
                        "{}: {}",
                        path.display(),
                        e
                    )))
                }
            })
            .map_err(Into::into)
    }

    /// Write to a temp file first, then rename for atomicity.
    async fn write_atomic(&self, path: &Path, data: &[u8]) -> DreamrightResult<()> {
        let temp_path = path.with_extension("tmp");
        tokio::fs::write(&temp_path, data).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "{}: {}",
                temp_path.display(),
                e
            )))
        })?;

        tokio::fs::rename(&temp_path, path).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "rename {} to {}: {}",
                temp_path.display(),
                path.display(),
                e
            )))
        })?;

        Ok(())
    }
}
