//! Project lifecycle management.

use crate::JsonStorage;
use dreamright_core::{Project, ProjectFormat};
use dreamright_error::{DreamrightResult, StorageError, StorageErrorKind};
use std::path::Path;

/// Owns the in-memory [`Project`] and the storage backing it.
///
/// # Examples
///
/// ```no_run
/// use dreamright_core::ProjectFormat;
/// use dreamright_storage::ProjectManager;
///
/// # async fn demo() -> dreamright_error::DreamrightResult<()> {
/// let mut manager =
///     ProjectManager::create("./my-webtoon", "My Webtoon", ProjectFormat::Webtoon).await?;
/// manager.project.original_prompt = Some("A barista and her ghost customers".to_string());
/// manager.save().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ProjectManager {
    /// Storage backend rooted at the project directory
    pub storage: JsonStorage,
    /// The loaded project state
    pub project: Project,
}

impl ProjectManager {
    /// Create a new project at `path`.
    ///
    /// Fails if the directory already contains visible files. Hidden files
    /// (dotfiles such as `.env`) are tolerated so projects can be created in
    /// a freshly prepared directory.
    #[tracing::instrument(skip(path), fields(name))]
    pub async fn create(
        path: impl AsRef<Path>,
        name: &str,
        format: ProjectFormat,
    ) -> DreamrightResult<Self> {
        let path = path.as_ref();

        if path.exists() && !Self::dir_is_effectively_empty(path)? {
            return Err(StorageError::new(StorageErrorKind::ProjectExists(
                path.display().to_string(),
            ))
            .into());
        }

        tokio::fs::create_dir_all(path.join("assets"))
            .await
            .map_err(|e| {
                StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                    "{}: {}",
                    path.display(),
                    e
                )))
            })?;

        let storage = JsonStorage::new(path);
        let project = Project::new(name, format);
        storage.save_project(&project).await?;

        tracing::info!(name = %project.name, path = %path.display(), "Created project");
        Ok(Self { storage, project })
    }

    /// Load an existing project from `path`.
    pub async fn load(path: impl AsRef<Path>) -> DreamrightResult<Self> {
        let storage = JsonStorage::new(path.as_ref());
        let project = storage.load_project().await?;
        Ok(Self { storage, project })
    }

    /// Whether a project exists at `path`.
    pub fn exists(path: impl AsRef<Path>) -> bool {
        path.as_ref().join("project.json").exists()
    }

    /// Persist the current project state, bumping `updated_at`.
    pub async fn save(&mut self) -> DreamrightResult<()> {
        self.project.updated_at = chrono::Utc::now();
        self.storage.save_project(&self.project).await
    }

    /// Save an asset and return its assets-relative path.
    pub async fn save_asset(
        &self,
        folder: &str,
        filename: &str,
        data: &[u8],
        metadata: &serde_json::Value,
    ) -> DreamrightResult<String> {
        self.storage.save_asset(folder, filename, data, metadata).await
    }

    fn dir_is_effectively_empty(path: &Path) -> DreamrightResult<bool> {
        let entries = std::fs::read_dir(path).map_err(|e| {
            StorageError::new(StorageErrorKind::FileRead(format!(
                "{}: {}",
                path.display(),
                e
            )))
        })?;
        for entry in entries {
            let entry = entry.map_err(|e| {
                StorageError::new(StorageErrorKind::FileRead(format!(
                    "{}: {}",
                    path.display(),
                    e
                )))
            })?;
            if !entry.file_name().to_string_lossy().starts_with('.') {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
