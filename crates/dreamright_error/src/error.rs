//! Top-level error wrapper types.

use crate::{ConfigError, GeminiError, GenerationError, JsonError, ProjectError, StorageError};

/// Foundation error enum aggregating every domain error in the workspace.
///
/// # Examples
///
/// ```
/// use dreamright_error::{DreamrightError, ConfigError};
///
/// let cfg_err = ConfigError::new("missing tier");
/// let err: DreamrightError = cfg_err.into();
/// assert!(format!("{}", err).contains("Configuration Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum DreamrightErrorKind {
    /// JSON serialization/deserialization error
    #[from(JsonError)]
    Json(JsonError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Storage error
    #[from(StorageError)]
    Storage(StorageError),
    /// Gemini error
    #[from(GeminiError)]
    Gemini(GeminiError),
    /// Project entity lookup error
    #[from(ProjectError)]
    Project(ProjectError),
    /// Generation pipeline error
    #[from(GenerationError)]
    Generation(GenerationError),
}

/// Dreamright error with kind discrimination.
///
/// # Examples
///
/// ```
/// use dreamright_error::{DreamrightResult, ConfigError};
///
/// fn might_fail() -> DreamrightResult<()> {
///     Err(ConfigError::new("Missing field"))?
/// }
///
/// match might_fail() {
///     Ok(_) => println!("Success"),
///     Err(e) => println!("Error: {}", e),
/// }
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Dreamright Error: {}", _0)]
pub struct DreamrightError(Box<DreamrightErrorKind>);

impl DreamrightError {
    /// Create a new error from a kind.
    pub fn new(kind: DreamrightErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &DreamrightErrorKind {
        &self.0
    }
}

// Generic From implementation for any type that converts to DreamrightErrorKind
impl<T> From<T> for DreamrightError
where
    T: Into<DreamrightErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Dreamright operations.
///
/// # Examples
///
/// ```
/// use dreamright_error::{DreamrightResult, StorageError, StorageErrorKind};
///
/// fn read_asset() -> DreamrightResult<Vec<u8>> {
///     Err(StorageError::new(StorageErrorKind::NotFound("portrait.png".into())))?
/// }
/// ```
pub type DreamrightResult<T> = std::result::Result<T, DreamrightError>;
