//! Generation pipeline error types.

/// A prerequisite asset that a panel needs before it can be generated.
///
/// Carried inside [`GenerationErrorKind::DependenciesNotMet`] so callers can
/// print actionable resolution steps instead of a bare failure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
#[display("{}: {} ({})", kind, message, resolution)]
pub struct MissingDependency {
    /// Dependency category, e.g. `character_reference` or `location_reference`
    pub kind: String,
    /// Name of the entity the dependency refers to
    pub subject: String,
    /// Human-readable description of what is missing
    pub message: String,
    /// Command the user can run to resolve it
    pub resolution: String,
}

/// Kinds of generation errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum GenerationErrorKind {
    /// Panel generation blocked by missing reference assets
    #[display("{} missing dependencies for chapter {}", missing.len(), chapter)]
    DependenciesNotMet {
        /// Chapter number being generated
        chapter: u32,
        /// The unmet dependencies
        missing: Vec<MissingDependency>,
    },
    /// Model response could not be converted into domain types
    #[display("Failed to convert model response: {}", _0)]
    Conversion(String),
    /// Model returned fewer items than requested
    #[display("Incomplete response: {}", _0)]
    Incomplete(String),
}

/// Generation error with location tracking.
///
/// # Examples
///
/// ```
/// use dreamright_error::{GenerationError, GenerationErrorKind};
///
/// let err = GenerationError::new(GenerationErrorKind::Conversion(
///     "unknown character name".to_string(),
/// ));
/// assert!(format!("{}", err).contains("unknown character"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Generation Error: {} at line {} in {}", kind, line, file)]
pub struct GenerationError {
    /// The kind of error that occurred
    pub kind: GenerationErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl GenerationError {
    /// Create a new generation error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: GenerationErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
