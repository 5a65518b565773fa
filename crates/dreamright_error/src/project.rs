//! Project entity lookup error types.

/// Kinds of project lookup errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum ProjectErrorKind {
    /// Character not found by name or id
    #[display("Character not found: {}", _0)]
    CharacterNotFound(String),
    /// Location not found by name or id
    #[display("Location not found: {}", _0)]
    LocationNotFound(String),
    /// Chapter number outside the expanded story
    #[display("Chapter {} not found", _0)]
    ChapterNotFound(u32),
    /// Scene number outside the chapter
    #[display("Scene {} not found in chapter {}", scene, chapter)]
    SceneNotFound {
        /// Chapter number
        chapter: u32,
        /// Scene number
        scene: u32,
    },
    /// Panel number outside the scene
    #[display("Panel {} not found in chapter {} scene {}", panel, chapter, scene)]
    PanelNotFound {
        /// Chapter number
        chapter: u32,
        /// Scene number
        scene: u32,
        /// Panel number
        panel: u32,
    },
    /// Story has not been expanded yet
    #[display("Story has not been expanded, run 'dreamright expand' first")]
    StoryMissing,
}

/// Project error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Project Error: {} at line {} in {}", kind, line, file)]
pub struct ProjectError {
    /// The kind of error that occurred
    pub kind: ProjectErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl ProjectError {
    /// Create a new project error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ProjectErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
