//! Dreamright: AI-assisted webtoon and short-drama production.
//!
//! This crate ties the workspace together behind the `dreamright` binary
//! and re-exports the pieces integration code needs: domain types, the
//! rate-limited Gemini client, storage, and the generation pipeline.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod batch;
mod cli;

pub use batch::{BatchEntry, BatchQueue, BatchRunner, BatchSummary};
pub use cli::{Cli, Commands, GenerateCommands};

pub use dreamright_core::{
    Chapter, ChapterStatus, Character, CharacterRole, Genre, Location, LocationType, Panel,
    Project, ProjectFormat, ProjectStatus, Scene, ShotType, Story, StoryBeat, TimeOfDay, Tone,
};
pub use dreamright_error::{DreamrightError, DreamrightErrorKind, DreamrightResult};
pub use dreamright_gemini::{
    DreamrightConfig, GeminiClient, GeminiSettings, ImageGenerator, RateLimiter, TextGenerator,
    TierConfig,
};
pub use dreamright_generators::{
    ChapterGenerator, CharacterGenerator, LocationGenerator, PanelGenerator, StoryExpander,
};
pub use dreamright_storage::{JsonStorage, ProjectManager, slugify};
