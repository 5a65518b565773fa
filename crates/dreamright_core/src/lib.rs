//! Core data types for the Dreamright webtoon generation pipeline.
//!
//! These types mirror the on-disk `project.json` schema. Everything
//! serializes with snake_case field names and snake_case enum values so
//! projects stay hand-editable and diff-friendly.
//!
//! # Examples
//!
//! ```
//! use dreamright_core::{Project, ProjectFormat};
//!
//! let project = Project::new("My Webtoon", ProjectFormat::Webtoon);
//! assert_eq!(project.name, "My Webtoon");
//! assert!(project.story.is_none());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod character;
mod chapter;
mod location;
mod project;
mod story;

pub use character::{Character, CharacterAssets, CharacterDescription, CharacterRole};
pub use chapter::{
    CameraAngle, Chapter, ChapterStatus, Dialogue, DialogueType, Panel, PanelCharacter,
    PanelComposition, Scene, ShotType,
};
pub use location::{Location, LocationAssets, LocationType, TimeOfDay};
pub use project::{Project, ProjectFormat, ProjectStatus};
pub use story::{Genre, Story, StoryBeat, Tone};
