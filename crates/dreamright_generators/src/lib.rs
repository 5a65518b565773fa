//! Generation pipeline for DreamRight projects.
//!
//! Each generator borrows a [`dreamright_gemini::TextGenerator`] or
//! [`dreamright_gemini::ImageGenerator`] rather than the concrete client,
//! and a [`dreamright_storage::ProjectManager`] for state and assets:
//!
//! - [`StoryExpander`] turns a one-line idea into a full story bible.
//! - [`CharacterGenerator`] produces portraits and reference sheets.
//! - [`LocationGenerator`] produces backgrounds per time of day.
//! - [`ChapterGenerator`] expands a story beat into scenes and panels.
//! - [`PanelGenerator`] renders panel images in strict sequence, threading
//!   each panel's output into the next as a continuity reference.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod chapter;
mod character;
mod location;
mod panel;
mod story;
mod templates;

pub use chapter::{ChapterGenerator, format_chapter_result};
pub use character::{CharacterGenOptions, CharacterGenerator};
pub use location::{LocationGenOptions, LocationGenerator};
pub use panel::{
    OneOffPanel, PanelGenOptions, PanelGenerator, PanelResult, PanelStatus, count_status,
};
pub use story::{ExpandOptions, StoryExpander, StoryExpansion};
pub use templates::{PanelPromptArgs, panel_prompt};
