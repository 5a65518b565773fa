//! Project root type and lookup helpers.

use crate::{Chapter, Character, Location, Story};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Output format the project targets.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProjectFormat {
    /// Vertical-scroll webtoon
    Webtoon,
    /// Short-form video drama
    ShortDrama,
}

impl ProjectFormat {
    /// Parse a format string, defaulting to [`ProjectFormat::Webtoon`].
    pub fn parse_loose(s: &str) -> Self {
        s.trim()
            .to_lowercase()
            .replace([' ', '-'], "_")
            .parse()
            .unwrap_or(ProjectFormat::Webtoon)
    }
}

/// Lifecycle state of a project.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProjectStatus {
    /// Created but not yet expanded
    Draft,
    /// Story expanded, generation underway
    InProgress,
    /// All assets generated
    Completed,
}

/// The full project state persisted as `project.json`.
///
/// Characters and locations referenced from scenes and panels use string
/// ids, resolved through the lookup helpers here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Stable identifier
    pub id: String,
    /// Project name
    pub name: String,
    /// Output format
    pub format: ProjectFormat,
    /// Lifecycle state
    pub status: ProjectStatus,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last save timestamp
    pub updated_at: DateTime<Utc>,
    /// The prompt the story was expanded from
    #[serde(default)]
    pub original_prompt: Option<String>,
    /// Expanded story, absent until `expand` runs
    #[serde(default)]
    pub story: Option<Story>,
    /// Cast of characters
    #[serde(default)]
    pub characters: Vec<Character>,
    /// Story locations
    #[serde(default)]
    pub locations: Vec<Location>,
    /// Generated chapters, sorted by number
    #[serde(default)]
    pub chapters: Vec<Chapter>,
}

impl Project {
    /// Create an empty project.
    ///
    /// # Examples
    ///
    /// ```
    /// use dreamright_core::{Project, ProjectFormat, ProjectStatus};
    ///
    /// let project = Project::new("Test", ProjectFormat::Webtoon);
    /// assert_eq!(project.status, ProjectStatus::Draft);
    /// assert!(project.chapters.is_empty());
    /// ```
    pub fn new(name: impl Into<String>, format: ProjectFormat) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            format,
            status: ProjectStatus::Draft,
            created_at: now,
            updated_at: now,
            original_prompt: None,
            story: None,
            characters: Vec::new(),
            locations: Vec::new(),
            chapters: Vec::new(),
        }
    }

    /// Look up a character by id.
    pub fn character_by_id(&self, id: &str) -> Option<&Character> {
        self.characters.iter().find(|c| c.id == id)
    }

    /// Look up a character by name, case-insensitive.
    pub fn character_by_name(&self, name: &str) -> Option<&Character> {
        let key = name.to_lowercase();
        self.characters
            .iter()
            .find(|c| c.name.to_lowercase() == key)
    }

    /// Look up a location by id.
    pub fn location_by_id(&self, id: &str) -> Option<&Location> {
        self.locations.iter().find(|l| l.id == id)
    }

    /// Look up a location by name, case-insensitive.
    pub fn location_by_name(&self, name: &str) -> Option<&Location> {
        let key = name.to_lowercase();
        self.locations
            .iter()
            .find(|l| l.name.to_lowercase() == key)
    }

    /// Look up a chapter by number.
    pub fn chapter_by_number(&self, number: u32) -> Option<&Chapter> {
        self.chapters.iter().find(|c| c.number == number)
    }

    /// Insert or replace a chapter, keeping chapters sorted by number.
    pub fn upsert_chapter(&mut self, chapter: Chapter) {
        if let Some(existing) = self
            .chapters
            .iter_mut()
            .find(|c| c.number == chapter.number)
        {
            *existing = chapter;
        } else {
            self.chapters.push(chapter);
            self.chapters.sort_by_key(|c| c.number);
        }
    }

    /// Chapter numbers for story beats that have no chapter yet.
    pub fn remaining_beats(&self) -> Vec<u32> {
        let Some(story) = &self.story else {
            return Vec::new();
        };
        let existing: std::collections::BTreeSet<u32> =
            self.chapters.iter().map(|c| c.number).collect();
        (1..=story.story_beats.len() as u32)
            .filter(|n| !existing.contains(n))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Genre, Tone};

    fn story_with_beats(count: usize) -> Story {
        Story {
            title: "Test".to_string(),
            logline: String::new(),
            genre: Genre::Drama,
            tone: Tone::Dramatic,
            themes: vec![],
            target_audience: String::new(),
            episode_count: count as u32,
            synopsis: String::new(),
            story_beats: (0..count)
                .map(|i| crate::StoryBeat {
                    beat: format!("beat {}", i + 1),
                    description: String::new(),
                })
                .collect(),
        }
    }

    #[test]
    fn upsert_chapter_replaces_and_sorts() {
        let mut project = Project::new("Test", ProjectFormat::Webtoon);
        project.upsert_chapter(Chapter::new(2, "Two"));
        project.upsert_chapter(Chapter::new(1, "One"));
        project.upsert_chapter(Chapter::new(2, "Two Revised"));

        let numbers: Vec<u32> = project.chapters.iter().map(|c| c.number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(project.chapters[1].title, "Two Revised");
    }

    #[test]
    fn remaining_beats_skips_generated_chapters() {
        let mut project = Project::new("Test", ProjectFormat::Webtoon);
        assert!(project.remaining_beats().is_empty());

        project.story = Some(story_with_beats(4));
        project.upsert_chapter(Chapter::new(2, "Two"));
        assert_eq!(project.remaining_beats(), vec![1, 3, 4]);
    }

    #[test]
    fn name_lookup_is_case_insensitive() {
        let mut project = Project::new("Test", ProjectFormat::Webtoon);
        project
            .characters
            .push(Character::new("Mina Park", crate::CharacterRole::Protagonist));

        assert!(project.character_by_name("mina park").is_some());
        assert!(project.character_by_name("Mina").is_none());
    }
}
