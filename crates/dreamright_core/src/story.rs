//! Story structure types produced by expansion.

use serde::{Deserialize, Serialize};

/// Story genre.
///
/// Model responses arrive as free text, so [`Genre::parse_loose`] normalizes
/// input and falls back to [`Genre::Drama`] for anything unrecognized.
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
pub enum Genre {
    /// Romantic storylines
    Romance,
    /// Action and combat
    Action,
    /// Fantasy settings and magic
    Fantasy,
    /// Character-driven drama
    Drama,
    /// Comedic stories
    Comedy,
    /// Tension and suspense
    Thriller,
    /// Horror and fright
    Horror,
    /// Mystery and investigation
    Mystery,
    /// Everyday life stories
    SliceOfLife,
    /// Science fiction
    SciFi,
}

impl Genre {
    /// Parse a genre from model output, defaulting to [`Genre::Drama`].
    ///
    /// # Examples
    ///
    /// ```
    /// use dreamright_core::Genre;
    ///
    /// assert_eq!(Genre::parse_loose("Slice of Life"), Genre::SliceOfLife);
    /// assert_eq!(Genre::parse_loose("sci-fi"), Genre::SciFi);
    /// assert_eq!(Genre::parse_loose("western noir"), Genre::Drama);
    /// ```
    pub fn parse_loose(s: &str) -> Self {
        normalize(s).parse().unwrap_or(Genre::Drama)
    }
}

/// Story tone.
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
pub enum Tone {
    /// Light and funny
    Comedic,
    /// Serious and emotional
    Dramatic,
    /// Grim and heavy
    Dark,
    /// Warm and easygoing
    Lighthearted,
    /// Tender and affectionate
    Romantic,
    /// Tense and uneasy
    Suspenseful,
}

impl Tone {
    /// Parse a tone from model output, defaulting to [`Tone::Dramatic`].
    pub fn parse_loose(s: &str) -> Self {
        normalize(s).parse().unwrap_or(Tone::Dramatic)
    }
}

/// Lowercase and join words the way enum values serialize.
fn normalize(s: &str) -> String {
    s.trim().to_lowercase().replace([' ', '-'], "_")
}

/// A beat in the story arc, e.g. hook or climax.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryBeat {
    /// Short beat label
    pub beat: String,
    /// What happens during this beat
    pub description: String,
}

/// The expanded story structure.
///
/// # Examples
///
/// ```
/// use dreamright_core::{Genre, Story, Tone};
///
/// let story = Story {
///     title: "Midnight Cafe".to_string(),
///     logline: "A barista discovers her customers are ghosts.".to_string(),
///     genre: Genre::Fantasy,
///     tone: Tone::Lighthearted,
///     themes: vec!["belonging".to_string()],
///     target_audience: "young adults".to_string(),
///     episode_count: 10,
///     synopsis: String::new(),
///     story_beats: vec![],
/// };
/// assert_eq!(story.genre, Genre::Fantasy);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    /// Story title
    pub title: String,
    /// One-sentence pitch
    pub logline: String,
    /// Primary genre
    pub genre: Genre,
    /// Overall tone
    pub tone: Tone,
    /// Core themes
    #[serde(default)]
    pub themes: Vec<String>,
    /// Intended audience
    #[serde(default)]
    pub target_audience: String,
    /// Target number of episodes
    pub episode_count: u32,
    /// Multi-paragraph synopsis
    #[serde(default)]
    pub synopsis: String,
    /// Ordered story beats, one chapter each
    #[serde(default)]
    pub story_beats: Vec<StoryBeat>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loose_parsing_normalizes_separators() {
        assert_eq!(Genre::parse_loose("Slice-of-Life"), Genre::SliceOfLife);
        assert_eq!(Tone::parse_loose("LIGHT HEARTED"), Tone::Dramatic);
        assert_eq!(Tone::parse_loose("suspenseful"), Tone::Suspenseful);
    }

    #[test]
    fn genre_round_trips_through_json() {
        let json = serde_json::to_string(&Genre::SliceOfLife).unwrap();
        assert_eq!(json, "\"slice_of_life\"");
        let back: Genre = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Genre::SliceOfLife);
    }
}
