//! Chapter, scene, and panel types.

use crate::TimeOfDay;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a chapter.
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
pub enum ChapterStatus {
    /// Scenes and panels exist but review is pending
    Outlined,
    /// Accepted and saved
    Completed,
}

/// Camera distance for a panel.
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
pub enum ShotType {
    /// Full location view with multiple characters
    Wide,
    /// Character from the waist up
    Medium,
    /// Face focus for emotional moments
    CloseUp,
    /// Detail focus on eyes, hands, or objects
    ExtremeCloseUp,
}

impl ShotType {
    /// Parse a shot type from model output, defaulting to [`ShotType::Medium`].
    pub fn parse_loose(s: &str) -> Self {
        s.trim()
            .to_lowercase()
            .replace([' ', '-'], "_")
            .parse()
            .unwrap_or(ShotType::Medium)
    }

    /// Prompt description for this shot.
    pub fn description(&self) -> &'static str {
        match self {
            ShotType::Wide => "wide establishing shot showing the full location",
            ShotType::Medium => "medium shot, character from waist up",
            ShotType::CloseUp => "close-up on the face, emotional focus",
            ShotType::ExtremeCloseUp => "extreme close-up on a specific detail",
        }
    }
}

/// Camera angle for a panel.
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
pub enum CameraAngle {
    /// Normal perspective
    EyeLevel,
    /// Looking down, shows vulnerability
    High,
    /// Looking up, shows power
    Low,
    /// Tilted frame for tension
    Dutch,
}

impl CameraAngle {
    /// Parse an angle from model output, defaulting to [`CameraAngle::EyeLevel`].
    pub fn parse_loose(s: &str) -> Self {
        s.trim()
            .to_lowercase()
            .replace([' ', '-'], "_")
            .parse()
            .unwrap_or(CameraAngle::EyeLevel)
    }

    /// Prompt description for this angle.
    pub fn description(&self) -> &'static str {
        match self {
            CameraAngle::EyeLevel => "eye-level, natural perspective",
            CameraAngle::High => "high angle looking down",
            CameraAngle::Low => "low angle looking up",
            CameraAngle::Dutch => "dutch tilt, off-kilter framing",
        }
    }
}

/// Kind of dialogue in a panel.
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
pub enum DialogueType {
    /// Spoken aloud
    Speech,
    /// Inner monologue
    Thought,
    /// Narration box
    Narration,
}

impl DialogueType {
    /// Parse a dialogue type from model output, defaulting to [`DialogueType::Speech`].
    pub fn parse_loose(s: &str) -> Self {
        s.trim().to_lowercase().parse().unwrap_or(DialogueType::Speech)
    }
}

/// A line of dialogue. Stored for lettering, never rendered into images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dialogue {
    /// Speaking character, if attributed
    #[serde(default)]
    pub character_id: Option<String>,
    /// The line itself
    pub text: String,
    /// Speech, thought, or narration
    #[serde(rename = "type")]
    pub dialogue_type: DialogueType,
}

/// A character's presence in a panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelCharacter {
    /// Character id
    pub character_id: String,
    /// Facial expression
    #[serde(default = "default_expression")]
    pub expression: String,
    /// Horizontal placement: left, center, or right
    #[serde(default = "default_position")]
    pub position: String,
}

fn default_expression() -> String {
    "neutral".to_string()
}

fn default_position() -> String {
    "center".to_string()
}

/// Camera composition for a panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelComposition {
    /// Camera distance
    pub shot_type: ShotType,
    /// Camera angle
    #[serde(default = "default_angle")]
    pub angle: CameraAngle,
}

fn default_angle() -> CameraAngle {
    CameraAngle::EyeLevel
}

/// A single webtoon panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Panel {
    /// Panel number within the scene, 1-indexed
    pub number: u32,
    /// Camera composition
    pub composition: PanelComposition,
    /// Characters present
    #[serde(default)]
    pub characters: Vec<PanelCharacter>,
    /// What happens in the panel
    #[serde(default)]
    pub action: String,
    /// Dialogue lines
    #[serde(default)]
    pub dialogue: Vec<Dialogue>,
    /// Sound effects
    #[serde(default)]
    pub sfx: Vec<String>,
    /// Whether this panel continues the previous panel's moment
    #[serde(default)]
    pub continues_from_previous: bool,
    /// What must stay consistent with the previous panel
    #[serde(default)]
    pub continuity_note: String,
    /// Generated image path, relative to the assets root
    #[serde(default)]
    pub image_path: Option<String>,
}

/// A scene within a chapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    /// Scene number within the chapter, 1-indexed
    pub number: u32,
    /// Location where the scene takes place
    #[serde(default)]
    pub location_id: Option<String>,
    /// Time of day for lighting and backgrounds
    pub time_of_day: TimeOfDay,
    /// Mood descriptor
    #[serde(default)]
    pub mood: String,
    /// Scene description
    #[serde(default)]
    pub description: String,
    /// Characters appearing in the scene
    #[serde(default)]
    pub character_ids: Vec<String>,
    /// Ordered panels
    #[serde(default)]
    pub panels: Vec<Panel>,
    /// For scene 1 only: continues directly from the previous chapter's last panel
    #[serde(default)]
    pub continues_from_previous_chapter: bool,
}

/// A chapter of the story, covering one story beat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    /// Stable identifier
    pub id: String,
    /// Chapter number, 1-indexed to match story beats
    pub number: u32,
    /// Chapter title
    pub title: String,
    /// Summary used as context for later chapters
    #[serde(default)]
    pub summary: String,
    /// Lifecycle state
    pub status: ChapterStatus,
    /// Ordered scenes
    #[serde(default)]
    pub scenes: Vec<Scene>,
}

impl Chapter {
    /// Create a chapter with a fresh id.
    pub fn new(number: u32, title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            number,
            title: title.into(),
            summary: String::new(),
            status: ChapterStatus::Outlined,
            scenes: Vec::new(),
        }
    }

    /// Total panel count across all scenes.
    pub fn panel_count(&self) -> usize {
        self.scenes.iter().map(|s| s.panels.len()).sum()
    }

    /// The last panel of the last scene, used as a cross-chapter continuity seed.
    pub fn last_panel(&self) -> Option<&Panel> {
        self.scenes.last().and_then(|s| s.panels.last())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_panel_walks_to_final_scene() {
        let mut chapter = Chapter::new(1, "Opening");
        assert!(chapter.last_panel().is_none());

        let panel = Panel {
            number: 3,
            composition: PanelComposition {
                shot_type: ShotType::CloseUp,
                angle: CameraAngle::EyeLevel,
            },
            characters: vec![],
            action: "She turns away".to_string(),
            dialogue: vec![],
            sfx: vec![],
            continues_from_previous: true,
            continuity_note: String::new(),
            image_path: Some("panels/chapter-1/scene-2/panel-3.png".to_string()),
        };
        chapter.scenes.push(Scene {
            number: 1,
            location_id: None,
            time_of_day: TimeOfDay::Day,
            mood: String::new(),
            description: String::new(),
            character_ids: vec![],
            panels: vec![],
            continues_from_previous_chapter: false,
        });
        chapter.scenes.push(Scene {
            number: 2,
            location_id: None,
            time_of_day: TimeOfDay::Night,
            mood: String::new(),
            description: String::new(),
            character_ids: vec![],
            panels: vec![panel.clone()],
            continues_from_previous_chapter: false,
        });

        assert_eq!(chapter.last_panel(), Some(&panel));
        assert_eq!(chapter.panel_count(), 1);
    }

    #[test]
    fn shot_type_loose_parse_handles_hyphens() {
        assert_eq!(ShotType::parse_loose("close-up"), ShotType::CloseUp);
        assert_eq!(ShotType::parse_loose("bird's eye"), ShotType::Medium);
        assert_eq!(CameraAngle::parse_loose("EYE LEVEL"), CameraAngle::EyeLevel);
    }
}
