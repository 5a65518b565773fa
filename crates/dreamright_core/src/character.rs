//! Character types and their generated assets.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Narrative role of a character.
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
pub enum CharacterRole {
    /// Main character
    Protagonist,
    /// Secondary lead
    Deuteragonist,
    /// Romantic lead
    LoveInterest,
    /// Primary opposition
    Antagonist,
    /// Supporting cast
    Supporting,
}

impl CharacterRole {
    /// Parse a role from model output, defaulting to [`CharacterRole::Supporting`].
    ///
    /// # Examples
    ///
    /// ```
    /// use dreamright_core::CharacterRole;
    ///
    /// assert_eq!(CharacterRole::parse_loose("Protagonist"), CharacterRole::Protagonist);
    /// assert_eq!(CharacterRole::parse_loose("sidekick"), CharacterRole::Supporting);
    /// ```
    pub fn parse_loose(s: &str) -> Self {
        s.trim()
            .to_lowercase()
            .replace([' ', '-'], "_")
            .parse()
            .unwrap_or(CharacterRole::Supporting)
    }
}

/// Free-text character description split by aspect.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CharacterDescription {
    /// Physical appearance
    #[serde(default)]
    pub physical: String,
    /// Personality traits
    #[serde(default)]
    pub personality: String,
    /// Backstory
    #[serde(default)]
    pub background: String,
    /// What drives them
    #[serde(default)]
    pub motivation: String,
}

/// Generated asset paths for a character, relative to the project assets root.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CharacterAssets {
    /// Portrait image path
    #[serde(default)]
    pub portrait: Option<String>,
    /// Three-view reference sheet paths keyed by view name
    #[serde(default)]
    pub three_view: BTreeMap<String, String>,
    /// User-supplied reference image, if any
    #[serde(default)]
    pub reference_input: Option<String>,
}

/// A character in the project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    /// Stable identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Narrative role
    pub role: CharacterRole,
    /// Age as free text (e.g. "17", "late twenties")
    #[serde(default)]
    pub age: String,
    /// Structured description
    #[serde(default)]
    pub description: CharacterDescription,
    /// Visual identity tags for image prompts
    #[serde(default)]
    pub visual_tags: Vec<String>,
    /// Generated assets
    #[serde(default)]
    pub assets: CharacterAssets,
}

impl Character {
    /// Create a character with a fresh id and empty assets.
    pub fn new(name: impl Into<String>, role: CharacterRole) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            role,
            age: String::new(),
            description: CharacterDescription::default(),
            visual_tags: Vec::new(),
            assets: CharacterAssets::default(),
        }
    }

    /// Preferred panel reference: the three-view sheet if present, else the portrait.
    pub fn panel_reference(&self) -> Option<&str> {
        self.assets
            .three_view
            .get("sheet")
            .map(String::as_str)
            .or(self.assets.portrait.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panel_reference_prefers_sheet() {
        let mut character = Character::new("Mina", CharacterRole::Protagonist);
        assert!(character.panel_reference().is_none());

        character.assets.portrait = Some("characters/mina/portrait.png".to_string());
        assert_eq!(
            character.panel_reference(),
            Some("characters/mina/portrait.png")
        );

        character.assets.three_view.insert(
            "sheet".to_string(),
            "characters/mina/sheet.png".to_string(),
        );
        assert_eq!(
            character.panel_reference(),
            Some("characters/mina/sheet.png")
        );
    }

    #[test]
    fn deserializes_with_missing_optional_fields() {
        let json = r#"{"id": "abc", "name": "Mina", "role": "protagonist"}"#;
        let character: Character = serde_json::from_str(json).unwrap();
        assert_eq!(character.role, CharacterRole::Protagonist);
        assert!(character.assets.portrait.is_none());
        assert!(character.visual_tags.is_empty());
    }
}
