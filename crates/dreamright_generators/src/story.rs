//! Story expansion: one prompt in, a full story bible out.

use dreamright_core::{
    Character, CharacterDescription, CharacterRole, Genre, Location, LocationType, Story,
    StoryBeat, Tone,
};
use dreamright_error::DreamrightResult;
use dreamright_gemini::{TextGenerator, TextRequest};
use serde::Deserialize;

const SYSTEM_PROMPT: &str = "You are a story development expert for serialized webtoons and \
short-form vertical dramas. You expand a premise into a complete story bible: title, logline, \
genre, tone, themes, target audience, synopsis, one story beat per episode, a main cast, and \
the recurring locations. Every character needs a distinctive physical description and visual \
tags usable for consistent illustration. Respond with JSON only, no prose around it.";

/// Hints and targets for story expansion.
#[derive(Debug, Clone, Default)]
pub struct ExpandOptions {
    /// Preferred genre, free-form
    pub genre: Option<String>,
    /// Preferred tone, free-form
    pub tone: Option<String>,
    /// Number of episodes, and therefore story beats, to produce
    pub episodes: u32,
}

/// The converted result of a story expansion.
#[derive(Debug, Clone, PartialEq)]
pub struct StoryExpansion {
    /// The story bible
    pub story: Story,
    /// Main cast with fresh ids
    pub characters: Vec<Character>,
    /// Recurring locations with fresh ids
    pub locations: Vec<Location>,
}

#[derive(Debug, Deserialize)]
struct StoryExpansionResponse {
    #[serde(default)]
    title: String,
    #[serde(default)]
    logline: String,
    #[serde(default)]
    genre: String,
    #[serde(default)]
    tone: String,
    #[serde(default)]
    themes: Vec<String>,
    #[serde(default)]
    target_audience: String,
    #[serde(default)]
    synopsis: String,
    #[serde(default)]
    story_beats: Vec<StoryBeatResponse>,
    #[serde(default)]
    characters: Vec<CharacterResponse>,
    #[serde(default)]
    locations: Vec<LocationResponse>,
}

#[derive(Debug, Deserialize)]
struct StoryBeatResponse {
    #[serde(default)]
    beat: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct CharacterResponse {
    name: String,
    #[serde(default)]
    role: String,
    #[serde(default)]
    age: String,
    #[serde(default)]
    physical_description: String,
    #[serde(default)]
    personality: String,
    #[serde(default)]
    background: String,
    #[serde(default)]
    motivation: String,
    #[serde(default)]
    visual_tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct LocationResponse {
    name: String,
    #[serde(default, rename = "type")]
    location_type: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    visual_tags: Vec<String>,
}

/// Expands a user premise into a [`Story`] plus cast and locations.
pub struct StoryExpander<'a> {
    text: &'a dyn TextGenerator,
}

impl<'a> StoryExpander<'a> {
    /// Wrap a text generator.
    pub fn new(text: &'a dyn TextGenerator) -> Self {
        Self { text }
    }

    /// Expand `prompt` into a story bible.
    ///
    /// Unknown genre, tone, or role strings from the model fall back to
    /// sensible defaults instead of failing the whole expansion.
    #[tracing::instrument(skip(self, prompt), fields(episodes = options.episodes))]
    pub async fn expand(
        &self,
        prompt: &str,
        options: &ExpandOptions,
    ) -> DreamrightResult<StoryExpansion> {
        let request = TextRequest {
            prompt: build_expansion_prompt(prompt, options),
            system_instruction: Some(SYSTEM_PROMPT.to_string()),
            temperature: Some(0.9),
        };
        let value = self.text.generate_json(&request).await?;
        let response: StoryExpansionResponse = serde_json::from_value(value).map_err(|e| {
            dreamright_error::GenerationError::new(
                dreamright_error::GenerationErrorKind::Conversion(format!(
                    "story expansion response: {}",
                    e
                )),
            )
        })?;
        let expansion = convert_expansion(response, options.episodes);
        tracing::info!(
            title = %expansion.story.title,
            characters = expansion.characters.len(),
            locations = expansion.locations.len(),
            beats = expansion.story.story_beats.len(),
            "Expanded story"
        );
        Ok(expansion)
    }
}

fn build_expansion_prompt(prompt: &str, options: &ExpandOptions) -> String {
    let mut out = format!("Expand this premise into a story bible:\n\n{}\n\n", prompt);
    if let Some(genre) = &options.genre {
        out.push_str(&format!("Preferred genre: {}\n", genre));
    }
    if let Some(tone) = &options.tone {
        out.push_str(&format!("Preferred tone: {}\n", tone));
    }
    out.push_str(&format!(
        "Produce exactly {} story beats, one per episode, each advancing the plot.\n\n",
        options.episodes
    ));
    out.push_str(
        r#"Return JSON with this shape:
{
  "title": "...",
  "logline": "one sentence hook",
  "genre": "romance|action|fantasy|drama|comedy|thriller|horror|mystery|slice_of_life|sci_fi",
  "tone": "comedic|dramatic|dark|lighthearted|romantic|suspenseful",
  "themes": ["..."],
  "target_audience": "...",
  "synopsis": "2-3 paragraphs",
  "story_beats": [{"beat": "headline", "description": "what happens"}],
  "characters": [{
    "name": "...", "role": "protagonist|deuteragonist|love_interest|antagonist|supporting",
    "age": "...", "physical_description": "detailed, for illustration",
    "personality": "...", "background": "...", "motivation": "...",
    "visual_tags": ["short visual descriptors"]
  }],
  "locations": [{
    "name": "...", "type": "interior|exterior",
    "description": "...", "visual_tags": ["..."]
  }]
}"#,
    );
    out
}

fn convert_expansion(response: StoryExpansionResponse, episodes: u32) -> StoryExpansion {
    let story = Story {
        title: response.title,
        logline: response.logline,
        genre: Genre::parse_loose(&response.genre),
        tone: Tone::parse_loose(&response.tone),
        themes: response.themes,
        target_audience: response.target_audience,
        episode_count: episodes,
        synopsis: response.synopsis,
        story_beats: response
            .story_beats
            .into_iter()
            .map(|b| StoryBeat {
                beat: b.beat,
                description: b.description,
            })
            .collect(),
    };

    let characters = response
        .characters
        .into_iter()
        .map(|c| {
            let mut character = Character::new(c.name, CharacterRole::parse_loose(&c.role));
            character.age = c.age;
            character.description = CharacterDescription {
                physical: c.physical_description,
                personality: c.personality,
                background: c.background,
                motivation: c.motivation,
            };
            character.visual_tags = c.visual_tags;
            character
        })
        .collect();

    let locations = response
        .locations
        .into_iter()
        .map(|l| {
            let mut location = Location::new(l.name, LocationType::parse_loose(&l.location_type));
            location.description = l.description;
            location.visual_tags = l.visual_tags;
            location
        })
        .collect();

    StoryExpansion {
        story,
        characters,
        locations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversion_applies_loose_enum_fallbacks() {
        let response: StoryExpansionResponse = serde_json::from_value(serde_json::json!({
            "title": "Midnight Cafe",
            "genre": "Cozy Mystery",
            "tone": "bittersweet",
            "story_beats": [{"beat": "The letter", "description": "A letter arrives"}],
            "characters": [
                {"name": "Mina", "role": "lead", "visual_tags": ["silver bob"]},
                {"name": "Joon", "role": "Love Interest"}
            ],
            "locations": [{"name": "The Cafe", "type": "indoors"}]
        }))
        .unwrap();

        let expansion = convert_expansion(response, 8);
        assert_eq!(expansion.story.genre, Genre::Drama);
        assert_eq!(expansion.story.tone, Tone::Dramatic);
        assert_eq!(expansion.story.episode_count, 8);
        assert_eq!(expansion.characters[0].role, CharacterRole::Supporting);
        assert_eq!(expansion.characters[1].role, CharacterRole::LoveInterest);
        assert_eq!(
            expansion.locations[0].location_type,
            LocationType::Interior
        );
        assert_ne!(expansion.characters[0].id, expansion.characters[1].id);
    }

    #[test]
    fn prompt_carries_hints_and_beat_count() {
        let options = ExpandOptions {
            genre: Some("romance".to_string()),
            tone: None,
            episodes: 12,
        };
        let prompt = build_expansion_prompt("a barista who reads minds", &options);
        assert!(prompt.contains("Preferred genre: romance"));
        assert!(!prompt.contains("Preferred tone"));
        assert!(prompt.contains("exactly 12 story beats"));
        assert!(prompt.contains("a barista who reads minds"));
    }
}
