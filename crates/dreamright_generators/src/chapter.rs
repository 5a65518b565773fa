//! Chapter generation: one story beat in, scenes and panels out.

use dreamright_core::{
    CameraAngle, Chapter, ChapterStatus, Dialogue, DialogueType, Panel, PanelCharacter,
    PanelComposition, Project, Scene, ShotType, TimeOfDay,
};
use dreamright_error::{
    DreamrightResult, GenerationError, GenerationErrorKind, ProjectError, ProjectErrorKind,
};
use dreamright_gemini::{TextGenerator, TextRequest};
use dreamright_storage::ProjectManager;
use serde::Deserialize;

const SYSTEM_PROMPT: &str = "You are a webtoon episode writer. You turn one story beat into a \
complete chapter broken into scenes, and each scene into sequential panels with camera \
composition, character expressions, action, and dialogue. Contiguous panels that depict one \
continuous moment must be marked as continuing, with a note saying what must stay visually \
identical. Respond with JSON only, no prose around it.";

/// How many trailing chapters get full scene detail in the context block.
const DETAILED_CONTEXT_CHAPTERS: usize = 2;

#[derive(Debug, Deserialize)]
struct ChapterResponse {
    #[serde(default)]
    title: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    scenes: Vec<SceneResponse>,
}

#[derive(Debug, Deserialize)]
struct SceneResponse {
    #[serde(default)]
    number: u32,
    #[serde(default)]
    location: String,
    #[serde(default)]
    time_of_day: String,
    #[serde(default)]
    mood: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    characters: Vec<String>,
    #[serde(default)]
    panels: Vec<PanelResponse>,
    #[serde(default)]
    continues_from_previous_chapter: bool,
}

#[derive(Debug, Deserialize)]
struct PanelResponse {
    #[serde(default)]
    number: u32,
    #[serde(default)]
    shot_type: String,
    #[serde(default)]
    angle: String,
    #[serde(default)]
    characters: Vec<PanelCharacterResponse>,
    #[serde(default)]
    action: String,
    #[serde(default)]
    dialogue: Vec<DialogueResponse>,
    #[serde(default)]
    sfx: Vec<String>,
    #[serde(default)]
    continues_from_previous: bool,
    #[serde(default)]
    continuity_note: String,
}

#[derive(Debug, Deserialize)]
struct PanelCharacterResponse {
    #[serde(default)]
    name: String,
    #[serde(default)]
    expression: String,
}

#[derive(Debug, Deserialize)]
struct DialogueResponse {
    #[serde(default)]
    character: String,
    text: String,
    #[serde(default, rename = "type")]
    dialogue_type: String,
}

/// Expands story beats into chapters.
pub struct ChapterGenerator<'a> {
    text: &'a dyn TextGenerator,
}

impl<'a> ChapterGenerator<'a> {
    /// Wrap a text generator.
    pub fn new(text: &'a dyn TextGenerator) -> Self {
        Self { text }
    }

    /// Generate the chapter for story beat `beat`, save it on the project,
    /// and return it.
    #[tracing::instrument(skip(self, manager), fields(beat, panels_per_scene))]
    pub async fn generate_chapter(
        &self,
        manager: &mut ProjectManager,
        beat: u32,
        panels_per_scene: u32,
    ) -> DreamrightResult<Chapter> {
        let story = manager
            .project
            .story
            .as_ref()
            .ok_or_else(|| ProjectError::new(ProjectErrorKind::StoryMissing))?;
        if beat == 0 || beat as usize > story.story_beats.len() {
            return Err(ProjectError::new(ProjectErrorKind::ChapterNotFound(beat)).into());
        }

        let prompt = build_chapter_prompt(&manager.project, story, beat, panels_per_scene);
        let request = TextRequest {
            prompt,
            system_instruction: Some(SYSTEM_PROMPT.to_string()),
            temperature: Some(0.8),
        };
        let value = self.text.generate_json(&request).await?;
        let response: ChapterResponse = serde_json::from_value(value).map_err(|e| {
            GenerationError::new(GenerationErrorKind::Conversion(format!(
                "chapter response: {}",
                e
            )))
        })?;

        let chapter = convert_chapter(&manager.project, beat, response)?;
        tracing::info!(
            chapter = chapter.number,
            title = %chapter.title,
            scenes = chapter.scenes.len(),
            panels = chapter.panel_count(),
            "Generated chapter"
        );
        manager.project.upsert_chapter(chapter.clone());
        manager.save().await?;
        Ok(chapter)
    }
}

fn build_chapter_prompt(
    project: &Project,
    story: &dreamright_core::Story,
    beat: u32,
    panels_per_scene: u32,
) -> String {
    let beat_index = (beat - 1) as usize;
    let target = &story.story_beats[beat_index];

    let mut out = format!(
        "Story: {} ({}, {} tone)\nLogline: {}\nSynopsis: {}\n\n",
        story.title, story.genre, story.tone, story.logline, story.synopsis
    );

    out.push_str("Cast:\n");
    for character in &project.characters {
        out.push_str(&format!(
            "- {} ({}): {}\n",
            character.name, character.role, character.description.personality
        ));
    }
    out.push_str("\nLocations:\n");
    for location in &project.locations {
        out.push_str(&format!("- {}: {}\n", location.name, location.description));
    }

    let mut previous: Vec<&Chapter> = project
        .chapters
        .iter()
        .filter(|c| c.number < beat)
        .collect();
    previous.sort_by_key(|c| c.number);
    if !previous.is_empty() {
        out.push_str("\nStory so far:\n");
        for chapter in &previous {
            out.push_str(&format!(
                "Chapter {}: {} - {}\n",
                chapter.number, chapter.title, chapter.summary
            ));
        }
        let detailed_from = previous.len().saturating_sub(DETAILED_CONTEXT_CHAPTERS);
        for chapter in &previous[detailed_from..] {
            out.push_str(&format!("\nChapter {} in detail:\n", chapter.number));
            for scene in &chapter.scenes {
                out.push_str(&format!(
                    "  Scene {} at {}: {}\n",
                    scene.number,
                    scene
                        .location_id
                        .as_deref()
                        .and_then(|id| project.location_by_id(id))
                        .map(|l| l.name.as_str())
                        .unwrap_or("unknown"),
                    scene.description
                ));
                for line in scene
                    .panels
                    .iter()
                    .flat_map(|p| p.dialogue.iter())
                    .take(3)
                {
                    out.push_str(&format!("    \"{}\"\n", line.text));
                }
            }
        }
    }

    out.push_str(&format!(
        "\nWrite chapter {} covering this beat:\n{}: {}\n\n",
        beat, target.beat, target.description
    ));
    out.push_str(&format!(
        "Use 2-4 scenes with about {} panels each. Refer to characters and locations by the \
         exact names above. If this chapter opens mid-moment from the previous chapter's final \
         panel, set continues_from_previous_chapter on scene 1.\n\n",
        panels_per_scene
    ));
    out.push_str(
        r#"Return JSON with this shape:
{
  "title": "...",
  "summary": "2-3 sentences, used as context for later chapters",
  "scenes": [{
    "number": 1,
    "location": "exact location name",
    "time_of_day": "morning|day|evening|night",
    "mood": "...",
    "description": "...",
    "characters": ["exact character names"],
    "continues_from_previous_chapter": false,
    "panels": [{
      "number": 1,
      "shot_type": "wide|medium|close_up|extreme_close_up",
      "angle": "eye_level|high|low|dutch",
      "characters": [{"name": "...", "expression": "..."}],
      "action": "what happens, visually",
      "dialogue": [{"character": "...", "text": "...", "type": "speech|thought|narration"}],
      "sfx": ["..."],
      "continues_from_previous": false,
      "continuity_note": "what must stay identical when continuing"
    }]
  }]
}"#,
    );
    out
}

/// Resolve a model-provided name to an id: exact case-insensitive match
/// first, then substring in either direction.
fn resolve_name(name: &str, candidates: &[(String, String)]) -> Option<String> {
    let needle = name.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    candidates
        .iter()
        .find(|(candidate, _)| candidate.to_lowercase() == needle)
        .or_else(|| {
            candidates.iter().find(|(candidate, _)| {
                let hay = candidate.to_lowercase();
                hay.contains(&needle) || needle.contains(&hay)
            })
        })
        .map(|(_, id)| id.clone())
}

fn convert_chapter(
    project: &Project,
    beat: u32,
    response: ChapterResponse,
) -> DreamrightResult<Chapter> {
    if response.scenes.is_empty() {
        return Err(GenerationError::new(GenerationErrorKind::Incomplete(format!(
            "chapter {} came back with no scenes",
            beat
        )))
        .into());
    }

    let character_names: Vec<(String, String)> = project
        .characters
        .iter()
        .map(|c| (c.name.clone(), c.id.clone()))
        .collect();
    let location_names: Vec<(String, String)> = project
        .locations
        .iter()
        .map(|l| (l.name.clone(), l.id.clone()))
        .collect();

    // The model occasionally repeats a scene number; keep the richest variant.
    let mut scenes: Vec<Scene> = Vec::new();
    for scene_response in response.scenes {
        let scene = convert_scene(scene_response, beat, &character_names, &location_names);
        match scenes.iter_mut().find(|s| s.number == scene.number) {
            Some(existing) if existing.panels.len() < scene.panels.len() => *existing = scene,
            Some(_) => {}
            None => scenes.push(scene),
        }
    }
    scenes.sort_by_key(|s| s.number);

    let title = if response.title.is_empty() {
        format!("Chapter {}", beat)
    } else {
        response.title
    };
    let mut chapter = Chapter::new(beat, title);
    chapter.summary = response.summary;
    chapter.status = ChapterStatus::Completed;
    chapter.scenes = scenes;
    Ok(chapter)
}

fn convert_scene(
    response: SceneResponse,
    beat: u32,
    character_names: &[(String, String)],
    location_names: &[(String, String)],
) -> Scene {
    let positions = ["left", "center", "right"];
    let mut panels: Vec<Panel> = Vec::new();
    for (index, panel_response) in response.panels.into_iter().enumerate() {
        let characters = panel_response
            .characters
            .iter()
            .enumerate()
            .filter_map(|(i, pc)| {
                resolve_name(&pc.name, character_names).map(|id| PanelCharacter {
                    character_id: id,
                    expression: if pc.expression.is_empty() {
                        "neutral".to_string()
                    } else {
                        pc.expression.clone()
                    },
                    position: positions[i % positions.len()].to_string(),
                })
            })
            .collect();
        let dialogue = panel_response
            .dialogue
            .into_iter()
            .map(|d| Dialogue {
                character_id: resolve_name(&d.character, character_names),
                text: d.text,
                dialogue_type: DialogueType::parse_loose(&d.dialogue_type),
            })
            .collect();
        let number = if panel_response.number == 0 {
            index as u32 + 1
        } else {
            panel_response.number
        };
        panels.push(Panel {
            number,
            composition: PanelComposition {
                shot_type: ShotType::parse_loose(&panel_response.shot_type),
                angle: CameraAngle::parse_loose(&panel_response.angle),
            },
            characters,
            action: panel_response.action,
            dialogue,
            sfx: panel_response.sfx,
            continues_from_previous: panel_response.continues_from_previous,
            continuity_note: panel_response.continuity_note,
            image_path: None,
        });
    }
    panels.sort_by_key(|p| p.number);

    let character_ids = response
        .characters
        .iter()
        .filter_map(|name| resolve_name(name, character_names))
        .collect();
    // Cross-chapter continuity only applies to the opening scene of a
    // non-first chapter.
    let continues = response.continues_from_previous_chapter && response.number <= 1 && beat > 1;
    Scene {
        number: response.number.max(1),
        location_id: resolve_name(&response.location, location_names),
        time_of_day: TimeOfDay::parse_loose(&response.time_of_day),
        mood: response.mood,
        description: response.description,
        character_ids,
        panels,
        continues_from_previous_chapter: continues,
    }
}

/// One-paragraph summary of a generated chapter for console output.
pub fn format_chapter_result(chapter: &Chapter) -> String {
    let dialogue_lines: usize = chapter
        .scenes
        .iter()
        .flat_map(|s| s.panels.iter())
        .map(|p| p.dialogue.len())
        .sum();
    format!(
        "Chapter {}: {}\n  {} scenes, {} panels, {} dialogue lines\n  {}",
        chapter.number,
        chapter.title,
        chapter.scenes.len(),
        chapter.panel_count(),
        dialogue_lines,
        chapter.summary
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use dreamright_core::{Character, CharacterRole, Location, LocationType, ProjectFormat};

    fn fixture_project() -> Project {
        let mut project = Project::new("Test", ProjectFormat::Webtoon);
        project.story = Some(dreamright_core::Story {
            title: "Midnight Cafe".to_string(),
            logline: "A barista reads minds".to_string(),
            genre: dreamright_core::Genre::Romance,
            tone: dreamright_core::Tone::Lighthearted,
            themes: vec![],
            target_audience: String::new(),
            episode_count: 3,
            synopsis: String::new(),
            story_beats: vec![
                dreamright_core::StoryBeat {
                    beat: "The gift appears".to_string(),
                    description: "Mina discovers her power".to_string(),
                },
                dreamright_core::StoryBeat {
                    beat: "The regular".to_string(),
                    description: "Joon's thoughts are silent".to_string(),
                },
            ],
        });
        project
            .characters
            .push(Character::new("Mina Park", CharacterRole::Protagonist));
        project
            .characters
            .push(Character::new("Joon", CharacterRole::LoveInterest));
        project
            .locations
            .push(Location::new("Midnight Cafe", LocationType::Interior));
        project
    }

    fn panel_json(number: u32) -> serde_json::Value {
        serde_json::json!({
            "number": number,
            "shot_type": "medium",
            "angle": "eye_level",
            "characters": [{"name": "Mina", "expression": "curious"}],
            "action": "Mina pours coffee",
            "dialogue": [],
            "continues_from_previous": number > 1
        })
    }

    #[test]
    fn conversion_resolves_names_and_dedups_scenes() {
        let project = fixture_project();
        let response: ChapterResponse = serde_json::from_value(serde_json::json!({
            "title": "The Gift",
            "summary": "Mina hears her first thought.",
            "scenes": [
                {
                    "number": 1,
                    "location": "midnight cafe",
                    "time_of_day": "evening",
                    "characters": ["Mina Park"],
                    "panels": [panel_json(1)]
                },
                {
                    "number": 1,
                    "location": "The Midnight Cafe",
                    "time_of_day": "evening",
                    "characters": ["Mina"],
                    "panels": [panel_json(1), panel_json(2), panel_json(3)]
                },
                {
                    "number": 2,
                    "location": "nowhere familiar",
                    "time_of_day": "later that night",
                    "characters": ["Mina", "Joon"],
                    "panels": [panel_json(1)]
                }
            ]
        }))
        .unwrap();

        let chapter = convert_chapter(&project, 1, response).unwrap();
        assert_eq!(chapter.scenes.len(), 2);
        // Duplicate scene 1 resolved in favor of the three-panel variant
        assert_eq!(chapter.scenes[0].panels.len(), 3);
        assert_eq!(chapter.status, ChapterStatus::Completed);

        let mina_id = project.character_by_name("Mina Park").unwrap().id.clone();
        let cafe_id = project.location_by_name("Midnight Cafe").unwrap().id.clone();
        assert_eq!(chapter.scenes[0].location_id.as_deref(), Some(cafe_id.as_str()));
        assert_eq!(
            chapter.scenes[0].panels[0].characters[0].character_id,
            mina_id
        );
        // Unresolvable location name becomes None, unknown time falls back
        assert_eq!(chapter.scenes[1].location_id, None);
        assert_eq!(chapter.scenes[1].time_of_day, TimeOfDay::Day);
        assert_eq!(chapter.scenes[1].character_ids.len(), 2);
    }

    #[test]
    fn panel_positions_cycle_left_center_right() {
        let project = fixture_project();
        let response: ChapterResponse = serde_json::from_value(serde_json::json!({
            "title": "Crowded",
            "scenes": [{
                "number": 1,
                "location": "Midnight Cafe",
                "time_of_day": "day",
                "panels": [{
                    "number": 1,
                    "shot_type": "wide",
                    "characters": [
                        {"name": "Mina"}, {"name": "Joon"}, {"name": "Mina Park"}
                    ]
                }]
            }]
        }))
        .unwrap();

        let chapter = convert_chapter(&project, 1, response).unwrap();
        let positions: Vec<&str> = chapter.scenes[0].panels[0]
            .characters
            .iter()
            .map(|c| c.position.as_str())
            .collect();
        assert_eq!(positions, vec!["left", "center", "right"]);
        assert_eq!(
            chapter.scenes[0].panels[0].characters[0].expression,
            "neutral"
        );
    }

    #[test]
    fn cross_chapter_flag_only_sticks_on_scene_one_past_chapter_one() {
        let project = fixture_project();
        let response: ChapterResponse = serde_json::from_value(serde_json::json!({
            "title": "The Regular",
            "scenes": [
                {
                    "number": 1,
                    "location": "Midnight Cafe",
                    "time_of_day": "night",
                    "continues_from_previous_chapter": true,
                    "panels": [panel_json(1)]
                },
                {
                    "number": 2,
                    "location": "Midnight Cafe",
                    "time_of_day": "night",
                    "continues_from_previous_chapter": true,
                    "panels": [panel_json(1)]
                }
            ]
        }))
        .unwrap();

        let chapter = convert_chapter(&project, 2, response).unwrap();
        assert!(chapter.scenes[0].continues_from_previous_chapter);
        assert!(!chapter.scenes[1].continues_from_previous_chapter);

        let response: ChapterResponse = serde_json::from_value(serde_json::json!({
            "title": "Opening",
            "scenes": [{
                "number": 1,
                "location": "Midnight Cafe",
                "time_of_day": "day",
                "continues_from_previous_chapter": true,
                "panels": [panel_json(1)]
            }]
        }))
        .unwrap();
        let first = convert_chapter(&project, 1, response).unwrap();
        assert!(!first.scenes[0].continues_from_previous_chapter);
    }

    #[test]
    fn empty_scene_list_is_incomplete() {
        let project = fixture_project();
        let response: ChapterResponse =
            serde_json::from_value(serde_json::json!({"title": "Empty", "scenes": []})).unwrap();
        assert!(convert_chapter(&project, 1, response).is_err());
    }

    #[test]
    fn prompt_details_only_recent_chapters() {
        let mut project = fixture_project();
        for number in 1..=3u32 {
            let mut chapter = Chapter::new(number, format!("Ch {}", number));
            chapter.summary = format!("Summary {}", number);
            chapter.scenes.push(Scene {
                number: 1,
                location_id: None,
                time_of_day: TimeOfDay::Day,
                mood: String::new(),
                description: format!("scene detail {}", number),
                character_ids: vec![],
                panels: vec![],
                continues_from_previous_chapter: false,
            });
            project.upsert_chapter(chapter);
        }

        if let Some(story) = project.story.as_mut() {
            story.story_beats.push(dreamright_core::StoryBeat {
                beat: "Fourth".to_string(),
                description: "More".to_string(),
            });
            story.story_beats.push(dreamright_core::StoryBeat {
                beat: "Fifth".to_string(),
                description: "Even more".to_string(),
            });
        }
        let story = project.story.clone().unwrap();
        let prompt = build_chapter_prompt(&project, &story, 4, 5);
        // All headlines present
        assert!(prompt.contains("Chapter 1: Ch 1"));
        assert!(prompt.contains("Chapter 3: Ch 3"));
        // Only the last two chapters in detail
        assert!(!prompt.contains("scene detail 1"));
        assert!(prompt.contains("scene detail 2"));
        assert!(prompt.contains("scene detail 3"));
        assert!(prompt.contains("about 5 panels each"));
    }
}
