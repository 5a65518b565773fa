//! Story expansion and chapter generation against a mock text backend.

use async_trait::async_trait;
use dreamright_core::{ChapterStatus, Genre, ProjectFormat, ProjectStatus, Tone};
use dreamright_error::DreamrightResult;
use dreamright_gemini::{TextGenerator, TextRequest};
use dreamright_generators::{ChapterGenerator, ExpandOptions, StoryExpander};
use dreamright_storage::ProjectManager;
use std::sync::Mutex;
use tempfile::TempDir;

struct MockText {
    response: serde_json::Value,
    requests: Mutex<Vec<TextRequest>>,
}

impl MockText {
    fn new(response: serde_json::Value) -> Self {
        Self {
            response,
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl TextGenerator for MockText {
    async fn generate_json(&self, request: &TextRequest) -> DreamrightResult<serde_json::Value> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(self.response.clone())
    }
}

#[tokio::test]
async fn test_expand_converts_and_project_saves() {
    let dir = TempDir::new().unwrap();
    let mut manager = ProjectManager::create(dir.path(), "Cafe Story", ProjectFormat::Webtoon)
        .await
        .unwrap();

    let text = MockText::new(serde_json::json!({
        "title": "Midnight Cafe",
        "logline": "A barista hears thoughts",
        "genre": "romance",
        "tone": "lighthearted",
        "themes": ["connection"],
        "target_audience": "18-30",
        "synopsis": "Mina hears everyone but Joon.",
        "story_beats": [
            {"beat": "The gift", "description": "Mina's power awakens"},
            {"beat": "The silence", "description": "Joon stays unreadable"}
        ],
        "characters": [{
            "name": "Mina Park",
            "role": "protagonist",
            "age": "24",
            "physical_description": "Short silver bob, round glasses",
            "personality": "warm, nosy",
            "visual_tags": ["silver bob", "round glasses", "green apron"]
        }],
        "locations": [{
            "name": "Midnight Cafe",
            "type": "interior",
            "description": "A cramped late-night cafe",
            "visual_tags": ["neon sign", "steamed windows"]
        }]
    }));

    let expander = StoryExpander::new(&text);
    let expansion = expander
        .expand(
            "a barista who reads minds",
            &ExpandOptions {
                genre: Some("romance".to_string()),
                tone: None,
                episodes: 2,
            },
        )
        .await
        .unwrap();

    assert_eq!(expansion.story.genre, Genre::Romance);
    assert_eq!(expansion.story.tone, Tone::Lighthearted);
    assert_eq!(expansion.story.episode_count, 2);
    assert_eq!(expansion.characters.len(), 1);
    assert_eq!(expansion.locations.len(), 1);

    let sent = text.requests.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].system_instruction.is_some());
    assert!(sent[0].prompt.contains("a barista who reads minds"));
    drop(sent);

    manager.project.story = Some(expansion.story);
    manager.project.characters = expansion.characters;
    manager.project.locations = expansion.locations;
    manager.project.status = ProjectStatus::InProgress;
    manager.save().await.unwrap();

    let reloaded = ProjectManager::load(dir.path()).await.unwrap();
    assert_eq!(reloaded.project.status, ProjectStatus::InProgress);
    assert_eq!(
        reloaded.project.story.as_ref().unwrap().title,
        "Midnight Cafe"
    );
    assert_eq!(reloaded.project.remaining_beats(), vec![1, 2]);
}

#[tokio::test]
async fn test_generate_chapter_persists_and_resolves_names() {
    let dir = TempDir::new().unwrap();
    let mut manager = ProjectManager::create(dir.path(), "Cafe Story", ProjectFormat::Webtoon)
        .await
        .unwrap();

    manager.project.story = Some(dreamright_core::Story {
        title: "Midnight Cafe".to_string(),
        logline: "A barista hears thoughts".to_string(),
        genre: Genre::Romance,
        tone: Tone::Lighthearted,
        themes: vec![],
        target_audience: String::new(),
        episode_count: 1,
        synopsis: String::new(),
        story_beats: vec![dreamright_core::StoryBeat {
            beat: "The gift".to_string(),
            description: "Mina's power awakens".to_string(),
        }],
    });
    let mina = dreamright_core::Character::new(
        "Mina Park",
        dreamright_core::CharacterRole::Protagonist,
    );
    let mina_id = mina.id.clone();
    manager.project.characters.push(mina);
    let cafe = dreamright_core::Location::new(
        "Midnight Cafe",
        dreamright_core::LocationType::Interior,
    );
    manager.project.locations.push(cafe);
    manager.save().await.unwrap();

    let text = MockText::new(serde_json::json!({
        "title": "The Gift",
        "summary": "Mina hears her first thought.",
        "scenes": [{
            "number": 1,
            "location": "midnight cafe",
            "time_of_day": "evening",
            "mood": "cozy",
            "description": "Closing time",
            "characters": ["Mina"],
            "panels": [{
                "number": 1,
                "shot_type": "wide",
                "angle": "eye_level",
                "characters": [{"name": "Mina", "expression": "tired"}],
                "action": "Mina wipes the counter",
                "dialogue": [{"character": "Mina", "text": "Last order!", "type": "speech"}]
            }]
        }]
    }));

    let generator = ChapterGenerator::new(&text);
    let chapter = generator.generate_chapter(&mut manager, 1, 5).await.unwrap();
    assert_eq!(chapter.number, 1);
    assert_eq!(chapter.status, ChapterStatus::Completed);
    assert_eq!(
        chapter.scenes[0].panels[0].characters[0].character_id,
        mina_id
    );
    assert_eq!(
        chapter.scenes[0].panels[0].dialogue[0].character_id.as_deref(),
        Some(mina_id.as_str())
    );

    let sent = text.requests.lock().unwrap();
    assert!(sent[0].prompt.contains("The gift: Mina's power awakens"));
    drop(sent);

    let reloaded = ProjectManager::load(dir.path()).await.unwrap();
    assert_eq!(reloaded.project.chapters.len(), 1);
    assert_eq!(reloaded.project.remaining_beats(), Vec::<u32>::new());

    // Beat out of range is a lookup error, not a model call.
    let err = generator.generate_chapter(&mut manager, 9, 5).await;
    assert!(err.is_err());
}
