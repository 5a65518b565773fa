//! Batch runner tests: a queue runs end to end against mock backends,
//! resumes without regenerating, and retries transient failures.

use async_trait::async_trait;
use dreamright::{BatchQueue, BatchRunner, ProjectManager, ProjectStatus};
use dreamright_error::{DreamrightResult, GeminiError, GeminiErrorKind};
use dreamright_gemini::{
    GeneratedImage, ImageGenerator, ImageRequest, TextGenerator, TextRequest,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

/// Serves a story expansion or a chapter depending on the system
/// instruction, optionally failing the first N calls.
struct MockText {
    calls: AtomicUsize,
    fail_first: usize,
}

impl MockText {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_first: 0,
        }
    }

    fn flaky(fail_first: usize) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_first,
        }
    }
}

#[async_trait]
impl TextGenerator for MockText {
    async fn generate_json(&self, request: &TextRequest) -> DreamrightResult<serde_json::Value> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.fail_first {
            return Err(
                GeminiError::new(GeminiErrorKind::ApiRequest("connection reset".to_string()))
                    .into(),
            );
        }
        let system = request.system_instruction.as_deref().unwrap_or_default();
        if system.contains("story development") {
            Ok(serde_json::json!({
                "title": "Midnight Cafe",
                "logline": "A barista hears thoughts",
                "genre": "romance",
                "tone": "lighthearted",
                "synopsis": "Mina hears everyone but Joon.",
                "story_beats": [{"beat": "The gift", "description": "Mina's power awakens"}],
                "characters": [{
                    "name": "Mina",
                    "role": "protagonist",
                    "age": "24",
                    "physical_description": "Short silver bob",
                    "visual_tags": ["silver bob"]
                }],
                "locations": [{
                    "name": "Cafe",
                    "type": "interior",
                    "description": "A cramped late-night cafe"
                }]
            }))
        } else {
            Ok(serde_json::json!({
                "title": "The Gift",
                "summary": "Mina hears her first thought.",
                "scenes": [{
                    "number": 1,
                    "location": "Cafe",
                    "time_of_day": "evening",
                    "characters": ["Mina"],
                    "panels": [
                        {
                            "number": 1,
                            "shot_type": "wide",
                            "characters": [{"name": "Mina", "expression": "tired"}],
                            "action": "Mina wipes the counter"
                        },
                        {
                            "number": 2,
                            "shot_type": "close_up",
                            "characters": [{"name": "Mina", "expression": "startled"}],
                            "action": "A voice she did not hear with her ears",
                            "continues_from_previous": true
                        }
                    ]
                }]
            }))
        }
    }
}

struct MockImages {
    calls: AtomicUsize,
}

impl MockImages {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ImageGenerator for MockImages {
    async fn generate_image(&self, _request: &ImageRequest) -> DreamrightResult<GeneratedImage> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(GeneratedImage {
            data: format!("image-{}", call).into_bytes(),
            metadata: serde_json::json!({}),
        })
    }

    fn image_model(&self) -> &str {
        "mock-image"
    }
}

const QUEUE: &str = r#"
[[projects]]
name = "Midnight Cafe"
prompt = "a barista who reads minds"
episodes = 1
"#;

#[tokio::test]
async fn test_batch_runs_project_end_to_end_and_resumes() {
    let dir = TempDir::new().unwrap();
    let projects_dir = dir.path().join("projects");
    let log_path = dir.path().join("batch_generate.log");
    let queue = BatchQueue::parse(QUEUE).unwrap();

    let text = MockText::new();
    let images = MockImages::new();
    let runner = BatchRunner::new(&text, &images, &projects_dir, &log_path);
    let summary = runner.run(&queue).await;
    assert!(summary.all_succeeded());
    assert_eq!(summary.succeeded, vec!["Midnight Cafe".to_string()]);

    // Expansion plus one chapter; portrait, sheet, location, two panels.
    assert_eq!(text.calls.load(Ordering::SeqCst), 2);
    assert_eq!(images.calls.load(Ordering::SeqCst), 5);

    let project_path = projects_dir.join("midnight-cafe");
    let manager = ProjectManager::load(&project_path).await.unwrap();
    assert_eq!(manager.project.status, ProjectStatus::Completed);
    assert_eq!(manager.project.chapters.len(), 1);
    let panel_path = manager.project.chapters[0].scenes[0].panels[1]
        .image_path
        .as_deref()
        .unwrap();
    assert!(manager.storage.asset_exists(panel_path));

    let log = std::fs::read_to_string(&log_path).unwrap();
    assert!(log.contains("Batch run: 1 projects"));
    assert!(log.contains("✓ Midnight Cafe complete"));

    // A second run finds everything in place and calls no backend.
    let text = MockText::new();
    let images = MockImages::new();
    let runner = BatchRunner::new(&text, &images, &projects_dir, &log_path);
    let summary = runner.run(&queue).await;
    assert!(summary.all_succeeded());
    assert_eq!(text.calls.load(Ordering::SeqCst), 0);
    assert_eq!(images.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_transient_expansion_failure_is_retried() {
    let dir = TempDir::new().unwrap();
    let queue = BatchQueue::parse(QUEUE).unwrap();

    let text = MockText::flaky(1);
    let images = MockImages::new();
    let runner = BatchRunner::new(
        &text,
        &images,
        dir.path().join("projects"),
        dir.path().join("batch_generate.log"),
    );
    let summary = runner.run(&queue).await;
    assert!(summary.all_succeeded());
    // One failed expansion attempt, then expand and chapter succeed.
    assert_eq!(text.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_retries_fail_the_project_but_not_the_queue() {
    let dir = TempDir::new().unwrap();
    let queue = BatchQueue::parse(
        r#"
[[projects]]
name = "Doomed"
prompt = "never works"
episodes = 1

[[projects]]
name = "Fine"
prompt = "works"
episodes = 1
"#,
    )
    .unwrap();

    // Three failures exhaust the retry budget for the first project's
    // expansion; the second project then gets a working backend.
    let text = MockText::flaky(3);
    let images = MockImages::new();
    let runner = BatchRunner::new(
        &text,
        &images,
        dir.path().join("projects"),
        dir.path().join("batch_generate.log"),
    );
    let summary = runner.run(&queue).await;
    assert!(!summary.all_succeeded());
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].0, "Doomed");
    assert_eq!(summary.succeeded, vec!["Fine".to_string()]);
}
