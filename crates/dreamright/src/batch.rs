//! Unattended batch production of whole projects.
//!
//! A TOML queue file lists projects to build. Each project runs through
//! the full pipeline under `projects/<slug>/`: init, story expansion,
//! character and location references, then chapters and panels per
//! episode. Every step checks for existing output first, so an
//! interrupted run resumes where it stopped. Transient failures retry a
//! few times on top of the client's own retry policy; reference asset
//! failures are warnings, while expansion, chapter, and panel failures
//! fail the project. One failed project does not stop the queue.

use dreamright_core::{ProjectFormat, ProjectStatus, TimeOfDay};
use dreamright_error::{ConfigError, DreamrightResult, GenerationError, GenerationErrorKind};
use dreamright_gemini::{ImageGenerator, TextGenerator};
use dreamright_generators::{
    CharacterGenOptions, ChapterGenerator, CharacterGenerator, ExpandOptions, LocationGenOptions,
    LocationGenerator, PanelGenOptions, PanelGenerator, StoryExpander, count_status,
};
use dreamright_storage::{ProjectManager, slugify};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const MAX_RETRIES: usize = 3;
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// One project in the batch queue.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchEntry {
    /// Project name, also used to derive the directory slug
    pub name: String,
    /// Story premise passed to expansion
    pub prompt: String,
    /// Episodes to plan and generate
    #[serde(default = "default_episodes")]
    pub episodes: u32,
    /// Optional genre hint
    #[serde(default)]
    pub genre: Option<String>,
    /// Optional tone hint
    #[serde(default)]
    pub tone: Option<String>,
}

fn default_episodes() -> u32 {
    8
}

/// The parsed queue file.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchQueue {
    /// Projects to run, in order
    pub projects: Vec<BatchEntry>,
}

impl BatchQueue {
    /// Parse a queue from TOML text.
    pub fn parse(text: &str) -> DreamrightResult<Self> {
        let queue: BatchQueue = toml::from_str(text)
            .map_err(|e| ConfigError::new(format!("batch queue: {}", e)))?;
        if queue.projects.is_empty() {
            return Err(ConfigError::new("batch queue lists no projects").into());
        }
        Ok(queue)
    }

    /// Load a queue file from disk.
    pub async fn load(path: impl AsRef<Path>) -> DreamrightResult<Self> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            ConfigError::new(format!("reading {}: {}", path.display(), e))
        })?;
        Self::parse(&text)
    }
}

/// Outcome of a batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    /// Projects that completed every step
    pub succeeded: Vec<String>,
    /// Projects that failed, with the error message
    pub failed: Vec<(String, String)>,
}

impl BatchSummary {
    /// Whether every project in the queue completed.
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Re-evaluates a step expression until it succeeds or the retry budget
/// runs out.
macro_rules! retry_step {
    ($runner:expr, $label:expr, $op:expr) => {{
        let mut attempt = 1;
        loop {
            match $op {
                Ok(value) => break Ok(value),
                Err(e) if attempt < MAX_RETRIES => {
                    $runner
                        .log(&format!(
                            "  retrying {} (attempt {}/{}): {}",
                            $label, attempt, MAX_RETRIES, e
                        ))
                        .await;
                    tokio::time::sleep(RETRY_DELAY).await;
                    attempt += 1;
                }
                Err(e) => break Err(e),
            }
        }
    }};
}

/// Drives the queue through the generation pipeline.
pub struct BatchRunner<'a> {
    text: &'a dyn TextGenerator,
    images: &'a dyn ImageGenerator,
    projects_dir: PathBuf,
    log_path: PathBuf,
}

impl<'a> BatchRunner<'a> {
    /// Create a runner writing projects under `projects_dir` and appending
    /// progress to `log_path`.
    pub fn new(
        text: &'a dyn TextGenerator,
        images: &'a dyn ImageGenerator,
        projects_dir: impl Into<PathBuf>,
        log_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            text,
            images,
            projects_dir: projects_dir.into(),
            log_path: log_path.into(),
        }
    }

    /// Run every project in the queue and return the summary.
    pub async fn run(&self, queue: &BatchQueue) -> BatchSummary {
        let started = std::time::Instant::now();
        let mut summary = BatchSummary::default();
        self.log(&format!("Batch run: {} projects", queue.projects.len()))
            .await;

        for entry in &queue.projects {
            self.log(&format!("=== {} ===", entry.name)).await;
            match self.run_project(entry).await {
                Ok(()) => {
                    self.log(&format!("✓ {} complete", entry.name)).await;
                    summary.succeeded.push(entry.name.clone());
                }
                Err(e) => {
                    self.log(&format!("❌ {} failed: {}", entry.name, e)).await;
                    summary.failed.push((entry.name.clone(), e.to_string()));
                }
            }
        }

        self.log(&format!(
            "Batch finished in {:.1}s: {} succeeded, {} failed",
            started.elapsed().as_secs_f64(),
            summary.succeeded.len(),
            summary.failed.len()
        ))
        .await;
        summary
    }

    async fn run_project(&self, entry: &BatchEntry) -> DreamrightResult<()> {
        let path = self.projects_dir.join(slugify(&entry.name));

        let mut manager = if ProjectManager::exists(&path) {
            self.log("  project exists, resuming").await;
            ProjectManager::load(&path).await?
        } else {
            self.log(&format!("  init {}", path.display())).await;
            ProjectManager::create(&path, &entry.name, ProjectFormat::Webtoon).await?
        };

        if manager.project.characters.is_empty() {
            self.log("  expanding story").await;
            let expander = StoryExpander::new(self.text);
            let options = ExpandOptions {
                genre: entry.genre.clone(),
                tone: entry.tone.clone(),
                episodes: entry.episodes,
            };
            let expansion =
                retry_step!(self, "expand", expander.expand(&entry.prompt, &options).await)?;
            manager.project.original_prompt = Some(entry.prompt.clone());
            manager.project.story = Some(expansion.story);
            manager.project.characters = expansion.characters;
            manager.project.locations = expansion.locations;
            manager.project.status = ProjectStatus::InProgress;
            manager.save().await?;
        } else {
            self.log("  story already expanded, skipping").await;
        }

        self.generate_references(&mut manager).await;
        self.generate_chapters(&mut manager, entry.episodes).await?;

        manager.project.status = ProjectStatus::Completed;
        manager.save().await?;
        Ok(())
    }

    /// Character and location references. Failures here are warnings so a
    /// flaky image model does not kill the whole project; panel validation
    /// will surface anything still missing.
    async fn generate_references(&self, manager: &mut ProjectManager) {
        let characters = CharacterGenerator::new(self.images);
        let names: Vec<String> = manager
            .project
            .characters
            .iter()
            .map(|c| c.name.clone())
            .collect();
        for name in names {
            let done = manager
                .project
                .character_by_name(&name)
                .and_then(|c| c.assets.portrait.as_deref())
                .is_some_and(|p| manager.storage.asset_exists(p));
            if done {
                self.log(&format!("  portrait exists for {}, skipping", name))
                    .await;
                continue;
            }
            let options = CharacterGenOptions::default();
            if let Err(e) = retry_step!(
                self,
                "portrait",
                characters.generate_portrait(manager, &name, &options).await
            ) {
                self.log(&format!("  ⚠ portrait for {} failed: {}", name, e))
                    .await;
                continue;
            }
            if let Err(e) = retry_step!(
                self,
                "reference sheet",
                characters.generate_three_view(manager, &name, &options).await
            ) {
                self.log(&format!("  ⚠ reference sheet for {} failed: {}", name, e))
                    .await;
            }
        }

        let locations = LocationGenerator::new(self.images);
        let names: Vec<String> = manager
            .project
            .locations
            .iter()
            .map(|l| l.name.clone())
            .collect();
        for name in names {
            let done = manager
                .project
                .location_by_name(&name)
                .and_then(|l| l.assets.reference.as_deref())
                .is_some_and(|p| manager.storage.asset_exists(p));
            if done {
                self.log(&format!("  reference exists for {}, skipping", name))
                    .await;
                continue;
            }
            let options = LocationGenOptions::default();
            if let Err(e) = retry_step!(
                self,
                "location reference",
                locations
                    .generate_reference(manager, &name, TimeOfDay::Day, &options)
                    .await
            ) {
                self.log(&format!("  ⚠ reference for {} failed: {}", name, e))
                    .await;
            }
        }
    }

    async fn generate_chapters(
        &self,
        manager: &mut ProjectManager,
        episodes: u32,
    ) -> DreamrightResult<()> {
        let chapters = ChapterGenerator::new(self.text);
        let panels = PanelGenerator::new(self.images);

        for beat in 1..=episodes {
            let written = manager
                .project
                .chapter_by_number(beat)
                .is_some_and(|c| !c.scenes.is_empty());
            if written {
                self.log(&format!("  chapter {} exists, skipping", beat)).await;
            } else {
                self.log(&format!("  writing chapter {}", beat)).await;
                retry_step!(
                    self,
                    "chapter",
                    chapters.generate_chapter(manager, beat, 5).await
                )?;
            }

            let rendered = manager
                .project
                .chapter_by_number(beat)
                .map(|c| {
                    c.scenes.iter().flat_map(|s| s.panels.iter()).any(|p| {
                        p.image_path
                            .as_deref()
                            .is_some_and(|path| manager.storage.asset_exists(path))
                    })
                })
                .unwrap_or(false);
            if rendered {
                self.log(&format!("  chapter {} panels exist, skipping", beat))
                    .await;
                continue;
            }

            self.log(&format!("  rendering chapter {} panels", beat)).await;
            let results = retry_step!(
                self,
                "panels",
                panels
                    .generate_chapter_panels(manager, beat, &PanelGenOptions::default())
                    .await
            )?;
            let (generated, skipped, failed) = count_status(&results);
            self.log(&format!(
                "  chapter {}: {} generated, {} skipped, {} failed",
                beat, generated, skipped, failed
            ))
            .await;
            if failed > 0 {
                return Err(GenerationError::new(GenerationErrorKind::Incomplete(format!(
                    "{} panels failed in chapter {}",
                    failed, beat
                )))
                .into());
            }
        }
        Ok(())
    }

    /// Print a progress line and append it to the batch log. Log file
    /// trouble is reported but never fails the run.
    async fn log(&self, line: &str) {
        println!("{}", line);
        let stamped = format!("[{}] {}\n", chrono::Utc::now().format("%Y-%m-%d %H:%M:%S"), line);
        let result = async {
            use tokio::io::AsyncWriteExt;
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.log_path)
                .await?;
            file.write_all(stamped.as_bytes()).await
        }
        .await;
        if let Err(e) = result {
            tracing::warn!(path = %self.log_path.display(), error = %e, "Could not append to batch log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_parses_with_defaults() {
        let queue = BatchQueue::parse(
            r#"
[[projects]]
name = "Midnight Cafe"
prompt = "a barista who reads minds"
episodes = 3
genre = "romance"

[[projects]]
name = "Second Story"
prompt = "two rival couriers"
"#,
        )
        .unwrap();
        assert_eq!(queue.projects.len(), 2);
        assert_eq!(queue.projects[0].episodes, 3);
        assert_eq!(queue.projects[0].genre.as_deref(), Some("romance"));
        assert_eq!(queue.projects[1].episodes, 8);
        assert_eq!(queue.projects[1].tone, None);
    }

    #[test]
    fn empty_queue_is_an_error() {
        assert!(BatchQueue::parse("projects = []").is_err());
        assert!(BatchQueue::parse("not toml at all [").is_err());
    }
}
