//! Panel image generation.
//!
//! Panels are generated strictly in order within a scene: when a panel is
//! marked as continuing the previous moment, the previous panel's output
//! image is attached as a reference input, so the pipeline is sequential
//! by construction. A panel whose image already exists on disk is skipped
//! unless overwrite is requested, but its existing image still seeds the
//! continuity chain for its successor.

use dreamright_core::{Character, Panel, PanelCharacter, Project, Scene, ShotType};
use dreamright_error::{
    DreamrightResult, GenerationError, GenerationErrorKind, MissingDependency, ProjectError,
    ProjectErrorKind,
};
use dreamright_gemini::{ImageGenerator, ImageRequest, ReferenceImage};
use dreamright_storage::ProjectManager;
use std::collections::BTreeSet;

use crate::templates::{PanelPromptArgs, panel_prompt};

/// Options shared by panel image operations.
#[derive(Debug, Clone)]
pub struct PanelGenOptions {
    /// Art style clause prepended to every prompt
    pub style: String,
    /// Regenerate panels whose image already exists
    pub overwrite: bool,
}

impl Default for PanelGenOptions {
    fn default() -> Self {
        Self {
            style: "modern webtoon art style, clean lines, vibrant colors".to_string(),
            overwrite: false,
        }
    }
}

/// Outcome of one panel in a generation run.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelStatus {
    /// A new image was generated and saved
    Generated,
    /// The image already existed and overwrite was not requested
    Skipped,
    /// Generation failed; the run continued with the next panel
    Failed(String),
}

/// Per-panel record of a generation run.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelResult {
    /// Scene number
    pub scene: u32,
    /// Panel number within the scene
    pub panel: u32,
    /// Assets-relative image path, absent for failed panels
    pub image_path: Option<String>,
    /// What happened
    pub status: PanelStatus,
}

/// Count (generated, skipped, failed) across a run.
pub fn count_status(results: &[PanelResult]) -> (usize, usize, usize) {
    let mut counts = (0, 0, 0);
    for result in results {
        match result.status {
            PanelStatus::Generated => counts.0 += 1,
            PanelStatus::Skipped => counts.1 += 1,
            PanelStatus::Failed(_) => counts.2 += 1,
        }
    }
    counts
}

/// A one-off panel outside any chapter.
#[derive(Debug, Clone)]
pub struct OneOffPanel {
    /// What the panel shows
    pub description: String,
    /// Character in frame, by name
    pub character: Option<String>,
    /// Location, by name
    pub location: Option<String>,
    /// Character expression
    pub expression: String,
    /// Camera distance
    pub shot: ShotType,
    /// Dialogue recorded in the sidecar, never rendered
    pub dialogue: Option<String>,
    /// Scene number used for the default output path
    pub scene: u32,
    /// Assets-relative output path override
    pub output: Option<String>,
    /// Art style clause
    pub style: String,
    /// Regenerate even when a cached response exists
    pub overwrite: bool,
}

/// Generates panel images in sequence.
pub struct PanelGenerator<'a> {
    images: &'a dyn ImageGenerator,
}

impl<'a> PanelGenerator<'a> {
    /// Wrap an image generator.
    pub fn new(images: &'a dyn ImageGenerator) -> Self {
        Self { images }
    }

    /// Check that every asset a chapter's panels depend on exists.
    ///
    /// Returns one entry per missing prerequisite: the chapter itself, the
    /// previous chapter for cross-chapter continuity, character references,
    /// and location references.
    pub fn validate_dependencies(
        &self,
        manager: &ProjectManager,
        chapter_number: u32,
    ) -> Vec<MissingDependency> {
        let project = &manager.project;
        let mut missing = BTreeSet::new();

        let Some(chapter) = project.chapter_by_number(chapter_number) else {
            missing.insert(MissingDependency {
                kind: "chapter".to_string(),
                subject: format!("chapter {}", chapter_number),
                message: format!("chapter {} has not been generated", chapter_number),
                resolution: format!("dreamright generate chapter --beat {}", chapter_number),
            });
            return missing.into_iter().collect();
        };
        if chapter.scenes.is_empty() {
            missing.insert(MissingDependency {
                kind: "scenes".to_string(),
                subject: format!("chapter {}", chapter_number),
                message: format!("chapter {} has no scenes", chapter_number),
                resolution: format!("dreamright generate chapter --beat {}", chapter_number),
            });
        }
        if chapter_number > 1 && project.chapter_by_number(chapter_number - 1).is_none() {
            missing.insert(MissingDependency {
                kind: "previous_chapter".to_string(),
                subject: format!("chapter {}", chapter_number - 1),
                message: format!(
                    "chapter {} is needed for cross-chapter continuity",
                    chapter_number - 1
                ),
                resolution: format!("dreamright generate chapter --beat {}", chapter_number - 1),
            });
        }

        for scene in &chapter.scenes {
            if let Some(location_id) = &scene.location_id {
                match project.location_by_id(location_id) {
                    None => {
                        missing.insert(MissingDependency {
                            kind: "location".to_string(),
                            subject: location_id.clone(),
                            message: format!(
                                "scene {} references an unknown location",
                                scene.number
                            ),
                            resolution: "re-run 'dreamright generate chapter' for this beat"
                                .to_string(),
                        });
                    }
                    Some(location) => {
                        let exists = location
                            .assets
                            .reference
                            .as_deref()
                            .is_some_and(|path| manager.storage.asset_exists(path));
                        if !exists {
                            missing.insert(MissingDependency {
                                kind: "location_reference".to_string(),
                                subject: location.name.clone(),
                                message: format!("{} has no reference image", location.name),
                                resolution: format!(
                                    "dreamright generate location --name \"{}\"",
                                    location.name
                                ),
                            });
                        }
                    }
                }
            }

            let mut character_ids: BTreeSet<&str> =
                scene.character_ids.iter().map(String::as_str).collect();
            for panel in &scene.panels {
                character_ids.extend(panel.characters.iter().map(|c| c.character_id.as_str()));
            }
            for id in character_ids {
                match project.character_by_id(id) {
                    None => {
                        missing.insert(MissingDependency {
                            kind: "character".to_string(),
                            subject: id.to_string(),
                            message: format!("scene {} references an unknown character", scene.number),
                            resolution: "re-run 'dreamright generate chapter' for this beat"
                                .to_string(),
                        });
                    }
                    Some(character) => {
                        let exists = character
                            .panel_reference()
                            .is_some_and(|path| manager.storage.asset_exists(path));
                        if !exists {
                            missing.insert(MissingDependency {
                                kind: "character_reference".to_string(),
                                subject: character.name.clone(),
                                message: format!(
                                    "{} has no portrait or reference sheet",
                                    character.name
                                ),
                                resolution: format!(
                                    "dreamright generate character --name \"{}\"",
                                    character.name
                                ),
                            });
                        }
                    }
                }
            }
        }

        missing.into_iter().collect()
    }

    /// Generate every panel image in a chapter, scene by scene, in order.
    #[tracing::instrument(skip(self, manager, options), fields(chapter = chapter_number))]
    pub async fn generate_chapter_panels(
        &self,
        manager: &mut ProjectManager,
        chapter_number: u32,
        options: &PanelGenOptions,
    ) -> DreamrightResult<Vec<PanelResult>> {
        let missing = self.validate_dependencies(manager, chapter_number);
        if !missing.is_empty() {
            return Err(GenerationError::new(GenerationErrorKind::DependenciesNotMet {
                chapter: chapter_number,
                missing,
            })
            .into());
        }

        let snapshot = manager.project.clone();
        let chapter_index = chapter_position(&snapshot, chapter_number)?;
        let scene_count = snapshot.chapters[chapter_index].scenes.len();

        let mut carry = self
            .cross_chapter_seed(manager, &snapshot, chapter_number)
            .await;
        let mut results = Vec::new();
        for scene_index in 0..scene_count {
            carry = self
                .run_scene(
                    manager,
                    &snapshot,
                    chapter_index,
                    scene_index,
                    carry,
                    options,
                    &mut results,
                )
                .await?;
        }

        let (generated, skipped, failed) = count_status(&results);
        tracing::info!(generated, skipped, failed, "Chapter panel run finished");
        Ok(results)
    }

    /// Generate the panel images for one scene of a chapter.
    #[tracing::instrument(skip(self, manager, options), fields(chapter = chapter_number, scene = scene_number))]
    pub async fn generate_scene_panels(
        &self,
        manager: &mut ProjectManager,
        chapter_number: u32,
        scene_number: u32,
        options: &PanelGenOptions,
    ) -> DreamrightResult<Vec<PanelResult>> {
        let missing = self.validate_dependencies(manager, chapter_number);
        if !missing.is_empty() {
            return Err(GenerationError::new(GenerationErrorKind::DependenciesNotMet {
                chapter: chapter_number,
                missing,
            })
            .into());
        }

        let snapshot = manager.project.clone();
        let chapter_index = chapter_position(&snapshot, chapter_number)?;
        let scene_index = snapshot.chapters[chapter_index]
            .scenes
            .iter()
            .position(|s| s.number == scene_number)
            .ok_or_else(|| {
                ProjectError::new(ProjectErrorKind::SceneNotFound {
                    chapter: chapter_number,
                    scene: scene_number,
                })
            })?;

        // Seed continuity from whatever precedes this scene.
        let carry = if scene_index == 0 {
            self.cross_chapter_seed(manager, &snapshot, chapter_number)
                .await
        } else {
            let previous = &snapshot.chapters[chapter_index].scenes[scene_index - 1];
            match previous.panels.last().and_then(|p| p.image_path.as_deref()) {
                Some(path) if manager.storage.asset_exists(path) => {
                    manager.storage.read_asset(path).await.ok()
                }
                _ => None,
            }
        };

        let mut results = Vec::new();
        self.run_scene(
            manager,
            &snapshot,
            chapter_index,
            scene_index,
            carry,
            options,
            &mut results,
        )
        .await?;
        Ok(results)
    }

    /// Generate a single standalone panel and return its assets-relative path.
    #[tracing::instrument(skip(self, manager, request))]
    pub async fn generate_one_off(
        &self,
        manager: &ProjectManager,
        request: &OneOffPanel,
    ) -> DreamrightResult<String> {
        let project = &manager.project;
        let mut references = Vec::new();

        let character = match &request.character {
            Some(name) => {
                let character = project.character_by_name(name).ok_or_else(|| {
                    ProjectError::new(ProjectErrorKind::CharacterNotFound(name.clone()))
                })?;
                if let Some(path) = character.panel_reference() {
                    let data = manager.storage.read_asset(path).await?;
                    references.push(ReferenceImage::png(
                        format!("Character reference: {}", character.name),
                        data,
                    ));
                }
                Some(character)
            }
            None => None,
        };
        let location = match &request.location {
            Some(name) => {
                let location = project.location_by_name(name).ok_or_else(|| {
                    ProjectError::new(ProjectErrorKind::LocationNotFound(name.clone()))
                })?;
                if let Some(path) = &location.assets.reference {
                    let data = manager.storage.read_asset(path).await?;
                    references.push(ReferenceImage::png(
                        format!("Location reference: {}", location.name),
                        data,
                    ));
                }
                Some(location)
            }
            None => None,
        };

        let mut prompt = format!("{}. {}", request.style, request.description);
        if let Some(character) = character {
            prompt.push_str(&format!(
                " Featuring {}, {} expression.",
                character.name, request.expression
            ));
            if !character.visual_tags.is_empty() {
                prompt.push_str(&format!(
                    " Appearance: {}.",
                    character.visual_tags.join(", ")
                ));
            }
        }
        if let Some(location) = location {
            prompt.push_str(&format!(" Setting: {}.", location.name));
        }
        prompt.push_str(&format!(" Camera: {}.", request.shot.description()));
        prompt.push_str(
            " Full bleed illustration, no text, no speech bubbles, no watermarks. \
             High quality webtoon panel.",
        );

        let image = self
            .images
            .generate_image(&ImageRequest {
                prompt: prompt.clone(),
                references,
                aspect_ratio: "9:16".to_string(),
                resolution: "1K".to_string(),
                overwrite_cache: request.overwrite,
            })
            .await?;

        let (folder, filename) = match &request.output {
            Some(output) => split_relative(output),
            None => (format!("panels/scene_{}", request.scene), "panel_1.png".to_string()),
        };
        let metadata = serde_json::json!({
            "prompt": prompt,
            "description": request.description,
            "dialogue": request.dialogue,
            "shot_type": request.shot.to_string(),
            "model": self.images.image_model(),
            "generated_at": chrono::Utc::now().to_rfc3339(),
            "response": image.metadata,
        });
        manager
            .save_asset(&folder, &filename, &image.data, &metadata)
            .await
    }

    /// The previous chapter's final panel image, when the opening scene is
    /// marked as continuing from it.
    async fn cross_chapter_seed(
        &self,
        manager: &ProjectManager,
        project: &Project,
        chapter_number: u32,
    ) -> Option<Vec<u8>> {
        if chapter_number <= 1 {
            return None;
        }
        let chapter = project.chapter_by_number(chapter_number)?;
        if !chapter
            .scenes
            .first()
            .is_some_and(|s| s.continues_from_previous_chapter)
        {
            return None;
        }
        let path = project
            .chapter_by_number(chapter_number - 1)?
            .last_panel()?
            .image_path
            .clone()?;
        if !manager.storage.asset_exists(&path) {
            tracing::warn!(path = %path, "Previous chapter's last panel image is missing");
            return None;
        }
        manager.storage.read_asset(&path).await.ok()
    }

    /// Generate one scene's panels in order. Returns the bytes of the last
    /// successfully produced (or skipped-but-present) panel image, which
    /// seeds continuity for the next scene.
    #[allow(clippy::too_many_arguments)]
    async fn run_scene(
        &self,
        manager: &mut ProjectManager,
        snapshot: &Project,
        chapter_index: usize,
        scene_index: usize,
        mut previous: Option<Vec<u8>>,
        options: &PanelGenOptions,
        results: &mut Vec<PanelResult>,
    ) -> DreamrightResult<Option<Vec<u8>>> {
        let chapter_number = snapshot.chapters[chapter_index].number;
        let scene = &snapshot.chapters[chapter_index].scenes[scene_index];
        let folder = format!("panels/chapter-{}/scene-{}", chapter_number, scene.number);

        for (panel_index, panel) in scene.panels.iter().enumerate() {
            let filename = format!("panel-{}.png", panel.number);
            let relative = format!("{}/{}", folder, filename);

            if !options.overwrite && manager.storage.asset_exists(&relative) {
                tracing::debug!(path = %relative, "Panel image exists, skipping");
                // The existing image still anchors the continuity chain.
                previous = manager.storage.read_asset(&relative).await.ok();
                let stored = &mut manager.project.chapters[chapter_index].scenes[scene_index]
                    .panels[panel_index]
                    .image_path;
                if stored.is_none() {
                    *stored = Some(relative.clone());
                    manager.save().await?;
                }
                results.push(PanelResult {
                    scene: scene.number,
                    panel: panel.number,
                    image_path: Some(relative),
                    status: PanelStatus::Skipped,
                });
                continue;
            }

            let wants_continuity = panel.continues_from_previous
                || (panel_index == 0 && scene.continues_from_previous_chapter);
            let continuity = if wants_continuity { previous.take() } else { None };
            let request = self
                .build_panel_request(manager, snapshot, scene, panel, continuity, options)
                .await?;

            match self.images.generate_image(&request).await {
                Ok(image) => {
                    let metadata = serde_json::json!({
                        "prompt": request.prompt,
                        "chapter": chapter_number,
                        "scene": scene.number,
                        "panel": panel.number,
                        "model": self.images.image_model(),
                        "generated_at": chrono::Utc::now().to_rfc3339(),
                        "response": image.metadata,
                    });
                    let saved = manager
                        .save_asset(&folder, &filename, &image.data, &metadata)
                        .await?;
                    manager.project.chapters[chapter_index].scenes[scene_index].panels
                        [panel_index]
                        .image_path = Some(saved.clone());
                    manager.save().await?;
                    previous = Some(image.data);
                    results.push(PanelResult {
                        scene: scene.number,
                        panel: panel.number,
                        image_path: Some(saved),
                        status: PanelStatus::Generated,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        scene = scene.number,
                        panel = panel.number,
                        error = %e,
                        "Panel generation failed, continuing"
                    );
                    // A failed panel cannot anchor continuity.
                    previous = None;
                    results.push(PanelResult {
                        scene: scene.number,
                        panel: panel.number,
                        image_path: None,
                        status: PanelStatus::Failed(e.to_string()),
                    });
                }
            }
        }
        Ok(previous)
    }

    async fn build_panel_request(
        &self,
        manager: &ProjectManager,
        snapshot: &Project,
        scene: &Scene,
        panel: &Panel,
        continuity: Option<Vec<u8>>,
        options: &PanelGenOptions,
    ) -> DreamrightResult<ImageRequest> {
        let mut references = Vec::new();

        let characters: Vec<(&Character, &PanelCharacter)> = panel
            .characters
            .iter()
            .filter_map(|presence| {
                snapshot
                    .character_by_id(&presence.character_id)
                    .map(|c| (c, presence))
            })
            .collect();
        for (character, _) in &characters {
            // Validation guaranteed the reference exists.
            if let Some(path) = character.panel_reference() {
                let data = manager.storage.read_asset(path).await?;
                references.push(ReferenceImage::png(
                    format!("Character reference: {}", character.name),
                    data,
                ));
            }
        }

        let location = scene
            .location_id
            .as_deref()
            .and_then(|id| snapshot.location_by_id(id));
        if let Some(location) = location
            && let Some(path) = &location.assets.reference
        {
            let data = manager.storage.read_asset(path).await?;
            references.push(ReferenceImage::png(
                format!("Location reference: {}", location.name),
                data,
            ));
        }

        let has_continuity_reference = continuity.is_some();
        if let Some(data) = continuity {
            references.push(ReferenceImage::png(
                "Previous panel, continue directly from this moment",
                data,
            ));
        }

        let prompt = panel_prompt(&PanelPromptArgs {
            style: &options.style,
            scene,
            panel,
            location,
            characters: &characters,
            has_continuity_reference,
        });

        Ok(ImageRequest {
            prompt,
            references,
            aspect_ratio: "9:16".to_string(),
            resolution: "1K".to_string(),
            overwrite_cache: options.overwrite,
        })
    }
}

fn chapter_position(project: &Project, chapter_number: u32) -> DreamrightResult<usize> {
    project
        .chapters
        .iter()
        .position(|c| c.number == chapter_number)
        .ok_or_else(|| ProjectError::new(ProjectErrorKind::ChapterNotFound(chapter_number)).into())
}

fn split_relative(path: &str) -> (String, String) {
    match path.rsplit_once('/') {
        Some((folder, file)) => (folder.to_string(), file.to_string()),
        None => (String::new(), path.to_string()),
    }
}
