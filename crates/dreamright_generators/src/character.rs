//! Character portrait and reference sheet generation.

use dreamright_core::Character;
use dreamright_error::{DreamrightResult, ProjectError, ProjectErrorKind};
use dreamright_gemini::{ImageGenerator, ImageRequest, ReferenceImage};
use dreamright_storage::{ProjectManager, slugify};

/// Options shared by character image operations.
#[derive(Debug, Clone)]
pub struct CharacterGenOptions {
    /// Art style clause prepended to every prompt
    pub style: String,
    /// Regenerate even when a cached response exists
    pub overwrite: bool,
}

impl Default for CharacterGenOptions {
    fn default() -> Self {
        Self {
            style: "modern webtoon art style, clean lines, vibrant colors".to_string(),
            overwrite: false,
        }
    }
}

/// Generates character reference imagery.
pub struct CharacterGenerator<'a> {
    images: &'a dyn ImageGenerator,
}

impl<'a> CharacterGenerator<'a> {
    /// Wrap an image generator.
    pub fn new(images: &'a dyn ImageGenerator) -> Self {
        Self { images }
    }

    /// Generate a 9:16 portrait for the named character and record it on
    /// the project. Returns the assets-relative path of the portrait.
    #[tracing::instrument(skip(self, manager, options), fields(name))]
    pub async fn generate_portrait(
        &self,
        manager: &mut ProjectManager,
        name: &str,
        options: &CharacterGenOptions,
    ) -> DreamrightResult<String> {
        let index = find_character(manager, name)?;
        let character = manager.project.characters[index].clone();

        let prompt = portrait_prompt(&character, &options.style);
        let mut references = Vec::new();
        if let Some(input) = &character.assets.reference_input {
            let data = manager.storage.read_asset(input).await?;
            references.push(ReferenceImage::png(
                format!("Likeness reference for {}", character.name),
                data,
            ));
        }

        let image = self
            .images
            .generate_image(&ImageRequest {
                prompt: prompt.clone(),
                references,
                aspect_ratio: "9:16".to_string(),
                resolution: "1K".to_string(),
                overwrite_cache: options.overwrite,
            })
            .await?;

        let folder = format!("characters/{}", slugify(&character.name));
        let metadata = sidecar(&prompt, "9:16", self.images.image_model(), &image.metadata);
        let relative = manager
            .save_asset(&folder, "portrait.png", &image.data, &metadata)
            .await?;

        manager.project.characters[index].assets.portrait = Some(relative.clone());
        manager.save().await?;
        tracing::info!(character = %character.name, path = %relative, "Generated portrait");
        Ok(relative)
    }

    /// Generate a 3:4 reference sheet showing front, side, and back views,
    /// using the portrait (when present) as a likeness reference. The sheet
    /// becomes the preferred panel reference for the character.
    #[tracing::instrument(skip(self, manager, options), fields(name))]
    pub async fn generate_three_view(
        &self,
        manager: &mut ProjectManager,
        name: &str,
        options: &CharacterGenOptions,
    ) -> DreamrightResult<String> {
        let index = find_character(manager, name)?;
        let character = manager.project.characters[index].clone();

        let prompt = three_view_prompt(&character, &options.style);
        let mut references = Vec::new();
        if let Some(portrait) = &character.assets.portrait {
            let data = manager.storage.read_asset(portrait).await?;
            references.push(ReferenceImage::png(
                format!("Portrait of {}", character.name),
                data,
            ));
        }

        let image = self
            .images
            .generate_image(&ImageRequest {
                prompt: prompt.clone(),
                references,
                aspect_ratio: "3:4".to_string(),
                resolution: "2K".to_string(),
                overwrite_cache: options.overwrite,
            })
            .await?;

        let folder = format!("characters/{}", slugify(&character.name));
        let metadata = sidecar(&prompt, "3:4", self.images.image_model(), &image.metadata);
        let relative = manager
            .save_asset(&folder, "three-view.png", &image.data, &metadata)
            .await?;

        manager.project.characters[index]
            .assets
            .three_view
            .insert("sheet".to_string(), relative.clone());
        manager.save().await?;
        tracing::info!(character = %character.name, path = %relative, "Generated reference sheet");
        Ok(relative)
    }
}

fn find_character(manager: &ProjectManager, name: &str) -> DreamrightResult<usize> {
    manager
        .project
        .characters
        .iter()
        .position(|c| c.name.eq_ignore_ascii_case(name) || c.id == name)
        .ok_or_else(|| {
            ProjectError::new(ProjectErrorKind::CharacterNotFound(name.to_string())).into()
        })
}

fn portrait_prompt(character: &Character, style: &str) -> String {
    let mut parts = vec![
        format!("{}.", style),
        format!(
            "Character portrait of {}, age {}.",
            character.name, character.age
        ),
        character.description.physical.clone(),
    ];
    if !character.visual_tags.is_empty() {
        parts.push(format!("Visual details: {}.", character.visual_tags.join(", ")));
    }
    if !character.description.personality.is_empty() {
        parts.push(format!(
            "Their personality shows in the expression: {}.",
            character.description.personality
        ));
    }
    parts.push(
        "Vertical portrait, head and shoulders to mid-torso, neutral background, \
         no text, no watermarks."
            .to_string(),
    );
    parts.retain(|p| !p.trim().is_empty());
    parts.join(" ")
}

fn three_view_prompt(character: &Character, style: &str) -> String {
    let mut parts = vec![
        format!("{}.", style),
        format!(
            "Character reference sheet for {}: full-body front view, side view, and back \
             view of the same character standing in a neutral pose, arranged side by side.",
            character.name
        ),
        character.description.physical.clone(),
    ];
    if !character.visual_tags.is_empty() {
        parts.push(format!("Visual details: {}.", character.visual_tags.join(", ")));
    }
    parts.push(
        "Identical outfit, colors, and proportions across all three views. Plain \
         background, no text, no labels."
            .to_string(),
    );
    parts.retain(|p| !p.trim().is_empty());
    parts.join(" ")
}

fn sidecar(
    prompt: &str,
    aspect_ratio: &str,
    model: &str,
    response_metadata: &serde_json::Value,
) -> serde_json::Value {
    serde_json::json!({
        "prompt": prompt,
        "aspect_ratio": aspect_ratio,
        "model": model,
        "generated_at": chrono::Utc::now().to_rfc3339(),
        "response": response_metadata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dreamright_core::CharacterRole;

    #[test]
    fn portrait_prompt_includes_tags_and_physique() {
        let mut character = Character::new("Mina Park", CharacterRole::Protagonist);
        character.age = "24".to_string();
        character.description.physical = "Short silver bob, round glasses".to_string();
        character.visual_tags = vec!["silver bob".to_string(), "round glasses".to_string()];

        let prompt = portrait_prompt(&character, "ink wash style");
        assert!(prompt.starts_with("ink wash style."));
        assert!(prompt.contains("Mina Park, age 24"));
        assert!(prompt.contains("silver bob, round glasses"));
        assert!(prompt.contains("no text"));
    }

    #[test]
    fn three_view_prompt_requests_all_views() {
        let character = Character::new("Joon", CharacterRole::LoveInterest);
        let prompt = three_view_prompt(&character, "webtoon style");
        assert!(prompt.contains("front view"));
        assert!(prompt.contains("side view"));
        assert!(prompt.contains("back view"));
    }
}
