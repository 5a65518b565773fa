//! Location background generation across times of day.

use dreamright_core::{Location, TimeOfDay};
use dreamright_error::{DreamrightResult, ProjectError, ProjectErrorKind};
use dreamright_gemini::{ImageGenerator, ImageRequest};
use dreamright_storage::{ProjectManager, slugify};
use strum::IntoEnumIterator;

/// Options shared by location image operations.
#[derive(Debug, Clone)]
pub struct LocationGenOptions {
    /// Art style clause prepended to every prompt
    pub style: String,
    /// Weather descriptor, free-form ("clear", "rainy", ...)
    pub weather: Option<String>,
    /// Regenerate even when a cached response exists
    pub overwrite: bool,
}

impl Default for LocationGenOptions {
    fn default() -> Self {
        Self {
            style: "modern webtoon art style, clean lines, vibrant colors".to_string(),
            weather: None,
            overwrite: false,
        }
    }
}

/// Generates location reference backgrounds.
pub struct LocationGenerator<'a> {
    images: &'a dyn ImageGenerator,
}

impl<'a> LocationGenerator<'a> {
    /// Wrap an image generator.
    pub fn new(images: &'a dyn ImageGenerator) -> Self {
        Self { images }
    }

    /// Generate a 16:9 background for the named location at the given time
    /// of day. The first generated variation also becomes the location's
    /// primary reference. Returns the assets-relative path.
    #[tracing::instrument(skip(self, manager, options), fields(name, time = %time))]
    pub async fn generate_reference(
        &self,
        manager: &mut ProjectManager,
        name: &str,
        time: TimeOfDay,
        options: &LocationGenOptions,
    ) -> DreamrightResult<String> {
        let index = find_location(manager, name)?;
        let location = manager.project.locations[index].clone();

        let prompt = background_prompt(&location, time, options);
        let image = self
            .images
            .generate_image(&ImageRequest {
                prompt: prompt.clone(),
                references: Vec::new(),
                aspect_ratio: "16:9".to_string(),
                resolution: "2K".to_string(),
                overwrite_cache: options.overwrite,
            })
            .await?;

        let folder = format!("locations/{}", slugify(&location.name));
        let filename = format!("{}.png", time);
        let metadata = serde_json::json!({
            "prompt": prompt,
            "aspect_ratio": "16:9",
            "time_of_day": time.to_string(),
            "model": self.images.image_model(),
            "generated_at": chrono::Utc::now().to_rfc3339(),
            "response": image.metadata,
        });
        let relative = manager
            .save_asset(&folder, &filename, &image.data, &metadata)
            .await?;

        let assets = &mut manager.project.locations[index].assets;
        assets
            .variations
            .insert(time.to_string(), relative.clone());
        if assets.reference.is_none() {
            assets.reference = Some(relative.clone());
        }
        manager.save().await?;
        tracing::info!(location = %location.name, path = %relative, "Generated background");
        Ok(relative)
    }

    /// Generate backgrounds for every time of day, skipping variations that
    /// already exist on disk unless `options.overwrite` is set.
    pub async fn generate_variations(
        &self,
        manager: &mut ProjectManager,
        name: &str,
        options: &LocationGenOptions,
    ) -> DreamrightResult<Vec<String>> {
        let index = find_location(manager, name)?;
        let mut paths = Vec::new();
        for time in TimeOfDay::iter() {
            let existing = manager.project.locations[index]
                .assets
                .variations
                .get(&time.to_string())
                .cloned();
            if !options.overwrite
                && let Some(path) = existing
                && manager.storage.asset_exists(&path)
            {
                tracing::debug!(time = %time, path = %path, "Variation exists, skipping");
                paths.push(path);
                continue;
            }
            paths.push(self.generate_reference(manager, name, time, options).await?);
        }
        Ok(paths)
    }
}

fn find_location(manager: &ProjectManager, name: &str) -> DreamrightResult<usize> {
    manager
        .project
        .locations
        .iter()
        .position(|l| l.name.eq_ignore_ascii_case(name) || l.id == name)
        .ok_or_else(|| {
            ProjectError::new(ProjectErrorKind::LocationNotFound(name.to_string())).into()
        })
}

fn weather_text(weather: &str) -> &'static str {
    match weather.trim().to_lowercase().as_str() {
        "cloudy" => "overcast sky, soft diffuse light",
        "rainy" => "rain falling, wet reflective surfaces",
        "snowy" => "snow falling, muted cool palette",
        _ => "clear weather",
    }
}

fn background_prompt(location: &Location, time: TimeOfDay, options: &LocationGenOptions) -> String {
    let mut parts = vec![
        format!("{}.", options.style),
        format!(
            "Background illustration of {}, an {} location.",
            location.name, location.location_type
        ),
        location.description.clone(),
        format!("Lighting: {}.", time.lighting()),
    ];
    if let Some(weather) = &options.weather {
        parts.push(format!("Weather: {}.", weather_text(weather)));
    }
    if !location.visual_tags.is_empty() {
        parts.push(format!("Visual details: {}.", location.visual_tags.join(", ")));
    }
    parts.push("Wide establishing view, no people, no text, no watermarks.".to_string());
    parts.retain(|p| !p.trim().is_empty());
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use dreamright_core::LocationType;

    #[test]
    fn background_prompt_carries_lighting_and_weather() {
        let mut location = Location::new("Rooftop Garden", LocationType::Exterior);
        location.description = "A rooftop garden above the city".to_string();
        let options = LocationGenOptions {
            weather: Some("Rainy".to_string()),
            ..Default::default()
        };

        let prompt = background_prompt(&location, TimeOfDay::Night, &options);
        assert!(prompt.contains("Rooftop Garden"));
        assert!(prompt.contains(TimeOfDay::Night.lighting()));
        assert!(prompt.contains("wet reflective surfaces"));
        assert!(prompt.contains("no people"));
    }

    #[test]
    fn unknown_weather_falls_back_to_clear() {
        assert_eq!(weather_text("hail of frogs"), "clear weather");
        assert_eq!(weather_text(" SNOWY "), "snow falling, muted cool palette");
    }
}
