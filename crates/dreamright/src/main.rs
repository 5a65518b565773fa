use clap::Parser;
use dreamright::{
    BatchQueue, BatchRunner, Cli, Commands, GenerateCommands, GeminiClient, ProjectFormat,
    ProjectManager, ProjectStatus, TimeOfDay, slugify,
};
use dreamright_error::{DreamrightErrorKind, GenerationErrorKind};
use dreamright_generators::{
    CharacterGenOptions, ChapterGenerator, CharacterGenerator, ExpandOptions, LocationGenOptions,
    LocationGenerator, OneOffPanel, PanelGenOptions, PanelGenerator, StoryExpander,
    count_status, format_chapter_result,
};
use std::path::Path;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    match cli.command {
        Commands::Init { name, format } => {
            init_project(&cli.project, &name, &format).await?;
        }

        Commands::Expand {
            prompt,
            genre,
            tone,
            episodes,
        } => {
            expand_story(&cli.project, &prompt, genre, tone, episodes).await?;
        }

        Commands::Generate { command } => match command {
            GenerateCommands::Character {
                name,
                style,
                portrait_only,
                overwrite,
            } => {
                generate_characters(&cli.project, name, style, portrait_only, overwrite).await?;
            }
            GenerateCommands::Location {
                name,
                style,
                time,
                weather,
                overwrite,
            } => {
                generate_locations(&cli.project, name, style, time, weather, overwrite).await?;
            }
            GenerateCommands::Chapter {
                beat,
                all,
                panels_per_scene,
            } => {
                generate_chapters(&cli.project, beat, all, panels_per_scene).await?;
            }
            GenerateCommands::Panel {
                description,
                character,
                location,
                expression,
                shot,
                dialogue,
                style,
                scene,
                output,
                overwrite,
            } => {
                let request = OneOffPanel {
                    description,
                    character,
                    location,
                    expression,
                    shot: dreamright::ShotType::parse_loose(&shot),
                    dialogue,
                    scene,
                    output,
                    style: style
                        .unwrap_or_else(|| PanelGenOptions::default().style),
                    overwrite,
                };
                generate_one_off_panel(&cli.project, request).await?;
            }
            GenerateCommands::Panels {
                chapter,
                scene,
                style,
                overwrite,
            } => {
                generate_panels(&cli.project, chapter, scene, style, overwrite).await?;
            }
        },

        Commands::Status => {
            show_status(&cli.project).await?;
        }

        Commands::Show { entity } => {
            show_entity(&cli.project, &entity).await?;
        }

        Commands::Batch {
            queue,
            projects_dir,
            log,
        } => {
            let queue = BatchQueue::load(&queue).await?;
            let client = GeminiClient::new()?;
            let runner = BatchRunner::new(&client, &client, projects_dir, log);
            let summary = runner.run(&queue).await;
            if !summary.all_succeeded() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

/// Create a project in `base` when it is empty, otherwise in `base/<slug>`.
async fn init_project(
    base: &Path,
    name: &str,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let format = ProjectFormat::parse_loose(format);
    let target = if ProjectManager::exists(base) {
        return Err(format!("a project already exists at {}", base.display()).into());
    } else if dir_is_available(base) {
        base.to_path_buf()
    } else {
        base.join(slugify(name))
    };

    let manager = ProjectManager::create(&target, name, format).await?;
    println!("✓ Created project '{}' at {}", manager.project.name, target.display());
    println!("  Next: dreamright expand \"your story premise\"");
    Ok(())
}

fn dir_is_available(path: &Path) -> bool {
    match std::fs::read_dir(path) {
        // Dotfiles such as .env do not count as occupancy.
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .all(|e| e.file_name().to_string_lossy().starts_with('.')),
        Err(_) => !path.exists(),
    }
}

async fn expand_story(
    project: &Path,
    prompt: &str,
    genre: Option<String>,
    tone: Option<String>,
    episodes: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut manager = ProjectManager::load(project).await?;
    let client = GeminiClient::new()?;
    let expander = StoryExpander::new(&client);

    println!("🚀 Expanding story ({} episodes)...", episodes);
    let expansion = expander
        .expand(prompt, &ExpandOptions { genre, tone, episodes })
        .await?;

    println!("\n✓ {}", expansion.story.title);
    println!("  {}", expansion.story.logline);
    println!(
        "  Genre: {} | Tone: {} | Beats: {}",
        expansion.story.genre,
        expansion.story.tone,
        expansion.story.story_beats.len()
    );
    println!("  Characters: {}", expansion.characters.len());
    for character in &expansion.characters {
        println!("    - {} ({})", character.name, character.role);
    }
    println!("  Locations: {}", expansion.locations.len());
    for location in &expansion.locations {
        println!("    - {}", location.name);
    }

    manager.project.original_prompt = Some(prompt.to_string());
    manager.project.story = Some(expansion.story);
    manager.project.characters = expansion.characters;
    manager.project.locations = expansion.locations;
    manager.project.status = ProjectStatus::InProgress;
    manager.save().await?;
    println!("\n💾 Saved. Next: dreamright generate character");
    Ok(())
}

async fn generate_characters(
    project: &Path,
    name: Option<String>,
    style: Option<String>,
    portrait_only: bool,
    overwrite: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut manager = ProjectManager::load(project).await?;
    let client = GeminiClient::new()?;
    let generator = CharacterGenerator::new(&client);
    let mut options = CharacterGenOptions {
        overwrite,
        ..Default::default()
    };
    if let Some(style) = style {
        options.style = style;
    }

    let names: Vec<String> = match name {
        Some(name) => vec![name],
        None => manager
            .project
            .characters
            .iter()
            .map(|c| c.name.clone())
            .collect(),
    };
    if names.is_empty() {
        return Err("no characters in project; run 'dreamright expand' first".into());
    }

    for name in names {
        println!("🎨 Generating portrait for {}...", name);
        let path = generator.generate_portrait(&mut manager, &name, &options).await?;
        println!("  ✓ {}", path);
        if !portrait_only {
            println!("🎨 Generating reference sheet for {}...", name);
            let path = generator
                .generate_three_view(&mut manager, &name, &options)
                .await?;
            println!("  ✓ {}", path);
        }
    }
    Ok(())
}

async fn generate_locations(
    project: &Path,
    name: Option<String>,
    style: Option<String>,
    time: Option<String>,
    weather: Option<String>,
    overwrite: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut manager = ProjectManager::load(project).await?;
    let client = GeminiClient::new()?;
    let generator = LocationGenerator::new(&client);
    let mut options = LocationGenOptions {
        weather,
        overwrite,
        ..Default::default()
    };
    if let Some(style) = style {
        options.style = style;
    }

    let names: Vec<String> = match name {
        Some(name) => vec![name],
        None => manager
            .project
            .locations
            .iter()
            .map(|l| l.name.clone())
            .collect(),
    };
    if names.is_empty() {
        return Err("no locations in project; run 'dreamright expand' first".into());
    }

    for name in names {
        match &time {
            Some(time) => {
                let time = TimeOfDay::parse_loose(time);
                println!("🎨 Generating {} at {}...", name, time);
                let path = generator
                    .generate_reference(&mut manager, &name, time, &options)
                    .await?;
                println!("  ✓ {}", path);
            }
            None => {
                println!("🎨 Generating {} across the day...", name);
                for path in generator
                    .generate_variations(&mut manager, &name, &options)
                    .await?
                {
                    println!("  ✓ {}", path);
                }
            }
        }
    }
    Ok(())
}

async fn generate_chapters(
    project: &Path,
    beat: Option<u32>,
    all: bool,
    panels_per_scene: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut manager = ProjectManager::load(project).await?;

    let beats = if let Some(beat) = beat {
        vec![beat]
    } else if all {
        let remaining = manager.project.remaining_beats();
        if remaining.is_empty() {
            println!("✓ Every beat already has a chapter.");
            return Ok(());
        }
        remaining
    } else {
        // No flag: list beat status instead of generating.
        let story = manager
            .project
            .story
            .as_ref()
            .ok_or("story has not been expanded; run 'dreamright expand' first")?;
        println!("Story beats:");
        for (i, beat) in story.story_beats.iter().enumerate() {
            let number = i as u32 + 1;
            let marker = if manager.project.chapter_by_number(number).is_some() {
                "✓"
            } else {
                " "
            };
            println!("  [{}] {}. {}", marker, number, beat.beat);
        }
        println!("\nUse --beat N to generate one, or --all for every remaining beat.");
        return Ok(());
    };

    let client = GeminiClient::new()?;
    let generator = ChapterGenerator::new(&client);
    for beat in beats {
        println!("📝 Writing chapter {}...", beat);
        let chapter = generator
            .generate_chapter(&mut manager, beat, panels_per_scene)
            .await?;
        println!("{}", format_chapter_result(&chapter));
    }
    Ok(())
}

async fn generate_panels(
    project: &Path,
    chapter: u32,
    scene: Option<u32>,
    style: Option<String>,
    overwrite: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut manager = ProjectManager::load(project).await?;
    let client = GeminiClient::new()?;
    let generator = PanelGenerator::new(&client);
    let mut options = PanelGenOptions {
        overwrite,
        ..Default::default()
    };
    if let Some(style) = style {
        options.style = style;
    }

    let run = match scene {
        Some(scene) => {
            println!("🎨 Rendering chapter {} scene {}...", chapter, scene);
            generator
                .generate_scene_panels(&mut manager, chapter, scene, &options)
                .await
        }
        None => {
            println!("🎨 Rendering chapter {} panels...", chapter);
            generator
                .generate_chapter_panels(&mut manager, chapter, &options)
                .await
        }
    };

    let results = match run {
        Ok(results) => results,
        Err(e) => {
            if let DreamrightErrorKind::Generation(generation) = e.kind()
                && let GenerationErrorKind::DependenciesNotMet { missing, .. } = &generation.kind
            {
                eprintln!("❌ Chapter {} is not ready for panels:", chapter);
                for dependency in missing {
                    eprintln!("  - {}", dependency);
                }
                std::process::exit(1);
            }
            return Err(e.into());
        }
    };

    let (generated, skipped, failed) = count_status(&results);
    println!(
        "\n📊 {} generated, {} skipped, {} failed",
        generated, skipped, failed
    );
    for result in &results {
        if let dreamright_generators::PanelStatus::Failed(message) = &result.status {
            eprintln!(
                "  ❌ scene {} panel {}: {}",
                result.scene, result.panel, message
            );
        }
    }
    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

async fn generate_one_off_panel(
    project: &Path,
    request: OneOffPanel,
) -> Result<(), Box<dyn std::error::Error>> {
    let manager = ProjectManager::load(project).await?;
    let client = GeminiClient::new()?;
    let generator = PanelGenerator::new(&client);

    println!("🎨 Rendering panel...");
    let path = generator.generate_one_off(&manager, &request).await?;
    println!("✓ {}", path);
    Ok(())
}

async fn show_status(project: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let manager = ProjectManager::load(project).await?;
    let project = &manager.project;

    println!("📁 {} ({})", project.name, project.format);
    println!(
        "  Status: {} | Created: {}",
        project.status,
        project.created_at.format("%Y-%m-%d")
    );

    match &project.story {
        Some(story) => {
            println!("\n📖 {}", story.title);
            println!("  {}", story.logline);
        }
        None => {
            println!("\n📖 No story yet. Run: dreamright expand \"your premise\"");
            return Ok(());
        }
    }

    println!("\n👤 Characters:");
    for character in &project.characters {
        let marker = if character
            .assets
            .portrait
            .as_deref()
            .is_some_and(|p| manager.storage.asset_exists(p))
        {
            "✓"
        } else {
            " "
        };
        println!("  [{}] {} ({})", marker, character.name, character.role);
    }

    println!("\n🏞 Locations:");
    for location in &project.locations {
        let marker = if location
            .assets
            .reference
            .as_deref()
            .is_some_and(|p| manager.storage.asset_exists(p))
        {
            "✓"
        } else {
            " "
        };
        println!("  [{}] {}", marker, location.name);
    }

    let total_panels: usize = project.chapters.iter().map(|c| c.panel_count()).sum();
    let rendered: usize = project
        .chapters
        .iter()
        .flat_map(|c| c.scenes.iter())
        .flat_map(|s| s.panels.iter())
        .filter(|p| {
            p.image_path
                .as_deref()
                .is_some_and(|path| manager.storage.asset_exists(path))
        })
        .count();
    println!(
        "\n📚 Chapters: {} | Panels rendered: {}/{}",
        project.chapters.len(),
        rendered,
        total_panels
    );
    Ok(())
}

async fn show_entity(project: &Path, entity: &str) -> Result<(), Box<dyn std::error::Error>> {
    let manager = ProjectManager::load(project).await?;
    let project = &manager.project;

    match entity.split_once(':') {
        None if entity == "story" => {
            let story = project
                .story
                .as_ref()
                .ok_or("story has not been expanded yet")?;
            println!("📖 {}", story.title);
            println!("  {}", story.logline);
            println!(
                "  Genre: {} | Tone: {} | Audience: {}",
                story.genre, story.tone, story.target_audience
            );
            println!("  Themes: {}", story.themes.join(", "));
            println!("\n{}", story.synopsis);
            println!("\nBeats:");
            for (i, beat) in story.story_beats.iter().enumerate() {
                println!("  {}. {}: {}", i + 1, beat.beat, beat.description);
            }
        }
        Some(("character", name)) => {
            let character = project
                .character_by_name(name)
                .ok_or_else(|| format!("character not found: {}", name))?;
            println!("👤 {} ({}, age {})", character.name, character.role, character.age);
            println!("  Physical: {}", character.description.physical);
            println!("  Personality: {}", character.description.personality);
            println!("  Background: {}", character.description.background);
            println!("  Motivation: {}", character.description.motivation);
            println!("  Tags: {}", character.visual_tags.join(", "));
            if let Some(portrait) = &character.assets.portrait {
                println!("  Portrait: {}", portrait);
            }
            for (view, path) in &character.assets.three_view {
                println!("  Sheet ({}): {}", view, path);
            }
        }
        Some(("location", name)) => {
            let location = project
                .location_by_name(name)
                .ok_or_else(|| format!("location not found: {}", name))?;
            println!("🏞 {} ({})", location.name, location.location_type);
            println!("  {}", location.description);
            println!("  Tags: {}", location.visual_tags.join(", "));
            for (time, path) in &location.assets.variations {
                println!("  {}: {}", time, path);
            }
        }
        _ => {
            return Err(format!(
                "unknown entity '{}'; use story, character:<name>, or location:<name>",
                entity
            )
            .into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotfiles_do_not_occupy_a_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(dir_is_available(dir.path()));
        std::fs::write(dir.path().join(".env"), "KEY=value").unwrap();
        assert!(dir_is_available(dir.path()));
        std::fs::write(dir.path().join("notes.txt"), "hello").unwrap();
        assert!(!dir_is_available(dir.path()));
        assert!(dir_is_available(&dir.path().join("does-not-exist")));
    }
}
