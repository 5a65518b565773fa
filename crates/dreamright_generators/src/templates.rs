//! Panel image prompt assembly.
//!
//! One panel prompt is built from the scene context, the camera
//! composition, the characters in frame, and a continuity block when the
//! panel continues the previous moment. Dialogue is never rendered into
//! the image; lettering happens downstream.

use dreamright_core::{Character, Location, Panel, PanelCharacter, Scene};

const FULL_BLEED: &str =
    "Full bleed illustration filling the entire frame edge to edge, no borders, no gutters.";
const NO_TEXT: &str =
    "Absolutely no text, no speech bubbles, no captions, no sound effect lettering, \
     no watermarks anywhere in the image.";
const QUALITY: &str =
    "High quality webtoon panel, clean line art, consistent character proportions, \
     expressive faces, cinematic color.";

/// Everything needed to build one panel prompt.
pub struct PanelPromptArgs<'a> {
    /// Art style clause
    pub style: &'a str,
    /// The scene the panel belongs to
    pub scene: &'a Scene,
    /// The panel itself
    pub panel: &'a Panel,
    /// Scene location, when resolved
    pub location: Option<&'a Location>,
    /// Characters in frame paired with their panel presence
    pub characters: &'a [(&'a Character, &'a PanelCharacter)],
    /// Whether a previous-panel continuity reference is attached
    pub has_continuity_reference: bool,
}

/// Assemble the image prompt for a single panel.
pub fn panel_prompt(args: &PanelPromptArgs<'_>) -> String {
    let mut parts: Vec<String> = vec![format!("{}.", args.style)];

    if args.has_continuity_reference {
        parts.push(
            "This panel directly continues the attached previous panel. Keep the characters, \
             outfits, lighting, and setting visually identical; only the action advances."
                .to_string(),
        );
        if !args.panel.continuity_note.is_empty() {
            parts.push(format!("Continuity: {}.", args.panel.continuity_note));
        }
    } else {
        parts.push(
            "Match the art style of the attached reference images exactly, but compose a \
             fresh panel; do not copy their layouts."
                .to_string(),
        );
    }

    if let Some(location) = args.location {
        parts.push(format!("Setting: {}. {}", location.name, location.description));
    }
    parts.push(format!("Lighting: {}.", args.scene.time_of_day.lighting()));
    if !args.scene.mood.is_empty() {
        parts.push(format!("Mood: {}.", args.scene.mood));
    }

    parts.push(format!(
        "Camera: {}, {}.",
        args.panel.composition.shot_type.description(),
        args.panel.composition.angle.description()
    ));

    for (character, presence) in args.characters {
        let mut line = format!(
            "{} positioned at the {} of the frame, {} expression.",
            character.name, presence.position, presence.expression
        );
        if !character.visual_tags.is_empty() {
            line.push_str(&format!(" Appearance: {}.", character.visual_tags.join(", ")));
        }
        parts.push(line);
    }

    if !args.panel.action.is_empty() {
        parts.push(format!("Action: {}.", args.panel.action));
    }

    parts.push(FULL_BLEED.to_string());
    parts.push(NO_TEXT.to_string());
    parts.push(QUALITY.to_string());
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use dreamright_core::{
        CameraAngle, CharacterRole, LocationType, PanelComposition, ShotType, TimeOfDay,
    };

    fn fixture_scene() -> Scene {
        Scene {
            number: 1,
            location_id: None,
            time_of_day: TimeOfDay::Evening,
            mood: "wistful".to_string(),
            description: String::new(),
            character_ids: vec![],
            panels: vec![],
            continues_from_previous_chapter: false,
        }
    }

    fn fixture_panel() -> Panel {
        Panel {
            number: 2,
            composition: PanelComposition {
                shot_type: ShotType::CloseUp,
                angle: CameraAngle::Low,
            },
            characters: vec![],
            action: "She finally looks up".to_string(),
            dialogue: vec![],
            sfx: vec![],
            continues_from_previous: true,
            continuity_note: "same scarf, same rain".to_string(),
            image_path: None,
        }
    }

    #[test]
    fn continuity_block_appears_only_with_reference() {
        let scene = fixture_scene();
        let panel = fixture_panel();
        let mut character = Character::new("Mina", CharacterRole::Protagonist);
        character.visual_tags = vec!["silver bob".to_string()];
        let presence = PanelCharacter {
            character_id: character.id.clone(),
            expression: "surprised".to_string(),
            position: "left".to_string(),
        };
        let location = Location::new("Bus Stop", LocationType::Exterior);
        let pairs = [(&character, &presence)];

        let with_ref = panel_prompt(&PanelPromptArgs {
            style: "webtoon style",
            scene: &scene,
            panel: &panel,
            location: Some(&location),
            characters: &pairs,
            has_continuity_reference: true,
        });
        assert!(with_ref.contains("directly continues"));
        assert!(with_ref.contains("same scarf, same rain"));
        assert!(with_ref.contains("Mina positioned at the left"));
        assert!(with_ref.contains("surprised expression"));
        assert!(with_ref.contains(TimeOfDay::Evening.lighting()));
        assert!(with_ref.contains("no speech bubbles"));

        let without_ref = panel_prompt(&PanelPromptArgs {
            style: "webtoon style",
            scene: &scene,
            panel: &panel,
            location: Some(&location),
            characters: &pairs,
            has_continuity_reference: false,
        });
        assert!(!without_ref.contains("directly continues"));
        assert!(without_ref.contains("compose a fresh panel"));
    }
}
