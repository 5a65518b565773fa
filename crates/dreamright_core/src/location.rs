//! Location types and time-of-day handling.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Whether a location is indoors or outdoors.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LocationType {
    /// Indoor space
    Interior,
    /// Outdoor space
    Exterior,
}

impl LocationType {
    /// Parse a type from model output, defaulting to [`LocationType::Interior`].
    pub fn parse_loose(s: &str) -> Self {
        s.trim().to_lowercase().parse().unwrap_or(LocationType::Interior)
    }
}

/// Time of day, which drives scene lighting and the background variation used.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TimeOfDay {
    /// Early morning light
    Morning,
    /// Full daylight
    Day,
    /// Sunset hours
    Evening,
    /// After dark
    Night,
}

impl TimeOfDay {
    /// Parse a time from model output, defaulting to [`TimeOfDay::Day`].
    ///
    /// # Examples
    ///
    /// ```
    /// use dreamright_core::TimeOfDay;
    ///
    /// assert_eq!(TimeOfDay::parse_loose("Night"), TimeOfDay::Night);
    /// assert_eq!(TimeOfDay::parse_loose("dusk"), TimeOfDay::Day);
    /// ```
    pub fn parse_loose(s: &str) -> Self {
        s.trim().to_lowercase().parse().unwrap_or(TimeOfDay::Day)
    }

    /// Lighting description used in image prompts.
    pub fn lighting(&self) -> &'static str {
        match self {
            TimeOfDay::Morning => "soft morning light, warm golden hour tones, gentle shadows",
            TimeOfDay::Day => "bright daylight, clear visibility, natural lighting",
            TimeOfDay::Evening => "warm sunset colors, orange and pink sky, long shadows",
            TimeOfDay::Night => "night time, moonlight or artificial lights, dark blue tones",
        }
    }
}

/// Generated asset paths for a location, relative to the project assets root.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LocationAssets {
    /// Primary reference image path
    #[serde(default)]
    pub reference: Option<String>,
    /// Variation paths keyed by time of day name
    #[serde(default)]
    pub variations: BTreeMap<String, String>,
}

/// A location in the project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Stable identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Interior or exterior
    #[serde(rename = "type")]
    pub location_type: LocationType,
    /// Free-text description
    #[serde(default)]
    pub description: String,
    /// Visual identity tags for image prompts
    #[serde(default)]
    pub visual_tags: Vec<String>,
    /// Generated assets
    #[serde(default)]
    pub assets: LocationAssets,
}

impl Location {
    /// Create a location with a fresh id and empty assets.
    pub fn new(name: impl Into<String>, location_type: LocationType) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            location_type,
            description: String::new(),
            visual_tags: Vec::new(),
            assets: LocationAssets::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn time_of_day_covers_four_variations() {
        let times: Vec<TimeOfDay> = TimeOfDay::iter().collect();
        assert_eq!(
            times,
            vec![
                TimeOfDay::Morning,
                TimeOfDay::Day,
                TimeOfDay::Evening,
                TimeOfDay::Night
            ]
        );
    }

    #[test]
    fn location_type_serializes_under_type_key() {
        let location = Location::new("Rooftop", LocationType::Exterior);
        let json = serde_json::to_value(&location).unwrap();
        assert_eq!(json["type"], "exterior");
    }
}
