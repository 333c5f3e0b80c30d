//! Character Generation Module
//!
//! Everything needed to describe a character before and after its portrait
//! is rendered:
//! - [`Selection`] - the wizard choices (style, class, race, gender, equipment)
//! - [`stats`] - cosmetic stat rolls from fixed class/race/equipment tables
//! - [`prompts`] - natural-language prompt building for the image generator
//! - [`GeneratedCharacter`] - the immutable record produced per portrait

pub mod prompts;
pub mod stats;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use prompts::{build_prompt, validate_selection, NEGATIVE_PROMPT, VARIATION_MODIFIERS};
pub use stats::{generate_stats, StatBlock};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CharacterGenError {
    #[error("Invalid style: {0}")]
    InvalidStyle(String),

    #[error("Invalid character class: {0}")]
    InvalidClass(String),
}

pub type Result<T> = std::result::Result<T, CharacterGenError>;

// ============================================================================
// Selection
// ============================================================================

/// Optional physical traits picked in the wizard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub race: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equipment: Option<String>,
}

impl CharacterAttributes {
    pub fn gender(&self) -> Option<&str> {
        non_empty(&self.gender)
    }

    pub fn race(&self) -> Option<&str> {
        non_empty(&self.race)
    }

    pub fn equipment(&self) -> Option<&str> {
        non_empty(&self.equipment)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// A submitted set of wizard choices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub style: String,
    pub character_class: String,
    #[serde(default)]
    pub attributes: CharacterAttributes,
}

impl Selection {
    pub fn new(style: impl Into<String>, character_class: impl Into<String>) -> Self {
        Self {
            style: style.into(),
            character_class: character_class.into(),
            attributes: CharacterAttributes::default(),
        }
    }

    pub fn with_gender(mut self, gender: impl Into<String>) -> Self {
        self.attributes.gender = Some(gender.into());
        self
    }

    pub fn with_race(mut self, race: impl Into<String>) -> Self {
        self.attributes.race = Some(race.into());
        self
    }

    pub fn with_equipment(mut self, equipment: impl Into<String>) -> Self {
        self.attributes.equipment = Some(equipment.into());
        self
    }
}

// ============================================================================
// Generated Character
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialPower {
    pub name: String,
    pub description: String,
}

/// Provenance recorded alongside every rendered portrait.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterMetadata {
    pub prompt: String,
    pub style: String,
    pub character_class: String,
    pub attributes: CharacterAttributes,
    pub generated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<u32>,
}

impl CharacterMetadata {
    pub fn new(prompt: String, selection: &Selection) -> Self {
        Self {
            prompt,
            style: selection.style.clone(),
            character_class: selection.character_class.clone(),
            attributes: selection.attributes.clone(),
            generated: Utc::now(),
            name: None,
            serial_number: None,
        }
    }

    /// Display name, falling back to the serial number when unnamed.
    pub fn display_name(&self) -> String {
        match (&self.name, self.serial_number) {
            (Some(name), _) => name.clone(),
            (None, Some(serial)) => format!("Character #{}", serial),
            (None, None) => "Character".to_string(),
        }
    }
}

/// A rendered character: portrait, rolled stats and provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedCharacter {
    pub id: String,
    /// Portrait as a self-describing `data:` URL (or a remote URL).
    pub image: String,
    pub stats: StatBlock,
    pub special_power: SpecialPower,
    pub metadata: CharacterMetadata,
}

impl GeneratedCharacter {
    /// Sum of the four stats, used for collection power totals.
    pub fn power(&self) -> i64 {
        self.stats.total()
    }
}
