//! Portrait Prompt Builder
//!
//! Turns a [`Selection`](super::Selection) into the comma-separated prompt
//! sent to the image generator. The builder never fails: unknown styles
//! contribute nothing and unknown classes/equipment fall back through the
//! `default` class table and the `sword-shield` entry. Strict checking lives
//! in [`validate_selection`], which the HTTP entry point runs first.

use super::{CharacterAttributes, CharacterGenError, Result};

/// Pose/expression modifiers, one per variation slot.
pub const VARIATION_MODIFIERS: [&str; 4] = [
    "facing forward, neutral stance",
    "slight head tilt, confident smile",
    "dynamic action pose, focused gaze",
    "looking over shoulder, mysterious expression",
];

pub const NEGATIVE_PROMPT: &str = "multiple characters, complex background, multiple weapons, full body, extreme poses, complex lighting, complex effects";

const QUALITY_DIRECTIVES: [&str; 5] = [
    "high quality, detailed character portrait",
    "single character only",
    "clean background",
    "focused on character and equipment",
    "clear face details",
];

const DEFAULT_EQUIPMENT: &str = "sword-shield";

pub fn style_modifier(style: &str) -> Option<&'static str> {
    let phrase = match style {
        "pixel" => "pixel art style, 8-bit, retro gaming aesthetic",
        "anime" => "anime style, cel shaded, vibrant colors",
        "realistic" => "realistic digital art, highly detailed, cinematic lighting",
        "vector" => "vector art style, clean lines, flat colors",
        "painterly" => "digital painting style, brushstrokes visible, artistic",
        "cyberpunk" => "cyberpunk style, neon colors, futuristic elements",
        "fantasy" => "high fantasy style, magical elements, ethereal lighting",
        "chibi" => "chibi style, cute, super-deformed proportions",
        _ => return None,
    };
    Some(phrase)
}

type EquipmentTable = &'static [(&'static str, &'static str)];

const DEFAULT_CLASS_TABLE: EquipmentTable = &[
    ("sword-shield", "character with sword and shield"),
    ("hammer", "character wielding a war hammer"),
    ("daggers", "character with dual daggers"),
    ("bow", "character with a bow"),
    ("staff", "character with a magical staff"),
    ("grimoire", "character with a spellbook"),
];

fn class_equipment_table(character_class: &str) -> Option<EquipmentTable> {
    let table: EquipmentTable = match character_class {
        "warrior" => &[
            ("sword-shield", "warrior wielding a longsword and shield"),
            ("hammer", "warrior wielding a massive war hammer"),
            ("daggers", "warrior dual-wielding short swords"),
            ("bow", "warrior with a sturdy combat bow"),
            ("staff", "warrior with a battle staff"),
            ("grimoire", "warrior with a magic tome"),
        ],
        "mage" => &[
            ("sword-shield", "battlemage with sword and magical shield"),
            ("hammer", "war-mage with enchanted warhammer"),
            ("daggers", "spellblade with magical daggers"),
            ("bow", "arcane archer with glowing bow"),
            ("staff", "mage wielding an ornate magical staff"),
            ("grimoire", "mage holding a glowing spellbook"),
        ],
        "default" => DEFAULT_CLASS_TABLE,
        _ => return None,
    };
    Some(table)
}

fn lookup(table: EquipmentTable, equipment: &str) -> Option<&'static str> {
    table.iter().find(|(key, _)| *key == equipment).map(|(_, phrase)| *phrase)
}

/// Resolve the class/equipment phrase.
///
/// Unknown class uses the `default` table; unknown or missing equipment uses
/// the resolved table's `sword-shield` entry.
pub fn equipment_class_modifier(character_class: &str, equipment: Option<&str>) -> &'static str {
    let table = class_equipment_table(character_class).unwrap_or(DEFAULT_CLASS_TABLE);
    equipment
        .and_then(|e| lookup(table, e))
        .or_else(|| lookup(table, DEFAULT_EQUIPMENT))
        .unwrap_or("character")
}

/// Build the prompt for one portrait.
///
/// `variation` selects a pose modifier (wrapping around the list); `None`
/// builds the plain single-portrait prompt.
pub fn build_prompt(
    style: &str,
    character_class: &str,
    attributes: &CharacterAttributes,
    variation: Option<usize>,
) -> String {
    let mut fragments: Vec<String> = Vec::with_capacity(16);

    fragments.push(format!(
        "A detailed portrait of a fantasy RPG {}",
        equipment_class_modifier(character_class, attributes.equipment())
    ));
    if let Some(style) = style_modifier(style) {
        fragments.push(style.to_string());
    }
    if let Some(gender) = attributes.gender() {
        fragments.push(format!("{} character", gender));
    }
    if let Some(race) = attributes.race() {
        fragments.push(format!("{} race", race));
    }
    fragments.push("determined expression".to_string());
    fragments.push("three-quarter view portrait".to_string());
    fragments.extend(QUALITY_DIRECTIVES.iter().map(|d| d.to_string()));
    if let Some(index) = variation {
        fragments.push(VARIATION_MODIFIERS[index % VARIATION_MODIFIERS.len()].to_string());
    }

    let prompt = fragments.join(", ");
    log::debug!("Generated prompt: {}", prompt);
    prompt
}

/// Reject unknown styles and classes before any prompt is built.
///
/// The literal class `default` is accepted.
pub fn validate_selection(style: &str, character_class: &str) -> Result<()> {
    if style_modifier(style).is_none() {
        return Err(CharacterGenError::InvalidStyle(style.to_string()));
    }
    if class_equipment_table(character_class).is_none() {
        return Err(CharacterGenError::InvalidClass(character_class.to_string()));
    }
    Ok(())
}
