//! NFT metadata documents pinned alongside each portrait.

use serde::{Deserialize, Serialize};

use crate::core::character_gen::GeneratedCharacter;

pub const COLLECTION_DESCRIPTION: &str = "A unique character created with CharacterForge.ai";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TraitValue {
    Number(i64),
    Text(String),
}

impl From<i32> for TraitValue {
    fn from(v: i32) -> Self {
        TraitValue::Number(i64::from(v))
    }
}

impl From<&str> for TraitValue {
    fn from(v: &str) -> Self {
        TraitValue::Text(v.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftAttribute {
    pub trait_type: String,
    pub value: TraitValue,
}

impl NftAttribute {
    fn new(trait_type: &str, value: impl Into<TraitValue>) -> Self {
        Self {
            trait_type: trait_type.to_string(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftMetadata {
    pub name: String,
    pub description: String,
    pub image: String,
    pub attributes: Vec<NftAttribute>,
}

/// Build the marketplace metadata for a pinned portrait.
pub fn build_metadata(character: &GeneratedCharacter, image_url: &str) -> NftMetadata {
    let meta = &character.metadata;
    let stats = &character.stats;

    let mut attributes = vec![NftAttribute::new("Class", meta.character_class.as_str())];
    // Race is omitted, not defaulted, when none was chosen.
    if let Some(race) = meta.attributes.race() {
        attributes.push(NftAttribute::new("Race", race));
    }
    attributes.extend([
        NftAttribute::new("Style", meta.style.as_str()),
        NftAttribute::new("HP", stats.hp),
        NftAttribute::new("MP", stats.mp),
        NftAttribute::new("STR", stats.strength),
        NftAttribute::new("INT", stats.intelligence),
        NftAttribute::new("Special Power", character.special_power.name.as_str()),
    ]);

    NftMetadata {
        name: meta.display_name(),
        description: COLLECTION_DESCRIPTION.to_string(),
        image: image_url.to_string(),
        attributes,
    }
}
