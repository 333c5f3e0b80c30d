//! Stat Roller
//!
//! Cosmetic HP/MP/STR/INT rolls. Each stat is a uniform draw from the class
//! range, scaled by the race multiplier, rounded, then offset by the flat
//! equipment bonus. Unknown inputs fall back to warrior / human / no bonus.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::SpecialPower;

// ============================================================================
// Stat Block
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatBlock {
    #[serde(rename = "HP")]
    pub hp: i32,
    #[serde(rename = "MP")]
    pub mp: i32,
    #[serde(rename = "STR")]
    pub strength: i32,
    #[serde(rename = "INT")]
    pub intelligence: i32,
}

impl StatBlock {
    pub fn total(&self) -> i64 {
        [self.hp, self.mp, self.strength, self.intelligence]
            .iter()
            .map(|v| i64::from(*v))
            .sum()
    }
}

// ============================================================================
// Lookup Tables
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatRange {
    pub min: i32,
    pub max: i32,
}

const fn range(min: i32, max: i32) -> StatRange {
    StatRange { min, max }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassBaseStats {
    pub hp: StatRange,
    pub mp: StatRange,
    pub strength: StatRange,
    pub intelligence: StatRange,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaceModifiers {
    pub hp: f64,
    pub mp: f64,
    pub strength: f64,
    pub intelligence: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EquipmentBonus {
    pub hp: i32,
    pub mp: i32,
    pub strength: i32,
    pub intelligence: i32,
}

pub const KNOWN_CLASSES: &[&str] = &[
    "warrior",
    "mage",
    "rogue",
    "ranger",
    "paladin",
    "necromancer",
    "monk",
    "druid",
];

pub const KNOWN_RACES: &[&str] = &["human", "elf", "dwarf", "orc", "halfling", "dragonborn"];

pub const KNOWN_EQUIPMENT: &[&str] = &["sword-shield", "staff", "daggers", "bow", "hammer", "grimoire"];

const WARRIOR_STATS: ClassBaseStats = ClassBaseStats {
    hp: range(75, 100),
    mp: range(20, 40),
    strength: range(70, 90),
    intelligence: range(30, 50),
};

const HUMAN: RaceModifiers = RaceModifiers {
    hp: 1.0,
    mp: 1.0,
    strength: 1.0,
    intelligence: 1.0,
};

pub fn class_base_stats(class: &str) -> Option<ClassBaseStats> {
    let stats = match class {
        "warrior" => WARRIOR_STATS,
        "mage" => ClassBaseStats {
            hp: range(50, 70),
            mp: range(80, 100),
            strength: range(20, 40),
            intelligence: range(75, 95),
        },
        "rogue" => ClassBaseStats {
            hp: range(60, 80),
            mp: range(40, 60),
            strength: range(60, 80),
            intelligence: range(50, 70),
        },
        "ranger" => ClassBaseStats {
            hp: range(65, 85),
            mp: range(45, 65),
            strength: range(65, 85),
            intelligence: range(45, 65),
        },
        "paladin" => ClassBaseStats {
            hp: range(80, 100),
            mp: range(50, 70),
            strength: range(65, 85),
            intelligence: range(40, 60),
        },
        "necromancer" => ClassBaseStats {
            hp: range(55, 75),
            mp: range(75, 95),
            strength: range(30, 50),
            intelligence: range(70, 90),
        },
        "monk" => ClassBaseStats {
            hp: range(70, 90),
            mp: range(60, 80),
            strength: range(65, 85),
            intelligence: range(55, 75),
        },
        "druid" => ClassBaseStats {
            hp: range(65, 85),
            mp: range(70, 90),
            strength: range(45, 65),
            intelligence: range(65, 85),
        },
        _ => return None,
    };
    Some(stats)
}

pub fn race_modifiers(race: &str) -> Option<RaceModifiers> {
    let (hp, mp, strength, intelligence) = match race {
        "human" => (1.0, 1.0, 1.0, 1.0),
        "elf" => (0.9, 1.2, 0.9, 1.2),
        "dwarf" => (1.2, 0.8, 1.2, 0.9),
        "orc" => (1.3, 0.7, 1.3, 0.8),
        "halfling" => (0.8, 1.1, 0.8, 1.1),
        "dragonborn" => (1.1, 1.1, 1.1, 1.0),
        _ => return None,
    };
    Some(RaceModifiers { hp, mp, strength, intelligence })
}

pub fn equipment_bonus(equipment: &str) -> Option<EquipmentBonus> {
    let (hp, mp, strength, intelligence) = match equipment {
        "sword-shield" => (10, 0, 5, 0),
        "staff" => (0, 10, 0, 5),
        "daggers" => (0, 5, 5, 0),
        "bow" => (0, 5, 5, 0),
        "hammer" => (5, 0, 10, 0),
        "grimoire" => (0, 15, 0, 10),
        _ => return None,
    };
    Some(EquipmentBonus { hp, mp, strength, intelligence })
}

type PowerTable = &'static [(&'static str, &'static str)];

const WARRIOR_POWERS: PowerTable = &[
    ("Berserker Rage", "Enter a powerful rage state, increasing damage"),
    ("Shield Wall", "Create a defensive barrier for allies"),
    ("Devastating Strike", "Perform a powerful weapon attack"),
];

pub fn class_powers(class: &str) -> Option<PowerTable> {
    let powers: PowerTable = match class {
        "warrior" => WARRIOR_POWERS,
        "mage" => &[
            ("Arcane Burst", "Release a powerful magical explosion"),
            ("Time Manipulation", "Briefly control the flow of time"),
            ("Elemental Mastery", "Command all elemental forces"),
        ],
        "rogue" => &[
            ("Shadow Step", "Teleport through shadows to strike"),
            ("Deadly Precision", "Guaranteed critical strike chance"),
            ("Smoke Bomb", "Create a cloud of concealing smoke"),
        ],
        "ranger" => &[
            ("Beast Command", "Control nearby creatures"),
            ("Perfect Shot", "Guaranteed hit with bonus damage"),
            ("Nature's Blessing", "Gain benefits from surroundings"),
        ],
        "paladin" => &[
            ("Divine Shield", "Become temporarily invulnerable"),
            ("Holy Strike", "Weapon attack with divine damage"),
            ("Blessing of Light", "Heal and protect allies"),
        ],
        "necromancer" => &[
            ("Soul Drain", "Steal life force from enemies"),
            ("Undead Legion", "Summon undead minions"),
            ("Death's Embrace", "Convert damage to healing"),
        ],
        "monk" => &[
            ("Chi Burst", "Release powerful spiritual energy"),
            ("Perfect Balance", "Enter a state of combat mastery"),
            ("Inner Peace", "Rapid health regeneration"),
        ],
        "druid" => &[
            ("Wild Shape", "Transform into powerful creatures"),
            ("Nature's Wrath", "Command plants and elements"),
            ("Healing Grove", "Create an area of regeneration"),
        ],
        _ => return None,
    };
    Some(powers)
}

// ============================================================================
// Rolling
// ============================================================================

fn roll_stat(rng: &mut impl Rng, range: StatRange, multiplier: f64, bonus: i32) -> i32 {
    let base = rng.gen_range(range.min..=range.max);
    (f64::from(base) * multiplier).round() as i32 + bonus
}

/// Roll a stat block and pick a special power.
///
/// `race` and `equipment` are optional because the wizard lets users skip
/// those steps; a skipped step behaves exactly like an unknown value.
pub fn generate_stats(
    character_class: &str,
    race: Option<&str>,
    equipment: Option<&str>,
    rng: &mut impl Rng,
) -> (StatBlock, SpecialPower) {
    let base = class_base_stats(character_class).unwrap_or(WARRIOR_STATS);
    let race = race.and_then(race_modifiers).unwrap_or(HUMAN);
    let bonus = equipment.and_then(equipment_bonus).unwrap_or_default();

    let stats = StatBlock {
        hp: roll_stat(rng, base.hp, race.hp, bonus.hp),
        mp: roll_stat(rng, base.mp, race.mp, bonus.mp),
        strength: roll_stat(rng, base.strength, race.strength, bonus.strength),
        intelligence: roll_stat(rng, base.intelligence, race.intelligence, bonus.intelligence),
    };

    let powers = class_powers(character_class).unwrap_or(WARRIOR_POWERS);
    let (name, description) = powers.choose(rng).copied().unwrap_or(WARRIOR_POWERS[0]);

    (
        stats,
        SpecialPower {
            name: name.to_string(),
            description: description.to_string(),
        },
    )
}
