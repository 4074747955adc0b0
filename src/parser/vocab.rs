use std::collections::HashSet;

use serde::{Deserialize, Serialize};

pub const WEAPON_TYPES: &[&str] = &[
    "Axe", "Book", "Cudgel", "Gauntlets", "Lance", "Rapier", "Shield", "Staff", "Wand",
    "Dual Swords", "Greatsword", "Longsword", "Grimoire", "Nunchaku", "Sword and Shield",
    "Sword", "Dagger", "Bow",
];

pub const BINDINGS: &[&str] = &["Left Click", "Right Click", "E", "Q"];

/// Skill category labels as they appear on pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SkillCategory {
    #[serde(rename = "Normal Attack")]
    NormalAttack,
    #[serde(rename = "Special Attack")]
    SpecialAttack,
    #[serde(rename = "Normal Skill")]
    NormalSkill,
    #[serde(rename = "Tag Skill")]
    TagSkill,
    #[serde(rename = "Ultimate Move")]
    UltimateMove,
    #[serde(rename = "Adventure Skill")]
    AdventureSkill,
    #[serde(rename = "Passive")]
    Passive,
}

impl SkillCategory {
    pub const ALL: [SkillCategory; 7] = [
        Self::NormalAttack,
        Self::SpecialAttack,
        Self::NormalSkill,
        Self::TagSkill,
        Self::UltimateMove,
        Self::AdventureSkill,
        Self::Passive,
    ];

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.label() == label)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::NormalAttack => "Normal Attack",
            Self::SpecialAttack => "Special Attack",
            Self::NormalSkill => "Normal Skill",
            Self::TagSkill => "Tag Skill",
            Self::UltimateMove => "Ultimate Move",
            Self::AdventureSkill => "Adventure Skill",
            Self::Passive => "Passive",
        }
    }
}

/// Marker tokens the line scanners anchor on.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    weapon_types: HashSet<String>,
    bindings: HashSet<String>,
}

impl Vocabulary {
    pub fn new<W, B>(weapon_types: W, bindings: B) -> Self
    where
        W: IntoIterator,
        W::Item: Into<String>,
        B: IntoIterator,
        B::Item: Into<String>,
    {
        Vocabulary {
            weapon_types: weapon_types.into_iter().map(Into::into).collect(),
            bindings: bindings.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_weapon_type(&self, line: &str) -> bool {
        self.weapon_types.contains(line)
    }

    pub fn is_binding(&self, line: &str) -> bool {
        self.bindings.contains(line)
    }

    pub fn category(&self, line: &str) -> Option<SkillCategory> {
        SkillCategory::from_label(line)
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Vocabulary::new(WEAPON_TYPES.iter().copied(), BINDINGS.iter().copied())
    }
}
