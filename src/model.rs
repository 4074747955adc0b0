use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::effects::{PotentialAnalysis, SkillAnalysis};
use crate::parser::vocab::SkillCategory;

pub type EntityId = String;

/// Where a record was seen, per source name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub source_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<String>,
}

pub type ProvenanceMap = BTreeMap<String, Provenance>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Module {
    Characters,
    Weapons,
    Skills,
}

impl Module {
    pub const DIFFED: [Module; 3] = [Module::Characters, Module::Weapons, Module::Skills];

    pub fn key(self) -> &'static str {
        match self {
            Module::Characters => "characters",
            Module::Weapons => "weapons",
            Module::Skills => "skills",
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitMultiplier {
    pub hit: u32,
    pub multiplier_pct: f64,
    pub scaling: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Multiplier {
    pub value_pct: f64,
    pub scaling: String,
    pub context: String,
}

/// The part of a skill kept per source when two sources describe it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillBody {
    pub description: String,
    pub multipliers: Vec<Multiplier>,
    pub hits: Vec<HitMultiplier>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    pub name: String,
    #[serde(rename = "type")]
    pub category: SkillCategory,
    #[serde(rename = "key")]
    pub binding: Option<String>,
    #[serde(rename = "cooldown_sec")]
    pub cooldown: Option<f64>,
    pub description: String,
    pub hits: Vec<HitMultiplier>,
    pub multipliers: Vec<Multiplier>,
    #[serde(default)]
    pub source: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub versions: BTreeMap<String, SkillBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsed: Option<SkillAnalysis>,
}

impl Skill {
    pub fn new(name: impl Into<String>, category: SkillCategory) -> Self {
        Skill {
            name: name.into(),
            category,
            binding: None,
            cooldown: None,
            description: String::new(),
            hits: Vec::new(),
            multipliers: Vec::new(),
            source: String::new(),
            versions: BTreeMap::new(),
            parsed: None,
        }
    }

    /// Identity within one weapon-type bucket.
    pub fn key(&self) -> (&str, SkillCategory) {
        (&self.name, self.category)
    }

    pub fn body(&self) -> SkillBody {
        SkillBody {
            description: self.description.clone(),
            multipliers: self.multipliers.clone(),
            hits: self.hits.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PotentialTier {
    pub tier: u32,
    pub text: String,
    #[serde(default)]
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsed: Option<PotentialAnalysis>,
}

impl PotentialTier {
    pub fn new(tier: u32, text: impl Into<String>) -> Self {
        PotentialTier {
            tier,
            text: text.into(),
            source: String::new(),
            parsed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Costume {
    pub name: String,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub id: EntityId,
    pub name: String,
    pub image_url: Option<String>,
    pub description: String,
    pub weapon_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub costumes: Vec<Costume>,
    pub skills_by_weapon: BTreeMap<String, Vec<Skill>>,
    pub potential_by_weapon: BTreeMap<String, Vec<PotentialTier>>,
    pub sources: ProvenanceMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weapon {
    pub id: EntityId,
    pub name: String,
    pub weapon_type: String,
    pub image_url: Option<String>,
    pub equipment_attack: Option<u32>,
    pub substat_name: Option<String>,
    pub substat_value: Option<f64>,
    pub passive_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rarity: Option<u8>,
    pub sources: ProvenanceMap,
}

/// Two sources disagreeing on one scalar field. Never auto-resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictRecord {
    pub module: Module,
    pub id: EntityId,
    pub field: String,
    pub a: serde_json::Value,
    pub b: serde_json::Value,
    pub sources: Vec<String>,
}
