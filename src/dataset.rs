//! One build: run every source's documents through its builder, merge the
//! secondary source into the primary, and shape the outputs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::Precedence;
use crate::id::assign_id;
use crate::model::{Character, ConflictRecord, EntityId, Provenance, ProvenanceMap, Skill, Weapon};
use crate::page::{Capture, EntityDocument};
use crate::reconcile::{ConflictLog, Reconcile};
use crate::source::{BuildOutcome, PageRecordBuilder};

pub const SCHEMA_VERSION: &str = "1.0";
pub const LEGACY_SCHEMA_VERSION: &str = "0.3";
const SUMMARY_CHARS: usize = 220;

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// A character skill lifted into its own module entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillEntity {
    pub id: EntityId,
    pub character_id: EntityId,
    pub weapon_type: String,
    pub slot: usize,
    #[serde(flatten)]
    pub skill: Skill,
    pub sources: ProvenanceMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Modules {
    pub characters: BTreeMap<EntityId, Character>,
    pub weapons: BTreeMap<EntityId, Weapon>,
    pub skills: BTreeMap<EntityId, SkillEntity>,
    pub passives: BTreeMap<String, Value>,
    pub sets: BTreeMap<String, Value>,
    pub buffs: BTreeMap<String, Value>,
    pub scenarios: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Indexes {
    pub characters: Vec<EntityId>,
    pub weapons: Vec<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedDataset {
    pub schema_version: String,
    pub generated_at: String,
    pub modules: Modules,
    pub indexes: Indexes,
    pub source_priority: Vec<String>,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BaseStats {
    pub atk: u32,
    pub crit_rate: u32,
    pub crit_dmg: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacySource {
    pub source_url: String,
    pub patch_version: Option<String>,
    pub last_seen: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyCharacter {
    pub id: EntityId,
    pub name: String,
    pub element: Option<String>,
    pub role: Option<String>,
    pub icon: Option<String>,
    pub base_stats: BaseStats,
    pub weapon_types: Vec<String>,
    pub source: LegacySource,
    pub summary: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sources: BTreeMap<String, LegacySource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Substat {
    pub name: Option<String>,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyWeapon {
    pub id: EntityId,
    pub name: String,
    pub weapon_type: String,
    pub icon: Option<String>,
    pub atk_bonus: u32,
    pub substat: Substat,
    pub passive: String,
    pub source: LegacySource,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sources: BTreeMap<String, LegacySource>,
}

/// Flat, name-sorted view for simpler consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyDataset {
    pub schema_version: String,
    pub characters: Vec<LegacyCharacter>,
    pub weapons: Vec<LegacyWeapon>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Counts {
    pub characters: usize,
    pub weapons: usize,
    pub skills: usize,
    pub conflicts: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skipped {
    pub source: String,
    pub locator: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMeta {
    pub generated_at: String,
    pub sources: Vec<String>,
    pub counts: Counts,
    pub conflicts: Vec<ConflictRecord>,
    pub skipped: Vec<Skipped>,
}

/// One source's documents and the builder that reads them.
pub struct SourceRun<'a> {
    pub builder: &'a dyn PageRecordBuilder,
    pub capture: &'a Capture,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuildOutput {
    pub dataset: NormalizedDataset,
    pub legacy: LegacyDataset,
    pub meta: RunMeta,
}

/// Build the datasets for one run. Every primary record is built before any
/// secondary record is merged.
pub fn build(
    primary: SourceRun<'_>,
    secondary: Option<SourceRun<'_>>,
    precedence: &Precedence,
    generated_at: &str,
) -> BuildOutput {
    let mut batch = Batch::new(precedence);
    batch.run_primary(&primary);
    if let Some(secondary) = &secondary {
        batch.run_secondary(secondary);
    }
    batch.finish(generated_at)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Primary,
    Secondary,
}

struct Batch<'p> {
    precedence: &'p Precedence,
    characters: BTreeMap<EntityId, Character>,
    weapons: BTreeMap<EntityId, Weapon>,
    skills: BTreeMap<EntityId, SkillEntity>,
    conflicts: ConflictLog,
    skipped: Vec<Skipped>,
    sources: Vec<String>,
}

impl<'p> Batch<'p> {
    fn new(precedence: &'p Precedence) -> Self {
        Batch {
            precedence,
            characters: BTreeMap::new(),
            weapons: BTreeMap::new(),
            skills: BTreeMap::new(),
            conflicts: ConflictLog::new(),
            skipped: Vec::new(),
            sources: Vec::new(),
        }
    }

    fn run_primary(&mut self, run: &SourceRun<'_>) {
        self.sources.push(run.builder.source().to_string());
        let pb = progress(run.capture, run.builder.source());
        for doc in &run.capture.characters {
            self.character(run.builder, doc, Role::Primary);
            pb.inc(1);
        }
        for doc in &run.capture.weapons {
            self.weapons(run.builder, doc);
            pb.inc(1);
        }
        pb.finish_and_clear();
    }

    fn run_secondary(&mut self, run: &SourceRun<'_>) {
        self.sources.push(run.builder.source().to_string());
        let pb = progress(run.capture, run.builder.source());
        for doc in &run.capture.weapons {
            self.weapons(run.builder, doc);
            pb.inc(1);
        }
        for doc in &run.capture.characters {
            self.character(run.builder, doc, Role::Secondary);
            pb.inc(1);
        }
        pb.finish_and_clear();
    }

    fn character(&mut self, builder: &dyn PageRecordBuilder, doc: &EntityDocument, role: Role) {
        let source = builder.source();
        match builder.build_character(doc) {
            BuildOutcome::Built { record, warnings } => {
                for w in &warnings {
                    debug!(source, locator = %doc.locator, "{}", w);
                }
                self.explode_skills(&record, source, &doc.locator, role);
                absorb(&mut self.characters, record, source, self.precedence, &mut self.conflicts);
            }
            BuildOutcome::Skipped(reason) => self.skip(source, doc, reason.to_string()),
        }
    }

    fn weapons(&mut self, builder: &dyn PageRecordBuilder, doc: &EntityDocument) {
        let source = builder.source();
        match builder.build_weapons(doc) {
            BuildOutcome::Built { record, warnings } => {
                for w in &warnings {
                    debug!(source, locator = %doc.locator, "{}", w);
                }
                for weapon in record {
                    absorb(&mut self.weapons, weapon, source, self.precedence, &mut self.conflicts);
                }
            }
            BuildOutcome::Skipped(reason) => self.skip(source, doc, reason.to_string()),
        }
    }

    fn skip(&mut self, source: &str, doc: &EntityDocument, reason: String) {
        warn!(source, locator = %doc.locator, reason = %reason, "skipped document");
        self.skipped.push(Skipped {
            source: source.to_string(),
            locator: doc.locator.clone(),
            reason,
        });
    }

    /// Secondary skill ids carry the source name so they never collide with
    /// the primary's.
    fn explode_skills(&mut self, character: &Character, source: &str, locator: &str, role: Role) {
        for (wt, skills) in &character.skills_by_weapon {
            for (slot, skill) in skills.iter().enumerate() {
                let slot_s = slot.to_string();
                let mut parts = vec![
                    character.id.as_str(),
                    wt.as_str(),
                    skill.name.as_str(),
                    skill.category.label(),
                    slot_s.as_str(),
                ];
                if role == Role::Secondary {
                    parts.insert(0, source);
                }
                let id = assign_id("sk", &parts);
                let mut sources = ProvenanceMap::new();
                sources.insert(
                    source.to_string(),
                    Provenance {
                        source_url: locator.to_string(),
                        last_seen: None,
                    },
                );
                self.skills.insert(
                    id.clone(),
                    SkillEntity {
                        id,
                        character_id: character.id.clone(),
                        weapon_type: wt.clone(),
                        slot,
                        skill: skill.clone(),
                        sources,
                    },
                );
            }
        }
    }

    fn finish(self, generated_at: &str) -> BuildOutput {
        let characters = name_sorted(&self.characters, |c| c.name.as_str());
        let weapons = name_sorted(&self.weapons, |w| w.name.as_str());
        let primary = self.sources.first().cloned().unwrap_or_default();

        let legacy = LegacyDataset {
            schema_version: LEGACY_SCHEMA_VERSION.to_string(),
            characters: characters
                .iter()
                .map(|c| legacy_character(c, &primary, generated_at))
                .collect(),
            weapons: weapons
                .iter()
                .map(|w| legacy_weapon(w, &primary, generated_at))
                .collect(),
        };

        let meta = RunMeta {
            generated_at: generated_at.to_string(),
            sources: self.sources.clone(),
            counts: Counts {
                characters: self.characters.len(),
                weapons: self.weapons.len(),
                skills: self.skills.len(),
                conflicts: self.conflicts.len(),
            },
            conflicts: self.conflicts.into_records(),
            skipped: self.skipped,
        };
        info!(
            characters = meta.counts.characters,
            weapons = meta.counts.weapons,
            skills = meta.counts.skills,
            conflicts = meta.counts.conflicts,
            skipped = meta.skipped.len(),
            "build finished"
        );

        let indexes = Indexes {
            characters: characters.iter().map(|c| c.id.clone()).collect(),
            weapons: weapons.iter().map(|w| w.id.clone()).collect(),
        };
        let dataset = NormalizedDataset {
            schema_version: SCHEMA_VERSION.to_string(),
            generated_at: generated_at.to_string(),
            modules: Modules {
                characters: self.characters,
                weapons: self.weapons,
                skills: self.skills,
                ..Modules::default()
            },
            indexes,
            source_priority: self.sources,
            notes: vec![
                "Generated automatically (best-effort).".to_string(),
                "Some data may be incomplete or change at release.".to_string(),
            ],
        };

        BuildOutput {
            dataset,
            legacy,
            meta,
        }
    }
}

/// Insert a record, or merge it into the one already held under its id.
fn absorb<T: Reconcile>(
    records: &mut BTreeMap<EntityId, T>,
    record: T,
    source: &str,
    precedence: &Precedence,
    log: &mut ConflictLog,
) {
    match records.get(record.id()) {
        Some(existing) => {
            let merged = existing.merge(&record, source, precedence);
            let added = log.extend(merged.conflicts);
            if added > 0 {
                debug!(module = %T::MODULE, id = record.id(), added, "recorded conflicts");
            }
            records.insert(record.id().to_string(), merged.record);
        }
        None => {
            records.insert(record.id().to_string(), record);
        }
    }
}

fn progress(capture: &Capture, source: &str) -> ProgressBar {
    let total = capture.characters.len() + capture.weapons.len();
    info!(source, documents = total, "building records");
    let pb = ProgressBar::new(total as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.set_message(source.to_string());
    pb
}

fn name_sorted<'a, T>(records: &'a BTreeMap<EntityId, T>, name: impl Fn(&T) -> &str) -> Vec<&'a T> {
    let mut out: Vec<&T> = records.values().collect();
    out.sort_by(|a, b| name(*a).cmp(name(*b)));
    out
}

/// The first-writer's provenance, plus every source's when several contributed.
fn legacy_sources(
    sources: &ProvenanceMap,
    primary: &str,
    generated_at: &str,
) -> (LegacySource, BTreeMap<String, LegacySource>) {
    let convert = |p: &Provenance| LegacySource {
        source_url: p.source_url.clone(),
        patch_version: None,
        last_seen: p.last_seen.clone().unwrap_or_else(|| generated_at.to_string()),
    };
    let main = sources
        .get(primary)
        .or_else(|| sources.values().next())
        .map(convert)
        .unwrap_or_else(|| LegacySource {
            source_url: String::new(),
            patch_version: None,
            last_seen: generated_at.to_string(),
        });
    let all = if sources.len() > 1 {
        sources.iter().map(|(k, p)| (k.clone(), convert(p))).collect()
    } else {
        BTreeMap::new()
    };
    (main, all)
}

fn legacy_character(c: &Character, primary: &str, generated_at: &str) -> LegacyCharacter {
    let (source, sources) = legacy_sources(&c.sources, primary, generated_at);
    LegacyCharacter {
        id: c.id.clone(),
        name: c.name.clone(),
        element: None,
        role: None,
        icon: c.image_url.clone(),
        base_stats: BaseStats::default(),
        weapon_types: c.weapon_types.clone(),
        source,
        summary: summary(&c.description),
        sources,
    }
}

fn legacy_weapon(w: &Weapon, primary: &str, generated_at: &str) -> LegacyWeapon {
    let (source, sources) = legacy_sources(&w.sources, primary, generated_at);
    LegacyWeapon {
        id: w.id.clone(),
        name: w.name.clone(),
        weapon_type: w.weapon_type.clone(),
        icon: w.image_url.clone(),
        atk_bonus: w.equipment_attack.unwrap_or(0),
        substat: Substat {
            name: w.substat_name.clone(),
            value: w.substat_value,
        },
        passive: w.passive_text.clone(),
        source,
        sources,
    }
}

fn summary(description: &str) -> String {
    if description.chars().count() > SUMMARY_CHARS {
        let cut: String = description.chars().take(SUMMARY_CHARS).collect();
        format!("{}…", cut)
    } else {
        description.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{Element, Page};
    use crate::parser::vocab::Vocabulary;
    use crate::source::{GenshinBuilder, SdsoBuilder};
    use chrono::TimeZone;

    const NOW: &str = "2026-03-01T12:00:00Z";

    fn doc(locator: &str, elements: Vec<Element>) -> EntityDocument {
        EntityDocument {
            name: String::new(),
            locator: locator.into(),
            page: Page::new(elements),
        }
    }

    fn genshin_capture() -> Capture {
        Capture {
            source: "genshin".into(),
            characters: vec![
                doc(
                    "https://genshin.gg/7dso/characters/daisy",
                    vec![
                        Element::new("h1", "Daisy Build | 7DS Origin"),
                        Element::new("span", "Axe"),
                        Element::new("p", "A cheerful fighter."),
                        Element::new("h2", "Daisy Axe Skills"),
                        Element::new("div", "Cleave\nE\nNormal Skill\nOld text."),
                    ],
                ),
                doc("https://genshin.gg/7dso/characters/broken", vec![Element::new("p", "404")]),
            ],
            weapons: vec![doc(
                "https://genshin.gg/7dso/weapons",
                vec![Element::new(
                    "div",
                    "Oak Staff\nStaff\nHeals.\nEquipment Attack\n800\nCrit Rate\n5%\nend\nend\nend",
                )],
            )],
        }
    }

    fn sdso_capture() -> Capture {
        Capture {
            source: "7dsorigin".into(),
            characters: vec![
                doc(
                    "https://7dsorigin.gg/en/characters/daisy",
                    vec![
                        Element::new("h1", "Daisy Build - 7DS"),
                        Element::new("img", "").with_attr("alt", "Daisy").with_attr("src", "/d.png"),
                        Element::new("h2", "Description"),
                        Element::new("p", "Flower knight."),
                        Element::new("h2", "Skills of Daisy"),
                        Element::new("div", "Axe\nCleave\nNormal Skill\nNew text."),
                    ],
                ),
                doc(
                    "https://7dsorigin.gg/en/characters/zeldris",
                    vec![Element::new("h1", "Zeldris Build - 7DS")],
                ),
            ],
            weapons: vec![doc(
                "https://7dsorigin.gg/en/weapons/oak-staff",
                vec![
                    Element::new("h1", "Oak Staff"),
                    Element::new("h2", "Quick Information"),
                    Element::new("div", "Type\nStaff\nRarity\n3"),
                ],
            )],
        }
    }

    fn run(with_secondary: bool) -> BuildOutput {
        let vocab = Vocabulary::default();
        let genshin = GenshinBuilder::new(vocab.clone(), "https://genshin.gg");
        let sdso = SdsoBuilder::new(vocab, "https://7dsorigin.gg", NOW);
        let gc = genshin_capture();
        let sc = sdso_capture();
        let secondary = with_secondary.then(|| SourceRun {
            builder: &sdso,
            capture: &sc,
        });
        build(
            SourceRun {
                builder: &genshin,
                capture: &gc,
            },
            secondary,
            &Precedence {
                collections: Some("7dsorigin".into()),
                scalars: None,
            },
            NOW,
        )
    }

    #[test]
    fn primary_only() {
        let out = run(false);
        assert_eq!(out.meta.sources, vec!["genshin"]);
        assert_eq!(out.meta.counts.characters, 1);
        assert_eq!(out.meta.counts.weapons, 1);
        assert_eq!(out.meta.counts.skills, 1);
        assert_eq!(out.meta.skipped.len(), 1);
        assert_eq!(out.meta.skipped[0].locator, "https://genshin.gg/7dso/characters/broken");
        assert_eq!(out.meta.skipped[0].reason, "page has no usable title");
        assert_eq!(out.dataset.schema_version, "1.0");
        assert_eq!(out.legacy.schema_version, "0.3");
        assert!(out.legacy.characters[0].sources.is_empty());
        assert_eq!(out.legacy.characters[0].source.last_seen, NOW);
        assert_eq!(out.legacy.weapons[0].atk_bonus, 800);
    }

    #[test]
    fn secondary_merges_and_inserts() {
        let out = run(true);
        let m = &out.dataset.modules;
        assert_eq!(m.characters.len(), 2);
        let daisy = m.characters.values().find(|c| c.name == "Daisy").unwrap();
        assert_eq!(daisy.image_url.as_deref(), Some("https://7dsorigin.gg/d.png"));
        let cleave = &daisy.skills_by_weapon["Axe"][0];
        assert_eq!(cleave.description, "New text.");
        assert_eq!(cleave.binding.as_deref(), Some("E"));
        assert_eq!(cleave.versions.len(), 2);

        // primary and secondary skill entities are kept apart
        assert_eq!(m.skills.len(), 2);

        let oak = m.weapons.values().next().unwrap();
        assert_eq!(oak.rarity, Some(3));
        assert_eq!(oak.sources.len(), 2);

        assert_eq!(out.meta.counts.conflicts, out.meta.conflicts.len());
        assert_eq!(out.meta.conflicts[0].field, "description");
        assert_eq!(out.meta.sources, vec!["genshin", "7dsorigin"]);

        let names: Vec<&str> = out.legacy.characters.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Daisy", "Zeldris"]);
        assert_eq!(out.dataset.indexes.characters[0], daisy.id);
        assert_eq!(out.legacy.characters[0].icon, daisy.image_url);
        assert_eq!(out.legacy.characters[0].sources.len(), 2);
        assert_eq!(out.legacy.characters[0].source.source_url, "https://genshin.gg/7dso/characters/daisy");
        assert_eq!(out.legacy.characters[1].source.last_seen, NOW);
    }

    #[test]
    fn normalized_shape() {
        let v = serde_json::to_value(&run(true).dataset).unwrap();
        for key in ["characters", "weapons", "skills", "passives", "sets", "buffs", "scenarios"] {
            assert!(v["modules"][key].is_object(), "{}", key);
        }
        let skill = v["modules"]["skills"].as_object().unwrap().values().next().unwrap();
        for key in ["id", "character_id", "weapon_type", "slot", "name", "type", "sources"] {
            assert!(skill.get(key).is_some(), "{}", key);
        }
    }

    #[test]
    fn summary_cut() {
        assert_eq!(summary("short"), "short");
        let long = "é".repeat(300);
        let s = summary(&long);
        assert_eq!(s.chars().count(), SUMMARY_CHARS + 1);
        assert!(s.ends_with('…'));
    }

    #[test]
    fn timestamps() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 5, 7).unwrap();
        assert_eq!(format_timestamp(at), "2026-03-01T09:05:07Z");
    }
}
