//! Merging a secondary source's record into the primary record of the same id.
//!
//! Merges are pure: they read both records and return a new one plus the
//! conflicts found. Scalars fill gaps and only change on conflict when the
//! incoming source holds scalar precedence. Skills and potential tiers merge
//! by key, and superseded skill bodies are kept per source.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::Precedence;
use crate::model::{Character, ConflictRecord, Module, ProvenanceMap, Weapon};

#[derive(Debug, Clone, PartialEq)]
pub struct Merged<T> {
    pub record: T,
    pub conflicts: Vec<ConflictRecord>,
}

/// A record two sources can describe.
pub trait Reconcile: Sized + Clone {
    const MODULE: Module;

    fn id(&self) -> &str;

    fn merge(&self, incoming: &Self, source: &str, precedence: &Precedence) -> Merged<Self>;
}

impl Reconcile for Character {
    const MODULE: Module = Module::Characters;

    fn id(&self) -> &str {
        &self.id
    }

    fn merge(&self, incoming: &Self, source: &str, precedence: &Precedence) -> Merged<Self> {
        merge_character(self, incoming, source, precedence)
    }
}

impl Reconcile for Weapon {
    const MODULE: Module = Module::Weapons;

    fn id(&self) -> &str {
        &self.id
    }

    fn merge(&self, incoming: &Self, source: &str, precedence: &Precedence) -> Merged<Self> {
        merge_weapon(self, incoming, source, precedence)
    }
}

pub fn merge_character(
    primary: &Character,
    secondary: &Character,
    source: &str,
    precedence: &Precedence,
) -> Merged<Character> {
    let mut out = primary.clone();
    accumulate_sources(&mut out.sources, &secondary.sources);

    let collections_win = precedence.collections.as_deref() == Some(source);

    for (wt, incoming) in &secondary.skills_by_weapon {
        let existing = out.skills_by_weapon.entry(wt.clone()).or_default();
        for skill in incoming {
            let mut skill = skill.clone();
            if skill.source.is_empty() {
                skill.source = source.to_string();
            }
            let Some(i) = existing.iter().position(|s| s.key() == skill.key()) else {
                existing.push(skill);
                continue;
            };
            let old = &existing[i];
            let mut versions = old.versions.clone();
            if old.source != source {
                if !old.source.is_empty() {
                    versions.insert(old.source.clone(), old.body());
                }
                versions.insert(source.to_string(), skill.body());
            } else if versions.contains_key(source) {
                versions.insert(source.to_string(), skill.body());
            }
            if collections_win {
                skill.binding = skill.binding.or_else(|| old.binding.clone());
                skill.cooldown = skill.cooldown.or(old.cooldown);
                skill.source = source.to_string();
                skill.versions = versions;
                existing[i] = skill;
            } else {
                existing[i].versions = versions;
            }
        }
    }

    for (wt, incoming) in &secondary.potential_by_weapon {
        let existing = out.potential_by_weapon.entry(wt.clone()).or_default();
        for tier in incoming {
            let mut tier = tier.clone();
            if tier.source.is_empty() {
                tier.source = source.to_string();
            }
            match existing.iter().position(|t| t.tier == tier.tier) {
                Some(i) if collections_win => existing[i] = tier,
                Some(_) => {}
                None => existing.push(tier),
            }
        }
    }

    let mut scalars = Scalars::new(Module::Characters, source, precedence);
    scalars.merge("image_url", &mut out.image_url, &secondary.image_url);
    scalars.merge("description", &mut out.description, &secondary.description);
    scalars.merge("weapon_types", &mut out.weapon_types, &secondary.weapon_types);
    scalars.merge("costumes", &mut out.costumes, &secondary.costumes);
    let conflicts = scalars.finish(&out.id, &out.sources);

    Merged {
        record: out,
        conflicts,
    }
}

pub fn merge_weapon(
    primary: &Weapon,
    secondary: &Weapon,
    source: &str,
    precedence: &Precedence,
) -> Merged<Weapon> {
    let mut out = primary.clone();
    accumulate_sources(&mut out.sources, &secondary.sources);

    let mut scalars = Scalars::new(Module::Weapons, source, precedence);
    scalars.merge("image_url", &mut out.image_url, &secondary.image_url);
    scalars.merge("equipment_attack", &mut out.equipment_attack, &secondary.equipment_attack);
    scalars.merge("substat_name", &mut out.substat_name, &secondary.substat_name);
    scalars.merge("substat_value", &mut out.substat_value, &secondary.substat_value);
    scalars.merge("passive_text", &mut out.passive_text, &secondary.passive_text);
    scalars.merge("weapon_type", &mut out.weapon_type, &secondary.weapon_type);
    scalars.merge("rarity", &mut out.rarity, &secondary.rarity);
    let conflicts = scalars.finish(&out.id, &out.sources);

    Merged {
        record: out,
        conflicts,
    }
}

fn accumulate_sources(into: &mut ProvenanceMap, from: &ProvenanceMap) {
    for (name, provenance) in from {
        into.entry(name.clone()).or_insert_with(|| provenance.clone());
    }
}

/// Empty strings, empty lists and maps, and nulls count as absent.
fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

/// Field-by-field fill-gap with conflict collection.
struct Scalars {
    module: Module,
    incoming_wins: bool,
    found: Vec<(String, Value, Value)>,
}

impl Scalars {
    fn new(module: Module, source: &str, precedence: &Precedence) -> Self {
        Scalars {
            module,
            incoming_wins: precedence.scalars.as_deref() == Some(source),
            found: Vec::new(),
        }
    }

    fn merge<T: Serialize + Clone>(&mut self, field: &str, current: &mut T, incoming: &T) {
        let b = serde_json::to_value(incoming).unwrap_or(Value::Null);
        if is_blank(&b) {
            return;
        }
        let a = serde_json::to_value(&*current).unwrap_or(Value::Null);
        if is_blank(&a) {
            *current = incoming.clone();
            return;
        }
        if a != b {
            self.found.push((field.to_string(), a, b));
            if self.incoming_wins {
                *current = incoming.clone();
            }
        }
    }

    fn finish(self, id: &str, sources: &ProvenanceMap) -> Vec<ConflictRecord> {
        if !self.found.is_empty() {
            debug!(module = %self.module, id, conflicts = self.found.len(), "merge conflicts");
        }
        let names: Vec<String> = sources.keys().cloned().collect();
        self.found
            .into_iter()
            .map(|(field, a, b)| ConflictRecord {
                module: self.module,
                id: id.to_string(),
                field,
                a,
                b,
                sources: names.clone(),
            })
            .collect()
    }
}

/// Run-wide conflict list that ignores exact repeats.
#[derive(Debug, Default)]
pub struct ConflictLog {
    records: Vec<ConflictRecord>,
    seen: HashSet<(Module, String, String, String, String)>,
}

impl ConflictLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many of `conflicts` were new.
    pub fn extend(&mut self, conflicts: impl IntoIterator<Item = ConflictRecord>) -> usize {
        let mut added = 0;
        for c in conflicts {
            let key = (c.module, c.id.clone(), c.field.clone(), c.a.to_string(), c.b.to_string());
            if self.seen.insert(key) {
                self.records.push(c);
                added += 1;
            }
        }
        added
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<ConflictRecord> {
        self.records
    }
}
