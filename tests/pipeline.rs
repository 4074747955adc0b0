use std::path::Path;

use chrono::{TimeZone, Utc};
use sdso_db::config::Precedence;
use sdso_db::dataset::{build, BuildOutput, SourceRun};
use sdso_db::id::{character_id, weapon_id};
use sdso_db::model::Module;
use sdso_db::page::Capture;
use sdso_db::parser::vocab::Vocabulary;
use sdso_db::snapshot::{DirStore, SnapshotStore};
use sdso_db::source::{GenshinBuilder, SdsoBuilder};

const GENERATED_AT: &str = "2026-03-01T12:00:00Z";

fn captures() -> (Capture, Capture) {
    let primary = Capture::load(Path::new("tests/fixtures/genshin.json")).unwrap();
    let secondary = Capture::load(Path::new("tests/fixtures/7dsorigin.json")).unwrap();
    (primary, secondary)
}

fn precedence() -> Precedence {
    Precedence {
        collections: Some("7dsorigin".to_string()),
        scalars: None,
    }
}

fn run(with_secondary: bool) -> BuildOutput {
    let (primary, secondary) = captures();
    let genshin = GenshinBuilder::new(Vocabulary::default(), "https://genshin.gg");
    let sdso = SdsoBuilder::new(Vocabulary::default(), "https://7dsorigin.gg", GENERATED_AT);
    let secondary_run = with_secondary.then(|| SourceRun {
        builder: &sdso,
        capture: &secondary,
    });
    build(
        SourceRun {
            builder: &genshin,
            capture: &primary,
        },
        secondary_run,
        &precedence(),
        GENERATED_AT,
    )
}

#[test]
fn both_sources_merge() {
    let out = run(true);
    let counts = &out.meta.counts;
    assert_eq!(counts.characters, 3);
    assert_eq!(counts.weapons, 4);
    assert_eq!(counts.skills, 8);
    assert_eq!(counts.conflicts, 4);
    assert_eq!(out.meta.skipped.len(), 1);
    assert_eq!(out.meta.sources, vec!["genshin", "7dsorigin"]);

    let mut fields: Vec<(Module, &str)> = out
        .meta
        .conflicts
        .iter()
        .map(|c| (c.module, c.field.as_str()))
        .collect();
    fields.sort();
    assert_eq!(
        fields,
        vec![
            (Module::Characters, "description"),
            (Module::Characters, "image_url"),
            (Module::Weapons, "equipment_attack"),
            (Module::Weapons, "image_url"),
        ]
    );
}

#[test]
fn collections_follow_secondary() {
    let out = run(true);
    let daisy = &out.dataset.modules.characters[&character_id("Daisy")];
    assert_eq!(daisy.weapon_types, vec!["Axe", "Book"]);
    assert_eq!(daisy.sources.len(), 2);

    let axe: Vec<&str> = daisy.skills_by_weapon["Axe"].iter().map(|s| s.name.as_str()).collect();
    assert_eq!(axe, vec!["Basic Attack", "Cleave", "Sunflower Burst", "Garden Guard"]);

    let cleave = &daisy.skills_by_weapon["Axe"][1];
    assert_eq!(cleave.source, "7dsorigin");
    assert_eq!(cleave.versions.len(), 2);
    assert_eq!(cleave.binding.as_deref(), Some("E"));
    assert_eq!(cleave.cooldown, Some(8.0));
    let parsed = cleave.parsed.as_ref().unwrap();
    assert_eq!(parsed.multiplier_pct, Some(160.0));

    let tiers: Vec<(u32, &str)> = daisy.potential_by_weapon["Axe"]
        .iter()
        .map(|t| (t.tier, t.text.as_str()))
        .collect();
    assert_eq!(tiers.len(), 3);
    assert_eq!(tiers[0], (1, "Increases ATK by 6%."));
    assert_eq!(tiers[2].0, 3);

    // scalars keep the primary value when no scalar precedence is set
    assert_eq!(daisy.description, "Daisy is a cheerful fighter from Liones.");
}

#[test]
fn weapons_merge_and_insert() {
    let out = run(true);
    let weapons = &out.dataset.modules.weapons;
    let oak = &weapons[&weapon_id("Oak Staff", "Staff")];
    assert_eq!(oak.equipment_attack, Some(800));
    assert_eq!(oak.rarity, Some(3));
    assert!(weapons.contains_key(&weapon_id("Ember Axe", "Axe")));

    let names: Vec<&str> = out.legacy.weapons.iter().map(|w| w.name.as_str()).collect();
    assert_eq!(names, vec!["Ember Axe", "Iron Axe", "Moon Book", "Oak Staff"]);
    let moon = out.legacy.weapons.iter().find(|w| w.name == "Moon Book").unwrap();
    assert_eq!(moon.atk_bonus, 1120);
}

#[test]
fn primary_only_run() {
    let out = run(false);
    assert_eq!(out.meta.counts.characters, 2);
    assert_eq!(out.meta.counts.weapons, 3);
    assert_eq!(out.meta.counts.skills, 5);
    assert!(out.meta.conflicts.is_empty());
    assert_eq!(out.meta.sources, vec!["genshin"]);
}

#[test]
fn snapshots_track_secondary_additions() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = DirStore::new(dir.path());

    let first = serde_json::to_value(&run(false).dataset).unwrap();
    let second = serde_json::to_value(&run(true).dataset).unwrap();
    store.write(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(), &first).unwrap();
    store.write(Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap(), &second).unwrap();

    let diff = store.latest_diff().unwrap();
    assert!(diff.added[&Module::Characters].contains(&character_id("Zeldris")));
    assert!(diff.added[&Module::Weapons].contains(&weapon_id("Ember Axe", "Axe")));
    assert_eq!(diff.added[&Module::Skills].len(), 3);
    assert!(diff.changed[&Module::Characters].contains(&character_id("Daisy")));
    assert!(diff.changed[&Module::Weapons].contains(&weapon_id("Oak Staff", "Staff")));
    assert!(diff.removed.values().all(|ids| ids.is_empty()));
}

#[test]
fn identical_runs_diff_empty() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = DirStore::new(dir.path());
    let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();

    store.write(at, &serde_json::to_value(&run(true).dataset).unwrap()).unwrap();
    store.write(at, &serde_json::to_value(&run(true).dataset).unwrap()).unwrap();

    assert_eq!(store.list().unwrap().len(), 2);
    assert!(store.latest_diff().unwrap().is_empty());
}
