use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use super::skills::{split_by_weapon_type, GENERAL_BUCKET};
use super::vocab::Vocabulary;
use crate::model::PotentialTier;

static BONUS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+)\s+Bonus$").unwrap());
static TIER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^Tier\s*(\d+)$").unwrap());

/// `"<n> Bonus"` headed tiers. Bare "Tier" / "Bonus" lines are layout noise.
pub fn scan_bonus_tiers(lines: &[String]) -> Vec<PotentialTier> {
    scan_tiers(lines, &BONUS_RE, |l| l == "Tier" || l == "Bonus")
}

/// `"Tier <n>"` headed tiers, bucketed by the weapon-type lines between them.
pub fn scan_grouped_tiers(
    lines: &[String],
    vocab: &Vocabulary,
) -> BTreeMap<String, Vec<PotentialTier>> {
    let mut by_weapon: BTreeMap<String, Vec<PotentialTier>> = BTreeMap::new();
    for (bucket, segment) in split_by_weapon_type(lines, vocab) {
        let tiers = scan_tiers(segment, &TIER_RE, |_| false);
        by_weapon.entry(bucket.to_string()).or_default().extend(tiers);
    }
    by_weapon.retain(|bucket, tiers| bucket != GENERAL_BUCKET || !tiers.is_empty());
    by_weapon
}

fn scan_tiers(lines: &[String], marker: &Regex, noise: impl Fn(&str) -> bool) -> Vec<PotentialTier> {
    let mut tiers: Vec<PotentialTier> = Vec::new();
    let mut current: Option<(u32, Vec<&str>)> = None;

    for line in lines {
        if let Some(tier) = marker.captures(line).and_then(|c| c[1].parse::<u32>().ok()) {
            if let Some((n, text)) = current.take() {
                tiers.push(PotentialTier::new(n, text.join(" ").trim()));
            }
            current = Some((tier, Vec::new()));
            continue;
        }
        if let Some((_, text)) = current.as_mut() {
            if !noise(line) {
                text.push(line);
            }
        }
    }
    if let Some((n, text)) = current {
        tiers.push(PotentialTier::new(n, text.join(" ").trim()));
    }

    let mut seen = HashSet::new();
    tiers.retain(|t| t.tier >= 1 && seen.insert(t.tier));
    tiers
}
