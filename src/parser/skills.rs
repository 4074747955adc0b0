use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use super::lines::{classify_skill_lines, LineKind};
use super::vocab::Vocabulary;
use crate::model::{HitMultiplier, Multiplier, Skill};

static COOLDOWN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Cooldown:\s*([0-9]+(?:\.[0-9]+)?)\s*sec").unwrap());
static HIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(\d+(?:st|nd|rd|th)|first|second|third|fourth|fifth|sixth|seventh|eighth|ninth|tenth) hit:\s*([0-9]+(?:\.[0-9]+)?)%\s+of\s+Attack",
    )
    .unwrap()
});
static OF_ATTACK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)([0-9]+(?:\.[0-9]+)?)%\s+of\s+Attack").unwrap());
static EQUAL_TO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)damage equal to\s*([0-9]+(?:\.[0-9]+)?)%\s*of\s*([A-Za-z ]+?)(?:[.,]|$)")
        .unwrap()
});

const MAX_MULTIPLIERS: usize = 50;
pub const GENERAL_BUCKET: &str = "General";

/// How generic multipliers are pulled out of a skill body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultiplierStyle {
    /// Any body line containing `N% of Attack`.
    PerLine,
    /// `damage equal to N% of <stat>` phrases in the joined description.
    DamageEqualTo,
}

/// Scan one skill section into records, one per category anchor.
///
/// Returns an empty list when the section has no anchors.
pub fn scan_skills(lines: &[String], vocab: &Vocabulary, style: MultiplierStyle) -> Vec<Skill> {
    let kinds = classify_skill_lines(lines, vocab);
    let anchors: Vec<usize> = kinds
        .iter()
        .enumerate()
        .filter(|(_, k)| matches!(k, LineKind::Anchor(_)))
        .map(|(i, _)| i)
        .collect();

    let mut skills = Vec::with_capacity(anchors.len());
    for (n, &j) in anchors.iter().enumerate() {
        let LineKind::Anchor(category) = kinds[j] else {
            continue;
        };
        let prev = if n > 0 { anchors[n - 1] + 1 } else { 0 };
        let next = anchors.get(n + 1).copied().unwrap_or(kinds.len());

        let binding = kinds[prev..j].iter().rev().find_map(|k| match k {
            LineKind::Binding(b) => Some(b.to_string()),
            _ => None,
        });

        // No name line falls back to the category label ("Normal Attack" blocks).
        let name = kinds[prev..j]
            .iter()
            .rev()
            .find(|k| !matches!(k, LineKind::Binding(_)))
            .and_then(|k| match k {
                LineKind::Name(t) => Some(t.to_string()),
                _ => None,
            })
            .unwrap_or_else(|| category.label().to_string());

        // The next record's name line stays in this body as well.
        let body: Vec<&str> = kinds[j + 1..next]
            .iter()
            .filter_map(|k| match k {
                LineKind::Body(t) | LineKind::Name(t) => Some(*t),
                _ => None,
            })
            .collect();

        let mut skill = Skill::new(name, category);
        skill.binding = binding;
        fill_body(&mut skill, &body, style);
        skills.push(skill);
    }

    dedup_skills(skills)
}

/// Scan a section where weapon-type lines switch the bucket skills land in.
/// Skills before the first weapon-type line go to [`GENERAL_BUCKET`].
pub fn scan_grouped_skills(
    lines: &[String],
    vocab: &Vocabulary,
    style: MultiplierStyle,
) -> BTreeMap<String, Vec<Skill>> {
    let mut by_weapon: BTreeMap<String, Vec<Skill>> = BTreeMap::new();
    for (bucket, segment) in split_by_weapon_type(lines, vocab) {
        let skills = scan_skills(segment, vocab, style);
        let entry = by_weapon.entry(bucket.to_string()).or_default();
        entry.extend(skills);
    }
    by_weapon.retain(|bucket, skills| bucket != GENERAL_BUCKET || !skills.is_empty());
    by_weapon
}

/// Cut `lines` at every weapon-type line. The leading segment is labelled
/// [`GENERAL_BUCKET`].
pub fn split_by_weapon_type<'a>(
    lines: &'a [String],
    vocab: &Vocabulary,
) -> Vec<(&'a str, &'a [String])> {
    let mut segments = Vec::new();
    let mut label = GENERAL_BUCKET;
    let mut start = 0;
    for (i, line) in lines.iter().enumerate() {
        if vocab.is_weapon_type(line) {
            segments.push((label, &lines[start..i]));
            label = line.as_str();
            start = i + 1;
        }
    }
    segments.push((label, &lines[start..]));
    segments
}

fn fill_body(skill: &mut Skill, body: &[&str], style: MultiplierStyle) {
    let mut description: Vec<&str> = Vec::new();
    for &line in body {
        if let Some(c) = COOLDOWN_RE.captures(line) {
            skill.cooldown = c[1].parse().ok();
            continue;
        }
        if let Some(hit) = parse_hit_line(line) {
            skill.hits.push(hit);
            continue;
        }
        if style == MultiplierStyle::PerLine {
            if let Some(c) = OF_ATTACK_RE.captures(line) {
                if let Ok(value_pct) = c[1].parse() {
                    skill.multipliers.push(Multiplier {
                        value_pct,
                        scaling: "ATK".into(),
                        context: line.to_string(),
                    });
                }
            }
        }
        description.push(line);
    }

    skill.description = description.join(" ").trim().to_string();
    if style == MultiplierStyle::DamageEqualTo {
        skill.multipliers = EQUAL_TO_RE
            .captures_iter(&skill.description)
            .filter_map(|c| {
                Some(Multiplier {
                    value_pct: c[1].parse().ok()?,
                    scaling: c[2].trim().to_uppercase(),
                    context: c[0].to_string(),
                })
            })
            .collect();
    }
    skill.hits.sort_by_key(|h| h.hit);
    skill.multipliers.truncate(MAX_MULTIPLIERS);
}

/// `"3rd hit: 25% of Attack"` → hit 3 at 25% ATK.
pub fn parse_hit_line(line: &str) -> Option<HitMultiplier> {
    let caps = HIT_RE.captures(line)?;
    let hit = ordinal_index(&caps[1])?;
    Some(HitMultiplier {
        hit,
        multiplier_pct: caps[2].parse().ok()?,
        scaling: "ATK".into(),
    })
}

fn ordinal_index(ordinal: &str) -> Option<u32> {
    const WORDS: &[&str] = &[
        "first", "second", "third", "fourth", "fifth", "sixth", "seventh", "eighth", "ninth",
        "tenth",
    ];
    let lower = ordinal.to_lowercase();
    if let Some(pos) = WORDS.iter().position(|w| *w == lower) {
        return Some(pos as u32 + 1);
    }
    let digits: String = lower.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok().filter(|n| *n >= 1)
}

/// Page layouts sometimes render a block twice; keep the first copy.
fn dedup_skills(skills: Vec<Skill>) -> Vec<Skill> {
    let mut seen = HashSet::new();
    skills
        .into_iter()
        .filter(|s| {
            seen.insert((
                s.name.clone(),
                s.category,
                s.binding.clone(),
                s.cooldown.map(f64::to_bits),
            ))
        })
        .collect()
}
