//! Best-effort extraction of numeric effects from skill and potential text.
//!
//! Every recognizer is independent; a missing pattern just leaves the field
//! empty. Nothing here can fail.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

const NUM: &str = r"([0-9]+(?:\.[0-9]+)?)";

fn re(pattern: &str) -> Regex {
    Regex::new(&format!("(?i){}", pattern.replace("{N}", NUM))).unwrap()
}

static MULT_ATK_RE: LazyLock<Regex> = LazyLock::new(|| re(r"{N}%\s*(?:of\s*)?(?:ATK|Attack)\b"));
static MULT_HP_RE: LazyLock<Regex> = LazyLock::new(|| re(r"{N}%\s*(?:of\s*)?HP\b"));
static MULT_EQUAL_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"damage\s+equal\s+to\s*{N}%\s*(?:of\s*)?(ATK|Attack|HP)\b"));
static HP_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| re(r"\bHP\b"));
static ATK_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| re(r"\bATK\b|\bAttack\b"));
static HITS_RE: LazyLock<Regex> = LazyLock::new(|| re(r"(\d+)\s*(?:hits|hit|times)\b"));

static DMG_BONUS_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"increases?\s+damage(?:\s+dealt)?\s+by\s+{N}%"));
static IF_DEBUFF_RE: LazyLock<Regex> = LazyLock::new(|| re(r"\bif\b.*\b(?:debuffed|debuff)\b"));
static DMG_IF_DEBUFF_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"increases?\s+damage(?:\s+dealt)?\s+by\s+{N}%.*\b(?:debuffed|debuff)\b"));
static IGNORE_DEF_RE: LazyLock<Regex> = LazyLock::new(|| re(r"ignores?\s+{N}%\s*DEF\b"));
static IGNORE_DEFENSE_RE: LazyLock<Regex> = LazyLock::new(|| re(r"\bignores?\s+defense\b"));
static RES_PEN_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?:penetrate|ignore)s?\s+{N}%\s*(?:resistance|res)\b"));
static TRUE_DMG_RE: LazyLock<Regex> = LazyLock::new(|| re(r"\btrue damage\b"));
static CRIT_DMG_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"increases?\s+crit(?:ical)?\s+damage\s+by\s+{N}%"));
static CRIT_RATE_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"increases?\s+crit(?:ical)?\s+(?:rate|chance)\s+by\s+{N}%"));
static ENEMY_CRIT_RES_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"reduces?\s+enemy\s+crit(?:ical)?\s+resist(?:ance)?\s+by\s+{N}%"));
static HP_BELOW_RE: LazyLock<Regex> = LazyLock::new(|| re(r"HP\s+is\s+below\s+{N}%"));
static PER_STACK_RE: LazyLock<Regex> = LazyLock::new(|| re(r"per\s+stack\b.*?{N}%"));
static MAX_STACKS_RE: LazyLock<Regex> = LazyLock::new(|| re(r"max(?:imum)?\s+(\d+)\s+stacks\b"));
static STAT_RES: LazyLock<[(Stat, Regex); 3]> = LazyLock::new(|| {
    [
        (Stat::Atk, re(r"increases?\s+ATK\s+by\s+{N}%")),
        (Stat::Def, re(r"increases?\s+DEF\s+by\s+{N}%")),
        (Stat::Hp, re(r"increases?\s+HP\s+by\s+{N}%")),
    ]
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scaling {
    #[serde(rename = "ATK")]
    Atk,
    #[serde(rename = "HP")]
    Hp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stat {
    Atk,
    Def,
    Hp,
}

/// One structured effect; serialized as `{"type": ..., "value": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Effect {
    DmgBonusPct(f64),
    BonusIfDebuffed(f64),
    CondIfDebuffed(bool),
    IgnoreDefPct(f64),
    ResPenPct(f64),
    TrueDamage(bool),
    CritDmgBonusPct(f64),
    CritRateBonusPct(f64),
    EnemyCritResistDownPct(f64),
    CondHpBelowPct(f64),
    PerStackBonusPct(f64),
    MaxStacks(u32),
    AtkPct(f64),
    DefPct(f64),
    HpPct(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillAnalysis {
    pub multiplier_pct: Option<f64>,
    pub hits: Option<u32>,
    pub scaling: Option<Scaling>,
    pub effects: Vec<Effect>,
    pub confidence_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PotentialAnalysis {
    pub effects: Vec<Effect>,
    pub confidence_score: f64,
}

pub fn parse_skill_effects(text: &str) -> SkillAnalysis {
    let text = text.trim();
    let (multiplier_pct, scaling) = multiplier_and_scaling(text);
    let hits = HITS_RE
        .captures(text)
        .and_then(|c| c[1].parse::<u32>().ok());
    let effects = skill_effects(text);

    let mut score = 0.0;
    if multiplier_pct.is_some() {
        score += 0.45;
    }
    if hits.is_some() {
        score += 0.15;
    }
    if scaling.is_some() {
        score += 0.10;
    }
    score += (0.12 * effects.len() as f64).min(0.30);

    SkillAnalysis {
        multiplier_pct,
        hits,
        scaling,
        effects,
        confidence_score: score.clamp(0.0, 1.0),
    }
}

pub fn parse_potential_effects(text: &str) -> PotentialAnalysis {
    let text = text.trim();
    let mut effects = Vec::new();

    for (stat, pattern) in STAT_RES.iter() {
        if let Some(v) = first_number(pattern, text) {
            effects.push(match stat {
                Stat::Atk => Effect::AtkPct(v),
                Stat::Def => Effect::DefPct(v),
                Stat::Hp => Effect::HpPct(v),
            });
        }
    }
    if let Some(v) = first_number(&DMG_BONUS_RE, text) {
        effects.push(Effect::DmgBonusPct(v));
    }
    if let Some(v) = first_number(&CRIT_RATE_RE, text) {
        effects.push(Effect::CritRateBonusPct(v));
    }
    if let Some(v) = first_number(&CRIT_DMG_RE, text) {
        effects.push(Effect::CritDmgBonusPct(v));
    }
    if IF_DEBUFF_RE.is_match(text) {
        effects.push(Effect::CondIfDebuffed(true));
    }
    if let Some(v) = first_number(&HP_BELOW_RE, text) {
        effects.push(Effect::CondHpBelowPct(v));
    }

    let effects = dedup(effects);
    let confidence_score = if effects.is_empty() {
        0.25
    } else {
        (0.35 + 0.15 * effects.len() as f64).min(1.0)
    };
    PotentialAnalysis {
        effects,
        confidence_score,
    }
}

/// First match in priority order wins; otherwise fall back to a bare token.
fn multiplier_and_scaling(text: &str) -> (Option<f64>, Option<Scaling>) {
    if let Some(v) = first_number(&MULT_ATK_RE, text) {
        return (Some(v), Some(Scaling::Atk));
    }
    if let Some(v) = first_number(&MULT_HP_RE, text) {
        return (Some(v), Some(Scaling::Hp));
    }
    if let Some(c) = MULT_EQUAL_RE.captures(text) {
        if let Ok(v) = c[1].parse::<f64>() {
            let scaling = if c[2].eq_ignore_ascii_case("hp") {
                Scaling::Hp
            } else {
                Scaling::Atk
            };
            return (Some(v), Some(scaling));
        }
    }

    if HP_TOKEN_RE.is_match(text) {
        (None, Some(Scaling::Hp))
    } else if ATK_TOKEN_RE.is_match(text) {
        (None, Some(Scaling::Atk))
    } else {
        (None, None)
    }
}

fn skill_effects(text: &str) -> Vec<Effect> {
    let mut effects: Vec<Effect> = DMG_BONUS_RE
        .captures_iter(text)
        .filter_map(|c| c[1].parse().ok())
        .map(Effect::DmgBonusPct)
        .collect();

    if IF_DEBUFF_RE.is_match(text) {
        match first_number(&DMG_IF_DEBUFF_RE, text) {
            Some(v) => effects.push(Effect::BonusIfDebuffed(v)),
            None => effects.push(Effect::CondIfDebuffed(true)),
        }
    }

    if let Some(v) = first_number(&IGNORE_DEF_RE, text) {
        effects.push(Effect::IgnoreDefPct(v));
    } else if IGNORE_DEFENSE_RE.is_match(text) {
        effects.push(Effect::IgnoreDefPct(100.0));
    }
    if let Some(v) = first_number(&RES_PEN_RE, text) {
        effects.push(Effect::ResPenPct(v));
    }
    if TRUE_DMG_RE.is_match(text) {
        effects.push(Effect::TrueDamage(true));
    }
    if let Some(v) = first_number(&CRIT_DMG_RE, text) {
        effects.push(Effect::CritDmgBonusPct(v));
    }
    if let Some(v) = first_number(&CRIT_RATE_RE, text) {
        effects.push(Effect::CritRateBonusPct(v));
    }
    if let Some(v) = first_number(&ENEMY_CRIT_RES_RE, text) {
        effects.push(Effect::EnemyCritResistDownPct(v));
    }
    if let Some(v) = first_number(&HP_BELOW_RE, text) {
        effects.push(Effect::CondHpBelowPct(v));
    }
    if let Some(v) = first_number(&PER_STACK_RE, text) {
        effects.push(Effect::PerStackBonusPct(v));
    }
    if let Some(n) = MAX_STACKS_RE
        .captures(text)
        .and_then(|c| c[1].parse::<u32>().ok())
    {
        effects.push(Effect::MaxStacks(n));
    }

    dedup(effects)
}

fn first_number(pattern: &Regex, text: &str) -> Option<f64> {
    pattern.captures(text).and_then(|c| c[1].parse().ok())
}

/// Keep the first occurrence of each (tag, value) pair.
fn dedup(effects: Vec<Effect>) -> Vec<Effect> {
    let mut out: Vec<Effect> = Vec::with_capacity(effects.len());
    for e in effects {
        if !out.contains(&e) {
            out.push(e);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_text() {
        let a = parse_skill_effects("");
        assert_eq!(a.multiplier_pct, None);
        assert_eq!(a.scaling, None);
        assert!(a.effects.is_empty());
        assert_eq!(a.confidence_score, 0.0);

        let p = parse_potential_effects("");
        assert!(p.effects.is_empty());
        assert_eq!(p.confidence_score, 0.25);
    }

    #[test]
    fn attack_multiplier_and_hits() {
        let a = parse_skill_effects("Strikes 3 times, dealing 120% of Attack as damage.");
        assert_eq!(a.multiplier_pct, Some(120.0));
        assert_eq!(a.scaling, Some(Scaling::Atk));
        assert_eq!(a.hits, Some(3));
        assert!((a.confidence_score - 0.70).abs() < 1e-9);
    }

    #[test]
    fn hp_multiplier() {
        let a = parse_skill_effects("Heals allies for 15% HP.");
        assert_eq!(a.multiplier_pct, Some(15.0));
        assert_eq!(a.scaling, Some(Scaling::Hp));
    }

    #[test]
    fn damage_equal_to() {
        let a = parse_skill_effects("Deals damage equal to 80.5% HP to nearby foes");
        assert_eq!(a.multiplier_pct, Some(80.5));
        assert_eq!(a.scaling, Some(Scaling::Hp));
    }

    #[test]
    fn bare_token_scaling_without_multiplier() {
        let a = parse_skill_effects("Damage scales with the caster's ATK.");
        assert_eq!(a.multiplier_pct, None);
        assert_eq!(a.scaling, Some(Scaling::Atk));

        let a = parse_skill_effects("Restores HP over time");
        assert_eq!(a.scaling, Some(Scaling::Hp));
    }

    #[test]
    fn independent_recognizers_all_fire() {
        let text = "Ignores 30% DEF and deals true damage. Increases critical damage by 25% \
                    and increases crit rate by 10%. Reduces enemy crit resistance by 5%.";
        let a = parse_skill_effects(text);
        assert!(a.effects.contains(&Effect::IgnoreDefPct(30.0)));
        assert!(a.effects.contains(&Effect::TrueDamage(true)));
        assert!(a.effects.contains(&Effect::CritDmgBonusPct(25.0)));
        assert!(a.effects.contains(&Effect::CritRateBonusPct(10.0)));
        assert!(a.effects.contains(&Effect::EnemyCritResistDownPct(5.0)));
    }

    #[test]
    fn ignore_defense_without_number() {
        let a = parse_skill_effects("This attack ignores defense.");
        assert_eq!(a.effects, vec![Effect::IgnoreDefPct(100.0)]);
    }

    #[test]
    fn resistance_penetration() {
        let a = parse_skill_effects("Penetrates 12% resistance");
        assert_eq!(a.effects, vec![Effect::ResPenPct(12.0)]);
    }

    #[test]
    fn debuff_conditions() {
        let a = parse_skill_effects("Increases damage dealt by 20% if the target is debuffed.");
        assert_eq!(
            a.effects,
            vec![Effect::DmgBonusPct(20.0), Effect::BonusIfDebuffed(20.0)]
        );

        let a = parse_skill_effects("If the enemy has a debuff, stun them.");
        assert_eq!(a.effects, vec![Effect::CondIfDebuffed(true)]);
    }

    #[test]
    fn stacks_and_thresholds() {
        let a = parse_skill_effects(
            "When HP is below 40%, gain Fury. Per stack, damage rises by 4%, max 5 stacks.",
        );
        assert!(a.effects.contains(&Effect::CondHpBelowPct(40.0)));
        assert!(a.effects.contains(&Effect::PerStackBonusPct(4.0)));
        assert!(a.effects.contains(&Effect::MaxStacks(5)));
    }

    #[test]
    fn duplicate_phrase_yields_one_effect() {
        let a = parse_skill_effects(
            "Increases damage by 10%. Later, increases damage by 10% again.",
        );
        assert_eq!(a.effects, vec![Effect::DmgBonusPct(10.0)]);
    }

    #[test]
    fn distinct_values_are_kept() {
        let a = parse_skill_effects("Increases damage by 10%, then increases damage by 15%.");
        assert_eq!(
            a.effects,
            vec![Effect::DmgBonusPct(10.0), Effect::DmgBonusPct(15.0)]
        );
    }

    #[test]
    fn effect_score_is_capped() {
        let text = "Deals 100% of Attack in 2 hits. Ignores 10% DEF, deals true damage, \
                    increases crit damage by 5%, increases crit rate by 5%, max 3 stacks.";
        let a = parse_skill_effects(text);
        assert!(a.effects.len() >= 4);
        assert!((a.confidence_score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn confidence_always_in_bounds() {
        let samples = [
            "",
            "???",
            "%%% 999999999999999999999 hits",
            "increases damage by 1% increases damage by 2% increases damage by 3% increases damage by 4%",
            "HP ATK Attack HP",
        ];
        for s in samples {
            let c = parse_skill_effects(s).confidence_score;
            assert!((0.0..=1.0).contains(&c), "{s}: {c}");
            let c = parse_potential_effects(s).confidence_score;
            assert!((0.0..=1.0).contains(&c), "{s}: {c}");
        }
    }

    #[test]
    fn potential_stats() {
        let p = parse_potential_effects("Increases ATK by 8% and increases critical rate by 3%.");
        assert_eq!(p.effects, vec![Effect::AtkPct(8.0), Effect::CritRateBonusPct(3.0)]);
        assert!((p.confidence_score - 0.65).abs() < 1e-9);
    }

    #[test]
    fn effect_wire_shape() {
        assert_eq!(
            serde_json::to_value(Effect::MaxStacks(3)).unwrap(),
            json!({"type": "max_stacks", "value": 3})
        );
        assert_eq!(
            serde_json::to_value(Effect::TrueDamage(true)).unwrap(),
            json!({"type": "true_damage", "value": true})
        );
    }
}
