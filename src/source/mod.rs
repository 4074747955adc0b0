//! Per-source page record builders.
//!
//! Each source dialect lays its pages out differently, but both feed the same
//! line scanners and effect extractor. The batch driver only sees
//! [`PageRecordBuilder`].

pub mod genshin;
pub mod sdso;

use crate::config::{SourceSettings, PRIMARY_SOURCE, SECONDARY_SOURCE};
use crate::effects::{parse_potential_effects, parse_skill_effects};
use crate::error::SkipReason;
use crate::model::{Character, Weapon};
use crate::page::{EntityDocument, Page};
use crate::parser::vocab::Vocabulary;

pub use genshin::GenshinBuilder;
pub use sdso::SdsoBuilder;

/// Result of building from one document.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildOutcome<T> {
    Built { record: T, warnings: Vec<String> },
    Skipped(SkipReason),
}

impl<T> BuildOutcome<T> {
    pub fn record(&self) -> Option<&T> {
        match self {
            BuildOutcome::Built { record, .. } => Some(record),
            BuildOutcome::Skipped(_) => None,
        }
    }
}

pub trait PageRecordBuilder {
    /// Source name records are attributed to.
    fn source(&self) -> &str;

    /// Extract one character from its page. Soft problems go into `warnings`.
    fn character(
        &self,
        doc: &EntityDocument,
        warnings: &mut Vec<String>,
    ) -> Result<Character, SkipReason>;

    /// Extract the weapons a document describes (a list page or a single weapon page).
    fn weapons(
        &self,
        doc: &EntityDocument,
        warnings: &mut Vec<String>,
    ) -> Result<Vec<Weapon>, SkipReason>;

    fn build_character(&self, doc: &EntityDocument) -> BuildOutcome<Character> {
        let mut warnings = Vec::new();
        match self.character(doc, &mut warnings) {
            Ok(mut record) => {
                annotate_character(&mut record, self.source());
                BuildOutcome::Built { record, warnings }
            }
            Err(reason) => BuildOutcome::Skipped(reason),
        }
    }

    fn build_weapons(&self, doc: &EntityDocument) -> BuildOutcome<Vec<Weapon>> {
        let mut warnings = Vec::new();
        match self.weapons(doc, &mut warnings) {
            Ok(record) if record.is_empty() => BuildOutcome::Skipped(SkipReason::NoRecords("weapon")),
            Ok(record) => BuildOutcome::Built { record, warnings },
            Err(reason) => BuildOutcome::Skipped(reason),
        }
    }
}

/// Pick the builder for a configured source by its dialect name.
pub fn builder_for(
    settings: &SourceSettings,
    vocab: &Vocabulary,
    seen_at: &str,
) -> Option<Box<dyn PageRecordBuilder>> {
    match settings.name.as_str() {
        PRIMARY_SOURCE => Some(Box::new(GenshinBuilder::new(vocab.clone(), &settings.base_url))),
        SECONDARY_SOURCE => Some(Box::new(SdsoBuilder::new(
            vocab.clone(),
            &settings.base_url,
            seen_at,
        ))),
        _ => None,
    }
}

/// Tag every nested skill and tier with its source and effect analysis.
fn annotate_character(character: &mut Character, source: &str) {
    for skill in character.skills_by_weapon.values_mut().flatten() {
        skill.source = source.to_string();
        skill.parsed = Some(parse_skill_effects(&skill.description));
    }
    for tier in character.potential_by_weapon.values_mut().flatten() {
        tier.source = source.to_string();
        tier.parsed = Some(parse_potential_effects(&tier.text));
    }
}

/// `"Daisy Build | Seven Deadly Sins: Origin"` → `"Daisy"`.
pub(crate) fn title_name(title: &str) -> String {
    match title.split_once(" Build") {
        Some((name, _)) => name.trim().to_string(),
        None => title.trim().to_string(),
    }
}

pub(crate) fn h1_text(page: &Page) -> &str {
    page.find("h1").map(|h| h.text()).unwrap_or("")
}
