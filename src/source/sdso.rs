use tracing::debug;

use super::{h1_text, title_name, PageRecordBuilder};
use crate::config::SECONDARY_SOURCE;
use crate::error::SkipReason;
use crate::id::{character_id, weapon_id};
use crate::model::{Character, Provenance, ProvenanceMap, Weapon};
use crate::page::{absolutize, EntityDocument, Page};
use crate::parser::lines::{section_between, slice_section};
use crate::parser::potentials::scan_grouped_tiers;
use crate::parser::skills::{scan_grouped_skills, MultiplierStyle};
use crate::parser::vocab::Vocabulary;
use crate::parser::weapons::{quick_information, weapon_statistics};

const TYPE_SCAN_LINES: usize = 20;
const UNKNOWN_WEAPON_TYPE: &str = "Unknown";
const WEAPON_DESCRIPTION_STOPS: [&str; 6] = [
    "Weapon Statistics",
    "Weapon Level",
    "Quick Information",
    "Information",
    "Community",
    "Follow Us",
];

/// Builder for 7dsorigin.gg: one page per character and one per weapon.
pub struct SdsoBuilder {
    vocab: Vocabulary,
    base_url: String,
    seen_at: String,
}

impl SdsoBuilder {
    pub fn new(vocab: Vocabulary, base_url: &str, seen_at: &str) -> Self {
        SdsoBuilder {
            vocab,
            base_url: base_url.to_string(),
            seen_at: seen_at.to_string(),
        }
    }

    fn provenance(&self, doc: &EntityDocument) -> ProvenanceMap {
        let mut sources = ProvenanceMap::new();
        sources.insert(
            SECONDARY_SOURCE.to_string(),
            Provenance {
                source_url: doc.locator.clone(),
                last_seen: Some(self.seen_at.clone()),
            },
        );
        sources
    }

    /// First `img` whose alt mentions the name.
    fn image_by_alt(&self, page: &Page, name: &str) -> Option<String> {
        let needle = name.to_lowercase();
        page.find_all("img")
            .find(|img| {
                img.attr("alt")
                    .map(|alt| alt.to_lowercase().contains(&needle))
                    .unwrap_or(false)
            })
            .and_then(|img| img.attr("src"))
            .filter(|s| !s.is_empty())
            .map(|src| absolutize(&self.base_url, src))
    }

    fn weapon_types(&self, lines: &[String]) -> Vec<String> {
        let Some(ti) = lines.iter().position(|l| l == "Type") else {
            return Vec::new();
        };
        let end = (ti + TYPE_SCAN_LINES).min(lines.len());
        let mut found: Vec<String> = Vec::new();
        for line in &lines[ti + 1..end] {
            if line.starts_with("Skills of") {
                break;
            }
            if self.vocab.is_weapon_type(line) && !found.contains(line) {
                found.push(line.clone());
            }
        }
        found
    }
}

impl PageRecordBuilder for SdsoBuilder {
    fn source(&self) -> &str {
        SECONDARY_SOURCE
    }

    fn character(
        &self,
        doc: &EntityDocument,
        warnings: &mut Vec<String>,
    ) -> Result<Character, SkipReason> {
        let page = &doc.page;
        let name = title_name(h1_text(page));
        if name.is_empty() {
            return Err(SkipReason::MissingTitle);
        }
        let lines = page.lines();

        let skills_of = format!("Skills of {}", name);
        let potentials_of = format!("Potentials of {}", name);
        let stops = [
            "Type",
            "Skills",
            skills_of.as_str(),
            "Potentials",
            potentials_of.as_str(),
            "Costumes",
            "Information",
        ];
        let description = section_between(&lines, "Description", &stops).join(" ");

        let skills_by_weapon = slice_section(
            &lines,
            |l| l.starts_with("Skills of "),
            |l| l.starts_with("Potentials of "),
        )
        .map(|section| scan_grouped_skills(section, &self.vocab, MultiplierStyle::DamageEqualTo))
        .unwrap_or_default();
        let potential_by_weapon = slice_section(
            &lines,
            |l| l.starts_with("Potentials of "),
            |l| l == "Costumes",
        )
        .map(|section| scan_grouped_tiers(section, &self.vocab))
        .unwrap_or_default();

        let weapon_types = self.weapon_types(&lines);
        if weapon_types.is_empty() {
            warnings.push(format!("{}: no weapon types listed", name));
        }
        if skills_by_weapon.is_empty() {
            warnings.push(format!("{}: no skills section", name));
        }
        debug!(character = %name, buckets = skills_by_weapon.len(), "built character");

        Ok(Character {
            id: character_id(&name),
            image_url: self.image_by_alt(page, &name),
            description: description.trim().to_string(),
            weapon_types,
            costumes: Vec::new(),
            skills_by_weapon,
            potential_by_weapon,
            sources: self.provenance(doc),
            name,
        })
    }

    fn weapons(
        &self,
        doc: &EntityDocument,
        warnings: &mut Vec<String>,
    ) -> Result<Vec<Weapon>, SkipReason> {
        let page = &doc.page;
        let name = h1_text(page).to_string();
        if name.is_empty() {
            return Err(SkipReason::MissingTitle);
        }
        let lines = page.lines();

        let info = quick_information(&lines, &self.vocab);
        let weapon_type = info
            .weapon_type
            .or_else(|| lines.iter().find(|l| self.vocab.is_weapon_type(l)).cloned())
            .unwrap_or_else(|| {
                warnings.push(format!("{}: weapon type not found", name));
                UNKNOWN_WEAPON_TYPE.to_string()
            });

        let image_url = self.image_by_alt(page, &name).or_else(|| {
            page.after("h1")
                .iter()
                .filter(|e| e.tag == "img")
                .find_map(|img| img.attr("src").filter(|s| !s.is_empty()))
                .map(|src| absolutize(&self.base_url, src))
        });

        let stats = weapon_statistics(&lines);
        let passive = section_between(&lines, "Description", &WEAPON_DESCRIPTION_STOPS).join(" ");

        Ok(vec![Weapon {
            id: weapon_id(&name, &weapon_type),
            image_url,
            equipment_attack: stats.attack,
            substat_name: stats.substat_name,
            substat_value: stats.substat_value,
            passive_text: passive.trim().to_string(),
            rarity: info.rarity,
            sources: self.provenance(doc),
            name,
            weapon_type,
        }])
    }
}
