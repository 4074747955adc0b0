use std::collections::BTreeMap;

use itertools::Itertools;
use tracing::debug;

use super::{h1_text, title_name, PageRecordBuilder};
use crate::config::PRIMARY_SOURCE;
use crate::error::SkipReason;
use crate::id::{character_id, weapon_id};
use crate::model::{Character, Provenance, ProvenanceMap, Weapon};
use crate::page::{absolutize, EntityDocument, Page};
use crate::parser::costumes::parse_costumes;
use crate::parser::lines::clean_lines;
use crate::parser::potentials::scan_bonus_tiers;
use crate::parser::skills::{scan_skills, MultiplierStyle};
use crate::parser::vocab::Vocabulary;
use crate::parser::weapons::scan_weapon_list;

/// Weapon-type icons sit near the top of a character page.
const WEAPON_TYPE_SCAN_LINES: usize = 60;
const DESCRIPTION_PARTS: usize = 3;
const NAV_LABELS: [&str; 3] = ["Costumes", "Skills", "Potential"];
const FOOTER_MARKER: &str = "is not affiliated";

/// Builder for genshin.gg pages: one page per character, a single list page
/// for all weapons.
pub struct GenshinBuilder {
    vocab: Vocabulary,
    base_url: String,
}

impl GenshinBuilder {
    pub fn new(vocab: Vocabulary, base_url: &str) -> Self {
        GenshinBuilder {
            vocab,
            base_url: base_url.to_string(),
        }
    }

    fn provenance(&self, doc: &EntityDocument) -> ProvenanceMap {
        let mut sources = ProvenanceMap::new();
        sources.insert(
            PRIMARY_SOURCE.to_string(),
            Provenance {
                source_url: doc.locator.clone(),
                last_seen: None,
            },
        );
        sources
    }

    fn character_name(page: &Page) -> String {
        let name = title_name(h1_text(page));
        if !name.is_empty() {
            return name;
        }
        page.find_all("meta")
            .find(|m| m.attr("property") == Some("og:title"))
            .and_then(|m| m.attr("content"))
            .map(title_name)
            .unwrap_or_default()
    }

    fn main_image(&self, page: &Page, name: &str) -> Option<String> {
        let by_alt = page.find_all("img").find(|img| {
            img.attr("alt")
                .map(|alt| !alt.trim().is_empty() && alt.trim().eq_ignore_ascii_case(name))
                .unwrap_or(false)
        });
        let img = by_alt.or_else(|| page.find_all("img").find(|img| img.attr("src").is_some()))?;
        let src = img.attr("src").filter(|s| !s.is_empty())?;
        Some(absolutize(&self.base_url, src))
    }

    fn weapon_image(&self, page: &Page, name: &str) -> Option<String> {
        page.find_all("img")
            .find(|img| img.attr("alt") == Some(name))
            .and_then(|img| img.attr("src"))
            .filter(|s| !s.is_empty())
            .map(|src| absolutize(&self.base_url, src))
    }

    fn weapon_types(&self, lines: &[String]) -> Vec<String> {
        lines
            .iter()
            .take(WEAPON_TYPE_SCAN_LINES)
            .filter(|line| self.vocab.is_weapon_type(line))
            .unique()
            .cloned()
            .collect()
    }
}

/// First few paragraphs after the title, stopping at the section nav or footer.
fn description(page: &Page) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for el in page.after("h1").iter().filter(|e| e.tag == "p" || e.tag == "div") {
        let text = el.text();
        if text.is_empty() {
            continue;
        }
        if NAV_LABELS.iter().all(|label| text.contains(label)) || text.contains(FOOTER_MARKER) {
            break;
        }
        if NAV_LABELS.contains(&text) {
            continue;
        }
        parts.push(text);
        if parts.len() >= DESCRIPTION_PARTS {
            break;
        }
    }
    clean_lines(&parts.join("\n")).join(" ").trim().to_string()
}

impl PageRecordBuilder for GenshinBuilder {
    fn source(&self) -> &str {
        PRIMARY_SOURCE
    }

    fn character(
        &self,
        doc: &EntityDocument,
        warnings: &mut Vec<String>,
    ) -> Result<Character, SkipReason> {
        let page = &doc.page;
        let name = Self::character_name(page);
        if name.is_empty() {
            return Err(SkipReason::MissingTitle);
        }

        let lines = page.lines();
        let weapon_types = self.weapon_types(&lines);
        if weapon_types.is_empty() {
            warnings.push(format!("{}: no weapon types listed", name));
        }

        let mut skills_by_weapon = BTreeMap::new();
        let mut potential_by_weapon = BTreeMap::new();
        for wt in &weapon_types {
            let skill_lines = page.section_lines(&format!("{} {} Skills", name, wt));
            if skill_lines.is_empty() {
                warnings.push(format!("{}: no {} skills section", name, wt));
            } else {
                let skills = scan_skills(&skill_lines, &self.vocab, MultiplierStyle::PerLine);
                skills_by_weapon.insert(wt.clone(), skills);
            }
            let tier_lines = page.section_lines(&format!("{} {} Potential", name, wt));
            if !tier_lines.is_empty() {
                potential_by_weapon.insert(wt.clone(), scan_bonus_tiers(&tier_lines));
            }
        }

        let costumes = parse_costumes(&page.section_lines(&format!("{} Costumes", name)));
        debug!(
            character = %name,
            weapons = weapon_types.len(),
            costumes = costumes.len(),
            "built character"
        );

        Ok(Character {
            id: character_id(&name),
            image_url: self.main_image(page, &name),
            description: description(page),
            weapon_types,
            costumes,
            skills_by_weapon,
            potential_by_weapon,
            sources: self.provenance(doc),
            name,
        })
    }

    fn weapons(
        &self,
        doc: &EntityDocument,
        _warnings: &mut Vec<String>,
    ) -> Result<Vec<Weapon>, SkipReason> {
        let lines = doc.page.lines();
        let weapons: Vec<Weapon> = scan_weapon_list(&lines, &self.vocab)
            .into_iter()
            .map(|block| Weapon {
                id: weapon_id(&block.name, &block.weapon_type),
                image_url: self.weapon_image(&doc.page, &block.name),
                equipment_attack: block.attack,
                substat_name: block.substat_name,
                substat_value: block.substat_value,
                passive_text: block.passive,
                rarity: None,
                sources: self.provenance(doc),
                name: block.name,
                weapon_type: block.weapon_type,
            })
            .collect();
        if weapons.is_empty() {
            return Err(SkipReason::NoRecords("weapon"));
        }
        Ok(weapons)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::Element;
    use crate::parser::vocab::SkillCategory;
    use crate::source::BuildOutcome;

    fn builder() -> GenshinBuilder {
        GenshinBuilder::new(Vocabulary::default(), "https://genshin.gg")
    }

    fn doc(elements: Vec<Element>) -> EntityDocument {
        EntityDocument {
            name: "Daisy".into(),
            locator: "https://genshin.gg/7dso/characters/daisy".into(),
            page: Page::new(elements),
        }
    }

    fn daisy() -> EntityDocument {
        doc(vec![
            Element::new("h1", "Daisy Build | Seven Deadly Sins: Origin"),
            Element::new("span", "Axe\nBook"),
            Element::new("img", "").with_attr("alt", "daisy").with_attr("src", "/img/daisy.png"),
            Element::new("p", "A cheerful fighter."),
            Element::new("div", "Skills"),
            Element::new("p", "Loves flowers."),
            Element::new("div", "Costumes Skills Potential"),
            Element::new("p", "not part of it"),
            Element::new("h2", "Daisy Costumes"),
            Element::new("div", "#### Spring Dress\nImage: spring\nEvent reward"),
            Element::new("h2", "Daisy Axe Skills"),
            Element::new("div", "Cleave\nE\nNormal Skill\nCooldown: 8 sec\nDeals 120% of Attack and increases damage by 10%."),
            Element::new("h2", "Daisy Axe Potential"),
            Element::new("div", "1 Bonus\nIncreases Crit Rate by 5%."),
            Element::new("h2", "Daisy Book Potential"),
            Element::new("div", "1 Bonus\nIncreases HP by 3%."),
        ])
    }

    #[test]
    fn character_page() {
        let outcome = builder().build_character(&daisy());
        let BuildOutcome::Built { record: c, warnings } = outcome else {
            panic!("expected a record");
        };
        assert_eq!(c.name, "Daisy");
        assert_eq!(c.id, character_id("Daisy"));
        assert_eq!(c.weapon_types, vec!["Axe", "Book"]);
        assert_eq!(c.image_url.as_deref(), Some("https://genshin.gg/img/daisy.png"));
        assert_eq!(c.description, "A cheerful fighter. Loves flowers.");
        assert_eq!(c.costumes[0].name, "Spring Dress");
        assert_eq!(c.costumes[0].notes, vec!["Event reward"]);

        let axe = &c.skills_by_weapon["Axe"];
        assert_eq!(axe.len(), 1);
        assert_eq!(axe[0].name, "Cleave");
        assert_eq!(axe[0].category, SkillCategory::NormalSkill);
        assert_eq!(axe[0].source, "genshin");
        let parsed = axe[0].parsed.as_ref().unwrap();
        assert_eq!(parsed.multiplier_pct, Some(120.0));

        assert_eq!(c.potential_by_weapon["Book"][0].text, "Increases HP by 3%.");
        assert_eq!(c.potential_by_weapon["Axe"][0].source, "genshin");
        assert!(c.potential_by_weapon["Axe"][0].parsed.is_some());
        assert!(!c.skills_by_weapon.contains_key("Book"));
        assert_eq!(warnings, vec!["Daisy: no Book skills section"]);
        assert_eq!(c.sources["genshin"].source_url, "https://genshin.gg/7dso/characters/daisy");
    }

    #[test]
    fn og_title_fallback() {
        let d = doc(vec![Element::new("meta", "")
            .with_attr("property", "og:title")
            .with_attr("content", "Meliodas Build | 7DS")]);
        let c = builder().build_character(&d);
        assert_eq!(c.record().unwrap().name, "Meliodas");
    }

    #[test]
    fn untitled_page_is_skipped() {
        let d = doc(vec![Element::new("p", "nothing")]);
        assert_eq!(
            builder().build_character(&d),
            BuildOutcome::Skipped(SkipReason::MissingTitle)
        );
    }

    #[test]
    fn weapons_list_page() {
        let d = EntityDocument {
            name: "weapons".into(),
            locator: "https://genshin.gg/7dso/weapons".into(),
            page: Page::new(vec![
                Element::new("h1", "Weapons"),
                Element::new("div", "Oak Staff\nStaff\nHeals on hit.\nEquipment Attack\n1,250\nCrit Rate\n5.5%"),
                Element::new("img", "").with_attr("alt", "Oak Staff").with_attr("src", "//cdn.genshin.gg/oak.png"),
                Element::new("div", "Iron Axe\nAxe\nEquipment Attack\n980\nHP\n12%"),
                Element::new("footer", "About\nPrivacy\nContact"),
            ]),
        };
        let BuildOutcome::Built { record, .. } = builder().build_weapons(&d) else {
            panic!("expected weapons");
        };
        assert_eq!(record.len(), 2);
        let oak = &record[0];
        assert_eq!(oak.id, weapon_id("Oak Staff", "Staff"));
        assert_eq!(oak.image_url.as_deref(), Some("https://cdn.genshin.gg/oak.png"));
        assert_eq!(oak.equipment_attack, Some(1250));
        assert_eq!(oak.passive_text, "Heals on hit.");
        assert_eq!(record[1].substat_name.as_deref(), Some("HP"));
        assert!(record[1].image_url.is_none());
    }

    #[test]
    fn empty_weapons_page_is_skipped() {
        let d = doc(vec![Element::new("p", "maintenance")]);
        assert_eq!(
            builder().build_weapons(&d),
            BuildOutcome::Skipped(SkipReason::NoRecords("weapon"))
        );
    }
}
