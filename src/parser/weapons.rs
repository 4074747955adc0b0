use super::vocab::Vocabulary;

const ATTACK_LABEL: &str = "Equipment Attack";
const ENTRY_WINDOW: usize = 30;

/// One weapon as laid out on a list page.
#[derive(Debug, Clone, PartialEq)]
pub struct WeaponBlock {
    pub name: String,
    pub weapon_type: String,
    pub passive: String,
    pub attack: Option<u32>,
    pub substat_name: Option<String>,
    pub substat_value: Option<f64>,
}

/// Scan a weapons list page.
///
/// An entry starts at a line followed by a weapon-type line, provided the
/// attack label shows up within the next few lines:
/// `name, type, passive, ..., Equipment Attack, <atk>, <substat>, <value>`.
pub fn scan_weapon_list(lines: &[String], vocab: &Vocabulary) -> Vec<WeaponBlock> {
    let mut blocks = Vec::new();
    let mut i = 0;
    while i + 8 < lines.len() {
        if !vocab.is_weapon_type(&lines[i + 1]) {
            i += 1;
            continue;
        }
        let window_end = (i + ENTRY_WINDOW).min(lines.len());
        let Some(ea) = lines[i..window_end].iter().position(|l| l == ATTACK_LABEL) else {
            i += 1;
            continue;
        };

        let passive = match lines.get(i + 2) {
            Some(l) if l != ATTACK_LABEL => l.clone(),
            _ => String::new(),
        };
        blocks.push(WeaponBlock {
            name: lines[i].clone(),
            weapon_type: lines[i + 1].clone(),
            passive,
            attack: lines.get(i + ea + 1).and_then(|l| parse_digits(l)),
            substat_name: lines.get(i + ea + 2).cloned(),
            substat_value: lines.get(i + ea + 3).and_then(|l| parse_number(l)),
        });
        i = (i + 1).max(i + ea + 4);
    }
    blocks
}

/// Figures printed after a "Weapon Statistics" heading:
/// `<atk>, Attack, <substat value>, <substat name>`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeaponStats {
    pub attack: Option<u32>,
    pub substat_value: Option<f64>,
    pub substat_name: Option<String>,
}

pub fn weapon_statistics(lines: &[String]) -> WeaponStats {
    let Some(idx) = lines.iter().position(|l| l == "Weapon Statistics") else {
        return WeaponStats::default();
    };
    WeaponStats {
        attack: lines
            .get(idx + 1)
            .and_then(|l| parse_number(l))
            .filter(|v| *v >= 0.0)
            .map(|v| v as u32),
        substat_value: lines.get(idx + 3).and_then(|l| parse_number(l)),
        substat_name: lines.get(idx + 4).cloned(),
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuickInfo {
    pub weapon_type: Option<String>,
    pub rarity: Option<u8>,
}

/// `Type` / `Rarity` label-value pairs within the "Quick Information" box.
pub fn quick_information(lines: &[String], vocab: &Vocabulary) -> QuickInfo {
    let mut info = QuickInfo::default();
    let Some(start) = lines.iter().position(|l| l == "Quick Information") else {
        return info;
    };
    let end = (start + 30).min(lines.len());
    for k in start..end {
        let Some(value) = lines.get(k + 1) else {
            break;
        };
        match lines[k].as_str() {
            "Rarity" => {
                info.rarity = parse_number(value)
                    .filter(|v| *v >= 1.0 && *v <= u8::MAX as f64)
                    .map(|v| v as u8);
            }
            "Type" if vocab.is_weapon_type(value) => info.weapon_type = Some(value.clone()),
            _ => {}
        }
    }
    info
}

/// Lenient number parse: drops everything but digits, `.` and `-`.
pub fn parse_number(s: &str) -> Option<f64> {
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse().ok()
}

fn parse_digits(s: &str) -> Option<u32> {
    let digits: String = s.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn list_page_entries() {
        let lines = owned(&[
            "Weapons", "Oak Staff", "Staff", "Heals on hit.", "Equipment Attack", "1,250",
            "Crit Rate", "5.5%", "Iron Axe", "Axe", "Equipment Attack", "980", "HP", "12%",
            "footer", "more footer", "copyright",
        ]);
        let blocks = scan_weapon_list(&lines, &Vocabulary::default());
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].name, "Oak Staff");
        assert_eq!(blocks[0].attack, Some(1250));
        assert_eq!(blocks[0].passive, "Heals on hit.");
        assert_eq!(blocks[0].substat_name.as_deref(), Some("Crit Rate"));
        assert_eq!(blocks[0].substat_value, Some(5.5));
        assert_eq!(blocks[1].name, "Iron Axe");
        assert_eq!(blocks[1].passive, "");
        assert_eq!(blocks[1].substat_value, Some(12.0));
    }

    #[test]
    fn type_without_attack_label_is_not_an_entry() {
        let lines = owned(&["Intro", "Axe", "a", "b", "c", "d", "e", "f", "g", "h"]);
        assert!(scan_weapon_list(&lines, &Vocabulary::default()).is_empty());
    }

    #[test]
    fn statistics_block() {
        let lines = owned(&["Weapon Statistics", "845", "Attack", "7.5%", "Crit Damage"]);
        let s = weapon_statistics(&lines);
        assert_eq!(s.attack, Some(845));
        assert_eq!(s.substat_value, Some(7.5));
        assert_eq!(s.substat_name.as_deref(), Some("Crit Damage"));
        assert_eq!(weapon_statistics(&owned(&["x"])), WeaponStats::default());
    }

    #[test]
    fn quick_info() {
        let lines = owned(&["Quick Information", "Type", "Lance", "Rarity", "5 stars", "Attack", "800"]);
        let q = quick_information(&lines, &Vocabulary::default());
        assert_eq!(q.weapon_type.as_deref(), Some("Lance"));
        assert_eq!(q.rarity, Some(5));
    }

    #[test]
    fn numbers() {
        assert_eq!(parse_number("12.5%"), Some(12.5));
        assert_eq!(parse_number("n/a"), None);
        assert_eq!(parse_number("1.2.3"), None);
    }
}
