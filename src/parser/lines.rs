use std::sync::LazyLock;

use regex::Regex;

use super::vocab::{SkillCategory, Vocabulary};

static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Split rendered page text into trimmed, whitespace-collapsed, non-empty lines.
pub fn clean_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| WS_RE.replace_all(l, " ").into_owned())
        .collect()
}

/// Role of one line inside a skill section.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineKind<'a> {
    /// A skill category label; starts a record.
    Anchor(SkillCategory),
    /// An input binding token ("Left Click", "E", ...).
    Binding(&'a str),
    /// The line naming the next anchor's record.
    Name(&'a str),
    Body(&'a str),
}

/// Tag every line of a skill section.
///
/// Anchors and bindings come straight from the vocabulary. The nearest line
/// before an anchor (skipping bindings, never crossing another anchor) is that
/// anchor's name; everything else is body text.
pub fn classify_skill_lines<'a>(lines: &'a [String], vocab: &Vocabulary) -> Vec<LineKind<'a>> {
    let mut kinds: Vec<LineKind<'a>> = lines
        .iter()
        .map(|line| {
            if let Some(cat) = vocab.category(line) {
                LineKind::Anchor(cat)
            } else if vocab.is_binding(line) {
                LineKind::Binding(line)
            } else {
                LineKind::Body(line)
            }
        })
        .collect();

    for j in 0..kinds.len() {
        if !matches!(kinds[j], LineKind::Anchor(_)) {
            continue;
        }
        for k in (0..j).rev() {
            match kinds[k] {
                LineKind::Binding(_) => continue,
                LineKind::Body(text) => {
                    kinds[k] = LineKind::Name(text);
                    break;
                }
                _ => break,
            }
        }
    }

    kinds
}

/// Lines after a line equal (case-insensitively) to `title`, up to the first stop title.
pub fn section_between<'a>(lines: &'a [String], title: &str, stops: &[&str]) -> &'a [String] {
    let Some(start) = lines.iter().position(|l| l.eq_ignore_ascii_case(title)) else {
        return &[];
    };
    let rest = &lines[start + 1..];
    let end = rest
        .iter()
        .position(|l| stops.iter().any(|s| l.eq_ignore_ascii_case(s)))
        .unwrap_or(rest.len());
    &rest[..end]
}

/// Lines between the last start marker seen and the first end marker after it.
///
/// Navigation blocks often repeat the start marker, so a later start marker
/// restarts the section. `None` when no start marker exists.
pub fn slice_section<'a>(
    lines: &'a [String],
    is_start: impl Fn(&str) -> bool,
    is_end: impl Fn(&str) -> bool,
) -> Option<&'a [String]> {
    let mut start = None;
    for (i, line) in lines.iter().enumerate() {
        if is_start(line) {
            start = Some(i + 1);
            continue;
        }
        if let Some(s) = start {
            if is_end(line) {
                return Some(&lines[s..i]);
            }
        }
    }
    start.map(|s| &lines[s..])
}
