use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::parser::lines::clean_lines;

/// One element of a page flattened to document order. `text` is the
/// element's own visible text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub tag: String,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
    #[serde(default)]
    pub text: String,
}

impl Element {
    pub fn new(tag: &str, text: &str) -> Self {
        Element {
            tag: tag.to_string(),
            attrs: BTreeMap::new(),
            text: text.to_string(),
        }
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn text(&self) -> &str {
        self.text.trim()
    }

    fn is_heading(&self) -> bool {
        self.tag == "h2" || self.tag == "h3"
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub elements: Vec<Element>,
}

impl Page {
    pub fn new(elements: Vec<Element>) -> Self {
        Page { elements }
    }

    pub fn find(&self, tag: &str) -> Option<&Element> {
        self.elements.iter().find(|e| e.tag == tag)
    }

    pub fn find_all<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.elements.iter().filter(move |e| e.tag == tag)
    }

    /// Elements following the first `tag` element, or nothing if it is absent.
    pub fn after(&self, tag: &str) -> &[Element] {
        match self.elements.iter().position(|e| e.tag == tag) {
            Some(i) => &self.elements[i + 1..],
            None => &[],
        }
    }

    /// All visible text as cleaned lines.
    pub fn lines(&self) -> Vec<String> {
        self.elements
            .iter()
            .flat_map(|e| clean_lines(&e.text))
            .collect()
    }

    /// Text of the `p`/`li`/`div` elements under the first `h2`/`h3` whose
    /// text starts with `prefix`, up to the next such heading.
    pub fn section_lines(&self, prefix: &str) -> Vec<String> {
        let Some(start) = self
            .elements
            .iter()
            .position(|e| e.is_heading() && e.text().starts_with(prefix))
        else {
            return Vec::new();
        };
        self.elements[start + 1..]
            .iter()
            .take_while(|e| !e.is_heading())
            .filter(|e| matches!(e.tag.as_str(), "p" | "li" | "div"))
            .flat_map(|e| clean_lines(&e.text))
            .collect()
    }
}

/// A page as delivered by the retrieval side, plus what it was fetched as.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityDocument {
    pub name: String,
    pub locator: String,
    #[serde(flatten)]
    pub page: Page,
}

/// Every document retrieved from one source in one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Capture {
    pub source: String,
    #[serde(default)]
    pub characters: Vec<EntityDocument>,
    #[serde(default)]
    pub weapons: Vec<EntityDocument>,
}

impl Capture {
    pub fn load(path: &Path) -> Result<Capture> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read capture {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Capture {} is not valid json", path.display()))
    }
}

/// Resolve a page-relative URL against a site base.
pub fn absolutize(base: &str, url: &str) -> String {
    if url.is_empty() || url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else if let Some(rest) = url.strip_prefix("//") {
        format!("https://{}", rest)
    } else if url.starts_with('/') {
        format!("{}{}", base.trim_end_matches('/'), url)
    } else {
        url.to_string()
    }
}
