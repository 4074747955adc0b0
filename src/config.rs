use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::ConfigError;
use crate::parser::vocab::{Vocabulary, BINDINGS, WEAPON_TYPES};

pub const SETTINGS_FILE: &str = "sdso_db.toml";
const ENV_PREFIX: &str = "SDSO_DB";

pub const PRIMARY_SOURCE: &str = "genshin";
pub const SECONDARY_SOURCE: &str = "7dsorigin";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SourceSettings {
    pub name: String,
    pub base_url: String,
}

/// Which source wins when both describe the same thing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Precedence {
    /// Wins duplicate skills and potential tiers.
    pub collections: Option<String>,
    /// Wins scalar conflicts. Unset keeps the first writer.
    pub scalars: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct VocabSettings {
    pub weapon_types: Option<Vec<String>>,
    pub bindings: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub captures_dir: PathBuf,
    pub snapshot_limit: usize,
    pub primary: SourceSettings,
    pub secondary: SourceSettings,
    #[serde(default)]
    pub precedence: Precedence,
    #[serde(default)]
    pub vocab: VocabSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            data_dir: PathBuf::from("data"),
            captures_dir: PathBuf::from("captures"),
            snapshot_limit: 30,
            primary: SourceSettings {
                name: PRIMARY_SOURCE.into(),
                base_url: "https://genshin.gg".into(),
            },
            secondary: SourceSettings {
                name: SECONDARY_SOURCE.into(),
                base_url: "https://7dsorigin.gg".into(),
            },
            precedence: Precedence {
                collections: Some(SECONDARY_SOURCE.into()),
                scalars: None,
            },
            vocab: VocabSettings::default(),
        }
    }
}

impl Settings {
    /// Defaults, then `sdso_db.toml` if present, then `SDSO_DB_*` variables
    /// (`SDSO_DB_PRIMARY__BASE_URL=...`).
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Path::new(SETTINGS_FILE))
    }

    pub fn load_from(file: &Path) -> Result<Self, ConfigError> {
        let d = Settings::default();
        let settings = Config::builder()
            .set_default("data_dir", "data")?
            .set_default("captures_dir", "captures")?
            .set_default("snapshot_limit", d.snapshot_limit as u64)?
            .set_default("primary.name", d.primary.name)?
            .set_default("primary.base_url", d.primary.base_url)?
            .set_default("secondary.name", d.secondary.name)?
            .set_default("secondary.base_url", d.secondary.base_url)?
            .set_default("precedence.collections", SECONDARY_SOURCE)?
            .add_source(File::from(file).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("vocab.weapon_types")
                    .with_list_parse_key("vocab.bindings"),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    pub fn vocabulary(&self) -> Vocabulary {
        let weapon_types = match &self.vocab.weapon_types {
            Some(list) => list.clone(),
            None => WEAPON_TYPES.iter().map(|s| s.to_string()).collect(),
        };
        let bindings = match &self.vocab.bindings {
            Some(list) => list.clone(),
            None => BINDINGS.iter().map(|s| s.to_string()).collect(),
        };
        Vocabulary::new(weapon_types, bindings)
    }

    pub fn capture_path(&self, source: &str) -> PathBuf {
        self.captures_dir.join(format!("{}.json", source))
    }

    pub fn snapshot_dir(&self) -> PathBuf {
        self.data_dir.join("db_snapshots")
    }
}
