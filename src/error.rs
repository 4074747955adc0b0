use std::path::PathBuf;

use thiserror::Error;

/// Why a single source document produced no record.
///
/// Skips are recovered by the batch driver and end up in run meta; they never
/// abort a build.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("page has no usable title")]
    MissingTitle,
    #[error("no {0} records found on page")]
    NoRecords(&'static str),
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot io at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("snapshot {id} is not valid json: {source}")]
    Json {
        id: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("snapshot {0} not found")]
    Missing(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),
}
