use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::SnapshotError;
use crate::model::Module;

pub type SnapshotId = String;

const PREFIX: &str = "db_";
const EXTENSION: &str = "json";

/// Ids present only in the newer snapshot, only in the older one, and in
/// both with different content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diff {
    pub added: BTreeMap<Module, BTreeSet<String>>,
    pub removed: BTreeMap<Module, BTreeSet<String>>,
    pub changed: BTreeMap<Module, BTreeSet<String>>,
}

impl Diff {
    pub fn is_empty(&self) -> bool {
        [&self.added, &self.removed, &self.changed]
            .iter()
            .all(|m| m.values().all(BTreeSet::is_empty))
    }
}

/// Compare two normalized datasets module by module.
pub fn diff(older: &Value, newer: &Value) -> Diff {
    let mut out = Diff::default();
    for module in Module::DIFFED {
        let a = module_records(older, module);
        let b = module_records(newer, module);
        let added = b.keys().filter(|k| !a.contains_key(*k)).cloned().collect();
        let removed = a.keys().filter(|k| !b.contains_key(*k)).cloned().collect();
        let changed = a
            .iter()
            .filter_map(|(id, old)| {
                let new = b.get(id)?;
                (canonical(old) != canonical(new)).then(|| id.clone())
            })
            .collect();
        out.added.insert(module, added);
        out.removed.insert(module, removed);
        out.changed.insert(module, changed);
    }
    out
}

fn module_records(dataset: &Value, module: Module) -> Map<String, Value> {
    dataset
        .get("modules")
        .and_then(|m| m.get(module.key()))
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

/// `serde_json` objects are key-sorted, so this is stable.
fn canonical(v: &Value) -> String {
    v.to_string()
}

/// `db_20260301T120000Z`, or `db_20260301T120000Z_001` if that id is taken.
pub fn snapshot_id(at: DateTime<Utc>, taken: impl Fn(&str) -> bool) -> SnapshotId {
    let base = format!("{}{}", PREFIX, at.format("%Y%m%dT%H%M%SZ"));
    if !taken(&base) {
        return base;
    }
    (1..)
        .map(|n| format!("{}_{:03}", base, n))
        .find(|id| !taken(id))
        .unwrap_or(base)
}

/// Immutable, time-named copies of the normalized dataset.
///
/// `list` is oldest first; ids sort lexicographically in age order.
pub trait SnapshotStore {
    fn write(&mut self, at: DateTime<Utc>, dataset: &Value) -> Result<SnapshotId, SnapshotError>;

    fn list(&self) -> Result<Vec<SnapshotId>, SnapshotError>;

    fn load(&self, id: &str) -> Result<Value, SnapshotError>;

    fn remove(&mut self, id: &str) -> Result<(), SnapshotError>;

    /// Keep the newest `limit` snapshots. Returns the ids removed.
    fn retain(&mut self, limit: usize) -> Result<Vec<SnapshotId>, SnapshotError> {
        let ids = self.list()?;
        let excess = ids.len().saturating_sub(limit);
        let doomed: Vec<SnapshotId> = ids.into_iter().take(excess).collect();
        for id in &doomed {
            self.remove(id)?;
        }
        if !doomed.is_empty() {
            debug!(removed = doomed.len(), limit, "pruned snapshots");
        }
        Ok(doomed)
    }

    /// Diff of the two newest snapshots; empty with fewer than two.
    fn latest_diff(&self) -> Result<Diff, SnapshotError> {
        let ids = self.list()?;
        let [.., older, newer] = ids.as_slice() else {
            return Ok(Diff::default());
        };
        Ok(diff(&self.load(older)?, &self.load(newer)?))
    }
}

/// Snapshots as pretty JSON files in one directory.
pub struct DirStore {
    dir: PathBuf,
}

impl DirStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DirStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", id, EXTENSION))
    }

    fn io(&self, path: &Path, source: std::io::Error) -> SnapshotError {
        SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl SnapshotStore for DirStore {
    fn write(&mut self, at: DateTime<Utc>, dataset: &Value) -> Result<SnapshotId, SnapshotError> {
        fs::create_dir_all(&self.dir).map_err(|e| self.io(&self.dir, e))?;
        let id = snapshot_id(at, |candidate| self.path(candidate).exists());
        let body = serde_json::to_string_pretty(dataset).map_err(|source| SnapshotError::Json {
            id: id.clone(),
            source,
        })?;
        let path = self.path(&id);
        fs::write(&path, body).map_err(|e| self.io(&path, e))?;
        info!(snapshot = %id, "wrote snapshot");
        Ok(id)
    }

    fn list(&self) -> Result<Vec<SnapshotId>, SnapshotError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&self.dir).map_err(|e| self.io(&self.dir, e))?;
        let mut ids = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| self.io(&self.dir, e))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if stem.starts_with(PREFIX) {
                    ids.push(stem.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn load(&self, id: &str) -> Result<Value, SnapshotError> {
        let path = self.path(id);
        if !path.exists() {
            return Err(SnapshotError::Missing(id.to_string()));
        }
        let raw = fs::read_to_string(&path).map_err(|e| self.io(&path, e))?;
        serde_json::from_str(&raw).map_err(|source| SnapshotError::Json {
            id: id.to_string(),
            source,
        })
    }

    fn remove(&mut self, id: &str) -> Result<(), SnapshotError> {
        let path = self.path(id);
        fs::remove_file(&path).map_err(|e| self.io(&path, e))
    }
}

/// In-memory store, for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshots: BTreeMap<SnapshotId, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemoryStore {
    fn write(&mut self, at: DateTime<Utc>, dataset: &Value) -> Result<SnapshotId, SnapshotError> {
        let id = snapshot_id(at, |candidate| self.snapshots.contains_key(candidate));
        self.snapshots.insert(id.clone(), dataset.clone());
        Ok(id)
    }

    fn list(&self) -> Result<Vec<SnapshotId>, SnapshotError> {
        Ok(self.snapshots.keys().cloned().collect())
    }

    fn load(&self, id: &str) -> Result<Value, SnapshotError> {
        self.snapshots
            .get(id)
            .cloned()
            .ok_or_else(|| SnapshotError::Missing(id.to_string()))
    }

    fn remove(&mut self, id: &str) -> Result<(), SnapshotError> {
        self.snapshots
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| SnapshotError::Missing(id.to_string()))
    }
}
