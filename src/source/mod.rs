pub mod types;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use parking_lot::RwLock;

use self::types::RawItem;

/// The submission store: yields the raw rows of one item set (issue).
/// Lookups may fail; the request handler degrades to a fallback ordering.
pub trait ItemSource: Send + Sync {
    fn load(&self, item_set_id: &str) -> Result<Vec<RawItem>>;
}

/// Item sets held in memory, replaceable at runtime.
#[derive(Default)]
pub struct MemorySource {
    sets: RwLock<HashMap<String, Vec<RawItem>>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an item set. Returns the previous rows, if any.
    pub fn insert(
        &self,
        item_set_id: impl Into<String>,
        rows: Vec<RawItem>,
    ) -> Option<Vec<RawItem>> {
        self.sets.write().insert(item_set_id.into(), rows)
    }

    pub fn remove(&self, item_set_id: &str) -> Option<Vec<RawItem>> {
        self.sets.write().remove(item_set_id)
    }
}

impl ItemSource for MemorySource {
    fn load(&self, item_set_id: &str) -> Result<Vec<RawItem>> {
        self.sets
            .read()
            .get(item_set_id)
            .cloned()
            .with_context(|| format!("unknown item set '{}'", item_set_id))
    }
}

/// Item sets stored as `<root>/<item_set_id>.json`, each a JSON array of rows.
pub struct JsonDirSource {
    root: PathBuf,
}

impl JsonDirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, item_set_id: &str) -> Result<PathBuf> {
        // ids are file stems, never paths
        if item_set_id.is_empty()
            || item_set_id.contains(['/', '\\'])
            || item_set_id.starts_with('.')
        {
            anyhow::bail!("invalid item set id '{}'", item_set_id);
        }
        Ok(self.root.join(format!("{}.json", item_set_id)))
    }
}

impl ItemSource for JsonDirSource {
    fn load(&self, item_set_id: &str) -> Result<Vec<RawItem>> {
        let path = self.path_for(item_set_id)?;
        load_item_file(&path)
    }
}

/// Read one item-set file.
pub fn load_item_file(path: &Path) -> Result<Vec<RawItem>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read item set {}", path.display()))?;
    let rows: Vec<RawItem> = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse item set {}", path.display()))?;
    tracing::debug!("Loaded {} rows from {}", rows.len(), path.display());
    Ok(rows)
}
