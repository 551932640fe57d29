use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use compact_str::CompactString;
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};

use crate::error::{ensure_positive, LayoutError};
use crate::items::classify::{classify, AspectClass, ClassifierConfig};

/// Stable, opaque identifier of one submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub CompactString);

impl ItemId {
    pub fn new(id: impl AsRef<str>) -> Self {
        ItemId(CompactString::new(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        ItemId::new(id)
    }
}

impl From<u64> for ItemId {
    fn from(id: u64) -> Self {
        ItemId(compact_str::format_compact!("{}", id))
    }
}

/// One submission to be laid out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    /// width / height, always finite and > 0 once inside an `ItemSet`
    pub aspect_ratio: f64,
}

impl Item {
    pub fn new(id: impl Into<ItemId>, aspect_ratio: f64) -> Self {
        Item {
            id: id.into(),
            aspect_ratio,
        }
    }

    /// Derived wide/narrow class; never stored.
    pub fn class(&self, config: &ClassifierConfig) -> Result<AspectClass, LayoutError> {
        classify(self.aspect_ratio, config)
    }
}

/// Order-independent identity of a set of item ids, used as the cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(pub String);

impl Fingerprint {
    /// Fingerprint a set of ids. Input order does not matter.
    pub fn of<'a>(ids: impl IntoIterator<Item = &'a ItemId>) -> Self {
        let mut sorted: Vec<&ItemId> = ids.into_iter().collect();
        sorted.sort();

        let mut hasher = FxHasher::default();
        for id in &sorted {
            id.as_str().hash(&mut hasher);
        }
        Fingerprint(format!("fp-{}-{:016x}", sorted.len(), hasher.finish()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The immutable collection of items laid out for one issue.
/// Items keep their arrival order, which is the natural fallback ordering.
#[derive(Debug, Clone)]
pub struct ItemSet {
    items: Vec<Item>,
    fingerprint: Fingerprint,
}

impl ItemSet {
    /// Build a set, rejecting invalid aspect ratios and duplicate ids.
    pub fn new(items: Vec<Item>) -> Result<Self, LayoutError> {
        let mut seen = HashSet::with_capacity(items.len());
        for item in &items {
            ensure_positive("aspect ratio", item.aspect_ratio)?;
            if !seen.insert(&item.id) {
                return Err(LayoutError::DuplicateItem(item.id.clone()));
            }
        }
        let fingerprint = Fingerprint::of(items.iter().map(|item| &item.id));
        Ok(ItemSet { items, fingerprint })
    }

    pub fn empty() -> Self {
        ItemSet {
            items: Vec::new(),
            fingerprint: Fingerprint::of(std::iter::empty()),
        }
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Ids in arrival order.
    pub fn natural_order(&self) -> Vec<ItemId> {
        self.items.iter().map(|item| item.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
