pub mod classify;
pub mod set;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use self::set::{Item, ItemId, ItemSet};
use crate::source::types::RawItem;

/// Why a raw row was kept out of the item set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum ExclusionReason {
    /// Neither an aspect ratio nor stored dimensions were available
    MissingAspectRatio,
    /// Zero, negative or non-finite ratio
    InvalidAspectRatio { value: f64 },
    /// The id was already taken by an earlier row
    DuplicateId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcludedItem {
    pub id: ItemId,
    pub reason: ExclusionReason,
}

/// A validated item set plus the rows that could not be laid out.
#[derive(Debug, Clone)]
pub struct BuiltItemSet {
    pub set: ItemSet,
    pub excluded: Vec<ExcludedItem>,
}

impl BuiltItemSet {
    /// Move every item `check` rejects into the excluded list. The kept items
    /// stay in arrival order and the fingerprint covers only them.
    pub fn exclude_where<F>(&mut self, mut check: F)
    where
        F: FnMut(&Item) -> Option<ExclusionReason>,
    {
        let mut kept = Vec::with_capacity(self.set.len());
        for item in self.set.items() {
            match check(item) {
                Some(reason) => {
                    tracing::warn!("Excluding item {} from layout: {:?}", item.id, reason);
                    self.excluded.push(ExcludedItem {
                        id: item.id.clone(),
                        reason,
                    });
                }
                None => kept.push(item.clone()),
            }
        }
        if kept.len() < self.set.len() {
            self.set = validated(kept);
        }
    }
}

fn validated(items: Vec<Item>) -> ItemSet {
    match ItemSet::new(items) {
        Ok(set) => set,
        Err(e) => {
            // Every item was validated before it got here.
            tracing::error!("Validated items rejected by ItemSet: {}", e);
            ItemSet::empty()
        }
    }
}

/// Build an `ItemSet` from the store's raw rows.
///
/// Rows without a usable aspect ratio and repeated ids are excluded rather than
/// failing the whole set: a missing image degrades one tile, not the grid.
pub fn build_item_set(rows: &[RawItem]) -> BuiltItemSet {
    let mut items = Vec::with_capacity(rows.len());
    let mut excluded = Vec::new();
    let mut seen: HashSet<&ItemId> = HashSet::with_capacity(rows.len());

    for row in rows {
        let outcome = if seen.contains(&row.id) {
            Err(ExclusionReason::DuplicateId)
        } else {
            match row.resolved_ratio() {
                None => Err(ExclusionReason::MissingAspectRatio),
                Some(value) if !(value.is_finite() && value > 0.0) => {
                    Err(ExclusionReason::InvalidAspectRatio { value })
                }
                Some(ratio) => Ok(ratio),
            }
        };

        match outcome {
            Ok(ratio) => {
                seen.insert(&row.id);
                items.push(Item::new(row.id.clone(), ratio));
            }
            Err(reason) => {
                tracing::warn!("Excluding item {} from layout: {:?}", row.id, reason);
                excluded.push(ExcludedItem {
                    id: row.id.clone(),
                    reason,
                });
            }
        }
    }

    let set = validated(items);

    tracing::info!(
        "Built item set {} from {} rows ({} kept, {} excluded)",
        set.fingerprint(),
        rows.len(),
        set.len(),
        excluded.len()
    );

    BuiltItemSet { set, excluded }
}
