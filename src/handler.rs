use std::collections::HashMap;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::cache::{OrderingCache, SharedIds};
use crate::config::EngineConfig;
use crate::error::LayoutError;
use crate::items::set::{Fingerprint, ItemId, ItemSet};
use crate::items::{build_item_set, BuiltItemSet, ExcludedItem, ExclusionReason};
use crate::layout::skyline::{self, Dimension, PlaceParams, Placement};
use crate::layout::{
    dimensions_for, greedy, prepare_items, rendered_height, ColumnGeometry, ColumnVariant,
    Ordering,
};
use crate::source::ItemSource;

/// Where the returned orderings came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderingSource {
    /// Only the 2-column ordering was computed; the 4-column one is in natural order
    #[serde(rename = "2col")]
    TwoColumn,
    /// The engine computed the 4-column ordering (the normal case)
    #[serde(rename = "4col")]
    FourColumn,
    /// Natural order; empty when the item set could not be loaded
    #[serde(rename = "fallback")]
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderingResponse {
    pub ordered_ids_2col: Vec<ItemId>,
    pub ordered_ids_4col: Vec<ItemId>,
    pub source: OrderingSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<Fingerprint>,
    /// Rows that could not be laid out at all
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded: Vec<ExcludedItem>,
}

impl OrderingResponse {
    fn unavailable() -> Self {
        OrderingResponse {
            ordered_ids_2col: Vec::new(),
            ordered_ids_4col: Vec::new(),
            source: OrderingSource::Fallback,
            fingerprint: None,
            excluded: Vec::new(),
        }
    }

    pub fn ids(&self, variant: ColumnVariant) -> &[ItemId] {
        match variant {
            ColumnVariant::TwoColumn => &self.ordered_ids_2col,
            ColumnVariant::FourColumn => &self.ordered_ids_4col,
        }
    }

    pub fn ordering(&self) -> Ordering {
        Ordering {
            ordered_ids_2col: self.ordered_ids_2col.clone(),
            ordered_ids_4col: self.ordered_ids_4col.clone(),
        }
    }
}

/// An ordering for one grid plus its pixel placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutResponse {
    pub variant: ColumnVariant,
    pub source: OrderingSource,
    pub ordered_ids: Vec<ItemId>,
    pub placement: Placement,
}

/// Order one variant of an item set with the greedy best-fit orderer.
pub fn compute_ordering(
    set: &ItemSet,
    variant: ColumnVariant,
    config: &EngineConfig,
) -> Result<Vec<ItemId>, LayoutError> {
    let items = prepare_items(set, &config.ordering.geometry(variant), &config.classifier)?;
    greedy::order(&items, &config.ordering.order_params(variant))
}

/// Entry point for layout requests: loads an item set from the store, serves
/// both orderings through the cache and never fails past this boundary.
pub struct LayoutRequestHandler<S> {
    source: S,
    cache: OrderingCache,
    config: EngineConfig,
    /// Last fingerprint seen per item set, so membership changes drop stale entries
    fingerprints: DashMap<String, Fingerprint>,
}

impl<S: ItemSource> LayoutRequestHandler<S> {
    pub fn new(source: S, config: EngineConfig) -> Self {
        let cache = OrderingCache::new(&config.cache);
        Self {
            source,
            cache,
            config,
            fingerprints: DashMap::new(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn cache(&self) -> &OrderingCache {
        &self.cache
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Both orderings for an item set. Degrades to natural order on failure.
    pub fn get_ordering(&self, item_set_id: &str) -> OrderingResponse {
        match self.load(item_set_id) {
            Some(built) => self.order_built(built, false),
            None => OrderingResponse::unavailable(),
        }
    }

    /// Like `get_ordering`, but recomputes both variants even when cached.
    pub fn refresh(&self, item_set_id: &str) -> OrderingResponse {
        match self.load(item_set_id) {
            Some(built) => self.order_built(built, true),
            None => OrderingResponse::unavailable(),
        }
    }

    /// Order an item set the caller already holds, bypassing the store.
    pub fn order_set(&self, set: &ItemSet) -> OrderingResponse {
        let (two, four) = rayon::join(
            || self.cached_variant(set, ColumnVariant::TwoColumn, false),
            || self.cached_variant(set, ColumnVariant::FourColumn, false),
        );
        assemble(set, two, four, Vec::new())
    }

    /// Upstream signal that submissions were added to or removed from an item set.
    /// Returns the number of cached orderings dropped.
    pub fn notify_changed(&self, item_set_id: &str) -> usize {
        match self.fingerprints.remove(item_set_id) {
            Some((_, fingerprint)) => {
                let dropped = self.cache.invalidate(&fingerprint);
                tracing::info!(
                    "Item set '{}' changed, dropped {} cached orderings",
                    item_set_id,
                    dropped
                );
                dropped
            }
            None => 0,
        }
    }

    /// Ordering plus placement for one grid. Without live `dimensions`, sizes
    /// are derived from the stored aspect ratios at `geometry`.
    pub fn layout(
        &self,
        item_set_id: &str,
        geometry: &ColumnGeometry,
        dimensions: Option<&HashMap<ItemId, Dimension>>,
    ) -> Result<LayoutResponse, LayoutError> {
        let params = geometry.place_params()?;
        let variant = ColumnVariant::from_column_count(geometry.column_count).unwrap_or(
            if geometry.column_count <= 2 {
                ColumnVariant::TwoColumn
            } else {
                ColumnVariant::FourColumn
            },
        );

        let built = self.load(item_set_id);
        let derived = match (&built, dimensions) {
            (Some(built), None) => dimensions_for(&built.set, geometry, &self.config.classifier)?,
            _ => HashMap::new(),
        };
        let dimensions = dimensions.unwrap_or(&derived);
        let response = match built {
            Some(built) => self.order_built(built, false),
            None => OrderingResponse::unavailable(),
        };

        let ordered_ids = response.ids(variant).to_vec();
        let placement = skyline::place(&ordered_ids, dimensions, &params)?;
        Ok(LayoutResponse {
            variant,
            source: response.source,
            ordered_ids,
            placement,
        })
    }

    fn load(&self, item_set_id: &str) -> Option<BuiltItemSet> {
        let rows = match self.source.load(item_set_id) {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(
                    "Item lookup for '{}' failed, serving fallback ordering: {:#}",
                    item_set_id,
                    e
                );
                return None;
            }
        };

        let mut built = build_item_set(&rows);
        self.exclude_unrenderable(&mut built);
        let fingerprint = built.set.fingerprint().clone();
        let previous = self
            .fingerprints
            .insert(item_set_id.to_string(), fingerprint.clone());
        if let Some(previous) = previous {
            if previous != fingerprint {
                tracing::info!(
                    "Item set '{}' membership changed ({} -> {})",
                    item_set_id,
                    previous,
                    fingerprint
                );
                self.cache.invalidate(&previous);
            }
        }
        Some(built)
    }

    /// Exclude items whose rendered height is not a usable number in either grid.
    fn exclude_unrenderable(&self, built: &mut BuiltItemSet) {
        let grids: Vec<PlaceParams> = ColumnVariant::ALL
            .iter()
            .filter_map(|&variant| self.config.ordering.geometry(variant).place_params().ok())
            .collect();
        let classifier = &self.config.classifier;
        built.exclude_where(|item| {
            let class = item.class(classifier).ok()?;
            grids
                .iter()
                .any(|params| rendered_height(item, class, params).is_err())
                .then_some(ExclusionReason::InvalidAspectRatio {
                    value: item.aspect_ratio,
                })
        });
    }

    fn order_built(&self, built: BuiltItemSet, refresh: bool) -> OrderingResponse {
        let set = &built.set;
        let (two, four) = rayon::join(
            || self.cached_variant(set, ColumnVariant::TwoColumn, refresh),
            || self.cached_variant(set, ColumnVariant::FourColumn, refresh),
        );
        assemble(set, two, four, built.excluded)
    }

    fn cached_variant(
        &self,
        set: &ItemSet,
        variant: ColumnVariant,
        refresh: bool,
    ) -> Result<SharedIds, LayoutError> {
        let compute = || compute_ordering(set, variant, &self.config);
        if refresh {
            self.cache.refresh(set.fingerprint(), variant, compute)
        } else {
            self.cache.get_or_compute(set.fingerprint(), variant, compute)
        }
    }
}

fn assemble(
    set: &ItemSet,
    two: Result<SharedIds, LayoutError>,
    four: Result<SharedIds, LayoutError>,
    excluded: Vec<ExcludedItem>,
) -> OrderingResponse {
    let source = match (&two, &four) {
        (_, Ok(_)) => OrderingSource::FourColumn,
        (Ok(_), Err(_)) => OrderingSource::TwoColumn,
        (Err(_), Err(_)) => OrderingSource::Fallback,
    };

    let natural = Ordering::natural(set);
    let resolve = |result: Result<SharedIds, LayoutError>, variant: ColumnVariant| match result {
        Ok(ids) => ids.to_vec(),
        Err(e) => {
            tracing::warn!(
                "Ordering {} for {} failed, using natural order: {}",
                variant,
                set.fingerprint(),
                e
            );
            natural.for_variant(variant).to_vec()
        }
    };
    let ordered_ids_2col = resolve(two, ColumnVariant::TwoColumn);
    let ordered_ids_4col = resolve(four, ColumnVariant::FourColumn);

    tracing::info!(
        "Ordered item set {} ({} items, source {:?})",
        set.fingerprint(),
        set.len(),
        source
    );

    OrderingResponse {
        ordered_ids_2col,
        ordered_ids_4col,
        source,
        fingerprint: Some(set.fingerprint().clone()),
        excluded,
    }
}
