use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{ensure_positive, LayoutError};
use crate::items::set::ItemId;

/// Per-column running heights (the "skyline") of a masonry grid.
///
/// Heights only ever grow while one set of items is being placed. Both the
/// orderer and the placer walk the grid through this type, so the projected
/// heights the orderer optimizes are exactly the ones the placer produces.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnState {
    heights: Vec<f64>,
}

impl ColumnState {
    pub fn new(column_count: usize) -> Self {
        Self {
            heights: vec![0.0; column_count],
        }
    }

    pub fn heights(&self) -> &[f64] {
        &self.heights
    }

    pub fn column_count(&self) -> usize {
        self.heights.len()
    }

    pub fn max_height(&self) -> f64 {
        self.heights.iter().copied().fold(0.0, f64::max)
    }

    /// Shortest column, leftmost on ties.
    pub fn lowest_column(&self) -> usize {
        let mut best = 0;
        for (c, &h) in self.heights.iter().enumerate().skip(1) {
            if h < self.heights[best] {
                best = c;
            }
        }
        best
    }

    /// Left column of the adjacent pair whose top edge `max(h[c], h[c+1])` is lowest.
    /// Leftmost on ties; `None` with fewer than two columns.
    pub fn best_pair(&self) -> Option<usize> {
        self.heights
            .windows(2)
            .enumerate()
            .fold(None, |best: Option<(usize, f64)>, (c, pair)| {
                let top = pair[0].max(pair[1]);
                match best {
                    Some((_, best_top)) if best_top <= top => best,
                    _ => Some((c, top)),
                }
            })
            .map(|(c, _)| c)
    }

    /// Where an item covering `span` columns would land: `(first column, y)`.
    /// A span of two falls back to one column when the grid has a single column.
    pub fn slot(&self, span: usize) -> (usize, f64) {
        if span >= 2 {
            if let Some(c) = self.best_pair() {
                return (c, self.heights[c].max(self.heights[c + 1]));
            }
        }
        let c = self.lowest_column();
        (c, self.heights[c])
    }

    /// Occupy `span` columns starting at `column` with an item of `height`,
    /// followed by `gap`. Returns the item's y coordinate.
    pub fn place(&mut self, column: usize, span: usize, height: f64, gap: f64) -> f64 {
        let end = (column + span).min(self.heights.len());
        let y = self.heights[column..end].iter().copied().fold(0.0, f64::max);
        let bottom = y + height + gap;
        for h in &mut self.heights[column..end] {
            debug_assert!(bottom >= *h, "column heights must never shrink");
            *h = bottom;
        }
        y
    }

    /// Tallest column without the trailing gap, never negative.
    pub fn container_height(&self, gap: f64) -> f64 {
        (self.max_height() - gap).max(0.0)
    }
}

/// Live rendered size of one item for the current viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dimension {
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub is_wide: bool,
}

/// Grid geometry for one placement run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceParams {
    pub column_count: usize,
    pub column_width: f64,
    pub gap: f64,
}

impl PlaceParams {
    fn validate(&self) -> Result<(), LayoutError> {
        if self.column_count == 0 {
            return Err(LayoutError::UnsupportedColumnCount(0));
        }
        ensure_positive("column width", self.column_width)?;
        if !self.gap.is_finite() || self.gap < 0.0 {
            return Err(LayoutError::invalid("gap", self.gap));
        }
        Ok(())
    }

    /// Left edge of column `c`.
    pub fn column_x(&self, c: usize) -> f64 {
        c as f64 * (self.column_width + self.gap)
    }

    /// Width of an item covering `span` columns, inner gaps included.
    pub fn span_width(&self, span: usize) -> f64 {
        span as f64 * self.column_width + span.saturating_sub(1) as f64 * self.gap
    }
}

/// A placed item in absolute container coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutItem {
    pub id: ItemId,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub spans_columns: u8,
}

impl LayoutItem {
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
    MissingDimension,
    InvalidDimension,
    DuplicateId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedItem {
    pub id: ItemId,
    pub reason: SkipReason,
}

/// Result of one placement run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub layout_items: Vec<LayoutItem>,
    pub container_height: f64,
    /// Ids from the ordering that were not placed
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedItem>,
}

/// Everything the placer needs, as one boundary value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementRequest {
    pub ordered_ids: Vec<ItemId>,
    pub dimensions: HashMap<ItemId, Dimension>,
    #[serde(flatten)]
    pub params: PlaceParams,
}

impl PlacementRequest {
    pub fn place(&self) -> Result<Placement, LayoutError> {
        place(&self.ordered_ids, &self.dimensions, &self.params)
    }
}

/// Place items in the given order onto the lowest column (or adjacent column
/// pair for wide items). The order is taken as is, never re-optimized.
///
/// Ids without a usable entry in `dimensions` are skipped, so a partially
/// loaded grid still renders; only invalid grid geometry is an error.
pub fn place(
    ordered_ids: &[ItemId],
    dimensions: &HashMap<ItemId, Dimension>,
    params: &PlaceParams,
) -> Result<Placement, LayoutError> {
    params.validate()?;

    let mut columns = ColumnState::new(params.column_count);
    let mut layout_items = Vec::with_capacity(ordered_ids.len());
    let mut skipped = Vec::new();
    let mut placed: HashSet<&ItemId> = HashSet::with_capacity(ordered_ids.len());

    for id in ordered_ids {
        let checked = match dimensions.get(id) {
            _ if placed.contains(id) => Err(SkipReason::DuplicateId),
            None => Err(SkipReason::MissingDimension),
            Some(dim) if !usable(dim) => Err(SkipReason::InvalidDimension),
            Some(dim) => Ok(*dim),
        };
        let dim = match checked {
            Ok(dim) => dim,
            Err(reason) => {
                if reason == SkipReason::MissingDimension {
                    let missing = LayoutError::MissingDimension(id.clone());
                    tracing::warn!("{}; skipping until it is measured", missing);
                } else {
                    tracing::warn!("Skipping item {} during placement: {:?}", id, reason);
                }
                skipped.push(SkippedItem {
                    id: id.clone(),
                    reason,
                });
                continue;
            }
        };

        let span = if dim.is_wide && params.column_count >= 2 { 2 } else { 1 };
        let (column, _) = columns.slot(span);
        let y = columns.place(column, span, dim.height, params.gap);

        placed.insert(id);
        layout_items.push(LayoutItem {
            id: id.clone(),
            x: params.column_x(column),
            y,
            width: params.span_width(span),
            height: dim.height,
            spans_columns: span as u8,
        });
    }

    let container_height = columns.container_height(params.gap);
    tracing::debug!(
        "Placed {} of {} items in {} columns, container height {:.1}",
        layout_items.len(),
        ordered_ids.len(),
        params.column_count,
        container_height
    );

    Ok(Placement {
        layout_items,
        container_height,
        skipped,
    })
}

fn usable(dim: &Dimension) -> bool {
    ensure_positive("width", dim.width).is_ok() && ensure_positive("height", dim.height).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn dim(width: f64, height: f64, is_wide: bool) -> Dimension {
        Dimension {
            width,
            height,
            is_wide,
        }
    }

    fn ids(raw: &[u64]) -> Vec<ItemId> {
        raw.iter().copied().map(ItemId::from).collect()
    }

    fn two_columns() -> PlaceParams {
        PlaceParams {
            column_count: 2,
            column_width: 300.0,
            gap: 20.0,
        }
    }

    fn example_dimensions() -> HashMap<ItemId, Dimension> {
        HashMap::from([
            (ItemId::from(1u64), dim(300.0, 200.0, false)),
            (ItemId::from(2u64), dim(620.0, 180.0, true)),
            (ItemId::from(3u64), dim(300.0, 400.0, false)),
        ])
    }

    #[test]
    fn wide_item_spans_both_columns_below_the_tallest() {
        let placement = place(&ids(&[1, 2, 3]), &example_dimensions(), &two_columns()).unwrap();
        let items = &placement.layout_items;
        assert_eq!(items.len(), 3);

        assert_eq!((items[0].x, items[0].y), (0.0, 0.0));
        assert_eq!(items[0].spans_columns, 1);

        assert_eq!((items[1].x, items[1].y), (0.0, 220.0));
        assert_eq!(items[1].width, 620.0);
        assert_eq!(items[1].spans_columns, 2);

        // both columns sit at 420 after the wide item; leftmost wins
        assert_eq!((items[2].x, items[2].y), (0.0, 420.0));
        assert_eq!(placement.container_height, 820.0);
        assert!(placement.skipped.is_empty());
    }

    #[test]
    fn missing_dimensions_are_skipped_not_fatal() {
        let mut dims = example_dimensions();
        dims.remove(&ItemId::from(3u64));
        let placement = place(&ids(&[1, 2, 3]), &dims, &two_columns()).unwrap();

        assert_eq!(placement.layout_items.len(), 2);
        assert_eq!(placement.container_height, 400.0);
        assert_eq!(
            placement.skipped,
            vec![SkippedItem {
                id: ItemId::from(3u64),
                reason: SkipReason::MissingDimension
            }]
        );
    }

    #[test]
    fn invalid_and_duplicate_entries_are_skipped() {
        let mut dims = example_dimensions();
        dims.insert(ItemId::from(4u64), dim(300.0, f64::NAN, false));
        let placement = place(&ids(&[1, 4, 1, 3]), &dims, &two_columns()).unwrap();

        let placed: Vec<_> = placement.layout_items.iter().map(|i| i.id.clone()).collect();
        assert_eq!(placed, ids(&[1, 3]));
        let reasons: Vec<_> = placement.skipped.iter().map(|s| s.reason).collect();
        assert_eq!(reasons, vec![SkipReason::InvalidDimension, SkipReason::DuplicateId]);
    }

    #[test]
    fn empty_ordering_yields_empty_layout() {
        let placement = place(&[], &HashMap::new(), &two_columns()).unwrap();
        assert!(placement.layout_items.is_empty());
        assert_eq!(placement.container_height, 0.0);
    }

    #[test]
    fn narrow_items_fill_the_shortest_column() {
        let dims = HashMap::from([
            (ItemId::from(1u64), dim(300.0, 500.0, false)),
            (ItemId::from(2u64), dim(300.0, 100.0, false)),
            (ItemId::from(3u64), dim(300.0, 100.0, false)),
        ]);
        let placement = place(&ids(&[1, 2, 3]), &dims, &two_columns()).unwrap();
        let xy: Vec<_> = placement.layout_items.iter().map(|i| (i.x, i.y)).collect();
        assert_eq!(xy, vec![(0.0, 0.0), (320.0, 0.0), (320.0, 120.0)]);
        assert_eq!(placement.container_height, 500.0);
    }

    #[test]
    fn wide_items_pick_the_lowest_adjacent_pair() {
        let params = PlaceParams {
            column_count: 4,
            column_width: 100.0,
            gap: 10.0,
        };
        let dims = HashMap::from([
            (ItemId::from(1u64), dim(100.0, 300.0, false)),
            (ItemId::from(2u64), dim(100.0, 50.0, false)),
            (ItemId::from(3u64), dim(100.0, 200.0, false)),
            (ItemId::from(4u64), dim(100.0, 40.0, false)),
            (ItemId::from(5u64), dim(210.0, 80.0, true)),
        ]);
        // heights after 1..4: [310, 60, 210, 50]; pair tops: 310, 210, 210 -> columns 1-2
        let placement = place(&ids(&[1, 2, 3, 4, 5]), &dims, &params).unwrap();
        let wide = &placement.layout_items[4];
        assert_eq!((wide.x, wide.y, wide.width), (110.0, 210.0, 210.0));
    }

    #[test]
    fn single_column_degrades_wide_items() {
        let params = PlaceParams {
            column_count: 1,
            column_width: 300.0,
            gap: 20.0,
        };
        let placement = place(&ids(&[1, 2]), &example_dimensions(), &params).unwrap();
        assert_eq!(placement.layout_items[1].spans_columns, 1);
        assert_eq!(placement.layout_items[1].width, 300.0);
        assert_eq!(placement.layout_items[1].y, 220.0);
    }

    #[test]
    fn bad_geometry_is_rejected() {
        let dims = example_dimensions();
        let zero = PlaceParams {
            column_count: 0,
            ..two_columns()
        };
        assert_eq!(
            place(&ids(&[1]), &dims, &zero),
            Err(LayoutError::UnsupportedColumnCount(0))
        );
        let negative_gap = PlaceParams {
            gap: -1.0,
            ..two_columns()
        };
        assert!(place(&ids(&[1]), &dims, &negative_gap).is_err());
    }

    #[test]
    fn request_deserializes_from_camel_case_json() {
        let request: PlacementRequest = serde_json::from_str(
            r#"{
                "orderedIds": ["1", "2"],
                "dimensions": {
                    "1": {"width": 300, "height": 200},
                    "2": {"width": 620, "height": 180, "isWide": true}
                },
                "columnCount": 2,
                "columnWidth": 300,
                "gap": 20
            }"#,
        )
        .unwrap();
        let placement = request.place().unwrap();
        assert_eq!(placement.container_height, 400.0);
        let json = serde_json::to_value(&placement).unwrap();
        assert!(json.get("skipped").is_none());
        assert_eq!(json["layoutItems"][1]["spansColumns"], 2);
    }

    #[test]
    fn column_state_pairs_and_slots() {
        let mut columns = ColumnState::new(3);
        assert_eq!(columns.best_pair(), Some(0));
        columns.place(0, 1, 100.0, 0.0);
        assert_eq!(columns.best_pair(), Some(1));
        assert_eq!(columns.slot(2), (1, 0.0));
        assert_eq!(columns.slot(1), (1, 0.0));
        assert_eq!(ColumnState::new(1).best_pair(), None);
    }

    fn arb_dimensions() -> impl Strategy<Value = Vec<(f64, bool)>> {
        prop::collection::vec((10.0f64..800.0, prop::bool::weighted(0.3)), 0..40)
    }

    proptest! {
        #[test]
        fn placements_never_overlap_and_heights_never_shrink(
            entries in arb_dimensions(),
            column_count in 1usize..6,
            gap in 0.0f64..30.0,
        ) {
            let params = PlaceParams { column_count, column_width: 200.0, gap };
            let order: Vec<ItemId> = (0..entries.len() as u64).map(ItemId::from).collect();
            let dims: HashMap<ItemId, Dimension> = order
                .iter()
                .zip(&entries)
                .map(|(id, &(height, is_wide))| (id.clone(), dim(200.0, height, is_wide)))
                .collect();

            // replay prefixes through the public API: the container only grows
            let mut previous = 0.0;
            for n in 0..=order.len() {
                let partial = place(&order[..n], &dims, &params).unwrap();
                prop_assert!(partial.container_height >= previous);
                previous = partial.container_height;
            }

            let placement = place(&order, &dims, &params).unwrap();
            prop_assert_eq!(placement.layout_items.len(), order.len());

            let items = &placement.layout_items;
            for (i, a) in items.iter().enumerate() {
                prop_assert!(a.right() <= params.span_width(column_count) + 1e-6);
                prop_assert!(a.bottom() <= placement.container_height + 1e-6);
                for b in &items[i + 1..] {
                    let share_columns = a.x < b.right() && b.x < a.right();
                    let share_rows = a.y < b.bottom() && b.y < a.bottom();
                    prop_assert!(!(share_columns && share_rows), "{:?} overlaps {:?}", a, b);
                }
            }
        }

        #[test]
        fn column_state_is_monotonic(
            steps in prop::collection::vec((1usize..3, 1.0f64..500.0), 0..50),
            column_count in 1usize..6,
        ) {
            let mut columns = ColumnState::new(column_count);
            for (span, height) in steps {
                let before = columns.heights().to_vec();
                let (column, top) = columns.slot(span);
                let y = columns.place(column, span.min(column_count), height, 8.0);
                prop_assert_eq!(y, top);
                for (old, new) in before.iter().zip(columns.heights()) {
                    prop_assert!(new >= old);
                }
            }
        }
    }
}
