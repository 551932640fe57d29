pub mod greedy;
pub mod skyline;

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use self::greedy::OrderItem;
use self::skyline::{Dimension, PlaceParams};
use crate::error::{ensure_positive, LayoutError};
use crate::items::classify::{AspectClass, ClassifierConfig};
use crate::items::set::{Item, ItemId, ItemSet};

/// The two responsive grids the frontend renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ColumnVariant {
    /// Mobile
    #[serde(rename = "2col")]
    TwoColumn,
    /// Desktop
    #[serde(rename = "4col")]
    FourColumn,
}

impl ColumnVariant {
    pub const ALL: [ColumnVariant; 2] = [ColumnVariant::TwoColumn, ColumnVariant::FourColumn];

    pub fn column_count(self) -> usize {
        match self {
            ColumnVariant::TwoColumn => 2,
            ColumnVariant::FourColumn => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ColumnVariant::TwoColumn => "2col",
            ColumnVariant::FourColumn => "4col",
        }
    }

    pub fn from_column_count(column_count: usize) -> Option<Self> {
        match column_count {
            2 => Some(ColumnVariant::TwoColumn),
            4 => Some(ColumnVariant::FourColumn),
            _ => None,
        }
    }
}

impl fmt::Display for ColumnVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Container geometry of one grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnGeometry {
    pub column_count: usize,
    pub container_width: f64,
    pub gap: f64,
}

impl ColumnGeometry {
    pub fn new(column_count: usize, container_width: f64, gap: f64) -> Self {
        Self {
            column_count,
            container_width,
            gap,
        }
    }

    /// `(container_width - (N - 1) * gap) / N`; must leave a positive width.
    pub fn column_width(&self) -> Result<f64, LayoutError> {
        if self.column_count == 0 {
            return Err(LayoutError::UnsupportedColumnCount(0));
        }
        if !self.gap.is_finite() || self.gap < 0.0 {
            return Err(LayoutError::invalid("gap", self.gap));
        }
        let n = self.column_count as f64;
        ensure_positive("column width", (self.container_width - (n - 1.0) * self.gap) / n)
    }

    pub fn place_params(&self) -> Result<PlaceParams, LayoutError> {
        Ok(PlaceParams {
            column_count: self.column_count,
            column_width: self.column_width()?,
            gap: self.gap,
        })
    }
}

/// The two precomputed permutations of an item set, one per grid.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ordering {
    pub ordered_ids_2col: Vec<ItemId>,
    pub ordered_ids_4col: Vec<ItemId>,
}

impl Ordering {
    pub fn for_variant(&self, variant: ColumnVariant) -> &[ItemId] {
        match variant {
            ColumnVariant::TwoColumn => &self.ordered_ids_2col,
            ColumnVariant::FourColumn => &self.ordered_ids_4col,
        }
    }

    /// Both variants in arrival order.
    pub fn natural(set: &ItemSet) -> Self {
        let ids = set.natural_order();
        Ordering {
            ordered_ids_2col: ids.clone(),
            ordered_ids_4col: ids,
        }
    }
}

/// Rendered height of `item` in a grid with `params`. Wide items are as wide
/// as two columns plus the gap between them. Fails when the ratio is so
/// extreme that the height is not a usable number.
pub fn rendered_height(
    item: &Item,
    class: AspectClass,
    params: &PlaceParams,
) -> Result<f64, LayoutError> {
    let width = params.span_width(class.span(params.column_count));
    ensure_positive("rendered height", width / item.aspect_ratio)
}

/// Classify every item and compute its rendered height at the grid's column width.
pub fn prepare_items(
    set: &ItemSet,
    geometry: &ColumnGeometry,
    classifier: &ClassifierConfig,
) -> Result<Vec<OrderItem>, LayoutError> {
    let params = geometry.place_params()?;
    set.items()
        .iter()
        .map(|item| {
            let class = item.class(classifier)?;
            Ok(OrderItem {
                id: item.id.clone(),
                class,
                height: rendered_height(item, class, &params)?,
            })
        })
        .collect()
}

/// Dimension map for the placer, derived from aspect ratios when live
/// measurements are not available.
pub fn dimensions_for(
    set: &ItemSet,
    geometry: &ColumnGeometry,
    classifier: &ClassifierConfig,
) -> Result<HashMap<ItemId, Dimension>, LayoutError> {
    let params = geometry.place_params()?;
    set.items()
        .iter()
        .map(|item| {
            let class = item.class(classifier)?;
            let dimension = Dimension {
                width: params.span_width(class.span(geometry.column_count)),
                height: rendered_height(item, class, &params)?,
                is_wide: class.is_wide(),
            };
            Ok((item.id.clone(), dimension))
        })
        .collect()
}
