use serde::{Deserialize, Serialize};

use crate::items::set::ItemId;

/// One submission row as handed over by the submission store, before validation.
/// Stored dimensions may not have been backfilled yet, so every size field is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawItem {
    pub id: ItemId,
    /// Explicit width / height, when the store already computed it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<f64>,
    /// Stored image width in pixels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Stored image height in pixels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl RawItem {
    pub fn with_ratio(id: impl Into<ItemId>, aspect_ratio: f64) -> Self {
        RawItem {
            id: id.into(),
            aspect_ratio: Some(aspect_ratio),
            width: None,
            height: None,
        }
    }

    pub fn with_size(id: impl Into<ItemId>, width: u32, height: u32) -> Self {
        RawItem {
            id: id.into(),
            aspect_ratio: None,
            width: Some(width),
            height: Some(height),
        }
    }

    /// Explicit ratio first, then stored pixel size. `None` when neither is known.
    pub fn resolved_ratio(&self) -> Option<f64> {
        if let Some(ratio) = self.aspect_ratio {
            return Some(ratio);
        }
        match (self.width, self.height) {
            (Some(w), Some(h)) if h > 0 => Some(w as f64 / h as f64),
            (Some(_), Some(_)) => Some(f64::INFINITY),
            _ => None,
        }
    }
}
