use crate::items::set::ItemId;

/// Errors raised by the ordering and placement engine.
///
/// `InvalidDimension` and `UnsupportedColumnCount` are precondition violations and
/// should be filtered out before entering the hot path. `MissingDimension` is an
/// expected runtime condition; the placer recovers from it by skipping the item.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LayoutError {
    /// A non-positive or non-finite aspect ratio, width, height or gap.
    #[error("invalid {field}: {value} (must be finite and positive)")]
    InvalidDimension { field: &'static str, value: f64 },

    /// The orderer needs at least two columns; the placer at least one.
    #[error("unsupported column count {0}")]
    UnsupportedColumnCount(usize),

    /// An ordering referenced an id with no entry in the dimensions map.
    #[error("no dimensions for item {0}")]
    MissingDimension(ItemId),

    /// The same id appeared twice where a set of ids was expected.
    #[error("duplicate item id {0}")]
    DuplicateItem(ItemId),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl LayoutError {
    pub(crate) fn invalid(field: &'static str, value: f64) -> Self {
        LayoutError::InvalidDimension { field, value }
    }
}

/// Reject anything that is not a finite, strictly positive number.
pub(crate) fn ensure_positive(field: &'static str, value: f64) -> Result<f64, LayoutError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(LayoutError::invalid(field, value))
    }
}
