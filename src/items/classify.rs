use serde::{Deserialize, Serialize};

use crate::error::{ensure_positive, LayoutError};

/// 16:9, the canonical landscape-video ratio.
pub const WIDE_THRESHOLD: f64 = 16.0 / 9.0;

/// Thresholds deciding whether an image spans two grid columns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Ratio (width / height) at or above which an image is wide
    pub wide_threshold: f64,
    /// Ratios within this distance of the threshold count as exact 16:9
    pub exact_band: f64,
    /// Ratios down to `wide_threshold - near_tolerance` still count as wide
    pub near_tolerance: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            wide_threshold: WIDE_THRESHOLD,
            exact_band: 0.08,
            near_tolerance: 0.1,
        }
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> Result<(), LayoutError> {
        if !(self.wide_threshold.is_finite() && self.wide_threshold > 0.0) {
            return Err(LayoutError::InvalidConfig(format!(
                "classifier.wide_threshold must be positive, got {}",
                self.wide_threshold
            )));
        }
        for (name, value) in [
            ("classifier.exact_band", self.exact_band),
            ("classifier.near_tolerance", self.near_tolerance),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(LayoutError::InvalidConfig(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Wide images span two columns, narrow images one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AspectClass {
    Narrow,
    Wide,
}

impl AspectClass {
    pub fn is_wide(self) -> bool {
        self == AspectClass::Wide
    }

    /// Columns covered in a grid of `column_count` columns. Spanning needs two.
    pub fn span(self, column_count: usize) -> usize {
        if self.is_wide() && column_count >= 2 {
            2
        } else {
            1
        }
    }
}

/// Classify an aspect ratio (width / height).
pub fn classify(aspect_ratio: f64, config: &ClassifierConfig) -> Result<AspectClass, LayoutError> {
    let ratio = ensure_positive("aspect ratio", aspect_ratio)?;

    let exact_16_9 = (ratio - config.wide_threshold).abs() <= config.exact_band;
    if exact_16_9 || ratio >= config.wide_threshold - config.near_tolerance {
        Ok(AspectClass::Wide)
    } else {
        Ok(AspectClass::Narrow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class_of(ratio: f64) -> AspectClass {
        classify(ratio, &ClassifierConfig::default()).unwrap()
    }

    #[test]
    fn exact_and_rounded_16_9_are_wide() {
        assert_eq!(class_of(16.0 / 9.0), AspectClass::Wide);
        assert_eq!(class_of(1.78), AspectClass::Wide);
        assert_eq!(class_of(1.77), AspectClass::Wide);
        // 1920x1088 encodes
        assert_eq!(class_of(1920.0 / 1088.0), AspectClass::Wide);
    }

    #[test]
    fn near_threshold_and_panoramas_are_wide() {
        assert_eq!(class_of(1.68), AspectClass::Wide);
        assert_eq!(class_of(2.4), AspectClass::Wide);
        assert_eq!(class_of(4.0), AspectClass::Wide);
    }

    #[test]
    fn common_photo_ratios_are_narrow() {
        assert_eq!(class_of(1.0), AspectClass::Narrow);
        assert_eq!(class_of(0.75), AspectClass::Narrow);
        assert_eq!(class_of(1.5), AspectClass::Narrow);
        assert_eq!(class_of(1.6), AspectClass::Narrow);
    }

    #[test]
    fn tolerances_are_configurable() {
        let strict = ClassifierConfig {
            exact_band: 0.0,
            near_tolerance: 0.0,
            ..ClassifierConfig::default()
        };
        assert_eq!(classify(1.75, &strict).unwrap(), AspectClass::Narrow);
        assert_eq!(classify(WIDE_THRESHOLD, &strict).unwrap(), AspectClass::Wide);
    }

    #[test]
    fn invalid_ratios_are_rejected() {
        let config = ClassifierConfig::default();
        for ratio in [0.0, -1.78, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                classify(ratio, &config),
                Err(LayoutError::InvalidDimension { .. })
            ));
        }
    }

    #[test]
    fn span_degrades_without_room() {
        assert_eq!(AspectClass::Wide.span(4), 2);
        assert_eq!(AspectClass::Wide.span(1), 1);
        assert_eq!(AspectClass::Narrow.span(4), 1);
    }

    #[test]
    fn config_validation() {
        assert!(ClassifierConfig::default().validate().is_ok());
        let bad = ClassifierConfig {
            exact_band: -0.1,
            ..ClassifierConfig::default()
        };
        assert!(bad.validate().is_err());
    }
}
