use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::LayoutError;
use crate::items::classify::ClassifierConfig;
use crate::layout::greedy::OrderParams;
use crate::layout::{ColumnGeometry, ColumnVariant};

/// Container size assumed when ordering for one grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportConfig {
    /// Grid container width (px)
    pub container_width: f64,
    /// Gap between columns and rows (px)
    pub gap: f64,
}

/// Configuration for the greedy orderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderingConfig {
    /// Longest run of consecutive wide images while narrow ones remain
    pub max_wide_streak: usize,
    pub two_column: ViewportConfig,
    pub four_column: ViewportConfig,
}

impl Default for OrderingConfig {
    fn default() -> Self {
        Self {
            max_wide_streak: 1,
            two_column: ViewportConfig {
                container_width: 400.0,
                gap: 12.0,
            },
            four_column: ViewportConfig {
                container_width: 1200.0,
                gap: 16.0,
            },
        }
    }
}

impl OrderingConfig {
    pub fn viewport(&self, variant: ColumnVariant) -> &ViewportConfig {
        match variant {
            ColumnVariant::TwoColumn => &self.two_column,
            ColumnVariant::FourColumn => &self.four_column,
        }
    }

    pub fn geometry(&self, variant: ColumnVariant) -> ColumnGeometry {
        let viewport = self.viewport(variant);
        ColumnGeometry::new(variant.column_count(), viewport.container_width, viewport.gap)
    }

    pub fn order_params(&self, variant: ColumnVariant) -> OrderParams {
        OrderParams {
            column_count: variant.column_count(),
            gap: self.viewport(variant).gap,
            max_wide_streak: self.max_wide_streak,
        }
    }
}

/// Configuration for the ordering cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Seconds before an entry expires; 0 = only explicit invalidation
    pub ttl_secs: u64,
    /// Entry limit; the oldest entry is evicted when full
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 0,
            max_entries: 1024,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Option<Duration> {
        (self.ttl_secs > 0).then(|| Duration::from_secs(self.ttl_secs))
    }
}

/// Full engine configuration, usually read from a TOML file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub classifier: ClassifierConfig,
    pub ordering: OrderingConfig,
    pub cache: CacheConfig,
}

impl EngineConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(text).context("invalid engine configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = Self::from_toml(&text)
            .with_context(|| format!("failed to load config {}", path.display()))?;
        tracing::info!("Loaded engine config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LayoutError> {
        self.classifier.validate()?;
        if self.ordering.max_wide_streak == 0 {
            return Err(LayoutError::InvalidConfig(
                "ordering.max_wide_streak must be at least 1".into(),
            ));
        }
        for variant in ColumnVariant::ALL {
            self.ordering.geometry(variant).column_width().map_err(|e| {
                LayoutError::InvalidConfig(format!("ordering viewport for {}: {}", variant, e))
            })?;
        }
        if self.cache.max_entries == 0 {
            return Err(LayoutError::InvalidConfig(
                "cache.max_entries must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
