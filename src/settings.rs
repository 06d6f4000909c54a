use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ClusterError, Result};

pub const DEFAULT_DISTANCE: f64 = 20.0;

/// User facing knobs of a cluster layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterConfig {
    /// Grouping distance in pixels.
    pub distance: f64,
    /// Category visibility. A category missing from the map is not clustered at all.
    pub categories: BTreeMap<String, bool>,
    pub cluster_title_visible: bool,
    pub single_title_visible: bool,
    pub direction_visible: bool,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            distance: DEFAULT_DISTANCE,
            categories: BTreeMap::new(),
            cluster_title_visible: true,
            single_title_visible: false,
            direction_visible: false,
        }
    }
}

impl ClusterConfig {
    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for category in categories {
            self.categories.insert(category.into(), true);
        }
        self
    }

    pub fn is_category_visible(&self, category: &str) -> bool {
        self.categories.get(category).copied().unwrap_or(false)
    }

    pub fn validate(&self) -> Result<()> {
        validate_distance(self.distance)
    }

    pub fn from_json_str(data: &str) -> Result<Self> {
        let config: ClusterConfig = serde_json::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let config: ClusterConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

/// Negative and non-finite distances are rejected rather than clamped.
pub fn validate_distance(distance: f64) -> Result<()> {
    if distance.is_finite() && distance >= 0.0 {
        Ok(())
    } else {
        Err(ClusterError::InvalidDistance(distance))
    }
}

/// Map units per pixel must be finite and positive.
pub fn validate_resolution(resolution: f64) -> Result<()> {
    if resolution.is_finite() && resolution > 0.0 {
        Ok(())
    } else {
        Err(ClusterError::InvalidResolution(resolution))
    }
}
