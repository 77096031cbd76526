//! Streaming thresholds and scheduler settings

use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};

/// Distance thresholds and preload scheduler settings
///
/// Valid configurations satisfy
/// `load_distance <= preload_distance <= unload_distance` with
/// `load_distance < unload_distance`, so there is always a hysteresis band
/// between becoming loaded and being unloaded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Unloaded segments within this distance are loaded visible
    pub load_distance: f32,
    /// Unloaded segments within this distance are preload candidates
    pub preload_distance: f32,
    /// Loaded segments at or beyond this distance are unloaded
    pub unload_distance: f32,
    /// Time between preload passes
    pub preload_interval: f32,
    /// Maximum preloads per namespace per pass
    pub preload_budget: usize,
    /// Show hidden preloaded segments once inside `load_distance`
    pub promote_preloaded: bool,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            load_distance: 20.0,
            preload_distance: 30.0,
            unload_distance: 40.0,
            preload_interval: 0.5,
            preload_budget: 2,
            promote_preloaded: false,
        }
    }
}

impl StreamingConfig {
    /// Config with explicit distances and default scheduler settings
    pub fn with_distances(load: f32, preload: f32, unload: f32) -> Self {
        Self {
            load_distance: load,
            preload_distance: preload,
            unload_distance: unload,
            ..Default::default()
        }
    }

    /// Check threshold ordering and scheduler settings
    pub fn validate(&self) -> Result<()> {
        let distances = [
            ("load_distance", self.load_distance),
            ("preload_distance", self.preload_distance),
            ("unload_distance", self.unload_distance),
        ];
        for (name, value) in distances {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "{} must be a finite non-negative distance, got {}",
                    name, value
                )));
            }
        }

        if self.load_distance > self.preload_distance {
            return Err(Error::InvalidConfig(format!(
                "load_distance ({}) exceeds preload_distance ({})",
                self.load_distance, self.preload_distance
            )));
        }
        if self.preload_distance > self.unload_distance {
            return Err(Error::InvalidConfig(format!(
                "preload_distance ({}) exceeds unload_distance ({})",
                self.preload_distance, self.unload_distance
            )));
        }
        if self.load_distance >= self.unload_distance {
            return Err(Error::InvalidConfig(format!(
                "load_distance ({}) must be below unload_distance ({})",
                self.load_distance, self.unload_distance
            )));
        }

        if !self.preload_interval.is_finite() || self.preload_interval <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "preload_interval must be positive, got {}",
                self.preload_interval
            )));
        }
        if self.preload_budget == 0 {
            return Err(Error::InvalidConfig(
                "preload_budget must be at least 1".to_string(),
            ));
        }

        if self.preload_distance == self.unload_distance {
            log::debug!(
                "preload_distance equals unload_distance ({}); preloads stop short of the unload band",
                self.unload_distance
            );
        }

        Ok(())
    }

    /// Whether a distance falls inside the preload band
    pub fn in_preload_band(&self, distance: f32) -> bool {
        distance <= self.preload_distance && distance < self.unload_distance
    }
}
