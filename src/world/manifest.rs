//! World manifest: the static segment lists and streaming settings
//!
//! ```json
//! {
//!   "name": "riverside",
//!   "streaming": { "load_distance": 20.0, "preload_budget": 2 },
//!   "core":   [{ "id": "room1", "content": "rooms/room1", "position": [0, 0, 0],
//!                "adjacency": ["room2"], "trigger_extent": [4, 4, 4] }],
//!   "memory": [{ "id": "m1", "content": "memories/m1", "position": [30, 0, 0],
//!                "required_flag": "met_keeper" }],
//!   "observer_path": [[0, 0, 0], [120, 0, 0]],
//!   "observer_speed": 6.0
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::types::{Result, Vec3};
use crate::streaming::{SegmentDef, SegmentRegistry, StreamingConfig};

fn default_speed() -> f32 {
    5.0
}

/// Authored description of a streamable world
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldManifest {
    pub name: String,
    #[serde(default)]
    pub streaming: StreamingConfig,
    #[serde(default)]
    pub core: Vec<SegmentDef>,
    #[serde(default)]
    pub memory: Vec<SegmentDef>,
    /// Waypoints the simulated observer walks through
    #[serde(default)]
    pub observer_path: Vec<Vec3>,
    /// Observer speed along the path, in distance units per time unit
    #[serde(default = "default_speed")]
    pub observer_speed: f32,
}

impl WorldManifest {
    /// Parse a manifest from JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        let manifest: WorldManifest = serde_json::from_str(text)?;
        manifest.streaming.validate()?;
        Ok(manifest)
    }

    /// Load and validate a manifest file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let manifest = Self::from_json(&text)?;
        log::info!(
            "Loaded world '{}' from {}: {} core, {} memory segments",
            manifest.name,
            path.display(),
            manifest.core.len(),
            manifest.memory.len()
        );
        Ok(manifest)
    }

    /// Write the manifest as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Build the segment registry
    pub fn registry(&self) -> Result<SegmentRegistry> {
        SegmentRegistry::register(self.core.clone(), self.memory.clone())
    }

    /// Report adjacency entries that name no segment in the same namespace.
    ///
    /// These are legal (they are skipped at runtime) but usually authoring
    /// mistakes, so tools surface them as warnings.
    pub fn dangling_adjacency(&self) -> Vec<(String, String)> {
        let mut dangling = Vec::new();
        for list in [&self.core, &self.memory] {
            for def in list.iter() {
                for next in &def.adjacency {
                    if !list.iter().any(|d| &d.id == next) {
                        dangling.push((def.id.clone(), next.clone()));
                    }
                }
            }
        }
        dangling
    }

    /// Position along the observer path after travelling for `time`.
    ///
    /// Clamps to the last waypoint; `None` if the path is empty.
    pub fn observer_at(&self, time: f32) -> Option<Vec3> {
        let first = *self.observer_path.first()?;
        let mut remaining = (time * self.observer_speed).max(0.0);
        let mut current = first;

        for &next in self.observer_path.iter().skip(1) {
            let leg = current.distance(next);
            if remaining <= leg {
                if leg <= f32::EPSILON {
                    return Some(next);
                }
                return Some(current.lerp(next, remaining / leg));
            }
            remaining -= leg;
            current = next;
        }

        Some(current)
    }

    /// Time needed to walk the whole path
    pub fn path_duration(&self) -> f32 {
        if self.observer_speed <= 0.0 {
            return 0.0;
        }
        let length: f32 = self
            .observer_path
            .windows(2)
            .map(|w| w[0].distance(w[1]))
            .sum();
        length / self.observer_speed
    }
}
