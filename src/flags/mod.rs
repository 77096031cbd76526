//! Narrative unlock flags and visited-segment tracking
//!
//! A single `FlagStore` is shared between the streamer (reads flags, records
//! visits) and narrative triggers (write flags between ticks). It is passed
//! around as a [`SharedFlags`] handle.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Shared handle to a flag store
pub type SharedFlags = Arc<RwLock<FlagStore>>;

/// Boolean unlock flags plus the set of visited segment ids
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlagStore {
    flags: HashMap<String, bool>,
    visited: HashSet<String>,
}

impl FlagStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a store in a shared handle
    pub fn into_shared(self) -> SharedFlags {
        Arc::new(RwLock::new(self))
    }

    /// Create an empty shared store
    pub fn shared() -> SharedFlags {
        Self::new().into_shared()
    }

    // --- Flags (decisions, unlocks, state) ---

    /// Value of a flag. Unset flags read as false.
    pub fn get_flag(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }

    /// Set a flag value
    pub fn set_flag(&mut self, name: impl Into<String>, value: bool) {
        self.flags.insert(name.into(), value);
    }

    /// Whether a flag has been set at all, regardless of value
    pub fn has_flag(&self, name: &str) -> bool {
        self.flags.contains_key(name)
    }

    /// Whether an optional requirement is satisfied.
    ///
    /// `None` and the empty string are always satisfied.
    pub fn is_satisfied(&self, required: Option<&str>) -> bool {
        match required {
            None => true,
            Some(name) if name.is_empty() => true,
            Some(name) => self.get_flag(name),
        }
    }

    /// Iterate over all set flags
    pub fn flags(&self) -> impl Iterator<Item = (&str, bool)> {
        self.flags.iter().map(|(k, v)| (k.as_str(), *v))
    }

    // --- Visited segments ---

    /// Record a segment as visited
    pub fn mark_visited(&mut self, id: impl Into<String>) {
        self.visited.insert(id.into());
    }

    /// Whether a segment has been visited
    pub fn has_visited(&self, id: &str) -> bool {
        self.visited.contains(id)
    }

    /// Iterate over visited segment ids
    pub fn visited(&self) -> impl Iterator<Item = &str> {
        self.visited.iter().map(String::as_str)
    }

    /// Number of visited segments
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// Forget all flags and visits
    pub fn clear(&mut self) {
        self.flags.clear();
        self.visited.clear();
    }
}
