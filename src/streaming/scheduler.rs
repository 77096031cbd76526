//! Staggered preload scheduler
//!
//! Each pass collects every unloaded, flag-eligible segment inside the
//! preload band, orders them nearest first and admits at most `budget` of
//! them. Nothing is carried between passes: candidates that were not
//! admitted are simply re-evaluated next time.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::core::types::Vec3;
use crate::flags::FlagStore;
use super::config::StreamingConfig;
use super::registry::NamespaceTable;

/// A segment waiting for a preload slot
#[derive(Clone, Debug)]
pub struct PreloadCandidate {
    pub id: String,
    pub distance: f32,
    /// Authored position in the namespace, used to break distance ties
    pub order: usize,
}

// Ordered so that the nearest candidate is the heap maximum
impl Eq for PreloadCandidate {}

impl PartialEq for PreloadCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Ord for PreloadCandidate {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .distance
            .total_cmp(&self.distance)
            .then_with(|| other.order.cmp(&self.order))
    }
}

impl PartialOrd for PreloadCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Collect every preload candidate in a namespace, nearest first
pub fn collect_candidates(
    table: &NamespaceTable,
    observer: Vec3,
    config: &StreamingConfig,
    flags: &FlagStore,
) -> BinaryHeap<PreloadCandidate> {
    table
        .iter()
        .enumerate()
        .filter(|(_, seg)| !seg.is_loaded())
        .filter_map(|(order, seg)| {
            let distance = seg.distance_to(observer);
            if !config.in_preload_band(distance) {
                return None;
            }
            if !flags.is_satisfied(seg.required_flag()) {
                return None;
            }
            Some(PreloadCandidate {
                id: seg.id().to_string(),
                distance,
                order,
            })
        })
        .collect()
}

/// Pick at most `config.preload_budget` candidates for this pass
pub fn select_preload_candidates(
    table: &NamespaceTable,
    observer: Vec3,
    config: &StreamingConfig,
    flags: &FlagStore,
) -> Vec<PreloadCandidate> {
    let mut heap = collect_candidates(table, observer, config, flags);
    let total = heap.len();

    let selected: Vec<_> = std::iter::from_fn(|| heap.pop())
        .take(config.preload_budget)
        .collect();

    if total > selected.len() {
        log::trace!(
            "Preload pass ({}): admitted {} of {} candidates",
            table.namespace(),
            selected.len(),
            total
        );
    }

    selected
}
