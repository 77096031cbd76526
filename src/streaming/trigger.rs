//! Entry trigger volumes
//!
//! A trigger fires once when the observer moves from outside its volume to
//! inside, asking the streamer to eagerly load the segment's neighbours.

use crate::core::types::Vec3;
use crate::math::Aabb;
use super::content::ContentHost;
use super::registry::SegmentRegistry;
use super::segment::Namespace;
use super::streamer::ProximityStreamer;

/// Trigger volume attached to a segment
#[derive(Clone, Debug)]
pub struct SegmentTrigger {
    pub segment_id: String,
    pub namespace: Namespace,
    pub bounds: Aabb,
    inside: bool,
}

impl SegmentTrigger {
    pub fn new(segment_id: impl Into<String>, namespace: Namespace, bounds: Aabb) -> Self {
        Self {
            segment_id: segment_id.into(),
            namespace,
            bounds,
            inside: false,
        }
    }

    /// Update with the observer position. Returns true on entry.
    pub fn check(&mut self, observer: Vec3) -> bool {
        let inside = self.bounds.contains_point(observer);
        let entered = inside && !self.inside;
        self.inside = inside;
        entered
    }

    /// Whether the observer was inside at the last check
    pub fn is_inside(&self) -> bool {
        self.inside
    }
}

/// All trigger volumes of a world
#[derive(Clone, Debug, Default)]
pub struct TriggerSet {
    triggers: Vec<SegmentTrigger>,
}

impl TriggerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build triggers for every segment that declares a trigger extent
    pub fn from_registry(registry: &SegmentRegistry) -> Self {
        let triggers = registry
            .iter()
            .filter_map(|seg| {
                let extent = seg.definition().trigger_extent?;
                Some(SegmentTrigger::new(
                    seg.id(),
                    seg.namespace(),
                    Aabb::from_center_half_extent(seg.position(), extent),
                ))
            })
            .collect();
        Self { triggers }
    }

    pub fn push(&mut self, trigger: SegmentTrigger) {
        self.triggers.push(trigger);
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    /// Check every trigger and collect the ones entered this step
    pub fn entered(&mut self, observer: Vec3) -> Vec<(String, Namespace)> {
        self.triggers
            .iter_mut()
            .filter_map(|t| {
                t.check(observer)
                    .then(|| (t.segment_id.clone(), t.namespace))
            })
            .collect()
    }

    /// Check every trigger and forward entries to the streamer.
    ///
    /// Call between ticks. Returns the number of segments eagerly loaded.
    pub fn dispatch<H: ContentHost>(
        &mut self,
        observer: Vec3,
        streamer: &mut ProximityStreamer<H>,
    ) -> usize {
        self.entered(observer)
            .into_iter()
            .map(|(id, namespace)| {
                log::debug!("Observer entered {} '{}'", namespace, id);
                streamer.on_observer_enter(&id, namespace)
            })
            .sum()
    }
}
