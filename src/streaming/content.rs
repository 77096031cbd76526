//! Content instantiation collaborator
//!
//! The streamer decides *which* instances exist; a [`ContentHost`] performs
//! the actual creation, destruction and visibility changes in the scene.

use std::collections::HashMap;

use crate::core::types::Vec3;
use super::segment::ContentHandle;

/// Handle to a live content instance.
///
/// Not `Clone`: the segment that owns it is the only holder, and
/// [`ContentHost::destroy`] consumes it.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct InstanceId(u64);

impl InstanceId {
    /// Wrap a host-specific raw id
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Scene-side operations the streamer drives. Calls are synchronous and
/// assumed to succeed.
pub trait ContentHost {
    /// Create an instance of `content` at `position`. New instances are visible.
    fn instantiate(&mut self, content: &ContentHandle, position: Vec3) -> InstanceId;

    /// Destroy an instance
    fn destroy(&mut self, instance: InstanceId);

    /// Show or hide an instance
    fn set_visible(&mut self, instance: &InstanceId, visible: bool);
}

/// Per-instance record kept by [`RecordingHost`]
#[derive(Clone, Debug, PartialEq)]
pub struct InstanceRecord {
    pub content: ContentHandle,
    pub position: Vec3,
    pub visible: bool,
}

/// In-memory host that tracks live instances and counts every call.
///
/// Used by the simulation binary and tests in place of a real scene.
#[derive(Debug, Default)]
pub struct RecordingHost {
    next_id: u64,
    live: HashMap<u64, InstanceRecord>,
    pub instantiate_calls: usize,
    pub destroy_calls: usize,
    pub visibility_calls: usize,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of instances currently alive
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Look up a live instance by raw id
    pub fn instance(&self, raw: u64) -> Option<&InstanceRecord> {
        self.live.get(&raw)
    }

    /// Whether the instance with `raw` id is still alive
    pub fn is_alive(&self, raw: u64) -> bool {
        self.live.contains_key(&raw)
    }

    /// Number of live instances of a given content handle
    pub fn count_of(&self, content: &str) -> usize {
        self.live.values().filter(|r| r.content.as_str() == content).count()
    }
}

impl ContentHost for RecordingHost {
    fn instantiate(&mut self, content: &ContentHandle, position: Vec3) -> InstanceId {
        self.instantiate_calls += 1;
        self.next_id += 1;
        self.live.insert(
            self.next_id,
            InstanceRecord {
                content: content.clone(),
                position,
                visible: true,
            },
        );
        InstanceId::from_raw(self.next_id)
    }

    fn destroy(&mut self, instance: InstanceId) {
        self.destroy_calls += 1;
        if self.live.remove(&instance.raw()).is_none() {
            log::warn!("RecordingHost: destroy of unknown instance {}", instance.raw());
        }
    }

    fn set_visible(&mut self, instance: &InstanceId, visible: bool) {
        self.visibility_calls += 1;
        if let Some(record) = self.live.get_mut(&instance.raw()) {
            record.visible = visible;
        }
    }
}
