//! Proximity-driven segment streaming and staggered preloading

pub mod segment;
pub mod content;
pub mod registry;
pub mod config;
pub mod scheduler;
pub mod streamer;
pub mod trigger;

pub use segment::{ContentHandle, LoadState, Namespace, Segment, SegmentDef};
pub use content::{ContentHost, InstanceId, InstanceRecord, RecordingHost};
pub use registry::{NamespaceTable, SegmentRegistry};
pub use config::StreamingConfig;
pub use scheduler::{PreloadCandidate, select_preload_candidates};
pub use streamer::{ProximityStreamer, SegmentSnapshot, StreamingStats};
pub use trigger::{SegmentTrigger, TriggerSet};
