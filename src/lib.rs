//! Segstream - proximity-driven streaming of world segments
//!
//! Segments of a level ("core" geometry and "memory" vignettes) are loaded,
//! preloaded hidden, and unloaded around a moving observer. Loads can be
//! gated on narrative flags, preloads are admitted through a budgeted
//! nearest-first pass, and entry triggers eagerly load adjacent segments.

pub mod core;
pub mod math;
pub mod flags;
pub mod streaming;
pub mod world;

pub use crate::core::{Error, Result};
pub use flags::{FlagStore, SharedFlags};
pub use streaming::{
    ContentHandle, ContentHost, LoadState, Namespace, ProximityStreamer, SegmentDef,
    SegmentRegistry, StreamingConfig,
};
pub use world::WorldManifest;
