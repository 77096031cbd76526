//! Segment definitions and runtime state

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::core::Error;
use crate::core::types::Vec3;
use super::content::InstanceId;

/// One of the two disjoint segment id spaces
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    /// World geometry segments
    Core,
    /// Narrative vignette segments
    Memory,
}

impl Namespace {
    /// Both namespaces, in scan order
    pub const ALL: [Namespace; 2] = [Namespace::Core, Namespace::Memory];

    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Core => "core",
            Namespace::Memory => "memory",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Namespace {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "core" => Ok(Namespace::Core),
            "memory" => Ok(Namespace::Memory),
            other => Err(Error::Streaming(format!("unknown namespace '{}'", other))),
        }
    }
}

/// Opaque reference to instantiable content (a prefab path or asset key)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHandle(pub String);

impl ContentHandle {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Static definition of a segment, as authored
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegmentDef {
    pub id: String,
    pub content: ContentHandle,
    pub position: Vec3,
    /// Segments to load eagerly when the observer enters this one
    #[serde(default)]
    pub adjacency: Vec<String>,
    /// Flag that must be true before this segment may load
    #[serde(default, deserialize_with = "non_empty_string")]
    pub required_flag: Option<String>,
    /// Half-extents of the entry trigger volume centered on `position`
    #[serde(default)]
    pub trigger_extent: Option<Vec3>,
}

impl SegmentDef {
    pub fn new(id: impl Into<String>, content: impl Into<String>, position: Vec3) -> Self {
        Self {
            id: id.into(),
            content: ContentHandle::new(content),
            position,
            adjacency: Vec::new(),
            required_flag: None,
            trigger_extent: None,
        }
    }

    /// Builder: set the adjacency list
    pub fn with_adjacency<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.adjacency = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Builder: gate the segment on a flag. An empty name clears the gate.
    pub fn with_required_flag(mut self, flag: impl Into<String>) -> Self {
        let flag = flag.into();
        self.required_flag = if flag.is_empty() { None } else { Some(flag) };
        self
    }

    /// Builder: attach an entry trigger volume
    pub fn with_trigger(mut self, half_extent: Vec3) -> Self {
        self.trigger_extent = Some(half_extent);
        self
    }
}

fn non_empty_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

/// Derived load state of a segment
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
    /// No live instance
    Unloaded,
    /// Instance exists but is hidden
    Preloaded,
    /// Instance exists and is visible
    Active,
}

impl LoadState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadState::Unloaded => "unloaded",
            LoadState::Preloaded => "preloaded",
            LoadState::Active => "active",
        }
    }
}

/// Live content instance owned by a segment
#[derive(Debug)]
pub(crate) struct LiveInstance {
    pub(crate) id: InstanceId,
    pub(crate) visible: bool,
}

/// A registered segment: its definition plus the live instance, if any.
///
/// The load state is derived from the instance so the two can never drift
/// apart. Only the streamer creates or destroys instances.
#[derive(Debug)]
pub struct Segment {
    def: SegmentDef,
    namespace: Namespace,
    pub(crate) instance: Option<LiveInstance>,
}

impl Segment {
    pub(crate) fn new(def: SegmentDef, namespace: Namespace) -> Self {
        Self {
            def,
            namespace,
            instance: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.def.id
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    pub fn content(&self) -> &ContentHandle {
        &self.def.content
    }

    pub fn position(&self) -> Vec3 {
        self.def.position
    }

    pub fn adjacency(&self) -> &[String] {
        &self.def.adjacency
    }

    pub fn required_flag(&self) -> Option<&str> {
        self.def.required_flag.as_deref()
    }

    pub fn definition(&self) -> &SegmentDef {
        &self.def
    }

    /// Current load state
    pub fn load_state(&self) -> LoadState {
        match &self.instance {
            None => LoadState::Unloaded,
            Some(live) if live.visible => LoadState::Active,
            Some(_) => LoadState::Preloaded,
        }
    }

    /// Whether a live instance exists
    pub fn is_loaded(&self) -> bool {
        self.instance.is_some()
    }

    /// Whether the segment has been instantiated ahead of the observer.
    ///
    /// True for both hidden and visible instances; false once unloaded.
    pub fn is_preloaded(&self) -> bool {
        self.instance.is_some()
    }

    /// Raw id of the live instance, for inspection
    pub fn instance_id(&self) -> Option<u64> {
        self.instance.as_ref().map(|live| live.id.raw())
    }

    /// Distance from the observer to the segment anchor
    pub fn distance_to(&self, observer: Vec3) -> f32 {
        observer.distance(self.def.position)
    }
}
