//! Debug protocol - JSON command/response definitions
//!
//! One JSON object per line in each direction. Namespaces travel as the
//! strings `"core"` and `"memory"`.

use serde::{Deserialize, Serialize};

/// Commands sent by a debug client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", content = "params")]
pub enum DebugCommand {
    /// Current observer position
    GetObserver,
    /// Teleport the observer (applied before the next tick)
    MoveObserver { x: f32, y: f32, z: f32 },
    /// State of every segment, optionally filtered by namespace
    GetSegments {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        namespace: Option<String>,
    },
    /// State of one segment
    GetSegment { namespace: String, id: String },
    /// Set a narrative flag (applied between ticks)
    SetFlag { name: String, value: bool },
    /// All flags and visited segments
    GetFlags,
    /// Simulate the observer entering a segment trigger
    EnterSegment { namespace: String, id: String },
    /// Show a preloaded segment
    ActivateSegment { namespace: String, id: String },
    /// Transition counts from the last tick
    GetStats,
    /// Ping (health check)
    Ping,
}

/// Responses from debug server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum DebugResponse {
    #[serde(rename = "ok")]
    Ok { data: ResponseData },
    #[serde(rename = "error")]
    Error { message: String },
}

/// Response data variants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseData {
    Pong { message: String },
    Observer {
        position: [f32; 3],
        tick: u64,
    },
    Segments { segments: Vec<SegmentInfo> },
    Segment { segment: SegmentInfo },
    Flags {
        flags: Vec<FlagInfo>,
        visited: Vec<String>,
    },
    Stats { stats: StatsInfo },
    Queued { description: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentInfo {
    pub namespace: String,
    pub id: String,
    /// "unloaded", "preloaded" or "active"
    pub state: String,
    pub distance: f32,
    pub required_flag: Option<String>,
    pub eligible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagInfo {
    pub name: String,
    pub value: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsInfo {
    pub tick: u64,
    pub loaded: u32,
    pub preloaded: u32,
    pub unloaded: u32,
    pub promoted: u32,
    pub gated: u32,
    pub preload_pass: bool,
    pub live_instances: u32,
}

impl DebugResponse {
    pub fn ok(data: ResponseData) -> Self {
        Self::Ok { data }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self::Error {
            message: msg.into(),
        }
    }

    pub fn pong() -> Self {
        Self::ok(ResponseData::Pong {
            message: "pong".into(),
        })
    }

    pub fn queued(description: impl Into<String>) -> Self {
        Self::ok(ResponseData::Queued {
            description: description.into(),
        })
    }
}
