//! Event types broadcast by the core services, and the scene data model.
//!
//! ## Channels
//!
//! | Event | Source |
//! |-------|--------|
//! | `ScanEvent` | `VisionClient` — one per surfaced report |
//! | `ClientStatusEvent` | `VisionClient` — lifecycle transitions |
//! | `SpeechEvent` | `Speaker` — utterance lifecycle |
//! | `DispatchEvent` | `CommandDispatcher` — listening + match outcomes |
//!
//! All types serialize with camelCase fields and lowercase enum variants so
//! a host process can forward them to any frontend unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Scene data model
// ---------------------------------------------------------------------------

/// The category of analysis requested from the vision model. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    /// Objects, furniture and whole-scene descriptions.
    Objects,
    /// Printed or displayed text read back verbatim.
    Text,
    /// People, faces and expressions.
    Faces,
    /// Spatial layout, obstacles and walkable paths.
    Navigation,
}

impl ScanMode {
    /// Every mode, in the order the source app presents them.
    pub const ALL: [ScanMode; 4] = [
        ScanMode::Objects,
        ScanMode::Text,
        ScanMode::Faces,
        ScanMode::Navigation,
    ];

    /// Human-readable label for announcements.
    pub fn label(self) -> &'static str {
        match self {
            ScanMode::Objects => "Objects",
            ScanMode::Text => "Text",
            ScanMode::Faces => "Faces",
            ScanMode::Navigation => "Navigation",
        }
    }

    /// Parse a user-supplied mode name. Case-insensitive; accepts the
    /// serialized form ("objects") and the label form ("Objects").
    pub fn parse(raw: &str) -> Option<ScanMode> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "objects" => Some(ScanMode::Objects),
            "text" => Some(ScanMode::Text),
            "faces" => Some(ScanMode::Faces),
            "navigation" | "navigate" => Some(ScanMode::Navigation),
            _ => None,
        }
    }
}

impl std::fmt::Display for ScanMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One completed analysis of a captured frame. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneReport {
    /// Mode the analysis was requested in.
    pub mode: ScanMode,
    /// Spoken-ready description of the scene.
    pub description: String,
    /// Model confidence in [0, 100]. Informational only — callers report it
    /// but never reject a result because of it.
    pub confidence: u8,
    /// When the model produced this report.
    pub produced_at: DateTime<Utc>,
    /// BCP-47-ish language tag of `description`, if the model knows it.
    pub language: Option<String>,
}

// ---------------------------------------------------------------------------
// Scan events
// ---------------------------------------------------------------------------

/// Emitted by `VisionClient` for every report that is surfaced to a caller.
/// Cancelled or timed-out analyses never produce a `ScanEvent`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanEvent {
    /// Monotonically increasing event sequence number.
    pub seq: u64,
    pub report: SceneReport,
}

/// Emitted by `VisionClient` when its lifecycle state changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientStatusEvent {
    pub status: ClientStatus,
    /// Optional human-readable detail (e.g. error message).
    pub detail: Option<String>,
}

/// Current state of a `VisionClient`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientStatus {
    /// No analysis in flight.
    Idle,
    /// Loading model weights / running warm-up inference.
    WarmingUp,
    /// One analysis currently in flight.
    Analyzing,
    /// The most recent analysis failed; the client remains usable.
    Error,
}

// ---------------------------------------------------------------------------
// Speech events
// ---------------------------------------------------------------------------

/// Emitted by `Speaker` as an utterance moves through its lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechEvent {
    /// Monotonically increasing event sequence number.
    pub seq: u64,
    /// Id returned by the `speak` call this event belongs to.
    pub utterance_id: u64,
    pub state: UtteranceState,
}

/// Lifecycle of one utterance. At most one utterance is ever audible; a
/// newer `speak` interrupts the active one (last-call-wins).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UtteranceState {
    /// Playback began.
    Started,
    /// Playback ran to completion.
    Finished,
    /// Playback was cut short by a newer utterance or an explicit stop.
    Interrupted,
}

// ---------------------------------------------------------------------------
// Dispatch events
// ---------------------------------------------------------------------------

/// Emitted by `CommandDispatcher` on state changes and dispatch outcomes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchEvent {
    /// Monotonically increasing event sequence number.
    pub seq: u64,
    #[serde(flatten)]
    pub kind: DispatchKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DispatchKind {
    /// Listening state after a `start_listening`/`stop_listening` call.
    /// Redundant transitions re-emit this so hosts can re-announce.
    Listening { active: bool },
    /// An utterance matched a registered trigger and its action ran.
    Matched { trigger: String },
    /// An utterance matched nothing; `available` lists current triggers.
    Unrecognized { available: Vec<String> },
}
