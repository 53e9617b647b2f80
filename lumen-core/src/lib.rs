//! # lumen-core
//!
//! Reusable scene-narration engine SDK.
//!
//! ## Architecture
//!
//! ```text
//! FrameSource → VisionClient ── spawn_blocking ──► SceneModel::describe
//!                   │                                      │
//!                   │◄── generation check (cancel/timeout discards late results)
//!                   │
//!             broadcast::Sender<ScanEvent>
//!
//! Speaker ── worker thread ──► SpeechBackend (one audible utterance, last-call-wins)
//! CommandDispatcher ── Idle ⇄ Listening, substring trigger match
//! ScanHistory ── insertion-ordered in-memory log
//! ScanSession ── wires the above into the user-facing scan flow
//! ```
//!
//! Services are constructed once by the host's composition root and passed
//! by reference; nothing in this crate hides behind a static accessor.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod client;
pub mod commands;
pub mod controls;
pub mod error;
pub mod events;
pub mod history;
pub mod inference;
pub mod session;
pub mod speech;

// Convenience re-exports for downstream crates
pub use client::{ClientConfig, VisionClient};
pub use commands::{CommandDispatcher, DispatchOutcome, VoiceCommand};
pub use controls::{ButtonPress, FrameSource, HapticFeedback, NoHaptics, StaticFrameSource};
pub use error::LumenError;
pub use events::{
    ClientStatus, ClientStatusEvent, DispatchEvent, DispatchKind, ScanEvent, ScanMode,
    SceneReport, SpeechEvent, UtteranceState,
};
pub use history::{relative_age, HistoryEntry, HistoryFilter, ScanHistory};
pub use inference::{CannedModel, FrameHandle, ModelHandle, SceneModel};
pub use session::{ScanSession, SessionConfig};
pub use speech::{PacedBackend, SpeechBackend, SpeechOptions, Speaker, UtteranceOutcome};
