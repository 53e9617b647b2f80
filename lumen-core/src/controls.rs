//! Capability interfaces for hardware collaborators.
//!
//! Frame capture, haptic motors and hardware buttons live outside this
//! crate. The core only consumes their output (an opaque frame, a button
//! press) or pokes an inert hook (a haptic pulse), so each is a small trait
//! a host implements against its platform — and tests implement with fakes.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::inference::FrameHandle;

/// Something that captures camera frames.
pub trait FrameSource: Send + Sync {
    fn capture(&self) -> Result<FrameHandle>;
}

/// Capture stand-in for hosts without a camera: every capture yields the
/// same tagged, byte-less handle.
pub struct StaticFrameSource {
    source: String,
}

impl StaticFrameSource {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

impl Default for StaticFrameSource {
    fn default() -> Self {
        Self::new("static://placeholder")
    }
}

impl FrameSource for StaticFrameSource {
    fn capture(&self) -> Result<FrameHandle> {
        Ok(FrameHandle::tagged(self.source.clone()))
    }
}

/// Something that can fire a short haptic pulse.
pub trait HapticFeedback: Send + Sync {
    fn pulse(&self);
}

/// Haptic sink for hosts without a vibration motor.
pub struct NoHaptics;

impl HapticFeedback for NoHaptics {
    fn pulse(&self) {
        debug!("haptic pulse (no-op)");
    }
}

/// A hardware volume-key press, delivered by the host's event source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonPress {
    VolumeUp,
    VolumeDown,
}
