//! Scene model abstraction.
//!
//! The `SceneModel` trait decouples the client from any specific backend
//! (canned placeholder today, a real on-device vision model later).
//!
//! `&mut self` on `describe` intentionally expresses that backends are
//! stateful — decoder caches, warmed weights, RNG state. All mutation is
//! therefore serialised through `ModelHandle`'s `parking_lot::Mutex`.

pub mod canned;

pub use canned::CannedModel;

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Result;
use crate::events::{ScanMode, SceneReport};

/// Opaque reference to one captured camera frame.
///
/// The core never interprets frame contents — capture is an external
/// collaborator. A handle carries a source tag for logging plus whatever
/// bytes the capturer chose to attach.
#[derive(Debug, Clone, Default)]
pub struct FrameHandle {
    source: String,
    bytes: Vec<u8>,
}

impl FrameHandle {
    /// A handle with a source tag and no pixel data (placeholder capture).
    pub fn tagged(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            bytes: Vec::new(),
        }
    }

    /// A handle carrying raw frame bytes.
    pub fn from_bytes(source: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            source: source.into(),
            bytes,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Contract for vision/speech model backends.
pub trait SceneModel: Send + 'static {
    /// One-time warm-up: load weights, pre-allocate caches. Called once at
    /// application startup, before the first `describe`.
    ///
    /// # Errors
    /// Returns an error if model files are missing or corrupt.
    fn warm_up(&mut self) -> Result<()>;

    /// Describe a captured frame in the requested mode.
    ///
    /// Must resolve to exactly one report or fail; partial output is not
    /// part of this contract. Implementations may block — callers run them
    /// off the async executor.
    fn describe(&mut self, frame: &FrameHandle, mode: ScanMode) -> Result<SceneReport>;

    /// Translate a short phrase into `target` (a lowercase language tag).
    ///
    /// Returns `None` when the model has no mapping; callers fall back to
    /// the untranslated input. Never an error.
    fn translate(&mut self, text: &str, target: &str) -> Option<String>;
}

/// Thread-safe reference-counted handle to any `SceneModel` implementor.
///
/// Uses `parking_lot::Mutex` for non-poisoning on panic and a faster
/// uncontended lock than `std::sync::Mutex`.
#[derive(Clone)]
pub struct ModelHandle(pub Arc<Mutex<dyn SceneModel>>);

impl ModelHandle {
    /// Wrap any `SceneModel` in a `ModelHandle`.
    pub fn new<M: SceneModel>(model: M) -> Self {
        Self(Arc::new(Mutex::new(model)))
    }
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle").finish_non_exhaustive()
    }
}
