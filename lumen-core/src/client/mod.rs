//! `VisionClient` — async boundary in front of a `SceneModel`.
//!
//! ## Lifecycle of one analysis
//!
//! ```text
//! describe(frame, mode)
//!     ├─ reject with ScanInFlight if another analysis is pending
//!     ├─ status = Analyzing
//!     ├─ spawn_blocking → model.describe (model mutex held in the worker)
//!     ├─ optional deadline (ClientConfig::deadline)
//!     └─ surface the report only if the request generation is unchanged;
//!        a cancel_pending() or deadline expiry in between means the caller
//!        sees Cancelled and the late result is discarded unseen.
//! ```
//!
//! The client is `Send + Sync` — all fields use interior mutability. Wrap in
//! `Arc<VisionClient>` and construct it once at application start; callers
//! receive a reference instead of reaching for a global.

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::error::{LumenError, Result};
use crate::events::{ClientStatus, ClientStatusEvent, ScanEvent, ScanMode, SceneReport};
use crate::inference::{FrameHandle, ModelHandle};

/// Broadcast channel capacity: events buffered for slow consumers.
const BROADCAST_CAP: usize = 256;

/// Configuration for `VisionClient`.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Upper bound on one analysis. `None` disables the deadline entirely;
    /// the caller can still `cancel_pending()`. Default: 15 s.
    pub deadline: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            deadline: Some(Duration::from_secs(15)),
        }
    }
}

/// Async scene-analysis client. One request in flight at a time.
pub struct VisionClient {
    config: ClientConfig,
    model: ModelHandle,
    /// `true` while an analysis is pending.
    in_flight: Arc<AtomicBool>,
    /// Bumped by cancellation; a mismatch discards the pending result.
    generation: Arc<AtomicU64>,
    scan_tx: broadcast::Sender<ScanEvent>,
    status_tx: broadcast::Sender<ClientStatusEvent>,
    /// Monotonically increasing scan-event sequence counter.
    seq: Arc<AtomicU64>,
}

/// Clears the in-flight flag on every exit path of `describe`.
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl VisionClient {
    /// Create a new client. Call `warm_up()` once before the first analysis.
    pub fn new(config: ClientConfig, model: ModelHandle) -> Self {
        let (scan_tx, _) = broadcast::channel(BROADCAST_CAP);
        let (status_tx, _) = broadcast::channel(BROADCAST_CAP);

        Self {
            config,
            model,
            in_flight: Arc::new(AtomicBool::new(false)),
            generation: Arc::new(AtomicU64::new(0)),
            scan_tx,
            status_tx,
            seq: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Warm up the scene model (load weights, prime caches).
    pub fn warm_up(&self) -> Result<()> {
        self.set_status(ClientStatus::WarmingUp, None);
        info!("warming up scene model");
        self.model.0.lock().warm_up()?;
        self.set_status(ClientStatus::Idle, None);
        info!("scene model ready");
        Ok(())
    }

    /// Analyze one captured frame in the requested mode.
    ///
    /// The model runs on a blocking worker; this future stays cancel-safe on
    /// the async side. A result that arrives after `cancel_pending()` or the
    /// configured deadline is dropped without being emitted or returned.
    ///
    /// # Errors
    /// - `LumenError::ScanInFlight` if another analysis is pending.
    /// - `LumenError::Cancelled` on cancellation or deadline expiry.
    /// - `LumenError::Inference` if the model fails.
    pub async fn describe(&self, frame: FrameHandle, mode: ScanMode) -> Result<SceneReport> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            return Err(LumenError::ScanInFlight);
        }
        let _guard = InFlightGuard(Arc::clone(&self.in_flight));

        let generation = self.generation.load(Ordering::SeqCst);
        self.set_status(ClientStatus::Analyzing, None);
        debug!(source = frame.source(), %mode, "analysis started");

        let model = self.model.clone();
        let task = tokio::task::spawn_blocking(move || {
            let mut model = model.0.lock();
            model.describe(&frame, mode)
        });

        let joined = match self.config.deadline {
            Some(deadline) => match tokio::time::timeout(deadline, task).await {
                Ok(joined) => joined,
                Err(_) => {
                    // The worker keeps running but its result can no longer
                    // surface: bump the generation so nothing downstream
                    // mistakes it for a live request.
                    self.generation.fetch_add(1, Ordering::SeqCst);
                    self.set_status(ClientStatus::Idle, Some("analysis deadline expired".into()));
                    warn!(%mode, ?deadline, "analysis timed out");
                    return Err(LumenError::Cancelled);
                }
            },
            None => task.await,
        };

        let result = joined
            .map_err(|e| LumenError::Inference(format!("model task failed: {e}")))?;

        if self.generation.load(Ordering::SeqCst) != generation {
            self.set_status(ClientStatus::Idle, Some("analysis cancelled".into()));
            info!(%mode, "late result discarded after cancellation");
            return Err(LumenError::Cancelled);
        }

        match result {
            Ok(mut report) => {
                // Confidence is informational, but the invariant holds here
                // regardless of what a backend hands back.
                report.confidence = report.confidence.min(100);
                self.set_status(ClientStatus::Idle, None);

                let seq = self.seq.fetch_add(1, Ordering::Relaxed);
                let _ = self.scan_tx.send(ScanEvent {
                    seq,
                    report: report.clone(),
                });
                info!(
                    seq,
                    %mode,
                    confidence = report.confidence,
                    "analysis complete"
                );
                Ok(report)
            }
            Err(e) => {
                self.set_status(ClientStatus::Error, Some(e.to_string()));
                warn!(%mode, error = %e, "analysis failed");
                Err(e)
            }
        }
    }

    /// Cancel the pending analysis, if any. Safe to call at any time; a
    /// no-op when nothing is in flight. The awaiting caller observes
    /// `Cancelled` and the model's eventual result is discarded.
    pub fn cancel_pending(&self) {
        if self.in_flight.load(Ordering::SeqCst) {
            self.generation.fetch_add(1, Ordering::SeqCst);
            info!("pending analysis cancelled");
        }
    }

    /// Translate a short phrase. Total: unmapped text or an unknown target
    /// language returns the input unchanged, never an error.
    pub fn translate(&self, text: &str, target: &str) -> String {
        self.model
            .0
            .lock()
            .translate(text, target)
            .unwrap_or_else(|| text.to_string())
    }

    /// `true` while an analysis is pending.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Subscribe to surfaced analysis reports.
    pub fn subscribe_scans(&self) -> broadcast::Receiver<ScanEvent> {
        self.scan_tx.subscribe()
    }

    /// Subscribe to client status transitions.
    pub fn subscribe_status(&self) -> broadcast::Receiver<ClientStatusEvent> {
        self.status_tx.subscribe()
    }

    fn set_status(&self, status: ClientStatus, detail: Option<String>) {
        let _ = self.status_tx.send(ClientStatusEvent { status, detail });
    }
}
