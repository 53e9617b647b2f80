//! `ScanSession` — orchestration above the individual services.
//!
//! One session wires the vision client, speaker, command dispatcher and
//! history together and owns the user-facing flow: start/stop a scan with
//! spoken narration, change modes with guidance, toggle voice commands,
//! and map hardware button presses onto scan control.
//!
//! Everything is constructed explicitly and passed in by the composition
//! root — no static accessors, so tests assemble a session from fakes.
//!
//! Voice-command callbacks must stay zero-argument and synchronous, so the
//! registered actions only enqueue a `SessionAction`; a task spawned at
//! construction drains the queue and drives the async calls.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::client::VisionClient;
use crate::commands::{CommandDispatcher, DispatchOutcome, VoiceCommand};
use crate::controls::{ButtonPress, FrameSource, HapticFeedback};
use crate::error::{LumenError, Result};
use crate::events::{ScanMode, SceneReport};
use crate::history::ScanHistory;
use crate::speech::{Speaker, SpeechOptions};

/// Session tuning supplied by the host.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Mode the session starts in.
    pub initial_mode: ScanMode,
    /// Delivery options for every session announcement.
    pub speech: SpeechOptions,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            initial_mode: ScanMode::Objects,
            speech: SpeechOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum SessionAction {
    StartScan,
    StopScan,
    RepeatLast,
}

/// One user-facing narration session.
pub struct ScanSession {
    client: Arc<VisionClient>,
    speaker: Arc<Speaker>,
    dispatcher: Arc<CommandDispatcher>,
    history: Arc<ScanHistory>,
    frames: Arc<dyn FrameSource>,
    haptics: Arc<dyn HapticFeedback>,
    mode: Mutex<ScanMode>,
    location: Mutex<Option<String>>,
    last_description: Mutex<Option<String>>,
    speech: SpeechOptions,
    action_tx: mpsc::UnboundedSender<SessionAction>,
}

impl ScanSession {
    /// Assemble a session and spawn its action-queue task. Must be called
    /// from within a Tokio runtime.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        client: Arc<VisionClient>,
        speaker: Arc<Speaker>,
        dispatcher: Arc<CommandDispatcher>,
        history: Arc<ScanHistory>,
        frames: Arc<dyn FrameSource>,
        haptics: Arc<dyn HapticFeedback>,
        config: SessionConfig,
    ) -> Arc<Self> {
        let (action_tx, action_rx) = mpsc::unbounded_channel();

        let session = Arc::new(Self {
            client,
            speaker,
            dispatcher,
            history,
            frames,
            haptics,
            mode: Mutex::new(config.initial_mode),
            location: Mutex::new(None),
            last_description: Mutex::new(None),
            speech: config.speech,
            action_tx,
        });

        session.spawn_action_loop(action_rx);
        session
    }

    fn spawn_action_loop(self: &Arc<Self>, mut rx: mpsc::UnboundedReceiver<SessionAction>) {
        // Weak so the task never keeps the session alive on its own.
        let session = Arc::downgrade(self);
        tokio::spawn(async move {
            while let Some(action) = rx.recv().await {
                let Some(session) = session.upgrade() else { break };
                match action {
                    // Scans run in their own task so a StopScan queued behind
                    // this action can still cancel it mid-flight.
                    SessionAction::StartScan => {
                        tokio::spawn(async move {
                            if let Err(e) = session.start_scan().await {
                                debug!(error = %e, "queued scan did not complete");
                            }
                        });
                    }
                    SessionAction::StopScan => session.stop_scan(),
                    SessionAction::RepeatLast => session.repeat_last(),
                }
            }
            debug!("session action loop ended");
        });
    }

    /// Current scan mode.
    pub fn mode(&self) -> ScanMode {
        *self.mode.lock()
    }

    /// Switch modes with a haptic pulse and spoken guidance.
    pub fn set_mode(&self, mode: ScanMode) {
        *self.mode.lock() = mode;
        self.haptics.pulse();
        info!(%mode, "scan mode changed");
        self.announce(mode_guidance(mode));
    }

    /// Free-text place tag attached to subsequent history entries.
    pub fn set_location(&self, location: Option<String>) {
        *self.location.lock() = location;
    }

    /// Capture a frame and run one analysis in the current mode, narrating
    /// the outcome and recording it into history.
    ///
    /// # Errors
    /// - `LumenError::ScanInFlight` if an analysis is already running
    ///   (nothing is announced over the active scan).
    /// - `LumenError::Cancelled` if the scan was stopped mid-flight.
    /// - `LumenError::Inference` if the model fails; a spoken retry prompt
    ///   has already been issued.
    pub async fn start_scan(&self) -> Result<SceneReport> {
        if self.client.is_busy() {
            return Err(LumenError::ScanInFlight);
        }

        let mode = self.mode();
        self.haptics.pulse();
        self.announce(format!(
            "Starting {} analysis. Hold the camera steady.",
            mode.label()
        ));

        let frame = self.frames.capture()?;
        match self.client.describe(frame, mode).await {
            Ok(report) => {
                *self.last_description.lock() = Some(report.description.clone());
                let location = self.location.lock().clone();
                self.history.record(report.clone(), location);
                self.announce(format!(
                    "Analysis complete. Confidence {} percent. {}",
                    report.confidence, report.description
                ));
                Ok(report)
            }
            Err(LumenError::ScanInFlight) => Err(LumenError::ScanInFlight),
            Err(LumenError::Cancelled) => {
                self.announce("Scan stopped.");
                Err(LumenError::Cancelled)
            }
            Err(e) => {
                warn!(error = %e, "scan failed");
                self.announce("Analysis failed. Please try again.");
                Err(e)
            }
        }
    }

    /// Stop the active scan, if any. The awaiting `start_scan` call narrates
    /// the cancellation; with nothing in flight this announces directly.
    pub fn stop_scan(&self) {
        self.haptics.pulse();
        if self.client.is_busy() {
            self.client.cancel_pending();
        } else {
            self.announce("Scan stopped.");
        }
    }

    /// Speak the last analysis result again. Silent when there is none yet.
    pub fn repeat_last(&self) {
        let last = self.last_description.lock().clone();
        match last {
            Some(description) => self.announce(description),
            None => debug!("repeat requested with no prior result"),
        }
    }

    /// Most recent narrated description, if any.
    pub fn last_description(&self) -> Option<String> {
        self.last_description.lock().clone()
    }

    /// Flip voice-command listening. Activation registers the session's
    /// command set (scan / stop / repeat) fresh each time. Returns the new
    /// listening state.
    pub fn toggle_listening(&self) -> bool {
        self.haptics.pulse();
        if self.dispatcher.is_listening() {
            self.dispatcher.stop_listening();
            self.announce("Voice commands deactivated.");
            false
        } else {
            self.dispatcher.register_commands(self.voice_commands());
            self.dispatcher.start_listening();
            self.announce(
                "Voice commands activated. Say scan to start, stop to end, \
                 or repeat to hear the last result again.",
            );
            true
        }
    }

    /// Feed one recognized utterance through the dispatcher and narrate the
    /// outcome.
    pub fn hear(&self, utterance: &str) -> Result<DispatchOutcome> {
        let outcome = self.dispatcher.dispatch(utterance)?;
        match &outcome {
            DispatchOutcome::Ignored => {}
            DispatchOutcome::Matched { trigger } => {
                self.announce(format!("Command recognized: {trigger}."));
            }
            DispatchOutcome::Unrecognized { available } => {
                if available.is_empty() {
                    self.announce("Command not recognized. No commands are registered.");
                } else {
                    self.announce(format!(
                        "Command not recognized. Available commands are: {}.",
                        available.join(", ")
                    ));
                }
            }
        }
        Ok(outcome)
    }

    /// Map a hardware button press onto scan control: volume up starts a
    /// scan, volume down stops the one in flight.
    pub fn handle_button(&self, press: ButtonPress) {
        match press {
            ButtonPress::VolumeUp => {
                if !self.client.is_busy() {
                    let _ = self.action_tx.send(SessionAction::StartScan);
                }
            }
            ButtonPress::VolumeDown => {
                if self.client.is_busy() {
                    let _ = self.action_tx.send(SessionAction::StopScan);
                }
            }
        }
    }

    fn voice_commands(&self) -> Vec<VoiceCommand> {
        let scan_tx = self.action_tx.clone();
        let stop_tx = self.action_tx.clone();
        let repeat_tx = self.action_tx.clone();
        vec![
            VoiceCommand::new("scan", "Start scene analysis", move || {
                let _ = scan_tx.send(SessionAction::StartScan);
            }),
            VoiceCommand::new("stop", "Stop the current scan", move || {
                let _ = stop_tx.send(SessionAction::StopScan);
            }),
            VoiceCommand::new("repeat", "Repeat the last result", move || {
                let _ = repeat_tx.send(SessionAction::RepeatLast);
            }),
        ]
    }

    fn announce(&self, text: impl Into<String>) {
        if let Err(e) = self.speaker.speak(text, self.speech) {
            warn!(error = %e, "announcement dropped");
        }
    }
}

fn mode_guidance(mode: ScanMode) -> &'static str {
    match mode {
        ScanMode::Objects => {
            "Objects mode selected. Point the camera at objects or rooms for a description."
        }
        ScanMode::Text => {
            "Text mode selected. Point the camera at signs, labels or menus to have them read aloud."
        }
        ScanMode::Faces => {
            "Faces mode selected. Point the camera toward people to hear who is there."
        }
        ScanMode::Navigation => {
            "Navigation mode selected. Point the camera ahead for spatial guidance and obstacles."
        }
    }
}
