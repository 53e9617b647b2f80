//! Voice-command dispatch.
//!
//! `CommandDispatcher` holds a registered command table and a
//! listening/not-listening state. While listening, recognized utterances are
//! matched against each trigger by case-insensitive substring containment,
//! in registration order, and the first match's action runs exactly once.
//!
//! Substring containment means a trigger can match inside a longer word
//! ("descanso" contains "scan"). That mirrors the matching this dispatcher
//! replaces; callers wanting stricter matching register longer triggers.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::error::{LumenError, Result};
use crate::events::{DispatchEvent, DispatchKind};

const BROADCAST_CAP: usize = 256;

/// One registered voice command.
pub struct VoiceCommand {
    trigger: String,
    description: String,
    action: Box<dyn Fn() + Send + Sync>,
}

impl VoiceCommand {
    pub fn new(
        trigger: impl Into<String>,
        description: impl Into<String>,
        action: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        Self {
            trigger: trigger.into(),
            description: description.into(),
            action: Box::new(action),
        }
    }

    pub fn trigger(&self) -> &str {
        &self.trigger
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl std::fmt::Debug for VoiceCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceCommand")
            .field("trigger", &self.trigger)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// What a `dispatch` call did. `Unrecognized` is a normal outcome, not an
/// error — it carries the triggers a caller can announce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Dispatcher was idle; nothing was matched or invoked.
    Ignored,
    /// A trigger matched and its action ran.
    Matched { trigger: String },
    /// Nothing matched; `available` lists the current triggers.
    Unrecognized { available: Vec<String> },
}

/// Listening-state command table with atomic replacement.
pub struct CommandDispatcher {
    listening: AtomicBool,
    commands: RwLock<Vec<VoiceCommand>>,
    event_tx: broadcast::Sender<DispatchEvent>,
    seq: AtomicU64,
}

impl CommandDispatcher {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(BROADCAST_CAP);
        Self {
            listening: AtomicBool::new(false),
            commands: RwLock::new(Vec::new()),
            event_tx,
            seq: AtomicU64::new(0),
        }
    }

    /// Replace the whole command table. Not additive: the previous set is
    /// gone after this returns, and no dispatch observes a partial table.
    /// Commands with blank triggers are dropped.
    pub fn register_commands(&self, commands: Vec<VoiceCommand>) {
        let mut accepted = Vec::with_capacity(commands.len());
        for command in commands {
            if command.trigger.trim().is_empty() {
                warn!("dropping voice command with blank trigger");
                continue;
            }
            accepted.push(command);
        }
        info!(count = accepted.len(), "voice command table replaced");
        *self.commands.write() = accepted;
    }

    /// Enter the listening state. Idempotent — a redundant call re-emits the
    /// `Listening` event so hosts can re-announce.
    pub fn start_listening(&self) {
        self.listening.store(true, Ordering::SeqCst);
        self.emit(DispatchKind::Listening { active: true });
    }

    /// Leave the listening state. Idempotent, like `start_listening`.
    pub fn stop_listening(&self) {
        self.listening.store(false, Ordering::SeqCst);
        self.emit(DispatchKind::Listening { active: false });
    }

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }

    /// Triggers of the current table, in registration order.
    pub fn available_triggers(&self) -> Vec<String> {
        self.commands
            .read()
            .iter()
            .map(|c| c.trigger.clone())
            .collect()
    }

    /// Match `utterance` against the registered triggers.
    ///
    /// While idle this is always a no-op, whatever the input. While
    /// listening, a blank utterance is the one hard error; everything else
    /// resolves to `Matched` or `Unrecognized`.
    ///
    /// The matched action runs on the caller's thread while the table is
    /// read-locked, so actions must not re-register commands from inside
    /// the callback — hand off to a channel instead.
    pub fn dispatch(&self, utterance: &str) -> Result<DispatchOutcome> {
        if !self.is_listening() {
            debug!("dispatch ignored — not listening");
            return Ok(DispatchOutcome::Ignored);
        }

        let trimmed = utterance.trim();
        if trimmed.is_empty() {
            return Err(LumenError::MalformedInput(
                "utterance must contain text".into(),
            ));
        }
        let lowered = trimmed.to_lowercase();

        let commands = self.commands.read();
        for command in commands.iter() {
            if lowered.contains(&command.trigger.to_lowercase()) {
                info!(trigger = %command.trigger, "voice command matched");
                (command.action)();
                let trigger = command.trigger.clone();
                self.emit(DispatchKind::Matched {
                    trigger: trigger.clone(),
                });
                return Ok(DispatchOutcome::Matched { trigger });
            }
        }

        let available: Vec<String> = commands.iter().map(|c| c.trigger.clone()).collect();
        debug!(?available, "utterance not recognized");
        self.emit(DispatchKind::Unrecognized {
            available: available.clone(),
        });
        Ok(DispatchOutcome::Unrecognized { available })
    }

    /// Subscribe to listening-state changes and dispatch outcomes.
    pub fn subscribe(&self) -> broadcast::Receiver<DispatchEvent> {
        self.event_tx.subscribe()
    }

    fn emit(&self, kind: DispatchKind) {
        let _ = self.event_tx.send(DispatchEvent {
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            kind,
        });
    }
}

impl Default for CommandDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
