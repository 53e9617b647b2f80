//! Speech output with exclusive playback.
//!
//! `Speaker` owns a single `SpeechBackend` on a dedicated worker thread fed
//! by a channel. The exclusivity invariant: at most one utterance is audible
//! at a time. `speak` is last-call-wins — a newer request interrupts the
//! active utterance and supersedes anything still queued — and `stop` is
//! safe to call at any moment, including when nothing is speaking.
//!
//! Backends are the capability seam for platform speech engines: "something
//! that can speak text and report completion". They poll an interrupt probe
//! between slices of work so cancellation takes effect mid-utterance.

pub mod paced;

pub use paced::PacedBackend;

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::error::{LumenError, Result};
use crate::events::{SpeechEvent, UtteranceState};

const BROADCAST_CAP: usize = 256;

/// Delivery options for one utterance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechOptions {
    /// Speaking rate multiplier. 1.0 = the backend's natural pace.
    pub rate: f32,
    /// Pitch multiplier. Forwarded to backends that support it.
    pub pitch: f32,
}

impl Default for SpeechOptions {
    fn default() -> Self {
        Self {
            rate: 1.0,
            pitch: 1.0,
        }
    }
}

/// How one utterance ended, from the backend's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UtteranceOutcome {
    Completed,
    Interrupted,
}

/// Contract for speech synthesis backends.
pub trait SpeechBackend: Send + 'static {
    /// Speak `text` to completion or until `interrupted` returns `true`.
    ///
    /// Implementations must poll `interrupted` often enough that a stop or
    /// a superseding utterance cuts playback promptly.
    fn utter(
        &mut self,
        text: &str,
        options: &SpeechOptions,
        interrupted: &dyn Fn() -> bool,
    ) -> UtteranceOutcome;
}

struct Job {
    id: u64,
    text: String,
    options: SpeechOptions,
}

/// Exclusive-playback speech service.
///
/// Dropping the `Speaker` closes the job channel; the worker thread drains
/// and exits on its own.
pub struct Speaker {
    job_tx: crossbeam_channel::Sender<Job>,
    /// Id of the utterance currently allowed to play. 0 = none.
    current: Arc<AtomicU64>,
    /// `true` while the backend is inside `utter`.
    active: Arc<AtomicBool>,
    next_id: AtomicU64,
    event_tx: broadcast::Sender<SpeechEvent>,
}

impl Speaker {
    /// Spawn the worker thread around `backend`.
    pub fn new<B: SpeechBackend>(backend: B) -> Self {
        let (job_tx, job_rx) = crossbeam_channel::unbounded::<Job>();
        let current = Arc::new(AtomicU64::new(0));
        let active = Arc::new(AtomicBool::new(false));
        let (event_tx, _) = broadcast::channel(BROADCAST_CAP);
        let seq = AtomicU64::new(0);

        {
            let current = Arc::clone(&current);
            let active = Arc::clone(&active);
            let event_tx = event_tx.clone();
            std::thread::spawn(move || {
                let mut backend = backend;
                let emit = |utterance_id: u64, state: UtteranceState| {
                    let _ = event_tx.send(SpeechEvent {
                        seq: seq.fetch_add(1, Ordering::Relaxed),
                        utterance_id,
                        state,
                    });
                };

                for job in job_rx {
                    if current.load(Ordering::SeqCst) != job.id {
                        // Superseded (or stopped) before playback began.
                        emit(job.id, UtteranceState::Interrupted);
                        continue;
                    }

                    emit(job.id, UtteranceState::Started);
                    debug!(utterance_id = job.id, "utterance started");

                    active.store(true, Ordering::SeqCst);
                    let probe = || current.load(Ordering::SeqCst) != job.id;
                    let outcome = backend.utter(&job.text, &job.options, &probe);
                    active.store(false, Ordering::SeqCst);

                    match outcome {
                        UtteranceOutcome::Completed => {
                            emit(job.id, UtteranceState::Finished);
                        }
                        UtteranceOutcome::Interrupted => {
                            debug!(utterance_id = job.id, "utterance interrupted");
                            emit(job.id, UtteranceState::Interrupted);
                        }
                    }
                }
            });
        }

        Self {
            job_tx,
            current,
            active,
            next_id: AtomicU64::new(0),
            event_tx,
        }
    }

    /// Queue `text` for playback, interrupting whatever is audible.
    ///
    /// Fire-and-forget: returns the utterance id immediately; completion is
    /// reported on the event channel.
    ///
    /// # Errors
    /// `LumenError::SpeechUnavailable` if the worker thread has exited.
    pub fn speak(&self, text: impl Into<String>, options: SpeechOptions) -> Result<u64> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.current.store(id, Ordering::SeqCst);
        self.job_tx
            .send(Job {
                id,
                text: text.into(),
                options,
            })
            .map_err(|_| {
                warn!("speech worker gone — utterance dropped");
                LumenError::SpeechUnavailable
            })?;
        Ok(id)
    }

    /// Cut playback. Interrupts the active utterance and discards anything
    /// queued. A no-op when nothing is speaking — never an error.
    pub fn stop(&self) {
        self.current.store(0, Ordering::SeqCst);
    }

    /// `true` while the backend is mid-utterance.
    pub fn is_speaking(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Subscribe to utterance lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<SpeechEvent> {
        self.event_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::thread;
    use std::time::{Duration, Instant};

    use parking_lot::Mutex;
    use tokio::sync::broadcast::error::TryRecvError;

    /// Backend that paces itself and records how each utterance ended.
    struct RecordingBackend {
        per_utterance: Duration,
        log: Arc<Mutex<Vec<(String, UtteranceOutcome)>>>,
    }

    impl SpeechBackend for RecordingBackend {
        fn utter(
            &mut self,
            text: &str,
            _options: &SpeechOptions,
            interrupted: &dyn Fn() -> bool,
        ) -> UtteranceOutcome {
            let start = Instant::now();
            while start.elapsed() < self.per_utterance {
                if interrupted() {
                    self.log
                        .lock()
                        .push((text.to_string(), UtteranceOutcome::Interrupted));
                    return UtteranceOutcome::Interrupted;
                }
                thread::sleep(Duration::from_millis(2));
            }
            self.log
                .lock()
                .push((text.to_string(), UtteranceOutcome::Completed));
            UtteranceOutcome::Completed
        }
    }

    fn recording_speaker(
        per_utterance: Duration,
    ) -> (Speaker, Arc<Mutex<Vec<(String, UtteranceOutcome)>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let speaker = Speaker::new(RecordingBackend {
            per_utterance,
            log: Arc::clone(&log),
        });
        (speaker, log)
    }

    fn wait_for_event(
        rx: &mut broadcast::Receiver<SpeechEvent>,
        timeout: Duration,
        mut want: impl FnMut(&SpeechEvent) -> bool,
    ) -> SpeechEvent {
        let start = Instant::now();
        loop {
            match rx.try_recv() {
                Ok(ev) if want(&ev) => return ev,
                Ok(_) => continue,
                Err(TryRecvError::Empty) => {
                    if start.elapsed() >= timeout {
                        panic!("timed out waiting for speech event");
                    }
                    thread::sleep(Duration::from_millis(5));
                }
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Closed) => panic!("speech channel closed unexpectedly"),
            }
        }
    }

    #[test]
    fn single_utterance_completes() {
        let (speaker, log) = recording_speaker(Duration::from_millis(20));
        let mut events = speaker.subscribe();

        let id = speaker.speak("hello there", SpeechOptions::default()).expect("speak");
        let finished = wait_for_event(&mut events, Duration::from_secs(2), |ev| {
            ev.state == UtteranceState::Finished
        });
        assert_eq!(finished.utterance_id, id);
        assert_eq!(
            &*log.lock(),
            &[("hello there".to_string(), UtteranceOutcome::Completed)]
        );
    }

    #[test]
    fn newer_utterance_interrupts_the_active_one() {
        let (speaker, log) = recording_speaker(Duration::from_millis(150));
        let mut events = speaker.subscribe();

        let a = speaker.speak("A", SpeechOptions::default()).expect("speak A");
        // Let A start before superseding it.
        wait_for_event(&mut events, Duration::from_secs(2), |ev| {
            ev.state == UtteranceState::Started && ev.utterance_id == a
        });
        let b = speaker.speak("B", SpeechOptions::default()).expect("speak B");

        wait_for_event(&mut events, Duration::from_secs(2), |ev| {
            ev.state == UtteranceState::Finished && ev.utterance_id == b
        });

        let log = log.lock();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0], ("A".to_string(), UtteranceOutcome::Interrupted));
        assert_eq!(log[1], ("B".to_string(), UtteranceOutcome::Completed));
    }

    #[test]
    fn rapid_fire_speaks_complete_only_the_last() {
        let (speaker, log) = recording_speaker(Duration::from_millis(60));
        let mut events = speaker.subscribe();

        speaker.speak("first", SpeechOptions::default()).expect("speak");
        speaker.speak("second", SpeechOptions::default()).expect("speak");
        let last = speaker.speak("third", SpeechOptions::default()).expect("speak");

        wait_for_event(&mut events, Duration::from_secs(2), |ev| {
            ev.state == UtteranceState::Finished && ev.utterance_id == last
        });

        let log = log.lock();
        let completed: Vec<_> = log
            .iter()
            .filter(|(_, outcome)| *outcome == UtteranceOutcome::Completed)
            .collect();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].0, "third");
    }

    #[test]
    fn stop_interrupts_active_utterance() {
        let (speaker, log) = recording_speaker(Duration::from_millis(200));
        let mut events = speaker.subscribe();

        let id = speaker.speak("long announcement", SpeechOptions::default()).expect("speak");
        wait_for_event(&mut events, Duration::from_secs(2), |ev| {
            ev.state == UtteranceState::Started && ev.utterance_id == id
        });
        speaker.stop();

        let ended = wait_for_event(&mut events, Duration::from_secs(2), |ev| {
            ev.utterance_id == id && ev.state != UtteranceState::Started
        });
        assert_eq!(ended.state, UtteranceState::Interrupted);
        assert_eq!(log.lock()[0].1, UtteranceOutcome::Interrupted);
    }

    #[test]
    fn stop_while_idle_is_a_no_op() {
        let (speaker, log) = recording_speaker(Duration::from_millis(10));
        let mut events = speaker.subscribe();

        speaker.stop();
        speaker.stop();

        // Still fully usable afterwards.
        let id = speaker.speak("after stop", SpeechOptions::default()).expect("speak");
        let finished = wait_for_event(&mut events, Duration::from_secs(2), |ev| {
            ev.state == UtteranceState::Finished
        });
        assert_eq!(finished.utterance_id, id);
        assert_eq!(log.lock().len(), 1);
    }

    #[test]
    fn utterance_ids_are_unique_and_increasing() {
        let (speaker, _log) = recording_speaker(Duration::from_millis(1));
        let a = speaker.speak("one", SpeechOptions::default()).expect("speak");
        let b = speaker.speak("two", SpeechOptions::default()).expect("speak");
        let c = speaker.speak("three", SpeechOptions::default()).expect("speak");
        assert!(a < b && b < c);
    }
}
