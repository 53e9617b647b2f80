//! `PacedBackend` — platform-free speech sink.
//!
//! Stands in for a real platform TTS engine: paces itself by word count
//! scaled by the requested rate, polling the interrupt probe between slices
//! so stop / supersede take effect mid-utterance. Hosts with real audio
//! output implement `SpeechBackend` against their platform engine instead.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::speech::{SpeechBackend, SpeechOptions, UtteranceOutcome};

/// Milliseconds of simulated playback per word at rate 1.0.
const DEFAULT_MS_PER_WORD: u64 = 300;

/// Interrupt-probe polling interval.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone)]
pub struct PacedBackend {
    ms_per_word: u64,
}

impl PacedBackend {
    pub fn new() -> Self {
        Self {
            ms_per_word: DEFAULT_MS_PER_WORD,
        }
    }

    /// Override the per-word pace (tests use small values).
    pub fn with_ms_per_word(ms_per_word: u64) -> Self {
        Self { ms_per_word }
    }
}

impl Default for PacedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechBackend for PacedBackend {
    fn utter(
        &mut self,
        text: &str,
        options: &SpeechOptions,
        interrupted: &dyn Fn() -> bool,
    ) -> UtteranceOutcome {
        let words = text.split_whitespace().count().max(1) as u64;
        let rate = options.rate.clamp(0.1, 4.0);
        let total = Duration::from_millis(words * self.ms_per_word).div_f32(rate);

        debug!(
            words,
            rate,
            duration_ms = total.as_millis() as u64,
            "pacing utterance"
        );

        let start = Instant::now();
        loop {
            let remaining = total.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                return UtteranceOutcome::Completed;
            }
            if interrupted() {
                return UtteranceOutcome::Interrupted;
            }
            std::thread::sleep(POLL_INTERVAL.min(remaining));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completes_when_never_interrupted() {
        let mut backend = PacedBackend::with_ms_per_word(1);
        let outcome = backend.utter("a few short words", &SpeechOptions::default(), &|| false);
        assert_eq!(outcome, UtteranceOutcome::Completed);
    }

    #[test]
    fn interrupts_promptly_on_long_text() {
        let mut backend = PacedBackend::with_ms_per_word(500);
        let start = Instant::now();
        let outcome = backend.utter(
            "this utterance would take many seconds to finish",
            &SpeechOptions::default(),
            &|| true,
        );
        assert_eq!(outcome, UtteranceOutcome::Interrupted);
        assert!(start.elapsed() < Duration::from_millis(200));
    }

    #[test]
    fn higher_rate_shortens_playback() {
        let mut backend = PacedBackend::with_ms_per_word(40);
        let options = SpeechOptions {
            rate: 4.0,
            ..SpeechOptions::default()
        };
        let start = Instant::now();
        backend.utter("one two three four", &options, &|| false);
        // 4 words * 40 ms / rate 4.0 = 40 ms nominal.
        assert!(start.elapsed() < Duration::from_millis(150));
    }
}
