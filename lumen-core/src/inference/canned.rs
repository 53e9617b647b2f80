//! `CannedModel` — placeholder backend that narrates from fixed tables.
//!
//! Stands in for the on-device vision model until one is integrated. Picks
//! a description for the requested mode from a small table, reports a
//! confidence in the 85–100 band, and optionally sleeps to simulate model
//! latency so the full client/session path can be exercised end-to-end.
//!
//! Selection randomness comes from the injected `Rng`, so tests construct
//! the model with a seeded generator and get repeatable output.

use std::time::Duration;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::error::Result;
use crate::events::{ScanMode, SceneReport};
use crate::inference::{FrameHandle, SceneModel};

const OBJECT_SCENES: &[&str] = &[
    "A kitchen counter holds a kettle, two mugs and a bowl of fruit. Daylight enters from a window on the right.",
    "Ahead is a desk with an open laptop and a stack of papers. A swivel chair is pushed back from it.",
    "A bicycle leans against a brick wall beside a green door. The pavement in front is clear.",
    "The room contains a sofa facing a low table, with a bookshelf along the far wall.",
];

const TEXT_SCENES: &[&str] = &[
    "Sign reads: Platform 2, trains toward Central Station, next departure 14:05.",
    "Label reads: Oat milk, one litre, best before the twelfth of March.",
    "Notice reads: Lift out of service, please use the stairs at the end of the corridor.",
    "Menu reads: Soup of the day four euros, toasted sandwich six euros, filter coffee two fifty.",
];

const FACE_SCENES: &[&str] = &[
    "One person is facing you from about two metres away, smiling and making eye contact.",
    "Two people are seated at a table to your left, leaning toward each other in conversation.",
    "A person wearing glasses is looking down at a phone. They have not noticed you.",
    "Three people stand in a loose group ahead. The nearest one has turned toward you.",
];

const NAVIGATION_SCENES: &[&str] = &[
    "Clear corridor ahead for roughly eight metres, then a door on the right stands half open.",
    "A staircase with a handrail on both sides begins two steps ahead, going up.",
    "The path narrows between a pillar on your left and a bench on your right. Both are passable.",
    "An open doorway is directly ahead. Beyond it the floor is level with no obstacles detected.",
];

/// Phrase translations the placeholder knows. Lookup is case-insensitive on
/// the phrase; anything else passes through untranslated.
const PHRASES: &[(&str, &[(&str, &str)])] = &[
    ("hello", &[("es", "Hola"), ("fr", "Bonjour"), ("de", "Hallo"), ("it", "Ciao")]),
    ("exit", &[("es", "Salida"), ("fr", "Sortie"), ("de", "Ausgang"), ("it", "Uscita")]),
    ("danger", &[("es", "Peligro"), ("fr", "Danger"), ("de", "Gefahr"), ("it", "Pericolo")]),
    ("help", &[("es", "Ayuda"), ("fr", "Aide"), ("de", "Hilfe"), ("it", "Aiuto")]),
];

/// Canned scene-narration backend.
pub struct CannedModel<R: Rng + Send + 'static> {
    rng: R,
    latency: Duration,
}

impl CannedModel<StdRng> {
    /// Entropy-seeded model with no simulated latency.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            latency: Duration::ZERO,
        }
    }

    /// Deterministic model for tests: same seed, same descriptions.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            latency: Duration::ZERO,
        }
    }
}

impl Default for CannedModel<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng + Send + 'static> CannedModel<R> {
    /// Use a caller-supplied selection source.
    pub fn with_rng(rng: R) -> Self {
        Self {
            rng,
            latency: Duration::ZERO,
        }
    }

    /// Sleep this long inside `describe` to mimic on-device model latency.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn table(mode: ScanMode) -> &'static [&'static str] {
        match mode {
            ScanMode::Objects => OBJECT_SCENES,
            ScanMode::Text => TEXT_SCENES,
            ScanMode::Faces => FACE_SCENES,
            ScanMode::Navigation => NAVIGATION_SCENES,
        }
    }
}

impl<R: Rng + Send + 'static> SceneModel for CannedModel<R> {
    fn warm_up(&mut self) -> Result<()> {
        debug!("CannedModel::warm_up — no-op");
        Ok(())
    }

    fn describe(&mut self, frame: &FrameHandle, mode: ScanMode) -> Result<SceneReport> {
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }

        let table = Self::table(mode);
        let description = table[self.rng.gen_range(0..table.len())];
        let confidence = self.rng.gen_range(85..=100u8);

        debug!(
            source = frame.source(),
            %mode,
            confidence,
            "canned description selected"
        );

        Ok(SceneReport {
            mode,
            description: description.to_string(),
            confidence,
            produced_at: Utc::now(),
            language: Some("en".into()),
        })
    }

    fn translate(&mut self, text: &str, target: &str) -> Option<String> {
        let phrase = text.trim().to_ascii_lowercase();
        let target = target.trim().to_ascii_lowercase();
        PHRASES
            .iter()
            .find(|(key, _)| *key == phrase)
            .and_then(|(_, langs)| langs.iter().find(|(lang, _)| *lang == target))
            .map(|(_, translated)| (*translated).to_string())
    }
}
