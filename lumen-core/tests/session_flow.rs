use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use parking_lot::Mutex;

use lumen_core::{
    ClientConfig, CommandDispatcher, DispatchOutcome, FrameHandle, HistoryFilter, ModelHandle,
    NoHaptics, ScanHistory, ScanMode, ScanSession, SceneModel, SceneReport, SessionConfig,
    Speaker, SpeechBackend, SpeechOptions, StaticFrameSource, UtteranceOutcome, VisionClient,
};

struct SingleSceneModel;

impl SceneModel for SingleSceneModel {
    fn warm_up(&mut self) -> lumen_core::error::Result<()> {
        Ok(())
    }

    fn describe(
        &mut self,
        _frame: &FrameHandle,
        mode: ScanMode,
    ) -> lumen_core::error::Result<SceneReport> {
        Ok(SceneReport {
            mode,
            description: "a doorway three steps ahead".into(),
            confidence: 97,
            produced_at: Utc::now(),
            language: Some("en".into()),
        })
    }

    fn translate(&mut self, text: &str, target: &str) -> Option<String> {
        match (text, target) {
            ("hello", "es") => Some("Hola".into()),
            _ => None,
        }
    }
}

struct TranscriptBackend {
    spoken: Arc<Mutex<Vec<String>>>,
}

impl SpeechBackend for TranscriptBackend {
    fn utter(
        &mut self,
        text: &str,
        _options: &SpeechOptions,
        _interrupted: &dyn Fn() -> bool,
    ) -> UtteranceOutcome {
        self.spoken.lock().push(text.to_string());
        UtteranceOutcome::Completed
    }
}

struct Rig {
    session: Arc<ScanSession>,
    client: Arc<VisionClient>,
    history: Arc<ScanHistory>,
    spoken: Arc<Mutex<Vec<String>>>,
}

fn rig() -> Rig {
    let client = Arc::new(VisionClient::new(
        ClientConfig::default(),
        ModelHandle::new(SingleSceneModel),
    ));
    let spoken = Arc::new(Mutex::new(Vec::new()));
    let speaker = Arc::new(Speaker::new(TranscriptBackend {
        spoken: Arc::clone(&spoken),
    }));
    let history = Arc::new(ScanHistory::new());

    let session = ScanSession::new(
        Arc::clone(&client),
        speaker,
        Arc::new(CommandDispatcher::new()),
        Arc::clone(&history),
        Arc::new(StaticFrameSource::default()),
        Arc::new(NoHaptics),
        SessionConfig::default(),
    );

    Rig {
        session,
        client,
        history,
        spoken,
    }
}

async fn wait_until(timeout: Duration, mut done: impl FnMut() -> bool) {
    let start = Instant::now();
    while !done() {
        if start.elapsed() >= timeout {
            panic!("condition not reached within {timeout:?}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn voice_driven_scan_lands_in_history_and_is_narrated() {
    let rig = rig();

    // Before listening starts, utterances fall through untouched.
    assert_eq!(
        rig.session.hear("scan").expect("hear"),
        DispatchOutcome::Ignored
    );

    assert!(rig.session.toggle_listening());
    let outcome = rig.session.hear("please scan ahead").expect("hear");
    assert_eq!(
        outcome,
        DispatchOutcome::Matched {
            trigger: "scan".into()
        }
    );

    wait_until(Duration::from_secs(2), || {
        rig.history.count(HistoryFilter::All) == 1
    })
    .await;

    let entries = rig.history.filter(HistoryFilter::All);
    assert_eq!(entries[0].report.description, "a doorway three steps ahead");
    assert_eq!(entries[0].report.confidence, 97);

    wait_until(Duration::from_secs(2), || {
        rig.spoken
            .lock()
            .iter()
            .any(|s| s.starts_with("Analysis complete. Confidence 97 percent."))
    })
    .await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn favorites_and_relative_age_round_out_the_history_flow() {
    let rig = rig();

    rig.session.set_location(Some("corridor".into()));
    rig.session.start_scan().await.expect("scan");
    rig.session.start_scan().await.expect("scan");

    let entries = rig.history.filter(HistoryFilter::All);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].location.as_deref(), Some("corridor"));

    rig.history
        .toggle_favorite(entries[0].id)
        .expect("favorite");
    assert_eq!(rig.history.count(HistoryFilter::FavoritesOnly), 1);
    assert_eq!(
        rig.history.count(HistoryFilter::ByMode(ScanMode::Objects)),
        2
    );

    let now = entries[0].report.produced_at + chrono::Duration::minutes(45);
    assert_eq!(entries[0].relative_age(now), "45m ago");

    rig.history.remove(entries[1].id).expect("remove");
    assert_eq!(rig.history.count(HistoryFilter::All), 1);
    assert_eq!(rig.history.clear(), 1);
    assert!(rig.history.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn translation_stays_total_through_the_client() {
    let rig = rig();

    assert_eq!(rig.client.translate("hello", "es"), "Hola");
    assert_eq!(rig.client.translate("goodbye", "es"), "goodbye");
    // Second application passes the translated form through unchanged.
    let once = rig.client.translate("hello", "es");
    assert_eq!(rig.client.translate(&once, "es"), "Hola");
}
