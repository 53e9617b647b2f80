//! Lumen console host entry point.
//!
//! Composition root for the core services: everything is constructed once
//! here and handed to the session by reference — no globals. The stdin loop
//! stands in for the touch UI and hardware integrations: typed commands
//! simulate taps, recognized utterances and volume-key presses.

mod settings;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use lumen_core::{
    ButtonPress, CannedModel, ClientConfig, CommandDispatcher, HapticFeedback, HistoryFilter,
    ModelHandle, NoHaptics, PacedBackend, ScanHistory, ScanMode, ScanSession, SessionConfig,
    Speaker, StaticFrameSource, VisionClient,
};

/// Haptic hook for a machine without a vibration motor: log the pulse so
/// the timing is still visible while driving the session from a terminal.
struct ConsoleHaptics;

impl HapticFeedback for ConsoleHaptics {
    fn pulse(&self) {
        info!("haptic pulse");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings_path = settings::default_settings_path();
    let settings = settings::load_settings(&settings_path);
    info!(
        path = %settings_path.display(),
        rate = settings.speech_rate,
        mode = %settings.default_mode,
        "settings loaded"
    );
    // Write the normalized form back so a first run leaves an editable file.
    if let Err(e) = settings::save_settings(&settings_path, &settings) {
        warn!(error = %e, "could not persist settings");
    }

    // ── Composition root ────────────────────────────────────────────────
    let model = CannedModel::new()
        .with_latency(Duration::from_millis(settings.model_latency_ms));
    let client = Arc::new(VisionClient::new(
        ClientConfig::default(),
        ModelHandle::new(model),
    ));
    client.warm_up()?;

    let speaker = Arc::new(Speaker::new(PacedBackend::new()));
    let dispatcher = Arc::new(CommandDispatcher::new());
    let history = Arc::new(ScanHistory::new());
    let haptics: Arc<dyn HapticFeedback> = if settings.haptics_enabled {
        Arc::new(ConsoleHaptics)
    } else {
        Arc::new(NoHaptics)
    };

    let session = ScanSession::new(
        Arc::clone(&client),
        Arc::clone(&speaker),
        Arc::clone(&dispatcher),
        Arc::clone(&history),
        Arc::new(StaticFrameSource::new("console://frame")),
        haptics,
        SessionConfig {
            initial_mode: settings.default_scan_mode(),
            speech: settings.speech_options(),
        },
    );

    spawn_event_loggers(&client, &speaker, &dispatcher);

    println!("lumen ready — type `help` for commands");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (cmd, rest) = line.split_once(' ').unwrap_or((line, ""));

        match cmd {
            "scan" => {
                let session = Arc::clone(&session);
                tokio::spawn(async move {
                    if let Err(e) = session.start_scan().await {
                        warn!(error = %e, "scan did not complete");
                    }
                });
            }
            "stop" => session.stop_scan(),
            "mode" => match ScanMode::parse(rest) {
                Some(mode) => session.set_mode(mode),
                None => println!("unknown mode `{rest}` — try objects, text, faces, navigation"),
            },
            "listen" => {
                let active = session.toggle_listening();
                println!("voice commands {}", if active { "on" } else { "off" });
            }
            "say" => match session.hear(rest) {
                Ok(outcome) => println!("{outcome:?}"),
                Err(e) => println!("dispatch error: {e}"),
            },
            "repeat" => session.repeat_last(),
            "up" => session.handle_button(ButtonPress::VolumeUp),
            "down" => session.handle_button(ButtonPress::VolumeDown),
            "quiet" => speaker.stop(),
            "where" => session.set_location(if rest.is_empty() {
                None
            } else {
                Some(rest.to_string())
            }),
            "history" => print_history(&history),
            "favorite" => with_displayed_entry(&history, rest, |h, id| match h.toggle_favorite(id) {
                Ok(state) => println!("favorite: {state}"),
                Err(e) => println!("{e}"),
            }),
            "delete" => with_displayed_entry(&history, rest, |h, id| match h.remove(id) {
                Ok(()) => println!("deleted"),
                Err(e) => println!("{e}"),
            }),
            "clear" => {
                let dropped = history.clear();
                println!("cleared {dropped} entries");
            }
            "translate" => {
                println!("{}", client.translate(rest, &settings.target_language));
            }
            "help" => print_help(),
            "quit" | "exit" => break,
            other => println!("unknown command `{other}` — type `help`"),
        }
    }

    speaker.stop();
    info!("goodbye");
    Ok(())
}

fn spawn_event_loggers(
    client: &Arc<VisionClient>,
    speaker: &Arc<Speaker>,
    dispatcher: &Arc<CommandDispatcher>,
) {
    let mut scans = client.subscribe_scans();
    tokio::spawn(async move {
        loop {
            match scans.recv().await {
                Ok(ev) => info!(
                    seq = ev.seq,
                    mode = %ev.report.mode,
                    confidence = ev.report.confidence,
                    "scan complete"
                ),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "scan events lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut status = client.subscribe_status();
    tokio::spawn(async move {
        loop {
            match status.recv().await {
                Ok(ev) => info!(status = ?ev.status, detail = ?ev.detail, "client status"),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "status events lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut speech = speaker.subscribe();
    tokio::spawn(async move {
        loop {
            match speech.recv().await {
                Ok(ev) => info!(
                    utterance_id = ev.utterance_id,
                    state = ?ev.state,
                    "speech"
                ),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "speech events lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut dispatches = dispatcher.subscribe();
    tokio::spawn(async move {
        loop {
            match dispatches.recv().await {
                Ok(ev) => info!(seq = ev.seq, kind = ?ev.kind, "dispatch"),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "dispatch events lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });
}

/// Most-recent-first listing, numbered for `favorite N` / `delete N`.
fn print_history(history: &ScanHistory) {
    let entries = history.filter(HistoryFilter::All);
    if entries.is_empty() {
        println!("no scan history");
        return;
    }
    let now = Utc::now();
    for (i, entry) in entries.iter().rev().enumerate() {
        let star = if entry.is_favorite { "*" } else { " " };
        let location = entry
            .location
            .as_deref()
            .map(|l| format!(" @ {l}"))
            .unwrap_or_default();
        println!(
            "{:>2}.{star} [{}] {} ({}%{location}) — {}",
            i + 1,
            entry.report.mode,
            entry.relative_age(now),
            entry.report.confidence,
            entry.report.description,
        );
    }
}

/// Resolve a 1-based index from the displayed (most-recent-first) listing
/// and run `action` on that entry's id.
fn with_displayed_entry(
    history: &Arc<ScanHistory>,
    rest: &str,
    action: impl FnOnce(&ScanHistory, uuid::Uuid),
) {
    let Ok(n) = rest.trim().parse::<usize>() else {
        println!("expected an entry number");
        return;
    };
    let entries = history.filter(HistoryFilter::All);
    match n
        .checked_sub(1)
        .and_then(|i| entries.iter().rev().nth(i))
    {
        Some(entry) => action(history, entry.id),
        None => println!("no entry {n}"),
    }
}

fn print_help() {
    println!(
        "\
commands:
  scan             start an analysis in the current mode
  stop             cancel the analysis in flight
  mode <m>         objects | text | faces | navigation
  listen           toggle voice commands
  say <utterance>  feed a recognized utterance to the dispatcher
  repeat           speak the last result again
  up / down        simulate the volume keys
  quiet            stop speech output
  where <place>    tag future scans with a location (empty to clear)
  history          list saved results, newest first
  favorite <n>     toggle favorite on entry n
  delete <n>       delete entry n
  clear            delete all history
  translate <text> translate via the configured target language
  quit             exit"
    );
}
