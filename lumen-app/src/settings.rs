//! Persistent application settings (JSON file in the user data directory).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use lumen_core::{ScanMode, SpeechOptions};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct AppSettings {
    /// Narration rate. The default is deliberately slow — results are meant
    /// to be listened to, not skimmed.
    pub speech_rate: f32,
    pub speech_pitch: f32,
    /// Serialized `ScanMode` the session starts in.
    pub default_mode: String,
    /// Target language for the `translate` command.
    pub target_language: String,
    pub haptics_enabled: bool,
    /// Simulated canned-model latency. Set to 0 for instant results.
    pub model_latency_ms: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            speech_rate: 0.6,
            speech_pitch: 1.0,
            default_mode: "objects".into(),
            target_language: "es".into(),
            haptics_enabled: true,
            model_latency_ms: 1200,
        }
    }
}

impl AppSettings {
    pub fn normalize(&mut self) {
        self.speech_rate = self.speech_rate.clamp(0.25, 2.0);
        self.speech_pitch = self.speech_pitch.clamp(0.5, 2.0);
        self.default_mode = normalize_mode(&self.default_mode);
        self.target_language = normalize_language(&self.target_language);
        self.model_latency_ms = self.model_latency_ms.min(10_000);
    }

    pub fn default_scan_mode(&self) -> ScanMode {
        ScanMode::parse(&self.default_mode).unwrap_or(ScanMode::Objects)
    }

    pub fn speech_options(&self) -> SpeechOptions {
        SpeechOptions {
            rate: self.speech_rate,
            pitch: self.speech_pitch,
        }
    }
}

fn normalize_mode(raw: &str) -> String {
    match ScanMode::parse(raw) {
        Some(mode) => mode.label().to_ascii_lowercase(),
        None => "objects".into(),
    }
}

fn normalize_language(raw: &str) -> String {
    let lang = raw.trim().to_ascii_lowercase();
    if lang.is_empty() {
        "es".into()
    } else {
        lang
    }
}

pub fn default_settings_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Lumen")
            .join("settings.json")
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                std::env::var_os("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
                    .join(".config")
            })
            .join("lumen")
            .join("settings.json")
    }
}

/// Load settings, falling back to defaults when the file is missing or
/// unreadable. The result is always normalized.
pub fn load_settings(path: &Path) -> AppSettings {
    let mut settings = fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str::<AppSettings>(&raw).ok())
        .unwrap_or_default();
    settings.normalize();
    settings
}

pub fn save_settings(path: &Path, settings: &AppSettings) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating settings directory {}", parent.display()))?;
    }
    let raw = serde_json::to_string_pretty(settings).context("serializing settings")?;
    fs::write(path, raw).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
