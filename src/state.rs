use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::engine::DEFAULT_QUIESCENT_INTERVAL;
use crate::narration::Block;

pub type CancelFlag = Arc<AtomicBool>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    Idle,
    Speaking,
    Paused,
    Stopped,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::Idle
    }
}

/// Live state of the one reading session
#[derive(Debug, Clone, Serialize)]
pub struct SessionState {
    pub blocks: Vec<Block>,
    pub cursor: usize,
    pub playback: PlaybackState,
    pub voice_id: Option<String>,
    pub rate: f32,
}

impl SessionState {
    pub fn new(rate: f32) -> Self {
        Self {
            blocks: Vec::new(),
            cursor: 0,
            playback: PlaybackState::default(),
            voice_id: None,
            rate,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub tts: TtsSettings,
    pub shortcuts: ShortcutSettings,
    pub general: GeneralSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsSettings {
    /// Voice to use whenever the engine offers it
    pub voice_id: Option<String>,
    pub rate: f32,
    /// Markers matched against voice names and URIs, e.g. "Google"
    pub preferred_providers: Vec<String>,
    /// Language for blocks without a resolvable `lang`
    pub fallback_language: Option<String>,
    pub quiescent_ms: u64,
    /// Pace of the console engine at rate 1.0
    pub words_per_minute: f32,
}

impl TtsSettings {
    pub fn clamped_rate(&self) -> f32 {
        if self.rate.is_finite() {
            self.rate.clamp(0.1, 10.0)
        } else {
            1.0
        }
    }

    pub fn quiescent_interval(&self) -> Duration {
        Duration::from_millis(self.quiescent_ms)
    }
}

impl Default for TtsSettings {
    fn default() -> Self {
        Self {
            voice_id: None,
            rate: 1.0,
            preferred_providers: vec!["Google".to_string()],
            fallback_language: None,
            quiescent_ms: DEFAULT_QUIESCENT_INTERVAL.as_millis() as u64,
            words_per_minute: 180.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShortcutSettings {
    pub toggle_pause: String,
    pub next: String,
    pub previous: String,
    pub stop: String,
    pub toggle_contrast: String,
    pub quit: String,
}

impl Default for ShortcutSettings {
    fn default() -> Self {
        Self {
            toggle_pause: "p".to_string(),
            next: "n".to_string(),
            previous: "b".to_string(),
            stop: "s".to_string(),
            toggle_contrast: "c".to_string(),
            quit: "q".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    pub high_contrast: bool,
}
