#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::bail;
use read_from_here_lib::document::markdown::parse_markdown;
use read_from_here_lib::document::TextTree;
use read_from_here_lib::engine::{
    EngineEvent, EngineEventReceiver, SpeechEngine, UtteranceId, UtteranceRequest, Voice,
};
use read_from_here_lib::session::{UiEvent, UiReceiver, UiSink};
use read_from_here_lib::state::Settings;
use read_from_here_lib::ReadingSession;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Speak {
        id: UtteranceId,
        text: String,
        voice: Option<String>,
        language: Option<String>,
    },
    Cancel,
    Pause,
    Resume,
}

#[derive(Debug, Default)]
pub struct EngineLog {
    pub calls: Vec<Call>,
    pub speaking: bool,
    pub paused: bool,
    /// Speak calls made while another utterance was still playing
    pub overlaps: usize,
}

/// Records every call; the test decides when utterances end.
#[derive(Clone, Default)]
pub struct MockEngine {
    pub log: Arc<Mutex<EngineLog>>,
    voices: Arc<Mutex<Vec<Voice>>>,
    failing: Arc<Mutex<Vec<String>>>,
}

impl MockEngine {
    pub fn with_voices(voices: Vec<Voice>) -> Self {
        let engine = Self::default();
        *engine.voices.lock().unwrap() = voices;
        engine
    }

    pub fn fail_on(&self, text: &str) {
        self.failing.lock().unwrap().push(text.to_string());
    }

    pub fn set_voices(&self, voices: Vec<Voice>) {
        *self.voices.lock().unwrap() = voices;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.log.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.log.lock().unwrap().calls.clear();
    }

    pub fn spoken(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Speak { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn last_voice(&self) -> Option<String> {
        self.calls().into_iter().rev().find_map(|call| match call {
            Call::Speak { voice, .. } => Some(voice),
            _ => None,
        })?
    }

    pub fn overlaps(&self) -> usize {
        self.log.lock().unwrap().overlaps
    }

    /// The engine finished on its own.
    pub fn finish(&self) {
        let mut log = self.log.lock().unwrap();
        log.speaking = false;
        log.paused = false;
    }
}

impl SpeechEngine for MockEngine {
    fn list_voices(&self) -> Vec<Voice> {
        self.voices.lock().unwrap().clone()
    }

    fn speak(&mut self, request: &UtteranceRequest) -> anyhow::Result<()> {
        if self.failing.lock().unwrap().contains(&request.text) {
            bail!("voice unavailable");
        }
        let mut log = self.log.lock().unwrap();
        if log.speaking {
            log.overlaps += 1;
        }
        log.speaking = true;
        log.paused = false;
        log.calls.push(Call::Speak {
            id: request.id,
            text: request.text.clone(),
            voice: request.voice_id.clone(),
            language: request.language.clone(),
        });
        Ok(())
    }

    fn cancel(&mut self) -> anyhow::Result<()> {
        let mut log = self.log.lock().unwrap();
        log.speaking = false;
        log.paused = false;
        log.calls.push(Call::Cancel);
        Ok(())
    }

    fn pause(&mut self) -> anyhow::Result<()> {
        let mut log = self.log.lock().unwrap();
        log.paused = true;
        log.calls.push(Call::Pause);
        Ok(())
    }

    fn resume(&mut self) -> anyhow::Result<()> {
        let mut log = self.log.lock().unwrap();
        log.paused = false;
        log.calls.push(Call::Resume);
        Ok(())
    }

    fn is_speaking(&self) -> bool {
        self.log.lock().unwrap().speaking
    }

    fn is_paused(&self) -> bool {
        self.log.lock().unwrap().paused
    }
}

pub fn default_voices() -> Vec<Voice> {
    vec![
        Voice::new("local:en", "Daniel", "en-US").as_default(),
        Voice::new("local:fr", "Amélie", "fr-FR"),
    ]
}

/// Settings with no quiescent delay so submits reach the engine at once.
pub fn immediate_settings() -> Settings {
    let mut settings = Settings::default();
    settings.tts.quiescent_ms = 0;
    settings
}

/// Paragraphs on source lines 1, 3, 5, ...
pub fn paragraphs(texts: &[&str]) -> TextTree {
    parse_markdown(&texts.join("\n\n"), Some("en-US".to_string()))
}

pub struct Harness {
    pub session: ReadingSession<MockEngine>,
    pub engine: MockEngine,
    pub events: EngineEventReceiver,
    pub ui: UiReceiver,
}

impl Harness {
    pub fn new(settings: Settings) -> Self {
        Self::with_engine(MockEngine::with_voices(default_voices()), settings)
    }

    pub fn with_engine(engine: MockEngine, settings: Settings) -> Self {
        let (events_tx, events) = mpsc::unbounded_channel();
        let (ui_sink, ui) = UiSink::channel();
        let session = ReadingSession::new(engine.clone(), events_tx, &settings, ui_sink);
        Self {
            session,
            engine,
            events,
            ui,
        }
    }

    /// Delivers everything the engine side has queued so far.
    pub fn pump(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.session.handle_engine_event(event);
        }
    }

    /// Ends the current utterance the way an engine would.
    pub fn end_current(&mut self) {
        let utterance = self
            .session
            .current_utterance()
            .expect("an utterance should be in flight");
        self.engine.finish();
        self.session.handle_engine_event(EngineEvent::Ended { utterance });
        self.pump();
    }

    pub fn ui_events(&mut self) -> Vec<UiEvent> {
        std::iter::from_fn(|| self.ui.try_recv().ok()).collect()
    }

    pub fn statuses(&mut self) -> Vec<String> {
        self.ui_events()
            .into_iter()
            .filter_map(|event| match event {
                UiEvent::Status(status) => Some(status.to_string()),
                _ => None,
            })
            .collect()
    }
}
