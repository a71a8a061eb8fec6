pub mod driver;
pub mod events;
pub mod highlight;

use tokio::time::Instant;

use crate::document::DocumentModel;
use crate::engine::{
    EngineEvent, EngineEventSender, SpeechAdapter, SpeechEngine, TransportOutcome, UtteranceId,
    VoiceResolver,
};
use crate::error::NarrationError;
use crate::narration::{resolve_entry, Block, EntryDescriptor, Passage, Resolution};
use crate::state::{PlaybackState, SessionState, Settings};

pub use driver::SessionDriver;
pub use events::{CharSpan, HighlightTarget, PauseLabel, StatusLine, UiEvent, UiReceiver, UiSink};
pub use highlight::HighlightCursor;

/// What the session moves on to when the current utterance ends
enum Stage {
    Blocks,
    Selection { continuation: Option<Continuation> },
    Remainder { following: Vec<Block> },
}

struct Continuation {
    remainder: Option<Passage>,
    following: Vec<Block>,
}

struct Utterance {
    id: UtteranceId,
    passage: Passage,
    block_index: Option<usize>,
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Forward,
    Backward,
}

/// The reading session state machine.
///
/// `Idle -> Speaking <-> Paused`, and any state `-> Stopped -> Idle`.
/// All methods return immediately; engine progress is fed back through
/// [`ReadingSession::handle_engine_event`].
pub struct ReadingSession<E: SpeechEngine> {
    adapter: SpeechAdapter<E>,
    voices: VoiceResolver,
    fallback_language: Option<String>,
    state: SessionState,
    stage: Stage,
    current: Option<Utterance>,
    highlight: HighlightCursor,
    ui: UiSink,
}

impl<E: SpeechEngine> ReadingSession<E> {
    pub fn new(engine: E, events: EngineEventSender, settings: &Settings, ui: UiSink) -> Self {
        Self {
            adapter: SpeechAdapter::new(engine, events, settings.tts.quiescent_interval()),
            voices: VoiceResolver::from_settings(&settings.tts),
            fallback_language: settings.tts.fallback_language.clone(),
            state: SessionState::new(settings.tts.clamped_rate()),
            stage: Stage::Blocks,
            current: None,
            highlight: HighlightCursor::new(ui.clone(), settings.general.high_contrast),
            ui,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn playback(&self) -> PlaybackState {
        self.state.playback
    }

    pub fn engine(&self) -> &E {
        self.adapter.engine()
    }

    pub fn engine_mut(&mut self) -> &mut E {
        self.adapter.engine_mut()
    }

    pub fn current_utterance(&self) -> Option<UtteranceId> {
        self.current.as_ref().map(|u| u.id)
    }

    pub fn highlight(&self) -> Option<&HighlightTarget> {
        self.highlight.current()
    }

    /// Tears down the current session and starts a new one from `entry`.
    pub fn trigger(
        &mut self,
        doc: &impl DocumentModel,
        entry: &EntryDescriptor,
    ) -> Result<(), NarrationError> {
        self.stop();
        let resolution = match resolve_entry(doc, entry) {
            Ok(resolution) => resolution,
            Err(e) => {
                tracing::info!("Nothing to read: {}", e);
                self.ui.emit(UiEvent::Status(StatusLine::NothingSelected));
                return Err(e);
            }
        };

        match resolution {
            Resolution::Blocks { blocks, start } => self.start(blocks, start),
            Resolution::Selection(selection) => {
                tracing::info!("Reading selection ({} chars)", selection.text.chars().count());
                self.stage = Stage::Selection { continuation: None };
                self.speak_passage(selection, None);
            }
            Resolution::SelectionThenBlocks {
                selection,
                remainder,
                following,
            } => {
                tracing::info!(
                    "Reading selection, then {} following blocks",
                    following.len()
                );
                self.stage = Stage::Selection {
                    continuation: Some(Continuation { remainder, following }),
                };
                self.speak_passage(selection, None);
            }
        }
        Ok(())
    }

    /// Replaces the block list and speaks from `index`. Out of range is a no-op.
    pub fn start(&mut self, blocks: Vec<Block>, index: usize) {
        if index >= blocks.len() {
            tracing::debug!(
                "{}",
                NarrationError::IndexOutOfRange {
                    requested: index as isize,
                    len: blocks.len()
                }
            );
            return;
        }
        tracing::info!("Reading {} blocks from block {}", blocks.len(), index + 1);
        self.silence();
        self.state.blocks = blocks;
        self.stage = Stage::Blocks;
        self.speak_block(index, Direction::Forward);
    }

    /// Takes effect once the engine confirms, unless the utterance is still
    /// waiting to be submitted.
    pub fn pause(&mut self) {
        if self.state.playback != PlaybackState::Speaking {
            tracing::debug!("Pause ignored while {:?}", self.state.playback);
            return;
        }
        match self.adapter.pause() {
            TransportOutcome::Delegated => tracing::debug!("Pause requested"),
            TransportOutcome::Held => self.enter_paused(),
            TransportOutcome::Released | TransportOutcome::Ignored => {
                tracing::debug!("Engine is not speaking; pause ignored")
            }
        }
    }

    pub fn resume(&mut self) {
        if self.state.playback != PlaybackState::Paused {
            tracing::debug!("Resume ignored while {:?}", self.state.playback);
            return;
        }
        match self.adapter.resume() {
            TransportOutcome::Delegated => tracing::debug!("Resume requested"),
            TransportOutcome::Released => self.enter_speaking(),
            TransportOutcome::Held | TransportOutcome::Ignored => {
                tracing::debug!("Engine is not paused; resume ignored")
            }
        }
    }

    pub fn toggle_pause(&mut self) {
        match self.state.playback {
            PlaybackState::Speaking => self.pause(),
            PlaybackState::Paused => self.resume(),
            PlaybackState::Idle | PlaybackState::Stopped => {}
        }
    }

    pub fn next(&mut self) {
        if !self.navigable() {
            return;
        }
        let requested = self.state.cursor + 1;
        let Some(target) = self.find_narrable(requested, Direction::Forward) else {
            tracing::debug!(
                "{}",
                NarrationError::IndexOutOfRange {
                    requested: requested as isize,
                    len: self.state.blocks.len()
                }
            );
            return;
        };
        self.silence();
        self.speak_block(target, Direction::Forward);
    }

    pub fn previous(&mut self) {
        if !self.navigable() {
            return;
        }
        let Some(target) = self
            .state
            .cursor
            .checked_sub(1)
            .and_then(|i| self.find_narrable(i, Direction::Backward))
        else {
            tracing::debug!(
                "{}",
                NarrationError::IndexOutOfRange {
                    requested: self.state.cursor as isize - 1,
                    len: self.state.blocks.len()
                }
            );
            return;
        };
        self.silence();
        self.speak_block(target, Direction::Backward);
    }

    /// Cancels playback and clears the session. Safe to call in any state.
    pub fn stop(&mut self) {
        let active = self.state.playback != PlaybackState::Idle
            || self.current.is_some()
            || self.adapter.is_busy()
            || !self.state.blocks.is_empty();
        if !active {
            return;
        }

        self.adapter.cancel();
        self.set_playback(PlaybackState::Stopped);
        self.current = None;
        self.stage = Stage::Blocks;
        self.highlight.clear();
        self.state.blocks.clear();
        self.state.cursor = 0;
        self.set_playback(PlaybackState::Idle);
        self.reset_controls();
        tracing::info!("Reading stopped");
    }

    pub fn page_unloaded(&mut self) {
        tracing::debug!("Document unloaded");
        self.stop();
    }

    pub fn toggle_contrast(&mut self) {
        let on = !self.highlight.high_contrast();
        self.highlight.set_high_contrast(on);
        self.ui.emit(UiEvent::Contrast(on));
    }

    /// When a held-back utterance becomes due.
    pub fn pending_deadline(&self) -> Option<Instant> {
        self.adapter.deadline()
    }

    pub fn flush_pending(&mut self) {
        if let Some(id) = self.adapter.flush() {
            tracing::debug!("Utterance {} submitted after the quiescent interval", id.0);
        }
    }

    pub fn handle_engine_event(&mut self, event: EngineEvent) {
        if event == EngineEvent::VoicesChanged {
            self.on_voices_changed();
            return;
        }
        let current = match &self.current {
            Some(current) if event.utterance() == Some(current.id) => current,
            _ => {
                tracing::trace!("Ignoring stale engine event {:?}", event);
                return;
            }
        };
        let block_index = current.block_index;

        match event {
            EngineEvent::Started { utterance } => {
                tracing::debug!("Utterance {} started", utterance.0)
            }
            EngineEvent::Boundary { char_index, len, .. } => self.highlight.boundary(char_index, len),
            EngineEvent::Paused { .. } => {
                if self.state.playback == PlaybackState::Speaking {
                    self.enter_paused();
                }
            }
            EngineEvent::Resumed { .. } => {
                if self.state.playback == PlaybackState::Paused {
                    self.enter_speaking();
                }
            }
            EngineEvent::Ended { utterance } => {
                self.adapter.settle(utterance);
                self.advance();
            }
            EngineEvent::Error { utterance, message } => {
                self.adapter.settle(utterance);
                let failure = NarrationError::EngineSubmitFailure(message);
                tracing::warn!("Skipping passage: {}", failure);
                self.ui.emit(UiEvent::BlockFailed {
                    block_index,
                    message: failure.to_string(),
                });
                self.advance();
            }
            EngineEvent::VoicesChanged => {}
        }
    }

    fn navigable(&self) -> bool {
        matches!(self.stage, Stage::Blocks) && !self.state.blocks.is_empty()
    }

    /// Moves past the utterance that just finished.
    fn advance(&mut self) {
        self.highlight.clear();
        self.current = None;

        match std::mem::replace(&mut self.stage, Stage::Blocks) {
            Stage::Blocks => {
                let next = self.state.cursor + 1;
                if next < self.state.blocks.len() {
                    self.speak_block(next, Direction::Forward);
                } else {
                    self.finish();
                }
            }
            Stage::Selection { continuation: None } => self.finish(),
            Stage::Selection {
                continuation:
                    Some(Continuation {
                        remainder: Some(remainder),
                        following,
                    }),
            } => {
                self.stage = Stage::Remainder { following };
                self.speak_passage(remainder, None);
            }
            Stage::Selection {
                continuation:
                    Some(Continuation {
                        remainder: None,
                        following,
                    }),
            }
            | Stage::Remainder { following } => self.continue_with(following),
        }
    }

    /// Replaces the block list once a selection and its remainder are done.
    fn continue_with(&mut self, following: Vec<Block>) {
        self.state.blocks = following;
        self.state.cursor = 0;
        self.stage = Stage::Blocks;
        if self.state.blocks.is_empty() {
            self.finish();
        } else {
            self.speak_block(0, Direction::Forward);
        }
    }

    fn find_narrable(&self, from: usize, direction: Direction) -> Option<usize> {
        let mut index = from;
        loop {
            let block = self.state.blocks.get(index)?;
            if block.is_narrable() {
                return Some(index);
            }
            tracing::debug!("{}", NarrationError::NoNarrableContent { index });
            index = match direction {
                Direction::Forward => index + 1,
                Direction::Backward => index.checked_sub(1)?,
            };
        }
    }

    fn speak_block(&mut self, index: usize, direction: Direction) {
        let Some(index) = self.find_narrable(index, direction) else {
            self.finish();
            return;
        };
        self.state.cursor = index;
        let passage = Passage::from_block(&self.state.blocks[index]);
        self.speak_passage(passage, Some(index));
    }

    fn speak_passage(&mut self, passage: Passage, block_index: Option<usize>) {
        let language = passage
            .language
            .clone()
            .or_else(|| self.fallback_language.clone());
        let voices = self.adapter.engine().list_voices();
        self.state.voice_id = self
            .voices
            .resolve(&voices, language.as_deref())
            .map(|voice| voice.id.clone());

        let id = self.adapter.submit(
            passage.text.clone(),
            language,
            self.state.voice_id.clone(),
            self.state.rate,
        );
        self.highlight.emphasize(&passage, block_index);
        self.current = Some(Utterance {
            id,
            passage,
            block_index,
        });

        self.set_playback(PlaybackState::Speaking);
        self.ui.emit(UiEvent::Status(self.status_for(block_index)));
        self.ui.emit(UiEvent::PauseLabel(PauseLabel::Pause));
        self.ui.emit(UiEvent::BarVisible(true));
    }

    fn status_for(&self, block_index: Option<usize>) -> StatusLine {
        match (block_index, &self.stage) {
            (Some(index), _) => StatusLine::Block {
                index,
                total: self.state.blocks.len(),
            },
            (None, Stage::Selection { continuation: None }) => StatusLine::SelectedText,
            (None, _) => StatusLine::SelectionContinuation,
        }
    }

    /// Re-resolves the voice; a different voice restarts the current passage.
    fn on_voices_changed(&mut self) {
        let voices = self.adapter.engine().list_voices();
        let language = self
            .current
            .as_ref()
            .and_then(|u| u.passage.language.clone())
            .or_else(|| self.fallback_language.clone());
        let resolved = self
            .voices
            .resolve(&voices, language.as_deref())
            .map(|voice| voice.id.clone());
        if resolved == self.state.voice_id {
            return;
        }
        tracing::info!("Voice changed from {:?} to {:?}", self.state.voice_id, resolved);
        self.state.voice_id = resolved.clone();

        if self.state.playback != PlaybackState::Speaking {
            // a held request has not reached the engine yet
            self.adapter.revoice_pending(resolved);
            return;
        }
        if let Some(Utterance {
            passage,
            block_index,
            ..
        }) = self.current.take()
        {
            self.speak_passage(passage, block_index);
        }
    }

    fn silence(&mut self) {
        self.adapter.cancel();
        self.current = None;
        self.highlight.clear();
    }

    /// Natural end: UI is cleared, the block list stays for navigation.
    fn finish(&mut self) {
        self.adapter.cancel();
        self.current = None;
        self.stage = Stage::Blocks;
        self.highlight.clear();
        self.set_playback(PlaybackState::Idle);
        self.reset_controls();
        tracing::info!("Reading finished");
    }

    fn enter_paused(&mut self) {
        self.set_playback(PlaybackState::Paused);
        self.ui.emit(UiEvent::PauseLabel(PauseLabel::Play));
    }

    fn enter_speaking(&mut self) {
        self.set_playback(PlaybackState::Speaking);
        self.ui.emit(UiEvent::PauseLabel(PauseLabel::Pause));
    }

    fn reset_controls(&mut self) {
        self.ui.emit(UiEvent::Status(StatusLine::Empty));
        self.ui.emit(UiEvent::PauseLabel(PauseLabel::Pause));
        self.ui.emit(UiEvent::BarVisible(false));
    }

    fn set_playback(&mut self, playback: PlaybackState) {
        if self.state.playback != playback {
            tracing::debug!("Playback {:?} -> {:?}", self.state.playback, playback);
            self.state.playback = playback;
            self.ui.emit(UiEvent::Playback(playback));
        }
    }
}
