use std::time::Duration;

use tokio::time::Instant;

use super::{EngineEvent, EngineEventSender, SpeechEngine, UtteranceId, UtteranceRequest};

/// Pause between cancelling an utterance and submitting the next one.
/// Some engines drop a request that arrives right after a cancel.
pub const DEFAULT_QUIESCENT_INTERVAL: Duration = Duration::from_millis(150);

/// What a pause or resume request turned into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportOutcome {
    /// Forwarded to the engine; its Paused/Resumed event confirms it.
    Delegated,
    /// A request waiting out the quiescent interval is held back.
    Held,
    /// A held request was let go again.
    Released,
    Ignored,
}

/// Wraps a [`SpeechEngine`] so that at most one utterance is in flight.
///
/// Submitting cancels whatever is playing. After a cancel the next request
/// waits for the quiescent interval; the owner polls [`deadline`] and calls
/// [`flush`] once it passes.
///
/// [`deadline`]: SpeechAdapter::deadline
/// [`flush`]: SpeechAdapter::flush
pub struct SpeechAdapter<E> {
    engine: E,
    events: EngineEventSender,
    quiescent: Duration,
    next_id: u64,
    in_flight: Option<UtteranceId>,
    pending: Option<UtteranceRequest>,
    held: bool,
    ready_at: Option<Instant>,
}

impl<E: SpeechEngine> SpeechAdapter<E> {
    pub fn new(engine: E, events: EngineEventSender, quiescent: Duration) -> Self {
        Self {
            engine,
            events,
            quiescent,
            next_id: 1,
            in_flight: None,
            pending: None,
            held: false,
            ready_at: None,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn in_flight(&self) -> Option<UtteranceId> {
        self.in_flight
    }

    pub fn pending(&self) -> Option<&UtteranceRequest> {
        self.pending.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some() || self.pending.is_some()
    }

    /// Replaces whatever is playing with a new utterance.
    pub fn submit(
        &mut self,
        text: String,
        language: Option<String>,
        voice_id: Option<String>,
        rate: f32,
    ) -> UtteranceId {
        self.cancel();

        let id = UtteranceId(self.next_id);
        self.next_id += 1;
        let request = UtteranceRequest {
            id,
            text,
            language,
            voice_id,
            rate,
        };

        match self.ready_at {
            Some(at) if Instant::now() < at => {
                tracing::debug!("Holding utterance {} until the engine settles", id.0);
                self.pending = Some(request);
            }
            _ => self.dispatch(request),
        }
        id
    }

    /// Cancels the in-flight utterance and drops any pending one.
    /// Returns whether the engine had to be told.
    pub fn cancel(&mut self) -> bool {
        self.held = false;
        if let Some(dropped) = self.pending.take() {
            tracing::trace!("Dropped pending utterance {}", dropped.id.0);
        }

        let Some(id) = self.in_flight.take() else {
            return false;
        };
        if let Err(e) = self.engine.cancel() {
            tracing::warn!("Speech engine failed to cancel utterance {}: {:#}", id.0, e);
        }
        self.ready_at = Some(Instant::now() + self.quiescent);
        true
    }

    /// Marks an utterance as finished by the engine.
    pub fn settle(&mut self, id: UtteranceId) {
        if self.in_flight == Some(id) {
            self.in_flight = None;
        }
    }

    pub fn pause(&mut self) -> TransportOutcome {
        if self.in_flight.is_some() {
            if !self.engine.is_speaking() || self.engine.is_paused() {
                return TransportOutcome::Ignored;
            }
            return match self.engine.pause() {
                Ok(()) => TransportOutcome::Delegated,
                Err(e) => {
                    tracing::warn!("Speech engine failed to pause: {:#}", e);
                    TransportOutcome::Ignored
                }
            };
        }
        if self.pending.is_some() && !self.held {
            self.held = true;
            return TransportOutcome::Held;
        }
        TransportOutcome::Ignored
    }

    pub fn resume(&mut self) -> TransportOutcome {
        if self.held {
            self.held = false;
            self.flush();
            return TransportOutcome::Released;
        }
        if self.in_flight.is_none() || !self.engine.is_paused() {
            return TransportOutcome::Ignored;
        }
        match self.engine.resume() {
            Ok(()) => TransportOutcome::Delegated,
            Err(e) => {
                tracing::warn!("Speech engine failed to resume: {:#}", e);
                TransportOutcome::Ignored
            }
        }
    }

    /// Swaps the voice of a pending utterance, held or not. The id is kept.
    pub fn revoice_pending(&mut self, voice_id: Option<String>) -> bool {
        match self.pending.as_mut() {
            Some(request) => {
                tracing::debug!(
                    "Pending utterance {} now uses voice {:?}",
                    request.id.0,
                    voice_id
                );
                request.voice_id = voice_id;
                true
            }
            None => false,
        }
    }

    /// When the pending utterance may be submitted, if one is waiting.
    pub fn deadline(&self) -> Option<Instant> {
        if self.held {
            return None;
        }
        self.pending.as_ref().and(self.ready_at)
    }

    /// Submits the pending utterance if its quiescent interval has passed.
    pub fn flush(&mut self) -> Option<UtteranceId> {
        if self.held {
            return None;
        }
        if self.ready_at.is_some_and(|at| Instant::now() < at) {
            return None;
        }
        let request = self.pending.take()?;
        let id = request.id;
        self.dispatch(request);
        Some(id)
    }

    fn dispatch(&mut self, request: UtteranceRequest) {
        self.ready_at = None;
        self.in_flight = Some(request.id);
        tracing::debug!(
            "Submitting utterance {} ({} chars, voice {:?})",
            request.id.0,
            request.text.chars().count(),
            request.voice_id
        );
        if let Err(e) = self.engine.speak(&request) {
            tracing::warn!("Speech engine rejected utterance {}: {:#}", request.id.0, e);
            self.in_flight = None;
            let _ = self.events.send(EngineEvent::Error {
                utterance: request.id,
                message: format!("{e:#}"),
            });
        }
    }
}
