use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::{EngineEvent, EngineEventSender, SpeechEngine, UtteranceId, UtteranceRequest, Voice};
use crate::state::CancelFlag;

/// Simulated engine that "speaks" by writing words to stdout at reading pace.
pub struct ConsoleEngine {
    events: EngineEventSender,
    voices: Vec<Voice>,
    words_per_minute: f32,
    echo: bool,
    current: Option<Playback>,
}

struct Playback {
    id: UtteranceId,
    cancel: CancelFlag,
    paused: watch::Sender<bool>,
    finished: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl ConsoleEngine {
    pub fn new(events: EngineEventSender, words_per_minute: f32) -> Self {
        Self {
            events,
            voices: Self::default_voices(),
            words_per_minute: words_per_minute.max(1.0),
            echo: true,
            current: None,
        }
    }

    /// Keeps the pacing and notifications but writes nothing.
    pub fn silent(mut self) -> Self {
        self.echo = false;
        self
    }

    pub fn default_voices() -> Vec<Voice> {
        vec![
            Voice::new("console:en-US", "Console Narrator (English)", "en-US").as_default(),
            Voice::new("console:fr-FR", "Console Narrator (French)", "fr-FR"),
            Voice::new("console:de-DE", "Console Narrator (German)", "de-DE"),
        ]
    }

    /// Replaces the voice list and announces the change.
    pub fn set_voices(&mut self, voices: Vec<Voice>) {
        self.voices = voices;
        let _ = self.events.send(EngineEvent::VoicesChanged);
    }

    fn word_interval(&self, rate: f32) -> Duration {
        let words_per_second = self.words_per_minute * rate.clamp(0.1, 10.0) / 60.0;
        Duration::from_secs_f32(1.0 / words_per_second)
    }
}

impl SpeechEngine for ConsoleEngine {
    fn list_voices(&self) -> Vec<Voice> {
        self.voices.clone()
    }

    fn speak(&mut self, request: &UtteranceRequest) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .context("Console engine needs a running tokio runtime")?;
        self.cancel()?;

        let id = request.id;
        let words = word_spans(&request.text);
        let interval = self.word_interval(request.rate);
        let cancel: CancelFlag = Arc::new(AtomicBool::new(false));
        let (paused, mut paused_rx) = watch::channel(false);
        let finished = Arc::new(AtomicBool::new(false));
        let events = self.events.clone();
        let echo = self.echo;

        let task = {
            let cancel = cancel.clone();
            let finished = finished.clone();
            runtime.spawn(async move {
                let _ = events.send(EngineEvent::Started { utterance: id });
                for (char_index, len, word) in words {
                    loop {
                        let held = *paused_rx.borrow_and_update();
                        if !held {
                            break;
                        }
                        if paused_rx.changed().await.is_err() {
                            return;
                        }
                    }
                    if cancel.load(Ordering::Relaxed) {
                        return;
                    }
                    let _ = events.send(EngineEvent::Boundary {
                        utterance: id,
                        char_index,
                        len,
                    });
                    if echo {
                        let mut stdout = std::io::stdout().lock();
                        let _ = write!(stdout, "{word} ");
                        let _ = stdout.flush();
                    }
                    tokio::time::sleep(interval).await;
                }
                if cancel.load(Ordering::Relaxed) {
                    return;
                }
                finished.store(true, Ordering::Relaxed);
                if echo {
                    println!();
                }
                let _ = events.send(EngineEvent::Ended { utterance: id });
            })
        };

        tracing::debug!(
            "Console engine speaking utterance {} with voice {:?}",
            id.0,
            request.voice_id
        );
        self.current = Some(Playback {
            id,
            cancel,
            paused,
            finished,
            task,
        });
        Ok(())
    }

    fn cancel(&mut self) -> Result<()> {
        if let Some(playback) = self.current.take() {
            playback.cancel.store(true, Ordering::Relaxed);
            playback.task.abort();
            tracing::trace!("Console engine cancelled utterance {}", playback.id.0);
        }
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        if let Some(playback) = &self.current {
            if !playback.paused.send_replace(true) {
                let _ = self.events.send(EngineEvent::Paused {
                    utterance: playback.id,
                });
            }
        }
        Ok(())
    }

    fn resume(&mut self) -> Result<()> {
        if let Some(playback) = &self.current {
            if playback.paused.send_replace(false) {
                let _ = self.events.send(EngineEvent::Resumed {
                    utterance: playback.id,
                });
            }
        }
        Ok(())
    }

    fn is_speaking(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|p| !p.finished.load(Ordering::Relaxed))
    }

    fn is_paused(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|p| *p.paused.borrow())
    }
}

/// Whitespace-separated words as (char index, char length, word).
fn word_spans(text: &str) -> Vec<(usize, usize, String)> {
    let mut spans = Vec::new();
    let mut current: Option<(usize, String)> = None;
    for (index, ch) in text.chars().enumerate() {
        if ch.is_whitespace() {
            if let Some((start, word)) = current.take() {
                spans.push((start, word.chars().count(), word));
            }
        } else {
            current.get_or_insert_with(|| (index, String::new())).1.push(ch);
        }
    }
    if let Some((start, word)) = current {
        spans.push((start, word.chars().count(), word));
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn request(id: u64, text: &str) -> UtteranceRequest {
        UtteranceRequest {
            id: UtteranceId(id),
            text: text.to_string(),
            language: None,
            voice_id: None,
            rate: 1.0,
        }
    }

    #[test]
    fn word_spans_count_characters() {
        let spans = word_spans("  Héllo  wörld!\n");
        assert_eq!(
            spans,
            vec![(2, 5, "Héllo".to_string()), (9, 6, "wörld!".to_string())]
        );
        assert!(word_spans("   ").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn reports_start_boundaries_and_end() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut engine = ConsoleEngine::new(tx, 600.0).silent();
        engine.speak(&request(7, "one two")).unwrap();
        assert!(engine.is_speaking());

        let id = UtteranceId(7);
        assert_eq!(rx.recv().await, Some(EngineEvent::Started { utterance: id }));
        assert_eq!(
            rx.recv().await,
            Some(EngineEvent::Boundary { utterance: id, char_index: 0, len: 3 })
        );
        assert_eq!(
            rx.recv().await,
            Some(EngineEvent::Boundary { utterance: id, char_index: 4, len: 3 })
        );
        assert_eq!(rx.recv().await, Some(EngineEvent::Ended { utterance: id }));
        assert!(!engine.is_speaking());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_utterance_never_ends() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut engine = ConsoleEngine::new(tx, 600.0).silent();
        engine.speak(&request(1, "a b c d")).unwrap();
        engine.cancel().unwrap();
        assert!(!engine.is_speaking());

        tokio::time::sleep(Duration::from_secs(5)).await;
        while let Ok(event) = rx.try_recv() {
            assert!(!matches!(event, EngineEvent::Ended { .. }), "got {event:?}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn pause_and_resume_notify_once() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut engine = ConsoleEngine::new(tx, 600.0).silent();
        engine.speak(&request(3, "word")).unwrap();
        engine.pause().unwrap();
        engine.pause().unwrap();
        assert!(engine.is_paused());
        engine.resume().unwrap();

        let mut seen = Vec::new();
        while let Some(event) = rx.recv().await {
            let done = matches!(event, EngineEvent::Ended { .. });
            seen.push(event);
            if done {
                break;
            }
        }
        let id = UtteranceId(3);
        assert_eq!(seen[0], EngineEvent::Paused { utterance: id });
        assert_eq!(seen[1], EngineEvent::Resumed { utterance: id });
        assert_eq!(seen.iter().filter(|e| matches!(e, EngineEvent::Paused { .. })).count(), 1);
        assert_eq!(seen.last(), Some(&EngineEvent::Ended { utterance: id }));
    }

    #[tokio::test(start_paused = true)]
    async fn paused_utterance_waits_for_resume() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut engine = ConsoleEngine::new(tx, 600.0).silent();
        engine.speak(&request(5, "one two three")).unwrap();
        let id = UtteranceId(5);
        assert_eq!(rx.recv().await, Some(EngineEvent::Started { utterance: id }));
        assert!(matches!(rx.recv().await, Some(EngineEvent::Boundary { .. })));

        engine.pause().unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(rx.try_recv(), Ok(EngineEvent::Paused { utterance: id }));
        assert!(rx.try_recv().is_err());
        assert!(engine.is_speaking());

        engine.resume().unwrap();
        assert_eq!(rx.recv().await, Some(EngineEvent::Resumed { utterance: id }));
        assert_eq!(
            rx.recv().await,
            Some(EngineEvent::Boundary { utterance: id, char_index: 4, len: 3 })
        );
        assert_eq!(
            rx.recv().await,
            Some(EngineEvent::Boundary { utterance: id, char_index: 8, len: 5 })
        );
        assert_eq!(rx.recv().await, Some(EngineEvent::Ended { utterance: id }));
    }

    #[test]
    fn speak_outside_a_runtime_fails() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut engine = ConsoleEngine::new(tx, 600.0).silent();
        assert!(engine.speak(&request(1, "hi")).is_err());
    }
}
