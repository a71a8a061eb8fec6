//! The task that owns a reading session.
//!
//! ```text
//!   SessionHandle     commands      SessionDriver            EngineEvent
//!   (hotkeys, host) ───────────▶  ┌──────────────────┐  ◀──────────────  engine
//!                                 │ ReadingSession   │
//!   UI listener     ◀───────────  │ DocumentModel    │
//!                     UiEvent     │ quiescent timer  │
//!                                 └──────────────────┘
//! ```

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::events::{UiReceiver, UiSink};
use super::ReadingSession;
use crate::commands::{SessionCommand, SessionHandle, SessionSnapshot};
use crate::document::DocumentModel;
use crate::engine::{EngineEventReceiver, EngineEventSender, SpeechEngine};
use crate::narration::EntryDescriptor;
use crate::state::Settings;

pub struct SessionDriver<D, E: SpeechEngine> {
    document: D,
    session: ReadingSession<E>,
    commands: mpsc::UnboundedReceiver<SessionCommand>,
    engine_events: EngineEventReceiver,
}

impl<D, E> SessionDriver<D, E>
where
    D: DocumentModel + Send + 'static,
    E: SpeechEngine + 'static,
{
    /// Builds the session and runs the driver on a new task.
    ///
    /// `events` must be the channel the engine reports to.
    pub fn spawn(
        document: D,
        engine: E,
        events: (EngineEventSender, EngineEventReceiver),
        settings: &Settings,
    ) -> (SessionHandle, UiReceiver, JoinHandle<()>) {
        let (events_tx, events_rx) = events;
        let (ui, ui_rx) = UiSink::channel();
        let (tx, rx) = mpsc::unbounded_channel();
        let session = ReadingSession::new(engine, events_tx, settings, ui);
        let driver = Self {
            document,
            session,
            commands: rx,
            engine_events: events_rx,
        };
        let task = tokio::spawn(driver.run());
        (SessionHandle::new(tx), ui_rx, task)
    }

    pub async fn run(mut self) {
        tracing::debug!("Reading session driver started");
        loop {
            let deadline = self.session.pending_deadline();
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(SessionCommand::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
                Some(event) = self.engine_events.recv() => {
                    self.session.handle_engine_event(event);
                }
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.session.flush_pending();
                }
            }
        }
        self.session.stop();
        tracing::debug!("Reading session driver stopped");
    }

    fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Trigger(message) => {
                let entry = message.to_entry(&self.document);
                self.read(entry);
            }
            SessionCommand::Read(entry) => self.read(entry),
            SessionCommand::TogglePause => self.session.toggle_pause(),
            SessionCommand::Pause => self.session.pause(),
            SessionCommand::Resume => self.session.resume(),
            SessionCommand::Next => self.session.next(),
            SessionCommand::Previous => self.session.previous(),
            SessionCommand::Stop => self.session.stop(),
            SessionCommand::ToggleContrast => self.session.toggle_contrast(),
            SessionCommand::PageUnloaded => self.session.page_unloaded(),
            SessionCommand::Status(reply) => {
                let _ = reply.send(SessionSnapshot::from(self.session.state()));
            }
            SessionCommand::Shutdown => {}
        }
    }

    fn read(&mut self, entry: EntryDescriptor) {
        if let Err(e) = self.session.trigger(&self.document, &entry) {
            tracing::debug!("Trigger produced no narration: {}", e);
        }
    }
}
