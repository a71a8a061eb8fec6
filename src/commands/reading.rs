use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

use crate::narration::{EntryDescriptor, TriggerMessage};
use crate::state::{PlaybackState, SessionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("reading session has shut down")]
pub struct SessionClosed;

/// Requests handled by the session driver, in arrival order
#[derive(Debug)]
pub enum SessionCommand {
    /// Host trigger; the live selection is read when it is handled.
    Trigger(TriggerMessage),
    Read(EntryDescriptor),
    TogglePause,
    Pause,
    Resume,
    Next,
    Previous,
    Stop,
    ToggleContrast,
    PageUnloaded,
    Status(oneshot::Sender<SessionSnapshot>),
    Shutdown,
}

/// Point-in-time view of the session for status queries
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub playback: PlaybackState,
    pub cursor: usize,
    pub block_count: usize,
    pub voice_id: Option<String>,
    pub rate: f32,
}

impl From<&SessionState> for SessionSnapshot {
    fn from(state: &SessionState) -> Self {
        Self {
            playback: state.playback,
            cursor: state.cursor,
            block_count: state.blocks.len(),
            voice_id: state.voice_id.clone(),
            rate: state.rate,
        }
    }
}

/// Cloneable handle to a running session driver.
///
/// Control methods only enqueue; they fail once the driver has shut down.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    pub fn new(tx: mpsc::UnboundedSender<SessionCommand>) -> Self {
        Self { tx }
    }

    pub fn trigger(&self, message: TriggerMessage) -> Result<(), SessionClosed> {
        self.send(SessionCommand::Trigger(message))
    }

    pub fn read(&self, entry: EntryDescriptor) -> Result<(), SessionClosed> {
        self.send(SessionCommand::Read(entry))
    }

    pub fn toggle_pause(&self) -> Result<(), SessionClosed> {
        self.send(SessionCommand::TogglePause)
    }

    pub fn pause(&self) -> Result<(), SessionClosed> {
        self.send(SessionCommand::Pause)
    }

    pub fn resume(&self) -> Result<(), SessionClosed> {
        self.send(SessionCommand::Resume)
    }

    pub fn next_block(&self) -> Result<(), SessionClosed> {
        self.send(SessionCommand::Next)
    }

    pub fn previous_block(&self) -> Result<(), SessionClosed> {
        self.send(SessionCommand::Previous)
    }

    pub fn stop(&self) -> Result<(), SessionClosed> {
        self.send(SessionCommand::Stop)
    }

    pub fn toggle_contrast(&self) -> Result<(), SessionClosed> {
        self.send(SessionCommand::ToggleContrast)
    }

    pub fn page_unloaded(&self) -> Result<(), SessionClosed> {
        self.send(SessionCommand::PageUnloaded)
    }

    pub async fn status(&self) -> Result<SessionSnapshot, SessionClosed> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Status(reply))?;
        rx.await.map_err(|_| SessionClosed)
    }

    /// Stops playback and ends the driver task.
    pub fn shutdown(&self) -> Result<(), SessionClosed> {
        self.send(SessionCommand::Shutdown)
    }

    fn send(&self, command: SessionCommand) -> Result<(), SessionClosed> {
        self.tx.send(command).map_err(|_| SessionClosed)
    }
}
