pub mod adapter;
pub mod console;
pub mod voice;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

pub use adapter::{SpeechAdapter, TransportOutcome, DEFAULT_QUIESCENT_INTERVAL};
pub use console::ConsoleEngine;
pub use voice::VoiceResolver;

/// A synthesis voice as reported by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    /// Engine-unique identifier (voice URI)
    pub id: String,
    pub name: String,
    /// BCP 47 language tag
    pub language: String,
    #[serde(default)]
    pub is_default: bool,
}

impl Voice {
    pub fn new(id: impl Into<String>, name: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            language: language.into(),
            is_default: false,
        }
    }

    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }
}

/// Identifies one submitted utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UtteranceId(pub u64);

/// One unit of text handed to the engine, immutable once submitted
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UtteranceRequest {
    pub id: UtteranceId,
    pub text: String,
    pub language: Option<String>,
    pub voice_id: Option<String>,
    pub rate: f32,
}

/// Engine notifications, tagged with the utterance they belong to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    Started { utterance: UtteranceId },
    /// Word boundary; `char_index` counts characters of the utterance text
    Boundary {
        utterance: UtteranceId,
        char_index: usize,
        len: usize,
    },
    Paused { utterance: UtteranceId },
    Resumed { utterance: UtteranceId },
    Ended { utterance: UtteranceId },
    Error { utterance: UtteranceId, message: String },
    /// The engine's voice list changed
    VoicesChanged,
}

impl EngineEvent {
    pub fn utterance(&self) -> Option<UtteranceId> {
        match self {
            Self::Started { utterance }
            | Self::Boundary { utterance, .. }
            | Self::Paused { utterance }
            | Self::Resumed { utterance }
            | Self::Ended { utterance }
            | Self::Error { utterance, .. } => Some(*utterance),
            Self::VoicesChanged => None,
        }
    }
}

pub type EngineEventSender = mpsc::UnboundedSender<EngineEvent>;
pub type EngineEventReceiver = mpsc::UnboundedReceiver<EngineEvent>;

/// Platform text-to-speech facility.
///
/// Calls return as soon as the engine accepted the request; progress is
/// reported later through the [`EngineEventSender`] the engine was built with.
pub trait SpeechEngine: Send {
    fn list_voices(&self) -> Vec<Voice>;
    fn speak(&mut self, request: &UtteranceRequest) -> Result<()>;
    fn cancel(&mut self) -> Result<()>;
    fn pause(&mut self) -> Result<()>;
    fn resume(&mut self) -> Result<()>;
    fn is_speaking(&self) -> bool;
    fn is_paused(&self) -> bool;
}

impl<E: SpeechEngine + ?Sized> SpeechEngine for Box<E> {
    fn list_voices(&self) -> Vec<Voice> {
        (**self).list_voices()
    }

    fn speak(&mut self, request: &UtteranceRequest) -> Result<()> {
        (**self).speak(request)
    }

    fn cancel(&mut self) -> Result<()> {
        (**self).cancel()
    }

    fn pause(&mut self) -> Result<()> {
        (**self).pause()
    }

    fn resume(&mut self) -> Result<()> {
        (**self).resume()
    }

    fn is_speaking(&self) -> bool {
        (**self).is_speaking()
    }

    fn is_paused(&self) -> bool {
        (**self).is_paused()
    }
}
