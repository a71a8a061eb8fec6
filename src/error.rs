use thiserror::Error;

/// Failure kinds of a reading session. None of them is fatal: each one
/// degrades to "stop speaking cleanly" or "skip and continue".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NarrationError {
    /// Selection mode was invoked with no selection, or a collapsed one.
    #[error("nothing selected")]
    EmptySelection,
    /// The resolved block has no text to speak.
    #[error("block {index} has no narrable text")]
    NoNarrableContent { index: usize },
    /// The engine rejected or failed to start an utterance.
    #[error("speech engine failed to start utterance: {0}")]
    EngineSubmitFailure(String),
    /// Navigation was requested past either end of the block list.
    #[error("block index {requested} is outside 0..{len}")]
    IndexOutOfRange { requested: isize, len: usize },
}
