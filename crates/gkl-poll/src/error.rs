use gkl_frame::FrameError;
use gkl_transport::TransportError;
use serde::Serialize;

/// Errors surfaced by the polling core.
///
/// None of these stop a channel: each is recovered by resetting the owning
/// state machine and resuming the poll cadence. They reach the outside only
/// through return values of ad-hoc commands and through
/// [`ChannelObserver::fault`](crate::ChannelObserver::fault).
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    /// Frame encoding or decoding error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// The link failed to send or receive.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// No valid frame arrived within the reply window.
    #[error("no reply within {waited_ms} ms")]
    ReplyTimeout { waited_ms: u64 },

    /// Channel configuration was rejected.
    #[error("invalid channel configuration: {0}")]
    InvalidConfig(String),
}

/// Coarse classification of a [`PollError`], for counters and output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    Validation,
    ChecksumMismatch,
    BufferOverflow,
    ReplyTimeout,
    TransportFailure,
    InvalidConfig,
}

impl PollError {
    /// Classify this error.
    pub fn kind(&self) -> FaultKind {
        match self {
            PollError::Frame(FrameError::ChecksumMismatch { .. }) => FaultKind::ChecksumMismatch,
            PollError::Frame(FrameError::BufferOverflow { .. }) => FaultKind::BufferOverflow,
            PollError::Frame(_) => FaultKind::Validation,
            PollError::Transport(_) => FaultKind::TransportFailure,
            PollError::ReplyTimeout { .. } => FaultKind::ReplyTimeout,
            PollError::InvalidConfig(_) => FaultKind::InvalidConfig,
        }
    }
}

pub type Result<T> = std::result::Result<T, PollError>;
