use std::fmt;
use std::io;

use gkl_frame::FrameError;
use gkl_poll::PollError;
use gkl_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(USAGE, message)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => TRANSPORT_ERROR,
        io::ErrorKind::InvalidData => DATA_INVALID,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Io(source) => io_error(context, source),
        TransportError::Closed => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    CliError::new(DATA_INVALID, format!("{context}: {err}"))
}

pub fn poll_error(context: &str, err: PollError) -> CliError {
    match err {
        PollError::Frame(err) => frame_error(context, err),
        PollError::Transport(err) => transport_error(context, err),
        PollError::ReplyTimeout { .. } => CliError::new(TIMEOUT, format!("{context}: {err}")),
        PollError::InvalidConfig(_) => CliError::new(USAGE, format!("{context}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_errors_to_exit_codes() {
        assert_eq!(
            poll_error("x", PollError::ReplyTimeout { waited_ms: 80 }).code,
            TIMEOUT
        );
        assert_eq!(
            poll_error("x", PollError::InvalidConfig("bad".into())).code,
            USAGE
        );
        assert_eq!(
            poll_error("x", FrameError::InvalidAddress(0).into()).code,
            DATA_INVALID
        );
        assert_eq!(
            transport_error("x", TransportError::Closed).code,
            FAILURE
        );
        assert_eq!(
            transport_error(
                "x",
                TransportError::Io(io::Error::from(io::ErrorKind::TimedOut))
            )
            .code,
            TIMEOUT
        );
    }

    #[test]
    fn message_carries_context() {
        let err = frame_error("encode failed", FrameError::InvalidAddress(40));
        assert!(err.to_string().starts_with("encode failed: "));
        assert!(err.to_string().contains("40"));
    }
}
