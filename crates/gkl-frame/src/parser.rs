use tracing::{debug, trace};

use crate::codec::{checksum, Frame, Payload};
use crate::command::{expected_payload_len, SYN};
use crate::error::{FrameError, Result};

/// Default accumulation capacity: the largest frame (27 bytes) with margin.
pub const PARSER_CAPACITY: usize = 32;

/// Offset of the first payload byte within a buffered frame.
const PAYLOAD_OFFSET: usize = 4;

/// Position of the parser within the frame currently being assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    WaitSyn,
    WaitAddrHi,
    WaitAddrLo,
    WaitCmd,
    WaitData { remaining: usize },
    WaitChecksum,
}

/// Which side of the link produced the frames being parsed.
///
/// Station replies carry a payload sized by the command table. Controller
/// requests (status, stop, polls) carry none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Reply,
    Request,
}

impl Direction {
    /// Payload length expected after `command` in this direction.
    pub fn payload_len(self, command: u8) -> usize {
        match self {
            Direction::Reply => expected_payload_len(command),
            Direction::Request => 0,
        }
    }
}

/// Incremental byte-at-a-time frame decoder.
///
/// [`push`](Self::push) returns `Ok(None)` while a frame is in progress,
/// `Ok(Some(frame))` once a frame passes its checksum, and an error for a
/// checksum mismatch or buffer overflow. After any non-`Ok(None)` result the
/// parser is back in [`ParserState::WaitSyn`].
#[derive(Debug, Clone)]
pub struct FrameParser<const N: usize = PARSER_CAPACITY> {
    state: ParserState,
    buf: heapless::Vec<u8, N>,
    expected_len: usize,
    direction: Direction,
}

impl FrameParser {
    /// Parser for station replies with the default capacity.
    pub fn new() -> Self {
        Self::with_direction(Direction::Reply)
    }

    /// Parser for controller-originated frames with the default capacity.
    pub fn for_requests() -> Self {
        Self::with_direction(Direction::Request)
    }
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> FrameParser<N> {
    /// Create a parser with capacity `N` for the given direction.
    pub fn with_direction(direction: Direction) -> Self {
        Self {
            state: ParserState::WaitSyn,
            buf: heapless::Vec::new(),
            expected_len: 0,
            direction,
        }
    }

    /// Feed one byte.
    pub fn push(&mut self, byte: u8) -> Result<Option<Frame>> {
        match self.state {
            ParserState::WaitSyn => {
                if byte != SYN {
                    trace!(byte = format_args!("{byte:02X}"), "discarding byte outside frame");
                    return Ok(None);
                }
                self.buffer(byte)?;
                self.state = ParserState::WaitAddrHi;
            }
            ParserState::WaitAddrHi => {
                self.buffer(byte)?;
                self.state = ParserState::WaitAddrLo;
            }
            ParserState::WaitAddrLo => {
                self.buffer(byte)?;
                self.state = ParserState::WaitCmd;
            }
            ParserState::WaitCmd => {
                self.buffer(byte)?;
                self.expected_len = self.direction.payload_len(byte);
                self.state = if self.expected_len > 0 {
                    ParserState::WaitData {
                        remaining: self.expected_len,
                    }
                } else {
                    ParserState::WaitChecksum
                };
            }
            ParserState::WaitData { remaining } => {
                self.buffer(byte)?;
                self.state = if remaining > 1 {
                    ParserState::WaitData {
                        remaining: remaining - 1,
                    }
                } else {
                    ParserState::WaitChecksum
                };
            }
            ParserState::WaitChecksum => {
                let computed = checksum(&self.buf[1..]);
                let outcome = if computed == byte {
                    self.take_frame().map(Some)
                } else {
                    debug!(
                        computed = format_args!("{computed:02X}"),
                        received = format_args!("{byte:02X}"),
                        "frame checksum mismatch"
                    );
                    Err(FrameError::ChecksumMismatch {
                        computed,
                        received: byte,
                    })
                };
                self.reset();
                return outcome;
            }
        }
        Ok(None)
    }

    /// Feed a slice, stopping at the first terminal outcome.
    ///
    /// Returns the outcome and how many bytes were consumed. Remaining bytes
    /// should be fed on the next call.
    pub fn push_slice(&mut self, bytes: &[u8]) -> (Result<Option<Frame>>, usize) {
        for (i, byte) in bytes.iter().enumerate() {
            match self.push(*byte) {
                Ok(None) => continue,
                outcome => return (outcome, i + 1),
            }
        }
        (Ok(None), bytes.len())
    }

    /// Drop any partial frame and wait for the next sync byte.
    pub fn reset(&mut self) {
        self.state = ParserState::WaitSyn;
        self.buf.clear();
        self.expected_len = 0;
    }

    /// Current FSM state.
    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Number of bytes buffered for the frame in progress.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// True while part of a frame has been buffered.
    pub fn in_frame(&self) -> bool {
        !self.buf.is_empty()
    }

    /// Accumulation capacity.
    pub fn capacity(&self) -> usize {
        N
    }

    /// Direction this parser decodes.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    fn buffer(&mut self, byte: u8) -> Result<()> {
        if self.buf.push(byte).is_err() {
            debug!(capacity = N, "frame parser buffer overflow");
            self.reset();
            return Err(FrameError::BufferOverflow { capacity: N });
        }
        Ok(())
    }

    fn take_frame(&self) -> Result<Frame> {
        let payload = &self.buf[PAYLOAD_OFFSET..PAYLOAD_OFFSET + self.expected_len];
        let payload = Payload::from_slice(payload)
            .map_err(|_| FrameError::BufferOverflow { capacity: N })?;
        Ok(Frame {
            address: self.buf[2],
            command: self.buf[3],
            payload,
        })
    }
}
