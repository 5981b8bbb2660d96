//! Frame codec and incremental parser for the GKL dispenser protocol.
//!
//! Every frame on the wire is:
//! - A sync byte (`0x02`)
//! - A two-byte station address, high byte always `0x00`
//! - A one-byte ASCII command code
//! - A payload whose length is fixed by the command
//! - A one-byte XOR checksum over everything between sync and checksum
//!
//! Buffers are fixed-capacity; nothing here allocates.

pub mod codec;
pub mod command;
pub mod error;
pub mod parser;

pub use codec::{build_frame, checksum, Frame, HexBytes, Payload, FRAME_OVERHEAD, MAX_PAYLOAD};
pub use command::{
    command_name, expected_payload_len, is_valid_station, ADDR_HI, MAX_STATION, MIN_STATION,
    STATUS, STOP, SYN,
};
pub use error::{FrameError, Result};
pub use parser::{Direction, FrameParser, ParserState, PARSER_CAPACITY};
