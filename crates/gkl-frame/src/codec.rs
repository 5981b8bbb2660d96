use std::fmt;

use crate::command::{is_valid_station, ADDR_HI, SYN};
use crate::error::{FrameError, Result};

/// Sync (1) + address (2) + command (1) + checksum (1).
pub const FRAME_OVERHEAD: usize = 5;

/// Largest payload any command carries.
pub const MAX_PAYLOAD: usize = 22;

/// Fixed-capacity payload storage.
pub type Payload = heapless::Vec<u8, MAX_PAYLOAD>;

/// A decoded protocol message addressed to or from one station.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Station address, 1..=32.
    pub address: u8,
    /// ASCII command code.
    pub command: u8,
    /// Command payload, 0..=22 bytes.
    pub payload: Payload,
}

impl Frame {
    /// Create a new frame, validating address and payload length.
    pub fn new(address: u8, command: u8, payload: &[u8]) -> Result<Self> {
        if !is_valid_station(address) {
            return Err(FrameError::InvalidAddress(address));
        }
        let payload = Payload::from_slice(payload).map_err(|_| FrameError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD,
        })?;
        Ok(Self {
            address,
            command,
            payload,
        })
    }

    /// The total wire size of this frame (overhead + payload).
    pub fn wire_size(&self) -> usize {
        FRAME_OVERHEAD + self.payload.len()
    }

    /// Encode this frame into `out`, returning the number of bytes written.
    pub fn encode(&self, out: &mut [u8]) -> Result<usize> {
        build_frame(self.address, self.command, &self.payload, out)
    }
}

/// Displays bytes as space-separated uppercase hex, e.g. `02 00 01 53 52`.
pub struct HexBytes<'a>(pub &'a [u8]);

impl fmt::Display for HexBytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}

/// XOR of every byte in `bytes`.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, b| acc ^ b)
}

/// Encode a command frame into `out`.
///
/// Wire format:
/// ```text
/// ┌──────┬─────────┬─────────┬─────────┬───────────────┬──────────┐
/// │ SYN  │ ADDR_HI │ ADDR_LO │ CMD     │ Payload       │ XOR      │
/// │ 0x02 │ 0x00    │ 1..=32  │ ASCII   │ (0..=22 B)    │ [1..4+n] │
/// └──────┴─────────┴─────────┴─────────┴───────────────┴──────────┘
/// ```
///
/// Returns the frame length (`5 + payload.len()`). Nothing is written when an
/// argument is rejected.
pub fn build_frame(address: u8, command: u8, payload: &[u8], out: &mut [u8]) -> Result<usize> {
    if !is_valid_station(address) {
        return Err(FrameError::InvalidAddress(address));
    }
    if payload.len() > MAX_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD,
        });
    }
    let total = FRAME_OVERHEAD + payload.len();
    if out.len() < total {
        return Err(FrameError::BufferTooSmall {
            needed: total,
            capacity: out.len(),
        });
    }

    out[0] = SYN;
    out[1] = ADDR_HI;
    out[2] = address;
    out[3] = command;
    out[4..4 + payload.len()].copy_from_slice(payload);
    out[total - 1] = checksum(&out[1..total - 1]);

    Ok(total)
}
