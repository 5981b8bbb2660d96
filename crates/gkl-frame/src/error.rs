/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// The station address is outside `1..=32`.
    #[error("invalid station address {0} (expected 1..=32)")]
    InvalidAddress(u8),

    /// The payload exceeds the protocol maximum.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The output buffer cannot hold the encoded frame.
    #[error("output buffer too small ({capacity} bytes, need {needed})")]
    BufferTooSmall { needed: usize, capacity: usize },

    /// A decoded frame failed its XOR integrity check.
    #[error("checksum mismatch (computed 0x{computed:02X}, received 0x{received:02X})")]
    ChecksumMismatch { computed: u8, received: u8 },

    /// The stream filled the parser buffer without completing a frame.
    #[error("parser buffer overflow ({capacity} bytes without a complete frame)")]
    BufferOverflow { capacity: usize },
}

impl FrameError {
    /// True for errors raised while validating encode arguments.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            FrameError::InvalidAddress(_)
                | FrameError::PayloadTooLarge { .. }
                | FrameError::BufferTooSmall { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
