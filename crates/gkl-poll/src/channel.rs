//! Physical channel identifiers.
//!
//! Odd station addresses are wired to channel one, even addresses to
//! channel two.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the two physical serial channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelId {
    One,
    Two,
}

impl ChannelId {
    /// Both channels, in index order.
    pub const ALL: [ChannelId; 2] = [ChannelId::One, ChannelId::Two];

    /// The channel that serves `station`.
    pub fn for_station(station: u8) -> Self {
        if station % 2 == 1 {
            ChannelId::One
        } else {
            ChannelId::Two
        }
    }

    /// True if `station` belongs to this channel's address partition.
    pub fn serves(self, station: u8) -> bool {
        Self::for_station(station) == self
    }

    /// Zero-based index.
    pub fn index(self) -> usize {
        match self {
            ChannelId::One => 0,
            ChannelId::Two => 1,
        }
    }

    /// One-based channel number.
    pub fn number(self) -> u8 {
        self.index() as u8 + 1
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TRK-{}", self.number())
    }
}
