use gkl_frame::{is_valid_station, STATUS};
use serde::{Deserialize, Serialize};

use crate::channel::ChannelId;
use crate::error::{PollError, Result};

/// Default period between polls of a station.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 200;
/// Default reply window after a poll.
pub const DEFAULT_REPLY_TIMEOUT_MS: u64 = 80;
/// Default quiet gap after which a partial frame is dropped.
pub const DEFAULT_INTERBYTE_GAP_MS: u64 = 10;

/// Immutable parameters of one channel's polling loop.
///
/// The link itself is handed to [`ChannelScheduler::new`](crate::ChannelScheduler::new)
/// alongside this config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChannelConfig {
    /// Station polled on this channel (1..=32).
    pub station: u8,
    /// Command code of the poll frame.
    #[serde(with = "command_char")]
    pub poll_command: u8,
    /// Delay between the end of one poll cycle and the next poll.
    pub poll_interval_ms: u64,
    /// How long to wait for a reply after a poll.
    pub reply_timeout_ms: u64,
    /// Drop a partial frame after this much silence. Must be shorter than the
    /// reply timeout. `None` disables the check.
    pub interbyte_gap_ms: Option<u64>,
    /// Time of the first poll, for staggering channels.
    pub start_delay_ms: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            station: 1,
            poll_command: STATUS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            reply_timeout_ms: DEFAULT_REPLY_TIMEOUT_MS,
            interbyte_gap_ms: Some(DEFAULT_INTERBYTE_GAP_MS),
            start_delay_ms: 0,
        }
    }
}

impl ChannelConfig {
    /// Default timings polling `station`.
    pub fn for_station(station: u8) -> Self {
        Self {
            station,
            ..Self::default()
        }
    }

    /// Check ranges and timing relationships.
    pub fn validate(&self) -> Result<()> {
        if !is_valid_station(self.station) {
            return Err(PollError::InvalidConfig(format!(
                "station {} out of range 1..=32",
                self.station
            )));
        }
        if !self.poll_command.is_ascii_graphic() {
            return Err(PollError::InvalidConfig(format!(
                "poll command 0x{:02X} is not a printable ASCII code",
                self.poll_command
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(PollError::InvalidConfig(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        if self.reply_timeout_ms == 0 {
            return Err(PollError::InvalidConfig(
                "reply timeout must be greater than zero".to_string(),
            ));
        }
        if let Some(gap) = self.interbyte_gap_ms {
            if gap == 0 || gap >= self.reply_timeout_ms {
                return Err(PollError::InvalidConfig(format!(
                    "interbyte gap {gap} ms must be in 1..{} ms",
                    self.reply_timeout_ms
                )));
            }
        }
        Ok(())
    }
}

/// Configuration of both channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControllerConfig {
    pub channel_one: ChannelConfig,
    pub channel_two: ChannelConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            channel_one: ChannelConfig {
                station: 1,
                start_delay_ms: 10,
                ..ChannelConfig::default()
            },
            channel_two: ChannelConfig {
                station: 2,
                start_delay_ms: 100,
                ..ChannelConfig::default()
            },
        }
    }
}

impl ControllerConfig {
    /// Config of one channel.
    pub fn channel(&self, id: ChannelId) -> &ChannelConfig {
        match id {
            ChannelId::One => &self.channel_one,
            ChannelId::Two => &self.channel_two,
        }
    }

    /// Mutable config of one channel.
    pub fn channel_mut(&mut self, id: ChannelId) -> &mut ChannelConfig {
        match id {
            ChannelId::One => &mut self.channel_one,
            ChannelId::Two => &mut self.channel_two,
        }
    }

    /// Validate both channels and their address partitions.
    pub fn validate(&self) -> Result<()> {
        for id in ChannelId::ALL {
            let config = self.channel(id);
            config.validate()?;
            if !id.serves(config.station) {
                return Err(PollError::InvalidConfig(format!(
                    "station {} is not wired to {id}",
                    config.station
                )));
            }
        }
        Ok(())
    }
}

/// Serializes a command byte as a one-character string.
mod command_char {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(command: &u8, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_char(*command as char)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
        let c = char::deserialize(deserializer)?;
        if c.is_ascii_graphic() {
            Ok(c as u8)
        } else {
            Err(D::Error::custom(format!(
                "command must be a printable ASCII character, got {c:?}"
            )))
        }
    }
}
