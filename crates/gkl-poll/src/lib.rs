//! Polling core for two independent dispenser channels.
//!
//! Each [`ChannelScheduler`] owns one link, one [`FrameParser`] and its own
//! deadlines. It alternates between issuing a poll and waiting a bounded
//! time for the reply, so a silent station only ever costs its own channel
//! one reply window. The [`Controller`] owns one scheduler per physical
//! channel and routes ad-hoc commands by station address.
//!
//! # Execution contract
//!
//! Everything is driven by the host: [`Controller::tick`] on a periodic
//! cadence and [`Controller::on_byte`] for each received byte, both with a
//! monotonic millisecond timestamp. The two entry points must never run
//! concurrently for the same channel. There is no internal locking; the host
//! guarantees exclusion, e.g. by calling both from one loop or by running the
//! byte handler at a priority the tick cannot preempt.
//!
//! [`FrameParser`]: gkl_frame::FrameParser

pub mod channel;
pub mod clock;
pub mod config;
pub mod controller;
pub mod error;
pub mod observer;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod testing;

pub use channel::ChannelId;
pub use clock::{Clock, MonotonicClock};
pub use config::{ChannelConfig, ControllerConfig};
pub use controller::Controller;
pub use error::{FaultKind, PollError, Result};
pub use observer::{ChannelObserver, ChannelStats};
pub use scheduler::{ChannelScheduler, SchedulerState};
