use gkl_frame::Frame;
use serde::Serialize;

use crate::channel::ChannelId;
use crate::error::PollError;

/// Receives frames and diagnostics from the schedulers.
///
/// This is both the result consumer and the diagnostics sink. Every method
/// returns `()`; nothing an observer does can change scheduler state. All
/// methods default to doing nothing, and `()` is a valid observer.
pub trait ChannelObserver {
    /// A frame was written to the channel's link.
    fn frame_sent(&mut self, _channel: ChannelId, _bytes: &[u8]) {}

    /// A frame passed its checksum.
    fn frame_received(&mut self, _channel: ChannelId, _frame: &Frame) {}

    /// A recoverable fault: checksum mismatch, overflow, timeout or a
    /// transport failure.
    fn fault(&mut self, _channel: ChannelId, _error: &PollError) {}

    /// A partial frame was dropped after an inter-byte silence.
    fn stale_frame(&mut self, _channel: ChannelId, _buffered: usize) {}
}

impl ChannelObserver for () {}

impl<T: ChannelObserver + ?Sized> ChannelObserver for &mut T {
    fn frame_sent(&mut self, channel: ChannelId, bytes: &[u8]) {
        (**self).frame_sent(channel, bytes)
    }

    fn frame_received(&mut self, channel: ChannelId, frame: &Frame) {
        (**self).frame_received(channel, frame)
    }

    fn fault(&mut self, channel: ChannelId, error: &PollError) {
        (**self).fault(channel, error)
    }

    fn stale_frame(&mut self, channel: ChannelId, buffered: usize) {
        (**self).stale_frame(channel, buffered)
    }
}

/// Per-channel counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChannelStats {
    pub polls_sent: u64,
    pub commands_sent: u64,
    pub frames_received: u64,
    pub checksum_errors: u64,
    pub overflows: u64,
    pub timeouts: u64,
    pub send_failures: u64,
    pub receive_failures: u64,
    pub stale_resets: u64,
}
