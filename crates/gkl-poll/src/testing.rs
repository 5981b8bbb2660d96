use std::collections::VecDeque;

use gkl_frame::{build_frame, Frame, FRAME_OVERHEAD, MAX_PAYLOAD};
use gkl_transport::{ByteSink, ByteSource, TransportError};

use crate::channel::ChannelId;
use crate::error::{FaultKind, PollError};
use crate::observer::ChannelObserver;

/// In-memory link: records sends, replays queued inbound bytes.
#[derive(Debug, Default)]
pub(crate) struct MockLink {
    pub sent: Vec<Vec<u8>>,
    pub fail_sends: bool,
    pub inbound: VecDeque<u8>,
}

impl MockLink {
    pub fn failing() -> Self {
        Self {
            fail_sends: true,
            ..Self::default()
        }
    }
}

impl ByteSink for MockLink {
    fn send(&mut self, bytes: &[u8]) -> gkl_transport::Result<()> {
        if self.fail_sends {
            return Err(TransportError::Closed);
        }
        self.sent.push(bytes.to_vec());
        Ok(())
    }
}

impl ByteSource for MockLink {
    fn read_available(&mut self, buf: &mut [u8]) -> gkl_transport::Result<usize> {
        let n = buf.len().min(self.inbound.len());
        for slot in buf.iter_mut().take(n) {
            *slot = self.inbound.pop_front().unwrap_or_default();
        }
        Ok(n)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Event {
    Sent(ChannelId, Vec<u8>),
    Received(ChannelId, Frame),
    Fault(ChannelId, FaultKind),
    Stale(ChannelId, usize),
}

/// Observer that keeps everything it is told.
#[derive(Debug, Default)]
pub(crate) struct Recorder {
    pub events: Vec<Event>,
}

impl Recorder {
    pub fn frames(&self) -> Vec<(ChannelId, Frame)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Received(channel, frame) => Some((*channel, frame.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn faults(&self) -> Vec<(ChannelId, FaultKind)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Fault(channel, kind) => Some((*channel, *kind)),
                _ => None,
            })
            .collect()
    }
}

impl ChannelObserver for Recorder {
    fn frame_sent(&mut self, channel: ChannelId, bytes: &[u8]) {
        self.events.push(Event::Sent(channel, bytes.to_vec()));
    }

    fn frame_received(&mut self, channel: ChannelId, frame: &Frame) {
        self.events.push(Event::Received(channel, frame.clone()));
    }

    fn fault(&mut self, channel: ChannelId, error: &PollError) {
        self.events.push(Event::Fault(channel, error.kind()));
    }

    fn stale_frame(&mut self, channel: ChannelId, buffered: usize) {
        self.events.push(Event::Stale(channel, buffered));
    }
}

/// Wire bytes of a frame.
pub(crate) fn wire(station: u8, command: u8, payload: &[u8]) -> Vec<u8> {
    let mut buf = [0u8; FRAME_OVERHEAD + MAX_PAYLOAD];
    let len = build_frame(station, command, payload, &mut buf).unwrap();
    buf[..len].to_vec()
}
