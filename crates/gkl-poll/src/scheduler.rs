use gkl_frame::{
    build_frame, Direction, Frame, FrameError, FrameParser, HexBytes, FRAME_OVERHEAD,
    MAX_PAYLOAD, PARSER_CAPACITY,
};
use gkl_transport::{ByteSink, ByteSource};
use tracing::{debug, trace, warn};

use crate::channel::ChannelId;
use crate::config::ChannelConfig;
use crate::error::{PollError, Result};
use crate::observer::{ChannelObserver, ChannelStats};

const READ_CHUNK_SIZE: usize = 64;
const MAX_READS_PER_SERVICE: usize = 8;

/// Where a channel is in its poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Free to send the next poll once its deadline passes.
    Idle,
    /// Poll sent; waiting for a complete frame or the reply deadline.
    WaitingReply,
}

/// Poll/reply state machine for one physical channel.
///
/// Owns the channel's link, parser and deadlines. Two instances share
/// nothing, so one silent station cannot delay the other channel.
///
/// All times are milliseconds on the host's monotonic clock. `N` is the
/// parser's accumulation capacity.
pub struct ChannelScheduler<S, const N: usize = PARSER_CAPACITY> {
    id: ChannelId,
    config: ChannelConfig,
    link: S,
    state: SchedulerState,
    next_poll_at: u64,
    reply_deadline: u64,
    last_byte_at: Option<u64>,
    parser: FrameParser<N>,
    stats: ChannelStats,
}

impl<S: ByteSink> ChannelScheduler<S> {
    /// Create an idle scheduler whose first poll is due at
    /// `config.start_delay_ms`.
    pub fn new(id: ChannelId, config: ChannelConfig, link: S) -> Result<Self> {
        Self::with_capacity(id, config, link)
    }
}

impl<S: ByteSink, const N: usize> ChannelScheduler<S, N> {
    /// Like [`new`](ChannelScheduler::new) with an `N`-byte parser buffer.
    pub fn with_capacity(id: ChannelId, config: ChannelConfig, link: S) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            id,
            next_poll_at: config.start_delay_ms,
            config,
            link,
            state: SchedulerState::Idle,
            reply_deadline: 0,
            last_byte_at: None,
            parser: FrameParser::with_direction(Direction::Reply),
            stats: ChannelStats::default(),
        })
    }

    /// Advance timers: send a due poll, expire the reply window, drop a
    /// stale partial frame.
    pub fn tick<O: ChannelObserver + ?Sized>(&mut self, now: u64, observer: &mut O) {
        self.expire_stale(now, observer);
        match self.state {
            SchedulerState::Idle => {
                if now >= self.next_poll_at {
                    self.poll(now, observer);
                }
            }
            SchedulerState::WaitingReply => {
                if now >= self.reply_deadline {
                    self.time_out(now, observer);
                }
            }
        }
    }

    /// Feed one received byte.
    ///
    /// Completes synchronously and never waits on the link, so it can run
    /// from a receive interrupt.
    pub fn on_byte<O: ChannelObserver + ?Sized>(&mut self, byte: u8, now: u64, observer: &mut O) {
        self.expire_stale(now, observer);
        self.feed(byte, now, observer);
    }

    fn feed<O: ChannelObserver + ?Sized>(&mut self, byte: u8, now: u64, observer: &mut O) {
        self.last_byte_at = Some(now);
        trace!(channel = %self.id, byte = format_args!("{byte:02X}"), "rx byte");

        match self.parser.push(byte) {
            Ok(None) => {}
            Ok(Some(frame)) => self.accept_frame(&frame, now, observer),
            Err(err) => self.reject_frame(err, now, observer),
        }
    }

    /// Send an ad-hoc command frame outside the poll cadence.
    ///
    /// The poll cycle is left untouched; a reply is delivered like any other
    /// frame.
    pub fn send_command<O: ChannelObserver + ?Sized>(
        &mut self,
        station: u8,
        command: u8,
        payload: &[u8],
        observer: &mut O,
    ) -> Result<()> {
        let mut buf = [0u8; FRAME_OVERHEAD + MAX_PAYLOAD];
        let len = build_frame(station, command, payload, &mut buf)?;
        let bytes = &buf[..len];

        if let Err(err) = self.link.send(bytes) {
            self.stats.send_failures += 1;
            warn!(channel = %self.id, station, error = %err, "command send failed");
            return Err(err.into());
        }

        self.stats.commands_sent += 1;
        debug!(
            channel = %self.id,
            station,
            command = %char::from(command),
            bytes = %HexBytes(bytes),
            "command sent"
        );
        observer.frame_sent(self.id, bytes);
        Ok(())
    }

    fn poll<O: ChannelObserver + ?Sized>(&mut self, now: u64, observer: &mut O) {
        let mut buf = [0u8; FRAME_OVERHEAD];
        let sent = build_frame(self.config.station, self.config.poll_command, &[], &mut buf)
            .map_err(PollError::from)
            .and_then(|len| {
                self.link.send(&buf[..len])?;
                Ok(len)
            });

        match sent {
            Ok(len) => {
                self.stats.polls_sent += 1;
                debug!(
                    channel = %self.id,
                    station = self.config.station,
                    bytes = %HexBytes(&buf[..len]),
                    "poll sent"
                );
                observer.frame_sent(self.id, &buf[..len]);
                self.parser.reset();
                self.last_byte_at = None;
                self.reply_deadline = now.saturating_add(self.config.reply_timeout_ms);
                self.state = SchedulerState::WaitingReply;
            }
            Err(err) => {
                self.stats.send_failures += 1;
                warn!(
                    channel = %self.id,
                    station = self.config.station,
                    error = %err,
                    "poll send failed"
                );
                observer.fault(self.id, &err);
                self.next_poll_at = now.saturating_add(self.config.poll_interval_ms);
            }
        }
    }

    fn accept_frame<O: ChannelObserver + ?Sized>(
        &mut self,
        frame: &Frame,
        now: u64,
        observer: &mut O,
    ) {
        self.stats.frames_received += 1;
        debug!(
            channel = %self.id,
            station = frame.address,
            command = %char::from(frame.command),
            payload = %HexBytes(&frame.payload),
            "frame received"
        );

        if self.state == SchedulerState::WaitingReply && frame.address != self.config.station {
            warn!(
                channel = %self.id,
                expected = self.config.station,
                station = frame.address,
                "reply from unexpected station"
            );
        }

        observer.frame_received(self.id, frame);

        if self.state == SchedulerState::WaitingReply {
            self.finish_cycle(now);
        }
    }

    fn reject_frame<O: ChannelObserver + ?Sized>(
        &mut self,
        err: FrameError,
        now: u64,
        observer: &mut O,
    ) {
        match err {
            FrameError::ChecksumMismatch { .. } => self.stats.checksum_errors += 1,
            FrameError::BufferOverflow { .. } => self.stats.overflows += 1,
            _ => {}
        }
        let err = PollError::from(err);
        warn!(channel = %self.id, error = %err, "discarding malformed frame");
        observer.fault(self.id, &err);

        if self.state == SchedulerState::WaitingReply {
            self.finish_cycle(now);
        }
    }

    fn time_out<O: ChannelObserver + ?Sized>(&mut self, now: u64, observer: &mut O) {
        self.stats.timeouts += 1;
        let err = PollError::ReplyTimeout {
            waited_ms: self.config.reply_timeout_ms,
        };
        warn!(
            channel = %self.id,
            station = self.config.station,
            buffered = self.parser.buffered(),
            "{err}"
        );
        observer.fault(self.id, &err);
        self.parser.reset();
        self.finish_cycle(now);
    }

    fn expire_stale<O: ChannelObserver + ?Sized>(&mut self, now: u64, observer: &mut O) {
        let (Some(gap), Some(last)) = (self.config.interbyte_gap_ms, self.last_byte_at) else {
            return;
        };
        if !self.parser.in_frame() || now.saturating_sub(last) <= gap {
            return;
        }

        let buffered = self.parser.buffered();
        self.parser.reset();
        self.last_byte_at = None;
        self.stats.stale_resets += 1;
        debug!(channel = %self.id, buffered, silent_ms = now - last, "dropping stale partial frame");
        observer.stale_frame(self.id, buffered);
    }

    fn finish_cycle(&mut self, now: u64) {
        self.last_byte_at = None;
        self.next_poll_at = now.saturating_add(self.config.poll_interval_ms);
        self.state = SchedulerState::Idle;
    }
}

impl<S: ByteSink + ByteSource, const N: usize> ChannelScheduler<S, N> {
    /// Feed whatever the link has already received, then [`tick`](Self::tick).
    ///
    /// Bytes drained here were already waiting in the driver, so they are
    /// fed without the inter-byte gap check. The gap is only measured by the
    /// closing tick, once the link has been drained.
    ///
    /// Read failures are reported to the observer and do not stop the tick.
    /// Returns the number of bytes fed.
    pub fn service<O: ChannelObserver + ?Sized>(&mut self, now: u64, observer: &mut O) -> usize {
        let mut fed = 0usize;
        let mut chunk = [0u8; READ_CHUNK_SIZE];

        for _ in 0..MAX_READS_PER_SERVICE {
            let read = match self.link.read_available(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(err) => {
                    self.stats.receive_failures += 1;
                    let err = PollError::from(err);
                    warn!(channel = %self.id, error = %err, "link read failed");
                    observer.fault(self.id, &err);
                    break;
                }
            };
            for byte in &chunk[..read] {
                self.feed(*byte, now, observer);
            }
            fed += read;
        }

        self.tick(now, observer);
        fed
    }
}

impl<S, const N: usize> ChannelScheduler<S, N> {
    /// Which channel this is.
    pub fn id(&self) -> ChannelId {
        self.id
    }

    /// Configuration fixed at construction.
    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Current state.
    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Earliest time the next poll may be sent (meaningful while idle).
    pub fn next_poll_at(&self) -> u64 {
        self.next_poll_at
    }

    /// Reply deadline of the outstanding poll, if any.
    pub fn reply_deadline(&self) -> Option<u64> {
        match self.state {
            SchedulerState::WaitingReply => Some(self.reply_deadline),
            SchedulerState::Idle => None,
        }
    }

    /// Earliest time a `tick` could change anything.
    pub fn next_wakeup(&self) -> u64 {
        let timer = match self.state {
            SchedulerState::Idle => self.next_poll_at,
            SchedulerState::WaitingReply => self.reply_deadline,
        };
        let stale_at = match (self.config.interbyte_gap_ms, self.last_byte_at) {
            (Some(gap), Some(last)) if self.parser.in_frame() => {
                last.saturating_add(gap).saturating_add(1)
            }
            _ => u64::MAX,
        };
        timer.min(stale_at)
    }

    /// Counters since construction.
    pub fn stats(&self) -> ChannelStats {
        self.stats
    }

    /// The channel's parser.
    pub fn parser(&self) -> &FrameParser<N> {
        &self.parser
    }

    /// Borrow the link.
    pub fn link(&self) -> &S {
        &self.link
    }

    /// Mutably borrow the link.
    pub fn link_mut(&mut self) -> &mut S {
        &mut self.link
    }
}

impl<S, const N: usize> std::fmt::Debug for ChannelScheduler<S, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelScheduler")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("next_poll_at", &self.next_poll_at)
            .field("reply_deadline", &self.reply_deadline())
            .field("stats", &self.stats)
            .finish()
    }
}
