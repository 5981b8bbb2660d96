use gkl_frame::{is_valid_station, FrameError, STATUS, STOP};
use gkl_transport::{ByteSink, ByteSource};
use tracing::info;

use crate::channel::ChannelId;
use crate::config::ControllerConfig;
use crate::error::Result;
use crate::observer::ChannelObserver;
use crate::scheduler::ChannelScheduler;

/// Two independent channel schedulers behind one facade.
///
/// Odd stations live on channel one, even stations on channel two. The
/// channels share no state, so a fault or a silent station on one never
/// shifts the other's timing.
#[derive(Debug)]
pub struct Controller<S> {
    one: ChannelScheduler<S>,
    two: ChannelScheduler<S>,
}

impl<S: ByteSink> Controller<S> {
    /// Build both schedulers. `link_one` and `link_two` are the ports wired
    /// to channel one and channel two.
    pub fn new(config: ControllerConfig, link_one: S, link_two: S) -> Result<Self> {
        config.validate()?;
        let ControllerConfig {
            channel_one,
            channel_two,
        } = config;

        info!(
            one = channel_one.station,
            two = channel_two.station,
            "controller configured"
        );
        Ok(Self {
            one: ChannelScheduler::new(ChannelId::One, channel_one, link_one)?,
            two: ChannelScheduler::new(ChannelId::Two, channel_two, link_two)?,
        })
    }

    /// Advance both channels' timers.
    pub fn tick<O: ChannelObserver + ?Sized>(&mut self, now: u64, observer: &mut O) {
        self.one.tick(now, observer);
        self.two.tick(now, observer);
    }

    /// Feed a byte received on `channel`.
    pub fn on_byte<O: ChannelObserver + ?Sized>(
        &mut self,
        channel: ChannelId,
        byte: u8,
        now: u64,
        observer: &mut O,
    ) {
        self.channel_mut(channel).on_byte(byte, now, observer);
    }

    /// Send a command to `station` on whichever channel serves it.
    pub fn send_command<O: ChannelObserver + ?Sized>(
        &mut self,
        station: u8,
        command: u8,
        payload: &[u8],
        observer: &mut O,
    ) -> Result<ChannelId> {
        if !is_valid_station(station) {
            return Err(FrameError::InvalidAddress(station).into());
        }
        let id = ChannelId::for_station(station);
        self.channel_mut(id)
            .send_command(station, command, payload, observer)?;
        Ok(id)
    }

    /// Ask `station` for its status outside the poll cadence.
    pub fn request_status<O: ChannelObserver + ?Sized>(
        &mut self,
        station: u8,
        observer: &mut O,
    ) -> Result<ChannelId> {
        self.send_command(station, STATUS, &[], observer)
    }

    /// Tell `station` to stop dispensing.
    pub fn stop<O: ChannelObserver + ?Sized>(
        &mut self,
        station: u8,
        observer: &mut O,
    ) -> Result<ChannelId> {
        self.send_command(station, STOP, &[], observer)
    }
}

impl<S: ByteSink + ByteSource> Controller<S> {
    /// Drain both links and tick both channels. Returns bytes fed per
    /// channel.
    pub fn service<O: ChannelObserver + ?Sized>(
        &mut self,
        now: u64,
        observer: &mut O,
    ) -> [usize; 2] {
        [
            self.one.service(now, observer),
            self.two.service(now, observer),
        ]
    }
}

impl<S> Controller<S> {
    /// One channel's scheduler.
    pub fn channel(&self, id: ChannelId) -> &ChannelScheduler<S> {
        match id {
            ChannelId::One => &self.one,
            ChannelId::Two => &self.two,
        }
    }

    /// One channel's scheduler, mutably.
    pub fn channel_mut(&mut self, id: ChannelId) -> &mut ChannelScheduler<S> {
        match id {
            ChannelId::One => &mut self.one,
            ChannelId::Two => &mut self.two,
        }
    }

    /// Earliest time either channel needs a tick.
    pub fn next_wakeup(&self) -> u64 {
        self.one.next_wakeup().min(self.two.next_wakeup())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChannelConfig;
    use crate::error::{FaultKind, PollError};
    use crate::scheduler::SchedulerState;
    use crate::testing::{wire, MockLink, Recorder};

    fn controller() -> Controller<MockLink> {
        Controller::new(
            ControllerConfig::default(),
            MockLink::default(),
            MockLink::default(),
        )
        .unwrap()
    }

    #[test]
    fn rejects_swapped_stations() {
        let config = ControllerConfig {
            channel_one: ChannelConfig::for_station(2),
            channel_two: ChannelConfig::for_station(1),
        };
        let result = Controller::new(config, MockLink::default(), MockLink::default());
        assert!(matches!(result, Err(PollError::InvalidConfig(_))));
    }

    #[test]
    fn channels_start_staggered() {
        let mut ctl = controller();
        let mut obs = Recorder::default();

        ctl.tick(10, &mut obs);
        assert_eq!(ctl.channel(ChannelId::One).link().sent.len(), 1);
        assert!(ctl.channel(ChannelId::Two).link().sent.is_empty());

        ctl.tick(100, &mut obs);
        assert_eq!(
            ctl.channel(ChannelId::Two).link().sent,
            vec![vec![0x02, 0x00, 0x02, b'S', b'Q']]
        );
    }

    #[test]
    fn routes_commands_by_parity() {
        let mut ctl = controller();
        let mut obs = Recorder::default();

        assert_eq!(ctl.stop(7, &mut obs).unwrap(), ChannelId::One);
        assert_eq!(ctl.request_status(12, &mut obs).unwrap(), ChannelId::Two);

        assert_eq!(
            ctl.channel(ChannelId::One).link().sent,
            vec![wire(7, b'B', &[])]
        );
        assert_eq!(
            ctl.channel(ChannelId::Two).link().sent,
            vec![wire(12, b'S', &[])]
        );
    }

    #[test]
    fn rejects_out_of_range_station() {
        let mut ctl = controller();
        let mut obs = Recorder::default();

        let err = ctl.send_command(33, b'S', &[], &mut obs).unwrap_err();
        assert_eq!(err.kind(), FaultKind::Validation);
        assert!(ctl.channel(ChannelId::One).link().sent.is_empty());
        assert!(ctl.channel(ChannelId::Two).link().sent.is_empty());
    }

    #[test]
    fn silent_channel_does_not_delay_other() {
        let mut ctl = controller();
        let mut obs = Recorder::default();
        let reply = wire(2, b'S', b"10");

        // Channel one never answers. Channel two answers every poll 5 ms
        // after it goes out.
        let mut reply_at = None;
        for now in 0..=1000u64 {
            if reply_at == Some(now) {
                for byte in &reply {
                    ctl.on_byte(ChannelId::Two, *byte, now, &mut obs);
                }
                reply_at = None;
            }
            let before = ctl.channel(ChannelId::Two).stats().polls_sent;
            ctl.tick(now, &mut obs);
            if ctl.channel(ChannelId::Two).stats().polls_sent > before {
                reply_at = Some(now + 5);
            }
        }

        let one = ctl.channel(ChannelId::One).stats();
        let two = ctl.channel(ChannelId::Two).stats();
        // Channel one: polls at 10, 290, 570, 850, each timing out.
        assert_eq!(one.polls_sent, 4);
        assert_eq!(one.timeouts, 4);
        // Channel two: polls at 100, 305, 510, 715, 920.
        assert_eq!(two.polls_sent, 5);
        assert_eq!(two.timeouts, 0);
        assert_eq!(two.frames_received, 5);
        assert!(obs
            .faults()
            .iter()
            .all(|(id, kind)| *id == ChannelId::One && *kind == FaultKind::ReplyTimeout));
    }

    #[test]
    fn fault_on_one_channel_leaves_other_untouched() {
        let mut ctl = controller();
        let mut obs = Recorder::default();
        ctl.tick(100, &mut obs);
        assert_eq!(ctl.channel(ChannelId::One).state(), SchedulerState::WaitingReply);
        assert_eq!(ctl.channel(ChannelId::Two).state(), SchedulerState::WaitingReply);

        let mut bad = wire(1, b'S', b"10");
        *bad.last_mut().unwrap() ^= 0xFF;
        for byte in bad {
            ctl.on_byte(ChannelId::One, byte, 101, &mut obs);
        }

        assert_eq!(ctl.channel(ChannelId::One).state(), SchedulerState::Idle);
        assert_eq!(ctl.channel(ChannelId::Two).state(), SchedulerState::WaitingReply);
        assert_eq!(ctl.channel(ChannelId::Two).reply_deadline(), Some(180));
    }

    #[test]
    fn service_reads_both_links() {
        let mut ctl = controller();
        let mut obs = Recorder::default();
        ctl.tick(100, &mut obs);

        ctl.channel_mut(ChannelId::One)
            .link_mut()
            .inbound
            .extend(wire(1, b'S', b"00"));
        ctl.channel_mut(ChannelId::Two)
            .link_mut()
            .inbound
            .extend(wire(2, b'L', b"0000000000"));

        assert_eq!(ctl.service(110, &mut obs), [7, 15]);
        assert_eq!(obs.frames().len(), 2);
        assert_eq!(ctl.next_wakeup(), 310);
    }
}
