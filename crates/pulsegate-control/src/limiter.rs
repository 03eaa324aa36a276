//! Per-channel command rate limiter
//!
//! Pure decision logic: the caller supplies the current time, so behaviour is
//! fully deterministic and the limiter never touches a clock or does I/O.

use std::time::Duration;

use pulsegate_common::Channel;
use tokio::time::Instant;

/// Minimum spacing between accepted commands, tracked per channel
#[derive(Debug, Clone)]
pub struct ChannelRateLimiter {
    interval: Duration,
    /// Last accepted command per channel, `None` until the first one
    last_send: [Option<Instant>; 2],
}

impl ChannelRateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_send: [None; 2],
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Accept a command for `channel` at `now` if the interval has elapsed.
    ///
    /// On accept the channel's last-send time moves to `now`; on reject the
    /// state is left untouched.
    pub fn try_accept(&mut self, channel: Channel, now: Instant) -> bool {
        let slot = &mut self.last_send[channel.index()];
        match *slot {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            last => {
                // Keep timestamps monotonic even if callers pass an older `now`
                *slot = Some(last.map_or(now, |last| last.max(now)));
                true
            }
        }
    }

    /// Last accepted command time for a channel
    pub fn last_send(&self, channel: Channel) -> Option<Instant> {
        self.last_send[channel.index()]
    }

    /// Whether no command has been accepted for `channel` within the interval
    pub fn is_idle(&self, channel: Channel, now: Instant) -> bool {
        match self.last_send[channel.index()] {
            Some(last) => now.saturating_duration_since(last) >= self.interval,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn limiter() -> ChannelRateLimiter {
        ChannelRateLimiter::new(Duration::from_millis(500))
    }

    #[test]
    fn test_first_command_accepted() {
        let mut limiter = limiter();
        let now = Instant::now();
        assert!(limiter.last_send(Channel::A).is_none());
        assert!(limiter.try_accept(Channel::A, now));
        assert_eq!(limiter.last_send(Channel::A), Some(now));
    }

    #[test]
    fn test_reject_within_interval() {
        let mut limiter = limiter();
        let t0 = Instant::now();
        assert!(limiter.try_accept(Channel::A, t0));
        assert!(!limiter.try_accept(Channel::A, t0 + Duration::from_millis(200)));
        assert!(!limiter.try_accept(Channel::A, t0 + Duration::from_millis(499)));
        // Rejections leave the timestamp alone
        assert_eq!(limiter.last_send(Channel::A), Some(t0));
    }

    #[test]
    fn test_accept_at_exact_boundary() {
        let mut limiter = limiter();
        let t0 = Instant::now();
        assert!(limiter.try_accept(Channel::B, t0));
        let t1 = t0 + Duration::from_millis(500);
        assert!(limiter.try_accept(Channel::B, t1));
        assert_eq!(limiter.last_send(Channel::B), Some(t1));
    }

    #[test]
    fn test_channels_are_independent() {
        let mut limiter = limiter();
        let t0 = Instant::now();
        assert!(limiter.try_accept(Channel::A, t0));
        assert!(limiter.try_accept(Channel::B, t0 + Duration::from_millis(10)));
        assert!(!limiter.try_accept(Channel::A, t0 + Duration::from_millis(20)));
    }

    #[test]
    fn test_earlier_time_never_moves_timestamp_back() {
        let mut limiter = limiter();
        let t0 = Instant::now() + Duration::from_secs(10);
        assert!(limiter.try_accept(Channel::A, t0));
        assert!(!limiter.try_accept(Channel::A, t0 - Duration::from_secs(5)));
        assert_eq!(limiter.last_send(Channel::A), Some(t0));
    }

    #[test]
    fn test_idle_tracking() {
        let mut limiter = limiter();
        let t0 = Instant::now();
        assert!(limiter.is_idle(Channel::A, t0));

        limiter.try_accept(Channel::A, t0);
        assert!(!limiter.is_idle(Channel::A, t0 + Duration::from_millis(100)));
        assert!(limiter.is_idle(Channel::A, t0 + Duration::from_millis(500)));
        assert!(limiter.is_idle(Channel::B, t0));
    }

    #[test]
    fn test_zero_interval_accepts_everything() {
        let mut limiter = ChannelRateLimiter::new(Duration::ZERO);
        let t0 = Instant::now();
        assert!(limiter.try_accept(Channel::A, t0));
        assert!(limiter.try_accept(Channel::A, t0));
    }

    fn channel_of(is_b: bool) -> Channel {
        if is_b { Channel::B } else { Channel::A }
    }

    fn check_sequence(interval_ms: u64, events: &[(bool, u64)]) -> Result<(), TestCaseError> {
        let interval = Duration::from_millis(interval_ms);
        let mut limiter = ChannelRateLimiter::new(interval);
        let base = Instant::now();

        for &(is_b, offset_ms) in events {
            let channel = channel_of(is_b);
            let now = base + Duration::from_millis(offset_ms);
            let before = [limiter.last_send(Channel::A), limiter.last_send(Channel::B)];
            let prev = before[channel.index()];

            if limiter.try_accept(channel, now) {
                if let Some(prev) = prev {
                    prop_assert!(now >= prev + interval);
                }
                prop_assert_eq!(limiter.last_send(channel), Some(now));
                let other = channel_of(!is_b);
                prop_assert_eq!(limiter.last_send(other), before[other.index()]);
            } else {
                prop_assert_eq!(
                    [limiter.last_send(Channel::A), limiter.last_send(Channel::B)],
                    before
                );
            }

            if let (Some(prev), Some(last)) = (prev, limiter.last_send(channel)) {
                prop_assert!(last >= prev);
            }
        }
        Ok(())
    }

    proptest! {
        #[test]
        fn prop_accepted_commands_respect_interval(
            interval_ms in 1u64..1000,
            events in prop::collection::vec((any::<bool>(), 0u64..5000), 0..64),
        ) {
            check_sequence(interval_ms, &events)?;
        }

        #[test]
        fn prop_monotone_stream_respects_interval(
            interval_ms in 1u64..1000,
            mut events in prop::collection::vec((any::<bool>(), 0u64..5000), 0..64),
        ) {
            events.sort_by_key(|&(_, offset_ms)| offset_ms);
            check_sequence(interval_ms, &events)?;
        }
    }
}
