use std::time::{Duration, Instant};

use time::OffsetDateTime;

/// Monotonic millisecond clock anchored to a wall-clock epoch.
///
/// Wall-clock stamps are derived from the monotonic reading, so the
/// difference of two stamps always equals the difference of the readings.
pub trait Clock {
    /// Milliseconds since the epoch. Never goes backward.
    fn now(&self) -> u64;
    fn epoch(&self) -> OffsetDateTime;
    /// Moves time forward to `at_ms`. Virtual clocks jump, real clocks sleep.
    fn advance_to(&mut self, at_ms: u64);

    fn wall_time(&self, at_ms: u64) -> OffsetDateTime {
        self.epoch() + time::Duration::milliseconds(at_ms as i64)
    }
}

/// Real time, backed by `Instant` and a platform high-precision sleep.
#[derive(Debug, Clone)]
pub struct SystemClock {
    start: Instant,
    epoch: OffsetDateTime,
}

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    fn epoch(&self) -> OffsetDateTime {
        self.epoch
    }

    fn advance_to(&mut self, at_ms: u64) {
        // A sleep may end early; only the clock reading decides when we are there.
        loop {
            let now = self.now();
            if now >= at_ms {
                break;
            }
            self.high_precision_sleep(Duration::from_millis(at_ms - now));
        }
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            epoch: OffsetDateTime::now_utc(),
        }
    }

    pub fn high_precision_sleep(&self, duration: Duration) {
        #[cfg(target_os = "linux")]
        self.linux_sleep(duration);
        #[cfg(not(target_os = "linux"))]
        std::thread::sleep(duration);
    }

    /// Relative `clock_nanosleep` on the monotonic clock, resumed with the
    /// remaining time whenever a signal interrupts it.
    #[cfg(target_os = "linux")]
    fn linux_sleep(&self, duration: Duration) {
        let mut request = libc::timespec {
            tv_sec: duration.as_secs() as libc::time_t,
            tv_nsec: duration.subsec_nanos() as libc::c_long,
        };
        let mut remaining = libc::timespec { tv_sec: 0, tv_nsec: 0 };
        loop {
            // SAFETY: both pointers refer to live, initialized stack values.
            let rc = unsafe {
                libc::clock_nanosleep(libc::CLOCK_MONOTONIC, 0, &request, &mut remaining)
            };
            if rc != libc::EINTR {
                break;
            }
            request = remaining;
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Virtual time for simulations and tests.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: u64,
    epoch: OffsetDateTime,
}

impl ManualClock {
    pub fn new(epoch: OffsetDateTime) -> Self {
        Self { now: 0, epoch }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(OffsetDateTime::UNIX_EPOCH)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.now
    }

    fn epoch(&self) -> OffsetDateTime {
        self.epoch
    }

    fn advance_to(&mut self, at_ms: u64) {
        self.now = self.now.max(at_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn manual_clock_never_goes_backward() {
        let mut clock = ManualClock::default();
        clock.advance_to(500);
        clock.advance_to(200);
        assert_eq!(clock.now(), 500);
    }

    #[test]
    fn wall_time_is_epoch_plus_reading() {
        let clock = ManualClock::new(datetime!(2025-01-01 09:00:00 UTC));
        assert_eq!(clock.wall_time(1_500), datetime!(2025-01-01 09:00:01.5 UTC));
    }

    #[test]
    fn system_clock_sleeps_until_target() {
        let mut clock = SystemClock::new();
        let target = clock.now() + 5;
        clock.advance_to(target);
        assert!(clock.now() >= target);
    }

    #[test]
    fn system_clock_reaches_each_target_in_a_run_of_short_waits() {
        let mut clock = SystemClock::new();
        for step in 1..=10 {
            let target = clock.now() + step % 3;
            clock.advance_to(target);
            assert!(clock.now() >= target, "step {step}: {} < {target}", clock.now());
        }
        // A target in the past returns at once.
        let before = clock.now();
        clock.advance_to(0);
        assert!(clock.now() - before < 50);
    }
}
