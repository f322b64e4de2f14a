//! # Clock source
//! The device has no battery backed RTC we trust, only a free running tick counter. The clock
//! remembers which tick count belonged to the last synced epoch and projects forward from there.
//!
//! The tick counter is 32 bits wide and will roll over (a millisecond counter does so after
//! roughly 49.7 days). Elapsed ticks are computed with wrapping subtraction, which is correct
//! across one rollover as long as syncs arrive more often than once per counter period.
use core::fmt;

/// Seconds in one day
pub const SECONDS_PER_DAY: i64 = 86_400;

/// A free running device tick counter.
pub trait Monotonic {
    /// Current tick count, allowed to wrap around
    fn ticks(&self) -> u32;
    /// Tick rate of [`Self::ticks`]
    fn ticks_per_second(&self) -> u32;
}

/// Epoch and the tick count it was set at. Always replaced as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockState {
    /// Seconds since the unix epoch at `monotonic_anchor`
    pub base_epoch: u64,
    /// Device tick count when `base_epoch` was set
    pub monotonic_anchor: u32,
}

/// Local wall clock time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimeOfDay {
    /// 0-23
    pub hour: u8,
    /// 0-59
    pub minute: u8,
    /// 0-59
    pub second: u8,
}

impl TimeOfDay {
    /// Split seconds since midnight into hours, minutes and seconds.
    /// `seconds` is reduced into a single day first, negative values count back from midnight.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub const fn from_day_seconds(seconds: i64) -> Self {
        // floor modulo, a plain % keeps the sign and would yield negative hours
        let secs = seconds.rem_euclid(SECONDS_PER_DAY);
        Self {
            hour: (secs / 3600) as u8,
            minute: ((secs % 3600) / 60) as u8,
            second: (secs % 60) as u8,
        }
    }

    /// Time of day at `epoch` in the zone `offset_seconds` east of UTC
    #[must_use]
    #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss, clippy::cast_lossless)]
    pub const fn at(epoch: u64, offset_seconds: i32) -> Self {
        // epoch % 86400 always fits an i64
        let utc_seconds = (epoch % SECONDS_PER_DAY as u64) as i64;
        Self::from_day_seconds(utc_seconds + offset_seconds as i64)
    }
}

/// Renders as `HH:MM:SS`, zero padded, 24 hour.
impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second)
    }
}

/// Wall clock built from a [`Monotonic`] source and the last synced epoch.
#[derive(Debug)]
pub struct Clock<M> {
    /// Where the ticks come from
    source: M,
    /// Last rebase
    state: ClockState,
}

impl<M: Monotonic> Clock<M> {
    /// Create a clock that reads `initial_epoch` right now. The value is expected to be wrong
    /// until the first sync message arrives.
    pub fn new(source: M, initial_epoch: u64) -> Self {
        let state = ClockState {
            base_epoch: initial_epoch,
            monotonic_anchor: source.ticks(),
        };
        Self { source, state }
    }

    /// Rebase the clock so that the current instant corresponds to `new_epoch`
    pub fn set_epoch(&mut self, new_epoch: u64) {
        // both fields in one assignment, there must never be a fresh epoch with a stale anchor
        self.state = ClockState {
            base_epoch: new_epoch,
            monotonic_anchor: self.source.ticks(),
        };
        debug!("clock rebased to epoch {}", new_epoch);
    }

    /// Seconds since the unix epoch, projected forward from the last rebase
    pub fn current_epoch(&self) -> u64 {
        let elapsed = self.source.ticks().wrapping_sub(self.state.monotonic_anchor);
        let rate = self.source.ticks_per_second().max(1);
        // a bogus sync near u64::MAX must not take the clock down
        self.state
            .base_epoch
            .saturating_add(u64::from(elapsed / rate))
    }

    /// Time of day in the zone `offset_seconds` east of UTC
    pub fn local_time_of_day(&self, offset_seconds: i32) -> TimeOfDay {
        TimeOfDay::at(self.current_epoch(), offset_seconds)
    }

    /// The underlying tick source
    pub const fn source(&self) -> &M {
        &self.source
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use core::cell::Cell;
    use std::rc::Rc;

    /// Millisecond counter the tests move by hand
    #[derive(Debug, Clone, Default)]
    pub(crate) struct FakeTicks(pub(crate) Rc<Cell<u32>>);

    impl FakeTicks {
        pub(crate) fn starting_at(ticks: u32) -> Self {
            Self(Rc::new(Cell::new(ticks)))
        }

        pub(crate) fn advance_ms(&self, ms: u32) {
            self.0.set(self.0.get().wrapping_add(ms));
        }
    }

    impl Monotonic for FakeTicks {
        fn ticks(&self) -> u32 {
            self.0.get()
        }

        fn ticks_per_second(&self) -> u32 {
            1000
        }
    }

    #[test]
    fn set_epoch_then_read_back_immediately() {
        let mut clock = Clock::new(FakeTicks::starting_at(12_345), 0);
        clock.set_epoch(1_625_074_800);
        assert_eq!(clock.current_epoch(), 1_625_074_800);
    }

    #[test]
    fn epoch_projects_forward_in_whole_seconds() {
        let ticks = FakeTicks::starting_at(0);
        let mut clock = Clock::new(ticks.clone(), 0);
        clock.set_epoch(1000);
        ticks.advance_ms(2999);
        assert_eq!(clock.current_epoch(), 1002);
        ticks.advance_ms(1);
        assert_eq!(clock.current_epoch(), 1003);
    }

    #[test]
    fn epoch_survives_tick_counter_rollover() {
        let ticks = FakeTicks::starting_at(u32::MAX - 1999);
        let mut clock = Clock::new(ticks.clone(), 0);
        clock.set_epoch(1_625_074_800);
        ticks.advance_ms(5000);
        // the counter wrapped past zero in between
        assert!(ticks.ticks() < 5000);
        assert_eq!(clock.current_epoch(), 1_625_074_805);
    }

    #[test]
    fn epoch_saturates_instead_of_overflowing() {
        let ticks = FakeTicks::starting_at(0);
        let mut clock = Clock::new(ticks.clone(), 0);
        clock.set_epoch(u64::MAX - 1);
        ticks.advance_ms(5000);
        assert_eq!(clock.current_epoch(), u64::MAX);
        let local = clock.local_time_of_day(-12 * 3600);
        assert!(local.hour < 24);
    }

    #[test]
    fn negative_offset_wraps_to_previous_day() {
        let mut clock = Clock::new(FakeTicks::starting_at(0), 0);
        // 2021-07-01 00:10:00 UTC
        clock.set_epoch(1_625_098_200);
        let local = clock.local_time_of_day(-4 * 3600);
        assert_eq!(
            local,
            TimeOfDay {
                hour: 20,
                minute: 10,
                second: 0
            }
        );
    }

    #[test]
    fn positive_offset_wraps_to_next_day() {
        let mut clock = Clock::new(FakeTicks::starting_at(0), 0);
        // 23:30:15 UTC
        clock.set_epoch(84_615);
        let local = clock.local_time_of_day(5 * 3600);
        assert_eq!((local.hour, local.minute, local.second), (4, 30, 15));
    }

    #[test]
    fn local_time_is_never_out_of_range() {
        let mut clock = Clock::new(FakeTicks::starting_at(0), 0);
        let epochs = [0, 1, 59, 3599, 43_200, 86_399, 86_400, 1_625_074_800, u64::from(u32::MAX)];
        for epoch in epochs {
            clock.set_epoch(epoch);
            for offset in (-12 * 3600..=14 * 3600).step_by(900) {
                let local = clock.local_time_of_day(offset);
                assert!(local.hour < 24, "epoch {epoch} offset {offset}");
                assert!(local.minute < 60);
                assert!(local.second < 60);
            }
        }
    }

    #[test]
    fn display_is_zero_padded() {
        let time = TimeOfDay {
            hour: 7,
            minute: 5,
            second: 9,
        };
        assert_eq!(std::format!("{time}"), "07:05:09");
    }
}
