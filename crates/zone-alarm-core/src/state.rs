//! # Shared state
//! The clock, the zone table with the active zone, and the alarms. The engine owns one
//! instance and lends it to the router, nothing here is a global.
use crate::alarm::AlarmStore;
use crate::clock::{Clock, Monotonic};
use crate::error::Error;
use crate::timezone::{TimezoneEntry, TimezoneRegistry};

/// Everything inbound messages and the zone button act upon.
#[derive(Debug)]
pub struct ZoneAlarmState<'a, M> {
    /// Synced wall clock
    pub clock: Clock<M>,
    /// Alarms from the last alarm-update
    pub alarms: AlarmStore,
    /// The selectable zones
    registry: TimezoneRegistry<'a>,
    /// Index into `registry`, always valid
    active_zone: usize,
}

impl<'a, M: Monotonic> ZoneAlarmState<'a, M> {
    /// Create the state with `default_zone` active.
    ///
    /// # Errors
    /// [`Error::OutOfRange`] if `default_zone` is not an index of `registry`.
    pub fn new(
        registry: TimezoneRegistry<'a>,
        clock: Clock<M>,
        default_zone: usize,
    ) -> Result<Self, Error> {
        registry.resolve(default_zone)?;
        Ok(Self {
            clock,
            alarms: AlarmStore::new(),
            registry,
            active_zone: default_zone,
        })
    }

    /// The zone table
    pub const fn registry(&self) -> &TimezoneRegistry<'a> {
        &self.registry
    }

    /// Index of the active zone
    pub const fn active_zone_index(&self) -> usize {
        self.active_zone
    }

    /// The active zone
    pub fn active_zone(&self) -> &'a TimezoneEntry {
        self.registry.resolve_wrapping(self.active_zone)
    }

    /// Make `index` the active zone. An invalid index leaves the active zone as it was.
    ///
    /// # Errors
    /// [`Error::OutOfRange`] if `index` is not an index of the registry.
    pub fn set_active_zone(&mut self, index: usize) -> Result<(), Error> {
        self.registry.resolve(index)?;
        self.active_zone = index;
        Ok(())
    }

    /// Step to the next zone in the table, wrapping at the end, and return it
    pub fn advance_zone(&mut self) -> &'a TimezoneEntry {
        self.active_zone = self.registry.advance(self.active_zone);
        self.active_zone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::tests::FakeTicks;
    use crate::timezone::DEFAULT_ZONES;

    fn state() -> ZoneAlarmState<'static, FakeTicks> {
        let registry = TimezoneRegistry::new(&DEFAULT_ZONES).unwrap();
        ZoneAlarmState::new(registry, Clock::new(FakeTicks::default(), 0), 2).unwrap()
    }

    #[test]
    fn invalid_default_zone_is_rejected() {
        let registry = TimezoneRegistry::new(&DEFAULT_ZONES).unwrap();
        let result = ZoneAlarmState::new(registry, Clock::new(FakeTicks::default(), 0), 9);
        assert_eq!(result.unwrap_err(), Error::OutOfRange { index: 9, len: 4 });
    }

    #[test]
    fn out_of_range_selection_keeps_previous_zone() {
        let mut state = state();
        assert!(state.set_active_zone(4).is_err());
        assert_eq!(state.active_zone().name, "Tashkent");
        state.set_active_zone(1).unwrap();
        assert_eq!(state.active_zone().name, "CET");
    }

    #[test]
    fn advance_wraps_at_end_of_table() {
        let mut state = state();
        assert_eq!(state.advance_zone().name, "EST");
        assert_eq!(state.advance_zone().name, "UTC");
        assert_eq!(state.active_zone_index(), 0);
    }
}
