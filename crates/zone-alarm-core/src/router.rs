//! # Message router
//! Applies decoded messages to the [`ZoneAlarmState`]. Each kind of message touches exactly one
//! part of the state, so the three kinds can arrive in any order and repeating one is harmless.
//!
//! Bad input never stops the clock: it is logged once and dropped, and the state stays as it
//! was. The one exception is an alarm-update that cannot be decoded at all, which by default
//! clears the alarms (see [`MalformedAlarmPolicy`]).
use crate::clock::Monotonic;
use crate::config::{MalformedAlarmPolicy, Topics};
use crate::error::DecodeError;
use crate::message::Message;
use crate::state::ZoneAlarmState;

/// What routing a message did to the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RouteOutcome {
    /// The clock was rebased
    ClockSynced {
        /// The new epoch
        epoch: u64,
    },
    /// The active zone changed (or was confirmed)
    ZoneSelected {
        /// Registry index of the selected zone
        index: usize,
    },
    /// The alarm list was replaced
    AlarmsReplaced {
        /// Alarms now installed
        installed: usize,
        /// Entries of the batch that were dropped
        skipped: usize,
    },
    /// The payload was not an alarm list, the alarms were cleared
    AlarmsCleared,
    /// The payload was not an alarm list, the previous alarms were kept
    AlarmsKept,
    /// The message was dropped, nothing changed
    Dropped(DecodeError),
}

/// Dispatches inbound messages by topic.
#[derive(Debug, Clone, Copy)]
pub struct Router<'t> {
    /// Topic names to listen to
    topics: Topics<'t>,
    /// Reaction to undecodable alarm-update payloads
    malformed_alarms: MalformedAlarmPolicy,
}

impl<'t> Router<'t> {
    /// Create a new router
    #[must_use]
    pub const fn new(topics: Topics<'t>, malformed_alarms: MalformedAlarmPolicy) -> Self {
        Self {
            topics,
            malformed_alarms,
        }
    }

    /// The topics this router listens to
    #[must_use]
    pub const fn topics(&self) -> &Topics<'t> {
        &self.topics
    }

    /// Decode the message received on `topic` and apply it to `state`
    pub fn route<M: Monotonic>(
        &self,
        state: &mut ZoneAlarmState<'_, M>,
        topic: &str,
        payload: &[u8],
    ) -> RouteOutcome {
        let Some(role) = self.topics.classify(topic) else {
            warn!("dropping message on unknown topic {}", topic);
            return RouteOutcome::Dropped(DecodeError::UnknownTopic);
        };
        match Message::decode(role, payload) {
            Ok(message) => Self::apply(state, message),
            Err(DecodeError::MalformedAlarms) => self.reject_alarms(state),
            Err(e) => {
                warn!("dropping message on {}: {}", topic, e);
                RouteOutcome::Dropped(e)
            }
        }
    }

    /// Apply a decoded message
    fn apply<M: Monotonic>(state: &mut ZoneAlarmState<'_, M>, message: Message<'_>) -> RouteOutcome {
        match message {
            Message::Sync { epoch } => {
                state.clock.set_epoch(epoch);
                info!("clock synced to epoch {}", epoch);
                RouteOutcome::ClockSynced { epoch }
            }
            Message::ZoneSelect { zone } => {
                let Some(index) = state.registry().position(zone) else {
                    warn!("dropping selection of unknown zone {}", zone);
                    return RouteOutcome::Dropped(DecodeError::UnknownZone);
                };
                match state.set_active_zone(index) {
                    Ok(()) => {
                        info!("zone {} selected", zone);
                        RouteOutcome::ZoneSelected { index }
                    }
                    Err(e) => {
                        error!("registry lookup failed: {}", e);
                        RouteOutcome::Dropped(DecodeError::UnknownZone)
                    }
                }
            }
            Message::AlarmUpdate { alarms, skipped } => {
                let installed = alarms.len();
                state.alarms.replace_all(alarms);
                RouteOutcome::AlarmsReplaced { installed, skipped }
            }
        }
    }

    /// React to an alarm-update payload that is not an alarm list at all
    fn reject_alarms<M: Monotonic>(&self, state: &mut ZoneAlarmState<'_, M>) -> RouteOutcome {
        match self.malformed_alarms {
            MalformedAlarmPolicy::ClearAlarms => {
                warn!("undecodable alarm update, clearing all alarms");
                state.alarms.clear();
                RouteOutcome::AlarmsCleared
            }
            MalformedAlarmPolicy::KeepAlarms => {
                warn!("undecodable alarm update, keeping previous alarms");
                RouteOutcome::AlarmsKept
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Clock;
    use crate::clock::tests::FakeTicks;
    use crate::timezone::{DEFAULT_ZONES, TimezoneRegistry};

    fn state() -> ZoneAlarmState<'static, FakeTicks> {
        let registry = TimezoneRegistry::new(&DEFAULT_ZONES).unwrap();
        ZoneAlarmState::new(registry, Clock::new(FakeTicks::starting_at(500), 0), 2).unwrap()
    }

    fn router(policy: MalformedAlarmPolicy) -> Router<'static> {
        Router::new(Topics::DEFAULT, policy)
    }

    const TWO_ALARMS: &[u8] = br#"[{"time":"06:00","zone":"CET"},{"time":"07:30","zone":"UTC"}]"#;

    #[test]
    fn sync_message_rebases_clock() {
        let mut state = state();
        let outcome = router(MalformedAlarmPolicy::ClearAlarms).route(
            &mut state,
            "clock/sync",
            br#"{"epoch": 1625074800}"#,
        );
        assert_eq!(outcome, RouteOutcome::ClockSynced { epoch: 1_625_074_800 });
        assert_eq!(state.clock.current_epoch(), 1_625_074_800);
    }

    #[test]
    fn malformed_sync_leaves_clock_alone() {
        let mut state = state();
        let router = router(MalformedAlarmPolicy::ClearAlarms);
        router.route(&mut state, "clock/sync", br#"{"epoch": 1000}"#);
        let outcome = router.route(&mut state, "clock/sync", br#"{"epoch": "soon"}"#);
        assert_eq!(outcome, RouteOutcome::Dropped(DecodeError::MalformedSync));
        assert_eq!(state.clock.current_epoch(), 1000);
    }

    #[test]
    fn zone_select_matches_name_exactly() {
        let mut state = state();
        let router = router(MalformedAlarmPolicy::ClearAlarms);
        assert_eq!(
            router.route(&mut state, "clock/zone", b"EST"),
            RouteOutcome::ZoneSelected { index: 3 }
        );
        assert_eq!(
            router.route(&mut state, "clock/zone", b"cet"),
            RouteOutcome::Dropped(DecodeError::UnknownZone)
        );
        assert_eq!(state.active_zone().name, "EST");
    }

    #[test]
    fn alarm_update_replaces_alarms() {
        let mut state = state();
        let router = router(MalformedAlarmPolicy::ClearAlarms);
        assert_eq!(
            router.route(&mut state, "clock/alarms", TWO_ALARMS),
            RouteOutcome::AlarmsReplaced {
                installed: 2,
                skipped: 0
            }
        );
        let outcome = router.route(
            &mut state,
            "clock/alarms",
            br#"[{"time":"9:5","zone":"UTC"},{"time":"07:30","zone":"UTC"}]"#,
        );
        assert_eq!(
            outcome,
            RouteOutcome::AlarmsReplaced {
                installed: 1,
                skipped: 1
            }
        );
        assert_eq!(state.alarms.len(), 1);
        assert!(state.alarms.find_match(7, 30, "UTC").is_some());
    }

    #[test]
    fn undecodable_alarm_update_clears_by_default() {
        let mut state = state();
        let router = router(MalformedAlarmPolicy::default());
        router.route(&mut state, "clock/alarms", TWO_ALARMS);
        assert_eq!(
            router.route(&mut state, "clock/alarms", b"{oops"),
            RouteOutcome::AlarmsCleared
        );
        assert!(state.alarms.is_empty());
    }

    #[test]
    fn undecodable_alarm_update_can_keep_alarms() {
        let mut state = state();
        let router = router(MalformedAlarmPolicy::KeepAlarms);
        router.route(&mut state, "clock/alarms", TWO_ALARMS);
        assert_eq!(
            router.route(&mut state, "clock/alarms", b"{oops"),
            RouteOutcome::AlarmsKept
        );
        assert_eq!(state.alarms.len(), 2);
    }

    #[test]
    fn unknown_topic_changes_nothing() {
        let mut state = state();
        let router = router(MalformedAlarmPolicy::ClearAlarms);
        router.route(&mut state, "clock/alarms", TWO_ALARMS);
        assert_eq!(
            router.route(&mut state, "clock/other", b"[]"),
            RouteOutcome::Dropped(DecodeError::UnknownTopic)
        );
        assert_eq!(state.alarms.len(), 2);
        assert_eq!(state.active_zone_index(), 2);
    }

    #[test]
    fn message_kinds_are_order_insensitive() {
        let router = router(MalformedAlarmPolicy::ClearAlarms);
        let messages: [(&str, &[u8]); 3] = [
            ("clock/sync", br#"{"epoch": 1625074800}"#),
            ("clock/zone", b"UTC"),
            ("clock/alarms", TWO_ALARMS),
        ];

        let mut forward = state();
        for (topic, payload) in messages {
            router.route(&mut forward, topic, payload);
        }
        let mut backward = state();
        for (topic, payload) in messages.into_iter().rev() {
            router.route(&mut backward, topic, payload);
        }

        assert_eq!(forward.clock.current_epoch(), backward.clock.current_epoch());
        assert_eq!(forward.active_zone_index(), backward.active_zone_index());
        assert!(forward.alarms.iter().eq(backward.alarms.iter()));
    }
}
