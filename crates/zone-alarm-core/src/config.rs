//! # Configuration
//! Runtime policy of the engine and the topic names it reacts to.

/// What to do with the installed alarms when an alarm-update payload cannot be decoded at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MalformedAlarmPolicy {
    /// Install an empty list, stale alarms never ring
    #[default]
    ClearAlarms,
    /// Ignore the message and keep ringing the previous alarms
    KeepAlarms,
}

/// Tunables of the evaluation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EngineConfig {
    /// Minimum time between two accepted button presses
    pub debounce_ms: u32,
    /// How long the buzzer sounds when an alarm matches
    pub buzzer_duration_ms: u32,
    /// Buzzer tone
    pub buzzer_frequency_hz: u32,
    /// Period of the evaluation loop
    pub tick_period_ms: u32,
    /// Zone shown after power up, must be a valid registry index
    pub default_zone: usize,
    /// Columns of the display, the zone line is cut to this width
    pub display_columns: usize,
    /// Epoch the clock starts at until the first sync arrives
    pub initial_epoch: u64,
    /// See [`MalformedAlarmPolicy`]
    pub malformed_alarms: MalformedAlarmPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 200,
            buzzer_duration_ms: 3000,
            buzzer_frequency_hz: 1000,
            tick_period_ms: 200,
            default_zone: 2,
            display_columns: 16,
            initial_epoch: 0,
            malformed_alarms: MalformedAlarmPolicy::ClearAlarms,
        }
    }
}

/// Topic names of the message channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Topics<'a> {
    /// Inbound `{"epoch": n}` clock sync
    pub sync: &'a str,
    /// Inbound zone selection by name
    pub zone_select: &'a str,
    /// Inbound alarm list replacement
    pub alarm_update: &'a str,
    /// Outbound notification after the button changed the zone
    pub zone_change: &'a str,
}

impl Topics<'static> {
    /// The topics the server side publishes on
    pub const DEFAULT: Self = Self {
        sync: "clock/sync",
        zone_select: "clock/zone",
        alarm_update: "clock/alarms",
        zone_change: "clock/zone",
    };
}

impl Default for Topics<'static> {
    fn default() -> Self {
        Self::DEFAULT
    }
}
