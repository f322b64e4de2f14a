//! # Build time configuration
//! Generated by `build.rs` from `config/wifi_config.json` and `config/broker_config.json`.
//! See the `*.example.json` files in that folder for the expected format.
use zone_alarm_core::Topics;

include!(concat!(env!("OUT_DIR"), "/wifi_secrets.rs"));
include!(concat!(env!("OUT_DIR"), "/broker_config.rs"));

/// The topics we subscribe and publish to
pub const TOPICS: Topics<'static> = Topics {
    sync: TOPIC_SYNC,
    zone_select: TOPIC_ZONE,
    alarm_update: TOPIC_ALARMS,
    zone_change: TOPIC_ZONE_CHANGE,
};

/// DHCP hostname of the clock
pub const HOSTNAME: &str = "zoneclock";
