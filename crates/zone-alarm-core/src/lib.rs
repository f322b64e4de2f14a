//! # Zone alarm core
//! Hardware independent heart of the zone alarm clock.
//!
//! The firmware feeds this crate with three things: device ticks, raw button edges and
//! messages received from the broker. In return it gets a frame to render, a buzzer request
//! whenever an alarm matches, and a zone-change notification when the button cycled the zone.
//!
//! The parts, leaves first:
//! - [`timezone`]: the fixed table of named UTC offsets
//! - [`clock`]: a free running tick counter anchored to a synced epoch
//! - [`alarm`]: the zone scoped alarm list
//! - [`debounce`]: turns interrupt edges into a rate limited "advance zone" signal
//! - [`state`]: everything the messages and the button mutate, owned in one place
//! - [`message`] and [`router`]: decode inbound messages and apply them to the state
//! - [`engine`]: the evaluation loop tying it all together
#![cfg_attr(not(test), no_std)]

// must come first, the logging macros are used by every module below
#[macro_use]
mod fmt;

pub mod alarm;
pub mod clock;
pub mod config;
pub mod debounce;
pub mod engine;
pub mod error;
pub mod message;
pub mod router;
pub mod state;
pub mod timezone;

pub use alarm::{AlarmEntry, AlarmStore};
pub use clock::{Clock, Monotonic, TimeOfDay};
pub use config::{EngineConfig, MalformedAlarmPolicy, Topics};
pub use debounce::{Debouncer, EdgeLatch};
pub use engine::{Buzzer, Display, Engine, Frame, TickReport, Uplink, UplinkError};
pub use error::{DecodeError, Error};
pub use message::{Message, TopicRole};
pub use router::{RouteOutcome, Router};
pub use state::ZoneAlarmState;
pub use timezone::{DEFAULT_ZONES, TimezoneEntry, TimezoneRegistry};
