//! # Evaluation loop
//! The [`Engine`] owns all state and is driven by the firmware at a fixed period. Every tick:
//!
//! 1. poll the debouncer, on an accepted press advance the zone and publish the new zone name
//! 2. compute the local time in the active zone
//! 3. render time and zone name
//! 4. look up an alarm for this minute in this zone and sound the buzzer, once per minute
//!
//! Messages from the broker are handed in between ticks through [`Engine::deliver`].
//!
//! The outside world is reached through three small traits, [`Display`], [`Buzzer`] and
//! [`Uplink`]. None of them may block for long, the firmware implements them by signalling
//! other tasks.
use crate::alarm::AlarmEntry;
use crate::clock::{Clock, Monotonic, TimeOfDay};
use crate::config::{EngineConfig, Topics};
use crate::debounce::{Debouncer, EdgeLatch};
use crate::error::Error;
use crate::router::{RouteOutcome, Router};
use crate::state::ZoneAlarmState;
use crate::timezone::TimezoneRegistry;
use core::fmt::Write;
use heapless::{String, Vec};

/// Capacity of the zone line of a [`Frame`]
pub const ZONE_LINE_CAPACITY: usize = 20;

/// One screen worth of content.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    /// `HH:MM:SS`
    pub time: String<8>,
    /// Zone name, cut to the display width
    pub zone: String<ZONE_LINE_CAPACITY>,
}

impl Frame {
    /// Lay out `time` and `zone` for a display `columns` characters wide
    #[must_use]
    pub fn new(time: TimeOfDay, zone: &str, columns: usize) -> Self {
        let mut frame = Self::default();
        // HH:MM:SS is exactly eight characters, this cannot overflow
        let _ = write!(frame.time, "{time}");
        for c in zone.chars().take(columns) {
            if frame.zone.push(c).is_err() {
                break;
            }
        }
        frame
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Frame {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{=str} {=str}", self.time.as_str(), self.zone.as_str());
    }
}

/// The display collaborator.
pub trait Display {
    /// Show `frame`, replacing whatever was shown before
    fn render(&mut self, frame: &Frame);
}

/// The audible alarm collaborator.
pub trait Buzzer {
    /// Sound a tone of `frequency_hz` for `duration_ms`
    fn sound(&mut self, duration_ms: u32, frequency_hz: u32);
}

/// Why an outbound message could not be handed to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UplinkError {
    /// The transport is not connected to the broker
    Disconnected,
    /// The outbound queue is full
    QueueFull,
}

/// The message channel collaborator, seen from the sending side.
pub trait Uplink {
    /// Queue `payload` for publication on `topic`
    ///
    /// # Errors
    /// [`UplinkError`] if the message could not be queued, it is not retried.
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), UplinkError>;

    /// Ask the transport to tear down and rebuild its connection
    fn request_reconnect(&mut self);
}

/// What happened during one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    /// Zone switched to by the button in this tick
    pub zone_advanced: Option<&'static str>,
    /// Local time shown
    pub time: TimeOfDay,
    /// Zone shown
    pub zone: &'static str,
    /// The alarm that sounded the buzzer in this tick
    pub fired: Option<AlarmEntry>,
}

/// Alarms that already sounded, as (hour, minute, zone)
type FiredKey = (u8, u8, &'static str);

/// How many distinct alarms can sound within one minute. Only reachable by flipping zones
/// back and forth, further alarms in that minute stay silent.
const FIRED_CAPACITY: usize = 4;

/// Keeps an alarm from sounding on every tick of its minute.
#[derive(Debug, Default)]
struct FiredGuard {
    /// Minute the recorded alarms belong to, counted in UTC minutes since the epoch. Every
    /// zone shares it, so switching zones never starts a new minute.
    minute: Option<u64>,
    /// Alarms that sounded in `minute`
    fired: Vec<FiredKey, FIRED_CAPACITY>,
}

impl FiredGuard {
    /// Forget all recorded alarms once the minute changes
    fn roll_to(&mut self, minute: u64) {
        if self.minute != Some(minute) {
            self.minute = Some(minute);
            self.fired.clear();
        }
    }

    /// Record `key`, true if it had not sounded yet this minute
    fn try_fire(&mut self, key: FiredKey) -> bool {
        if self.fired.contains(&key) {
            return false;
        }
        self.fired.push(key).is_ok()
    }
}

/// The evaluation loop and everything it owns.
#[derive(Debug)]
pub struct Engine<'a, M> {
    /// Clock, zones and alarms
    state: ZoneAlarmState<'a, M>,
    /// Applies inbound messages to `state`
    router: Router<'a>,
    /// Zone button
    debouncer: Debouncer<'a>,
    /// Once per minute suppression
    fired: FiredGuard,
    /// Tunables
    config: EngineConfig,
}

impl<'a, M: Monotonic> Engine<'a, M> {
    /// Set up the engine.
    ///
    /// # Errors
    /// [`Error::OutOfRange`] if the configured default zone is not in `registry`.
    pub fn new(
        registry: TimezoneRegistry<'a>,
        source: M,
        latch: &'a EdgeLatch,
        topics: Topics<'a>,
        config: EngineConfig,
    ) -> Result<Self, Error> {
        let clock = Clock::new(source, config.initial_epoch);
        let state = ZoneAlarmState::new(registry, clock, config.default_zone)?;
        info!(
            "engine ready, {} zones, starting in {}",
            registry.len(),
            state.active_zone().name
        );
        Ok(Self {
            state,
            router: Router::new(topics, config.malformed_alarms),
            debouncer: Debouncer::new(latch),
            fired: FiredGuard::default(),
            config,
        })
    }

    /// Apply a message received on `topic`
    pub fn deliver(&mut self, topic: &str, payload: &[u8]) -> RouteOutcome {
        self.router.route(&mut self.state, topic, payload)
    }

    /// Run one evaluation tick against the collaborators in `io`
    pub fn tick<C>(&mut self, io: &mut C) -> TickReport
    where
        C: Display + Buzzer + Uplink,
    {
        let zone_advanced = self.poll_button(io);

        let zone = self.state.active_zone();
        let epoch = self.state.clock.current_epoch();
        let time = TimeOfDay::at(epoch, zone.offset_seconds);

        io.render(&Frame::new(time, zone.name, self.config.display_columns));

        self.fired.roll_to(epoch / 60);
        let fired = self
            .state
            .alarms
            .find_match(time.hour, time.minute, zone.name)
            .filter(|_| self.fired.try_fire((time.hour, time.minute, zone.name)))
            .cloned();
        if let Some(alarm) = &fired {
            info!("alarm {} rings", alarm);
            io.sound(
                self.config.buzzer_duration_ms,
                self.config.buzzer_frequency_hz,
            );
        }

        TickReport {
            zone_advanced,
            time,
            zone: zone.name,
            fired,
        }
    }

    /// Advance the zone if the button was pressed, and tell the server about it
    fn poll_button<U: Uplink>(&mut self, uplink: &mut U) -> Option<&'static str> {
        let source = self.state.clock.source();
        let now = source.ticks();
        let window = ms_to_ticks(self.config.debounce_ms, source.ticks_per_second());
        if !self.debouncer.poll(now, window) {
            return None;
        }

        let zone = self.state.advance_zone();
        info!("button advanced zone to {}", zone.name);
        if let Err(e) = uplink.publish(self.router.topics().zone_change, zone.name.as_bytes()) {
            warn!("zone change not published: {}, requesting reconnect", e);
            uplink.request_reconnect();
        }
        Some(zone.name)
    }

    /// Clock, zones and alarms
    pub const fn state(&self) -> &ZoneAlarmState<'a, M> {
        &self.state
    }

    /// The tunables the engine was built with
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }
}

/// Convert a duration in milliseconds to ticks of a counter running at `ticks_per_second`
#[allow(clippy::cast_possible_truncation)]
fn ms_to_ticks(ms: u32, ticks_per_second: u32) -> u32 {
    (u64::from(ms) * u64::from(ticks_per_second) / 1000).min(u64::from(u32::MAX)) as u32
}
