//! # Alarm store
//! The alarms the server pushed to us. The list only ever changes as a whole: every
//! alarm-update message replaces it, there is no add or remove of single entries.
//!
//! Alarms are scoped to a zone by name, so an alarm for "CET" at 07:30 only matches while the
//! clock shows CET and CET reads 07:30.
use heapless::{String, Vec};

/// How many alarms the store keeps, further entries of a batch are dropped
pub const MAX_ALARMS: usize = 16;

/// Longest zone name an alarm can refer to
pub const ZONE_NAME_CAPACITY: usize = 16;

/// A single zone scoped alarm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmEntry {
    /// 0-23
    hour: u8,
    /// 0-59
    minute: u8,
    /// Name of the zone the time refers to
    zone: String<ZONE_NAME_CAPACITY>,
}

impl AlarmEntry {
    /// Create a new alarm, `None` if the time is not a valid time of day or the zone name is
    /// too long to store
    #[must_use]
    pub fn new(hour: u8, minute: u8, zone: &str) -> Option<Self> {
        if hour > 23 || minute > 59 {
            return None;
        }
        let mut name = String::new();
        name.push_str(zone).ok()?;
        Some(Self {
            hour,
            minute,
            zone: name,
        })
    }

    /// Create an alarm from an `HH:MM` time string and a zone name
    #[must_use]
    pub fn parse(time: &str, zone: &str) -> Option<Self> {
        let (hour, minute) = parse_hh_mm(time)?;
        Self::new(hour, minute, zone)
    }

    /// Hour of the alarm
    #[must_use]
    pub const fn hour(&self) -> u8 {
        self.hour
    }

    /// Minute of the alarm
    #[must_use]
    pub const fn minute(&self) -> u8 {
        self.minute
    }

    /// Zone the alarm belongs to
    #[must_use]
    pub fn zone(&self) -> &str {
        &self.zone
    }

    /// True if the alarm rings at `hour:minute` in `zone`
    #[must_use]
    pub fn matches(&self, hour: u8, minute: u8, zone: &str) -> bool {
        self.hour == hour && self.minute == minute && self.zone.as_str() == zone
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for AlarmEntry {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "{=u8:02}:{=u8:02} {=str}",
            self.hour,
            self.minute,
            self.zone.as_str()
        );
    }
}

/// Parse exactly `HH:MM`: five characters, digits around a colon.
/// Range checks are left to [`AlarmEntry::new`].
fn parse_hh_mm(time: &str) -> Option<(u8, u8)> {
    let &[h1, h2, b':', m1, m2] = time.as_bytes() else {
        return None;
    };
    let digit = |b: u8| b.is_ascii_digit().then(|| b - b'0');
    let hour = digit(h1)? * 10 + digit(h2)?;
    let minute = digit(m1)? * 10 + digit(m2)?;
    Some((hour, minute))
}

/// The installed alarms, in the order they arrived.
#[derive(Debug, Default, Clone)]
pub struct AlarmStore {
    /// Unordered, duplicates allowed
    entries: Vec<AlarmEntry, MAX_ALARMS>,
}

impl AlarmStore {
    /// An empty store, this is the state until the first alarm-update arrives
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Discard all alarms and install `entries` instead.
    /// The new list is built completely before it replaces the old one. Entries beyond
    /// [`MAX_ALARMS`] are dropped.
    pub fn replace_all<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = AlarmEntry>,
    {
        let mut next = Vec::new();
        for entry in entries {
            if let Err(entry) = next.push(entry) {
                warn!("alarm store full, dropping {}", entry);
            }
        }
        self.entries = next;
        info!("{} alarms installed", self.entries.len());
    }

    /// Remove all alarms
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// First alarm, in insertion order, that rings at `hour:minute` in `zone`
    #[must_use]
    pub fn find_match(&self, hour: u8, minute: u8, zone: &str) -> Option<&AlarmEntry> {
        self.entries
            .iter()
            .find(|alarm| alarm.matches(hour, minute, zone))
    }

    /// Number of installed alarms
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no alarm is installed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The installed alarms in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &AlarmEntry> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alarm(time: &str, zone: &str) -> AlarmEntry {
        AlarmEntry::parse(time, zone).unwrap()
    }

    #[test]
    fn parse_accepts_only_hh_mm() {
        assert_eq!(parse_hh_mm("07:30"), Some((7, 30)));
        assert_eq!(parse_hh_mm("23:59"), Some((23, 59)));
        assert_eq!(parse_hh_mm("9:5"), None);
        assert_eq!(parse_hh_mm("09:5"), None);
        assert_eq!(parse_hh_mm("0930"), None);
        assert_eq!(parse_hh_mm("09-30"), None);
        assert_eq!(parse_hh_mm("0a:30"), None);
        assert_eq!(parse_hh_mm("07:30:00"), None);
        assert_eq!(parse_hh_mm(""), None);
    }

    #[test]
    fn out_of_range_times_are_rejected() {
        assert!(AlarmEntry::parse("24:00", "UTC").is_none());
        assert!(AlarmEntry::parse("12:60", "UTC").is_none());
        assert!(AlarmEntry::parse("00:00", "UTC").is_some());
    }

    #[test]
    fn overlong_zone_name_is_rejected() {
        assert!(AlarmEntry::parse("07:30", "Zone name far too long").is_none());
    }

    #[test]
    fn find_match_is_exact_on_all_three_fields() {
        let mut store = AlarmStore::new();
        store.replace_all([alarm("07:30", "UTC")]);
        assert!(store.find_match(7, 30, "UTC").is_some());
        assert!(store.find_match(7, 31, "UTC").is_none());
        assert!(store.find_match(8, 30, "UTC").is_none());
        assert!(store.find_match(7, 30, "CET").is_none());
        assert!(store.find_match(7, 30, "utc").is_none());
    }

    #[test]
    fn first_match_wins() {
        let mut store = AlarmStore::new();
        store.replace_all([alarm("06:00", "CET"), alarm("06:00", "CET")]);
        let found = store.find_match(6, 0, "CET").unwrap();
        assert!(core::ptr::eq(found, store.iter().next().unwrap()));
    }

    #[test]
    fn replace_all_discards_previous_alarms() {
        let mut store = AlarmStore::new();
        store.replace_all([alarm("06:00", "CET"), alarm("07:00", "EST")]);
        store.replace_all([alarm("08:00", "UTC")]);
        assert_eq!(store.len(), 1);
        assert!(store.find_match(6, 0, "CET").is_none());
        assert!(store.find_match(8, 0, "UTC").is_some());

        store.replace_all(core::iter::empty());
        assert!(store.is_empty());
    }

    #[test]
    fn replace_all_truncates_at_capacity() {
        let mut store = AlarmStore::new();
        store.replace_all((0..20).map(|minute| AlarmEntry::new(5, minute, "UTC").unwrap()));
        assert_eq!(store.len(), MAX_ALARMS);
        assert!(store.find_match(5, 15, "UTC").is_some());
        assert!(store.find_match(5, 16, "UTC").is_none());
    }
}
