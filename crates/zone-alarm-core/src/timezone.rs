//! # Timezone registry
//! A fixed, ordered table of named UTC offsets. The table is handed in at startup and never
//! changes afterwards, the active zone is just an index into it.
use crate::error::Error;

/// One selectable timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimezoneEntry {
    /// Seconds east of UTC, negative west of it
    pub offset_seconds: i32,
    /// Short display name, also the key alarms and zone-select messages refer to
    pub name: &'static str,
}

impl TimezoneEntry {
    /// Create a new entry from an offset in whole hours
    #[must_use]
    pub const fn from_hours(hours: i32, name: &'static str) -> Self {
        Self {
            offset_seconds: hours * 3600,
            name,
        }
    }
}

/// The zones the clock ships with. Summer time offsets, there is no DST handling.
pub const DEFAULT_ZONES: [TimezoneEntry; 4] = [
    TimezoneEntry::from_hours(0, "UTC"),
    TimezoneEntry::from_hours(2, "CET"),
    TimezoneEntry::from_hours(5, "Tashkent"),
    TimezoneEntry::from_hours(-4, "EST"),
];

/// Read-only view over the zone table.
#[derive(Debug, Clone, Copy)]
pub struct TimezoneRegistry<'a> {
    /// The zones, never empty
    entries: &'a [TimezoneEntry],
}

impl<'a> TimezoneRegistry<'a> {
    /// Create a registry over `entries`.
    ///
    /// # Errors
    /// [`Error::EmptyRegistry`] if `entries` is empty.
    pub const fn new(entries: &'a [TimezoneEntry]) -> Result<Self, Error> {
        if entries.is_empty() {
            return Err(Error::EmptyRegistry);
        }
        Ok(Self { entries })
    }

    /// Number of zones, always at least one
    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Never true, a registry cannot be constructed empty
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up the zone at `index`.
    ///
    /// # Errors
    /// [`Error::OutOfRange`] if `index` is not below [`Self::len`].
    pub fn resolve(&self, index: usize) -> Result<&'a TimezoneEntry, Error> {
        self.entries.get(index).ok_or(Error::OutOfRange {
            index,
            len: self.entries.len(),
        })
    }

    /// The zone at `index` reduced modulo [`Self::len`]. Used where the index is already known
    /// to be valid and a lookup failure cannot happen.
    #[must_use]
    pub fn resolve_wrapping(&self, index: usize) -> &'a TimezoneEntry {
        &self.entries[index % self.entries.len()]
    }

    /// The index after `index`, wrapping around at the end of the table
    #[must_use]
    pub const fn advance(&self, index: usize) -> usize {
        (index + 1) % self.entries.len()
    }

    /// Index of the zone called exactly `name` (case sensitive), if any
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|zone| zone.name == name)
    }
}
