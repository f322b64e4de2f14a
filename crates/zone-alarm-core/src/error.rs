//! # Errors
//! The error types of the core. Nothing here allocates, all of them are plain enums.
use core::fmt;

/// Errors raised by the timezone registry and the engine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// A registry without entries cannot represent any time, this is fatal at startup
    EmptyRegistry,
    /// A zone index past the end of the registry
    OutOfRange {
        /// The rejected index
        index: usize,
        /// Number of zones in the registry
        len: usize,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyRegistry => f.write_str("timezone registry has no entries"),
            Self::OutOfRange { index, len } => {
                write!(f, "zone index {index} out of range for {len} zones")
            }
        }
    }
}

/// Reasons an inbound message is dropped without touching the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// The message arrived on a topic we do not listen to
    UnknownTopic,
    /// The payload is not valid UTF-8
    InvalidUtf8,
    /// The sync payload is not `{"epoch": <unsigned integer>}`
    MalformedSync,
    /// The zone-select payload names no zone in the registry
    UnknownZone,
    /// The alarm-update payload is not an array of alarm objects
    MalformedAlarms,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::UnknownTopic => "message on unknown topic",
            Self::InvalidUtf8 => "payload is not valid utf-8",
            Self::MalformedSync => "sync payload carries no unsigned epoch",
            Self::UnknownZone => "zone name not in registry",
            Self::MalformedAlarms => "alarm payload is not an array of alarms",
        };
        f.write_str(reason)
    }
}
