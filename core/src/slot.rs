//! Hour-long booking slots.
//!
//! Amenities are booked in fixed one-hour slots between 08:00 and 20:00.
//! The 13:00-14:00 hour is closed for cleaning and is not bookable.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// First bookable hour (inclusive).
const OPENING_HOUR: u8 = 8;
/// Last bookable hour (exclusive, i.e. the last slot ends here).
const CLOSING_HOUR: u8 = 20;
/// Hour that is never bookable.
const CLOSED_HOUR: u8 = 13;

/// A one-hour slot, identified by its starting hour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeSlot {
    start_hour: u8,
}

/// Error returned for malformed or non-bookable slots.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("`{0}` is not a bookable time slot")]
pub struct InvalidTimeSlot(pub String);

impl TimeSlot {
    /// Every bookable slot, in chronological order.
    pub const ALL: [Self; 11] = [
        Self { start_hour: 8 },
        Self { start_hour: 9 },
        Self { start_hour: 10 },
        Self { start_hour: 11 },
        Self { start_hour: 12 },
        Self { start_hour: 14 },
        Self { start_hour: 15 },
        Self { start_hour: 16 },
        Self { start_hour: 17 },
        Self { start_hour: 18 },
        Self { start_hour: 19 },
    ];

    /// Returns the slot starting at `hour`, if that hour is bookable.
    #[must_use]
    pub const fn starting_at(hour: u8) -> Option<Self> {
        if hour < OPENING_HOUR || hour >= CLOSING_HOUR || hour == CLOSED_HOUR {
            None
        } else {
            Some(Self { start_hour: hour })
        }
    }

    /// Starting hour (24h clock).
    #[must_use]
    pub const fn start_hour(&self) -> u8 {
        self.start_hour
    }

    /// Ending hour (24h clock).
    #[must_use]
    pub const fn end_hour(&self) -> u8 {
        self.start_hour + 1
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:00-{:02}:00", self.start_hour, self.end_hour())
    }
}

impl FromStr for TimeSlot {
    type Err = InvalidTimeSlot;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidTimeSlot(s.to_string());

        let (start, end) = s.trim().split_once('-').ok_or_else(invalid)?;
        let start = parse_whole_hour(start).ok_or_else(invalid)?;
        let end = parse_whole_hour(end).ok_or_else(invalid)?;

        let slot = Self::starting_at(start).ok_or_else(invalid)?;
        if slot.end_hour() != end {
            return Err(invalid());
        }
        Ok(slot)
    }
}

/// Parses `"HH:00"` into `HH`.
fn parse_whole_hour(value: &str) -> Option<u8> {
    let (hours, minutes) = value.trim().split_once(':')?;
    if minutes != "00" || hours.len() != 2 {
        return None;
    }
    hours.parse().ok()
}

impl Serialize for TimeSlot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeSlot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
