//! Device timestamps
//!
//! Terminals report time in two shapes: a packed 32-bit value (attendance
//! log, CMD_GET_TIME) and six raw bytes in real-time events. Both decode into
//! [`Timestamp`].

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};

/// Calendar time as reported by a terminal (no timezone)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl Timestamp {
    /// Decode a packed time value
    ///
    /// ```text
    /// second = v % 60
    /// minute = (v / 60) % 60
    /// hour   = (v / 3600) % 24
    /// day    = (v / 86400) % 31 + 1
    /// month  = (v / 86400 / 31) % 12 + 1
    /// year   = (v / 86400) / 365 + 2000
    /// ```
    ///
    /// The year term counts 365-day years while month and day use 31-day
    /// months, so late in a year the year can run ahead of what the device
    /// displays. Values decode exactly as terminals in the field have been
    /// observed to be read.
    pub fn from_packed(v: u32) -> Self {
        let days = v / 86_400;

        Self {
            year: (days / 365 + 2000) as u16,
            month: ((days / 31) % 12 + 1) as u8,
            day: (days % 31 + 1) as u8,
            hour: ((v / 3600) % 24) as u8,
            minute: ((v / 60) % 60) as u8,
            second: (v % 60) as u8,
        }
    }

    /// Decode the 6-byte real-time form: year-2000, month, day, hour, minute, second
    pub fn from_bytes(bytes: [u8; 6]) -> Self {
        Self {
            year: 2000 + u16::from(bytes[0]),
            month: bytes[1],
            day: bytes[2],
            hour: bytes[3],
            minute: bytes[4],
            second: bytes[5],
        }
    }

    /// Convert to a chrono date-time, `None` if the fields do not form a valid date
    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(i32::from(self.year), u32::from(self.month), u32::from(self.day))?
            .and_hms_opt(
                u32::from(self.hour),
                u32::from(self.minute),
                u32::from(self.second),
            )
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}
