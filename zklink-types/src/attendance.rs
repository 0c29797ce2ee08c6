//! Attendance log records

use std::fmt;

use byteorder::{ByteOrder, LittleEndian};

use crate::error::Result;
use crate::records::{FixedRecord, ensure_len, read_text};
use crate::time::Timestamp;

/// Punch state reported with an attendance entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyState {
    CheckIn,
    CheckOut,
    BreakOut,
    BreakIn,
    OvertimeIn,
    OvertimeOut,
    Other(u8),
}

impl From<u8> for VerifyState {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::CheckIn,
            1 => Self::CheckOut,
            2 => Self::BreakOut,
            3 => Self::BreakIn,
            4 => Self::OvertimeIn,
            5 => Self::OvertimeOut,
            other => Self::Other(other),
        }
    }
}

/// One attendance log entry (40 bytes on the wire)
///
/// ```text
/// 0   serial        u16
/// 2   user id       [9]
/// 11  padding       [15]
/// 26  verify type   u8
/// 27  time          u32 (packed)
/// 31  verify state  u8
/// 32  trailer       [8]  00 00 00 00 FF 00 00 00
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceRecord {
    pub serial: u16,
    pub user_id: String,
    pub verify_type: u8,
    /// Packed time as stored on the device, zero for unused slots
    pub raw_time: u32,
    pub verify_state: VerifyState,
}

impl AttendanceRecord {
    /// Decoded punch time
    pub fn time(&self) -> Timestamp {
        Timestamp::from_packed(self.raw_time)
    }

    /// Slots the device has not written yet carry a zero time
    pub fn is_empty(&self) -> bool {
        self.raw_time == 0
    }
}

impl FixedRecord for AttendanceRecord {
    const SIZE: usize = 40;

    fn decode(bytes: &[u8]) -> Result<Self> {
        ensure_len(bytes, Self::SIZE)?;

        Ok(Self {
            serial: LittleEndian::read_u16(&bytes[0..2]),
            user_id: read_text(&bytes[2..11]),
            verify_type: bytes[26],
            raw_time: LittleEndian::read_u32(&bytes[27..31]),
            verify_state: VerifyState::from(bytes[31]),
        })
    }
}

impl fmt::Display for AttendanceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {:?}", self.user_id, self.time(), self.verify_state)
    }
}
