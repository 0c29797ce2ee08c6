//! Real-time events pushed by the terminal

use bitflags::bitflags;

use crate::error::Result;
use crate::records::{FixedRecord, ensure_len, read_text};
use crate::time::Timestamp;

bitflags! {
    /// Event classes requested with CMD_REG_EVENT
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EventMask: u32 {
        const ATTENDANCE = 1;
        const FINGER = 1 << 1;
        const ENROLL_USER = 1 << 2;
        const ENROLL_FINGER = 1 << 3;
        const BUTTON = 1 << 4;
        const UNLOCK = 1 << 5;
        const VERIFY = 1 << 7;
        const FINGER_FEATURE = 1 << 8;
        const ALARM = 1 << 9;
        /// Every event class the device knows
        const ALL = 0x0000_FFFF;
    }
}

impl Default for EventMask {
    fn default() -> Self {
        Self::ATTENDANCE
    }
}

/// Attendance transaction pushed the moment someone punches (32 bytes)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealtimeEvent {
    pub user_id: String,
    pub verify_type: u8,
    pub status: u8,
    pub time: Timestamp,
}

impl FixedRecord for RealtimeEvent {
    const SIZE: usize = 32;

    fn decode(bytes: &[u8]) -> Result<Self> {
        ensure_len(bytes, Self::SIZE)?;

        let mut time = [0u8; 6];
        time.copy_from_slice(&bytes[26..32]);

        Ok(Self {
            user_id: read_text(&bytes[0..9]),
            verify_type: bytes[24],
            status: bytes[25],
            time: Timestamp::from_bytes(time),
        })
    }
}
