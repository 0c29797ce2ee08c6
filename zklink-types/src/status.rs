//! Machine status (CMD_GET_FREE_SIZES)

use byteorder::{ByteOrder, LittleEndian};

use crate::error::Result;
use crate::records::{FixedRecord, ensure_len};

/// Storage counters reported by the terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MachineStatus {
    pub user_count: u32,
    pub fingerprint_count: u32,
    pub password_count: u32,
}

impl FixedRecord for MachineStatus {
    const SIZE: usize = 36;

    fn decode(bytes: &[u8]) -> Result<Self> {
        ensure_len(bytes, Self::SIZE)?;

        Ok(Self {
            user_count: LittleEndian::read_u32(&bytes[16..20]),
            fingerprint_count: LittleEndian::read_u32(&bytes[28..32]),
            password_count: LittleEndian::read_u32(&bytes[32..36]),
        })
    }
}
