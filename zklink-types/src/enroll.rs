//! Fingerprint enrollment request (CMD_STARTENROLL)

use crate::error::{Error, Result};
use crate::records::write_text;

/// Finger to enroll for a user id (26 bytes on the wire)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollRequest {
    pub user_id: String,
    /// 0..=9
    pub finger_index: u8,
    /// Valid or duress fingerprint flag
    pub flag: u8,
}

impl EnrollRequest {
    pub const SIZE: usize = 26;

    /// Highest finger index a terminal accepts
    pub const MAX_FINGER_INDEX: u8 = 9;

    pub fn new(user_id: impl Into<String>, finger_index: u8, flag: u8) -> Self {
        Self {
            user_id: user_id.into(),
            finger_index,
            flag,
        }
    }

    /// Whether the id is purely numeric; anything else needs alphanumeric pins enabled
    pub fn is_numeric(&self) -> bool {
        self.user_id.bytes().all(|b| b.is_ascii_digit())
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        if self.user_id.is_empty() {
            return Err(Error::Validation("user id is empty".into()));
        }
        if self.finger_index > Self::MAX_FINGER_INDEX {
            return Err(Error::Validation(format!(
                "finger index {} out of range",
                self.finger_index
            )));
        }

        let mut buf = vec![0u8; Self::SIZE];
        write_text(&mut buf[0..24], &self.user_id, "user id")?;
        buf[24] = self.finger_index;
        buf[25] = self.flag;

        Ok(buf)
    }
}
