//! User records

use std::fmt;

use bitflags::bitflags;
use byteorder::{ByteOrder, LittleEndian};

use crate::error::Result;
use crate::records::{FixedRecord, ensure_len, read_text, write_text};

bitflags! {
    /// The user permission byte
    ///
    /// Bit 0 is the enable flag, bits 1..=3 hold the privilege level.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct UserPermissions: u8 {
        const ENABLED = 0b0000_0001;
        const PRIVILEGE = 0b0000_1110;
    }
}

/// Privilege level encoded in bits 1..=3 of the permission byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privilege {
    User,
    Enroller,
    Admin,
    SuperAdmin,
    Other(u8),
}

impl Privilege {
    fn level(self) -> u8 {
        match self {
            Self::User => 0b000,
            Self::Enroller => 0b001,
            Self::Admin => 0b011,
            Self::SuperAdmin => 0b111,
            Self::Other(level) => level & 0b111,
        }
    }
}

impl From<u8> for Privilege {
    fn from(level: u8) -> Self {
        match level {
            0b000 => Self::User,
            0b001 => Self::Enroller,
            0b011 => Self::Admin,
            0b111 => Self::SuperAdmin,
            other => Self::Other(other),
        }
    }
}

impl UserPermissions {
    /// Build a permission byte from its parts
    pub fn new(enabled: bool, privilege: Privilege) -> Self {
        let mut bits = privilege.level() << 1;
        if enabled {
            bits |= Self::ENABLED.bits();
        }
        Self::from_bits_retain(bits)
    }

    pub fn is_enabled(&self) -> bool {
        self.contains(Self::ENABLED)
    }

    pub fn privilege(&self) -> Privilege {
        Privilege::from((self.bits() & Self::PRIVILEGE.bits()) >> 1)
    }
}

/// A user entry as stored on the terminal (72 bytes on the wire)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    /// Internal serial number, the key for CMD_DELETE_USER
    pub serial: u16,
    pub permissions: UserPermissions,
    /// Up to 8 bytes
    pub password: String,
    /// Up to 24 bytes
    pub name: String,
    pub card_number: u32,
    pub group: u8,
    /// Non-zero when the user has personal time zones
    pub user_timezone: u16,
    pub timezones: [u16; 3],
    /// Up to 9 bytes, usually digits
    pub user_id: String,
}

impl UserRecord {
    const PASSWORD: std::ops::Range<usize> = 3..11;
    const NAME: std::ops::Range<usize> = 11..35;
    const USER_ID: std::ops::Range<usize> = 48..57;

    /// Create a record with default group and no time zones
    pub fn new(serial: u16, user_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            serial,
            permissions: UserPermissions::new(true, Privilege::User),
            password: String::new(),
            name: name.into(),
            card_number: 0,
            group: 1,
            user_timezone: 0,
            timezones: [0; 3],
            user_id: user_id.into(),
        }
    }

    /// Encode for CMD_USER_WRQ, rejecting text fields that do not fit
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; Self::SIZE];

        LittleEndian::write_u16(&mut buf[0..2], self.serial);
        buf[2] = self.permissions.bits();
        write_text(&mut buf[Self::PASSWORD], &self.password, "password")?;
        write_text(&mut buf[Self::NAME], &self.name, "name")?;
        LittleEndian::write_u32(&mut buf[35..39], self.card_number);
        buf[39] = self.group;
        LittleEndian::write_u16(&mut buf[40..42], self.user_timezone);
        LittleEndian::write_u16(&mut buf[42..44], self.timezones[0]);
        LittleEndian::write_u16(&mut buf[44..46], self.timezones[1]);
        LittleEndian::write_u16(&mut buf[46..48], self.timezones[2]);
        write_text(&mut buf[Self::USER_ID], &self.user_id, "user id")?;

        Ok(buf)
    }
}

impl FixedRecord for UserRecord {
    const SIZE: usize = 72;

    fn decode(bytes: &[u8]) -> Result<Self> {
        ensure_len(bytes, Self::SIZE)?;

        Ok(Self {
            serial: LittleEndian::read_u16(&bytes[0..2]),
            permissions: UserPermissions::from_bits_retain(bytes[2]),
            password: read_text(&bytes[Self::PASSWORD]),
            name: read_text(&bytes[Self::NAME]),
            card_number: LittleEndian::read_u32(&bytes[35..39]),
            group: bytes[39],
            user_timezone: LittleEndian::read_u16(&bytes[40..42]),
            timezones: [
                LittleEndian::read_u16(&bytes[42..44]),
                LittleEndian::read_u16(&bytes[44..46]),
                LittleEndian::read_u16(&bytes[46..48]),
            ],
            user_id: read_text(&bytes[Self::USER_ID]),
        })
    }
}

impl fmt::Display for UserRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "User[#{} id={} name={:?} {:?}]",
            self.serial,
            self.user_id,
            self.name,
            self.permissions.privilege()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use pretty_assertions::assert_eq;

    fn sample_bytes() -> Vec<u8> {
        let mut buf = vec![0u8; 72];
        buf[0..2].copy_from_slice(&7u16.to_le_bytes());
        buf[2] = 0b0000_0111;
        buf[3..7].copy_from_slice(b"1234");
        buf[11..16].copy_from_slice(b"Abebe");
        buf[35..39].copy_from_slice(&0xDEAD_BEEFu32.to_le_bytes());
        buf[39] = 1;
        buf[42..44].copy_from_slice(&2u16.to_le_bytes());
        buf[48..50].copy_from_slice(b"42");
        buf
    }

    #[test]
    fn test_decode_user() {
        let user = UserRecord::decode(&sample_bytes()).unwrap();

        assert_eq!(user.serial, 7);
        assert_eq!(user.password, "1234");
        assert_eq!(user.name, "Abebe");
        assert_eq!(user.card_number, 0xDEAD_BEEF);
        assert_eq!(user.group, 1);
        assert_eq!(user.timezones, [2, 0, 0]);
        assert_eq!(user.user_id, "42");
        assert!(user.permissions.is_enabled());
        assert_eq!(user.permissions.privilege(), Privilege::Admin);
    }

    #[test]
    fn test_encode_matches_wire_layout() {
        let bytes = sample_bytes();
        let user = UserRecord::decode(&bytes).unwrap();
        assert_eq!(user.encode().unwrap(), bytes);
    }

    #[test]
    fn test_encode_rejects_long_user_id() {
        let user = UserRecord::new(1, "1234567890", "x");
        assert!(matches!(user.encode(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_decode_truncated() {
        let result = UserRecord::decode(&[0u8; 40]);
        assert!(matches!(result, Err(Error::Truncated { expected: 72, actual: 40 })));
    }

    #[test]
    fn test_permissions() {
        let perms = UserPermissions::new(false, Privilege::SuperAdmin);
        assert_eq!(perms.bits(), 0b0000_1110);
        assert!(!perms.is_enabled());
        assert_eq!(perms.privilege(), Privilege::SuperAdmin);

        let perms = UserPermissions::from_bits_retain(0b0000_0011);
        assert_eq!(perms.privilege(), Privilege::Enroller);

        let perms = UserPermissions::from_bits_retain(0b0000_0100);
        assert_eq!(perms.privilege(), Privilege::Other(0b010));
    }
}
