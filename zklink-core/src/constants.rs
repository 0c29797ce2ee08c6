//! Protocol constants

/// Framing marker that opens every TCP packet
pub const FRAME_MARKER: [u8; 4] = [0x50, 0x50, 0x82, 0x7D];

/// Marker plus the 32-bit payload length field
pub const FRAME_PREFIX_SIZE: usize = 8;

/// Default reply timeout (seconds)
pub const DEFAULT_TIMEOUT: u64 = 5;

/// Default connection timeout (seconds)
pub const DEFAULT_CONNECT_TIMEOUT: u64 = 5;

/// Ticks value mixed into the CommKey during authentication
pub const DEFAULT_TICKS: u8 = 50;

/// Reply sequence the session resumes from after a successful CMD_AUTH
pub const POST_AUTH_REPLY_ID: u16 = 3;

/// Upper bound for a single inbound payload
///
/// Rejects a corrupt length field while leaving room for a full attendance
/// log in one CMD_DATA reply (over 1.6 million 40-byte records).
pub const MAX_PAYLOAD_SIZE: usize = 64 * 1024 * 1024;

/// Real-time event sub-types, carried in the session id field of CMD_REG_EVENT packets
pub mod events {
    /// Attendance transaction (someone checked in or out)
    pub const EF_ATTLOG: u16 = 1;

    /// Fingerprint pressed
    pub const EF_FINGER: u16 = 1 << 1;

    /// User enrolled
    pub const EF_ENROLLUSER: u16 = 1 << 2;

    /// Fingerprint enrolled
    pub const EF_ENROLLFINGER: u16 = 1 << 3;

    /// Button pressed
    pub const EF_BUTTON: u16 = 1 << 4;

    /// Door unlocked
    pub const EF_UNLOCK: u16 = 1 << 5;

    /// Verification event
    pub const EF_VERIFY: u16 = 1 << 7;

    /// Fingerprint minutiae captured
    pub const EF_FPFTR: u16 = 1 << 8;

    /// Alarm signal
    pub const EF_ALARM: u16 = 1 << 9;
}

/// Opaque CMD_DATA_WRRQ descriptors selecting the record set to read
pub mod read_requests {
    /// Read every user record
    pub const USERS: [u8; 11] = [0x01, 0x09, 0x00, 0x05, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];

    /// Read the attendance log
    pub const ATTENDANCE: [u8; 11] = [0x01, 0x0D, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
}

/// Configuration keys understood by CMD_OPTIONS_RRQ
pub mod options {
    /// Maximum length of a user id
    pub const PIN_WIDTH: &str = "~PIN2Width";

    /// Whether user ids may contain letters
    pub const ALPHANUMERIC_PIN: &str = "~IsABCPinEnable";
}

/// Fingerprint flags used during enrollment
pub mod fingerprint {
    pub const INVALID: u8 = 0;
    pub const VALID: u8 = 1;
    pub const DURESS: u8 = 3;
}
