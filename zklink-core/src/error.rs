//! Error types for zklink-core

/// Result type alias for zklink operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core protocol errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Packet is too short to be valid
    #[error("Packet too short: expected at least {expected} bytes, got {actual} bytes")]
    PacketTooShort {
        expected: usize,
        actual: usize,
    },

    /// Frame does not start with the protocol marker
    #[error("Invalid frame marker: {found:02X?}")]
    InvalidMarker {
        found: [u8; 4],
    },

    /// Length field disagrees with the bytes that follow it
    #[error("Payload length mismatch: header declares {declared} bytes, got {actual} bytes")]
    LengthMismatch {
        declared: usize,
        actual: usize,
    },

    /// Checksum verification failed
    #[error("Checksum mismatch: expected 0x{expected:04X}, received 0x{received:04X}")]
    ChecksumMismatch {
        expected: u16,
        received: u16,
    },

    /// Unknown command code
    #[error("Unknown command code: {0}")]
    UnknownCommand(u16),

    /// Invalid session state
    #[error("Invalid session state: {0}")]
    InvalidSessionState(String),

    /// Payload too large
    #[error("Payload too large: {size} bytes (max: {max} bytes)")]
    PayloadTooLarge {
        size: usize,
        max: usize,
    },
}

impl Error {
    /// Check if the byte stream can no longer be trusted to be packet aligned
    pub fn is_framing_error(&self) -> bool {
        matches!(
            self,
            Self::PacketTooShort { .. }
                | Self::InvalidMarker { .. }
                | Self::LengthMismatch { .. }
                | Self::PayloadTooLarge { .. }
        )
    }

    /// Check if error requires reconnection
    pub fn requires_reconnect(&self) -> bool {
        self.is_framing_error() || matches!(self, Self::InvalidSessionState(_))
    }
}
