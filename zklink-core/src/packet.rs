//! Packet framing and encoding/decoding

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;

use crate::{
    checksum,
    command::Command,
    constants::{FRAME_MARKER, FRAME_PREFIX_SIZE, MAX_PAYLOAD_SIZE},
    error::{Error, Result},
};

/// Protocol packet
///
/// # Packet Structure
///
/// ```text
/// ┌──────────┬─────────────┬─────────┬──────────┬───────────┬──────────┬──────────┐
/// │  Marker  │ Payload len │ Command │ Checksum │ SessionID │ ReplyID  │   Data   │
/// │ 4 bytes  │   4 bytes   │ 2 bytes │ 2 bytes  │  2 bytes  │ 2 bytes  │ N bytes  │
/// │ 5050827D │  (LE u32)   │(LE u16) │ (LE u16) │ (LE u16)  │ (LE u16) │  bytes   │
/// └──────────┴─────────────┴─────────┴──────────┴───────────┴──────────┴──────────┘
/// ```
///
/// Payload length always equals 8 + N. All multi-byte values are little-endian
/// regardless of host byte order.
///
/// The command is kept as the raw wire code so replies carrying codes outside
/// [`Command`] still reach the caller intact.
///
/// # Examples
///
/// ```
/// use zklink_core::{Packet, Command};
///
/// let packet = Packet::new(Command::Connect, 0, 0);
/// let encoded = packet.encode();
///
/// let decoded = Packet::decode(encoded).unwrap();
/// assert_eq!(decoded.command, u16::from(Command::Connect));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Packet {
    /// Command or reply code
    pub command: u16,

    /// Session identifier (assigned by device on connect, event sub-type for real-time packets)
    pub session_id: u16,

    /// Reply number (client-assigned correlation id)
    pub reply_id: u16,

    /// Variable data segment
    pub data: Bytes,
}

/// Fixed 16-byte portion of a frame, parsed before the data segment is read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    /// Declared payload length (8 + data length)
    pub payload_len: u32,
    pub command: u16,
    pub checksum: u16,
    pub session_id: u16,
    pub reply_id: u16,
}

impl PacketHeader {
    /// Length of the data segment that follows the header
    pub fn data_len(&self) -> usize {
        (self.payload_len as usize).saturating_sub(Packet::PAYLOAD_HEADER_SIZE)
    }

    /// Parse the fixed portion of a frame
    ///
    /// # Errors
    ///
    /// Fails when fewer than [`Packet::HEADER_SIZE`] bytes are given, the marker
    /// is wrong, or the declared payload length is below 8 or above
    /// [`MAX_PAYLOAD_SIZE`].
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < Packet::HEADER_SIZE {
            return Err(Error::PacketTooShort {
                expected: Packet::HEADER_SIZE,
                actual: buf.len(),
            });
        }

        let mut buf = &buf[..Packet::HEADER_SIZE];

        let mut marker = [0u8; 4];
        buf.copy_to_slice(&mut marker);
        if marker != FRAME_MARKER {
            return Err(Error::InvalidMarker { found: marker });
        }

        let payload_len = buf.get_u32_le();
        if (payload_len as usize) < Packet::PAYLOAD_HEADER_SIZE {
            return Err(Error::PacketTooShort {
                expected: Packet::PAYLOAD_HEADER_SIZE,
                actual: payload_len as usize,
            });
        }
        if payload_len as usize > MAX_PAYLOAD_SIZE {
            return Err(Error::PayloadTooLarge {
                size: payload_len as usize,
                max: MAX_PAYLOAD_SIZE,
            });
        }

        Ok(Self {
            payload_len,
            command: buf.get_u16_le(),
            checksum: buf.get_u16_le(),
            session_id: buf.get_u16_le(),
            reply_id: buf.get_u16_le(),
        })
    }
}

impl Packet {
    /// Marker, length, command, checksum, session id and reply id
    pub const HEADER_SIZE: usize = FRAME_PREFIX_SIZE + Self::PAYLOAD_HEADER_SIZE;

    /// Command, checksum, session id and reply id
    pub const PAYLOAD_HEADER_SIZE: usize = 8;

    /// Create a new packet with no data
    ///
    /// # Examples
    ///
    /// ```
    /// use zklink_core::{Packet, Command};
    ///
    /// let packet = Packet::new(Command::Connect, 0, 0);
    /// assert_eq!(packet.data.len(), 0);
    /// ```
    pub fn new(command: impl Into<u16>, session_id: u16, reply_id: u16) -> Self {
        Self {
            command: command.into(),
            session_id,
            reply_id,
            data: Bytes::new(),
        }
    }

    /// Create a packet with data
    ///
    /// # Examples
    ///
    /// ```
    /// use zklink_core::{Packet, Command};
    ///
    /// let packet = Packet::with_data(Command::Auth, 1234, 1, vec![1, 2, 3, 4]);
    /// assert_eq!(packet.data.len(), 4);
    /// ```
    pub fn with_data(
        command: impl Into<u16>,
        session_id: u16,
        reply_id: u16,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            command: command.into(),
            session_id,
            reply_id,
            data: data.into(),
        }
    }

    /// Assemble a packet from a parsed header and its data segment
    ///
    /// The checksum is not verified here, see [`Packet::verify_checksum`].
    pub fn from_parts(header: &PacketHeader, data: Bytes) -> Result<Self> {
        if data.len() != header.data_len() {
            return Err(Error::LengthMismatch {
                declared: header.payload_len as usize,
                actual: Self::PAYLOAD_HEADER_SIZE + data.len(),
            });
        }

        Ok(Self {
            command: header.command,
            session_id: header.session_id,
            reply_id: header.reply_id,
            data,
        })
    }

    /// Calculate checksum for this packet
    pub fn checksum(&self) -> u16 {
        checksum::calculate(self.command, self.session_id, self.reply_id, &self.data)
    }

    /// Compare a received checksum with the one computed over this packet
    pub fn verify_checksum(&self, received: u16) -> Result<()> {
        let expected = self.checksum();
        if expected != received {
            return Err(Error::ChecksumMismatch { expected, received });
        }
        Ok(())
    }

    /// Value of the payload length field
    pub fn payload_len(&self) -> u32 {
        (Self::PAYLOAD_HEADER_SIZE + self.data.len()) as u32
    }

    /// Encode the fixed 16-byte portion of the frame
    ///
    /// Sent as its own write, followed by [`Packet::data`] when non-empty.
    pub fn encode_header(&self) -> [u8; Self::HEADER_SIZE] {
        let mut header = [0u8; Self::HEADER_SIZE];
        let mut buf = &mut header[..];

        buf.put_slice(&FRAME_MARKER);
        buf.put_u32_le(self.payload_len());
        buf.put_u16_le(self.command);
        buf.put_u16_le(self.checksum());
        buf.put_u16_le(self.session_id);
        buf.put_u16_le(self.reply_id);

        header
    }

    /// Encode the complete frame
    ///
    /// # Examples
    ///
    /// ```
    /// use zklink_core::{Packet, Command};
    ///
    /// let bytes = Packet::new(Command::Connect, 0, 0).encode();
    /// assert_eq!(&bytes[..], &[0x50, 0x50, 0x82, 0x7D, 8, 0, 0, 0, 0xE8, 0x03, 0x17, 0xFC, 0, 0, 0, 0]);
    /// ```
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(self.size());
        buf.put_slice(&self.encode_header());
        buf.put_slice(&self.data);
        buf
    }

    /// Decode a complete frame
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Buffer is shorter than the 16-byte header
    /// - The marker is wrong
    /// - The length field disagrees with the buffer
    /// - Checksum verification fails
    pub fn decode(mut buf: BytesMut) -> Result<Self> {
        let header = PacketHeader::parse(&buf)?;
        buf.advance(Self::HEADER_SIZE);

        let packet = Self::from_parts(&header, buf.freeze())?;
        packet.verify_checksum(header.checksum)?;

        Ok(packet)
    }

    /// Known command for this packet, if any
    pub fn kind(&self) -> Option<Command> {
        Command::try_from(self.command).ok()
    }

    /// Check if this is a response packet (ACK)
    pub fn is_response(&self) -> bool {
        self.kind().is_some_and(Command::is_response)
    }

    /// Check if this is a success response
    pub fn is_success(&self) -> bool {
        self.kind().is_some_and(Command::is_success)
    }

    /// Check if this is an error response
    pub fn is_error(&self) -> bool {
        self.kind().is_some_and(Command::is_error)
    }

    /// Check if this is an unsolicited real-time event
    pub fn is_event(&self) -> bool {
        self.command == Command::RegEvent
    }

    /// Get total frame size
    pub fn size(&self) -> usize {
        Self::HEADER_SIZE + self.data.len()
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("command", &Command::name_of(self.command))
            .field("code", &self.command)
            .field("session_id", &format!("0x{:04X}", self.session_id))
            .field("reply_id", &self.reply_id)
            .field("checksum", &format!("0x{:04X}", self.checksum()))
            .field("data_len", &self.data.len())
            .finish()
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Packet[{}({})](session={}, reply={}, len={})",
            Command::name_of(self.command),
            self.command,
            self.session_id,
            self.reply_id,
            self.data.len()
        )
    }
}
