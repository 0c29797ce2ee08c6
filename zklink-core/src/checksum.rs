//! Packet checksum
//!
//! 1. Sum Command, ReplyID and SessionID as unsigned 16-bit values
//! 2. Add every little-endian 16-bit word of the data segment
//!    (a trailing odd byte counts as a low byte)
//! 3. Fold the high 16 bits of the 32-bit sum onto the low 16 bits, once
//! 4. Take the ones-complement
//!
//! The device does not answer a packet whose checksum is wrong: it stays silent
//! and the reply never arrives. A deviation here shows up as a timeout, never as
//! an error reply.

use byteorder::{ByteOrder, LittleEndian};
use tracing::trace;

/// Calculate packet checksum
///
/// # Algorithm
///
/// ```text
/// sum  = command + reply_id + session_id + Σ le_u16(data[2i..2i+2])
/// fold = (sum >> 16) + (sum & 0xFFFF)      (truncated to 16 bits)
/// checksum = !fold
/// ```
///
/// # Examples
///
/// ```
/// use zklink_core::checksum;
///
/// // CMD_CONNECT, as captured from a real terminal
/// assert_eq!(checksum::calculate(1000, 0, 0, &[]), 0xFC17);
/// ```
pub fn calculate(command: u16, session_id: u16, reply_id: u16, data: &[u8]) -> u16 {
    let mut sum = u32::from(command) + u32::from(reply_id) + u32::from(session_id);

    let mut words = data.chunks_exact(2);
    for word in &mut words {
        sum = sum.wrapping_add(u32::from(LittleEndian::read_u16(word)));
    }
    if let [odd] = words.remainder() {
        sum = sum.wrapping_add(u32::from(*odd));
    }

    let folded = ((sum >> 16) + (sum & 0xFFFF)) as u16;
    let checksum = !folded;

    trace!(
        command = command,
        session_id = session_id,
        reply_id = reply_id,
        data_len = data.len(),
        checksum = format!("0x{:04X}", checksum),
        "Calculated checksum"
    );

    checksum
}

/// Verify checksum
pub fn verify(command: u16, session_id: u16, reply_id: u16, data: &[u8], expected: u16) -> bool {
    calculate(command, session_id, reply_id, data) == expected
}
