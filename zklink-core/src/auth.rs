//! CommKey authentication
//!
//! When a terminal has a communication password set it answers CMD_CONNECT
//! with CMD_ACK_UNAUTH. The client then scrambles the password together with
//! the session id it was just given and sends the result with CMD_AUTH.
//! This is an obfuscation the device expects verbatim, not a cryptographic hash.

/// Magic constant, the bytes 'Z' 'K' 'S' 'O' read as a little-endian word
const COMMKEY_MAGIC: u32 = 0x4F53_4B5A;

/// Create authentication key from password and session_id
///
/// # Algorithm
///
/// 1. Reverse the bits of the password
/// 2. Add session_id
/// 3. XOR with the 'ZKSO' magic word
/// 4. Swap the two 16-bit halves
/// 5. XOR with ticks repeated into every byte
/// 6. Overwrite byte 2 (bits 16..24) with the raw ticks value
///
/// With a zero password this reduces to the key the reference firmware
/// computes for password-less authenticated connections.
///
/// # Examples
///
/// ```
/// use zklink_core::auth;
///
/// let key = auth::make_commkey(0, 0x1234, 50);
/// assert_eq!(key, 0x6B32_7D61);
/// ```
pub fn make_commkey(password: u32, session_id: u16, ticks: u8) -> u32 {
    let mut k = password.reverse_bits().wrapping_add(u32::from(session_id));

    k ^= COMMKEY_MAGIC;
    k = k.rotate_left(16);
    k ^= u32::from_ne_bytes([ticks; 4]);

    let mut bytes = k.to_le_bytes();
    bytes[2] = ticks;

    u32::from_le_bytes(bytes)
}

/// The CommKey as the 4-byte CMD_AUTH payload
pub fn commkey_payload(password: u32, session_id: u16, ticks: u8) -> [u8; 4] {
    make_commkey(password, session_id, ticks).to_le_bytes()
}
