//! Fixed-size record arrays
//!
//! Bulk reads return `[u32 LE byte count][packed records...]`. The walker
//! below never trusts the byte count beyond the bytes actually received.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result};

/// A packed record with a fixed wire size
pub trait FixedRecord: Sized {
    /// Size of one record on the wire
    const SIZE: usize;

    /// Decode one record from exactly `SIZE` bytes
    fn decode(bytes: &[u8]) -> Result<Self>;
}

/// Size of the byte-count prefix in front of a record array
pub const ARRAY_PREFIX_SIZE: usize = 4;

/// Decode a byte-count prefixed array of records
///
/// The number of records is `byte_count / T::SIZE`; a partial trailing record
/// is ignored. Fails if the prefix claims more bytes than `data` holds.
pub fn decode_record_array<T: FixedRecord>(data: &[u8]) -> Result<Vec<T>> {
    if data.len() < ARRAY_PREFIX_SIZE {
        return Err(Error::Truncated {
            expected: ARRAY_PREFIX_SIZE,
            actual: data.len(),
        });
    }

    let declared = LittleEndian::read_u32(&data[..ARRAY_PREFIX_SIZE]) as usize;
    let body = &data[ARRAY_PREFIX_SIZE..];

    if declared > body.len() {
        return Err(Error::CountExceedsData {
            declared,
            available: body.len(),
        });
    }

    body[..declared]
        .chunks_exact(T::SIZE)
        .map(T::decode)
        .collect()
}

/// Check that `bytes` holds at least one full record
pub(crate) fn ensure_len(bytes: &[u8], expected: usize) -> Result<()> {
    if bytes.len() < expected {
        return Err(Error::Truncated {
            expected,
            actual: bytes.len(),
        });
    }
    Ok(())
}

/// Read a NUL-padded text field
pub(crate) fn read_text(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

/// Write `text` into a NUL-padded field, rejecting values that do not fit
pub(crate) fn write_text(field: &mut [u8], text: &str, name: &str) -> Result<()> {
    let bytes = text.as_bytes();
    if bytes.len() > field.len() {
        return Err(Error::Validation(format!(
            "{} is {} bytes, at most {} allowed",
            name,
            bytes.len(),
            field.len()
        )));
    }

    field.fill(0);
    field[..bytes.len()].copy_from_slice(bytes);
    Ok(())
}
