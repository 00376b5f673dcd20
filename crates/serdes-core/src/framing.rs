//! CP1 wire framing: `[0x00][32-bit big-endian schema id]`.
//!
//! The 5-byte header binds a payload to a registered schema id so that
//! consumers can look the schema up without out-of-band coordination.

use crate::error::{SerdesError, SerdesResult};

/// Byte length of the CP1 header (magic + schema id).
pub const CP1_FRAMING_SIZE: usize = 5;

const CP1_MAGIC: u8 = 0;

/// Write CP1 framing for `schema_id` into the head of `payload`.
///
/// Returns the number of bytes written. Fails with buffer-size, writing
/// nothing, when `payload` is shorter than the framing.
pub fn cp1_write(schema_id: i32, payload: &mut [u8]) -> SerdesResult<usize> {
    if payload.len() < CP1_FRAMING_SIZE {
        return Err(SerdesError::BufferSize(format!(
            "Buffer size {} < framing size {}",
            payload.len(),
            CP1_FRAMING_SIZE
        )));
    }

    payload[0] = CP1_MAGIC;
    payload[1..CP1_FRAMING_SIZE].copy_from_slice(&schema_id.to_be_bytes());

    Ok(CP1_FRAMING_SIZE)
}

/// Read CP1 framing from the head of `payload` and extract the schema id.
///
/// On success the caller's slice is advanced past the header. On failure
/// nothing is consumed; a non-zero leading byte is rejected without
/// looking at the remaining bytes.
pub fn cp1_read(payload: &mut &[u8]) -> SerdesResult<i32> {
    if payload.len() < CP1_FRAMING_SIZE {
        return Err(SerdesError::FramingInvalid(format!(
            "Payload is smaller ({}) than framing ({})",
            payload.len(),
            CP1_FRAMING_SIZE
        )));
    }

    if payload[0] != CP1_MAGIC {
        return Err(SerdesError::FramingInvalid(format!(
            "Invalid CP1 magic byte {}, expected {}",
            payload[0], CP1_MAGIC
        )));
    }

    let schema_id = i32::from_be_bytes([payload[1], payload[2], payload[3], payload[4]]);
    *payload = &payload[CP1_FRAMING_SIZE..];

    Ok(schema_id)
}
