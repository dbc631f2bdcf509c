//! Envelope encoding and decoding with framing.
//!
//! Frame format: `[length: u32 LE][message tag: u8][postcard payload]`, where
//! `length` counts the tag and the payload. Each data-channel message carries
//! exactly one frame.

use crate::error::NetError;
use crate::protocol::Envelope;

/// Bytes before the payload: length plus tag.
pub const FRAME_HEADER_LEN: usize = 5;

/// Largest accepted frame body.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Encode an envelope into one frame.
pub fn encode_envelope(envelope: &Envelope) -> Result<Vec<u8>, NetError> {
    let payload = postcard::to_allocvec(envelope)
        .map_err(|err| NetError::Codec(format!("failed to serialize {}: {err}", envelope.message.kind())))?;
    let length = 1 + payload.len();
    if length > MAX_FRAME_LEN {
        return Err(NetError::Codec(format!("frame of {length} bytes exceeds limit")));
    }

    let mut frame = Vec::with_capacity(4 + length);
    frame.extend_from_slice(&(length as u32).to_le_bytes());
    frame.push(envelope.message.tag());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Decode and verify one frame.
///
/// Arbitrary input never panics: short, truncated, oversized, mistagged and
/// undecodable frames all come back as [`NetError::Codec`].
pub fn decode_envelope(data: &[u8]) -> Result<Envelope, NetError> {
    if data.len() < FRAME_HEADER_LEN {
        return Err(NetError::Codec(format!(
            "frame too short: {} bytes (minimum {FRAME_HEADER_LEN})",
            data.len()
        )));
    }
    let length = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
    if length == 0 || length > MAX_FRAME_LEN {
        return Err(NetError::Codec(format!("invalid frame length {length}")));
    }
    if data.len() < 4 + length {
        return Err(NetError::Codec(format!(
            "incomplete frame: expected {} bytes, got {}",
            4 + length,
            data.len()
        )));
    }

    let tag = data[4];
    let envelope: Envelope = postcard::from_bytes(&data[FRAME_HEADER_LEN..4 + length])
        .map_err(|err| NetError::Codec(format!("failed to deserialize envelope: {err}")))?;
    if envelope.message.tag() != tag {
        return Err(NetError::Codec(format!(
            "tag {tag} does not match {}",
            envelope.message.kind()
        )));
    }
    envelope.verify().map_err(|reason| NetError::Codec(reason.to_string()))?;
    Ok(envelope)
}
