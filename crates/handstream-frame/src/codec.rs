use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Frame header: a single little-endian u32 length.
pub const HEADER_SIZE: usize = 4;

/// Default maximum accepted payload on the duplex receive path.
pub const DEFAULT_MAX_FRAME_LEN: usize = 1_000_000;

/// A complete framed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// The message payload.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
        }
    }
}

/// Encode a payload into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────┬──────────────────┐
/// │ Length       │ Payload          │
/// │ (4B LE u32)  │ (Length bytes)   │
/// └──────────────┴──────────────────┘
/// ```
///
/// No maximum is applied on encode: the sending side is trusted.
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > u32::MAX as usize {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
        });
    }
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_u32_le(payload.len() as u32);
    dst.put_slice(payload);
    Ok(())
}

/// Interpret the first four bytes of `src` as a little-endian length.
pub fn decode_header(src: &[u8]) -> Result<u32> {
    match src.get(..HEADER_SIZE) {
        Some(&[a, b, c, d]) => Ok(u32::from_le_bytes([a, b, c, d])),
        _ => Err(FrameError::MalformedHeader { len: src.len() }),
    }
}

/// Check an announced length against the receive policy: `1..=max`.
pub fn validate_length(len: u32, max: usize) -> Result<usize> {
    let size = len as usize;
    if len == 0 || size > max {
        return Err(FrameError::InvalidLength { len, max });
    }
    Ok(size)
}

/// Decode a frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer. A length above
/// `max_payload` consumes only the header and yields
/// [`FrameError::InvalidLength`], leaving the buffer positioned at what the
/// sender claims is the body.
///
/// Empty payloads are structurally valid here; the duplex receive path
/// rejects them separately via [`validate_length`].
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Frame>> {
    if src.len() < HEADER_SIZE {
        return Ok(None); // Need more data
    }

    let len = decode_header(src)?;
    let payload_len = len as usize;

    if payload_len > max_payload {
        src.advance(HEADER_SIZE);
        return Err(FrameError::InvalidLength {
            len,
            max: max_payload,
        });
    }

    let total = HEADER_SIZE + payload_len;
    if src.len() < total {
        return Ok(None); // Need more data
    }

    src.advance(HEADER_SIZE);
    let payload = src.split_to(payload_len).freeze();

    Ok(Some(Frame { payload }))
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum accepted payload size in bytes. Default: 1,000,000.
    pub max_frame_len: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}
