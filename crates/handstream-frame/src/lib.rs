//! Length-prefixed framing for the handstream duplex protocol.
//!
//! Every message in both directions is framed as:
//! - A 4-byte little-endian payload length
//! - Exactly that many payload bytes
//!
//! Readers only ever hand out complete frames. A frame whose announced length
//! is zero or above the configured maximum is skipped without consuming a
//! body, and the next four bytes are read as a fresh header.

pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

pub use codec::{
    decode_frame, decode_header, encode_frame, validate_length, Frame, FrameConfig,
    DEFAULT_MAX_FRAME_LEN, HEADER_SIZE,
};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;
