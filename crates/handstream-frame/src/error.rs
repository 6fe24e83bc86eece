/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Fewer than four bytes were supplied where a length header was expected.
    #[error("malformed frame header ({len} bytes, expected 4)")]
    MalformedHeader { len: usize },

    /// The announced length is zero or exceeds the configured maximum.
    #[error("invalid frame length {len} (allowed 1..={max})")]
    InvalidLength { len: u32, max: usize },

    /// The payload cannot be described by a 4-byte length header.
    #[error("payload too large to frame ({size} bytes)")]
    PayloadTooLarge { size: usize },

    /// An I/O error occurred while reading frames.
    #[error("frame read error: {0}")]
    Io(#[from] std::io::Error),

    /// Writing a frame failed. The connection should be treated as dead.
    #[error("frame write error: {0}")]
    Write(std::io::Error),

    /// The connection was closed before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

impl FrameError {
    /// Returns true when the stream is still aligned on a header boundary and
    /// reading may continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FrameError::InvalidLength { .. })
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
