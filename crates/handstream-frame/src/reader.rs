use std::io::{ErrorKind, Read};

use bytes::{Bytes, BytesMut};
use tracing::trace;

use crate::codec::{decode_header, validate_length, Frame, FrameConfig, HEADER_SIZE};
use crate::error::{FrameError, Result};

/// Reads complete frames from any `Read` stream.
///
/// Handles partial reads internally; callers always get complete frames.
pub struct FrameReader<T> {
    inner: T,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self { inner, config }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached, and
    /// `Err(FrameError::InvalidLength)` when the announced length is outside
    /// `1..=max_frame_len`. In the latter case no body bytes are consumed and
    /// the next call reads a fresh header.
    pub fn read_frame(&mut self) -> Result<Frame> {
        let len = self.read_header()?;
        let size = validate_length(len, self.config.max_frame_len)?;
        let payload = self.read_exact_or_closed(size)?;
        trace!(len = size, "frame received");
        Ok(Frame { payload })
    }

    /// Read one 4-byte length header.
    pub fn read_header(&mut self) -> Result<u32> {
        let header = self.read_exact_or_closed(HEADER_SIZE)?;
        decode_header(&header)
    }

    /// Block until exactly `len` bytes are read.
    ///
    /// A zero-length read from the underlying stream means the peer went
    /// away; that is reported as `ConnectionClosed` and the bytes gathered so
    /// far are dropped.
    pub fn read_exact_or_closed(&mut self, len: usize) -> Result<Bytes> {
        let mut buf = BytesMut::zeroed(len);
        let mut offset = 0usize;

        while offset < len {
            match self.inner.read(&mut buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        Ok(buf.freeze())
    }

}
