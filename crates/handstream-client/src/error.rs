/// Errors that can occur in client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level error (connect, bind, socket setup).
    #[error("transport error: {0}")]
    Transport(#[from] handstream_transport::TransportError),

    /// Frame-level error (read, write, invalid length).
    #[error("frame error: {0}")]
    Frame(#[from] handstream_frame::FrameError),

    /// A payload was not valid UTF-8 text.
    #[error("payload is not utf-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A payload was empty after trimming whitespace.
    #[error("empty payload")]
    EmptyPayload,

    /// The background receive thread could not be started.
    #[error("failed to spawn receive thread: {0}")]
    Spawn(std::io::Error),

    /// The frame source failed to produce an encoded frame.
    #[error("frame source error: {0}")]
    Source(std::io::Error),

    /// The component is not open.
    #[error("not open")]
    NotOpen,

    /// A connection can only be opened once, from `Disconnected`.
    #[error("cannot connect while {0}")]
    InvalidState(handstream_transport::ConnectionState),
}

impl ClientError {
    /// Returns true for errors caused by a malformed pose payload.
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            ClientError::Utf8(_) | ClientError::Json(_) | ClientError::EmptyPayload
        )
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
