use std::time::Duration;

use handstream_frame::{FrameConfig, DEFAULT_MAX_FRAME_LEN};

/// Default duplex peer port.
pub const DEFAULT_DUPLEX_PORT: u16 = 5055;
/// Default local port for the datagram path.
pub const DEFAULT_LISTEN_PORT: u16 = 5052;
/// Default outbound frame rate.
pub const DEFAULT_TARGET_FPS: u32 = 20;
/// Default JPEG quality requested from the frame source.
pub const DEFAULT_JPEG_QUALITY: u8 = 70;
/// How long teardown waits for a receive thread to exit.
pub const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_millis(200);

/// Configuration for [`crate::DuplexClient`].
#[derive(Debug, Clone)]
pub struct DuplexConfig {
    /// Remote host name or address.
    pub host: String,
    /// Remote port.
    pub port: u16,
    /// Outbound frames per second. `0` disables sending.
    pub target_fps: u32,
    /// Quality passed to the frame source, clamped to `1..=100`.
    pub jpeg_quality: u8,
    /// Largest inbound frame accepted before it is skipped.
    pub max_frame_len: usize,
    /// Per-attempt connect timeout. `None` uses the OS default.
    pub connect_timeout: Option<Duration>,
    /// Bounded wait for the receive thread during teardown.
    pub join_timeout: Duration,
}

impl Default for DuplexConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_DUPLEX_PORT,
            target_fps: DEFAULT_TARGET_FPS,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            connect_timeout: None,
            join_timeout: DEFAULT_JOIN_TIMEOUT,
        }
    }
}

impl DuplexConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    pub fn with_target_fps(mut self, target_fps: u32) -> Self {
        self.target_fps = target_fps;
        self
    }

    pub fn with_jpeg_quality(mut self, jpeg_quality: u8) -> Self {
        self.jpeg_quality = jpeg_quality;
        self
    }

    pub fn with_max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }

    /// Frame codec settings for the receive half.
    pub fn frame_config(&self) -> FrameConfig {
        FrameConfig {
            max_frame_len: self.max_frame_len,
        }
    }
}

/// Configuration for [`crate::DatagramReceiver`].
#[derive(Debug, Clone)]
pub struct DatagramConfig {
    /// Local UDP port. `0` picks an ephemeral port.
    pub listen_port: u16,
    /// Upper bound on a single blocking receive, so the loop can notice a
    /// stop request. Also bounds how long teardown takes.
    pub poll_interval: Duration,
    /// Bounded wait for the receive thread during teardown.
    pub join_timeout: Duration,
}

impl Default for DatagramConfig {
    fn default() -> Self {
        Self {
            listen_port: DEFAULT_LISTEN_PORT,
            poll_interval: Duration::from_millis(50),
            join_timeout: DEFAULT_JOIN_TIMEOUT,
        }
    }
}

impl DatagramConfig {
    pub fn new(listen_port: u16) -> Self {
        Self {
            listen_port,
            ..Self::default()
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }
}
