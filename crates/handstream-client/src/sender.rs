use std::fmt;
use std::io::Write;
use std::str::FromStr;
use std::time::{Duration, Instant};

use bytes::Bytes;
use handstream_frame::FrameWriter;
use tracing::{trace, warn};

use crate::error::{ClientError, Result};

/// Frames at or below this size in either dimension are not sent.
pub const MIN_FRAME_DIMENSION: u32 = 16;

/// Pixel dimensions reported by a frame source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Both dimensions must exceed [`MIN_FRAME_DIMENSION`]. Cameras report
    /// a tiny placeholder size until the first real frame arrives.
    pub fn is_usable(&self) -> bool {
        self.width > MIN_FRAME_DIMENSION && self.height > MIN_FRAME_DIMENSION
    }
}

impl fmt::Display for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for FrameSize {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (width, height) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
        let width = width
            .trim()
            .parse()
            .map_err(|_| format!("invalid width in '{s}'"))?;
        let height = height
            .trim()
            .parse()
            .map_err(|_| format!("invalid height in '{s}'"))?;
        Ok(Self { width, height })
    }
}

/// Supplies encoded camera frames on demand.
///
/// Capture and compression belong to the implementor. The sender only asks
/// for a frame when a send slot is open.
pub trait FrameSource {
    /// Returns true while the source is producing frames.
    fn is_active(&self) -> bool;

    /// Current frame dimensions.
    fn frame_size(&self) -> FrameSize;

    /// Capture and encode one frame. `quality` is in `1..=100`.
    fn encode_frame(&mut self, quality: u8) -> std::io::Result<Bytes>;
}

/// Rate limiter with room for a single pending send.
///
/// After a send at `now`, the next slot opens at `now + 1/target_fps`. Ticks
/// before that are rejected; nothing is queued.
#[derive(Debug, Clone)]
pub struct RateGate {
    interval: Option<Duration>,
    next_send: Option<Instant>,
}

impl RateGate {
    /// `target_fps == 0` disables sending entirely.
    pub fn new(target_fps: u32) -> Self {
        let interval = (target_fps > 0)
            .then(|| Duration::from_nanos(1_000_000_000 / u64::from(target_fps)));
        Self {
            interval,
            next_send: None,
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.interval.is_none()
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    pub fn is_ready(&self, now: Instant) -> bool {
        match (self.interval, self.next_send) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(_), Some(next)) => now >= next,
        }
    }

    /// Claim the slot at `now` and schedule the next one.
    pub fn reserve(&mut self, now: Instant) {
        if let Some(interval) = self.interval {
            self.next_send = Some(now + interval);
        }
    }
}

/// What a call to [`FrameSender::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A frame of `bytes` payload bytes was written.
    Sent { bytes: usize },
    /// The target rate is zero.
    Disabled,
    /// The next send slot has not opened yet.
    TooEarly,
    /// The source is inactive or its frames are too small.
    SourceNotReady,
    /// The source produced an empty frame; nothing was written.
    EmptyFrame,
    /// A previous failure stopped the sender.
    Stopped,
}

/// Encodes and writes outbound frames from the caller's own tick.
pub struct FrameSender<W> {
    writer: FrameWriter<W>,
    gate: RateGate,
    quality: u8,
    stopped: bool,
    frames_sent: u64,
}

impl<W: Write> FrameSender<W> {
    pub fn new(writer: FrameWriter<W>, target_fps: u32, quality: u8) -> Self {
        Self {
            writer,
            gate: RateGate::new(target_fps),
            quality: quality.clamp(1, 100),
            stopped: false,
            frames_sent: 0,
        }
    }

    /// Run one tick against the wall clock.
    pub fn tick<S: FrameSource + ?Sized>(&mut self, source: &mut S) -> Result<TickOutcome> {
        self.tick_at(Instant::now(), source)
    }

    /// Run one tick as if the current time were `now`.
    ///
    /// Errors from the source or the writer stop the sender: later ticks
    /// return [`TickOutcome::Stopped`] without touching the transport.
    pub fn tick_at<S: FrameSource + ?Sized>(
        &mut self,
        now: Instant,
        source: &mut S,
    ) -> Result<TickOutcome> {
        if self.stopped {
            return Ok(TickOutcome::Stopped);
        }
        if self.gate.is_disabled() {
            return Ok(TickOutcome::Disabled);
        }
        if !self.gate.is_ready(now) {
            return Ok(TickOutcome::TooEarly);
        }
        if !source.is_active() || !source.frame_size().is_usable() {
            return Ok(TickOutcome::SourceNotReady);
        }

        self.gate.reserve(now);

        let payload = match source.encode_frame(self.quality) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(error = %err, "frame source failed; stopping sender");
                self.stopped = true;
                return Err(ClientError::Source(err));
            }
        };
        self.send_frame(&payload)
    }

    /// Write one frame immediately, bypassing the rate gate.
    ///
    /// An empty payload is a no-op.
    pub fn send_frame(&mut self, payload: &[u8]) -> Result<TickOutcome> {
        if self.stopped {
            return Ok(TickOutcome::Stopped);
        }
        if payload.is_empty() {
            return Ok(TickOutcome::EmptyFrame);
        }

        if let Err(err) = self.writer.send(payload) {
            warn!(error = %err, "send frame failed; stopping sender");
            self.stopped = true;
            return Err(err.into());
        }

        self.frames_sent += 1;
        trace!(bytes = payload.len(), "frame sent");
        Ok(TickOutcome::Sent {
            bytes: payload.len(),
        })
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Stop sending without a failure, e.g. when the connection went away.
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    pub fn writer_ref(&self) -> &W {
        self.writer.get_ref()
    }
}
