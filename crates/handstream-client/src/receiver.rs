//! Background receive loops.
//!
//! Each loop runs on its own thread, reads poses from one transport and
//! publishes them into a [`Mailbox`]. The `running` flag is the single source
//! of truth for liveness: the loop clears it when it stops for any reason,
//! and the owner clears it (then closes the transport) to ask it to stop.

use std::io::{self, Read};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use handstream_frame::{FrameError, FrameReader};
use handstream_transport::{is_closed_socket_error, DatagramSocket, RECV_BUFFER_SIZE};
use tracing::{debug, info, trace, warn};

use crate::error::{ClientError, Result};
use crate::mailbox::Mailbox;
use crate::pose::PoseMessage;

/// Monotonic counters kept by a receive loop.
#[derive(Debug, Default)]
pub struct ReceiveStats {
    received_packets: AtomicU64,
    invalid_frames: AtomicU64,
    decode_errors: AtomicU64,
}

/// Point-in-time copy of [`ReceiveStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Poses decoded and published.
    pub received_packets: u64,
    /// Duplex frames skipped for an invalid announced length.
    pub invalid_frames: u64,
    /// Payloads dropped because they were not a valid pose.
    pub decode_errors: u64,
}

impl ReceiveStats {
    pub fn received_packets(&self) -> u64 {
        self.received_packets.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            received_packets: self.received_packets.load(Ordering::Relaxed),
            invalid_frames: self.invalid_frames.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
        }
    }
}

/// State shared by a receive loop and its owner.
#[derive(Debug)]
pub(crate) struct LoopShared {
    running: AtomicBool,
    pub(crate) mailbox: Mailbox<PoseMessage>,
    pub(crate) stats: ReceiveStats,
}

impl LoopShared {
    pub(crate) fn new() -> Self {
        Self::with_running(true)
    }

    /// State for a loop that has not been started.
    pub(crate) fn idle() -> Self {
        Self::with_running(false)
    }

    fn with_running(running: bool) -> Self {
        Self {
            running: AtomicBool::new(running),
            mailbox: Mailbox::new(),
            stats: ReceiveStats::default(),
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub(crate) fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn deliver(&self, payload: &[u8], sender: Option<SocketAddr>) {
        match PoseMessage::decode(payload, sender) {
            Ok(message) => {
                self.mailbox.publish(message);
                self.stats.received_packets.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                self.stats.decode_errors.fetch_add(1, Ordering::Relaxed);
                warn!(
                    error = %err,
                    size = payload.len(),
                    sender = ?sender,
                    raw = %String::from_utf8_lossy(&payload[..payload.len().min(256)]),
                    "failed to decode hand pose"
                );
            }
        }
    }
}

/// Read length-prefixed poses until the connection closes or fails.
pub(crate) fn run_duplex_loop<R: Read>(mut reader: FrameReader<R>, shared: &LoopShared) {
    while shared.is_running() {
        match reader.read_frame() {
            Ok(frame) => shared.deliver(frame.payload.as_ref(), None),
            Err(err) if err.is_recoverable() => {
                shared.stats.invalid_frames.fetch_add(1, Ordering::Relaxed);
                debug!(error = %err, "skipping frame header");
            }
            Err(FrameError::ConnectionClosed) => {
                if shared.is_running() {
                    info!("duplex peer closed the connection");
                }
                break;
            }
            Err(err) => {
                if shared.is_running() {
                    warn!(error = %err, "duplex receive failed");
                }
                break;
            }
        }
    }

    shared.stop();
    info!(
        received = shared.stats.received_packets(),
        "duplex receive loop stopped"
    );
}

/// Pause after a failed receive before trying again.
const RECEIVE_ERROR_BACKOFF: Duration = Duration::from_millis(10);

/// Source of unframed datagrams for [`run_datagram_loop`].
///
/// `Ok(None)` means the poll interval elapsed without data.
pub(crate) trait DatagramSource {
    fn receive(&self, buf: &mut [u8]) -> io::Result<Option<(usize, SocketAddr)>>;
}

impl DatagramSource for DatagramSocket {
    fn receive(&self, buf: &mut [u8]) -> io::Result<Option<(usize, SocketAddr)>> {
        DatagramSocket::receive(self, buf)
    }
}

/// Receive unframed poses until stopped or the socket is closed.
///
/// Whitespace-only datagrams are ignored. Any receive error other than a
/// closed socket is logged and the loop keeps going, as do undecodable
/// payloads.
pub(crate) fn run_datagram_loop<S: DatagramSource>(source: S, shared: &LoopShared) {
    let mut buf = vec![0u8; RECV_BUFFER_SIZE];

    while shared.is_running() {
        match source.receive(&mut buf) {
            Ok(None) => continue,
            Ok(Some((len, sender))) => {
                let payload = &buf[..len];
                if payload.trim_ascii().is_empty() {
                    trace!(%sender, "ignoring empty datagram");
                    continue;
                }
                shared.deliver(payload, Some(sender));
            }
            Err(err) if is_closed_socket_error(&err) => {
                debug!(error = %err, "datagram socket closed");
                break;
            }
            Err(err) => {
                warn!(error = %err, "datagram receive failed; continuing");
                thread::sleep(RECEIVE_ERROR_BACKOFF);
            }
        }
    }

    shared.stop();
    info!(
        received = shared.stats.received_packets(),
        "datagram receive loop stopped"
    );
}

/// Handle to a receive thread with a bounded join.
#[derive(Debug)]
pub(crate) struct ReceiveWorker {
    name: &'static str,
    handle: Option<JoinHandle<()>>,
    exited: Receiver<()>,
}

impl ReceiveWorker {
    pub(crate) fn spawn<F>(name: &'static str, body: F) -> Result<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        let (exit_tx, exited) = crossbeam_channel::bounded::<()>(1);
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                // Dropped when the thread exits, panicking or not.
                let _exit_tx = exit_tx;
                body();
            })
            .map_err(ClientError::Spawn)?;

        Ok(Self {
            name,
            handle: Some(handle),
            exited,
        })
    }

    /// Wait up to `timeout` for the thread to exit.
    ///
    /// Returns false if it is still running; the thread is then detached.
    /// Calling this again after it returned is a no-op that returns true.
    pub(crate) fn join_timeout(&mut self, timeout: Duration) -> bool {
        let Some(handle) = self.handle.take() else {
            return true;
        };

        match self.exited.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if handle.join().is_err() {
                    warn!(thread = self.name, "receive thread panicked");
                }
                true
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    thread = self.name,
                    ?timeout,
                    "receive thread did not stop in time; detaching"
                );
                false
            }
        }
    }
}
