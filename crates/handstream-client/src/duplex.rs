use std::sync::Arc;

use handstream_frame::{FrameReader, FrameWriter};
use handstream_transport::{ConnectionState, DuplexStream, TcpTransport};
use tracing::{debug, info, warn};

use crate::adapter::PoseSource;
use crate::config::DuplexConfig;
use crate::error::{ClientError, Result};
use crate::pose::{HandPose, PoseMessage};
use crate::receiver::{run_duplex_loop, LoopShared, ReceiveWorker, StatsSnapshot};
use crate::sender::{FrameSender, FrameSource, TickOutcome};

/// Streams frames to a hand-tracking peer and receives poses back on the
/// same TCP connection.
///
/// Two actors touch a client: the background receive thread started by
/// [`DuplexClient::connect`], and the caller, which drives
/// [`DuplexClient::poll`] and [`DuplexClient::tick_send`] from its own loop.
pub struct DuplexClient {
    config: DuplexConfig,
    state: ConnectionState,
    shared: Arc<LoopShared>,
    sender: Option<FrameSender<DuplexStream>>,
    worker: Option<ReceiveWorker>,
    pose: HandPose,
}

impl DuplexClient {
    /// A client that has not connected yet.
    pub fn new(config: DuplexConfig) -> Self {
        Self {
            config,
            state: ConnectionState::Disconnected,
            shared: Arc::new(LoopShared::idle()),
            sender: None,
            worker: None,
            pose: HandPose::default(),
        }
    }

    /// [`DuplexClient::new`] followed by [`DuplexClient::connect`].
    pub fn open(config: DuplexConfig) -> Result<Self> {
        let mut client = Self::new(config);
        client.connect()?;
        Ok(client)
    }

    /// Connect and start the receive thread.
    ///
    /// Only valid from `Disconnected`. Nothing is retried: on failure
    /// everything acquired so far is released and the client ends `Closed`.
    pub fn connect(&mut self) -> Result<()> {
        if self.state != ConnectionState::Disconnected {
            return Err(ClientError::InvalidState(self.state));
        }

        self.set_state(ConnectionState::Connecting);
        let shared = Arc::new(LoopShared::new());
        match establish(&self.config, &shared) {
            Ok((sender, worker)) => {
                self.shared = shared;
                self.sender = Some(sender);
                self.worker = Some(worker);
                self.set_state(ConnectionState::Open);
                info!(host = %self.config.host, port = self.config.port, "duplex client connected");
                Ok(())
            }
            Err(err) => {
                self.set_state(ConnectionState::Closed);
                Err(err)
            }
        }
    }

    /// Drain the mailbox into [`DuplexClient::current_pose`].
    ///
    /// Returns the newly received message, if any. Also notices a receive
    /// loop that died and moves the client to `Closed`.
    pub fn poll(&mut self) -> Option<PoseMessage> {
        let message = self.try_consume_latest();
        if let Some(message) = &message {
            self.pose = message.pose;
            debug!(json = %message.json, "hand pose");
        }

        if self.state == ConnectionState::Open && !self.shared.is_running() {
            info!("duplex connection lost");
            self.teardown();
        }

        message
    }

    /// Take the newest pose published since the last call.
    pub fn try_consume_latest(&self) -> Option<PoseMessage> {
        self.shared.mailbox.take_if_new()
    }

    /// Offer the frame source a send slot.
    ///
    /// A write failure ends the connection: the receive loop is told to
    /// stop, the socket is shut down and later ticks return
    /// [`TickOutcome::Stopped`].
    pub fn tick_send<S: FrameSource + ?Sized>(&mut self, source: &mut S) -> Result<TickOutcome> {
        let Some(sender) = self.sender.as_mut() else {
            return Ok(TickOutcome::Stopped);
        };
        if !self.shared.is_running() {
            sender.stop();
            return Ok(TickOutcome::Stopped);
        }

        match sender.tick(source) {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                warn!(error = %err, "duplex send failed; closing connection");
                self.shared.stop();
                sender.writer_ref().shutdown();
                Err(err)
            }
        }
    }

    /// Write one frame immediately, bypassing the rate gate.
    pub fn send_frame(&mut self, payload: &[u8]) -> Result<TickOutcome> {
        let Some(sender) = self.sender.as_mut() else {
            return Ok(TickOutcome::Stopped);
        };
        if !self.shared.is_running() {
            return Ok(TickOutcome::Stopped);
        }
        sender.send_frame(payload).inspect_err(|_| {
            self.shared.stop();
            sender.writer_ref().shutdown();
        })
    }

    /// Stop the receive thread and close the connection.
    ///
    /// Safe to call any number of times and before [`DuplexClient::connect`];
    /// `Drop` calls it too. A closed client cannot connect again.
    pub fn close(&mut self) {
        match self.state {
            ConnectionState::Closed => {}
            ConnectionState::Disconnected => self.set_state(ConnectionState::Closed),
            _ => self.teardown(),
        }
    }

    fn teardown(&mut self) {
        self.set_state(ConnectionState::Closing);
        self.shared.stop();
        if let Some(sender) = self.sender.as_mut() {
            sender.stop();
            // Unblocks the receive thread parked in a read on the cloned handle.
            sender.writer_ref().shutdown();
        }

        if let Some(mut worker) = self.worker.take() {
            worker.join_timeout(self.config.join_timeout);
        }

        self.set_state(ConnectionState::Closed);
        debug!(
            sent = self.frames_sent(),
            received = self.shared.stats.received_packets(),
            "duplex client closed"
        );
    }

    fn set_state(&mut self, next: ConnectionState) {
        debug!(from = %self.state, to = %next, "duplex state");
        self.state = next;
    }

    /// Latest pose copied out by [`DuplexClient::poll`].
    pub fn current_pose(&self) -> &HandPose {
        &self.pose
    }

    pub fn received_packet_count(&self) -> u64 {
        self.shared.stats.received_packets()
    }

    pub fn frames_sent(&self) -> u64 {
        self.sender.as_ref().map_or(0, FrameSender::frames_sent)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }
}

/// Open the TCP stream, split it and start the receive thread.
fn establish(
    config: &DuplexConfig,
    shared: &Arc<LoopShared>,
) -> Result<(FrameSender<DuplexStream>, ReceiveWorker)> {
    debug!(host = %config.host, port = config.port, "opening duplex connection");

    let stream = match config.connect_timeout {
        Some(timeout) => TcpTransport::connect_timeout(&config.host, config.port, timeout)?,
        None => TcpTransport::connect(&config.host, config.port)?,
    };
    let reader = FrameReader::with_config(stream.try_clone()?, config.frame_config());
    let sender = FrameSender::new(
        FrameWriter::new(stream),
        config.target_fps,
        config.jpeg_quality,
    );

    let worker = {
        let shared = Arc::clone(shared);
        ReceiveWorker::spawn("handstream-duplex-rx", move || {
            run_duplex_loop(reader, &shared)
        })
    };
    match worker {
        Ok(worker) => Ok((sender, worker)),
        Err(err) => {
            // The reader went down with the closure; close the write half too.
            sender.writer_ref().shutdown();
            Err(err)
        }
    }
}

impl PoseSource for DuplexClient {
    fn current_pose(&self) -> &HandPose {
        &self.pose
    }
}

impl Drop for DuplexClient {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for DuplexClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuplexClient")
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .field("state", &self.state)
            .field("running", &self.shared.is_running())
            .finish()
    }
}
